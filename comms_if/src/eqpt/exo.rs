//! # Exo Actuator Synchronisation Data
//!
//! Both control processes exchange a fixed-length vector of `f64` every cycle. The length and the
//! meaning of each element are agreed here so that both peers interpret the payload identically.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Number of elements in the synchronised state vector.
pub const EXO_SYNCH_LEN: usize = 8;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Index of each element in the synchronised state vector.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExoSynchIdx {
    OutputAngleRad = 0,
    OutputVelocityRads = 1,
    OutputTorqueNm = 2,
    GearRatio = 3,
    ThermalScale = 4,
    WindingTempC = 5,
    CaseTempC = 6,
    DesiredOutputTorqueNm = 7,
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Actuator state published by one process and consumed by the other.
///
/// The actuator process fills in everything except `desired_output_torque_nm`, which is set by
/// the high level controller on the other side.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq)]
pub struct ExoSynchData {
    /// Units: radians
    pub output_angle_rad: f64,

    /// Units: radians/second
    pub output_velocity_rads: f64,

    /// Units: newton meters
    pub output_torque_nm: f64,

    pub gear_ratio: f64,

    /// Current-domain thermal derating scale, between 0 and 1
    pub thermal_scale: f64,

    /// Units: degrees celsius
    pub winding_temp_c: f64,

    /// Units: degrees celsius
    pub case_temp_c: f64,

    /// Units: newton meters, positive is plantarflexion
    pub desired_output_torque_nm: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ExoSynchData {
    /// Pack the data into the wire vector.
    pub fn to_array(&self) -> [f64; EXO_SYNCH_LEN] {
        let mut arr = [0f64; EXO_SYNCH_LEN];

        arr[ExoSynchIdx::OutputAngleRad as usize] = self.output_angle_rad;
        arr[ExoSynchIdx::OutputVelocityRads as usize] = self.output_velocity_rads;
        arr[ExoSynchIdx::OutputTorqueNm as usize] = self.output_torque_nm;
        arr[ExoSynchIdx::GearRatio as usize] = self.gear_ratio;
        arr[ExoSynchIdx::ThermalScale as usize] = self.thermal_scale;
        arr[ExoSynchIdx::WindingTempC as usize] = self.winding_temp_c;
        arr[ExoSynchIdx::CaseTempC as usize] = self.case_temp_c;
        arr[ExoSynchIdx::DesiredOutputTorqueNm as usize] = self.desired_output_torque_nm;

        arr
    }

    /// Unpack the data from a wire vector, or `None` if the slice has the wrong length.
    pub fn from_slice(data: &[f64]) -> Option<Self> {
        if data.len() != EXO_SYNCH_LEN {
            return None;
        }

        Some(Self {
            output_angle_rad: data[ExoSynchIdx::OutputAngleRad as usize],
            output_velocity_rads: data[ExoSynchIdx::OutputVelocityRads as usize],
            output_torque_nm: data[ExoSynchIdx::OutputTorqueNm as usize],
            gear_ratio: data[ExoSynchIdx::GearRatio as usize],
            thermal_scale: data[ExoSynchIdx::ThermalScale as usize],
            winding_temp_c: data[ExoSynchIdx::WindingTempC as usize],
            case_temp_c: data[ExoSynchIdx::CaseTempC as usize],
            desired_output_torque_nm: data[ExoSynchIdx::DesiredOutputTorqueNm as usize],
        })
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_layout() {
        let data = ExoSynchData {
            desired_output_torque_nm: 12.5,
            gear_ratio: 14.75,
            ..Default::default()
        };

        let arr = data.to_array();
        assert_eq!(arr[7], 12.5);
        assert_eq!(arr[3], 14.75);
        assert_eq!(ExoSynchData::from_slice(&arr), Some(data));

        assert_eq!(ExoSynchData::from_slice(&arr[..7]), None);
    }
}
