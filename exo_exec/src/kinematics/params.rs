//! Parameters structure for the kinematic transform

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::params::ParamsError;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Which limb the actuator is mounted on.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimbSide {
    Left,
    Right,
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters for the kinematic transform.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct KinematicsParams {
    /// The left limb's output encoder reads mirrored.
    pub side: LimbSide,

    /// Path to the calibration CSV, relative to the params directory. If not set the built-in
    /// bench calibration is used.
    pub calibration_file: Option<String>,

    /// Tolerance applied below the first and above the last breakpoint before an angle is
    /// considered out of range.
    ///
    /// Units: radians
    pub edge_tolerance_rad: f64,

    /// Allowed motor angle discontinuity at the interior breakpoints.
    ///
    /// Units: radians
    pub continuity_tolerance_rad: f64,

    /// Allowed gear ratio discontinuity at the interior breakpoints, and allowed disagreement
    /// between the gear fit and the derivative of the angle fit.
    pub gear_ratio_tolerance: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for KinematicsParams {
    fn default() -> Self {
        Self {
            side: LimbSide::Right,
            calibration_file: None,
            edge_tolerance_rad: 1f64.to_radians(),
            continuity_tolerance_rad: 0.5f64.to_radians(),
            gear_ratio_tolerance: 0.05,
        }
    }
}

impl KinematicsParams {
    /// Determines if the parameters are valid.
    pub fn validate(&self) -> Result<(), ParamsError> {
        if !(self.edge_tolerance_rad >= 0.0) {
            return Err(ParamsError::Negative("kinematics.edge_tolerance_rad", self.edge_tolerance_rad));
        }
        if !(self.continuity_tolerance_rad >= 0.0) {
            return Err(ParamsError::Negative(
                "kinematics.continuity_tolerance_rad",
                self.continuity_tolerance_rad
            ));
        }
        if !(self.gear_ratio_tolerance >= 0.0) {
            return Err(ParamsError::Negative("kinematics.gear_ratio_tolerance", self.gear_ratio_tolerance));
        }

        Ok(())
    }
}
