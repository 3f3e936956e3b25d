//! Parameters structure for the torque controller

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::params::ParamsError;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters for the torque controller.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct TorqueCtrlParams {
    /// Motor torque constant.
    ///
    /// Units: newton meters/amp
    pub kt_nm_per_a: f64,

    /// Maximum motor current, which with `kt_nm_per_a` sets the maximum motor torque.
    ///
    /// Units: amps
    pub max_current_a: f64,

    /// Motor torque commanded while the transmission is not transmitting, keeps the belt taut.
    ///
    /// Units: newton meters
    pub tension_motor_torque_nm: f64,

    /// The transmission is considered to be transmitting only for gear ratios above this value.
    pub min_transmit_gear_ratio: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for TorqueCtrlParams {
    fn default() -> Self {
        Self {
            kt_nm_per_a: 0.146,
            max_current_a: 20.0,
            tension_motor_torque_nm: 0.2,
            min_transmit_gear_ratio: 1.0,
        }
    }
}

impl TorqueCtrlParams {
    /// Units: newton meters
    pub fn max_motor_torque_nm(&self) -> f64 {
        self.max_current_a * self.kt_nm_per_a
    }

    /// Determines if the parameters are valid.
    pub fn validate(&self) -> Result<(), ParamsError> {
        if !(self.kt_nm_per_a > 0.0) || !self.kt_nm_per_a.is_finite() {
            return Err(ParamsError::NotPositive("torque_ctrl.kt_nm_per_a", self.kt_nm_per_a));
        }
        if !(self.max_current_a > 0.0) || !self.max_current_a.is_finite() {
            return Err(ParamsError::NotPositive("torque_ctrl.max_current_a", self.max_current_a));
        }
        if !(self.tension_motor_torque_nm >= 0.0) {
            return Err(ParamsError::Negative(
                "torque_ctrl.tension_motor_torque_nm",
                self.tension_motor_torque_nm
            ));
        }
        if !(self.min_transmit_gear_ratio >= 0.0) || !self.min_transmit_gear_ratio.is_finite() {
            return Err(ParamsError::Negative(
                "torque_ctrl.min_transmit_gear_ratio",
                self.min_transmit_gear_ratio
            ));
        }
        if self.tension_motor_torque_nm > self.max_motor_torque_nm() {
            return Err(ParamsError::Inconsistent(format!(
                "tension torque ({} Nm) exceeds the maximum motor torque ({} Nm)",
                self.tension_motor_torque_nm,
                self.max_motor_torque_nm()
            )));
        }

        Ok(())
    }
}
