//! Parameters structure for ExoCtrl

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::{
    calib::CalibParams,
    kinematics::KinematicsParams,
    params::ParamsError,
    thermal::ThermalParams,
    torque_ctrl::TorqueCtrlParams,
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters for actuator control.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ExoCtrlParams {
    /// Period of the control tick, also used as the driver streaming period.
    ///
    /// Units: seconds
    pub tick_period_s: f64,

    /// Output-side slack left in the belt by slacked position commands.
    ///
    /// Units: radians
    pub slack_rad: f64,

    pub kinematics: KinematicsParams,

    pub torque_ctrl: TorqueCtrlParams,

    pub thermal: ThermalParams,

    pub calib: CalibParams,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for ExoCtrlParams {
    fn default() -> Self {
        Self {
            tick_period_s: 0.01,
            slack_rad: 1f64.to_radians(),
            kinematics: KinematicsParams::default(),
            torque_ctrl: TorqueCtrlParams::default(),
            thermal: ThermalParams::default(),
            calib: CalibParams::default(),
        }
    }
}

impl ExoCtrlParams {
    /// Frequency of the control tick.
    ///
    /// Units: hertz
    pub fn tick_freq_hz(&self) -> f64 {
        1.0 / self.tick_period_s
    }

    /// Determines if the parameters are valid.
    pub fn validate(&self) -> Result<(), ParamsError> {
        if !(self.tick_period_s > 0.0) || !self.tick_period_s.is_finite() {
            return Err(ParamsError::NotPositive("exo_ctrl.tick_period_s", self.tick_period_s));
        }
        if !(self.slack_rad >= 0.0) || !self.slack_rad.is_finite() {
            return Err(ParamsError::Negative("exo_ctrl.slack_rad", self.slack_rad));
        }

        self.kinematics.validate()?;
        self.torque_ctrl.validate()?;
        self.thermal.validate()?;
        self.calib.validate()?;

        Ok(())
    }
}
