//! # Exo Actuator Control
//!
//! Owns everything belonging to one actuator: the driver, the kinematic transform, the torque
//! controller and the thermal model. One call to `proc` is one control tick:
//!
//! 1. Read a sample from the driver
//! 2. Compute the output angle, gear ratio and output-side derived quantities
//! 3. Turn the demand into a motor command, derating torque by the thermal model
//! 4. Issue the command and advance the thermal model
//!
//! Position and torque commands are refused until the belt has been calibrated.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod params;
mod state;

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub use params::*;
pub use state::*;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use crate::{
    calib::CalibError,
    driver::DriverError,
    kinematics::KinematicsError,
    params::ParamsError,
    torque_ctrl::TorqueCtrlError,
};

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(thiserror::Error, Debug)]
pub enum ExoCtrlError {
    #[error("ExoCtrl used before initialisation")]
    NotInitialised,

    #[error("Cannot command the actuator before the belt has been calibrated")]
    NotAligned,

    #[error("Invalid parameters: {0}")]
    InvalidParams(#[from] ParamsError),

    #[error(transparent)]
    KinematicsError(#[from] KinematicsError),

    #[error(transparent)]
    DriverError(#[from] DriverError),

    #[error(transparent)]
    TorqueCtrlError(#[from] TorqueCtrlError),

    #[error(transparent)]
    CalibError(#[from] CalibError),
}
