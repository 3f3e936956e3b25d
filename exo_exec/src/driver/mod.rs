//! # Actuator driver interface
//!
//! The low level motor driver is an external collaborator. This module defines the interface the
//! control core consumes from it, and provides a deterministic simulated driver used by the
//! executable and in tests.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod sim;

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub use sim::*;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Interface to the motor driver of one actuator.
pub trait ActuatorDriver {
    /// Begin streaming sensor data from the device at the given rate.
    fn start_streaming(&mut self, freq_hz: f64) -> Result<(), DriverError>;

    /// Read the latest sample from the device.
    ///
    /// Fails with [`DriverError::NotStreaming`] if streaming hasn't been started.
    fn update(&mut self) -> Result<ActuatorState, DriverError>;

    /// The most recently read sample.
    ///
    /// Fails with [`DriverError::NotYetUpdated`] if [`ActuatorDriver::update`] has never
    /// succeeded.
    fn state(&self) -> Result<&ActuatorState, DriverError>;

    fn control_mode(&self) -> ControlMode;

    fn set_control_mode(&mut self, mode: ControlMode) -> Result<(), DriverError>;

    /// Units: radians
    fn set_motor_angle_rad(&mut self, angle_rad: f64) -> Result<(), DriverError>;

    /// Units: millivolts
    fn set_motor_voltage_mv(&mut self, voltage_mv: f64) -> Result<(), DriverError>;

    /// Units: newton meters
    fn set_motor_torque_nm(&mut self, torque_nm: f64) -> Result<(), DriverError>;
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Low level control mode of the motor driver.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMode {
    Voltage,
    Current,
    Position,
}

#[derive(thiserror::Error, Debug)]
pub enum DriverError {
    #[error("The driver state was queried before the first update")]
    NotYetUpdated,

    #[error("The driver was updated before streaming was started")]
    NotStreaming,

    #[error("Cannot command {0} while in {1:?} mode")]
    WrongMode(&'static str, ControlMode),

    #[error("Non-finite {0} command: {1}")]
    NonFiniteCommand(&'static str, f64),
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A raw sample read from the driver.
#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
pub struct ActuatorState {
    /// Units: radians
    pub motor_angle_rad: f64,

    /// Units: radians/second
    pub motor_velocity_rads: f64,

    /// Units: radians/second^2
    pub motor_accel_radss: f64,

    /// Units: amps
    pub motor_current_a: f64,

    /// Raw reading of the output (ankle) encoder.
    ///
    /// Units: counts
    pub output_encoder_counts: u32,

    pub timestamp: DateTime<Utc>,
}
