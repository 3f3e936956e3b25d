//! # Exo library.
//!
//! This library allows other crates in the workspace to access items defined inside the exo
//! crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Belt calibration - winds in the slack and aligns the kinematic transform
pub mod calib;

/// Actuator driver - the interface to the motor controller, and a simulated implementation of it
pub mod driver;

/// Exo control module - runs one actuator's control tick
pub mod exo_ctrl;

/// Kinematic transform - maps between output (ankle) angle and motor angle through the belt
pub mod kinematics;

/// Executable parameters
pub mod params;

/// Thermal model - two node winding and case model which derates the torque command
pub mod thermal;

/// Torque control - turns a desired output torque into a safe motor torque command
pub mod torque_ctrl;
