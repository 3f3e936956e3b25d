//! # Torque Controller
//!
//! Converts a desired output torque into a motor torque command which the transmission can
//! actually deliver. The belt can only pull in one direction, so requests the current regime
//! can't realise are replaced by zero, and while the belt is slack a small tensioning torque is
//! commanded instead to keep it from unwinding.
//!
//! Processing order is fixed:
//!
//! 1. Direction check
//! 2. Tension substitution
//! 3. Division by the gear ratio and magnitude clamp
//! 4. Thermal derating

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
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(thiserror::Error, Debug)]
pub enum TorqueCtrlError {
    #[error("Non-finite {0}: {1}")]
    NonFiniteInput(&'static str, f64),
}
