//! # Thermal Model
//!
//! Two-node (winding and case) lumped thermal model of the motor. The model is advanced every
//! tick with the motor current and produces a scale factor which derates the commanded torque as
//! either node approaches its temperature limit.

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
