//! # Kinematic Transform
//!
//! Maps between the motor angle and the output (ankle) angle of the belt-driven transmission. The
//! output range is split into three regimes by four breakpoints:
//!
//! - belt wound: motor angle linear in output angle, positive gear ratio
//! - transition: motor angle quadratic in output angle, gear ratio changes sign at the belt
//!   inflection angle
//! - belt reversed: motor angle linear in output angle, negative gear ratio
//!
//! The forward map carries a calibration offset which is only defined once the belt has been
//! tensioned by the calibration procedure.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod calibration;
mod params;
mod state;

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub use calibration::*;
pub use params::*;
pub use state::*;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Resolution of the output encoder.
pub const ENCODER_COUNTS_PER_REV: f64 = 16384.0;

/// Number of regimes the output range is divided into.
pub const NUM_REGIMES: usize = 3;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// The regime of the transmission at a given output angle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Regime {
    /// Belt wound, positive constant gear ratio.
    Wound = 0,

    /// Transition between wound and reversed, linearly varying gear ratio.
    Transition = 1,

    /// Belt reversed, negative constant gear ratio.
    Reversed = 2,
}

#[derive(thiserror::Error, Debug)]
pub enum KinematicsError {
    #[error("Output angle {0} rad is outside of all transmission regimes")]
    OutOfRange(f64),

    #[error("The transmission offset is undefined until calibration has been completed")]
    NotAligned,

    #[error("Breakpoints must be finite and strictly increasing, found {0:?}")]
    InvalidBreakpoints([f64; 4]),

    #[error("Could not read the calibration file: {0}")]
    CalibrationReadError(csv::Error),

    #[error("Calibration file row {0} is missing")]
    MissingRow(usize),

    #[error("Calibration file row {0} is malformed: {1}")]
    MalformedRow(usize, String),
}

impl Regime {
    /// Index of the regime's row in the per-regime coefficient tables.
    pub fn index(&self) -> usize {
        *self as usize
    }
}
