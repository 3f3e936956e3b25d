//! # Exo Executable Parameters
//!
//! This module provides parameters for the exo executable, and the validation error shared by all
//! module parameter structs.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use comms_if::{eqpt::exo::EXO_SYNCH_LEN, net::synch::SynchParams};

use crate::{driver::SimParams, exo_ctrl::ExoCtrlParams};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ExoExecParams {
    /// Synchronisation channel to the high level controller
    pub synch: SynchParams,

    /// Actuator controller
    pub exo_ctrl: ExoCtrlParams,

    /// Simulated actuator
    pub sim: SimParams,

    /// Number of cycles between status log lines, zero disables them
    pub status_period_cycles: u64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ParamsError {
    #[error("{0} must be greater than zero, found {1}")]
    NotPositive(&'static str, f64),

    #[error("{0} must not be negative, found {1}")]
    Negative(&'static str, f64),

    #[error("{0} must be finite, found {1}")]
    NotFinite(&'static str, f64),

    #[error("Inconsistent parameters: {0}")]
    Inconsistent(String),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for ExoExecParams {
    fn default() -> Self {
        Self {
            synch: SynchParams {
                payload_len: EXO_SYNCH_LEN,
                ..Default::default()
            },
            exo_ctrl: ExoCtrlParams::default(),
            sim: SimParams::default(),
            status_period_cycles: 100,
        }
    }
}

impl ExoExecParams {
    /// Determines if the parameters are valid.
    pub fn validate(&self) -> Result<(), ParamsError> {
        self.exo_ctrl.validate()?;

        if self.synch.payload_len != EXO_SYNCH_LEN {
            return Err(ParamsError::Inconsistent(format!(
                "synch.payload_len is {} but the exo state vector has {} elements",
                self.synch.payload_len,
                EXO_SYNCH_LEN
            )));
        }
        if self.synch.max_drain == 0 {
            return Err(ParamsError::NotPositive("synch.max_drain", 0.0));
        }

        Ok(())
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_params_file() {
        let params: ExoExecParams = util::params::from_str(
            include_str!("../../params/exo_exec.toml")
        ).unwrap();

        params.validate().unwrap();
        assert_eq!(params.synch.payload_len, EXO_SYNCH_LEN);
    }

    #[test]
    fn test_payload_len() {
        assert!(ExoExecParams::default().validate().is_ok());

        let mut params = ExoExecParams::default();
        params.synch.payload_len = 1;
        assert!(matches!(params.validate(), Err(ParamsError::Inconsistent(_))));
    }
}
