//! Implementations for the torque controller

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{trace, warn};
use serde::Serialize;

use util::maths::sign;

use super::{TorqueCtrlError, TorqueCtrlParams};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Torque controller.
#[derive(Debug, Clone, Default)]
pub struct TorqueCtrl {
    params: TorqueCtrlParams,
}

/// Status report for torque control processing.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq)]
pub struct StatusReport {
    /// The request couldn't be realised in the current direction and was replaced by zero.
    pub rejected: bool,

    /// The transmission was not transmitting so the tension torque was commanded.
    pub tensioning: bool,

    /// The motor torque was clamped to the allowed range.
    pub clamped: bool,

    /// The thermal derating reduced the command.
    pub thermally_limited: bool,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl TorqueCtrl {
    pub fn new(params: TorqueCtrlParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &TorqueCtrlParams {
        &self.params
    }

    /// True if the transmission can deliver output torque at this gear ratio.
    pub fn is_transmitting(&self, gear_ratio: f64) -> bool {
        gear_ratio > self.params.min_transmit_gear_ratio
    }

    /// Motor current needed for the given motor torque.
    ///
    /// Units: amps
    pub fn current_for(&self, motor_torque_nm: f64) -> f64 {
        motor_torque_nm / self.params.kt_nm_per_a
    }

    /// Motor torque before thermal derating, steps 1 to 3 of the policy.
    ///
    /// Units: newton meters in and out, positive output torque is plantarflexion.
    pub fn demand(
        &self,
        desired_output_torque_nm: f64,
        gear_ratio: f64
    ) -> Result<(f64, StatusReport), TorqueCtrlError> {
        if !desired_output_torque_nm.is_finite() {
            return Err(TorqueCtrlError::NonFiniteInput(
                "desired output torque", desired_output_torque_nm
            ));
        }
        if !gear_ratio.is_finite() {
            return Err(TorqueCtrlError::NonFiniteInput("gear ratio", gear_ratio));
        }

        let mut report = StatusReport::default();
        let mut output_torque_nm = desired_output_torque_nm;

        // ---- DIRECTION CHECK ----

        if gear_ratio == 0.0
            || (output_torque_nm != 0.0 && sign(output_torque_nm) != sign(gear_ratio))
        {
            warn!(
                "Output torque of {:.3} Nm can't be realised at gear ratio {:.3}, using zero",
                desired_output_torque_nm, gear_ratio
            );
            output_torque_nm = 0.0;
            report.rejected = true;
        }

        // ---- TENSION SUBSTITUTION ----

        if !self.is_transmitting(gear_ratio) {
            report.tensioning = true;
            trace!(
                "Gear ratio {:.3} not transmitting, commanding tension torque",
                gear_ratio
            );
            return Ok((self.params.tension_motor_torque_nm, report));
        }

        // ---- CLAMP ----

        let unclamped = output_torque_nm / gear_ratio;
        let motor_torque_nm = unclamped
            .max(0.0)
            .min(self.params.max_motor_torque_nm());
        report.clamped = motor_torque_nm != unclamped;

        Ok((motor_torque_nm, report))
    }

    /// Apply the thermal derating scale to a motor torque, step 4 of the policy.
    pub fn derate(&self, motor_torque_nm: f64, scale: f64, report: &mut StatusReport) -> f64 {
        let scale = scale.max(0.0).min(1.0);
        if scale < 1.0 && motor_torque_nm != 0.0 {
            report.thermally_limited = true;
        }

        motor_torque_nm * scale
    }

    /// Full policy, from desired output torque to motor torque command.
    pub fn command(
        &self,
        desired_output_torque_nm: f64,
        gear_ratio: f64,
        thermal_scale: f64
    ) -> Result<(f64, StatusReport), TorqueCtrlError> {
        let (demand_nm, mut report) = self.demand(desired_output_torque_nm, gear_ratio)?;
        let cmd_nm = self.derate(demand_nm, thermal_scale, &mut report);

        Ok((cmd_nm, report))
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    fn ctrl() -> TorqueCtrl {
        TorqueCtrl::new(TorqueCtrlParams::default())
    }

    #[test]
    fn test_transmitting() -> Result<(), TorqueCtrlError> {
        let ctrl = ctrl();

        let (cmd, report) = ctrl.command(10.0, 14.75, 1.0)?;
        assert!((cmd - 10.0 / 14.75).abs() < 1e-12);
        assert_eq!(report, StatusReport::default());

        // Zero is always realisable
        let (cmd, report) = ctrl.command(0.0, 14.75, 1.0)?;
        assert_eq!(cmd, 0.0);
        assert!(!report.rejected);

        Ok(())
    }

    #[test]
    fn test_wrong_direction() -> Result<(), TorqueCtrlError> {
        let (cmd, report) = ctrl().command(-1.0, 14.75, 1.0)?;

        assert_eq!(cmd, 0.0);
        assert!(report.rejected);
        assert!(!report.tensioning);

        Ok(())
    }

    #[test]
    fn test_tension() -> Result<(), TorqueCtrlError> {
        let ctrl = ctrl();

        // Negative gear ratio, request in the wrong direction
        let (cmd, report) = ctrl.command(5.0, -9.853, 1.0)?;
        assert_eq!(cmd, 0.2);
        assert!(report.rejected && report.tensioning);

        // Negative gear ratio, request in the matching direction is still not transmittable
        let (cmd, report) = ctrl.command(-5.0, -9.853, 1.0)?;
        assert_eq!(cmd, 0.2);
        assert!(!report.rejected && report.tensioning);

        // Exactly zero gear ratio
        let (cmd, report) = ctrl.command(0.0, 0.0, 1.0)?;
        assert_eq!(cmd, 0.2);
        assert!(report.rejected && report.tensioning);

        // Positive but below the transmit threshold
        let (cmd, report) = ctrl.command(5.0, 0.5, 1.0)?;
        assert_eq!(cmd, 0.2);
        assert!(!report.rejected && report.tensioning);

        Ok(())
    }

    #[test]
    fn test_clamp_then_derate() -> Result<(), TorqueCtrlError> {
        let ctrl = ctrl();
        let max = 20.0 * 0.146;

        let (cmd, report) = ctrl.command(1000.0, 14.75, 1.0)?;
        assert!((cmd - max).abs() < 1e-12);
        assert!(report.clamped);
        assert!(!report.thermally_limited);

        // Derating applies after the clamp
        let (cmd, report) = ctrl.command(1000.0, 14.75, 0.5)?;
        assert!((cmd - 0.5 * max).abs() < 1e-12);
        assert!(report.clamped && report.thermally_limited);

        // Scale outside of [0, 1] is clamped
        let (cmd, _) = ctrl.command(10.0, 14.75, 2.0)?;
        assert!((cmd - 10.0 / 14.75).abs() < 1e-12);

        Ok(())
    }

    #[test]
    fn test_non_finite() {
        assert!(ctrl().command(f64::NAN, 14.75, 1.0).is_err());
        assert!(ctrl().command(1.0, f64::INFINITY, 1.0).is_err());
    }
}
