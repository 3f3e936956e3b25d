//! # Calibration Procedure
//!
//! Winds in the belt slack under a small positive voltage until the motor current shows the belt
//! is taut, then aligns the kinematic transform so that the forward map reproduces the measured
//! motor angle at the current output angle.
//!
//! This blocks the calling thread, but the number of current polls is bounded.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::{thread, time::Duration};

use crate::{
    driver::{ActuatorDriver, ControlMode, DriverError},
    kinematics::{KinematicTransform, KinematicsError},
    params::ParamsError,
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters of the calibration procedure.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct CalibParams {
    /// Voltage applied to wind in the belt.
    ///
    /// Units: millivolts
    pub winding_voltage_mv: f64,

    /// Current above which the belt is considered taut.
    ///
    /// Units: amps
    pub current_threshold_a: f64,

    /// Maximum number of current polls before giving up.
    pub max_polls: usize,

    /// Time between current polls.
    ///
    /// Units: seconds
    pub poll_period_s: f64,
}

/// Result of a successful calibration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CalibReport {
    /// Units: radians
    pub offset_rad: f64,

    /// Output angle at which the alignment was made.
    ///
    /// Units: radians
    pub output_angle_rad: f64,

    /// Motor angle with the belt taut.
    ///
    /// Units: radians
    pub motor_angle_rad: f64,

    /// Number of polls taken for the current to exceed the threshold.
    pub num_polls: usize,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(thiserror::Error, Debug)]
pub enum CalibError {
    #[error("Motor current didn't exceed {threshold_a} A within {num_polls} polls")]
    WindingTimeout {
        threshold_a: f64,
        num_polls: usize
    },

    #[error("Driver error during calibration: {0}")]
    DriverError(#[from] DriverError),

    #[error("Kinematics error during calibration: {0}")]
    KinematicsError(#[from] KinematicsError),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for CalibParams {
    fn default() -> Self {
        Self {
            winding_voltage_mv: 750.0,
            current_threshold_a: 1.0,
            max_polls: 1000,
            poll_period_s: 0.01,
        }
    }
}

impl CalibParams {
    /// Determines if the parameters are valid.
    pub fn validate(&self) -> Result<(), ParamsError> {
        if !(self.winding_voltage_mv > 0.0) || !self.winding_voltage_mv.is_finite() {
            return Err(ParamsError::NotPositive("calib.winding_voltage_mv", self.winding_voltage_mv));
        }
        if !(self.current_threshold_a > 0.0) || !self.current_threshold_a.is_finite() {
            return Err(ParamsError::NotPositive("calib.current_threshold_a", self.current_threshold_a));
        }
        if self.max_polls == 0 {
            return Err(ParamsError::NotPositive("calib.max_polls", 0.0));
        }
        if !(self.poll_period_s >= 0.0) || !self.poll_period_s.is_finite() {
            return Err(ParamsError::Negative("calib.poll_period_s", self.poll_period_s));
        }

        Ok(())
    }
}

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Tension the belt and align the kinematic transform.
///
/// The driver's control mode on entry is restored before returning, whether or not calibration
/// succeeded. The transform is only left aligned if this returns `Ok`.
pub fn calibrate<D: ActuatorDriver>(
    driver: &mut D,
    kinematics: &mut KinematicTransform,
    params: &CalibParams
) -> Result<CalibReport, CalibError> {
    let prev_mode = driver.control_mode();

    let result = wind_and_align(driver, kinematics, params);

    // Restore the previous mode on every path, leaving the motor unpowered
    let zero_result = match driver.control_mode() {
        ControlMode::Voltage => driver.set_motor_voltage_mv(0.0),
        _ => Ok(())
    };
    let restore_result = driver.set_control_mode(prev_mode);

    let report = result?;
    if let Err(e) = zero_result.and(restore_result) {
        warn!("Could not restore the driver after calibration, discarding the alignment: {}", e);
        kinematics.clear_offset();
        return Err(e.into());
    }

    Ok(report)
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn wind_and_align<D: ActuatorDriver>(
    driver: &mut D,
    kinematics: &mut KinematicTransform,
    params: &CalibParams
) -> Result<CalibReport, CalibError> {
    info!("Calibrating: winding in belt slack at {} mV", params.winding_voltage_mv);

    driver.set_control_mode(ControlMode::Voltage)?;
    driver.set_motor_voltage_mv(params.winding_voltage_mv)?;

    // ---- WAIT FOR TENSION ----

    let mut num_polls = 0;
    loop {
        if num_polls >= params.max_polls {
            warn!(
                "Calibration timed out after {} polls, belt not tensioned",
                num_polls
            );
            return Err(CalibError::WindingTimeout {
                threshold_a: params.current_threshold_a,
                num_polls
            });
        }

        if params.poll_period_s > 0.0 {
            thread::sleep(Duration::from_secs_f64(params.poll_period_s));
        }

        let state = driver.update()?;
        num_polls += 1;

        debug!("Calibration poll {}: {:.3} A", num_polls, state.motor_current_a);

        if state.motor_current_a > params.current_threshold_a {
            break;
        }
    }

    driver.set_motor_voltage_mv(0.0)?;

    // ---- ALIGN ----

    let state = *driver.state()?;
    let output_angle_rad = kinematics.output_angle(state.output_encoder_counts);
    let slackless_rad = kinematics.slackless_motor_angle(output_angle_rad)?;
    let offset_rad = state.motor_angle_rad - slackless_rad;

    kinematics.set_offset(offset_rad);

    info!(
        "Calibration complete after {} polls: output at {:.2} deg, offset {:.4} rad",
        num_polls,
        output_angle_rad.to_degrees(),
        offset_rad
    );

    Ok(CalibReport {
        offset_rad,
        output_angle_rad,
        motor_angle_rad: state.motor_angle_rad,
        num_polls
    })
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        driver::{ActuatorState, SimDriver, SimParams},
        kinematics::{KinematicCalibration, KinematicsParams},
    };

    fn setup(sim: SimParams) -> (SimDriver, KinematicTransform, CalibParams) {
        let mut driver = SimDriver::new(sim);
        // Power of two rate so the simulated winding steps are exact
        driver.start_streaming(128.0).unwrap();

        let kin = KinematicTransform::new(
            KinematicsParams::default(),
            KinematicCalibration::default()
        ).unwrap();

        let params = CalibParams {
            poll_period_s: 0.0,
            ..Default::default()
        };

        (driver, kin, params)
    }

    #[test]
    fn test_calibrate() -> Result<(), CalibError> {
        let (mut driver, mut kin, params) = setup(SimParams {
            output_angle_rad: 100f64.to_radians(),
            motor_angle_rad: 3.0,
            slack_rad: 1.171875,
            ..Default::default()
        });

        let report = calibrate(&mut driver, &mut kin, &params)?;

        // 20 rad/s/V * 0.75 V / 128 Hz = 0.1171875 rad per poll, so 10 polls to wind in and one
        // more to see the stall current
        assert_eq!(report.num_polls, 11);
        assert!((report.motor_angle_rad - 4.171875).abs() < 1e-9);

        // The forward map now reproduces the measured motor angle
        assert!(kin.is_aligned());
        let state = *driver.state()?;
        let output_angle = kin.output_angle(state.output_encoder_counts);
        let desired = kin.desired_motor_angle(output_angle)?;
        assert!((desired - state.motor_angle_rad).abs() < 1e-9);

        // Back in the mode we started in, with no voltage applied
        assert_eq!(driver.control_mode(), ControlMode::Current);
        assert_eq!(driver.voltage_cmd_mv(), 0.0);

        Ok(())
    }

    #[test]
    fn test_timeout() {
        let (mut driver, mut kin, params) = setup(SimParams {
            slack_rad: 1000.0,
            ..Default::default()
        });
        driver.set_control_mode(ControlMode::Position).unwrap();

        let result = calibrate(&mut driver, &mut kin, &CalibParams {
            max_polls: 20,
            ..params
        });

        assert!(matches!(result, Err(CalibError::WindingTimeout { num_polls: 20, .. })));
        assert!(!kin.is_aligned());
        assert_eq!(driver.control_mode(), ControlMode::Position);
    }

    #[test]
    fn test_out_of_range() {
        // Output angle outside of the calibrated range
        let (mut driver, mut kin, params) = setup(SimParams {
            output_angle_rad: 10f64.to_radians(),
            slack_rad: 0.1,
            ..Default::default()
        });

        assert!(matches!(
            calibrate(&mut driver, &mut kin, &params),
            Err(CalibError::KinematicsError(KinematicsError::OutOfRange(_)))
        ));
        assert!(!kin.is_aligned());
        assert_eq!(driver.control_mode(), ControlMode::Current);
    }

    /// Sim driver which refuses to leave voltage mode once it has entered it.
    struct StuckInVoltage(SimDriver);

    impl ActuatorDriver for StuckInVoltage {
        fn start_streaming(&mut self, freq_hz: f64) -> Result<(), DriverError> {
            self.0.start_streaming(freq_hz)
        }

        fn update(&mut self) -> Result<ActuatorState, DriverError> {
            self.0.update()
        }

        fn state(&self) -> Result<&ActuatorState, DriverError> {
            self.0.state()
        }

        fn control_mode(&self) -> ControlMode {
            self.0.control_mode()
        }

        fn set_control_mode(&mut self, mode: ControlMode) -> Result<(), DriverError> {
            match self.0.control_mode() {
                ControlMode::Voltage if mode != ControlMode::Voltage => {
                    Err(DriverError::WrongMode("a mode change", ControlMode::Voltage))
                },
                _ => self.0.set_control_mode(mode)
            }
        }

        fn set_motor_angle_rad(&mut self, angle_rad: f64) -> Result<(), DriverError> {
            self.0.set_motor_angle_rad(angle_rad)
        }

        fn set_motor_voltage_mv(&mut self, voltage_mv: f64) -> Result<(), DriverError> {
            self.0.set_motor_voltage_mv(voltage_mv)
        }

        fn set_motor_torque_nm(&mut self, torque_nm: f64) -> Result<(), DriverError> {
            self.0.set_motor_torque_nm(torque_nm)
        }
    }

    #[test]
    fn test_restore_failure() {
        let (driver, mut kin, params) = setup(SimParams {
            output_angle_rad: 100f64.to_radians(),
            slack_rad: 0.1,
            ..Default::default()
        });
        let mut driver = StuckInVoltage(driver);

        // Winding succeeds but the mode can't be restored
        assert!(matches!(
            calibrate(&mut driver, &mut kin, &params),
            Err(CalibError::DriverError(DriverError::WrongMode(..)))
        ));

        assert!(!kin.is_aligned());
        assert_eq!(driver.0.voltage_cmd_mv(), 0.0);
    }

    #[test]
    fn test_validate() {
        assert!(CalibParams::default().validate().is_ok());
        assert!(CalibParams { max_polls: 0, ..Default::default() }.validate().is_err());
        assert!(CalibParams { winding_voltage_mv: -5.0, ..Default::default() }.validate().is_err());
    }
}
