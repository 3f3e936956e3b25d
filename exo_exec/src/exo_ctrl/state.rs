//! Implementations for the ExoCtrl state structure

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use chrono::{DateTime, Utc};
use log::{trace, warn};
use serde::Serialize;

use comms_if::eqpt::exo::ExoSynchData;
use util::{module::State, time::seconds_between};

use super::{ExoCtrlError, ExoCtrlParams};
use crate::{
    calib::{self, CalibReport},
    driver::{ActuatorDriver, ActuatorState, ControlMode},
    kinematics::{KinematicCalibration, KinematicTransform, Regime},
    thermal::{ThermalModel, ThermalReport},
    torque_ctrl::{self, TorqueCtrl},
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Actuator control module state
pub struct ExoCtrl<D: ActuatorDriver> {
    driver: D,

    params: ExoCtrlParams,

    core: Option<Core>,

    /// Output-side slack used by slacked position commands.
    ///
    /// Units: radians
    slack_rad: f64,

    /// Timestamp of the previous driver sample.
    last_sample_time: Option<DateTime<Utc>>,

    report: StatusReport,
}

/// Components which only exist after initialisation.
struct Core {
    kinematics: KinematicTransform,
    torque_ctrl: TorqueCtrl,
    thermal: ThermalModel,
}

/// Data needed to initialise ExoCtrl.
#[derive(Debug, Clone)]
pub struct InitData {
    pub params: ExoCtrlParams,

    pub calibration: KinematicCalibration,
}

/// Input data to ExoCtrl.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputData {
    pub demand: Demand,
}

/// Output (ankle) side state computed on each tick.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq)]
pub struct OutputData {
    /// Units: radians
    pub output_angle_rad: f64,

    /// Units: radians/second
    pub output_velocity_rads: f64,

    /// Units: radians/second^2
    pub output_accel_radss: f64,

    /// Output torque from the measured motor current.
    ///
    /// Units: newton meters
    pub output_torque_nm: f64,

    pub gear_ratio: f64,

    /// Motor torque sent to the driver, zero for position commands.
    ///
    /// Units: newton meters
    pub motor_torque_cmd_nm: f64,

    pub thermal: ThermalReport,
}

/// Status report for ExoCtrl processing.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq)]
pub struct StatusReport {
    pub torque_ctrl: torque_ctrl::StatusReport,

    /// Time between the last two driver samples.
    ///
    /// Units: seconds
    pub sample_dt_s: f64,

    /// The driver was updated again within a quarter of a tick.
    pub reupdated: bool,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// What the actuator should do this tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Demand {
    /// Track an output torque.
    ///
    /// Units: newton meters, positive is plantarflexion
    Torque(f64),

    /// Hold an output angle, optionally leaving the belt slack.
    ///
    /// Units: radians
    Angle {
        output_angle_rad: f64,
        slacked: bool
    },
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for InputData {
    fn default() -> Self {
        Self {
            demand: Demand::Torque(0.0)
        }
    }
}

impl<D: ActuatorDriver> ExoCtrl<D> {
    /// Create a new uninitialised controller owning the given driver.
    pub fn new(driver: D) -> Self {
        let params = ExoCtrlParams::default();
        Self {
            driver,
            slack_rad: params.slack_rad,
            params,
            core: None,
            last_sample_time: None,
            report: StatusReport::default(),
        }
    }

    /// Run the belt calibration procedure.
    pub fn calibrate(&mut self) -> Result<CalibReport, ExoCtrlError> {
        let core = self.core.as_mut().ok_or(ExoCtrlError::NotInitialised)?;

        let report = calib::calibrate(
            &mut self.driver,
            &mut core.kinematics,
            &self.params.calib
        )?;

        Ok(report)
    }

    /// Set the output-side slack left by slacked position commands.
    ///
    /// Units: radians
    pub fn set_slack(&mut self, slack_rad: f64) {
        self.slack_rad = slack_rad;
    }

    pub fn slack_rad(&self) -> f64 {
        self.slack_rad
    }

    pub fn is_aligned(&self) -> bool {
        self.core.as_ref().map_or(false, |c| c.kinematics.is_aligned())
    }

    /// The most recent driver sample.
    pub fn actuator_state(&self) -> Result<&ActuatorState, ExoCtrlError> {
        Ok(self.driver.state()?)
    }

    pub fn kinematics(&self) -> Option<&KinematicTransform> {
        self.core.as_ref().map(|c| &c.kinematics)
    }

    pub fn thermal(&self) -> Option<&ThermalModel> {
        self.core.as_ref().map(|c| &c.thermal)
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    pub fn params(&self) -> &ExoCtrlParams {
        &self.params
    }

    pub fn report(&self) -> &StatusReport {
        &self.report
    }

    /// Transmission regime at the most recent sample, `None` if not yet known.
    pub fn regime(&self) -> Option<Regime> {
        let kin = self.kinematics()?;
        let state = self.driver.state().ok()?;
        kin.regime(kin.output_angle(state.output_encoder_counts)).ok()
    }

    /// Time since the previous sample, warning if the driver has been updated again too soon.
    fn sample_dt(&mut self, timestamp: &DateTime<Utc>) -> f64 {
        let period = self.params.tick_period_s;

        let dt = match self.last_sample_time {
            Some(ref prev) => seconds_between(prev, timestamp).unwrap_or(0.0),
            None => period
        };
        self.last_sample_time = Some(*timestamp);

        self.report.sample_dt_s = dt;
        self.report.reupdated = dt.abs() < 0.25 * period;
        if self.report.reupdated {
            warn!(
                "Actuator updated twice within a quarter of a tick ({:.6} s apart)",
                dt
            );
        }

        dt
    }
}

impl<D: ActuatorDriver> State for ExoCtrl<D> {
    type InitData = InitData;
    type InitError = ExoCtrlError;

    type InputData = InputData;
    type OutputData = OutputData;
    type StatusReport = StatusReport;
    type ProcError = ExoCtrlError;

    /// Initialise ExoCtrl and start the driver streaming.
    fn init(&mut self, init_data: Self::InitData) -> Result<(), Self::InitError> {
        init_data.params.validate()?;

        let kinematics = KinematicTransform::new(
            init_data.params.kinematics.clone(),
            init_data.calibration
        )?;

        self.core = Some(Core {
            kinematics,
            torque_ctrl: TorqueCtrl::new(init_data.params.torque_ctrl.clone()),
            thermal: ThermalModel::new(init_data.params.thermal.clone()),
        });

        self.driver.start_streaming(init_data.params.tick_freq_hz())?;

        self.slack_rad = init_data.params.slack_rad;
        self.params = init_data.params;
        self.last_sample_time = None;

        Ok(())
    }

    /// Perform one control tick.
    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>
    {
        match self.core {
            None => return Err(ExoCtrlError::NotInitialised),
            Some(ref c) if !c.kinematics.is_aligned() => return Err(ExoCtrlError::NotAligned),
            _ => ()
        }

        // ---- SENSE ----

        let state = self.driver.update()?;
        let dt_s = self.sample_dt(&state.timestamp);
        self.report.torque_ctrl = torque_ctrl::StatusReport::default();

        let core = self.core.as_mut().ok_or(ExoCtrlError::NotInitialised)?;

        let output_angle_rad = core.kinematics.output_angle(state.output_encoder_counts);
        let gear_ratio = core.kinematics.gear_ratio(output_angle_rad)?;

        let mut output = OutputData {
            output_angle_rad,
            output_velocity_rads: div_gear(state.motor_velocity_rads, gear_ratio),
            output_accel_radss: div_gear(state.motor_accel_radss, gear_ratio),
            output_torque_nm: state.motor_current_a
                * core.torque_ctrl.params().kt_nm_per_a
                * gear_ratio,
            gear_ratio,
            ..Default::default()
        };

        // ---- COMMAND ----

        match input_data.demand {
            Demand::Torque(desired_nm) => {
                if self.driver.control_mode() != ControlMode::Current {
                    self.driver.set_control_mode(ControlMode::Current)?;
                }

                let (demand_nm, mut report) = core.torque_ctrl.demand(desired_nm, gear_ratio)?;
                let scale = core.thermal.update_and_get_scale(
                    dt_s,
                    core.torque_ctrl.current_for(demand_nm)
                );
                let cmd_nm = core.torque_ctrl.derate(demand_nm, scale, &mut report);

                self.driver.set_motor_torque_nm(cmd_nm)?;

                output.motor_torque_cmd_nm = cmd_nm;
                self.report.torque_ctrl = report;
            },
            Demand::Angle { output_angle_rad: target_rad, slacked } => {
                if self.driver.control_mode() != ControlMode::Position {
                    self.driver.set_control_mode(ControlMode::Position)?;
                }

                let target_rad = slacked_target(target_rad, slacked, self.slack_rad, gear_ratio);
                let motor_angle_rad = core.kinematics.desired_motor_angle(target_rad)?;

                self.driver.set_motor_angle_rad(motor_angle_rad)?;

                core.thermal.update_only(dt_s, state.motor_current_a);
            }
        }

        output.thermal = core.thermal.report();

        trace!("ExoCtrl output: {:?}", output);

        Ok((output, self.report))
    }
}

impl OutputData {
    /// Pack into the state vector shared with the high level controller.
    pub fn to_synch(&self, desired_output_torque_nm: f64) -> ExoSynchData {
        ExoSynchData {
            output_angle_rad: self.output_angle_rad,
            output_velocity_rads: self.output_velocity_rads,
            output_torque_nm: self.output_torque_nm,
            gear_ratio: self.gear_ratio,
            thermal_scale: self.thermal.derating_scale,
            winding_temp_c: self.thermal.winding_temp_c,
            case_temp_c: self.thermal.case_temp_c,
            desired_output_torque_nm,
        }
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Divide a motor-side quantity by the gear ratio, zero when the gear ratio is zero.
fn div_gear(motor_side: f64, gear_ratio: f64) -> f64 {
    if gear_ratio == 0.0 {
        0.0
    }
    else {
        motor_side / gear_ratio
    }
}

/// Output angle to command, leaving the belt slack in the direction the motor pulls.
fn slacked_target(angle_rad: f64, slacked: bool, slack_rad: f64, gear_ratio: f64) -> f64 {
    match (slacked, gear_ratio >= 0.0) {
        (false, _) => angle_rad,
        (true, true) => angle_rad + slack_rad,
        (true, false) => angle_rad - slack_rad
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::driver::{SimDriver, SimParams};

    fn deg(d: f64) -> f64 {
        d.to_radians()
    }

    fn init_data() -> InitData {
        let mut params = ExoCtrlParams::default();
        params.calib.poll_period_s = 0.0;

        InitData {
            params,
            calibration: KinematicCalibration::default()
        }
    }

    /// Initialised and calibrated controller with the ankle at the given angle.
    fn ready(ankle_deg: f64) -> ExoCtrl<SimDriver> {
        let mut ctrl = ExoCtrl::new(SimDriver::new(SimParams {
            output_angle_rad: deg(ankle_deg),
            slack_rad: 0.5,
            ..Default::default()
        }));
        ctrl.init(init_data()).unwrap();
        ctrl.calibrate().unwrap();
        ctrl
    }

    fn torque(nm: f64) -> InputData {
        InputData {
            demand: Demand::Torque(nm)
        }
    }

    #[test]
    fn test_preconditions() {
        let mut ctrl = ExoCtrl::new(SimDriver::new(SimParams::default()));

        assert!(matches!(ctrl.proc(&torque(1.0)), Err(ExoCtrlError::NotInitialised)));
        assert!(matches!(ctrl.calibrate(), Err(ExoCtrlError::NotInitialised)));
        assert!(matches!(
            ctrl.actuator_state(),
            Err(ExoCtrlError::DriverError(crate::driver::DriverError::NotYetUpdated))
        ));

        ctrl.init(init_data()).unwrap();
        assert!(!ctrl.is_aligned());
        assert!(matches!(ctrl.proc(&torque(1.0)), Err(ExoCtrlError::NotAligned)));

        ctrl.calibrate().unwrap();
        assert!(ctrl.is_aligned());
        assert!(ctrl.proc(&torque(1.0)).is_ok());
    }

    #[test]
    fn test_invalid_params() {
        let mut ctrl = ExoCtrl::new(SimDriver::new(SimParams::default()));
        let mut data = init_data();
        data.params.tick_period_s = 0.0;

        assert!(matches!(ctrl.init(data), Err(ExoCtrlError::InvalidParams(_))));
    }

    #[test]
    fn test_torque_tick() -> Result<(), ExoCtrlError> {
        let mut ctrl = ready(100.0);

        let (out, report) = ctrl.proc(&torque(10.0))?;
        assert!((out.gear_ratio - 14.754).abs() < 1e-6);
        assert!((out.output_angle_rad - deg(100.0)).abs() < 1e-3);
        assert!((out.motor_torque_cmd_nm - 10.0 / out.gear_ratio).abs() < 1e-12);
        assert_eq!(ctrl.driver().torque_cmd_nm(), out.motor_torque_cmd_nm);
        assert_eq!(ctrl.driver().control_mode(), ControlMode::Current);
        assert!(!report.torque_ctrl.rejected);
        assert!(!report.reupdated);

        // The driver reports the current for the previous command on the next tick
        let (out2, _) = ctrl.proc(&torque(10.0))?;
        assert!((out2.output_torque_nm - 10.0).abs() < 1e-9);

        // Wrong direction
        let (out, report) = ctrl.proc(&torque(-1.0))?;
        assert_eq!(out.motor_torque_cmd_nm, 0.0);
        assert!(report.torque_ctrl.rejected);

        Ok(())
    }

    #[test]
    fn test_tension_when_reversed() -> Result<(), ExoCtrlError> {
        let mut ctrl = ready(100.0);

        ctrl.driver_mut().set_output_angle_rad(deg(165.0));
        let (out, report) = ctrl.proc(&torque(5.0))?;

        assert!(out.gear_ratio < 0.0);
        assert_eq!(out.motor_torque_cmd_nm, ctrl.params().torque_ctrl.tension_motor_torque_nm);
        assert!(report.torque_ctrl.tensioning);
        assert_eq!(ctrl.regime(), Some(Regime::Reversed));

        Ok(())
    }

    #[test]
    fn test_angle_tick() -> Result<(), ExoCtrlError> {
        let mut ctrl = ready(100.0);
        ctrl.set_slack(deg(2.0));

        let target = deg(95.0);
        ctrl.proc(&InputData {
            demand: Demand::Angle {
                output_angle_rad: target,
                slacked: true
            }
        })?;

        // Positive gear ratio so the target moves up by the slack
        let kin = ctrl.kinematics().ok_or(ExoCtrlError::NotInitialised)?;
        let expected = kin.desired_motor_angle(target + deg(2.0))?;
        assert_eq!(ctrl.driver().angle_cmd_rad(), Some(expected));
        assert_eq!(ctrl.driver().control_mode(), ControlMode::Position);

        Ok(())
    }

    #[test]
    fn test_slacked_target() {
        assert_eq!(slacked_target(1.0, false, 0.1, -5.0), 1.0);
        assert_eq!(slacked_target(1.0, true, 0.1, 5.0), 1.1);
        assert_eq!(slacked_target(1.0, true, 0.1, 0.0), 1.1);
        assert_eq!(slacked_target(1.0, true, 0.1, -5.0), 0.9);
    }

    #[test]
    fn test_reupdate_flagged() -> Result<(), ExoCtrlError> {
        let mut ctrl = ready(100.0);

        // Driver streaming ten times faster than the tick
        ctrl.driver_mut().start_streaming(1000.0)?;
        ctrl.proc(&torque(0.0))?;
        let (_, report) = ctrl.proc(&torque(0.0))?;

        assert!(report.reupdated);
        assert!((report.sample_dt_s - 0.001).abs() < 1e-6);

        Ok(())
    }

    #[test]
    fn test_sustained_torque_derates() -> Result<(), ExoCtrlError> {
        let mut ctrl = ready(100.0);
        let max_nm = ctrl.params().torque_ctrl.max_motor_torque_nm();

        let mut last = OutputData::default();
        let mut limited = false;
        for _ in 0..3000 {
            let (out, report) = ctrl.proc(&torque(1000.0))?;
            limited |= report.torque_ctrl.thermally_limited;
            last = out;
        }

        assert!(limited);
        assert!(last.thermal.derating_scale < 1.0);
        assert!(last.motor_torque_cmd_nm < max_nm);
        assert!(last.thermal.winding_temp_c < ctrl.params().thermal.winding_limit_c);

        Ok(())
    }

    #[test]
    fn test_to_synch() {
        let out = OutputData {
            output_angle_rad: 1.5,
            gear_ratio: 14.754,
            thermal: ThermalReport {
                winding_temp_c: 40.0,
                case_temp_c: 30.0,
                derating_scale: 1.0
            },
            ..Default::default()
        };

        let data = out.to_synch(12.0);
        assert_eq!(data.output_angle_rad, 1.5);
        assert_eq!(data.gear_ratio, 14.754);
        assert_eq!(data.winding_temp_c, 40.0);
        assert_eq!(data.desired_output_torque_nm, 12.0);
    }
}
