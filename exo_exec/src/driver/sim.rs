//! # Simulated actuator driver
//!
//! Deterministic stand-in for the vendor driver. Each update advances simulated time by one
//! streaming period. The output (ankle) angle follows an optional sinusoid, the motor responds to
//! commands according to the current control mode, and the belt has a fixed amount of motor-side
//! slack which has to be wound in under positive voltage before the motor stalls.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use chrono::{DateTime, Duration, Utc};
use log::trace;
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

use super::{ActuatorDriver, ActuatorState, ControlMode, DriverError};
use crate::kinematics::ENCODER_COUNTS_PER_REV;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters of the simulated actuator.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct SimParams {
    /// Initial output angle.
    ///
    /// Units: radians
    pub output_angle_rad: f64,

    /// Amplitude of the sinusoidal output motion, zero holds the output still.
    ///
    /// Units: radians
    pub output_amplitude_rad: f64,

    /// Units: hertz
    pub output_frequency_hz: f64,

    /// Initial motor angle.
    ///
    /// Units: radians
    pub motor_angle_rad: f64,

    /// Belt slack to be wound in before the motor stalls.
    ///
    /// Units: radians (motor side)
    pub slack_rad: f64,

    /// Motor speed while winding in slack.
    ///
    /// Units: radians/second/volt
    pub winding_rate_rads_per_v: f64,

    /// Current drawn while the motor is free to turn.
    ///
    /// Units: amps
    pub free_current_a: f64,

    /// Current drawn once the motor has stalled against the tensioned belt.
    ///
    /// Units: amps/volt
    pub stall_current_a_per_v: f64,

    /// Torque constant used to convert torque commands into current.
    ///
    /// Units: newton meters/amp
    pub kt_nm_per_a: f64,

    /// If true the output encoder is mounted mirrored, as on a left limb.
    pub mirrored_encoder: bool,
}

/// Simulated actuator driver.
pub struct SimDriver {
    params: SimParams,

    streaming: bool,
    step_s: f64,
    start_time: DateTime<Utc>,
    time_s: f64,

    mode: ControlMode,
    voltage_mv: f64,
    torque_nm: f64,
    angle_target_rad: Option<f64>,

    motor_angle_rad: f64,
    motor_velocity_rads: f64,
    wound_rad: f64,

    state: Option<ActuatorState>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for SimParams {
    fn default() -> Self {
        Self {
            output_angle_rad: 90f64.to_radians(),
            output_amplitude_rad: 0.0,
            output_frequency_hz: 1.0,
            motor_angle_rad: 0.0,
            slack_rad: 2.0,
            winding_rate_rads_per_v: 20.0,
            free_current_a: 0.2,
            stall_current_a_per_v: 3.0,
            kt_nm_per_a: 0.146,
            mirrored_encoder: false,
        }
    }
}

impl SimDriver {
    pub fn new(params: SimParams) -> Self {
        Self {
            motor_angle_rad: params.motor_angle_rad,
            params,
            streaming: false,
            step_s: 0.0,
            start_time: Utc::now(),
            time_s: 0.0,
            mode: ControlMode::Current,
            voltage_mv: 0.0,
            torque_nm: 0.0,
            angle_target_rad: None,
            motor_velocity_rads: 0.0,
            wound_rad: 0.0,
            state: None,
        }
    }

    /// Move the simulated output to a new rest angle.
    pub fn set_output_angle_rad(&mut self, angle_rad: f64) {
        self.params.output_angle_rad = angle_rad;
    }

    /// The last torque command sent to the motor.
    pub fn torque_cmd_nm(&self) -> f64 {
        self.torque_nm
    }

    /// The last angle command sent to the motor, if any.
    pub fn angle_cmd_rad(&self) -> Option<f64> {
        self.angle_target_rad
    }

    /// The last voltage command sent to the motor.
    pub fn voltage_cmd_mv(&self) -> f64 {
        self.voltage_mv
    }

    /// True output angle at the current simulation time.
    fn output_angle_rad(&self) -> f64 {
        self.params.output_angle_rad
            + self.params.output_amplitude_rad
            * (TAU * self.params.output_frequency_hz * self.time_s).sin()
    }

    fn encoder_counts(&self) -> u32 {
        let mut angle = self.output_angle_rad();
        if self.params.mirrored_encoder {
            angle = TAU - angle;
        }

        let counts = (angle / TAU * ENCODER_COUNTS_PER_REV).round() as i64;
        counts.rem_euclid(ENCODER_COUNTS_PER_REV as i64) as u32
    }

    /// Advance the motor by one step, returning the current it draws.
    fn step_motor(&mut self) -> f64 {
        match self.mode {
            ControlMode::Voltage => {
                let volts = self.voltage_mv * 1e-3;
                let remaining = self.params.slack_rad - self.wound_rad;

                if volts <= 0.0 {
                    0.0
                }
                else if remaining > 0.0 {
                    let delta = (self.params.winding_rate_rads_per_v * volts * self.step_s)
                        .min(remaining);
                    self.wound_rad += delta;
                    self.motor_angle_rad += delta;
                    self.params.free_current_a
                }
                else {
                    self.params.stall_current_a_per_v * volts
                }
            },
            ControlMode::Current => self.torque_nm / self.params.kt_nm_per_a,
            ControlMode::Position => {
                if let Some(target) = self.angle_target_rad {
                    self.motor_angle_rad = target;
                }
                0.0
            }
        }
    }
}

impl ActuatorDriver for SimDriver {
    fn start_streaming(&mut self, freq_hz: f64) -> Result<(), DriverError> {
        self.step_s = 1.0 / freq_hz;
        self.start_time = Utc::now();
        self.streaming = true;
        Ok(())
    }

    fn update(&mut self) -> Result<ActuatorState, DriverError> {
        if !self.streaming {
            return Err(DriverError::NotStreaming);
        }

        self.time_s += self.step_s;

        let prev_angle = self.motor_angle_rad;
        let prev_velocity = self.motor_velocity_rads;
        let motor_current_a = self.step_motor();

        self.motor_velocity_rads = (self.motor_angle_rad - prev_angle) / self.step_s;

        let state = ActuatorState {
            motor_angle_rad: self.motor_angle_rad,
            motor_velocity_rads: self.motor_velocity_rads,
            motor_accel_radss: (self.motor_velocity_rads - prev_velocity) / self.step_s,
            motor_current_a,
            output_encoder_counts: self.encoder_counts(),
            timestamp: self.start_time
                + Duration::nanoseconds((self.time_s * 1e9).round() as i64),
        };

        trace!("SimDriver state: {:?}", state);

        self.state = Some(state);
        Ok(state)
    }

    fn state(&self) -> Result<&ActuatorState, DriverError> {
        self.state.as_ref().ok_or(DriverError::NotYetUpdated)
    }

    fn control_mode(&self) -> ControlMode {
        self.mode
    }

    fn set_control_mode(&mut self, mode: ControlMode) -> Result<(), DriverError> {
        if mode != self.mode {
            // Clear any demand from the previous mode
            self.voltage_mv = 0.0;
            self.torque_nm = 0.0;
            self.angle_target_rad = None;
            self.mode = mode;
        }
        Ok(())
    }

    fn set_motor_angle_rad(&mut self, angle_rad: f64) -> Result<(), DriverError> {
        if self.mode != ControlMode::Position {
            return Err(DriverError::WrongMode("angle", self.mode));
        }
        if !angle_rad.is_finite() {
            return Err(DriverError::NonFiniteCommand("angle", angle_rad));
        }
        self.angle_target_rad = Some(angle_rad);
        Ok(())
    }

    fn set_motor_voltage_mv(&mut self, voltage_mv: f64) -> Result<(), DriverError> {
        if self.mode != ControlMode::Voltage {
            return Err(DriverError::WrongMode("voltage", self.mode));
        }
        if !voltage_mv.is_finite() {
            return Err(DriverError::NonFiniteCommand("voltage", voltage_mv));
        }
        self.voltage_mv = voltage_mv;
        Ok(())
    }

    fn set_motor_torque_nm(&mut self, torque_nm: f64) -> Result<(), DriverError> {
        if self.mode != ControlMode::Current {
            return Err(DriverError::WrongMode("torque", self.mode));
        }
        if !torque_nm.is_finite() {
            return Err(DriverError::NonFiniteCommand("torque", torque_nm));
        }
        self.torque_nm = torque_nm;
        Ok(())
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
