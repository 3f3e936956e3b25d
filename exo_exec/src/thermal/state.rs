//! Implementations for the thermal model state

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::debug;
use serde::Serialize;

use util::maths::lin_map;

use super::ThermalParams;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Thermal model state.
#[derive(Debug, Clone)]
pub struct ThermalModel {
    params: ThermalParams,

    /// Units: degrees celsius
    winding_temp_c: f64,

    /// Units: degrees celsius
    case_temp_c: f64,
}

/// Snapshot of the model, used for telemetry.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq)]
pub struct ThermalReport {
    pub winding_temp_c: f64,
    pub case_temp_c: f64,
    pub derating_scale: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ThermalModel {
    /// Create a new model with both nodes at ambient temperature.
    pub fn new(params: ThermalParams) -> Self {
        Self {
            winding_temp_c: params.ambient_temp_c,
            case_temp_c: params.ambient_temp_c,
            params,
        }
    }

    /// Advance the model with the given current, without any derating.
    ///
    /// Units: `dt_s` in seconds, `current_a` in amps
    pub fn update_only(&mut self, dt_s: f64, current_a: f64) {
        let heating_w = self.heating_w(current_a);
        self.integrate(dt_s, heating_w);
    }

    /// Advance the model with the desired current derated by the current temperatures, and
    /// return the scale to apply to the torque command.
    ///
    /// The heating used here is inflated by the factor of safety. The returned value is the
    /// square root of the power scale, clamped to `[0, 1]`.
    pub fn update_and_get_scale(&mut self, dt_s: f64, desired_current_a: f64) -> f64 {
        let power_scale = self.power_scale();

        let heating_w = self.params.factor_of_safety
            * self.heating_w(desired_current_a)
            * power_scale;
        self.integrate(dt_s, heating_w);

        power_scale.sqrt()
    }

    /// Fraction of the desired heating power currently allowed, the minimum over both nodes.
    pub fn power_scale(&self) -> f64 {
        let winding = node_scale(
            self.winding_temp_c,
            self.params.winding_soft_limit_c(),
            self.params.winding_limit_c
        );
        let case = node_scale(
            self.case_temp_c,
            self.params.case_soft_limit_c(),
            self.params.case_limit_c
        );

        winding.min(case)
    }

    /// Torque scale corresponding to the current temperatures.
    pub fn derating_scale(&self) -> f64 {
        self.power_scale().sqrt()
    }

    /// Winding resistance at the current winding temperature.
    ///
    /// Units: ohms
    pub fn winding_resistance_ohm(&self) -> f64 {
        self.params.reference_resistance_ohm
            * (1.0 + self.params.resistance_temp_coeff_per_k
                * (self.winding_temp_c - self.params.reference_temp_c))
    }

    pub fn winding_temp_c(&self) -> f64 {
        self.winding_temp_c
    }

    pub fn case_temp_c(&self) -> f64 {
        self.case_temp_c
    }

    pub fn params(&self) -> &ThermalParams {
        &self.params
    }

    pub fn report(&self) -> ThermalReport {
        ThermalReport {
            winding_temp_c: self.winding_temp_c,
            case_temp_c: self.case_temp_c,
            derating_scale: self.derating_scale(),
        }
    }

    /// Ohmic heating in the winding.
    ///
    /// Units: watts
    fn heating_w(&self, current_a: f64) -> f64 {
        current_a * current_a * self.winding_resistance_ohm()
    }

    /// One explicit Euler step of the two node network.
    fn integrate(&mut self, dt_s: f64, heating_w: f64) {
        if !(dt_s > 0.0) || !heating_w.is_finite() {
            debug!("Thermal model not advanced (dt = {} s, heating = {} W)", dt_s, heating_w);
            return;
        }

        let p = &self.params;
        let tw = self.winding_temp_c;
        let tc = self.case_temp_c;

        let d_tw = (heating_w + (tc - tw) / p.winding_case_resistance_k_per_w)
            / p.winding_capacity_j_per_k;
        let d_tc = ((tw - tc) / p.winding_case_resistance_k_per_w
            + (p.ambient_temp_c - tc) / p.case_ambient_resistance_k_per_w)
            / p.case_capacity_j_per_k;

        self.winding_temp_c += dt_s * d_tw;
        self.case_temp_c += dt_s * d_tc;
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Linear derating of one node: one below the soft limit, zero at or above the hard limit.
fn node_scale(temp_c: f64, soft_c: f64, hard_c: f64) -> f64 {
    if temp_c >= hard_c {
        0.0
    }
    else if temp_c > soft_c {
        lin_map((soft_c, hard_c), (1.0, 0.0), temp_c).max(0.0).min(1.0)
    }
    else {
        1.0
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    /// Current needed for 30 Nm of output torque with antagonistic friction
    const PULSE_CURRENT_A: f64 = 35.52;

    #[test]
    fn test_unticked() {
        let mut model = ThermalModel::new(ThermalParams::default());

        assert_eq!(model.winding_temp_c(), 21.0);
        assert_eq!(model.case_temp_c(), 21.0);
        assert_eq!(model.derating_scale(), 1.0);
        assert_eq!(model.update_and_get_scale(0.01, 0.0), 1.0);
    }

    #[test]
    fn test_zero_current_steady() {
        let mut model = ThermalModel::new(ThermalParams::default());

        for _ in 0..10_000 {
            model.update_only(1.0, 0.0);
        }

        assert!((model.winding_temp_c() - 21.0).abs() < 0.01);
        assert!((model.case_temp_c() - 21.0).abs() < 0.01);
    }

    #[test]
    fn test_heating() {
        let params = ThermalParams::default();
        let mut model = ThermalModel::new(params.clone());

        // At ambient the resistance is below the reference value
        let r = 0.376 * (1.0 + 0.00393 * (21.0 - 65.0));
        assert!((model.winding_resistance_ohm() - r).abs() < 1e-12);

        model.update_only(1.0, 1.0);
        let expected = 21.0 + r / params.winding_capacity_j_per_k;
        assert!((model.winding_temp_c() - expected).abs() < 1e-12);

        // Case only sees the winding on the next step
        assert_eq!(model.case_temp_c(), 21.0);
    }

    #[test]
    fn test_overcurrent_derating() {
        let mut model = ThermalModel::new(ThermalParams::default());

        let mut prev_scale = model.derating_scale();
        let mut saw_partial = false;
        let mut steps = 0;

        while model.derating_scale() > 0.0 {
            model.update_only(0.01, PULSE_CURRENT_A);

            let scale = model.derating_scale();
            assert!(scale <= prev_scale, "scale rose from {} to {}", prev_scale, scale);
            if scale > 0.0 && scale < 1.0 {
                saw_partial = true;
            }
            prev_scale = scale;

            steps += 1;
            assert!(steps < 100_000, "scale never reached zero");
        }

        assert!(saw_partial);
        assert!(model.winding_temp_c() >= 115.0);
    }

    #[test]
    fn test_closed_loop_limits() {
        let mut model = ThermalModel::new(ThermalParams::default());
        let mut min_scale: f64 = 1.0;

        for _ in 0..2000 {
            let scale = model.update_and_get_scale(0.01, PULSE_CURRENT_A);
            assert!(scale >= 0.0 && scale <= 1.0);
            min_scale = min_scale.min(scale);

            assert!(model.winding_temp_c() < 115.0);
        }

        assert!(min_scale < 1.0);
    }

    #[test]
    fn test_case_limit_dominates() {
        let params = ThermalParams::builder()
            .case_limit(30.0, 5.0)
            .build()
            .unwrap();
        let mut model = ThermalModel::new(params);

        // Heat the case slowly until it's within its soft band while the winding is still cool
        while model.case_temp_c() <= 26.0 {
            model.update_only(0.1, 5.0);
        }

        assert!(model.winding_temp_c() < 100.0);
        assert!(model.power_scale() < 1.0);
        assert!((model.derating_scale() - model.power_scale().sqrt()).abs() < 1e-12);
    }
}
