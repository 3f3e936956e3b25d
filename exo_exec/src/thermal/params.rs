//! Parameters structure for the thermal model

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::params::ParamsError;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters of the thermal model.
///
/// Defaults come from a bench characterisation of the motor without cooling fans.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ThermalParams {
    // ---- THERMAL NETWORK ----

    /// Winding heat capacity.
    ///
    /// Units: joules/kelvin
    pub winding_capacity_j_per_k: f64,

    /// Thermal resistance between the winding and the case.
    ///
    /// Units: kelvin/watt
    pub winding_case_resistance_k_per_w: f64,

    /// Case heat capacity.
    ///
    /// Units: joules/kelvin
    pub case_capacity_j_per_k: f64,

    /// Thermal resistance between the case and ambient.
    ///
    /// Units: kelvin/watt
    pub case_ambient_resistance_k_per_w: f64,

    // ---- ELECTRICAL ----

    /// Temperature coefficient of the winding resistance.
    ///
    /// Units: 1/kelvin
    pub resistance_temp_coeff_per_k: f64,

    /// Temperature at which the reference resistance was measured.
    ///
    /// Units: degrees celsius
    pub reference_temp_c: f64,

    /// Phase resistance at the reference temperature.
    ///
    /// Units: ohms
    pub reference_resistance_ohm: f64,

    // ---- LIMITS ----

    /// Units: degrees celsius
    pub ambient_temp_c: f64,

    /// Winding temperature at which the scale reaches zero.
    ///
    /// Units: degrees celsius
    pub winding_limit_c: f64,

    /// Width of the band below the winding limit over which the scale falls from one to zero.
    ///
    /// Units: degrees celsius
    pub winding_soft_border_c: f64,

    /// Units: degrees celsius
    pub case_limit_c: f64,

    /// Units: degrees celsius
    pub case_soft_border_c: f64,

    /// Multiplier on the predicted heating used when derating.
    pub factor_of_safety: f64,
}

/// Builder for [`ThermalParams`], starting from the defaults.
#[derive(Debug, Clone, Default)]
pub struct ThermalParamsBuilder {
    params: ThermalParams,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for ThermalParams {
    fn default() -> Self {
        Self {
            winding_capacity_j_per_k: 0.2 * 81.46202695970649,
            winding_case_resistance_k_per_w: 1.0702867186480716,
            case_capacity_j_per_k: 512.249065845453,
            case_ambient_resistance_k_per_w: 1.9406620046327363,
            resistance_temp_coeff_per_k: 0.00393,
            reference_temp_c: 65.0,
            reference_resistance_ohm: 0.376,
            ambient_temp_c: 21.0,
            winding_limit_c: 115.0,
            winding_soft_border_c: 15.0,
            case_limit_c: 80.0,
            case_soft_border_c: 5.0,
            factor_of_safety: 3.0,
        }
    }
}

impl ThermalParams {
    pub fn builder() -> ThermalParamsBuilder {
        ThermalParamsBuilder::default()
    }

    /// Winding temperature at which derating begins.
    pub fn winding_soft_limit_c(&self) -> f64 {
        self.winding_limit_c - self.winding_soft_border_c
    }

    /// Case temperature at which derating begins.
    pub fn case_soft_limit_c(&self) -> f64 {
        self.case_limit_c - self.case_soft_border_c
    }

    /// Determines if the parameters are valid.
    pub fn validate(&self) -> Result<(), ParamsError> {
        let positive = [
            ("thermal.winding_capacity_j_per_k", self.winding_capacity_j_per_k),
            ("thermal.winding_case_resistance_k_per_w", self.winding_case_resistance_k_per_w),
            ("thermal.case_capacity_j_per_k", self.case_capacity_j_per_k),
            ("thermal.case_ambient_resistance_k_per_w", self.case_ambient_resistance_k_per_w),
            ("thermal.reference_resistance_ohm", self.reference_resistance_ohm),
            ("thermal.winding_soft_border_c", self.winding_soft_border_c),
            ("thermal.case_soft_border_c", self.case_soft_border_c),
            ("thermal.factor_of_safety", self.factor_of_safety),
        ];
        for &(name, val) in positive.iter() {
            if !(val > 0.0) || !val.is_finite() {
                return Err(ParamsError::NotPositive(name, val));
            }
        }

        for &(name, val) in [
            ("thermal.resistance_temp_coeff_per_k", self.resistance_temp_coeff_per_k),
            ("thermal.reference_temp_c", self.reference_temp_c),
        ].iter() {
            if !val.is_finite() {
                return Err(ParamsError::NotFinite(name, val));
            }
        }

        if !(self.winding_soft_limit_c() > self.ambient_temp_c) {
            return Err(ParamsError::Inconsistent(format!(
                "winding soft limit ({} C) must be above ambient ({} C)",
                self.winding_soft_limit_c(), self.ambient_temp_c
            )));
        }
        if !(self.case_soft_limit_c() > self.ambient_temp_c) {
            return Err(ParamsError::Inconsistent(format!(
                "case soft limit ({} C) must be above ambient ({} C)",
                self.case_soft_limit_c(), self.ambient_temp_c
            )));
        }

        Ok(())
    }
}

impl ThermalParamsBuilder {
    pub fn ambient_temp_c(mut self, temp_c: f64) -> Self {
        self.params.ambient_temp_c = temp_c;
        self
    }

    pub fn winding_limit(mut self, limit_c: f64, soft_border_c: f64) -> Self {
        self.params.winding_limit_c = limit_c;
        self.params.winding_soft_border_c = soft_border_c;
        self
    }

    pub fn case_limit(mut self, limit_c: f64, soft_border_c: f64) -> Self {
        self.params.case_limit_c = limit_c;
        self.params.case_soft_border_c = soft_border_c;
        self
    }

    pub fn factor_of_safety(mut self, fos: f64) -> Self {
        self.params.factor_of_safety = fos;
        self
    }

    pub fn capacities(mut self, winding_j_per_k: f64, case_j_per_k: f64) -> Self {
        self.params.winding_capacity_j_per_k = winding_j_per_k;
        self.params.case_capacity_j_per_k = case_j_per_k;
        self
    }

    pub fn resistances(mut self, winding_case_k_per_w: f64, case_ambient_k_per_w: f64) -> Self {
        self.params.winding_case_resistance_k_per_w = winding_case_k_per_w;
        self.params.case_ambient_resistance_k_per_w = case_ambient_k_per_w;
        self
    }

    pub fn electrical(mut self, ref_resistance_ohm: f64, ref_temp_c: f64, alpha_per_k: f64) -> Self {
        self.params.reference_resistance_ohm = ref_resistance_ohm;
        self.params.reference_temp_c = ref_temp_c;
        self.params.resistance_temp_coeff_per_k = alpha_per_k;
        self
    }

    /// Validate and return the parameters.
    pub fn build(self) -> Result<ThermalParams, ParamsError> {
        self.params.validate()?;
        Ok(self.params)
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_builder() -> Result<(), ParamsError> {
        let params = ThermalParams::builder()
            .ambient_temp_c(25.0)
            .winding_limit(100.0, 10.0)
            .build()?;

        assert_eq!(params.ambient_temp_c, 25.0);
        assert_eq!(params.winding_soft_limit_c(), 90.0);
        assert_eq!(params.case_soft_limit_c(), 75.0);
        assert_eq!(params.factor_of_safety, 3.0);

        Ok(())
    }

    #[test]
    fn test_validate() {
        assert!(ThermalParams::default().validate().is_ok());

        assert!(matches!(
            ThermalParams::builder().capacities(0.0, 512.0).build(),
            Err(ParamsError::NotPositive("thermal.winding_capacity_j_per_k", _))
        ));
        assert!(matches!(
            ThermalParams::builder().case_limit(30.0, 10.0).build(),
            Err(ParamsError::Inconsistent(_))
        ));
        assert!(matches!(
            ThermalParams::builder().factor_of_safety(f64::NAN).build(),
            Err(ParamsError::NotPositive(..))
        ));
    }

    #[test]
    fn test_partial_toml() {
        let params: ThermalParams = toml::from_str("ambient_temp_c = 30.0").unwrap();
        assert_eq!(params.ambient_temp_c, 30.0);
        assert_eq!(params.winding_limit_c, 115.0);
    }
}
