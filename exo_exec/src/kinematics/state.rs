//! Implementations for the kinematic transform

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::warn;
use std::f64::consts::TAU;

use super::{
    KinematicCalibration, KinematicsError, KinematicsParams, LimbSide, Regime,
    ENCODER_COUNTS_PER_REV
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Piecewise transform between output angle and motor angle for one actuator.
#[derive(Debug, Clone)]
pub struct KinematicTransform {
    params: KinematicsParams,

    calib: KinematicCalibration,

    /// Motor angle offset found by calibration, `None` until the belt has been tensioned.
    offset_rad: Option<f64>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl KinematicTransform {
    /// Create a new transform, checking the calibration.
    ///
    /// Inconsistencies in the calibration coefficients are reported as warnings, only invalid
    /// breakpoints are rejected.
    pub fn new(
        params: KinematicsParams,
        calib: KinematicCalibration
    ) -> Result<Self, KinematicsError> {
        calib.validate()?;

        for issue in calib.consistency_issues(
            params.continuity_tolerance_rad,
            params.gear_ratio_tolerance
        ) {
            warn!("Kinematic calibration: {}", issue);
        }

        Ok(Self {
            params,
            calib,
            offset_rad: None
        })
    }

    /// Convert a raw output encoder reading into the output angle.
    pub fn output_angle(&self, encoder_counts: u32) -> f64 {
        let raw = encoder_counts as f64 * TAU / ENCODER_COUNTS_PER_REV;

        match self.params.side {
            LimbSide::Right => raw,
            LimbSide::Left => TAU - raw
        }
    }

    /// Find the regime containing the given output angle.
    pub fn regime(&self, output_angle_rad: f64) -> Result<Regime, KinematicsError> {
        let b = &self.calib.breakpoints_rad;
        let eps = self.params.edge_tolerance_rad;
        let a = output_angle_rad;

        if a >= b[0] - eps && a < b[1] {
            Ok(Regime::Wound)
        }
        else if a >= b[1] && a < b[2] {
            Ok(Regime::Transition)
        }
        else if a >= b[2] && a < b[3] + eps {
            Ok(Regime::Reversed)
        }
        else {
            Err(KinematicsError::OutOfRange(output_angle_rad))
        }
    }

    /// Motor angle at the given output angle with the belt just tensioned, not including the
    /// calibration offset.
    pub fn slackless_motor_angle(&self, output_angle_rad: f64) -> Result<f64, KinematicsError> {
        let regime = self.regime(output_angle_rad)?;
        Ok(self.calib.motor_angle(regime, output_angle_rad))
    }

    /// Motor angle which places the output at the given angle.
    pub fn desired_motor_angle(&self, output_angle_rad: f64) -> Result<f64, KinematicsError> {
        let offset = self.offset_rad.ok_or(KinematicsError::NotAligned)?;
        Ok(self.slackless_motor_angle(output_angle_rad)? + offset)
    }

    /// Gear ratio (d motor angle / d output angle) at the given output angle.
    pub fn gear_ratio(&self, output_angle_rad: f64) -> Result<f64, KinematicsError> {
        let regime = self.regime(output_angle_rad)?;
        Ok(self.calib.motor_angle_deriv(regime, output_angle_rad))
    }

    /// Output angle at which the gear ratio changes sign, from the transition regime's fit.
    pub fn inflection_angle(&self) -> f64 {
        let [a, b, _] = self.calib.angle_fits[Regime::Transition.index()];
        self.calib.lower_breakpoint(Regime::Transition) - b / (2.0 * a)
    }

    pub fn offset_rad(&self) -> Option<f64> {
        self.offset_rad
    }

    pub fn is_aligned(&self) -> bool {
        self.offset_rad.is_some()
    }

    /// Record the calibration offset, marking the transform as aligned.
    pub(crate) fn set_offset(&mut self, offset_rad: f64) {
        self.offset_rad = Some(offset_rad);
    }

    /// Forget the calibration offset.
    pub(crate) fn clear_offset(&mut self) {
        self.offset_rad = None;
    }

    pub fn calibration(&self) -> &KinematicCalibration {
        &self.calib
    }

    pub fn params(&self) -> &KinematicsParams {
        &self.params
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    fn eb51() -> KinematicTransform {
        KinematicTransform::new(
            KinematicsParams::default(),
            KinematicCalibration::default()
        ).unwrap()
    }

    fn deg(d: f64) -> f64 {
        d.to_radians()
    }

    #[test]
    fn test_output_angle() {
        let right = eb51();
        assert_eq!(right.output_angle(0), 0.0);
        assert!((right.output_angle(4096) - TAU / 4.0).abs() < 1e-12);

        let left = KinematicTransform::new(
            KinematicsParams {
                side: LimbSide::Left,
                ..Default::default()
            },
            KinematicCalibration::default()
        ).unwrap();
        assert!((left.output_angle(4096) - 3.0 * TAU / 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_regimes() {
        let kin = eb51();

        assert_eq!(kin.regime(deg(33.0)).unwrap(), Regime::Wound);
        assert_eq!(kin.regime(deg(117.9)).unwrap(), Regime::Wound);
        assert_eq!(kin.regime(deg(118.0)).unwrap(), Regime::Transition);
        assert_eq!(kin.regime(deg(152.0)).unwrap(), Regime::Reversed);
        assert_eq!(kin.regime(deg(180.0)).unwrap(), Regime::Reversed);

        // Within the edge tolerance
        assert_eq!(kin.regime(deg(32.5)).unwrap(), Regime::Wound);
        assert_eq!(kin.regime(deg(180.5)).unwrap(), Regime::Reversed);

        // Outside of all regimes
        assert!(matches!(kin.regime(deg(20.0)), Err(KinematicsError::OutOfRange(_))));
        assert!(matches!(kin.gear_ratio(deg(200.0)), Err(KinematicsError::OutOfRange(_))));
        assert!(matches!(kin.regime(f64::NAN), Err(KinematicsError::OutOfRange(_))));
    }

    #[test]
    fn test_bench_fit() {
        let kin = eb51();

        // Motor angles from the bench fit, in degrees
        let cases = [
            (33.0, -1001.518),
            (118.0, 252.537),
            (130.0, -0.362 * 144.0 + 14.754 * 12.0 + 252.537),
            (160.0, -9.853 * 8.0 + 335.842),
        ];
        for &(ank, mot) in cases.iter() {
            let m = kin.slackless_motor_angle(deg(ank)).unwrap();
            assert!((m - deg(mot)).abs() < 1e-9, "{} deg: {} != {}", ank, m, deg(mot));
        }

        // Gear ratios
        assert!((kin.gear_ratio(deg(50.0)).unwrap() - 14.754).abs() < 1e-9);
        assert!((kin.gear_ratio(deg(130.0)).unwrap() - (-0.724 * 12.0 + 14.754)).abs() < 1e-9);
        assert!((kin.gear_ratio(deg(170.0)).unwrap() - (-9.853)).abs() < 1e-9);
    }

    #[test]
    fn test_gear_ratio_is_derivative() {
        let kin = eb51();
        let h = 1e-6;

        for &ank in [40.0, 100.0, 120.0, 135.0, 150.0, 160.0, 175.0].iter() {
            let a = deg(ank);
            let numerical = (kin.slackless_motor_angle(a + h).unwrap()
                - kin.slackless_motor_angle(a - h).unwrap()) / (2.0 * h);
            let analytic = kin.gear_ratio(a).unwrap();

            assert!(
                (numerical - analytic).abs() < 1e-4,
                "{} deg: numerical {} analytic {}", ank, numerical, analytic
            );
        }
    }

    #[test]
    fn test_inflection() {
        let kin = eb51();
        let inflection = kin.inflection_angle();

        assert!((inflection.to_degrees() - (118.0 + 14.754 / 0.724)).abs() < 1e-9);
        assert!(kin.gear_ratio(inflection).unwrap().abs() < 1e-9);
        assert!(kin.gear_ratio(inflection - 0.01).unwrap() > 0.0);
        assert!(kin.gear_ratio(inflection + 0.01).unwrap() < 0.0);
    }

    #[test]
    fn test_alignment() {
        let mut kin = eb51();

        assert!(!kin.is_aligned());
        assert!(matches!(kin.desired_motor_angle(deg(90.0)), Err(KinematicsError::NotAligned)));

        kin.set_offset(1.25);
        assert!(kin.is_aligned());
        assert_eq!(
            kin.desired_motor_angle(deg(90.0)).unwrap(),
            kin.slackless_motor_angle(deg(90.0)).unwrap() + 1.25
        );
    }

    #[test]
    fn test_invalid_breakpoints() {
        let mut calib = KinematicCalibration::default();
        calib.breakpoints_rad[2] = calib.breakpoints_rad[1];

        assert!(matches!(
            KinematicTransform::new(KinematicsParams::default(), calib),
            Err(KinematicsError::InvalidBreakpoints(_))
        ));
    }
}
