//! # Kinematic calibration coefficients
//!
//! Coefficients are recorded on the bench in degrees and stored as a headerless CSV, rows indexed
//! by position:
//!
//! | Row | Contents                                                            |
//! |-----|---------------------------------------------------------------------|
//! | 0   | Breakpoints `b1, b2, b3, b4`                                        |
//! | 1-2 | Reserved, ignored                                                   |
//! | 3   | Wound regime motor angle fit `[a, b, c]`                            |
//! | 4   | Transition regime motor angle fit `[a, b, c]`                       |
//! | 5   | Reversed regime motor angle fit `[a, b, c]`                         |
//! | 6   | Gear ratio constants `[wound, reversed]`                            |
//! | 7   | Transition gear ratio fit `[slope, intercept]`                      |
//!
//! Fits with fewer than three coefficients are left-padded with zeros, so `14.754, -1001.518` is
//! the linear fit `0x^2 + 14.754x - 1001.518`. Each fit is evaluated on the angle relative to the
//! lower breakpoint of its regime. Everything is converted to radians once on load.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{io::Read, path::Path};

use util::maths::{poly_deriv_val, poly_val};

use super::{KinematicsError, Regime, NUM_REGIMES};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Number of rows in a calibration file.
const NUM_ROWS: usize = 8;

const BREAKPOINTS_ROW: usize = 0;
const ANGLE_FIT_FIRST_ROW: usize = 3;
const GEAR_CONST_ROW: usize = 6;
const GEAR_LINEAR_ROW: usize = 7;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Coefficients of the piecewise transmission model.
#[derive(Debug, Clone, PartialEq)]
pub struct KinematicCalibration {
    /// Regime boundaries `b1 < b2 < b3 < b4`.
    ///
    /// Units: radians
    pub breakpoints_rad: [f64; 4],

    /// Motor angle fit `[a, b, c]` for each regime, evaluated on the output angle relative to
    /// the regime's lower breakpoint.
    ///
    /// Units: radians in, radians out
    pub angle_fits: [[f64; 3]; NUM_REGIMES],

    /// Gear ratio fits as recorded on the bench. Only used to cross-check the angle fits.
    pub gear_fits: GearFits,
}

/// Recorded gear ratio fits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GearFits {
    pub wound: f64,

    pub reversed: f64,

    /// `[slope, intercept]` relative to the second breakpoint.
    ///
    /// Units: 1/radians, unitless
    pub transition: [f64; 2],
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for KinematicCalibration {
    /// The bench calibration of the EB51 ankle.
    fn default() -> Self {
        Self::from_degrees(
            [33.0, 118.0, 152.0, 180.0],
            [
                [0.0, 14.754, -1001.518],
                [-0.362, 14.754, 252.537],
                [0.0, -9.853, 335.842],
            ],
            GearFits {
                wound: 14.7536,
                reversed: -9.853,
                transition: [-0.724, 14.7536],
            }
        )
    }
}

impl KinematicCalibration {
    /// Build a calibration from coefficients expressed in degrees.
    pub fn from_degrees(
        breakpoints_deg: [f64; 4],
        angle_fits_deg: [[f64; 3]; NUM_REGIMES],
        gear_fits_deg: GearFits
    ) -> Self {
        let rad_per_deg = 1f64.to_radians();
        let deg_per_rad = 1f64.to_degrees();

        let mut breakpoints_rad = [0f64; 4];
        for (r, d) in breakpoints_rad.iter_mut().zip(breakpoints_deg.iter()) {
            *r = d * rad_per_deg;
        }

        // motor_deg = a x_deg^2 + b x_deg + c, substituting x_deg = x_rad * deg_per_rad and
        // scaling the whole fit by rad_per_deg
        let mut angle_fits = [[0f64; 3]; NUM_REGIMES];
        for (r, d) in angle_fits.iter_mut().zip(angle_fits_deg.iter()) {
            *r = [d[0] * deg_per_rad, d[1], d[2] * rad_per_deg];
        }

        Self {
            breakpoints_rad,
            angle_fits,
            gear_fits: GearFits {
                transition: [
                    gear_fits_deg.transition[0] * deg_per_rad,
                    gear_fits_deg.transition[1]
                ],
                ..gear_fits_deg
            }
        }
    }

    /// Load a calibration CSV from the given path.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, KinematicsError> {
        let reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(KinematicsError::CalibrationReadError)?;

        Self::from_csv(reader)
    }

    /// Parse a calibration CSV from a reader.
    pub fn from_reader<R: Read>(rdr: R) -> Result<Self, KinematicsError> {
        Self::from_csv(
            csv::ReaderBuilder::new()
                .has_headers(false)
                .flexible(true)
                .trim(csv::Trim::All)
                .from_reader(rdr)
        )
    }

    fn from_csv<R: Read>(mut reader: csv::Reader<R>) -> Result<Self, KinematicsError> {
        let mut rows: Vec<csv::StringRecord> = Vec::with_capacity(NUM_ROWS);
        for record in reader.records() {
            rows.push(record.map_err(KinematicsError::CalibrationReadError)?);
        }

        // Breakpoints
        let bps = parse_row(&rows, BREAKPOINTS_ROW)?;
        if bps.len() != 4 {
            return Err(KinematicsError::MalformedRow(
                BREAKPOINTS_ROW,
                format!("expected 4 breakpoints, found {}", bps.len())
            ));
        }
        let breakpoints_deg = [bps[0], bps[1], bps[2], bps[3]];

        // Angle fits, left padded
        let mut angle_fits_deg = [[0f64; 3]; NUM_REGIMES];
        for (i, fit) in angle_fits_deg.iter_mut().enumerate() {
            let row = ANGLE_FIT_FIRST_ROW + i;
            let coeffs = parse_row(&rows, row)?;
            if coeffs.is_empty() || coeffs.len() > 3 {
                return Err(KinematicsError::MalformedRow(
                    row,
                    format!("expected 1 to 3 coefficients, found {}", coeffs.len())
                ));
            }
            fit[3 - coeffs.len()..].copy_from_slice(&coeffs);
        }

        // Gear fits
        let consts = parse_row(&rows, GEAR_CONST_ROW)?;
        let linear = parse_row(&rows, GEAR_LINEAR_ROW)?;
        for (row, vals) in [(GEAR_CONST_ROW, &consts), (GEAR_LINEAR_ROW, &linear)].iter() {
            if vals.len() != 2 {
                return Err(KinematicsError::MalformedRow(
                    *row,
                    format!("expected 2 coefficients, found {}", vals.len())
                ));
            }
        }

        let calib = Self::from_degrees(
            breakpoints_deg,
            angle_fits_deg,
            GearFits {
                wound: consts[0],
                reversed: consts[1],
                transition: [linear[0], linear[1]]
            }
        );
        calib.validate()?;

        Ok(calib)
    }

    /// Check that the breakpoints are finite and strictly increasing.
    pub fn validate(&self) -> Result<(), KinematicsError> {
        let b = &self.breakpoints_rad;
        let ok = b.iter().all(|v| v.is_finite())
            && b.windows(2).all(|w| w[0] < w[1]);

        if ok {
            Ok(())
        }
        else {
            Err(KinematicsError::InvalidBreakpoints(*b))
        }
    }

    /// Lower breakpoint of the given regime.
    pub fn lower_breakpoint(&self, regime: Regime) -> f64 {
        self.breakpoints_rad[regime.index()]
    }

    /// Upper breakpoint of the given regime.
    pub fn upper_breakpoint(&self, regime: Regime) -> f64 {
        self.breakpoints_rad[regime.index() + 1]
    }

    /// Evaluate a regime's motor angle fit, without any calibration offset.
    pub fn motor_angle(&self, regime: Regime, output_angle_rad: f64) -> f64 {
        let x = output_angle_rad - self.lower_breakpoint(regime);
        poly_val(&x, &self.angle_fits[regime.index()])
    }

    /// Evaluate the derivative of a regime's motor angle fit.
    pub fn motor_angle_deriv(&self, regime: Regime, output_angle_rad: f64) -> f64 {
        let x = output_angle_rad - self.lower_breakpoint(regime);
        poly_deriv_val(&x, &self.angle_fits[regime.index()])
    }

    /// Evaluate the recorded gear ratio fit for a regime.
    pub fn recorded_gear_ratio(&self, regime: Regime, output_angle_rad: f64) -> f64 {
        match regime {
            Regime::Wound => self.gear_fits.wound,
            Regime::Transition => {
                let x = output_angle_rad - self.lower_breakpoint(regime);
                poly_val(&x, &self.gear_fits.transition)
            },
            Regime::Reversed => self.gear_fits.reversed
        }
    }

    /// Check the calibration for internal consistency.
    ///
    /// The recorded gear fits must match the derivative of the angle fits at both ends of each
    /// regime, and both the motor angle and gear ratio must be continuous at the interior
    /// breakpoints. Returns a description of each violation found.
    pub fn consistency_issues(
        &self,
        continuity_tolerance_rad: f64,
        gear_ratio_tolerance: f64
    ) -> Vec<String> {
        let mut issues = Vec::new();
        let regimes = [Regime::Wound, Regime::Transition, Regime::Reversed];

        for &regime in regimes.iter() {
            for &angle in [self.lower_breakpoint(regime), self.upper_breakpoint(regime)].iter() {
                let analytic = self.motor_angle_deriv(regime, angle);
                let recorded = self.recorded_gear_ratio(regime, angle);

                if (analytic - recorded).abs() > gear_ratio_tolerance {
                    issues.push(format!(
                        "{:?} gear fit gives {:.4} at {:.2} deg but the angle fit slope is {:.4}",
                        regime, recorded, angle.to_degrees(), analytic
                    ));
                }
            }
        }

        for pair in regimes.windows(2) {
            let (below, above) = (pair[0], pair[1]);
            let bp = self.lower_breakpoint(above);

            let jump = self.motor_angle(above, bp) - self.motor_angle(below, bp);
            if jump.abs() > continuity_tolerance_rad {
                issues.push(format!(
                    "Motor angle jumps by {:.4} deg at the {:.2} deg breakpoint",
                    jump.to_degrees(), bp.to_degrees()
                ));
            }

            let jump = self.motor_angle_deriv(above, bp) - self.motor_angle_deriv(below, bp);
            if jump.abs() > gear_ratio_tolerance {
                issues.push(format!(
                    "Gear ratio jumps by {:.4} at the {:.2} deg breakpoint",
                    jump, bp.to_degrees()
                ));
            }
        }

        issues
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Parse every field in the given row as a float.
fn parse_row(rows: &[csv::StringRecord], idx: usize) -> Result<Vec<f64>, KinematicsError> {
    let row = rows.get(idx).ok_or(KinematicsError::MissingRow(idx))?;

    row.iter()
        .map(|field| field.parse::<f64>()
            .map_err(|e| KinematicsError::MalformedRow(idx, format!("{:?}: {}", field, e))))
        .collect()
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    const EB51_CSV: &str = "\
33,118,152,180
0
0
14.754,-1001.518
-0.362,14.754,252.537
-9.853,335.842
14.7536,-9.853
-0.724,14.7536
";

    #[test]
    fn test_parse() -> Result<(), KinematicsError> {
        let calib = KinematicCalibration::from_reader(EB51_CSV.as_bytes())?;
        assert_eq!(calib, KinematicCalibration::default());

        // Linear rows are left padded
        assert_eq!(calib.angle_fits[0][0], 0.0);
        assert_eq!(calib.angle_fits[0][1], 14.754);
        assert!((calib.angle_fits[0][2] - (-1001.518f64).to_radians()).abs() < 1e-12);
        assert!((calib.breakpoints_rad[1] - 118f64.to_radians()).abs() < 1e-12);

        Ok(())
    }

    #[test]
    fn test_parse_errors() {
        // Last row missing
        let short: String = EB51_CSV.lines().take(7).map(|l| format!("{}\n", l)).collect();
        assert!(matches!(
            KinematicCalibration::from_reader(short.as_bytes()),
            Err(KinematicsError::MissingRow(7))
        ));

        // Junk in a fit row
        let junk = EB51_CSV.replace("-9.853,335.842", "-9.853,abc");
        assert!(matches!(
            KinematicCalibration::from_reader(junk.as_bytes()),
            Err(KinematicsError::MalformedRow(5, _))
        ));

        // Three breakpoints
        let bps = EB51_CSV.replace("33,118,152,180", "33,118,152");
        assert!(matches!(
            KinematicCalibration::from_reader(bps.as_bytes()),
            Err(KinematicsError::MalformedRow(0, _))
        ));

        // Out of order breakpoints
        let order = EB51_CSV.replace("33,118,152,180", "33,152,118,180");
        assert!(matches!(
            KinematicCalibration::from_reader(order.as_bytes()),
            Err(KinematicsError::InvalidBreakpoints(_))
        ));
    }

    #[test]
    fn test_consistency() {
        let tol_rad = 0.5f64.to_radians();
        let calib = KinematicCalibration::default();
        assert_eq!(calib.consistency_issues(tol_rad, 0.05), Vec::<String>::new());

        // Shift the transition fit by 5 degrees, which breaks continuity at both of its ends
        let mut bad = calib.clone();
        bad.angle_fits[1][2] += 5f64.to_radians();
        assert_eq!(bad.consistency_issues(tol_rad, 0.05).len(), 2);

        // Recorded gear fit which doesn't match the slope of the angle fit
        let mut bad = calib;
        bad.gear_fits.wound = 12.0;
        let issues = bad.consistency_issues(tol_rad, 0.05);
        assert_eq!(issues.len(), 2);
        assert!(issues[0].starts_with("Wound"));
    }
}
