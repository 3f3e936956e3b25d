//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Map a value from one range into another.
pub fn lin_map<T>(source_range: (T, T), target_range: (T, T), value: T) -> T
where
    T: Float
{
    target_range.0
        + ((value - source_range.0)
        * (target_range.1 - target_range.0)
        / (source_range.1 - source_range.0))
}

/// Apply polynomial coefficients to a value.
///
/// Coefficients are ordered highest power first, i.e. `[a, b, c]` evaluates
/// `a*x^2 + b*x + c`.
pub fn poly_val<T>(value: &T, coeffs: &[T]) -> T
where
    T: Float + std::ops::AddAssign
{
    // Horner's method
    let mut res = T::zero();

    for c in coeffs {
        res = res * *value + *c;
    }

    res
}

/// Evaluate the derivative of a polynomial at a value.
///
/// Coefficients are ordered highest power first, as in [`poly_val`].
pub fn poly_deriv_val<T>(value: &T, coeffs: &[T]) -> T
where
    T: Float + std::ops::AddAssign
{
    let mut res = T::zero();
    let order = coeffs.len();

    // The constant term has no derivative so it is skipped
    for (i, c) in coeffs.iter().enumerate().take(order.saturating_sub(1)) {
        let power = match T::from(order - 1 - i) {
            Some(p) => p,
            None => return T::nan()
        };
        res = res * *value + *c * power;
    }

    res
}

/// Return `-1`, `0` or `+1` depending on the sign of the value.
///
/// Unlike `Float::signum` zero maps to zero, which is what direction checks
/// on gear ratios and torques need.
pub fn sign<T>(value: T) -> T
where
    T: Float
{
    if value > T::zero() {
        T::one()
    }
    else if value < T::zero() {
        -T::one()
    }
    else {
        T::zero()
    }
}
