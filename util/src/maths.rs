//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Map a value from one range into another.
pub fn lin_map<T>(source_range: (T, T), target_range: (T, T), value: T) -> T
where
    T: Float,
{
    target_range.0
        + ((value - source_range.0) * (target_range.1 - target_range.0)
            / (source_range.1 - source_range.0))
}

/// Limit a value to the range `[min, max]`.
///
/// NaN values are passed through unchanged.
pub fn clamp<T>(value: T, min: T, max: T) -> T
where
    T: Float,
{
    let mut ret = value;

    if ret > max {
        ret = max
    }
    if ret < min {
        ret = min
    }

    ret
}

/// Calculates the least nonnegative remainder of `lhs (mod rhs)`.
///
/// This function is taken from the std library as num is missing it.
///
/// In particular, the return value `r` satisfies `0.0 <= r < rhs.abs()` in
/// most cases. However, due to a floating point round-off error it can
/// result in `r == rhs.abs()` if `lhs` is much smaller than `rhs.abs()` in
/// magnitude and `lhs < 0.0`.
pub fn rem_euclid<T>(lhs: T, rhs: T) -> T
where
    T: Float,
{
    let r = lhs % rhs;
    if r < T::zero() {
        r + rhs.abs()
    } else {
        r
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_lin_map() {
        assert_eq!(lin_map((0f64, 1f64), (500f64, 2500f64), 0.5), 1500f64);
        assert_eq!(lin_map((0f64, 1f64), (500f64, 2500f64), 0.0), 500f64);
        assert_eq!(lin_map((-1f64, 1f64), (0f64, 180f64), 1.0), 180f64);
    }

    #[test]
    fn test_clamp() {
        assert_eq!(clamp(1.2f64, 0.0, 1.0), 1.0);
        assert_eq!(clamp(-0.2f64, 0.0, 1.0), 0.0);
        assert_eq!(clamp(0.4f64, 0.0, 1.0), 0.4);
        assert!(clamp(std::f64::NAN, 0.0, 1.0).is_nan());
    }

    #[test]
    fn test_rem_euclid() {
        assert_eq!(rem_euclid(370f64, 360f64), 10f64);
        assert_eq!(rem_euclid(-90f64, 360f64), 270f64);
        assert_eq!(rem_euclid(-720f64, 360f64), 0f64);
        assert_eq!(rem_euclid(360f64, 360f64), 0f64);
    }
}
