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

/// Clamp a value into `[min, max]`.
///
/// NaN inputs are passed through unchanged so they stay visible to the caller.
pub fn clamp<T>(value: T, min: T, max: T) -> T
where
    T: Float,
{
    if value > max {
        max
    } else if value < min {
        min
    } else {
        value
    }
}

/// Calculates the least nonnegative remainder of `lhs (mod rhs)`.
///
/// In particular, the return value `r` satisfies `0.0 <= r < rhs.abs()` in
/// most cases. Due to floating point round-off it can result in
/// `r == rhs.abs()` when `lhs` is much smaller than `rhs.abs()` in magnitude
/// and `lhs < 0.0`.
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

/// Wrap an angle in degrees into `[0, 360)`.
pub fn wrap_360<T>(angle_deg: T) -> T
where
    T: Float,
{
    let full = T::from(360.0).unwrap_or_else(T::zero);
    let wrapped = rem_euclid(angle_deg, full);

    // Round-off can land exactly on 360
    if wrapped >= full {
        wrapped - full
    } else {
        wrapped
    }
}
