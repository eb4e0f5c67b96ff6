//! Utilities related to numbers.

use ieee754;
use num;
use std::fmt;

/// Floating point marker trait for easier control over trait bounds.
pub trait BFloat:
    Sync + Send + num::Float + num::cast::FromPrimitive + ieee754::Ieee754 + fmt::Debug
{
}

impl BFloat for f32 {}
impl BFloat for f64 {}

/// Relative tolerance used by the soft floating-point comparisons.
pub const SOFT_REL_TOLERANCE: f64 = 1e-10;

/// Absolute tolerance used by the soft floating-point comparisons.
pub const SOFT_ABS_TOLERANCE: f64 = 1e-14;

/// Whether the two values are equal to within the default soft tolerances.
pub fn soft_eq(a: f64, b: f64) -> bool {
    soft_eq_with(a, b, SOFT_REL_TOLERANCE)
}

/// Whether the two values are equal to within the given relative tolerance
/// (plus the default absolute tolerance, to remain meaningful near zero).
pub fn soft_eq_with(a: f64, b: f64, rel_tolerance: f64) -> bool {
    (a - b).abs() <= rel_tolerance * f64::max(a.abs(), b.abs()) + SOFT_ABS_TOLERANCE
}
