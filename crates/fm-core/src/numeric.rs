use crate::{FmError, FmResult};

/// Floating point type used for all aggregation and scale math.
pub type Real = f64;

/// Absolute and relative slack for float comparisons.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tolerances {
    pub abs: Real,
    pub rel: Real,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            abs: 1e-12,
            rel: 1e-9,
        }
    }
}

/// True if `a` and `b` are within `tol.abs` of each other, or within
/// `tol.rel` of the larger magnitude.
pub fn nearly_equal(a: Real, b: Real, tol: Tolerances) -> bool {
    let diff = (a - b).abs();
    diff <= tol.abs || diff <= tol.rel * a.abs().max(b.abs())
}

/// Reject NaN and infinities, naming the offending quantity.
pub fn ensure_finite(value: Real, what: &'static str) -> FmResult<Real> {
    value
        .is_finite()
        .then_some(value)
        .ok_or(FmError::NonFinite { what, value })
}

/// Parse a spreadsheet cell as a number.
///
/// Surrounding whitespace is ignored. Returns `None` for anything that does
/// not parse to a finite value (`"x"`, `"NaN"`, `"inf"`, ...).
pub fn parse_finite(s: &str) -> Option<Real> {
    s.trim().parse::<Real>().ok().filter(|v| v.is_finite())
}

/// Replace NaN/inf with 0.
#[inline]
pub fn finite_or_zero(v: Real) -> Real {
    if v.is_finite() { v } else { 0.0 }
}

/// Floor to a finite, non-negative value. Used for radii and thicknesses.
#[inline]
pub fn non_negative(v: Real) -> Real {
    if v.is_finite() && v > 0.0 { v } else { 0.0 }
}
