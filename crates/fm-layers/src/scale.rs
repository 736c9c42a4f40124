//! Continuous numeric scales.

use fm_core::Real;

/// Power scale: `range0 + (t(x) - t(d0)) / (t(d1) - t(d0)) * (range1 - range0)`
/// with `t(x) = sign(x) * |x|^exponent`.
///
/// Exponent 1 is a linear scale, 0.5 a square-root scale. A degenerate domain
/// (`t(d0) == t(d1)`, including the empty-data `[0, 0]`) maps everything to
/// the start of the range. Inputs outside the domain extrapolate unless the
/// scale is clamped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowScale {
    exponent: Real,
    domain: [Real; 2],
    range: [Real; 2],
    clamp: bool,
}

impl PowScale {
    pub fn new(exponent: Real, domain: [Real; 2], range: [Real; 2]) -> Self {
        Self {
            exponent,
            domain,
            range,
            clamp: false,
        }
    }

    pub fn linear(domain: [Real; 2], range: [Real; 2]) -> Self {
        Self::new(1.0, domain, range)
    }

    /// Radius from magnitude such that circle area grows linearly.
    pub fn sqrt(domain: [Real; 2], range: [Real; 2]) -> Self {
        Self::new(0.5, domain, range)
    }

    pub fn clamped(mut self) -> Self {
        self.clamp = true;
        self
    }

    pub fn domain(&self) -> [Real; 2] {
        self.domain
    }

    pub fn range(&self) -> [Real; 2] {
        self.range
    }

    pub fn apply(&self, x: Real) -> Real {
        let t0 = self.transform(self.domain[0]);
        let t1 = self.transform(self.domain[1]);
        let span = t1 - t0;
        let mut u = if span == 0.0 || !span.is_finite() {
            0.0
        } else {
            (self.transform(x) - t0) / span
        };
        if self.clamp {
            u = u.clamp(0.0, 1.0);
        }
        self.range[0] + u * (self.range[1] - self.range[0])
    }

    fn transform(&self, x: Real) -> Real {
        let magnitude = match self.exponent {
            e if e == 1.0 => return x,
            e if e == 0.5 => x.abs().sqrt(),
            e => x.abs().powf(e),
        };
        if x < 0.0 { -magnitude } else { magnitude }
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn sqrt_scale_is_monotonic(max in 0.0_f64..1e9, a in 0.0_f64..1e9, b in 0.0_f64..1e9) {
            let s = PowScale::sqrt([0.0, max], [0.0, 15.0]);
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(s.apply(lo) <= s.apply(hi));
        }
    }
}
