//! Reference physical model relating weight to sensor capacitance.
//!
//! `capacity_from_weight` and `weight_from_capacity` are only approximately
//! inverse: the inversion guards its divisors and the log argument with
//! `EPSILON`, and takes `|(c - c0)/a|`. For capacities below `c0` (with `a > 0`)
//! the true inverse does not exist and the result is the mirror image instead.

use serde::Serialize;

/// Guard used for divisors and the log argument.
pub const EPSILON: f64 = 1e-12;

/// `C(w) = a * exp(b * w) + c0`, capacitance in pF over weight in grams.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReferenceModel {
    pub a: f64,
    pub b: f64,
    pub c0: f64,
}

impl Default for ReferenceModel {
    fn default() -> Self {
        Self {
            a: 2.95,
            b: 0.00162,
            c0: 14.59,
        }
    }
}

#[inline]
fn guarded(v: f64) -> f64 {
    if v.abs() > EPSILON { v } else { EPSILON }
}

impl ReferenceModel {
    pub fn new(a: f64, b: f64, c0: f64) -> Self {
        Self { a, b, c0 }
    }

    #[inline]
    pub fn capacity_from_weight(&self, weight_g: f64) -> f64 {
        self.a * (self.b * weight_g).exp() + self.c0
    }

    #[inline]
    pub fn weight_from_capacity(&self, capacity_pf: f64) -> f64 {
        let arg = (capacity_pf - self.c0) / guarded(self.a);
        (arg.abs() + EPSILON).ln() / guarded(self.b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_pan_capacity_is_a_plus_c0() {
        let m = ReferenceModel::default();
        assert!((m.capacity_from_weight(0.0) - 17.54).abs() < 1e-12);
    }

    #[test]
    fn zero_a_and_b_do_not_divide_by_zero() {
        let m = ReferenceModel::new(0.0, 0.0, 14.59);
        assert!(m.weight_from_capacity(20.0).is_finite());
    }

    #[test]
    fn below_c0_mirrors_instead_of_failing() {
        let m = ReferenceModel::default();
        let above = m.weight_from_capacity(m.c0 + 1.0);
        let below = m.weight_from_capacity(m.c0 - 1.0);
        assert!((above - below).abs() < 1e-9);
    }
}
