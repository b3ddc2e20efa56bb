//! Tolerance mask for the per-iteration linear block.
//!
//! Selection is a separate step producing an index set, so the numeric
//! threshold can be tested without building any template.

use nalgebra::DVector;

/// Relative factor of the drop threshold.
pub const MASK_REL_EPS: f64 = 1e-12;

#[inline]
pub(crate) fn inf_norm(v: &DVector<f64>) -> f64 {
    v.iter().fold(0.0_f64, |m, x| m.max(x.abs()))
}

/// `1e-12 · (‖A‖∞·‖c‖∞ + ‖b‖∞)`.
pub fn mask_tolerance(a_inf: f64, center: &DVector<f64>, b: &DVector<f64>) -> f64 {
    MASK_REL_EPS * (a_inf * inf_norm(center) + inf_norm(b))
}

/// Indices `i` with `|coeff_i| > tol`, ascending.
pub fn active_indices(coeff: &DVector<f64>, tol: f64) -> Vec<usize> {
    coeff
        .iter()
        .enumerate()
        .filter(|(_, c)| c.abs() > tol)
        .map(|(i, _)| i)
        .collect()
}
