//! Optimized and Sparse strategies: quadratic block built once, linear block per call.
//!
//! `f(c + L·δ) = f(c) + L·(Ac − b)ᵀδ + L²·½ δᵀAδ`
//!
//! - `Q = ½ δᵀAδ` does not depend on `(c, L)`, so it is expanded once at
//!   construction and kept immutable.
//! - Each call computes `coeff = Ac − b` (dense matvec or O(nnz) over the
//!   cached upper triangle), masks near-zero entries, and assembles
//!   `L·Σ_{i active} coeff_i δ_i + L²·Q`.
//! - The constant `f(c)` is dropped (irrelevant to the argmin), so callers must
//!   recompute the true energy after decoding.

use std::borrow::Cow;

use nalgebra::{DMatrix, DVector};

use super::mask::{active_indices, mask_tolerance};
use super::moves::DiscreteMove;
use super::template::Template;
use super::{MoveEncoder, Strategy};
use crate::form::{QuadraticForm, UpperTriangle};

/// Expand `½ Σ_{i≤j} (2 − [i=j])·A_ij δ_i δ_j` from upper-triangle entries.
fn quadratic_block(
    moves: &DiscreteMove,
    upper: impl Iterator<Item = (usize, usize, f64)>,
) -> Template {
    let mut q = Template::new(moves.num_vars());
    for (i, j, a_ij) in upper {
        let weight = if i == j { 0.5 * a_ij } else { a_ij };
        q.add_product(
            weight,
            &moves.displacement_expr(i),
            &moves.displacement_expr(j),
        );
    }
    q
}

/// `scale·Σ_{i∈active} coeff_i δ_i + scale²·Q`.
fn assemble(
    moves: &DiscreteMove,
    quad: &Template,
    coeff: &DVector<f64>,
    active: &[usize],
    scale: f64,
) -> Template {
    let mut t = quad.scaled(scale * scale);
    for &i in active {
        t.add_affine(scale * coeff[i], &moves.displacement_expr(i));
    }
    t
}

fn check_args(moves: &DiscreteMove, center: &DVector<f64>, scale: f64) {
    assert_eq!(center.len(), moves.dim(), "center length must match the form");
    assert!(scale > 0.0, "scale must be positive");
}

/// Dense precomputed strategy.
pub struct OptimizedEncoder<'a> {
    form: &'a QuadraticForm,
    a: Cow<'a, DMatrix<f64>>,
    moves: DiscreteMove,
    quad: Template,
}

impl<'a> OptimizedEncoder<'a> {
    /// O(d²) one-time construction of the quadratic block.
    pub fn new(form: &'a QuadraticForm) -> Self {
        let a = form.to_dense();
        let d = form.dim();
        let moves = DiscreteMove::new(d);
        let upper = (0..d).flat_map(|i| (i..d).map(move |j| (i, j)));
        let quad = quadratic_block(&moves, upper.map(|(i, j)| (i, j, a[(i, j)])));
        Self {
            form,
            a,
            moves,
            quad,
        }
    }

    /// The precomputed `Q` (independent of center and scale).
    pub fn quadratic_block(&self) -> &Template {
        &self.quad
    }
}

impl MoveEncoder for OptimizedEncoder<'_> {
    fn strategy(&self) -> Strategy {
        Strategy::Optimized
    }

    fn moves(&self) -> &DiscreteMove {
        &self.moves
    }

    fn build_template(&self, center: &DVector<f64>, scale: f64) -> Template {
        check_args(&self.moves, center, scale);
        let coeff = &*self.a * center - self.form.b();
        let tol = mask_tolerance(self.form.a_inf_norm(), center, self.form.b());
        let active = active_indices(&coeff, tol);
        assemble(&self.moves, &self.quad, &coeff, &active, scale)
    }
}

/// Sparse precomputed strategy over the cached upper triangle.
pub struct SparseEncoder<'a> {
    form: &'a QuadraticForm,
    upper: Cow<'a, UpperTriangle>,
    moves: DiscreteMove,
    quad: Template,
}

impl<'a> SparseEncoder<'a> {
    /// O(nnz) one-time construction of the quadratic block.
    ///
    /// A dense form gets its upper triangle extracted here, once.
    pub fn new(form: &'a QuadraticForm) -> Self {
        let upper = form.upper_triangle();
        let moves = DiscreteMove::new(form.dim());
        let quad = quadratic_block(
            &moves,
            upper.entries().iter().map(|e| (e.row, e.col, e.value)),
        );
        Self {
            form,
            upper,
            moves,
            quad,
        }
    }

    pub fn quadratic_block(&self) -> &Template {
        &self.quad
    }
}

impl MoveEncoder for SparseEncoder<'_> {
    fn strategy(&self) -> Strategy {
        Strategy::Sparse
    }

    fn moves(&self) -> &DiscreteMove {
        &self.moves
    }

    fn build_template(&self, center: &DVector<f64>, scale: f64) -> Template {
        check_args(&self.moves, center, scale);
        let coeff = self.upper.matvec(center) - self.form.b();
        let tol = mask_tolerance(self.form.a_inf_norm(), center, self.form.b());
        let active = active_indices(&coeff, tol);
        assemble(&self.moves, &self.quad, &coeff, &active, scale)
    }
}
