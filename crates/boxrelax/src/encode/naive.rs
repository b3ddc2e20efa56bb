//! Naive strategy: full re-expansion of `f(c + L·δ)` on every call.

use nalgebra::DVector;

use super::moves::DiscreteMove;
use super::template::Template;
use super::{MoveEncoder, Strategy};
use crate::form::QuadraticForm;

/// Substitutes `w = center + scale·δ(q1, q2)` into `½ wᵀAw − bᵀw` and expands.
///
/// O(d²) per call regardless of earlier calls. The template keeps its
/// constant, so its value at any assignment is the true objective there.
pub struct NaiveEncoder<'a> {
    form: &'a QuadraticForm,
    moves: DiscreteMove,
}

impl<'a> NaiveEncoder<'a> {
    pub fn new(form: &'a QuadraticForm) -> Self {
        Self {
            form,
            moves: DiscreteMove::new(form.dim()),
        }
    }
}

impl MoveEncoder for NaiveEncoder<'_> {
    fn strategy(&self) -> Strategy {
        Strategy::Naive
    }

    fn moves(&self) -> &DiscreteMove {
        &self.moves
    }

    fn build_template(&self, center: &DVector<f64>, scale: f64) -> Template {
        let d = self.moves.dim();
        assert_eq!(center.len(), d, "center length must match the form");
        assert!(scale > 0.0, "scale must be positive");
        let a = self.form.to_dense();
        let w: Vec<_> = (0..d)
            .map(|i| self.moves.coordinate_expr(i, center[i], scale))
            .collect();
        let mut t = Template::new(self.moves.num_vars());
        for i in 0..d {
            for j in 0..d {
                t.add_product(0.5 * a[(i, j)], &w[i], &w[j]);
            }
        }
        for (i, wi) in w.iter().enumerate() {
            t.add_affine(-self.form.b()[i], wi);
        }
        t
    }

    fn template_is_exact(&self) -> bool {
        true
    }
}
