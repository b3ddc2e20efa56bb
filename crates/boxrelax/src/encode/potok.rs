//! Fixed-point one-shot encoding (Date & Potok): `w_j = Σ_k P_k·b_{j,k}`.
//!
//! The whole objective `½ wᵀAw − bᵀw` becomes a single template over the
//! `d×K` bit matrix, built once and solved by one oracle call. Weights are
//! confined to the nonnegative grid spanned by the precision vector `P`.
//!
//! Variable layout: bit `(j, k)` is variable `j·K + k`.

use nalgebra::DVector;

use super::moves::Assignment;
use super::template::Template;
use crate::error::{RelaxError, RelaxResult};
use crate::form::QuadraticForm;

/// Spacing of the default precision vector.
pub const PRECISION_STEP: f64 = 0.25;

/// Bit weights `P = (P_1, …, P_K)`.
#[derive(Clone, Debug, PartialEq)]
pub struct PrecisionVector {
    levels: Vec<f64>,
}

impl PrecisionVector {
    pub fn new(levels: Vec<f64>) -> RelaxResult<Self> {
        if levels.is_empty() {
            return Err(RelaxError::config("precision vector needs at least one level"));
        }
        if let Some(bad) = levels.iter().find(|p| !p.is_finite()) {
            return Err(RelaxError::config(format!(
                "precision levels must be finite, got {bad}"
            )));
        }
        Ok(Self { levels })
    }

    /// `(¼, ½, …, K/4)`; `K = 4` gives `(0.25, 0.5, 0.75, 1.0)`.
    pub fn quarters(bits: usize) -> RelaxResult<Self> {
        Self::new((1..=bits).map(|k| PRECISION_STEP * k as f64).collect())
    }

    #[inline]
    pub fn levels(&self) -> &[f64] {
        &self.levels
    }

    /// Bits per coordinate (`K`).
    #[inline]
    pub fn bits(&self) -> usize {
        self.levels.len()
    }
}

impl Default for PrecisionVector {
    fn default() -> Self {
        Self {
            levels: vec![0.25, 0.5, 0.75, 1.0],
        }
    }
}

/// Template for the full objective under the fixed-point encoding.
pub struct PotokEncoder {
    dim: usize,
    precision: PrecisionVector,
    template: Template,
}

impl PotokEncoder {
    /// O(d²K²) expansion. The template has no constant, so its value at any
    /// assignment is `f(decode(x))`.
    pub fn new(form: &QuadraticForm, precision: PrecisionVector) -> Self {
        let dim = form.dim();
        let k = precision.bits();
        let p = precision.levels();
        let a = form.to_dense();
        let mut template = Template::new(dim * k);
        for i in 0..dim {
            for j in 0..dim {
                let a_ij = a[(i, j)];
                if a_ij == 0.0 {
                    continue;
                }
                for (ki, &pi) in p.iter().enumerate() {
                    for (kj, &pj) in p.iter().enumerate() {
                        template.add_quadratic(i * k + ki, j * k + kj, 0.5 * a_ij * pi * pj);
                    }
                }
            }
        }
        for (i, &b_i) in form.b().iter().enumerate() {
            for (ki, &pi) in p.iter().enumerate() {
                template.add_linear(i * k + ki, -b_i * pi);
            }
        }
        Self {
            dim,
            precision,
            template,
        }
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    #[inline]
    pub fn var(&self, coord: usize, bit: usize) -> usize {
        coord * self.precision.bits() + bit
    }

    pub fn precision(&self) -> &PrecisionVector {
        &self.precision
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    /// `w_j = Σ_k P_k·x_{j,k}`.
    pub fn decode(&self, x: &Assignment) -> RelaxResult<DVector<f64>> {
        if x.len() != self.template.num_vars() {
            return Err(RelaxError::dims(format!(
                "assignment has {} variables, encoding expects {}",
                x.len(),
                self.template.num_vars()
            )));
        }
        let p = self.precision.levels();
        Ok(DVector::from_fn(self.dim, |j, _| {
            p.iter()
                .enumerate()
                .filter(|&(k, _)| x.get(self.var(j, k)))
                .map(|(_, &pk)| pk)
                .sum()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::random_form;

    #[test]
    fn quarters_match_the_default_vector() {
        assert_eq!(PrecisionVector::quarters(4).unwrap(), PrecisionVector::default());
        assert_eq!(PrecisionVector::quarters(2).unwrap().levels(), &[0.25, 0.5]);
        assert!(PrecisionVector::quarters(0).is_err());
        assert!(PrecisionVector::new(vec![1.0, f64::NAN]).is_err());
    }

    #[test]
    fn template_value_is_objective_at_decoded_weights() {
        let form = random_form(2, 1.0, 13);
        let enc = PotokEncoder::new(&form, PrecisionVector::quarters(3).unwrap());
        let t = enc.template();
        assert_eq!(t.num_vars(), 6);
        assert_eq!(t.constant(), 0.0);
        for k in 0..64 {
            let x = Assignment::from_index(6, k);
            let w = enc.decode(&x).unwrap();
            assert!((t.evaluate(&x) - form.energy(&w)).abs() < 1e-10, "k={k}");
        }
    }

    #[test]
    fn decode_sums_selected_levels() {
        let form = random_form(2, 0.5, 1);
        let enc = PotokEncoder::new(&form, PrecisionVector::default());
        let mut x = Assignment::zeros(8);
        x.flip(enc.var(0, 0));
        x.flip(enc.var(0, 3));
        x.flip(enc.var(1, 1));
        let w = enc.decode(&x).unwrap();
        assert_eq!(w.as_slice(), &[1.25, 0.5]);
        assert!(enc.decode(&Assignment::zeros(7)).is_err());
    }
}
