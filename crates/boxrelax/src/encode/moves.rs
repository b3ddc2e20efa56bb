//! Discrete move: two binary vectors `(q1, q2)` decoding to `δ = −2·q1 + q2`.
//!
//! Each coordinate of `δ` lies in `{−2, −1, 0, 1}`. The level set is
//! asymmetric around zero and is kept exactly as is.
//!
//! Variable layout inside a template: `q1[i]` is variable `i`, `q2[i]` is
//! variable `dim + i`.

use nalgebra::DVector;

use crate::error::{RelaxError, RelaxResult};

/// Weight of `q1[i]` in `δ_i`.
pub const Q1_WEIGHT: f64 = -2.0;
/// Weight of `q2[i]` in `δ_i`.
pub const Q2_WEIGHT: f64 = 1.0;
/// The four reachable displacement levels, ascending.
pub const LEVELS: [f64; 4] = [-2.0, -1.0, 0.0, 1.0];

/// Assignment to the binary variables of a template.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Assignment {
    bits: Vec<bool>,
}

impl Assignment {
    pub fn zeros(num_vars: usize) -> Self {
        Self {
            bits: vec![false; num_vars],
        }
    }

    pub fn from_bits(bits: Vec<bool>) -> Self {
        Self { bits }
    }

    /// Little-endian bit pattern of `index` (variable `k` is bit `k`).
    pub fn from_index(num_vars: usize, index: u64) -> Self {
        Self {
            bits: (0..num_vars).map(|k| (index >> k) & 1 == 1).collect(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    #[inline]
    pub fn get(&self, var: usize) -> bool {
        self.bits[var]
    }

    #[inline]
    pub fn flip(&mut self, var: usize) {
        self.bits[var] = !self.bits[var];
    }

    #[inline]
    pub fn bits(&self) -> &[bool] {
        &self.bits
    }

    #[inline]
    pub(crate) fn value(&self, var: usize) -> f64 {
        if self.bits[var] {
            1.0
        } else {
            0.0
        }
    }
}

/// Affine expression over two binary variables: `constant + Σ coef·x_var`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct BinaryAffine {
    pub constant: f64,
    pub terms: [(usize, f64); 2],
}

/// The fixed `(q1, q2) → δ` mapping for a problem of dimension `dim`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DiscreteMove {
    dim: usize,
}

impl DiscreteMove {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Binary variables per template (`2·dim`).
    #[inline]
    pub fn num_vars(&self) -> usize {
        2 * self.dim
    }

    #[inline]
    pub fn q1(&self, i: usize) -> usize {
        i
    }

    #[inline]
    pub fn q2(&self, i: usize) -> usize {
        self.dim + i
    }

    /// `δ_i` as an expression in `(q1[i], q2[i])`.
    #[inline]
    pub(crate) fn displacement_expr(&self, i: usize) -> BinaryAffine {
        BinaryAffine {
            constant: 0.0,
            terms: [(self.q1(i), Q1_WEIGHT), (self.q2(i), Q2_WEIGHT)],
        }
    }

    /// `w_i = c_i + L·δ_i` as an expression in `(q1[i], q2[i])`.
    #[inline]
    pub(crate) fn coordinate_expr(&self, i: usize, center_i: f64, scale: f64) -> BinaryAffine {
        BinaryAffine {
            constant: center_i,
            terms: [
                (self.q1(i), scale * Q1_WEIGHT),
                (self.q2(i), scale * Q2_WEIGHT),
            ],
        }
    }

    fn check_len(&self, a: &Assignment) -> RelaxResult<()> {
        if a.len() != self.num_vars() {
            return Err(RelaxError::dims(format!(
                "assignment has {} variables, move expects {}",
                a.len(),
                self.num_vars()
            )));
        }
        Ok(())
    }

    /// Decode an assignment into `δ`.
    pub fn decode(&self, a: &Assignment) -> RelaxResult<DVector<f64>> {
        self.check_len(a)?;
        Ok(DVector::from_fn(self.dim, |i, _| {
            Q1_WEIGHT * a.value(self.q1(i)) + Q2_WEIGHT * a.value(self.q2(i))
        }))
    }

    /// `center + scale·δ`.
    pub fn candidate(
        &self,
        center: &DVector<f64>,
        scale: f64,
        a: &Assignment,
    ) -> RelaxResult<DVector<f64>> {
        let delta = self.decode(a)?;
        Ok(center + delta * scale)
    }

    /// Inverse of `decode` for displacements drawn from `LEVELS`.
    pub fn encode(&self, delta: &[f64]) -> Option<Assignment> {
        if delta.len() != self.dim {
            return None;
        }
        let mut a = Assignment::zeros(self.num_vars());
        for (i, &d) in delta.iter().enumerate() {
            let (q1, q2) = match d {
                x if x == -2.0 => (true, false),
                x if x == -1.0 => (true, true),
                x if x == 0.0 => (false, false),
                x if x == 1.0 => (false, true),
                _ => return None,
            };
            a.bits[self.q1(i)] = q1;
            a.bits[self.q2(i)] = q2;
        }
        Some(a)
    }
}
