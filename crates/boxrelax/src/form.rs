//! Quadratic objective `f(w) = ½ wᵀAw − bᵀw` over a symmetric `A`.
//!
//! Purpose
//! - Hold the problem instance `(A, b)` immutably for the whole run.
//! - Offer the two storages the encoders need: a dense matrix, or a cached
//!   upper triangle `(row, col, value)` with `row ≤ col` and an implicit mirror.
//!
//! The cache is built once per form and never mutated. Symmetry of `A` is a
//! caller precondition; only shapes are validated.

use std::borrow::Cow;
use std::collections::BTreeMap;

use nalgebra::{DMatrix, DVector};

use crate::error::{RelaxError, RelaxResult};

/// One cached entry of the upper triangle (`row <= col`).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UpperEntry {
    pub row: usize,
    pub col: usize,
    pub value: f64,
}

/// Nonzeros of the upper triangle in row-major order.
#[derive(Clone, Debug, PartialEq)]
pub struct UpperTriangle {
    dim: usize,
    entries: Vec<UpperEntry>,
}

impl UpperTriangle {
    /// Cache the nonzero `i <= j` entries of a dense matrix.
    pub fn from_dense(a: &DMatrix<f64>) -> Self {
        let dim = a.nrows();
        let mut entries = Vec::new();
        for i in 0..dim {
            for j in i..dim {
                let value = a[(i, j)];
                if value != 0.0 {
                    entries.push(UpperEntry { row: i, col: j, value });
                }
            }
        }
        Self { dim, entries }
    }

    /// Cache from COO triplets of the full symmetric matrix.
    ///
    /// Entries below the diagonal are skipped (their mirror is implied),
    /// duplicates are summed, exact zeros dropped.
    pub fn from_triplets(dim: usize, triplets: &[(usize, usize, f64)]) -> RelaxResult<Self> {
        let mut acc: BTreeMap<(usize, usize), f64> = BTreeMap::new();
        for &(row, col, value) in triplets {
            if row >= dim || col >= dim {
                return Err(RelaxError::dims(format!(
                    "triplet ({row}, {col}) outside a {dim}x{dim} matrix"
                )));
            }
            if col < row {
                continue;
            }
            *acc.entry((row, col)).or_insert(0.0) += value;
        }
        let entries = acc
            .into_iter()
            .filter(|&(_, v)| v != 0.0)
            .map(|((row, col), value)| UpperEntry { row, col, value })
            .collect();
        Ok(Self { dim, entries })
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    #[inline]
    pub fn entries(&self) -> &[UpperEntry] {
        &self.entries
    }

    /// Number of cached entries (upper triangle only).
    #[inline]
    pub fn nnz(&self) -> usize {
        self.entries.len()
    }

    /// `A x` in O(nnz), mirroring off-diagonal entries.
    pub fn matvec(&self, x: &DVector<f64>) -> DVector<f64> {
        let mut y = DVector::zeros(self.dim);
        for e in &self.entries {
            y[e.row] += e.value * x[e.col];
            if e.row != e.col {
                y[e.col] += e.value * x[e.row];
            }
        }
        y
    }

    /// `‖A‖∞` (max absolute row sum) of the mirrored matrix.
    pub fn inf_norm(&self) -> f64 {
        let mut rows = vec![0.0_f64; self.dim];
        for e in &self.entries {
            rows[e.row] += e.value.abs();
            if e.row != e.col {
                rows[e.col] += e.value.abs();
            }
        }
        rows.into_iter().fold(0.0, f64::max)
    }

    pub fn to_dense(&self) -> DMatrix<f64> {
        let mut a = DMatrix::zeros(self.dim, self.dim);
        for e in &self.entries {
            a[(e.row, e.col)] = e.value;
            a[(e.col, e.row)] = e.value;
        }
        a
    }
}

#[derive(Clone, Debug)]
enum Storage {
    Dense(DMatrix<f64>),
    Sparse(UpperTriangle),
}

/// Immutable `(A, b)` pair with a cached `‖A‖∞`.
#[derive(Clone, Debug)]
pub struct QuadraticForm {
    storage: Storage,
    b: DVector<f64>,
    a_inf: f64,
}

impl QuadraticForm {
    /// Dense form. Fails if `A` is not square or disagrees with `b`.
    pub fn dense(a: DMatrix<f64>, b: DVector<f64>) -> RelaxResult<Self> {
        if a.nrows() != a.ncols() {
            return Err(RelaxError::dims(format!(
                "A is {}x{}, expected a square matrix",
                a.nrows(),
                a.ncols()
            )));
        }
        if a.nrows() != b.len() {
            return Err(RelaxError::dims(format!(
                "A is {n}x{n} but b has length {}",
                b.len(),
                n = a.nrows()
            )));
        }
        let a_inf = a
            .row_iter()
            .map(|r| r.iter().map(|v| v.abs()).sum::<f64>())
            .fold(0.0, f64::max);
        Ok(Self {
            storage: Storage::Dense(a),
            b,
            a_inf,
        })
    }

    /// Sparse form from COO triplets of the full symmetric matrix.
    pub fn sparse(
        dim: usize,
        triplets: &[(usize, usize, f64)],
        b: DVector<f64>,
    ) -> RelaxResult<Self> {
        if dim != b.len() {
            return Err(RelaxError::dims(format!(
                "A is {dim}x{dim} but b has length {}",
                b.len()
            )));
        }
        Self::from_upper(UpperTriangle::from_triplets(dim, triplets)?, b)
    }

    /// Sparse encoding of a dense matrix (same numbers, cached storage).
    pub fn sparse_from_dense(a: &DMatrix<f64>, b: DVector<f64>) -> RelaxResult<Self> {
        if a.nrows() != a.ncols() || a.nrows() != b.len() {
            return Err(RelaxError::dims(format!(
                "A is {}x{} but b has length {}",
                a.nrows(),
                a.ncols(),
                b.len()
            )));
        }
        Self::from_upper(UpperTriangle::from_dense(a), b)
    }

    /// Least-squares normal equations of `X w ≈ y`: `A = XᵀX`, `b = Xᵀy`.
    pub fn normal_equations(x: &DMatrix<f64>, y: &DVector<f64>) -> RelaxResult<Self> {
        if x.nrows() != y.len() {
            return Err(RelaxError::dims(format!(
                "X has {} rows but y has length {}",
                x.nrows(),
                y.len()
            )));
        }
        Self::dense(x.tr_mul(x), x.tr_mul(y))
    }

    fn from_upper(upper: UpperTriangle, b: DVector<f64>) -> RelaxResult<Self> {
        let a_inf = upper.inf_norm();
        Ok(Self {
            storage: Storage::Sparse(upper),
            b,
            a_inf,
        })
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.b.len()
    }

    #[inline]
    pub fn b(&self) -> &DVector<f64> {
        &self.b
    }

    #[inline]
    pub fn is_sparse(&self) -> bool {
        matches!(self.storage, Storage::Sparse(_))
    }

    /// Cached `‖A‖∞`.
    #[inline]
    pub fn a_inf_norm(&self) -> f64 {
        self.a_inf
    }

    /// `A x`: dense matvec or O(nnz) over the cache.
    pub fn matvec(&self, x: &DVector<f64>) -> DVector<f64> {
        match &self.storage {
            Storage::Dense(a) => a * x,
            Storage::Sparse(upper) => upper.matvec(x),
        }
    }

    /// Gradient at `c`: `A c − b`.
    pub fn residual(&self, c: &DVector<f64>) -> DVector<f64> {
        self.matvec(c) - &self.b
    }

    /// True objective `½ wᵀAw − bᵀw`.
    pub fn energy(&self, w: &DVector<f64>) -> f64 {
        0.5 * w.dot(&self.matvec(w)) - self.b.dot(w)
    }

    /// Dense view; materialized for sparse storage.
    pub fn to_dense(&self) -> Cow<'_, DMatrix<f64>> {
        match &self.storage {
            Storage::Dense(a) => Cow::Borrowed(a),
            Storage::Sparse(upper) => Cow::Owned(upper.to_dense()),
        }
    }

    /// Upper-triangle cache; derived on the fly for dense storage.
    pub fn upper_triangle(&self) -> Cow<'_, UpperTriangle> {
        match &self.storage {
            Storage::Dense(a) => Cow::Owned(UpperTriangle::from_dense(a)),
            Storage::Sparse(upper) => Cow::Borrowed(upper),
        }
    }
}
