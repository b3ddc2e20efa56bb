//! Binary quadratic template (QUBO) handed to the oracle.
//!
//! `value(x) = constant + Σ_u linear[u]·x_u + Σ_{u<v} quadratic[(u,v)]·x_u·x_v`
//! with `x ∈ {0,1}^n`. Diagonal products fold into the linear part (`x² = x`).
//! Quadratic terms live in a `BTreeMap` so iteration order, and therefore
//! floating-point summation order, is deterministic.

use std::collections::BTreeMap;

use super::moves::{Assignment, BinaryAffine};

#[derive(Clone, Debug, PartialEq)]
pub struct Template {
    constant: f64,
    linear: Vec<f64>,
    quadratic: BTreeMap<(usize, usize), f64>,
}

impl Template {
    pub fn new(num_vars: usize) -> Self {
        Self {
            constant: 0.0,
            linear: vec![0.0; num_vars],
            quadratic: BTreeMap::new(),
        }
    }

    #[inline]
    pub fn num_vars(&self) -> usize {
        self.linear.len()
    }

    #[inline]
    pub fn constant(&self) -> f64 {
        self.constant
    }

    #[inline]
    pub fn linear(&self) -> &[f64] {
        &self.linear
    }

    /// Off-diagonal terms as `((u, v), coef)` with `u < v`.
    pub fn quadratic(&self) -> impl Iterator<Item = ((usize, usize), f64)> + '_ {
        self.quadratic.iter().map(|(&k, &v)| (k, v))
    }

    pub fn quadratic_coefficient(&self, u: usize, v: usize) -> f64 {
        let key = if u < v { (u, v) } else { (v, u) };
        self.quadratic.get(&key).copied().unwrap_or(0.0)
    }

    /// Number of stored off-diagonal terms.
    #[inline]
    pub fn num_quadratic_terms(&self) -> usize {
        self.quadratic.len()
    }

    pub fn add_constant(&mut self, c: f64) {
        self.constant += c;
    }

    pub fn add_linear(&mut self, var: usize, coef: f64) {
        self.linear[var] += coef;
    }

    pub fn add_quadratic(&mut self, u: usize, v: usize, coef: f64) {
        if coef == 0.0 {
            return;
        }
        if u == v {
            self.linear[u] += coef;
            return;
        }
        let key = if u < v { (u, v) } else { (v, u) };
        *self.quadratic.entry(key).or_insert(0.0) += coef;
    }

    /// Add `coef · p`.
    pub(crate) fn add_affine(&mut self, coef: f64, p: &BinaryAffine) {
        self.constant += coef * p.constant;
        for &(var, w) in &p.terms {
            self.linear[var] += coef * w;
        }
    }

    /// Add `coef · p · q`, expanded over binary variables.
    pub(crate) fn add_product(&mut self, coef: f64, p: &BinaryAffine, q: &BinaryAffine) {
        if coef == 0.0 {
            return;
        }
        self.constant += coef * p.constant * q.constant;
        for &(var, w) in &p.terms {
            self.linear[var] += coef * w * q.constant;
        }
        for &(var, w) in &q.terms {
            self.linear[var] += coef * w * p.constant;
        }
        for &(u, wu) in &p.terms {
            for &(v, wv) in &q.terms {
                self.add_quadratic(u, v, coef * wu * wv);
            }
        }
    }

    /// Copy with every coefficient multiplied by `s`.
    pub fn scaled(&self, s: f64) -> Self {
        Self {
            constant: self.constant * s,
            linear: self.linear.iter().map(|c| c * s).collect(),
            quadratic: self.quadratic.iter().map(|(&k, &v)| (k, v * s)).collect(),
        }
    }

    /// Template value at `x`.
    pub fn evaluate(&self, x: &Assignment) -> f64 {
        debug_assert_eq!(x.len(), self.num_vars());
        let mut acc = self.constant;
        for (u, &c) in self.linear.iter().enumerate() {
            if x.get(u) {
                acc += c;
            }
        }
        for (&(u, v), &c) in &self.quadratic {
            if x.get(u) && x.get(v) {
                acc += c;
            }
        }
        acc
    }

    /// Coefficient-wise comparison, absent terms count as zero.
    ///
    /// `tol` is relative to the largest coefficient magnitude of either side.
    pub fn approx_eq(&self, other: &Template, tol: f64) -> bool {
        if self.num_vars() != other.num_vars() {
            return false;
        }
        let scale = self.max_abs_coefficient().max(other.max_abs_coefficient()).max(1.0);
        let close = |a: f64, b: f64| (a - b).abs() <= tol * scale;
        if !close(self.constant, other.constant) {
            return false;
        }
        if !self
            .linear
            .iter()
            .zip(&other.linear)
            .all(|(&a, &b)| close(a, b))
        {
            return false;
        }
        let mut keys = self.quadratic.keys().chain(other.quadratic.keys());
        keys.all(|&(u, v)| {
            close(
                self.quadratic_coefficient(u, v),
                other.quadratic_coefficient(u, v),
            )
        })
    }

    fn max_abs_coefficient(&self) -> f64 {
        let lin = self.linear.iter().fold(0.0_f64, |m, c| m.max(c.abs()));
        let quad = self.quadratic.values().fold(0.0_f64, |m, c| m.max(c.abs()));
        self.constant.abs().max(lin).max(quad)
    }
}
