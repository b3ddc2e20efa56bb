//! Single-flip energy deltas over a template, shared by the local oracles.

use crate::encode::{Assignment, Template};

/// Linear coefficients plus symmetric adjacency of the quadratic terms.
pub(crate) struct FlipModel {
    linear: Vec<f64>,
    neighbors: Vec<Vec<(usize, f64)>>,
}

impl FlipModel {
    pub(crate) fn new(template: &Template) -> Self {
        let n = template.num_vars();
        let mut neighbors = vec![Vec::new(); n];
        for ((u, v), c) in template.quadratic() {
            neighbors[u].push((v, c));
            neighbors[v].push((u, c));
        }
        Self {
            linear: template.linear().to_vec(),
            neighbors,
        }
    }

    #[inline]
    pub(crate) fn num_vars(&self) -> usize {
        self.linear.len()
    }

    /// Energy change from flipping `var` in `x`.
    pub(crate) fn delta(&self, x: &Assignment, var: usize) -> f64 {
        let mut field = self.linear[var];
        for &(v, c) in &self.neighbors[var] {
            if x.get(v) {
                field += c;
            }
        }
        if x.get(var) {
            -field
        } else {
            field
        }
    }

    /// Largest possible single-flip magnitude; a natural starting temperature.
    pub(crate) fn max_field(&self) -> f64 {
        (0..self.num_vars())
            .map(|u| {
                self.linear[u].abs() + self.neighbors[u].iter().map(|(_, c)| c.abs()).sum::<f64>()
            })
            .fold(0.0, f64::max)
    }
}
