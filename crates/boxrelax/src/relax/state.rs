//! Mutable state of one run and its terminal statuses.

use std::fmt;

use nalgebra::DVector;
use serde::Serialize;

use crate::oracle::derive_seed;

/// How a run ended without an error. Failures are `Err(RelaxError)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// `scale < epsilon`.
    Converged,
    /// Iteration budget spent first.
    IterExhausted,
    /// One-shot solve finished; there is no scale to converge.
    SingleShot,
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::Converged => write!(f, "converged"),
            Termination::IterExhausted => write!(f, "iter_exhausted"),
            Termination::SingleShot => write!(f, "single_shot"),
        }
    }
}

/// `center` changes only on accept, `scale` only on reject.
#[derive(Clone, Debug)]
pub struct RelaxationState {
    center: DVector<f64>,
    scale: f64,
    best_energy: f64,
    iteration: usize,
    seed: u64,
}

impl RelaxationState {
    /// `center = 0`, `scale = 1`, `best_energy = +∞`.
    pub fn new(dim: usize, seed: u64) -> Self {
        Self {
            center: DVector::zeros(dim),
            scale: 1.0,
            best_energy: f64::INFINITY,
            iteration: 0,
            seed,
        }
    }

    #[inline]
    pub fn center(&self) -> &DVector<f64> {
        &self.center
    }

    #[inline]
    pub fn scale(&self) -> f64 {
        self.scale
    }

    #[inline]
    pub fn best_energy(&self) -> f64 {
        self.best_energy
    }

    #[inline]
    pub fn iteration(&self) -> usize {
        self.iteration
    }

    pub(crate) fn begin_iteration(&mut self) -> usize {
        self.iteration += 1;
        self.iteration
    }

    /// Seed handed to the oracle for the current iteration.
    pub fn oracle_seed(&self) -> u64 {
        derive_seed(self.seed, self.iteration as u64)
    }

    pub(crate) fn accept(&mut self, candidate: DVector<f64>, energy: f64) {
        debug_assert!(energy < self.best_energy);
        self.center = candidate;
        self.best_energy = energy;
    }

    pub(crate) fn reject(&mut self, beta: f64) {
        self.scale *= beta;
    }

    pub(crate) fn into_center(self) -> DVector<f64> {
        self.center
    }
}
