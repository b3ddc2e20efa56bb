//! Move encoders: turn `(center, scale)` into a binary quadratic template.
//!
//! Purpose
//! - Build the discrete subproblem whose minimizer decodes to a candidate step
//!   `w = center + scale·δ(q1, q2)`.
//! - Three strategies with identical decoding and different costs:
//!   `Naive` (full O(d²) expansion per call), `Optimized` (dense, quadratic
//!   block precomputed), `Sparse` (precomputed over the cached upper triangle).
//! - `PotokEncoder`: the one-shot fixed-point alternative, encoding the whole
//!   objective over a precision vector instead of a local move.
//!
//! Design notes
//! - Templates are plain values (`Template`), not symbolic expression trees.
//! - The tolerance mask is an explicit index selection (`mask::active_indices`)
//!   decoupled from assembly.
//!
//! Code cross-refs: `form::QuadraticForm`, `relax::TrustRegionController`.

mod mask;
mod moves;
mod naive;
mod potok;
mod precomputed;
mod template;

use std::fmt;
use std::str::FromStr;

use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::form::QuadraticForm;

pub use mask::{active_indices, mask_tolerance, MASK_REL_EPS};
pub use moves::{Assignment, DiscreteMove, LEVELS, Q1_WEIGHT, Q2_WEIGHT};
pub use naive::NaiveEncoder;
pub use potok::{PotokEncoder, PrecisionVector, PRECISION_STEP};
pub use precomputed::{OptimizedEncoder, SparseEncoder};
pub use template::Template;

/// Builds templates for one `QuadraticForm`.
pub trait MoveEncoder {
    fn strategy(&self) -> Strategy;

    /// The fixed `(q1, q2) → δ` mapping used to decode oracle answers.
    fn moves(&self) -> &DiscreteMove;

    /// Template for a move of size `scale` around `center`.
    ///
    /// Panics if `center` has the wrong length or `scale <= 0`.
    fn build_template(&self, center: &DVector<f64>, scale: f64) -> Template;

    /// True if the template value equals `f(candidate)`, constant included.
    fn template_is_exact(&self) -> bool {
        false
    }
}

/// Encoding strategy selector.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    #[default]
    Naive,
    Optimized,
    Sparse,
}

impl Strategy {
    pub const ALL: [Strategy; 3] = [Strategy::Naive, Strategy::Optimized, Strategy::Sparse];

    /// Default shrink factor: 0.5 for Naive, 0.2 for the precomputed variants.
    pub fn default_beta(self) -> f64 {
        match self {
            Strategy::Naive => 0.5,
            Strategy::Optimized | Strategy::Sparse => 0.2,
        }
    }

    /// Construct the encoder (runs any one-time precomputation).
    pub fn encoder<'a>(self, form: &'a QuadraticForm) -> Box<dyn MoveEncoder + 'a> {
        match self {
            Strategy::Naive => Box::new(NaiveEncoder::new(form)),
            Strategy::Optimized => Box::new(OptimizedEncoder::new(form)),
            Strategy::Sparse => Box::new(SparseEncoder::new(form)),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Naive => write!(f, "naive"),
            Strategy::Optimized => write!(f, "optimized"),
            Strategy::Sparse => write!(f, "sparse"),
        }
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "naive" | "box-naive" => Ok(Strategy::Naive),
            "optimized" | "opt" | "box-opt" => Ok(Strategy::Optimized),
            "sparse" | "box-opt-sparse" => Ok(Strategy::Sparse),
            other => Err(format!("unknown strategy '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests;
