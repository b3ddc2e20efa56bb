//! Problem and config files.
//!
//! Two problem layouts are accepted:
//! - dense: `{ "a": [[..], ..], "b": [..] }`, rows of `A`;
//! - sparse: `{ "dim": n, "triplets": [[i, j, v], ..], "b": [..] }`, COO
//!   entries of the full symmetric matrix (entries below the diagonal are
//!   ignored in favour of their mirror);
//! - regression: `{ "x": [[..], ..], "y": [..] }`, rows of the design matrix
//!   and the targets, turned into the normal equations `XᵀX w = Xᵀy`.

use anyhow::{bail, Context, Result};
use boxrelax::encode::Strategy;
use boxrelax::{QuadraticForm, RelaxConfig};
use nalgebra::{DMatrix, DVector};
use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ProblemFile {
    Dense {
        a: Vec<Vec<f64>>,
        b: Vec<f64>,
    },
    Sparse {
        dim: usize,
        triplets: Vec<(usize, usize, f64)>,
        b: Vec<f64>,
    },
    Regression {
        x: Vec<Vec<f64>>,
        y: Vec<f64>,
    },
}

impl ProblemFile {
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        serde_json::from_slice(&bytes).with_context(|| format!("parsing {}", path.display()))
    }

    /// Build the form. Sparse files always get the cached upper triangle;
    /// dense files get it too when `strategy` is `Sparse`.
    pub fn into_form(self, strategy: Strategy) -> Result<QuadraticForm> {
        let form = match self {
            ProblemFile::Dense { a, b } => {
                let n = a.len();
                if let Some((i, row)) = a.iter().enumerate().find(|(_, r)| r.len() != n) {
                    bail!("row {i} of A has {} entries, expected {n}", row.len());
                }
                let a = DMatrix::from_fn(n, n, |i, j| a[i][j]);
                let b = DVector::from_vec(b);
                if strategy == Strategy::Sparse {
                    QuadraticForm::sparse_from_dense(&a, b)?
                } else {
                    QuadraticForm::dense(a, b)?
                }
            }
            ProblemFile::Sparse { dim, triplets, b } => {
                QuadraticForm::sparse(dim, &triplets, DVector::from_vec(b))?
            }
            ProblemFile::Regression { x, y } => {
                let n = x.first().map_or(0, Vec::len);
                if let Some((i, row)) = x.iter().enumerate().find(|(_, r)| r.len() != n) {
                    bail!("row {i} of X has {} entries, expected {n}", row.len());
                }
                let x = DMatrix::from_fn(x.len(), n, |i, j| x[i][j]);
                let form = QuadraticForm::normal_equations(&x, &DVector::from_vec(y))?;
                if strategy == Strategy::Sparse {
                    QuadraticForm::sparse_from_dense(&form.to_dense(), form.b().clone())?
                } else {
                    form
                }
            }
        };
        Ok(form)
    }
}

/// Read a run config; `beta` falls back to the strategy's default when absent.
pub fn load_config(path: Option<&Path>, strategy: Strategy) -> Result<RelaxConfig> {
    let Some(path) = path else {
        return Ok(RelaxConfig::for_strategy(strategy));
    };
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let raw: Value =
        serde_json::from_slice(&bytes).with_context(|| format!("parsing {}", path.display()))?;
    let has_beta = raw.get("beta").is_some();
    let mut cfg: RelaxConfig = serde_json::from_value(raw)
        .with_context(|| format!("invalid config in {}", path.display()))?;
    if !has_beta {
        cfg.beta = strategy.default_beta();
    }
    cfg.validate()?;
    Ok(cfg)
}
