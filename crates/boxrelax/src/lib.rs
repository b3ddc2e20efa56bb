//! Least-squares by adaptive trust-region relaxation onto binary quadratic subproblems.
//!
//! Minimizes `f(w) = ½ wᵀAw − bᵀw` by repeatedly encoding a bounded local move
//! around the current estimate as a QUBO template, handing it to an external
//! best-effort oracle, and accepting or shrinking based on the true objective.
//!
//! Layout
//! - `form`: the problem instance `(A, b)` with dense or cached-sparse storage.
//! - `encode`: move encoders (Naive, Optimized, Sparse) producing `Template`s.
//! - `oracle`: the oracle contract, retry/backoff client, local oracles.
//! - `relax`: the trust-region controller, the one-shot fixed-point solve,
//!   run state and diagnostics.
//! - `config`: run and retry parameters.

pub mod config;
pub mod encode;
pub mod error;
pub mod form;
pub mod oracle;
pub mod relax;

#[cfg(test)]
mod testutil;

/// Library version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use config::{RelaxConfig, RetryPolicy};
pub use error::{RelaxError, RelaxResult};
pub use form::QuadraticForm;

/// Common exports for callers driving a run.
pub mod prelude {
    pub use crate::config::{RelaxConfig, RetryPolicy};
    pub use crate::encode::{Assignment, MoveEncoder, PrecisionVector, Strategy, Template};
    pub use crate::error::{RelaxError, RelaxResult};
    pub use crate::form::QuadraticForm;
    pub use crate::oracle::{
        AnnealingOracle, ExhaustiveOracle, Oracle, OracleClient, SolveOutcome, SolveParams,
    };
    pub use crate::relax::{
        relax, solve_potok, Mode, PotokReport, RunRecord, RunReport, Termination,
        TrustRegionController,
    };
}
