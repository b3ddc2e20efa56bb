//! Oracle contract and in-process implementations.
//!
//! Purpose
//! - `Oracle`: best-effort minimizer of a binary quadratic `Template`. May be
//!   remote; failures are reported as `anyhow::Error` whose rendered text is
//!   all the retry layer looks at.
//! - `OracleClient`: exponential-backoff wrapper that separates transient from
//!   fatal failures by message content.
//! - `ExhaustiveOracle`, `AnnealingOracle`: local stand-ins for the remote
//!   service, used by tests and the CLI.
//!
//! Seeds are explicit: the controller derives one per iteration with
//! `derive_seed` and passes it in `SolveParams`.

mod anneal;
mod exhaustive;
mod flip;
mod retry;

use std::time::Duration;

use crate::encode::{Assignment, Template};

pub use anneal::AnnealingOracle;
pub use exhaustive::{ExhaustiveOracle, MAX_ENUMERABLE_VARS};
pub use retry::{
    classify, FailureClass, OracleClient, RetryStats, Sleeper, ThreadSleeper, TRANSIENT_MARKERS,
};

/// Per-call parameters forwarded to the oracle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SolveParams {
    pub num_solves: usize,
    pub seed: u64,
    pub timeout: Duration,
}

/// Best assignment found, its template value, and the oracle's own execution time.
#[derive(Clone, Debug, PartialEq)]
pub struct SolveOutcome {
    pub assignment: Assignment,
    pub objective: f64,
    pub execution_time: Duration,
}

/// External best-effort binary quadratic minimizer.
pub trait Oracle {
    /// `Ok(None)` means the oracle answered but produced no usable candidate.
    fn solve(
        &mut self,
        template: &Template,
        params: &SolveParams,
    ) -> anyhow::Result<Option<SolveOutcome>>;
}

impl<O: Oracle + ?Sized> Oracle for Box<O> {
    fn solve(
        &mut self,
        template: &Template,
        params: &SolveParams,
    ) -> anyhow::Result<Option<SolveOutcome>> {
        (**self).solve(template, params)
    }
}

impl<O: Oracle + ?Sized> Oracle for &mut O {
    fn solve(
        &mut self,
        template: &Template,
        params: &SolveParams,
    ) -> anyhow::Result<Option<SolveOutcome>> {
        (**self).solve(template, params)
    }
}

/// Mix `(seed, index)` into an independent stream seed (SplitMix64 finalizer).
pub fn derive_seed(seed: u64, index: u64) -> u64 {
    fn mix(mut x: u64) -> u64 {
        x ^= x >> 30;
        x = x.wrapping_mul(0xbf58476d1ce4e5b9);
        x ^= x >> 27;
        x = x.wrapping_mul(0x94d049bb133111eb);
        x ^ (x >> 31)
    }
    mix(seed ^ mix(index.wrapping_add(0x9e3779b97f4a7c15)))
}
