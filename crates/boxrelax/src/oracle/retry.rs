//! Resilience wrapper around an `Oracle`: bounded retries with exponential backoff.
//!
//! Classification is content based only. The rendered error chain is
//! lower-cased and matched against `TRANSIENT_MARKERS` plus HTTP status 429
//! or any 5xx code appearing as a standalone three-digit token. Anything else
//! is fatal.

use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{Oracle, SolveOutcome, SolveParams};
use crate::config::RetryPolicy;
use crate::encode::Template;
use crate::error::{RelaxError, RelaxResult};

/// Substrings that mark a failure as worth retrying.
pub const TRANSIENT_MARKERS: &[&str] = &[
    "timeout",
    "timed out",
    "too many requests",
    "quota exceeded",
    "maximum retries exceeded",
    "internal server error",
    "bad gateway",
    "service unavailable",
];

/// 429 or `500..=599` as a standalone token.
fn is_transient_status(token: &str) -> bool {
    if token.len() != 3 || !token.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    matches!(token.parse::<u16>(), Ok(429) | Ok(500..=599))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureClass {
    Transient,
    Fatal,
}

/// Classify an oracle failure from its description alone.
pub fn classify(message: &str) -> FailureClass {
    let text = message.to_ascii_lowercase();
    let marker = TRANSIENT_MARKERS.iter().any(|m| text.contains(m));
    let status = text
        .split(|c: char| !c.is_ascii_alphanumeric())
        .any(is_transient_status);
    if marker || status {
        FailureClass::Transient
    } else {
        FailureClass::Fatal
    }
}

/// Blocking wait used between attempts.
pub trait Sleeper {
    fn sleep(&mut self, d: Duration);
}

#[derive(Clone, Copy, Debug, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&mut self, d: Duration) {
        std::thread::sleep(d);
    }
}

/// Cumulative counters over the client's lifetime.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RetryStats {
    /// Oracle invocations, retries included.
    pub calls: usize,
    pub retries: usize,
    pub slept: Duration,
}

/// Oracle plus retry policy, jitter RNG and a sleeper.
pub struct OracleClient<O, S = ThreadSleeper> {
    oracle: O,
    policy: RetryPolicy,
    sleeper: S,
    rng: StdRng,
    stats: RetryStats,
}

impl<O: Oracle> OracleClient<O, ThreadSleeper> {
    /// `seed` drives the backoff jitter only.
    pub fn new(oracle: O, policy: RetryPolicy, seed: u64) -> Self {
        Self::with_sleeper(oracle, policy, seed, ThreadSleeper)
    }
}

impl<O: Oracle, S: Sleeper> OracleClient<O, S> {
    pub fn with_sleeper(oracle: O, policy: RetryPolicy, seed: u64, sleeper: S) -> Self {
        Self {
            oracle,
            policy,
            sleeper,
            rng: StdRng::seed_from_u64(seed),
            stats: RetryStats::default(),
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn stats(&self) -> RetryStats {
        self.stats
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    pub fn sleeper(&self) -> &S {
        &self.sleeper
    }

    pub fn into_inner(self) -> O {
        self.oracle
    }

    fn jittered(&mut self, nominal: Duration) -> Duration {
        let j = self.policy.jitter_frac;
        if j == 0.0 {
            return nominal;
        }
        let u: f64 = self.rng.gen();
        nominal.mul_f64(1.0 + j * (2.0 * u - 1.0))
    }

    /// Solve with retries.
    ///
    /// - `Ok(None)` from the oracle is `NoSolutionReturned`, never retried.
    /// - Fatal content, or a transient failure on the last attempt, becomes
    ///   `FatalOracleFailure` carrying the oracle's message.
    pub fn solve(&mut self, template: &Template, params: &SolveParams) -> RelaxResult<SolveOutcome> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0usize;
        loop {
            attempt += 1;
            self.stats.calls += 1;
            let err = match self.oracle.solve(template, params) {
                Ok(Some(outcome)) => return Ok(outcome),
                Ok(None) => {
                    tracing::error!(attempt, "oracle returned no solutions");
                    return Err(RelaxError::NoSolutionReturned);
                }
                Err(err) => err,
            };
            let message = format!("{err:#}");
            let class = classify(&message);
            if class == FailureClass::Fatal || attempt >= max_attempts {
                tracing::error!(attempt, max_attempts, ?class, %message, "oracle failure is final");
                return Err(RelaxError::FatalOracleFailure {
                    attempts: attempt,
                    message,
                });
            }
            let nominal = self.policy.nominal_delay((attempt - 1) as u32);
            let pause = self.jittered(nominal);
            tracing::warn!(
                attempt,
                max_attempts,
                sleep_s = pause.as_secs_f64(),
                %message,
                "transient oracle failure, backing off"
            );
            self.sleeper.sleep(pause);
            self.stats.retries += 1;
            self.stats.slept += pause;
        }
    }
}
