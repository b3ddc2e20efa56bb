//! Run configuration (defaults, builders, validation).
//!
//! Durations serialize as integer milliseconds so config files stay readable:
//! `{"beta": 0.5, "timeout_ms": 1000, "retry": {"base_delay_ms": 1000}}`.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::encode::Strategy;
use crate::error::{RelaxError, RelaxResult};

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

/// Exponential backoff for transient oracle failures.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total tries, first call included.
    pub max_attempts: usize,
    #[serde(rename = "base_delay_ms", with = "duration_ms")]
    pub base_delay: Duration,
    #[serde(rename = "max_delay_ms", with = "duration_ms")]
    pub max_delay: Duration,
    /// Each sleep is multiplied by a uniform factor in `[1 − j, 1 + j)`.
    pub jitter_frac: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 6,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            jitter_frac: 0.2,
        }
    }
}

impl RetryPolicy {
    pub fn validate(&self) -> RelaxResult<()> {
        if self.max_attempts == 0 {
            return Err(RelaxError::config("retry.max_attempts must be at least 1"));
        }
        if !(0.0..1.0).contains(&self.jitter_frac) {
            return Err(RelaxError::config(format!(
                "retry.jitter_frac must lie in [0, 1), got {}",
                self.jitter_frac
            )));
        }
        if self.max_delay < self.base_delay {
            return Err(RelaxError::config("retry.max_delay is below retry.base_delay"));
        }
        Ok(())
    }

    /// Un-jittered delay before retry number `retry` (0-based), capped.
    pub fn nominal_delay(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry);
        self.base_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |d| d.min(self.max_delay))
    }
}

/// Trust-region run parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelaxConfig {
    /// Multiplicative shrink on reject, in (0, 1).
    pub beta: f64,
    /// Converged once `scale < epsilon`.
    pub epsilon: f64,
    pub max_iter: usize,
    /// Forwarded to the oracle.
    pub num_solves: usize,
    #[serde(rename = "timeout_ms", with = "duration_ms")]
    pub timeout: Duration,
    pub seed: u64,
    pub retry: RetryPolicy,
}

impl Default for RelaxConfig {
    fn default() -> Self {
        Self {
            beta: Strategy::Naive.default_beta(),
            epsilon: 1e-6,
            max_iter: 50,
            num_solves: 1,
            timeout: Duration::from_millis(1000),
            seed: 0,
            retry: RetryPolicy::default(),
        }
    }
}

impl RelaxConfig {
    /// Defaults with the strategy's shrink factor.
    pub fn for_strategy(strategy: Strategy) -> Self {
        Self {
            beta: strategy.default_beta(),
            ..Self::default()
        }
    }

    pub fn with_beta(mut self, beta: f64) -> Self {
        self.beta = beta;
        self
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_num_solves(mut self, num_solves: usize) -> Self {
        self.num_solves = num_solves;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn validate(&self) -> RelaxResult<()> {
        if !(self.beta > 0.0 && self.beta < 1.0) {
            return Err(RelaxError::config(format!(
                "beta must lie in (0, 1), got {}",
                self.beta
            )));
        }
        if !(self.epsilon > 0.0) {
            return Err(RelaxError::config(format!(
                "epsilon must be positive, got {}",
                self.epsilon
            )));
        }
        if self.max_iter == 0 {
            return Err(RelaxError::config("max_iter must be at least 1"));
        }
        if self.num_solves == 0 {
            return Err(RelaxError::config("num_solves must be at least 1"));
        }
        self.retry.validate()
    }

    /// Upper bound on consecutive rejects before `scale < epsilon`: `⌈log_β ε⌉`.
    pub fn max_rejects(&self) -> usize {
        (self.epsilon.ln() / self.beta.ln()).ceil().max(0.0) as usize
    }
}
