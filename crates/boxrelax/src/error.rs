//! Error taxonomy for the relaxation core.
//!
//! - `DimensionMismatch`: input validation of `(A, b)` and of triplets.
//! - `InvalidConfig`: parameters outside their admissible ranges.
//! - `FatalOracleFailure`: non-retryable oracle content, or the retry budget ran out.
//!   The last oracle message is kept verbatim.
//! - `NoSolutionReturned`: the oracle answered without a usable candidate. Never retried.
//! - `SingularSystem`: the direct solve used for the error metric failed.
//!
//! Transient failures are not a variant here: they are a `FailureClass` used
//! inside the retry loop and only surface as `warn!` events.

use thiserror::Error;

/// Result alias used across the crate.
pub type RelaxResult<T> = Result<T, RelaxError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RelaxError {
    #[error("dimension mismatch: {reason}")]
    DimensionMismatch { reason: String },

    #[error("invalid config: {reason}")]
    InvalidConfig { reason: String },

    #[error("fatal oracle failure after {attempts} attempt(s): {message}")]
    FatalOracleFailure { attempts: usize, message: String },

    #[error("oracle returned no solutions")]
    NoSolutionReturned,

    #[error("singular system: {reason}")]
    SingularSystem { reason: String },
}

impl RelaxError {
    pub(crate) fn dims(reason: impl Into<String>) -> Self {
        Self::DimensionMismatch {
            reason: reason.into(),
        }
    }

    pub(crate) fn config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// True for failures that ended a run because of the oracle.
    pub fn is_oracle_failure(&self) -> bool {
        matches!(
            self,
            Self::FatalOracleFailure { .. } | Self::NoSolutionReturned
        )
    }
}
