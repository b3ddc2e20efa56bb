//! Timing breakdown, per-iteration trace and the exported result record.

use std::fmt;
use std::time::Duration;

use nalgebra::DVector;
use serde::Serialize;

use super::state::Termination;
use crate::encode::Strategy;
use crate::error::{RelaxError, RelaxResult};
use crate::form::QuadraticForm;
use crate::oracle::RetryStats;

/// Accumulated phase durations.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Timings {
    /// Template construction on our side.
    pub encode: Duration,
    /// Execution time reported by the oracle.
    pub anneal: Duration,
    /// Wall time spent waiting on the oracle, retries and backoff included.
    pub oracle_wall: Duration,
}

impl Timings {
    pub(crate) fn add(&mut self, encode: Duration, anneal: Duration, oracle_wall: Duration) {
        self.encode += encode;
        self.anneal += anneal;
        self.oracle_wall += oracle_wall;
    }

    /// Algorithmic cost only: encode + anneal.
    pub fn total(&self) -> Duration {
        self.encode + self.anneal
    }

    /// Encode + oracle wall time.
    pub fn wall(&self) -> Duration {
        self.encode + self.oracle_wall
    }

    /// Oracle wall time not covered by its reported execution time.
    pub fn network(&self) -> Duration {
        self.oracle_wall.saturating_sub(self.anneal)
    }
}

/// One accept/reject step.
#[derive(Clone, Debug, PartialEq)]
pub struct IterationRecord {
    pub iteration: usize,
    /// Scale the template was built with.
    pub scale: f64,
    pub candidate_energy: f64,
    pub accepted: bool,
    /// Best energy after this step.
    pub best_energy: f64,
    pub encode_time: Duration,
    pub solve_time: Duration,
    pub wall_time: Duration,
}

/// Which solver produced a record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Naive,
    Optimized,
    Sparse,
    /// One-shot fixed-point encoding.
    Potok,
}

impl From<Strategy> for Mode {
    fn from(s: Strategy) -> Self {
        match s {
            Strategy::Naive => Mode::Naive,
            Strategy::Optimized => Mode::Optimized,
            Strategy::Sparse => Mode::Sparse,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Naive => write!(f, "naive"),
            Mode::Optimized => write!(f, "optimized"),
            Mode::Sparse => write!(f, "sparse"),
            Mode::Potok => write!(f, "potok"),
        }
    }
}

/// Flat record for the external logger; times in seconds.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RunRecord {
    pub mode: Mode,
    pub status: Termination,
    pub iterations: usize,
    pub encode_time: f64,
    pub anneal_time: f64,
    pub total_time: f64,
    pub wall_time: f64,
    pub network_time: f64,
    /// `‖center − A⁻¹b‖`; `None` when the direct solve failed.
    pub error: Option<f64>,
}

/// Everything a finished run produced.
#[derive(Clone, Debug)]
pub struct RunReport {
    pub strategy: Strategy,
    pub status: Termination,
    pub center: DVector<f64>,
    pub best_energy: f64,
    pub iterations: usize,
    pub final_scale: f64,
    pub timings: Timings,
    pub trace: Vec<IterationRecord>,
    /// Center after every accept, in order.
    pub accepted_centers: Vec<DVector<f64>>,
    pub error: Option<f64>,
    pub retry: RetryStats,
}

impl RunReport {
    pub fn record(&self) -> RunRecord {
        RunRecord {
            mode: self.strategy.into(),
            status: self.status,
            iterations: self.iterations,
            encode_time: self.timings.encode.as_secs_f64(),
            anneal_time: self.timings.anneal.as_secs_f64(),
            total_time: self.timings.total().as_secs_f64(),
            wall_time: self.timings.wall().as_secs_f64(),
            network_time: self.timings.network().as_secs_f64(),
            error: self.error,
        }
    }

    pub fn converged(&self) -> bool {
        self.status == Termination::Converged
    }

    pub fn rejects(&self) -> usize {
        self.trace.iter().filter(|r| !r.accepted).count()
    }
}

/// `‖center − x*‖₂` with `x*` from an LU solve of `A x = b`.
pub fn solution_error(form: &QuadraticForm, center: &DVector<f64>) -> RelaxResult<f64> {
    let exact = exact_solution(form)?;
    Ok((center - exact).norm())
}

pub fn exact_solution(form: &QuadraticForm) -> RelaxResult<DVector<f64>> {
    let a = form.to_dense().into_owned();
    a.lu()
        .solve(form.b())
        .ok_or_else(|| RelaxError::SingularSystem {
            reason: format!("LU solve failed for a {0}x{0} system", form.dim()),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::identity_form;
    use nalgebra::{dmatrix, dvector};

    #[test]
    fn timing_identities() {
        let mut t = Timings::default();
        t.add(
            Duration::from_millis(2),
            Duration::from_millis(5),
            Duration::from_millis(9),
        );
        t.add(
            Duration::from_millis(1),
            Duration::from_millis(5),
            Duration::from_millis(6),
        );
        assert_eq!(t.total(), Duration::from_millis(13));
        assert_eq!(t.wall(), Duration::from_millis(18));
        assert_eq!(t.network(), Duration::from_millis(5));
    }

    #[test]
    fn error_against_direct_solve() {
        let form = identity_form(3);
        let err = solution_error(&form, &dvector![1.0, 1.0, 0.0]).unwrap();
        assert!((err - 1.0).abs() < 1e-12);
    }

    #[test]
    fn singular_system_is_reported() {
        let form = QuadraticForm::dense(dmatrix![1.0, 1.0; 1.0, 1.0], dvector![1.0, 2.0]).unwrap();
        assert!(matches!(
            exact_solution(&form),
            Err(RelaxError::SingularSystem { .. })
        ));
    }

    #[test]
    fn record_serializes_with_snake_case_status() {
        let report = RunReport {
            strategy: Strategy::Sparse,
            status: Termination::IterExhausted,
            center: dvector![0.0],
            best_energy: 0.0,
            iterations: 3,
            final_scale: 1.0,
            timings: Timings::default(),
            trace: Vec::new(),
            accepted_centers: Vec::new(),
            error: Some(0.5),
            retry: RetryStats::default(),
        };
        let json = serde_json::to_value(report.record()).unwrap();
        assert_eq!(json["mode"], "sparse");
        assert_eq!(json["status"], "iter_exhausted");
        assert_eq!(json["iterations"], 3);
        assert_eq!(json["error"], 0.5);
    }
}
