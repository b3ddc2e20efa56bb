//! One-shot fixed-point solve: encode the whole objective once, call the
//! oracle once through the retrying client, decode the weights.
//!
//! Reuses the run configuration: `num_solves`, `timeout`, `seed` and `retry`
//! apply as in the trust-region loop; `beta`, `epsilon` and `max_iter` do not.

use std::time::Instant;

use nalgebra::DVector;

use super::diagnostics::{solution_error, Mode, RunRecord, Timings};
use super::state::Termination;
use super::JITTER_STREAM;
use crate::config::RelaxConfig;
use crate::encode::{PotokEncoder, PrecisionVector};
use crate::error::RelaxResult;
use crate::form::QuadraticForm;
use crate::oracle::{derive_seed, Oracle, OracleClient, RetryStats, SolveParams};

/// Result of a one-shot solve.
#[derive(Clone, Debug)]
pub struct PotokReport {
    pub center: DVector<f64>,
    /// `f(center)` recomputed from the form.
    pub energy: f64,
    /// Objective reported by the oracle.
    pub oracle_objective: f64,
    pub timings: Timings,
    pub error: Option<f64>,
    pub retry: RetryStats,
}

impl PotokReport {
    pub fn record(&self) -> RunRecord {
        RunRecord {
            mode: Mode::Potok,
            status: Termination::SingleShot,
            iterations: 1,
            encode_time: self.timings.encode.as_secs_f64(),
            anneal_time: self.timings.anneal.as_secs_f64(),
            total_time: self.timings.total().as_secs_f64(),
            wall_time: self.timings.wall().as_secs_f64(),
            network_time: self.timings.network().as_secs_f64(),
            error: self.error,
        }
    }
}

/// Solve `form` once under the precision vector `precision`.
pub fn solve_potok<O: Oracle>(
    form: &QuadraticForm,
    precision: PrecisionVector,
    oracle: O,
    config: RelaxConfig,
) -> RelaxResult<PotokReport> {
    config.validate()?;
    let mut client = OracleClient::new(
        oracle,
        config.retry,
        derive_seed(config.seed, JITTER_STREAM),
    );

    let t_encode = Instant::now();
    let encoder = PotokEncoder::new(form, precision);
    let encode_time = t_encode.elapsed();
    tracing::info!(
        dim = form.dim(),
        bits = encoder.precision().bits(),
        vars = encoder.template().num_vars(),
        "potok start"
    );

    let params = SolveParams {
        num_solves: config.num_solves,
        seed: derive_seed(config.seed, 1),
        timeout: config.timeout,
    };
    let t_wall = Instant::now();
    let outcome = client
        .solve(encoder.template(), &params)
        .inspect_err(|err| tracing::error!(%err, "potok solve failed"))?;
    let wall_time = t_wall.elapsed();

    let center = encoder.decode(&outcome.assignment)?;
    let energy = form.energy(&center);
    let mut timings = Timings::default();
    timings.add(encode_time, outcome.execution_time, wall_time);
    let error = match solution_error(form, &center) {
        Ok(e) => Some(e),
        Err(err) => {
            tracing::warn!(%err, "error metric unavailable");
            None
        }
    };
    tracing::info!(energy, error = ?error, "potok done");

    Ok(PotokReport {
        center,
        energy,
        oracle_objective: outcome.objective,
        timings,
        error,
        retry: client.stats(),
    })
}
