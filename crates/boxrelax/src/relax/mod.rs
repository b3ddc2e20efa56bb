//! Adaptive trust-region relaxation loop.
//!
//! Purpose
//! - Drive `RUNNING → {CONVERGED, ITER_EXHAUSTED, FAILED}`: build a template at
//!   `(center, scale)`, ask the oracle, decode `w = center + scale·δ`, accept if
//!   the energy improves, otherwise shrink `scale` by `beta`.
//! - Stop with `Converged` once `scale < epsilon`, with `IterExhausted` when
//!   the iteration budget runs out; oracle failures propagate as `Err`.
//!
//! Energy used for the accept test
//! - Always `f(candidate)` recomputed from the form after decoding (O(d²) or
//!   O(nnz) per iteration), for every strategy. Optimized/Sparse templates are
//!   masked and constant-free, and a Naive template's value at `δ = 0` is `f(c)`
//!   summed in a different order, so neither oracle objective is comparable
//!   bit-for-bit with `best_energy`.
//! - A zero displacement therefore reproduces `best_energy` exactly and is a
//!   reject. The accept sequence depends only on the oracle's argmin, not on
//!   the strategy.
//!
//! Runs are strictly sequential. Independent controllers share nothing
//! mutable and may run on separate threads against the same `&QuadraticForm`.

mod diagnostics;
mod potok;
mod state;

use std::time::Instant;

use crate::config::RelaxConfig;
use crate::encode::{MoveEncoder, Strategy};
use crate::error::{RelaxError, RelaxResult};
use crate::form::QuadraticForm;
use crate::oracle::{derive_seed, Oracle, OracleClient, SolveParams, Sleeper, ThreadSleeper};

pub use diagnostics::{
    exact_solution, solution_error, IterationRecord, Mode, RunRecord, RunReport, Timings,
};
pub use potok::{solve_potok, PotokReport};
pub use state::{RelaxationState, Termination};

/// Stream index reserved for the backoff jitter RNG.
const JITTER_STREAM: u64 = u64::MAX;

/// Owns the encoder, the oracle client and the configuration of one run.
pub struct TrustRegionController<'a, O, S = ThreadSleeper> {
    form: &'a QuadraticForm,
    encoder: Box<dyn MoveEncoder + 'a>,
    client: OracleClient<O, S>,
    config: RelaxConfig,
}

impl<'a, O: Oracle> TrustRegionController<'a, O, ThreadSleeper> {
    /// Validates `config`, runs the strategy's one-time precomputation and
    /// wraps `oracle` with the configured retry policy.
    pub fn new(
        form: &'a QuadraticForm,
        strategy: Strategy,
        oracle: O,
        config: RelaxConfig,
    ) -> RelaxResult<Self> {
        config.validate()?;
        let client = OracleClient::new(
            oracle,
            config.retry,
            derive_seed(config.seed, JITTER_STREAM),
        );
        Self::with_client(form, strategy.encoder(form), client, config)
    }
}

impl<'a, O: Oracle, S: Sleeper> TrustRegionController<'a, O, S> {
    pub fn with_client(
        form: &'a QuadraticForm,
        encoder: Box<dyn MoveEncoder + 'a>,
        client: OracleClient<O, S>,
        config: RelaxConfig,
    ) -> RelaxResult<Self> {
        config.validate()?;
        if encoder.moves().dim() != form.dim() {
            return Err(RelaxError::dims(format!(
                "encoder built for dimension {}, form has {}",
                encoder.moves().dim(),
                form.dim()
            )));
        }
        Ok(Self {
            form,
            encoder,
            client,
            config,
        })
    }

    pub fn config(&self) -> &RelaxConfig {
        &self.config
    }

    pub fn strategy(&self) -> Strategy {
        self.encoder.strategy()
    }

    pub fn client(&self) -> &OracleClient<O, S> {
        &self.client
    }

    /// Run to convergence or budget exhaustion.
    pub fn run(&mut self) -> RelaxResult<RunReport> {
        let cfg = self.config;
        let strategy = self.encoder.strategy();
        let mut state = RelaxationState::new(self.form.dim(), cfg.seed);
        let mut timings = Timings::default();
        let mut trace = Vec::with_capacity(cfg.max_iter);
        let mut accepted_centers = Vec::new();
        let mut status = Termination::IterExhausted;

        tracing::info!(
            %strategy,
            dim = self.form.dim(),
            sparse = self.form.is_sparse(),
            beta = cfg.beta,
            epsilon = cfg.epsilon,
            max_iter = cfg.max_iter,
            "relaxation start"
        );

        while state.iteration() < cfg.max_iter {
            let iteration = state.begin_iteration();
            let scale = state.scale();

            let t_encode = Instant::now();
            let template = self.encoder.build_template(state.center(), scale);
            let encode_time = t_encode.elapsed();

            let params = SolveParams {
                num_solves: cfg.num_solves,
                seed: state.oracle_seed(),
                timeout: cfg.timeout,
            };
            let t_wall = Instant::now();
            let outcome = self.client.solve(&template, &params).inspect_err(|err| {
                tracing::error!(iteration, %strategy, %err, "relaxation failed");
            })?;
            let wall_time = t_wall.elapsed();

            let candidate =
                self.encoder
                    .moves()
                    .candidate(state.center(), scale, &outcome.assignment)?;
            let energy = self.form.energy(&candidate);

            let accepted = energy < state.best_energy();
            if accepted {
                state.accept(candidate, energy);
                accepted_centers.push(state.center().clone());
            } else {
                state.reject(cfg.beta);
            }

            timings.add(encode_time, outcome.execution_time, wall_time);
            trace.push(IterationRecord {
                iteration,
                scale,
                candidate_energy: energy,
                accepted,
                best_energy: state.best_energy(),
                encode_time,
                solve_time: outcome.execution_time,
                wall_time,
            });
            tracing::debug!(
                iteration,
                scale,
                energy,
                best = state.best_energy(),
                accepted,
                oracle_objective = outcome.objective,
                terms = template.num_quadratic_terms(),
                "relaxation step"
            );

            if state.scale() < cfg.epsilon {
                status = Termination::Converged;
                break;
            }
        }

        let iterations = state.iteration();
        let best_energy = state.best_energy();
        let final_scale = state.scale();
        let center = state.into_center();
        let error = match solution_error(self.form, &center) {
            Ok(e) => Some(e),
            Err(err) => {
                tracing::warn!(%err, "error metric unavailable");
                None
            }
        };
        tracing::info!(
            %strategy,
            %status,
            iterations,
            best_energy,
            error = ?error,
            "relaxation done"
        );

        Ok(RunReport {
            strategy,
            status,
            center,
            best_energy,
            iterations,
            final_scale,
            timings,
            trace,
            accepted_centers,
            error,
            retry: self.client.stats(),
        })
    }
}

/// One-shot convenience: build a controller with the default backoff sleeper and run it.
pub fn relax<O: Oracle>(
    form: &QuadraticForm,
    strategy: Strategy,
    oracle: O,
    config: RelaxConfig,
) -> RelaxResult<RunReport> {
    TrustRegionController::new(form, strategy, oracle, config)?.run()
}

#[cfg(test)]
mod tests;
