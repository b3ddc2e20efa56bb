//! Seeded simulated annealing over single-bit flips.

use std::time::Instant;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::flip::FlipModel;
use super::{derive_seed, Oracle, SolveOutcome, SolveParams};
use crate::encode::{Assignment, Template};

/// Metropolis annealing with a geometric schedule from `max_field` down to
/// `max_field · final_temperature_ratio`, followed by greedy descent.
///
/// - One restart per `num_solves`, each seeded from `(params.seed, restart)`.
/// - The best state visited across all restarts is returned.
/// - With `honor_timeout`, restarts after the first are skipped once
///   `params.timeout` has elapsed. The answer then depends on wall-clock
///   time; without it the result is a function of the template and seed only.
#[derive(Clone, Copy, Debug)]
pub struct AnnealingOracle {
    pub sweeps: usize,
    pub final_temperature_ratio: f64,
    pub honor_timeout: bool,
}

impl Default for AnnealingOracle {
    fn default() -> Self {
        Self {
            sweeps: 1000,
            final_temperature_ratio: 1e-3,
            honor_timeout: false,
        }
    }
}

impl AnnealingOracle {
    fn run_once(
        &self,
        template: &Template,
        model: &FlipModel,
        rng: &mut StdRng,
    ) -> (Assignment, f64) {
        let n = model.num_vars();
        let mut x = Assignment::from_bits((0..n).map(|_| rng.gen::<bool>()).collect());
        let mut energy = template.evaluate(&x);
        let mut best = x.clone();
        let mut best_energy = energy;

        let t0 = model.max_field().max(f64::MIN_POSITIVE);
        let t1 = t0 * self.final_temperature_ratio;
        let sweeps = self.sweeps.max(1);
        let cooling = if sweeps > 1 {
            (t1 / t0).powf(1.0 / (sweeps - 1) as f64)
        } else {
            1.0
        };
        let mut temp = t0;
        for _ in 0..sweeps {
            for var in 0..n {
                let de = model.delta(&x, var);
                if de <= 0.0 || rng.gen::<f64>() < (-de / temp).exp() {
                    x.flip(var);
                    energy += de;
                    if energy < best_energy {
                        best_energy = energy;
                        best.clone_from(&x);
                    }
                }
            }
            temp *= cooling;
        }

        // greedy polish of the best state
        loop {
            let mut improved = false;
            for var in 0..n {
                let de = model.delta(&best, var);
                if de < 0.0 {
                    best.flip(var);
                    best_energy += de;
                    improved = true;
                }
            }
            if !improved {
                break;
            }
        }
        (best, best_energy)
    }
}

impl Oracle for AnnealingOracle {
    fn solve(
        &mut self,
        template: &Template,
        params: &SolveParams,
    ) -> anyhow::Result<Option<SolveOutcome>> {
        let start = Instant::now();
        let model = FlipModel::new(template);
        let mut best: Option<(Assignment, f64)> = None;
        for restart in 0..params.num_solves.max(1) {
            if self.honor_timeout && restart > 0 && start.elapsed() >= params.timeout {
                break;
            }
            let mut rng = StdRng::seed_from_u64(derive_seed(params.seed, restart as u64));
            let (x, e) = self.run_once(template, &model, &mut rng);
            if best.as_ref().map_or(true, |(_, b)| e < *b) {
                best = Some((x, e));
            }
        }
        Ok(best.map(|(assignment, _)| {
            let objective = template.evaluate(&assignment);
            SolveOutcome {
                assignment,
                objective,
                execution_time: start.elapsed(),
            }
        }))
    }
}
