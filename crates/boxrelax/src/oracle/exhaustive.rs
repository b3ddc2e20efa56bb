//! Exact oracle by Gray-code enumeration of all assignments.

use std::time::Instant;

use anyhow::bail;

use super::flip::FlipModel;
use super::{Oracle, SolveOutcome, SolveParams};
use crate::encode::{Assignment, Template};

/// Largest variable count the enumeration can index with a `u64` counter.
pub const MAX_ENUMERABLE_VARS: usize = 63;

/// Exact argmin over `{0,1}^n` for small `n`; ties go to the first assignment
/// reached in Gray-code order. `num_solves`, `seed` and `timeout` are ignored.
///
/// `max_vars` above `MAX_ENUMERABLE_VARS` is treated as `MAX_ENUMERABLE_VARS`.
#[derive(Clone, Copy, Debug)]
pub struct ExhaustiveOracle {
    pub max_vars: usize,
}

impl Default for ExhaustiveOracle {
    fn default() -> Self {
        Self { max_vars: 22 }
    }
}

impl Oracle for ExhaustiveOracle {
    fn solve(
        &mut self,
        template: &Template,
        _params: &SolveParams,
    ) -> anyhow::Result<Option<SolveOutcome>> {
        let n = template.num_vars();
        let limit = self.max_vars.min(MAX_ENUMERABLE_VARS);
        if n > limit {
            bail!(
                "invalid request: template has {n} variables, exhaustive search supports at most {limit}"
            );
        }
        let start = Instant::now();
        let model = FlipModel::new(template);
        let mut x = Assignment::zeros(n);
        let mut energy = template.constant();
        let mut best = x.clone();
        let mut best_energy = energy;
        for k in 1u64..(1u64 << n) {
            let var = k.trailing_zeros() as usize;
            energy += model.delta(&x, var);
            x.flip(var);
            if energy < best_energy {
                best_energy = energy;
                best.clone_from(&x);
            }
        }
        let objective = template.evaluate(&best);
        Ok(Some(SolveOutcome {
            assignment: best,
            objective,
            execution_time: start.elapsed(),
        }))
    }
}
