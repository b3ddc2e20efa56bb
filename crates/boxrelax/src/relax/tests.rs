use super::*;
use crate::config::RetryPolicy;
use crate::encode::{PrecisionVector, SparseEncoder, Template};
use crate::oracle::{AnnealingOracle, ExhaustiveOracle, SolveOutcome};
use crate::testutil::{identity_form, random_form, random_spd, random_vec};
use anyhow::anyhow;
use nalgebra::{DMatrix, DVector};
use std::time::Duration;

fn exhaustive_run(form: &QuadraticForm, strategy: Strategy, cfg: RelaxConfig) -> RunReport {
    relax(form, strategy, ExhaustiveOracle::default(), cfg).unwrap()
}

#[test]
fn identity_problem_converges_for_every_strategy() {
    let form = identity_form(3);
    for strategy in Strategy::ALL {
        let cfg = RelaxConfig::for_strategy(strategy)
            .with_max_iter(40)
            .with_seed(7);
        let report = exhaustive_run(&form, strategy, cfg);
        assert!(report.converged(), "{strategy}");
        assert!(report.error.unwrap() < 1e-2, "{strategy}");
        assert!(report.iterations <= 40);
        assert!(report.final_scale < 1e-6);
        assert!((report.best_energy + 1.5).abs() < 1e-12);
    }
}

#[test]
fn identity_problem_converges_with_annealing_oracle() {
    let form = identity_form(3);
    let cfg = RelaxConfig::for_strategy(Strategy::Sparse)
        .with_max_iter(40)
        .with_num_solves(4)
        .with_seed(3);
    let report = relax(&form, Strategy::Sparse, AnnealingOracle::default(), cfg).unwrap();
    assert!(report.error.unwrap() < 1e-2);
}

#[test]
fn strategies_follow_the_same_trajectory() {
    for seed in [1u64, 2, 3] {
        let form = random_form(3, 0.8, seed);
        let cfg = RelaxConfig::default()
            .with_beta(0.5)
            .with_max_iter(200)
            .with_seed(seed);
        let reports: Vec<RunReport> = Strategy::ALL
            .iter()
            .map(|&s| exhaustive_run(&form, s, cfg))
            .collect();
        let base = &reports[0];
        assert!(!base.accepted_centers.is_empty());
        for r in &reports[1..] {
            assert_eq!(
                base.accepted_centers.len(),
                r.accepted_centers.len(),
                "seed {seed} {}",
                r.strategy
            );
            for (a, b) in base.accepted_centers.iter().zip(&r.accepted_centers) {
                assert!((a - b).amax() <= 1e-9 * (1.0 + a.amax()), "seed {seed}");
            }
            assert_eq!(r.iterations, base.iterations, "seed {seed} {}", r.strategy);
            assert_eq!(r.status, base.status);
        }
    }
}

#[test]
fn accepted_centers_are_never_repeated() {
    for seed in 0..6u64 {
        let form = random_form(3, 0.7, seed);
        for strategy in Strategy::ALL {
            let cfg = RelaxConfig::default().with_beta(0.5).with_max_iter(200);
            let report = exhaustive_run(&form, strategy, cfg);
            for pair in report.accepted_centers.windows(2) {
                assert_ne!(pair[0], pair[1], "seed {seed} {strategy}");
            }
        }
    }
}

#[test]
fn termination_status_does_not_depend_on_strategy() {
    for d in 2..=4 {
        for seed in 0..8u64 {
            let form = random_form(d, 0.6, seed);
            let cfg = RelaxConfig::default().with_beta(0.5).with_seed(seed);
            let naive = exhaustive_run(&form, Strategy::Naive, cfg);
            for strategy in [Strategy::Optimized, Strategy::Sparse] {
                let other = exhaustive_run(&form, strategy, cfg);
                assert_eq!(naive.status, other.status, "d {d} seed {seed} {strategy}");
                assert_eq!(naive.iterations, other.iterations, "d {d} seed {seed} {strategy}");
            }
        }
    }
}

#[test]
fn best_energy_never_increases() {
    let form = random_form(4, 0.5, 17);
    for strategy in Strategy::ALL {
        let cfg = RelaxConfig::for_strategy(strategy).with_max_iter(60);
        let report = exhaustive_run(&form, strategy, cfg);
        let bests: Vec<f64> = report.trace.iter().map(|r| r.best_energy).collect();
        assert!(bests.windows(2).all(|w| w[1] <= w[0]), "{strategy}");
        for r in &report.trace {
            if r.accepted {
                assert_eq!(r.best_energy, r.candidate_energy);
            }
        }
        assert_eq!(
            report.accepted_centers.len(),
            report.trace.iter().filter(|r| r.accepted).count()
        );
    }
}

#[test]
fn rejects_are_bounded_by_the_shrink_budget() {
    let form = random_form(3, 0.6, 23);
    let cfg = RelaxConfig::default()
        .with_beta(0.5)
        .with_epsilon(1e-6)
        .with_max_iter(500);
    let report = exhaustive_run(&form, Strategy::Optimized, cfg);
    assert!(report.converged());
    assert_eq!(report.rejects(), cfg.max_rejects());
    // scale only changes on reject
    let last = report.trace.last().unwrap();
    assert!((last.scale * cfg.beta - report.final_scale).abs() < 1e-18);
}

#[test]
fn iteration_budget_is_reported_distinctly() {
    let form = random_form(3, 0.6, 4);
    let cfg = RelaxConfig::default().with_max_iter(3);
    let report = exhaustive_run(&form, Strategy::Naive, cfg);
    assert_eq!(report.status, Termination::IterExhausted);
    assert_eq!(report.iterations, 3);
    assert_eq!(report.trace.len(), 3);
    assert_eq!(report.record().status, Termination::IterExhausted);
}

#[test]
fn record_totals_exclude_network() {
    let form = identity_form(2);
    let report = exhaustive_run(&form, Strategy::Optimized, RelaxConfig::default());
    let rec = report.record();
    assert_eq!(rec.iterations, report.iterations);
    assert!((rec.total_time - (rec.encode_time + rec.anneal_time)).abs() < 1e-9);
    assert!(rec.wall_time >= rec.encode_time);
    assert!(rec.network_time >= 0.0);
}

#[test]
fn sparse_form_runs_with_every_strategy() {
    let a = random_spd(4, 0.3, 5);
    let b = random_vec(4, -1.0, 1.0, 6);
    let dense = QuadraticForm::dense(a.clone(), b.clone()).unwrap();
    let sparse = QuadraticForm::sparse_from_dense(&a, b).unwrap();
    let cfg = RelaxConfig::default().with_max_iter(100);
    for strategy in Strategy::ALL {
        let d = exhaustive_run(&dense, strategy, cfg);
        let s = exhaustive_run(&sparse, strategy, cfg);
        assert!((d.center.clone() - s.center.clone()).amax() < 1e-9, "{strategy}");
    }
}

#[test]
fn independent_runs_in_parallel_match_sequential_runs() {
    let form = random_form(3, 0.7, 31);
    let cfg = RelaxConfig::default().with_max_iter(80);
    let sequential: Vec<DVector<f64>> = Strategy::ALL
        .iter()
        .map(|&s| exhaustive_run(&form, s, cfg).center)
        .collect();
    let parallel: Vec<DVector<f64>> = std::thread::scope(|scope| {
        let handles: Vec<_> = Strategy::ALL
            .iter()
            .map(|&s| {
                let form = &form;
                scope.spawn(move || exhaustive_run(form, s, cfg).center)
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    assert_eq!(sequential, parallel);
}

struct FailingOracle(&'static str);

impl Oracle for FailingOracle {
    fn solve(&mut self, _: &Template, _: &SolveParams) -> anyhow::Result<Option<SolveOutcome>> {
        Err(anyhow!(self.0))
    }
}

struct NoAnswer;

impl Oracle for NoAnswer {
    fn solve(&mut self, _: &Template, _: &SolveParams) -> anyhow::Result<Option<SolveOutcome>> {
        Ok(None)
    }
}

#[derive(Default)]
struct CountingSleeper(usize);

impl Sleeper for CountingSleeper {
    fn sleep(&mut self, _: Duration) {
        self.0 += 1;
    }
}

#[test]
fn fatal_oracle_failure_ends_the_run() {
    let form = identity_form(2);
    let err = relax(
        &form,
        Strategy::Naive,
        FailingOracle("invalid token"),
        RelaxConfig::default(),
    )
    .unwrap_err();
    assert!(matches!(err, RelaxError::FatalOracleFailure { attempts: 1, .. }));

    let err = relax(&form, Strategy::Optimized, NoAnswer, RelaxConfig::default()).unwrap_err();
    assert_eq!(err, RelaxError::NoSolutionReturned);
}

#[test]
fn transient_failures_exhaust_retries_through_the_controller() {
    let form = identity_form(2);
    let cfg = RelaxConfig::default().with_retry(RetryPolicy {
        max_attempts: 3,
        base_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(4),
        jitter_frac: 0.2,
    });
    let client = OracleClient::with_sleeper(
        FailingOracle("HTTP 503"),
        cfg.retry,
        0,
        CountingSleeper::default(),
    );
    let encoder = Box::new(SparseEncoder::new(&form));
    let mut ctl = TrustRegionController::with_client(&form, encoder, client, cfg).unwrap();
    let err = ctl.run().unwrap_err();
    assert_eq!(
        err,
        RelaxError::FatalOracleFailure {
            attempts: 3,
            message: "HTTP 503".to_string()
        }
    );
    assert_eq!(ctl.client().sleeper().0, 2);
}

#[test]
fn invalid_config_and_mismatched_encoder_are_rejected() {
    let form = identity_form(2);
    let err = TrustRegionController::new(
        &form,
        Strategy::Naive,
        ExhaustiveOracle::default(),
        RelaxConfig::default().with_beta(1.5),
    )
    .err()
    .unwrap();
    assert!(matches!(err, RelaxError::InvalidConfig { .. }));

    let other = identity_form(3);
    let client = OracleClient::new(ExhaustiveOracle::default(), RetryPolicy::default(), 0);
    let err = TrustRegionController::with_client(
        &form,
        Strategy::Optimized.encoder(&other),
        client,
        RelaxConfig::default(),
    )
    .err()
    .unwrap();
    assert!(matches!(err, RelaxError::DimensionMismatch { .. }));
}

/// Noise-free regression with a bias column and `w = (0.5, 0.75)`.
fn grid_regression(n: usize) -> (DMatrix<f64>, DVector<f64>) {
    let x = DMatrix::from_fn(n, 2, |i, j| {
        if j == 0 {
            1.0
        } else {
            -1.0 + 2.0 * i as f64 / (n - 1) as f64
        }
    });
    let y = &x * DVector::from_vec(vec![0.5, 0.75]);
    (x, y)
}

#[test]
fn potok_recovers_weights_on_the_precision_grid() {
    let (x, y) = grid_regression(20);
    let form = QuadraticForm::normal_equations(&x, &y).unwrap();
    let report = solve_potok(
        &form,
        PrecisionVector::default(),
        ExhaustiveOracle::default(),
        RelaxConfig::default(),
    )
    .unwrap();
    assert!((report.center[0] - 0.5).abs() < 1e-12);
    assert!((report.center[1] - 0.75).abs() < 1e-12);
    assert!(report.error.unwrap() < 1e-9);
    assert!((report.energy - report.oracle_objective).abs() < 1e-9);

    let rec = report.record();
    assert_eq!(rec.mode, Mode::Potok);
    assert_eq!(rec.status, Termination::SingleShot);
    assert_eq!(rec.iterations, 1);
    assert_eq!(report.retry.calls, 1);
}

#[test]
fn potok_clips_to_the_nonnegative_grid() {
    // exact solution is (1, -1); the best grid point keeps w_1 at zero
    let form = identity_form(2);
    let form = QuadraticForm::dense(
        form.to_dense().into_owned(),
        DVector::from_vec(vec![1.0, -1.0]),
    )
    .unwrap();
    let report = solve_potok(
        &form,
        PrecisionVector::quarters(2).unwrap(),
        ExhaustiveOracle::default(),
        RelaxConfig::default(),
    )
    .unwrap();
    assert_eq!(report.center.as_slice(), &[0.75, 0.0]);
    assert!((report.error.unwrap() - (0.0625f64 + 1.0).sqrt()).abs() < 1e-12);
}

#[test]
fn potok_propagates_fatal_oracle_failures() {
    let (x, y) = grid_regression(6);
    let form = QuadraticForm::normal_equations(&x, &y).unwrap();
    let err = solve_potok(
        &form,
        PrecisionVector::default(),
        FailingOracle("invalid token"),
        RelaxConfig::default(),
    )
    .unwrap_err();
    assert!(matches!(err, RelaxError::FatalOracleFailure { attempts: 1, .. }));
}
