use super::*;
use crate::form::QuadraticForm;
use crate::testutil::{identity_form, random_form, random_spd, random_vec};
use nalgebra::{dvector, DVector};
use proptest::prelude::{prop_assert, prop_assert_eq, proptest, ProptestConfig};

fn all_assignments(num_vars: usize) -> impl Iterator<Item = Assignment> {
    (0..(1u64 << num_vars)).map(move |k| Assignment::from_index(num_vars, k))
}

#[test]
fn naive_template_value_is_true_energy() {
    let form = random_form(3, 0.7, 11);
    let enc = NaiveEncoder::new(&form);
    let center = dvector![0.3, -0.7, 1.1];
    let scale = 0.4;
    let t = enc.build_template(&center, scale);
    assert_eq!(t.num_vars(), 6);
    for x in all_assignments(6) {
        let w = enc.moves().candidate(&center, scale, &x).unwrap();
        assert!((t.evaluate(&x) - form.energy(&w)).abs() < 1e-10);
    }
    assert!(enc.template_is_exact());
}

#[test]
fn precomputed_templates_match_naive_up_to_constant() {
    let form = random_form(3, 1.0, 5);
    let center = dvector![-0.5, 0.25, 2.0];
    let scale = 0.125;
    let naive = NaiveEncoder::new(&form).build_template(&center, scale);
    let f_c = form.energy(&center);
    for strategy in [Strategy::Optimized, Strategy::Sparse] {
        let enc = strategy.encoder(&form);
        assert!(!enc.template_is_exact());
        let mut t = enc.build_template(&center, scale);
        t.add_constant(f_c);
        assert!(t.approx_eq(&naive, 1e-9), "{strategy}");
        for x in all_assignments(6) {
            assert!((t.evaluate(&x) - naive.evaluate(&x)).abs() < 1e-9);
        }
    }
}

#[test]
fn mask_removes_linear_block_at_the_solution() {
    let form = identity_form(3);
    let enc = OptimizedEncoder::new(&form);
    let center = DVector::from_element(3, 1.0);
    let t = enc.build_template(&center, 0.5);
    assert_eq!(t, enc.quadratic_block().scaled(0.25));
}

#[test]
fn quadratic_block_is_center_independent() {
    let form = random_form(4, 0.5, 3);
    let enc = SparseEncoder::new(&form);
    let q = enc.quadratic_block().clone();
    let _ = enc.build_template(&random_vec(4, -1.0, 1.0, 9), 0.3);
    assert_eq!(&q, enc.quadratic_block());
    // ½·A_00·δ_0² = ½·A_00·(4·q1 − 4·q1·q2 + q2)
    let a00 = form.to_dense()[(0, 0)];
    let mv = enc.moves();
    assert!((q.linear()[mv.q1(0)] - 2.0 * a00).abs() < 1e-12);
    assert!((q.linear()[mv.q2(0)] - 0.5 * a00).abs() < 1e-12);
    assert!((q.quadratic_coefficient(mv.q1(0), mv.q2(0)) + 2.0 * a00).abs() < 1e-12);
    assert!(q.constant().abs() < 1e-15);
}

#[test]
fn sparse_storage_gives_same_template_as_dense_storage() {
    let a = random_spd(6, 0.3, 21);
    let b = random_vec(6, -1.0, 1.0, 22);
    let dense = QuadraticForm::dense(a.clone(), b.clone()).unwrap();
    let sparse = QuadraticForm::sparse_from_dense(&a, b).unwrap();
    let center = random_vec(6, -1.0, 1.0, 23);
    let t_dense = SparseEncoder::new(&dense).build_template(&center, 0.5);
    let t_sparse = SparseEncoder::new(&sparse).build_template(&center, 0.5);
    let t_opt = OptimizedEncoder::new(&sparse).build_template(&center, 0.5);
    assert!(t_dense.approx_eq(&t_sparse, 1e-12));
    assert!(t_opt.approx_eq(&t_sparse, 1e-9));
}

#[test]
fn strategy_parse_and_defaults() {
    for s in Strategy::ALL {
        assert_eq!(s.to_string().parse::<Strategy>().unwrap(), s);
    }
    assert_eq!("box-opt".parse::<Strategy>().unwrap(), Strategy::Optimized);
    assert!("qaoa".parse::<Strategy>().is_err());
    assert_eq!(Strategy::Naive.default_beta(), 0.5);
    assert_eq!(Strategy::Sparse.default_beta(), 0.2);
    assert_eq!(Strategy::default(), Strategy::Naive);
}

#[test]
#[should_panic(expected = "scale must be positive")]
fn non_positive_scale_fails_loud() {
    let form = identity_form(2);
    let _ = OptimizedEncoder::new(&form).build_template(&DVector::zeros(2), 0.0);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn build_template_is_idempotent(seed in 0u64..1000, scale in 1e-4f64..2.0) {
        let form = random_form(4, 0.5, seed);
        let center = random_vec(4, -2.0, 2.0, seed ^ 0xabc);
        for strategy in Strategy::ALL {
            let enc = strategy.encoder(&form);
            let t1 = enc.build_template(&center, scale);
            let t2 = enc.build_template(&center, scale);
            prop_assert_eq!(&t1, &t2);
        }
    }

    #[test]
    fn optimized_and_sparse_agree(seed in 0u64..1000, density in 0.0f64..1.0, scale in 1e-3f64..1.0) {
        let a = random_spd(5, density, seed);
        let b = random_vec(5, -3.0, 3.0, seed + 1);
        let dense = QuadraticForm::dense(a.clone(), b.clone()).unwrap();
        let sparse = QuadraticForm::sparse_from_dense(&a, b).unwrap();
        let center = random_vec(5, -1.0, 1.0, seed + 2);
        let t_opt = OptimizedEncoder::new(&dense).build_template(&center, scale);
        let t_sp = SparseEncoder::new(&sparse).build_template(&center, scale);
        prop_assert!(t_opt.approx_eq(&t_sp, 1e-9));
    }
}
