//! Seeded fixtures shared by unit tests.

use nalgebra::{DMatrix, DVector};
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::form::QuadraticForm;

/// Symmetric, strictly diagonally dominant (hence SPD) matrix with roughly
/// `density` off-diagonal fill.
pub(crate) fn random_spd(d: usize, density: f64, seed: u64) -> DMatrix<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut a = DMatrix::<f64>::zeros(d, d);
    for i in 0..d {
        for j in (i + 1)..d {
            if rng.gen::<f64>() < density {
                let v = rng.gen_range(-1.0..1.0);
                a[(i, j)] = v;
                a[(j, i)] = v;
            }
        }
    }
    for i in 0..d {
        let row: f64 = a.row(i).iter().map(|v| v.abs()).sum();
        a[(i, i)] = row + 1.0;
    }
    a
}

pub(crate) fn random_vec(d: usize, lo: f64, hi: f64, seed: u64) -> DVector<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    DVector::from_fn(d, |_, _| rng.gen_range(lo..hi))
}

/// Dense form `(random_spd, random b)`.
pub(crate) fn random_form(d: usize, density: f64, seed: u64) -> QuadraticForm {
    let a = random_spd(d, density, seed);
    let b = random_vec(d, -2.0, 2.0, seed.wrapping_add(1));
    QuadraticForm::dense(a, b).unwrap()
}

/// `A = I`, `b = 1`: exact solution is the all-ones vector.
pub(crate) fn identity_form(d: usize) -> QuadraticForm {
    QuadraticForm::dense(DMatrix::identity(d, d), DVector::from_element(d, 1.0)).unwrap()
}
