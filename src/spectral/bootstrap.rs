//! Parametric bootstrap helpers.

use nalgebra::{DMatrix, DVector};
use num_complex::Complex64;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

use super::linalg::hermitize;
use crate::error::{AnalysisError, Result};

/// Seeded generator when `seed` is given, entropy-seeded otherwise.
pub fn bootstrap_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Draw a Hermitian sample around `mat` with per-element standard deviation `err`.
///
/// Each element is drawn from N(Re mat_ij, err_ij); the imaginary part is
/// discarded before the result is symmetrised.
pub fn gen_sample_matrix<R: Rng + ?Sized>(
    mat: &DMatrix<Complex64>,
    err: &DMatrix<f64>,
    rng: &mut R,
) -> Result<DMatrix<Complex64>> {
    let n = mat.nrows();
    if mat.ncols() != n || err.shape() != mat.shape() {
        return Err(AnalysisError::ShapeMismatch {
            observable: "perturbed matrix".into(),
            expected: n * n,
            found: err.len(),
        });
    }
    let mut sample = DMatrix::<Complex64>::zeros(n, n);
    for j in 0..n {
        for i in 0..n {
            let normal = Normal::new(mat[(i, j)].re, err[(i, j)])
                .map_err(|e| AnalysisError::Perturbation(format!("element ({}, {}): {}", i, j, e)))?;
            sample[(i, j)] = Complex64::new(normal.sample(rng), 0.0);
        }
    }
    Ok(hermitize(&sample))
}

/// Element-wise sample standard deviation (divisor `n - 1`).
pub fn sample_std(samples: &[DVector<f64>]) -> DVector<f64> {
    let len = samples.first().map(|s| s.len()).unwrap_or(0);
    let n = samples.len() as f64;
    let mut mean = DVector::<f64>::zeros(len);
    for s in samples.iter() {
        mean += s;
    }
    mean /= n;
    let mut sum_sq = DVector::<f64>::zeros(len);
    for s in samples.iter() {
        sum_sq += (s - &mean).map(|d| d * d);
    }
    sum_sq.map(|v| (v / (n - 1.0)).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_zero_error_returns_hermitian_part() {
        let mat = DMatrix::from_row_slice(2, 2, &[
            Complex64::new(1.0, 0.0), Complex64::new(0.4, 0.3),
            Complex64::new(0.2, -0.3), Complex64::new(2.0, 0.0),
        ]);
        let err = DMatrix::zeros(2, 2);
        let mut rng = bootstrap_rng(Some(7));
        let sample = gen_sample_matrix(&mat, &err, &mut rng).unwrap();
        assert_relative_eq!(sample[(0, 1)].re, 0.3, epsilon = 1e-12);
        // imaginary parts are dropped
        assert_relative_eq!(sample[(0, 1)].im, 0.0, epsilon = 1e-12);
        assert_eq!(sample, sample.adjoint());
    }

    #[test]
    fn test_seed_reproducible() {
        let mat = DMatrix::from_element(3, 3, Complex64::new(0.5, 0.0));
        let err = DMatrix::from_element(3, 3, 0.1);
        let a = gen_sample_matrix(&mat, &err, &mut bootstrap_rng(Some(42))).unwrap();
        let b = gen_sample_matrix(&mat, &err, &mut bootstrap_rng(Some(42))).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_invalid_error_bar() {
        let mat = DMatrix::from_element(1, 1, Complex64::new(0.5, 0.0));
        let err = DMatrix::from_element(1, 1, f64::NAN);
        let result = gen_sample_matrix(&mat, &err, &mut bootstrap_rng(Some(1)));
        assert!(matches!(result, Err(AnalysisError::Perturbation(_))));
    }

    #[test]
    fn test_sample_std() {
        let samples = vec![
            DVector::from_vec(vec![1.0, 5.0]),
            DVector::from_vec(vec![3.0, 5.0]),
            DVector::from_vec(vec![5.0, 5.0]),
        ];
        let std = sample_std(&samples);
        assert_relative_eq!(std[0], 2.0, epsilon = 1e-12);
        assert_relative_eq!(std[1], 0.0, epsilon = 1e-12);
    }
}
