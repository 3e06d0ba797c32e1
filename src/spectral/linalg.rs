//! Dense Hermitian linear algebra used by the spectral analyses.

use nalgebra::{DMatrix, DVector};
use num_complex::Complex64;

use crate::averaging::SpinTensor;
use crate::error::{AnalysisError, Result};

/// `0.5 * (M + M^H)`.
pub fn hermitize(m: &DMatrix<Complex64>) -> DMatrix<Complex64> {
    (m + m.adjoint()).map(|z| z * 0.5)
}

/// `0.5 * (E + E^T)` for real error matrices.
pub fn symmetrize(e: &DMatrix<f64>) -> DMatrix<f64> {
    (e + e.transpose()) * 0.5
}

fn require_square(m: &DMatrix<Complex64>, what: &str) -> Result<()> {
    if m.nrows() != m.ncols() {
        return Err(AnalysisError::ShapeMismatch {
            observable: what.to_string(),
            expected: m.nrows() * m.nrows(),
            found: m.len(),
        });
    }
    Ok(())
}

/// Eigendecomposition of a Hermitian matrix with eigenvalues in ascending order.
///
/// Only the lower triangle of `m` is read.
pub fn eigh(m: &DMatrix<Complex64>) -> Result<(DVector<f64>, DMatrix<Complex64>)> {
    require_square(m, "hermitian matrix")?;
    let n = m.nrows();
    if n == 0 {
        return Ok((DVector::zeros(0), DMatrix::zeros(0, 0)));
    }
    let eig = m.clone().symmetric_eigen();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| eig.eigenvalues[a].total_cmp(&eig.eigenvalues[b]));

    let values = DVector::from_iterator(n, order.iter().map(|&k| eig.eigenvalues[k]));
    let vectors = DMatrix::from_fn(n, n, |r, c| eig.eigenvectors[(r, order[c])]);
    Ok((values, vectors))
}

/// Ascending eigenvalues only.
pub fn eigvalsh(m: &DMatrix<Complex64>) -> Result<DVector<f64>> {
    eigh(m).map(|(values, _)| values)
}

/// Orthogonalisation with near-null directions removed.
///
/// Eigenpairs of `s` with eigenvalue `<= cutoff` are dropped. Returns the
/// rank-reduced reconstruction `U_k diag(λ_k) U_k^H` and the whitening
/// transform `X = U_k diag(λ_k^-1/2)`, whose column count is the retained rank.
pub fn regularised_ortho(
    s: &DMatrix<Complex64>,
    cutoff: f64,
) -> Result<(DMatrix<Complex64>, DMatrix<Complex64>)> {
    let (values, vectors) = eigh(s)?;
    let n = values.len();
    let keep: Vec<usize> = (0..n).filter(|&k| values[k] > cutoff).collect();
    let rank = keep.len();

    let u = DMatrix::from_fn(n, rank, |r, c| vectors[(r, keep[c])]);
    let x = DMatrix::from_fn(n, rank, |r, c| u[(r, c)] / values[keep[c]].sqrt());
    let scaled = DMatrix::from_fn(n, rank, |r, c| u[(r, c)] * values[keep[c]]);
    let s_mod = if rank == 0 {
        DMatrix::zeros(n, n)
    } else {
        &scaled * u.adjoint()
    };
    Ok((s_mod, x))
}

/// Whitening transform restricted to the `rank` largest eigenpairs of `s`.
///
/// Returns `None` when one of those eigenvalues is not above `cutoff`, i.e.
/// when `s` cannot support a subspace of that rank.
pub fn ortho_with_rank(
    s: &DMatrix<Complex64>,
    rank: usize,
    cutoff: f64,
) -> Result<Option<DMatrix<Complex64>>> {
    let (values, vectors) = eigh(s)?;
    let n = values.len();
    if rank > n {
        return Err(AnalysisError::ShapeMismatch {
            observable: "orthogonaliser rank".into(),
            expected: rank,
            found: n,
        });
    }
    let first = n - rank;
    if (first..n).any(|k| values[k] <= cutoff) {
        return Ok(None);
    }
    let x = DMatrix::from_fn(n, rank, |r, c| vectors[(r, first + c)] / values[first + c].sqrt());
    Ok(Some(x))
}

/// Zero every entry with `|m_ij| < factor * err_ij`.
///
/// Returns the number of nonzero entries left.
pub fn screen_matrix(m: &mut DMatrix<Complex64>, err: &DMatrix<f64>, factor: f64) -> Result<usize> {
    if m.shape() != err.shape() {
        return Err(AnalysisError::ShapeMismatch {
            observable: "screened matrix".into(),
            expected: m.len(),
            found: err.len(),
        });
    }
    for (z, &e) in m.iter_mut().zip(err.iter()) {
        if z.norm() < factor * e {
            *z = Complex64::new(0.0, 0.0);
        }
    }
    Ok(m.iter().filter(|z| z.norm() != 0.0).count())
}

/// [`screen_matrix`] applied sector by sector.
pub fn screen_tensor(t: &mut SpinTensor<Complex64>, err: &SpinTensor<f64>, factor: f64) -> Result<usize> {
    if t.n_sectors() != err.n_sectors() {
        return Err(AnalysisError::ShapeMismatch {
            observable: "screened tensor sectors".into(),
            expected: t.n_sectors(),
            found: err.n_sectors(),
        });
    }
    let mut retained = 0;
    for (m, e) in t.iter_mut().zip(err.sectors().iter()) {
        retained += screen_matrix(m, e, factor)?;
    }
    Ok(retained)
}
