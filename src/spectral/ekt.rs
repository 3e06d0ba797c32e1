//! Extended Koopmans' theorem (EKT) ionisation potentials and electron affinities.
//!
//! For each spin sector the generalised eigenproblems
//!
//!   F⁻ c = ε γ c        (ionisation, γ = P)
//!   F⁺ c = ε η c        (attachment, η = 1 - Pᵀ)
//!
//! are solved by whitening with the regularised orthogonaliser of γ (or η)
//! and diagonalising `Xᴴ F X`.

use nalgebra::{DMatrix, DVector};
use num_complex::Complex64;
use rand::Rng;

use super::bootstrap::{gen_sample_matrix, sample_std};
use super::linalg::{eigvalsh, hermitize, ortho_with_rank, regularised_ortho, screen_tensor};
use crate::averaging::{average_gen_fock, average_one_rdm, FockSign};
use crate::error::{AnalysisError, Result};
use crate::io::AnalysisParams;
use crate::source::ObservableSource;

/// Ionisation and attachment energies of one spin sector, ascending.
#[derive(Clone, Debug, PartialEq)]
pub struct EktSpectrum {
    pub ip: DVector<f64>,
    /// NaN when too few bootstrap samples survive
    pub ip_err: DVector<f64>,
    pub ea: DVector<f64>,
    pub ea_err: DVector<f64>,
}

/// EKT result shaped by the walker type.
#[derive(Clone, Debug, PartialEq)]
pub enum EktAnalysis {
    /// Closed-shell or non-collinear walkers.
    Single(EktSpectrum),
    /// Collinear walkers, one spectrum per spin.
    Collinear { alpha: EktSpectrum, beta: EktSpectrum },
}

impl EktAnalysis {
    pub fn spectra(&self) -> Vec<&EktSpectrum> {
        match self {
            EktAnalysis::Single(s) => vec![s],
            EktAnalysis::Collinear { alpha, beta } => vec![alpha, beta],
        }
    }
}

/// One sector's matrices for the Fock eigenvalue bootstrap.
#[derive(Clone, Copy, Debug)]
pub struct FockErrorInputs<'a> {
    pub p: &'a DMatrix<Complex64>,
    pub p_err: &'a DMatrix<f64>,
    pub f_minus: &'a DMatrix<Complex64>,
    pub f_minus_err: &'a DMatrix<f64>,
    pub f_plus: &'a DMatrix<Complex64>,
    pub f_plus_err: &'a DMatrix<f64>,
}

fn require_same_shape(gamma: &DMatrix<Complex64>, fock: &DMatrix<Complex64>) -> Result<()> {
    if fock.shape() != gamma.shape() {
        return Err(AnalysisError::ShapeMismatch {
            observable: "generalised Fock matrix".into(),
            expected: gamma.len(),
            found: fock.len(),
        });
    }
    Ok(())
}

fn projected_eigenvalues(
    gamma: &DMatrix<Complex64>,
    fock: &DMatrix<Complex64>,
    cutoff: f64,
) -> Result<DVector<f64>> {
    require_same_shape(gamma, fock)?;
    let (_, x) = regularised_ortho(gamma, cutoff)?;
    let ft = x.adjoint() * fock * &x;
    eigvalsh(&ft)
}

/// Same as [`projected_eigenvalues`] with the retained rank pinned to `rank`.
fn projected_eigenvalues_with_rank(
    gamma: &DMatrix<Complex64>,
    fock: &DMatrix<Complex64>,
    rank: usize,
    cutoff: f64,
) -> Result<Option<DVector<f64>>> {
    require_same_shape(gamma, fock)?;
    match ortho_with_rank(gamma, rank, cutoff)? {
        Some(x) => {
            let ft = x.adjoint() * fock * &x;
            eigvalsh(&ft).map(Some)
        }
        None => Ok(None),
    }
}

fn hole_density(p: &DMatrix<Complex64>) -> DMatrix<Complex64> {
    let n = p.nrows();
    DMatrix::<Complex64>::identity(n, n) - p.transpose()
}

/// Ionisation energies from the 1-RDM `p` and F⁻.
pub fn ionization_energies(
    p: &DMatrix<Complex64>,
    f_minus: &DMatrix<Complex64>,
    cutoff: f64,
) -> Result<DVector<f64>> {
    projected_eigenvalues(p, f_minus, cutoff)
}

/// Electron affinities from the hole density `1 - pᵀ` and F⁺.
pub fn affinity_energies(
    p: &DMatrix<Complex64>,
    f_plus: &DMatrix<Complex64>,
    cutoff: f64,
) -> Result<DVector<f64>> {
    projected_eigenvalues(&hole_density(p), f_plus, cutoff)
}

/// Bootstrap error bars for the EKT eigenvalues of one sector.
///
/// `P`, F⁻ and F⁺ are perturbed independently per sample. Each perturbed
/// problem keeps the `ip_rank` (`ea_rank`) largest eigenpairs of γ (η), so
/// noise on null directions cannot change the number of energies. Samples
/// where one of those eigenvalues falls to `cutoff` or below are discarded.
pub fn estimate_error_fock<R: Rng + ?Sized>(
    inputs: &FockErrorInputs<'_>,
    ip_rank: usize,
    ea_rank: usize,
    nsamp: usize,
    cutoff: f64,
    rng: &mut R,
) -> Result<(DVector<f64>, DVector<f64>)> {
    let mut ip_samples = Vec::with_capacity(nsamp);
    let mut ea_samples = Vec::with_capacity(nsamp);
    for _ in 0..nsamp {
        let p_pert = gen_sample_matrix(inputs.p, inputs.p_err, rng)?;
        let fm_pert = gen_sample_matrix(inputs.f_minus, inputs.f_minus_err, rng)?;
        let fp_pert = gen_sample_matrix(inputs.f_plus, inputs.f_plus_err, rng)?;

        if let Some(ip) = projected_eigenvalues_with_rank(&p_pert, &fm_pert, ip_rank, cutoff)? {
            ip_samples.push(ip);
        }
        if let Some(ea) = projected_eigenvalues_with_rank(&hole_density(&p_pert), &fp_pert, ea_rank, cutoff)? {
            ea_samples.push(ea);
        }
    }

    if ip_samples.len() < nsamp || ea_samples.len() < nsamp {
        log::debug!(
            "discarded {} ip and {} ea bootstrap samples with a collapsed subspace",
            nsamp - ip_samples.len(),
            nsamp - ea_samples.len()
        );
    }
    let accepted = ip_samples.len().min(ea_samples.len());
    if accepted < 2 {
        return Err(AnalysisError::BootstrapUnstable { accepted, requested: nsamp });
    }

    Ok((sample_std(&ip_samples), sample_std(&ea_samples)))
}

/// Central energies of one sector, with NaN error bars when the bootstrap is unstable.
fn sector_spectrum<R: Rng + ?Sized>(
    inputs: FockErrorInputs<'_>,
    nsamp: usize,
    cutoff: f64,
    rng: &mut R,
) -> Result<EktSpectrum> {
    let ip = ionization_energies(inputs.p, inputs.f_minus, cutoff)?;
    let ea = affinity_energies(inputs.p, inputs.f_plus, cutoff)?;
    let (ip_err, ea_err) = match estimate_error_fock(&inputs, ip.len(), ea.len(), nsamp, cutoff, rng) {
        Ok(errors) => errors,
        Err(err @ AnalysisError::BootstrapUnstable { .. }) => {
            log::warn!("EKT error bars unavailable: {}", err);
            (DVector::from_element(ip.len(), f64::NAN), DVector::from_element(ea.len(), f64::NAN))
        }
        Err(err) => return Err(err),
    };
    Ok(EktSpectrum { ip, ip_err, ea, ea_err })
}

/// EKT analysis of the averaged 1-RDM and generalised Fock matrices.
pub fn analyse_ekt<S: ObservableSource + ?Sized>(source: &S, params: &AnalysisParams) -> Result<EktAnalysis> {
    params.validate()?;
    let (estimator, eq, stride, ix) = (params.estimator, params.equilibration, params.stride, params.bp_index);
    let (mut p, perr) = average_one_rdm(source, estimator, eq, stride, ix)?;
    let (mut fp, fperr) = average_gen_fock(source, FockSign::Plus, estimator, eq, stride, ix)?;
    let (mut fm, fmerr) = average_gen_fock(source, FockSign::Minus, estimator, eq, stride, ix)?;

    screen_tensor(&mut p, &perr, params.screen_factor)?;
    screen_tensor(&mut fm, &fmerr, params.screen_factor)?;
    screen_tensor(&mut fp, &fperr, params.screen_factor)?;

    let mut rng = params.rng();
    let mut spectra = Vec::with_capacity(p.n_sectors());
    for s in 0..p.n_sectors() {
        let gamma = hermitize(p.sector(s));
        let inputs = FockErrorInputs {
            p: &gamma,
            p_err: perr.sector(s),
            f_minus: fm.sector(s),
            f_minus_err: fmerr.sector(s),
            f_plus: fp.sector(s),
            f_plus_err: fperr.sector(s),
        };
        spectra.push(sector_spectrum(inputs, params.nsamp, params.cutoff, &mut rng)?);
    }

    let mut spectra = spectra.into_iter();
    match (spectra.next(), spectra.next()) {
        (Some(alpha), Some(beta)) => Ok(EktAnalysis::Collinear { alpha, beta }),
        (Some(single), None) => Ok(EktAnalysis::Single(single)),
        _ => Err(AnalysisError::ShapeMismatch {
            observable: "one_rdm".into(),
            expected: 1,
            found: 0,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spectral::bootstrap_rng;
    use approx::assert_relative_eq;

    fn diag(values: &[f64]) -> DMatrix<Complex64> {
        DMatrix::from_diagonal(&DVector::from_iterator(
            values.len(),
            values.iter().map(|&x| Complex64::new(x, 0.0)),
        ))
    }

    #[test]
    fn test_ionization_diagonal() {
        // F⁻ = ε n for a diagonal 1-RDM gives ε back
        let p = diag(&[0.9, 0.5]);
        let fm = diag(&[-0.9, -0.1]);
        let ip = ionization_energies(&p, &fm, 1e-14).unwrap();
        assert_relative_eq!(ip[0], -1.0, epsilon = 1e-10);
        assert_relative_eq!(ip[1], -0.2, epsilon = 1e-10);
    }

    #[test]
    fn test_affinity_uses_hole_density() {
        let p = diag(&[0.9, 0.5]);
        let fp = diag(&[0.05, 0.25]);
        let ea = affinity_energies(&p, &fp, 1e-14).unwrap();
        assert_relative_eq!(ea[0], 0.5, epsilon = 1e-10);
        assert_relative_eq!(ea[1], 0.5, epsilon = 1e-10);
    }

    #[test]
    fn test_null_direction_dropped() {
        // empty orbital cannot be ionised
        let p = diag(&[1.0, 0.0]);
        let fm = diag(&[-0.5, 0.0]);
        let ip = ionization_energies(&p, &fm, 1e-14).unwrap();
        assert_eq!(ip.len(), 1);
        assert_relative_eq!(ip[0], -0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_error_estimate_nonnegative() {
        let p = diag(&[0.9, 0.4]);
        let fm = diag(&[-0.9, -0.2]);
        let fp = diag(&[0.05, 0.3]);
        let small = DMatrix::from_element(2, 2, 1e-3);
        let inputs = FockErrorInputs {
            p: &p,
            p_err: &small,
            f_minus: &fm,
            f_minus_err: &small,
            f_plus: &fp,
            f_plus_err: &small,
        };
        let mut rng = bootstrap_rng(Some(11));
        let (ip_err, ea_err) = estimate_error_fock(&inputs, 2, 2, 30, 1e-14, &mut rng).unwrap();
        assert_eq!(ip_err.len(), 2);
        assert_eq!(ea_err.len(), 2);
        for &e in ip_err.iter().chain(ea_err.iter()) {
            assert!(e >= 0.0);
            assert!(e < 0.5);
        }
    }

    #[test]
    fn test_error_estimate_with_empty_orbitals() {
        // noise on the unoccupied rows must not change the IP rank
        let p = diag(&[0.9, 0.0, 0.0]);
        let fm = diag(&[-0.9, 0.0, 0.0]);
        let fp = diag(&[0.05, 0.2, 0.4]);
        let noise = DMatrix::from_element(3, 3, 1e-3);
        let inputs = FockErrorInputs {
            p: &p,
            p_err: &noise,
            f_minus: &fm,
            f_minus_err: &noise,
            f_plus: &fp,
            f_plus_err: &noise,
        };
        let ip_rank = ionization_energies(&p, &fm, 1e-14).unwrap().len();
        let ea_rank = affinity_energies(&p, &fp, 1e-14).unwrap().len();
        assert_eq!((ip_rank, ea_rank), (1, 3));

        for seed in 0..10 {
            let mut rng = bootstrap_rng(Some(seed));
            let (ip_err, ea_err) = estimate_error_fock(&inputs, ip_rank, ea_rank, 20, 1e-14, &mut rng).unwrap();
            assert_eq!(ip_err.len(), 1);
            assert_eq!(ea_err.len(), 3);
            for &e in ip_err.iter().chain(ea_err.iter()) {
                assert!(e.is_finite() && e >= 0.0 && e < 0.1);
            }
        }
    }

    #[test]
    fn test_unstable_bootstrap_keeps_central_energies() {
        // error bars far larger than the occupations: no perturbed sample stays positive definite
        let n = 6;
        let p = diag(&[0.5; 6]);
        let fm = diag(&[-0.5, -0.45, -0.4, -0.35, -0.3, -0.25]);
        let fp = diag(&[0.05, 0.1, 0.15, 0.2, 0.25, 0.3]);
        let huge = DMatrix::from_element(n, n, 10.0);
        let zero = DMatrix::zeros(n, n);
        let inputs = FockErrorInputs {
            p: &p,
            p_err: &huge,
            f_minus: &fm,
            f_minus_err: &zero,
            f_plus: &fp,
            f_plus_err: &zero,
        };
        let mut rng = bootstrap_rng(Some(3));
        assert!(matches!(
            estimate_error_fock(&inputs, n, n, 2, 1e-14, &mut rng),
            Err(AnalysisError::BootstrapUnstable { .. })
        ));

        let mut rng = bootstrap_rng(Some(3));
        let spectrum = sector_spectrum(inputs, 2, 1e-14, &mut rng).unwrap();
        assert_relative_eq!(spectrum.ip[0], -1.0, epsilon = 1e-10);
        assert_relative_eq!(spectrum.ip[5], -0.5, epsilon = 1e-10);
        assert_relative_eq!(spectrum.ea[0], 0.1, epsilon = 1e-10);
        assert_relative_eq!(spectrum.ea[5], 0.6, epsilon = 1e-10);
        assert!(spectrum.ip_err.iter().chain(spectrum.ea_err.iter()).all(|e| e.is_nan()));
    }

    #[test]
    fn test_zero_error_gives_zero_spread() {
        let p = diag(&[0.8, 0.3]);
        let fm = diag(&[-0.8, -0.3]);
        let fp = diag(&[0.2, 0.7]);
        let zero = DMatrix::zeros(2, 2);
        let inputs = FockErrorInputs {
            p: &p,
            p_err: &zero,
            f_minus: &fm,
            f_minus_err: &zero,
            f_plus: &fp,
            f_plus_err: &zero,
        };
        let mut rng = bootstrap_rng(Some(5));
        let (ip_err, ea_err) = estimate_error_fock(&inputs, 2, 2, 5, 1e-14, &mut rng).unwrap();
        for &e in ip_err.iter().chain(ea_err.iter()) {
            assert_relative_eq!(e, 0.0, epsilon = 1e-12);
        }
    }
}
