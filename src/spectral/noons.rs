//! Natural orbital occupation numbers from the averaged 1-RDM.

use nalgebra::{DMatrix, DVector};
use num_complex::Complex64;
use rand::Rng;

use super::bootstrap::{gen_sample_matrix, sample_std};
use super::linalg::{eigvalsh, hermitize, regularised_ortho, screen_matrix, symmetrize};
use crate::averaging::{average_one_rdm, SpinTensor};
use crate::error::{AnalysisError, Result};
use crate::io::AnalysisParams;
use crate::source::ObservableSource;

/// Occupations in descending order with their bootstrap error bars.
#[derive(Clone, Debug, PartialEq)]
pub struct NoonAnalysis {
    pub occupations: DVector<f64>,
    pub errors: DVector<f64>,
}

fn descending(values: DVector<f64>) -> DVector<f64> {
    DVector::from_iterator(values.len(), values.iter().rev().cloned())
}

/// Spin-summed, symmetrised 1-RDM and its error matrix.
///
/// Two-sector errors are combined in quadrature.
pub fn spin_summed_rdm(
    p: &SpinTensor<Complex64>,
    perr: &SpinTensor<f64>,
) -> Result<(DMatrix<Complex64>, DMatrix<f64>)> {
    if p.n_sectors() == 0 || p.shape() != perr.shape() {
        return Err(AnalysisError::ShapeMismatch {
            observable: "one_rdm".into(),
            expected: p.n_sectors() * p.dim() * p.dim(),
            found: perr.n_sectors() * perr.dim() * perr.dim(),
        });
    }
    let err = if perr.n_sectors() == 2 {
        perr.sector(0).zip_map(perr.sector(1), |a, b| (a * a + b * b).sqrt())
    } else {
        perr.sector(0).clone()
    };
    let total = p
        .sectors()
        .iter()
        .skip(1)
        .fold(p.sector(0).clone(), |acc, m| acc + m);
    Ok((hermitize(&total), symmetrize(&err)))
}

/// NOONs and bootstrap errors from an already averaged 1-RDM.
pub fn noons_from_rdm<R: Rng + ?Sized>(
    p: &SpinTensor<Complex64>,
    perr: &SpinTensor<f64>,
    nsamp: usize,
    screen_factor: f64,
    cutoff: f64,
    rng: &mut R,
) -> Result<NoonAnalysis> {
    if nsamp < 2 {
        return Err(AnalysisError::InvalidParameter(format!(
            "nsamp must be at least 2 to estimate an error, got {}",
            nsamp
        )));
    }
    let (mut total, err) = spin_summed_rdm(p, perr)?;
    let retained = screen_matrix(&mut total, &err, screen_factor)?;
    log::debug!("screened 1-RDM keeps {} of {} entries", retained, total.len());

    let (regularised, _) = regularised_ortho(&total, cutoff)?;
    let mut samples = Vec::with_capacity(nsamp);
    for _ in 0..nsamp {
        let perturbed = gen_sample_matrix(&regularised, &err, rng)?;
        samples.push(descending(eigvalsh(&perturbed)?));
    }

    Ok(NoonAnalysis {
        occupations: descending(eigvalsh(&regularised)?),
        errors: sample_std(&samples),
    })
}

/// Natural orbital occupation numbers of the averaged 1-RDM.
pub fn get_noons<S: ObservableSource + ?Sized>(source: &S, params: &AnalysisParams) -> Result<NoonAnalysis> {
    params.validate()?;
    let (p, perr) = average_one_rdm(
        source,
        params.estimator,
        params.equilibration,
        params.stride,
        params.bp_index,
    )?;
    let mut rng = params.rng();
    let noons = noons_from_rdm(&p, &perr, params.nsamp, params.screen_factor, params.cutoff, &mut rng)?;
    log::info!("computed {} NOONs from {} bootstrap samples", noons.occupations.len(), params.nsamp);
    Ok(noons)
}
