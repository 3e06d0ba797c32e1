//! Reshape averaged observables into spin-resolved tensors.
//!
//! Layouts per walker type:
//! - closed:        1 sector of NMO x NMO
//! - collinear:     2 sectors of NMO x NMO
//! - non_collinear: 1 sector of 2NMO x 2NMO (spin-orbital basis)

use std::fmt;

use nalgebra::DMatrix;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use super::block::{average_observable, BlockAverage};
use super::tensor::SpinTensor;
use crate::error::{AnalysisError, Result};
use crate::source::{Estimator, ObservableSource, WalkerType};
use crate::spectral::{hermitize, symmetrize};

/// Averaged complex tensor together with its real error bars.
pub type TensorAverage = (SpinTensor<Complex64>, SpinTensor<f64>);

/// Which generalised Fock matrix to read.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FockSign {
    Plus,
    Minus,
}

impl FockSign {
    pub fn as_str(&self) -> &'static str {
        match self {
            FockSign::Plus => "plus",
            FockSign::Minus => "minus",
        }
    }

    /// Observable name in the output store.
    pub fn observable(&self) -> String {
        format!("gen_fock_{}", self.as_str())
    }
}

impl fmt::Display for FockSign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn require_average<S: ObservableSource + ?Sized>(
    source: &S,
    name: &str,
    estimator: Estimator,
    equilibration: usize,
    stride: usize,
    bp_index: Option<usize>,
) -> Result<BlockAverage> {
    average_observable(source, name, estimator, equilibration, stride, bp_index)?.ok_or_else(|| {
        AnalysisError::UnsupportedAnalysisMode(format!("free projection error analysis for {}", name))
    })
}

fn reshape_average(avg: &BlockAverage, walker: WalkerType, nmo: usize, name: &str) -> Result<TensorAverage> {
    let (n_sectors, dim) = walker.sector_layout(nmo)?;
    let mean = SpinTensor::from_row_major(avg.mean.as_slice(), n_sectors, dim, name)?;
    let error = SpinTensor::from_row_major(avg.error.as_slice(), n_sectors, dim, name)?;
    Ok((mean, error))
}

/// Average the one-body density matrix P_sij = <c†_is c_js>.
pub fn average_one_rdm<S: ObservableSource + ?Sized>(
    source: &S,
    estimator: Estimator,
    equilibration: usize,
    stride: usize,
    bp_index: Option<usize>,
) -> Result<TensorAverage> {
    let md = source.metadata()?;
    let walker = md.walker_type()?;
    let nmo = md.nmo()?;
    let avg = require_average(source, "one_rdm", estimator, equilibration, stride, bp_index)?;
    reshape_average(&avg, walker, nmo, "one_rdm")
}

/// Packed length of the diagonal 2-RDM for a walker type.
pub fn packed_two_rdm_len(walker: WalkerType, nmo: usize) -> Result<usize> {
    if nmo == 0 {
        return Err(AnalysisError::InvalidParameter("NMO must be positive".into()));
    }
    match walker {
        WalkerType::Closed => Ok(nmo * (2 * nmo - 1) - nmo * (nmo - 1) / 2),
        WalkerType::Collinear => Ok(nmo * (2 * nmo - 1)),
        WalkerType::NonCollinear => Err(AnalysisError::UnsupportedWalkerType {
            walker: walker.to_string(),
            observable: "diag_two_rdm".into(),
        }),
        WalkerType::Undefined => Err(AnalysisError::UnrecognizedWalkerType(0)),
    }
}

/// Unpack the strict upper triangle of the (2NMO x 2NMO) diagonal 2-RDM.
///
/// Only rows `0..rows` are stored; for closed-shell walkers the same-spin
/// block is then copied from the up-up block. The result is symmetrised, so
/// the (zero) diagonal is never written.
pub fn unpack_diag_two_rdm(
    avg: &BlockAverage,
    walker: WalkerType,
    nmo: usize,
) -> Result<(DMatrix<Complex64>, DMatrix<f64>)> {
    let expected = packed_two_rdm_len(walker, nmo)?;
    if avg.len() != expected {
        return Err(AnalysisError::ShapeMismatch {
            observable: "diag_two_rdm".into(),
            expected,
            found: avg.len(),
        });
    }

    let dim = 2 * nmo;
    let rows = match walker {
        WalkerType::Closed => nmo,
        _ => dim,
    };
    let mut two_rdm = DMatrix::<Complex64>::zeros(dim, dim);
    let mut two_rdm_err = DMatrix::<f64>::zeros(dim, dim);
    let mut ij = 0;
    for i in 0..rows {
        for j in (i + 1)..dim {
            two_rdm[(i, j)] = avg.mean[ij];
            two_rdm_err[(i, j)] = avg.error[ij];
            ij += 1;
        }
    }

    if walker == WalkerType::Closed {
        let up = two_rdm.view((0, 0), (nmo, nmo)).clone_owned();
        let up_err = two_rdm_err.view((0, 0), (nmo, nmo)).clone_owned();
        two_rdm.view_mut((nmo, nmo), (nmo, nmo)).copy_from(&up);
        two_rdm_err.view_mut((nmo, nmo), (nmo, nmo)).copy_from(&up_err);
    }

    Ok((hermitize(&two_rdm), symmetrize(&two_rdm_err)))
}

/// Average the diagonal two-body density matrix <c†_is c†_jt c_jt c_is>.
///
/// Returned as a (2NMO x 2NMO) matrix in the spin-orbital basis.
pub fn average_diag_two_rdm<S: ObservableSource + ?Sized>(
    source: &S,
    estimator: Estimator,
    equilibration: usize,
    stride: usize,
    bp_index: Option<usize>,
) -> Result<(DMatrix<Complex64>, DMatrix<f64>)> {
    let md = source.metadata()?;
    let walker = md.walker_type()?;
    let nmo = md.nmo()?;
    // reject non-collinear before touching the data
    packed_two_rdm_len(walker, nmo)?;
    let avg = require_average(source, "diag_two_rdm", estimator, equilibration, stride, bp_index)?;
    unpack_diag_two_rdm(&avg, walker, nmo)
}

/// Average the on-top pair density n(r, r).
///
/// The flat grid layout is returned unchanged.
pub fn average_on_top_pdm<S: ObservableSource + ?Sized>(
    source: &S,
    estimator: Estimator,
    equilibration: usize,
    stride: usize,
    bp_index: Option<usize>,
) -> Result<Option<BlockAverage>> {
    average_observable(source, "on_top_pdm", estimator, equilibration, stride, bp_index)
}

/// Average a generalised Fock matrix.
///
/// Closed-shell means are doubled to account for the implicit spin sum; the
/// error bars are not.
pub fn average_gen_fock<S: ObservableSource + ?Sized>(
    source: &S,
    fock_sign: FockSign,
    estimator: Estimator,
    equilibration: usize,
    stride: usize,
    bp_index: Option<usize>,
) -> Result<TensorAverage> {
    let md = source.metadata()?;
    let walker = md.walker_type()?;
    let nmo = md.nmo()?;
    let name = fock_sign.observable();
    let avg = require_average(source, &name, estimator, equilibration, stride, bp_index)?;
    let (mean, error) = reshape_average(&avg, walker, nmo, &name)?;
    match walker {
        WalkerType::Closed => Ok((mean.map(|z| z * 2.0), error)),
        _ => Ok((mean, error)),
    }
}
