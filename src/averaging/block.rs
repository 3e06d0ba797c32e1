//! Block averaging of observable time series.
//!
//! Each recorded block is one sample. After dropping the equilibration
//! prefix and thinning by a stride, the mean is taken element-wise over the
//! retained blocks and the error is the standard error of the mean of the
//! real parts:
//!
//!   err_k = sqrt( Σ_b (Re x_bk - Re x̄_k)² / (n (n - 1)) )

use nalgebra::DVector;
use num_complex::Complex64;

use crate::error::{AnalysisError, Result};
use crate::source::{Estimator, ObservableSource};

/// Mean and standard error of an observable, both with the block's length.
#[derive(Clone, Debug, PartialEq)]
pub struct BlockAverage {
    pub mean: DVector<Complex64>,
    pub error: DVector<f64>,
}

impl BlockAverage {
    pub fn len(&self) -> usize {
        self.mean.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mean.is_empty()
    }
}

/// Average `name` from `source`.
///
/// Returns `Ok(None)` for free-projection runs, where these error bars are
/// not meaningful; the extractor is not called in that case.
pub fn average_observable<S: ObservableSource + ?Sized>(
    source: &S,
    name: &str,
    estimator: Estimator,
    equilibration: usize,
    stride: usize,
    bp_index: Option<usize>,
) -> Result<Option<BlockAverage>> {
    if stride == 0 {
        return Err(AnalysisError::InvalidParameter("stride must be at least 1".into()));
    }
    let md = source.metadata()?;
    if md.free_projection {
        log::warn!("error analysis for free projection not implemented, skipping {}", name);
        return Ok(None);
    }
    let data = source.extract_observable(name, estimator, bp_index)?;
    block_average(&data, name, equilibration, stride).map(Some)
}

/// Average already extracted blocks, keeping `[equilibration, len)` step `stride`.
pub fn block_average(
    data: &[DVector<Complex64>],
    name: &str,
    equilibration: usize,
    stride: usize,
) -> Result<BlockAverage> {
    if stride == 0 {
        return Err(AnalysisError::InvalidParameter("stride must be at least 1".into()));
    }
    let retained: Vec<&DVector<Complex64>> = data.iter().skip(equilibration).step_by(stride).collect();
    if retained.is_empty() {
        return Err(AnalysisError::EmptySample {
            observable: name.to_string(),
            blocks: data.len(),
            equilibration,
        });
    }

    let len = retained[0].len();
    if let Some(bad) = retained.iter().find(|b| b.len() != len) {
        return Err(AnalysisError::ShapeMismatch {
            observable: name.to_string(),
            expected: len,
            found: bad.len(),
        });
    }

    let n = retained.len() as f64;
    let mut mean = DVector::<Complex64>::zeros(len);
    for block in retained.iter() {
        mean += *block;
    }
    mean /= Complex64::new(n, 0.0);

    let mut sum_sq = DVector::<f64>::zeros(len);
    for block in retained.iter() {
        for k in 0..len {
            sum_sq[k] += (block[k].re - mean[k].re).powi(2);
        }
    }
    // n == 1 gives 0/0, i.e. an undefined error bar
    let error = sum_sq.map(|s| (s / ((n - 1.0) * n)).sqrt());

    log::debug!("averaged {} over {} of {} blocks", name, retained.len(), data.len());
    Ok(BlockAverage { mean, error })
}
