//! Analysis parameters, readable from YAML.
//!
//! Every field is optional in the file; missing keys take the defaults below.
//!
//! ```yaml
//! estimator: back_propagated
//! equilibration: 1
//! stride: 1
//! bp_index: 2
//! nsamp: 20
//! screen_factor: 1.0
//! cutoff: 1.0e-14
//! seed: 7
//! ```

use std::io::Read;

use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};
use crate::source::Estimator;
use crate::spectral::bootstrap_rng;

/// Parameters shared by the averaging and spectral analyses.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisParams {
    /// Estimator to read
    pub estimator: Estimator,
    /// Blocks discarded from the start of the series
    pub equilibration: usize,
    /// Keep every `stride`-th block after equilibration
    pub stride: usize,
    /// Back-propagation path index (None picks the longest)
    pub bp_index: Option<usize>,
    /// Number of perturbed matrices in each bootstrap
    pub nsamp: usize,
    /// Zero matrix elements with |x| < screen_factor * err
    pub screen_factor: f64,
    /// Eigenvalue threshold of the regularised orthogonaliser
    pub cutoff: f64,
    /// Bootstrap seed; entropy when absent
    pub seed: Option<u64>,
}

impl Default for AnalysisParams {
    fn default() -> Self {
        Self {
            estimator: Estimator::BackPropagated,
            equilibration: 1,
            stride: 1,
            bp_index: None,
            nsamp: 20,
            screen_factor: 1.0,
            cutoff: 1e-14,
            seed: None,
        }
    }
}

impl AnalysisParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_estimator(mut self, estimator: Estimator) -> Self {
        self.estimator = estimator;
        self
    }

    pub fn with_equilibration(mut self, n: usize) -> Self {
        self.equilibration = n;
        self
    }

    pub fn with_stride(mut self, n: usize) -> Self {
        self.stride = n;
        self
    }

    pub fn with_bp_index(mut self, ix: Option<usize>) -> Self {
        self.bp_index = ix;
        self
    }

    pub fn with_nsamp(mut self, n: usize) -> Self {
        self.nsamp = n;
        self
    }

    pub fn with_screen_factor(mut self, factor: f64) -> Self {
        self.screen_factor = factor;
        self
    }

    pub fn with_cutoff(mut self, cutoff: f64) -> Self {
        self.cutoff = cutoff;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Check ranges before any data is read.
    pub fn validate(&self) -> Result<()> {
        if self.stride == 0 {
            return Err(AnalysisError::InvalidParameter("stride must be at least 1".into()));
        }
        if self.nsamp < 2 {
            return Err(AnalysisError::InvalidParameter(format!(
                "nsamp must be at least 2, got {}",
                self.nsamp
            )));
        }
        if !(self.screen_factor.is_finite() && self.screen_factor >= 0.0) {
            return Err(AnalysisError::InvalidParameter(format!(
                "screen_factor must be finite and non-negative, got {}",
                self.screen_factor
            )));
        }
        if !self.cutoff.is_finite() {
            return Err(AnalysisError::InvalidParameter(format!(
                "cutoff must be finite, got {}",
                self.cutoff
            )));
        }
        Ok(())
    }

    /// Random generator for the bootstrap, honouring `seed`.
    pub fn rng(&self) -> StdRng {
        bootstrap_rng(self.seed)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let params: AnalysisParams = serde_yaml::from_str(text)?;
        params.validate()?;
        Ok(params)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let params: AnalysisParams = serde_yaml::from_reader(reader)?;
        params.validate()?;
        Ok(params)
    }
}
