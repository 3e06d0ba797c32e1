//! Error types for AFQMC observable analysis.

use thiserror::Error;

/// Everything that can go wrong while averaging or analysing AFQMC observables.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    /// Walker-type code outside the known set (or the `undefined` placeholder).
    #[error("unrecognized walker type code {0}")]
    UnrecognizedWalkerType(i64),
    /// Known walker type that the requested observable cannot be built for.
    #[error("{observable} is not supported for {walker} walkers")]
    UnsupportedWalkerType { walker: String, observable: String },
    /// Analysis requested for data whose error bars are not meaningful.
    #[error("unsupported analysis mode: {0}")]
    UnsupportedAnalysisMode(String),
    /// Array length disagrees with the layout implied by the metadata.
    #[error("shape mismatch for {observable}: expected {expected} elements, found {found}")]
    ShapeMismatch {
        observable: String,
        expected: usize,
        found: usize,
    },
    /// Nothing left to average after dropping equilibration blocks.
    #[error("no blocks retained for {observable}: {blocks} blocks, {equilibration} dropped for equilibration")]
    EmptySample {
        observable: String,
        blocks: usize,
        equilibration: usize,
    },
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    /// The data source has no series under this name/estimator.
    #[error("observable {name} not found for estimator {estimator}")]
    MissingObservable { name: String, estimator: String },
    /// Normal distribution could not be built from an error bar.
    #[error("cannot perturb matrix: {0}")]
    Perturbation(String),
    /// Too few bootstrap samples kept a consistent rank.
    #[error("bootstrap unstable: only {accepted} of {requested} samples kept a consistent rank")]
    BootstrapUnstable { accepted: usize, requested: usize },
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<serde_yaml::Error> for AnalysisError {
    fn from(err: serde_yaml::Error) -> Self {
        AnalysisError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
