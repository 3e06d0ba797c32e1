//! AFQMC analysis - statistical post-processing of AFQMC density matrices.
//!
//! This crate block-averages reduced density matrix estimators recorded by an
//! AFQMC run, reshapes them into spin-resolved tensors, and derives natural
//! orbital occupations and extended Koopmans' theorem energies with
//! bootstrap error bars.

pub mod error;
pub mod source;
pub mod averaging;
pub mod spectral;
pub mod io;

// Re-export commonly used types at crate root
pub use error::{AnalysisError, Result};
pub use source::{Estimator, Metadata, MemorySource, ObservableSource, WalkerType};
pub use averaging::{
    average_diag_two_rdm, average_gen_fock, average_observable, average_on_top_pdm, average_one_rdm,
    BlockAverage, FockSign, SpinTensor,
};
pub use spectral::{
    analyse_ekt, estimate_error_fock, get_noons, regularised_ortho, EktAnalysis, EktSpectrum,
    FockErrorInputs, NoonAnalysis,
};
pub use io::AnalysisParams;
