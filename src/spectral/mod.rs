//! Spectral module - occupation numbers and EKT energies from averaged matrices.

mod linalg;
mod bootstrap;
mod noons;
mod ekt;

pub use linalg::{
    hermitize, symmetrize, eigh, eigvalsh, ortho_with_rank, regularised_ortho, screen_matrix,
    screen_tensor,
};
pub use bootstrap::{bootstrap_rng, gen_sample_matrix, sample_std};
pub use noons::{get_noons, noons_from_rdm, spin_summed_rdm, NoonAnalysis};
pub use ekt::{
    analyse_ekt, affinity_energies, estimate_error_fock, ionization_energies, EktAnalysis,
    EktSpectrum, FockErrorInputs,
};
