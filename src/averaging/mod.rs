//! Averaging module - block statistics and spin-resolved reshaping.

mod block;
mod tensor;
mod reshape;

pub use block::{average_observable, block_average, BlockAverage};
pub use tensor::SpinTensor;
pub use reshape::{
    average_diag_two_rdm, average_gen_fock, average_on_top_pdm, average_one_rdm,
    packed_two_rdm_len, unpack_diag_two_rdm, FockSign, TensorAverage,
};
