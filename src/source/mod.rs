//! Source module - metadata and raw observable time series.

mod traits;
mod memory;

pub use traits::{Estimator, Metadata, ObservableSource, WalkerType};
pub use memory::MemorySource;
