//! IO module - analysis configuration.

mod config;

pub use config::AnalysisParams;
