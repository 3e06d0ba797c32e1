//! In-memory observable store.

use std::collections::HashMap;

use nalgebra::DVector;
use num_complex::Complex64;

use super::traits::{Estimator, Metadata, ObservableSource};
use crate::error::{AnalysisError, Result};

/// Observable store held entirely in memory.
///
/// Series are keyed by observable name, estimator and back-propagation path
/// index. Mixed estimates conventionally use path index 0.
#[derive(Clone, Debug)]
pub struct MemorySource {
    metadata: Metadata,
    series: HashMap<(String, Estimator), Vec<(usize, Vec<DVector<Complex64>>)>>,
}

impl MemorySource {
    pub fn new(metadata: Metadata) -> Self {
        Self {
            metadata,
            series: HashMap::new(),
        }
    }

    /// Store `blocks` under `name`, replacing any series at the same path index.
    pub fn insert(
        &mut self,
        name: &str,
        estimator: Estimator,
        bp_index: usize,
        blocks: Vec<DVector<Complex64>>,
    ) {
        let paths = self.series.entry((name.to_string(), estimator)).or_default();
        paths.retain(|(ix, _)| *ix != bp_index);
        paths.push((bp_index, blocks));
        paths.sort_by_key(|(ix, _)| *ix);
    }

    /// Builder form of [`MemorySource::insert`].
    pub fn with_series(
        mut self,
        name: &str,
        estimator: Estimator,
        bp_index: usize,
        blocks: Vec<DVector<Complex64>>,
    ) -> Self {
        self.insert(name, estimator, bp_index, blocks);
        self
    }

    /// Convenience for purely real data.
    pub fn with_real_series(
        self,
        name: &str,
        estimator: Estimator,
        bp_index: usize,
        blocks: Vec<Vec<f64>>,
    ) -> Self {
        let blocks = blocks
            .into_iter()
            .map(|b| DVector::from_iterator(b.len(), b.into_iter().map(|x| Complex64::new(x, 0.0))))
            .collect();
        self.with_series(name, estimator, bp_index, blocks)
    }
}

impl ObservableSource for MemorySource {
    fn metadata(&self) -> Result<Metadata> {
        Ok(self.metadata.clone())
    }

    fn extract_observable(
        &self,
        name: &str,
        estimator: Estimator,
        bp_index: Option<usize>,
    ) -> Result<Vec<DVector<Complex64>>> {
        let missing = || AnalysisError::MissingObservable {
            name: name.to_string(),
            estimator: estimator.to_string(),
        };
        let paths = self
            .series
            .get(&(name.to_string(), estimator))
            .ok_or_else(missing)?;
        let found = match bp_index {
            Some(ix) => paths.iter().find(|(i, _)| *i == ix),
            // sorted by path index, so the last entry is the longest path
            None => paths.last(),
        };
        found.map(|(_, blocks)| blocks.clone()).ok_or_else(missing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::WalkerType;

    fn block(x: f64) -> Vec<f64> {
        vec![x, 2.0 * x]
    }

    #[test]
    fn test_default_path_is_longest() {
        let src = MemorySource::new(Metadata::new(1, WalkerType::Closed, false))
            .with_real_series("one_rdm", Estimator::BackPropagated, 4, vec![block(4.0)])
            .with_real_series("one_rdm", Estimator::BackPropagated, 1, vec![block(1.0)]);

        let longest = src
            .extract_observable("one_rdm", Estimator::BackPropagated, None)
            .unwrap();
        assert_eq!(longest[0][0].re, 4.0);

        let short = src
            .extract_observable("one_rdm", Estimator::BackPropagated, Some(1))
            .unwrap();
        assert_eq!(short[0][1].re, 2.0);
    }

    #[test]
    fn test_missing_observable() {
        let src = MemorySource::new(Metadata::new(1, WalkerType::Closed, false))
            .with_real_series("one_rdm", Estimator::BackPropagated, 0, vec![block(1.0)]);

        let err = src
            .extract_observable("one_rdm", Estimator::Mixed, None)
            .unwrap_err();
        assert!(matches!(err, AnalysisError::MissingObservable { .. }));

        let err = src
            .extract_observable("one_rdm", Estimator::BackPropagated, Some(3))
            .unwrap_err();
        assert!(matches!(err, AnalysisError::MissingObservable { .. }));
    }

    #[test]
    fn test_insert_replaces_path() {
        let mut src = MemorySource::new(Metadata::new(1, WalkerType::Closed, false));
        src.insert("x", Estimator::Mixed, 0, vec![DVector::from_element(1, Complex64::new(1.0, 0.0))]);
        src.insert("x", Estimator::Mixed, 0, vec![DVector::from_element(1, Complex64::new(5.0, 0.0))]);
        let data = src.extract_observable("x", Estimator::Mixed, Some(0)).unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data[0][0].re, 5.0);
    }
}
