//! Types describing the AFQMC data store and the trait that reads it.

use std::fmt;

use nalgebra::DVector;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};

/// Spin representation of the walker ensemble.
///
/// Codes are order-significant: `0 = undefined`, `1 = closed`,
/// `2 = collinear`, `3 = non_collinear`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WalkerType {
    Undefined,
    Closed,
    Collinear,
    NonCollinear,
}

impl WalkerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            WalkerType::Undefined => "undefined",
            WalkerType::Closed => "closed",
            WalkerType::Collinear => "collinear",
            WalkerType::NonCollinear => "non_collinear",
        }
    }

    /// Number of spin sectors and the orbital dimension of each sector.
    ///
    /// `Undefined` has no layout and is rejected.
    pub fn sector_layout(&self, nmo: usize) -> Result<(usize, usize)> {
        match self {
            WalkerType::Closed => Ok((1, nmo)),
            WalkerType::Collinear => Ok((2, nmo)),
            WalkerType::NonCollinear => Ok((1, 2 * nmo)),
            WalkerType::Undefined => Err(AnalysisError::UnrecognizedWalkerType(0)),
        }
    }
}

impl TryFrom<i64> for WalkerType {
    type Error = AnalysisError;

    fn try_from(code: i64) -> Result<Self> {
        match code {
            0 => Ok(WalkerType::Undefined),
            1 => Ok(WalkerType::Closed),
            2 => Ok(WalkerType::Collinear),
            3 => Ok(WalkerType::NonCollinear),
            other => Err(AnalysisError::UnrecognizedWalkerType(other)),
        }
    }
}

impl fmt::Display for WalkerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which estimator's time series to read.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Estimator {
    #[default]
    BackPropagated,
    Mixed,
}

impl Estimator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Estimator::BackPropagated => "back_propagated",
            Estimator::Mixed => "mixed",
        }
    }
}

impl fmt::Display for Estimator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Simulation metadata as stored alongside the observables.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    /// Number of molecular orbitals
    #[serde(rename = "NMO")]
    pub nmo: usize,
    /// Raw walker-type code, see [`WalkerType`]
    #[serde(rename = "WalkerType")]
    pub walker_type: i64,
    /// Whether the run used free projection
    #[serde(rename = "FreeProjection")]
    pub free_projection: bool,
}

impl Metadata {
    pub fn new(nmo: usize, walker_type: WalkerType, free_projection: bool) -> Self {
        let code = match walker_type {
            WalkerType::Undefined => 0,
            WalkerType::Closed => 1,
            WalkerType::Collinear => 2,
            WalkerType::NonCollinear => 3,
        };
        Self {
            nmo,
            walker_type: code,
            free_projection,
        }
    }

    /// Validated walker type. `undefined` is not a usable walker type.
    pub fn walker_type(&self) -> Result<WalkerType> {
        match WalkerType::try_from(self.walker_type)? {
            WalkerType::Undefined => Err(AnalysisError::UnrecognizedWalkerType(self.walker_type)),
            walker => Ok(walker),
        }
    }

    /// Orbital count, rejecting an empty basis.
    pub fn nmo(&self) -> Result<usize> {
        if self.nmo == 0 {
            return Err(AnalysisError::InvalidParameter("NMO must be positive".into()));
        }
        Ok(self.nmo)
    }
}

/// Read access to an AFQMC output store.
pub trait ObservableSource {
    /// Small key-value record describing the run.
    fn metadata(&self) -> Result<Metadata>;

    /// Per-block time series of `name`, flattened row-major.
    ///
    /// `bp_index = None` selects the longest back-propagation path.
    fn extract_observable(
        &self,
        name: &str,
        estimator: Estimator,
        bp_index: Option<usize>,
    ) -> Result<Vec<DVector<Complex64>>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_walker_codes() {
        assert_eq!(WalkerType::try_from(1i64).unwrap(), WalkerType::Closed);
        assert_eq!(WalkerType::try_from(3i64).unwrap(), WalkerType::NonCollinear);
        assert_eq!(WalkerType::try_from(-1i64), Err(AnalysisError::UnrecognizedWalkerType(-1)));
        assert_eq!(WalkerType::try_from(4i64), Err(AnalysisError::UnrecognizedWalkerType(4)));
        for walker in [WalkerType::Closed, WalkerType::Collinear, WalkerType::NonCollinear] {
            assert_eq!(Metadata::new(2, walker, false).walker_type().unwrap(), walker);
        }
    }

    #[test]
    fn test_sector_layout() {
        assert_eq!(WalkerType::Closed.sector_layout(4).unwrap(), (1, 4));
        assert_eq!(WalkerType::Collinear.sector_layout(4).unwrap(), (2, 4));
        assert_eq!(WalkerType::NonCollinear.sector_layout(4).unwrap(), (1, 8));
        assert!(WalkerType::Undefined.sector_layout(4).is_err());
    }

    #[test]
    fn test_metadata_keys() {
        let md: Metadata = serde_yaml::from_str("NMO: 5\nWalkerType: 2\nFreeProjection: false\n").unwrap();
        assert_eq!(md.nmo().unwrap(), 5);
        assert_eq!(md.walker_type().unwrap(), WalkerType::Collinear);
        assert!(!md.free_projection);

        let empty = Metadata::new(0, WalkerType::Closed, false);
        assert!(matches!(empty.nmo(), Err(AnalysisError::InvalidParameter(_))));
    }

    #[test]
    fn test_estimator_names() {
        assert_eq!(Estimator::default().to_string(), "back_propagated");
        assert_eq!(Estimator::Mixed.as_str(), "mixed");
    }
}
