//! Spin-resolved matrix stacks.

use nalgebra::{DMatrix, Scalar};

use crate::error::{AnalysisError, Result};

/// A (sector, orbital, orbital) tensor stored as one square matrix per spin sector.
#[derive(Clone, Debug, PartialEq)]
pub struct SpinTensor<T: Scalar> {
    sectors: Vec<DMatrix<T>>,
}

impl<T: Scalar> SpinTensor<T> {
    /// Wrap a list of equally sized square matrices.
    pub fn new(sectors: Vec<DMatrix<T>>) -> Result<Self> {
        let dim = sectors.first().map(|m| m.nrows()).unwrap_or(0);
        for m in sectors.iter() {
            if m.nrows() != dim || m.ncols() != dim {
                return Err(AnalysisError::ShapeMismatch {
                    observable: "spin tensor sector".into(),
                    expected: dim * dim,
                    found: m.len(),
                });
            }
        }
        Ok(Self { sectors })
    }

    /// Reshape a flat row-major array into `n_sectors` blocks of `dim x dim`.
    ///
    /// Element `(s, i, j)` is read from `data[s * dim * dim + i * dim + j]`.
    pub fn from_row_major(data: &[T], n_sectors: usize, dim: usize, observable: &str) -> Result<Self> {
        let block = dim * dim;
        if data.len() != n_sectors * block {
            return Err(AnalysisError::ShapeMismatch {
                observable: observable.to_string(),
                expected: n_sectors * block,
                found: data.len(),
            });
        }
        let sectors = data
            .chunks(block.max(1))
            .take(n_sectors)
            .map(|chunk| DMatrix::from_row_slice(dim, dim, chunk))
            .collect();
        Ok(Self { sectors })
    }

    pub fn n_sectors(&self) -> usize {
        self.sectors.len()
    }

    /// Orbital dimension of each sector.
    pub fn dim(&self) -> usize {
        self.sectors.first().map(|m| m.nrows()).unwrap_or(0)
    }

    /// `(sectors, rows, cols)`, matching the layout of the flat array.
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.n_sectors(), self.dim(), self.dim())
    }

    pub fn sector(&self, s: usize) -> &DMatrix<T> {
        &self.sectors[s]
    }

    pub fn sector_mut(&mut self, s: usize) -> &mut DMatrix<T> {
        &mut self.sectors[s]
    }

    pub fn sectors(&self) -> &[DMatrix<T>] {
        &self.sectors
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut DMatrix<T>> {
        self.sectors.iter_mut()
    }

    pub fn into_sectors(self) -> Vec<DMatrix<T>> {
        self.sectors
    }

    /// Element-wise map over every sector.
    pub fn map<U: Scalar, F: FnMut(T) -> U>(&self, mut f: F) -> SpinTensor<U> {
        SpinTensor {
            sectors: self.sectors.iter().map(|m| m.map(&mut f)).collect(),
        }
    }
}
