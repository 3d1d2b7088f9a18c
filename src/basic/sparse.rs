pub(crate) mod cast;

use derive_more::derive::{Display, Error};
use nalgebra::DMatrix;
use nalgebra_sparse::{CooMatrix, CsrMatrix, SparseFormatError};
use serde::{Deserialize, Serialize};

/// Which triangle of a symmetric matrix is physically stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub enum StorageType {
    #[display("upper triangular")]
    UpperTriangular,
    #[display("lower triangular")]
    LowerTriangular,
}

impl StorageType {
    #[inline(always)]
    fn contains(self, row: usize, col: usize) -> bool {
        match self {
            StorageType::UpperTriangular => col >= row,
            StorageType::LowerTriangular => col <= row,
        }
    }
}

#[derive(Debug, Display, Error)]
pub enum MatrixError {
    #[display("matrix must be square, got {nrows}x{ncols}")]
    NotSquare { nrows: usize, ncols: usize },
    #[display("entry ({row}, {col}) lies outside the {storage_type} storage")]
    OutsideTriangle {
        row: usize,
        col: usize,
        storage_type: StorageType,
    },
    #[display("invalid compressed row data: {_0}")]
    Format(SparseFormatError),
}

impl From<SparseFormatError> for MatrixError {
    fn from(e: SparseFormatError) -> Self {
        MatrixError::Format(e)
    }
}

/// A square symmetric matrix of which only one triangle (diagonal included)
/// is stored, in compressed-row form.
///
/// Because the matrix is symmetric, the row offsets and column indices of the
/// stored triangle are also the column offsets and row indices of the opposite
/// triangle in compressed-column form. Backends rely on this to hand the data
/// to column-major libraries without copying the structure.
#[derive(Debug, Clone, PartialEq)]
pub struct CompressedRowSparseMatrix {
    matrix: CsrMatrix<f64>,
    storage_type: StorageType,
}

impl CompressedRowSparseMatrix {
    /// Wraps `matrix`, checking that it is square and that every stored entry
    /// belongs to `storage_type`.
    pub fn try_new(matrix: CsrMatrix<f64>, storage_type: StorageType) -> Result<Self, MatrixError> {
        if matrix.nrows() != matrix.ncols() {
            return Err(MatrixError::NotSquare {
                nrows: matrix.nrows(),
                ncols: matrix.ncols(),
            });
        }
        if let Some((row, col, _)) = matrix
            .triplet_iter()
            .find(|(r, c, _)| !storage_type.contains(*r, *c))
        {
            return Err(MatrixError::OutsideTriangle {
                row,
                col,
                storage_type,
            });
        }
        Ok(Self {
            matrix,
            storage_type,
        })
    }

    /// Keeps the `storage_type` triangle of a fully stored symmetric matrix.
    /// Symmetry itself is not checked.
    pub fn from_symmetric(full: &CsrMatrix<f64>, storage_type: StorageType) -> Result<Self, MatrixError> {
        if full.nrows() != full.ncols() {
            return Err(MatrixError::NotSquare {
                nrows: full.nrows(),
                ncols: full.ncols(),
            });
        }
        let n = full.nrows();
        let mut coo = CooMatrix::new(n, n);
        full.triplet_iter()
            .filter(|(r, c, _)| storage_type.contains(*r, *c))
            .for_each(|(r, c, v)| coo.push(r, c, *v));
        Ok(Self {
            matrix: CsrMatrix::from(&coo),
            storage_type,
        })
    }

    /// Builds an `n`x`n` matrix from `(row, col, value)` triplets. Duplicates
    /// are summed; an entry outside the requested triangle is mirrored into it.
    ///
    /// Panics if an index is out of bounds.
    pub fn from_triplets(
        n: usize,
        triplets: &[(usize, usize, f64)],
        storage_type: StorageType,
    ) -> Self {
        let mut coo = CooMatrix::new(n, n);
        for &(r, c, v) in triplets {
            if storage_type.contains(r, c) {
                coo.push(r, c, v);
            } else {
                coo.push(c, r, v);
            }
        }
        Self {
            matrix: CsrMatrix::from(&coo),
            storage_type,
        }
    }

    /// Returns the same matrix stored in the requested triangle.
    pub fn to_storage_type(&self, storage_type: StorageType) -> Self {
        if storage_type == self.storage_type {
            return self.clone();
        }
        Self {
            matrix: self.matrix.transpose(),
            storage_type,
        }
    }

    #[inline(always)]
    pub fn storage_type(&self) -> StorageType {
        self.storage_type
    }

    #[inline(always)]
    pub fn num_rows(&self) -> usize {
        self.matrix.nrows()
    }

    #[inline(always)]
    pub fn num_nonzeros(&self) -> usize {
        self.matrix.nnz()
    }

    #[inline(always)]
    pub fn row_offsets(&self) -> &[usize] {
        self.matrix.row_offsets()
    }

    #[inline(always)]
    pub fn col_indices(&self) -> &[usize] {
        self.matrix.col_indices()
    }

    #[inline(always)]
    pub fn values(&self) -> &[f64] {
        self.matrix.values()
    }

    /// Values can be updated in place; the sparsity pattern is fixed.
    #[inline(always)]
    pub fn values_mut(&mut self) -> &mut [f64] {
        self.matrix.values_mut()
    }

    #[inline(always)]
    pub fn as_csr(&self) -> &CsrMatrix<f64> {
        &self.matrix
    }

    /// y += A * x, where A is the full symmetric matrix.
    pub fn right_multiply_and_accumulate(&self, x: &[f64], y: &mut [f64]) {
        let n = self.num_rows();
        assert_eq!(x.len(), n, "x has the wrong length");
        assert_eq!(y.len(), n, "y has the wrong length");
        for (r, c, v) in self.matrix.triplet_iter() {
            y[r] += v * x[c];
            if r != c {
                y[c] += v * x[r];
            }
        }
    }

    /// Expands to a dense symmetric matrix.
    pub fn to_dense(&self) -> DMatrix<f64> {
        let n = self.num_rows();
        let mut dense = DMatrix::zeros(n, n);
        for (r, c, v) in self.matrix.triplet_iter() {
            dense[(r, c)] = *v;
            dense[(c, r)] = *v;
        }
        dense
    }
}
