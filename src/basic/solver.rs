#[cfg(feature = "faer")]
mod faer;
#[cfg(feature = "faer")]
pub use self::faer::*;

#[cfg(feature = "rsparse")]
mod rsparse;
#[cfg(feature = "rsparse")]
pub use self::rsparse::*;

mod factory;
mod refined;
pub use factory::create;
pub use refined::RefinedSparseCholesky;

use derive_more::derive::Display;
use serde::{Deserialize, Serialize};

use super::linear_solver::{LinearSolverError, LinearSolverResult};
use super::sparse::{CompressedRowSparseMatrix, StorageType};

/// Fill-reducing ordering applied during symbolic analysis.
///
/// Every backend accepts the same two values even though each maps them onto
/// its own library's ordering routines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub enum OrderingType {
    #[display("natural")]
    Natural,
    #[display("amd")]
    Amd,
}

impl OrderingType {
    #[inline(always)]
    pub const fn from_postordering(use_postordering: bool) -> Self {
        if use_postordering {
            OrderingType::Amd
        } else {
            OrderingType::Natural
        }
    }
}

/// A sparse Cholesky factorization of a symmetric positive definite matrix.
///
/// Instances are stateful: [`solve`](SparseCholesky::solve) uses the factor
/// produced by the most recent successful
/// [`factorize`](SparseCholesky::factorize). They are not meant to be shared
/// between threads without external synchronization.
pub trait SparseCholesky: Send {
    /// The triangle the input of [`factorize`](SparseCholesky::factorize) must
    /// be stored in. Use [`CompressedRowSparseMatrix::to_storage_type`] to
    /// convert.
    fn storage_type(&self) -> StorageType;

    /// Computes the symbolic analysis (when the sparsity pattern changed) and
    /// the numeric factorization of `lhs`.
    ///
    /// # Returns
    ///
    /// * `Failure` if `lhs` is not positive definite or is structurally
    ///   invalid for this backend (not square, wrong storage type).
    /// * `Fatal` if the underlying library hit an unrecoverable error.
    ///
    /// A failed call discards any earlier factorization.
    fn factorize(&mut self, lhs: &mut CompressedRowSparseMatrix) -> LinearSolverResult;

    /// Solves `lhs * solution = rhs` with the current factorization.
    ///
    /// # Panics
    ///
    /// If no successful [`factorize`](SparseCholesky::factorize) preceded the
    /// call, or if a buffer length does not match the factored dimension.
    fn solve(&mut self, rhs: &[f64], solution: &mut [f64]) -> LinearSolverResult;

    /// Factorizes `lhs` and, only if that succeeds, solves for `rhs`.
    fn factor_and_solve(
        &mut self,
        lhs: &mut CompressedRowSparseMatrix,
        rhs: &[f64],
        solution: &mut [f64],
    ) -> LinearSolverResult {
        self.factorize(lhs)?;
        self.solve(rhs, solution)
    }
}

impl<S: SparseCholesky + ?Sized> SparseCholesky for Box<S> {
    fn storage_type(&self) -> StorageType {
        (**self).storage_type()
    }

    fn factorize(&mut self, lhs: &mut CompressedRowSparseMatrix) -> LinearSolverResult {
        (**self).factorize(lhs)
    }

    fn solve(&mut self, rhs: &[f64], solution: &mut [f64]) -> LinearSolverResult {
        (**self).solve(rhs, solution)
    }
}

/// Checks the structural requirements every backend shares.
pub(crate) fn check_structure(
    lhs: &CompressedRowSparseMatrix,
    storage_type: StorageType,
) -> LinearSolverResult {
    let csr = lhs.as_csr();
    if csr.nrows() != csr.ncols() {
        return Err(LinearSolverError::failure(format!(
            "expected a square matrix, got {}x{}",
            csr.nrows(),
            csr.ncols()
        )));
    }
    if lhs.storage_type() != storage_type {
        return Err(LinearSolverError::failure(format!(
            "expected a matrix in {} storage, got {}",
            storage_type,
            lhs.storage_type()
        )));
    }
    Ok(())
}
