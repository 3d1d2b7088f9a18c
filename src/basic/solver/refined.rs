use tracing::debug;

use super::SparseCholesky;
use crate::basic::iterative_refiner::IterativeRefiner;
use crate::basic::linear_solver::LinearSolverResult;
use crate::basic::sparse::{CompressedRowSparseMatrix, StorageType};

/// Runs an [`IterativeRefiner`] after every successful solve of the wrapped
/// backend. Callers and the backend are unaware of the refinement; the status
/// returned is always that of the backend.
pub struct RefinedSparseCholesky {
    sparse_cholesky: Box<dyn SparseCholesky>,
    iterative_refiner: IterativeRefiner,
    /// The matrix of the last successful `factorize`, needed to compute
    /// residuals during refinement. `None` until a factorization succeeds;
    /// reset at the start of every `factorize` and only set again if that
    /// call succeeds, so it always matches the backend's current factor.
    lhs: Option<CompressedRowSparseMatrix>,
}

impl RefinedSparseCholesky {
    pub fn new(sparse_cholesky: Box<dyn SparseCholesky>, iterative_refiner: IterativeRefiner) -> Self {
        Self {
            sparse_cholesky,
            iterative_refiner,
            lhs: None,
        }
    }

    #[inline(always)]
    pub fn is_factored(&self) -> bool {
        self.lhs.is_some()
    }

    pub fn max_num_refinement_iterations(&self) -> usize {
        self.iterative_refiner.max_num_iterations()
    }
}

impl SparseCholesky for RefinedSparseCholesky {
    fn storage_type(&self) -> StorageType {
        self.sparse_cholesky.storage_type()
    }

    fn factorize(&mut self, lhs: &mut CompressedRowSparseMatrix) -> LinearSolverResult {
        self.lhs = None;
        self.sparse_cholesky.factorize(lhs)?;
        self.lhs = Some(lhs.clone());
        Ok(())
    }

    fn solve(&mut self, rhs: &[f64], solution: &mut [f64]) -> LinearSolverResult {
        let Some(lhs) = self.lhs.as_ref() else {
            panic!("RefinedSparseCholesky::solve called before a successful factorize");
        };
        self.sparse_cholesky.solve(rhs, solution)?;

        let summary = self
            .iterative_refiner
            .refine(lhs, rhs, &mut *self.sparse_cholesky, solution);
        debug!(
            iterations = summary.num_iterations,
            initial_residual = summary.initial_residual_norm,
            final_residual = summary.final_residual_norm,
            "iterative refinement"
        );
        Ok(())
    }
}
