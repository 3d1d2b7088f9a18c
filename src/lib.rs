//! Sparse Cholesky factorization and solves for symmetric positive definite
//! systems, with interchangeable backends and optional iterative refinement.
//!
//! ```ignore
//! use rustpower_cholesky::prelude::*;
//!
//! let options = LinearSolverOptions::default();
//! let mut solver = create(&options)?;
//! let mut lhs = lhs.to_storage_type(solver.storage_type());
//! solver.factor_and_solve(&mut lhs, &rhs, &mut solution)?;
//! ```
mod basic;

pub mod prelude {
    use crate::basic;

    pub use basic::iterative_refiner::{IterativeRefiner, RefinementSummary};
    pub use basic::linear_solver::{
        ConfigurationError, LinearSolverError, LinearSolverOptions, LinearSolverResult,
        LinearSolverTerminationType, SparseLinearAlgebraLibraryType, compiled_libraries, termination_type,
    };
    pub use basic::solver::*;
    pub use basic::sparse::cast::Scalar;
    pub use basic::sparse::{CompressedRowSparseMatrix, MatrixError, StorageType};
}
