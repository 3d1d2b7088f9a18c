use tracing::{debug, error};

use super::{OrderingType, RefinedSparseCholesky, SparseCholesky};
use crate::basic::iterative_refiner::IterativeRefiner;
use crate::basic::linear_solver::{ConfigurationError, LinearSolverOptions, SparseLinearAlgebraLibraryType};

/// Builds the sparse Cholesky solver described by `options`.
///
/// The backend is chosen from the library type and the mixed precision flag,
/// with an AMD ordering if postordering is requested and the natural ordering
/// otherwise. When `max_num_refinement_iterations` is positive the backend is
/// wrapped in a [`RefinedSparseCholesky`].
///
/// # Errors
///
/// [`ConfigurationError::LibraryNotCompiled`] if the requested library was
/// not compiled into this build. No other library is substituted.
pub fn create(options: &LinearSolverOptions) -> Result<Box<dyn SparseCholesky>, ConfigurationError> {
    let ordering = OrderingType::from_postordering(options.use_postordering);
    let library = options.sparse_linear_algebra_library_type;
    let mixed_precision = options.use_mixed_precision_solves;

    let sparse_cholesky: Box<dyn SparseCholesky> = match library {
        #[cfg(feature = "faer")]
        SparseLinearAlgebraLibraryType::Faer => {
            if mixed_precision {
                Box::new(super::FloatFaerCholesky::new(ordering))
            } else {
                Box::new(super::FaerCholesky::<f64>::new(ordering))
            }
        }
        #[cfg(feature = "rsparse")]
        SparseLinearAlgebraLibraryType::RSparse => {
            if mixed_precision {
                Box::new(super::FloatRSparseCholesky::new(ordering))
            } else {
                Box::new(super::RSparseCholesky::<f64>::new(ordering))
            }
        }
        #[allow(unreachable_patterns)]
        _ => {
            error!("{} support was not compiled into this build", library);
            return Err(ConfigurationError::LibraryNotCompiled(library));
        }
    };
    debug!(
        %library,
        %ordering,
        mixed_precision,
        refinement_iterations = options.max_num_refinement_iterations,
        "created sparse Cholesky solver"
    );

    if options.max_num_refinement_iterations > 0 {
        let refiner = IterativeRefiner::new(options.max_num_refinement_iterations);
        return Ok(Box::new(RefinedSparseCholesky::new(sparse_cholesky, refiner)));
    }
    Ok(sparse_cholesky)
}
