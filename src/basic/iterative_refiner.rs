use nalgebra::DVector;
use tracing::debug;

use super::solver::SparseCholesky;
use super::sparse::CompressedRowSparseMatrix;

/// What a call to [`IterativeRefiner::refine`] did.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RefinementSummary {
    /// Corrections that were applied to the solution.
    pub num_iterations: usize,
    pub initial_residual_norm: f64,
    pub final_residual_norm: f64,
}

/// Improves the solution of `A x = b` by repeatedly solving for the residual
/// with an existing factorization of `A`.
///
/// Each pass computes `r = b - A x`, solves `A c = r` and replaces `x` by
/// `x + c`. A correction is only kept if it lowers `||r||`; if the correction
/// solve fails or the residual stops decreasing, the best solution found so
/// far is left in place and refinement stops. `refine` therefore never makes
/// the solution worse and never reports an error.
pub struct IterativeRefiner {
    max_num_iterations: usize,
    residual: DVector<f64>,
    correction: DVector<f64>,
    candidate: DVector<f64>,
    lhs_x_solution: DVector<f64>,
}

impl IterativeRefiner {
    pub fn new(max_num_iterations: usize) -> Self {
        Self {
            max_num_iterations,
            residual: DVector::zeros(0),
            correction: DVector::zeros(0),
            candidate: DVector::zeros(0),
            lhs_x_solution: DVector::zeros(0),
        }
    }

    #[inline(always)]
    pub fn max_num_iterations(&self) -> usize {
        self.max_num_iterations
    }

    fn allocate(&mut self, num_cols: usize) {
        if self.residual.len() != num_cols {
            self.residual = DVector::zeros(num_cols);
            self.correction = DVector::zeros(num_cols);
            self.candidate = DVector::zeros(num_cols);
            self.lhs_x_solution = DVector::zeros(num_cols);
        }
    }

    /// Refines `solution` in place using `sparse_cholesky`, which must hold a
    /// factorization of `lhs`.
    pub fn refine(
        &mut self,
        lhs: &CompressedRowSparseMatrix,
        rhs: &[f64],
        sparse_cholesky: &mut dyn SparseCholesky,
        solution: &mut [f64],
    ) -> RefinementSummary {
        let num_cols = lhs.num_rows();
        assert_eq!(rhs.len(), num_cols, "rhs has the wrong length");
        assert_eq!(solution.len(), num_cols, "solution has the wrong length");

        if self.max_num_iterations == 0 {
            return RefinementSummary::default();
        }
        self.allocate(num_cols);

        let mut residual_norm =
            compute_residual(lhs, rhs, solution, &mut self.lhs_x_solution, &mut self.residual);
        let mut summary = RefinementSummary {
            num_iterations: 0,
            initial_residual_norm: residual_norm,
            final_residual_norm: residual_norm,
        };

        for _ in 0..self.max_num_iterations {
            if residual_norm == 0.0 || !residual_norm.is_finite() {
                break;
            }
            if let Err(e) = sparse_cholesky.solve(self.residual.as_slice(), self.correction.as_mut_slice()) {
                debug!("refinement stopped, correction solve failed: {e}");
                break;
            }
            self.candidate.copy_from_slice(solution);
            self.candidate += &self.correction;

            // self.residual now belongs to the candidate; it is only reused
            // if the candidate is accepted.
            let candidate_norm = compute_residual(
                lhs,
                rhs,
                self.candidate.as_slice(),
                &mut self.lhs_x_solution,
                &mut self.residual,
            );
            if candidate_norm.is_nan() || candidate_norm >= residual_norm {
                break;
            }
            solution.copy_from_slice(self.candidate.as_slice());
            residual_norm = candidate_norm;
            summary.num_iterations += 1;
        }
        summary.final_residual_norm = residual_norm;
        summary
    }
}

/// residual = rhs - lhs * x, returns ||residual||.
fn compute_residual(
    lhs: &CompressedRowSparseMatrix,
    rhs: &[f64],
    x: &[f64],
    lhs_x: &mut DVector<f64>,
    residual: &mut DVector<f64>,
) -> f64 {
    lhs_x.fill(0.0);
    lhs.right_multiply_and_accumulate(x, lhs_x.as_mut_slice());
    residual
        .iter_mut()
        .zip(rhs.iter().zip(lhs_x.iter()))
        .for_each(|(r, (b, ax))| *r = b - ax);
    residual.norm()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basic::linear_solver::LinearSolverError;
    use crate::basic::sparse::StorageType;
    use crate::basic::testing::{CountingCholesky, laplacian_1d, residual_norm, spd_4x4};

    #[test]
    fn test_zero_iterations_is_a_no_op() {
        let (mut a, _, b) = spd_4x4(StorageType::UpperTriangular);
        let mut solver = CountingCholesky::single_precision();
        let mut x = vec![0.0; 4];
        solver.factor_and_solve(&mut a, &b, &mut x).unwrap();
        let before = x.clone();

        let mut refiner = IterativeRefiner::new(0);
        let summary = refiner.refine(&a, &b, &mut solver, &mut x);
        assert_eq!(summary, RefinementSummary::default());
        assert_eq!(x, before);
        assert_eq!(solver.solve_calls, 1);
    }

    #[test]
    fn test_refinement_reduces_residual() {
        let mut a = laplacian_1d(200, 1e-4, StorageType::UpperTriangular);
        let b: Vec<f64> = (0..200).map(|i| ((i % 7) as f64) - 3.0).collect();
        let mut solver = CountingCholesky::single_precision();
        let mut x = vec![0.0; 200];
        solver.factor_and_solve(&mut a, &b, &mut x).unwrap();
        let unrefined = residual_norm(&a, &x, &b);

        let mut refiner = IterativeRefiner::new(5);
        let summary = refiner.refine(&a, &b, &mut solver, &mut x);
        let refined = residual_norm(&a, &x, &b);

        assert!(summary.num_iterations >= 1);
        assert!(summary.num_iterations <= 5);
        assert!(refined < unrefined, "{refined} >= {unrefined}");
        approx::assert_relative_eq!(summary.final_residual_norm, refined, max_relative = 1e-12);
        approx::assert_relative_eq!(summary.initial_residual_norm, unrefined, max_relative = 1e-12);
    }

    #[test]
    fn test_iterations_are_bounded() {
        let mut a = laplacian_1d(50, 1e-3, StorageType::UpperTriangular);
        let b = vec![1.0; 50];
        let mut solver = CountingCholesky::single_precision();
        let mut x = vec![0.0; 50];
        solver.factor_and_solve(&mut a, &b, &mut x).unwrap();

        let mut refiner = IterativeRefiner::new(2);
        let summary = refiner.refine(&a, &b, &mut solver, &mut x);
        assert!(summary.num_iterations <= 2);
        // one solve for the initial solution plus at most one per pass
        assert!(solver.solve_calls <= 3);
    }

    #[test]
    fn test_exact_solution_is_left_alone() {
        let (mut a, x_true, b) = spd_4x4(StorageType::UpperTriangular);
        let mut solver = CountingCholesky::succeeding();
        solver.factorize(&mut a).unwrap();
        let mut x = x_true.clone();
        let summary = IterativeRefiner::new(3).refine(&a, &b, &mut solver, &mut x);
        assert_eq!(summary.initial_residual_norm, 0.0);
        assert_eq!(summary.num_iterations, 0);
        assert_eq!(x, x_true);
        assert_eq!(solver.solve_calls, 0);
    }

    #[test]
    fn test_failed_correction_keeps_solution() {
        let (mut a, _, b) = spd_4x4(StorageType::UpperTriangular);
        let mut solver = CountingCholesky::failing_solve(LinearSolverError::failure("singular"));
        solver.factorize(&mut a).unwrap();
        let mut x = vec![1.0, 1.0, 1.0, 1.0];
        let summary = IterativeRefiner::new(4).refine(&a, &b, &mut solver, &mut x);
        assert_eq!(x, vec![1.0, 1.0, 1.0, 1.0]);
        assert_eq!(summary.num_iterations, 0);
        assert_eq!(summary.final_residual_norm, summary.initial_residual_norm);
    }
}
