//! Fixtures shared by the unit tests.

use nalgebra::{Cholesky, DVector, Dyn};

use super::linear_solver::{LinearSolverError, LinearSolverResult};
use super::solver::SparseCholesky;
use super::sparse::{CompressedRowSparseMatrix, StorageType};

/// A 4x4 SPD matrix together with an exact solution `x` and `b = A * x`.
/// All entries are small integers so products are exact in `f64`.
pub(crate) fn spd_4x4(storage_type: StorageType) -> (CompressedRowSparseMatrix, Vec<f64>, Vec<f64>) {
    let a = CompressedRowSparseMatrix::from_triplets(
        4,
        &[
            (0, 0, 4.0),
            (0, 1, 1.0),
            (0, 3, 1.0),
            (1, 1, 5.0),
            (1, 2, 2.0),
            (2, 2, 6.0),
            (2, 3, 1.0),
            (3, 3, 7.0),
        ],
        storage_type,
    );
    let x = vec![1.0, 2.0, 3.0, 4.0];
    let b = vec![10.0, 17.0, 26.0, 32.0];
    (a, x, b)
}

/// Tridiagonal `[-1, 2 + shift, -1]`; the condition number grows as `n^2`
/// when `shift` is small.
pub(crate) fn laplacian_1d(n: usize, shift: f64, storage_type: StorageType) -> CompressedRowSparseMatrix {
    let mut triplets = Vec::with_capacity(2 * n);
    for i in 0..n {
        triplets.push((i, i, 2.0 + shift));
        if i + 1 < n {
            triplets.push((i, i + 1, -1.0));
        }
    }
    CompressedRowSparseMatrix::from_triplets(n, &triplets, storage_type)
}

/// A matrix with a negative pivot.
pub(crate) fn indefinite_3x3(storage_type: StorageType) -> CompressedRowSparseMatrix {
    CompressedRowSparseMatrix::from_triplets(
        3,
        &[(0, 0, 1.0), (0, 1, 2.0), (1, 1, 1.0), (2, 2, 3.0)],
        storage_type,
    )
}

/// ||b - A x||
pub(crate) fn residual_norm(a: &CompressedRowSparseMatrix, x: &[f64], b: &[f64]) -> f64 {
    let mut ax = vec![0.0; b.len()];
    a.right_multiply_and_accumulate(x, &mut ax);
    (DVector::from_column_slice(b) - DVector::from_vec(ax)).norm()
}

pub(crate) fn max_abs_diff(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).abs()).fold(0.0, f64::max)
}

enum DenseFactor {
    Exact(Cholesky<f64, Dyn>),
    Single(Cholesky<f32, Dyn>),
}

/// A dense stand-in backend that counts calls and can be told to fail.
pub(crate) struct CountingCholesky {
    pub factorize_calls: usize,
    pub solve_calls: usize,
    factorize_error: Option<LinearSolverError>,
    solve_error: Option<LinearSolverError>,
    single_precision: bool,
    factor: Option<DenseFactor>,
}

impl CountingCholesky {
    pub fn succeeding() -> Self {
        Self {
            factorize_calls: 0,
            solve_calls: 0,
            factorize_error: None,
            solve_error: None,
            single_precision: false,
            factor: None,
        }
    }

    /// Factorizes in `f32`, so solutions carry a visible error.
    pub fn single_precision() -> Self {
        Self {
            single_precision: true,
            ..Self::succeeding()
        }
    }

    pub fn failing(error: LinearSolverError) -> Self {
        Self {
            factorize_error: Some(error),
            ..Self::succeeding()
        }
    }

    pub fn failing_solve(error: LinearSolverError) -> Self {
        Self {
            solve_error: Some(error),
            ..Self::succeeding()
        }
    }
}

impl SparseCholesky for CountingCholesky {
    fn storage_type(&self) -> StorageType {
        StorageType::UpperTriangular
    }

    fn factorize(&mut self, lhs: &mut CompressedRowSparseMatrix) -> LinearSolverResult {
        self.factorize_calls += 1;
        self.factor = None;
        if let Some(e) = &self.factorize_error {
            return Err(e.clone());
        }
        let dense = lhs.to_dense();
        let factor = if self.single_precision {
            Cholesky::new(dense.map(|v| v as f32)).map(DenseFactor::Single)
        } else {
            Cholesky::new(dense).map(DenseFactor::Exact)
        };
        match factor {
            Some(f) => {
                self.factor = Some(f);
                Ok(())
            }
            None => Err(LinearSolverError::failure("matrix is not positive definite")),
        }
    }

    fn solve(&mut self, rhs: &[f64], solution: &mut [f64]) -> LinearSolverResult {
        self.solve_calls += 1;
        let Some(factor) = &self.factor else {
            panic!("solve called before a successful factorize");
        };
        if let Some(e) = &self.solve_error {
            return Err(e.clone());
        }
        match factor {
            DenseFactor::Exact(f) => {
                let x = f.solve(&DVector::from_column_slice(rhs));
                solution.copy_from_slice(x.as_slice());
            }
            DenseFactor::Single(f) => {
                let b = DVector::from_iterator(rhs.len(), rhs.iter().map(|&v| v as f32));
                let x = f.solve(&b);
                solution
                    .iter_mut()
                    .zip(x.iter())
                    .for_each(|(s, &v)| *s = v as f64);
            }
        }
        Ok(())
    }
}
