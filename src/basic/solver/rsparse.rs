use nalgebra_sparse::pattern::SparsityPattern;
use rsparse::{
    chol,
    data::{self, Nmrc, Numeric, Symb},
    lsolve, ltsolve, schol,
};
use tracing::{debug, warn};

use super::{OrderingType, SparseCholesky, check_structure};
use crate::basic::linear_solver::{LinearSolverError, LinearSolverResult};
use crate::basic::sparse::cast::{Cast, Scalar, widen_into};
use crate::basic::sparse::{CompressedRowSparseMatrix, StorageType};

/// Sparse LLᵀ factorization using rsparse, in working precision `T`.
///
/// `RSparseCholesky<f64>` is the standard variant, `RSparseCholesky<f32>` the
/// mixed precision one.
pub struct RSparseCholesky<T: Scalar + Numeric<T>> {
    ordering: OrderingType,
    /// Symbolic analysis together with the sparsity pattern it was computed for.
    symbolic: Option<(SparsityPattern, Symb)>,
    numeric: Option<Factor<T>>,
    x: Vec<T>,
    work: Vec<T>,
}

pub type FloatRSparseCholesky = RSparseCholesky<f32>;

enum Factor<T: Numeric<T>> {
    Sparse(Nmrc<T>),
    /// Pivots of a matrix with at most one row; `schol` needs n >= 2.
    Diagonal(Vec<T>),
}

impl<T: Scalar + Numeric<T>> RSparseCholesky<T> {
    pub fn new(ordering: OrderingType) -> Self {
        Self {
            ordering,
            symbolic: None,
            numeric: None,
            x: Vec::new(),
            work: Vec::new(),
        }
    }

    #[inline(always)]
    pub fn ordering(&self) -> OrderingType {
        self.ordering
    }

    /// Drops the symbolic analysis and the numeric factor.
    pub fn reset(&mut self) {
        self.symbolic = None;
        self.numeric = None;
    }

    fn factorize_diagonal(&mut self, lhs: &CompressedRowSparseMatrix) -> LinearSolverResult {
        let n = lhs.num_rows();
        let mut pivots = vec![0.0; n];
        for (r, c, v) in lhs.as_csr().triplet_iter() {
            if r == c {
                pivots[r] += *v;
            }
        }
        let mut factor = Vec::with_capacity(n);
        for pivot in pivots {
            let pivot = T::from_f64(pivot);
            let p = pivot.to_f64();
            if p.is_nan() || p <= 0.0 {
                warn!("rsparse: non-positive pivot {p}");
                return Err(LinearSolverError::failure(format!(
                    "rsparse Cholesky factorization failed, the matrix is not positive definite: pivot {p}"
                )));
            }
            factor.push(pivot);
        }
        self.numeric = Some(Factor::Diagonal(factor));
        self.x.resize(n, T::default());
        Ok(())
    }

    /// `schol` order code: 0 keeps the natural order, 1 is AMD on A + Aᵀ.
    fn order(&self) -> i8 {
        match self.ordering {
            OrderingType::Natural => 0,
            OrderingType::Amd => 1,
        }
    }
}

impl<T: Scalar + Numeric<T>> SparseCholesky for RSparseCholesky<T> {
    fn storage_type(&self) -> StorageType {
        StorageType::LowerTriangular
    }

    fn factorize(&mut self, lhs: &mut CompressedRowSparseMatrix) -> LinearSolverResult {
        self.numeric = None;
        check_structure(lhs, self.storage_type())?;

        let n = lhs.num_rows();
        if n <= 1 {
            return self.factorize_diagonal(lhs);
        }
        // The lower triangle in row-major form is the upper triangle in
        // column-major form, which is what schol and chol read.
        let a = data::Sprs {
            m: n,
            n,
            p: lhs.row_offsets().iter().map(|&v| v as isize).collect(),
            i: lhs.col_indices().to_vec(),
            x: Cast::<T>::cast(lhs.as_csr()),
            nzmax: lhs.num_nonzeros(),
        };

        let (pattern, mut symbolic) = match self.symbolic.take() {
            Some((pattern, symbolic)) if &pattern == lhs.as_csr().pattern() => {
                debug!("rsparse: reusing symbolic analysis");
                (pattern, symbolic)
            }
            _ => {
                debug!(
                    n,
                    nnz = lhs.num_nonzeros(),
                    ordering = %self.ordering,
                    precision = T::NAME,
                    "rsparse: symbolic analysis"
                );
                (lhs.as_csr().pattern().clone(), schol(&a, self.order()))
            }
        };

        let numeric = chol(&a, &mut symbolic);
        self.symbolic = Some((pattern, symbolic));
        match numeric {
            Ok(numeric) => {
                self.numeric = Some(Factor::Sparse(numeric));
                self.x.resize(n, T::default());
                Ok(())
            }
            Err(e) => {
                warn!("rsparse: numeric factorization failed: {e:?}");
                Err(LinearSolverError::failure(format!(
                    "rsparse Cholesky factorization failed, the matrix is not positive definite: {e:?}"
                )))
            }
        }
    }

    fn solve(&mut self, rhs: &[f64], solution: &mut [f64]) -> LinearSolverResult {
        let Some(factor) = self.numeric.as_ref() else {
            panic!("RSparseCholesky::solve called before a successful factorize");
        };
        let n = self.x.len();
        assert_eq!(rhs.len(), n, "rhs has the wrong length");
        assert_eq!(solution.len(), n, "solution has the wrong length");

        let numeric = match factor {
            Factor::Sparse(numeric) => numeric,
            Factor::Diagonal(pivots) => {
                for ((s, &b), pivot) in solution.iter_mut().zip(rhs).zip(pivots) {
                    *s = T::from_f64(T::from_f64(b).to_f64() / pivot.to_f64()).to_f64();
                }
                return Ok(());
            }
        };
        let Some((_, symbolic)) = self.symbolic.as_ref() else {
            panic!("RSparseCholesky::solve called before a successful factorize");
        };

        self.work = Cast::<T>::cast(rhs);
        ipvec(&symbolic.pinv, &self.work, &mut self.x); // x = P*b
        lsolve(&numeric.l, &mut self.x); // x = L\x
        ltsolve(&numeric.l, &mut self.x); // x = L'\x
        pvec(&symbolic.pinv, &self.x, &mut self.work); // b = P'*x
        widen_into(&self.work, solution);
        Ok(())
    }
}

fn ipvec<T: Copy>(p: &Option<Vec<isize>>, b: &[T], x: &mut [T]) {
    match p {
        Some(pvec) => {
            for k in 0..b.len() {
                x[pvec[k] as usize] = b[k];
            }
        }
        None => x.copy_from_slice(b),
    }
}

fn pvec<T: Copy>(p: &Option<Vec<isize>>, b: &[T], x: &mut [T]) {
    match p {
        Some(pvec) => {
            for k in 0..b.len() {
                x[k] = b[pvec[k] as usize];
            }
        }
        None => x.copy_from_slice(b),
    }
}
