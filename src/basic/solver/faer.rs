use faer::{
    Conj, MatMut, Par, Side,
    dyn_stack::{MemBuffer, MemStack},
    sparse::{
        SparseColMatRef, SymbolicSparseColMatRef,
        linalg::cholesky::{LltRef, SymbolicCholesky, SymmetricOrdering, factorize_symbolic_cholesky},
    },
    traits::ComplexField,
};
use nalgebra_sparse::pattern::SparsityPattern;
use tracing::{debug, warn};

use super::{OrderingType, SparseCholesky, check_structure};
use crate::basic::linear_solver::{LinearSolverError, LinearSolverResult};
use crate::basic::sparse::cast::{Cast, Scalar, widen_into};
use crate::basic::sparse::{CompressedRowSparseMatrix, StorageType};

/// Sparse LLᵀ factorization using faer, in working precision `T`.
///
/// `FaerCholesky<f64>` is the standard variant, `FaerCholesky<f32>` the mixed
/// precision one.
pub struct FaerCholesky<T: Scalar + ComplexField> {
    ordering: OrderingType,
    /// Symbolic analysis together with the sparsity pattern it was computed for.
    analysis: Option<(SparsityPattern, SymbolicCholesky<usize>)>,
    values: Vec<T>,
    l_values: Vec<T>,
    work: Vec<T>,
    num_rows: usize,
    factorized: bool,
}

pub type FloatFaerCholesky = FaerCholesky<f32>;

impl<T: Scalar + ComplexField> FaerCholesky<T> {
    pub fn new(ordering: OrderingType) -> Self {
        Self {
            ordering,
            analysis: None,
            values: Vec::new(),
            l_values: Vec::new(),
            work: Vec::new(),
            num_rows: 0,
            factorized: false,
        }
    }

    #[inline(always)]
    pub fn ordering(&self) -> OrderingType {
        self.ordering
    }

    /// Drops the symbolic analysis and the numeric factor.
    pub fn reset(&mut self) {
        self.analysis = None;
        self.factorized = false;
    }

    fn symmetric_ordering(&self) -> SymmetricOrdering<'static, usize> {
        match self.ordering {
            OrderingType::Natural => SymmetricOrdering::Identity,
            OrderingType::Amd => SymmetricOrdering::Amd,
        }
    }
}

impl<T: Scalar + ComplexField> SparseCholesky for FaerCholesky<T> {
    fn storage_type(&self) -> StorageType {
        StorageType::LowerTriangular
    }

    fn factorize(&mut self, lhs: &mut CompressedRowSparseMatrix) -> LinearSolverResult {
        self.factorized = false;
        check_structure(lhs, self.storage_type())?;

        let n = lhs.num_rows();
        // The lower triangle in row-major form is the upper triangle in
        // column-major form; CSR row offsets are sorted and in bounds.
        let structure = unsafe {
            SymbolicSparseColMatRef::new_unchecked(n, n, lhs.row_offsets(), None, lhs.col_indices())
        };

        let analysis = match self.analysis.take() {
            Some((pattern, symbolic)) if &pattern == lhs.as_csr().pattern() => {
                debug!("faer: reusing symbolic analysis");
                (pattern, symbolic)
            }
            _ => {
                let symbolic = factorize_symbolic_cholesky(
                    structure,
                    Side::Upper,
                    self.symmetric_ordering(),
                    Default::default(),
                )
                .map_err(|e| LinearSolverError::fatal(format!("faer symbolic analysis failed: {e:?}")))?;
                debug!(
                    n,
                    nnz = lhs.num_nonzeros(),
                    ordering = %self.ordering,
                    precision = T::NAME,
                    "faer: symbolic analysis"
                );
                (lhs.as_csr().pattern().clone(), symbolic)
            }
        };
        let (_, symbolic) = self.analysis.insert(analysis);

        self.values = Cast::<T>::cast(lhs.as_csr());
        self.l_values.clear();
        self.l_values.resize(symbolic.len_val(), T::default());

        let par = Par::Seq;
        let req = symbolic.factorize_numeric_llt_scratch::<T>(par, Default::default());
        let mut mem = MemBuffer::try_new(req)
            .map_err(|_| LinearSolverError::fatal("faer: out of memory during numeric factorization"))?;

        let a = SparseColMatRef::new(structure, &self.values);
        if let Err(e) = symbolic.factorize_numeric_llt(
            &mut self.l_values,
            a,
            Side::Upper,
            Default::default(),
            par,
            MemStack::new(&mut mem),
            Default::default(),
        ) {
            warn!("faer: numeric factorization failed: {e:?}");
            return Err(LinearSolverError::failure(format!(
                "faer numeric factorization failed, the matrix is not positive definite: {e:?}"
            )));
        }
        self.num_rows = n;
        self.factorized = true;
        Ok(())
    }

    fn solve(&mut self, rhs: &[f64], solution: &mut [f64]) -> LinearSolverResult {
        let Some((_, symbolic)) = self.analysis.as_ref().filter(|_| self.factorized) else {
            panic!("FaerCholesky::solve called before a successful factorize");
        };
        let n = self.num_rows;
        assert_eq!(rhs.len(), n, "rhs has the wrong length");
        assert_eq!(solution.len(), n, "solution has the wrong length");

        self.work = Cast::<T>::cast(rhs);

        let par = Par::Seq;
        let req = symbolic.solve_in_place_scratch::<T>(1, par);
        let mut mem = MemBuffer::try_new(req)
            .map_err(|_| LinearSolverError::fatal("faer: out of memory during solve"))?;

        let llt = LltRef::new(symbolic, &self.l_values);
        let mat_ref = MatMut::from_column_major_slice_mut(&mut self.work, n, 1);
        llt.solve_in_place_with_conj(Conj::No, mat_ref, par, MemStack::new(&mut mem));

        widen_into(&self.work, solution);
        Ok(())
    }
}
