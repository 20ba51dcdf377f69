//! Linear operators
//!
//! Solvers and estimators only see an operator through [`LinearOperator`]: its dimension, its
//! application to a vector and, for the solvers that need the entries, its [`OperatorKind`].
use std::fmt;

use ndarray::{Array1, Array2, ArrayView1};
use sgcore::Float;
use sprs::CsMat;

use crate::error::{LinalgError, Result};

/// Concrete representation behind an operator
pub enum OperatorKind<'a, F> {
    Dense(&'a Array2<F>),
    Sparse(&'a CsMat<F>),
    /// Only the application is available
    Other,
}

impl<'a, F> OperatorKind<'a, F> {
    pub fn name(&self) -> &'static str {
        match self {
            OperatorKind::Dense(_) => "dense",
            OperatorKind::Sparse(_) => "sparse",
            OperatorKind::Other => "implicit",
        }
    }
}

pub trait LinearOperator<F: Float>: Send + Sync {
    /// Number of rows, the length of a right-hand side
    fn dimension(&self) -> usize;

    /// Number of columns
    fn ncols(&self) -> usize {
        self.dimension()
    }

    fn apply(&self, x: ArrayView1<F>) -> Array1<F>;

    fn kind(&self) -> OperatorKind<'_, F>;
}

/// Operator backed by a dense matrix
#[derive(Clone)]
pub struct DenseMatrixOperator<F> {
    matrix: Array2<F>,
}

impl<F: Float> DenseMatrixOperator<F> {
    pub fn new(matrix: Array2<F>) -> Result<Self> {
        if matrix.nrows() == 0 {
            return Err(LinalgError::EmptyOperator);
        }

        Ok(DenseMatrixOperator { matrix })
    }

    /// The operator `self + shift * I`
    pub fn shifted(&self, shift: F) -> Result<Self> {
        let (rows, cols) = self.matrix.dim();
        if rows != cols {
            return Err(LinalgError::NotSquare { rows, cols });
        }

        let mut matrix = self.matrix.clone();
        matrix.diag_mut().mapv_inplace(|d| d + shift);
        Ok(DenseMatrixOperator { matrix })
    }

    pub fn matrix(&self) -> &Array2<F> {
        &self.matrix
    }
}

impl<F: Float> LinearOperator<F> for DenseMatrixOperator<F> {
    fn dimension(&self) -> usize {
        self.matrix.nrows()
    }

    fn ncols(&self) -> usize {
        self.matrix.ncols()
    }

    fn apply(&self, x: ArrayView1<F>) -> Array1<F> {
        self.matrix.dot(&x)
    }

    fn kind(&self) -> OperatorKind<'_, F> {
        OperatorKind::Dense(&self.matrix)
    }
}

impl<F: Float> fmt::Debug for DenseMatrixOperator<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DenseMatrixOperator({:?})", self.matrix.dim())
    }
}

/// Square operator backed by a compressed sparse matrix (CSR or CSC)
#[derive(Clone)]
pub struct SparseMatrixOperator<F> {
    matrix: CsMat<F>,
}

impl<F: Float> SparseMatrixOperator<F> {
    pub fn new(matrix: CsMat<F>) -> Result<Self> {
        let (rows, cols) = matrix.shape();
        if rows == 0 {
            return Err(LinalgError::EmptyOperator);
        }
        if rows != cols {
            return Err(LinalgError::NotSquare { rows, cols });
        }

        Ok(SparseMatrixOperator { matrix })
    }

    pub fn matrix(&self) -> &CsMat<F> {
        &self.matrix
    }
}

impl<F: Float> LinearOperator<F> for SparseMatrixOperator<F> {
    fn dimension(&self) -> usize {
        self.matrix.rows()
    }

    fn apply(&self, x: ArrayView1<F>) -> Array1<F> {
        let mut y = Array1::zeros(self.matrix.rows());
        if self.matrix.is_csr() {
            for (row, vec) in self.matrix.outer_iterator().enumerate() {
                y[row] = vec.iter().map(|(col, val)| *val * x[col]).sum();
            }
        } else {
            for (col, vec) in self.matrix.outer_iterator().enumerate() {
                for (row, val) in vec.iter() {
                    y[row] += *val * x[col];
                }
            }
        }

        y
    }

    fn kind(&self) -> OperatorKind<'_, F> {
        OperatorKind::Sparse(&self.matrix)
    }
}

impl<F: Float> fmt::Debug for SparseMatrixOperator<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SparseMatrixOperator({:?}, nnz={})",
            self.matrix.shape(),
            self.matrix.nnz()
        )
    }
}

/// The implicit operator `A + shift * I`
pub struct ShiftedOperator<'a, F: Float> {
    operator: &'a dyn LinearOperator<F>,
    shift: F,
}

impl<'a, F: Float> ShiftedOperator<'a, F> {
    pub fn new(operator: &'a dyn LinearOperator<F>, shift: F) -> Self {
        ShiftedOperator { operator, shift }
    }

    pub fn shift(&self) -> F {
        self.shift
    }
}

impl<'a, F: Float> LinearOperator<F> for ShiftedOperator<'a, F> {
    fn dimension(&self) -> usize {
        self.operator.dimension()
    }

    fn apply(&self, x: ArrayView1<F>) -> Array1<F> {
        let mut y = self.operator.apply(x.view());
        y.scaled_add(self.shift, &x);
        y
    }

    fn kind(&self) -> OperatorKind<'_, F> {
        OperatorKind::Other
    }
}

/// Check that `operator` is square and accepts vectors of length `len`
pub(crate) fn check_square<F: Float>(operator: &dyn LinearOperator<F>, len: usize) -> Result<()> {
    let (rows, cols) = (operator.dimension(), operator.ncols());
    if rows == 0 {
        return Err(LinalgError::EmptyOperator);
    }
    if rows != cols {
        return Err(LinalgError::NotSquare { rows, cols });
    }
    if rows != len {
        return Err(LinalgError::DimensionMismatch {
            operator: rows,
            rhs: len,
        });
    }

    Ok(())
}
