use linfa_linalg::cholesky::CholeskyInplace;
use linfa_linalg::qr::LeastSquaresQrInto;
use linfa_linalg::svd::SVDInto;
use linfa_linalg::triangular::{SolveTriangularInplace, UPLO};
use ndarray::{s, Array1, Array2, ArrayView1, Axis};
#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};
use sgcore::object::{
    clone_parameterized, Parameter, ParameterKind, ParameterType, ParameterValue, PrimitiveType,
};
use sgcore::{Float, Parameterized};

use super::LinearSolver;
use crate::error::{LinalgError, Result};
use crate::factorization::{Pivoting, Qr};
use crate::operator::{LinearOperator, OperatorKind};

/// Factorization used by [`DirectLinearSolver`]
///
/// Ordered from the cheapest to the most robust strategy.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectSolverType {
    /// Cholesky `L L^T`, symmetric positive definite operators only
    Llt,
    /// Householder QR without pivoting
    QrNoPerm,
    /// Householder QR with column pivoting
    QrColPerm,
    /// Householder QR with full pivoting
    QrFullPerm,
    /// Singular value decomposition
    Svd,
}

impl Default for DirectSolverType {
    fn default() -> Self {
        DirectSolverType::QrNoPerm
    }
}

impl DirectSolverType {
    const ALL: [DirectSolverType; 5] = [
        DirectSolverType::Llt,
        DirectSolverType::QrNoPerm,
        DirectSolverType::QrColPerm,
        DirectSolverType::QrFullPerm,
        DirectSolverType::Svd,
    ];
}

impl ParameterType for DirectSolverType {
    const KIND: ParameterKind = ParameterKind::scalar(PrimitiveType::Int);

    fn into_value(self) -> ParameterValue {
        let index = DirectSolverType::ALL
            .iter()
            .position(|t| *t == self)
            .unwrap_or(0);
        ParameterValue::Int(index as i64)
    }

    fn from_value(value: ParameterValue) -> Option<Self> {
        match value {
            ParameterValue::Int(v) if v >= 0 => DirectSolverType::ALL.get(v as usize).copied(),
            _ => None,
        }
    }
}

/// Solves dense systems by factorizing the operator matrix
///
/// The solver keeps no state between calls apart from its strategy.
#[derive(Debug, Clone, Default)]
pub struct DirectLinearSolver {
    solver_type: DirectSolverType,
}

impl DirectLinearSolver {
    pub fn new(solver_type: DirectSolverType) -> Self {
        DirectLinearSolver { solver_type }
    }

    pub fn solver_type(&self) -> DirectSolverType {
        self.solver_type
    }
}

impl Parameterized for DirectLinearSolver {
    const NAME: &'static str = "DirectLinearSolver";

    fn parameters() -> Vec<Parameter<Self>> {
        vec![Parameter::new(
            "solver_type",
            "Type of solver",
            |s: &Self| s.solver_type,
            |s: &mut Self, v: DirectSolverType| s.solver_type = v,
        )
        .not_available()]
    }

    fn new_instance(&self) -> sgcore::error::Result<Self> {
        Ok(DirectLinearSolver::default())
    }
}

impl<F: Float> LinearSolver<F> for DirectLinearSolver {
    fn solve(&self, operator: &dyn LinearOperator<F>, b: ArrayView1<F>) -> Result<Array1<F>> {
        if operator.dimension() != b.len() {
            return Err(LinalgError::DimensionMismatch {
                operator: operator.dimension(),
                rhs: b.len(),
            });
        }
        let matrix = match operator.kind() {
            OperatorKind::Dense(matrix) => matrix,
            other => {
                return Err(LinalgError::UnsupportedOperator {
                    solver: "DirectLinearSolver",
                    operator: other.name(),
                })
            }
        };

        log::debug!(
            "direct solve of a {:?} system with {:?}",
            matrix.dim(),
            self.solver_type
        );

        match self.solver_type {
            DirectSolverType::Llt => llt_solve(matrix, b),
            DirectSolverType::QrNoPerm => {
                let rhs = b.to_owned().insert_axis(Axis(1));
                let x = matrix.to_owned().least_squares_into(rhs)?;
                Ok(x.remove_axis(Axis(1)))
            }
            DirectSolverType::QrColPerm => Qr::factorize(matrix.view(), Pivoting::Column).solve(b),
            DirectSolverType::QrFullPerm => Qr::factorize(matrix.view(), Pivoting::Full).solve(b),
            DirectSolverType::Svd => svd_solve(matrix, b),
        }
    }

    fn boxed_clone(&self) -> Result<Box<dyn LinearSolver<F>>> {
        Ok(Box::new(clone_parameterized(self)?))
    }
}

/// Cholesky solve, an indefinite matrix falls back to the SVD pseudo-inverse
fn llt_solve<F: Float>(matrix: &Array2<F>, b: ArrayView1<F>) -> Result<Array1<F>> {
    let (rows, cols) = matrix.dim();
    if rows != cols {
        return Err(LinalgError::NotSquare { rows, cols });
    }

    let lower = match matrix.to_owned().cholesky_into() {
        Ok(lower) => lower,
        Err(linfa_linalg::LinalgError::NotPositiveDefinite) => {
            log::warn!(
                "matrix is not Hermitian positive definite, the solution may be unreliable"
            );
            return svd_solve(matrix, b);
        }
        Err(err) => return Err(err.into()),
    };

    let mut x = b.to_owned().insert_axis(Axis(1));
    lower.solve_triangular_inplace(&mut x, UPLO::Lower)?;
    lower.t().solve_triangular_inplace(&mut x, UPLO::Upper)?;

    Ok(x.remove_axis(Axis(1)))
}

/// Pseudo-inverse solution, singular values below `eps * max(m, n) * s_max` are dropped
fn svd_solve<F: Float>(matrix: &Array2<F>, b: ArrayView1<F>) -> Result<Array1<F>> {
    let wide = matrix.nrows() < matrix.ncols();
    let tall = if wide {
        matrix.t().to_owned()
    } else {
        matrix.to_owned()
    };
    let (u, sigma, vt) = tall.svd_into(true, true)?;
    let (u, vt) = u.zip(vt).ok_or(LinalgError::MissingSingularVectors)?;

    // `A = left diag(sigma) right^T`, the factors of a wide matrix come from its transpose
    let k = sigma.len();
    let (left, right) = if wide {
        (vt.t(), u.view())
    } else {
        (u.view(), vt.t())
    };
    let (left, right) = (left.slice(s![.., ..k]), right.slice(s![.., ..k]));

    let largest = sigma.iter().fold(F::zero(), |acc, v| acc.max(*v));
    let size = matrix.nrows().max(matrix.ncols());
    let cutoff = F::epsilon() * F::cast(size) * largest;

    let mut coefficients = left.t().dot(&b);
    for (c, value) in coefficients.iter_mut().zip(sigma.iter()) {
        *c = if *value > cutoff { *c / *value } else { F::zero() };
    }

    Ok(right.dot(&coefficients))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operator::{DenseMatrixOperator, SparseMatrixOperator};
    use approx::assert_abs_diff_eq;
    use ndarray::array;
    use sgcore::SgObject;
    use sprs::TriMat;

    #[test]
    fn default_strategy_is_unpivoted_qr() {
        assert_eq!(DirectLinearSolver::default().solver_type(), DirectSolverType::QrNoPerm);
    }

    #[test]
    fn every_strategy_solves_spd_system() {
        let a: Array2<f64> = array![[4.0, 2.0, 0.4], [2.0, 5.0, 1.0], [0.4, 1.0, 3.0]];
        let b: Array1<f64> = array![1.0, -1.0, 2.0];
        let op = DenseMatrixOperator::new(a.clone()).unwrap();

        for solver_type in &DirectSolverType::ALL {
            let x = DirectLinearSolver::new(*solver_type)
                .solve(&op, b.view())
                .unwrap();
            assert_abs_diff_eq!(a.dot(&x), b, epsilon = 1e-10);
        }
    }

    #[test]
    fn indefinite_matrix_with_llt_is_best_effort() {
        let op = DenseMatrixOperator::new(array![[1.0f64, 2.0], [2.0, 1.0]]).unwrap();
        let solver = DirectLinearSolver::new(DirectSolverType::Llt);

        // the SVD fallback still solves the non-singular system
        let x: Array1<f64> = solver.solve(&op, array![1.0, 1.0].view()).unwrap();
        assert_abs_diff_eq!(x, array![1.0 / 3.0, 1.0 / 3.0], epsilon = 1e-10);
    }

    #[test]
    fn singular_direction_is_dropped_by_svd() {
        let op = DenseMatrixOperator::new(array![[1.0f64, 1.0], [1.0, 1.0]]).unwrap();
        let solver = DirectLinearSolver::new(DirectSolverType::Svd);

        let x: Array1<f64> = solver.solve(&op, array![2.0, 2.0].view()).unwrap();
        assert_abs_diff_eq!(x, array![1.0, 1.0], epsilon = 1e-10);
    }

    #[test]
    fn rectangular_least_squares() {
        let a: Array2<f64> = array![[1.0, 0.0], [0.0, 1.0], [1.0, 1.0]];
        let b: Array1<f64> = array![1.0, 1.0, 3.0];
        let op = DenseMatrixOperator::new(a.clone()).unwrap();

        for solver_type in &[
            DirectSolverType::QrNoPerm,
            DirectSolverType::QrColPerm,
            DirectSolverType::Svd,
        ] {
            let x = DirectLinearSolver::new(*solver_type)
                .solve(&op, b.view())
                .unwrap();
            assert_abs_diff_eq!(x, array![4.0 / 3.0, 4.0 / 3.0], epsilon = 1e-10);
        }
        assert!(matches!(
            DirectLinearSolver::new(DirectSolverType::Llt).solve(&op, b.view()),
            Err(LinalgError::NotSquare { rows: 3, cols: 2 })
        ));
    }

    #[test]
    fn preconditions_are_errors() {
        let op = DenseMatrixOperator::new(array![[2.0f64, 0.0], [0.0, 2.0]]).unwrap();
        let solver = DirectLinearSolver::default();
        assert!(matches!(
            solver.solve(&op, array![1.0, 2.0, 3.0].view()),
            Err(LinalgError::DimensionMismatch { operator: 2, rhs: 3 })
        ));

        let mut tri = TriMat::<f64>::new((2, 2));
        tri.add_triplet(0, 0, 1.0);
        tri.add_triplet(1, 1, 1.0);
        let sparse = SparseMatrixOperator::new(tri.to_csr()).unwrap();
        assert!(matches!(
            solver.solve(&sparse, array![1.0, 2.0].view()),
            Err(LinalgError::UnsupportedOperator { operator: "sparse", .. })
        ));
    }

    #[test]
    fn solver_type_is_registered() {
        let mut solver = DirectLinearSolver::default();
        solver
            .set_parameter("solver_type", ParameterValue::Int(4))
            .unwrap();
        assert_eq!(solver.solver_type(), DirectSolverType::Svd);
        assert!(solver
            .set_parameter("solver_type", ParameterValue::Int(5))
            .is_err());

        let cloned = LinearSolver::<f64>::boxed_clone(&solver).unwrap();
        assert_eq!(cloned.get_parameter("solver_type").unwrap(), ParameterValue::Int(4));
    }
}
