use std::sync::Arc;

use ndarray::{Array1, Array2, ArrayView1};
use sgcore::object::{clone_parameterized, Parameter, ParameterSnapshot};
use sgcore::{Float, Parameterized, SgObject};

use super::rational::RationalApproximation;
use crate::error::{LinalgError, Result};
use crate::factorization::SymmetricEigen;
use crate::linsolver::{CgmShiftedFamilySolver, LinearSolver};
use crate::operator::{
    check_square, DenseMatrixOperator, LinearOperator, OperatorKind, ShiftedOperator,
};

/// Quadratic form `s^T f(A) s` of a matrix function
pub trait OperatorFunction<F: Float>: SgObject {
    fn dimension(&self) -> usize;

    /// Work shared by every `compute`, e.g. eigenvalue bounds or a factorization
    fn precompute(&mut self) -> Result<()>;

    fn compute(&self, sample: ArrayView1<F>) -> Result<F>;

    fn boxed_clone(&self) -> Result<Box<dyn OperatorFunction<F>>>;
}

fn not_precomputed(name: &str) -> LinalgError {
    sgcore::Error::Parameters(format!("{} is used before precompute", name)).into()
}

fn as_base(err: LinalgError) -> sgcore::Error {
    match err {
        LinalgError::BaseCrate(err) => err,
        other => sgcore::Error::Parameters(other.to_string()),
    }
}

/// Exact `log(A)` of a dense symmetric positive definite operator
///
/// The logarithm is formed once from the eigen-decomposition, every `compute` is a matrix-vector
/// product.
pub struct DenseMatrixExactLog<F: Float> {
    operator: Arc<dyn LinearOperator<F>>,
    log_matrix: Option<Array2<F>>,
}

impl<F: Float> DenseMatrixExactLog<F> {
    pub fn new(operator: Arc<dyn LinearOperator<F>>) -> Self {
        DenseMatrixExactLog {
            operator,
            log_matrix: None,
        }
    }

    pub fn log_matrix(&self) -> Option<&Array2<F>> {
        self.log_matrix.as_ref()
    }
}

impl<F: Float> Parameterized for DenseMatrixExactLog<F> {
    const NAME: &'static str = "DenseMatrixExactLog";

    fn parameters() -> Vec<Parameter<Self>> {
        vec![Parameter::new(
            "log_matrix",
            "Logarithm of the operator matrix, empty before precompute",
            |s: &Self| s.log_matrix.clone().unwrap_or_else(|| Array2::zeros((0, 0))),
            |s: &mut Self, v: Array2<F>| {
                s.log_matrix = if v.is_empty() { None } else { Some(v) };
            },
        )
        .not_available()]
    }

    fn new_instance(&self) -> sgcore::error::Result<Self> {
        Ok(DenseMatrixExactLog::new(self.operator.clone()))
    }
}

impl<F: Float> OperatorFunction<F> for DenseMatrixExactLog<F> {
    fn dimension(&self) -> usize {
        self.operator.dimension()
    }

    fn precompute(&mut self) -> Result<()> {
        let matrix = match self.operator.kind() {
            OperatorKind::Dense(matrix) => matrix,
            other => {
                return Err(LinalgError::UnsupportedOperator {
                    solver: "DenseMatrixExactLog",
                    operator: other.name(),
                })
            }
        };

        let eig = SymmetricEigen::factorize(matrix.view())?;
        let values = eig.eigenvalues();
        let (min, max) = (values[0], values[values.len() - 1]);
        if min <= F::zero() {
            return Err(LinalgError::InvalidEigenvalues {
                min: min.as_f64(),
                max: max.as_f64(),
            });
        }

        self.log_matrix = Some(eig.map_eigenvalues(|w| w.ln()));
        Ok(())
    }

    fn compute(&self, sample: ArrayView1<F>) -> Result<F> {
        check_square(self.operator.as_ref(), sample.len())?;
        let log_matrix = self
            .log_matrix
            .as_ref()
            .ok_or_else(|| not_precomputed(Self::NAME))?;

        Ok(sample.dot(&log_matrix.dot(&sample)))
    }

    fn boxed_clone(&self) -> Result<Box<dyn OperatorFunction<F>>> {
        Ok(Box::new(clone_parameterized(self)?))
    }
}

/// `log(A)` by rational approximation, all shifted systems solved together with CG-M
pub struct LogRationalApproximationCgm<F: Float> {
    operator: Arc<dyn LinearOperator<F>>,
    approximation: RationalApproximation<F>,
    solver: CgmShiftedFamilySolver,
}

impl<F: Float> LogRationalApproximationCgm<F> {
    pub fn new(
        operator: Arc<dyn LinearOperator<F>>,
        approximation: RationalApproximation<F>,
        solver: CgmShiftedFamilySolver,
    ) -> Self {
        LogRationalApproximationCgm {
            operator,
            approximation,
            solver,
        }
    }

    pub fn approximation(&self) -> &RationalApproximation<F> {
        &self.approximation
    }
}

impl<F: Float> Parameterized for LogRationalApproximationCgm<F> {
    const NAME: &'static str = "LogRationalApproximationCGM";

    fn parameters() -> Vec<Parameter<Self>> {
        let mut params = RationalApproximation::parameters_of(
            |s: &Self| &s.approximation,
            |s: &mut Self| &mut s.approximation,
        );
        params.push(
            Parameter::with_validation(
                "linear_solver",
                "Shifted family solver",
                |s: &Self| s.solver.save_parameters(),
                |s: &mut Self, v: ParameterSnapshot| s.solver.load_parameters(&v),
            )
            .not_available(),
        );

        params
    }

    fn new_instance(&self) -> sgcore::error::Result<Self> {
        Ok(LogRationalApproximationCgm::new(
            self.operator.clone(),
            self.approximation.boxed_clone().map_err(as_base)?,
            CgmShiftedFamilySolver::default(),
        ))
    }
}

impl<F: Float> OperatorFunction<F> for LogRationalApproximationCgm<F> {
    fn dimension(&self) -> usize {
        self.operator.dimension()
    }

    fn precompute(&mut self) -> Result<()> {
        self.approximation.precompute()
    }

    fn compute(&self, sample: ArrayView1<F>) -> Result<F> {
        if self.approximation.num_shifts() == 0 {
            return Err(not_precomputed(Self::NAME));
        }

        let combined = self.solver.solve_shifted_weighted(
            self.operator.as_ref(),
            sample,
            self.approximation.shifts().view(),
            self.approximation.weights().view(),
        )?;

        Ok(self.approximation.constant() * sample.dot(&sample) + sample.dot(&combined))
    }

    fn boxed_clone(&self) -> Result<Box<dyn OperatorFunction<F>>> {
        Ok(Box::new(clone_parameterized(self)?))
    }
}

/// `log(A)` by rational approximation, one linear solve per shift
///
/// Dense operators are shifted explicitly so that any [`LinearSolver`] applies, other operators
/// are wrapped into an implicit [`ShiftedOperator`] and need an iterative solver.
pub struct LogRationalApproximationIndividual<F: Float> {
    operator: Arc<dyn LinearOperator<F>>,
    approximation: RationalApproximation<F>,
    solver: Box<dyn LinearSolver<F>>,
}

impl<F: Float> LogRationalApproximationIndividual<F> {
    pub fn new(
        operator: Arc<dyn LinearOperator<F>>,
        approximation: RationalApproximation<F>,
        solver: Box<dyn LinearSolver<F>>,
    ) -> Self {
        LogRationalApproximationIndividual {
            operator,
            approximation,
            solver,
        }
    }

    pub fn approximation(&self) -> &RationalApproximation<F> {
        &self.approximation
    }

    fn solve_shifted(&self, shift: F, sample: ArrayView1<F>) -> Result<Array1<F>> {
        match self.operator.kind() {
            OperatorKind::Dense(matrix) => {
                let shifted = DenseMatrixOperator::new(matrix.clone())?.shifted(shift)?;
                self.solver.solve(&shifted, sample)
            }
            _ => self
                .solver
                .solve(&ShiftedOperator::new(self.operator.as_ref(), shift), sample),
        }
    }
}

impl<F: Float> Parameterized for LogRationalApproximationIndividual<F> {
    const NAME: &'static str = "LogRationalApproximationIndividual";

    fn parameters() -> Vec<Parameter<Self>> {
        let mut params = RationalApproximation::parameters_of(
            |s: &Self| &s.approximation,
            |s: &mut Self| &mut s.approximation,
        );
        params.push(
            Parameter::with_validation(
                "linear_solver",
                "Solver of the individual shifted systems",
                |s: &Self| s.solver.save_parameters(),
                |s: &mut Self, v: ParameterSnapshot| s.solver.load_parameters(&v),
            )
            .not_available(),
        );

        params
    }

    fn new_instance(&self) -> sgcore::error::Result<Self> {
        Ok(LogRationalApproximationIndividual::new(
            self.operator.clone(),
            self.approximation.boxed_clone().map_err(as_base)?,
            self.solver.boxed_clone().map_err(as_base)?,
        ))
    }
}

impl<F: Float> OperatorFunction<F> for LogRationalApproximationIndividual<F> {
    fn dimension(&self) -> usize {
        self.operator.dimension()
    }

    fn precompute(&mut self) -> Result<()> {
        self.approximation.precompute()
    }

    fn compute(&self, sample: ArrayView1<F>) -> Result<F> {
        check_square(self.operator.as_ref(), sample.len())?;
        if self.approximation.num_shifts() == 0 {
            return Err(not_precomputed(Self::NAME));
        }

        let mut combined = Array1::zeros(sample.len());
        for (shift, weight) in self
            .approximation
            .shifts()
            .iter()
            .zip(self.approximation.weights().iter())
        {
            let x = self.solve_shifted(*shift, sample)?;
            combined.scaled_add(*weight, &x);
        }

        Ok(self.approximation.constant() * sample.dot(&sample) + sample.dot(&combined))
    }

    fn boxed_clone(&self) -> Result<Box<dyn OperatorFunction<F>>> {
        Ok(Box::new(clone_parameterized(self)?))
    }
}
