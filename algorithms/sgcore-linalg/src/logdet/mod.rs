//! Stochastic log-determinant estimation
//!
//! `log det(A) = tr(log(A))` for symmetric positive definite `A`. The trace is estimated from
//! quadratic forms `s^T log(A) s` over sample vectors `s` of a [`TraceSampler`], the quadratic
//! forms are evaluated by an [`OperatorFunction`], usually a rational approximation of the
//! logarithm whose shifted systems are solved iteratively. Only matrix-vector products with `A`
//! are needed, which makes the estimate feasible for large sparse operators.
use std::sync::Arc;

use ndarray::{Array1, Array2};
use rayon::prelude::*;
#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};
use sgcore::object::{Parameter, ParameterSnapshot};
use sgcore::{Float, Parameterized, SgObject};
use sprs::CsMat;

use crate::eigen::LanczosEigenSolver;
use crate::error::{LinalgError, Result};
use crate::linsolver::CgmShiftedFamilySolver;
use crate::operator::{LinearOperator, SparseMatrixOperator};

pub mod coloring;
mod operator_function;
mod rational;
mod trace_sampler;

pub use coloring::{ColoringVariant, OrderingVariant};
pub use operator_function::{
    DenseMatrixExactLog, LogRationalApproximationCgm, LogRationalApproximationIndividual,
    OperatorFunction,
};
pub use rational::{gauss_legendre, num_shifts_for, RationalApproximation};
pub use trace_sampler::{NormalSampler, ProbingSampler, TraceSampler};

/// Trace sampler of the default pipeline
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplerChoice {
    /// Probing vectors from a distance-two coloring of the sparsity pattern
    Probing,
    /// Gaussian sample vectors
    Normal,
}

/// Configuration of [`LogDetEstimator::from_sparse`]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, PartialEq)]
pub struct DefaultPipeline {
    pub sampler: SamplerChoice,
    /// Accuracy of the rational approximation
    pub accuracy: f64,
    pub seed: u64,
}

impl Default for DefaultPipeline {
    fn default() -> Self {
        DefaultPipeline {
            sampler: SamplerChoice::Probing,
            accuracy: 1e-5,
            seed: 0,
        }
    }
}

/// Monte-Carlo estimator of `log det(A)`
///
/// The estimator owns its sampler and operator function. Every estimate is the sum of the
/// operator function over all sample vectors of one draw. Draws are independent and evaluated in
/// parallel.
///
/// ```
/// use sgcore_linalg::logdet::LogDetEstimator;
/// use sprs::TriMat;
///
/// let mut tri = TriMat::new((3, 3));
/// tri.add_triplet(0, 0, 1.0);
/// tri.add_triplet(1, 1, 2.0);
/// tri.add_triplet(2, 2, 4.0);
///
/// let mut estimator = LogDetEstimator::from_sparse(tri.to_csr(), Default::default()).unwrap();
/// let estimates = estimator.sample(4).unwrap();
///
/// assert!((estimates[3] - 8f64.ln()).abs() < 1e-3);
/// ```
pub struct LogDetEstimator<F: Float> {
    sampler: Box<dyn TraceSampler<F>>,
    function: Box<dyn OperatorFunction<F>>,
}

impl<F: Float> LogDetEstimator<F> {
    pub fn new(sampler: Box<dyn TraceSampler<F>>, function: Box<dyn OperatorFunction<F>>) -> Self {
        LogDetEstimator { sampler, function }
    }

    /// Lanczos eigenvalue bounds, CG-M rational approximation and the chosen sampler
    pub fn from_sparse(matrix: CsMat<F>, pipeline: DefaultPipeline) -> Result<Self> {
        let operator: Arc<dyn LinearOperator<F>> =
            Arc::new(SparseMatrixOperator::new(matrix.clone())?);

        let eigen_solver = LanczosEigenSolver::new(operator.clone()).seed(pipeline.seed);
        let approximation = RationalApproximation::new(Box::new(eigen_solver), pipeline.accuracy)?;
        let function = LogRationalApproximationCgm::new(
            operator.clone(),
            approximation,
            CgmShiftedFamilySolver::default(),
        );

        let sampler: Box<dyn TraceSampler<F>> = match pipeline.sampler {
            SamplerChoice::Probing => Box::new(
                ProbingSampler::new(Arc::new(matrix))?
                    .power(1)
                    .ordering(OrderingVariant::Natural)
                    .coloring(ColoringVariant::DistanceTwo)
                    .seed(pipeline.seed),
            ),
            SamplerChoice::Normal => {
                Box::new(NormalSampler::new(operator.dimension()).with_seed(pipeline.seed))
            }
        };

        Ok(LogDetEstimator::new(sampler, Box::new(function)))
    }

    pub fn trace_sampler(&self) -> &dyn TraceSampler<F> {
        self.sampler.as_ref()
    }

    pub fn operator_function(&self) -> &dyn OperatorFunction<F> {
        self.function.as_ref()
    }

    fn prepare(&mut self) -> Result<usize> {
        self.function.precompute()?;
        self.sampler.precompute()?;

        let (operator, samples) = (self.function.dimension(), self.sampler.dimension());
        if operator != samples {
            return Err(LinalgError::DimensionMismatch {
                operator,
                rhs: samples,
            });
        }

        match self.sampler.num_samples() {
            0 => Err(LinalgError::NoTraceSamples),
            n => Ok(n),
        }
    }

    fn draw(&self, draw: usize, idx: usize) -> Result<F> {
        let sample = self.sampler.sample(draw, idx)?;
        self.function.compute(sample.view())
    }

    /// `num_estimates` estimates, the i-th entry averages the first `i + 1` of them
    pub fn sample(&mut self, num_estimates: usize) -> Result<Array1<F>> {
        let num_samples = self.prepare()?;
        log::debug!(
            "log-det estimation: {} estimates of {} sample vectors each",
            num_estimates,
            num_samples
        );

        let this = &*self;
        let estimates = (0..num_estimates)
            .into_par_iter()
            .map(|draw| (0..num_samples).map(|idx| this.draw(draw, idx)).sum::<Result<F>>())
            .collect::<Result<Vec<F>>>()?;

        let mut total = F::zero();
        let averages = estimates
            .iter()
            .enumerate()
            .map(|(i, estimate)| {
                total += *estimate;
                total / F::cast(i + 1)
            })
            .collect();

        Ok(averages)
    }

    /// Raw quadratic forms, one row per draw and one column per sample vector
    pub fn sample_without_averaging(&mut self, num_estimates: usize) -> Result<Array2<F>> {
        let num_samples = self.prepare()?;

        let this = &*self;
        let rows = (0..num_estimates)
            .into_par_iter()
            .map(|draw| {
                (0..num_samples)
                    .map(|idx| this.draw(draw, idx))
                    .collect::<Result<Vec<F>>>()
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Array2::from_shape_fn((num_estimates, num_samples), |(i, j)| {
            rows[i][j]
        }))
    }
}

impl<F: Float> Parameterized for LogDetEstimator<F> {
    const NAME: &'static str = "LogDetEstimator";

    fn parameters() -> Vec<Parameter<Self>> {
        vec![
            Parameter::with_validation(
                "trace_sampler",
                "Trace sampler of the estimator",
                |s: &Self| s.sampler.save_parameters(),
                |s: &mut Self, v: ParameterSnapshot| s.sampler.load_parameters(&v),
            )
            .not_available(),
            Parameter::with_validation(
                "operator_log",
                "Operator function of the estimator",
                |s: &Self| s.function.save_parameters(),
                |s: &mut Self, v: ParameterSnapshot| s.function.load_parameters(&v),
            )
            .not_available(),
        ]
    }

    fn new_instance(&self) -> sgcore::error::Result<Self> {
        let into_base = |err: LinalgError| match err {
            LinalgError::BaseCrate(err) => err,
            other => sgcore::Error::Parameters(other.to_string()),
        };

        Ok(LogDetEstimator::new(
            self.sampler.boxed_clone().map_err(into_base)?,
            self.function.boxed_clone().map_err(into_base)?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operator::DenseMatrixOperator;
    use approx::assert_abs_diff_eq;
    use ndarray::array;
    use sgcore::object::ParameterValue;

    fn exact_estimator(values: Array1<f64>) -> LogDetEstimator<f64> {
        let n = values.len();
        let op = Arc::new(DenseMatrixOperator::new(Array2::from_diag(&values)).unwrap());

        LogDetEstimator::new(
            Box::new(NormalSampler::new(n).with_seed(5)),
            Box::new(DenseMatrixExactLog::new(op)),
        )
    }

    #[test]
    fn running_average_of_estimates() {
        let mut estimator = exact_estimator(array![1.0, 2.0, 3.0]);
        let raw = estimator.sample_without_averaging(6).unwrap();
        let averaged = estimator.sample(6).unwrap();

        assert_eq!(raw.dim(), (6, 1));
        for i in 0..6 {
            let mean = raw.column(0).iter().take(i + 1).sum::<f64>() / (i + 1) as f64;
            assert_abs_diff_eq!(averaged[i], mean, epsilon = 1e-12);
        }
    }

    #[test]
    fn zero_estimates() {
        let mut estimator = exact_estimator(array![1.0, 2.0]);
        assert_eq!(estimator.sample(0).unwrap().len(), 0);
        assert_eq!(estimator.sample_without_averaging(0).unwrap().dim(), (0, 1));
    }

    #[test]
    fn mismatched_dimensions() {
        let op = Arc::new(DenseMatrixOperator::new(Array2::<f64>::eye(3)).unwrap());
        let mut estimator = LogDetEstimator::new(
            Box::new(NormalSampler::new(4)),
            Box::new(DenseMatrixExactLog::new(op)),
        );

        assert!(matches!(
            estimator.sample(1),
            Err(LinalgError::DimensionMismatch {
                operator: 3,
                rhs: 4
            })
        ));
    }

    #[test]
    fn collaborators_are_registered() {
        let estimator = exact_estimator(array![1.0, 2.0]);
        let names: Vec<_> = estimator.descriptors().iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["trace_sampler", "operator_log"]);

        match estimator.get_parameter("trace_sampler").unwrap() {
            ParameterValue::Nested(snapshot) => {
                assert_eq!(snapshot.object_name(), "NormalSampler");
                assert_eq!(snapshot.get("seed"), Some(&ParameterValue::Int(5)));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn clone_is_independent() {
        let mut estimator = exact_estimator(array![2.0, 3.0]);
        estimator.sample(1).unwrap();

        let cloned = sgcore::object::clone_parameterized(&estimator).unwrap();
        assert_eq!(cloned.trace_sampler().name(), "NormalSampler");
        assert!(cloned.operator_function().get_parameter("log_matrix").is_ok());
    }
}
