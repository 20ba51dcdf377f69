use ndarray::{Array1, Array2};
use sgcore::object::Parameter;
use sgcore::{Float, Parameterized};

use crate::eigen::EigenSolver;
use crate::error::{LinalgError, Result};
use crate::factorization::SymmetricEigen;

const MIN_SHIFTS: usize = 4;
const MAX_SHIFTS: usize = 1000;

/// Gauss-Legendre nodes and weights on `[0, 1]`
///
/// Golub-Welsch: the nodes are the eigenvalues of the symmetric Jacobi matrix of the Legendre
/// recurrence and the weights are given by the first components of its eigenvectors.
pub fn gauss_legendre(n: usize) -> Result<(Array1<f64>, Array1<f64>)> {
    let mut jacobi = Array2::zeros((n, n));
    for k in 1..n {
        let k_f = k as f64;
        let b = k_f / (4.0 * k_f * k_f - 1.0).sqrt();
        jacobi[[k - 1, k]] = b;
        jacobi[[k, k - 1]] = b;
    }

    let eig = SymmetricEigen::<f64>::factorize(jacobi.view())?;
    let nodes = eig.eigenvalues().mapv(|x| 0.5 * (x + 1.0));
    let weights = eig.eigenvectors().row(0).mapv(|v| v * v);

    Ok((nodes, weights))
}

/// Number of quadrature nodes needed for `accuracy` on a spectrum `[min, max]`
///
/// The integrand of `log(A / c)` with `c = sqrt(min * max)` has its singularities outside of
/// `[0, 1]`. The Gauss-Legendre error decays like `rho^(-2n)`, `rho` being the Bernstein ellipse
/// parameter of the closest singularity.
pub fn num_shifts_for(min: f64, max: f64, accuracy: f64) -> usize {
    let mut rho = f64::INFINITY;
    for x in &[(min / max).sqrt(), (max / min).sqrt()] {
        if (x - 1.0).abs() <= f64::EPSILON {
            continue;
        }
        let z = (2.0 / (1.0 - x) - 1.0).abs();
        rho = rho.min(z + (z * z - 1.0).sqrt());
    }

    if !rho.is_finite() {
        return MIN_SHIFTS;
    }

    let n = ((1.0 / accuracy).ln() / (2.0 * rho.ln())).ceil();
    if n.is_finite() {
        (n as usize + MIN_SHIFTS).min(MAX_SHIFTS)
    } else {
        MAX_SHIFTS
    }
}

/// Rational approximation `log(A) ~ constant * I + sum_k weight_k (A + shift_k I)^-1`
///
/// The spectrum of `A` is normalised by `c = sqrt(min * max)`, then the integral representation
/// `log(B) = int_0^1 (B - I)(t (B - I) + I)^-1 dt` is discretised with Gauss-Legendre. All
/// shifts are positive, the systems are as well conditioned as `A` itself.
pub struct RationalApproximation<F: Float> {
    eigen_solver: Box<dyn EigenSolver<F>>,
    accuracy: f64,
    shifts: Array1<F>,
    weights: Array1<F>,
    constant: F,
}

impl<F: Float> RationalApproximation<F> {
    pub fn new(eigen_solver: Box<dyn EigenSolver<F>>, accuracy: f64) -> Result<Self> {
        if !(accuracy > 0.0 && accuracy < 1.0) {
            return Err(LinalgError::InvalidAccuracy(accuracy));
        }

        Ok(RationalApproximation {
            eigen_solver,
            accuracy,
            shifts: Array1::zeros(0),
            weights: Array1::zeros(0),
            constant: F::zero(),
        })
    }

    /// Compute the eigenvalue bounds, then shifts, weights and constant
    pub fn precompute(&mut self) -> Result<()> {
        let (min, max) = self.eigen_solver.compute()?;
        let (min, max) = (min.as_f64(), max.as_f64());
        if !(min > 0.0 && max >= min && max.is_finite()) {
            return Err(LinalgError::InvalidEigenvalues { min, max });
        }

        let n = num_shifts_for(min, max, self.accuracy);
        let (nodes, quadrature) = gauss_legendre(n)?;
        let c = (min * max).sqrt();

        self.shifts = nodes.mapv(|t| F::cast(c * (1.0 - t) / t));
        self.weights =
            Array1::from_shape_fn(n, |k| F::cast(-c * quadrature[k] / (nodes[k] * nodes[k])));
        self.constant = F::cast(
            c.ln()
                + nodes
                    .iter()
                    .zip(quadrature.iter())
                    .map(|(t, w)| w / t)
                    .sum::<f64>(),
        );

        log::debug!(
            "rational approximation with {} shifts for spectrum [{}, {}]",
            n,
            min,
            max
        );

        Ok(())
    }

    pub fn accuracy(&self) -> f64 {
        self.accuracy
    }

    pub fn num_shifts(&self) -> usize {
        self.shifts.len()
    }

    pub fn shifts(&self) -> &Array1<F> {
        &self.shifts
    }

    pub fn weights(&self) -> &Array1<F> {
        &self.weights
    }

    pub fn constant(&self) -> F {
        self.constant
    }

    pub fn eigen_solver(&self) -> &dyn EigenSolver<F> {
        self.eigen_solver.as_ref()
    }

    pub(crate) fn boxed_clone(&self) -> Result<Self> {
        Ok(RationalApproximation {
            eigen_solver: self.eigen_solver.boxed_clone()?,
            accuracy: self.accuracy,
            shifts: self.shifts.clone(),
            weights: self.weights.clone(),
            constant: self.constant,
        })
    }

    /// Registered parameters of the approximation, lifted into an owner `T`
    pub(crate) fn parameters_of<T: 'static>(
        get: fn(&T) -> &Self,
        get_mut: fn(&mut T) -> &mut Self,
    ) -> Vec<Parameter<T>> {
        vec![
            Parameter::new(
                "desired_accuracy",
                "Desired accuracy of the rational approximation",
                move |s: &T| get(s).accuracy,
                move |s: &mut T, v: f64| get_mut(s).accuracy = v,
            ),
            Parameter::new(
                "weights",
                "Weights of the shifted systems",
                move |s: &T| get(s).weights.clone(),
                move |s: &mut T, v: Array1<F>| get_mut(s).weights = v,
            )
            .not_available(),
            Parameter::new(
                "shifts",
                "Shifts of the shifted systems",
                move |s: &T| get(s).shifts.clone(),
                move |s: &mut T, v: Array1<F>| get_mut(s).shifts = v,
            )
            .not_available(),
            Parameter::new(
                "constant_multiplier",
                "Constant multiplier of the approximation",
                move |s: &T| get(s).constant,
                move |s: &mut T, v: F| get_mut(s).constant = v,
            )
            .not_available(),
            Parameter::new(
                "num_shifts",
                "Number of shifts",
                move |s: &T| get(s).shifts.len(),
                |_: &mut T, _: usize| {},
            )
            .not_available(),
        ]
    }
}

/// Stand-alone registration, the approximation itself is not shared through handles
impl<F: Float> Parameterized for RationalApproximation<F> {
    const NAME: &'static str = "RationalApproximation";

    fn parameters() -> Vec<Parameter<Self>> {
        Self::parameters_of(|s: &Self| s, |s: &mut Self| s)
    }

    fn new_instance(&self) -> sgcore::error::Result<Self> {
        let eigen_solver = self
            .eigen_solver
            .boxed_clone()
            .map_err(|e| sgcore::Error::Parameters(e.to_string()))?;

        Ok(RationalApproximation {
            eigen_solver,
            accuracy: self.accuracy,
            shifts: Array1::zeros(0),
            weights: Array1::zeros(0),
            constant: F::zero(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eigen::DirectEigenSolver;
    use crate::operator::DenseMatrixOperator;
    use approx::assert_abs_diff_eq;
    use ndarray::array;
    use std::sync::Arc;

    #[test]
    fn gauss_legendre_integrates_polynomials_exactly() {
        let (nodes, weights) = gauss_legendre(5).unwrap();
        assert_abs_diff_eq!(weights.sum(), 1.0, epsilon = 1e-12);

        // exact up to degree 2n - 1
        let integral: f64 = nodes
            .iter()
            .zip(weights.iter())
            .map(|(t, w)| w * t.powi(9))
            .sum();
        assert_abs_diff_eq!(integral, 0.1, epsilon = 1e-12);
        assert!(nodes.iter().all(|t| *t > 0.0 && *t < 1.0));
    }

    #[test]
    fn more_shifts_for_worse_conditioning_or_accuracy() {
        assert_eq!(num_shifts_for(2.0, 2.0, 1e-5), MIN_SHIFTS);
        assert!(num_shifts_for(1.0, 1e4, 1e-5) > num_shifts_for(1.0, 10.0, 1e-5));
        assert!(num_shifts_for(1.0, 10.0, 1e-10) > num_shifts_for(1.0, 10.0, 1e-3));
    }

    #[test]
    fn approximates_log_of_diagonal_operator() {
        let values = array![0.5, 1.0, 3.0, 20.0];
        let op = Arc::new(DenseMatrixOperator::new(Array2::from_diag(&values)).unwrap());
        let mut rational =
            RationalApproximation::new(Box::new(DirectEigenSolver::new(op)), 1e-8).unwrap();
        rational.precompute().unwrap();

        // scalar version of the approximation at every eigenvalue
        for lambda in values.iter() {
            let value = rational.constant()
                + rational
                    .weights()
                    .iter()
                    .zip(rational.shifts().iter())
                    .map(|(w, s)| w / (lambda + s))
                    .sum::<f64>();
            assert_abs_diff_eq!(value, lambda.ln(), epsilon = 1e-6);
        }
        assert!(rational.shifts().iter().all(|s| *s > 0.0));
    }

    #[test]
    fn invalid_inputs() {
        let op = Arc::new(DenseMatrixOperator::new(array![[1.0, 0.0], [0.0, -1.0]]).unwrap());
        assert!(matches!(
            RationalApproximation::new(Box::new(DirectEigenSolver::new(op.clone())), 0.0),
            Err(LinalgError::InvalidAccuracy(_))
        ));

        let mut rational =
            RationalApproximation::new(Box::new(DirectEigenSolver::new(op)), 1e-5).unwrap();
        assert!(matches!(
            rational.precompute(),
            Err(LinalgError::InvalidEigenvalues { .. })
        ));
    }
}
