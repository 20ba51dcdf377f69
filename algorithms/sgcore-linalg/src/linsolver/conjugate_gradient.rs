use ndarray::{Array1, ArrayView1};
use sgcore::object::{clone_parameterized, Parameter};
use sgcore::{Float, Parameterized};

use super::LinearSolver;
use crate::error::Result;
use crate::operator::{check_square, LinearOperator};

/// Conjugate gradient method for symmetric positive definite operators
///
/// Stops once `||r|| <= tolerance * ||b||`. Running out of iterations is reported with a
/// warning and the last iterate is returned.
#[derive(Debug, Clone)]
pub struct ConjugateGradientSolver {
    max_iterations: usize,
    tolerance: f64,
}

impl Default for ConjugateGradientSolver {
    fn default() -> Self {
        ConjugateGradientSolver::new(1000, 1e-10)
    }
}

impl ConjugateGradientSolver {
    pub fn new(max_iterations: usize, tolerance: f64) -> Self {
        ConjugateGradientSolver {
            max_iterations,
            tolerance,
        }
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }
}

impl Parameterized for ConjugateGradientSolver {
    const NAME: &'static str = "ConjugateGradientSolver";

    fn parameters() -> Vec<Parameter<Self>> {
        vec![
            Parameter::new(
                "max_iteration_limit",
                "Maximum number of iterations",
                |s: &Self| s.max_iterations,
                |s: &mut Self, v: usize| s.max_iterations = v,
            ),
            Parameter::new(
                "relative_tolerance",
                "Relative tolerance of the residual",
                |s: &Self| s.tolerance,
                |s: &mut Self, v: f64| s.tolerance = v,
            ),
        ]
    }

    fn new_instance(&self) -> sgcore::error::Result<Self> {
        Ok(ConjugateGradientSolver::default())
    }
}

impl<F: Float> LinearSolver<F> for ConjugateGradientSolver {
    fn solve(&self, operator: &dyn LinearOperator<F>, b: ArrayView1<F>) -> Result<Array1<F>> {
        check_square(operator, b.len())?;

        let mut x = Array1::zeros(b.len());
        let mut r = b.to_owned();
        let mut p = r.clone();
        let mut rr = r.dot(&r);
        let threshold = F::cast(self.tolerance) * rr.sqrt();

        for iteration in 0..self.max_iterations {
            if rr.sqrt() <= threshold {
                log::debug!("conjugate gradient converged after {} iterations", iteration);
                return Ok(x);
            }

            let ap = operator.apply(p.view());
            let alpha = rr / p.dot(&ap);
            x.scaled_add(alpha, &p);
            r.scaled_add(-alpha, &ap);

            let rr_next = r.dot(&r);
            let beta = rr_next / rr;
            p = &r + &(p * beta);
            rr = rr_next;
        }

        if rr.sqrt() > threshold {
            log::warn!(
                "conjugate gradient did not converge within {} iterations, residual {}",
                self.max_iterations,
                rr.sqrt()
            );
        }

        Ok(x)
    }

    fn boxed_clone(&self) -> Result<Box<dyn LinearSolver<F>>> {
        Ok(Box::new(clone_parameterized(self)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linsolver::DirectLinearSolver;
    use crate::operator::DenseMatrixOperator;
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array2};

    fn laplacian(n: usize) -> Array2<f64> {
        Array2::from_shape_fn((n, n), |(i, j)| {
            if i == j {
                2.5
            } else if (i as i64 - j as i64).abs() == 1 {
                -1.0
            } else {
                0.0
            }
        })
    }

    #[test]
    fn agrees_with_direct_solve() {
        let op = DenseMatrixOperator::new(laplacian(12)).unwrap();
        let b = Array1::from_shape_fn(12, |i| (i as f64).sin());

        let cg = ConjugateGradientSolver::default().solve(&op, b.view()).unwrap();
        let direct = DirectLinearSolver::default().solve(&op, b.view()).unwrap();
        assert_abs_diff_eq!(cg, direct, epsilon = 1e-8);
    }

    #[test]
    fn zero_right_hand_side() {
        let op = DenseMatrixOperator::new(laplacian(3)).unwrap();
        let x = ConjugateGradientSolver::default()
            .solve(&op, Array1::<f64>::zeros(3).view())
            .unwrap();
        assert_abs_diff_eq!(x, array![0.0, 0.0, 0.0]);
    }

    #[test]
    fn too_few_iterations_still_returns_an_iterate() {
        let op = DenseMatrixOperator::new(laplacian(20)).unwrap();
        let b = Array1::<f64>::ones(20);

        let x = ConjugateGradientSolver::new(2, 1e-12)
            .solve(&op, b.view())
            .unwrap();
        assert!(x.iter().all(|v| v.is_finite()));
        assert!(x.iter().any(|v| *v != 0.0));
    }
}
