use ndarray::{Array1, Array2, ArrayView1};
use sgcore::object::{clone_parameterized, Parameter};
use sgcore::{Float, Parameterized};

use super::LinearSolver;
use crate::error::{LinalgError, Result};
use crate::operator::{check_square, LinearOperator};

/// Multi-shift conjugate gradient (CG-M)
///
/// Solves the family `(A + s_k I) x_k = b` for all shifts `s_k` with the Krylov space of a single
/// conjugate gradient run on `A`. The residuals of the shifted systems stay collinear to the
/// residual of the base system, `r_k = zeta_k r`, so each shifted system costs vector updates
/// only.
#[derive(Debug, Clone)]
pub struct CgmShiftedFamilySolver {
    max_iterations: usize,
    tolerance: f64,
}

impl Default for CgmShiftedFamilySolver {
    fn default() -> Self {
        CgmShiftedFamilySolver::new(1000, 1e-10)
    }
}

impl CgmShiftedFamilySolver {
    pub fn new(max_iterations: usize, tolerance: f64) -> Self {
        CgmShiftedFamilySolver {
            max_iterations,
            tolerance,
        }
    }

    /// Solutions of all shifted systems, one row per shift
    pub fn solve_shifted<F: Float>(
        &self,
        operator: &dyn LinearOperator<F>,
        b: ArrayView1<F>,
        shifts: ArrayView1<F>,
    ) -> Result<Array2<F>> {
        check_square(operator, b.len())?;
        if let Some(shift) = shifts.iter().find(|s| !s.is_finite() || **s < F::zero()) {
            return Err(LinalgError::InvalidShift(shift.as_f64()));
        }

        let (n, k) = (b.len(), shifts.len());
        let mut x = Array2::zeros((k, n));
        let mut p_shifted = Array2::zeros((k, n));
        for mut row in p_shifted.rows_mut() {
            row.assign(&b);
        }

        let mut r = b.to_owned();
        let mut p = b.to_owned();
        let mut rr = r.dot(&r);
        let threshold = F::cast(self.tolerance) * rr.sqrt();
        if k == 0 || rr == F::zero() {
            return Ok(x);
        }

        let mut zeta = Array1::<F>::ones(k);
        let mut zeta_prev = Array1::<F>::ones(k);
        let mut zeta_next = Array1::<F>::zeros(k);
        let (mut alpha_prev, mut beta_prev) = (F::one(), F::zero());

        for iteration in 0..self.max_iterations {
            let ap = operator.apply(p.view());
            let alpha = rr / p.dot(&ap);

            for s in 0..k {
                if zeta[s] == F::zero() {
                    zeta_next[s] = F::zero();
                    continue;
                }
                let denominator = alpha * beta_prev * (zeta_prev[s] - zeta[s])
                    + zeta_prev[s] * alpha_prev * (F::one() + shifts[s] * alpha);
                let next = zeta[s] * zeta_prev[s] * alpha_prev / denominator;
                zeta_next[s] = if next.is_finite() { next } else { F::zero() };

                let alpha_shifted = alpha * zeta_next[s] / zeta[s];
                let direction = p_shifted.row(s).to_owned();
                x.row_mut(s).scaled_add(alpha_shifted, &direction);
            }

            r.scaled_add(-alpha, &ap);
            let rr_next = r.dot(&r);
            let beta = rr_next / rr;
            p = &r + &(p * beta);

            for s in 0..k {
                if zeta[s] == F::zero() {
                    continue;
                }
                let ratio = zeta_next[s] / zeta[s];
                let beta_shifted = ratio * ratio * beta;
                let mut direction = p_shifted.row_mut(s);
                direction *= beta_shifted;
                direction.scaled_add(zeta_next[s], &r);
            }

            zeta_prev.assign(&zeta);
            zeta.assign(&zeta_next);
            alpha_prev = alpha;
            beta_prev = beta;
            rr = rr_next;

            let largest_zeta = zeta.iter().fold(F::zero(), |acc, z| acc.max(z.abs()));
            if largest_zeta * rr.sqrt() <= threshold {
                log::debug!("CG-M converged after {} iterations", iteration + 1);
                return Ok(x);
            }
        }

        log::warn!(
            "CG-M did not converge within {} iterations, residual {}",
            self.max_iterations,
            rr.sqrt()
        );

        Ok(x)
    }

    /// `sum_k w_k (A + s_k I)^-1 b`
    pub fn solve_shifted_weighted<F: Float>(
        &self,
        operator: &dyn LinearOperator<F>,
        b: ArrayView1<F>,
        shifts: ArrayView1<F>,
        weights: ArrayView1<F>,
    ) -> Result<Array1<F>> {
        if shifts.len() != weights.len() {
            return Err(LinalgError::DimensionMismatch {
                operator: shifts.len(),
                rhs: weights.len(),
            });
        }

        let solutions = self.solve_shifted(operator, b, shifts)?;
        Ok(weights.dot(&solutions))
    }
}

impl Parameterized for CgmShiftedFamilySolver {
    const NAME: &'static str = "CGMShiftedFamilySolver";

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
                "Relative tolerance of the shifted residuals",
                |s: &Self| s.tolerance,
                |s: &mut Self, v: f64| s.tolerance = v,
            ),
        ]
    }

    fn new_instance(&self) -> sgcore::error::Result<Self> {
        Ok(CgmShiftedFamilySolver::default())
    }
}

/// Plain conjugate gradient, the family with the single shift zero
impl<F: Float> LinearSolver<F> for CgmShiftedFamilySolver {
    fn solve(&self, operator: &dyn LinearOperator<F>, b: ArrayView1<F>) -> Result<Array1<F>> {
        let solutions = self.solve_shifted(operator, b, Array1::zeros(1).view())?;
        Ok(solutions.row(0).to_owned())
    }

    fn boxed_clone(&self) -> Result<Box<dyn LinearSolver<F>>> {
        Ok(Box::new(clone_parameterized(self)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linsolver::{DirectLinearSolver, DirectSolverType};
    use crate::operator::{DenseMatrixOperator, ShiftedOperator};
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn spd() -> Array2<f64> {
        array![
            [4.0, 1.0, 0.0, 0.5],
            [1.0, 3.0, 0.5, 0.0],
            [0.0, 0.5, 2.0, 0.2],
            [0.5, 0.0, 0.2, 1.0]
        ]
    }

    #[test]
    fn every_shifted_system_is_solved() {
        let op = DenseMatrixOperator::new(spd()).unwrap();
        let b = array![1.0, -2.0, 0.5, 3.0];
        let shifts = array![0.0, 0.1, 1.0, 25.0];

        let solutions = CgmShiftedFamilySolver::default()
            .solve_shifted(&op, b.view(), shifts.view())
            .unwrap();

        let direct = DirectLinearSolver::new(DirectSolverType::Llt);
        for (k, shift) in shifts.iter().enumerate() {
            let shifted = op.shifted(*shift).unwrap();
            let expected = direct.solve(&shifted, b.view()).unwrap();
            assert_abs_diff_eq!(solutions.row(k), expected, epsilon = 1e-8);
        }
    }

    #[test]
    fn weighted_sum_of_solutions() {
        let op = DenseMatrixOperator::new(spd()).unwrap();
        let b = array![0.3, 0.3, -1.0, 2.0];
        let shifts = array![0.5, 2.0];
        let weights = array![2.0, -0.5];

        let combined = CgmShiftedFamilySolver::default()
            .solve_shifted_weighted(&op, b.view(), shifts.view(), weights.view())
            .unwrap();

        let cg = crate::linsolver::ConjugateGradientSolver::default();
        let first = cg.solve(&ShiftedOperator::new(&op, 0.5), b.view()).unwrap();
        let second = cg.solve(&ShiftedOperator::new(&op, 2.0), b.view()).unwrap();
        assert_abs_diff_eq!(combined, first * 2.0 - second * 0.5, epsilon = 1e-8);
    }

    #[test]
    fn negative_shift_is_rejected() {
        let op = DenseMatrixOperator::new(spd()).unwrap();
        let b = array![1.0, 1.0, 1.0, 1.0];

        assert!(matches!(
            CgmShiftedFamilySolver::default().solve_shifted(&op, b.view(), array![-1.0].view()),
            Err(LinalgError::InvalidShift(_))
        ));
    }
}
