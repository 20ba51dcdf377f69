//! Extremal eigenvalues of symmetric operators
//!
//! The rational approximation of the matrix logarithm only needs the smallest and the largest
//! eigenvalue. Dense operators can afford a full decomposition, sparse ones use Lanczos.
use std::sync::Arc;

use ndarray::{s, Array1, Array2};
use ndarray_rand::rand_distr::StandardNormal;
use ndarray_rand::RandomExt;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256Plus;
use sgcore::object::{clone_parameterized, Parameter};
use sgcore::{Float, Parameterized, SgObject};

use crate::error::{LinalgError, Result};
use crate::factorization::SymmetricEigen;
use crate::operator::{LinearOperator, OperatorKind};

pub trait EigenSolver<F: Float>: SgObject {
    /// Compute and cache `(min, max)`
    fn compute(&mut self) -> Result<(F, F)>;

    /// Cached bounds, `None` before the first `compute`
    fn extremal_eigenvalues(&self) -> Option<(F, F)>;

    fn boxed_clone(&self) -> Result<Box<dyn EigenSolver<F>>>;
}

/// Cached bounds shared by the eigen solvers
#[derive(Debug, Clone, Copy)]
struct Bounds<F> {
    min: F,
    max: F,
    computed: bool,
}

impl<F: Float> Default for Bounds<F> {
    fn default() -> Self {
        Bounds {
            min: F::zero(),
            max: F::zero(),
            computed: false,
        }
    }
}

impl<F: Float> Bounds<F> {
    fn get(&self) -> Option<(F, F)> {
        if self.computed {
            Some((self.min, self.max))
        } else {
            None
        }
    }

    fn set(&mut self, min: F, max: F) -> (F, F) {
        *self = Bounds {
            min,
            max,
            computed: true,
        };
        (min, max)
    }
}

/// Full eigen-decomposition of a dense operator
pub struct DirectEigenSolver<F: Float> {
    operator: Arc<dyn LinearOperator<F>>,
    bounds: Bounds<F>,
}

impl<F: Float> DirectEigenSolver<F> {
    pub fn new(operator: Arc<dyn LinearOperator<F>>) -> Self {
        DirectEigenSolver {
            operator,
            bounds: Bounds::default(),
        }
    }
}

impl<F: Float> EigenSolver<F> for DirectEigenSolver<F> {
    fn compute(&mut self) -> Result<(F, F)> {
        if let Some(bounds) = self.bounds.get() {
            return Ok(bounds);
        }

        let matrix = match self.operator.kind() {
            OperatorKind::Dense(matrix) => matrix,
            other => {
                return Err(LinalgError::UnsupportedOperator {
                    solver: "DirectEigenSolver",
                    operator: other.name(),
                })
            }
        };
        let eig = SymmetricEigen::factorize(matrix.view())?;
        let values = eig.eigenvalues();

        Ok(self.bounds.set(values[0], values[values.len() - 1]))
    }

    fn extremal_eigenvalues(&self) -> Option<(F, F)> {
        self.bounds.get()
    }

    fn boxed_clone(&self) -> Result<Box<dyn EigenSolver<F>>> {
        Ok(Box::new(clone_parameterized(self)?))
    }
}

impl<F: Float> Parameterized for DirectEigenSolver<F> {
    const NAME: &'static str = "DirectEigenSolver";

    fn parameters() -> Vec<Parameter<Self>> {
        bound_parameters::<Self, F>(|s: &Self| &s.bounds, |s: &mut Self| &mut s.bounds)
    }

    fn new_instance(&self) -> sgcore::error::Result<Self> {
        Ok(DirectEigenSolver::new(self.operator.clone()))
    }
}

/// Lanczos iteration with full re-orthogonalisation
///
/// The Krylov space grows until the extremal Ritz values change by less than
/// `relative_tolerance` or `max_iterations` steps are done. The start vector is drawn from a
/// seeded generator, so repeated runs give identical bounds.
pub struct LanczosEigenSolver<F: Float> {
    operator: Arc<dyn LinearOperator<F>>,
    max_iterations: usize,
    relative_tolerance: f64,
    seed: u64,
    bounds: Bounds<F>,
}

impl<F: Float> LanczosEigenSolver<F> {
    pub fn new(operator: Arc<dyn LinearOperator<F>>) -> Self {
        LanczosEigenSolver {
            operator,
            max_iterations: 1000,
            relative_tolerance: 1e-6,
            seed: 42,
            bounds: Bounds::default(),
        }
    }

    pub fn max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn relative_tolerance(mut self, relative_tolerance: f64) -> Self {
        self.relative_tolerance = relative_tolerance;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    fn ritz_bounds(alpha: &[F], beta: &[F]) -> Result<(F, F)> {
        let m = alpha.len();
        let mut t = Array2::zeros((m, m));
        for i in 0..m {
            t[[i, i]] = alpha[i];
            if i + 1 < m {
                t[[i, i + 1]] = beta[i];
                t[[i + 1, i]] = beta[i];
            }
        }
        let eig = SymmetricEigen::factorize(t.view())?;
        let values = eig.eigenvalues();

        Ok((values[0], values[m - 1]))
    }
}

impl<F: Float> EigenSolver<F> for LanczosEigenSolver<F> {
    fn compute(&mut self) -> Result<(F, F)> {
        if let Some(bounds) = self.bounds.get() {
            return Ok(bounds);
        }

        let n = self.operator.dimension();
        if n == 0 {
            return Err(LinalgError::EmptyOperator);
        }

        let mut rng = Xoshiro256Plus::seed_from_u64(self.seed);
        let start = Array1::<f64>::random_using(n, StandardNormal, &mut rng).mapv(|v| F::cast(v));
        let norm = start.dot(&start).sqrt();
        let mut basis = Array2::zeros((self.max_iterations.min(n).max(1), n));
        basis.row_mut(0).assign(&(start / norm));

        let tolerance = F::cast(self.relative_tolerance);
        let mut alpha = Vec::new();
        let mut beta: Vec<F> = Vec::new();
        let mut previous: Option<(F, F)> = None;
        let steps = basis.nrows();

        for j in 0..steps {
            let mut w = self.operator.apply(basis.row(j));
            let a = w.dot(&basis.row(j));
            alpha.push(a);

            // full re-orthogonalisation against the whole basis, applied twice
            for _ in 0..2 {
                let coefficients = basis.slice(s![..=j, ..]).dot(&w);
                w = w - coefficients.dot(&basis.slice(s![..=j, ..]));
            }

            let current = Self::ritz_bounds(&alpha, &beta)?;
            if let Some((min, max)) = previous {
                let scale = current.1.abs().max(current.0.abs());
                if (current.0 - min).abs() <= tolerance * scale
                    && (current.1 - max).abs() <= tolerance * scale
                {
                    log::debug!("Lanczos converged after {} steps", j + 1);
                    return Ok(self.bounds.set(current.0, current.1));
                }
            }
            previous = Some(current);

            let b = w.dot(&w).sqrt();
            let scale = a.abs().max(F::one());
            if j + 1 == steps || b <= F::epsilon() * scale {
                // invariant subspace found or the space is exhausted
                if j + 1 < n && b > F::epsilon() * scale {
                    log::warn!(
                        "Lanczos did not converge within {} iterations",
                        self.max_iterations
                    );
                }
                return Ok(self.bounds.set(current.0, current.1));
            }

            beta.push(b);
            basis.row_mut(j + 1).assign(&(w / b));
        }

        Err(LinalgError::NotConverged {
            solver: "LanczosEigenSolver",
            iterations: self.max_iterations,
        })
    }

    fn extremal_eigenvalues(&self) -> Option<(F, F)> {
        self.bounds.get()
    }

    fn boxed_clone(&self) -> Result<Box<dyn EigenSolver<F>>> {
        Ok(Box::new(clone_parameterized(self)?))
    }
}

impl<F: Float> Parameterized for LanczosEigenSolver<F> {
    const NAME: &'static str = "LanczosEigenSolver";

    fn parameters() -> Vec<Parameter<Self>> {
        let mut params = vec![
            Parameter::new(
                "max_iteration_limit",
                "Maximum number of Lanczos steps",
                |s: &Self| s.max_iterations,
                |s: &mut Self, v: usize| s.max_iterations = v,
            ),
            Parameter::new(
                "relative_tolerance",
                "Relative change of the Ritz values that stops the iteration",
                |s: &Self| s.relative_tolerance,
                |s: &mut Self, v: f64| s.relative_tolerance = v,
            ),
            Parameter::new(
                "seed",
                "Seed of the start vector",
                |s: &Self| s.seed,
                |s: &mut Self, v: u64| s.seed = v,
            )
            .not_available(),
        ];
        params.extend(bound_parameters::<Self, F>(
            |s: &Self| &s.bounds,
            |s: &mut Self| &mut s.bounds,
        ));

        params
    }

    fn new_instance(&self) -> sgcore::error::Result<Self> {
        Ok(LanczosEigenSolver::new(self.operator.clone()))
    }
}

fn bound_parameters<T, F>(
    get: fn(&T) -> &Bounds<F>,
    get_mut: fn(&mut T) -> &mut Bounds<F>,
) -> Vec<Parameter<T>>
where
    T: 'static,
    F: Float,
{
    vec![
        Parameter::new(
            "min_eigenvalue",
            "Minimum eigenvalue of the operator",
            move |s: &T| get(s).min,
            move |s: &mut T, v: F| get_mut(s).min = v,
        )
        .not_available(),
        Parameter::new(
            "max_eigenvalue",
            "Maximum eigenvalue of the operator",
            move |s: &T| get(s).max,
            move |s: &mut T, v: F| get_mut(s).max = v,
        )
        .not_available(),
        Parameter::new(
            "is_computed",
            "Whether the eigenvalues are computed",
            move |s: &T| get(s).computed,
            move |s: &mut T, v: bool| get_mut(s).computed = v,
        )
        .not_available(),
    ]
}
