//! Linear solvers
//!
//! Every solver answers `solve(operator, b)` for the system `A x = b`. The direct solver
//! factorizes dense operators, the conjugate gradient solvers only need the operator application
//! and therefore accept any symmetric positive definite operator.
use ndarray::{Array1, ArrayView1};
use sgcore::{Float, SgObject};

use crate::error::Result;
use crate::operator::LinearOperator;

mod cgm;
mod conjugate_gradient;
mod direct;

pub use cgm::CgmShiftedFamilySolver;
pub use conjugate_gradient::ConjugateGradientSolver;
pub use direct::{DirectLinearSolver, DirectSolverType};

pub trait LinearSolver<F: Float>: SgObject {
    fn solve(&self, operator: &dyn LinearOperator<F>, b: ArrayView1<F>) -> Result<Array1<F>>;

    fn boxed_clone(&self) -> Result<Box<dyn LinearSolver<F>>>;
}
