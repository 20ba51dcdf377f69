//! # Linear algebra for sgcore
//!
//! `sgcore-linalg` provides the numerical layer of the `sgcore` toolbox, in pure Rust on top of
//! `ndarray`, `sprs` and the dense decompositions of `linfa-linalg`.
//!
//! ## Current state
//!
//! * [linear operators](operator) over dense and sparse matrices
//! * a [direct solver](linsolver::DirectLinearSolver) with Cholesky, QR and SVD strategies,
//!   [conjugate gradient](linsolver::ConjugateGradientSolver) and the
//!   [multi-shift CG-M](linsolver::CgmShiftedFamilySolver) for families of shifted systems
//! * [extremal eigenvalues](eigen) by full decomposition or Lanczos
//! * a stochastic [log-determinant estimator](logdet::LogDetEstimator) for large sparse symmetric
//!   positive definite matrices
//!
//! All solvers and estimator collaborators are `sgcore` objects: their configuration is
//! registered and can be inspected, saved and cloned through [`sgcore::SgObject`].
//!
//! ```
//! use ndarray::array;
//! use sgcore_linalg::linsolver::{DirectLinearSolver, DirectSolverType, LinearSolver};
//! use sgcore_linalg::operator::DenseMatrixOperator;
//!
//! let op = DenseMatrixOperator::new(array![[4.0f64, 1.0], [1.0, 3.0]]).unwrap();
//! let x = DirectLinearSolver::new(DirectSolverType::Llt)
//!     .solve(&op, array![1.0, 2.0].view())
//!     .unwrap();
//!
//! assert!((4.0 * x[0] + x[1] - 1.0).abs() < 1e-12);
//! ```
pub mod eigen;
mod error;
pub mod factorization;
pub mod linsolver;
pub mod logdet;
pub mod operator;

pub use error::{LinalgError, Result};
