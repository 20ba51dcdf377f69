//! `sgcore` is the shared substrate of a machine learning toolbox.
//!
//! It provides the pieces every algorithm crate of the workspace is built upon:
//!
//! * [`Sg`] handles: shared ownership of polymorphic objects, released when the last handle drops
//! * a declarative parameter registry ([`Parameterized`]) driving generic save, load and clone
//! * [`DynamicObjectArray`], a resizable container owning one reference per stored element
//! * datasets, the [`Float`] bound and the `Fit`/`Predict` traits shared by the learners
//!
//! The numerical layers live in the member crates: `sgcore-linalg` for linear operators,
//! solvers and log-determinant estimation, `sgcore-iterative` for the resumable training loop of
//! linear machines.

pub mod dataset;
pub mod error;
pub mod object;
mod param_guard;
pub mod prelude;
pub mod traits;

pub use dataset::{Dataset, DatasetBase, DatasetView, Float};
pub use error::Error;
pub use object::{DynamicObjectArray, Parameterized, Sg, SgObject};
pub use param_guard::ParamGuard;
