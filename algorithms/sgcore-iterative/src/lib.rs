//! # Iterative linear machines
//!
//! `sgcore-iterative` provides a resumable training loop for models that improve their state one
//! pass at a time, and two perceptron-style linear classifiers built on top of it.
//!
//! ## Current state
//!
//! * [`IterativeMachine`] drives any [`IterativeModel`]: `train` starts from scratch,
//!   `continue_train` resumes at the stored iteration counter, for example after raising the
//!   iteration budget
//! * a [`TrainingControl`] cancels a running loop from another thread
//! * [`Perceptron`] and [`AveragedPerceptron`] predict boolean labels with a separating hyperplane
//!
//! The loop state and the models are `sgcore` objects, their registered parameters can be saved,
//! loaded and cloned.
//!
//! ```
//! use ndarray::array;
//! use sgcore::dataset::dataset;
//! use sgcore::traits::{Fit, Predict};
//! use sgcore_iterative::Perceptron;
//!
//! let data = dataset(
//!     array![[2.0f64, 1.0], [1.0, 3.0], [-1.0, -2.0], [-3.0, -1.0]],
//!     array![true, true, false, false],
//! );
//! let machine = Perceptron::params().fit(&data).unwrap();
//!
//! assert!(machine.is_complete());
//! assert_eq!(&machine.predict(data.records()), data.targets());
//! ```
mod averaged_perceptron;
mod control;
mod error;
mod hyperparams;
mod linear;
mod machine;
mod perceptron;

pub use averaged_perceptron::AveragedPerceptron;
pub use control::{CancelHandle, Step, TrainingControl, TrainingOutcome};
pub use error::{IterativeError, Result};
pub use hyperparams::{
    AveragedPerceptronParams, AveragedPerceptronValidParams, PerceptronParams,
    PerceptronValidParams,
};
pub use linear::LinearModel;
pub use machine::{IterativeMachine, IterativeModel};
pub use perceptron::Perceptron;

use sgcore::Float;

impl<F: Float> Perceptron<F> {
    /// Default hyper-parameters
    pub fn params() -> PerceptronParams<F> {
        PerceptronParams::default()
    }
}

impl<F: Float> AveragedPerceptron<F> {
    /// Default hyper-parameters
    pub fn params() -> AveragedPerceptronParams<F> {
        AveragedPerceptronParams::default()
    }
}
