use sgcore::{Float, ParamGuard};

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

use crate::error::IterativeError;
use crate::linear::LinearModel;

macro_rules! linear_machine_params {
    ($(#[$doc:meta])* $params:ident, $valid:ident) => {
        $(#[$doc])*
        #[cfg_attr(
            feature = "serde",
            derive(Serialize, Deserialize),
            serde(crate = "serde_crate")
        )]
        #[derive(Clone, Debug, PartialEq)]
        pub struct $params<F: Float>(pub(crate) $valid<F>);

        /// A verified hyper-parameter set ready for training
        #[cfg_attr(
            feature = "serde",
            derive(Serialize, Deserialize),
            serde(crate = "serde_crate")
        )]
        #[derive(Clone, Debug, PartialEq)]
        pub struct $valid<F: Float> {
            pub(crate) learn_rate: F,
            pub(crate) max_iterations: usize,
            pub(crate) initialize_hyperplane: bool,
            pub(crate) hyperplane: Option<LinearModel<F>>,
        }

        impl<F: Float> ParamGuard for $params<F> {
            type Checked = $valid<F>;
            type Error = IterativeError;

            fn check_ref(&self) -> Result<&Self::Checked, Self::Error> {
                if !self.0.learn_rate.is_finite() || self.0.learn_rate <= F::zero() {
                    Err(IterativeError::InvalidLearningRate(
                        self.0.learn_rate.to_f32().unwrap_or(f32::NAN),
                    ))
                } else if self.0.max_iterations == 0 {
                    Err(IterativeError::InvalidMaxIterations(0))
                } else {
                    Ok(&self.0)
                }
            }

            fn check(self) -> Result<Self::Checked, Self::Error> {
                self.check_ref()?;
                Ok(self.0)
            }
        }

        impl<F: Float> Default for $params<F> {
            fn default() -> Self {
                Self::new()
            }
        }

        impl<F: Float> $params<F> {
            /// Create new hyperparameters with pre-defined values
            pub fn new() -> Self {
                Self($valid {
                    learn_rate: F::cast(0.1),
                    max_iterations: 1000,
                    initialize_hyperplane: true,
                    hyperplane: None,
                })
            }

            /// Set the step size of an update.
            ///
            /// Defaults to `0.1` if not set
            ///
            /// `learn_rate` must be positive and finite
            pub fn learn_rate(mut self, learn_rate: F) -> Self {
                self.0.learn_rate = learn_rate;
                self
            }

            /// Set the maximal number of passes over the data.
            ///
            /// Defaults to `1000` if not set
            pub fn max_iterations(mut self, max_iterations: usize) -> Self {
                self.0.max_iterations = max_iterations;
                self
            }

            /// Whether training starts from a fresh hyperplane.
            ///
            /// Defaults to `true`. When disabled training starts from the hyperplane given with
            /// [`hyperplane`](Self::hyperplane), or from zero weights if there is none.
            pub fn initialize_hyperplane(mut self, initialize: bool) -> Self {
                self.0.initialize_hyperplane = initialize;
                self
            }

            /// Start training from an existing hyperplane, disables the fresh initialization
            pub fn hyperplane(mut self, hyperplane: LinearModel<F>) -> Self {
                self.0.hyperplane = Some(hyperplane);
                self.0.initialize_hyperplane = false;
                self
            }
        }

        impl<F: Float> $valid<F> {
            pub fn learn_rate(&self) -> F {
                self.learn_rate
            }

            pub fn max_iterations(&self) -> usize {
                self.max_iterations
            }

            pub fn initialize_hyperplane(&self) -> bool {
                self.initialize_hyperplane
            }

            pub fn hyperplane(&self) -> Option<&LinearModel<F>> {
                self.hyperplane.as_ref()
            }

            /// Starting hyperplane over `nfeatures` features
            pub(crate) fn start(&self, nfeatures: usize) -> LinearModel<F> {
                self.hyperplane
                    .clone()
                    .unwrap_or_else(|| LinearModel::zeros(nfeatures))
            }
        }
    };
}

linear_machine_params!(
    /// Hyper-parameters of the classic perceptron
    PerceptronParams,
    PerceptronValidParams
);

linear_machine_params!(
    /// Hyper-parameters of the averaged perceptron
    AveragedPerceptronParams,
    AveragedPerceptronValidParams
);

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn invalid_learn_rates_are_rejected() {
        for rate in [0.0, -1.0, f64::NAN, f64::INFINITY].iter() {
            let res = PerceptronParams::new().learn_rate(*rate).check();
            assert!(matches!(res, Err(IterativeError::InvalidLearningRate(_))));
        }
    }

    #[test]
    fn zero_budget_is_rejected() {
        let res = AveragedPerceptronParams::<f32>::new()
            .max_iterations(0)
            .check();
        assert!(matches!(res, Err(IterativeError::InvalidMaxIterations(0))));
    }

    #[test]
    fn hyperplane_disables_initialization() {
        let params = PerceptronParams::new()
            .hyperplane(LinearModel::new(array![1.0, 2.0], 0.5))
            .check()
            .unwrap();

        assert!(!params.initialize_hyperplane());
        assert_eq!(params.start(2).bias(), 0.5);
        assert_eq!(
            PerceptronParams::<f64>::default().check_unwrap().start(3),
            LinearModel::zeros(3)
        );
    }
}
