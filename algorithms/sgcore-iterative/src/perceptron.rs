use ndarray::{Array1, ArrayBase, Data, Ix2};
use sgcore::dataset::{AsSingleTargets, DatasetView};
use sgcore::object::Parameter;
use sgcore::traits::{Fit, FitWith, PredictInplace};
use sgcore::{DatasetBase, Float, Parameterized};

use crate::control::{Step, TrainingControl};
use crate::error::{IterativeError, Result};
use crate::hyperparams::PerceptronValidParams;
use crate::linear::{label, LinearModel};
use crate::machine::{single_target_view, IterativeMachine, IterativeModel};

/// Rosenblatt perceptron
///
/// Every pass visits the samples in order and moves the hyperplane towards each misclassified
/// one. A pass without mistakes converges, which happens after finitely many passes on linearly
/// separable data.
#[derive(Debug, Clone, PartialEq)]
pub struct Perceptron<F> {
    model: LinearModel<F>,
    learn_rate: F,
    initialize_hyperplane: bool,
}

impl<F: Float> Perceptron<F> {
    pub fn new(start: LinearModel<F>, learn_rate: F, initialize_hyperplane: bool) -> Self {
        Perceptron {
            model: start,
            learn_rate,
            initialize_hyperplane,
        }
    }

    pub fn model(&self) -> &LinearModel<F> {
        &self.model
    }

    pub fn learn_rate(&self) -> F {
        self.learn_rate
    }

    pub fn set_learn_rate(&mut self, learn_rate: F) {
        self.learn_rate = learn_rate;
    }
}

impl<F: Float> IterativeModel<F, bool> for Perceptron<F> {
    fn init_model(&mut self, dataset: &DatasetView<F, bool>) -> Result<()> {
        let nfeatures = dataset.records().ncols();
        if self.initialize_hyperplane {
            let uniform = F::one() / F::cast(nfeatures.max(1));
            self.model = LinearModel::new(Array1::from_elem(nfeatures, uniform), F::zero());
        } else {
            self.model.check_features(nfeatures)?;
        }

        Ok(())
    }

    fn iteration(&mut self, dataset: &DatasetView<F, bool>) -> Result<Step> {
        let (records, targets) = dataset.as_parts();
        self.model.check_features(records.ncols())?;

        let mut converged = true;
        for (x, y) in records.outer_iter().zip(targets.iter()) {
            let y = label::<F>(*y);
            if y * self.model.decision(&x) <= F::zero() {
                let step = self.learn_rate * y;
                self.model.w.scaled_add(step, &x);
                self.model.bias += step;
                converged = false;
            }
        }

        Ok(if converged {
            Step::Converged
        } else {
            Step::Continue
        })
    }
}

impl<F: Float> Parameterized for Perceptron<F> {
    const NAME: &'static str = "Perceptron";

    fn parameters() -> Vec<Parameter<Self>> {
        vec![
            Parameter::new(
                "w",
                "Normal vector of the hyperplane",
                |s: &Self| s.model.w.clone(),
                |s: &mut Self, v: Array1<F>| s.model.w = v,
            )
            .not_available(),
            Parameter::new(
                "bias",
                "Offset of the hyperplane",
                |s: &Self| s.model.bias,
                |s: &mut Self, v: F| s.model.bias = v,
            )
            .not_available(),
            Parameter::new(
                "learn_rate",
                "Step size of an update",
                |s: &Self| s.learn_rate,
                |s: &mut Self, v: F| s.learn_rate = v,
            ),
            Parameter::new(
                "initialize_hyperplane",
                "Start every training run from a uniform hyperplane",
                |s: &Self| s.initialize_hyperplane,
                |s: &mut Self, v: bool| s.initialize_hyperplane = v,
            ),
        ]
    }

    fn new_instance(&self) -> sgcore::error::Result<Self> {
        Ok(Perceptron::new(
            LinearModel::zeros(0),
            F::cast(0.1),
            true,
        ))
    }
}

impl<F: Float, D: Data<Elem = F>> PredictInplace<ArrayBase<D, Ix2>, Array1<bool>>
    for Perceptron<F>
{
    fn predict_inplace(&self, x: &ArrayBase<D, Ix2>, y: &mut Array1<bool>) {
        self.model.predict_inplace(x, y)
    }

    fn default_target(&self, x: &ArrayBase<D, Ix2>) -> Array1<bool> {
        self.model.default_target(x)
    }
}

impl<F: Float> PerceptronValidParams<F> {
    /// Untrained machine over `nfeatures` features, to be driven with an explicit control
    pub fn machine(&self, nfeatures: usize) -> IterativeMachine<Perceptron<F>> {
        let start = self.start(nfeatures);
        IterativeMachine::new(
            Perceptron::new(start, self.learn_rate(), self.initialize_hyperplane()),
            self.max_iterations(),
        )
    }
}

impl<F, D, T> Fit<ArrayBase<D, Ix2>, T, IterativeError> for PerceptronValidParams<F>
where
    F: Float,
    D: Data<Elem = F>,
    T: AsSingleTargets<Elem = bool>,
{
    type Object = IterativeMachine<Perceptron<F>>;

    /// Train a perceptron on a feature matrix of shape `(n_samples, n_features)` and boolean
    /// targets of shape `(n_samples)`.
    ///
    /// Returns the machine even when the iteration budget runs out, check
    /// [`is_complete`](IterativeMachine::is_complete) for convergence.
    fn fit(&self, dataset: &DatasetBase<ArrayBase<D, Ix2>, T>) -> Result<Self::Object> {
        let view = single_target_view(dataset);
        let mut machine = self.machine(view.records().ncols());
        machine.train(&view, &TrainingControl::default())?;

        Ok(machine)
    }
}

impl<'a, F, D, T> FitWith<'a, ArrayBase<D, Ix2>, T, IterativeError> for PerceptronValidParams<F>
where
    F: Float,
    D: Data<Elem = F>,
    T: AsSingleTargets<Elem = bool>,
{
    type ObjectIn = IterativeMachine<Perceptron<F>>;
    type ObjectOut = IterativeMachine<Perceptron<F>>;

    /// Continue training an existing machine with the budget and learning rate of these
    /// parameters
    fn fit_with(
        &self,
        mut machine: Self::ObjectIn,
        dataset: &'a DatasetBase<ArrayBase<D, Ix2>, T>,
    ) -> Result<Self::ObjectOut> {
        let view = single_target_view(dataset);
        machine.set_max_iterations(self.max_iterations());
        machine.model_mut().set_learn_rate(self.learn_rate());
        machine.continue_train(&view, &TrainingControl::default())?;

        Ok(machine)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hyperparams::PerceptronParams;
    use approx::assert_abs_diff_eq;
    use ndarray::array;
    use sgcore::dataset::dataset;
    use sgcore::traits::Predict;
    use sgcore::ParamGuard;

    fn line() -> sgcore::Dataset<f64, bool> {
        dataset(
            array![[1.0], [2.0], [-1.0], [-2.0]],
            array![true, true, false, false],
        )
    }

    #[test]
    fn uniform_start_separates_immediately() {
        let machine = PerceptronParams::new().learn_rate(1.0).fit(&line()).unwrap();

        assert!(machine.is_complete());
        assert_eq!(machine.current_iteration(), 1);
        assert_abs_diff_eq!(machine.model().model().w(), &array![1.0]);
    }

    #[test]
    fn zero_start_follows_the_update_rule() {
        let machine = PerceptronParams::new()
            .learn_rate(1.0)
            .initialize_hyperplane(false)
            .fit(&line())
            .unwrap();

        // mistakes on the first and third sample of the first pass, none in the second
        assert!(machine.is_complete());
        assert_eq!(machine.current_iteration(), 2);
        assert_abs_diff_eq!(machine.model().model().w(), &array![2.0]);
        assert_abs_diff_eq!(machine.model().model().bias(), 0.0);

        let x = array![[0.5], [-0.5], [10.0]];
        assert_eq!(machine.predict(&x), array![true, false, true]);
    }

    #[test]
    fn existing_hyperplane_must_match_features() {
        let res = PerceptronParams::new()
            .hyperplane(LinearModel::new(array![1.0, 1.0], 0.0))
            .fit(&line());

        assert!(matches!(
            res,
            Err(IterativeError::MismatchedFeatures {
                expected: 2,
                found: 1
            })
        ));
    }

    #[test]
    fn fit_with_resumes_an_exhausted_run() {
        let data = line();
        let params = PerceptronParams::new()
            .learn_rate(1.0)
            .initialize_hyperplane(false);

        let short = params.clone().max_iterations(1).fit(&data).unwrap();
        assert!(!short.is_complete());
        assert_eq!(short.current_iteration(), 1);

        let resumed = params.clone().fit_with(short, &data).unwrap();
        let single = params.fit(&data).unwrap();

        assert!(resumed.is_complete());
        assert_eq!(resumed.current_iteration(), single.current_iteration());
        assert_eq!(resumed.model(), single.model());
    }

    #[test]
    fn explicit_control_drives_the_machine() {
        let data = line();
        let params = PerceptronParams::new().check().unwrap();
        let mut machine = params.machine(1);

        let control = TrainingControl::new();
        control.cancel_handle().cancel();
        let outcome = machine.train(&data.view(), &control).unwrap();

        assert!(outcome.cancelled);
        assert_eq!(outcome.iterations, 0);
        assert!(!machine.is_complete());
    }
}
