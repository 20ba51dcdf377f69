use ndarray::{Array1, ArrayBase, Data, Ix2};
use sgcore::dataset::{AsSingleTargets, DatasetView};
use sgcore::object::Parameter;
use sgcore::traits::{Fit, FitWith, PredictInplace};
use sgcore::{DatasetBase, Float, Parameterized};

use crate::control::{Step, TrainingControl};
use crate::error::{IterativeError, Result};
use crate::hyperparams::AveragedPerceptronValidParams;
use crate::linear::{label, LinearModel};
use crate::machine::{single_target_view, IterativeMachine, IterativeModel};

/// Perceptron predicting with the mean of all intermediate hyperplanes
///
/// The running hyperplane follows the perceptron rule, after every visited sample it is added to
/// an accumulator. Predictions use the average, which is far less sensitive to the last few
/// updates than the running hyperplane.
#[derive(Debug, Clone, PartialEq)]
pub struct AveragedPerceptron<F> {
    average: LinearModel<F>,
    current: LinearModel<F>,
    sum: LinearModel<F>,
    num_visits: usize,
    learn_rate: F,
    initialize_hyperplane: bool,
}

impl<F: Float> AveragedPerceptron<F> {
    pub fn new(start: LinearModel<F>, learn_rate: F, initialize_hyperplane: bool) -> Self {
        let nfeatures = start.nfeatures();
        AveragedPerceptron {
            average: start.clone(),
            current: start,
            sum: LinearModel::zeros(nfeatures),
            num_visits: 0,
            learn_rate,
            initialize_hyperplane,
        }
    }

    /// The averaged hyperplane
    pub fn model(&self) -> &LinearModel<F> {
        &self.average
    }

    /// The running hyperplane of the perceptron rule
    pub fn current(&self) -> &LinearModel<F> {
        &self.current
    }

    pub fn learn_rate(&self) -> F {
        self.learn_rate
    }

    pub fn set_learn_rate(&mut self, learn_rate: F) {
        self.learn_rate = learn_rate;
    }
}

impl<F: Float> IterativeModel<F, bool> for AveragedPerceptron<F> {
    fn init_model(&mut self, dataset: &DatasetView<F, bool>) -> Result<()> {
        let nfeatures = dataset.records().ncols();
        if self.initialize_hyperplane {
            let uniform = F::one() / F::cast(nfeatures.max(1));
            self.current = LinearModel::new(Array1::from_elem(nfeatures, uniform), F::zero());
        } else {
            self.current.check_features(nfeatures)?;
        }
        self.average = self.current.clone();
        self.sum = LinearModel::zeros(nfeatures);
        self.num_visits = 0;

        Ok(())
    }

    fn iteration(&mut self, dataset: &DatasetView<F, bool>) -> Result<Step> {
        let (records, targets) = dataset.as_parts();
        self.current.check_features(records.ncols())?;

        let mut converged = true;
        for (x, y) in records.outer_iter().zip(targets.iter()) {
            let y = label::<F>(*y);
            if y * self.current.decision(&x) <= F::zero() {
                let step = self.learn_rate * y;
                self.current.w.scaled_add(step, &x);
                self.current.bias += step;
                converged = false;
            }

            self.sum.w += &self.current.w;
            self.sum.bias += self.current.bias;
            self.num_visits += 1;
        }

        let visits = F::cast(self.num_visits);
        self.average = LinearModel::new(&self.sum.w / visits, self.sum.bias / visits);

        Ok(if converged {
            Step::Converged
        } else {
            Step::Continue
        })
    }
}

impl<F: Float> Parameterized for AveragedPerceptron<F> {
    const NAME: &'static str = "AveragedPerceptron";

    fn parameters() -> Vec<Parameter<Self>> {
        vec![
            Parameter::new(
                "w",
                "Normal vector of the averaged hyperplane",
                |s: &Self| s.average.w.clone(),
                |s: &mut Self, v: Array1<F>| s.average.w = v,
            )
            .not_available(),
            Parameter::new(
                "bias",
                "Offset of the averaged hyperplane",
                |s: &Self| s.average.bias,
                |s: &mut Self, v: F| s.average.bias = v,
            )
            .not_available(),
            Parameter::new(
                "current_w",
                "Normal vector of the running hyperplane",
                |s: &Self| s.current.w.clone(),
                |s: &mut Self, v: Array1<F>| s.current.w = v,
            )
            .not_available(),
            Parameter::new(
                "current_bias",
                "Offset of the running hyperplane",
                |s: &Self| s.current.bias,
                |s: &mut Self, v: F| s.current.bias = v,
            )
            .not_available(),
            Parameter::new(
                "sum_w",
                "Accumulated normal vectors",
                |s: &Self| s.sum.w.clone(),
                |s: &mut Self, v: Array1<F>| s.sum.w = v,
            )
            .not_available(),
            Parameter::new(
                "sum_bias",
                "Accumulated offsets",
                |s: &Self| s.sum.bias,
                |s: &mut Self, v: F| s.sum.bias = v,
            )
            .not_available(),
            Parameter::new(
                "num_visits",
                "Number of accumulated hyperplanes",
                |s: &Self| s.num_visits,
                |s: &mut Self, v: usize| s.num_visits = v,
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
        Ok(AveragedPerceptron::new(
            LinearModel::zeros(0),
            F::cast(0.1),
            true,
        ))
    }
}

impl<F: Float, D: Data<Elem = F>> PredictInplace<ArrayBase<D, Ix2>, Array1<bool>>
    for AveragedPerceptron<F>
{
    fn predict_inplace(&self, x: &ArrayBase<D, Ix2>, y: &mut Array1<bool>) {
        self.average.predict_inplace(x, y)
    }

    fn default_target(&self, x: &ArrayBase<D, Ix2>) -> Array1<bool> {
        self.average.default_target(x)
    }
}

impl<F: Float> AveragedPerceptronValidParams<F> {
    /// Untrained machine over `nfeatures` features, to be driven with an explicit control
    pub fn machine(&self, nfeatures: usize) -> IterativeMachine<AveragedPerceptron<F>> {
        let start = self.start(nfeatures);
        IterativeMachine::new(
            AveragedPerceptron::new(start, self.learn_rate(), self.initialize_hyperplane()),
            self.max_iterations(),
        )
    }
}

impl<F, D, T> Fit<ArrayBase<D, Ix2>, T, IterativeError> for AveragedPerceptronValidParams<F>
where
    F: Float,
    D: Data<Elem = F>,
    T: AsSingleTargets<Elem = bool>,
{
    type Object = IterativeMachine<AveragedPerceptron<F>>;

    fn fit(&self, dataset: &DatasetBase<ArrayBase<D, Ix2>, T>) -> Result<Self::Object> {
        let view = single_target_view(dataset);
        let mut machine = self.machine(view.records().ncols());
        machine.train(&view, &TrainingControl::default())?;

        Ok(machine)
    }
}

impl<'a, F, D, T> FitWith<'a, ArrayBase<D, Ix2>, T, IterativeError>
    for AveragedPerceptronValidParams<F>
where
    F: Float,
    D: Data<Elem = F>,
    T: AsSingleTargets<Elem = bool>,
{
    type ObjectIn = IterativeMachine<AveragedPerceptron<F>>;
    type ObjectOut = IterativeMachine<AveragedPerceptron<F>>;

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
    use crate::hyperparams::AveragedPerceptronParams;
    use approx::assert_abs_diff_eq;
    use ndarray::array;
    use sgcore::dataset::dataset;
    use sgcore::object::clone_parameterized;
    use sgcore::traits::Predict;

    fn line() -> sgcore::Dataset<f64, bool> {
        dataset(
            array![[1.0], [2.0], [-1.0], [-2.0]],
            array![true, true, false, false],
        )
    }

    #[test]
    fn averages_every_visited_hyperplane() {
        let machine = AveragedPerceptronParams::new()
            .learn_rate(1.0)
            .initialize_hyperplane(false)
            .fit(&line())
            .unwrap();

        // running hyperplanes (w, b): (1, 1), (1, 1), (2, 0), (2, 0) then four times (2, 0)
        assert!(machine.is_complete());
        assert_eq!(machine.current_iteration(), 2);
        assert_abs_diff_eq!(machine.model().current().w()[0], 2.0);
        assert_abs_diff_eq!(machine.model().model().w()[0], 1.75);
        assert_abs_diff_eq!(machine.model().model().bias(), 0.25);

        assert_eq!(
            machine.predict(&array![[1.0], [-1.0]]),
            array![true, false]
        );
    }

    #[test]
    fn clone_keeps_the_accumulators() {
        let data = line();
        let params = AveragedPerceptronParams::new()
            .learn_rate(1.0)
            .initialize_hyperplane(false);

        let short = params.clone().max_iterations(1).fit(&data).unwrap();
        let cloned = clone_parameterized(&short).unwrap();
        assert_eq!(cloned.model(), short.model());

        let resumed = params.clone().fit_with(cloned, &data).unwrap();
        let single = params.fit(&data).unwrap();
        assert_eq!(resumed.current_iteration(), 2);
        assert_eq!(resumed.model(), single.model());
    }
}
