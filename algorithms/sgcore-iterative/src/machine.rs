use ndarray::{ArrayBase, Data, Ix2};
use sgcore::dataset::{AsSingleTargets, DatasetView, Records};
use sgcore::object::{Parameter, ParameterSnapshot};
use sgcore::traits::PredictInplace;
use sgcore::{DatasetBase, Float, Parameterized, SgObject};

use crate::control::{Step, TrainingControl, TrainingOutcome};
use crate::error::{IterativeError, Result};

/// Model-specific hooks of the iterative training loop
pub trait IterativeModel<F: Float, T>: Parameterized {
    /// Prepare the solver state for a fresh run on `dataset`
    fn init_model(&mut self, dataset: &DatasetView<F, T>) -> Result<()>;

    /// Reset the transient variables of one run, called before every (resumed) run
    fn reset_computation_variables(&mut self) {}

    /// One pass of the optimizer, updates the model
    fn iteration(&mut self, dataset: &DatasetView<F, T>) -> Result<Step>;
}

/// Resumable training loop around an [`IterativeModel`]
///
/// `train` starts from scratch, `continue_train` picks up at the stored iteration counter. Raising
/// the budget with [`set_max_iterations`](IterativeMachine::set_max_iterations) and continuing
/// reaches the same state as a single run with the larger budget.
#[derive(Debug, Clone)]
pub struct IterativeMachine<M> {
    model: M,
    current_iteration: usize,
    max_iterations: usize,
    complete: bool,
}

impl<M> IterativeMachine<M> {
    pub fn new(model: M, max_iterations: usize) -> Self {
        IterativeMachine {
            model,
            current_iteration: 0,
            max_iterations,
            complete: false,
        }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut M {
        &mut self.model
    }

    pub fn into_model(self) -> M {
        self.model
    }

    pub fn current_iteration(&self) -> usize {
        self.current_iteration
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    pub fn set_max_iterations(&mut self, max_iterations: usize) {
        self.max_iterations = max_iterations;
    }

    /// Whether the model converged
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Train from scratch
    pub fn train<F, T>(
        &mut self,
        dataset: &DatasetView<F, T>,
        control: &TrainingControl,
    ) -> Result<TrainingOutcome>
    where
        F: Float,
        M: IterativeModel<F, T>,
    {
        check_shapes(dataset)?;
        self.current_iteration = 0;
        self.complete = false;
        self.model.init_model(dataset)?;

        self.continue_train(dataset, control)
    }

    /// Resume training at the current iteration
    pub fn continue_train<F, T>(
        &mut self,
        dataset: &DatasetView<F, T>,
        control: &TrainingControl,
    ) -> Result<TrainingOutcome>
    where
        F: Float,
        M: IterativeModel<F, T>,
    {
        check_shapes(dataset)?;
        self.model.reset_computation_variables();

        let mut cancelled = false;
        while self.current_iteration < self.max_iterations && !self.complete {
            if control.is_cancelled() {
                log::debug!(
                    "{}: training cancelled at iteration {}",
                    M::NAME,
                    self.current_iteration
                );
                cancelled = true;
                break;
            }

            self.complete = self.model.iteration(dataset)? == Step::Converged;
            self.current_iteration += 1;
            log::debug!(
                "{}: iteration {} of {}",
                M::NAME,
                self.current_iteration,
                self.max_iterations
            );
        }

        if self.complete {
            log::debug!(
                "{}: converged after {} iterations",
                M::NAME,
                self.current_iteration
            );
        } else if !cancelled {
            log::debug!(
                "{}: not converged within {} iterations",
                M::NAME,
                self.max_iterations
            );
        }

        Ok(TrainingOutcome {
            complete: self.complete,
            iterations: self.current_iteration,
            cancelled,
        })
    }
}

fn check_shapes<F, T>(dataset: &DatasetView<F, T>) -> Result<()> {
    let (records, targets) = (dataset.records().nrows(), dataset.targets().len());
    if records != targets {
        return Err(IterativeError::MismatchedShapes { records, targets });
    }
    if records == 0 {
        return Err(IterativeError::NotEnoughSamples);
    }

    Ok(())
}

/// View of an owned or borrowed dataset with single targets
pub(crate) fn single_target_view<'a, F, D, T>(
    dataset: &'a DatasetBase<ArrayBase<D, Ix2>, T>,
) -> DatasetView<'a, F, T::Elem>
where
    D: Data<Elem = F>,
    T: AsSingleTargets,
{
    DatasetBase::new(dataset.records().view(), dataset.as_single_targets())
}

impl<M: Parameterized> Parameterized for IterativeMachine<M> {
    const NAME: &'static str = "IterativeMachine";

    fn parameters() -> Vec<Parameter<Self>> {
        vec![
            Parameter::new(
                "current_iteration",
                "Iterations done so far",
                |s: &Self| s.current_iteration,
                |s: &mut Self, v: usize| s.current_iteration = v,
            )
            .not_available(),
            Parameter::new(
                "max_iterations",
                "Maximum number of iterations",
                |s: &Self| s.max_iterations,
                |s: &mut Self, v: usize| s.max_iterations = v,
            ),
            Parameter::new(
                "complete",
                "Whether the model converged",
                |s: &Self| s.complete,
                |s: &mut Self, v: bool| s.complete = v,
            )
            .not_available(),
            Parameter::with_validation(
                "model",
                "Trained model",
                |s: &Self| s.model.save_parameters(),
                |s: &mut Self, v: ParameterSnapshot| s.model.load_parameters(&v),
            )
            .not_available(),
        ]
    }

    fn new_instance(&self) -> sgcore::error::Result<Self> {
        Ok(IterativeMachine::new(
            self.model.new_instance()?,
            self.max_iterations,
        ))
    }
}

impl<R: Records, T, M: PredictInplace<R, T>> PredictInplace<R, T> for IterativeMachine<M> {
    fn predict_inplace<'a>(&'a self, x: &'a R, y: &mut T) {
        self.model.predict_inplace(x, y)
    }

    fn default_target(&self, x: &R) -> T {
        self.model.default_target(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::CancelHandle;
    use ndarray::{array, Array1, Array2};
    use sgcore::dataset::dataset;
    use sgcore::object::{clone_parameterized, ParameterValue};

    /// Converges after `needed` iterations, optionally cancelling its own run
    #[derive(Debug, Default)]
    struct Countdown {
        needed: usize,
        done: usize,
        inits: usize,
        resets: usize,
        cancel_at: Option<(usize, CancelHandle)>,
    }

    impl Countdown {
        fn new(needed: usize) -> Self {
            Countdown {
                needed,
                ..Countdown::default()
            }
        }
    }

    impl Parameterized for Countdown {
        const NAME: &'static str = "Countdown";

        fn parameters() -> Vec<Parameter<Self>> {
            vec![
                Parameter::new(
                    "needed",
                    "iterations until convergence",
                    |s: &Self| s.needed,
                    |s: &mut Self, v: usize| s.needed = v,
                ),
                Parameter::new(
                    "done",
                    "iterations done",
                    |s: &Self| s.done,
                    |s: &mut Self, v: usize| s.done = v,
                ),
            ]
        }

        fn new_instance(&self) -> sgcore::error::Result<Self> {
            Ok(Countdown::default())
        }
    }

    impl IterativeModel<f64, bool> for Countdown {
        fn init_model(&mut self, _: &DatasetView<f64, bool>) -> Result<()> {
            self.done = 0;
            self.inits += 1;
            Ok(())
        }

        fn reset_computation_variables(&mut self) {
            self.resets += 1;
        }

        fn iteration(&mut self, _: &DatasetView<f64, bool>) -> Result<Step> {
            self.done += 1;
            if let Some((at, handle)) = &self.cancel_at {
                if *at == self.done {
                    handle.cancel();
                }
            }

            Ok(if self.done >= self.needed {
                Step::Converged
            } else {
                Step::Continue
            })
        }
    }

    fn data() -> sgcore::Dataset<f64, bool> {
        dataset(array![[1.0], [2.0]], array![true, false])
    }

    #[test]
    fn converges_after_k_iterations() {
        let data = data();
        let mut machine = IterativeMachine::new(Countdown::new(4), 10);
        let outcome = machine.train(&data.view(), &TrainingControl::new()).unwrap();

        assert_eq!(
            outcome,
            TrainingOutcome {
                complete: true,
                iterations: 4,
                cancelled: false
            }
        );
        assert_eq!(machine.current_iteration(), 4);
        assert!(machine.is_complete());
    }

    #[test]
    fn budget_exhausted_then_resumed() {
        let data = data();
        let control = TrainingControl::new();
        let mut machine = IterativeMachine::new(Countdown::new(7), 3);

        let outcome = machine.train(&data.view(), &control).unwrap();
        assert!(outcome.is_exhausted());
        assert_eq!(outcome.iterations, 3);

        machine.set_max_iterations(20);
        let outcome = machine.continue_train(&data.view(), &control).unwrap();
        assert!(outcome.complete);
        assert_eq!(outcome.iterations, 7);
        assert_eq!(machine.model().inits, 1);
        assert_eq!(machine.model().resets, 2);
    }

    #[test]
    fn train_restarts_from_zero() {
        let data = data();
        let control = TrainingControl::new();
        let mut machine = IterativeMachine::new(Countdown::new(2), 5);

        machine.train(&data.view(), &control).unwrap();
        let outcome = machine.train(&data.view(), &control).unwrap();
        assert_eq!(outcome.iterations, 2);
        assert_eq!(machine.model().inits, 2);

        // a converged machine does not iterate on continue
        let outcome = machine.continue_train(&data.view(), &control).unwrap();
        assert_eq!(outcome.iterations, 2);
        assert_eq!(machine.model().done, 2);
    }

    #[test]
    fn cancellation_stops_before_next_iteration() {
        let data = data();
        let control = TrainingControl::new();
        let mut model = Countdown::new(10);
        model.cancel_at = Some((3, control.cancel_handle()));
        let mut machine = IterativeMachine::new(model, 20);

        let outcome = machine.train(&data.view(), &control).unwrap();
        assert_eq!(
            outcome,
            TrainingOutcome {
                complete: false,
                iterations: 3,
                cancelled: true
            }
        );
        assert_eq!(machine.model().done, 3);

        control.reset();
        machine.model_mut().cancel_at = None;
        let outcome = machine.continue_train(&data.view(), &control).unwrap();
        assert!(outcome.complete);
        assert_eq!(outcome.iterations, 10);
    }

    #[test]
    fn mismatched_dataset_is_rejected() {
        let records = Array2::<f64>::zeros((3, 1));
        let targets = Array1::from(vec![true, false]);
        let data = DatasetBase::new(records.view(), targets.view());

        let mut machine = IterativeMachine::new(Countdown::new(1), 1);
        assert!(matches!(
            machine.train(&data, &TrainingControl::new()),
            Err(IterativeError::MismatchedShapes {
                records: 3,
                targets: 2
            })
        ));
    }

    #[test]
    fn loop_state_is_registered() {
        let data = data();
        let mut machine = IterativeMachine::new(Countdown::new(3), 8);
        machine.train(&data.view(), &TrainingControl::new()).unwrap();

        assert_eq!(
            machine.get_parameter("current_iteration").unwrap(),
            ParameterValue::Int(3)
        );
        assert_eq!(
            machine.get_parameter("complete").unwrap(),
            ParameterValue::Bool(true)
        );

        let cloned = clone_parameterized(&machine).unwrap();
        assert_eq!(cloned.current_iteration(), 3);
        assert_eq!(cloned.max_iterations(), 8);
        assert_eq!(cloned.model().done, 3);
        assert_eq!(cloned.model().needed, 3);
    }
}
