use ndarray::{Array1, Array2, Axis};
use ndarray_rand::rand::SeedableRng;
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand_xoshiro::Xoshiro256Plus;
use sgcore::dataset::dataset;
use sgcore::object::clone_parameterized;
use sgcore::traits::{Fit, FitWith, Predict};
use sgcore::{Dataset, SgObject};
use sgcore_iterative::{AveragedPerceptron, Perceptron, TrainingControl};

/// Points of the unit square labelled by the side of `x + 2y = 0.1`, with a margin around the line
fn separable(n: usize, seed: u64) -> Dataset<f64, bool> {
    let mut rng = Xoshiro256Plus::seed_from_u64(seed);
    let candidates = Array2::random_using((4 * n, 2), Uniform::new(-1f64, 1.), &mut rng);

    let keep: Vec<usize> = candidates
        .outer_iter()
        .enumerate()
        .filter(|(_, x)| (x[0] + 2.0 * x[1] - 0.1).abs() > 0.2)
        .map(|(i, _)| i)
        .take(n)
        .collect();
    let records = candidates.select(Axis(0), &keep);
    let targets = records
        .outer_iter()
        .map(|x| x[0] + 2.0 * x[1] - 0.1 > 0.0)
        .collect::<Array1<_>>();

    dataset(records, targets)
}

fn accuracy(predicted: &Array1<bool>, expected: &Array1<bool>) -> f64 {
    let hits = predicted
        .iter()
        .zip(expected.iter())
        .filter(|(a, b)| a == b)
        .count();
    hits as f64 / expected.len() as f64
}

#[test]
fn perceptron_separates_separable_data() {
    let data = separable(200, 42);
    let machine = Perceptron::params()
        .max_iterations(5000)
        .fit(&data)
        .unwrap();

    assert!(machine.is_complete());
    assert!(machine.current_iteration() < 5000);
    assert_eq!(&machine.predict(data.records()), data.targets());
}

#[test]
fn averaged_perceptron_generalizes() {
    let train = separable(200, 1);
    let test = separable(100, 2);
    let machine = AveragedPerceptron::params()
        .max_iterations(5000)
        .fit(&train)
        .unwrap();

    assert!(machine.is_complete());
    assert!(accuracy(&machine.predict(test.records()), test.targets()) > 0.9);
}

#[test]
fn resumed_training_matches_a_single_run() {
    let data = separable(100, 7);
    let params = Perceptron::params().learn_rate(0.5);

    let single = params.clone().max_iterations(5000).fit(&data).unwrap();

    let mut machine = params.clone().max_iterations(1).fit(&data).unwrap();
    while !machine.is_complete() {
        let budget = machine.current_iteration() + 1;
        machine = params
            .clone()
            .max_iterations(budget)
            .fit_with(machine, &data)
            .unwrap();
    }

    assert_eq!(machine.current_iteration(), single.current_iteration());
    assert_eq!(machine.model(), single.model());
}

#[test]
fn cloned_machine_continues_identically() {
    let data = separable(100, 11);
    let params = AveragedPerceptron::params().learn_rate(0.25);

    let partial = params.clone().max_iterations(2).fit(&data).unwrap();
    let cloned = clone_parameterized(&partial).unwrap();
    assert_eq!(
        cloned.save_parameters().get("current_iteration"),
        partial.save_parameters().get("current_iteration")
    );

    let a = params.clone().max_iterations(5000).fit_with(partial, &data).unwrap();
    let b = params.max_iterations(5000).fit_with(cloned, &data).unwrap();
    assert_eq!(a.current_iteration(), b.current_iteration());
    assert_eq!(a.model(), b.model());
}

#[test]
fn cancelled_run_keeps_its_counter() {
    let data = separable(50, 3);
    let params = Perceptron::<f64>::params().max_iterations(5000);
    let mut machine = sgcore::ParamGuard::check(params).unwrap().machine(2);

    let control = TrainingControl::new();
    let handle = control.cancel_handle();
    std::thread::spawn(move || handle.cancel()).join().unwrap();

    let outcome = machine.train(&data.view(), &control).unwrap();
    assert!(outcome.cancelled);
    assert!(!outcome.complete);
    assert_eq!(machine.current_iteration(), 0);

    control.reset();
    let outcome = machine.continue_train(&data.view(), &control).unwrap();
    assert!(outcome.complete);
}
