use approx::assert_abs_diff_eq;
use ndarray::{Array1, Array2};
use ndarray_rand::rand::SeedableRng;
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand_xoshiro::Xoshiro256Plus;
use sgcore::SgObject;
use sgcore_linalg::linsolver::{
    CgmShiftedFamilySolver, ConjugateGradientSolver, DirectLinearSolver, DirectSolverType,
    LinearSolver,
};
use sgcore_linalg::operator::{DenseMatrixOperator, LinearOperator};

const STRATEGIES: [DirectSolverType; 5] = [
    DirectSolverType::Llt,
    DirectSolverType::QrNoPerm,
    DirectSolverType::QrColPerm,
    DirectSolverType::QrFullPerm,
    DirectSolverType::Svd,
];

fn spd_system(n: usize, seed: u64) -> (Array2<f64>, Array1<f64>) {
    let mut rng = Xoshiro256Plus::seed_from_u64(seed);
    let m = Array2::random_using((n, n), Uniform::new(-1., 1.), &mut rng);
    let a = m.t().dot(&m) + Array2::<f64>::eye(n) * n as f64;
    let b = Array1::random_using(n, Uniform::new(-5., 5.), &mut rng);

    (a, b)
}

#[test]
fn all_strategies_solve_and_agree() {
    let (a, b) = spd_system(8, 42);
    let op = DenseMatrixOperator::new(a.clone()).unwrap();

    let solutions: Vec<Array1<f64>> = STRATEGIES
        .iter()
        .map(|strategy| {
            DirectLinearSolver::new(*strategy)
                .solve(&op, b.view())
                .unwrap()
        })
        .collect();

    let b_norm = b.dot(&b).sqrt();
    for x in &solutions {
        let residual = a.dot(x) - &b;
        assert!(residual.dot(&residual).sqrt() / b_norm < 1e-8);
        assert_abs_diff_eq!(x, &solutions[0], epsilon = 1e-8);
    }
}

#[test]
fn iterative_solvers_agree_with_direct() {
    let (a, b) = spd_system(10, 7);
    let op = DenseMatrixOperator::new(a).unwrap();
    let expected = DirectLinearSolver::default().solve(&op, b.view()).unwrap();

    let solvers: Vec<Box<dyn LinearSolver<f64>>> = vec![
        Box::new(ConjugateGradientSolver::default()),
        Box::new(CgmShiftedFamilySolver::default()),
    ];
    for solver in &solvers {
        let x = solver.solve(&op, b.view()).unwrap();
        assert_abs_diff_eq!(x, expected, epsilon = 1e-7);
    }
}

#[test]
fn solver_objects_clone_through_their_schema() {
    let solver = DirectLinearSolver::new(DirectSolverType::QrFullPerm);
    let cloned = solver.clone_object().unwrap();

    assert_eq!(cloned.name(), "DirectLinearSolver");
    assert_eq!(
        cloned.as_any().downcast_ref::<DirectLinearSolver>().map(|s| s.solver_type()),
        Some(DirectSolverType::QrFullPerm)
    );
}

#[test]
fn operator_dimension_is_checked_before_solving() {
    let (a, _) = spd_system(4, 1);
    let op = DenseMatrixOperator::new(a).unwrap();
    assert_eq!(op.dimension(), 4);

    for strategy in &STRATEGIES {
        assert!(DirectLinearSolver::new(*strategy)
            .solve(&op, Array1::zeros(3).view())
            .is_err());
    }
}
