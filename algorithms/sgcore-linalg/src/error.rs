use thiserror::Error;

pub type Result<T> = std::result::Result<T, LinalgError>;

#[derive(Error, Debug)]
pub enum LinalgError {
    #[error("operator of dimension {operator} applied to a vector of length {rhs}")]
    DimensionMismatch { operator: usize, rhs: usize },
    #[error("matrix must be square, but is {rows}x{cols}")]
    NotSquare { rows: usize, cols: usize },
    #[error("{solver} cannot handle {operator} operators")]
    UnsupportedOperator {
        solver: &'static str,
        operator: &'static str,
    },
    #[error("{solver} did not converge within {iterations} iterations")]
    NotConverged {
        solver: &'static str,
        iterations: usize,
    },
    #[error("eigenvalue bounds [{min}, {max}] do not describe a positive definite operator")]
    InvalidEigenvalues { min: f64, max: f64 },
    #[error("accuracy should be in range (0, 1), but is {0}")]
    InvalidAccuracy(f64),
    #[error("shift must be finite and non-negative, but is {0}")]
    InvalidShift(f64),
    #[error("operator has no rows")]
    EmptyOperator,
    #[error("trace sampler produces no sample vectors")]
    NoTraceSamples,
    #[error("decomposition did not return singular vectors")]
    MissingSingularVectors,
    #[error(transparent)]
    Decomposition(#[from] linfa_linalg::LinalgError),
    #[error(transparent)]
    BaseCrate(#[from] sgcore::Error),
}
