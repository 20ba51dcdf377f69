use thiserror::Error;

pub type Result<T> = std::result::Result<T, IterativeError>;

#[derive(Error, Debug, Clone)]
pub enum IterativeError {
    #[error("learning rate should be positive and finite, but is {0}")]
    InvalidLearningRate(f32),
    #[error("maximum number of iterations should be positive, but is {0}")]
    InvalidMaxIterations(usize),
    #[error("{records} records do not match {targets} targets")]
    MismatchedShapes { records: usize, targets: usize },
    #[error("model was trained with {expected} features, but the data has {found}")]
    MismatchedFeatures { expected: usize, found: usize },
    #[error("not enough samples to train on")]
    NotEnoughSamples,
    #[error(transparent)]
    BaseCrate(#[from] sgcore::Error),
}
