//! Error types in sgcore
//!

use thiserror::Error;

use ndarray::ShapeError;

use crate::object::parameter::ParameterKind;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone)]
pub enum Error {
    #[error("invalid parameter {0}")]
    Parameters(String),
    #[error("algorithm not converged {0}")]
    NotConverged(String),
    #[error("invalid ndarray shape {0}")]
    NdShape(#[from] ShapeError),
    #[error("{object} has no registered parameter `{name}`")]
    UnknownParameter { object: &'static str, name: String },
    #[error("parameter `{name}` is registered as {expected}, got {found}")]
    ParameterKind {
        name: String,
        expected: ParameterKind,
        found: ParameterKind,
    },
    #[error("parameters of {found} cannot be loaded into {expected}")]
    ObjectMismatch {
        expected: &'static str,
        found: String,
    },
    #[error("index {index} out of bounds for length {len}")]
    IndexOutOfBounds { index: usize, len: usize },
    #[error("not implemented: {0}")]
    NotImplemented(String),
}
