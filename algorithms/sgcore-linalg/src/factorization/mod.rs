//! Dense factorizations
//!
//! The symmetric eigen-decomposition wraps `linfa-linalg` and orders the spectrum, the pivoted
//! Householder QR reveals the numerical rank of the direct solver's operator.
mod eigh;
mod qr;

pub use eigh::SymmetricEigen;
pub use qr::{Pivoting, Qr};
