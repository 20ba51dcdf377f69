//! Datasets
//!
//! This module implements the dataset struct and the helper traits the training algorithms use
//! to access records and targets.
use ndarray::{
    Array1, Array2, ArrayBase, ArrayView1, ArrayView2, Ix1, Ix2, NdFloat, OwnedRepr,
    ScalarOperand,
};

use num_traits::{AsPrimitive, FromPrimitive, NumAssignOps, NumCast, Signed};
use rand::distributions::uniform::SampleUniform;

use std::cmp::PartialOrd;
use std::fmt;
use std::iter::Sum;
use std::ops::{AddAssign, DivAssign, MulAssign, SubAssign};

use crate::object::parameter::ParameterType;

mod impl_dataset;
mod impl_records;
mod impl_targets;

/// Floating point numbers
///
/// This trait bound multiplexes to the most common assumption of floating point number and
/// implement them for 32bit and 64bit floating points. They are used in records of a dataset,
/// in linear operators and, as registered parameters, in the state of every object.
pub trait Float:
    NdFloat
    + FromPrimitive
    + num_traits::Float
    + PartialOrd
    + Sync
    + Send
    + Default
    + fmt::Display
    + fmt::Debug
    + Signed
    + Sum
    + NumAssignOps
    + AsPrimitive<usize>
    + for<'a> AddAssign<&'a Self>
    + for<'a> MulAssign<&'a Self>
    + for<'a> SubAssign<&'a Self>
    + for<'a> DivAssign<&'a Self>
    + num_traits::MulAdd<Output = Self>
    + SampleUniform
    + ScalarOperand
    + approx::AbsDiffEq
    + ParameterType
    + 'static
{
    fn cast<T: NumCast>(x: T) -> Self {
        NumCast::from(x).unwrap()
    }

    /// Lossless for `f32` and `f64`
    fn as_f64(self) -> f64 {
        num_traits::ToPrimitive::to_f64(&self).unwrap_or(f64::NAN)
    }
}

impl Float for f32 {}

impl Float for f64 {}

/// DatasetBase
///
/// This is the fundamental structure of a dataset. It contains a number of records about the
/// data and the targets the records are mapped to.
///
/// # Fields
///
/// * `records`: a two-dimensional matrix with dimensionality (nsamples, nfeatures)
/// * `targets`: a one-dimensional array with dimensionality (nsamples)
#[derive(Debug, Clone)]
pub struct DatasetBase<R, T>
where
    R: Records,
{
    pub records: R,
    pub targets: T,
}

/// Dataset
///
/// The most commonly used type of dataset. Records are stored as an `Array2` and every record
/// corresponds to a single target stored in an `Array1`.
pub type Dataset<D, T> = DatasetBase<ArrayBase<OwnedRepr<D>, Ix2>, ArrayBase<OwnedRepr<T>, Ix1>>;

/// DatasetView
///
/// A read only view of a Dataset
pub type DatasetView<'a, D, T> = DatasetBase<ArrayView2<'a, D>, ArrayView1<'a, T>>;

/// Record trait
pub trait Records: Sized {
    type Elem;

    fn nsamples(&self) -> usize;
    fn nfeatures(&self) -> usize;
}

/// Return a view on a single target variable
pub trait AsSingleTargets {
    type Elem;

    fn as_single_targets(&self) -> ArrayView1<'_, Self::Elem>;
}

/// Convenience constructor for owned datasets
pub fn dataset<F: Float, T>(records: Array2<F>, targets: Array1<T>) -> Dataset<F, T> {
    DatasetBase::new(records, targets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn dataset_view_shares_shape() {
        let ds = dataset(array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]], array![true, false, true]);
        let view = ds.view();

        assert_eq!(view.nsamples(), 3);
        assert_eq!(view.nfeatures(), 2);
        assert_eq!(view.as_single_targets(), array![true, false, true]);
    }

    #[test]
    fn float_roundtrips_through_f64() {
        assert_eq!(0.25f32.as_f64(), 0.25);
        assert_eq!(<f32 as Float>::cast(0.5f64), 0.5f32);
    }
}
