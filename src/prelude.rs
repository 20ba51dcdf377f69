//! sgcore prelude.
//!
//! This module contains the most used types, type aliases, traits and
//! functions that you can import easily as a group.
//!

#[doc(no_inline)]
pub use crate::error::{Error, Result};

#[doc(no_inline)]
pub use crate::traits::*;

#[doc(no_inline)]
pub use crate::dataset::{AsSingleTargets, Dataset, DatasetBase, DatasetView, Float, Records};

#[doc(no_inline)]
pub use crate::object::{
    DynamicObjectArray, Parameter, ParameterSnapshot, ParameterValue, Parameterized, Sg, SgObject,
};

#[doc(no_inline)]
pub use crate::param_guard::ParamGuard;
