//! Shared objects
//!
//! Every entity that takes part in persistence or cloning implements [`Parameterized`], which
//! declares its type name and the schema of its registered parameters. The blanket
//! [`SgObject`] implementation turns that schema into generic, type-erased access: reading and
//! writing parameters by name, snapshots and cloning.
//!
//! Objects are shared through [`Sg`] handles. A handle is one reference: `retain` creates another
//! one and dropping a handle releases it. The object is destroyed when the last handle goes away,
//! so neither an early free nor a release past zero can be expressed.
use std::any::Any;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use crate::error::{Error, Result};

pub mod dynamic_array;
pub mod parameter;
mod serializable;

pub use dynamic_array::{DynamicObjectArray, GrowthPolicy, MIN_GRANULARITY};
pub use parameter::{
    ContainerType, ModelSelection, Parameter, ParameterDescriptor, ParameterKind,
    ParameterSnapshot, ParameterType, ParameterValue, PrimitiveType,
};
pub use serializable::Serializable;

/// Declarative parameter schema of a concrete type
pub trait Parameterized: Send + Sync + Sized + 'static {
    /// Stable type name, stored in every snapshot
    const NAME: &'static str;

    /// The registered parameters in registration order
    fn parameters() -> Vec<Parameter<Self>>;

    /// A fresh, unshared instance that a clone copies the registered parameters into
    fn new_instance(&self) -> Result<Self> {
        Err(Error::NotImplemented(format!(
            "{} cannot create a fresh instance",
            Self::NAME
        )))
    }
}

/// Type-erased access to an object's registered state
pub trait SgObject: Any + Send + Sync {
    fn name(&self) -> &'static str;

    fn descriptors(&self) -> Vec<ParameterDescriptor>;

    fn get_parameter(&self, name: &str) -> Result<ParameterValue>;

    fn set_parameter(&mut self, name: &str, value: ParameterValue) -> Result<()>;

    /// Read every registered parameter
    fn save_parameters(&self) -> ParameterSnapshot;

    /// Write every parameter present in the snapshot
    ///
    /// Snapshots of another type are rejected, unknown names as well. Registered parameters
    /// missing from the snapshot keep their current value.
    fn load_parameters(&mut self, snapshot: &ParameterSnapshot) -> Result<()>;

    fn clone_object(&self) -> Result<Box<dyn SgObject>>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Parameterized> SgObject for T {
    fn name(&self) -> &'static str {
        T::NAME
    }

    fn descriptors(&self) -> Vec<ParameterDescriptor> {
        T::parameters()
            .iter()
            .map(|param| param.descriptor().clone())
            .collect()
    }

    fn get_parameter(&self, name: &str) -> Result<ParameterValue> {
        T::parameters()
            .iter()
            .find(|param| param.name() == name)
            .map(|param| param.get(self))
            .ok_or_else(|| Error::UnknownParameter {
                object: T::NAME,
                name: name.to_string(),
            })
    }

    fn set_parameter(&mut self, name: &str, value: ParameterValue) -> Result<()> {
        let params = T::parameters();
        let param = params
            .iter()
            .find(|param| param.name() == name)
            .ok_or_else(|| Error::UnknownParameter {
                object: T::NAME,
                name: name.to_string(),
            })?;

        param.set(self, value)
    }

    fn save_parameters(&self) -> ParameterSnapshot {
        let mut snapshot = ParameterSnapshot::new(T::NAME);
        for param in T::parameters() {
            snapshot.push(param.name(), param.get(self));
        }

        snapshot
    }

    fn load_parameters(&mut self, snapshot: &ParameterSnapshot) -> Result<()> {
        if snapshot.object_name() != T::NAME {
            return Err(Error::ObjectMismatch {
                expected: T::NAME,
                found: snapshot.object_name().to_string(),
            });
        }

        for (name, value) in snapshot.iter() {
            self.set_parameter(name, value.clone())?;
        }

        Ok(())
    }

    fn clone_object(&self) -> Result<Box<dyn SgObject>> {
        Ok(Box::new(clone_parameterized(self)?))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Clone `object` through its schema
///
/// The clone starts from [`Parameterized::new_instance`] and receives a copy of every registered
/// parameter: scalars are copied, buffers duplicated and object handles retained.
pub fn clone_parameterized<T: Parameterized>(object: &T) -> Result<T> {
    let mut cloned = object.new_instance()?;
    for param in T::parameters() {
        param.set(&mut cloned, param.get(object))?;
    }

    Ok(cloned)
}

/// Shared handle to an object
///
/// Cloning the handle (or calling [`Sg::retain`]) adds one reference, dropping it releases one.
#[derive(Clone)]
pub struct Sg(Arc<dyn SgObject>);

impl Sg {
    pub fn new<T: SgObject>(object: T) -> Sg {
        Sg(Arc::new(object))
    }

    pub fn from_boxed(object: Box<dyn SgObject>) -> Sg {
        Sg(Arc::from(object))
    }

    /// Another reference to the same object
    pub fn retain(&self) -> Sg {
        self.clone()
    }

    /// Number of live handles to the object
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.0)
    }

    /// Identity comparison
    pub fn ptr_eq(&self, other: &Sg) -> bool {
        Arc::as_ptr(&self.0) as *const () == Arc::as_ptr(&other.0) as *const ()
    }

    pub fn downcast_ref<T: SgObject>(&self) -> Option<&T> {
        self.0.as_any().downcast_ref::<T>()
    }

    /// Mutable access, only while this is the sole handle
    pub fn get_mut(&mut self) -> Option<&mut dyn SgObject> {
        Arc::get_mut(&mut self.0)
    }

    /// A new, unshared object with a copy of the registered parameters
    pub fn deep_clone(&self) -> Result<Sg> {
        self.0.clone_object().map(Sg::from_boxed)
    }
}

impl Deref for Sg {
    type Target = dyn SgObject;

    fn deref(&self) -> &Self::Target {
        &*self.0
    }
}

impl fmt::Debug for Sg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{:p}", self.0.name(), Arc::as_ptr(&self.0) as *const ())
    }
}
