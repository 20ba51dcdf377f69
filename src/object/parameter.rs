//! Parameter registry
//!
//! Every object declares its persistent state as an ordered list of [`Parameter`]s: a name, a
//! description, a [`ParameterKind`] and a typed accessor pair. Generic save, load and clone only
//! ever see an object through this list, so a field that is not registered is invisible to them.
use std::fmt;

use ndarray::{Array1, Array2};
#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

use super::Sg;
use crate::error::{Error, Result};
use crate::Float;

/// Shape of a registered value
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerType {
    Scalar,
    Vector,
    Matrix,
}

/// Element type of a registered value
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    Bool,
    Int,
    Float,
    Text,
    /// A shared handle to another object
    Object,
    /// The parameters of an exclusively owned collaborator
    Nested,
}

/// Container and element type of a registered parameter
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParameterKind {
    pub container: ContainerType,
    pub primitive: PrimitiveType,
}

impl ParameterKind {
    pub const fn scalar(primitive: PrimitiveType) -> Self {
        ParameterKind {
            container: ContainerType::Scalar,
            primitive,
        }
    }

    pub const fn vector(primitive: PrimitiveType) -> Self {
        ParameterKind {
            container: ContainerType::Vector,
            primitive,
        }
    }

    pub const fn matrix(primitive: PrimitiveType) -> Self {
        ParameterKind {
            container: ContainerType::Matrix,
            primitive,
        }
    }
}

impl fmt::Display for ParameterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let primitive = match self.primitive {
            PrimitiveType::Bool => "bool",
            PrimitiveType::Int => "int",
            PrimitiveType::Float => "float",
            PrimitiveType::Text => "text",
            PrimitiveType::Object => "object",
            PrimitiveType::Nested => "nested parameters",
        };
        match self.container {
            ContainerType::Scalar => write!(f, "scalar {}", primitive),
            ContainerType::Vector => write!(f, "vector of {}", primitive),
            ContainerType::Matrix => write!(f, "matrix of {}", primitive),
        }
    }
}

/// Whether a parameter may be tuned by model selection
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelSelection {
    Available,
    NotAvailable,
}

/// Static description of a registered parameter
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub kind: ParameterKind,
    pub model_selection: ModelSelection,
}

/// Type-erased value of a registered parameter
///
/// Cloning a value copies its buffers. Object handles are shared, so cloning an `Object` or
/// `ObjectVector` retains every referenced object once more.
#[derive(Clone)]
pub enum ParameterValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Object(Option<Sg>),
    Nested(ParameterSnapshot),
    IntVector(Vec<i64>),
    FloatVector(Array1<f64>),
    ObjectVector(Vec<Option<Sg>>),
    FloatMatrix(Array2<f64>),
}

impl ParameterValue {
    pub fn kind(&self) -> ParameterKind {
        match self {
            ParameterValue::Bool(_) => ParameterKind::scalar(PrimitiveType::Bool),
            ParameterValue::Int(_) => ParameterKind::scalar(PrimitiveType::Int),
            ParameterValue::Float(_) => ParameterKind::scalar(PrimitiveType::Float),
            ParameterValue::Text(_) => ParameterKind::scalar(PrimitiveType::Text),
            ParameterValue::Object(_) => ParameterKind::scalar(PrimitiveType::Object),
            ParameterValue::Nested(_) => ParameterKind::scalar(PrimitiveType::Nested),
            ParameterValue::IntVector(_) => ParameterKind::vector(PrimitiveType::Int),
            ParameterValue::FloatVector(_) => ParameterKind::vector(PrimitiveType::Float),
            ParameterValue::ObjectVector(_) => ParameterKind::vector(PrimitiveType::Object),
            ParameterValue::FloatMatrix(_) => ParameterKind::matrix(PrimitiveType::Float),
        }
    }
}

fn same_object(a: &Option<Sg>, b: &Option<Sg>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.ptr_eq(b),
        (None, None) => true,
        _ => false,
    }
}

/// Objects compare by identity, everything else by value
impl PartialEq for ParameterValue {
    fn eq(&self, other: &Self) -> bool {
        use ParameterValue as V;

        match (self, other) {
            (V::Bool(a), V::Bool(b)) => a == b,
            (V::Int(a), V::Int(b)) => a == b,
            (V::Float(a), V::Float(b)) => a == b,
            (V::Text(a), V::Text(b)) => a == b,
            (V::Object(a), V::Object(b)) => same_object(a, b),
            (V::Nested(a), V::Nested(b)) => a == b,
            (V::IntVector(a), V::IntVector(b)) => a == b,
            (V::FloatVector(a), V::FloatVector(b)) => a == b,
            (V::ObjectVector(a), V::ObjectVector(b)) => {
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(a, b)| same_object(a, b))
            }
            (V::FloatMatrix(a), V::FloatMatrix(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Debug for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterValue::Bool(v) => write!(f, "Bool({})", v),
            ParameterValue::Int(v) => write!(f, "Int({})", v),
            ParameterValue::Float(v) => write!(f, "Float({})", v),
            ParameterValue::Text(v) => write!(f, "Text({:?})", v),
            ParameterValue::Object(v) => write!(f, "Object({:?})", v),
            ParameterValue::Nested(v) => write!(f, "Nested({:?})", v),
            ParameterValue::IntVector(v) => write!(f, "IntVector({:?})", v),
            ParameterValue::FloatVector(v) => write!(f, "FloatVector({})", v),
            ParameterValue::ObjectVector(v) => write!(f, "ObjectVector({:?})", v),
            ParameterValue::FloatMatrix(v) => write!(f, "FloatMatrix({})", v),
        }
    }
}

/// Rust types that can back a registered parameter
pub trait ParameterType: Sized + 'static {
    const KIND: ParameterKind;

    fn into_value(self) -> ParameterValue;

    /// Returns `None` if the value has another kind or is out of range for `Self`
    fn from_value(value: ParameterValue) -> Option<Self>;
}

impl ParameterType for bool {
    const KIND: ParameterKind = ParameterKind::scalar(PrimitiveType::Bool);

    fn into_value(self) -> ParameterValue {
        ParameterValue::Bool(self)
    }

    fn from_value(value: ParameterValue) -> Option<Self> {
        match value {
            ParameterValue::Bool(v) => Some(v),
            _ => None,
        }
    }
}

impl ParameterType for i64 {
    const KIND: ParameterKind = ParameterKind::scalar(PrimitiveType::Int);

    fn into_value(self) -> ParameterValue {
        ParameterValue::Int(self)
    }

    fn from_value(value: ParameterValue) -> Option<Self> {
        match value {
            ParameterValue::Int(v) => Some(v),
            _ => None,
        }
    }
}

/// Stored by bit pattern, values above `i64::MAX` read back as negative integers
impl ParameterType for u64 {
    const KIND: ParameterKind = ParameterKind::scalar(PrimitiveType::Int);

    fn into_value(self) -> ParameterValue {
        ParameterValue::Int(self as i64)
    }

    fn from_value(value: ParameterValue) -> Option<Self> {
        match value {
            ParameterValue::Int(v) => Some(v as u64),
            _ => None,
        }
    }
}

impl ParameterType for usize {
    const KIND: ParameterKind = ParameterKind::scalar(PrimitiveType::Int);

    fn into_value(self) -> ParameterValue {
        ParameterValue::Int(self as i64)
    }

    fn from_value(value: ParameterValue) -> Option<Self> {
        match value {
            ParameterValue::Int(v) if v >= 0 => Some(v as usize),
            _ => None,
        }
    }
}

impl ParameterType for f64 {
    const KIND: ParameterKind = ParameterKind::scalar(PrimitiveType::Float);

    fn into_value(self) -> ParameterValue {
        ParameterValue::Float(self)
    }

    fn from_value(value: ParameterValue) -> Option<Self> {
        match value {
            ParameterValue::Float(v) => Some(v),
            _ => None,
        }
    }
}

impl ParameterType for f32 {
    const KIND: ParameterKind = ParameterKind::scalar(PrimitiveType::Float);

    fn into_value(self) -> ParameterValue {
        ParameterValue::Float(self as f64)
    }

    fn from_value(value: ParameterValue) -> Option<Self> {
        match value {
            ParameterValue::Float(v) => Some(v as f32),
            _ => None,
        }
    }
}

impl ParameterType for String {
    const KIND: ParameterKind = ParameterKind::scalar(PrimitiveType::Text);

    fn into_value(self) -> ParameterValue {
        ParameterValue::Text(self)
    }

    fn from_value(value: ParameterValue) -> Option<Self> {
        match value {
            ParameterValue::Text(v) => Some(v),
            _ => None,
        }
    }
}

impl ParameterType for Option<Sg> {
    const KIND: ParameterKind = ParameterKind::scalar(PrimitiveType::Object);

    fn into_value(self) -> ParameterValue {
        ParameterValue::Object(self)
    }

    fn from_value(value: ParameterValue) -> Option<Self> {
        match value {
            ParameterValue::Object(v) => Some(v),
            _ => None,
        }
    }
}

impl ParameterType for ParameterSnapshot {
    const KIND: ParameterKind = ParameterKind::scalar(PrimitiveType::Nested);

    fn into_value(self) -> ParameterValue {
        ParameterValue::Nested(self)
    }

    fn from_value(value: ParameterValue) -> Option<Self> {
        match value {
            ParameterValue::Nested(v) => Some(v),
            _ => None,
        }
    }
}

impl ParameterType for Vec<usize> {
    const KIND: ParameterKind = ParameterKind::vector(PrimitiveType::Int);

    fn into_value(self) -> ParameterValue {
        ParameterValue::IntVector(self.into_iter().map(|v| v as i64).collect())
    }

    fn from_value(value: ParameterValue) -> Option<Self> {
        match value {
            ParameterValue::IntVector(v) if v.iter().all(|x| *x >= 0) => {
                Some(v.into_iter().map(|x| x as usize).collect())
            }
            _ => None,
        }
    }
}

impl ParameterType for Vec<Option<Sg>> {
    const KIND: ParameterKind = ParameterKind::vector(PrimitiveType::Object);

    fn into_value(self) -> ParameterValue {
        ParameterValue::ObjectVector(self)
    }

    fn from_value(value: ParameterValue) -> Option<Self> {
        match value {
            ParameterValue::ObjectVector(v) => Some(v),
            _ => None,
        }
    }
}

impl<F: Float> ParameterType for Array1<F> {
    const KIND: ParameterKind = ParameterKind::vector(PrimitiveType::Float);

    fn into_value(self) -> ParameterValue {
        ParameterValue::FloatVector(self.mapv(Float::as_f64))
    }

    fn from_value(value: ParameterValue) -> Option<Self> {
        match value {
            ParameterValue::FloatVector(v) => Some(v.mapv(|x| F::cast(x))),
            _ => None,
        }
    }
}

impl<F: Float> ParameterType for Array2<F> {
    const KIND: ParameterKind = ParameterKind::matrix(PrimitiveType::Float);

    fn into_value(self) -> ParameterValue {
        ParameterValue::FloatMatrix(self.mapv(Float::as_f64))
    }

    fn from_value(value: ParameterValue) -> Option<Self> {
        match value {
            ParameterValue::FloatMatrix(v) => Some(v.mapv(|x| F::cast(x))),
            _ => None,
        }
    }
}

type Getter<T> = Box<dyn Fn(&T) -> ParameterValue>;
type Setter<T> = Box<dyn Fn(&mut T, ParameterValue) -> Result<()>>;

/// A registered field of `T`: descriptor plus typed accessor pair
pub struct Parameter<T> {
    descriptor: ParameterDescriptor,
    getter: Getter<T>,
    setter: Setter<T>,
}

impl<T: 'static> Parameter<T> {
    /// Register a field which accepts every value of its type
    pub fn new<V, G, S>(name: &'static str, description: &'static str, get: G, set: S) -> Self
    where
        V: ParameterType,
        G: Fn(&T) -> V + 'static,
        S: Fn(&mut T, V) + 'static,
    {
        Self::with_validation(name, description, get, move |obj: &mut T, value: V| {
            set(obj, value);
            Ok(())
        })
    }

    /// Register a field whose setter may reject a value
    pub fn with_validation<V, G, S>(
        name: &'static str,
        description: &'static str,
        get: G,
        set: S,
    ) -> Self
    where
        V: ParameterType,
        G: Fn(&T) -> V + 'static,
        S: Fn(&mut T, V) -> Result<()> + 'static,
    {
        let setter = move |obj: &mut T, value: ParameterValue| match V::from_value(value) {
            Some(value) => set(obj, value),
            None => Err(Error::Parameters(format!("value out of range for `{}`", name))),
        };

        Parameter {
            descriptor: ParameterDescriptor {
                name,
                description,
                kind: V::KIND,
                model_selection: ModelSelection::Available,
            },
            getter: Box::new(move |obj| get(obj).into_value()),
            setter: Box::new(setter),
        }
    }

    /// Exclude the parameter from model selection
    pub fn not_available(mut self) -> Self {
        self.descriptor.model_selection = ModelSelection::NotAvailable;
        self
    }

    pub fn name(&self) -> &'static str {
        self.descriptor.name
    }

    pub fn descriptor(&self) -> &ParameterDescriptor {
        &self.descriptor
    }

    pub fn get(&self, object: &T) -> ParameterValue {
        (self.getter)(object)
    }

    /// Write `value` into `object`, rejecting values of another kind
    pub fn set(&self, object: &mut T, value: ParameterValue) -> Result<()> {
        let found = value.kind();
        if found != self.descriptor.kind {
            return Err(Error::ParameterKind {
                name: self.descriptor.name.to_string(),
                expected: self.descriptor.kind,
                found,
            });
        }

        (self.setter)(object, value)
    }
}

/// Ordered name/value listing of an object's registered state
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSnapshot {
    object: String,
    entries: Vec<(String, ParameterValue)>,
}

impl ParameterSnapshot {
    pub fn new(object: &str) -> Self {
        ParameterSnapshot {
            object: object.to_string(),
            entries: Vec::new(),
        }
    }

    /// Name of the object type the snapshot was taken from
    pub fn object_name(&self) -> &str {
        &self.object
    }

    pub fn push(&mut self, name: &str, value: ParameterValue) {
        self.entries.push((name.to_string(), value));
    }

    pub fn get(&self, name: &str) -> Option<&ParameterValue> {
        self.entries
            .iter()
            .find(|(entry, _)| entry == name)
            .map(|(_, value)| value)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParameterValue)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
