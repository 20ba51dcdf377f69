//! Dynamic array of shared objects
//!
//! `DynamicObjectArray` holds one handle per occupied slot. Every handle stored in the array is
//! one reference attributable to the array: overwriting or removing a slot releases exactly that
//! reference and dropping the array releases all of them once.
//!
//! The logical shape `(dim1, dim2, dim3)` only translates multi-dimensional indices into a flat
//! index, it does not have to agree with the number of stored elements.
use std::fmt;

use rand::seq::SliceRandom;
use rand::Rng;

use super::serializable::Serializable;
use super::{Parameter, ParameterType, Parameterized, Sg};
use crate::error::{Error, Result};

/// Smallest accepted resize granularity
pub const MIN_GRANULARITY: usize = 128;

/// Whether the backing store may reallocate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrowthPolicy {
    /// Grow and shrink in steps of the resize granularity
    Growable,
    /// Capacity is fixed to the size the array was created with
    Fixed,
}

pub struct DynamicObjectArray {
    array: Vec<Option<Sg>>,
    array_size: usize,
    resize_granularity: usize,
    growable: bool,
    dims: [usize; 3],
}

impl Default for DynamicObjectArray {
    fn default() -> Self {
        DynamicObjectArray::new()
    }
}

impl DynamicObjectArray {
    pub fn new() -> Self {
        DynamicObjectArray::with_dims(1, 1, 1)
    }

    /// Empty array with the given logical shape, capacity for the whole shape is reserved
    pub fn with_dims(dim1: usize, dim2: usize, dim3: usize) -> Self {
        let mut array = DynamicObjectArray {
            array: Vec::new(),
            array_size: 0,
            resize_granularity: MIN_GRANULARITY,
            growable: true,
            dims: [dim1, dim2, dim3],
        };

        let reserved = shape_len(dim1, dim2, dim3)
            .filter(|len| array.array.try_reserve_exact(*len).is_ok());
        match reserved {
            Some(len) => array.array_size = len,
            None => log::debug!(
                "no capacity reserved for the shape {}x{}x{}",
                dim1,
                dim2,
                dim3
            ),
        }

        array
    }

    /// Adopt existing handles as the array content
    ///
    /// The shape must cover every element.
    pub fn from_elements(
        elements: Vec<Option<Sg>>,
        dim1: usize,
        dim2: usize,
        dim3: usize,
        policy: GrowthPolicy,
    ) -> Result<Self> {
        let covered = shape_len(dim1, dim2, dim3).unwrap_or(usize::MAX);
        if covered < elements.len() {
            return Err(Error::Parameters(format!(
                "shape {}x{}x{} cannot hold {} elements",
                dim1,
                dim2,
                dim3,
                elements.len()
            )));
        }

        Ok(DynamicObjectArray {
            array_size: elements.len(),
            array: elements,
            resize_granularity: MIN_GRANULARITY,
            growable: policy == GrowthPolicy::Growable,
            dims: [dim1, dim2, dim3],
        })
    }

    /// Set the resize granularity, raised to at least [`MIN_GRANULARITY`]
    ///
    /// Returns the granularity in effect.
    pub fn set_granularity(&mut self, granularity: usize) -> usize {
        if granularity < MIN_GRANULARITY {
            log::debug!(
                "resize granularity {} raised to {}",
                granularity,
                MIN_GRANULARITY
            );
        }
        self.resize_granularity = granularity.max(MIN_GRANULARITY);
        self.resize_granularity
    }

    pub fn granularity(&self) -> usize {
        self.resize_granularity
    }

    pub fn growth_policy(&self) -> GrowthPolicy {
        if self.growable {
            GrowthPolicy::Growable
        } else {
            GrowthPolicy::Fixed
        }
    }

    /// Capacity of the backing store including the granularity buffer
    pub fn array_size(&self) -> usize {
        self.array_size
    }

    pub fn num_elements(&self) -> usize {
        self.array.len()
    }

    pub fn is_empty(&self) -> bool {
        self.array.is_empty()
    }

    pub fn dims(&self) -> (usize, usize, usize) {
        (self.dims[0], self.dims[1], self.dims[2])
    }

    pub fn dim1(&self) -> usize {
        self.dims[0]
    }

    pub fn dim2(&self) -> usize {
        self.dims[1]
    }

    pub fn dim3(&self) -> usize {
        self.dims[2]
    }

    /// `None` if the position lies beyond the addressable range
    fn flat_index(&self, idx1: usize, idx2: usize, idx3: usize) -> Option<usize> {
        self.dims[1]
            .checked_mul(idx3)?
            .checked_add(idx2)?
            .checked_mul(self.dims[0])?
            .checked_add(idx1)
    }

    /// Make room for `len` elements, false if the policy forbids it
    fn reserve_for(&mut self, len: usize) -> bool {
        if len <= self.array_size {
            return true;
        }
        if !self.growable {
            log::debug!(
                "fixed size object array cannot hold {} elements, capacity is {}",
                len,
                self.array_size
            );
            return false;
        }

        let g = self.resize_granularity;
        let size = match (len / g).checked_add(1).and_then(|steps| steps.checked_mul(g)) {
            Some(size) => size,
            None => return false,
        };
        if let Err(err) = self.array.try_reserve(size - self.array.len()) {
            log::debug!("object array cannot grow to {} elements: {}", size, err);
            return false;
        }
        self.array_size = size;

        true
    }

    fn shrink_to_fit_granularity(&mut self) {
        if !self.growable {
            return;
        }

        let g = self.resize_granularity;
        let len = self.array.len();
        if len + g < self.array_size {
            self.array_size = (len / g + 1) * g;
            self.array.shrink_to(self.array_size);
        }
    }

    /// Retained handle of the element at `index`
    ///
    /// # Panics
    ///
    /// If `index` is not smaller than the number of elements.
    pub fn get_element(&self, index: usize) -> Option<Sg> {
        self.array[index].clone()
    }

    /// Bounds-checked variant of [`DynamicObjectArray::get_element`]
    pub fn get_element_safe(&self, index: usize) -> Result<Option<Sg>> {
        self.array
            .get(index)
            .cloned()
            .ok_or(Error::IndexOutOfBounds {
                index,
                len: self.array.len(),
            })
    }

    /// Element at a position of the logical shape
    ///
    /// # Panics
    ///
    /// If the position maps past the last element.
    pub fn element(&self, idx1: usize, idx2: usize, idx3: usize) -> Option<Sg> {
        let index = self.flat_index(idx1, idx2, idx3).unwrap_or(usize::MAX);
        self.get_element(index)
    }

    pub fn get_last_element(&self) -> Option<Sg> {
        self.array.last().cloned().flatten()
    }

    pub fn back(&self) -> Option<Sg> {
        self.get_last_element()
    }

    /// Store `element` at the flat `index`
    ///
    /// The previous occupant is released. Writing past the end grows the array, filling the gap
    /// with empty slots, unless the growth policy forbids it.
    pub fn set_element(&mut self, element: impl Into<Option<Sg>>, index: usize) -> bool {
        let element = element.into();
        if index < self.array.len() {
            self.array[index] = element;
            return true;
        }
        match index.checked_add(1) {
            Some(len) if self.reserve_for(len) => {}
            _ => return false,
        }

        self.array.resize(index, None);
        self.array.push(element);

        true
    }

    /// Store `element` at a position of the logical shape
    pub fn set_element_at(
        &mut self,
        element: impl Into<Option<Sg>>,
        idx1: usize,
        idx2: usize,
        idx3: usize,
    ) -> bool {
        match self.flat_index(idx1, idx2, idx3) {
            Some(index) => self.set_element(element, index),
            None => false,
        }
    }

    /// Open a slot at `index` by shifting the tail, valid for `index <= num_elements`
    pub fn insert_element(&mut self, element: impl Into<Option<Sg>>, index: usize) -> bool {
        if index > self.array.len() || !self.reserve_for(self.array.len() + 1) {
            return false;
        }

        self.array.insert(index, element.into());
        true
    }

    pub fn append_element(&mut self, element: impl Into<Option<Sg>>) -> bool {
        if !self.reserve_for(self.array.len() + 1) {
            return false;
        }

        self.array.push(element.into());
        true
    }

    /// Wrap a plain value and append it
    pub fn append_value<T>(&mut self, value: T, name: &str) -> bool
    where
        T: ParameterType + Default + Clone + Send + Sync,
    {
        self.append_element(Sg::new(Serializable::new(value, name)))
    }

    pub fn push_back(&mut self, element: impl Into<Option<Sg>>) -> bool {
        self.append_element(element)
    }

    /// Remove and release the last element
    pub fn pop_back(&mut self) {
        if self.array.pop().is_some() {
            self.shrink_to_fit_granularity();
        }
    }

    /// Index of the first slot holding `element` itself
    pub fn find_element(&self, element: &Sg) -> Option<usize> {
        self.array.iter().position(|slot| match slot {
            Some(handle) => handle.ptr_eq(element),
            None => false,
        })
    }

    /// Release the element at `index` and close the gap
    pub fn delete_element(&mut self, index: usize) -> bool {
        if index >= self.array.len() {
            return false;
        }

        drop(self.array.remove(index));
        self.shrink_to_fit_granularity();

        true
    }

    /// Release every element, keeping the slots
    pub fn clear_array(&mut self) {
        for slot in self.array.iter_mut() {
            *slot = None;
        }
    }

    /// Release every element and empty the array; the granularity is kept
    pub fn reset_array(&mut self) {
        self.array = Vec::new();
        if self.growable {
            self.array_size = 0;
        }
    }

    /// Become a copy of `other`, sharing its elements
    ///
    /// All elements of `other` are retained before the current ones are released, so an element
    /// held by both arrays never loses its last reference on the way.
    pub fn assign_from(&mut self, other: &DynamicObjectArray) {
        let adopted = other.array.clone();
        self.array = adopted;
        self.array_size = other.array_size;
        self.resize_granularity = other.resize_granularity;
        self.growable = other.growable;
        self.dims = other.dims;
    }

    /// Permute the elements with the thread-local generator
    pub fn shuffle(&mut self) {
        self.shuffle_with(&mut rand::thread_rng());
    }

    /// Permute the elements with a caller supplied generator
    pub fn shuffle_with<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.array.shuffle(rng);
    }

    pub fn iter(&self) -> impl Iterator<Item = Option<&Sg>> {
        self.array.iter().map(Option::as_ref)
    }

    /// Borrow the slots without retaining them
    pub fn as_slice(&self) -> &[Option<Sg>] {
        &self.array
    }

    fn adopt(&mut self, elements: Vec<Option<Sg>>) {
        self.array = elements;
        self.array_size = self.array_size.max(self.array.len());
    }
}

fn shape_len(dim1: usize, dim2: usize, dim3: usize) -> Option<usize> {
    dim1.checked_mul(dim2)?.checked_mul(dim3)
}

impl Clone for DynamicObjectArray {
    fn clone(&self) -> Self {
        let mut cloned = DynamicObjectArray::new();
        cloned.assign_from(self);
        cloned
    }

    fn clone_from(&mut self, source: &Self) {
        self.assign_from(source);
    }
}

impl fmt::Debug for DynamicObjectArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicObjectArray")
            .field("elements", &self.array)
            .field("array_size", &self.array_size)
            .field("resize_granularity", &self.resize_granularity)
            .field("dims", &self.dims)
            .finish()
    }
}

impl Parameterized for DynamicObjectArray {
    const NAME: &'static str = "DynamicObjectArray";

    fn parameters() -> Vec<Parameter<Self>> {
        vec![
            Parameter::new(
                "array",
                "Memory for dynamic array.",
                |a: &Self| a.array.clone(),
                |a: &mut Self, v: Vec<Option<Sg>>| a.adopt(v),
            )
            .not_available(),
            Parameter::new(
                "resize_granularity",
                "shrink/grow step size.",
                |a: &Self| a.resize_granularity,
                |a: &mut Self, v: usize| {
                    a.set_granularity(v);
                },
            )
            .not_available(),
            Parameter::new(
                "free_array",
                "whether array must be freed",
                |a: &Self| a.growable,
                |a: &mut Self, v: bool| a.growable = v,
            )
            .not_available(),
            Parameter::new(
                "dim1_size",
                "Dimension 1",
                |a: &Self| a.dims[0],
                |a: &mut Self, v: usize| a.dims[0] = v,
            )
            .not_available(),
            Parameter::new(
                "dim2_size",
                "Dimension 2",
                |a: &Self| a.dims[1],
                |a: &mut Self, v: usize| a.dims[1] = v,
            )
            .not_available(),
            Parameter::new(
                "dim3_size",
                "Dimension 3",
                |a: &Self| a.dims[2],
                |a: &mut Self, v: usize| a.dims[2] = v,
            )
            .not_available(),
        ]
    }

    fn new_instance(&self) -> Result<Self> {
        Ok(DynamicObjectArray::new())
    }
}
