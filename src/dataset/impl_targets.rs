use super::AsSingleTargets;
use ndarray::{ArrayBase, ArrayView1, Data, Ix1};

/// A one-dimensional NdArray can act as single targets
impl<L, S: Data<Elem = L>> AsSingleTargets for ArrayBase<S, Ix1> {
    type Elem = L;

    fn as_single_targets(&self) -> ArrayView1<'_, L> {
        self.view()
    }
}

impl<T: AsSingleTargets> AsSingleTargets for &T {
    type Elem = T::Elem;

    fn as_single_targets(&self) -> ArrayView1<'_, Self::Elem> {
        (*self).as_single_targets()
    }
}
