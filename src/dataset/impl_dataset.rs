use ndarray::{ArrayBase, ArrayView1, ArrayView2, Data, Ix1, Ix2};

use super::{AsSingleTargets, DatasetBase, DatasetView, Records};

impl<R: Records, T> DatasetBase<R, T> {
    /// Create a new dataset from records and targets
    pub fn new(records: R, targets: T) -> DatasetBase<R, T> {
        DatasetBase { records, targets }
    }

    /// Return references to the records
    pub fn records(&self) -> &R {
        &self.records
    }

    /// Return references to the targets
    pub fn targets(&self) -> &T {
        &self.targets
    }

    /// Updates the targets of the dataset
    pub fn with_targets<U>(self, targets: U) -> DatasetBase<R, U> {
        DatasetBase {
            records: self.records,
            targets,
        }
    }
}

impl<F, E, D, S> DatasetBase<ArrayBase<D, Ix2>, ArrayBase<S, Ix1>>
where
    D: Data<Elem = F>,
    S: Data<Elem = E>,
{
    /// Create a read-only view of the dataset
    pub fn view(&self) -> DatasetView<'_, F, E> {
        DatasetBase::new(self.records.view(), self.targets.view())
    }
}

impl<'a, F, E> DatasetView<'a, F, E> {
    /// Split the view into its records and targets
    pub fn as_parts(&self) -> (ArrayView2<'a, F>, ArrayView1<'a, E>) {
        (self.records.clone(), self.targets.clone())
    }
}

impl<R: Records, T: AsSingleTargets> AsSingleTargets for DatasetBase<R, T> {
    type Elem = T::Elem;

    fn as_single_targets(&self) -> ArrayView1<'_, Self::Elem> {
        self.targets.as_single_targets()
    }
}

impl<R: Records, T> Records for DatasetBase<R, T> {
    type Elem = R::Elem;

    fn nsamples(&self) -> usize {
        self.records.nsamples()
    }

    fn nfeatures(&self) -> usize {
        self.records.nfeatures()
    }
}
