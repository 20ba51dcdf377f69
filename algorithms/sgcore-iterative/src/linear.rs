use ndarray::{Array1, ArrayBase, Data, Ix1, Ix2, Zip};
use sgcore::traits::PredictInplace;
use sgcore::Float;

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

use crate::error::{IterativeError, Result};

/// Separating hyperplane `w · x + bias`
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, PartialEq)]
pub struct LinearModel<F> {
    pub(crate) w: Array1<F>,
    pub(crate) bias: F,
}

impl<F: Float> LinearModel<F> {
    pub fn new(w: Array1<F>, bias: F) -> Self {
        LinearModel { w, bias }
    }

    /// All-zero hyperplane over `nfeatures` features
    pub fn zeros(nfeatures: usize) -> Self {
        LinearModel::new(Array1::zeros(nfeatures), F::zero())
    }

    pub fn w(&self) -> &Array1<F> {
        &self.w
    }

    pub fn bias(&self) -> F {
        self.bias
    }

    pub fn nfeatures(&self) -> usize {
        self.w.len()
    }

    pub(crate) fn check_features(&self, found: usize) -> Result<()> {
        if found != self.nfeatures() {
            return Err(IterativeError::MismatchedFeatures {
                expected: self.nfeatures(),
                found,
            });
        }

        Ok(())
    }

    pub fn decision<D: Data<Elem = F>>(&self, x: &ArrayBase<D, Ix1>) -> F {
        x.dot(&self.w) + self.bias
    }

    /// Decision values of every record
    pub fn decision_function<D: Data<Elem = F>>(&self, x: &ArrayBase<D, Ix2>) -> Array1<F> {
        x.dot(&self.w) + self.bias
    }
}

/// `+1` for positive labels, `-1` otherwise
pub(crate) fn label<F: Float>(y: bool) -> F {
    if y {
        F::one()
    } else {
        -F::one()
    }
}

impl<F: Float, D: Data<Elem = F>> PredictInplace<ArrayBase<D, Ix2>, Array1<bool>>
    for LinearModel<F>
{
    fn predict_inplace(&self, x: &ArrayBase<D, Ix2>, y: &mut Array1<bool>) {
        assert_eq!(
            x.nrows(),
            y.len(),
            "The number of data points must match the number of output targets."
        );
        assert_eq!(
            x.ncols(),
            self.nfeatures(),
            "Number of data features must match the number of features of the model."
        );

        Zip::from(&self.decision_function(x))
            .and(y)
            .for_each(|value, out| *out = *value > F::zero());
    }

    fn default_target(&self, x: &ArrayBase<D, Ix2>) -> Array1<bool> {
        Array1::from_elem(x.nrows(), false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;
    use sgcore::traits::Predict;

    #[test]
    fn predicts_the_side_of_the_hyperplane() {
        let model = LinearModel::new(array![1.0, -1.0], 0.5);
        let x = array![[2.0, 1.0], [0.0, 3.0], [1.0, 1.5]];

        assert_abs_diff_eq!(
            model.decision_function(&x),
            array![1.5, -2.5, 0.0],
            epsilon = 1e-12
        );
        assert_eq!(model.predict(&x), array![true, false, false]);
    }

    #[test]
    fn feature_count_is_checked() {
        let model = LinearModel::<f32>::zeros(3);
        assert!(model.check_features(3).is_ok());
        assert!(matches!(
            model.check_features(2),
            Err(IterativeError::MismatchedFeatures {
                expected: 3,
                found: 2
            })
        ));
    }
}
