use linfa_linalg::eigh::EighInto;
use ndarray::{Array1, Array2, ArrayView2, Axis};
use sgcore::Float;

use crate::error::{LinalgError, Result};

/// Eigen-decomposition `A = V diag(w) V^T` of a symmetric matrix, eigenvalues ascending
pub struct SymmetricEigen<F> {
    eigenvalues: Array1<F>,
    eigenvectors: Array2<F>,
}

impl<F: Float> SymmetricEigen<F> {
    /// Only the symmetric part of `a` is used
    pub fn factorize(a: ArrayView2<F>) -> Result<Self> {
        let (rows, cols) = a.dim();
        if rows != cols {
            return Err(LinalgError::NotSquare { rows, cols });
        }

        let half = F::cast(0.5);
        let symmetric =
            Array2::from_shape_fn((rows, cols), |(i, j)| half * (a[[i, j]] + a[[j, i]]));
        let (values, vectors) = symmetric.eigh_into()?;

        let mut order: Vec<usize> = (0..rows).collect();
        order.sort_by(|&i, &j| {
            values[i]
                .partial_cmp(&values[j])
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        Ok(SymmetricEigen {
            eigenvalues: values.select(Axis(0), &order),
            eigenvectors: vectors.select(Axis(1), &order),
        })
    }

    pub fn eigenvalues(&self) -> &Array1<F> {
        &self.eigenvalues
    }

    /// Eigenvectors as columns, in the order of the eigenvalues
    pub fn eigenvectors(&self) -> &Array2<F> {
        &self.eigenvectors
    }

    /// `V diag(f(w)) V^T`
    pub fn map_eigenvalues(&self, f: impl Fn(F) -> F) -> Array2<F> {
        let mapped = self.eigenvalues.mapv(f);
        let scaled = &self.eigenvectors * &mapped;
        scaled.dot(&self.eigenvectors.t())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn eigenpairs_of_symmetric_matrix() {
        let a = array![[2.0, 1.0, 0.0], [1.0, 2.0, 1.0], [0.0, 1.0, 2.0]];
        let eig = SymmetricEigen::factorize(a.view()).unwrap();

        let sqrt2 = 2f64.sqrt();
        assert_abs_diff_eq!(
            eig.eigenvalues(),
            &array![2.0 - sqrt2, 2.0, 2.0 + sqrt2],
            epsilon = 1e-10
        );
        for (k, w) in eig.eigenvalues().iter().enumerate() {
            let v = eig.eigenvectors().column(k);
            assert_abs_diff_eq!(a.dot(&v), &v * *w, epsilon = 1e-10);
        }
    }

    #[test]
    fn spectrum_is_sorted_ascending() {
        let a: Array2<f64> = array![[9.0, 0.0, 0.0], [0.0, -1.0, 0.0], [0.0, 0.0, 4.0]];
        let eig = SymmetricEigen::factorize(a.view()).unwrap();

        assert_abs_diff_eq!(eig.eigenvalues(), &array![-1.0, 4.0, 9.0], epsilon = 1e-10);
        assert_abs_diff_eq!(eig.eigenvectors().column(0)[1].abs(), 1.0, epsilon = 1e-10);
    }

    #[test]
    fn matrix_function_of_diagonal() {
        let a = array![[4.0, 0.0], [0.0, 9.0]];
        let eig = SymmetricEigen::factorize(a.view()).unwrap();

        assert_abs_diff_eq!(
            eig.map_eigenvalues(f64::sqrt),
            array![[2.0, 0.0], [0.0, 3.0]],
            epsilon = 1e-10
        );
    }

    #[test]
    fn rectangular_input_is_rejected() {
        let a = Array2::<f64>::zeros((2, 3));
        assert!(matches!(
            SymmetricEigen::factorize(a.view()),
            Err(LinalgError::NotSquare { rows: 2, cols: 3 })
        ));
    }
}
