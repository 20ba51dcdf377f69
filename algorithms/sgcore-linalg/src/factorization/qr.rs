use linfa_linalg::triangular::{SolveTriangularInplace, UPLO};
use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2, Axis};
use sgcore::Float;

use crate::error::Result;

/// Pivoting strategy of the Householder QR decomposition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pivoting {
    /// Move the column with the largest remaining norm to the front
    Column,
    /// Move the largest remaining entry to the diagonal, swapping rows and columns
    Full,
}

/// One orthogonal row transformation applied during the decomposition
struct Reflector<F> {
    row_swap: Option<usize>,
    v: Array1<F>,
    beta: F,
}

/// Rank-revealing Householder QR decomposition `P_r A P_c = Q R`
///
/// `Q` is never formed; the reflectors (and row swaps of full pivoting) are kept and replayed on
/// the right-hand side.
pub struct Qr<F> {
    r: Array2<F>,
    reflectors: Vec<Reflector<F>>,
    col_perm: Vec<usize>,
    rank: usize,
}

impl<F: Float> Qr<F> {
    pub fn factorize(a: ArrayView2<F>, pivoting: Pivoting) -> Self {
        let (m, n) = a.dim();
        let steps = m.min(n);
        let mut r = a.to_owned();
        let mut col_perm: Vec<usize> = (0..n).collect();
        let mut reflectors = Vec::with_capacity(steps);

        for k in 0..steps {
            let mut row_swap = None;
            match pivoting {
                Pivoting::Column => {
                    let norms = r
                        .slice(s![k.., k..])
                        .map_axis(Axis(0), |col| col.dot(&col));
                    let best = argmax(norms.view()) + k;
                    swap_columns(&mut r, &mut col_perm, k, best);
                }
                Pivoting::Full => {
                    let (mut best_row, mut best_col, mut best) = (k, k, -F::one());
                    for ((i, j), v) in r.slice(s![k.., k..]).indexed_iter() {
                        if v.abs() > best {
                            best = v.abs();
                            best_row = i + k;
                            best_col = j + k;
                        }
                    }
                    swap_columns(&mut r, &mut col_perm, k, best_col);
                    if best_row != k {
                        for j in 0..n {
                            r.swap([k, j], [best_row, j]);
                        }
                        row_swap = Some(best_row);
                    }
                }
            }

            let x = r.slice(s![k.., k]).to_owned();
            let norm = x.dot(&x).sqrt();
            let alpha = if x[0] > F::zero() { -norm } else { norm };
            let mut v = x;
            v[0] -= alpha;
            let vv = v.dot(&v);
            let beta = if vv > F::zero() {
                F::cast(2.) / vv
            } else {
                F::zero()
            };

            for j in k..n {
                let proj = beta * v.dot(&r.slice(s![k.., j]));
                let mut col = r.slice_mut(s![k.., j]);
                col.scaled_add(-proj, &v);
            }

            reflectors.push(Reflector { row_swap, v, beta });
        }

        let lead = if steps > 0 { r[[0, 0]].abs() } else { F::zero() };
        let tol = F::epsilon() * F::cast(100 * m.max(n)) * lead;
        let rank = (0..steps).take_while(|&k| r[[k, k]].abs() > tol).count();

        Qr {
            r,
            reflectors,
            col_perm,
            rank,
        }
    }

    /// Numerical rank
    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn r(&self) -> ArrayView2<'_, F> {
        self.r.view()
    }

    /// Apply the row transformations, `Q^T P_r b`
    fn apply_qt(&self, b: ArrayView1<F>) -> Array1<F> {
        let mut y = b.to_owned();
        for (k, reflector) in self.reflectors.iter().enumerate() {
            if let Some(row) = reflector.row_swap {
                y.swap(k, row);
            }
            let mut tail = y.slice_mut(s![k..]);
            let proj = reflector.beta * reflector.v.dot(&tail);
            tail.scaled_add(-proj, &reflector.v);
        }

        y
    }

    /// Least-squares solution; with truncated rank the basic solution with zeros in the free
    /// components
    pub fn solve(&self, b: ArrayView1<F>) -> Result<Array1<F>> {
        let rank = self.rank;
        let mut x = Array1::zeros(self.col_perm.len());
        if rank == 0 {
            return Ok(x);
        }

        let mut z = self
            .apply_qt(b)
            .slice_move(s![..rank])
            .insert_axis(Axis(1));
        self.r
            .slice(s![..rank, ..rank])
            .solve_triangular_inplace(&mut z, UPLO::Upper)?;
        for (j, value) in z.column(0).iter().enumerate() {
            x[self.col_perm[j]] = *value;
        }

        Ok(x)
    }
}

fn argmax<F: Float>(values: ArrayView1<F>) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate() {
        if *v > values[best] {
            best = i;
        }
    }

    best
}

fn swap_columns<F: Float>(r: &mut Array2<F>, perm: &mut [usize], a: usize, b: usize) {
    if a == b {
        return;
    }
    for i in 0..r.nrows() {
        r.swap([i, a], [i, b]);
    }
    perm.swap(a, b);
}
