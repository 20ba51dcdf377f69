use std::sync::Arc;

use ndarray::Array1;
use ndarray_rand::rand_distr::StandardNormal;
use ndarray_rand::RandomExt;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256Plus;
use sgcore::object::{clone_parameterized, Parameter};
use sgcore::{Float, Parameterized, SgObject};
use sprs::CsMat;

use super::coloring::{greedy_coloring, ColoringVariant, OrderingVariant};
use crate::error::{LinalgError, Result};

/// Source of the sample vectors `s` of the estimate `tr(f(A)) ~ sum_s s^T f(A) s`
///
/// Samples are addressed by `(draw, idx)`: the estimator asks for every `idx < num_samples()` in
/// each independent draw. Samplers are deterministic in that address, so draws can be evaluated
/// in any order and on any thread.
pub trait TraceSampler<F: Float>: SgObject {
    fn dimension(&self) -> usize;

    /// Sample vectors per draw, valid after `precompute`
    fn num_samples(&self) -> usize;

    fn precompute(&mut self) -> Result<()>;

    fn sample(&self, draw: usize, idx: usize) -> Result<Array1<F>>;

    fn boxed_clone(&self) -> Result<Box<dyn TraceSampler<F>>>;
}

/// Independent generator for a sample address
pub(crate) fn sample_rng(seed: u64, draw: usize, idx: usize) -> Xoshiro256Plus {
    Xoshiro256Plus::seed_from_u64(
        seed ^ (draw as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
            ^ (idx as u64).wrapping_mul(0xC2B2_AE3D_27D4_EB4F),
    )
}

fn check_index(idx: usize, len: usize) -> Result<()> {
    if idx >= len {
        return Err(sgcore::Error::IndexOutOfBounds { index: idx, len }.into());
    }

    Ok(())
}

/// One standard normal sample per draw
#[derive(Debug, Clone)]
pub struct NormalSampler {
    dimension: usize,
    seed: u64,
}

impl NormalSampler {
    pub fn new(dimension: usize) -> Self {
        NormalSampler { dimension, seed: 0 }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

impl Parameterized for NormalSampler {
    const NAME: &'static str = "NormalSampler";

    fn parameters() -> Vec<Parameter<Self>> {
        vec![
            Parameter::new(
                "dimension",
                "Dimension of the sample vectors",
                |s: &Self| s.dimension,
                |s: &mut Self, v: usize| s.dimension = v,
            )
            .not_available(),
            Parameter::new(
                "seed",
                "Seed of the sample generator",
                |s: &Self| s.seed,
                |s: &mut Self, v: u64| s.seed = v,
            )
            .not_available(),
        ]
    }

    fn new_instance(&self) -> sgcore::error::Result<Self> {
        Ok(NormalSampler::new(0))
    }
}

impl<F: Float> TraceSampler<F> for NormalSampler {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn num_samples(&self) -> usize {
        1
    }

    fn precompute(&mut self) -> Result<()> {
        Ok(())
    }

    fn sample(&self, draw: usize, idx: usize) -> Result<Array1<F>> {
        check_index(idx, 1)?;
        let mut rng = sample_rng(self.seed, draw, idx);
        let sample = Array1::<f64>::random_using(self.dimension, StandardNormal, &mut rng);

        Ok(sample.mapv(|v| F::cast(v)))
    }

    fn boxed_clone(&self) -> Result<Box<dyn TraceSampler<F>>> {
        Ok(Box::new(clone_parameterized(self)?))
    }
}

/// Probing vectors from a coloring of the sparsity pattern of `A^power`
///
/// Each color class gets one sample: random signs on the vertices of the class, zero elsewhere.
/// The cross terms between vertices of one class are entries of `f(A)` between vertices that are
/// far apart in the graph of `A`, which decay quickly for the logarithm of well conditioned
/// operators. A diagonal operator needs a single sample and gives the exact trace.
pub struct ProbingSampler<F: Float> {
    pattern: Arc<CsMat<F>>,
    power: usize,
    ordering: OrderingVariant,
    coloring: ColoringVariant,
    seed: u64,
    colors: Vec<usize>,
    num_colors: usize,
    is_precomputed: bool,
}

impl<F: Float> ProbingSampler<F> {
    pub fn new(pattern: Arc<CsMat<F>>) -> Result<Self> {
        let (rows, cols) = pattern.shape();
        if rows != cols {
            return Err(LinalgError::NotSquare { rows, cols });
        }

        Ok(ProbingSampler {
            pattern,
            power: 1,
            ordering: OrderingVariant::Natural,
            coloring: ColoringVariant::DistanceTwo,
            seed: 0,
            colors: Vec::new(),
            num_colors: 0,
            is_precomputed: false,
        })
    }

    pub fn power(mut self, power: usize) -> Self {
        self.power = power;
        self
    }

    pub fn ordering(mut self, ordering: OrderingVariant) -> Self {
        self.ordering = ordering;
        self
    }

    pub fn coloring(mut self, coloring: ColoringVariant) -> Self {
        self.coloring = coloring;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Color of every vertex, empty before `precompute`
    pub fn colors(&self) -> &[usize] {
        &self.colors
    }
}

impl<F: Float> Parameterized for ProbingSampler<F> {
    const NAME: &'static str = "ProbingSampler";

    fn parameters() -> Vec<Parameter<Self>> {
        vec![
            Parameter::new(
                "matrix_power",
                "Power of the sparse matrix whose pattern is colored",
                |s: &Self| s.power,
                |s: &mut Self, v: usize| s.power = v,
            )
            .not_available(),
            Parameter::new(
                "ordering",
                "Ordering variant of the greedy coloring",
                |s: &Self| s.ordering,
                |s: &mut Self, v: OrderingVariant| s.ordering = v,
            )
            .not_available(),
            Parameter::new(
                "coloring",
                "Coloring variant",
                |s: &Self| s.coloring,
                |s: &mut Self, v: ColoringVariant| s.coloring = v,
            )
            .not_available(),
            Parameter::new(
                "seed",
                "Seed of the sample signs",
                |s: &Self| s.seed,
                |s: &mut Self, v: u64| s.seed = v,
            )
            .not_available(),
            Parameter::new(
                "coloring_vector",
                "Color of every vertex",
                |s: &Self| s.colors.clone(),
                |s: &mut Self, v: Vec<usize>| s.colors = v,
            )
            .not_available(),
            Parameter::new(
                "num_colors",
                "Number of colors",
                |s: &Self| s.num_colors,
                |s: &mut Self, v: usize| s.num_colors = v,
            )
            .not_available(),
            Parameter::new(
                "is_precomputed",
                "Whether the coloring is computed",
                |s: &Self| s.is_precomputed,
                |s: &mut Self, v: bool| s.is_precomputed = v,
            )
            .not_available(),
        ]
    }

    fn new_instance(&self) -> sgcore::error::Result<Self> {
        ProbingSampler::new(self.pattern.clone())
            .map_err(|e| sgcore::Error::Parameters(e.to_string()))
    }
}

impl<F: Float> TraceSampler<F> for ProbingSampler<F> {
    fn dimension(&self) -> usize {
        self.pattern.rows()
    }

    fn num_samples(&self) -> usize {
        self.num_colors
    }

    fn precompute(&mut self) -> Result<()> {
        if self.is_precomputed {
            return Ok(());
        }

        let (colors, num_colors) =
            greedy_coloring(&self.pattern, self.power, self.ordering, self.coloring);
        log::debug!(
            "probing sampler: {} colors for {} vertices",
            num_colors,
            colors.len()
        );

        self.colors = colors;
        self.num_colors = num_colors;
        self.is_precomputed = true;

        Ok(())
    }

    fn sample(&self, draw: usize, idx: usize) -> Result<Array1<F>> {
        check_index(idx, self.num_colors)?;

        let mut rng = sample_rng(self.seed, draw, idx);
        let sample = self
            .colors
            .iter()
            .map(|color| {
                let sign = if rng.gen::<bool>() { F::one() } else { -F::one() };
                if *color == idx {
                    sign
                } else {
                    F::zero()
                }
            })
            .collect();

        Ok(sample)
    }

    fn boxed_clone(&self) -> Result<Box<dyn TraceSampler<F>>> {
        Ok(Box::new(clone_parameterized(self)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use sprs::TriMat;

    fn tridiagonal(n: usize) -> Arc<CsMat<f64>> {
        let mut tri = TriMat::new((n, n));
        for i in 0..n {
            tri.add_triplet(i, i, 4.0);
            if i + 1 < n {
                tri.add_triplet(i, i + 1, 1.0);
                tri.add_triplet(i + 1, i, 1.0);
            }
        }
        Arc::new(tri.to_csr())
    }

    #[test]
    fn samples_partition_the_vertices() {
        let mut sampler = ProbingSampler::new(tridiagonal(9)).unwrap();
        TraceSampler::<f64>::precompute(&mut sampler).unwrap();
        assert_eq!(TraceSampler::<f64>::num_samples(&sampler), 3);

        let mut covered = Array1::<f64>::zeros(9);
        for idx in 0..3 {
            let sample: Array1<f64> = sampler.sample(7, idx).unwrap();
            assert!(sample.iter().all(|v| *v == 0.0 || v.abs() == 1.0));
            covered += &sample.mapv(f64::abs);
        }
        assert_abs_diff_eq!(covered, Array1::<f64>::ones(9));
        assert!(TraceSampler::<f64>::sample(&sampler, 0, 3).is_err());
    }

    #[test]
    fn samples_are_deterministic_per_address() {
        let sampler = NormalSampler::new(5).with_seed(11);
        let first: Array1<f64> = sampler.sample(3, 0).unwrap();
        let again: Array1<f64> = sampler.sample(3, 0).unwrap();
        let other: Array1<f64> = sampler.sample(4, 0).unwrap();

        assert_eq!(first, again);
        assert_ne!(first, other);
        assert!(TraceSampler::<f64>::sample(&sampler, 0, 1).is_err());
    }

    #[test]
    fn clone_keeps_the_largest_seed() {
        let sampler = NormalSampler::new(4).with_seed(u64::MAX);
        let cloned = TraceSampler::<f64>::boxed_clone(&sampler).unwrap();

        assert_eq!(
            cloned.sample(2, 0).unwrap(),
            TraceSampler::<f64>::sample(&sampler, 2, 0).unwrap()
        );
    }

    #[test]
    fn clone_keeps_the_coloring() {
        let mut sampler = ProbingSampler::new(tridiagonal(6))
            .unwrap()
            .coloring(ColoringVariant::DistanceOne);
        TraceSampler::<f64>::precompute(&mut sampler).unwrap();

        let cloned = TraceSampler::<f64>::boxed_clone(&sampler).unwrap();
        assert_eq!(cloned.num_samples(), 2);
        assert_eq!(
            cloned.sample(1, 1).unwrap(),
            TraceSampler::<f64>::sample(&sampler, 1, 1).unwrap()
        );
    }
}
