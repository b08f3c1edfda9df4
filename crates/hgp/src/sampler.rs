use crate::errors::{HgpError, Result};
use ndarray::{Array1, Array2, ArrayView1, Axis, Zip};
use ndarray_rand::rand::{Rng, SeedableRng};
use ndarray_rand::rand_distr::StandardNormal;
use ndarray_rand::RandomExt;
use rand_xoshiro::Xoshiro256Plus;

/// Monte-Carlo estimator of per-observation noise variances.
///
/// Given a predictive mean `m` and a vector `s` used as the diagonal of the
/// gaussian covariance, `S` vectors `t_j ~ N(m, diag(s))` are drawn and the
/// noise variance at each observation is estimated as
///
/// `(1 / 2S) * sum_j (y - t_j)^2`
///
/// Note that `s` is used as is on the covariance diagonal: callers passing
/// standard deviations get draws whose variance is the standard deviation.
pub struct NoiseSampler<R: Rng = Xoshiro256Plus> {
    sample_size: usize,
    rng: R,
}

impl NoiseSampler<Xoshiro256Plus> {
    /// Constructor drawing `sample_size` vectors, random generator is seeded from entropy
    pub fn new(sample_size: usize) -> Self {
        Self::new_with_rng(sample_size, Xoshiro256Plus::from_entropy())
    }

    /// Constructor drawing `sample_size` vectors with a seeded random generator
    pub fn seeded(sample_size: usize, seed: u64) -> Self {
        Self::new_with_rng(sample_size, Xoshiro256Plus::seed_from_u64(seed))
    }
}

impl<R: Rng> NoiseSampler<R> {
    /// Constructor given a random generator
    pub fn new_with_rng(sample_size: usize, rng: R) -> Self {
        NoiseSampler { sample_size, rng }
    }

    /// Set the random generator
    pub fn with_rng<R2: Rng>(self, rng: R2) -> NoiseSampler<R2> {
        NoiseSampler {
            sample_size: self.sample_size,
            rng,
        }
    }

    /// Number of vectors drawn at each estimation
    pub fn sample_size(&self) -> usize {
        self.sample_size
    }

    /// Draw `sample_size` vectors from `N(mean, diag(cov_diag))`,
    /// returned as the columns of a (n, sample_size) matrix.
    pub fn sample_matrix(
        &mut self,
        mean: &ArrayView1<f64>,
        cov_diag: &ArrayView1<f64>,
    ) -> Result<Array2<f64>> {
        if self.sample_size == 0 {
            return Err(HgpError::SampleError(
                "Sample size should be at least 1".to_string(),
            ));
        }
        if mean.len() != cov_diag.len() {
            return Err(HgpError::SampleError(format!(
                "Mean ({}) and covariance diagonal ({}) lengths mismatch",
                mean.len(),
                cov_diag.len()
            )));
        }
        if mean.iter().any(|v| !v.is_finite()) {
            return Err(HgpError::SampleError(
                "Mean values should be finite".to_string(),
            ));
        }
        if cov_diag.iter().any(|v| !v.is_finite() || *v < 0.) {
            return Err(HgpError::SampleError(
                "Covariance diagonal should hold finite non-negative values".to_string(),
            ));
        }

        let z = Array2::<f64>::random_using(
            (mean.len(), self.sample_size),
            StandardNormal,
            &mut self.rng,
        );
        let scale = cov_diag.mapv(f64::sqrt).insert_axis(Axis(1));
        Ok(z * &scale + &mean.insert_axis(Axis(1)))
    }

    /// Estimate the noise variance of each observation `y`, see [`NoiseSampler`]
    pub fn estimate_variance(
        &mut self,
        mean: &ArrayView1<f64>,
        cov_diag: &ArrayView1<f64>,
        y: &ArrayView1<f64>,
    ) -> Result<Array1<f64>> {
        if y.len() != mean.len() {
            return Err(HgpError::SampleError(format!(
                "Targets ({}) and mean ({}) lengths mismatch",
                y.len(),
                mean.len()
            )));
        }
        let samples = self.sample_matrix(mean, cov_diag)?;
        let factor = 0.5 / self.sample_size as f64;
        let mut variances = Array1::zeros(y.len());
        Zip::from(&mut variances)
            .and(y)
            .and(samples.rows())
            .for_each(|v, y_i, t_i| {
                *v = factor * t_i.mapv(|t| (y_i - t) * (y_i - t)).sum();
            });
        Ok(variances)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_sample_matrix_shape() {
        let mut sampler = NoiseSampler::seeded(7, 42);
        let samples = sampler
            .sample_matrix(&array![0., 1., 2.].view(), &array![0.1, 0.2, 0.3].view())
            .unwrap();
        assert_eq!(samples.shape(), &[3, 7]);
    }

    #[test]
    fn test_zero_covariance_gives_mean() {
        let mut sampler = NoiseSampler::seeded(5, 42);
        let mean = array![1., -2., 3.];
        let samples = sampler
            .sample_matrix(&mean.view(), &Array1::zeros(3).view())
            .unwrap();
        for col in samples.columns() {
            assert_abs_diff_eq!(col, mean.view(), epsilon = 1e-15);
        }
        let y = array![2., -2., 1.];
        let var = sampler
            .estimate_variance(&mean.view(), &Array1::zeros(3).view(), &y.view())
            .unwrap();
        assert_abs_diff_eq!(var, array![0.5, 0., 2.], epsilon = 1e-12);
    }

    #[test]
    fn test_estimate_is_non_negative() {
        for size in [1, 2, 10, 100] {
            let mut sampler = NoiseSampler::seeded(size, 0);
            let var = sampler
                .estimate_variance(
                    &array![0., 1., 2., 3.].view(),
                    &array![0.5, 0.01, 0., 2.].view(),
                    &array![0.3, 1., 2., -1.].view(),
                )
                .unwrap();
            assert!(var.iter().all(|v| v.is_finite() && *v >= 0.));
        }
    }

    #[test]
    fn test_estimate_converges_to_expected_squared_residual() {
        let mean = array![0., 1., -1.];
        let cov_diag = array![0.3, 1.2, 0.05];
        let y = array![0.5, 0., -1.];
        // E[(y - t)^2] / 2 with t ~ N(m, s) is ((y - m)^2 + s) / 2
        let expected = ((&y - &mean).mapv(|v| v * v) + &cov_diag) * 0.5;

        let n_seeds = 2000;
        let mut avg = Array1::<f64>::zeros(3);
        for seed in 0..n_seeds {
            let mut sampler = NoiseSampler::seeded(50, seed);
            avg += &sampler
                .estimate_variance(&mean.view(), &cov_diag.view(), &y.view())
                .unwrap();
        }
        avg /= n_seeds as f64;
        assert_abs_diff_eq!(avg, expected, epsilon = 2e-2);
    }

    #[test]
    fn test_covariance_diagonal_is_used_as_variance() {
        // The diagonal is the variance of the draws: passing a standard deviation
        // of 0.25 yields draws of variance 0.25, not 0.0625.
        let mut sampler = NoiseSampler::seeded(20000, 3);
        let samples = sampler
            .sample_matrix(&array![0.].view(), &array![0.25].view())
            .unwrap();
        let row = samples.row(0);
        let var = row.mapv(|v| v * v).mean().unwrap();
        assert_abs_diff_eq!(var, 0.25, epsilon = 1e-2);
    }

    #[test]
    fn test_single_sample() {
        let mut sampler = NoiseSampler::seeded(1, 11);
        let var = sampler
            .estimate_variance(
                &array![0., 0.].view(),
                &array![1., 1.].view(),
                &array![0., 0.].view(),
            )
            .unwrap();
        assert_eq!(var.len(), 2);
        assert!(var.iter().all(|v| v.is_finite() && *v >= 0.));
    }

    #[test]
    fn test_seeded_is_deterministic() {
        let estimate = |seed| {
            NoiseSampler::seeded(10, seed)
                .estimate_variance(
                    &array![0., 1.].view(),
                    &array![0.2, 0.4].view(),
                    &array![0.1, 0.9].view(),
                )
                .unwrap()
        };
        assert_eq!(estimate(5), estimate(5));
        assert_ne!(estimate(5), estimate(6));
    }

    #[test]
    fn test_with_rng_replaces_generator() {
        let mean = array![0., 1., -2.];
        let cov_diag = array![0.2, 0.4, 1.0];
        let mut sampler = NoiseSampler::seeded(8, 1).with_rng(Xoshiro256Plus::seed_from_u64(9));
        assert_eq!(sampler.sample_size(), 8);
        let expected = NoiseSampler::seeded(8, 9)
            .sample_matrix(&mean.view(), &cov_diag.view())
            .unwrap();
        assert_eq!(
            sampler.sample_matrix(&mean.view(), &cov_diag.view()).unwrap(),
            expected
        );
    }

    #[test]
    fn test_fresh_draws_on_each_call() {
        let mut sampler = NoiseSampler::seeded(10, 5);
        let mean = array![0., 1.];
        let cov_diag = array![0.2, 0.4];
        let s1 = sampler.sample_matrix(&mean.view(), &cov_diag.view()).unwrap();
        let s2 = sampler.sample_matrix(&mean.view(), &cov_diag.view()).unwrap();
        assert_ne!(s1, s2);
    }

    #[test]
    fn test_invalid_inputs() {
        let mut sampler = NoiseSampler::seeded(10, 5);
        let mean = array![0., 1.];
        assert!(matches!(
            sampler.sample_matrix(&mean.view(), &array![0.2, -0.4].view()),
            Err(HgpError::SampleError(_))
        ));
        assert!(matches!(
            sampler.sample_matrix(&mean.view(), &array![0.2].view()),
            Err(HgpError::SampleError(_))
        ));
        assert!(matches!(
            sampler.sample_matrix(&mean.view(), &array![0.2, f64::NAN].view()),
            Err(HgpError::SampleError(_))
        ));
        assert!(matches!(
            sampler.estimate_variance(&mean.view(), &array![0.2, 0.4].view(), &array![1.].view()),
            Err(HgpError::SampleError(_))
        ));
        assert!(matches!(
            NoiseSampler::seeded(0, 1).sample_matrix(&mean.view(), &array![0.2, 0.4].view()),
            Err(HgpError::SampleError(_))
        ));
    }
}
