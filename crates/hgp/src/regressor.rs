use crate::errors::Result;
use ndarray::{Array1, ArrayView1, ArrayView2};
use std::fmt;

/// Noise assumption given to a regression model at fit time.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum NoiseConfig {
    /// The model estimates a single noise level on its own
    #[default]
    Homoscedastic,
    /// Noise scale is fixed to 1 and the given variances, one per training point,
    /// are added to the model covariance
    Heteroscedastic(Array1<f64>),
}

impl NoiseConfig {
    /// Per-observation variances, if any
    pub fn variances(&self) -> Option<&Array1<f64>> {
        match self {
            NoiseConfig::Homoscedastic => None,
            NoiseConfig::Heteroscedastic(v) => Some(v),
        }
    }
}

/// A trait for regression models used by [`HeteroscedasticGp`](crate::HeteroscedasticGp)
/// to fit either the signal or the log-variance of the noise.
pub trait Regressor: fmt::Display {
    /// Train the model in place given `x` as a (n, nx) matrix, `y` as (n,) targets
    /// and the noise assumption to be used.
    fn fit(&mut self, x: &ArrayView2<f64>, y: &ArrayView1<f64>, noise: &NoiseConfig)
        -> Result<()>;

    /// Predict mean values at n points given as (n, nx) matrix.
    fn predict(&self, x: &ArrayView2<f64>) -> Result<Array1<f64>>;

    /// Predict mean values and epistemic standard deviations at n points given as (n, nx) matrix.
    fn predict_std(&self, x: &ArrayView2<f64>) -> Result<(Array1<f64>, Array1<f64>)>;
}
