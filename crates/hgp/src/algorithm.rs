use crate::errors::{HgpError, Result};
use crate::parameters::{HgpParams, HgpValidParams};
use crate::regressor::{NoiseConfig, Regressor};
use crate::sampler::NoiseSampler;

use linfa::prelude::{DatasetBase, Fit};
use log::{debug, info};
use ndarray::{Array1, ArrayBase, ArrayView1, ArrayView2, Data, Ix1, Ix2, Zip};

use std::fmt;
use std::time::Instant;

/// Floor added to estimated noise variances before taking their logarithm
pub const VARIANCE_FLOOR: f64 = 1e-10;

/// Kind of predictive uncertainty
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Uncertainty {
    /// Epistemic and aleatoric uncertainties combined
    #[default]
    Full,
    /// Input dependent observation noise only
    Aleatoric,
    /// Uncertainty of the signal model only
    Epistemic,
}

/// Most-likely heteroscedastic GP regression.
///
/// Observations are modeled as `y = f(x) + e(x)` where `e(x) ~ N(0, r(x))`
/// has an input dependent variance. Two regression models are trained
/// alternately:
/// * the signal model `f`, fitted with the noise variances estimated at the previous iteration
///   (its own homoscedastic noise at first iteration),
/// * the noise model fitted on `log(r)`, where `r` is estimated at training points by
///   Monte-Carlo sampling of the signal model predictive distribution, see [`NoiseSampler`].
///
/// The predictive uncertainty splits into an epistemic part (signal model variance)
/// and an aleatoric part (exponentiated noise model prediction).
///
/// # Example
///
/// ```no_run
/// use hetgp::{HeteroscedasticGp, KrigingRegressor, Uncertainty};
/// use hetgp_gp::{GpParams, LinearMean, SquaredExponentialCorr};
/// use linfa::prelude::*;
/// use ndarray::{Array, Axis};
///
/// let xt = Array::linspace(0., 10., 30).insert_axis(Axis(1));
/// let yt = xt.column(0).mapv(f64::sin);
///
/// let hgp = HeteroscedasticGp::params(
///         KrigingRegressor::default(),
///         hetgp::GpRegressor::new(GpParams::new(LinearMean(), SquaredExponentialCorr())),
///     )
///     .num_iters(3)
///     .seed(Some(42))
///     .fit(&Dataset::new(xt.clone(), yt))
///     .expect("HGP fit");
///
/// let (mean, aleatoric_std) = hgp
///     .predict_std(&xt.view(), Uncertainty::Aleatoric)
///     .expect("HGP prediction");
/// ```
///
/// # Reference
///
/// Kersting, Kristian, et al. Most likely heteroscedastic Gaussian process regression.
/// Proceedings of the 24th international conference on Machine learning (2007): 393-400.
#[derive(Clone, Debug)]
pub struct HeteroscedasticGp<M: Regressor, N: Regressor> {
    /// Signal model
    model: M,
    /// Model of the noise log-variance
    model_noise: N,
    /// Noise variances at training points estimated at last iteration
    training_noise: Array1<f64>,
    /// Noise model RMSE against its target, one per iteration when reported
    noise_rmse_history: Vec<f64>,
}

impl<M: Regressor, N: Regressor> HeteroscedasticGp<M, N> {
    /// Heteroscedastic GP parameters constructor given signal and noise models
    pub fn params(model: M, model_noise: N) -> HgpParams<M, N> {
        HgpParams::new(model, model_noise)
    }

    /// Predict signal mean values at n points given as (n, nx) matrix
    pub fn predict(&self, x: &ArrayView2<f64>) -> Result<Array1<f64>> {
        self.model.predict(x)
    }

    /// Predict signal mean values and the standard deviation of the given `kind`
    pub fn predict_std(
        &self,
        x: &ArrayView2<f64>,
        kind: Uncertainty,
    ) -> Result<(Array1<f64>, Array1<f64>)> {
        let (mean, ep_std) = self.model.predict_std(x)?;
        let std = match kind {
            Uncertainty::Epistemic => ep_std,
            Uncertainty::Aleatoric => self.predict_aleatoric_var(x)?.mapv(f64::sqrt),
            Uncertainty::Full => {
                let al_var = self.predict_aleatoric_var(x)?;
                let mut std = ep_std;
                Zip::from(&mut std)
                    .and(&al_var)
                    .for_each(|s, al| *s = (*s * *s + al).sqrt());
                std
            }
        };
        Ok((mean, std))
    }

    /// Predict epistemic variances, ie signal model variances
    pub fn predict_epistemic_var(&self, x: &ArrayView2<f64>) -> Result<Array1<f64>> {
        let (_, std) = self.model.predict_std(x)?;
        Ok(std.mapv(|v| v * v))
    }

    /// Predict aleatoric variances, ie exponentiated noise model predictions
    pub fn predict_aleatoric_var(&self, x: &ArrayView2<f64>) -> Result<Array1<f64>> {
        Ok(self.model_noise.predict(x)?.mapv(f64::exp))
    }

    /// Fitted signal model
    pub fn model(&self) -> &M {
        &self.model
    }

    /// Fitted noise model, trained on noise log-variances
    pub fn model_noise(&self) -> &N {
        &self.model_noise
    }

    /// Noise variances at training points estimated at last iteration
    pub fn training_noise(&self) -> &Array1<f64> {
        &self.training_noise
    }

    /// Noise model RMSE at each iteration, empty unless
    /// [`HgpParams::report_noise_rmse`] is enabled
    pub fn noise_rmse_history(&self) -> &[f64] {
        &self.noise_rmse_history
    }
}

impl<M: Regressor, N: Regressor> fmt::Display for HeteroscedasticGp<M, N> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "HeteroscedasticGp(signal={}, noise={})",
            self.model, self.model_noise
        )
    }
}

impl<M, N, D> Fit<ArrayBase<D, Ix2>, ArrayBase<D, Ix1>, HgpError> for HgpValidParams<M, N>
where
    M: Regressor + Clone,
    N: Regressor + Clone,
    D: Data<Elem = f64>,
{
    type Object = HeteroscedasticGp<M, N>;

    /// Fit signal and noise models alternately
    fn fit(
        &self,
        dataset: &DatasetBase<ArrayBase<D, Ix2>, ArrayBase<D, Ix1>>,
    ) -> Result<Self::Object> {
        let x = dataset.records().view();
        let y = dataset.targets().view();
        check_training_data(&x, &y)?;

        let mut sampler = match self.seed {
            Some(seed) => NoiseSampler::seeded(self.sample_size, seed),
            None => NoiseSampler::new(self.sample_size),
        };
        let mut model = self.model.clone();
        let mut model_noise = self.model_noise.clone();
        let mut noise_x_dep: Option<Array1<f64>> = None;
        let mut noise_rmse_history = vec![];

        for i in 0..self.num_iters {
            let now = Instant::now();
            let config = match &noise_x_dep {
                None => NoiseConfig::Homoscedastic,
                Some(noise) => NoiseConfig::Heteroscedastic(noise.to_owned()),
            };
            model.fit(&x, &y, &config)?;
            let (mean, ep_std) = model.predict_std(&x)?;

            let std = match &noise_x_dep {
                None => ep_std,
                Some(noise) => (&ep_std * &ep_std + noise).mapv(f64::sqrt),
            };
            let variances = sampler.estimate_variance(&mean.view(), &std.view(), &y)?;
            let target = variances.mapv(|v| (v + VARIANCE_FLOOR).ln());

            model_noise.fit(&x, &target.view(), &NoiseConfig::Homoscedastic)?;
            let log_noise = model_noise.predict(&x)?;

            if self.report_noise_rmse {
                let rmse = (&log_noise - &target).mapv(|v| v * v).mean().unwrap_or(0.).sqrt();
                info!("Iteration {}: noise model RMSE = {}", i + 1, rmse);
                noise_rmse_history.push(rmse);
            }
            debug!(
                "Iteration {}/{} done in {}ms, mean log-variance target = {}",
                i + 1,
                self.num_iters,
                now.elapsed().as_millis(),
                target.mean().unwrap_or(f64::NAN)
            );
            noise_x_dep = Some(log_noise.mapv(f64::exp));
        }

        let training_noise = noise_x_dep.ok_or_else(|| {
            HgpError::InvalidValueError("Number of iterations should be at least 1".to_string())
        })?;
        Ok(HeteroscedasticGp {
            model,
            model_noise,
            training_noise,
            noise_rmse_history,
        })
    }
}

fn check_training_data(x: &ArrayView2<f64>, y: &ArrayView1<f64>) -> Result<()> {
    if x.nrows() < 2 {
        return Err(HgpError::InvalidValueError(format!(
            "At least 2 training points are required, got {}",
            x.nrows()
        )));
    }
    if x.nrows() != y.len() {
        return Err(HgpError::InvalidValueError(format!(
            "Training inputs ({}) and outputs ({}) should have the same number of rows",
            x.nrows(),
            y.len()
        )));
    }
    if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
        return Err(HgpError::InvalidValueError(
            "Training data should hold finite values".to_string(),
        ));
    }
    Ok(())
}
