use crate::errors::{HgpError, Result};
use crate::regressor::Regressor;
use linfa::ParamGuard;

/// Default number of alternating signal/noise fits
pub const HGP_NUM_ITERS: usize = 5;
/// Default number of Monte-Carlo draws used to estimate the noise
pub const HGP_SAMPLE_SIZE: usize = 150;

/// A set of validated heteroscedastic GP parameters.
#[derive(Clone, Debug)]
pub struct HgpValidParams<M: Regressor, N: Regressor> {
    /// Model of the signal
    pub(crate) model: M,
    /// Model of the log-variance of the noise
    pub(crate) model_noise: N,
    /// Number of alternating fits
    pub(crate) num_iters: usize,
    /// Number of Monte-Carlo draws for noise estimation
    pub(crate) sample_size: usize,
    /// Random generator seed, entropy is used when not set
    pub(crate) seed: Option<u64>,
    /// Whether the noise model training error is logged and recorded
    pub(crate) report_noise_rmse: bool,
}

impl<M: Regressor, N: Regressor> HgpValidParams<M, N> {
    /// Get signal model
    pub fn model(&self) -> &M {
        &self.model
    }

    /// Get noise model
    pub fn model_noise(&self) -> &N {
        &self.model_noise
    }

    /// Get the number of alternating fits
    pub fn num_iters(&self) -> usize {
        self.num_iters
    }

    /// Get the number of Monte-Carlo draws
    pub fn sample_size(&self) -> usize {
        self.sample_size
    }

    /// Get the random generator seed
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Whether noise model RMSE is reported
    pub fn report_noise_rmse(&self) -> bool {
        self.report_noise_rmse
    }
}

/// The set of hyperparameters that can be specified for the execution of
/// the [heteroscedastic GP algorithm](crate::HeteroscedasticGp).
#[derive(Clone, Debug)]
pub struct HgpParams<M: Regressor, N: Regressor>(HgpValidParams<M, N>);

impl<M: Regressor, N: Regressor> HgpParams<M, N> {
    /// Constructor given the signal model and the noise model
    pub fn new(model: M, model_noise: N) -> HgpParams<M, N> {
        Self(HgpValidParams {
            model,
            model_noise,
            num_iters: HGP_NUM_ITERS,
            sample_size: HGP_SAMPLE_SIZE,
            seed: None,
            report_noise_rmse: false,
        })
    }

    /// Set the number of alternating signal/noise fits
    pub fn num_iters(mut self, num_iters: usize) -> Self {
        self.0.num_iters = num_iters;
        self
    }

    /// Set the number of Monte-Carlo draws used to estimate the noise
    pub fn sample_size(mut self, sample_size: usize) -> Self {
        self.0.sample_size = sample_size;
        self
    }

    /// Set the random generator seed
    pub fn seed(mut self, seed: Option<u64>) -> Self {
        self.0.seed = seed;
        self
    }

    /// Log and record the noise model RMSE against its target at each iteration
    pub fn report_noise_rmse(mut self, report: bool) -> Self {
        self.0.report_noise_rmse = report;
        self
    }
}

impl<M: Regressor, N: Regressor> From<HgpValidParams<M, N>> for HgpParams<M, N> {
    fn from(valid: HgpValidParams<M, N>) -> Self {
        HgpParams(valid)
    }
}

impl<M: Regressor, N: Regressor> ParamGuard for HgpParams<M, N> {
    type Checked = HgpValidParams<M, N>;
    type Error = HgpError;

    fn check_ref(&self) -> Result<&Self::Checked> {
        if self.0.num_iters < 1 {
            return Err(HgpError::InvalidValueError(
                "Number of iterations should be at least 1".to_string(),
            ));
        }
        if self.0.sample_size < 1 {
            return Err(HgpError::InvalidValueError(
                "Sample size should be at least 1".to_string(),
            ));
        }
        Ok(&self.0)
    }

    fn check(self) -> Result<Self::Checked> {
        self.check_ref()?;
        Ok(self.0)
    }
}
