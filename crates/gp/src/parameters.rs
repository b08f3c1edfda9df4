use crate::correlation_models::CorrelationModel;
use crate::errors::{GpError, Result};
use crate::mean_models::MeanModel;
use crate::{GP_COBYLA_MAX_EVAL, GP_COBYLA_MIN_EVAL, GP_OPTIM_N_START};
use linfa::{Float, ParamGuard};

use ndarray::{array, Array1};

/// Handling of the correlation hyperparameters `theta`.
///
/// One-element arrays are broadcast to the input dimension at fit time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ThetaTuning<F: Float> {
    /// Given values, not estimated
    Fixed(Array1<F>),
    /// Estimated by likelihood maximization
    Optimized {
        /// Starting point
        init: Array1<F>,
        /// Search space as (lower, upper) per component
        bounds: Array1<(F, F)>,
    },
}

impl<F: Float> Default for ThetaTuning<F> {
    fn default() -> Self {
        let (lo, up) = Self::DEFAULT_BOUNDS;
        ThetaTuning::Optimized {
            init: array![F::cast(Self::DEFAULT_INIT)],
            bounds: array![(F::cast(lo), F::cast(up))],
        }
    }
}

impl<F: Float> ThetaTuning<F> {
    /// Default starting theta
    pub const DEFAULT_INIT: f64 = 1e-1;
    /// Default theta search space
    pub const DEFAULT_BOUNDS: (f64, f64) = (1e-2, 1e1);

    /// Fixed values or starting point of the estimation
    pub fn init(&self) -> &Array1<F> {
        match self {
            ThetaTuning::Fixed(theta) | ThetaTuning::Optimized { init: theta, .. } => theta,
        }
    }

    /// Search space, `None` when fixed
    pub fn bounds(&self) -> Option<&Array1<(F, F)>> {
        match self {
            ThetaTuning::Fixed(_) => None,
            ThetaTuning::Optimized { bounds, .. } => Some(bounds),
        }
    }

    fn check(&self) -> Result<()> {
        let theta = self.init();
        if theta.is_empty() || theta.iter().any(|v| !(*v > F::zero() && v.is_finite())) {
            return Err(GpError::InvalidValueError(format!(
                "Theta values should be finite and strictly positive, got {theta}"
            )));
        }
        if let Some(bounds) = self.bounds() {
            if bounds.is_empty()
                || bounds
                    .iter()
                    .any(|(lo, up)| !(*lo > F::zero() && lo <= up && up.is_finite()))
            {
                return Err(GpError::InvalidValueError(
                    "Theta search space should verify 0 < lower <= upper".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Observation noise handling of the GP.
///
/// Noise variances are expressed in the units of the training targets (squared).
/// They are added to the diagonal of the training covariance matrix,
/// predicted variances are the ones of the latent (noise free) process.
#[derive(Clone, Debug, PartialEq)]
pub enum NoiseTuning<F: Float> {
    /// Homoscedastic noise with a given constant variance
    Fixed(F),
    /// Homoscedastic noise whose variance is estimated with the other hyperparameters
    Optimized {
        /// Initial guess of the noise variance
        init: F,
        /// Bounds of the noise variance (lower, upper)
        bounds: (F, F),
    },
    /// Per-observation noise: `scale * variances[i]` is the noise variance of the ith training point
    Heteroscedastic {
        /// Overall noise scale, not estimated
        scale: F,
        /// Noise variances, one per training point
        variances: Array1<F>,
    },
}

impl<F: Float> Default for NoiseTuning<F> {
    fn default() -> NoiseTuning<F> {
        let (lo, up) = Self::DEFAULT_BOUNDS;
        Self::Optimized {
            init: F::cast(Self::DEFAULT_INIT),
            bounds: (F::cast(lo), F::cast(up)),
        }
    }
}

impl<F: Float> NoiseTuning<F> {
    /// Default initial noise variance when estimated
    pub const DEFAULT_INIT: f64 = 1e-2;
    /// Default bounds of the noise variance when estimated
    pub const DEFAULT_BOUNDS: (f64, f64) = (1e-10, 1e4);

    /// Per-observation noise with unit scale
    pub fn heteroscedastic(variances: Array1<F>) -> Self {
        Self::Heteroscedastic {
            scale: F::one(),
            variances,
        }
    }

    /// Whether the noise variance is part of the likelihood optimization
    pub fn is_optimized(&self) -> bool {
        matches!(self, NoiseTuning::Optimized { .. })
    }

    fn check(&self) -> Result<()> {
        match self {
            NoiseTuning::Fixed(v) => {
                if !v.is_finite() || *v < F::zero() {
                    return Err(GpError::InvalidValueError(format!(
                        "Noise variance should be a finite non-negative value, got {v}"
                    )));
                }
            }
            NoiseTuning::Optimized {
                init,
                bounds: (lo, up),
            } => {
                if !(*lo > F::zero() && lo <= init && init <= up && up.is_finite()) {
                    return Err(GpError::InvalidValueError(format!(
                        "Noise variance tuning should verify 0 < lower ({lo}) <= init ({init}) <= upper ({up})"
                    )));
                }
            }
            NoiseTuning::Heteroscedastic { scale, variances } => {
                if !scale.is_finite() || *scale <= F::zero() {
                    return Err(GpError::InvalidValueError(format!(
                        "Noise scale should be a finite positive value, got {scale}"
                    )));
                }
                if variances.iter().any(|v| !v.is_finite() || *v < F::zero()) {
                    return Err(GpError::InvalidValueError(
                        "Noise variances should be finite non-negative values".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// GP parameters checked by [`GpParams`], ready to be fitted.
#[derive(Clone, Debug, PartialEq)]
pub struct GpValidParams<F: Float, Mean: MeanModel<F>, Corr: CorrelationModel<F>> {
    pub(crate) theta_tuning: ThetaTuning<F>,
    pub(crate) noise: NoiseTuning<F>,
    pub(crate) mean: Mean,
    pub(crate) corr: Corr,
    /// Number of random starting points added to `theta_tuning` init
    pub(crate) n_start: usize,
    /// Likelihood evaluations budget of one optimization
    pub(crate) max_eval: usize,
    /// Relative jitter added to the covariance diagonal
    pub(crate) nugget: F,
    /// Seed of the random starting points
    pub(crate) seed: u64,
}

impl<F: Float, Mean: MeanModel<F>, Corr: CorrelationModel<F>> GpValidParams<F, Mean, Corr> {
    fn with_models(mean: Mean, corr: Corr) -> Self {
        GpValidParams {
            theta_tuning: ThetaTuning::default(),
            noise: NoiseTuning::default(),
            mean,
            corr,
            n_start: GP_OPTIM_N_START,
            max_eval: GP_COBYLA_MAX_EVAL,
            nugget: F::cast(100.0) * F::epsilon(),
            seed: 42,
        }
    }

    /// Mean model
    pub fn mean(&self) -> &Mean {
        &self.mean
    }

    /// Correlation model
    pub fn corr(&self) -> &Corr {
        &self.corr
    }

    /// Theta handling
    pub fn theta_tuning(&self) -> &ThetaTuning<F> {
        &self.theta_tuning
    }

    /// Noise handling
    pub fn noise(&self) -> &NoiseTuning<F> {
        &self.noise
    }

    /// Number of random starting points of the likelihood optimization
    pub fn n_start(&self) -> usize {
        self.n_start
    }

    /// Likelihood evaluations budget of one optimization
    pub fn max_eval(&self) -> usize {
        self.max_eval
    }

    /// Relative jitter added to the covariance diagonal
    pub fn nugget(&self) -> F {
        self.nugget
    }

    /// Seed of the random starting points
    pub fn seed(&self) -> u64 {
        self.seed
    }
}

/// Builder of the [GP algorithm](crate::GaussianProcess) parameters.
#[derive(Clone, Debug)]
pub struct GpParams<F: Float, Mean: MeanModel<F>, Corr: CorrelationModel<F>>(
    GpValidParams<F, Mean, Corr>,
);

impl<F: Float, Mean: MeanModel<F>, Corr: CorrelationModel<F>> GpParams<F, Mean, Corr> {
    /// Default parameters with the given mean and correlation models
    pub fn new(mean: Mean, corr: Corr) -> GpParams<F, Mean, Corr> {
        Self(GpValidParams::with_models(mean, corr))
    }

    /// Set theta handling, see [`ThetaTuning`]
    pub fn theta_tuning(mut self, theta_tuning: ThetaTuning<F>) -> Self {
        self.0.theta_tuning = theta_tuning;
        self
    }

    /// Set observation noise handling, see [`NoiseTuning`]
    pub fn noise(mut self, noise: NoiseTuning<F>) -> Self {
        self.0.noise = noise;
        self
    }

    /// Set the number of random starting points of the likelihood optimization
    pub fn n_start(mut self, n_start: usize) -> Self {
        self.0.n_start = n_start;
        self
    }

    /// Set the likelihood evaluations budget of one optimization,
    /// raised to [crate::GP_COBYLA_MIN_EVAL] if lower.
    pub fn max_eval(mut self, max_eval: usize) -> Self {
        self.0.max_eval = max_eval.max(GP_COBYLA_MIN_EVAL);
        self
    }

    /// Set the relative jitter added to the covariance diagonal
    pub fn nugget(mut self, nugget: F) -> Self {
        self.0.nugget = nugget;
        self
    }

    /// Set the seed of the random starting points
    pub fn seed(mut self, seed: u64) -> Self {
        self.0.seed = seed;
        self
    }
}

impl<F: Float, Mean: MeanModel<F>, Corr: CorrelationModel<F>>
    From<GpValidParams<F, Mean, Corr>> for GpParams<F, Mean, Corr>
{
    fn from(valid: GpValidParams<F, Mean, Corr>) -> Self {
        GpParams(valid)
    }
}

impl<F: Float, Mean: MeanModel<F>, Corr: CorrelationModel<F>> ParamGuard
    for GpParams<F, Mean, Corr>
{
    type Checked = GpValidParams<F, Mean, Corr>;
    type Error = GpError;

    fn check_ref(&self) -> Result<&Self::Checked> {
        self.0.theta_tuning.check()?;
        self.0.noise.check()?;
        if !(self.0.nugget >= F::zero()) {
            return Err(GpError::InvalidValueError(format!(
                "Nugget should be non-negative, got {}",
                self.0.nugget
            )));
        }
        Ok(&self.0)
    }

    fn check(self) -> Result<Self::Checked> {
        self.check_ref()?;
        Ok(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correlation_models::SquaredExponentialCorr;
    use crate::mean_models::ConstantMean;

    fn params() -> GpParams<f64, ConstantMean, SquaredExponentialCorr> {
        GpParams::new(ConstantMean(), SquaredExponentialCorr())
    }

    #[test]
    fn test_default_params_are_valid() {
        let valid = params().check().expect("valid params");
        assert_eq!(valid.n_start(), GP_OPTIM_N_START);
        assert_eq!(valid.max_eval(), GP_COBYLA_MAX_EVAL);
        assert!(valid.noise().is_optimized());
        assert_eq!(valid.theta_tuning().init(), &array![0.1]);
    }

    #[test]
    fn test_max_eval_lower_bound() {
        let valid = params().max_eval(3).check().unwrap();
        assert_eq!(valid.max_eval(), GP_COBYLA_MIN_EVAL);
    }

    #[test]
    fn test_invalid_theta() {
        assert!(params()
            .theta_tuning(ThetaTuning::Fixed(array![0.0]))
            .check()
            .is_err());
        assert!(params()
            .theta_tuning(ThetaTuning::Optimized {
                init: array![0.5],
                bounds: array![(1.0, 0.1)],
            })
            .check()
            .is_err());
    }

    #[test]
    fn test_fixed_theta_has_no_bounds() {
        let tuning = ThetaTuning::Fixed(array![0.3, 0.4]);
        assert!(tuning.bounds().is_none());
        assert_eq!(tuning.init(), &array![0.3, 0.4]);
        assert!(params().theta_tuning(tuning).check().is_ok());
    }

    #[test]
    fn test_invalid_nugget() {
        assert!(params().nugget(-1e-3).check().is_err());
        assert!(params().nugget(f64::NAN).check().is_err());
    }

    #[test]
    fn test_invalid_noise() {
        assert!(params().noise(NoiseTuning::Fixed(-1.0)).check().is_err());
        assert!(params()
            .noise(NoiseTuning::Optimized {
                init: 10.,
                bounds: (1e-3, 1.)
            })
            .check()
            .is_err());
        assert!(params()
            .noise(NoiseTuning::heteroscedastic(array![0.1, f64::NAN]))
            .check()
            .is_err());
        assert!(params()
            .noise(NoiseTuning::Heteroscedastic {
                scale: 0.,
                variances: array![0.1, 0.2]
            })
            .check()
            .is_err());
    }

    #[test]
    fn test_heteroscedastic_noise_is_valid() {
        let valid = params()
            .noise(NoiseTuning::heteroscedastic(array![0.1, 0.0, 2.0]))
            .check()
            .unwrap();
        assert!(!valid.noise().is_optimized());
    }
}
