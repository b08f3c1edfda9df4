use crate::errors::{HgpError, Result};
use crate::regressor::{NoiseConfig, Regressor};
use hetgp_gp::{
    correlation_models::*, mean_models::*, GaussianProcess, GpParams, NoiseTuning,
};
use linfa::prelude::{Dataset, Fit};
use ndarray::{Array1, ArrayView1, ArrayView2};
use std::fmt;

/// A [`Regressor`] backed by a [`GaussianProcess`].
///
/// Under [`NoiseConfig::Homoscedastic`] the noise handling of the given GP parameters
/// is used as is (estimated noise by default). Under [`NoiseConfig::Heteroscedastic`]
/// the GP is fitted with the given per-point noise variances.
#[derive(Clone, Debug)]
pub struct GpRegressor<Mean: MeanModel<f64>, Corr: CorrelationModel<f64>> {
    params: GpParams<f64, Mean, Corr>,
    gp: Option<GaussianProcess<f64, Mean, Corr>>,
}

/// GP regressor with constant mean and squared exponential correlation
pub type KrigingRegressor = GpRegressor<ConstantMean, SquaredExponentialCorr>;

impl<Mean: MeanModel<f64>, Corr: CorrelationModel<f64>> GpRegressor<Mean, Corr> {
    /// Constructor given GP parameters used at each fit
    pub fn new(params: GpParams<f64, Mean, Corr>) -> Self {
        GpRegressor { params, gp: None }
    }

    /// Last fitted GP if any
    pub fn gp(&self) -> Option<&GaussianProcess<f64, Mean, Corr>> {
        self.gp.as_ref()
    }

    fn fitted(&self) -> Result<&GaussianProcess<f64, Mean, Corr>> {
        self.gp.as_ref().ok_or_else(|| {
            HgpError::NotFittedError("GP regressor has to be fitted before prediction".to_string())
        })
    }
}

impl<Mean: MeanModel<f64>, Corr: CorrelationModel<f64>> Default for GpRegressor<Mean, Corr> {
    fn default() -> Self {
        Self::new(GpParams::new(Mean::default(), Corr::default()))
    }
}

impl<Mean: MeanModel<f64>, Corr: CorrelationModel<f64>> fmt::Display for GpRegressor<Mean, Corr> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.gp {
            Some(gp) => write!(f, "{gp}"),
            None => write!(f, "GP(unfitted)"),
        }
    }
}

impl<Mean: MeanModel<f64>, Corr: CorrelationModel<f64>> Regressor for GpRegressor<Mean, Corr> {
    fn fit(
        &mut self,
        x: &ArrayView2<f64>,
        y: &ArrayView1<f64>,
        noise: &NoiseConfig,
    ) -> Result<()> {
        let params = match noise {
            NoiseConfig::Homoscedastic => self.params.clone(),
            NoiseConfig::Heteroscedastic(variances) => self
                .params
                .clone()
                .noise(NoiseTuning::heteroscedastic(variances.to_owned())),
        };
        let gp = params.fit(&Dataset::new(x.to_owned(), y.to_owned()))?;
        self.gp = Some(gp);
        Ok(())
    }

    fn predict(&self, x: &ArrayView2<f64>) -> Result<Array1<f64>> {
        Ok(self.fitted()?.predict(x)?)
    }

    fn predict_std(&self, x: &ArrayView2<f64>) -> Result<(Array1<f64>, Array1<f64>)> {
        let (mean, var) = self.fitted()?.predict_valvar(x)?;
        Ok((mean, var.mapv(f64::sqrt)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array, Axis};

    #[test]
    fn test_predict_before_fit() {
        let model = KrigingRegressor::default();
        let x = array![[0.5]];
        assert!(matches!(
            model.predict(&x.view()),
            Err(HgpError::NotFittedError(_))
        ));
        assert!(matches!(
            model.predict_std(&x.view()),
            Err(HgpError::NotFittedError(_))
        ));
    }

    #[test]
    fn test_fit_predict() {
        let xt = Array::linspace(0., 10., 15).insert_axis(Axis(1));
        let yt = xt.column(0).mapv(f64::sin);
        let mut model = KrigingRegressor::new(
            GpParams::new(ConstantMean(), SquaredExponentialCorr()).noise(NoiseTuning::Fixed(0.)),
        );
        model
            .fit(&xt.view(), &yt.view(), &NoiseConfig::Homoscedastic)
            .expect("fit");
        let (mean, std) = model.predict_std(&xt.view()).expect("prediction");
        assert_abs_diff_eq!(mean, yt, epsilon = 1e-3);
        assert_abs_diff_eq!(model.predict(&xt.view()).unwrap(), mean, epsilon = 1e-12);
        assert!(std.iter().all(|v| *v >= 0. && *v < 1e-1));
    }

    #[test]
    fn test_heteroscedastic_config_reaches_gp() {
        let xt = array![[0.0], [1.0], [2.0], [3.0]];
        let yt = array![0.0, 1.0, 0.5, 0.2];
        let variances = array![0.1, 0.2, 0.3, 0.4];
        let mut model = KrigingRegressor::default();

        model
            .fit(
                &xt.view(),
                &yt.view(),
                &NoiseConfig::Heteroscedastic(variances.clone()),
            )
            .expect("fit");
        let gp = model.gp().expect("fitted gp");
        assert_abs_diff_eq!(*gp.noise_variances(), variances, epsilon = 1e-10);

        // homoscedastic fit goes back to the configured noise handling
        model
            .fit(&xt.view(), &yt.view(), &NoiseConfig::Homoscedastic)
            .expect("fit");
        let noise = model.gp().expect("fitted gp").noise_variances();
        assert!(noise.iter().all(|v| *v == noise[0]));
    }

    #[test]
    fn test_heteroscedastic_config_bad_length() {
        let xt = array![[0.0], [1.0], [2.0]];
        let yt = array![0.0, 1.0, 0.5];
        let mut model = KrigingRegressor::default();
        let res = model.fit(
            &xt.view(),
            &yt.view(),
            &NoiseConfig::Heteroscedastic(array![0.1]),
        );
        assert!(matches!(res, Err(HgpError::GpError(_))));
        assert!(model.gp().is_none());
    }
}
