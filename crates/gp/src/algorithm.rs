use crate::correlation_models::*;
use crate::errors::{GpError, Result};
use crate::mean_models::*;
use crate::optimization::{into_f64, optimize_params, prepare_multistart, CobylaParams};
use crate::parameters::{GpParams, GpValidParams, NoiseTuning};
use crate::utils::{pairwise_differences, DiffMatrix, Standardized};

use linfa::prelude::{DatasetBase, Fit, Float, PredictInplace};
use linfa_linalg::{cholesky::*, qr::*, triangular::*};
use log::{debug, warn};
use ndarray::{Array, Array1, Array2, ArrayBase, Axis, Data, Ix1, Ix2, Zip};
use rayon::prelude::*;

use std::fmt;
use std::time::Instant;

/// Default number of multistart for hyperparameters optimization
pub const GP_OPTIM_N_START: usize = 10;
/// Minimum of function evaluations for COBYLA optimizer
pub const GP_COBYLA_MIN_EVAL: usize = 25;
/// Maximum of function evaluations for COBYLA optimizer
pub const GP_COBYLA_MAX_EVAL: usize = 1000;

/// Search space of the process variance relative to the variance of the training outputs
const SIGMA2_BOUNDS: (f64, f64) = (1e-4, 1e2);

/// Internal parameters computed Gaussian Process likelihood computation
/// and reused for prediction.
#[derive(Debug, Clone)]
pub(crate) struct GpInnerParams<F: Float> {
    /// Process variance in normalized output space
    sigma2: F,
    /// Regression weights
    beta: Array2<F>,
    /// Weights of the training covariances
    gamma: Array2<F>,
    /// Cholesky decomposition of the training covariance matrix (noise included)
    c_chol: Array2<F>,
    /// Solution of the linear equation system : [C] x Ft = y
    ft: Array2<F>,
    /// R upper triangle matrix of QR decomposition of the matrix Ft
    ft_qr_r: Array2<F>,
}

/// Exact gaussian process regression with an explicit observation noise term.
///
/// Observations are modeled as
///
/// `y_i = f(x_i)^T beta + Z(x_i) + e_i`
///
/// * `f(x)^T beta` is the trend, `f` given by the [mean model](crate::mean_models)
///   and `beta` estimated by generalized least squares,
/// * `Z` is a zero mean gaussian process with covariance `sigma^2 * r(x, x')`,
///   `r` given by the [correlation model](crate::correlation_models) parameterized by `theta`,
/// * `e_i ~ N(0, tau_i^2)` is the observation noise, see [`NoiseTuning`] for the options:
///   fixed, estimated (homoscedastic) or given per training point (heteroscedastic).
///
/// `theta`, `sigma^2` and the noise variance when estimated are obtained by maximizing
/// the likelihood with COBYLA started from several points in parallel.
/// Inputs and outputs are standardized internally.
///
/// Predicted variances are the variances of the latent process `f^T beta + Z`,
/// observation noise is not included.
///
/// # Example
///
/// ```no_run
/// use hetgp_gp::{ConstantMean, GaussianProcess, NoiseTuning, SquaredExponentialCorr};
/// use linfa::prelude::*;
/// use ndarray::{Array, Axis};
///
/// let xt = Array::linspace(0., 10., 12).insert_axis(Axis(1));
/// let yt = xt.column(0).mapv(f64::sin);
///
/// // interpolating GP, noise free observations
/// let gp = GaussianProcess::<f64, ConstantMean, SquaredExponentialCorr>::params(
///         ConstantMean::default(),
///         SquaredExponentialCorr::default())
///     .noise(NoiseTuning::Fixed(0.))
///     .fit(&Dataset::new(xt, yt))
///     .expect("GP fit error");
///
/// let xtest = Array::linspace(0., 10., 50).insert_axis(Axis(1));
/// let (mean, var) = gp.predict_valvar(&xtest).expect("GP prediction");
/// ```
///
/// # Reference
///
/// Rasmussen, Carl Edward and Williams, Christopher K. I.
/// Gaussian Processes for Machine Learning. MIT Press (2006), chapter 2.
#[derive(Debug, Clone)]
pub struct GaussianProcess<F: Float, Mean: MeanModel<F>, Corr: CorrelationModel<F>> {
    /// Parameter of the autocorrelation model
    theta: Array1<F>,
    /// Noise variances of the training points in output units
    noise_variances: Array1<F>,
    /// Reduced likelihood value (result from internal optimization)
    likelihood: F,
    /// Gaussian process internal fitted params
    inner_params: GpInnerParams<F>,
    /// Training inputs
    xtrain_std: Standardized<F>,
    /// Training outputs
    ytrain_std: Standardized<F>,
    /// Training dataset (input, output)
    training_data: (Array2<F>, Array1<F>),
    /// Parameters used to fit this model
    params: GpValidParams<F, Mean, Corr>,
}

/// Kriging as GP special case when using constant mean and squared exponential correlation
pub type Kriging<F> = GpParams<F, ConstantMean, SquaredExponentialCorr>;

impl<F: Float> Kriging<F> {
    /// Kriging parameters constructor
    pub fn params() -> GpParams<F, ConstantMean, SquaredExponentialCorr> {
        GpParams::new(ConstantMean(), SquaredExponentialCorr())
    }
}

impl<F: Float, Mean: MeanModel<F>, Corr: CorrelationModel<F>> fmt::Display
    for GaussianProcess<F, Mean, Corr>
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let noise = match self.params.noise {
            NoiseTuning::Fixed(v) => format!("Fixed({v})"),
            NoiseTuning::Optimized { .. } => format!("Optimized({})", self.noise_variances[0]),
            NoiseTuning::Heteroscedastic { scale, .. } => format!("Heteroscedastic(scale={scale})"),
        };
        write!(
            f,
            "GP(mean={}, corr={}, theta={}, variance={}, noise={}, likelihood={})",
            self.params.mean,
            self.params.corr,
            self.theta,
            self.variance(),
            noise,
            self.likelihood,
        )
    }
}

impl<F: Float, Mean: MeanModel<F>, Corr: CorrelationModel<F>> GaussianProcess<F, Mean, Corr> {
    /// Gp parameters contructor
    pub fn params<NewMean: MeanModel<F>, NewCorr: CorrelationModel<F>>(
        mean: NewMean,
        corr: NewCorr,
    ) -> GpParams<F, NewMean, NewCorr> {
        GpParams::new(mean, corr)
    }

    /// Predict output values at n given `x` points of nx components specified as a (n, nx) matrix.
    /// Returns n scalar output values as (n,) column vector.
    pub fn predict(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Array1<F>> {
        let xnorm = self.normalize_inputs(x)?;
        let k = self.compute_cross_cov(&xnorm)?;
        Ok(self.predict_normalized(&xnorm, &k))
    }

    /// Predict variance values of the latent process at n given `x` points of nx components
    /// specified as a (n, nx) matrix. Observation noise is not included.
    /// Returns n variance values as (n,) column vector.
    pub fn predict_var(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Array1<F>> {
        let xnorm = self.normalize_inputs(x)?;
        let k = self.compute_cross_cov(&xnorm)?;
        self.predict_var_normalized(&xnorm, &k)
    }

    /// Predict both output values and latent variances at n given `x` points of nx components
    pub fn predict_valvar(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Result<(Array1<F>, Array1<F>)> {
        let xnorm = self.normalize_inputs(x)?;
        let k = self.compute_cross_cov(&xnorm)?;
        let mean = self.predict_normalized(&xnorm, &k);
        let var = self.predict_var_normalized(&xnorm, &k)?;
        Ok((mean, var))
    }

    fn normalize_inputs(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Array2<F>> {
        if x.ncols() != self.dims() {
            return Err(GpError::InvalidValueError(format!(
                "Expected input points with {} components, got {}",
                self.dims(),
                x.ncols()
            )));
        }
        Ok(self.xtrain_std.apply(x))
    }

    /// Covariances between given normalized points and training points as a (n, nt) matrix
    fn compute_cross_cov(&self, xnorm: &Array2<F>) -> Result<Array2<F>> {
        let dx = pairwise_differences(xnorm, &self.xtrain_std.data);
        let r = self.params.corr.value(&dx, &self.theta);
        let sigma2 = self.inner_params.sigma2;
        let k = r
            .into_shape((xnorm.nrows(), self.xtrain_std.data.nrows()))?
            .mapv(|v| v * sigma2);
        Ok(k)
    }

    fn predict_normalized(&self, xnorm: &Array2<F>, k: &Array2<F>) -> Array1<F> {
        let f = self.params.mean.value(xnorm);
        let y_ = &f.dot(&self.inner_params.beta) + &k.dot(&self.inner_params.gamma);
        (&y_ * &self.ytrain_std.std + &self.ytrain_std.mean).remove_axis(Axis(1))
    }

    fn predict_var_normalized(&self, xnorm: &Array2<F>, k: &Array2<F>) -> Result<Array1<F>> {
        let inner = &self.inner_params;
        let rt = inner.c_chol.solve_triangular(&k.t(), UPLO::Lower)?;
        let rhs = inner.ft.t().dot(&rt) - self.params.mean.value(xnorm).t();
        let u = inner.ft_qr_r.t().solve_triangular(&rhs, UPLO::Lower)?;

        let a = rt.mapv(|v| v * v).sum_axis(Axis(0));
        let b = u.mapv(|v| v * v).sum_axis(Axis(0));
        let ystd2 = self.ytrain_std.std[0] * self.ytrain_std.std[0];
        let var = (Array::from_elem(a.len(), inner.sigma2) - a + b).mapv(|v| {
            // Small negative values are numerical noise
            if v < F::zero() {
                F::zero()
            } else {
                v * ystd2
            }
        });
        Ok(var)
    }

    /// Optimized theta hyperparameters
    pub fn theta(&self) -> &Array1<F> {
        &self.theta
    }

    /// Estimated variance of the latent process in output units
    pub fn variance(&self) -> F {
        self.inner_params.sigma2 * self.ytrain_std.std[0] * self.ytrain_std.std[0]
    }

    /// Noise variances of the training points in output units,
    /// either given, constant fixed, or estimated when [`NoiseTuning::Optimized`].
    pub fn noise_variances(&self) -> &Array1<F> {
        &self.noise_variances
    }

    /// Reduced likelihood at the optimum
    pub fn likelihood(&self) -> F {
        self.likelihood
    }

    /// Input dimension
    pub fn dims(&self) -> usize {
        self.xtrain_std.ncols()
    }

    /// Training data (xt, yt)
    pub fn training_data(&self) -> &(Array2<F>, Array1<F>) {
        &self.training_data
    }

    /// Parameters used to fit this model
    pub fn params_used(&self) -> &GpValidParams<F, Mean, Corr> {
        &self.params
    }
}

impl<F, D, Mean, Corr> PredictInplace<ArrayBase<D, Ix2>, Array1<F>>
    for GaussianProcess<F, Mean, Corr>
where
    F: Float,
    D: Data<Elem = F>,
    Mean: MeanModel<F>,
    Corr: CorrelationModel<F>,
{
    fn predict_inplace(&self, x: &ArrayBase<D, Ix2>, y: &mut Array1<F>) {
        assert_eq!(
            x.nrows(),
            y.len(),
            "The number of data points must match the number of output targets."
        );

        let values = self.predict(x).expect("GP Prediction");
        *y = values;
    }

    fn default_target(&self, x: &ArrayBase<D, Ix2>) -> Array1<F> {
        Array1::zeros((x.nrows(),))
    }
}

impl<F: Float, Mean: MeanModel<F>, Corr: CorrelationModel<F>, D: Data<Elem = F>>
    Fit<ArrayBase<D, Ix2>, ArrayBase<D, Ix1>, GpError> for GpValidParams<F, Mean, Corr>
{
    type Object = GaussianProcess<F, Mean, Corr>;

    /// Fit GP parameters using maximum likelihood
    fn fit(
        &self,
        dataset: &DatasetBase<ArrayBase<D, Ix2>, ArrayBase<D, Ix1>>,
    ) -> Result<Self::Object> {
        let x = dataset.records();
        let y = dataset.targets().to_owned().insert_axis(Axis(1));
        let n = x.nrows();
        let dim = x.ncols();

        if n < 2 {
            return Err(GpError::InvalidValueError(format!(
                "At least 2 training points are required, got {n}"
            )));
        }
        if y.nrows() != n {
            return Err(GpError::InvalidValueError(format!(
                "Training inputs ({n}) and outputs ({}) should have the same number of rows",
                y.nrows()
            )));
        }
        if let NoiseTuning::Heteroscedastic { variances, .. } = &self.noise {
            if variances.len() != n {
                return Err(GpError::InvalidValueError(format!(
                    "Expected {n} noise variances, one per training point, got {}",
                    variances.len()
                )));
            }
        }

        let theta0 = expand_to_dim(self.theta_tuning.init(), dim, "theta init")?;
        let theta_bounds = self
            .theta_tuning
            .bounds()
            .map(|b| expand_to_dim(b, dim, "theta bounds"))
            .transpose()?;

        let xtrain = Standardized::new(x);
        let ytrain = Standardized::new(&y);
        let ystd2 = ytrain.std[0] * ytrain.std[0];

        let x_distances = DiffMatrix::new(&xtrain.data);
        if x_distances
            .d
            .rows()
            .into_iter()
            .any(|d| d.iter().all(|v| *v == F::zero()))
        {
            warn!("GP training data contains duplicated points");
        }
        let fx = self.mean.value(&xtrain.data);

        // Optimized parameters layout: [theta (if not fixed), sigma2, noise (if optimized)]
        let mut params0: Vec<F> = vec![];
        let mut bounds: Vec<(F, F)> = vec![];
        if let Some(tb) = &theta_bounds {
            params0.extend(theta0.iter());
            bounds.extend(tb.iter());
        }
        params0.push(F::one());
        bounds.push((F::cast(SIGMA2_BOUNDS.0), F::cast(SIGMA2_BOUNDS.1)));
        if let NoiseTuning::Optimized {
            init,
            bounds: (lo, up),
        } = self.noise
        {
            params0.push(init);
            bounds.push((lo, up));
        }
        let n_theta = if theta_bounds.is_some() { dim } else { 0 };

        let decode = |p: &[F]| -> (Array1<F>, F, Array1<F>) {
            let theta = if n_theta > 0 {
                Array1::from_iter(p[..n_theta].iter().cloned())
            } else {
                theta0.clone()
            };
            let sigma2 = p[n_theta];
            let noise = match &self.noise {
                NoiseTuning::Fixed(v) => Array1::from_elem(n, *v / ystd2),
                NoiseTuning::Optimized { .. } => Array1::from_elem(n, p[n_theta + 1] / ystd2),
                NoiseTuning::Heteroscedastic { scale, variances } => {
                    variances.mapv(|v| *scale * v / ystd2)
                }
            };
            (theta, sigma2, noise)
        };

        let objfn = |x: &[f64]| -> f64 {
            let p: Vec<F> = x.iter().map(|v| F::cast(10f64.powf(*v))).collect();
            if p.iter().any(|v| !v.is_finite()) {
                return f64::INFINITY;
            }
            let (theta, sigma2, noise) = decode(&p);
            let rxx = self.corr.value(&x_distances.d, &theta);
            match reduced_likelihood(&fx, rxx, &x_distances, &ytrain, sigma2, &noise, self.nugget)
            {
                Ok(r) => {
                    let lkh = -into_f64(&r.0);
                    if lkh.is_nan() {
                        f64::INFINITY
                    } else {
                        lkh
                    }
                }
                Err(_) => f64::INFINITY,
            }
        };

        let (params, bounds) =
            prepare_multistart(self.n_start, &Array1::from(params0), &bounds, self.seed);
        debug!(
            "Optimize with multistart theta = {:?} and bounds = {:?}",
            params, bounds
        );
        let now = Instant::now();
        let maxeval = (20 * params.ncols()).clamp(GP_COBYLA_MIN_EVAL, self.max_eval);
        let opt_params = (0..params.nrows())
            .into_par_iter()
            .map(|i| {
                optimize_params(
                    objfn,
                    &params.row(i).to_owned(),
                    &bounds,
                    CobylaParams {
                        maxeval,
                        ..CobylaParams::default()
                    },
                )
            })
            .reduce(
                || (f64::INFINITY, Array::ones((params.ncols(),))),
                |a, b| if b.0 < a.0 { b } else { a },
            );
        debug!("elapsed optim = {:?}", now.elapsed().as_millis());

        let opt_params: Vec<F> = opt_params
            .1
            .iter()
            .map(|v| F::cast(10f64.powf(*v)))
            .collect();
        let (theta, sigma2, noise) = decode(&opt_params);
        let rxx = self.corr.value(&x_distances.d, &theta);
        let (lkh, inner_params) = reduced_likelihood(
            &fx,
            rxx,
            &x_distances,
            &ytrain,
            sigma2,
            &noise,
            self.nugget,
        )?;
        debug!("GP fitted with theta={theta}, sigma2={sigma2}, likelihood={lkh}");

        Ok(GaussianProcess {
            theta,
            noise_variances: noise.mapv(|v| v * ystd2),
            likelihood: lkh,
            inner_params,
            xtrain_std: xtrain,
            ytrain_std: ytrain,
            training_data: (x.to_owned(), dataset.targets().to_owned()),
            params: self.clone(),
        })
    }
}

/// Broadcast a one-element array to `dim` elements, otherwise check its length is `dim`
fn expand_to_dim<T: Clone>(v: &Array1<T>, dim: usize, what: &str) -> Result<Array1<T>> {
    if v.len() == dim {
        Ok(v.to_owned())
    } else if v.len() == 1 {
        Ok(Array1::from_elem(dim, v[0].clone()))
    } else {
        Err(GpError::InvalidValueError(format!(
            "Bad {what} dimension, should be 1 or {dim}, got {}",
            v.len()
        )))
    }
}

/// Compute reduced likelihood function
/// fx: mean factors term at x samples,
/// rxx: correlation factors at x samples,
/// x_distances: pairwise distances between x samples
/// ytrain: normalized output training values
/// sigma2: process variance
/// noise: noise variances of training points in normalized output space
/// nugget: factor to improve numerical stability
fn reduced_likelihood<F: Float>(
    fx: &ArrayBase<impl Data<Elem = F>, Ix2>,
    rxx: ArrayBase<impl Data<Elem = F>, Ix2>,
    x_distances: &DiffMatrix<F>,
    ytrain: &Standardized<F>,
    sigma2: F,
    noise: &Array1<F>,
    nugget: F,
) -> Result<(F, GpInnerParams<F>)> {
    // Assemble the training covariance matrix
    let n = x_distances.n_obs;
    let mut c_mx = Array2::<F>::eye(n).mapv(|v| v * sigma2 * (F::one() + nugget));
    for (k, &(i, j)) in x_distances.pairs.iter().enumerate() {
        let c = sigma2 * rxx[[k, 0]];
        c_mx[[i, j]] = c;
        c_mx[[j, i]] = c;
    }
    Zip::from(c_mx.diag_mut())
        .and(noise)
        .for_each(|c, v| *c += *v);

    let c_chol = c_mx.cholesky()?;

    // Solve generalized least squared problem
    let ft = c_chol.solve_triangular(fx, UPLO::Lower)?;
    let (ft_qr_q, ft_qr_r) = ft.qr()?.into_decomp();

    // Check whether we have an ill-conditioned problem
    let eps = F::cast(1e-12);
    if ft_qr_r
        .diag()
        .iter()
        .any(|v| v.abs() < eps)
    {
        return Err(GpError::LikelihoodComputationError(
            "Mean factors matrix is too ill conditioned: poor combination \
             of regression model and observations."
                .to_string(),
        ));
    }

    let yt = c_chol.solve_triangular(&ytrain.data, UPLO::Lower)?;
    let beta = ft_qr_r.solve_triangular_into(ft_qr_q.t().dot(&yt), UPLO::Upper)?;
    let rho = yt - ft.dot(&beta);
    let rho_sqr = rho.mapv(|v| v * v).sum();
    let gamma = c_chol.t().solve_triangular_into(rho, UPLO::Upper)?;

    // The determinant of C is equal to the squared product of
    // the diagonal elements of its Cholesky decomposition c_chol
    let logdet = c_chol.diag().mapv(|v| v.ln()).sum() * F::cast(2.);
    let likelihood = -F::cast(0.5) * (rho_sqr + logdet);
    if !likelihood.is_finite() {
        return Err(GpError::LikelihoodComputationError(format!(
            "Non finite likelihood value {likelihood}"
        )));
    }

    Ok((
        likelihood,
        GpInnerParams {
            sigma2,
            beta,
            gamma,
            c_chol,
            ft,
            ft_qr_r,
        },
    ))
}
