//! This library implements Most-Likely Heteroscedastic Gaussian Process regression.
//!
//! Noisy observations whose noise level depends on the input are modeled with
//! two regression models trained alternately: one for the signal, one for the
//! logarithm of the noise variance. The noise variances are estimated at training
//! points by Monte-Carlo sampling of the signal model predictive distribution.
//!
//! Predictive uncertainty is then split into:
//! * an epistemic part, uncertainty of the signal model which shrinks with more data,
//! * an aleatoric part, the input dependent observation noise.
//!
//! The algorithm is implemented by [HeteroscedasticGp] parameterized by [HgpParams].
//! Any model implementing the [Regressor] trait can be used, [GpRegressor] adapts
//! the [hetgp_gp::GaussianProcess] models to it.
#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]
mod algorithm;
mod errors;
mod parameters;
mod regressor;
mod sampler;
mod surrogates;

pub use algorithm::*;
pub use errors::*;
pub use parameters::*;
pub use regressor::*;
pub use sampler::*;
pub use surrogates::*;
