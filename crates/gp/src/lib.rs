//! This library implements [Gaussian Process](https://en.wikipedia.org/wiki/Gaussian_process) regression
//! also known as [Kriging](https://en.wikipedia.org/wiki/Kriging) models.
//!
//! Observation noise is handled explicitly and can be either:
//! * fixed or estimated with the other hyperparameters when homoscedastic,
//! * given as one variance per training point when heteroscedastic.
//!
//! GP methods are implemented by [GaussianProcess] parameterized by [GpParams],
//! noise handling is specified with [NoiseTuning].
#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]
mod algorithm;
pub mod correlation_models;
mod errors;
pub mod mean_models;

mod parameters;
mod utils;

mod optimization;

pub use algorithm::*;
pub use correlation_models::*;
pub use errors::*;
pub use mean_models::*;
pub use parameters::*;
pub use utils::DiffMatrix;
