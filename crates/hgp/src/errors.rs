use thiserror::Error;

/// A result type for heteroscedastic GP regression
pub type Result<T> = std::result::Result<T, HgpError>;

/// An error when using [`HeteroscedasticGp`](crate::HeteroscedasticGp) algorithm
#[derive(Error, Debug)]
pub enum HgpError {
    /// When error due to a bad value
    #[error("InvalidValue error: {0}")]
    InvalidValueError(String),
    /// When noise samples can not be drawn
    #[error("Sampling error: {0}")]
    SampleError(String),
    /// When a regression model is used before being fitted
    #[error("Model not fitted: {0}")]
    NotFittedError(String),
    /// When GP regression fails
    #[error(transparent)]
    GpError(#[from] hetgp_gp::GpError),
    /// When a linfa error occurs
    #[error(transparent)]
    LinfaError(#[from] linfa::error::Error),
    /// When a user provided regression model fails
    #[error(transparent)]
    ModelError(#[from] Box<dyn std::error::Error + Send + Sync>),
}
