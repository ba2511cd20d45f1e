use thiserror::Error;

/// A result type for Grassmann manifold algorithms
pub type Result<T> = std::result::Result<T, GrassmannError>;

/// An error when using Grassmann manifold algorithms
#[derive(Error, Debug)]
pub enum GrassmannError {
    /// When linear algebra computation fails
    #[error(transparent)]
    LinalgError(#[from] linfa_linalg::LinalgError),
    /// When Gaussian Process surrogate fails
    #[error("GP error")]
    GpError(#[from] uqbox_gp::GpError),
    /// When min/max search fails
    #[error(transparent)]
    MinMaxError(#[from] ndarray_stats::errors::MinMaxError),
    /// When given matrices have inconsistent shapes
    #[error("Dimension error: {0}")]
    DimensionError(String),
    /// When interpolation fails
    #[error("Interpolation error: {0}")]
    InterpolationError(String),
    /// When error dur to a bad value
    #[error("InvalidValue error: {0}")]
    InvalidValueError(String),
}
