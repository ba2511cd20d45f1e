//! This library implements [Gaussian Process](https://en.wikipedia.org/wiki/Gaussian_process) regression
//! with a zero-mean prior and a stationary covariance kernel.
//!
//! Kernel hyperparameters `[l_1, ..., l_d, sigma, noise]` (length-scales, process standard deviation
//! and noise standard deviation) are estimated by maximizing the marginal likelihood, the optimization
//! being restarted from several random starting points. The likelihood optimizer is pluggable
//! (see [`optimization::HyperOptimizer`]) and the optimization may be constrained
//! (see [`constraints::HyperConstraints`]).
//!
//! GP methods are implemented by [GaussianProcess] parameterized by [GpParams].
#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]
mod algorithm;
pub mod constraints;
mod errors;
pub mod kernels;
pub mod optimization;

mod parameters;
mod utils;

pub use algorithm::*;
pub use errors::*;
pub use parameters::*;

/// Default number of likelihood optimizations
pub const GP_OPTIM_N_START: usize = 1;
/// Minimum of function evaluations for COBYLA optimizer
pub const GP_COBYLA_MIN_EVAL: usize = 25;
/// Maximum of function evaluations for COBYLA optimizer
pub const GP_COBYLA_MAX_EVAL: usize = 200;
/// Diagonal term added to the covariance matrix to improve numerical stability
pub const GP_JITTER: f64 = 1e-10;
/// Name of the environment variable used to set log level in examples
pub const UQBOX_LOG: &str = "UQBOX_LOG";
