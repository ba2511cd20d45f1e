//! Uncertainty quantification toolbox.
//!
//! This crate gathers:
//! * [gp]: Gaussian process regression with maximum likelihood estimation of
//!   kernel hyperparameters,
//! * [grassmann]: dimension reduction and interpolation on the Grassmann manifold
//!   (Karcher mean, logarithmic and exponential maps, SVD projection of matrices).
//!
//! # Example
//!
//! ```no_run
//! use linfa::prelude::*;
//! use ndarray::array;
//! use uqbox::gp::Kriging;
//!
//! let xt = array![[0.0], [2.5], [5.0], [7.5], [10.0]];
//! let yt = xt.column(0).mapv(f64::sin);
//! let gp = Kriging::params()
//!     .n_start(3)
//!     .seed(Some(42))
//!     .fit(&Dataset::new(xt, yt))
//!     .expect("GP fitted");
//! let (mean, std) = gp.predict_valstd_flat(&array![[5.0]]).expect("GP prediction");
//! println!("mean = {mean}, std = {std}");
//! ```
pub use uqbox_gp as gp;
pub use uqbox_grassmann as grassmann;
