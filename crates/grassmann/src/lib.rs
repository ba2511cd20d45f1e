//! This library implements dimension reduction and interpolation on the
//! [Grassmann manifold](https://en.wikipedia.org/wiki/Grassmannian) Gr(p, n),
//! the set of p-dimensional subspaces of R^n.
//!
//! Points ([GrassmannPoint]) are represented by (n, p) matrices with orthonormal columns.
//! The library provides:
//! * distances between points computed from principal angles ([distances]),
//! * logarithmic and exponential maps between the manifold and its tangent spaces ([manifold]),
//! * the Karcher mean of a set of points ([karcher]),
//! * interpolation of points given at coordinates ([interpolation]),
//!   possibly using [uqbox_gp] Gaussian processes as entry-wise surrogates ([surrogates]),
//! * the projection of matrices onto Grassmann manifolds with thin SVD and the
//!   reconstruction of new matrices by interpolation ([svd_projection]),
//! * Grassmann kernels ([kernels]).
//!
//! # Example
//!
//! ```no_run
//! use ndarray::array;
//! use uqbox_grassmann::{
//!     distances::GeodesicDistance, interpolation::LinearInterpolation, karcher::GradientDescent,
//!     svd_projection::{Rank, SvdProjection},
//! };
//!
//! let a = array![[3., 1.], [1., 2.], [0., 1.]];
//! let samples = vec![a.clone(), &a * 2.];
//! let projection = SvdProjection::new(&samples, Rank::Explicit(1)).expect("projection");
//! let reconstructed = projection
//!     .reconstruct(
//!         &LinearInterpolation,
//!         &array![[0.], [1.]],
//!         &array![0.5].view(),
//!         &GradientDescent::default(),
//!         &GeodesicDistance,
//!     )
//!     .expect("reconstruction");
//! ```
#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]
pub mod distances;
mod errors;
pub mod interpolation;
pub mod karcher;
pub mod kernels;
pub mod linalg;
pub mod manifold;
mod point;
pub mod surrogates;
pub mod svd_projection;

pub use errors::*;
pub use point::*;

/// Default step of the Karcher mean gradient descent
pub const KARCHER_STEP: f64 = 1.0;
/// Default convergence tolerance of Karcher mean solvers
pub const KARCHER_TOL: f64 = 1e-6;
/// Default maximum number of iterations of Karcher mean solvers
pub const KARCHER_MAX_ITER: usize = 100;
