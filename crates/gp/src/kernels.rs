//! A module for stationary covariance kernels used by the GP model.
//!
//! Kernel parameters are given as `[l_1, ..., l_d, sigma]` where `l_i` are the
//! length-scales for each input dimension and `sigma` the process standard deviation.
//! The covariance between x and s is `sigma^2 * corr(r)` with `r = |(x - s) / l|`.
//!
//! The following kernels are implemented:
//! * squared exponential (RBF),
//! * absolute exponential,
//! * matern 3/2,
//! * matern 5/2.

use crate::errors::{GpError, Result};
use crate::utils::pairwise_differences;
use linfa::Float;
use ndarray::{s, Array1, Array2, ArrayBase, Axis, Data, Ix1, Ix2};
use std::convert::TryFrom;
use std::fmt;

/// A trait for using a covariance kernel in GP regression
pub trait Kernel<F: Float>: Clone + Copy + Default + fmt::Display + Sync + Send {
    /// Correlation value given the scaled distance `r` between two points
    fn correlation(&self, r: F) -> F;

    /// Compute the (m, n) covariance matrix between `x` (m, d) and `s` (n, d) points
    /// given `params` as `[l_1, ..., l_d, sigma]`
    fn value(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix2>,
        s: &ArrayBase<impl Data<Elem = F>, Ix2>,
        params: &ArrayBase<impl Data<Elem = F>, Ix1>,
    ) -> Result<Array2<F>> {
        check_kernel_dims(x, params)?;
        if x.ncols() != s.ncols() {
            return Err(GpError::DimensionError(format!(
                "Kernel points should have the same dimension, got {} and {}",
                x.ncols(),
                s.ncols()
            )));
        }
        let dim = x.ncols();
        let lengths = params.slice(s![..dim]);
        let sigma2 = params[dim] * params[dim];

        let scaled = pairwise_differences(x, s) / &lengths;
        let r = scaled.mapv(|v| v * v).sum_axis(Axis(1)).mapv(F::sqrt);
        let k = r.mapv(|v| sigma2 * self.correlation(v));
        Ok(k.into_shape_with_order((x.nrows(), s.nrows()))?)
    }

    /// Compute the covariance of each `x` point with itself
    fn diag(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix2>,
        params: &ArrayBase<impl Data<Elem = F>, Ix1>,
    ) -> Result<Array1<F>> {
        check_kernel_dims(x, params)?;
        let sigma = params[x.ncols()];
        Ok(Array1::from_elem(
            x.nrows(),
            sigma * sigma * self.correlation(F::zero()),
        ))
    }
}

fn check_kernel_dims<F: Float>(
    x: &ArrayBase<impl Data<Elem = F>, Ix2>,
    params: &ArrayBase<impl Data<Elem = F>, Ix1>,
) -> Result<()> {
    if params.len() != x.ncols() + 1 {
        return Err(GpError::DimensionError(format!(
            "Kernel parameters should be {} length-scales and sigma, got {} values",
            x.ncols(),
            params.len()
        )));
    }
    Ok(())
}

macro_rules! declare_kernel {
    ($(#[$doc:meta])* $kernel:ident, $name:literal) => {
        $(#[$doc])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
        pub struct $kernel();

        impl From<$kernel> for String {
            fn from(_item: $kernel) -> String {
                $name.to_string()
            }
        }

        impl TryFrom<String> for $kernel {
            type Error = &'static str;
            fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
                if s == $name {
                    Ok(Self::default())
                } else {
                    Err(concat!(
                        "Bad string value for ",
                        stringify!($kernel),
                        ", should be '",
                        $name,
                        "'"
                    ))
                }
            }
        }

        impl fmt::Display for $kernel {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, $name)
            }
        }
    };
}

declare_kernel!(
    /// Squared exponential (RBF) kernel
    SquaredExponentialKernel,
    "SquaredExponential"
);

declare_kernel!(
    /// Absolute exponential kernel (Matern 1/2)
    AbsoluteExponentialKernel,
    "AbsoluteExponential"
);

declare_kernel!(
    /// Matern 3/2 kernel
    Matern32Kernel,
    "Matern32"
);

declare_kernel!(
    /// Matern 5/2 kernel
    Matern52Kernel,
    "Matern52"
);

impl<F: Float> Kernel<F> for SquaredExponentialKernel {
    /// exp(-r^2 / 2)
    fn correlation(&self, r: F) -> F {
        F::exp(F::cast(-0.5) * r * r)
    }
}

impl<F: Float> Kernel<F> for AbsoluteExponentialKernel {
    /// exp(-r)
    fn correlation(&self, r: F) -> F {
        F::exp(-r)
    }
}

impl<F: Float> Kernel<F> for Matern32Kernel {
    /// (1 + sqrt(3) r) exp(-sqrt(3) r)
    fn correlation(&self, r: F) -> F {
        let a = F::cast(3.).sqrt() * r;
        (F::one() + a) * F::exp(-a)
    }
}

impl<F: Float> Kernel<F> for Matern52Kernel {
    /// (1 + sqrt(5) r + 5/3 r^2) exp(-sqrt(5) r)
    fn correlation(&self, r: F) -> F {
        let a = F::cast(5.).sqrt() * r;
        (F::one() + a + a * a / F::cast(3.)) * F::exp(-a)
    }
}
