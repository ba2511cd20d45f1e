//! Scalar surrogate models used to interpolate tangent vectors entry by entry.
use crate::errors::Result;
use linfa::prelude::{Dataset, Fit};
use ndarray::{Array1, Array2, ArrayView2};
use uqbox_gp::{kernels::Kernel, GaussianProcess, GpParams};

/// A trait for surrogate parameters able to train a scalar surrogate
pub trait SurrogateBuilder: Sync + Send {
    /// Train a surrogate given (n, nx) inputs and (n,) outputs
    fn train(&self, x: &Array2<f64>, y: &Array1<f64>) -> Result<Box<dyn Surrogate>>;
}

/// A trait for a trained scalar surrogate
pub trait Surrogate: Sync + Send {
    /// Predict output values at n points given as a (n, nx) matrix
    fn predict(&self, x: &ArrayView2<f64>) -> Result<Array1<f64>>;
}

impl<K: Kernel<f64> + 'static> SurrogateBuilder for GpParams<f64, K> {
    fn train(&self, x: &Array2<f64>, y: &Array1<f64>) -> Result<Box<dyn Surrogate>> {
        let gp = self.fit(&Dataset::new(x.to_owned(), y.to_owned()))?;
        Ok(Box::new(gp))
    }
}

impl<K: Kernel<f64> + 'static> Surrogate for GaussianProcess<f64, K> {
    fn predict(&self, x: &ArrayView2<f64>) -> Result<Array1<f64>> {
        Ok(self.predict_flat(x)?)
    }
}
