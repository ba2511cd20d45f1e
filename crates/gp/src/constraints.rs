//! Inequality constraints on GP hyperparameters likelihood optimization.
//!
//! Constraints are evaluated with candidate hyperparameters through a [`GpTrainingSet`]
//! and are satisfied when every returned value is positive.

use crate::algorithm::GpTrainingSet;
use crate::errors::Result;
use crate::kernels::Kernel;
use linfa::Float;
use ndarray::{concatenate, Array1, Array2, Axis};
use std::fmt;

/// A trait for constraints applied during likelihood optimization
pub trait HyperConstraints<F: Float, K: Kernel<F>>: fmt::Debug + Sync + Send {
    /// Number of inequality constraints given the training data
    fn n_constraints(&self, training: &GpTrainingSet<F, K>) -> usize;

    /// Constraints values at candidate `hyper` `[l_1, ..., l_d, sigma, noise]`,
    /// feasible when all values are positive
    fn evaluate(&self, training: &GpTrainingSet<F, K>, hyper: &Array1<F>) -> Result<Array1<F>>;
}

/// Constraints forcing the GP to be non-negative at given points
/// and to be close to training outputs.
///
/// * at constraint points `c`: `mean(c) - z * std(c) >= 0`
/// * at training points `x_i`: `observed_error - |y_i - mean(x_i)| >= 0`
///
/// Only the first output is considered.
#[derive(Clone, Debug)]
pub struct NonNegative<F: Float> {
    constraint_points: Array2<F>,
    observed_error: F,
    z_value: F,
}

impl<F: Float> NonNegative<F> {
    /// Default allowed error at training points
    pub const DEFAULT_OBSERVED_ERROR: f64 = 0.01;
    /// Default number of standard deviations
    pub const DEFAULT_Z_VALUE: f64 = 2.;

    /// Constraints at given (n, nx) points
    pub fn new(constraint_points: Array2<F>) -> Self {
        NonNegative {
            constraint_points,
            observed_error: F::cast(Self::DEFAULT_OBSERVED_ERROR),
            z_value: F::cast(Self::DEFAULT_Z_VALUE),
        }
    }

    /// Set allowed error at training points
    pub fn observed_error(mut self, observed_error: F) -> Self {
        self.observed_error = observed_error;
        self
    }

    /// Set number of standard deviations kept above zero
    pub fn z_value(mut self, z_value: F) -> Self {
        self.z_value = z_value;
        self
    }
}

impl<F: Float, K: Kernel<F>> HyperConstraints<F, K> for NonNegative<F> {
    fn n_constraints(&self, training: &GpTrainingSet<F, K>) -> usize {
        self.constraint_points.nrows() + training.nsamples()
    }

    fn evaluate(&self, training: &GpTrainingSet<F, K>, hyper: &Array1<F>) -> Result<Array1<F>> {
        let (mean, std) = training.predict_valstd(&self.constraint_points, hyper)?;
        let positivity = &mean.column(0) - &std.column(0).mapv(|v| v * self.z_value);

        let xt = training.inputs();
        let yt = training.outputs();
        let (ypred, _) = training.predict_valstd(&xt, hyper)?;
        let closeness = (&yt.column(0) - &ypred.column(0)).mapv(|v| self.observed_error - v.abs());

        Ok(concatenate(Axis(0), &[positivity.view(), closeness.view()])?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{HyperTuning, Kriging};
    use approx::assert_abs_diff_eq;
    use linfa::prelude::{Dataset, Fit};
    use ndarray::array;

    #[test]
    fn test_non_negative_values() {
        let xt = array![[0.0], [1.0], [2.0], [3.0], [4.0]];
        let yt = array![0.5, 1.0, 1.5, 0.9, 1.0];
        let gp = Kriging::params()
            .hyper_tuning(HyperTuning::Fixed(array![1., 1., 1e-6]))
            .fit(&Dataset::new(xt, yt))
            .expect("GP fit error");

        let cstr = NonNegative::new(array![[0.5], [2.5], [10.]]);
        let training = gp.training_set();
        let n = HyperConstraints::<f64, _>::n_constraints(&cstr, &training);
        let values = cstr
            .evaluate(&training, gp.hyperparameters())
            .expect("constraints evaluation");
        assert_eq!(n, 8);
        assert_eq!(values.len(), 8);
        // far from data, mean is 0 and std is sigma
        assert!(values[2] < 0.);
        // interpolating GP satisfies closeness constraints
        assert_abs_diff_eq!(values.slice(ndarray::s![3..]), Array1::from_elem(5, 0.01), epsilon = 1e-4);
    }
}
