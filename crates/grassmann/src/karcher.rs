//! Karcher (Frechet) mean of Grassmann points.
//!
//! The Karcher mean minimizes the sum of squared geodesic distances to the data points.
//! It is computed iteratively by a [`KarcherOptimizer`].

use crate::distances::GrassmannDistance;
use crate::errors::{GrassmannError, Result};
use crate::manifold::{exp_map_single, frechet_variance, log_map, log_map_single};
use crate::point::GrassmannPoint;
use crate::{KARCHER_MAX_ITER, KARCHER_STEP, KARCHER_TOL};
use log::{debug, warn};
use ndarray::{Array1, Array2};
use ndarray_rand::rand::seq::SliceRandom;
use ndarray_rand::rand::SeedableRng;
use ndarray_stats::QuantileExt;
use rand_xoshiro::Xoshiro256Plus;
use std::fmt;

/// A trait for Karcher mean iterative solvers
pub trait KarcherOptimizer: fmt::Debug + Sync + Send {
    /// Estimate the Karcher mean of non empty `points` sharing the same shape
    fn optimize(
        &self,
        points: &[GrassmannPoint],
        distance: &dyn GrassmannDistance,
    ) -> Result<GrassmannPoint>;
}

/// Karcher mean of `points` computed with the given `optimizer`.
///
/// Non convergence within the optimizer iterations budget is not an error:
/// a warning is logged and the last estimate is returned.
pub fn karcher_mean(
    points: &[GrassmannPoint],
    optimizer: &dyn KarcherOptimizer,
    distance: &dyn GrassmannDistance,
) -> Result<GrassmannPoint> {
    let first = first_point(points)?;
    if let Some(p) = points.iter().find(|p| p.data().dim() != first.data().dim()) {
        return Err(GrassmannError::DimensionError(format!(
            "Points should have the same shape, got {:?} and {:?}",
            first.data().dim(),
            p.data().dim()
        )));
    }
    optimizer.optimize(points, distance)
}

fn first_point(points: &[GrassmannPoint]) -> Result<&GrassmannPoint> {
    points.first().ok_or_else(|| {
        GrassmannError::InvalidValueError("Karcher mean requires at least one point".to_string())
    })
}

/// Riemannian gradient descent: starting from the data point of minimum
/// Frechet variance, move along the mean of the log-mapped points
#[derive(Clone, Debug)]
pub struct GradientDescent {
    step: f64,
    tol: f64,
    max_iter: usize,
}

impl Default for GradientDescent {
    fn default() -> Self {
        GradientDescent {
            step: KARCHER_STEP,
            tol: KARCHER_TOL,
            max_iter: KARCHER_MAX_ITER,
        }
    }
}

impl GradientDescent {
    /// Set step size
    pub fn step(mut self, step: f64) -> Self {
        self.step = step;
        self
    }

    /// Set convergence tolerance on gradient norm and move length
    pub fn tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    /// Set maximum number of iterations
    pub fn max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }
}

impl KarcherOptimizer for GradientDescent {
    fn optimize(
        &self,
        points: &[GrassmannPoint],
        distance: &dyn GrassmannDistance,
    ) -> Result<GrassmannPoint> {
        first_point(points)?;
        let variances = points
            .iter()
            .map(|p| frechet_variance(p, points, distance))
            .collect::<Result<Vec<_>>>()?;
        let start = Array1::from(variances).argmin()?;
        debug!("Karcher gradient descent starts from point #{}", start);
        let mut mean = points[start].clone();

        let (n, p) = mean.data().dim();
        for iter in 0..self.max_iter {
            let tangents = log_map(points, &mean)?;
            let gradient = tangents
                .iter()
                .fold(Array2::zeros((n, p)), |acc, t| acc + t)
                / points.len() as f64;
            let norm = crate::linalg::frobenius(&gradient);
            if norm < self.tol {
                debug!("Karcher gradient descent converged in {} iterations", iter);
                return Ok(mean);
            }
            let next = exp_map_single(&(gradient * self.step), &mean)?;
            let shift = distance.compute(&mean, &next)?;
            mean = next;
            if shift < self.tol {
                debug!("Karcher gradient descent converged in {} iterations", iter + 1);
                return Ok(mean);
            }
        }
        warn!(
            "Karcher gradient descent did not converge in {} iterations",
            self.max_iter
        );
        Ok(mean)
    }
}

/// Stochastic gradient descent: visit points in random order per epoch,
/// moving towards each of them with a decreasing step
#[derive(Clone, Debug)]
pub struct StochasticGradientDescent {
    tol: f64,
    max_iter: usize,
    seed: Option<u64>,
}

impl Default for StochasticGradientDescent {
    fn default() -> Self {
        StochasticGradientDescent {
            tol: KARCHER_TOL,
            max_iter: KARCHER_MAX_ITER,
            seed: None,
        }
    }
}

impl StochasticGradientDescent {
    /// Set convergence tolerance on epoch displacement
    pub fn tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    /// Set maximum number of epochs
    pub fn max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Set random generator seed used to shuffle points
    pub fn seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }
}

impl KarcherOptimizer for StochasticGradientDescent {
    fn optimize(
        &self,
        points: &[GrassmannPoint],
        distance: &dyn GrassmannDistance,
    ) -> Result<GrassmannPoint> {
        let mut rng = match self.seed {
            Some(seed) => Xoshiro256Plus::seed_from_u64(seed),
            None => Xoshiro256Plus::from_entropy(),
        };
        let mut mean = first_point(points)?.clone();
        let mut order: Vec<usize> = (0..points.len()).collect();
        let mut visits = 1;
        for epoch in 0..self.max_iter {
            let previous = mean.clone();
            order.shuffle(&mut rng);
            for &i in order.iter() {
                let alpha = 0.5 / visits as f64;
                let tangent = log_map_single(&points[i], &mean)?;
                mean = exp_map_single(&(tangent * (2. * alpha)), &mean)?;
                visits += 1;
            }
            let shift = distance.compute(&previous, &mean)?;
            if shift < self.tol {
                debug!("Karcher stochastic descent converged in {} epochs", epoch + 1);
                return Ok(mean);
            }
        }
        warn!(
            "Karcher stochastic descent did not converge in {} epochs",
            self.max_iter
        );
        Ok(mean)
    }
}
