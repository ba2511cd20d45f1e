//! Hyperparameters likelihood optimizers.
//!
//! Optimization is done on log10 of hyperparameters, the objective being the
//! negative log marginal likelihood. Bounds and inequality constraints `c(x) >= 0`
//! are given at each [`HyperOptimizer::minimize`] call.

use crate::{GP_COBYLA_MAX_EVAL, GP_COBYLA_MIN_EVAL};
use ndarray::{arr1, Array1, Array2};
use ndarray_rand::rand::Rng;
use std::fmt;

/// Objective or constraint function of log10 hyperparameters
pub type HyperFn<'a> = &'a (dyn Fn(&[f64]) -> f64 + Sync);

/// A trait for optimizers used to minimize the GP negative log likelihood
pub trait HyperOptimizer: fmt::Debug + Sync + Send {
    /// Minimize `objfn` starting from `x0` within `bounds` subject to `constraints`
    /// being positive.
    ///
    /// Returns the minimum value found and its location. The value is `+inf`
    /// when the optimization fails.
    fn minimize(
        &self,
        objfn: HyperFn,
        x0: &[f64],
        bounds: &[(f64, f64)],
        constraints: &[HyperFn],
    ) -> (f64, Array1<f64>);
}

/// COBYLA derivative-free optimizer
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Cobyla {
    /// Initial trust region radius
    pub rhobeg: f64,
    /// Relative tolerance on objective
    pub ftol_rel: f64,
    /// Max number of objective evaluations
    pub max_eval: usize,
}

impl Default for Cobyla {
    fn default() -> Self {
        Cobyla {
            rhobeg: 0.5,
            ftol_rel: 1e-4,
            max_eval: GP_COBYLA_MAX_EVAL,
        }
    }
}

impl Cobyla {
    /// Set the initial trust region radius
    pub fn rhobeg(mut self, rhobeg: f64) -> Self {
        self.rhobeg = rhobeg;
        self
    }

    /// Set the relative tolerance on objective
    pub fn ftol_rel(mut self, ftol_rel: f64) -> Self {
        self.ftol_rel = ftol_rel;
        self
    }

    /// Set the max number of objective evaluations.
    /// Given max_eval has to be greater than [crate::GP_COBYLA_MIN_EVAL] otherwise
    /// max_eval is set to [crate::GP_COBYLA_MIN_EVAL].
    pub fn max_eval(mut self, max_eval: usize) -> Self {
        self.max_eval = GP_COBYLA_MIN_EVAL.max(max_eval);
        self
    }
}

impl HyperOptimizer for Cobyla {
    fn minimize(
        &self,
        objfn: HyperFn,
        x0: &[f64],
        bounds: &[(f64, f64)],
        constraints: &[HyperFn],
    ) -> (f64, Array1<f64>) {
        use cobyla::{minimize, StopTols};

        let cons: Vec<_> = constraints
            .iter()
            .map(|cstr| move |x: &[f64], _u: &mut ()| cstr(x))
            .collect();

        match minimize(
            |x: &[f64], _u: &mut ()| objfn(x),
            x0,
            bounds,
            &cons,
            (),
            self.max_eval.max(GP_COBYLA_MIN_EVAL),
            cobyla::RhoBeg::All(self.rhobeg),
            Some(StopTols {
                ftol_rel: self.ftol_rel,
                ..StopTols::default()
            }),
        ) {
            Ok((_, x_opt, fval)) => {
                let fval = if f64::is_nan(fval) {
                    f64::INFINITY
                } else {
                    fval
                };
                (fval, arr1(&x_opt))
            }
            Err((status, x_opt, _)) => {
                log::warn!("ERROR Cobyla optimizer in GP status={status:?}");
                (f64::INFINITY, arr1(&x_opt))
            }
        }
    }
}

/// Prepare `n_start` starting points on log10 scale: the first one is the given
/// `init`, the other ones are drawn uniformly within bounds.
/// Returns starting points as rows of a (n_start, dim) array and log10 bounds.
pub(crate) fn prepare_multistart(
    n_start: usize,
    init: &Array1<f64>,
    bounds: &[(f64, f64)],
    rng: &mut impl Rng,
) -> (Array2<f64>, Vec<(f64, f64)>) {
    // Use log10 hyperparameters as optimization parameters
    let bounds: Vec<(f64, f64)> = bounds
        .iter()
        .map(|(lo, up)| (lo.log10(), up.log10()))
        .collect();

    let mut starts = Array2::zeros((n_start.max(1), init.len()));
    starts.row_mut(0).assign(&init.mapv(f64::log10));
    for mut row in starts.rows_mut().into_iter().skip(1) {
        row.iter_mut()
            .zip(bounds.iter())
            .for_each(|(v, (lo, up))| *v = rng.gen_range(*lo..=*up));
    }
    (starts, bounds)
}
