use crate::errors::{GpError, Result};
use crate::kernels::*;
use crate::optimization::prepare_multistart;
use crate::parameters::{expand_hyper, GpParams, GpValidParams, HyperTuning};
use crate::utils::{into_f64, NormalizedData};
use crate::GP_JITTER;

use linfa::prelude::{DatasetBase, Fit, Float, PredictInplace};
use linfa_linalg::{cholesky::*, triangular::*};
use ndarray::{s, Array1, Array2, ArrayBase, ArrayView1, Axis, Data, Ix1, Ix2};
use ndarray_rand::rand::SeedableRng;
use rand_xoshiro::Xoshiro256Plus;

use log::{debug, info};
use rayon::prelude::*;
use std::fmt;
use std::time::Instant;

/// Internal parameters computed by the GP during training
/// and used later on in prediction computations
#[derive(Debug, Clone)]
pub(crate) struct GpInnerParams<F: Float> {
    /// Lower Cholesky factor of the regularized covariance matrix \[K\]
    chol: Array2<F>,
    /// Solution of the linear equation system : \[K\] alpha = y
    alpha: Array2<F>,
}

impl<F: Float> GpInnerParams<F> {
    /// Factorize `K = k(x, x) + noise^2 I + jitter I` given full `hyper` vector
    /// `[l_1, ..., l_d, sigma, noise]` and solve it against outputs `y`
    fn new<K: Kernel<F>>(
        kernel: &K,
        x: &ArrayBase<impl Data<Elem = F>, Ix2>,
        y: &ArrayBase<impl Data<Elem = F>, Ix2>,
        hyper: &Array1<F>,
    ) -> Result<Self> {
        let dim = x.ncols();
        check_hyper_dims(hyper, dim)?;
        let noise = hyper[dim + 1];
        let mut k_mx = kernel.value(x, x, &hyper.slice(s![..dim + 1]))?;
        let reg = noise * noise + F::cast(GP_JITTER);
        k_mx.diag_mut().mapv_inplace(|v| v + reg);

        let chol = k_mx.cholesky()?;
        let z = chol.solve_triangular(y, UPLO::Lower)?;
        let alpha = chol.t().solve_triangular(&z, UPLO::Upper)?;
        Ok(GpInnerParams { chol, alpha })
    }

    /// Negative log marginal likelihood summed over independent outputs `y`
    fn neg_log_likelihood(&self, y: &ArrayBase<impl Data<Elem = F>, Ix2>) -> F {
        let (n, k) = y.dim();
        let fit = (y * &self.alpha).sum();
        let logdet = self.chol.diag().mapv(|v| v.abs().ln()).sum() * F::cast(2.);
        F::cast(0.5)
            * (fit + logdet * F::cast(k) + F::cast(n * k) * F::cast(2. * std::f64::consts::PI).ln())
    }
}

fn check_hyper_dims<F: Float>(hyper: &Array1<F>, dim: usize) -> Result<()> {
    if hyper.len() != dim + 2 {
        return Err(GpError::DimensionError(format!(
            "Hyperparameters should be {} length-scales, sigma and noise, got {} values",
            dim,
            hyper.len()
        )));
    }
    Ok(())
}

/// Compute the negative log marginal likelihood of a zero-mean GP
///
/// * `log_hyper`: log10 of hyperparameters `[l_1, ..., l_d, sigma, noise]`
/// * `kernel`: covariance kernel
/// * `x`: training inputs (n, d)
/// * `y`: training outputs (n, k), outputs are considered independent and
///   share hyperparameters
///
/// The value is `0.5 * (y^T K^-1 y + log|K| + n log(2 pi))` summed over outputs
/// where `K = k(x, x) + noise^2 I + 1e-10 I`.
pub fn log_likelihood<F: Float, K: Kernel<F>>(
    log_hyper: &[f64],
    kernel: &K,
    x: &ArrayBase<impl Data<Elem = F>, Ix2>,
    y: &ArrayBase<impl Data<Elem = F>, Ix2>,
) -> Result<F> {
    let hyper = log_hyper.iter().map(|v| F::cast(10f64.powf(*v))).collect();
    let inner = GpInnerParams::new(kernel, x, y, &hyper)?;
    Ok(inner.neg_log_likelihood(y))
}

/// Compute normalized mean (n, k) and latent variance (n,) at `xnorm` points
fn posterior<F: Float, K: Kernel<F>>(
    kernel: &K,
    xt: &Array2<F>,
    inner: &GpInnerParams<F>,
    hyper: &Array1<F>,
    xnorm: &ArrayBase<impl Data<Elem = F>, Ix2>,
    with_var: bool,
) -> Result<(Array2<F>, Option<Array1<F>>)> {
    let dim = xt.ncols();
    if xnorm.ncols() != dim {
        return Err(GpError::DimensionError(format!(
            "Prediction points should have {} components, got {}",
            dim,
            xnorm.ncols()
        )));
    }
    let kparams = hyper.slice(s![..dim + 1]);
    let kx = kernel.value(xnorm, xt, &kparams)?;
    let mean = kx.dot(&inner.alpha);
    if !with_var {
        return Ok((mean, None));
    }
    let v = inner.chol.solve_triangular(&kx.t(), UPLO::Lower)?;
    let var = kernel.diag(xnorm, &kparams)? - v.mapv(|w| w * w).sum_axis(Axis(0));
    // Variance might be slightly negative depending on machine precision:
    // set to zero in that case
    Ok((
        mean,
        Some(var.mapv(|v| if v < F::zero() { F::zero() } else { v })),
    ))
}

/// Training data of a GP in the frame used for hyperparameters estimation.
///
/// It allows to predict with candidate hyperparameters, the factorization being
/// recomputed at each call. It is given to [`HyperConstraints`](crate::constraints::HyperConstraints)
/// implementations.
pub struct GpTrainingSet<'a, F: Float, K: Kernel<F>> {
    kernel: &'a K,
    xt: &'a NormalizedData<F>,
    yt: &'a NormalizedData<F>,
}

impl<F: Float, K: Kernel<F>> GpTrainingSet<'_, F, K> {
    /// Number of training samples
    pub fn nsamples(&self) -> usize {
        self.xt.data.nrows()
    }

    /// Training inputs
    pub fn inputs(&self) -> Array2<F> {
        self.xt.unscale(&self.xt.data)
    }

    /// Training outputs
    pub fn outputs(&self) -> Array2<F> {
        self.yt.unscale(&self.yt.data)
    }

    /// Predict mean and standard deviation (both (n, k)) at `x` points
    /// given full `hyper` vector `[l_1, ..., l_d, sigma, noise]`
    pub fn predict_valstd(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix2>,
        hyper: &Array1<F>,
    ) -> Result<(Array2<F>, Array2<F>)> {
        let inner = GpInnerParams::new(self.kernel, &self.xt.data, &self.yt.data, hyper)?;
        let xnorm = self.xt.scale(x);
        let (mean, var) = posterior(self.kernel, &self.xt.data, &inner, hyper, &xnorm, true)?;
        let var = var.unwrap_or_else(|| Array1::zeros(xnorm.nrows()));
        Ok((self.yt.unscale(&mean), unscale_std(&var, &self.yt.std)))
    }
}

fn unscale_std<F: Float>(var: &Array1<F>, ystd: &Array1<F>) -> Array2<F> {
    let std = var.mapv(F::sqrt).insert_axis(Axis(1));
    &std * &ystd.view().insert_axis(Axis(0))
}

/// A GP regression is an interpolation method where the
/// interpolated values are modeled by a zero-mean Gaussian process
/// governed by a prior covariance kernel, which depends on some
/// hyperparameters to be determined.
///
/// The observed output is modeled as:
///
/// `y(x) = Z(x) + e`
///
/// where:
/// * `Z(x)` is a gaussian process with covariance `sigma^2 * corr(|(x - x') / l|)`
/// * `e ~ Normal(0, noise^2)` an observation noise
///
/// Hyperparameters `[l_1, ..., l_d, sigma, noise]` are estimated by maximizing
/// the marginal likelihood with multiple restarts.
///
/// # Implementation
///
/// * Based on [ndarray](https://github.com/rust-ndarray/ndarray)
///   and [linfa](https://github.com/rust-ml/linfa) and strive to follow [linfa guidelines](https://github.com/rust-ml/linfa/blob/master/CONTRIBUTE.md)
/// * GP kernel can be one of: squared exponential, absolute exponential, matern 3/2, matern 5/2
/// * Likelihood optimization restarts are run in parallel
/// * Likelihood optimization may be constrained, see [`crate::constraints`]
///
/// # Example
///
/// ```no_run
/// use uqbox_gp::{kernels::*, GaussianProcess};
/// use linfa::prelude::*;
/// use ndarray::{arr2, Array, Array1, Array2, Axis};
///
/// // one-dimensional test function to approximate
/// fn xsinx(x: &Array2<f64>) -> Array1<f64> {
///     ((x - 3.5) * ((x - 3.5) / std::f64::consts::PI).mapv(|v| v.sin())).remove_axis(Axis(1))
/// }
///
/// // training data
/// let xt = arr2(&[[0.0], [5.0], [10.0], [15.0], [18.0], [20.0], [25.0]]);
/// let yt = xsinx(&xt);
///
/// let gp = GaussianProcess::<f64, SquaredExponentialKernel>::params(SquaredExponentialKernel())
///     .n_start(5)
///     .normalize(true)
///     .fit(&Dataset::new(xt, yt))
///     .expect("GP trained");
///
/// // Use trained model for making predictions
/// let xtest = Array::linspace(0., 25., 26).insert_axis(Axis(1));
/// let (ypred, ystd) = gp.predict_valstd_flat(&xtest).expect("GP prediction");
///```
#[derive(Debug, Clone)]
pub struct GaussianProcess<F: Float, K: Kernel<F>> {
    /// Optimized hyperparameters `[l_1, ..., l_d, sigma, noise]`
    hyperparameters: Array1<F>,
    /// Log marginal likelihood value at optimized hyperparameters
    likelihood: F,
    /// Gaussian process internal fitted params
    inner_params: GpInnerParams<F>,
    /// Training inputs
    xt_norm: NormalizedData<F>,
    /// Training outputs
    yt_norm: NormalizedData<F>,
    /// Training dataset (input, output)
    pub(crate) training_data: (Array2<F>, Array2<F>),
    /// Parameters used to fit this model
    pub(crate) params: GpValidParams<F, K>,
}

/// Kriging as GP special case when using squared exponential kernel
pub type Kriging<F> = GpParams<F, SquaredExponentialKernel>;

impl<F: Float> Kriging<F> {
    /// Kriging parameters constructor
    pub fn params() -> GpParams<F, SquaredExponentialKernel> {
        GpParams::new(SquaredExponentialKernel())
    }
}

impl<F: Float, K: Kernel<F>> fmt::Display for GaussianProcess<F, K> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "GP(kernel={}, hyperparameters={}, likelihood={})",
            self.params.kernel, self.hyperparameters, self.likelihood,
        )
    }
}

impl<F: Float, K: Kernel<F>> GaussianProcess<F, K> {
    /// Gp parameters contructor
    pub fn params<NewK: Kernel<F>>(kernel: NewK) -> GpParams<F, NewK> {
        GpParams::new(kernel)
    }

    /// Training data view allowing predictions with candidate hyperparameters
    pub fn training_set(&self) -> GpTrainingSet<'_, F, K> {
        GpTrainingSet {
            kernel: &self.params.kernel,
            xt: &self.xt_norm,
            yt: &self.yt_norm,
        }
    }

    /// Predict output values at n given `x` points of nx components specified as a (n, nx) matrix.
    /// Returns output values as a (n, ny) matrix.
    pub fn predict(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Array2<F>> {
        let xnorm = self.xt_norm.scale(x);
        let (mean, _) = posterior(
            &self.params.kernel,
            &self.xt_norm.data,
            &self.inner_params,
            &self.hyperparameters,
            &xnorm,
            false,
        )?;
        Ok(self.yt_norm.unscale(&mean))
    }

    /// Predict latent variance values at n given `x` points of nx components specified as a (n, nx) matrix.
    /// Returns n variance values as (n,) vector, in the frame of normalized outputs.
    pub fn predict_var(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Array1<F>> {
        let xnorm = self.xt_norm.scale(x);
        let (_, var) = posterior(
            &self.params.kernel,
            &self.xt_norm.data,
            &self.inner_params,
            &self.hyperparameters,
            &xnorm,
            true,
        )?;
        Ok(var.unwrap_or_else(|| Array1::zeros(x.nrows())))
    }

    /// Predict standard deviation at n given `x` points specified as a (n, nx) matrix.
    /// Returns a (n, ny) matrix
    pub fn predict_std(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Array2<F>> {
        let var = self.predict_var(x)?;
        Ok(unscale_std(&var, &self.yt_norm.std))
    }

    /// Predict both output values and standard deviation at n given `x` points of nx components
    pub fn predict_valstd(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Result<(Array2<F>, Array2<F>)> {
        let xnorm = self.xt_norm.scale(x);
        let (mean, var) = posterior(
            &self.params.kernel,
            &self.xt_norm.data,
            &self.inner_params,
            &self.hyperparameters,
            &xnorm,
            true,
        )?;
        let var = var.unwrap_or_else(|| Array1::zeros(x.nrows()));
        Ok((
            self.yt_norm.unscale(&mean),
            unscale_std(&var, &self.yt_norm.std),
        ))
    }

    /// Predict output values of a single output model at n given `x` points
    /// specified as a (n, nx) matrix. Returns output values as a (n,) vector.
    pub fn predict_flat(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Array1<F>> {
        self.check_single_output()?;
        Ok(self.predict(x)?.remove_axis(Axis(1)))
    }

    /// Predict standard deviation of a single output model as a (n,) vector
    pub fn predict_std_flat(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Array1<F>> {
        self.check_single_output()?;
        Ok(self.predict_std(x)?.remove_axis(Axis(1)))
    }

    /// Predict both output values and standard deviation of a single output model,
    /// both as (n,) vectors
    pub fn predict_valstd_flat(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Result<(Array1<F>, Array1<F>)> {
        self.check_single_output()?;
        let (mean, std) = self.predict_valstd(x)?;
        Ok((mean.remove_axis(Axis(1)), std.remove_axis(Axis(1))))
    }

    fn check_single_output(&self) -> Result<()> {
        let ny = self.dims().1;
        if ny != 1 {
            return Err(GpError::DimensionError(format!(
                "Flat prediction requires a single output model, got {ny} outputs"
            )));
        }
        Ok(())
    }

    /// Predict both output values and standard deviation at `x` points using
    /// given `hyperparameters` instead of the fitted ones.
    /// The factorization is recomputed, the fitted model is left untouched.
    pub fn predict_with_hyperparameters(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix2>,
        hyperparameters: &Array1<F>,
    ) -> Result<(Array2<F>, Array2<F>)> {
        self.training_set().predict_valstd(x, hyperparameters)
    }

    /// Optimized hyperparameters `[l_1, ..., l_d, sigma, noise]`
    pub fn hyperparameters(&self) -> &Array1<F> {
        &self.hyperparameters
    }

    /// Optimized length-scales
    pub fn length_scales(&self) -> ArrayView1<'_, F> {
        self.hyperparameters.slice(s![..self.dims().0])
    }

    /// Process variance `sigma^2`
    pub fn variance(&self) -> F {
        let sigma = self.hyperparameters[self.dims().0];
        sigma * sigma
    }

    /// Noise standard deviation
    pub fn noise(&self) -> F {
        self.hyperparameters[self.dims().0 + 1]
    }

    /// Log marginal likelihood at optimized hyperparameters
    pub fn likelihood(&self) -> F {
        self.likelihood
    }

    /// Retrieve number of input and output dimensions
    pub fn dims(&self) -> (usize, usize) {
        (self.training_data.0.ncols(), self.training_data.1.ncols())
    }

    /// Training dataset (inputs, outputs)
    pub fn training_data(&self) -> &(Array2<F>, Array2<F>) {
        &self.training_data
    }

    /// Parameters used to fit this model
    pub fn params_used(&self) -> &GpValidParams<F, K> {
        &self.params
    }

    /// Parameters to refit the model, the likelihood optimization
    /// starting from current hyperparameters
    pub fn warm_params(&self) -> GpParams<F, K> {
        GpParams::from(self.params.clone()).hyper_init(self.hyperparameters.to_owned())
    }
}

impl<F, D, K> PredictInplace<ArrayBase<D, Ix2>, Array2<F>> for GaussianProcess<F, K>
where
    F: Float,
    D: Data<Elem = F>,
    K: Kernel<F>,
{
    fn predict_inplace(&self, x: &ArrayBase<D, Ix2>, y: &mut Array2<F>) {
        assert_eq!(
            x.nrows(),
            y.nrows(),
            "The number of data points must match the number of output targets."
        );

        let values = self.predict(x).expect("GP Prediction");
        *y = values;
    }

    fn default_target(&self, x: &ArrayBase<D, Ix2>) -> Array2<F> {
        Array2::zeros((x.nrows(), self.dims().1))
    }
}

/// Gausssian Process adaptator to implement `linfa::Predict` trait for standard deviation prediction.
pub struct GpStdPredictor<'a, F, K>(pub &'a GaussianProcess<F, K>)
where
    F: Float,
    K: Kernel<F>;

impl<F, D, K> PredictInplace<ArrayBase<D, Ix2>, Array2<F>> for GpStdPredictor<'_, F, K>
where
    F: Float,
    D: Data<Elem = F>,
    K: Kernel<F>,
{
    fn predict_inplace(&self, x: &ArrayBase<D, Ix2>, y: &mut Array2<F>) {
        assert_eq!(
            x.nrows(),
            y.nrows(),
            "The number of data points must match the number of output targets."
        );

        let values = self.0.predict_std(x).expect("GP Prediction");
        *y = values;
    }

    fn default_target(&self, x: &ArrayBase<D, Ix2>) -> Array2<F> {
        Array2::zeros((x.nrows(), self.0.dims().1))
    }
}

impl<F: Float, K: Kernel<F>, D: Data<Elem = F>> Fit<ArrayBase<D, Ix2>, ArrayBase<D, Ix2>, GpError>
    for GpValidParams<F, K>
{
    type Object = GaussianProcess<F, K>;

    /// Fit GP hyperparameters using maximum likelihood
    fn fit(
        &self,
        dataset: &DatasetBase<ArrayBase<D, Ix2>, ArrayBase<D, Ix2>>,
    ) -> Result<Self::Object> {
        self.fit_xy(dataset.records(), dataset.targets())
    }
}

impl<F: Float, K: Kernel<F>, D: Data<Elem = F>> Fit<ArrayBase<D, Ix2>, ArrayBase<D, Ix1>, GpError>
    for GpValidParams<F, K>
{
    type Object = GaussianProcess<F, K>;

    /// Fit GP hyperparameters using maximum likelihood
    fn fit(
        &self,
        dataset: &DatasetBase<ArrayBase<D, Ix2>, ArrayBase<D, Ix1>>,
    ) -> Result<Self::Object> {
        let y = dataset.targets().view().insert_axis(Axis(1));
        self.fit_xy(dataset.records(), &y)
    }
}

impl<F: Float, K: Kernel<F>> GpValidParams<F, K> {
    fn fit_xy(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix2>,
        y: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Result<GaussianProcess<F, K>> {
        if x.nrows() == 0 || x.ncols() == 0 || y.ncols() == 0 {
            return Err(GpError::DimensionError(format!(
                "Training data should not be empty, got inputs {:?} and outputs {:?}",
                x.dim(),
                y.dim()
            )));
        }
        if x.nrows() != y.nrows() {
            return Err(GpError::DimensionError(format!(
                "Training inputs ({}) and outputs ({}) should have the same number of samples",
                x.nrows(),
                y.nrows()
            )));
        }
        info!(
            "GP fit with {} kernel on {} samples (dim={})",
            self.kernel(),
            x.nrows(),
            x.ncols()
        );
        let dim = x.ncols();
        let xtrain = NormalizedData::with_normalization(x, self.normalize());
        let ytrain = NormalizedData::with_normalization(y, self.normalize());

        let init = expand_hyper(self.hyper_tuning().init(), dim, "Initial hyperparameters")?;

        let opt_hyper = match self.hyper_tuning() {
            HyperTuning::Fixed(_) => {
                // Easy path no optimization
                init
            }
            HyperTuning::Full { bounds, .. } | HyperTuning::Partial { bounds, .. } => {
                let active = match self.hyper_tuning() {
                    HyperTuning::Partial { active, .. } => active.to_vec(),
                    _ => (0..dim + 2).collect::<Vec<_>>(),
                };
                if let Some(i) = active.iter().find(|&&i| i >= dim + 2) {
                    return Err(GpError::InvalidValueError(format!(
                        "Active component {} out of hyperparameters range (size {})",
                        i,
                        dim + 2
                    )));
                }
                let bounds = expand_hyper(bounds, dim, "Hyperparameters bounds")?;
                self.optimize_hyper(&xtrain, &ytrain, &init, &bounds, &active)?
            }
        };

        let inner_params = GpInnerParams::new(&self.kernel, &xtrain.data, &ytrain.data, &opt_hyper)?;
        let likelihood = -inner_params.neg_log_likelihood(&ytrain.data);
        info!("GP fitted hyperparameters = {opt_hyper} (likelihood = {likelihood})");
        Ok(GaussianProcess {
            hyperparameters: opt_hyper,
            likelihood,
            inner_params,
            xt_norm: xtrain,
            yt_norm: ytrain,
            training_data: (x.to_owned(), y.to_owned()),
            params: self.clone(),
        })
    }

    /// Multistart optimization of the negative log likelihood wrt `active` hyperparameters
    fn optimize_hyper(
        &self,
        xtrain: &NormalizedData<F>,
        ytrain: &NormalizedData<F>,
        init: &Array1<F>,
        bounds: &Array1<(F, F)>,
        active: &[usize],
    ) -> Result<Array1<F>> {
        let base: f64 = 10.;
        let to_hyper = |x: &[f64]| -> Array1<F> {
            let mut hyper = init.to_owned();
            std::iter::zip(active, x).for_each(|(&i, xi)| hyper[i] = F::cast(base.powf(*xi)));
            hyper
        };

        let objfn = |x: &[f64]| -> f64 {
            // check as optimizer may return nan values
            if x.iter().any(|v| v.is_nan()) {
                // shortcut return worst value wrt to nll minimization
                return f64::INFINITY;
            }
            let hyper = to_hyper(x);
            match GpInnerParams::new(&self.kernel, &xtrain.data, &ytrain.data, &hyper) {
                Ok(inner) => {
                    let nll = into_f64(&inner.neg_log_likelihood(&ytrain.data));
                    if nll.is_finite() {
                        nll
                    } else {
                        f64::INFINITY
                    }
                }
                Err(_) => f64::INFINITY,
            }
        };

        let training = GpTrainingSet {
            kernel: &self.kernel,
            xt: xtrain,
            yt: ytrain,
        };
        let n_cstr = self
            .constraints()
            .map_or(0, |cstr| cstr.n_constraints(&training));
        let cstr_fns: Vec<_> = (0..n_cstr)
            .map(|i| {
                let training = &training;
                let to_hyper = &to_hyper;
                move |x: &[f64]| -> f64 {
                    self.constraints()
                        .and_then(|cstr| cstr.evaluate(training, &to_hyper(x)).ok())
                        .map_or(-1., |c| into_f64(&c[i]))
                }
            })
            .collect();
        let cstrs: Vec<&(dyn Fn(&[f64]) -> f64 + Sync)> = cstr_fns
            .iter()
            .map(|c| c as &(dyn Fn(&[f64]) -> f64 + Sync))
            .collect();

        let init_active = init.select(Axis(0), active).mapv(|v| into_f64(&v));
        let bounds_active = active
            .iter()
            .map(|&i| (into_f64(&bounds[i].0), into_f64(&bounds[i].1)))
            .collect::<Vec<_>>();
        let mut rng = match self.seed() {
            Some(seed) => Xoshiro256Plus::seed_from_u64(seed),
            None => Xoshiro256Plus::from_entropy(),
        };
        let (starts, log_bounds) =
            prepare_multistart(self.n_start(), &init_active, &bounds_active, &mut rng);
        debug!("Optimize with multistart hyperparameters = {starts:?} and bounds = {log_bounds:?}");

        let now = Instant::now();
        let results = (0..starts.nrows())
            .into_par_iter()
            .map(|i| {
                self.optimizer()
                    .minimize(&objfn, &starts.row(i).to_vec(), &log_bounds, &cstrs)
            })
            .collect::<Vec<_>>();
        debug!("elapsed optim = {:?}", now.elapsed().as_millis());

        let (best, (fmin, xopt)) = results
            .iter()
            .enumerate()
            .filter(|(_, (fval, _))| fval.is_finite())
            .min_by(|(_, a), (_, b)| a.0.total_cmp(&b.0))
            .ok_or_else(|| {
                GpError::LikelihoodComputationError(format!(
                    "All {} likelihood optimizations failed",
                    results.len()
                ))
            })?;
        debug!("Best restart {best}: nll = {fmin} at log10 hyperparameters {xopt}");
        Ok(to_hyper(&xopt.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::NonNegative;
    use approx::assert_abs_diff_eq;
    use linfa::prelude::{Dataset, Predict};
    use ndarray::{array, concatenate, Array, Zip};
    use ndarray_rand::rand_distr::Uniform;
    use ndarray_rand::RandomExt;
    use paste::paste;

    fn sinx(x: &Array2<f64>) -> Array1<f64> {
        x.column(0).mapv(f64::sin)
    }

    #[test]
    fn test_log_likelihood_single_point() {
        let x = array![[0.]];
        let y = array![[2.]];
        let nll = log_likelihood(&[0., 0., -5.], &SquaredExponentialKernel(), &x, &y).unwrap();
        let k = 1. + 1e-10 + GP_JITTER;
        let expected = 0.5 * (4. / k + k.ln() + (2. * std::f64::consts::PI).ln());
        assert_abs_diff_eq!(nll, expected, epsilon = 1e-9);
    }

    #[test]
    fn test_log_likelihood_bad_dims() {
        let x = array![[0., 1.], [1., 2.]];
        let y = array![[1.], [2.]];
        let res = log_likelihood(&[0., 0., -5.], &SquaredExponentialKernel(), &x, &y);
        assert!(matches!(res, Err(GpError::DimensionError(_))));
    }

    #[test]
    fn test_noiseless_interpolation() {
        let xt = array![[0.0], [1.0], [2.0], [3.0], [4.0]];
        let yt = sinx(&xt);
        let gp = Kriging::params()
            .hyper_tuning(HyperTuning::Fixed(array![1., 1., 1e-8]))
            .fit(&Dataset::new(xt.clone(), yt.clone()))
            .expect("GP fit error");
        let (ypred, ystd) = gp.predict_valstd(&xt).expect("prediction error");
        assert_abs_diff_eq!(ypred.column(0), yt, epsilon = 1e-6);
        assert_abs_diff_eq!(ystd, Array2::zeros((5, 1)), epsilon = 1e-4);

        let std_between = gp.predict_std(&array![[0.5], [2.5]]).unwrap();
        assert!(std_between.iter().all(|&v| v > 1e-3));
    }

    #[test]
    fn test_noise_fixed_optimization() {
        let xt = array![[0.0], [1.0], [2.0], [3.0], [4.0]];
        let yt = sinx(&xt);
        let gp = Kriging::params()
            .hyper_tuning(HyperTuning::Partial {
                init: array![1., 1., 1e-8],
                bounds: HyperTuning::default_bounds(),
                active: vec![0, 1],
            })
            .n_start(3)
            .seed(Some(42))
            .fit(&Dataset::new(xt.clone(), yt.clone()))
            .expect("GP fit error");
        assert_eq!(gp.noise(), 1e-8);
        let ypred = gp.predict(&xt).expect("prediction error");
        assert_abs_diff_eq!(ypred.column(0), yt, epsilon = 1e-4);
    }

    #[test]
    fn test_sin_five_points() {
        let xt = Array::linspace(0., 10., 5).insert_axis(Axis(1));
        let yt = sinx(&xt);
        let gp = Kriging::params()
            .n_start(3)
            .seed(Some(42))
            .fit(&Dataset::new(xt, yt))
            .expect("GP fit error");
        let (ypred, ystd) = gp
            .predict_valstd(&array![[5.], [20.]])
            .expect("prediction error");
        assert_abs_diff_eq!(ypred[[0, 0]], 5f64.sin(), epsilon = 0.05);
        assert!(ystd[[0, 0]] < ystd[[1, 0]]);
    }

    #[test]
    fn test_reproducible_with_seed() {
        let mut rng = Xoshiro256Plus::seed_from_u64(0);
        let xt = Array::random_using((8, 2), Uniform::new(0f64, 3.), &mut rng);
        let yt = Zip::from(xt.rows()).map_collect(|r| -> f64 { r[0].sin() + r[1].cos() });
        let params = Kriging::params().n_start(4).seed(Some(42));
        let gp1 = params
            .clone()
            .fit(&Dataset::new(xt.clone(), yt.clone()))
            .unwrap();
        let gp2 = params.fit(&Dataset::new(xt, yt)).unwrap();
        assert_eq!(gp1.hyperparameters(), gp2.hyperparameters());
        assert_eq!(gp1.likelihood(), gp2.likelihood());
    }

    #[test]
    fn test_fixed_hyperparameters() {
        let xt = array![[0.0], [1.0], [2.0], [3.0], [4.0]];
        let yt = array![0.0, 1.0, 1.5, 0.9, 1.0];
        let gp = Kriging::params()
            .seed(Some(42))
            .fit(&Dataset::new(xt.clone(), yt.clone()))
            .expect("GP fit error");
        let expected = gp.hyperparameters().to_owned();

        let gp = Kriging::params()
            .hyper_tuning(HyperTuning::Fixed(expected.clone()))
            .fit(&Dataset::new(xt, yt))
            .expect("GP fit error");
        assert_abs_diff_eq!(*gp.hyperparameters(), expected);
    }

    #[test]
    fn test_warm_restart() {
        let xt = array![[0.0], [1.0], [2.0], [3.0], [4.0]];
        let yt = array![0.0, 1.0, 1.5, 0.9, 1.0];
        let gp = Kriging::params()
            .seed(Some(42))
            .fit(&Dataset::new(xt.clone(), yt.clone()))
            .expect("GP fit error");
        let refit = gp
            .warm_params()
            .fit(&Dataset::new(xt, yt))
            .expect("GP refit error");
        assert!(refit.likelihood() >= gp.likelihood() - 1e-4);
    }

    #[test]
    fn test_multi_outputs() {
        let xt = array![[0.0], [1.0], [2.0], [3.0], [4.0]];
        let mut yt = Array2::zeros((5, 2));
        yt.column_mut(0).assign(&xt.column(0).mapv(f64::sin));
        yt.column_mut(1).assign(&xt.column(0).mapv(f64::cos));
        let gp = Kriging::params()
            .hyper_tuning(HyperTuning::Fixed(array![1., 1., 1e-8]))
            .normalize(true)
            .fit(&Dataset::new(xt.clone(), yt.clone()))
            .expect("GP fit error");
        assert_eq!(gp.dims(), (1, 2));
        let ypred = gp.predict(&xt).unwrap();
        assert_abs_diff_eq!(ypred, yt, epsilon = 1e-6);
        let ystd = GpStdPredictor(&gp).predict(&array![[0.5], [10.]]);
        assert_eq!(ystd.dim(), (2, 2));
        assert!(ystd[[0, 0]] < ystd[[1, 0]]);
    }

    #[test]
    fn test_predict_with_hyperparameters() {
        let xt = array![[0.0], [1.0], [2.0], [3.0], [4.0]];
        let yt = sinx(&xt);
        let gp = Kriging::params()
            .n_start(2)
            .seed(Some(42))
            .fit(&Dataset::new(xt.clone(), yt))
            .expect("GP fit error");
        let xtest = array![[0.3], [2.7]];
        let (ypred, ystd) = gp.predict_valstd(&xtest).unwrap();
        let (ypred2, ystd2) = gp
            .predict_with_hyperparameters(&xtest, gp.hyperparameters())
            .unwrap();
        assert_abs_diff_eq!(ypred, ypred2, epsilon = 1e-10);
        assert_abs_diff_eq!(ystd, ystd2, epsilon = 1e-10);

        let other = array![0.1, 1., 1e-3];
        let (ypred3, _) = gp.predict_with_hyperparameters(&xtest, &other).unwrap();
        assert!((&ypred3 - &ypred).mapv(f64::abs).sum() > 1e-6);
        // fitted state unchanged
        assert_abs_diff_eq!(gp.predict(&xtest).unwrap(), ypred, epsilon = 1e-12);
    }

    #[test]
    fn test_flat_predictions() {
        let xt = array![[0.0], [1.0], [2.0], [3.0]];
        let yt = sinx(&xt);
        let gp = Kriging::params()
            .hyper_tuning(HyperTuning::Fixed(array![1., 1., 1e-8]))
            .fit(&Dataset::new(xt.clone(), yt.clone()))
            .expect("GP fit error");
        let (mean, std) = gp.predict_valstd_flat(&xt).expect("prediction error");
        assert_eq!(mean.dim(), 4);
        assert_eq!(std.dim(), 4);
        assert_abs_diff_eq!(mean, yt, epsilon = 1e-6);
        assert_eq!(gp.predict_flat(&xt).unwrap().dim(), 4);
        assert_eq!(gp.predict_std_flat(&xt).unwrap().dim(), 4);

        let ycol = yt.insert_axis(Axis(1));
        let yt2 = concatenate![Axis(1), ycol, ycol];
        let gp = Kriging::params()
            .hyper_tuning(HyperTuning::Fixed(array![1., 1., 1e-8]))
            .fit(&Dataset::new(xt.clone(), yt2))
            .expect("GP fit error");
        assert!(matches!(
            gp.predict_valstd_flat(&xt),
            Err(GpError::DimensionError(_))
        ));
    }

    #[test]
    fn test_bad_training_data() {
        let xt = array![[0.0], [1.0], [2.0]];
        let yt = array![0.0, 1.0];
        let res = Kriging::params().fit(&Dataset::new(xt, yt));
        assert!(matches!(res, Err(GpError::DimensionError(_))));

        let xt = array![[0.0, 1.], [1.0, 2.]];
        let yt = array![0.0, 1.0];
        let res = Kriging::params()
            .hyper_init(array![1., 1., 1., 1., 1.])
            .fit(&Dataset::new(xt, yt));
        assert!(matches!(res, Err(GpError::InvalidValueError(_))));
    }

    #[derive(Clone, Copy, Debug, Default)]
    struct NanKernel();

    impl fmt::Display for NanKernel {
        fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
            write!(f, "Nan")
        }
    }

    impl Kernel<f64> for NanKernel {
        fn correlation(&self, _r: f64) -> f64 {
            f64::NAN
        }
    }

    #[test]
    fn test_all_restarts_failing() {
        let xt = array![[0.0], [1.0], [2.0]];
        let yt = array![0.0, 1.0, 0.5];
        let res = GaussianProcess::<f64, NanKernel>::params(NanKernel())
            .n_start(3)
            .seed(Some(42))
            .fit(&Dataset::new(xt, yt));
        assert!(matches!(res, Err(GpError::LikelihoodComputationError(_))));
    }

    #[test]
    fn test_constrained_fit() {
        let xt = array![[0.0], [1.0], [2.0], [3.0], [4.0]];
        let yt = array![0.1, 0.6, 0.05, 0.8, 0.2];
        let cstr_points = Array::linspace(0., 4., 9).insert_axis(Axis(1));
        let gp = Kriging::params()
            .n_start(2)
            .seed(Some(42))
            .constraints(NonNegative::new(cstr_points.clone()).observed_error(0.05))
            .fit(&Dataset::new(xt, yt))
            .expect("GP fit error");
        assert!(gp.hyperparameters().iter().all(|v: &f64| v.is_finite() && *v > 0.));
        let ypred = gp.predict(&cstr_points).unwrap();
        assert!(ypred.iter().all(|v: &f64| v.is_finite()));
    }

    macro_rules! test_gp {
        ($kernel:ident) => {
            paste! {
                #[test]
                fn [<test_gp_ $kernel:snake >]() {
                    let xt = array![[0.0], [1.0], [2.0], [3.0], [4.0]];
                    let yt = array![0.0, 1.0, 1.5, 0.9, 1.0];
                    let gp = GaussianProcess::<f64, [<$kernel Kernel>]>::params(
                        [<$kernel Kernel>]::default(),
                    )
                    .n_start(2)
                    .seed(Some(42))
                    .fit(&Dataset::new(xt.clone(), yt.clone()))
                    .expect("GP fit error");
                    let yvals = gp.predict(&array![[1.0], [3.5]]).expect("prediction error");
                    let expected_y = array![[1.0], [0.9]];
                    assert_abs_diff_eq!(expected_y, yvals, epsilon = 0.5);

                    let ystd = gp.predict_std(&array![[1.0], [3.5]]).expect("prediction error");
                    assert!(ystd.iter().all(|&v| v >= 0.));

                    let ytrain = gp.predict(&xt).expect("prediction error");
                    assert_eq!(ytrain.dim(), (5, 1));
                }
            }
        };
    }

    test_gp!(SquaredExponential);
    test_gp!(AbsoluteExponential);
    test_gp!(Matern32);
    test_gp!(Matern52);
}
