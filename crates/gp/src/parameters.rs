use crate::constraints::HyperConstraints;
use crate::errors::{GpError, Result};
use crate::kernels::Kernel;
use crate::optimization::{Cobyla, HyperOptimizer};
use crate::GP_OPTIM_N_START;
use linfa::{Float, ParamGuard};

use ndarray::{array, Array1};
use std::sync::Arc;

/// An enum to represent the kernel hyperparameters `[l_1, ..., l_d, sigma, noise]` tuning.
///
/// `init` and `bounds` are given either compactly as `[length, sigma, noise]`, the length
/// value being used for every input dimension, or explicitly with `d + 2` values.
#[derive(Clone, Debug, PartialEq)]
pub enum HyperTuning<F: Float> {
    /// Constant hyperparameters (ie given not estimated)
    Fixed(Array1<F>),
    /// Hyperparameters are optimized between given bounds (lower, upper) starting from the inital guess
    Full {
        /// Initial guess for the hyperparameters
        init: Array1<F>,
        /// Bounds for the hyperparameters array(lower, upper)
        bounds: Array1<(F, F)>,
    },
    /// Hyperparameters are partially optimized on specified active components
    Partial {
        /// Initial guess for the hyperparameters, inactive components keep this value
        init: Array1<F>,
        /// Bounds for the hyperparameters array(lower, upper)
        bounds: Array1<(F, F)>,
        /// Active components (indices in the expanded `d + 2` vector) for the optimization
        active: Vec<usize>,
    },
}

impl<F: Float> Default for HyperTuning<F> {
    fn default() -> Self {
        HyperTuning::Full {
            init: Self::default_init(),
            bounds: Self::default_bounds(),
        }
    }
}

impl<F: Float> HyperTuning<F> {
    /// Default initial length-scale value
    pub const DEFAULT_LENGTH_INIT: f64 = 1.;
    /// Default initial process standard deviation
    pub const DEFAULT_SIGMA_INIT: f64 = 1.;
    /// Default initial noise standard deviation
    pub const DEFAULT_NOISE_INIT: f64 = 1e-3;
    /// Default bounds for length-scales and process standard deviation
    pub const DEFAULT_BOUNDS: (f64, f64) = (1e-3, 1e3);
    /// Default bounds for noise standard deviation
    pub const DEFAULT_NOISE_BOUNDS: (f64, f64) = (1e-10, 1e-1);

    /// Default compact initial guess `[length, sigma, noise]`
    pub fn default_init() -> Array1<F> {
        array![
            F::cast(Self::DEFAULT_LENGTH_INIT),
            F::cast(Self::DEFAULT_SIGMA_INIT),
            F::cast(Self::DEFAULT_NOISE_INIT)
        ]
    }

    /// Default compact bounds `[length, sigma, noise]`
    pub fn default_bounds() -> Array1<(F, F)> {
        let (lo, up) = Self::DEFAULT_BOUNDS;
        let (nlo, nup) = Self::DEFAULT_NOISE_BOUNDS;
        array![
            (F::cast(lo), F::cast(up)),
            (F::cast(lo), F::cast(up)),
            (F::cast(nlo), F::cast(nup))
        ]
    }

    /// Get initial hyperparameters value
    pub fn init(&self) -> &Array1<F> {
        match self {
            HyperTuning::Full { init, .. } => init,
            HyperTuning::Partial { init, .. } => init,
            HyperTuning::Fixed(init) => init,
        }
    }

    /// Get bounds for hyperparameters value
    pub fn bounds(&self) -> Option<&Array1<(F, F)>> {
        match self {
            HyperTuning::Full { bounds, .. } => Some(bounds),
            HyperTuning::Partial { bounds, .. } => Some(bounds),
            HyperTuning::Fixed(_) => None,
        }
    }
}

/// Expand compact `[length, sigma, noise]` values to `d + 2` values,
/// explicit `d + 2` values are returned as is.
pub(crate) fn expand_hyper<T: Clone>(values: &Array1<T>, dim: usize, what: &str) -> Result<Array1<T>> {
    if values.len() == dim + 2 {
        Ok(values.to_owned())
    } else if values.len() == 3 {
        let mut expanded = vec![values[0].clone(); dim];
        expanded.push(values[1].clone());
        expanded.push(values[2].clone());
        Ok(Array1::from(expanded))
    } else {
        Err(GpError::InvalidValueError(format!(
            "{} should have either 3 values (length, sigma, noise) or {} values \
                (input dimension + 2), got {}",
            what,
            dim + 2,
            values.len()
        )))
    }
}

/// A set of validated GP parameters.
#[derive(Clone, Debug)]
pub struct GpValidParams<F: Float, K: Kernel<F>> {
    /// Covariance kernel
    pub(crate) kernel: K,
    /// Hyperparameters tuning
    pub(crate) hyper_tuning: HyperTuning<F>,
    /// Number of likelihood optimizations (first one from the initial guess)
    pub(crate) n_start: usize,
    /// Whether training inputs and outputs are standardized
    pub(crate) normalize: bool,
    /// Seed of the random restarts generator
    pub(crate) seed: Option<u64>,
    /// Likelihood optimizer
    pub(crate) optimizer: Arc<dyn HyperOptimizer>,
    /// Optional constraints on likelihood optimization
    pub(crate) constraints: Option<Arc<dyn HyperConstraints<F, K>>>,
}

impl<F: Float, K: Kernel<F>> Default for GpValidParams<F, K> {
    fn default() -> GpValidParams<F, K> {
        GpValidParams {
            kernel: K::default(),
            hyper_tuning: HyperTuning::default(),
            n_start: GP_OPTIM_N_START,
            normalize: false,
            seed: None,
            optimizer: Arc::new(Cobyla::default()),
            constraints: None,
        }
    }
}

impl<F: Float, K: Kernel<F>> GpValidParams<F, K> {
    /// Get covariance kernel
    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    /// Get hyperparameters tuning
    pub fn hyper_tuning(&self) -> &HyperTuning<F> {
        &self.hyper_tuning
    }

    /// Get the number of likelihood optimizations
    pub fn n_start(&self) -> usize {
        self.n_start
    }

    /// Whether data are standardized before fitting
    pub fn normalize(&self) -> bool {
        self.normalize
    }

    /// Get the seed of the random restarts generator
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Get the likelihood optimizer
    pub fn optimizer(&self) -> &dyn HyperOptimizer {
        self.optimizer.as_ref()
    }

    /// Get likelihood optimization constraints if any
    pub fn constraints(&self) -> Option<&dyn HyperConstraints<F, K>> {
        self.constraints.as_deref()
    }
}

#[derive(Clone, Debug)]
/// The set of hyperparameters that can be specified for the execution of
/// the [GP algorithm](struct.GaussianProcess.html).
pub struct GpParams<F: Float, K: Kernel<F>>(pub(crate) GpValidParams<F, K>);

impl<F: Float, K: Kernel<F>> GpParams<F, K> {
    /// A constructor for GP parameters given a kernel
    pub fn new(kernel: K) -> GpParams<F, K> {
        Self(GpValidParams {
            kernel,
            ..Default::default()
        })
    }

    /// A constructor for GP parameters from validated parameters
    pub fn new_from_valid(params: &GpValidParams<F, K>) -> Self {
        Self(params.clone())
    }

    /// Set covariance kernel.
    pub fn kernel(mut self, kernel: K) -> Self {
        self.0.kernel = kernel;
        self
    }

    /// Set initial value of hyperparameters.
    ///
    /// When hyperparameters are optimized, the internal optimization is started from `init`.
    /// When they are fixed, this set their constant value.
    pub fn hyper_init(mut self, hyper_init: Array1<F>) -> Self {
        self.0.hyper_tuning = match self.0.hyper_tuning {
            HyperTuning::Full { bounds, .. } => HyperTuning::Full {
                init: hyper_init,
                bounds,
            },
            HyperTuning::Partial { bounds, active, .. } => HyperTuning::Partial {
                init: hyper_init,
                bounds,
                active,
            },
            HyperTuning::Fixed(_) => HyperTuning::Fixed(hyper_init),
        };
        self
    }

    /// Set hyperparameters search space.
    ///
    /// This function is no-op when hyperparameters tuning is fixed
    pub fn hyper_bounds(mut self, hyper_bounds: Array1<(F, F)>) -> Self {
        self.0.hyper_tuning = match self.0.hyper_tuning {
            HyperTuning::Full { init, .. } => HyperTuning::Full {
                init,
                bounds: hyper_bounds,
            },
            HyperTuning::Partial { init, active, .. } => HyperTuning::Partial {
                init,
                bounds: hyper_bounds,
                active,
            },
            HyperTuning::Fixed(f) => HyperTuning::Fixed(f),
        };
        self
    }

    /// Set hyperparameters tuning
    pub fn hyper_tuning(mut self, hyper_tuning: HyperTuning<F>) -> Self {
        self.0.hyper_tuning = hyper_tuning;
        self
    }

    /// Set the number of likelihood optimizations, the first one starting from
    /// the initial guess, the other ones from random points within bounds
    pub fn n_start(mut self, n_start: usize) -> Self {
        self.0.n_start = n_start;
        self
    }

    /// Set whether training data are standardized
    pub fn normalize(mut self, normalize: bool) -> Self {
        self.0.normalize = normalize;
        self
    }

    /// Set the seed of the random restarts generator
    pub fn seed(mut self, seed: Option<u64>) -> Self {
        self.0.seed = seed;
        self
    }

    /// Set the likelihood optimizer
    pub fn optimizer(mut self, optimizer: impl HyperOptimizer + 'static) -> Self {
        self.0.optimizer = Arc::new(optimizer);
        self
    }

    /// Set constraints on likelihood optimization
    pub fn constraints(mut self, constraints: impl HyperConstraints<F, K> + 'static) -> Self {
        self.0.constraints = Some(Arc::new(constraints));
        self
    }
}

impl<F: Float, K: Kernel<F>> From<GpValidParams<F, K>> for GpParams<F, K> {
    fn from(valid: GpValidParams<F, K>) -> Self {
        GpParams(valid)
    }
}

impl<F: Float, K: Kernel<F>> ParamGuard for GpParams<F, K> {
    type Checked = GpValidParams<F, K>;
    type Error = GpError;

    fn check_ref(&self) -> Result<&Self::Checked> {
        if self.0.n_start == 0 {
            return Err(GpError::InvalidValueError(
                "`n_start` should be at least 1".to_string(),
            ));
        }
        let tuning = &self.0.hyper_tuning;
        let init = tuning.init();
        if init.len() < 3 {
            return Err(GpError::InvalidValueError(format!(
                "Hyperparameters should have at least 3 values (length, sigma, noise), got {}",
                init.len()
            )));
        }
        if init.iter().any(|v| !(*v > F::zero())) {
            return Err(GpError::InvalidValueError(format!(
                "Hyperparameters should be strictly positive, got {init}"
            )));
        }
        if let Some(bounds) = tuning.bounds() {
            if bounds
                .iter()
                .any(|(lo, up)| !(*lo > F::zero()) || !(lo < up))
            {
                return Err(GpError::InvalidValueError(
                    "Hyperparameters bounds should be positive (lower, upper) with lower < upper"
                        .to_string(),
                ));
            }
        }
        if let HyperTuning::Partial { active, .. } = tuning {
            if active.is_empty() {
                return Err(GpError::InvalidValueError(
                    "Partial tuning requires at least one active component".to_string(),
                ));
            }
        }
        Ok(&self.0)
    }

    fn check(self) -> Result<Self::Checked> {
        self.check_ref()?;
        Ok(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernels::SquaredExponentialKernel;

    #[test]
    fn test_expand_hyper() {
        let compact = array![0.5, 2., 1e-3];
        assert_eq!(
            expand_hyper(&compact, 3, "init").unwrap(),
            array![0.5, 0.5, 0.5, 2., 1e-3]
        );
        let explicit = array![0.5, 0.7, 2., 1e-3];
        assert_eq!(expand_hyper(&explicit, 2, "init").unwrap(), explicit);
        assert!(expand_hyper(&explicit, 3, "init").is_err());
    }

    #[test]
    fn test_invalid_params() {
        let params = GpParams::<f64, _>::new(SquaredExponentialKernel()).n_start(0);
        assert!(matches!(
            params.check_ref(),
            Err(GpError::InvalidValueError(_))
        ));

        let params =
            GpParams::<f64, _>::new(SquaredExponentialKernel()).hyper_init(array![1., -1., 1e-3]);
        assert!(params.check().is_err());

        let params = GpParams::<f64, _>::new(SquaredExponentialKernel())
            .hyper_bounds(array![(1., 0.1), (1e-3, 1e3), (1e-10, 1e-1)]);
        assert!(params.check().is_err());

        let params = GpParams::<f64, _>::new(SquaredExponentialKernel()).hyper_tuning(
            HyperTuning::Partial {
                init: HyperTuning::default_init(),
                bounds: HyperTuning::default_bounds(),
                active: vec![],
            },
        );
        assert!(params.check().is_err());
    }

    #[test]
    fn test_default_params() {
        let params = GpParams::<f64, _>::new(SquaredExponentialKernel())
            .check()
            .unwrap();
        assert_eq!(params.n_start(), GP_OPTIM_N_START);
        assert_eq!(params.hyper_tuning().init(), &array![1., 1., 1e-3]);
        assert!(!params.normalize());
        assert!(params.constraints().is_none());
    }
}
