use linfa::Float;
use ndarray::{Array1, Array2, ArrayBase, Axis, Data, Ix2};

/// A structure to store (n, xdim) matrix data and its mean and standard deviation vectors.
/// When normalization is disabled, mean is zero and standard deviation is one.
#[derive(Debug)]
pub(crate) struct NormalizedData<F: Float> {
    /// normalized data
    pub data: Array2<F>,
    /// mean vector computed from data
    pub mean: Array1<F>,
    /// standard deviation vector computed from data
    pub std: Array1<F>,
}

impl<F: Float> Clone for NormalizedData<F> {
    fn clone(&self) -> NormalizedData<F> {
        NormalizedData {
            data: self.data.to_owned(),
            mean: self.mean.to_owned(),
            std: self.std.to_owned(),
        }
    }
}

impl<F: Float> NormalizedData<F> {
    /// Constructor standardizing each column of `x`
    pub fn new(x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> NormalizedData<F> {
        let (data, mean, std) = normalize(x);
        NormalizedData { data, mean, std }
    }

    /// Constructor keeping `x` as is
    pub fn identity(x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> NormalizedData<F> {
        NormalizedData {
            data: x.to_owned(),
            mean: Array1::zeros(x.ncols()),
            std: Array1::ones(x.ncols()),
        }
    }

    /// Standardize `x` when `normalize` is true, keep it otherwise
    pub fn with_normalization(
        x: &ArrayBase<impl Data<Elem = F>, Ix2>,
        normalize: bool,
    ) -> NormalizedData<F> {
        if normalize {
            Self::new(x)
        } else {
            Self::identity(x)
        }
    }

    /// Apply the stored scaling to `x`
    pub fn scale(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Array2<F> {
        (x - &self.mean) / &self.std
    }

    /// Revert the stored scaling on `x`
    pub fn unscale(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Array2<F> {
        x * &self.std + &self.mean
    }
}

/// Standardize columns using population standard deviation,
/// constant columns keep a unit standard deviation.
pub fn normalize<F: Float>(
    x: &ArrayBase<impl Data<Elem = F>, Ix2>,
) -> (Array2<F>, Array1<F>, Array1<F>) {
    let x_mean = x
        .mean_axis(Axis(0))
        .unwrap_or_else(|| Array1::zeros(x.ncols()));
    let mut x_std = x.std_axis(Axis(0), F::zero());
    x_std.mapv_inplace(|v| if v == F::zero() { F::one() } else { v });
    let xnorm = (x - &x_mean) / &x_std;

    (xnorm, x_mean, x_std)
}

/// Computes differences between each element of x and each element of y
/// resulting in a 2d array of shape (nrows(x) * nrows(y), ncols(x));
/// *Panics* if x and y have not the same column numbers
pub fn pairwise_differences<F: Float>(
    x: &ArrayBase<impl Data<Elem = F>, Ix2>,
    y: &ArrayBase<impl Data<Elem = F>, Ix2>,
) -> Array2<F> {
    assert!(x.ncols() == y.ncols());

    let nx = x.nrows();
    let ny = y.nrows();
    let mut result = Array2::zeros((nx * ny, x.ncols()));

    for (i, x_row) in x.rows().into_iter().enumerate() {
        for (j, y_row) in y.rows().into_iter().enumerate() {
            result.row_mut(i * ny + j).assign(&(&x_row - &y_row));
        }
    }

    result
}

#[inline(always)]
pub(crate) fn into_f64<F: Float>(v: &F) -> f64 {
    v.to_f64().unwrap_or(f64::NAN)
}
