use crate::errors::{GrassmannError, Result};
use crate::linalg::{has_orthonormal_columns, orthonormalize};
use ndarray::{Array2, ArrayView2};
use std::fmt;

/// Tolerance used to check orthonormality of point columns
pub const ORTHONORMAL_TOL: f64 = 1e-8;

/// A point of the Grassmann manifold Gr(p, n): the p-dimensional subspace
/// of R^n represented by a (n, p) matrix with orthonormal columns.
#[derive(Debug, Clone, PartialEq)]
pub struct GrassmannPoint {
    data: Array2<f64>,
}

impl GrassmannPoint {
    /// Create a point from a (n, p) matrix with orthonormal columns.
    ///
    /// Fails if p > n or if columns are not orthonormal.
    pub fn new(data: Array2<f64>) -> Result<Self> {
        if data.ncols() == 0 || data.ncols() > data.nrows() {
            return Err(GrassmannError::DimensionError(format!(
                "Grassmann point requires 0 < p <= n, got shape {:?}",
                data.dim()
            )));
        }
        if !has_orthonormal_columns(&data, ORTHONORMAL_TOL) {
            return Err(GrassmannError::InvalidValueError(
                "Grassmann point columns should be orthonormal".to_string(),
            ));
        }
        Ok(GrassmannPoint { data })
    }

    /// Create the point spanned by the columns of a (n, p) full rank matrix
    pub fn from_span(data: &Array2<f64>) -> Result<Self> {
        if data.ncols() == 0 || data.ncols() > data.nrows() {
            return Err(GrassmannError::DimensionError(format!(
                "Grassmann point requires 0 < p <= n, got shape {:?}",
                data.dim()
            )));
        }
        Self::new(orthonormalize(data)?)
    }

    /// Orthonormal basis (n, p)
    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }

    /// Orthonormal basis view
    pub fn view(&self) -> ArrayView2<'_, f64> {
        self.data.view()
    }

    /// Consume the point returning its basis
    pub fn into_data(self) -> Array2<f64> {
        self.data
    }

    /// Ambient dimension n
    pub fn n(&self) -> usize {
        self.data.nrows()
    }

    /// Subspace dimension p
    pub fn p(&self) -> usize {
        self.data.ncols()
    }

    /// Orthogonal projector `Y Y^T` on the subspace, independent of the basis choice
    pub fn projector(&self) -> Array2<f64> {
        self.data.dot(&self.data.t())
    }
}

impl fmt::Display for GrassmannPoint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Gr({}, {})", self.p(), self.n())
    }
}

impl TryFrom<Array2<f64>> for GrassmannPoint {
    type Error = GrassmannError;
    fn try_from(data: Array2<f64>) -> Result<Self> {
        Self::new(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_new_point() {
        let p = GrassmannPoint::new(array![[1., 0.], [0., 1.], [0., 0.]]).unwrap();
        assert_eq!((p.n(), p.p()), (3, 2));
        assert_eq!(p.to_string(), "Gr(2, 3)");
        assert!(GrassmannPoint::new(array![[1., 1.], [0., 1.], [0., 0.]]).is_err());
        assert!(matches!(
            GrassmannPoint::new(array![[1., 0., 0.]]),
            Err(GrassmannError::DimensionError(_))
        ));
    }

    #[test]
    fn test_from_span() {
        let p = GrassmannPoint::from_span(&array![[2., 0.], [0., 3.], [0., 0.]]).unwrap();
        assert_abs_diff_eq!(
            p.projector(),
            array![[1., 0., 0.], [0., 1., 0.], [0., 0., 0.]],
            epsilon = 1e-12
        );
    }
}
