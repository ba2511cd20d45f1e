//! Positive definite kernels on the Grassmann manifold
use crate::errors::{GrassmannError, Result};
use crate::linalg::singular_values;
use crate::point::GrassmannPoint;
use ndarray::Array2;
use std::fmt;

/// A trait for kernels between Grassmann points
pub trait GrassmannKernel: fmt::Debug + Sync + Send {
    /// Kernel value between `a` and `b`
    fn compute(&self, a: &GrassmannPoint, b: &GrassmannPoint) -> Result<f64>;

    /// Symmetric (n, n) kernel matrix of given points
    fn kernel_matrix(&self, points: &[GrassmannPoint]) -> Result<Array2<f64>> {
        let n = points.len();
        let mut res = Array2::zeros((n, n));
        for i in 0..n {
            for j in i..n {
                let v = self.compute(&points[i], &points[j])?;
                res[[i, j]] = v;
                res[[j, i]] = v;
            }
        }
        Ok(res)
    }
}

fn check_same_plane(a: &GrassmannPoint, b: &GrassmannPoint) -> Result<()> {
    if a.data().dim() != b.data().dim() {
        return Err(GrassmannError::DimensionError(format!(
            "Kernel requires points of the same Grassmann manifold, got {} and {}",
            a, b
        )));
    }
    Ok(())
}

/// Projection kernel `||a^T b||_F^2`
#[derive(Clone, Copy, Debug, Default)]
pub struct ProjectionKernel;

impl GrassmannKernel for ProjectionKernel {
    fn compute(&self, a: &GrassmannPoint, b: &GrassmannPoint) -> Result<f64> {
        check_same_plane(a, b)?;
        Ok(a.data().t().dot(b.data()).mapv(|v| v * v).sum())
    }
}

/// Binet-Cauchy kernel `det(a^T b)^2`
#[derive(Clone, Copy, Debug, Default)]
pub struct BinetCauchyKernel;

impl GrassmannKernel for BinetCauchyKernel {
    fn compute(&self, a: &GrassmannPoint, b: &GrassmannPoint) -> Result<f64> {
        check_same_plane(a, b)?;
        // |det| is the product of singular values
        let s = singular_values(&a.data().t().dot(b.data()))?;
        Ok(s.fold(1., |acc, v| acc * v * v))
    }
}

/// How kernel matrices of left and right singular vectors are combined
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum KernelComposition {
    /// Left singular vectors kernel only
    #[default]
    Left,
    /// Right singular vectors kernel only
    Right,
    /// Element wise product of both kernels
    Product,
    /// Sum of both kernels
    Sum,
}

impl KernelComposition {
    /// Combine left and right kernel matrices
    pub fn compose(&self, left: Array2<f64>, right: Array2<f64>) -> Array2<f64> {
        match self {
            KernelComposition::Left => left,
            KernelComposition::Right => right,
            KernelComposition::Product => left * right,
            KernelComposition::Sum => left + right,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_kernels_values() {
        let a = GrassmannPoint::new(array![[1., 0.], [0., 1.], [0., 0.]]).unwrap();
        let b = GrassmannPoint::new(array![[1., 0.], [0., 0.], [0., 1.]]).unwrap();
        assert_abs_diff_eq!(ProjectionKernel.compute(&a, &a).unwrap(), 2., epsilon = 1e-12);
        assert_abs_diff_eq!(ProjectionKernel.compute(&a, &b).unwrap(), 1., epsilon = 1e-12);
        assert_abs_diff_eq!(BinetCauchyKernel.compute(&a, &a).unwrap(), 1., epsilon = 1e-12);
        assert_abs_diff_eq!(BinetCauchyKernel.compute(&a, &b).unwrap(), 0., epsilon = 1e-12);

        let c = GrassmannPoint::new(array![[1.], [0.], [0.]]).unwrap();
        assert!(matches!(
            ProjectionKernel.compute(&a, &c),
            Err(GrassmannError::DimensionError(_))
        ));
    }

    #[test]
    fn test_kernel_matrix() {
        let s = std::f64::consts::FRAC_1_SQRT_2;
        let points = vec![
            GrassmannPoint::new(array![[1.], [0.]]).unwrap(),
            GrassmannPoint::new(array![[s], [s]]).unwrap(),
            GrassmannPoint::new(array![[0.], [1.]]).unwrap(),
        ];
        let k = ProjectionKernel.kernel_matrix(&points).unwrap();
        assert_abs_diff_eq!(
            k,
            array![[1., 0.5, 0.], [0.5, 1., 0.5], [0., 0.5, 1.]],
            epsilon = 1e-12
        );
        let composed = KernelComposition::Product.compose(k.clone(), k.clone());
        assert_abs_diff_eq!(composed[[0, 1]], 0.25, epsilon = 1e-12);
        assert_eq!(KernelComposition::Left.compose(k.clone(), Array2::zeros((3, 3))), k);
    }
}
