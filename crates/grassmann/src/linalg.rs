//! Dense linear algebra helpers shared by Grassmann algorithms
use crate::errors::{GrassmannError, Result};
use linfa_linalg::{norm::*, qr::*, svd::*, triangular::*};
use ndarray::{Array1, Array2, ArrayBase, Axis, Data, Ix2};

/// Thin SVD `a = u diag(s) vt` with singular values sorted in decreasing order.
/// For a (m, n) matrix, u is (m, k), s is (k,) and vt is (k, n) with k = min(m, n).
pub fn svd_thin(
    a: &ArrayBase<impl Data<Elem = f64>, Ix2>,
) -> Result<(Array2<f64>, Array1<f64>, Array2<f64>)> {
    let (m, n) = a.dim();
    if m == 0 || n == 0 {
        return Err(GrassmannError::DimensionError(format!(
            "Cannot decompose empty matrix of shape {:?}",
            a.dim()
        )));
    }
    let (u, s, vt) = if m >= n {
        a.to_owned().svd(true, true)?
    } else {
        let (u, s, vt) = a.t().to_owned().svd(true, true)?;
        (vt.map(|v| v.reversed_axes()), s, u.map(|u| u.reversed_axes()))
    };
    let (u, vt) = u.zip(vt).ok_or_else(|| {
        GrassmannError::InvalidValueError("SVD singular vectors not computed".to_string())
    })?;

    let mut idx: Vec<usize> = (0..s.len()).collect();
    idx.sort_by(|&i, &j| s[j].abs().total_cmp(&s[i].abs()));
    let mut u = u.select(Axis(1), &idx);
    let s = s.select(Axis(0), &idx);
    let vt = vt.select(Axis(0), &idx);
    // keep singular values positive
    for (mut col, sv) in u.columns_mut().into_iter().zip(s.iter()) {
        if *sv < 0. {
            col.mapv_inplace(|v| -v);
        }
    }
    Ok((u, s.mapv(f64::abs), vt))
}

/// Singular values of `a` in decreasing order
pub fn singular_values(a: &ArrayBase<impl Data<Elem = f64>, Ix2>) -> Result<Array1<f64>> {
    let (_, s, _) = if a.nrows() >= a.ncols() {
        a.to_owned().svd(false, false)?
    } else {
        a.t().to_owned().svd(false, false)?
    };
    let mut s = s.mapv(f64::abs).to_vec();
    s.sort_by(|a, b| b.total_cmp(a));
    Ok(Array1::from(s))
}

/// Numerical rank: number of singular values above `s_max * max(m, n) * eps`
pub fn matrix_rank(a: &ArrayBase<impl Data<Elem = f64>, Ix2>) -> Result<usize> {
    let s = singular_values(a)?;
    let smax = s.first().copied().unwrap_or(0.);
    let tol = smax * a.nrows().max(a.ncols()) as f64 * f64::EPSILON;
    Ok(s.iter().filter(|&&v| v > tol).count())
}

/// Orthonormal basis of the columns of a (m, n) matrix with m >= n,
/// the QR factor being made unique with a positive R diagonal
pub fn orthonormalize(a: &ArrayBase<impl Data<Elem = f64>, Ix2>) -> Result<Array2<f64>> {
    if a.nrows() < a.ncols() {
        return Err(GrassmannError::DimensionError(format!(
            "Cannot orthonormalize {} columns in dimension {}",
            a.ncols(),
            a.nrows()
        )));
    }
    let (mut q, r) = a.to_owned().qr()?.into_decomp();
    for (i, mut col) in q.columns_mut().into_iter().enumerate() {
        if r[[i, i]] < 0. {
            col.mapv_inplace(|v| -v);
        }
    }
    Ok(q)
}

/// Whether `a` columns are orthonormal within `tol`
pub fn has_orthonormal_columns(a: &ArrayBase<impl Data<Elem = f64>, Ix2>, tol: f64) -> bool {
    if a.nrows() < a.ncols() {
        return false;
    }
    let ata = a.t().dot(a);
    (&ata - &Array2::<f64>::eye(a.ncols())).norm_l2() < tol
}

/// Solve the square system `a x = b` using QR decomposition
pub fn solve(
    a: &ArrayBase<impl Data<Elem = f64>, Ix2>,
    b: &ArrayBase<impl Data<Elem = f64>, Ix2>,
) -> Result<Array2<f64>> {
    let n = a.nrows();
    if a.ncols() != n || b.nrows() != n {
        return Err(GrassmannError::DimensionError(format!(
            "Cannot solve system with matrix {:?} and right hand side {:?}",
            a.dim(),
            b.dim()
        )));
    }
    let (q, r) = a.to_owned().qr()?.into_decomp();
    let rmax = r.diag().fold(0., |acc: f64, v| acc.max(v.abs()));
    if r.diag().iter().any(|v| v.abs() <= rmax * n as f64 * f64::EPSILON) {
        return Err(GrassmannError::InvalidValueError(
            "Singular matrix in linear system".to_string(),
        ));
    }
    Ok(r.solve_triangular(&q.t().dot(b), UPLO::Upper)?)
}

/// Frobenius norm
pub fn frobenius(a: &ArrayBase<impl Data<Elem = f64>, Ix2>) -> f64 {
    a.norm_l2()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_svd_thin_sorted() {
        let a = array![[1., 0.], [0., 3.], [0., 0.]];
        let (u, s, vt) = svd_thin(&a).unwrap();
        assert_eq!(u.dim(), (3, 2));
        assert_eq!(vt.dim(), (2, 2));
        assert_abs_diff_eq!(s, array![3., 1.], epsilon = 1e-12);
        let rebuilt = (&u * &s).dot(&vt);
        assert_abs_diff_eq!(rebuilt, a, epsilon = 1e-12);
    }

    #[test]
    fn test_svd_thin_wide() {
        let a = array![[1., 2., 0., 1.], [0., 1., 3., 1.]];
        let (u, s, vt) = svd_thin(&a).unwrap();
        assert_eq!(u.dim(), (2, 2));
        assert_eq!(vt.dim(), (2, 4));
        assert!(s[0] >= s[1]);
        assert_abs_diff_eq!((&u * &s).dot(&vt), a, epsilon = 1e-10);
    }

    #[test]
    fn test_matrix_rank() {
        let a = array![[1., 2., 3.], [2., 4., 6.], [1., 0., 1.]];
        assert_eq!(matrix_rank(&a).unwrap(), 2);
        assert_eq!(matrix_rank(&Array2::<f64>::eye(4)).unwrap(), 4);
        assert_eq!(matrix_rank(&Array2::<f64>::zeros((3, 2))).unwrap(), 0);
    }

    #[test]
    fn test_orthonormalize() {
        let a = array![[1., 1.], [0., 1.], [1., 0.]];
        let q = orthonormalize(&a).unwrap();
        assert!(has_orthonormal_columns(&q, 1e-10));
        // same column space
        let proj = q.dot(&q.t());
        assert_abs_diff_eq!(proj.dot(&a), a, epsilon = 1e-10);
    }

    #[test]
    fn test_solve() {
        let a = array![[2., 1.], [1., 3.]];
        let b = array![[3.], [5.]];
        let x = solve(&a, &b).unwrap();
        assert_abs_diff_eq!(a.dot(&x), b, epsilon = 1e-12);
        assert!(solve(&array![[1., 2.], [2., 4.]], &b).is_err());
    }
}
