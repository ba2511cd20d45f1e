//! Logarithmic and exponential maps of the Grassmann manifold.
//!
//! Tangent vectors are (n, p) matrices valid relative to the reference point
//! used to compute them.

use crate::distances::GrassmannDistance;
use crate::errors::{GrassmannError, Result};
use crate::linalg::{frobenius, has_orthonormal_columns, orthonormalize, solve, svd_thin};
use crate::point::{GrassmannPoint, ORTHONORMAL_TOL};
use log::debug;
use ndarray::Array2;
use rayon::prelude::*;

fn check_shape(shape: (usize, usize), reference: &GrassmannPoint, what: &str) -> Result<()> {
    if shape != reference.data().dim() {
        return Err(GrassmannError::DimensionError(format!(
            "{} of shape {:?} does not match reference point shape {:?}",
            what,
            shape,
            reference.data().dim()
        )));
    }
    Ok(())
}

pub(crate) fn log_map_single(point: &GrassmannPoint, reference: &GrassmannPoint) -> Result<Array2<f64>> {
    check_shape(point.data().dim(), reference, "Point")?;
    let y = reference.data();
    let p = point.data();
    let ytp = y.t().dot(p);
    let residual = p - &y.dot(&ytp);
    // M = (I - Y Y^T) P (Y^T P)^-1 computed as (Y^T P)^T M^T = ((I - Y Y^T) P)^T
    let m = solve(&ytp.t(), &residual.t())?.reversed_axes();
    let (u, s, vt) = svd_thin(&m)?;
    Ok((&u * &s.mapv(f64::atan)).dot(&vt))
}

pub(crate) fn exp_map_single(tangent: &Array2<f64>, reference: &GrassmannPoint) -> Result<GrassmannPoint> {
    check_shape(tangent.dim(), reference, "Tangent vector")?;
    if frobenius(tangent) == 0. {
        return Ok(reference.clone());
    }
    let (u, s, vt) = svd_thin(tangent)?;
    let v = vt.t();
    let moved = reference.data().dot(&(&v * &s.mapv(f64::cos))).dot(&vt)
        + (&u * &s.mapv(f64::sin)).dot(&vt);
    if has_orthonormal_columns(&moved, ORTHONORMAL_TOL) {
        GrassmannPoint::new(moved)
    } else {
        debug!("Re-orthonormalize exp map result");
        GrassmannPoint::new(orthonormalize(&moved)?)
    }
}

/// Project `points` onto the tangent space at `reference`.
///
/// Each point P gives `U atan(S) V^T` where `U S V^T` is the thin SVD of
/// `(I - Y Y^T) P (Y^T P)^-1`, Y being the reference. Accuracy degrades when
/// principal angles between P and Y approach pi/2 and a singular `Y^T P` is an error.
pub fn log_map(points: &[GrassmannPoint], reference: &GrassmannPoint) -> Result<Vec<Array2<f64>>> {
    points
        .par_iter()
        .map(|p| log_map_single(p, reference))
        .collect()
}

/// Map tangent vectors at `reference` back onto the manifold.
///
/// Each tangent `U S V^T` gives the point `Y V cos(S) V^T + U sin(S) V^T`.
pub fn exp_map(tangents: &[Array2<f64>], reference: &GrassmannPoint) -> Result<Vec<GrassmannPoint>> {
    tangents
        .par_iter()
        .map(|t| exp_map_single(t, reference))
        .collect()
}

/// Mean of squared distances between `point` and `points`
pub fn frechet_variance(
    point: &GrassmannPoint,
    points: &[GrassmannPoint],
    distance: &dyn GrassmannDistance,
) -> Result<f64> {
    if points.is_empty() {
        return Err(GrassmannError::InvalidValueError(
            "Frechet variance requires at least one point".to_string(),
        ));
    }
    let sum = points.iter().try_fold(0., |acc, p| {
        distance.compute(point, p).map(|d| acc + d * d)
    })?;
    Ok(sum / points.len() as f64)
}
