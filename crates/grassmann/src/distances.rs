//! Distances between Grassmann points computed from principal angles.
//!
//! Principal angles between subspaces spanned by `a` and `b` are `acos(s_i)` where
//! `s_i` are the singular values of `a^T b`.

use crate::errors::{GrassmannError, Result};
use crate::linalg::singular_values;
use crate::point::GrassmannPoint;
use ndarray::Array1;
use std::f64::consts::PI;
use std::fmt;

/// A trait for distances on the Grassmann manifold
pub trait GrassmannDistance: fmt::Debug + Sync + Send {
    /// Distance between `a` and `b`
    fn compute(&self, a: &GrassmannPoint, b: &GrassmannPoint) -> Result<f64>;
}

/// Principal angles between subspaces spanned by `a` and `b`, in increasing order
pub fn principal_angles(a: &GrassmannPoint, b: &GrassmannPoint) -> Result<Array1<f64>> {
    if a.n() != b.n() {
        return Err(GrassmannError::DimensionError(format!(
            "Points should live in the same ambient dimension, got {} and {}",
            a.n(),
            b.n()
        )));
    }
    let cosines = singular_values(&a.data().t().dot(b.data()))?;
    Ok(cosines.mapv(|v| v.clamp(-1., 1.).acos()))
}

/// Geodesic (arc length) distance `sqrt(|pa - pb| pi^2 / 4 + sum theta^2)`
#[derive(Clone, Copy, Debug, Default)]
pub struct GeodesicDistance;

impl GrassmannDistance for GeodesicDistance {
    fn compute(&self, a: &GrassmannPoint, b: &GrassmannPoint) -> Result<f64> {
        let theta = principal_angles(a, b)?;
        let rank_diff = a.p().abs_diff(b.p()) as f64;
        Ok((rank_diff * PI * PI / 4. + theta.mapv(|t| t * t).sum()).sqrt())
    }
}

/// Asimov distance `max theta`
#[derive(Clone, Copy, Debug, Default)]
pub struct AsimovDistance;

impl GrassmannDistance for AsimovDistance {
    fn compute(&self, a: &GrassmannPoint, b: &GrassmannPoint) -> Result<f64> {
        let theta = principal_angles(a, b)?;
        Ok(theta.fold(0., |acc: f64, t| acc.max(*t)))
    }
}

/// Binet-Cauchy distance `sqrt(1 - prod cos^2 theta)`
#[derive(Clone, Copy, Debug, Default)]
pub struct BinetCauchyDistance;

impl GrassmannDistance for BinetCauchyDistance {
    fn compute(&self, a: &GrassmannPoint, b: &GrassmannPoint) -> Result<f64> {
        let theta = principal_angles(a, b)?;
        let prod = theta.fold(1., |acc, t| acc * t.cos().powi(2));
        Ok((1. - prod).max(0.).sqrt())
    }
}

/// Martin distance `sqrt(-log prod cos^2 theta)`
#[derive(Clone, Copy, Debug, Default)]
pub struct MartinDistance;

impl GrassmannDistance for MartinDistance {
    fn compute(&self, a: &GrassmannPoint, b: &GrassmannPoint) -> Result<f64> {
        let theta = principal_angles(a, b)?;
        let log_prod = theta.fold(0., |acc, t| acc + t.cos().powi(2).ln());
        Ok((-log_prod).max(0.).sqrt())
    }
}

/// Procrustes distance `2 sqrt(sum sin^2(theta / 2))`
#[derive(Clone, Copy, Debug, Default)]
pub struct ProcrustesDistance;

impl GrassmannDistance for ProcrustesDistance {
    fn compute(&self, a: &GrassmannPoint, b: &GrassmannPoint) -> Result<f64> {
        let theta = principal_angles(a, b)?;
        Ok(2. * theta.mapv(|t| (t / 2.).sin().powi(2)).sum().sqrt())
    }
}

/// Projection distance `sqrt(sum sin^2 theta)`
#[derive(Clone, Copy, Debug, Default)]
pub struct ProjectionDistance;

impl GrassmannDistance for ProjectionDistance {
    fn compute(&self, a: &GrassmannPoint, b: &GrassmannPoint) -> Result<f64> {
        let theta = principal_angles(a, b)?;
        Ok(theta.mapv(|t| t.sin().powi(2)).sum().sqrt())
    }
}

/// Spectral distance `2 sin(max theta / 2)`
#[derive(Clone, Copy, Debug, Default)]
pub struct SpectralDistance;

impl GrassmannDistance for SpectralDistance {
    fn compute(&self, a: &GrassmannPoint, b: &GrassmannPoint) -> Result<f64> {
        let theta = principal_angles(a, b)?;
        let max_theta = theta.fold(0., |acc: f64, t| acc.max(*t));
        Ok(2. * (max_theta / 2.).sin())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn line(angle: f64) -> GrassmannPoint {
        GrassmannPoint::new(array![[angle.cos()], [angle.sin()]]).unwrap()
    }

    #[test]
    fn test_lines_distances() {
        let (a, b) = (line(0.), line(0.3));
        assert_abs_diff_eq!(GeodesicDistance.compute(&a, &b).unwrap(), 0.3, epsilon = 1e-10);
        assert_abs_diff_eq!(AsimovDistance.compute(&a, &b).unwrap(), 0.3, epsilon = 1e-10);
        assert_abs_diff_eq!(
            ProjectionDistance.compute(&a, &b).unwrap(),
            0.3f64.sin(),
            epsilon = 1e-10
        );
        assert_abs_diff_eq!(
            BinetCauchyDistance.compute(&a, &b).unwrap(),
            0.3f64.sin(),
            epsilon = 1e-10
        );
        assert_abs_diff_eq!(
            SpectralDistance.compute(&a, &b).unwrap(),
            2. * 0.15f64.sin(),
            epsilon = 1e-10
        );
        assert_abs_diff_eq!(
            ProcrustesDistance.compute(&a, &b).unwrap(),
            2. * 0.15f64.sin(),
            epsilon = 1e-10
        );
        assert_abs_diff_eq!(
            MartinDistance.compute(&a, &b).unwrap(),
            (-(0.3f64.cos().powi(2)).ln()).sqrt(),
            epsilon = 1e-10
        );
    }

    #[test]
    fn test_same_subspace() {
        let a = GrassmannPoint::new(array![[1., 0.], [0., 1.], [0., 0.]]).unwrap();
        let s = std::f64::consts::FRAC_1_SQRT_2;
        let b = GrassmannPoint::new(array![[s, s], [-s, s], [0., 0.]]).unwrap();
        assert_abs_diff_eq!(GeodesicDistance.compute(&a, &b).unwrap(), 0., epsilon = 1e-6);
        assert_abs_diff_eq!(ProjectionDistance.compute(&a, &b).unwrap(), 0., epsilon = 1e-6);
    }

    #[test]
    fn test_dimension_mismatch() {
        let a = line(0.);
        let b = GrassmannPoint::new(array![[1.], [0.], [0.]]).unwrap();
        assert!(matches!(
            GeodesicDistance.compute(&a, &b),
            Err(GrassmannError::DimensionError(_))
        ));
    }

    #[test]
    fn test_geodesic_rank_difference() {
        let a = GrassmannPoint::new(array![[1., 0.], [0., 1.], [0., 0.]]).unwrap();
        let b = GrassmannPoint::new(array![[1.], [0.], [0.]]).unwrap();
        assert_abs_diff_eq!(GeodesicDistance.compute(&a, &b).unwrap(), PI / 2., epsilon = 1e-8);
    }
}
