//! Interpolation of points on the Grassmann manifold.
//!
//! Manifold points are mapped onto the tangent space at their Karcher mean,
//! tangent vectors are interpolated with a [`TangentInterpolation`] method and
//! the interpolated tangent is mapped back onto the manifold.
//!
//! Available methods:
//! * [`LinearInterpolation`] (default): piecewise linear interpolation over a Delaunay triangulation
//!   of the coordinates,
//! * [`SurrogateInterpolation`]: one scalar surrogate (e.g. a GP) trained per matrix entry,
//! * [`CallableInterpolation`]: a user defined function.

use crate::distances::GrassmannDistance;
use crate::errors::{GrassmannError, Result};
use crate::karcher::{karcher_mean, KarcherOptimizer};
use crate::linalg::solve;
use crate::manifold::{exp_map_single, log_map};
use crate::point::GrassmannPoint;
use crate::surrogates::{Surrogate, SurrogateBuilder};
use log::debug;
use ndarray::{Array1, Array2, ArrayView1, Axis};
use rayon::prelude::*;
use std::sync::Arc;

/// Tolerance on barycentric coordinates used to decide whether a point lies in a simplex
const SIMPLEX_TOL: f64 = 1e-10;

/// A trait for interpolation methods of equally shaped matrices
pub trait TangentInterpolation: Sync + Send {
    /// Build the interpolant of `samples` located at (n, d) `coordinates`
    fn build(&self, coordinates: &Array2<f64>, samples: &[Array2<f64>])
        -> Result<Box<dyn Interpolant>>;
}

/// A trait for a built interpolant
pub trait Interpolant: Sync + Send {
    /// Interpolated matrix at given (d,) point
    fn interpolate(&self, point: &ArrayView1<f64>) -> Result<Array2<f64>>;
}

fn check_samples(coordinates: &Array2<f64>, samples: &[Array2<f64>]) -> Result<(usize, usize)> {
    let first = samples.first().ok_or_else(|| {
        GrassmannError::InvalidValueError("Interpolation requires at least one sample".to_string())
    })?;
    if coordinates.nrows() != samples.len() {
        return Err(GrassmannError::DimensionError(format!(
            "Expected one coordinate row per sample, got {} rows for {} samples",
            coordinates.nrows(),
            samples.len()
        )));
    }
    if let Some(s) = samples.iter().find(|s| s.dim() != first.dim()) {
        return Err(GrassmannError::DimensionError(format!(
            "Input matrices have different shapes {:?} and {:?}",
            first.dim(),
            s.dim()
        )));
    }
    Ok(first.dim())
}

fn check_point(point: &ArrayView1<f64>, dim: usize) -> Result<()> {
    if point.len() != dim {
        return Err(GrassmannError::DimensionError(format!(
            "Point of dimension {} while coordinates have dimension {}",
            point.len(),
            dim
        )));
    }
    Ok(())
}

/// Interpolate `samples` located at `coordinates` at the given `point`
pub fn interpolate_samples(
    method: &dyn TangentInterpolation,
    coordinates: &Array2<f64>,
    samples: &[Array2<f64>],
    point: &ArrayView1<f64>,
) -> Result<Array2<f64>> {
    method.build(coordinates, samples)?.interpolate(point)
}

/// Sorted index tuples of size `r` taken from `0..n`
fn combinations(n: usize, r: usize) -> Vec<Vec<usize>> {
    let mut res = Vec::new();
    if r > n {
        return res;
    }
    let mut idx: Vec<usize> = (0..r).collect();
    loop {
        res.push(idx.clone());
        // rightmost index which can be incremented
        let Some(i) = (0..r).rev().find(|&i| idx[i] < n - r + i) else {
            return res;
        };
        idx[i] += 1;
        for j in i + 1..r {
            idx[j] = idx[j - 1] + 1;
        }
    }
}

/// Barycentric coordinates of `point` in the simplex with given `vertices` (d + 1, d)
fn barycentric(vertices: &Array2<f64>, point: &ArrayView1<f64>) -> Result<Array1<f64>> {
    let origin = vertices.row(0);
    let edges = (&vertices.slice(ndarray::s![1.., ..]) - &origin).reversed_axes();
    let rhs = (point - &origin).insert_axis(Axis(1));
    let mu = solve(&edges, &rhs)?.remove_axis(Axis(1));
    let mut lambda = Array1::zeros(vertices.nrows());
    lambda[0] = 1. - mu.sum();
    lambda.slice_mut(ndarray::s![1..]).assign(&mu);
    Ok(lambda)
}

/// Center and squared radius of the sphere circumscribed to the simplex with given `vertices`
fn circumsphere(vertices: &Array2<f64>) -> Result<(Array1<f64>, f64)> {
    let origin = vertices.row(0);
    let a = (&vertices.slice(ndarray::s![1.., ..]) - &origin) * 2.;
    let norm0 = origin.dot(&origin);
    let rhs = vertices
        .rows()
        .into_iter()
        .skip(1)
        .map(|v| v.dot(&v) - norm0)
        .collect::<Array1<f64>>()
        .insert_axis(Axis(1));
    let center = solve(&a, &rhs)?.remove_axis(Axis(1));
    let radius2 = (&center - &origin).mapv(|v| v * v).sum();
    Ok((center, radius2))
}

/// Segments between consecutive distinct 1D coordinates
fn segments(coordinates: &Array2<f64>) -> Vec<Vec<usize>> {
    let mut order: Vec<usize> = (0..coordinates.nrows()).collect();
    order.sort_by(|&a, &b| coordinates[[a, 0]].total_cmp(&coordinates[[b, 0]]));
    order
        .windows(2)
        .filter(|w| coordinates[[w[0], 0]] < coordinates[[w[1], 0]])
        .map(|w| w.to_vec())
        .collect()
}

/// Simplices whose circumsphere contains no other coordinates.
///
/// All (d + 1)-tuples of points are checked, which is only tractable for small sets of points.
fn delaunay(coordinates: &Array2<f64>) -> Vec<Vec<usize>> {
    let (n, d) = coordinates.dim();
    combinations(n, d + 1)
        .into_iter()
        .filter_map(|simplex| {
            let vertices = coordinates.select(Axis(0), &simplex);
            // degenerate simplices have no circumsphere
            let (center, radius2) = circumsphere(&vertices).ok()?;
            let tol = SIMPLEX_TOL * radius2.max(1.);
            let empty = coordinates
                .rows()
                .into_iter()
                .enumerate()
                .filter(|(i, _)| !simplex.contains(i))
                .all(|(_, p)| (&p - &center).mapv(|v| v * v).sum() >= radius2 - tol);
            empty.then_some(simplex)
        })
        .collect()
}

/// Piecewise linear interpolation over a Delaunay triangulation of the coordinates.
///
/// A point outside the convex hull of the coordinates cannot be interpolated.
#[derive(Clone, Copy, Debug, Default)]
pub struct LinearInterpolation;

struct LinearInterpolant {
    coordinates: Array2<f64>,
    samples: Vec<Array2<f64>>,
    simplices: Vec<Vec<usize>>,
}

impl TangentInterpolation for LinearInterpolation {
    fn build(
        &self,
        coordinates: &Array2<f64>,
        samples: &[Array2<f64>],
    ) -> Result<Box<dyn Interpolant>> {
        check_samples(coordinates, samples)?;
        let (n, d) = coordinates.dim();
        if d == 0 || n < d + 1 {
            return Err(GrassmannError::InterpolationError(format!(
                "Linear interpolation in dimension {} requires at least {} points, got {}",
                d,
                d + 1,
                n
            )));
        }

        let simplices = if d == 1 {
            segments(coordinates)
        } else {
            delaunay(coordinates)
        };
        if simplices.is_empty() {
            return Err(GrassmannError::InterpolationError(
                "Coordinates are degenerate, no simplex found".to_string(),
            ));
        }
        debug!("Delaunay triangulation with {} simplices", simplices.len());

        Ok(Box::new(LinearInterpolant {
            coordinates: coordinates.to_owned(),
            samples: samples.to_vec(),
            simplices,
        }))
    }
}

impl Interpolant for LinearInterpolant {
    fn interpolate(&self, point: &ArrayView1<f64>) -> Result<Array2<f64>> {
        check_point(point, self.coordinates.ncols())?;
        for simplex in self.simplices.iter() {
            let vertices = self.coordinates.select(Axis(0), simplex);
            let lambda = barycentric(&vertices, point)?;
            if lambda.iter().all(|&l| l >= -SIMPLEX_TOL) {
                let res = simplex
                    .iter()
                    .zip(lambda.iter())
                    .fold(Array2::zeros(self.samples[0].dim()), |acc, (&i, &l)| {
                        acc + &self.samples[i] * l
                    });
                return Ok(res);
            }
        }
        Err(GrassmannError::InterpolationError(format!(
            "Point {} is outside the convex hull of the coordinates",
            point
        )))
    }
}

/// A user defined interpolation function
pub type InterpolationFn =
    dyn Fn(&Array2<f64>, &[Array2<f64>], &ArrayView1<f64>) -> Result<Array2<f64>> + Sync + Send;

/// Interpolation delegated to a user function called with
/// `(coordinates, samples, point)`
#[derive(Clone)]
pub struct CallableInterpolation {
    function: Arc<InterpolationFn>,
}

impl CallableInterpolation {
    /// Constructor from the interpolation function
    pub fn new(
        function: impl Fn(&Array2<f64>, &[Array2<f64>], &ArrayView1<f64>) -> Result<Array2<f64>>
            + Sync
            + Send
            + 'static,
    ) -> Self {
        CallableInterpolation {
            function: Arc::new(function),
        }
    }
}

struct CallableInterpolant {
    function: Arc<InterpolationFn>,
    coordinates: Array2<f64>,
    samples: Vec<Array2<f64>>,
}

impl TangentInterpolation for CallableInterpolation {
    fn build(
        &self,
        coordinates: &Array2<f64>,
        samples: &[Array2<f64>],
    ) -> Result<Box<dyn Interpolant>> {
        check_samples(coordinates, samples)?;
        Ok(Box::new(CallableInterpolant {
            function: self.function.clone(),
            coordinates: coordinates.to_owned(),
            samples: samples.to_vec(),
        }))
    }
}

impl Interpolant for CallableInterpolant {
    fn interpolate(&self, point: &ArrayView1<f64>) -> Result<Array2<f64>> {
        (self.function)(&self.coordinates, &self.samples, point)
    }
}

/// Element wise interpolation: one scalar surrogate is trained per matrix entry
#[derive(Clone, Debug)]
pub struct SurrogateInterpolation<B: SurrogateBuilder> {
    builder: B,
}

impl<B: SurrogateBuilder> SurrogateInterpolation<B> {
    /// Constructor given the surrogate builder used for every entry
    pub fn new(builder: B) -> Self {
        SurrogateInterpolation { builder }
    }
}

struct SurrogateInterpolant {
    shape: (usize, usize),
    dim: usize,
    surrogates: Vec<Box<dyn Surrogate>>,
}

impl<B: SurrogateBuilder> TangentInterpolation for SurrogateInterpolation<B> {
    fn build(
        &self,
        coordinates: &Array2<f64>,
        samples: &[Array2<f64>],
    ) -> Result<Box<dyn Interpolant>> {
        let shape = check_samples(coordinates, samples)?;
        let surrogates = (0..shape.0 * shape.1)
            .into_par_iter()
            .map(|k| {
                let (i, j) = (k / shape.1, k % shape.1);
                let values: Array1<f64> = samples.iter().map(|s| s[[i, j]]).collect();
                self.builder.train(coordinates, &values)
            })
            .collect::<Result<Vec<_>>>()?;
        debug!("{} entry surrogates trained", surrogates.len());
        Ok(Box::new(SurrogateInterpolant {
            shape,
            dim: coordinates.ncols(),
            surrogates,
        }))
    }
}

impl Interpolant for SurrogateInterpolant {
    fn interpolate(&self, point: &ArrayView1<f64>) -> Result<Array2<f64>> {
        check_point(point, self.dim)?;
        let x = point.view().insert_axis(Axis(0));
        let values = self
            .surrogates
            .iter()
            .map(|s| s.predict(&x).map(|y| y[0]))
            .collect::<Result<Vec<_>>>()?;
        Array2::from_shape_vec(self.shape, values).map_err(|e| {
            GrassmannError::InvalidValueError(format!("Bad interpolated shape: {}", e))
        })
    }
}

/// Interpolation of Grassmann points given at coordinates.
///
/// Points are projected on the tangent space at their Karcher mean at
/// construction, interpolation is then done in that tangent space.
pub struct ManifoldInterpolation {
    mean: GrassmannPoint,
    tangents: Vec<Array2<f64>>,
    interpolant: Box<dyn Interpolant>,
}

impl ManifoldInterpolation {
    /// Build the interpolation of `manifold_data` points located at (n, d) `coordinates`
    pub fn new(
        method: &dyn TangentInterpolation,
        manifold_data: &[GrassmannPoint],
        coordinates: &Array2<f64>,
        distance: &dyn GrassmannDistance,
        optimizer: &dyn KarcherOptimizer,
    ) -> Result<Self> {
        if coordinates.nrows() != manifold_data.len() {
            return Err(GrassmannError::DimensionError(format!(
                "Expected one coordinate row per point, got {} rows for {} points",
                coordinates.nrows(),
                manifold_data.len()
            )));
        }
        let mean = karcher_mean(manifold_data, optimizer, distance)?;
        let tangents = log_map(manifold_data, &mean)?;
        let interpolant = method.build(coordinates, &tangents)?;
        Ok(ManifoldInterpolation {
            mean,
            tangents,
            interpolant,
        })
    }

    /// Karcher mean used as reference point of the tangent space
    pub fn mean(&self) -> &GrassmannPoint {
        &self.mean
    }

    /// Tangent vectors of the data points at the Karcher mean
    pub fn tangents(&self) -> &[Array2<f64>] {
        &self.tangents
    }

    /// Interpolated Grassmann point at given (d,) `point`
    pub fn interpolate(&self, point: &ArrayView1<f64>) -> Result<GrassmannPoint> {
        let tangent = self.interpolant.interpolate(point)?;
        exp_map_single(&tangent, &self.mean)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distances::GeodesicDistance;
    use crate::karcher::GradientDescent;
    use approx::assert_abs_diff_eq;
    use ndarray::array;
    use uqbox_gp::{HyperTuning, Kriging};

    fn scalars(values: &[f64]) -> Vec<Array2<f64>> {
        values.iter().map(|&v| array![[v]]).collect()
    }

    fn line(angle: f64) -> GrassmannPoint {
        GrassmannPoint::new(array![[angle.cos()], [angle.sin()]]).unwrap()
    }

    #[test]
    fn test_combinations() {
        assert_eq!(
            combinations(4, 3),
            vec![vec![0, 1, 2], vec![0, 1, 3], vec![0, 2, 3], vec![1, 2, 3]]
        );
        assert_eq!(combinations(3, 3), vec![vec![0, 1, 2]]);
        assert!(combinations(2, 3).is_empty());
    }

    #[test]
    fn test_linear_1d() {
        let coords = array![[2.], [0.], [1.]];
        let samples = scalars(&[4., 0., 1.]);
        let interp = LinearInterpolation.build(&coords, &samples).unwrap();
        assert_abs_diff_eq!(interp.interpolate(&array![0.5].view()).unwrap()[[0, 0]], 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(interp.interpolate(&array![1.5].view()).unwrap()[[0, 0]], 2.5, epsilon = 1e-12);
        assert_abs_diff_eq!(interp.interpolate(&array![2.].view()).unwrap()[[0, 0]], 4., epsilon = 1e-12);
        assert!(matches!(
            interp.interpolate(&array![3.].view()),
            Err(GrassmannError::InterpolationError(_))
        ));
    }

    #[test]
    fn test_segments_many_points() {
        let n = 500;
        let coords = Array1::linspace(0., 1., n)
            .slice(ndarray::s![..;-1])
            .to_owned()
            .insert_axis(Axis(1));
        assert_eq!(segments(&coords).len(), n - 1);
        let samples: Vec<_> = coords.iter().map(|&t| array![[3. * t]]).collect();
        let interp = LinearInterpolation.build(&coords, &samples).unwrap();
        assert_abs_diff_eq!(interp.interpolate(&array![0.4321].view()).unwrap()[[0, 0]], 1.2963, epsilon = 1e-10);

        let duplicated = array![[0.], [1.], [1.]];
        assert_eq!(segments(&duplicated).len(), 1);
    }

    #[test]
    fn test_linear_2d_affine_exact() {
        let coords = array![[0., 0.], [1., 0.], [0., 1.], [1., 1.], [0.5, 0.4]];
        let f = |x: f64, y: f64| array![[1. + 2. * x + 3. * y, x], [y, -x * 0.5]];
        let samples: Vec<_> = coords.rows().into_iter().map(|c| f(c[0], c[1])).collect();
        let point = array![0.3, 0.6];
        let res = interpolate_samples(&LinearInterpolation, &coords, &samples, &point.view()).unwrap();
        assert_abs_diff_eq!(res, f(0.3, 0.6), epsilon = 1e-10);
        assert!(interpolate_samples(&LinearInterpolation, &coords, &samples, &array![1.5, 0.5].view()).is_err());
    }

    #[test]
    fn test_bad_samples() {
        let coords = array![[0.], [1.]];
        let samples = vec![array![[0.]], array![[1., 2.]]];
        assert!(matches!(
            LinearInterpolation.build(&coords, &samples),
            Err(GrassmannError::DimensionError(_))
        ));
        assert!(matches!(
            LinearInterpolation.build(&coords, &scalars(&[0.])),
            Err(GrassmannError::DimensionError(_))
        ));
    }

    #[test]
    fn test_callable() {
        // nearest neighbour
        let method = CallableInterpolation::new(|coords, samples, point| {
            let (best, _) = coords
                .rows()
                .into_iter()
                .map(|c| (&c - point).mapv(f64::abs).sum())
                .enumerate()
                .fold((0, f64::INFINITY), |acc, (i, d)| if d < acc.1 { (i, d) } else { acc });
            Ok(samples[best].clone())
        });
        let coords = array![[0.], [1.], [2.]];
        let res = interpolate_samples(&method, &coords, &scalars(&[5., 6., 7.]), &array![1.2].view()).unwrap();
        assert_eq!(res, array![[6.]]);
    }

    #[test]
    fn test_gp_surrogate() {
        let method = SurrogateInterpolation::new(
            Kriging::params().hyper_tuning(HyperTuning::Fixed(array![1., 1., 1e-6])),
        );
        let coords = array![[0.], [1.], [2.], [3.]];
        let samples: Vec<_> = (0..4).map(|i| array![[i as f64, 1.], [0., -(i as f64)]]).collect();
        let res = interpolate_samples(&method, &coords, &samples, &array![2.].view()).unwrap();
        assert_abs_diff_eq!(res, samples[2], epsilon = 1e-3);
    }

    #[test]
    fn test_manifold_interpolation() {
        let points = vec![line(0.), line(0.1), line(0.2)];
        let coords = array![[0.], [1.], [2.]];
        let interp = ManifoldInterpolation::new(
            &LinearInterpolation,
            &points,
            &coords,
            &GeodesicDistance,
            &GradientDescent::default(),
        )
        .unwrap();
        assert_abs_diff_eq!(interp.mean().projector(), line(0.1).projector(), epsilon = 1e-8);
        assert_eq!(interp.tangents().len(), 3);

        let at_node = interp.interpolate(&array![2.].view()).unwrap();
        assert_abs_diff_eq!(at_node.projector(), line(0.2).projector(), epsilon = 1e-8);
        let between = interp.interpolate(&array![0.5].view()).unwrap();
        assert_abs_diff_eq!(between.projector(), line(0.05).projector(), epsilon = 1e-8);
        assert!(matches!(
            interp.interpolate(&array![-1.].view()),
            Err(GrassmannError::InterpolationError(_))
        ));
    }

    #[test]
    fn test_manifold_interpolation_bad_coordinates() {
        let points = vec![line(0.), line(0.1), line(0.2)];
        let res = ManifoldInterpolation::new(
            &LinearInterpolation,
            &points,
            &array![[0.], [1.]],
            &GeodesicDistance,
            &GradientDescent::default(),
        );
        assert!(matches!(res, Err(GrassmannError::DimensionError(_))));
    }
}
