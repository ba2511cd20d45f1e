//! Projection of matrices onto Grassmann manifolds using thin SVD.
//!
//! A (m, n) matrix `A ~ U S V^T` truncated at rank p gives a point `U` of Gr(p, m),
//! a point `V` of Gr(p, n) and singular values `S`. New matrices are reconstructed
//! by interpolating each factor, `U` and `V` on their manifold.
//!
//! Reconstruction requires p lower than min(m, n): Gr(min(m, n), min(m, n)) has a single
//! point and the orientation of the corresponding singular vectors cannot be interpolated.
use crate::distances::GrassmannDistance;
use crate::errors::{GrassmannError, Result};
use crate::interpolation::{Interpolant, TangentInterpolation};
use crate::karcher::{karcher_mean, KarcherOptimizer};
use crate::kernels::{GrassmannKernel, KernelComposition};
use crate::linalg::{matrix_rank, svd_thin};
use crate::manifold::{exp_map_single, log_map};
use crate::point::GrassmannPoint;
use log::{debug, info, warn};
use ndarray::{s, Array2, ArrayView1};
use rayon::prelude::*;

/// Dimension p of the subspaces used to project matrices
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rank {
    /// Minimum numerical rank of the input matrices
    Minimum,
    /// Maximum numerical rank of the input matrices
    Maximum,
    /// Given dimension, at most the smallest dimension of the input matrices
    Explicit(usize),
}

/// Input matrices projected on Grassmann manifolds
#[derive(Clone, Debug)]
pub struct SvdProjection {
    psi: Vec<GrassmannPoint>,
    sigma: Vec<Array2<f64>>,
    phi: Vec<GrassmannPoint>,
    rank: usize,
}

impl SvdProjection {
    /// Project `input_points` (m, n) matrices with subspaces of dimension given by `rank`
    pub fn new(input_points: &[Array2<f64>], rank: Rank) -> Result<Self> {
        let first = input_points.first().ok_or_else(|| {
            GrassmannError::InvalidValueError("SVD projection requires at least one matrix".to_string())
        })?;
        let (m, n) = first.dim();
        if let Some(a) = input_points.iter().find(|a| a.dim() != (m, n)) {
            return Err(GrassmannError::DimensionError(format!(
                "Input matrices should have the same shape, got {:?} and {:?}",
                (m, n),
                a.dim()
            )));
        }

        let p = match rank {
            Rank::Explicit(p) => {
                if p == 0 || p > m.min(n) {
                    return Err(GrassmannError::DimensionError(format!(
                        "Rank {} is not consistent with matrices of shape {:?}",
                        p,
                        (m, n)
                    )));
                }
                p
            }
            Rank::Minimum | Rank::Maximum => {
                let ranks = input_points
                    .iter()
                    .map(|a| matrix_rank(a))
                    .collect::<Result<Vec<_>>>()?;
                debug!("Input matrices ranks {:?}", ranks);
                let p = if rank == Rank::Minimum {
                    ranks.iter().min()
                } else {
                    ranks.iter().max()
                };
                match p {
                    Some(&p) if p > 0 => p,
                    _ => {
                        return Err(GrassmannError::InvalidValueError(
                            "Input matrices should have a positive rank".to_string(),
                        ))
                    }
                }
            }
        };
        info!(
            "Project {} matrices of shape {:?} on Gr({}, {}) x Gr({}, {})",
            input_points.len(),
            (m, n),
            p,
            m,
            p,
            n
        );
        if p == m.min(n) {
            warn!(
                "Rank {} equals the smallest matrix dimension, matrices cannot be reconstructed",
                p
            );
        }

        let factors = input_points
            .par_iter()
            .map(|a| {
                let (u, s, vt) = svd_thin(a)?;
                let psi = GrassmannPoint::new(u.slice(s![.., ..p]).to_owned())?;
                let sigma = Array2::from_diag(&s.slice(s![..p]));
                let phi = GrassmannPoint::new(vt.slice(s![..p, ..]).t().to_owned())?;
                Ok((psi, sigma, phi))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut psi = Vec::with_capacity(factors.len());
        let mut sigma = Vec::with_capacity(factors.len());
        let mut phi = Vec::with_capacity(factors.len());
        for (u, s, v) in factors {
            psi.push(u);
            sigma.push(s);
            phi.push(v);
        }
        Ok(SvdProjection {
            psi,
            sigma,
            phi,
            rank: p,
        })
    }

    /// Left singular vectors as points of Gr(p, m)
    pub fn psi(&self) -> &[GrassmannPoint] {
        &self.psi
    }

    /// Singular values as (p, p) diagonal matrices
    pub fn sigma(&self) -> &[Array2<f64>] {
        &self.sigma
    }

    /// Right singular vectors as points of Gr(p, n)
    pub fn phi(&self) -> &[GrassmannPoint] {
        &self.phi
    }

    /// Dimension p of the subspaces
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Reconstruct the matrix at `point` given `coordinates` of the projected matrices.
    ///
    /// See [`SvdProjection::reconstructor`] to reconstruct several matrices.
    pub fn reconstruct(
        &self,
        interpolation: &dyn TangentInterpolation,
        coordinates: &Array2<f64>,
        point: &ArrayView1<f64>,
        optimizer: &dyn KarcherOptimizer,
        distance: &dyn GrassmannDistance,
    ) -> Result<Array2<f64>> {
        self.reconstructor(interpolation, coordinates, optimizer, distance)?
            .reconstruct(point)
    }

    /// Build the reconstruction of matrices given `coordinates` of the projected matrices.
    ///
    /// Left and right singular vectors are interpolated on the tangent space at their
    /// Karcher mean, singular values are interpolated directly.
    pub fn reconstructor(
        &self,
        interpolation: &dyn TangentInterpolation,
        coordinates: &Array2<f64>,
        optimizer: &dyn KarcherOptimizer,
        distance: &dyn GrassmannDistance,
    ) -> Result<SvdReconstruction> {
        let m = self.psi[0].data().nrows();
        let n = self.phi[0].data().nrows();
        if self.rank == m.min(n) {
            return Err(GrassmannError::InvalidValueError(format!(
                "Reconstruction of ({}, {}) matrices requires a rank lower than {}, got {}",
                m,
                n,
                m.min(n),
                self.rank
            )));
        }
        let ref_psi = karcher_mean(&self.psi, optimizer, distance)?;
        let ref_phi = karcher_mean(&self.phi, optimizer, distance)?;

        let gamma_psi = log_map(&self.psi, &ref_psi)?;
        let gamma_phi = log_map(&self.phi, &ref_phi)?;

        Ok(SvdReconstruction {
            psi: interpolation.build(coordinates, &gamma_psi)?,
            sigma: interpolation.build(coordinates, &self.sigma)?,
            phi: interpolation.build(coordinates, &gamma_phi)?,
            ref_psi,
            ref_phi,
        })
    }

    /// Kernel matrix between projected points, composed from left and right singular vectors kernels
    pub fn kernel_matrix(
        &self,
        kernel: &dyn GrassmannKernel,
        composition: KernelComposition,
    ) -> Result<Array2<f64>> {
        let left = kernel.kernel_matrix(&self.psi)?;
        let right = kernel.kernel_matrix(&self.phi)?;
        Ok(composition.compose(left, right))
    }
}

/// Interpolants of the projected matrices factors around their Karcher means
pub struct SvdReconstruction {
    ref_psi: GrassmannPoint,
    ref_phi: GrassmannPoint,
    psi: Box<dyn Interpolant>,
    sigma: Box<dyn Interpolant>,
    phi: Box<dyn Interpolant>,
}

impl SvdReconstruction {
    /// Karcher means of left and right singular vectors
    pub fn means(&self) -> (&GrassmannPoint, &GrassmannPoint) {
        (&self.ref_psi, &self.ref_phi)
    }

    /// Reconstructed (m, n) matrix at `point`
    pub fn reconstruct(&self, point: &ArrayView1<f64>) -> Result<Array2<f64>> {
        let psi_tilde = exp_map_single(&self.psi.interpolate(point)?, &self.ref_psi)?;
        let phi_tilde = exp_map_single(&self.phi.interpolate(point)?, &self.ref_phi)?;
        let sigma = self.sigma.interpolate(point)?;
        Ok(psi_tilde.data().dot(&sigma).dot(&phi_tilde.data().t()))
    }
}
