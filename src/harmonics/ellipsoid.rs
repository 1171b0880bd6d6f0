//! Elliptical `(u, v)` parameterization used by the per-axis harmonic fit.
use crate::error::{Result, SurfaceError};
use crate::types::{PointCloud, SphericalAngles};
use nalgebra::{Matrix3, Point3, SymmetricEigen, Vector3};

/// Assigns every point of a closed surface a pair of ellipsoid angles
/// `(u, v) = (θ, φ)`. Index-aligned with the input cloud.
pub trait EllipticalParameterization {
    fn parameterize(&self, points: &PointCloud) -> Result<Vec<SphericalAngles>>;
}

/// Centre, principal axes (columns) and semi-axis lengths of an ellipsoid.
#[derive(Clone, Debug, PartialEq)]
pub struct EllipsoidFrame {
    pub center: Point3<f64>,
    pub axes: Matrix3<f64>,
    pub semi_axes: Vector3<f64>,
}

impl EllipsoidFrame {
    /// Angles of `p` after mapping the ellipsoid onto the unit sphere.
    pub fn angles_of(&self, p: &Point3<f64>) -> SphericalAngles {
        let local = self.axes.transpose() * (p - self.center);
        SphericalAngles::of(&local.component_div(&self.semi_axes))
    }
}

/// Second-moment ellipsoid: principal axes of the coordinate covariance,
/// semi-axes `√(3λ)` (exact for points spread evenly over an ellipsoid
/// surface).
#[derive(Clone, Copy, Debug, Default)]
pub struct MomentEllipsoid;

impl MomentEllipsoid {
    pub fn frame(&self, points: &PointCloud) -> Result<EllipsoidFrame> {
        let center = points.centroid();
        let eigen = SymmetricEigen::new(points.covariance(&center));
        let mut order = [0usize, 1, 2];
        order.sort_by(|&a, &b| eigen.eigenvalues[b].total_cmp(&eigen.eigenvalues[a]));
        let largest = eigen.eigenvalues[order[0]];
        if eigen.eigenvalues[order[2]] <= 1e-12 * largest.max(f64::MIN_POSITIVE) {
            return Err(SurfaceError::DegenerateGeometry(
                "points do not span three dimensions".to_string(),
            ));
        }
        let mut axes = Matrix3::zeros();
        let mut semi_axes = Vector3::zeros();
        for (col, &k) in order.iter().enumerate() {
            axes.set_column(col, &eigen.eigenvectors.column(k));
            semi_axes[col] = (3.0 * eigen.eigenvalues[k]).sqrt();
        }
        // Keep a right-handed frame.
        if axes.determinant() < 0.0 {
            let flipped = -axes.column(2);
            axes.set_column(2, &flipped);
        }
        Ok(EllipsoidFrame {
            center,
            axes,
            semi_axes,
        })
    }
}

impl EllipticalParameterization for MomentEllipsoid {
    fn parameterize(&self, points: &PointCloud) -> Result<Vec<SphericalAngles>> {
        let frame = self.frame(points)?;
        Ok(points.iter().map(|p| frame.angles_of(p)).collect())
    }
}
