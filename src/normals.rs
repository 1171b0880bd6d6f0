//! Outward-consistent surface normals for unordered point clouds.
//!
//! Each point receives the eigenvector belonging to the smallest eigenvalue of
//! the covariance of its `k` nearest neighbours (local PCA). PCA leaves the
//! sign undetermined; it is fixed with the cloud centroid as reference so that
//! every normal points away from it: `dot(n, p - centroid) >= 0`.
//!
//! Neighbourhoods that do not span a plane (collinear or coincident
//! neighbours) fall back to the radial direction from the centroid.

use crate::error::{Result, SurfaceError};
use crate::types::PointCloud;
use log::debug;
use nalgebra::{Matrix3, Point3, SymmetricEigen, Unit, Vector3};
use rstar::primitives::GeomWithData;
use rstar::RTree;
use serde::Deserialize;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

const EPS: f64 = 1e-12;

type IndexedPoint = GeomWithData<[f64; 3], usize>;

/// Parameters of the local PCA normal estimation.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct NormalParams {
    /// Neighbourhood size (including the query point itself).
    pub neighbors: usize,
}

impl Default for NormalParams {
    fn default() -> Self {
        Self { neighbors: 20 }
    }
}

/// Unit normals index-aligned with the point cloud they were estimated on.
#[derive(Clone, Debug)]
pub struct NormalField {
    normals: Vec<Unit<Vector3<f64>>>,
}

impl NormalField {
    pub fn new(normals: Vec<Unit<Vector3<f64>>>) -> Self {
        Self { normals }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.normals.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.normals.is_empty()
    }

    #[inline]
    pub fn get(&self, idx: usize) -> &Unit<Vector3<f64>> {
        &self.normals[idx]
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Unit<Vector3<f64>>> {
        self.normals.iter()
    }
}

/// Estimate one outward unit normal per point.
///
/// Fails with [`SurfaceError::DegenerateGeometry`] for fewer than three points
/// or when the whole cloud is collinear.
pub fn estimate_normals(points: &PointCloud, params: &NormalParams) -> Result<NormalField> {
    let n = points.len();
    if n < 3 {
        return Err(SurfaceError::DegenerateGeometry(format!(
            "normal estimation needs at least 3 points, got {n}"
        )));
    }
    let centroid = points.centroid();
    let global = SymmetricEigen::new(points.covariance(&centroid));
    let mut spread: Vec<f64> = global.eigenvalues.iter().copied().collect();
    spread.sort_by(|a, b| b.total_cmp(a));
    if spread[0] <= 0.0 || spread[1] <= EPS * spread[0] {
        return Err(SurfaceError::DegenerateGeometry(
            "points are collinear or coincident".to_string(),
        ));
    }

    let k = params.neighbors.clamp(3, n);
    let tree = RTree::bulk_load(
        points
            .iter()
            .enumerate()
            .map(|(i, p)| IndexedPoint::new([p.x, p.y, p.z], i))
            .collect(),
    );

    let estimate = |p: &Point3<f64>| -> Unit<Vector3<f64>> {
        let neighbors: Vec<Point3<f64>> = tree
            .nearest_neighbor_iter(&[p.x, p.y, p.z])
            .take(k)
            .map(|item| points.points()[item.data])
            .collect();
        let radial = p - centroid;
        let normal = local_pca_normal(&neighbors).unwrap_or(radial);
        orient_outward(normal, &radial)
    };

    #[cfg(feature = "parallel")]
    let normals: Vec<_> = points.points().par_iter().map(estimate).collect();
    #[cfg(not(feature = "parallel"))]
    let normals: Vec<_> = points.points().iter().map(estimate).collect();

    debug!("estimate_normals: {} normals from {}-point neighbourhoods", n, k);
    Ok(NormalField::new(normals))
}

/// Smallest-variance direction of a neighbourhood, `None` when the
/// neighbourhood does not span a plane.
fn local_pca_normal(neighbors: &[Point3<f64>]) -> Option<Vector3<f64>> {
    if neighbors.len() < 3 {
        return None;
    }
    let mut centroid = Vector3::zeros();
    for p in neighbors {
        centroid += p.coords;
    }
    centroid /= neighbors.len() as f64;

    let mut cov = Matrix3::zeros();
    for p in neighbors {
        let d = p.coords - centroid;
        cov += d * d.transpose();
    }
    cov /= neighbors.len() as f64;

    let eigen = SymmetricEigen::new(cov);
    let mut order = [0usize, 1, 2];
    order.sort_by(|&a, &b| eigen.eigenvalues[a].total_cmp(&eigen.eigenvalues[b]));
    let largest = eigen.eigenvalues[order[2]];
    let middle = eigen.eigenvalues[order[1]];
    if largest <= 0.0 || middle <= EPS * largest {
        return None;
    }
    Some(eigen.eigenvectors.column(order[0]).into_owned())
}

fn orient_outward(normal: Vector3<f64>, radial: &Vector3<f64>) -> Unit<Vector3<f64>> {
    let oriented = if normal.dot(radial) < 0.0 { -normal } else { normal };
    Unit::try_new(oriented, EPS).unwrap_or_else(|| Unit::new_unchecked(Vector3::z()))
}
