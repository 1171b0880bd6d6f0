//! Mean curvature of a closed surface sampled at quadrature nodes.
//!
//! The node coordinates are re-expanded in spherical harmonics on two charts
//! whose poles are orthogonal, the first and second fundamental forms are
//! evaluated from analytic derivatives, and the charts are blended with the
//! scheme's per-node weights so neither chart is used near its poles.
pub mod manifold;

pub use self::manifold::{Chart, ChartGeometry};

use crate::error::{Result, SurfaceError};
use crate::quadrature::QuadratureScheme;
use crate::types::PointCloud;
use log::{debug, warn};
use nalgebra::Vector3;
#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Charts with a blending weight below this are not evaluated.
const CHART_WEIGHT_EPS: f64 = 1e-12;

/// Per-node curvature output, oriented so a convex surface is positive.
#[derive(Clone, Debug)]
pub struct CurvatureField {
    mean_curvature: Vec<f64>,
    normals: Vec<Vector3<f64>>,
    area_elements: Vec<f64>,
    weights: Vec<f64>,
    orientation: f64,
}

impl CurvatureField {
    pub fn len(&self) -> usize {
        self.mean_curvature.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mean_curvature.is_empty()
    }

    pub fn mean_curvature(&self) -> &[f64] {
        &self.mean_curvature
    }

    pub fn normals(&self) -> &[Vector3<f64>] {
        &self.normals
    }

    /// Area per unit solid angle at each node.
    pub fn area_elements(&self) -> &[f64] {
        &self.area_elements
    }

    /// `+1` if the raw chart normals already pointed inward, `-1` if they were
    /// flipped.
    pub fn orientation(&self) -> f64 {
        self.orientation
    }

    /// Area-weighted mean of the curvature, `H₀`.
    pub fn averaged_mean_curvature(&self) -> f64 {
        let mut num = 0.0;
        let mut den = 0.0;
        for ((h, a), w) in self
            .mean_curvature
            .iter()
            .zip(&self.area_elements)
            .zip(&self.weights)
        {
            num += w * h * a;
            den += w * a;
        }
        num / den
    }

    pub fn surface_area(&self) -> f64 {
        self.area_elements
            .iter()
            .zip(&self.weights)
            .map(|(a, w)| a * w)
            .sum()
    }

    pub fn min_mean_curvature(&self) -> f64 {
        self.mean_curvature.iter().copied().fold(f64::INFINITY, f64::min)
    }

    pub fn max_mean_curvature(&self) -> f64 {
        self.mean_curvature
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max)
    }
}

struct NodeGeometry {
    mean_curvature: f64,
    normal: Vector3<f64>,
    area: f64,
}

/// Mean curvature at every node of `scheme`, where `points[i]` is the
/// surface point at node `i`. `degree` is the harmonic degree of the
/// re-expansion.
pub fn curvature(
    points: &PointCloud,
    scheme: &QuadratureScheme,
    degree: usize,
) -> Result<CurvatureField> {
    if points.len() != scheme.len() {
        return Err(SurfaceError::ShapeMismatch {
            expected: scheme.len(),
            actual: points.len(),
        });
    }
    if degree == 0 {
        return Err(SurfaceError::InvalidParameter(
            "curvature needs a harmonic degree of at least 1".to_string(),
        ));
    }
    if 2 * degree > scheme.exact_degree() {
        warn!(
            "curvature: degree {} is not integrated exactly by a {}-point rule (exact to {})",
            degree,
            scheme.len(),
            scheme.exact_degree()
        );
    }

    let chart_a = Chart::Standard.project(points, scheme, degree)?;
    let chart_b = Chart::Rotated.project(points, scheme, degree)?;

    let eval = |idx: usize| -> NodeGeometry {
        let node = &scheme.nodes()[idx];
        let w = scheme.chart_weight(idx);
        let mut h = 0.0;
        let mut normal = Vector3::zeros();
        let mut area = 0.0;
        for (chart, coefficients, weight) in [
            (Chart::Standard, &chart_a, w),
            (Chart::Rotated, &chart_b, 1.0 - w),
        ] {
            if weight < CHART_WEIGHT_EPS {
                continue;
            }
            let (theta, phi) = chart.angles(node);
            let geo = ChartGeometry::at(coefficients, theta, phi);
            h += weight * geo.mean_curvature;
            normal += weight * geo.normal;
            area += weight * geo.area_factor;
        }
        NodeGeometry {
            mean_curvature: h,
            normal: normal.normalize(),
            area,
        }
    };

    #[cfg(feature = "parallel")]
    let geometry: Vec<NodeGeometry> = (0..scheme.len()).into_par_iter().map(eval).collect();
    #[cfg(not(feature = "parallel"))]
    let geometry: Vec<NodeGeometry> = (0..scheme.len()).map(eval).collect();

    let centroid = points.centroid();
    let outward = points
        .iter()
        .zip(&geometry)
        .filter(|(p, g)| (*p - centroid).dot(&g.normal) > 0.0)
        .count();
    let orientation = if 2 * outward > geometry.len() { -1.0 } else { 1.0 };

    let mut mean_curvature = Vec::with_capacity(geometry.len());
    let mut normals = Vec::with_capacity(geometry.len());
    let mut area_elements = Vec::with_capacity(geometry.len());
    for g in geometry {
        mean_curvature.push(orientation * g.mean_curvature);
        normals.push(orientation * g.normal);
        area_elements.push(g.area);
    }
    let field = CurvatureField {
        mean_curvature,
        normals,
        area_elements,
        weights: scheme.nodes().iter().map(|n| n.weight).collect(),
        orientation,
    };
    debug!(
        "curvature: {} nodes, degree {}, orientation {:+}, H0 {:.6}",
        field.len(),
        degree,
        field.orientation,
        field.averaged_mean_curvature()
    );
    Ok(field)
}
