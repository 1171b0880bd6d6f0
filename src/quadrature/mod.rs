//! Quadrature schemes on the unit sphere and sampling of fitted surfaces.
//!
//! [`quadrature`] picks a rule size (snapped to the Lebedev node counts
//! 6..=5810 or the minimal exact rule for the expansion), evaluates the expansion at
//! every node and returns the surface points together with the scheme that
//! later drives the curvature projection.
pub mod gauss;
pub mod tables;

pub use self::gauss::{gauss_legendre, GaussProductRule, QuadratureNode};
pub use self::tables::{
    max_exact_degree, minimal_points, snap_to_rule, valid_sizes, MAX_QUADRATURE_POINTS,
};

use crate::error::{Result, SurfaceError};
use crate::harmonics::SurfaceExpansion;
use crate::types::{PointCloud, SphericalAngles};
use log::{debug, warn};
use serde::Deserialize;

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct QuadratureParams {
    pub points: usize,
    /// Use the smallest rule that is exact for the expansion degree.
    pub minimal: bool,
}

impl Default for QuadratureParams {
    fn default() -> Self {
        Self {
            points: 590,
            minimal: false,
        }
    }
}

/// Fixed node set with per-node chart blending weights.
#[derive(Clone, Debug)]
pub struct QuadratureScheme {
    exact_degree: usize,
    nodes: Vec<QuadratureNode>,
    chart_weights: Vec<f64>,
    advisory: Option<String>,
}

impl QuadratureScheme {
    pub fn from_rule(rule: GaussProductRule) -> Self {
        let exact_degree = rule.exact_degree();
        let nodes = rule.into_nodes();
        let chart_weights = nodes.iter().map(chart_a_weight).collect();
        Self {
            exact_degree,
            nodes,
            chart_weights,
            advisory: None,
        }
    }

    /// Scheme with exactly `points` nodes.
    pub fn with_size(points: usize) -> Self {
        Self::from_rule(GaussProductRule::with_size(points))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[QuadratureNode] {
        &self.nodes
    }

    /// Highest polynomial degree integrated exactly.
    pub fn exact_degree(&self) -> usize {
        self.exact_degree
    }

    /// Weight of the standard chart at node `idx`; the rotated chart gets
    /// `1 − w`.
    #[inline]
    pub fn chart_weight(&self, idx: usize) -> f64 {
        self.chart_weights[idx]
    }

    pub fn advisory(&self) -> Option<&str> {
        self.advisory.as_deref()
    }
}

/// `sin⁴θ_A / (sin⁴θ_A + sin⁴θ_B)`, where chart B has its poles on ±axis0.
fn chart_a_weight(node: &QuadratureNode) -> f64 {
    let d = node.direction();
    let sa2 = 1.0 - d.z * d.z;
    let sb2 = 1.0 - d.x * d.x;
    let (a, b) = (sa2 * sa2, sb2 * sb2);
    if a + b <= 0.0 {
        0.5
    } else {
        a / (a + b)
    }
}

/// Sample `expansion` at the nodes of a quadrature rule.
///
/// `requested` is clamped to [`MAX_QUADRATURE_POINTS`] and snapped to the
/// nearest valid size; with `minimal` the smallest rule exact for degree
/// `L + 1` is used instead. Rules larger than that minimal one are accepted
/// with a warning.
pub fn quadrature(
    expansion: &SurfaceExpansion,
    requested: usize,
    minimal: bool,
) -> Result<(PointCloud, QuadratureScheme)> {
    if requested == 0 && !minimal {
        return Err(SurfaceError::InvalidParameter(
            "requested quadrature point count must be positive".to_string(),
        ));
    }
    let target_degree = expansion.degree() + 1;
    let minimal_count = minimal_points(target_degree);
    if max_exact_degree(minimal_count) < 2 * target_degree {
        warn!(
            "quadrature: degree {} exceeds the largest rule ({} points); integration is inexact",
            target_degree, minimal_count
        );
    }
    let size = if minimal {
        minimal_count
    } else {
        snap_to_rule(requested.min(MAX_QUADRATURE_POINTS))
    };

    let mut scheme = QuadratureScheme::with_size(size);
    if scheme.len() > minimal_count {
        let message = format!(
            "{} quadrature points requested where {} suffice for degree {}",
            scheme.len(),
            minimal_count,
            target_degree
        );
        warn!("quadrature: {message}");
        scheme.advisory = Some(message);
    }

    let points = PointCloud::new(
        scheme
            .nodes()
            .iter()
            .map(|n| {
                expansion.evaluate(&SphericalAngles {
                    theta: n.theta,
                    phi: n.phi,
                })
            })
            .collect(),
    )?;
    debug!(
        "quadrature: {} nodes (requested {}, minimal={}), exact to degree {}",
        scheme.len(),
        requested,
        minimal,
        scheme.exact_degree()
    );
    Ok((points, scheme))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harmonics::{fit_harmonics, HarmonicAlgorithm};
    use crate::types::sphere_point_cloud;
    use nalgebra::Point3;

    fn sphere_expansion(degree: usize) -> SurfaceExpansion {
        let cloud = sphere_point_cloud(Point3::new(1.0, 2.0, 3.0), 4.0, 200).unwrap();
        fit_harmonics(&cloud, degree, HarmonicAlgorithm::Radial)
            .unwrap()
            .expansion
    }

    #[test]
    fn request_is_clamped_and_snapped() {
        let expansion = sphere_expansion(2);
        let (points, scheme) = quadrature(&expansion, 100_000, false).unwrap();
        assert_eq!(points.len(), MAX_QUADRATURE_POINTS);
        assert_eq!(points.len(), scheme.len());
        assert!(scheme.advisory().is_some());
    }

    #[test]
    fn valid_sizes_are_used_verbatim() {
        let expansion = sphere_expansion(2);
        for size in [590, 5810] {
            let (points, scheme) = quadrature(&expansion, size, false).unwrap();
            assert_eq!(points.len(), size);
            assert_eq!(scheme.exact_degree(), max_exact_degree(size));
        }
        let (points, _) = quadrature(&expansion, 1000, false).unwrap();
        assert_eq!(points.len(), 974);
    }

    #[test]
    fn minimal_rule_has_no_advisory() {
        let expansion = sphere_expansion(3);
        let (points, scheme) = quadrature(&expansion, 0, true).unwrap();
        assert_eq!(points.len(), 50);
        assert!(scheme.exact_degree() >= 8);
        assert!(scheme.advisory().is_none());
        for p in points.iter() {
            assert!(((p - Point3::new(1.0, 2.0, 3.0)).norm() - 4.0).abs() < 1e-6);
        }
    }

    #[test]
    fn chart_weights_favour_the_regular_chart() {
        let scheme = QuadratureScheme::with_size(74);
        for (i, node) in scheme.nodes().iter().enumerate() {
            let w = scheme.chart_weight(i);
            assert!((0.0..=1.0).contains(&w));
            let d = node.direction();
            if d.z.abs() > d.x.abs() {
                assert!(w < 0.5);
            }
        }
    }

    #[test]
    fn zero_request_is_invalid() {
        let expansion = sphere_expansion(1);
        assert!(matches!(
            quadrature(&expansion, 0, false),
            Err(SurfaceError::InvalidParameter(_))
        ));
    }
}
