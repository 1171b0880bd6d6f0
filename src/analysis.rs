//! Fit → quadrature → curvature on a refined point cloud.
use crate::curvature::{curvature, CurvatureField};
use crate::diagnostics::{
    AnalysisReport, CurvatureStage, HarmonicsStage, QuadratureStage, TimingBreakdown,
};
use crate::error::Result;
use crate::harmonics::{fit_harmonics, HarmonicFit, HarmonicsParams};
use crate::quadrature::{quadrature, QuadratureParams, QuadratureScheme};
use crate::types::PointCloud;
use log::debug;
use serde::Deserialize;
use std::time::Instant;

/// Analysis configuration. The harmonic algorithm must always be named.
#[derive(Clone, Debug, Deserialize)]
pub struct AnalysisParams {
    pub harmonics: HarmonicsParams,
    #[serde(default)]
    pub quadrature: QuadratureParams,
}

impl AnalysisParams {
    pub fn new(harmonics: HarmonicsParams) -> Self {
        Self {
            harmonics,
            quadrature: QuadratureParams::default(),
        }
    }
}

pub struct SurfaceAnalysis {
    pub fit: HarmonicFit,
    pub quadrature_points: PointCloud,
    pub scheme: QuadratureScheme,
    pub curvature: CurvatureField,
    pub report: AnalysisReport,
}

/// Expand `points` in harmonics, resample at quadrature nodes and compute the
/// curvature field at the expansion's manifold degree.
pub fn analyze_surface(points: &PointCloud, params: &AnalysisParams) -> Result<SurfaceAnalysis> {
    let total_start = Instant::now();
    let mut timings = TimingBreakdown::default();
    let harmonics = &params.harmonics;

    let fit = timings.record("harmonics", || {
        fit_harmonics(points, harmonics.degree, harmonics.algorithm)
    })?;
    let (quadrature_points, scheme) = timings.record("quadrature", || {
        quadrature(&fit.expansion, params.quadrature.points, params.quadrature.minimal)
    })?;
    let field = timings.record("curvature", || {
        curvature(&quadrature_points, &scheme, fit.expansion.manifold_degree())
    })?;
    timings.total_ms = total_start.elapsed().as_secs_f64() * 1000.0;

    let report = AnalysisReport {
        harmonics: HarmonicsStage {
            algorithm: format!("{:?}", harmonics.algorithm),
            degree: harmonics.degree,
            rms_residual: fit.rms_residual(points)?,
            power_spectrum: fit.expansion.power_spectrum(),
        },
        quadrature: QuadratureStage {
            requested_points: params.quadrature.points,
            points: scheme.len(),
            exact_degree: scheme.exact_degree(),
            advisory: scheme.advisory().map(str::to_string),
        },
        curvature: CurvatureStage {
            orientation: field.orientation(),
            averaged_mean_curvature: field.averaged_mean_curvature(),
            surface_area: field.surface_area(),
            min_mean_curvature: field.min_mean_curvature(),
            max_mean_curvature: field.max_mean_curvature(),
        },
        timings,
    };
    debug!(
        "analyze_surface: {} points, rms {:.4}, H0 {:.6}",
        points.len(),
        report.harmonics.rms_residual,
        report.curvature.averaged_mean_curvature
    );
    Ok(SurfaceAnalysis {
        fit,
        quadrature_points,
        scheme,
        curvature: field,
        report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harmonics::HarmonicAlgorithm;
    use crate::types::sphere_point_cloud;
    use nalgebra::Point3;

    #[test]
    fn sphere_analysis_reports_inverse_radius() {
        let cloud = sphere_point_cloud(Point3::new(5.0, 5.0, 5.0), 2.0, 400).unwrap();
        let params = AnalysisParams {
            harmonics: HarmonicsParams {
                degree: 3,
                algorithm: HarmonicAlgorithm::Radial,
            },
            quadrature: QuadratureParams {
                points: 0,
                minimal: true,
            },
        };
        let analysis = analyze_surface(&cloud, &params).unwrap();
        assert!(analysis.report.harmonics.rms_residual < 1e-6);
        assert!(analysis.report.quadrature.advisory.is_none());
        assert!((analysis.report.curvature.averaged_mean_curvature - 0.5).abs() < 1e-5);
        assert_eq!(analysis.quadrature_points.len(), analysis.scheme.len());
        assert!(analysis.report.timings.stage_ms("curvature").is_some());
    }

    #[test]
    fn params_need_an_algorithm() {
        assert!(serde_json::from_str::<AnalysisParams>(r#"{"harmonics": {"degree": 4}}"#).is_err());
        assert!(serde_json::from_str::<AnalysisParams>("{}").is_err());
        let params: AnalysisParams =
            serde_json::from_str(r#"{"harmonics": {"algorithm": "per_axis_elliptical"}}"#).unwrap();
        assert_eq!(params.harmonics.algorithm, HarmonicAlgorithm::PerAxisElliptical);
        assert_eq!(params.harmonics.degree, HarmonicsParams::DEFAULT_DEGREE);
        assert_eq!(params.quadrature.points, QuadratureParams::default().points);
    }
}
