use super::timing::TimingBreakdown;
use serde::Serialize;

/// Harmonic fit quality.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HarmonicsStage {
    pub algorithm: String,
    pub degree: usize,
    /// RMS distance between input and fitted points.
    pub rms_residual: f64,
    /// Per channel, per degree.
    pub power_spectrum: Vec<Vec<f64>>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuadratureStage {
    pub requested_points: usize,
    pub points: usize,
    pub exact_degree: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advisory: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurvatureStage {
    pub orientation: f64,
    pub averaged_mean_curvature: f64,
    pub surface_area: f64,
    pub min_mean_curvature: f64,
    pub max_mean_curvature: f64,
}

/// Fit → quadrature → curvature trace for a refined surface.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub harmonics: HarmonicsStage,
    pub quadrature: QuadratureStage,
    pub curvature: CurvatureStage,
    pub timings: TimingBreakdown,
}
