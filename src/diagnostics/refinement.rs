use super::timing::TimingBreakdown;
use crate::refine::OutlierFilterDiagnostics;
use serde::Serialize;

/// Summary of one surface refinement run.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefinementReport {
    pub input_points: usize,
    pub refined_points: usize,
    pub samples_per_ray: usize,
    /// Debug name of the resolved edge strategy.
    pub strategy: String,
    pub parameter_names: Vec<String>,
    pub failed_fits: usize,
    /// Undefined-row pass, always run.
    pub undefined_filter: OutlierFilterDiagnostics,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_filter: Option<OutlierFilterDiagnostics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_filter: Option<OutlierFilterDiagnostics>,
    pub timings: TimingBreakdown,
}
