//! Serializable reports produced by the refinement and analysis stages.
//!
//! `RefinementReport` comes back from
//! [`SurfaceRefiner::refine_with_diagnostics`](crate::refine::SurfaceRefiner::refine_with_diagnostics);
//! `AnalysisReport` comes back from
//! [`analyze_surface`](crate::analysis::analyze_surface), which chains the
//! harmonic fit, quadrature and curvature stages.

pub mod analysis;
pub mod refinement;
pub mod timing;

pub use analysis::{AnalysisReport, CurvatureStage, HarmonicsStage, QuadratureStage};
pub use refinement::RefinementReport;
pub use timing::{StageTiming, TimingBreakdown};
