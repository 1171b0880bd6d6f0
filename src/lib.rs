#![doc = include_str!("../README.md")]

// Public modules (stable-ish surface)
pub mod analysis;
pub mod diagnostics;
pub mod error;
pub mod refine;
pub mod types;
pub mod volume;

// Building blocks of the pipeline stages. Public for tools and tests.
pub mod config;
pub mod curvature;
pub mod harmonics;
pub mod io;
pub mod normals;
pub mod optimize;
pub mod quadrature;

// --- High-level re-exports -------------------------------------------------

pub use crate::error::{Result, SurfaceError};
pub use crate::types::PointCloud;
pub use crate::volume::IntensityVolume;

// Main entry points of each stage.
pub use crate::analysis::{analyze_surface, AnalysisParams, SurfaceAnalysis};
pub use crate::curvature::{curvature, CurvatureField};
pub use crate::harmonics::{
    fit_harmonics, fit_harmonics_with, HarmonicAlgorithm, HarmonicFit, HarmonicsParams,
};
pub use crate::quadrature::{quadrature, QuadratureScheme};
pub use crate::refine::{refine, RefineParams, SurfaceRefiner};

// --- Prelude ---------------------------------------------------------------

/// Small prelude for quick experiments.
///
/// ```no_run
/// use surface_refine::prelude::*;
/// use nalgebra::Point3;
///
/// # fn main() -> Result<()> {
/// let center = Point3::new(32.0, 32.0, 32.0);
/// let ball = volume::synthetic::solid_ball([64, 64, 64], center, 20.0, 1.0)?;
/// let volume = volume::gaussian_blur(&ball, 2.0)?;
/// let seeds = sphere_point_cloud(center, 18.0, 400)?;
///
/// let params = RefineParams { trace_length: 10.0, ..Default::default() };
/// let surface = refine(&volume, &seeds, &params)?;
/// let params = AnalysisParams::new(HarmonicsParams::new(HarmonicAlgorithm::Radial));
/// let analysis = analyze_surface(&surface, &params)?;
/// println!("H0 = {:.4}", analysis.curvature.averaged_mean_curvature());
/// # Ok(())
/// # }
/// ```
pub mod prelude {
    pub use crate::types::sphere_point_cloud;
    pub use crate::volume;
    pub use crate::{
        analyze_surface, curvature, fit_harmonics, quadrature, refine, AnalysisParams,
        HarmonicAlgorithm, HarmonicsParams, IntensityVolume, PointCloud, RefineParams, Result,
        SurfaceError,
    };
}

// --- Stage-level API (for tools & advanced users) ---------------------------

pub mod stages {
    // Stage runners.
    pub use crate::normals::{estimate_normals, NormalField, NormalParams};
    pub use crate::refine::{
        localize_edges, sample_rays, EdgeStrategy, FitTable, OutlierFilter, OutlierMode,
        RayGeometry, RaySamples,
    };

    // Structured diagnostics types.
    pub use crate::diagnostics::{
        AnalysisReport, CurvatureStage, HarmonicsStage, QuadratureStage, RefinementReport,
        StageTiming, TimingBreakdown,
    };
}
