//! Error taxonomy shared by the refinement and harmonic-analysis stages.
//!
//! Only whole-batch structural failures are surfaced here. Per-point fit
//! failures never reach this type: the edge localizer turns them into NaN
//! rows that the outlier filter drops.

use thiserror::Error;

/// Fatal errors returned by the public operations of the crate.
#[derive(Debug, Error)]
pub enum SurfaceError {
    /// A point cloud must hold at least one point.
    #[error("point cloud is empty")]
    EmptyPointCloud,
    /// Too few or collinear points to define surface normals.
    #[error("degenerate geometry: {0}")]
    DegenerateGeometry(String),
    /// The harmonic least-squares system is underdetermined or singular.
    #[error("harmonic fit diverged: {0}")]
    FitDivergence(String),
    /// A caller-provided parameter is out of its valid range.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    /// Two inputs that must be index-aligned have different lengths.
    #[error("shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },
}

pub type Result<T> = std::result::Result<T, SurfaceError>;
