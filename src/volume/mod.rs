//! Volumetric intensity scans and the helpers that operate on them.
//!
//! - [`IntensityVolume`]: owned 3D grid with per-axis voxel scale and
//!   out-of-bounds aware trilinear sampling.
//! - [`filters`]: separable Gaussian smoothing.
//! - [`synthetic`]: phantom volumes used by the demo binary and tests.
pub mod filters;
pub mod grid;
pub mod synthetic;

pub use self::filters::{gaussian_blur, GaussianKernel, SeparableFilter};
pub use self::grid::IntensityVolume;
