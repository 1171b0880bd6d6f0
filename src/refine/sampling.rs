//! Normal-directed intensity profiles through the volume.
//!
//! For a point `p` with unit normal `n` the ray starts at
//! `p / scale − ½·trace·n` (voxel coordinates) and advances by
//! `trace·n / n_samples`, so the seed point sits in the middle of the profile
//! and the outward direction runs towards increasing sample index.
use crate::error::{Result, SurfaceError};
use crate::normals::NormalField;
use crate::types::PointCloud;
use crate::volume::IntensityVolume;
use nalgebra::{Point3, Vector3};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Ray geometry shared by every point of a batch.
#[derive(Clone, Copy, Debug)]
pub struct RayGeometry {
    pub trace_length: f64,
    pub sampling_distance: f64,
    /// Physical size of one voxel along each axis.
    pub scale: [f64; 3],
}

impl RayGeometry {
    /// `floor(trace_length / sampling_distance)`, validated to be at least 2.
    pub fn sample_count(&self) -> Result<usize> {
        let RayGeometry {
            trace_length,
            sampling_distance,
            scale,
        } = *self;
        if !trace_length.is_finite() || trace_length <= 0.0 {
            return Err(SurfaceError::InvalidParameter(format!(
                "trace_length must be positive, got {trace_length}"
            )));
        }
        if !sampling_distance.is_finite() || sampling_distance <= 0.0 {
            return Err(SurfaceError::InvalidParameter(format!(
                "sampling_distance must be positive, got {sampling_distance}"
            )));
        }
        if scale.iter().any(|s| !s.is_finite() || *s <= 0.0) {
            return Err(SurfaceError::InvalidParameter(format!(
                "voxel scale must be positive, got {scale:?}"
            )));
        }
        // Guard against 2.0 / 0.1 landing just below an integer.
        let n = (trace_length / sampling_distance + 1e-9).floor() as usize;
        if n < 2 {
            return Err(SurfaceError::InvalidParameter(format!(
                "trace_length / sampling_distance must give at least 2 samples, got {n}"
            )));
        }
        Ok(n)
    }
}

/// Profiles and ray parameters for a batch of points, index-aligned with the
/// input cloud. Starts and steps are in voxel coordinates.
#[derive(Clone, Debug)]
pub struct RaySamples {
    pub profiles: Vec<Vec<f64>>,
    pub starts: Vec<Point3<f64>>,
    pub steps: Vec<Vector3<f64>>,
}

impl RaySamples {
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Voxel position of the continuous sample index `t` on ray `idx`.
    #[inline]
    pub fn position(&self, idx: usize, t: f64) -> Point3<f64> {
        self.starts[idx] + self.steps[idx] * t
    }
}

/// Sample one intensity profile per point along its normal.
pub fn sample_rays(
    volume: &IntensityVolume,
    points: &PointCloud,
    normals: &NormalField,
    geometry: &RayGeometry,
) -> Result<RaySamples> {
    if normals.len() != points.len() {
        return Err(SurfaceError::ShapeMismatch {
            expected: points.len(),
            actual: normals.len(),
        });
    }
    let n_samples = geometry.sample_count()?;
    let trace = geometry.trace_length;
    let scale = geometry.scale;

    let trace_ray = |idx: usize| {
        let p = &points.points()[idx];
        let n = normals.get(idx).into_inner();
        let voxel = Point3::new(p.x / scale[0], p.y / scale[1], p.z / scale[2]);
        let start = voxel - n * (0.5 * trace);
        let step = n * (trace / n_samples as f64);
        let profile: Vec<f64> = (0..n_samples)
            .map(|k| volume.sample(&(start + step * k as f64)))
            .collect();
        (profile, start, step)
    };

    #[cfg(feature = "parallel")]
    let traced: Vec<_> = (0..points.len()).into_par_iter().map(trace_ray).collect();
    #[cfg(not(feature = "parallel"))]
    let traced: Vec<_> = (0..points.len()).map(trace_ray).collect();

    let mut samples = RaySamples {
        profiles: Vec::with_capacity(traced.len()),
        starts: Vec::with_capacity(traced.len()),
        steps: Vec::with_capacity(traced.len()),
    };
    for (profile, start, step) in traced {
        samples.profiles.push(profile);
        samples.starts.push(start);
        samples.steps.push(step);
    }
    Ok(samples)
}
