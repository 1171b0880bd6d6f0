use crate::error::{Result, SurfaceError};
use nalgebra::{Matrix3, Point3, Vector3};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Ordered set of 3D coordinates without implied topology.
///
/// Construction rejects empty input, so every `PointCloud` holds at least one
/// point. Coordinates follow the volume's axis order `(axis0, axis1, axis2)`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<[f64; 3]>", into = "Vec<[f64; 3]>")]
pub struct PointCloud {
    points: Vec<Point3<f64>>,
}

impl PointCloud {
    pub fn new(points: Vec<Point3<f64>>) -> Result<Self> {
        if points.is_empty() {
            return Err(SurfaceError::EmptyPointCloud);
        }
        Ok(Self { points })
    }

    pub fn from_arrays(coords: &[[f64; 3]]) -> Result<Self> {
        Self::new(coords.iter().map(|c| Point3::new(c[0], c[1], c[2])).collect())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Always `false`; kept for API symmetry with collections.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    #[inline]
    pub fn points(&self) -> &[Point3<f64>] {
        &self.points
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Point3<f64>> {
        self.points.iter()
    }

    pub fn into_points(self) -> Vec<Point3<f64>> {
        self.points
    }

    pub fn to_arrays(&self) -> Vec<[f64; 3]> {
        self.points.iter().map(|p| [p.x, p.y, p.z]).collect()
    }

    pub fn centroid(&self) -> Point3<f64> {
        let mut sum = Vector3::zeros();
        for p in &self.points {
            sum += p.coords;
        }
        Point3::from(sum / self.points.len() as f64)
    }

    /// Population covariance of the coordinates around `center`.
    pub fn covariance(&self, center: &Point3<f64>) -> Matrix3<f64> {
        let mut cov = Matrix3::zeros();
        for p in &self.points {
            let d = p - center;
            cov += d * d.transpose();
        }
        cov / self.points.len() as f64
    }

    /// Root-mean-square distance between index-aligned clouds.
    pub fn rms_distance(&self, other: &PointCloud) -> Result<f64> {
        if self.len() != other.len() {
            return Err(SurfaceError::ShapeMismatch {
                expected: self.len(),
                actual: other.len(),
            });
        }
        let sum: f64 = self
            .points
            .iter()
            .zip(other.points.iter())
            .map(|(a, b)| (a - b).norm_squared())
            .sum();
        Ok((sum / self.len() as f64).sqrt())
    }
}

impl TryFrom<Vec<[f64; 3]>> for PointCloud {
    type Error = SurfaceError;

    fn try_from(value: Vec<[f64; 3]>) -> Result<Self> {
        Self::from_arrays(&value)
    }
}

impl From<PointCloud> for Vec<[f64; 3]> {
    fn from(value: PointCloud) -> Self {
        value.to_arrays()
    }
}

/// Spherical angles of a direction: colatitude `theta` in `[0, π]` measured
/// from `+axis2`, longitude `phi` in `(-π, π]` measured from `+axis0`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SphericalAngles {
    pub theta: f64,
    pub phi: f64,
}

impl SphericalAngles {
    /// Angles of `v`; the zero vector maps to the north pole.
    pub fn of(v: &Vector3<f64>) -> Self {
        let r = v.norm();
        if r <= f64::EPSILON {
            return Self { theta: 0.0, phi: 0.0 };
        }
        Self {
            theta: (v.z / r).clamp(-1.0, 1.0).acos(),
            phi: v.y.atan2(v.x),
        }
    }

    #[inline]
    pub fn unit_vector(&self) -> Vector3<f64> {
        let (st, ct) = self.theta.sin_cos();
        let (sp, cp) = self.phi.sin_cos();
        Vector3::new(st * cp, st * sp, ct)
    }
}

/// Evenly scatters `samples` points on the unit sphere (golden-angle spiral).
pub fn fibonacci_sphere(samples: usize) -> Vec<Vector3<f64>> {
    if samples == 0 {
        return Vec::new();
    }
    if samples == 1 {
        return vec![Vector3::new(0.0, 0.0, 1.0)];
    }
    let golden = PI * (3.0 - 5.0f64.sqrt());
    (0..samples)
        .map(|i| {
            let z = 1.0 - 2.0 * i as f64 / (samples - 1) as f64;
            let radius = (1.0 - z * z).max(0.0).sqrt();
            let (s, c) = (golden * i as f64).sin_cos();
            Vector3::new(c * radius, s * radius, z)
        })
        .collect()
}

/// Sphere of `radius` around `center` sampled with [`fibonacci_sphere`].
pub fn sphere_point_cloud(center: Point3<f64>, radius: f64, samples: usize) -> Result<PointCloud> {
    PointCloud::new(
        fibonacci_sphere(samples)
            .into_iter()
            .map(|d| center + d * radius)
            .collect(),
    )
}
