//! Phantom volumes for demos and tests.
use super::IntensityVolume;
use crate::error::Result;
use nalgebra::Point3;

/// Binary ball: voxels whose centre lies within `radius` of `center` are set
/// to `value`, all others to zero.
pub fn solid_ball(
    shape: [usize; 3],
    center: Point3<f64>,
    radius: f64,
    value: f32,
) -> Result<IntensityVolume> {
    let mut data = vec![0.0f32; shape[0] * shape[1] * shape[2]];
    let r2 = radius * radius;
    let mut idx = 0usize;
    for i0 in 0..shape[0] {
        let d0 = i0 as f64 - center.x;
        for i1 in 0..shape[1] {
            let d1 = i1 as f64 - center.y;
            for i2 in 0..shape[2] {
                let d2 = i2 as f64 - center.z;
                if d0 * d0 + d1 * d1 + d2 * d2 <= r2 {
                    data[idx] = value;
                }
                idx += 1;
            }
        }
    }
    IntensityVolume::new(shape, data)
}

/// Hollow shell of thickness `width` around the sphere of `radius`: a bright
/// membrane rather than a filled interior.
pub fn spherical_shell(
    shape: [usize; 3],
    center: Point3<f64>,
    radius: f64,
    width: f64,
    value: f32,
) -> Result<IntensityVolume> {
    let mut data = vec![0.0f32; shape[0] * shape[1] * shape[2]];
    let half = 0.5 * width;
    let mut idx = 0usize;
    for i0 in 0..shape[0] {
        for i1 in 0..shape[1] {
            for i2 in 0..shape[2] {
                let p = Point3::new(i0 as f64, i1 as f64, i2 as f64);
                if ((p - center).norm() - radius).abs() <= half {
                    data[idx] = value;
                }
                idx += 1;
            }
        }
    }
    IntensityVolume::new(shape, data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ball_contains_centre_but_not_corner() {
        let vol = solid_ball([21, 21, 21], Point3::new(10.0, 10.0, 10.0), 5.0, 1.0).unwrap();
        assert_eq!(vol.get(10, 10, 10), 1.0);
        assert_eq!(vol.get(10, 10, 15), 1.0);
        assert_eq!(vol.get(10, 10, 16), 0.0);
        assert_eq!(vol.get(0, 0, 0), 0.0);
    }

    #[test]
    fn shell_is_hollow() {
        let vol = spherical_shell([21, 21, 21], Point3::new(10.0, 10.0, 10.0), 6.0, 2.0, 1.0)
            .unwrap();
        assert_eq!(vol.get(10, 10, 10), 0.0);
        assert_eq!(vol.get(10, 10, 16), 1.0);
    }
}
