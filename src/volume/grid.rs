//! Owned single-channel f32 volume in row-major layout.
//!
//! Voxel `(i0, i1, i2)` lives at `data[(i0 * shape[1] + i1) * shape[2] + i2]`.
//! Positions passed to [`IntensityVolume::sample`] are continuous voxel
//! coordinates in the same axis order; voxel centres sit on integer positions.
use crate::error::{Result, SurfaceError};
use nalgebra::Point3;

#[derive(Clone, Debug)]
pub struct IntensityVolume {
    shape: [usize; 3],
    scale: [f64; 3],
    data: Vec<f32>,
    min_value: f32,
}

impl IntensityVolume {
    /// Wrap `data` as a volume of the given shape with isotropic unit scale.
    pub fn new(shape: [usize; 3], data: Vec<f32>) -> Result<Self> {
        let expected = shape[0] * shape[1] * shape[2];
        if expected == 0 {
            return Err(SurfaceError::InvalidParameter(format!(
                "volume shape {shape:?} has no voxels"
            )));
        }
        if data.len() != expected {
            return Err(SurfaceError::ShapeMismatch {
                expected,
                actual: data.len(),
            });
        }
        let min_value = data.iter().copied().fold(f32::INFINITY, f32::min);
        Ok(Self {
            shape,
            scale: [1.0; 3],
            data,
            min_value,
        })
    }

    /// Zero-initialized volume.
    pub fn zeros(shape: [usize; 3]) -> Result<Self> {
        Self::new(shape, vec![0.0; shape[0] * shape[1] * shape[2]])
    }

    /// Attach a per-axis voxel scale (physical size of one voxel).
    pub fn with_scale(mut self, scale: [f64; 3]) -> Result<Self> {
        if scale.iter().any(|s| !s.is_finite() || *s <= 0.0) {
            return Err(SurfaceError::InvalidParameter(format!(
                "voxel scale must be positive and finite, got {scale:?}"
            )));
        }
        self.scale = scale;
        Ok(self)
    }

    #[inline]
    pub fn shape(&self) -> [usize; 3] {
        self.shape
    }

    #[inline]
    pub fn scale(&self) -> [f64; 3] {
        self.scale
    }

    #[inline]
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Global minimum, used as fill value outside the grid.
    #[inline]
    pub fn min_value(&self) -> f32 {
        self.min_value
    }

    #[inline]
    pub fn idx(&self, i0: usize, i1: usize, i2: usize) -> usize {
        (i0 * self.shape[1] + i1) * self.shape[2] + i2
    }

    #[inline]
    pub fn get(&self, i0: usize, i1: usize, i2: usize) -> f32 {
        self.data[self.idx(i0, i1, i2)]
    }

    /// Trilinear interpolation at a continuous voxel position.
    ///
    /// The valid domain is `[0, len - 1]` along every axis (inclusive).
    /// Positions outside it, or non-finite positions, return
    /// [`min_value`](Self::min_value).
    pub fn sample(&self, pos: &Point3<f64>) -> f64 {
        let fill = self.min_value as f64;
        let mut base = [0usize; 3];
        let mut frac = [0.0f64; 3];
        for axis in 0..3 {
            let x = pos[axis];
            let upper = (self.shape[axis] - 1) as f64;
            if !x.is_finite() || x < 0.0 || x > upper {
                return fill;
            }
            if self.shape[axis] == 1 {
                base[axis] = 0;
                frac[axis] = 0.0;
                continue;
            }
            // The last voxel belongs to the cell that ends on it.
            let cell = (x.floor() as usize).min(self.shape[axis] - 2);
            base[axis] = cell;
            frac[axis] = x - cell as f64;
        }

        let mut acc = 0.0f64;
        for corner in 0..8usize {
            let mut weight = 1.0f64;
            let mut index = [0usize; 3];
            for axis in 0..3 {
                let bit = (corner >> (2 - axis)) & 1;
                let t = frac[axis];
                if bit == 1 {
                    if t == 0.0 {
                        weight = 0.0;
                        break;
                    }
                    weight *= t;
                } else {
                    weight *= 1.0 - t;
                }
                index[axis] = base[axis] + bit;
            }
            if weight != 0.0 {
                acc += weight * self.get(index[0], index[1], index[2]) as f64;
            }
        }
        acc
    }
}
