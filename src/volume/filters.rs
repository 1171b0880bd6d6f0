use super::IntensityVolume;
use crate::error::{Result, SurfaceError};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Trait implemented by separable 1D filters applied along each volume axis.
pub trait SeparableFilter {
    /// Return the 1D taps (in left-to-right order), centred on the middle tap.
    fn taps(&self) -> &[f32];
}

/// Sampled, normalised Gaussian kernel truncated at `truncate · sigma`.
#[derive(Clone, Debug)]
pub struct GaussianKernel {
    taps: Vec<f32>,
}

impl GaussianKernel {
    pub fn new(sigma: f64, truncate: f64) -> Result<Self> {
        if !sigma.is_finite() || sigma <= 0.0 || !truncate.is_finite() || truncate <= 0.0 {
            return Err(SurfaceError::InvalidParameter(format!(
                "gaussian kernel needs positive sigma and truncate, got {sigma}, {truncate}"
            )));
        }
        let radius = (truncate * sigma + 0.5) as isize;
        let mut taps: Vec<f64> = (-radius..=radius)
            .map(|i| (-0.5 * (i as f64 / sigma).powi(2)).exp())
            .collect();
        let sum: f64 = taps.iter().sum();
        taps.iter_mut().for_each(|t| *t /= sum);
        Ok(Self {
            taps: taps.into_iter().map(|t| t as f32).collect(),
        })
    }

    pub fn radius(&self) -> usize {
        self.taps.len() / 2
    }
}

impl SeparableFilter for GaussianKernel {
    #[inline]
    fn taps(&self) -> &[f32] {
        &self.taps
    }
}

/// Gaussian smoothing with edge-clamped borders (4σ truncation).
pub fn gaussian_blur(volume: &IntensityVolume, sigma: f64) -> Result<IntensityVolume> {
    let kernel = GaussianKernel::new(sigma, 4.0)?;
    let mut data = volume.data().to_vec();
    for axis in 0..3 {
        data = convolve_axis(&data, volume.shape(), axis, &kernel);
    }
    IntensityVolume::new(volume.shape(), data)?.with_scale(volume.scale())
}

fn convolve_axis<F: SeparableFilter + Sync>(
    src: &[f32],
    shape: [usize; 3],
    axis: usize,
    filter: &F,
) -> Vec<f32> {
    let strides = [shape[1] * shape[2], shape[2], 1usize];
    let len = shape[axis];
    let stride = strides[axis];
    let taps = filter.taps();
    let radius = (taps.len() / 2) as isize;

    let convolve_voxel = |linear: usize| -> f32 {
        let pos = (linear / stride) % len;
        let line_start = linear - pos * stride;
        let mut acc = 0.0f32;
        for (k, &w) in taps.iter().enumerate() {
            let j = (pos as isize + k as isize - radius).clamp(0, len as isize - 1) as usize;
            acc += w * src[line_start + j * stride];
        }
        acc
    };

    #[cfg(feature = "parallel")]
    {
        (0..src.len()).into_par_iter().map(convolve_voxel).collect()
    }
    #[cfg(not(feature = "parallel"))]
    {
        (0..src.len()).map(convolve_voxel).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kernel_is_normalised_and_symmetric() {
        let k = GaussianKernel::new(2.0, 4.0).unwrap();
        assert_eq!(k.radius(), 8);
        let sum: f32 = k.taps().iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        let taps = k.taps();
        for i in 0..taps.len() {
            assert!((taps[i] - taps[taps.len() - 1 - i]).abs() < 1e-7);
        }
    }

    #[test]
    fn blur_preserves_constant_volume() {
        let vol = IntensityVolume::new([5, 6, 7], vec![3.0; 210]).unwrap();
        let blurred = gaussian_blur(&vol, 1.5).unwrap();
        assert!(blurred.data().iter().all(|v| (v - 3.0).abs() < 1e-5));
    }

    #[test]
    fn blur_spreads_an_impulse() {
        let mut data = vec![0.0f32; 9 * 9 * 9];
        let vol0 = IntensityVolume::new([9, 9, 9], data.clone()).unwrap();
        let centre = vol0.idx(4, 4, 4);
        data[centre] = 1.0;
        let vol = IntensityVolume::new([9, 9, 9], data).unwrap();
        let blurred = gaussian_blur(&vol, 1.0).unwrap();
        let total: f32 = blurred.data().iter().sum();
        assert!((total - 1.0).abs() < 1e-4);
        assert!(blurred.get(4, 4, 4) > blurred.get(4, 4, 5));
        assert!((blurred.get(4, 4, 5) - blurred.get(4, 5, 4)).abs() < 1e-6);
    }

    #[test]
    fn invalid_sigma_is_rejected() {
        assert!(GaussianKernel::new(0.0, 4.0).is_err());
    }
}
