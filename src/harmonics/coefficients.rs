use super::basis::{basis_len, evaluate_basis, flat_index, BasisDerivatives};
use crate::error::{Result, SurfaceError};
use nalgebra::{DMatrix, DVector};
use serde::Serialize;

/// One or more `(L+1)×(L+1)` coefficient matrices.
///
/// Entry `(n, m)` with `m ≤ n` holds the cosine-type order `m ≥ 0` of degree
/// `n`; entry `(m - 1, n)` of the strict upper triangle holds the sine-type
/// order `-m`.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SphericalHarmonicsCoefficients {
    degree: usize,
    channels: Vec<DMatrix<f64>>,
}

impl SphericalHarmonicsCoefficients {
    /// Pack flat coefficient vectors (index `n² + n + m`), one per channel.
    pub fn from_flat(degree: usize, flat: &[DVector<f64>]) -> Result<Self> {
        let expected = basis_len(degree);
        let mut channels = Vec::with_capacity(flat.len());
        for v in flat {
            if v.len() != expected {
                return Err(SurfaceError::ShapeMismatch {
                    expected,
                    actual: v.len(),
                });
            }
            let mut mat = DMatrix::zeros(degree + 1, degree + 1);
            for n in 0..=degree {
                for m in -(n as i64)..=(n as i64) {
                    let (r, c) = Self::slot(n, m);
                    mat[(r, c)] = v[flat_index(n, m)];
                }
            }
            channels.push(mat);
        }
        Ok(Self { degree, channels })
    }

    #[inline]
    fn slot(n: usize, m: i64) -> (usize, usize) {
        if m >= 0 {
            (n, m as usize)
        } else {
            (m.unsigned_abs() as usize - 1, n)
        }
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn channel(&self, idx: usize) -> &DMatrix<f64> {
        &self.channels[idx]
    }

    /// `[L+1, L+1]` for a single channel, `[channels, L+1, L+1]` otherwise.
    pub fn shape(&self) -> Vec<usize> {
        let side = self.degree + 1;
        if self.channels.len() == 1 {
            vec![side, side]
        } else {
            vec![self.channels.len(), side, side]
        }
    }

    /// Coefficient of `Y_nm` in `channel`.
    #[inline]
    pub fn get(&self, channel: usize, n: usize, m: i64) -> f64 {
        let (r, c) = Self::slot(n, m);
        self.channels[channel][(r, c)]
    }

    pub fn to_flat(&self, channel: usize) -> DVector<f64> {
        let mut v = DVector::zeros(basis_len(self.degree));
        for n in 0..=self.degree {
            for m in -(n as i64)..=(n as i64) {
                v[flat_index(n, m)] = self.get(channel, n, m);
            }
        }
        v
    }

    /// Evaluate every channel at `(θ, φ)`.
    pub fn evaluate(&self, theta: f64, phi: f64) -> Vec<f64> {
        let mut y = vec![0.0; basis_len(self.degree)];
        evaluate_basis(self.degree, theta, phi, &mut y);
        (0..self.channels.len())
            .map(|c| self.dot(c, &y))
            .collect()
    }

    /// `Σ_k c_k · basis[k]` for one channel.
    pub fn dot(&self, channel: usize, basis: &[f64]) -> f64 {
        let mut acc = 0.0;
        for n in 0..=self.degree {
            for m in -(n as i64)..=(n as i64) {
                acc += self.get(channel, n, m) * basis[flat_index(n, m)];
            }
        }
        acc
    }

    /// Channel values and angular derivatives from precomputed basis derivatives.
    pub fn evaluate_derivatives(&self, channel: usize, basis: &BasisDerivatives) -> [f64; 6] {
        [
            self.dot(channel, &basis.value),
            self.dot(channel, &basis.d_theta),
            self.dot(channel, &basis.d_phi),
            self.dot(channel, &basis.d_theta2),
            self.dot(channel, &basis.d_theta_phi),
            self.dot(channel, &basis.d_phi2),
        ]
    }

    /// Per channel, the sum of squared coefficients of each degree.
    pub fn power_spectrum(&self) -> Vec<Vec<f64>> {
        (0..self.channels.len())
            .map(|c| {
                (0..=self.degree)
                    .map(|n| {
                        (-(n as i64)..=(n as i64))
                            .map(|m| self.get(c, n, m).powi(2))
                            .sum()
                    })
                    .collect()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packing_uses_lower_triangle_for_cosine_orders() {
        let degree = 2;
        let flat = DVector::from_iterator(9, (0..9).map(|i| i as f64));
        let coeffs = SphericalHarmonicsCoefficients::from_flat(degree, &[flat.clone()]).unwrap();
        let m = coeffs.channel(0);
        // (n=2, m=1) -> flat 7, (n=2, m=-1) -> flat 5 at (0, 2), (n=1, m=-1) -> flat 1 at (0, 1).
        assert_eq!(m[(2, 1)], 7.0);
        assert_eq!(m[(0, 2)], 5.0);
        assert_eq!(m[(0, 1)], 1.0);
        assert_eq!(m[(1, 2)], 4.0);
        assert_eq!(coeffs.shape(), vec![3, 3]);
        assert_eq!(coeffs.to_flat(0), flat);
    }

    #[test]
    fn power_spectrum_sums_each_degree() {
        let flat = DVector::from_vec(vec![1.0, 1.0, 2.0, 0.0]);
        let coeffs = SphericalHarmonicsCoefficients::from_flat(1, &[flat]).unwrap();
        assert_eq!(coeffs.power_spectrum(), vec![vec![1.0, 5.0]]);
    }

    #[test]
    fn wrong_flat_length_is_rejected() {
        let flat = DVector::from_vec(vec![1.0, 2.0]);
        assert!(SphericalHarmonicsCoefficients::from_flat(1, &[flat]).is_err());
    }
}
