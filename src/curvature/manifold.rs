//! Two-chart spherical-harmonic manifold over quadrature nodes.
//!
//! Each chart re-expands the node coordinates in harmonics of its own angles.
//! The standard chart has its poles on ±axis2; the rotated chart is the
//! proper rotation `(x, y, z) → (y, z, x)` of it, with poles on ±axis0. Both
//! induce the same surface orientation.
use crate::error::Result;
use crate::harmonics::{
    basis_len, evaluate_basis, BasisDerivatives, SphericalHarmonicsCoefficients,
};
use crate::quadrature::{QuadratureNode, QuadratureScheme};
use crate::types::PointCloud;
use nalgebra::{DVector, Vector3};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Chart {
    Standard,
    Rotated,
}

impl Chart {
    /// Chart angles `(θ, φ)` of a node.
    pub fn angles(&self, node: &QuadratureNode) -> (f64, f64) {
        match self {
            Chart::Standard => (node.theta, node.phi),
            Chart::Rotated => {
                let d = node.direction();
                (d.x.clamp(-1.0, 1.0).acos(), d.z.atan2(d.y))
            }
        }
    }

    /// Quadrature projection of the three coordinate channels of `points`
    /// onto the chart's degree-`degree` basis.
    pub fn project(
        &self,
        points: &PointCloud,
        scheme: &QuadratureScheme,
        degree: usize,
    ) -> Result<SphericalHarmonicsCoefficients> {
        let len = basis_len(degree);
        let mut flat = vec![DVector::zeros(len); 3];
        let mut y = vec![0.0; len];
        for (node, p) in scheme.nodes().iter().zip(points.iter()) {
            let (theta, phi) = self.angles(node);
            evaluate_basis(degree, theta, phi, &mut y);
            for (c, channel) in flat.iter_mut().enumerate() {
                let value = node.weight * p[c];
                for (k, yk) in y.iter().enumerate() {
                    channel[k] += value * yk;
                }
            }
        }
        SphericalHarmonicsCoefficients::from_flat(degree, &flat)
    }
}

/// Differential geometry of one chart at one node.
#[derive(Clone, Copy, Debug)]
pub struct ChartGeometry {
    pub first_form: [f64; 3],
    pub second_form: [f64; 3],
    pub normal: Vector3<f64>,
    /// Raw mean curvature with respect to `normal`.
    pub mean_curvature: f64,
    /// `|X_θ × X_φ| / sin θ`: area per unit solid angle.
    pub area_factor: f64,
}

impl ChartGeometry {
    /// Evaluate the chart expansion and its derivatives at `(θ, φ)`.
    pub fn at(coefficients: &SphericalHarmonicsCoefficients, theta: f64, phi: f64) -> Self {
        let basis = BasisDerivatives::new(coefficients.degree(), theta, phi);
        let mut d = [Vector3::<f64>::zeros(); 6];
        for c in 0..3 {
            let values = coefficients.evaluate_derivatives(c, &basis);
            for (slot, v) in d.iter_mut().zip(values.iter()) {
                slot[c] = *v;
            }
        }
        let [_, x_t, x_p, x_tt, x_tp, x_pp] = d;
        Self::from_derivatives(&x_t, &x_p, &x_tt, &x_tp, &x_pp, theta.sin())
    }

    pub fn from_derivatives(
        x_t: &Vector3<f64>,
        x_p: &Vector3<f64>,
        x_tt: &Vector3<f64>,
        x_tp: &Vector3<f64>,
        x_pp: &Vector3<f64>,
        sin_theta: f64,
    ) -> Self {
        let e = x_t.dot(x_t);
        let f = x_t.dot(x_p);
        let g = x_p.dot(x_p);
        let cross = x_t.cross(x_p);
        let norm = cross.norm();
        let normal = cross / norm;
        let l = x_tt.dot(&normal);
        let m = x_tp.dot(&normal);
        let n = x_pp.dot(&normal);
        let mean_curvature = (e * n - 2.0 * f * m + g * l) / (2.0 * (e * g - f * f));
        Self {
            first_form: [e, f, g],
            second_form: [l, m, n],
            normal,
            mean_curvature,
            area_factor: norm / sin_theta,
        }
    }
}
