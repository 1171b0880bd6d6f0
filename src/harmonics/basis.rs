//! Real orthonormal spherical harmonics and their angular derivatives.
//!
//! `Y_nm(θ, φ) = P̄_n|m|(cos θ) · Φ_m(φ)` with
//! `Φ_m = √2 cos(mφ)` for `m > 0`, `1` for `m = 0`, `√2 sin(|m|φ)` for `m < 0`,
//! and `P̄` the associated Legendre functions normalized so that
//! `∫ Y_nm² dΩ = 1` (no Condon–Shortley phase). Functions are stored flat at
//! index `n² + n + m`.
use std::f64::consts::{PI, SQRT_2};

/// Number of basis functions up to and including `degree`.
#[inline]
pub fn basis_len(degree: usize) -> usize {
    (degree + 1) * (degree + 1)
}

/// Flat index of `(n, m)`, `-n <= m <= n`.
#[inline]
pub fn flat_index(n: usize, m: i64) -> usize {
    ((n * n + n) as i64 + m) as usize
}

#[inline]
fn tri(n: usize, m: usize) -> usize {
    n * (n + 1) / 2 + m
}

/// Normalized associated Legendre values (and θ-derivatives) at one colatitude.
#[derive(Clone, Debug)]
pub struct LegendreTable {
    degree: usize,
    p: Vec<f64>,
    dp: Vec<f64>,
    d2p: Vec<f64>,
}

impl LegendreTable {
    /// Values only.
    pub fn new(degree: usize, theta: f64) -> Self {
        Self::build(degree, theta, false)
    }

    /// Values plus first and second derivatives with respect to θ. The
    /// derivatives are singular on the poles (`sin θ = 0`).
    pub fn with_derivatives(degree: usize, theta: f64) -> Self {
        Self::build(degree, theta, true)
    }

    fn build(degree: usize, theta: f64, derivatives: bool) -> Self {
        let (s, x) = theta.sin_cos();
        let len = tri(degree, degree) + 1;
        let mut p = vec![0.0; len];

        p[0] = 1.0 / (4.0 * PI).sqrt();
        for m in 1..=degree {
            let mf = m as f64;
            p[tri(m, m)] = ((2.0 * mf + 1.0) / (2.0 * mf)).sqrt() * s * p[tri(m - 1, m - 1)];
        }
        for m in 0..degree {
            p[tri(m + 1, m)] = (2.0 * m as f64 + 3.0).sqrt() * x * p[tri(m, m)];
        }
        for m in 0..=degree {
            let mf = m as f64;
            for n in (m + 2)..=degree {
                let nf = n as f64;
                let a = ((4.0 * nf * nf - 1.0) / (nf * nf - mf * mf)).sqrt();
                let b = (((nf - 1.0).powi(2) - mf * mf) / (4.0 * (nf - 1.0).powi(2) - 1.0)).sqrt();
                p[tri(n, m)] = a * (x * p[tri(n - 1, m)] - b * p[tri(n - 2, m)]);
            }
        }

        let (dp, d2p) = if derivatives {
            let mut dp = vec![0.0; len];
            let mut d2p = vec![0.0; len];
            for n in 0..=degree {
                let nf = n as f64;
                for m in 0..=n {
                    let mf = m as f64;
                    let prev = if n > m {
                        ((2.0 * nf + 1.0) / (2.0 * nf - 1.0) * (nf - mf) * (nf + mf)).sqrt()
                            * p[tri(n - 1, m)]
                    } else {
                        0.0
                    };
                    let v = p[tri(n, m)];
                    let d = (nf * x * v - prev) / s;
                    dp[tri(n, m)] = d;
                    d2p[tri(n, m)] = -(x / s) * d - (nf * (nf + 1.0) - mf * mf / (s * s)) * v;
                }
            }
            (dp, d2p)
        } else {
            (Vec::new(), Vec::new())
        };

        Self { degree, p, dp, d2p }
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    #[inline]
    pub fn value(&self, n: usize, m: usize) -> f64 {
        self.p[tri(n, m)]
    }

    #[inline]
    pub fn d_theta(&self, n: usize, m: usize) -> f64 {
        self.dp[tri(n, m)]
    }

    #[inline]
    pub fn d_theta2(&self, n: usize, m: usize) -> f64 {
        self.d2p[tri(n, m)]
    }
}

/// `Φ_m(φ)` and its first two derivatives.
#[inline]
fn azimuthal(m: i64, phi: f64) -> (f64, f64, f64) {
    match m {
        0 => (1.0, 0.0, 0.0),
        m if m > 0 => {
            let k = m as f64;
            let (s, c) = (k * phi).sin_cos();
            (SQRT_2 * c, -SQRT_2 * k * s, -SQRT_2 * k * k * c)
        }
        m => {
            let k = (-m) as f64;
            let (s, c) = (k * phi).sin_cos();
            (SQRT_2 * s, SQRT_2 * k * c, -SQRT_2 * k * k * s)
        }
    }
}

/// All basis values at `(θ, φ)`, written into `out` (length `basis_len`).
pub fn evaluate_basis(degree: usize, theta: f64, phi: f64, out: &mut [f64]) {
    let legendre = LegendreTable::new(degree, theta);
    for n in 0..=degree {
        for m in -(n as i64)..=(n as i64) {
            let (f, _, _) = azimuthal(m, phi);
            out[flat_index(n, m)] = legendre.value(n, m.unsigned_abs() as usize) * f;
        }
    }
}

/// Basis values and angular partial derivatives at one point.
#[derive(Clone, Debug)]
pub struct BasisDerivatives {
    pub value: Vec<f64>,
    pub d_theta: Vec<f64>,
    pub d_phi: Vec<f64>,
    pub d_theta2: Vec<f64>,
    pub d_theta_phi: Vec<f64>,
    pub d_phi2: Vec<f64>,
}

impl BasisDerivatives {
    pub fn new(degree: usize, theta: f64, phi: f64) -> Self {
        let len = basis_len(degree);
        let mut out = Self {
            value: vec![0.0; len],
            d_theta: vec![0.0; len],
            d_phi: vec![0.0; len],
            d_theta2: vec![0.0; len],
            d_theta_phi: vec![0.0; len],
            d_phi2: vec![0.0; len],
        };
        let legendre = LegendreTable::with_derivatives(degree, theta);
        for n in 0..=degree {
            for m in -(n as i64)..=(n as i64) {
                let am = m.unsigned_abs() as usize;
                let (f, df, d2f) = azimuthal(m, phi);
                let (p, dp, d2p) = (
                    legendre.value(n, am),
                    legendre.d_theta(n, am),
                    legendre.d_theta2(n, am),
                );
                let k = flat_index(n, m);
                out.value[k] = p * f;
                out.d_theta[k] = dp * f;
                out.d_phi[k] = p * df;
                out.d_theta2[k] = d2p * f;
                out.d_theta_phi[k] = dp * df;
                out.d_phi2[k] = p * d2f;
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quadrature::GaussProductRule;

    #[test]
    fn flat_index_orders_by_degree_then_order() {
        assert_eq!(flat_index(0, 0), 0);
        assert_eq!(flat_index(1, -1), 1);
        assert_eq!(flat_index(1, 1), 3);
        assert_eq!(flat_index(2, -2), 4);
        assert_eq!(flat_index(3, 3), basis_len(3) - 1);
    }

    #[test]
    fn low_degree_values_match_closed_forms() {
        let (theta, phi) = (0.7, -1.1);
        let mut y = vec![0.0; basis_len(1)];
        evaluate_basis(1, theta, phi, &mut y);
        let c = (3.0 / (4.0 * PI)).sqrt();
        assert!((y[0] - 0.5 / PI.sqrt()).abs() < 1e-14);
        assert!((y[flat_index(1, 0)] - c * theta.cos()).abs() < 1e-14);
        assert!((y[flat_index(1, 1)] - c * theta.sin() * phi.cos()).abs() < 1e-14);
        assert!((y[flat_index(1, -1)] - c * theta.sin() * phi.sin()).abs() < 1e-14);
    }

    #[test]
    fn basis_is_orthonormal_under_exact_quadrature() {
        let degree = 4;
        let rule = GaussProductRule::exact_to(2 * degree);
        let len = basis_len(degree);
        let mut gram = vec![0.0; len * len];
        let mut y = vec![0.0; len];
        for node in rule.nodes() {
            evaluate_basis(degree, node.theta, node.phi, &mut y);
            for i in 0..len {
                for j in 0..len {
                    gram[i * len + j] += node.weight * y[i] * y[j];
                }
            }
        }
        for i in 0..len {
            for j in 0..len {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((gram[i * len + j] - expected).abs() < 1e-12, "({i}, {j})");
            }
        }
    }

    #[test]
    fn derivatives_match_finite_differences() {
        let degree = 5;
        let (theta, phi) = (1.1, 0.4);
        let d = BasisDerivatives::new(degree, theta, phi);
        let h = 1e-5;
        let eval = |t: f64, p: f64| {
            let mut y = vec![0.0; basis_len(degree)];
            evaluate_basis(degree, t, p, &mut y);
            y
        };
        let (tp, tm) = (eval(theta + h, phi), eval(theta - h, phi));
        let (pp, pm) = (eval(theta, phi + h), eval(theta, phi - h));
        let (tpp, tpm) = (eval(theta + h, phi + h), eval(theta + h, phi - h));
        let (tmp, tmm) = (eval(theta - h, phi + h), eval(theta - h, phi - h));
        for k in 0..basis_len(degree) {
            let dt = (tp[k] - tm[k]) / (2.0 * h);
            let dp = (pp[k] - pm[k]) / (2.0 * h);
            let dtt = (tp[k] - 2.0 * d.value[k] + tm[k]) / (h * h);
            let dpp = (pp[k] - 2.0 * d.value[k] + pm[k]) / (h * h);
            let dtp = (tpp[k] - tpm[k] - tmp[k] + tmm[k]) / (4.0 * h * h);
            assert!((d.d_theta[k] - dt).abs() < 1e-6, "d_theta {k}");
            assert!((d.d_phi[k] - dp).abs() < 1e-6, "d_phi {k}");
            assert!((d.d_theta2[k] - dtt).abs() < 1e-3, "d_theta2 {k}");
            assert!((d.d_phi2[k] - dpp).abs() < 1e-3, "d_phi2 {k}");
            assert!((d.d_theta_phi[k] - dtp).abs() < 1e-3, "d_theta_phi {k}");
        }
    }
}
