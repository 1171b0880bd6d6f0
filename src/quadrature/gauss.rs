//! Gauss–Legendre × equispaced-longitude rules on the unit sphere.
//!
//! `n` Gauss–Legendre colatitudes integrate `cos θ` polynomials to degree
//! `2n − 1`; a ring of `m` equispaced longitudes integrates `e^{ikφ}` for
//! `|k| < m`. The weights sum to `4π`.
use super::tables::{max_exact_degree, rings_for_degree};
use nalgebra::Vector3;
use std::f64::consts::PI;

/// One integration node.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct QuadratureNode {
    pub theta: f64,
    pub phi: f64,
    pub weight: f64,
}

impl QuadratureNode {
    #[inline]
    pub fn direction(&self) -> Vector3<f64> {
        let (st, ct) = self.theta.sin_cos();
        let (sp, cp) = self.phi.sin_cos();
        Vector3::new(st * cp, st * sp, ct)
    }
}

/// Gauss–Legendre nodes and weights on `[-1, 1]`, nodes descending.
pub fn gauss_legendre(n: usize) -> Vec<(f64, f64)> {
    let mut out = Vec::with_capacity(n);
    let nf = n as f64;
    for i in 0..n {
        let mut x = (PI * (i as f64 + 0.75) / (nf + 0.5)).cos();
        let mut dp = 1.0;
        for _ in 0..100 {
            let (p, d) = legendre_with_derivative(n, x);
            dp = d;
            let dx = p / d;
            x -= dx;
            if dx.abs() < 1e-15 {
                break;
            }
        }
        let (_, d) = legendre_with_derivative(n, x);
        if d.is_finite() {
            dp = d;
        }
        out.push((x, 2.0 / ((1.0 - x * x) * dp * dp)));
    }
    out
}

/// `P_n(x)` and `P_n'(x)` by the three-term recurrence.
fn legendre_with_derivative(n: usize, x: f64) -> (f64, f64) {
    let mut p0 = 1.0;
    let mut p1 = x;
    if n == 0 {
        return (1.0, 0.0);
    }
    for k in 2..=n {
        let kf = k as f64;
        let p2 = ((2.0 * kf - 1.0) * x * p1 - (kf - 1.0) * p0) / kf;
        p0 = p1;
        p1 = p2;
    }
    let dp = n as f64 * (x * p1 - p0) / (x * x - 1.0);
    (p1, dp)
}

/// Gauss–Legendre colatitude rings, each carrying its own equispaced
/// longitude band.
///
/// A rule of `N` nodes exact to degree `d` uses `⌈(d+1)/2⌉` rings; the `N`
/// nodes are dealt out as evenly as possible, so every ring holds at least
/// `d + 1` longitudes.
#[derive(Clone, Debug)]
pub struct GaussProductRule {
    exact_degree: usize,
    nodes: Vec<QuadratureNode>,
}

impl GaussProductRule {
    /// Rule with exactly `points` nodes (`points >= 1`).
    pub fn with_size(points: usize) -> Self {
        let points = points.max(1);
        let exact_degree = max_exact_degree(points);
        let n_theta = rings_for_degree(exact_degree);
        let (base, extra) = (points / n_theta, points % n_theta);
        let mut nodes = Vec::with_capacity(points);
        for (ring, (x, w)) in gauss_legendre(n_theta).into_iter().enumerate() {
            let theta = x.clamp(-1.0, 1.0).acos();
            let n_phi = base + usize::from(ring < extra);
            let d_phi = 2.0 * PI / n_phi as f64;
            for j in 0..n_phi {
                nodes.push(QuadratureNode {
                    theta,
                    phi: j as f64 * d_phi,
                    weight: w * d_phi,
                });
            }
        }
        Self {
            exact_degree,
            nodes,
        }
    }

    /// Smallest rule exact to `degree`.
    pub fn exact_to(degree: usize) -> Self {
        Self::with_size(rings_for_degree(degree) * (degree + 1))
    }

    pub fn nodes(&self) -> &[QuadratureNode] {
        &self.nodes
    }

    pub fn into_nodes(self) -> Vec<QuadratureNode> {
        self.nodes
    }

    /// Highest polynomial degree integrated exactly.
    pub fn exact_degree(&self) -> usize {
        self.exact_degree
    }
}
