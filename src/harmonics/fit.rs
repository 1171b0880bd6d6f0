use super::basis::{basis_len, evaluate_basis};
use super::coefficients::SphericalHarmonicsCoefficients;
use super::ellipsoid::{EllipticalParameterization, MomentEllipsoid};
use crate::error::{Result, SurfaceError};
use crate::types::{PointCloud, SphericalAngles};
use log::debug;
use nalgebra::{DMatrix, DVector, Point3};
use serde::{Deserialize, Serialize};

/// Condition-number floor of the least-squares design matrix.
const MIN_SINGULAR_RATIO: f64 = 1e-10;

/// How a surface is expanded into spherical harmonics.
///
/// Neither variant is preferred: radial fits need a star-shaped surface,
/// per-axis fits depend on the ellipsoid parameterization. Callers pick one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HarmonicAlgorithm {
    /// Scalar radius `r(θ, φ)` around the centroid. Only star-shaped surfaces.
    Radial,
    /// Independent series for each coordinate over ellipsoid angles.
    PerAxisElliptical,
}

/// Configuration of the harmonic fit stage. `algorithm` has no default.
#[derive(Clone, Debug, Deserialize)]
pub struct HarmonicsParams {
    #[serde(default = "HarmonicsParams::default_degree")]
    pub degree: usize,
    pub algorithm: HarmonicAlgorithm,
}

impl HarmonicsParams {
    pub const DEFAULT_DEGREE: usize = 5;

    pub fn new(algorithm: HarmonicAlgorithm) -> Self {
        Self {
            degree: Self::DEFAULT_DEGREE,
            algorithm,
        }
    }

    fn default_degree() -> usize {
        Self::DEFAULT_DEGREE
    }
}

/// Band-limited surface description, evaluable at any angle pair.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum SurfaceExpansion {
    Radial {
        center: Point3<f64>,
        coefficients: SphericalHarmonicsCoefficients,
    },
    PerAxis {
        coefficients: SphericalHarmonicsCoefficients,
    },
}

impl SurfaceExpansion {
    pub fn coefficients(&self) -> &SphericalHarmonicsCoefficients {
        match self {
            Self::Radial { coefficients, .. } | Self::PerAxis { coefficients } => coefficients,
        }
    }

    pub fn degree(&self) -> usize {
        self.coefficients().degree()
    }

    /// Degree of the coordinate functions: the radial product `r · e(θ, φ)`
    /// gains one degree over `r`.
    pub fn manifold_degree(&self) -> usize {
        match self {
            Self::Radial { .. } => self.degree() + 1,
            Self::PerAxis { .. } => self.degree(),
        }
    }

    pub fn algorithm(&self) -> HarmonicAlgorithm {
        match self {
            Self::Radial { .. } => HarmonicAlgorithm::Radial,
            Self::PerAxis { .. } => HarmonicAlgorithm::PerAxisElliptical,
        }
    }

    pub fn evaluate(&self, angles: &SphericalAngles) -> Point3<f64> {
        let values = self.coefficients().evaluate(angles.theta, angles.phi);
        match self {
            Self::Radial { center, .. } => center + angles.unit_vector() * values[0],
            Self::PerAxis { .. } => Point3::new(values[0], values[1], values[2]),
        }
    }

    pub fn power_spectrum(&self) -> Vec<Vec<f64>> {
        self.coefficients().power_spectrum()
    }
}

/// Fitted surface sampled at the input angles, plus its expansion.
#[derive(Clone, Debug)]
pub struct HarmonicFit {
    pub points: PointCloud,
    pub expansion: SurfaceExpansion,
}

impl HarmonicFit {
    /// RMS distance between `input` and the fitted points.
    pub fn rms_residual(&self, input: &PointCloud) -> Result<f64> {
        input.rms_distance(&self.points)
    }
}

/// Fit with the chosen algorithm; the per-axis variant uses [`MomentEllipsoid`].
pub fn fit_harmonics(
    points: &PointCloud,
    degree: usize,
    algorithm: HarmonicAlgorithm,
) -> Result<HarmonicFit> {
    match algorithm {
        HarmonicAlgorithm::Radial => fit_radial(points, degree, None),
        HarmonicAlgorithm::PerAxisElliptical => fit_harmonics_with(points, degree, &MomentEllipsoid),
    }
}

/// Per-axis fit over the angles of a caller-provided parameterization.
pub fn fit_harmonics_with(
    points: &PointCloud,
    degree: usize,
    parameterization: &dyn EllipticalParameterization,
) -> Result<HarmonicFit> {
    let angles = parameterization.parameterize(points)?;
    if angles.len() != points.len() {
        return Err(SurfaceError::ShapeMismatch {
            expected: points.len(),
            actual: angles.len(),
        });
    }
    let targets = DMatrix::from_fn(points.len(), 3, |i, c| points.points()[i][c]);
    let solution = solve_least_squares(&angles, degree, &targets, None)?;
    let flat: Vec<DVector<f64>> = (0..3).map(|c| solution.column(c).into_owned()).collect();
    let expansion = SurfaceExpansion::PerAxis {
        coefficients: SphericalHarmonicsCoefficients::from_flat(degree, &flat)?,
    };
    let fitted = PointCloud::new(angles.iter().map(|a| expansion.evaluate(a)).collect())?;
    debug!("fit_harmonics_with: degree {} over {} points", degree, points.len());
    Ok(HarmonicFit {
        points: fitted,
        expansion,
    })
}

/// Radial fit around the centroid, with optional per-point weights.
pub fn fit_radial(
    points: &PointCloud,
    degree: usize,
    weights: Option<&[f64]>,
) -> Result<HarmonicFit> {
    if let Some(w) = weights {
        if w.len() != points.len() {
            return Err(SurfaceError::ShapeMismatch {
                expected: points.len(),
                actual: w.len(),
            });
        }
        if w.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(SurfaceError::InvalidParameter(
                "fit weights must be finite and non-negative".to_string(),
            ));
        }
    }
    let center = points.centroid();
    let angles: Vec<SphericalAngles> = points
        .iter()
        .map(|p| SphericalAngles::of(&(p - center)))
        .collect();
    let radii = DMatrix::from_fn(points.len(), 1, |i, _| (points.points()[i] - center).norm());
    let solution = solve_least_squares(&angles, degree, &radii, weights)?;
    let expansion = SurfaceExpansion::Radial {
        center,
        coefficients: SphericalHarmonicsCoefficients::from_flat(
            degree,
            &[solution.column(0).into_owned()],
        )?,
    };
    let fitted = PointCloud::new(angles.iter().map(|a| expansion.evaluate(a)).collect())?;
    debug!("fit_radial: degree {} over {} points", degree, points.len());
    Ok(HarmonicFit {
        points: fitted,
        expansion,
    })
}

/// Solve `A c = b` column-wise in the least-squares sense via SVD, where
/// `A[i, k] = Y_k(angles[i])`, rows scaled by `√w`.
fn solve_least_squares(
    angles: &[SphericalAngles],
    degree: usize,
    targets: &DMatrix<f64>,
    weights: Option<&[f64]>,
) -> Result<DMatrix<f64>> {
    let n_rows = angles.len();
    let n_cols = basis_len(degree);
    if n_rows < n_cols {
        return Err(SurfaceError::FitDivergence(format!(
            "degree {degree} needs at least {n_cols} points, got {n_rows}"
        )));
    }
    let mut design = DMatrix::zeros(n_rows, n_cols);
    let mut rhs = targets.clone();
    let mut row = vec![0.0; n_cols];
    for (i, a) in angles.iter().enumerate() {
        evaluate_basis(degree, a.theta, a.phi, &mut row);
        let sw = weights.map_or(1.0, |w| w[i].sqrt());
        for (k, v) in row.iter().enumerate() {
            design[(i, k)] = v * sw;
        }
        for c in 0..rhs.ncols() {
            rhs[(i, c)] *= sw;
        }
    }

    let svd = design.svd(true, true);
    let max_sv = svd.singular_values.max();
    let min_sv = svd.singular_values.min();
    if !max_sv.is_finite() || max_sv <= 0.0 || min_sv / max_sv < MIN_SINGULAR_RATIO {
        return Err(SurfaceError::FitDivergence(format!(
            "design matrix is rank deficient (singular values {min_sv:.3e}..{max_sv:.3e})"
        )));
    }
    svd.solve(&rhs, max_sv * MIN_SINGULAR_RATIO)
        .map_err(|e| SurfaceError::FitDivergence(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{fibonacci_sphere, sphere_point_cloud};
    use nalgebra::Vector3;

    fn ellipsoid(samples: usize) -> PointCloud {
        PointCloud::new(
            fibonacci_sphere(samples)
                .into_iter()
                .map(|d| Point3::new(10.0 + 6.0 * d.x, -2.0 + 4.0 * d.y, 5.0 + 3.0 * d.z))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn radial_fit_of_sphere_is_exact() {
        let center = Point3::new(3.0, -1.0, 2.0);
        let cloud = sphere_point_cloud(center, 7.0, 300).unwrap();
        let fit = fit_harmonics(&cloud, 3, HarmonicAlgorithm::Radial).unwrap();
        assert!(fit.rms_residual(&cloud).unwrap() < 1e-9);
        assert_eq!(fit.expansion.coefficients().shape(), vec![4, 4]);
        assert_eq!(fit.expansion.manifold_degree(), 4);
        let spectrum = fit.expansion.power_spectrum();
        assert!(spectrum[0][1..].iter().all(|p| *p < 1e-3));
    }

    #[test]
    fn per_axis_shape_for_each_degree() {
        let cloud = ellipsoid(400);
        for degree in 0..=6 {
            let fit = fit_harmonics(&cloud, degree, HarmonicAlgorithm::PerAxisElliptical).unwrap();
            assert_eq!(
                fit.expansion.coefficients().shape(),
                vec![3, degree + 1, degree + 1]
            );
            assert_eq!(fit.points.len(), cloud.len());
        }
    }

    #[test]
    fn underdetermined_fit_diverges() {
        let cloud = ellipsoid(10);
        assert!(matches!(
            fit_harmonics(&cloud, 3, HarmonicAlgorithm::Radial),
            Err(SurfaceError::FitDivergence(_))
        ));
    }

    #[test]
    fn zero_weights_remove_points_from_the_fit() {
        let center = Point3::new(0.0, 0.0, 0.0);
        let mut pts = sphere_point_cloud(center, 5.0, 200).unwrap().into_points();
        pts[0] += Vector3::new(0.0, 0.0, 3.0);
        let cloud = PointCloud::new(pts).unwrap();
        let mut weights = vec![1.0; cloud.len()];
        weights[0] = 0.0;
        let fit = fit_radial(&cloud, 2, Some(&weights)).unwrap();
        let worst = fit
            .points
            .iter()
            .skip(1)
            .map(|p| (p.coords.norm() - 5.0).abs())
            .fold(0.0, f64::max);
        assert!(worst < 1e-3, "{worst}");
    }
}
