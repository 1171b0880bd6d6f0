//! Sub-sample edge localization on a single intensity profile.
//!
//! Two independent choices select the strategy: the [`EdgeModel`] says what
//! the surface looks like in the scan (a step between object interior and
//! background, or a thin bright membrane) and the [`FitMode`] says how hard we
//! work to find it (a discrete heuristic or a nonlinear curve fit). The pair
//! is resolved once per batch into an [`EdgeStrategy`].
use crate::optimize::{fit_curve, CurveModel, LmOptions, LsqError, ParameterBounds};
use serde::Deserialize;
use std::f64::consts::PI;

/// What the object boundary looks like along a profile.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeModel {
    /// Step between a filled interior and the background.
    #[default]
    Interior,
    /// Bright membrane on the object surface.
    Surface,
}

/// Which first difference the quick interior heuristic maximizes.
///
/// The two variants disagree on profiles that fall along the ray (a bright
/// interior seen from inside): `Signed` ignores the falling step and picks the
/// largest rise, `Absolute` picks the falling step. There is no default; the
/// caller states which one it wants.
///
/// Either way the located edge is the midpoint `i + 0.5` of the winning
/// difference `p[i+1] - p[i]`, so the reported border index and `center` are
/// half-integers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuickGradient {
    /// Largest signed increase along the ray (dark-to-bright edges).
    Signed,
    /// Largest change in either direction.
    Absolute,
}

/// Discrete heuristic or nonlinear fit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitMode {
    Quick { gradient: QuickGradient },
    #[default]
    Fancy,
}

/// Resolved localization strategy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EdgeStrategy {
    QuickInterior(QuickGradient),
    QuickSurface,
    FancyInterior,
    FancySurface,
}

/// Located edge of one profile, in continuous sample-index units.
#[derive(Clone, Debug, PartialEq)]
pub struct EdgeEstimate {
    pub border_index: f64,
    pub params: Vec<f64>,
    pub errors: Vec<f64>,
}

impl EdgeStrategy {
    pub fn resolve(mode: FitMode, model: EdgeModel) -> Self {
        match (mode, model) {
            (FitMode::Quick { gradient }, EdgeModel::Interior) => Self::QuickInterior(gradient),
            (FitMode::Quick { .. }, EdgeModel::Surface) => Self::QuickSurface,
            (FitMode::Fancy, EdgeModel::Interior) => Self::FancyInterior,
            (FitMode::Fancy, EdgeModel::Surface) => Self::FancySurface,
        }
    }

    /// Ordered names of the parameters reported by [`locate`](Self::locate).
    pub fn parameter_names(&self) -> &'static [&'static str] {
        match self {
            Self::QuickInterior(_) | Self::QuickSurface => &["center"],
            Self::FancyInterior => &["center", "amplitude", "slope", "offset"],
            Self::FancySurface => &["center", "sigma", "amplitude"],
        }
    }

    /// Locate the edge on one profile.
    ///
    /// Quick interior strategies return the half-step position `i + 0.5` of
    /// the steepest difference (see [`QuickGradient`]); quick surface returns
    /// the integer index of the brightest sample. Fits return continuous
    /// positions.
    pub fn locate(&self, profile: &[f64], options: &LmOptions) -> Result<EdgeEstimate, LsqError> {
        if profile.len() < 2 {
            return Err(LsqError::TooFewSamples {
                samples: profile.len(),
                params: self.parameter_names().len(),
            });
        }
        match *self {
            Self::QuickInterior(gradient) => Ok(quick(steepest_step(profile, gradient))),
            Self::QuickSurface => Ok(quick(argmax(profile.iter().copied()) as f64)),
            Self::FancyInterior => fit_sigmoid(profile, options),
            Self::FancySurface => fit_gaussian(profile, options),
        }
    }
}

fn quick(center: f64) -> EdgeEstimate {
    EdgeEstimate {
        border_index: center,
        params: vec![center],
        errors: vec![0.0],
    }
}

/// Index of the first maximum.
fn argmax(values: impl Iterator<Item = f64>) -> usize {
    let mut best = 0usize;
    let mut best_val = f64::NEG_INFINITY;
    for (i, v) in values.enumerate() {
        if v > best_val {
            best = i;
            best_val = v;
        }
    }
    best
}

/// Half-step position of the extreme first difference: the difference
/// `p[i+1] - p[i]` describes the interval centred on `i + 0.5`.
fn steepest_step(profile: &[f64], gradient: QuickGradient) -> f64 {
    let diffs = profile.windows(2).map(|w| w[1] - w[0]);
    let idx = match gradient {
        QuickGradient::Signed => argmax(diffs),
        QuickGradient::Absolute => argmax(diffs.map(f64::abs)),
    };
    idx as f64 + 0.5
}

fn sample_axis(n: usize) -> Vec<f64> {
    (0..n).map(|i| i as f64).collect()
}

fn min_max(profile: &[f64]) -> (f64, f64) {
    profile
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        })
}

/// `a / (1 + exp(-s (x - c))) + o`, parameters `[c, a, s, o]`.
pub struct SigmoidEdge;

#[inline]
fn logistic(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

impl CurveModel for SigmoidEdge {
    fn parameter_count(&self) -> usize {
        4
    }

    fn value(&self, x: f64, p: &[f64]) -> f64 {
        p[1] * logistic(p[2] * (x - p[0])) + p[3]
    }

    fn gradient(&self, x: f64, p: &[f64], out: &mut [f64]) {
        let q = logistic(p[2] * (x - p[0]));
        let dq = q * (1.0 - q);
        out[0] = -p[1] * p[2] * dq;
        out[1] = q;
        out[2] = p[1] * (x - p[0]) * dq;
        out[3] = 1.0;
    }
}

/// `a / sqrt(2πσ²) · exp(-(x - c)² / 2σ²)`, parameters `[c, σ, a]`.
pub struct GaussianPeak;

impl CurveModel for GaussianPeak {
    fn parameter_count(&self) -> usize {
        3
    }

    fn value(&self, x: f64, p: &[f64]) -> f64 {
        let (c, sigma, a) = (p[0], p[1], p[2]);
        a / (2.0 * PI * sigma * sigma).sqrt() * (-(x - c).powi(2) / (2.0 * sigma * sigma)).exp()
    }

    fn gradient(&self, x: f64, p: &[f64], out: &mut [f64]) {
        let (c, sigma, a) = (p[0], p[1], p[2]);
        let d = x - c;
        let s2 = sigma * sigma;
        let shape = (-d * d / (2.0 * s2)).exp() / (2.0 * PI * s2).sqrt();
        let f = a * shape;
        out[0] = f * d / s2;
        out[1] = f * (d * d / (s2 * sigma) - 1.0 / sigma);
        out[2] = shape;
    }
}

fn fit_sigmoid(profile: &[f64], options: &LmOptions) -> Result<EdgeEstimate, LsqError> {
    let n = profile.len();
    let reversed = profile[0] > profile[n - 1];
    let ys: Vec<f64> = if reversed {
        profile.iter().rev().copied().collect()
    } else {
        profile.to_vec()
    };
    let (lo, hi) = min_max(&ys);
    let mean_step = (ys[n - 1] - ys[0]) / (n - 1) as f64;
    let initial = [n as f64 / 2.0, hi, mean_step, lo];

    let fit = fit_curve(&SigmoidEdge, &sample_axis(n), &ys, &initial, None, options)?;
    let mut params = fit.params;
    if reversed {
        params[0] = (n - 1) as f64 - params[0];
    }
    Ok(EdgeEstimate {
        border_index: params[0],
        params,
        errors: fit.errors,
    })
}

fn fit_gaussian(profile: &[f64], options: &LmOptions) -> Result<EdgeEstimate, LsqError> {
    let n = profile.len();
    let (_, hi) = min_max(profile);
    let initial = [n as f64 / 2.0, n as f64 / 2.0, hi];
    let bounds = ParameterBounds::new(
        vec![f64::NEG_INFINITY, 1e-6, f64::NEG_INFINITY],
        vec![f64::INFINITY; 3],
    )?;
    let fit = fit_curve(
        &GaussianPeak,
        &sample_axis(n),
        profile,
        &initial,
        Some(&bounds),
        options,
    )?;
    Ok(EdgeEstimate {
        border_index: fit.params[0],
        params: fit.params,
        errors: fit.errors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sigmoid_profile(n: usize, center: f64, slope: f64, rising: bool) -> Vec<f64> {
        (0..n)
            .map(|i| 2.0 / (1.0 + (-slope * (i as f64 - center)).exp()) + 0.5)
            .map(|v| if rising { v } else { 3.0 - v })
            .collect()
    }

    #[test]
    fn quick_mode_requires_an_explicit_gradient() {
        assert!(serde_json::from_str::<FitMode>(r#"{"quick": {}}"#).is_err());
        let mode: FitMode = serde_json::from_str(r#"{"quick": {"gradient": "absolute"}}"#).unwrap();
        assert_eq!(
            mode,
            FitMode::Quick {
                gradient: QuickGradient::Absolute
            }
        );
        assert_eq!(serde_json::from_str::<FitMode>(r#""fancy""#).unwrap(), FitMode::Fancy);
    }

    #[test]
    fn strategies_resolve_from_mode_and_model() {
        let quick = FitMode::Quick {
            gradient: QuickGradient::Signed,
        };
        assert_eq!(
            EdgeStrategy::resolve(quick, EdgeModel::Interior),
            EdgeStrategy::QuickInterior(QuickGradient::Signed)
        );
        assert_eq!(
            EdgeStrategy::resolve(FitMode::Fancy, EdgeModel::Surface).parameter_names(),
            &["center", "sigma", "amplitude"]
        );
        assert_eq!(
            EdgeStrategy::resolve(FitMode::Fancy, EdgeModel::Interior).parameter_names(),
            &["center", "amplitude", "slope", "offset"]
        );
    }

    #[test]
    fn quick_gradient_variants_differ_on_falling_edges() {
        let profile = [5.0, 5.0, 4.0, 1.0, 0.0, 0.5];
        let abs = EdgeStrategy::QuickInterior(QuickGradient::Absolute)
            .locate(&profile, &LmOptions::default())
            .unwrap();
        assert_eq!(abs.border_index, 2.5);
        assert_eq!(abs.params, vec![2.5]);
        assert_eq!(abs.errors, vec![0.0]);
        let signed = EdgeStrategy::QuickInterior(QuickGradient::Signed)
            .locate(&profile, &LmOptions::default())
            .unwrap();
        assert_eq!(signed.border_index, 4.5);
    }

    #[test]
    fn quick_interior_edge_sits_between_samples() {
        let profile = sigmoid_profile(21, 12.3, 1.5, true);
        for gradient in [QuickGradient::Signed, QuickGradient::Absolute] {
            let est = EdgeStrategy::QuickInterior(gradient)
                .locate(&profile, &LmOptions::default())
                .unwrap();
            assert_eq!(est.border_index.fract(), 0.5);
            assert!((est.border_index - 12.3).abs() <= 0.5);
        }
    }

    #[test]
    fn quick_surface_picks_the_brightest_sample() {
        let profile = [0.0, 1.0, 3.0, 3.0, 1.0];
        let est = EdgeStrategy::QuickSurface
            .locate(&profile, &LmOptions::default())
            .unwrap();
        assert_eq!(est.border_index, 2.0);
    }

    #[test]
    fn sigmoid_fit_recovers_rising_and_falling_edges() {
        let rising = sigmoid_profile(20, 8.3, 1.2, true);
        let est = EdgeStrategy::FancyInterior
            .locate(&rising, &LmOptions::default())
            .unwrap();
        assert!((est.border_index - 8.3).abs() < 1e-4, "{}", est.border_index);

        let falling = sigmoid_profile(20, 8.3, 1.2, false);
        let est = EdgeStrategy::FancyInterior
            .locate(&falling, &LmOptions::default())
            .unwrap();
        assert!((est.border_index - 8.3).abs() < 1e-4, "{}", est.border_index);
        assert_eq!(est.params.len(), 4);
        assert_eq!(est.errors.len(), 4);
    }

    #[test]
    fn gaussian_fit_recovers_membrane_position() {
        let profile: Vec<f64> = (0..24)
            .map(|i| {
                let d = i as f64 - 13.4;
                6.0 / (2.0 * PI * 4.0f64).sqrt() * (-d * d / 8.0).exp()
            })
            .collect();
        let est = EdgeStrategy::FancySurface
            .locate(&profile, &LmOptions::default())
            .unwrap();
        assert!((est.params[0] - 13.4).abs() < 1e-4);
        assert!((est.params[1] - 2.0).abs() < 1e-4);
        assert!((est.params[2] - 6.0).abs() < 1e-3);
    }

    #[test]
    fn sigmoid_gradient_matches_finite_differences() {
        let p = [3.0, 2.0, 0.7, -1.0];
        let mut analytic = [0.0; 4];
        SigmoidEdge.gradient(4.2, &p, &mut analytic);
        for j in 0..4 {
            let h = 1e-6;
            let mut plus = p;
            let mut minus = p;
            plus[j] += h;
            minus[j] -= h;
            let numeric = (SigmoidEdge.value(4.2, &plus) - SigmoidEdge.value(4.2, &minus)) / (2.0 * h);
            assert!((numeric - analytic[j]).abs() < 1e-6);
        }
    }
}
