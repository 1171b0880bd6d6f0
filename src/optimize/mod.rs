//! Bounded nonlinear least squares for 1D curve models.
//!
//! The edge localizer fits sigmoid and Gaussian profiles through
//! [`fit_curve`], a Levenberg–Marquardt solver with Marquardt (diagonal)
//! damping, adaptive λ and optional box constraints. Failures are reported as
//! [`LsqError`] so callers can decide how to degrade.
pub mod lm;

pub use self::lm::{fit_curve, CurveFit, CurveModel, LmOptions, LsqError, ParameterBounds};
