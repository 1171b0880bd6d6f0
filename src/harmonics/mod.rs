//! Spherical-harmonic surface expansions.
//!
//! - [`basis`]: real orthonormal harmonics with analytic angular derivatives.
//! - [`coefficients`]: the `(L+1)×(L+1)` coefficient packing.
//! - [`ellipsoid`]: `(u, v)` parameterization collaborator for the per-axis fit.
//! - [`fit`]: least-squares radial and per-axis fits.
pub mod basis;
pub mod coefficients;
pub mod ellipsoid;
pub mod fit;

pub use self::basis::{basis_len, evaluate_basis, flat_index, BasisDerivatives};
pub use self::coefficients::SphericalHarmonicsCoefficients;
pub use self::ellipsoid::{EllipsoidFrame, EllipticalParameterization, MomentEllipsoid};
pub use self::fit::{
    fit_harmonics, fit_harmonics_with, fit_radial, HarmonicAlgorithm, HarmonicFit,
    HarmonicsParams, SurfaceExpansion,
};
