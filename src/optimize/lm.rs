use log::debug;
use nalgebra::{DMatrix, DVector};
use serde::Deserialize;
use thiserror::Error;

/// Scalar model `y = f(x; params)` with an analytic parameter gradient.
pub trait CurveModel {
    fn parameter_count(&self) -> usize;

    fn value(&self, x: f64, params: &[f64]) -> f64;

    /// Writes `∂f/∂params` at `x` into `out` (length `parameter_count`).
    fn gradient(&self, x: f64, params: &[f64], out: &mut [f64]);
}

/// Solver failures. None of these are fatal for a refinement batch.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LsqError {
    #[error("need more samples than parameters ({samples} <= {params})")]
    TooFewSamples { samples: usize, params: usize },
    #[error("inputs have inconsistent lengths: {0}")]
    Dimension(String),
    #[error("no convergence after {0} iterations")]
    MaxIterations(usize),
    #[error("normal matrix is singular")]
    SingularJacobian,
    #[error("non-finite residual or parameter")]
    NonFinite,
}

/// Stopping criteria and damping schedule.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct LmOptions {
    pub max_iterations: usize,
    /// Relative step size tolerance.
    pub xtol: f64,
    /// Relative cost reduction tolerance.
    pub ftol: f64,
    /// Infinity norm of the gradient.
    pub gtol: f64,
    pub initial_lambda: f64,
    pub lambda_factor: f64,
}

impl Default for LmOptions {
    fn default() -> Self {
        Self {
            max_iterations: 500,
            xtol: 1e-10,
            ftol: 1e-12,
            gtol: 1e-10,
            initial_lambda: 1e-3,
            lambda_factor: 10.0,
        }
    }
}

/// Box constraints, applied by projecting every trial step.
#[derive(Clone, Debug)]
pub struct ParameterBounds {
    lower: Vec<f64>,
    upper: Vec<f64>,
}

impl ParameterBounds {
    pub fn new(lower: Vec<f64>, upper: Vec<f64>) -> Result<Self, LsqError> {
        if lower.len() != upper.len() {
            return Err(LsqError::Dimension(format!(
                "lower bounds {} vs upper bounds {}",
                lower.len(),
                upper.len()
            )));
        }
        if lower.iter().zip(&upper).any(|(lo, hi)| lo > hi) {
            return Err(LsqError::Dimension("lower bound exceeds upper bound".into()));
        }
        Ok(Self { lower, upper })
    }

    pub fn len(&self) -> usize {
        self.lower.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lower.is_empty()
    }

    fn project(&self, params: &mut DVector<f64>) {
        for (i, v) in params.iter_mut().enumerate() {
            *v = v.clamp(self.lower[i], self.upper[i]);
        }
    }
}

/// Converged solution with its uncertainty estimate.
#[derive(Clone, Debug)]
pub struct CurveFit {
    pub params: Vec<f64>,
    /// `sqrt(diag(cov))`.
    pub errors: Vec<f64>,
    /// `(JᵀJ)⁻¹ · SSR / (m − p)` at the solution.
    pub covariance: DMatrix<f64>,
    /// `½ Σ r²` at the solution.
    pub cost: f64,
    pub iterations: usize,
}

/// Adaptive damping schedule driven by the gain ratio of each step.
struct AdaptiveLm {
    lambda: f64,
    factor: f64,
    min_lambda: f64,
    max_lambda: f64,
}

impl AdaptiveLm {
    fn new(initial: f64, factor: f64) -> Self {
        Self {
            lambda: initial,
            factor: factor.max(1.0 + 1e-6),
            min_lambda: 1e-12,
            max_lambda: 1e12,
        }
    }

    fn update(&mut self, rho: f64) {
        if rho > 0.75 {
            self.lambda = (self.lambda / self.factor).max(self.min_lambda);
        } else if rho > 0.25 {
            self.lambda = (self.lambda / self.factor.sqrt()).max(self.min_lambda);
        } else if rho < 0.0 {
            self.reject();
        }
    }

    fn reject(&mut self) {
        self.lambda = (self.lambda * self.factor).min(self.max_lambda);
    }

    fn is_stuck(&self) -> bool {
        self.lambda >= self.max_lambda * 0.99
    }
}

fn residuals<M: CurveModel + ?Sized>(
    model: &M,
    xs: &[f64],
    ys: &[f64],
    params: &DVector<f64>,
) -> DVector<f64> {
    let p = params.as_slice();
    DVector::from_iterator(
        xs.len(),
        xs.iter().zip(ys).map(|(&x, &y)| y - model.value(x, p)),
    )
}

fn jacobian<M: CurveModel + ?Sized>(model: &M, xs: &[f64], params: &DVector<f64>) -> DMatrix<f64> {
    let n_params = params.len();
    let mut jac = DMatrix::zeros(xs.len(), n_params);
    let mut row = vec![0.0; n_params];
    for (i, &x) in xs.iter().enumerate() {
        model.gradient(x, params.as_slice(), &mut row);
        for (j, g) in row.iter().enumerate() {
            jac[(i, j)] = *g;
        }
    }
    jac
}

/// Fit `model` to the samples `(xs, ys)` starting from `initial`.
///
/// Returns [`LsqError::MaxIterations`] when no stopping criterion fires
/// within the budget. A damping parameter that saturates without further
/// progress is treated as convergence to a (possibly bound-constrained)
/// stationary point.
pub fn fit_curve<M: CurveModel + ?Sized>(
    model: &M,
    xs: &[f64],
    ys: &[f64],
    initial: &[f64],
    bounds: Option<&ParameterBounds>,
    options: &LmOptions,
) -> Result<CurveFit, LsqError> {
    let n_params = model.parameter_count();
    let m = xs.len();
    if ys.len() != m {
        return Err(LsqError::Dimension(format!("{} xs vs {} ys", m, ys.len())));
    }
    if initial.len() != n_params {
        return Err(LsqError::Dimension(format!(
            "initial guess has {} entries, model needs {}",
            initial.len(),
            n_params
        )));
    }
    if let Some(b) = bounds {
        if b.len() != n_params {
            return Err(LsqError::Dimension(format!(
                "bounds have {} entries, model needs {}",
                b.len(),
                n_params
            )));
        }
    }
    if m <= n_params {
        return Err(LsqError::TooFewSamples {
            samples: m,
            params: n_params,
        });
    }
    if xs.iter().chain(ys).chain(initial).any(|v| !v.is_finite()) {
        return Err(LsqError::NonFinite);
    }

    let mut params = DVector::from_column_slice(initial);
    if let Some(b) = bounds {
        b.project(&mut params);
    }
    let mut r = residuals(model, xs, ys, &params);
    let mut cost = 0.5 * r.norm_squared();
    if !cost.is_finite() {
        return Err(LsqError::NonFinite);
    }

    let mut damping = AdaptiveLm::new(options.initial_lambda, options.lambda_factor);
    let mut jac = jacobian(model, xs, &params);
    let mut converged = false;
    let mut iterations = 0usize;

    while iterations < options.max_iterations {
        iterations += 1;
        let jtj = jac.tr_mul(&jac);
        let g = jac.tr_mul(&r);
        if g.amax() <= options.gtol {
            converged = true;
            break;
        }

        let mut lhs = jtj.clone();
        for i in 0..n_params {
            lhs[(i, i)] += damping.lambda * jtj[(i, i)].max(1e-12);
        }
        let Some(chol) = lhs.cholesky() else {
            damping.reject();
            if damping.is_stuck() {
                converged = true;
                break;
            }
            continue;
        };
        let delta = chol.solve(&g);

        let mut candidate = &params + &delta;
        if let Some(b) = bounds {
            b.project(&mut candidate);
        }
        let step = &candidate - &params;
        let r_new = residuals(model, xs, ys, &candidate);
        let cost_new = 0.5 * r_new.norm_squared();

        // Predicted reduction of the linearized model for the projected step.
        let j_step = &jac * &step;
        let predicted = step.dot(&g) - 0.5 * j_step.norm_squared();
        let actual = cost - cost_new;
        let rho = if predicted > 0.0 { actual / predicted } else { -1.0 };

        if !cost_new.is_finite() || actual <= 0.0 {
            damping.reject();
            if damping.is_stuck() {
                converged = true;
                break;
            }
            continue;
        }

        damping.update(rho);
        params = candidate;
        r = r_new;
        let previous = cost;
        cost = cost_new;
        jac = jacobian(model, xs, &params);

        let step_small = step.norm() <= options.xtol * (params.norm() + options.xtol);
        let cost_flat = previous - cost <= options.ftol * previous.max(f64::MIN_POSITIVE);
        if step_small || cost_flat {
            converged = true;
            break;
        }
    }

    if !converged {
        debug!("fit_curve: no convergence after {} iterations", iterations);
        return Err(LsqError::MaxIterations(iterations));
    }
    if params.iter().any(|v| !v.is_finite()) {
        return Err(LsqError::NonFinite);
    }

    let jtj = jac.tr_mul(&jac);
    let inverse = jtj
        .cholesky()
        .map(|c| c.inverse())
        .ok_or(LsqError::SingularJacobian)?;
    let dof = (m - n_params) as f64;
    let covariance = inverse * (2.0 * cost / dof);
    let errors: Vec<f64> = covariance.diagonal().iter().map(|v| v.max(0.0).sqrt()).collect();
    if errors.iter().any(|e| !e.is_finite()) {
        return Err(LsqError::NonFinite);
    }

    Ok(CurveFit {
        params: params.iter().copied().collect(),
        errors,
        covariance,
        cost,
        iterations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Line;

    impl CurveModel for Line {
        fn parameter_count(&self) -> usize {
            2
        }
        fn value(&self, x: f64, p: &[f64]) -> f64 {
            p[0] * x + p[1]
        }
        fn gradient(&self, x: f64, _p: &[f64], out: &mut [f64]) {
            out[0] = x;
            out[1] = 1.0;
        }
    }

    struct Exponential;

    impl CurveModel for Exponential {
        fn parameter_count(&self) -> usize {
            2
        }
        fn value(&self, x: f64, p: &[f64]) -> f64 {
            p[0] * (p[1] * x).exp()
        }
        fn gradient(&self, x: f64, p: &[f64], out: &mut [f64]) {
            let e = (p[1] * x).exp();
            out[0] = e;
            out[1] = p[0] * x * e;
        }
    }

    #[test]
    fn recovers_exponential_decay() {
        let xs: Vec<f64> = (0..30).map(|i| i as f64 * 0.1).collect();
        let ys: Vec<f64> = xs.iter().map(|x| 2.5 * (-1.3 * x).exp()).collect();
        let fit = fit_curve(&Exponential, &xs, &ys, &[1.0, -0.5], None, &LmOptions::default())
            .unwrap();
        assert!((fit.params[0] - 2.5).abs() < 1e-6);
        assert!((fit.params[1] + 1.3).abs() < 1e-6);
        assert!(fit.errors.iter().all(|e| *e < 1e-6));
    }

    #[test]
    fn line_errors_match_closed_form() {
        let xs = [0.0, 1.0, 2.0, 3.0];
        let ys = [0.1, 0.9, 2.1, 2.9];
        let fit = fit_curve(&Line, &xs, &ys, &[0.0, 0.0], None, &LmOptions::default()).unwrap();
        // Ordinary least squares: slope 0.96, intercept 0.06, SSR 0.032.
        assert!((fit.params[0] - 0.96).abs() < 1e-9);
        assert!((fit.params[1] - 0.06).abs() < 1e-9);
        let s2: f64 = 0.032 / 2.0;
        let slope_var = s2 / 5.0;
        assert!((fit.errors[0] - slope_var.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn bounds_clamp_the_solution() {
        let xs = [0.0, 1.0, 2.0, 3.0];
        let ys = [0.0, 2.0, 4.0, 6.0];
        let bounds = ParameterBounds::new(vec![0.0, -1.0], vec![1.0, 1.0]).unwrap();
        let fit = fit_curve(&Line, &xs, &ys, &[0.5, 0.0], Some(&bounds), &LmOptions::default())
            .unwrap();
        assert!((fit.params[0] - 1.0).abs() < 1e-12);
        assert!(fit.params[1] <= 1.0 + 1e-12);
    }

    #[test]
    fn rejects_underdetermined_problems() {
        let err = fit_curve(&Line, &[0.0, 1.0], &[0.0, 1.0], &[0.0, 0.0], None, &LmOptions::default())
            .unwrap_err();
        assert_eq!(err, LsqError::TooFewSamples { samples: 2, params: 2 });
    }

    #[test]
    fn zero_jacobian_column_is_singular() {
        let xs = [0.0, 1.0, 2.0];
        // Amplitude zero makes the rate column identically zero.
        let err = fit_curve(&Exponential, &xs, &[0.0; 3], &[0.0, 1.0], None, &LmOptions::default())
            .unwrap_err();
        assert_eq!(err, LsqError::SingularJacobian);
    }

    #[test]
    fn non_finite_samples_are_rejected() {
        let err = fit_curve(
            &Line,
            &[0.0, 1.0, 2.0],
            &[0.0, f64::NAN, 1.0],
            &[0.0, 0.0],
            None,
            &LmOptions::default(),
        )
        .unwrap_err();
        assert_eq!(err, LsqError::NonFinite);
    }
}
