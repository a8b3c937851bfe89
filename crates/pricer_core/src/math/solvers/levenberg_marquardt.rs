//! Levenberg-Marquardt nonlinear least-squares solver with box constraints.
//!
//! # Algorithm
//!
//! Each iteration solves the damped normal equations
//!
//! ```text
//! (J^T J + λI) δ = -J^T r
//! p_{n+1} = Π(p_n + δ)
//! ```
//!
//! where:
//! - `J` is the forward-difference Jacobian of the residuals
//! - `r` is the residual vector
//! - `λ` is the damping factor (shrunk on accepted steps, grown on rejected ones)
//! - `Π` projects onto the parameter box
//!
//! Near an upper bound the Jacobian switches to a backward difference so that
//! residuals are never evaluated outside the box.
//!
//! # Example
//!
//! ```
//! use pricer_core::math::solvers::{LevenbergMarquardtSolver, LMConfig};
//! use pricer_core::traits::calibration::ParameterBounds;
//!
//! // Unconstrained minimum at p = 3, box caps it at 2
//! let residuals = |p: &[f64]| vec![p[0] - 3.0];
//! let bounds = [ParameterBounds::new(0.0, 2.0)];
//!
//! let solver = LevenbergMarquardtSolver::new(LMConfig::default());
//! let result = solver.solve_bounded(residuals, vec![1.0], &bounds).unwrap();
//! assert!((result.params[0] - 2.0).abs() < 1e-12);
//! ```

use std::time::{Duration, Instant};

use tracing::trace;

use crate::traits::calibration::ParameterBounds;
use crate::types::SolverError;

/// Configuration for Levenberg-Marquardt solver.
///
/// # Fields
///
/// * `tolerance` - Convergence tolerance on the residual norm and on the
///   relative decrease of the sum of squares after an accepted step
/// * `max_iterations` - Maximum number of iterations
/// * `initial_lambda` - Initial damping factor
/// * `lambda_up` / `lambda_down` - Damping adjustment factors
/// * `min_lambda` / `max_lambda` - Damping limits
/// * `param_tolerance` - Relative step size treated as stationary
/// * `max_duration` - Optional wall-clock budget
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LMConfig {
    /// Convergence tolerance for residual norm and relative residual change.
    pub tolerance: f64,
    /// Maximum number of iterations.
    pub max_iterations: usize,
    /// Initial damping factor.
    pub initial_lambda: f64,
    /// Factor to increase lambda on rejected step.
    pub lambda_up: f64,
    /// Factor to decrease lambda on accepted step.
    pub lambda_down: f64,
    /// Minimum damping factor.
    pub min_lambda: f64,
    /// Maximum damping factor.
    pub max_lambda: f64,
    /// Tolerance for parameter change convergence.
    pub param_tolerance: f64,
    /// Wall-clock budget; exhaustion is an error, not a non-converged result.
    pub max_duration: Option<Duration>,
}

impl Default for LMConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-10,
            max_iterations: 100,
            initial_lambda: 1e-3,
            lambda_up: 10.0,
            lambda_down: 0.1,
            min_lambda: 1e-10,
            max_lambda: 1e10,
            param_tolerance: 1e-10,
            max_duration: None,
        }
    }
}

impl LMConfig {
    /// Create a new LM configuration.
    pub fn new(tolerance: f64, max_iterations: usize) -> Self {
        Self {
            tolerance,
            max_iterations,
            ..Default::default()
        }
    }

    /// Set a wall-clock budget.
    pub fn with_max_duration(mut self, budget: Duration) -> Self {
        self.max_duration = Some(budget);
        self
    }
}

/// Result of Levenberg-Marquardt optimization.
#[derive(Debug, Clone, PartialEq)]
pub struct LMResult {
    /// Final optimized parameters.
    pub params: Vec<f64>,
    /// Final residual sum of squares.
    pub residual_ss: f64,
    /// Number of iterations performed.
    pub iterations: usize,
    /// Whether convergence was achieved.
    pub converged: bool,
    /// Final lambda value.
    pub final_lambda: f64,
}

impl LMResult {
    /// Create a new LM result.
    pub fn new(
        params: Vec<f64>,
        residual_ss: f64,
        iterations: usize,
        converged: bool,
        final_lambda: f64,
    ) -> Self {
        Self {
            params,
            residual_ss,
            iterations,
            converged,
            final_lambda,
        }
    }

    /// Root mean square error over `n_observations` residuals.
    pub fn rmse(&self, n_observations: usize) -> f64 {
        if n_observations == 0 {
            return 0.0;
        }
        (self.residual_ss / n_observations as f64).sqrt()
    }
}

/// Levenberg-Marquardt nonlinear least-squares solver.
///
/// Solves
/// ```text
/// min_p ||f(p)||^2   subject to  lo_i <= p_i <= hi_i
/// ```
///
/// The iteration is fully deterministic: identical inputs give bit-identical
/// results.
#[derive(Debug, Clone)]
pub struct LevenbergMarquardtSolver {
    config: LMConfig,
}

impl LevenbergMarquardtSolver {
    /// Create a new LM solver with the given configuration.
    pub fn new(config: LMConfig) -> Self {
        Self { config }
    }

    /// Create a solver with default configuration.
    pub fn with_defaults() -> Self {
        Self {
            config: LMConfig::default(),
        }
    }

    /// Get the solver configuration.
    pub fn config(&self) -> &LMConfig {
        &self.config
    }

    /// Solve the unconstrained problem.
    pub fn solve<F>(&self, residuals: F, initial_params: Vec<f64>) -> Result<LMResult, SolverError>
    where
        F: Fn(&[f64]) -> Vec<f64>,
    {
        let bounds = vec![ParameterBounds::unbounded(); initial_params.len()];
        self.solve_bounded(residuals, initial_params, &bounds)
    }

    /// Solve the box-constrained problem.
    ///
    /// The initial guess is projected onto the box before the first residual
    /// evaluation.
    ///
    /// # Returns
    ///
    /// * `Ok(LMResult)` - Final state; `converged` is false when the iteration
    ///   limit was reached first
    /// * `Err(SolverError)` - Invalid bounds, non-finite initial residuals, or
    ///   wall-clock budget exhausted
    pub fn solve_bounded<F>(
        &self,
        residuals: F,
        initial_params: Vec<f64>,
        bounds: &[ParameterBounds],
    ) -> Result<LMResult, SolverError>
    where
        F: Fn(&[f64]) -> Vec<f64>,
    {
        let n_params = initial_params.len();
        if n_params == 0 {
            return Err(SolverError::NumericalInstability(
                "Empty parameter vector".to_string(),
            ));
        }
        if bounds.len() != n_params {
            return Err(SolverError::DimensionMismatch {
                expected: n_params,
                actual: bounds.len(),
            });
        }
        for (index, b) in bounds.iter().enumerate() {
            if !b.is_valid() {
                return Err(SolverError::InvalidBounds {
                    index,
                    min: b.min,
                    max: b.max,
                });
            }
        }

        let started = Instant::now();
        let mut params = project(&initial_params, bounds);
        let mut lambda = self.config.initial_lambda;

        let mut r = residuals(&params);
        if r.is_empty() {
            return Err(SolverError::NumericalInstability(
                "Empty residual vector".to_string(),
            ));
        }
        let mut ss = sum_of_squares(&r);
        if !ss.is_finite() {
            return Err(SolverError::NumericalInstability(
                "Non-finite residuals at initial parameters".to_string(),
            ));
        }

        for iteration in 0..self.config.max_iterations {
            if let Some(budget) = self.config.max_duration {
                if started.elapsed() >= budget {
                    return Err(SolverError::BudgetExhausted {
                        iterations: iteration,
                    });
                }
            }

            if ss.sqrt() < self.config.tolerance {
                return Ok(LMResult::new(params, ss, iteration, true, lambda));
            }

            let jacobian = compute_jacobian(&residuals, &params, &r, bounds);

            let delta = match solve_normal_equations(&jacobian, &r, lambda, n_params) {
                Some(d) => d,
                None => {
                    lambda = (lambda * self.config.lambda_up).min(self.config.max_lambda);
                    continue;
                }
            };

            let trial: Vec<f64> = params
                .iter()
                .zip(&delta)
                .zip(bounds)
                .map(|((p, d), b)| b.clamp(p + d))
                .collect();

            // Step length after projection; zero when pinned against the box.
            let step = params
                .iter()
                .zip(&trial)
                .map(|(p, t)| (t - p) * (t - p))
                .sum::<f64>()
                .sqrt();
            let param_norm = params.iter().map(|p| p * p).sum::<f64>().sqrt().max(1.0);
            if step / param_norm < self.config.param_tolerance {
                return Ok(LMResult::new(params, ss, iteration, true, lambda));
            }

            let trial_r = residuals(&trial);
            let trial_ss = sum_of_squares(&trial_r);
            trace!(iteration, lambda, ss, trial_ss, "levenberg-marquardt step");

            if trial_ss < ss {
                let decrease = ss - trial_ss;
                params = trial;
                r = trial_r;
                ss = trial_ss;
                lambda = (lambda * self.config.lambda_down).max(self.config.min_lambda);
                if decrease <= self.config.tolerance * ss.max(f64::MIN_POSITIVE) {
                    return Ok(LMResult::new(params, ss, iteration + 1, true, lambda));
                }
            } else {
                lambda = (lambda * self.config.lambda_up).min(self.config.max_lambda);
            }
        }

        Ok(LMResult::new(
            params,
            ss,
            self.config.max_iterations,
            false,
            lambda,
        ))
    }
}

/// Project a parameter vector onto the box.
fn project(params: &[f64], bounds: &[ParameterBounds]) -> Vec<f64> {
    params.iter().zip(bounds).map(|(p, b)| b.clamp(*p)).collect()
}

/// Solve the normal equations (J^T J + λI) δ = -J^T r
fn solve_normal_equations(
    jacobian: &[Vec<f64>],
    residuals: &[f64],
    lambda: f64,
    n_params: usize,
) -> Option<Vec<f64>> {
    let mut jtj = vec![vec![0.0; n_params]; n_params];
    for i in 0..n_params {
        for j in 0..n_params {
            jtj[i][j] = jacobian.iter().map(|row| row[i] * row[j]).sum();
        }
        jtj[i][i] += lambda;
    }

    let jtr: Vec<f64> = (0..n_params)
        .map(|i| {
            -jacobian
                .iter()
                .zip(residuals)
                .map(|(row, r)| row[i] * r)
                .sum::<f64>()
        })
        .collect();

    solve_cholesky(&jtj, &jtr)
}

/// Forward-difference Jacobian, backward at the upper bound.
fn compute_jacobian<F>(
    residuals: &F,
    params: &[f64],
    r0: &[f64],
    bounds: &[ParameterBounds],
) -> Vec<Vec<f64>>
where
    F: Fn(&[f64]) -> Vec<f64>,
{
    let n_params = params.len();
    let n_residuals = r0.len();
    let eps = 1e-8;

    let mut jacobian = vec![vec![0.0; n_params]; n_residuals];

    for j in 0..n_params {
        let mut h = eps * params[j].abs().max(1.0);
        if params[j] + h > bounds[j].max {
            h = -h;
        }

        let mut shifted = params.to_vec();
        shifted[j] += h;
        let r_shift = residuals(&shifted);

        for (row, (rs, r)) in jacobian.iter_mut().zip(r_shift.iter().zip(r0)) {
            row[j] = (rs - r) / h;
        }
    }

    jacobian
}

/// Compute sum of squares of a vector, accumulated in index order.
#[inline]
fn sum_of_squares(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum()
}

/// Solve Ax = b using Cholesky decomposition.
fn solve_cholesky(a: &[Vec<f64>], b: &[f64]) -> Option<Vec<f64>> {
    let n = b.len();
    if n == 0 || a.len() != n {
        return None;
    }

    let mut l = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in 0..=i {
            let mut sum = a[i][j];
            for k in 0..j {
                sum -= l[i][k] * l[j][k];
            }
            if i == j {
                if sum <= 0.0 || !sum.is_finite() {
                    return None;
                }
                l[i][j] = sum.sqrt();
            } else {
                l[i][j] = sum / l[j][j];
            }
        }
    }

    let mut y = vec![0.0; n];
    for i in 0..n {
        let mut sum = b[i];
        for j in 0..i {
            sum -= l[i][j] * y[j];
        }
        y[i] = sum / l[i][i];
    }

    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let mut sum = y[i];
        for j in (i + 1)..n {
            sum -= l[j][i] * x[j];
        }
        x[i] = sum / l[i][i];
    }

    if x.iter().all(|v| v.is_finite()) {
        Some(x)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    // ========================================
    // LMConfig Tests
    // ========================================

    #[test]
    fn test_config_default() {
        let config = LMConfig::default();
        assert_eq!(config.max_iterations, 100);
        assert!(config.initial_lambda > 0.0);
        assert!(config.max_duration.is_none());
    }

    #[test]
    fn test_config_with_max_duration() {
        let config = LMConfig::new(1e-8, 50).with_max_duration(Duration::from_secs(2));
        assert_eq!(config.max_iterations, 50);
        assert_eq!(config.max_duration, Some(Duration::from_secs(2)));
    }

    #[test]
    fn test_result_rmse() {
        let result = LMResult::new(vec![1.0], 4.0, 10, true, 1e-5);
        assert_relative_eq!(result.rmse(4), 1.0);
        assert_eq!(result.rmse(0), 0.0);
    }

    // ========================================
    // Unconstrained Tests
    // ========================================

    #[test]
    fn test_solve_simple_linear() {
        let residuals = |params: &[f64]| -> Vec<f64> { vec![params[0] - 2.0, params[1] - 3.0] };

        let solver = LevenbergMarquardtSolver::with_defaults();
        let result = solver.solve(residuals, vec![0.0, 0.0]).unwrap();

        assert!(result.converged);
        assert_relative_eq!(result.params[0], 2.0, epsilon = 1e-6);
        assert_relative_eq!(result.params[1], 3.0, epsilon = 1e-6);
    }

    #[test]
    fn test_solve_exponential_fit() {
        let xs = [0.0_f64, 1.0, 2.0, 3.0];
        let ys: Vec<f64> = xs.iter().map(|x| 2.0 * (-0.5 * x).exp()).collect();

        let residuals = |p: &[f64]| -> Vec<f64> {
            xs.iter()
                .zip(&ys)
                .map(|(x, y)| p[0] * (-p[1] * x).exp() - y)
                .collect()
        };

        let solver = LevenbergMarquardtSolver::with_defaults();
        let result = solver.solve(residuals, vec![1.0, 1.0]).unwrap();

        assert!(result.converged);
        assert_relative_eq!(result.params[0], 2.0, epsilon = 1e-5);
        assert_relative_eq!(result.params[1], 0.5, epsilon = 1e-5);
    }

    #[test]
    fn test_solve_already_optimal() {
        let residuals = |params: &[f64]| -> Vec<f64> { vec![params[0] - 5.0] };

        let solver = LevenbergMarquardtSolver::with_defaults();
        let result = solver.solve(residuals, vec![5.0]).unwrap();

        assert!(result.converged);
        assert_eq!(result.iterations, 0);
    }

    #[test]
    fn test_solve_empty_params() {
        let solver = LevenbergMarquardtSolver::with_defaults();
        assert!(solver.solve(|_p: &[f64]| vec![1.0], vec![]).is_err());
    }

    // ========================================
    // Bounded Tests
    // ========================================

    #[test]
    fn test_bounded_solution_pinned_to_upper_bound() {
        let residuals = |p: &[f64]| vec![p[0] - 3.0, p[1] + 1.0];
        let bounds = [ParameterBounds::new(0.0, 2.0), ParameterBounds::new(-5.0, 5.0)];

        let solver = LevenbergMarquardtSolver::with_defaults();
        let result = solver
            .solve_bounded(residuals, vec![1.0, 0.0], &bounds)
            .unwrap();

        assert!(result.converged);
        assert_relative_eq!(result.params[0], 2.0, epsilon = 1e-12);
        assert_relative_eq!(result.params[1], -1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_bounded_initial_guess_projected() {
        let seen_outside = std::cell::Cell::new(false);
        let residuals = |p: &[f64]| {
            if p[0] < 1.0 || p[0] > 5.0 {
                seen_outside.set(true);
            }
            vec![p[0] - 4.0]
        };
        let bounds = [ParameterBounds::new(1.0, 5.0)];

        let solver = LevenbergMarquardtSolver::with_defaults();
        let result = solver.solve_bounded(residuals, vec![10.0], &bounds).unwrap();

        assert!(!seen_outside.get());
        assert_relative_eq!(result.params[0], 4.0, epsilon = 1e-6);
    }

    #[test]
    fn test_invalid_bounds_rejected() {
        let bounds = [ParameterBounds::new(5.0, 1.0)];
        let solver = LevenbergMarquardtSolver::with_defaults();
        let err = solver
            .solve_bounded(|p: &[f64]| vec![p[0]], vec![2.0], &bounds)
            .unwrap_err();
        assert!(matches!(err, SolverError::InvalidBounds { index: 0, .. }));
    }

    #[test]
    fn test_bounds_dimension_mismatch() {
        let solver = LevenbergMarquardtSolver::with_defaults();
        let err = solver
            .solve_bounded(|p: &[f64]| vec![p[0]], vec![1.0, 2.0], &[ParameterBounds::unbounded()])
            .unwrap_err();
        assert_eq!(
            err,
            SolverError::DimensionMismatch {
                expected: 2,
                actual: 1
            }
        );
    }

    // ========================================
    // Budget and Determinism Tests
    // ========================================

    #[test]
    fn test_zero_budget_is_exhausted() {
        let config = LMConfig::default().with_max_duration(Duration::ZERO);
        let solver = LevenbergMarquardtSolver::new(config);
        let err = solver
            .solve(|p: &[f64]| vec![p[0] - 1.0], vec![0.0])
            .unwrap_err();
        assert_eq!(err, SolverError::BudgetExhausted { iterations: 0 });
    }

    #[test]
    fn test_iteration_limit_reports_not_converged() {
        let residuals = |p: &[f64]| vec![10.0 * (p[1] - p[0] * p[0]), 1.0 - p[0]];
        let solver = LevenbergMarquardtSolver::new(LMConfig::new(1e-12, 1));
        let result = solver.solve(residuals, vec![-1.2, 1.0]).unwrap();
        assert!(!result.converged);
        assert_eq!(result.iterations, 1);
    }

    #[test]
    fn test_non_finite_initial_residuals() {
        let solver = LevenbergMarquardtSolver::with_defaults();
        let err = solver
            .solve(|_p: &[f64]| vec![f64::NAN], vec![1.0])
            .unwrap_err();
        assert!(matches!(err, SolverError::NumericalInstability(_)));
    }

    #[test]
    fn test_solve_is_deterministic() {
        let residuals = |p: &[f64]| vec![10.0 * (p[1] - p[0] * p[0]), 1.0 - p[0]];
        let solver = LevenbergMarquardtSolver::new(LMConfig::new(1e-12, 200));
        let a = solver.solve(residuals, vec![-1.2, 1.0]).unwrap();
        let b = solver.solve(residuals, vec![-1.2, 1.0]).unwrap();
        assert_eq!(a, b);
    }

    // ========================================
    // Linear Algebra Tests
    // ========================================

    #[test]
    fn test_cholesky_simple() {
        let a = vec![vec![4.0, 2.0], vec![2.0, 2.0]];
        let x = solve_cholesky(&a, &[8.0, 5.0]).unwrap();
        assert_relative_eq!(x[0], 1.5, epsilon = 1e-12);
        assert_relative_eq!(x[1], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_cholesky_non_positive_definite() {
        let a = vec![vec![-1.0, 0.0], vec![0.0, 1.0]];
        assert!(solve_cholesky(&a, &[1.0, 1.0]).is_none());
    }

    #[test]
    fn test_jacobian_switches_to_backward_difference_at_upper_bound() {
        let residuals = |p: &[f64]| {
            assert!(p[0] <= 1.0, "evaluated outside the box");
            vec![p[0] * p[0]]
        };
        let params = [1.0];
        let r0 = residuals(&params);
        let jacobian = compute_jacobian(&residuals, &params, &r0, &[ParameterBounds::new(0.0, 1.0)]);
        assert_relative_eq!(jacobian[0][0], 2.0, epsilon = 1e-6);
    }
}
