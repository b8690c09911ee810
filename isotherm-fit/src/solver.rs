use faer::Mat;

use crate::NonLinearSystemError;

mod levenberg;
mod nelder_mead;

/// Which algorithm minimises the sum of squared residuals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "fuzz", derive(arbitrary::Arbitrary))]
pub enum Method {
    /// Damped Gauss-Newton with an adaptive damping factor. Uses the Jacobian.
    #[default]
    LevenbergMarquardt,
    /// Derivative-free simplex search.
    NelderMead,
}

impl Method {
    /// The method used to cross-check this one.
    pub fn alternate(self) -> Self {
        match self {
            Method::LevenbergMarquardt => Method::NelderMead,
            Method::NelderMead => Method::LevenbergMarquardt,
        }
    }
}

impl std::fmt::Display for Method {
    #[mutants::skip]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Method::LevenbergMarquardt => write!(f, "Levenberg-Marquardt"),
            Method::NelderMead => write!(f, "Nelder-Mead"),
        }
    }
}

/// Solver settings.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "fuzz", derive(arbitrary::Arbitrary))]
pub struct Config {
    /// Which algorithm to run.
    pub method: Method,
    /// Iteration limit for Levenberg-Marquardt.
    pub max_iterations: usize,
    /// Iteration limit for Nelder-Mead, which needs many more, cheaper iterations.
    pub max_simplex_iterations: usize,
    /// Stop when every residual is at most this large.
    pub convergence_tolerance: f64,
    /// Stop when the gradient of the objective is at most this large (infinity norm).
    pub gradient_tolerance: f64,
    /// Stop when a step is this small relative to the parameters.
    pub step_tolerance: f64,
    /// Stop when an accepted step lowers the objective by at most this fraction.
    pub objective_tolerance: f64,
    /// Nelder-Mead stops once the simplex is this small.
    pub simplex_tolerance: f64,
    /// Starting damping factor for Levenberg-Marquardt.
    pub initial_damping: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            method: Method::default(),
            max_iterations: 200,
            max_simplex_iterations: 5000,
            convergence_tolerance: 1e-12,
            gradient_tolerance: 1e-10,
            step_tolerance: 1e-10,
            objective_tolerance: 1e-12,
            simplex_tolerance: 1e-10,
            initial_damping: 1e-3,
        }
    }
}

impl Config {
    /// Same settings, different method.
    pub fn with_method(self, method: Method) -> Self {
        Self { method, ..self }
    }

    /// Same settings, different iteration limit for the chosen method.
    pub fn with_max_iterations(self, max_iterations: usize) -> Self {
        match self.method {
            Method::LevenbergMarquardt => Self {
                max_iterations,
                ..self
            },
            Method::NelderMead => Self {
                max_simplex_iterations: max_iterations,
                ..self
            },
        }
    }
}

/// Why the solver decided it had found the minimum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Every residual was within tolerance, i.e. the data was fit exactly.
    Residual,
    /// The gradient of the objective vanished.
    Gradient,
    /// Steps became negligible compared to the parameters.
    Step,
    /// Steps stopped lowering the objective meaningfully.
    Objective,
    /// The Nelder-Mead simplex collapsed onto a point.
    Simplex,
}

impl std::fmt::Display for Termination {
    #[mutants::skip]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let reason = match self {
            Termination::Residual => "residuals within tolerance",
            Termination::Gradient => "gradient within tolerance",
            Termination::Step => "step size within tolerance",
            Termination::Objective => "objective reduction within tolerance",
            Termination::Simplex => "simplex collapsed",
        };
        write!(f, "{reason}")
    }
}

/// A nonlinear least-squares problem: find `x` minimising `Σ r(x)²`.
///
/// Solvers only see a problem through this trait, so any residual
/// function with a Jacobian can be fit.
pub trait LeastSquaresProblem {
    /// Number of unknowns.
    fn num_params(&self) -> usize;

    /// Number of residuals.
    fn num_residuals(&self) -> usize;

    /// Write the residuals at `x` into `out`, which has [`LeastSquaresProblem::num_residuals`] slots.
    fn residual(&self, x: &[f64], out: &mut [f64]);

    /// Overwrite `jacobian` with `∂r/∂x` at `x`.
    /// It has one row per residual and one column per unknown.
    fn refresh_jacobian(&self, x: &[f64], jacobian: &mut Mat<f64>);

    /// Move `x` onto the feasible set. The default leaves it unbounded.
    fn project(&self, _x: &mut [f64]) {}

    /// Sum of squared residuals at `x`.
    fn objective_at(&self, x: &[f64]) -> f64 {
        let mut r = vec![0.0; self.num_residuals()];
        self.residual(x, &mut r);
        sum_of_squares(&r)
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct SuccessfulSolve {
    pub iterations: usize,
    pub evaluations: usize,
    pub termination: Termination,
}

/// Minimise the problem's objective in place, starting from `x`.
pub(crate) fn minimize<P: LeastSquaresProblem + ?Sized>(
    problem: &P,
    x: &mut [f64],
    config: &Config,
) -> Result<SuccessfulSolve, NonLinearSystemError> {
    if problem.num_params() == 0 || problem.num_residuals() == 0 {
        return Err(NonLinearSystemError::EmptySystemNotAllowed);
    }
    problem.project(x);
    match config.method {
        Method::LevenbergMarquardt => levenberg::solve_levenberg_marquardt(problem, x, config),
        Method::NelderMead => nelder_mead::solve_nelder_mead(problem, x, config),
    }
}

pub(crate) fn sum_of_squares(r: &[f64]) -> f64 {
    r.iter().map(|v| v * v).sum()
}

fn inf_norm<'a>(values: impl IntoIterator<Item = &'a f64>) -> f64 {
    values.into_iter().map(|v| v.abs()).fold(0.0, libm::fmax)
}


#[cfg(test)]
mod tests {
    use super::{test_problems::*, *};
    use crate::tests::assert_close;

    #[test]
    fn both_methods_fit_exact_decay() {
        let problem = Decay::exact(2.0, 0.7);
        for method in [Method::LevenbergMarquardt, Method::NelderMead] {
            let mut x = vec![1.0, 0.1];
            let config = Config::default().with_method(method);
            let solved = minimize(&problem, &mut x, &config).unwrap();
            assert_close(x[0], 2.0, 1e-6);
            assert_close(x[1], 0.7, 1e-6);
            assert!(solved.evaluations >= solved.iterations);
        }
    }

    #[test]
    fn inconsistent_system_finds_least_squares_solution() {
        let mut x = vec![5.0];
        let solved = minimize(&Inconsistent, &mut x, &Config::default()).unwrap();
        assert!(x[0].abs() < 1e-8);
        assert_ne!(solved.termination, Termination::Residual);
    }

    #[test]
    fn iteration_limit_is_reported() {
        let problem = Decay::exact(2.0, 0.7);
        let mut x = vec![1.0, 0.1];
        let config = Config::default().with_max_iterations(1);
        let err = minimize(&problem, &mut x, &config).unwrap_err();
        assert!(matches!(
            err,
            NonLinearSystemError::DidNotConverge { iterations: 1 }
        ));
    }

    #[test]
    fn empty_problem_is_rejected() {
        struct Empty;
        impl LeastSquaresProblem for Empty {
            fn num_params(&self) -> usize {
                0
            }
            fn num_residuals(&self) -> usize {
                0
            }
            fn residual(&self, _x: &[f64], _out: &mut [f64]) {}
            fn refresh_jacobian(&self, _x: &[f64], _jacobian: &mut Mat<f64>) {}
        }
        let err = minimize(&Empty, &mut [], &Config::default()).unwrap_err();
        assert!(matches!(err, NonLinearSystemError::EmptySystemNotAllowed));
    }

    #[test]
    fn alternate_swaps_methods() {
        assert_eq!(Method::LevenbergMarquardt.alternate(), Method::NelderMead);
        assert_eq!(Method::NelderMead.alternate(), Method::LevenbergMarquardt);
        let config = Config::default()
            .with_method(Method::NelderMead)
            .with_max_iterations(7);
        assert_eq!(config.max_simplex_iterations, 7);
        assert_eq!(config.max_iterations, Config::default().max_iterations);
    }
}
