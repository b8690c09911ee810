use crate::{
    BinaryLangmuirParams, FitAnalysis, LangmuirParams, Method, NonLinearSystemError,
    PhysicalBinaryLangmuir, PhysicalLangmuir, ReferenceState, Termination, Warning,
};

/// Data from a successful fit.
#[derive(Debug, Clone)]
#[cfg_attr(not(feature = "unstable-exhaustive"), non_exhaustive)]
pub struct FitOutcome<P, Q> {
    /// Label of the model that was fit.
    pub(crate) name: String,
    /// Which solver found these parameters.
    pub(crate) method: Method,
    /// Fitted dimensionless parameters.
    pub(crate) params: P,
    /// Fitted parameters in physical units.
    pub(crate) physical: Q,
    /// References used for the dimensionless transform.
    pub(crate) reference: ReferenceState,
    /// Label of each entry in `values`.
    pub(crate) parameter_names: Vec<String>,
    /// Fitted parameter vector, as the solver saw it.
    pub(crate) values: Vec<f64>,
    /// Why the solver stopped.
    pub(crate) termination: Termination,
    /// How many solver iterations were required?
    pub(crate) iterations: usize,
    /// How many times were the residuals evaluated?
    pub(crate) evaluations: usize,
    /// Sum of squared dimensionless residuals.
    pub(crate) objective: f64,
    /// Coefficient of determination of the dimensionless loadings.
    pub(crate) r_squared: f64,
    /// `θ_predicted − θ_observed` for each residual.
    pub(crate) residuals: Vec<f64>,
    /// Rank and covariance analysis, if the SVD succeeded.
    pub(crate) analysis: Option<FitAnalysis>,
    /// Anything that went wrong either in the data or in the fit.
    pub(crate) warnings: Vec<Warning>,
}

/// Outcome of fitting a [`crate::LangmuirUnary`].
pub type UnaryFitOutcome = FitOutcome<LangmuirParams, PhysicalLangmuir>;
/// Outcome of fitting a [`crate::LangmuirBinary`].
pub type BinaryFitOutcome = FitOutcome<BinaryLangmuirParams, PhysicalBinaryLangmuir>;

impl<P: Copy, Q: Copy> FitOutcome<P, Q> {
    /// Label of the model that was fit.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Which solver found these parameters.
    pub fn method(&self) -> Method {
        self.method
    }

    /// Fitted dimensionless parameters.
    pub fn params(&self) -> P {
        self.params
    }

    /// Fitted parameters in physical units.
    pub fn physical_params(&self) -> Q {
        self.physical
    }

    /// References used for the dimensionless transform.
    pub fn reference(&self) -> &ReferenceState {
        &self.reference
    }

    /// Label of each fitted parameter, in the order of [`FitOutcome::values`].
    pub fn parameter_names(&self) -> &[String] {
        &self.parameter_names
    }

    /// Fitted dimensionless parameter vector.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Why the solver stopped.
    pub fn termination(&self) -> Termination {
        self.termination
    }

    /// How many solver iterations were required?
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// How many times were the residuals evaluated?
    pub fn evaluations(&self) -> usize {
        self.evaluations
    }

    /// Sum of squared dimensionless residuals.
    pub fn objective(&self) -> f64 {
        self.objective
    }

    /// Coefficient of determination. NaN if every observed loading is the same.
    pub fn r_squared(&self) -> f64 {
        self.r_squared
    }

    /// `θ_predicted − θ_observed` for each residual.
    pub fn residuals(&self) -> &[f64] {
        &self.residuals
    }

    /// Rank and covariance analysis at the solution.
    pub fn analysis(&self) -> Option<&FitAnalysis> {
        self.analysis.as_ref()
    }

    /// Standard errors of the dimensionless parameters, if they could be estimated.
    pub fn standard_errors(&self) -> Option<Vec<f64>> {
        self.analysis.as_ref().and_then(FitAnalysis::standard_errors)
    }

    /// Anything that went wrong either in the data or in the fit.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }
}

/// Multi-line report. Warnings aren't included, callers list them separately.
impl<P: Copy, Q: Copy + std::fmt::Display> std::fmt::Display for FitOutcome<P, Q> {
    #[mutants::skip]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "{}: fit by {} in {} iterations ({} evaluations), {}",
            self.name, self.method, self.iterations, self.evaluations, self.termination
        )?;
        let errors = self.standard_errors();
        let width = self
            .parameter_names
            .iter()
            .map(|n| n.chars().count())
            .max()
            .unwrap_or_default();
        for (k, (name, value)) in self.parameter_names.iter().zip(&self.values).enumerate() {
            write!(f, "  {name:<width$} = {value:>12.6}")?;
            if let Some(error) = errors.as_ref().and_then(|e| e.get(k)) {
                write!(f, " ± {error:.6}")?;
            }
            writeln!(f)?;
        }
        writeln!(f, "  {}", self.physical)?;
        writeln!(f, "  references: {}", self.reference)?;
        write!(
            f,
            "  objective = {:.6e}, R² = {:.6}",
            self.objective, self.r_squared
        )
    }
}

/// Returned when a fit could not converge.
#[derive(Debug)]
#[cfg_attr(not(feature = "unstable-exhaustive"), non_exhaustive)]
pub struct FailureOutcome<P> {
    /// The error that stopped the fit.
    pub error: NonLinearSystemError,
    /// Where the solver was when it gave up.
    pub last_params: P,
    /// Residuals at the last iterate.
    pub residuals: Vec<f64>,
    /// Objective at the last iterate.
    pub objective: f64,
    /// Other warnings which might have contributed,
    /// or might be suboptimal for other reasons.
    pub warnings: Vec<Warning>,
    /// Size of the system.
    pub num_params: usize,
    /// Size of the system.
    pub num_residuals: usize,
}

impl<P: Copy> FailureOutcome<P> {
    /// The error that stopped the fit.
    pub fn error(&self) -> &NonLinearSystemError {
        &self.error
    }

    /// Where the solver was when it gave up.
    pub fn last_params(&self) -> P {
        self.last_params
    }

    /// Residuals at the last iterate.
    pub fn residuals(&self) -> &[f64] {
        &self.residuals
    }

    /// Objective at the last iterate.
    pub fn objective(&self) -> f64 {
        self.objective
    }

    /// Other warnings which might have contributed,
    /// or might be suboptimal for other reasons.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Size of the system.
    pub fn num_params(&self) -> usize {
        self.num_params
    }

    /// Size of the system.
    pub fn num_residuals(&self) -> usize {
        self.num_residuals
    }
}

impl<P: std::fmt::Display> std::fmt::Display for FailureOutcome<P> {
    #[mutants::skip]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{}", self.error)?;
        writeln!(f, "  last iterate: {}", self.last_params)?;
        write!(
            f,
            "  objective = {:.6e} over {} residuals and {} parameters",
            self.objective, self.num_residuals, self.num_params
        )
    }
}

impl<P: std::fmt::Debug + std::fmt::Display> std::error::Error for FailureOutcome<P> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// The same fit, run with both solvers from the same starting point.
#[derive(Debug)]
pub struct Comparison<P, Q> {
    /// Result of the configured method. The model keeps these parameters.
    pub primary: FitOutcome<P, Q>,
    /// Result of the other method.
    pub alternate: Result<FitOutcome<P, Q>, FailureOutcome<P>>,
}

impl<P: Copy, Q: Copy> Comparison<P, Q> {
    /// How much higher the alternate method's objective is than the primary's.
    /// Negative if the alternate method did better. None if it failed.
    pub fn objective_gap(&self) -> Option<f64> {
        self.alternate
            .as_ref()
            .ok()
            .map(|alternate| alternate.objective() - self.primary.objective())
    }

    /// True if both methods converged to objectives within `relative_tolerance` of each other.
    pub fn agrees(&self, relative_tolerance: f64) -> bool {
        let scale = libm::fmax(self.primary.objective(), f64::MIN_POSITIVE);
        self.objective_gap()
            .is_some_and(|gap| gap.abs() <= relative_tolerance * scale)
    }
}

impl<P, Q> std::fmt::Display for Comparison<P, Q>
where
    P: Copy + std::fmt::Display,
    Q: Copy + std::fmt::Display,
{
    #[mutants::skip]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{}", self.primary)?;
        match &self.alternate {
            Ok(alternate) => {
                writeln!(f, "{alternate}")?;
                let gap = alternate.objective() - self.primary.objective();
                write!(
                    f,
                    "objective gap ({} − {}) = {gap:.3e}",
                    alternate.method(),
                    self.primary.method()
                )
            }
            Err(failure) => write!(
                f,
                "{} failed: {failure}",
                self.primary.method().alternate()
            ),
        }
    }
}
