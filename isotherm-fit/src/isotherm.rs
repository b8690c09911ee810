//! Isotherm models.
//!
//! Every model maps dimensionless state points to dimensionless loadings θ,
//! and is fit by least squares on `θ_predicted − θ_observed`.
//! [`LangmuirUnary`] and [`LangmuirBinary`] share the Arrhenius temperature
//! dependence and the reference-state transform. They differ in functional form
//! and in how many parameters they have.

use crate::{
    Comparison, Config, FailureOutcome, FitOutcome, LeastSquaresProblem, ReferenceState, Warning,
    fit, fit_with_comparison,
};

mod binary;
mod unary;

pub use binary::LangmuirBinary;
pub use unary::LangmuirUnary;

/// Starting enthalpy: a heat of adsorption of about 10·R·T_ref, typical for physisorption.
pub(crate) const DEFAULT_H_STAR: f64 = -10.0;
/// Starting saturation loading: about the largest loading observed.
pub(crate) const DEFAULT_Q_M_STAR: f64 = 1.0;
/// Starting log pre-exponential factor, when the data says nothing about it.
pub(crate) const DEFAULT_A: f64 = -1.0;

/// What every isotherm model can do.
pub trait IsothermModel: LeastSquaresProblem {
    /// Dimensionless parameters, which the solver fits.
    type Params: Copy + std::fmt::Debug + std::fmt::Display;
    /// The same parameters in physical units.
    type Physical: Copy + std::fmt::Debug + std::fmt::Display;

    /// Label used in reports and logs.
    fn name(&self) -> &str;

    /// References used for the dimensionless transform.
    fn reference(&self) -> &ReferenceState;

    /// Current dimensionless parameters.
    /// Before solving, these are the starting point for the fit.
    fn params(&self) -> Self::Params;

    /// Overwrite the current parameters, e.g. to seed a fit.
    fn set_params(&mut self, params: Self::Params);

    /// Current parameters in physical units.
    fn physical_params(&self) -> Self::Physical;

    /// A starting point derived from the data.
    fn initial_guess(&self) -> Self::Params;

    /// Label of each entry in the parameter vector.
    fn parameter_names(&self) -> Vec<String>;

    /// Observed dimensionless loadings, in the same order as the residuals.
    fn observed_thetas(&self) -> Vec<f64>;

    /// Data problems which could make the fit unreliable.
    fn lint(&self) -> Vec<Warning>;

    /// Flatten parameters into the vector the solver moves.
    fn to_vector(params: Self::Params) -> Vec<f64>;

    /// Inverse of [`IsothermModel::to_vector`].
    fn from_vector(x: &[f64]) -> Self::Params;

    /// Which entries of the parameter vector are saturation loadings (bounded below by zero).
    fn saturation_indices(&self) -> Vec<usize>;

    /// `θ_predicted − θ_observed` at the current parameters.
    fn residuals(&self) -> Vec<f64> {
        let mut r = vec![0.0; self.num_residuals()];
        self.residual(&Self::to_vector(self.params()), &mut r);
        r
    }

    /// Predicted dimensionless loadings at the current parameters.
    fn predicted_thetas(&self) -> Vec<f64> {
        self.residuals()
            .into_iter()
            .zip(self.observed_thetas())
            .map(|(r, theta)| r + theta)
            .collect()
    }

    /// Sum of squared dimensionless residuals at the current parameters.
    fn objective(&self) -> f64 {
        self.objective_at(&Self::to_vector(self.params()))
    }

    /// Coefficient of determination of the dimensionless loadings at the current parameters.
    fn r_squared(&self) -> f64 {
        r_squared(&self.observed_thetas(), &self.predicted_thetas())
    }

    /// Fit the parameters, starting from the current ones.
    /// On success the model keeps the fitted parameters. On failure it keeps the
    /// last iterate, so it can be inspected.
    fn solve(
        &mut self,
        config: Config,
    ) -> Result<FitOutcome<Self::Params, Self::Physical>, FailureOutcome<Self::Params>>
    where
        Self: Sized,
    {
        fit(self, config)
    }

    /// Like [`IsothermModel::solve`] but also fits with the alternate method,
    /// from the same starting point, to cross-check the result.
    /// The model keeps the primary method's result.
    fn solve_with_comparison(
        &mut self,
        config: Config,
    ) -> Result<Comparison<Self::Params, Self::Physical>, FailureOutcome<Self::Params>>
    where
        Self: Sized,
    {
        fit_with_comparison(self, config)
    }
}

/// `1 − SS_res/SS_tot`.
/// Undefined (NaN) when every observation is the same, because then `SS_tot` is zero.
pub(crate) fn r_squared(observed: &[f64], predicted: &[f64]) -> f64 {
    if observed.is_empty() {
        return f64::NAN;
    }
    let mean = observed.iter().sum::<f64>() / observed.len() as f64;
    let ss_tot: f64 = observed.iter().map(|y| (y - mean) * (y - mean)).sum();
    let ss_res: f64 = observed
        .iter()
        .zip(predicted)
        .map(|(y, p)| (y - p) * (y - p))
        .sum();
    if ss_tot == 0.0 {
        return f64::NAN;
    }
    1.0 - ss_res / ss_tot
}

/// Starting log pre-exponential factor: puts `ln K` at zero, on average,
/// over the points with non-zero fugacity. That keeps the isotherm away from
/// its flat empty and saturated limits, where the Jacobian vanishes.
pub(crate) fn guess_a(h_star: f64, fugacity_star: &[f64], temperature_star: &[f64]) -> f64 {
    let (sum, count) = fugacity_star
        .iter()
        .zip(temperature_star)
        .filter(|(f, _)| **f > 0.0)
        .fold((0.0, 0usize), |(sum, count), (f, t)| {
            (sum + h_star / t - libm::log(*f), count + 1)
        });
    if count == 0 {
        DEFAULT_A
    } else {
        sum / count as f64
    }
}
