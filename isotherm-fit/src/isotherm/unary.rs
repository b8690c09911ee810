use faer::Mat;

use super::{DEFAULT_H_STAR, DEFAULT_Q_M_STAR, IsothermModel, guess_a};
use crate::{
    InputError, LangmuirParams, LeastSquaresProblem, PhysicalLangmuir, ReferenceState,
    UnaryObservations, Warning, params::logistic, warnings,
};

/// Temperature-dependent single-component Langmuir isotherm,
/// `θ = q_m*·K/(1 + K)` with `K = exp(A − H*/T*)·f*`.
#[derive(Debug, Clone)]
pub struct LangmuirUnary {
    name: String,
    observations: UnaryObservations,
    reference: ReferenceState,
    fugacity_star: Vec<f64>,
    temperature_star: Vec<f64>,
    theta: Vec<f64>,
    params: LangmuirParams,
}

impl LangmuirUnary {
    /// Model these observations, with references taken from the largest observed values.
    pub fn new(observations: UnaryObservations) -> Result<Self, InputError> {
        if observations.all_zero_fugacity() {
            return Err(InputError::IllPosed);
        }
        let reference = ReferenceState::from_unary(&observations)?;
        Self::with_reference(observations, reference)
    }

    /// Model these observations with explicit references.
    pub fn with_reference(
        observations: UnaryObservations,
        reference: ReferenceState,
    ) -> Result<Self, InputError> {
        if observations.all_zero_fugacity() {
            return Err(InputError::IllPosed);
        }
        let fugacity_star = observations
            .fugacity()
            .iter()
            .map(|&f| reference.fugacity_star(f))
            .collect();
        let temperature_star = observations
            .temperature()
            .iter()
            .map(|&t| reference.temperature_star(t))
            .collect();
        let theta = observations
            .loading()
            .iter()
            .map(|&q| reference.theta(q))
            .collect();
        let mut model = Self {
            name: "Langmuir".to_owned(),
            observations,
            reference,
            fugacity_star,
            temperature_star,
            theta,
            params: LangmuirParams::new(DEFAULT_H_STAR, 0.0, DEFAULT_Q_M_STAR),
        };
        model.params = model.initial_guess();
        Ok(model)
    }

    /// Label the model, e.g. with the species it describes.
    pub fn with_name(self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self
        }
    }

    /// The data being fit.
    pub fn observations(&self) -> &UnaryObservations {
        &self.observations
    }

    /// Predicted loading at a fugacity (Pa) and temperature (K), at the current parameters.
    pub fn evaluate(&self, fugacity: f64, temperature: f64) -> f64 {
        self.reference.loading(self.evaluate_dimensionless(
            self.reference.fugacity_star(fugacity),
            self.reference.temperature_star(temperature),
        ))
    }

    /// Predicted θ at a dimensionless fugacity and temperature.
    pub fn evaluate_dimensionless(&self, fugacity_star: f64, temperature_star: f64) -> f64 {
        self.params.theta(fugacity_star, temperature_star)
    }

    /// Predicted loading at every observation, in the data's units.
    pub fn predicted_loadings(&self) -> Vec<f64> {
        self.fugacity_star
            .iter()
            .zip(&self.temperature_star)
            .map(|(&f, &t)| self.reference.loading(self.params.theta(f, t)))
            .collect()
    }

    /// Observed loading at every observation.
    pub fn observed_loadings(&self) -> &[f64] {
        self.observations.loading()
    }
}

impl LeastSquaresProblem for LangmuirUnary {
    fn num_params(&self) -> usize {
        LangmuirParams::LEN
    }

    fn num_residuals(&self) -> usize {
        self.theta.len()
    }

    fn residual(&self, x: &[f64], out: &mut [f64]) {
        let params = LangmuirParams::from_slice(x);
        for (k, r) in out.iter_mut().enumerate() {
            *r = params.theta(self.fugacity_star[k], self.temperature_star[k]) - self.theta[k];
        }
    }

    fn refresh_jacobian(&self, x: &[f64], jacobian: &mut Mat<f64>) {
        let params = LangmuirParams::from_slice(x);
        for (k, (&f, &t)) in self
            .fugacity_star
            .iter()
            .zip(&self.temperature_star)
            .enumerate()
        {
            // θ = q·s(z) with s the logistic function, and s' = s(1 − s).
            let s = logistic(params.ln_affinity(f, t));
            let dtheta_dz = params.q_m_star * s * (1.0 - s);
            jacobian[(k, 0)] = -dtheta_dz / t;
            jacobian[(k, 1)] = dtheta_dz;
            jacobian[(k, 2)] = s;
        }
    }

    fn project(&self, x: &mut [f64]) {
        x[2] = libm::fmax(x[2], 0.0);
    }
}

impl IsothermModel for LangmuirUnary {
    type Params = LangmuirParams;
    type Physical = PhysicalLangmuir;

    fn name(&self) -> &str {
        &self.name
    }

    fn reference(&self) -> &ReferenceState {
        &self.reference
    }

    fn params(&self) -> LangmuirParams {
        self.params
    }

    fn set_params(&mut self, params: LangmuirParams) {
        self.params = params;
    }

    fn physical_params(&self) -> PhysicalLangmuir {
        self.params.to_physical(&self.reference)
    }

    fn initial_guess(&self) -> LangmuirParams {
        LangmuirParams::new(
            DEFAULT_H_STAR,
            guess_a(DEFAULT_H_STAR, &self.fugacity_star, &self.temperature_star),
            DEFAULT_Q_M_STAR,
        )
    }

    #[mutants::skip]
    fn parameter_names(&self) -> Vec<String> {
        ["H*", "A", "q_m*"].map(String::from).to_vec()
    }

    fn observed_thetas(&self) -> Vec<f64> {
        self.theta.clone()
    }

    fn lint(&self) -> Vec<Warning> {
        warnings::lint_unary(&self.observations, LangmuirParams::LEN)
    }

    fn to_vector(params: LangmuirParams) -> Vec<f64> {
        params.to_array().to_vec()
    }

    fn from_vector(x: &[f64]) -> LangmuirParams {
        LangmuirParams::from_slice(x)
    }

    fn saturation_indices(&self) -> Vec<usize> {
        vec![2]
    }
}
