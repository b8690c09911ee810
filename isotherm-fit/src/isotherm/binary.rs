use faer::Mat;

use super::{DEFAULT_H_STAR, DEFAULT_Q_M_STAR, IsothermModel, LangmuirUnary, guess_a, r_squared};
use crate::{
    BinaryLangmuirParams, BinaryObservations, InputError, LangmuirParams, LeastSquaresProblem,
    PhysicalBinaryLangmuir, ReferenceState, Species, Warning,
    params::{competitive_fractions, mixture_fugacity},
    warnings,
};

/// Competitive (extended) Langmuir isotherm for a binary mixture.
///
/// Both species compete for the same sites:
/// `θ_i = q_m,i*·K_i/(1 + K_i + K_j)`, and symmetrically for `j`,
/// with `K_s = exp(A_s − H_s*/T*)·f̂_s*` and `f̂` the mixture fugacity.
/// All six parameters are fit together, against both species' loadings.
/// Points where a species' fugacity is below [`crate::UNARY_FUGACITY_THRESHOLD`]
/// treat that species as absent.
#[derive(Debug, Clone)]
pub struct LangmuirBinary {
    name: String,
    observations: BinaryObservations,
    reference: ReferenceState,
    fugacity_star_i: Vec<f64>,
    fugacity_star_j: Vec<f64>,
    temperature_star: Vec<f64>,
    theta_i: Vec<f64>,
    theta_j: Vec<f64>,
    params: BinaryLangmuirParams,
}

impl LangmuirBinary {
    /// Model these observations. The loading and fugacity references are the largest
    /// values over both species, and the temperature reference the largest temperature.
    pub fn new(observations: BinaryObservations) -> Result<Self, InputError> {
        if observations.absent(Species::I) && observations.absent(Species::J) {
            return Err(InputError::IllPosed);
        }
        let reference = ReferenceState::from_binary(&observations)?;
        Self::with_reference(observations, reference)
    }

    /// Model these observations with explicit references.
    pub fn with_reference(
        observations: BinaryObservations,
        reference: ReferenceState,
    ) -> Result<Self, InputError> {
        if observations.absent(Species::I) && observations.absent(Species::J) {
            return Err(InputError::IllPosed);
        }
        let star = |species| -> Vec<f64> {
            observations
                .fugacity(species)
                .iter()
                .map(|&f| mixture_fugacity_star(&reference, f))
                .collect()
        };
        let theta = |species| -> Vec<f64> {
            observations
                .loading(species)
                .iter()
                .map(|&q| reference.theta(q))
                .collect()
        };
        let fugacity_star_i = star(Species::I);
        let fugacity_star_j = star(Species::J);
        let theta_i = theta(Species::I);
        let theta_j = theta(Species::J);
        let temperature_star = observations
            .temperature()
            .iter()
            .map(|&t| reference.temperature_star(t))
            .collect();
        let mut model = Self {
            name: "Binary Langmuir".to_owned(),
            observations,
            reference,
            fugacity_star_i,
            fugacity_star_j,
            temperature_star,
            theta_i,
            theta_j,
            params: BinaryLangmuirParams {
                i: LangmuirParams::new(DEFAULT_H_STAR, 0.0, DEFAULT_Q_M_STAR),
                j: LangmuirParams::new(DEFAULT_H_STAR, 0.0, DEFAULT_Q_M_STAR),
            },
        };
        model.params = model.initial_guess();
        Ok(model)
    }

    /// Label the model, e.g. with the mixture it describes.
    pub fn with_name(self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self
        }
    }

    /// The data being fit.
    pub fn observations(&self) -> &BinaryObservations {
        &self.observations
    }

    /// Start from two unary fits, one per species (the combining rule).
    /// Their references usually differ from this model's, so the parameters
    /// are carried over in physical units.
    pub fn seed_from_unary(
        &mut self,
        unary_i: &LangmuirUnary,
        unary_j: &LangmuirUnary,
    ) -> Result<(), InputError> {
        let seeded = BinaryLangmuirParams::from_unary(
            &unary_i.physical_params(),
            &unary_j.physical_params(),
            &self.reference,
        )?;
        tracing::debug!(model = %self.name, params = %seeded, "seeded from unary fits");
        self.params = seeded;
        Ok(())
    }

    /// Predicted loadings `(q_i, q_j)` at mixture fugacities (Pa) and a temperature (K).
    pub fn evaluate(&self, fugacity_i: f64, fugacity_j: f64, temperature: f64) -> (f64, f64) {
        let (theta_i, theta_j) = self.evaluate_dimensionless(
            mixture_fugacity_star(&self.reference, fugacity_i),
            mixture_fugacity_star(&self.reference, fugacity_j),
            self.reference.temperature_star(temperature),
        );
        (
            self.reference.loading(theta_i),
            self.reference.loading(theta_j),
        )
    }

    /// Predicted `(θ_i, θ_j)` at dimensionless fugacities and temperature.
    pub fn evaluate_dimensionless(
        &self,
        fugacity_star_i: f64,
        fugacity_star_j: f64,
        temperature_star: f64,
    ) -> (f64, f64) {
        self.params
            .thetas(fugacity_star_i, fugacity_star_j, temperature_star)
    }

    /// Predicted loadings of one species at every observation, in the data's units.
    pub fn predicted_loadings(&self, species: Species) -> Vec<f64> {
        (0..self.temperature_star.len())
            .map(|k| {
                let (theta_i, theta_j) = self.params.thetas(
                    self.fugacity_star_i[k],
                    self.fugacity_star_j[k],
                    self.temperature_star[k],
                );
                let theta = match species {
                    Species::I => theta_i,
                    Species::J => theta_j,
                };
                self.reference.loading(theta)
            })
            .collect()
    }

    /// Observed loadings of one species.
    pub fn observed_loadings(&self, species: Species) -> &[f64] {
        self.observations.loading(species)
    }

    /// R² of one species' dimensionless loadings.
    pub fn r_squared_species(&self, species: Species) -> f64 {
        let observed = match species {
            Species::I => &self.theta_i,
            Species::J => &self.theta_j,
        };
        let predicted: Vec<f64> = self
            .predicted_loadings(species)
            .into_iter()
            .map(|q| self.reference.theta(q))
            .collect();
        r_squared(observed, &predicted)
    }
}

/// Fugacities too small to count mean the species is absent, so its affinity is exactly zero.
fn mixture_fugacity_star(reference: &ReferenceState, fugacity: f64) -> f64 {
    reference.fugacity_star(mixture_fugacity(fugacity))
}

impl LeastSquaresProblem for LangmuirBinary {
    fn num_params(&self) -> usize {
        BinaryLangmuirParams::LEN
    }

    /// Interleaved: `θ_i` then `θ_j` for each point.
    fn num_residuals(&self) -> usize {
        2 * self.temperature_star.len()
    }

    fn residual(&self, x: &[f64], out: &mut [f64]) {
        let params = BinaryLangmuirParams::from_slice(x);
        for (k, pair) in out.chunks_exact_mut(2).enumerate() {
            let (theta_i, theta_j) = params.thetas(
                self.fugacity_star_i[k],
                self.fugacity_star_j[k],
                self.temperature_star[k],
            );
            pair[0] = theta_i - self.theta_i[k];
            pair[1] = theta_j - self.theta_j[k];
        }
    }

    fn refresh_jacobian(&self, x: &[f64], jacobian: &mut Mat<f64>) {
        let BinaryLangmuirParams { i, j } = BinaryLangmuirParams::from_slice(x);
        for k in 0..self.temperature_star.len() {
            let t = self.temperature_star[k];
            let (u_i, u_j) = competitive_fractions(
                i.ln_affinity(self.fugacity_star_i[k], t),
                j.ln_affinity(self.fugacity_star_j[k], t),
            );
            // Columns: H_i*, A_i, q_m,i*, H_j*, A_j, q_m,j*.
            // ∂u_i/∂z_i = u_i(1 − u_i), ∂u_i/∂z_j = −u_i·u_j, and ∂z/∂H* = −∂z/∂A / T*.
            let row_i = 2 * k;
            let own_i = i.q_m_star * u_i * (1.0 - u_i);
            let cross_i = -i.q_m_star * u_i * u_j;
            jacobian[(row_i, 0)] = -own_i / t;
            jacobian[(row_i, 1)] = own_i;
            jacobian[(row_i, 2)] = u_i;
            jacobian[(row_i, 3)] = -cross_i / t;
            jacobian[(row_i, 4)] = cross_i;
            jacobian[(row_i, 5)] = 0.0;

            let row_j = row_i + 1;
            let own_j = j.q_m_star * u_j * (1.0 - u_j);
            let cross_j = -j.q_m_star * u_i * u_j;
            jacobian[(row_j, 0)] = -cross_j / t;
            jacobian[(row_j, 1)] = cross_j;
            jacobian[(row_j, 2)] = 0.0;
            jacobian[(row_j, 3)] = -own_j / t;
            jacobian[(row_j, 4)] = own_j;
            jacobian[(row_j, 5)] = u_j;
        }
    }

    fn project(&self, x: &mut [f64]) {
        x[2] = libm::fmax(x[2], 0.0);
        x[5] = libm::fmax(x[5], 0.0);
    }
}

impl IsothermModel for LangmuirBinary {
    type Params = BinaryLangmuirParams;
    type Physical = PhysicalBinaryLangmuir;

    fn name(&self) -> &str {
        &self.name
    }

    fn reference(&self) -> &ReferenceState {
        &self.reference
    }

    fn params(&self) -> BinaryLangmuirParams {
        self.params
    }

    fn set_params(&mut self, params: BinaryLangmuirParams) {
        self.params = params;
    }

    fn physical_params(&self) -> PhysicalBinaryLangmuir {
        self.params.to_physical(&self.reference)
    }

    fn initial_guess(&self) -> BinaryLangmuirParams {
        let species = |fugacity_star: &[f64]| {
            LangmuirParams::new(
                DEFAULT_H_STAR,
                guess_a(DEFAULT_H_STAR, fugacity_star, &self.temperature_star),
                DEFAULT_Q_M_STAR,
            )
        };
        BinaryLangmuirParams {
            i: species(&self.fugacity_star_i),
            j: species(&self.fugacity_star_j),
        }
    }

    #[mutants::skip]
    fn parameter_names(&self) -> Vec<String> {
        ["H*_i", "A_i", "q_m*_i", "H*_j", "A_j", "q_m*_j"]
            .map(String::from)
            .to_vec()
    }

    fn observed_thetas(&self) -> Vec<f64> {
        self.theta_i
            .iter()
            .zip(&self.theta_j)
            .flat_map(|(&i, &j)| [i, j])
            .collect()
    }

    fn lint(&self) -> Vec<Warning> {
        warnings::lint_binary(&self.observations, BinaryLangmuirParams::LEN)
    }

    fn to_vector(params: BinaryLangmuirParams) -> Vec<f64> {
        params.to_array().to_vec()
    }

    fn from_vector(x: &[f64]) -> BinaryLangmuirParams {
        BinaryLangmuirParams::from_slice(x)
    }

    fn saturation_indices(&self) -> Vec<usize> {
        vec![2, 5]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        UnaryObservations,
        tests::{assert_close, assert_nearly_eq, finite_difference_jacobian},
    };

    fn observations() -> BinaryObservations {
        BinaryObservations::new(
            vec![1e4, 0.0, 5e4, 2e4, 1e5, 0.0],
            vec![0.0, 3e4, 5e4, 8e4, 1e5, 1e5],
            vec![1.0, 0.0, 1.5, 0.6, 1.9, 0.0],
            vec![0.0, 0.4, 0.3, 0.7, 0.2, 1.1],
            vec![300.0, 300.0, 300.0, 350.0, 350.0, 350.0],
        )
        .unwrap()
    }

    #[test]
    fn ill_posed_when_nothing_adsorbs() {
        let obs = BinaryObservations::new(
            vec![0.0],
            vec![0.0],
            vec![0.0],
            vec![0.1],
            vec![300.0],
        )
        .unwrap();
        assert_eq!(LangmuirBinary::new(obs).unwrap_err(), InputError::IllPosed);
    }

    #[test]
    fn ill_posed_when_every_fugacity_is_negligible() {
        let obs = BinaryObservations::new(
            vec![1e-13, 4e-13, 9e-13],
            vec![2e-13, 6e-13, 8e-13],
            vec![0.1, 0.2, 0.3],
            vec![0.2, 0.1, 0.4],
            vec![300.0, 320.0, 340.0],
        )
        .unwrap();
        assert_eq!(
            LangmuirBinary::new(obs.clone()).unwrap_err(),
            InputError::IllPosed
        );
        let reference = ReferenceState::new(1.0, 1e5, 340.0).unwrap();
        assert_eq!(
            LangmuirBinary::with_reference(obs, reference).unwrap_err(),
            InputError::IllPosed
        );
    }

    #[test]
    fn jacobian_matches_finite_differences() {
        let m = LangmuirBinary::new(observations()).unwrap();
        for x in [
            vec![-10.0, -2.0, 1.0, -7.0, -1.5, 0.8],
            vec![-12.0, 0.5, 1.3, -5.0, -3.0, 0.4],
        ] {
            let mut analytic = Mat::zeros(m.num_residuals(), m.num_params());
            m.refresh_jacobian(&x, &mut analytic);
            let numeric = finite_difference_jacobian(&m, &x);
            for r in 0..m.num_residuals() {
                for c in 0..m.num_params() {
                    let scale = libm::fmax(1.0, analytic[(r, c)].abs());
                    assert!(
                        (analytic[(r, c)] - numeric[(r, c)]).abs() < 1e-6 * scale,
                        "row {r} col {c}: {} vs {}",
                        analytic[(r, c)],
                        numeric[(r, c)]
                    );
                }
            }
        }
    }

    #[test]
    fn absent_competitor_reduces_to_unary() {
        let mut binary = LangmuirBinary::new(observations()).unwrap();
        let i = LangmuirParams::new(-11.0, -3.0, 0.9);
        binary.set_params(BinaryLangmuirParams {
            i,
            j: LangmuirParams::new(-6.0, -1.0, 0.5),
        });
        let reference = *binary.reference();
        let unary_obs = UnaryObservations::new(vec![1.0], vec![1.0], vec![300.0]).unwrap();
        let mut unary = LangmuirUnary::with_reference(unary_obs, reference).unwrap();
        unary.set_params(i);
        for (f, t) in [(1e2, 290.0), (4e4, 320.0), (9e5, 360.0)] {
            let (q_i, q_j) = binary.evaluate(f, 0.0, t);
            assert_close(q_i, unary.evaluate(f, t), 1e-12);
            assert_nearly_eq(q_j, 0.0);
            // Below the threshold counts as absent too.
            let (q_i, _) = binary.evaluate(f, 1e-13, t);
            assert_close(q_i, unary.evaluate(f, t), 1e-12);
        }
    }

    #[test]
    fn residuals_are_interleaved() {
        let m = LangmuirBinary::new(observations()).unwrap();
        let observed = m.observed_thetas();
        let q_ref = m.reference().q_ref();
        assert_eq!(observed.len(), 12);
        assert_nearly_eq(observed[0], 1.0 / q_ref);
        assert_nearly_eq(observed[1], 0.0);
        assert_nearly_eq(observed[3], 0.4 / q_ref);
        let predicted = m.predicted_thetas();
        assert_close(
            m.reference().loading(predicted[4]),
            m.predicted_loadings(Species::I)[2],
            1e-12,
        );
    }

    #[test]
    fn physical_evaluation_matches() {
        let mut m = LangmuirBinary::new(observations()).unwrap();
        m.set_params(BinaryLangmuirParams {
            i: LangmuirParams::new(-11.0, -3.0, 0.9),
            j: LangmuirParams::new(-6.0, -1.0, 0.5),
        });
        let physical = m.physical_params();
        for (fi, fj, t) in [
            (1e3, 5e4, 300.0),
            (6e5, 1e2, 330.0),
            (0.0, 7e4, 360.0),
            (3e4, 5e-13, 310.0),
        ] {
            let (q_i, q_j) = m.evaluate(fi, fj, t);
            let (p_i, p_j) = physical.loadings(fi, fj, t);
            assert_close(p_i, q_i, 1e-12);
            assert_close(p_j, q_j, 1e-12);
        }
    }
}
