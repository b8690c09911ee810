use crate::{BinaryObservations, FitAnalysis, Species, UnaryObservations};

/// Something that probably makes a fit less trustworthy, but doesn't stop it.
#[derive(Debug, Clone)]
#[cfg_attr(test, derive(PartialEq))]
pub struct Warning {
    /// Which parameter (by its label, e.g. `H*_i`) the warning is about, if any.
    pub about_parameter: Option<String>,
    /// What went wrong.
    pub content: WarningContent,
}

/// What a [`Warning`] is about.
#[derive(Debug, Clone)]
#[cfg_attr(test, derive(PartialEq))]
#[non_exhaustive]
pub enum WarningContent {
    /// All observations are at one temperature.
    SingleTemperature,
    /// Fewer residuals than parameters.
    TooFewObservations {
        /// Number of residuals.
        residuals: usize,
        /// Number of parameters.
        params: usize,
    },
    /// One species of a binary dataset never appears.
    SpeciesAbsent(Species),
    /// The Jacobian at the solution is rank deficient.
    Underdetermined,
    /// R² outside `[0, 1]`, so the model fits worse than a constant.
    PoorFit(f64),
    /// A saturation loading ended up pinned at zero.
    AtBound,
}

impl Warning {
    fn general(content: WarningContent) -> Self {
        Self {
            about_parameter: None,
            content,
        }
    }
}

/// Problems visible in unary data before fitting.
pub(crate) fn lint_unary(observations: &UnaryObservations, num_params: usize) -> Vec<Warning> {
    let mut warnings = Vec::default();
    if observations.distinct_temperatures() < 2 {
        warnings.push(Warning::general(WarningContent::SingleTemperature));
    }
    if observations.len() < num_params {
        warnings.push(Warning::general(WarningContent::TooFewObservations {
            residuals: observations.len(),
            params: num_params,
        }));
    }
    warnings
}

/// Problems visible in binary data before fitting.
pub(crate) fn lint_binary(observations: &BinaryObservations, num_params: usize) -> Vec<Warning> {
    let mut warnings = Vec::default();
    if observations.distinct_temperatures() < 2 {
        warnings.push(Warning::general(WarningContent::SingleTemperature));
    }
    let residuals = 2 * observations.len();
    if residuals < num_params {
        warnings.push(Warning::general(WarningContent::TooFewObservations {
            residuals,
            params: num_params,
        }));
    }
    for species in [Species::I, Species::J] {
        if observations.absent(species) {
            warnings.push(Warning::general(WarningContent::SpeciesAbsent(species)));
        }
    }
    warnings
}

/// Problems visible only after fitting.
pub(crate) fn lint_solution(
    names: &[String],
    x: &[f64],
    saturation_indices: &[usize],
    r_squared: f64,
    analysis: Option<&FitAnalysis>,
) -> Vec<Warning> {
    let mut warnings = Vec::default();
    if let Some(analysis) = analysis {
        for &p in analysis.unidentifiable() {
            warnings.push(Warning {
                about_parameter: names.get(p).cloned(),
                content: WarningContent::Underdetermined,
            });
        }
    }
    if !(0.0..=1.0).contains(&r_squared) {
        warnings.push(Warning::general(WarningContent::PoorFit(r_squared)));
    }
    for &p in saturation_indices {
        if x[p] <= 0.0 {
            warnings.push(Warning {
                about_parameter: names.get(p).cloned(),
                content: WarningContent::AtBound,
            });
        }
    }
    warnings
}

impl std::fmt::Display for WarningContent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WarningContent::SingleTemperature => write!(
                f,
                "Every observation is at the same temperature, so the enthalpy of adsorption and the pre-exponential factor can't be told apart. Add data at other temperatures."
            ),
            WarningContent::TooFewObservations { residuals, params } => write!(
                f,
                "Only {residuals} residuals for {params} parameters, so the fit is underdetermined"
            ),
            WarningContent::SpeciesAbsent(species) => write!(
                f,
                "Species {} never appears in the data, so its parameters are meaningless",
                species.label()
            ),
            WarningContent::Underdetermined => write!(
                f,
                "The data doesn't determine this parameter; it can change without affecting the fit"
            ),
            WarningContent::PoorFit(r_squared) => {
                write!(f, "R² is {r_squared:.4}, the model fits worse than a constant")
            }
            WarningContent::AtBound => {
                write!(f, "The saturation loading was pinned at its lower bound of zero")
            }
        }
    }
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.about_parameter {
            Some(name) => write!(f, "{name}: {}", self.content),
            None => write!(f, "{}", self.content),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_temperature_is_flagged() {
        let obs = UnaryObservations::new(
            vec![1.0, 2.0, 3.0, 4.0],
            vec![0.1, 0.2, 0.3, 0.35],
            vec![300.0; 4],
        )
        .unwrap();
        assert_eq!(
            lint_unary(&obs, 3),
            vec![Warning {
                about_parameter: None,
                content: WarningContent::SingleTemperature
            }]
        );
    }

    #[test]
    fn binary_lints() {
        let obs = BinaryObservations::new(
            vec![1.0, 2.0],
            vec![0.0, 0.0],
            vec![0.1, 0.2],
            vec![0.0, 0.0],
            vec![300.0, 320.0],
        )
        .unwrap();
        let warnings = lint_binary(&obs, 6);
        assert_eq!(
            warnings,
            vec![
                Warning {
                    about_parameter: None,
                    content: WarningContent::TooFewObservations {
                        residuals: 4,
                        params: 6
                    }
                },
                Warning {
                    about_parameter: None,
                    content: WarningContent::SpeciesAbsent(Species::J)
                },
            ]
        );
    }

    #[test]
    fn solution_lints() {
        let names: Vec<String> = ["H*", "A", "q_m*"].map(String::from).to_vec();
        let warnings = lint_solution(&names, &[-10.0, -8.0, 0.0], &[2], 1.2, None);
        assert_eq!(
            warnings,
            vec![
                Warning {
                    about_parameter: None,
                    content: WarningContent::PoorFit(1.2)
                },
                Warning {
                    about_parameter: Some("q_m*".to_owned()),
                    content: WarningContent::AtBound
                },
            ]
        );
    }

    #[test]
    fn display_formats_are_human_friendly() {
        let single = WarningContent::SingleTemperature.to_string();
        assert!(single.contains("same temperature"));
        let absent = WarningContent::SpeciesAbsent(Species::J).to_string();
        assert!(absent.contains("Species j"));
        let warning = Warning {
            about_parameter: Some("A_i".to_owned()),
            content: WarningContent::Underdetermined,
        };
        assert!(warning.to_string().starts_with("A_i: "));
    }
}
