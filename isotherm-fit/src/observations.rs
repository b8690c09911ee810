//! Validated equilibrium data.
//!
//! Observations are checked once, on construction, and are immutable afterwards.
//! Fugacities are in Pa and temperatures in K. Loadings can be in any unit,
//! as long as it's used consistently.

use crate::{InputError, UNARY_FUGACITY_THRESHOLD};

/// One of the two species in a binary mixture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "fuzz", derive(arbitrary::Arbitrary))]
pub enum Species {
    /// The first species, `i`.
    I,
    /// The second species, `j`.
    J,
}

impl Species {
    /// The other species in the mixture.
    pub fn other(self) -> Self {
        match self {
            Species::I => Species::J,
            Species::J => Species::I,
        }
    }

    #[mutants::skip]
    pub(crate) fn label(self) -> &'static str {
        match self {
            Species::I => "i",
            Species::J => "j",
        }
    }
}

/// Single-component adsorption data: fugacity, loading and temperature per point.
#[derive(Debug, Clone, PartialEq)]
pub struct UnaryObservations {
    fugacity: Vec<f64>,
    loading: Vec<f64>,
    temperature: Vec<f64>,
}

impl UnaryObservations {
    /// Validate and store the observations.
    /// Fails if the arrays are empty or differ in length, contain NaN or infinity,
    /// have negative fugacities or loadings, or non-positive temperatures.
    pub fn new(
        fugacity: Vec<f64>,
        loading: Vec<f64>,
        temperature: Vec<f64>,
    ) -> Result<Self, InputError> {
        let n = fugacity.len();
        if n == 0 {
            return Err(InputError::Empty);
        }
        check_non_negative("fugacity", &fugacity, n)?;
        check_non_negative("loading", &loading, n)?;
        check_temperature(&temperature, n)?;
        Ok(Self {
            fugacity,
            loading,
            temperature,
        })
    }

    /// Number of observations.
    pub fn len(&self) -> usize {
        self.fugacity.len()
    }

    /// Always false, observations can't be empty.
    pub fn is_empty(&self) -> bool {
        self.fugacity.is_empty()
    }

    /// Fugacity of each point, in Pa.
    pub fn fugacity(&self) -> &[f64] {
        &self.fugacity
    }

    /// Loading of each point.
    pub fn loading(&self) -> &[f64] {
        &self.loading
    }

    /// Temperature of each point, in K.
    pub fn temperature(&self) -> &[f64] {
        &self.temperature
    }

    /// How many different temperatures were measured.
    pub fn distinct_temperatures(&self) -> usize {
        count_distinct(&self.temperature)
    }

    /// Drop the points with zero loading.
    /// Useful for data where a zero loading marks a missing measurement.
    pub fn retain_positive_loading(self) -> Result<Self, InputError> {
        let keep: Vec<usize> = (0..self.len()).filter(|&k| self.loading[k] > 0.0).collect();
        Self::new(
            pick(&self.fugacity, &keep),
            pick(&self.loading, &keep),
            pick(&self.temperature, &keep),
        )
    }

    /// True if every point is at zero fugacity.
    pub(crate) fn all_zero_fugacity(&self) -> bool {
        self.fugacity.iter().all(|&f| f == 0.0)
    }
}

/// Two-component adsorption data.
/// Each point has both species' fugacities and loadings, at one temperature.
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryObservations {
    fugacity_i: Vec<f64>,
    fugacity_j: Vec<f64>,
    loading_i: Vec<f64>,
    loading_j: Vec<f64>,
    temperature: Vec<f64>,
}

impl BinaryObservations {
    /// Validate and store the observations. Same rules as [`UnaryObservations::new`].
    pub fn new(
        fugacity_i: Vec<f64>,
        fugacity_j: Vec<f64>,
        loading_i: Vec<f64>,
        loading_j: Vec<f64>,
        temperature: Vec<f64>,
    ) -> Result<Self, InputError> {
        let n = fugacity_i.len();
        if n == 0 {
            return Err(InputError::Empty);
        }
        check_non_negative("fugacity_i", &fugacity_i, n)?;
        check_non_negative("fugacity_j", &fugacity_j, n)?;
        check_non_negative("loading_i", &loading_i, n)?;
        check_non_negative("loading_j", &loading_j, n)?;
        check_temperature(&temperature, n)?;
        Ok(Self {
            fugacity_i,
            fugacity_j,
            loading_i,
            loading_j,
            temperature,
        })
    }

    /// Number of mixture points.
    pub fn len(&self) -> usize {
        self.fugacity_i.len()
    }

    /// Always false, observations can't be empty.
    pub fn is_empty(&self) -> bool {
        self.fugacity_i.is_empty()
    }

    /// Fugacity of the given species at each point, in Pa.
    pub fn fugacity(&self, species: Species) -> &[f64] {
        match species {
            Species::I => &self.fugacity_i,
            Species::J => &self.fugacity_j,
        }
    }

    /// Loading of the given species at each point.
    pub fn loading(&self, species: Species) -> &[f64] {
        match species {
            Species::I => &self.loading_i,
            Species::J => &self.loading_j,
        }
    }

    /// Temperature of each point, in K.
    pub fn temperature(&self) -> &[f64] {
        &self.temperature
    }

    /// How many different temperatures were measured.
    pub fn distinct_temperatures(&self) -> usize {
        count_distinct(&self.temperature)
    }

    /// Is this point effectively pure `species`, i.e. is the other species absent?
    pub fn is_pure(&self, index: usize, species: Species) -> bool {
        self.fugacity(species.other())[index] < UNARY_FUGACITY_THRESHOLD
    }

    /// The pure-component points of one species, as unary data.
    /// Use these to fit each species on its own before seeding a binary fit.
    pub fn unary_subset(&self, species: Species) -> Result<UnaryObservations, InputError> {
        let keep: Vec<usize> = (0..self.len())
            .filter(|&k| self.is_pure(k, species))
            .collect();
        if keep.is_empty() {
            return Err(InputError::NoPurePoints {
                species: species.label(),
            });
        }
        UnaryObservations::new(
            pick(self.fugacity(species), &keep),
            pick(self.loading(species), &keep),
            pick(&self.temperature, &keep),
        )
    }

    /// True if the species never appears, i.e. every fugacity is below
    /// [`UNARY_FUGACITY_THRESHOLD`].
    pub(crate) fn absent(&self, species: Species) -> bool {
        self.fugacity(species)
            .iter()
            .all(|&f| f < UNARY_FUGACITY_THRESHOLD)
    }
}

fn check_non_negative(column: &'static str, values: &[f64], n: usize) -> Result<(), InputError> {
    check_length(column, values, n)?;
    for (index, &value) in values.iter().enumerate() {
        if !value.is_finite() {
            return Err(InputError::NonFinite {
                column,
                index,
                value,
            });
        }
        if value < 0.0 {
            return Err(InputError::Negative {
                column,
                index,
                value,
            });
        }
    }
    Ok(())
}

fn check_temperature(values: &[f64], n: usize) -> Result<(), InputError> {
    check_length("temperature", values, n)?;
    for (index, &value) in values.iter().enumerate() {
        if !value.is_finite() {
            return Err(InputError::NonFinite {
                column: "temperature",
                index,
                value,
            });
        }
        if value <= 0.0 {
            return Err(InputError::NonPositiveTemperature { index, value });
        }
    }
    Ok(())
}

fn check_length(column: &'static str, values: &[f64], n: usize) -> Result<(), InputError> {
    if values.len() != n {
        return Err(InputError::LengthMismatch {
            column,
            expected: n,
            actual: values.len(),
        });
    }
    Ok(())
}

fn pick(values: &[f64], keep: &[usize]) -> Vec<f64> {
    keep.iter().map(|&k| values[k]).collect()
}

fn count_distinct(values: &[f64]) -> usize {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted.dedup_by(|a, b| {
        (*a - *b).abs() <= crate::TEMPERATURE_TOLERANCE * libm::fmax(a.abs(), b.abs())
    });
    sorted.len()
}
