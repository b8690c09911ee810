//! Reference constants for the dimensionless transform.
//!
//! Fitting happens in dimensionless variables: `θ = q/q_ref`, `f* = f/f_ref`
//! and `T* = T/T_ref`. The reference values only condition the numerics.
//! They have no physical meaning, and any strictly positive choice gives
//! the same physical parameters.

use crate::{BinaryObservations, InputError, Species, UnaryObservations};

/// Reference loading, fugacity and temperature.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferenceState {
    q_ref: f64,
    f_ref: f64,
    t_ref: f64,
}

impl ReferenceState {
    /// Explicit references. Each must be finite and strictly positive.
    pub fn new(q_ref: f64, f_ref: f64, t_ref: f64) -> Result<Self, InputError> {
        check_positive("loading", q_ref)?;
        check_positive("fugacity", f_ref)?;
        check_positive("temperature", t_ref)?;
        Ok(Self {
            q_ref,
            f_ref,
            t_ref,
        })
    }

    /// The largest observed loading, fugacity and temperature.
    pub fn from_unary(observations: &UnaryObservations) -> Result<Self, InputError> {
        Self::new(
            largest(observations.loading()),
            largest(observations.fugacity()),
            largest(observations.temperature()),
        )
    }

    /// Like [`ReferenceState::from_unary`] but the loading and fugacity
    /// references are shared between both species, so they're the largest over both.
    pub fn from_binary(observations: &BinaryObservations) -> Result<Self, InputError> {
        let q_ref = libm::fmax(
            largest(observations.loading(Species::I)),
            largest(observations.loading(Species::J)),
        );
        let f_ref = libm::fmax(
            largest(observations.fugacity(Species::I)),
            largest(observations.fugacity(Species::J)),
        );
        Self::new(q_ref, f_ref, largest(observations.temperature()))
    }

    /// Reference loading.
    pub fn q_ref(&self) -> f64 {
        self.q_ref
    }

    /// Reference fugacity, in Pa.
    pub fn f_ref(&self) -> f64 {
        self.f_ref
    }

    /// Reference temperature, in K.
    pub fn t_ref(&self) -> f64 {
        self.t_ref
    }

    /// Dimensionless loading θ.
    pub fn theta(&self, loading: f64) -> f64 {
        loading / self.q_ref
    }

    /// Inverse of [`ReferenceState::theta`].
    pub fn loading(&self, theta: f64) -> f64 {
        theta * self.q_ref
    }

    /// Dimensionless fugacity f*.
    pub fn fugacity_star(&self, fugacity: f64) -> f64 {
        fugacity / self.f_ref
    }

    /// Inverse of [`ReferenceState::fugacity_star`].
    pub fn fugacity(&self, fugacity_star: f64) -> f64 {
        fugacity_star * self.f_ref
    }

    /// Dimensionless temperature T*.
    pub fn temperature_star(&self, temperature: f64) -> f64 {
        temperature / self.t_ref
    }

    /// Inverse of [`ReferenceState::temperature_star`].
    pub fn temperature(&self, temperature_star: f64) -> f64 {
        temperature_star * self.t_ref
    }
}

impl std::fmt::Display for ReferenceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "q_ref = {:.4}, f_ref = {:.4e} Pa, T_ref = {:.2} K",
            self.q_ref, self.f_ref, self.t_ref
        )
    }
}

fn largest(values: &[f64]) -> f64 {
    values.iter().copied().fold(0.0, libm::fmax)
}

fn check_positive(quantity: &'static str, value: f64) -> Result<(), InputError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(InputError::NonPositiveReference { quantity, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::assert_nearly_eq;

    #[test]
    fn defaults_are_maxima() {
        let obs = UnaryObservations::new(
            vec![100.0, 5000.0, 20.0],
            vec![0.5, 2.0, 1.0],
            vec![300.0, 350.0, 320.0],
        )
        .unwrap();
        let r = ReferenceState::from_unary(&obs).unwrap();
        assert_nearly_eq(r.q_ref(), 2.0);
        assert_nearly_eq(r.f_ref(), 5000.0);
        assert_nearly_eq(r.t_ref(), 350.0);
    }

    #[test]
    fn binary_references_cover_both_species() {
        let obs = BinaryObservations::new(
            vec![10.0, 0.0],
            vec![0.0, 40.0],
            vec![3.0, 0.0],
            vec![0.0, 1.5],
            vec![300.0, 300.0],
        )
        .unwrap();
        let r = ReferenceState::from_binary(&obs).unwrap();
        assert_nearly_eq(r.q_ref(), 3.0);
        assert_nearly_eq(r.f_ref(), 40.0);
    }

    #[test]
    fn rejects_zero_references() {
        assert_eq!(
            ReferenceState::new(0.0, 1.0, 1.0).unwrap_err(),
            InputError::NonPositiveReference {
                quantity: "loading",
                value: 0.0
            }
        );
        assert!(ReferenceState::new(1.0, f64::INFINITY, 1.0).is_err());
        assert!(ReferenceState::new(1.0, 1.0, -300.0).is_err());
    }

    #[test]
    fn transform_round_trips() {
        let r = ReferenceState::new(3.1, 1e6, 373.0).unwrap();
        for x in [0.0, 1e-3, 0.7, 12.5, 4e5] {
            assert_nearly_eq(r.loading(r.theta(x)), x);
            assert_nearly_eq(r.fugacity(r.fugacity_star(x)), x);
            assert_nearly_eq(r.temperature(r.temperature_star(x)), x);
        }
    }
}
