//! Langmuir parameters, in dimensionless and physical form.
//!
//! The dimensionless parameters are what the solver moves:
//!
//! - `H*`, the enthalpy of adsorption in units of `R·T_ref`,
//! - `A`, the log of the pre-exponential factor in units of `1/f_ref`,
//! - `q_m*`, the saturation loading in units of `q_ref`.
//!
//! The affinity is `K = exp(A − H*/T*)·f*` and the loading is
//! `θ = q_m*·K/(1 + K)`. Physically that's `K = k∞·exp(−ΔH/(R·T))·f` with
//! `k∞ = exp(A)/f_ref`, `ΔH = R·T_ref·H*` and `q_m = q_m*·q_ref`.

use crate::{GAS_CONSTANT, InputError, ReferenceState, UNARY_FUGACITY_THRESHOLD};

/// Dimensionless Langmuir parameters for one species.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "fuzz", derive(arbitrary::Arbitrary))]
pub struct LangmuirParams {
    /// Dimensionless enthalpy of adsorption, `ΔH/(R·T_ref)`.
    /// Negative for exothermic adsorption.
    pub h_star: f64,
    /// Log of the dimensionless pre-exponential factor, `ln(k∞·f_ref)`.
    pub a: f64,
    /// Dimensionless saturation loading, `q_m/q_ref`.
    pub q_m_star: f64,
}

impl LangmuirParams {
    /// Number of parameters per species.
    pub const LEN: usize = 3;

    /// Gather the parameters.
    pub const fn new(h_star: f64, a: f64, q_m_star: f64) -> Self {
        Self {
            h_star,
            a,
            q_m_star,
        }
    }

    /// `ln K` at a dimensionless state point. Negative infinity at zero fugacity.
    pub fn ln_affinity(&self, fugacity_star: f64, temperature_star: f64) -> f64 {
        self.a - self.h_star / temperature_star + libm::log(fugacity_star)
    }

    /// Dimensionless loading θ at a dimensionless state point.
    pub fn theta(&self, fugacity_star: f64, temperature_star: f64) -> f64 {
        self.q_m_star * logistic(self.ln_affinity(fugacity_star, temperature_star))
    }

    /// Re-dimensionalise against the given references.
    pub fn to_physical(&self, reference: &ReferenceState) -> PhysicalLangmuir {
        PhysicalLangmuir {
            enthalpy: GAS_CONSTANT * reference.t_ref() * self.h_star,
            saturation_loading: self.q_m_star * reference.q_ref(),
            affinity: libm::exp(self.a) / reference.f_ref(),
        }
    }

    pub(crate) fn to_array(self) -> [f64; Self::LEN] {
        [self.h_star, self.a, self.q_m_star]
    }

    /// Caller guarantees there are at least [`LangmuirParams::LEN`] values.
    pub(crate) fn from_slice(x: &[f64]) -> Self {
        Self::new(x[0], x[1], x[2])
    }
}

impl std::fmt::Display for LangmuirParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "H* = {:.4}, A = {:.4}, q_m* = {:.4}",
            self.h_star, self.a, self.q_m_star
        )
    }
}

/// Langmuir parameters for one species, in physical units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicalLangmuir {
    /// Enthalpy of adsorption ΔH, in J/mol.
    pub enthalpy: f64,
    /// Saturation loading `q_m`, in the loading units of the data.
    pub saturation_loading: f64,
    /// Pre-exponential affinity constant `k∞`, in 1/Pa.
    pub affinity: f64,
}

impl PhysicalLangmuir {
    /// Langmuir constant `k∞·exp(−ΔH/(R·T))` at this temperature, in 1/Pa.
    pub fn langmuir_constant(&self, temperature: f64) -> f64 {
        self.affinity * libm::exp(-self.enthalpy / (GAS_CONSTANT * temperature))
    }

    /// Loading at this fugacity (Pa) and temperature (K).
    pub fn loading(&self, fugacity: f64, temperature: f64) -> f64 {
        self.saturation_loading * logistic(self.ln_affinity(fugacity, temperature))
    }

    /// `ln K` in physical units.
    pub fn ln_affinity(&self, fugacity: f64, temperature: f64) -> f64 {
        libm::log(self.affinity) - self.enthalpy / (GAS_CONSTANT * temperature)
            + libm::log(fugacity)
    }

    /// Express these parameters against some references.
    /// Fails if the affinity isn't strictly positive, because then it has no logarithm.
    pub fn to_dimensionless(
        &self,
        reference: &ReferenceState,
    ) -> Result<LangmuirParams, InputError> {
        if !(self.affinity.is_finite() && self.affinity > 0.0) {
            return Err(InputError::NonPositiveAffinity {
                value: self.affinity,
            });
        }
        Ok(LangmuirParams {
            h_star: self.enthalpy / (GAS_CONSTANT * reference.t_ref()),
            a: libm::log(self.affinity * reference.f_ref()),
            q_m_star: self.saturation_loading / reference.q_ref(),
        })
    }
}

impl std::fmt::Display for PhysicalLangmuir {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ΔH = {:.1} J/mol, q_m = {:.4}, k∞ = {:.4e} 1/Pa",
            self.enthalpy, self.saturation_loading, self.affinity
        )
    }
}

/// Dimensionless parameters for both species of a competitive binary Langmuir model.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "fuzz", derive(arbitrary::Arbitrary))]
pub struct BinaryLangmuirParams {
    /// Species `i`.
    pub i: LangmuirParams,
    /// Species `j`.
    pub j: LangmuirParams,
}

impl BinaryLangmuirParams {
    /// Number of parameters for both species.
    pub const LEN: usize = 2 * LangmuirParams::LEN;

    /// Combining rule: start a binary fit from two unary fits.
    ///
    /// The unary fits were made against their own references,
    /// so they go through physical units on the way to this model's references.
    pub fn from_unary(
        i: &PhysicalLangmuir,
        j: &PhysicalLangmuir,
        reference: &ReferenceState,
    ) -> Result<Self, InputError> {
        Ok(Self {
            i: i.to_dimensionless(reference)?,
            j: j.to_dimensionless(reference)?,
        })
    }

    /// Dimensionless loadings `(θ_i, θ_j)` at a dimensionless state point.
    pub fn thetas(
        &self,
        fugacity_star_i: f64,
        fugacity_star_j: f64,
        temperature_star: f64,
    ) -> (f64, f64) {
        let (u_i, u_j) = competitive_fractions(
            self.i.ln_affinity(fugacity_star_i, temperature_star),
            self.j.ln_affinity(fugacity_star_j, temperature_star),
        );
        (self.i.q_m_star * u_i, self.j.q_m_star * u_j)
    }

    /// Re-dimensionalise both species.
    pub fn to_physical(&self, reference: &ReferenceState) -> PhysicalBinaryLangmuir {
        PhysicalBinaryLangmuir {
            i: self.i.to_physical(reference),
            j: self.j.to_physical(reference),
        }
    }

    pub(crate) fn to_array(self) -> [f64; Self::LEN] {
        let [a, b, c] = self.i.to_array();
        let [d, e, f] = self.j.to_array();
        [a, b, c, d, e, f]
    }

    /// Caller guarantees there are at least [`BinaryLangmuirParams::LEN`] values.
    pub(crate) fn from_slice(x: &[f64]) -> Self {
        Self {
            i: LangmuirParams::from_slice(&x[..LangmuirParams::LEN]),
            j: LangmuirParams::from_slice(&x[LangmuirParams::LEN..]),
        }
    }
}

impl std::fmt::Display for BinaryLangmuirParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "i: {}; j: {}", self.i, self.j)
    }
}

/// Physical parameters for both species of a binary model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicalBinaryLangmuir {
    /// Species `i`.
    pub i: PhysicalLangmuir,
    /// Species `j`.
    pub j: PhysicalLangmuir,
}

impl PhysicalBinaryLangmuir {
    /// Loadings `(q_i, q_j)` at these fugacities (Pa) and temperature (K).
    /// A species whose fugacity is below [`UNARY_FUGACITY_THRESHOLD`] is absent.
    pub fn loadings(&self, fugacity_i: f64, fugacity_j: f64, temperature: f64) -> (f64, f64) {
        let (u_i, u_j) = competitive_fractions(
            self.i
                .ln_affinity(mixture_fugacity(fugacity_i), temperature),
            self.j
                .ln_affinity(mixture_fugacity(fugacity_j), temperature),
        );
        (
            self.i.saturation_loading * u_i,
            self.j.saturation_loading * u_j,
        )
    }
}

impl std::fmt::Display for PhysicalBinaryLangmuir {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "i: {}; j: {}", self.i, self.j)
    }
}

/// A mixture fugacity (Pa), or zero if it's too small to count.
pub(crate) fn mixture_fugacity(fugacity: f64) -> f64 {
    if fugacity < UNARY_FUGACITY_THRESHOLD {
        0.0
    } else {
        fugacity
    }
}

/// `K/(1 + K)` given `z = ln K`, without overflowing for large `|z|`.
pub(crate) fn logistic(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + libm::exp(-z))
    } else {
        let e = libm::exp(z);
        e / (1.0 + e)
    }
}

/// `(K_i/D, K_j/D)` with `D = 1 + K_i + K_j`, given `z_i = ln K_i` and `z_j = ln K_j`.
/// Shifted by the largest exponent so nothing overflows.
pub(crate) fn competitive_fractions(z_i: f64, z_j: f64) -> (f64, f64) {
    let shift = libm::fmax(0.0, libm::fmax(z_i, z_j));
    let e_0 = libm::exp(-shift);
    let e_i = libm::exp(z_i - shift);
    let e_j = libm::exp(z_j - shift);
    let denominator = e_0 + e_i + e_j;
    (e_i / denominator, e_j / denominator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{assert_close, assert_nearly_eq};

    #[test]
    fn logistic_is_stable() {
        assert_nearly_eq(logistic(0.0), 0.5);
        assert_nearly_eq(logistic(800.0), 1.0);
        assert_nearly_eq(logistic(-800.0), 0.0);
        assert_nearly_eq(logistic(f64::NEG_INFINITY), 0.0);
        assert_nearly_eq(logistic(2.0) + logistic(-2.0), 1.0);
    }

    #[test]
    fn competitive_fractions_handle_extremes() {
        let (u_i, u_j) = competitive_fractions(f64::NEG_INFINITY, f64::NEG_INFINITY);
        assert_nearly_eq(u_i, 0.0);
        assert_nearly_eq(u_j, 0.0);
        let (u_i, u_j) = competitive_fractions(900.0, 899.0);
        assert_nearly_eq(u_i + u_j, 1.0);
        assert!(u_i > u_j);
        let (u_i, u_j) = competitive_fractions(0.0, f64::NEG_INFINITY);
        assert_nearly_eq(u_i, 0.5);
        assert_nearly_eq(u_j, 0.0);
    }

    #[test]
    fn physical_round_trip() {
        let reference = ReferenceState::new(3.0, 1e6, 373.0).unwrap();
        let physical = PhysicalLangmuir {
            enthalpy: -31_300.0,
            saturation_loading: 3.11,
            affinity: 1.6e-10,
        };
        let dimensionless = physical.to_dimensionless(&reference).unwrap();
        let back = dimensionless.to_physical(&reference);
        assert_close(back.enthalpy, physical.enthalpy, 1e-12);
        assert_close(back.saturation_loading, physical.saturation_loading, 1e-12);
        assert_close(back.affinity, physical.affinity, 1e-12);
    }

    #[test]
    fn langmuir_constant_matches_affinity() {
        let physical = PhysicalLangmuir {
            enthalpy: -20_000.0,
            saturation_loading: 2.0,
            affinity: 1e-9,
        };
        let t = 320.0;
        let f = 2e5;
        let k = physical.langmuir_constant(t) * f;
        assert_close(physical.loading(f, t), 2.0 * k / (1.0 + k), 1e-12);
    }

    #[test]
    fn rejects_non_positive_affinity() {
        let reference = ReferenceState::new(1.0, 1.0, 1.0).unwrap();
        let physical = PhysicalLangmuir {
            enthalpy: 0.0,
            saturation_loading: 1.0,
            affinity: 0.0,
        };
        assert_eq!(
            physical.to_dimensionless(&reference).unwrap_err(),
            InputError::NonPositiveAffinity { value: 0.0 }
        );
    }

    #[test]
    fn combining_rule_rescales_references() {
        let unary_reference = ReferenceState::new(3.0, 1e6, 373.0).unwrap();
        let binary_reference = ReferenceState::new(2.5, 8e5, 373.0).unwrap();
        let i = LangmuirParams::new(-10.0, -8.7, 1.0).to_physical(&unary_reference);
        let j = LangmuirParams::new(-6.6, -5.5, 0.8).to_physical(&unary_reference);
        let seeded = BinaryLangmuirParams::from_unary(&i, &j, &binary_reference).unwrap();
        // Same physics, so the same loading at any state point with the other species absent.
        let f = 3e5;
        let t = 343.0;
        let expected = i.loading(f, t);
        let (theta_i, theta_j) = seeded.thetas(
            binary_reference.fugacity_star(f),
            0.0,
            binary_reference.temperature_star(t),
        );
        assert_close(binary_reference.loading(theta_i), expected, 1e-12);
        assert_nearly_eq(theta_j, 0.0);
    }

    #[test]
    fn negligible_competitor_is_absent() {
        let reference = ReferenceState::new(3.0, 1e5, 350.0).unwrap();
        let params = BinaryLangmuirParams {
            i: LangmuirParams::new(-10.0, -8.0, 1.0),
            j: LangmuirParams::new(-60.0, 30.0, 1.2),
        };
        let physical = params.to_physical(&reference);
        let (q_i, q_j) = physical.loadings(2e4, 5e-13, 300.0);
        let (pure_i, _) = physical.loadings(2e4, 0.0, 300.0);
        assert_nearly_eq(q_i, pure_i);
        assert_nearly_eq(q_j, 0.0);
        let expected = physical.i.loading(2e4, 300.0);
        assert_close(q_i, expected, 1e-12);
    }

    #[test]
    fn array_layout() {
        let p = BinaryLangmuirParams {
            i: LangmuirParams::new(1.0, 2.0, 3.0),
            j: LangmuirParams::new(4.0, 5.0, 6.0),
        };
        let x = p.to_array();
        assert_eq!(BinaryLangmuirParams::from_slice(&x), p);
    }
}
