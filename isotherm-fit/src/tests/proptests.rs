use proptest::prelude::*;

use crate::{
    BinaryLangmuirParams, BinaryObservations, Config, IsothermModel, LangmuirBinary,
    LangmuirParams, LangmuirUnary, ReferenceState, UnaryObservations,
    tests::{assert_close, assert_nearly_eq},
};

fn reference() -> ReferenceState {
    ReferenceState::new(3.0, 4e5, 340.0).unwrap()
}

/// Noise-free observations at three temperatures.
fn synthetic(params: LangmuirParams, reference: &ReferenceState) -> LangmuirUnary {
    let physical = params.to_physical(reference);
    let mut f = Vec::new();
    let mut q = Vec::new();
    let mut t = Vec::new();
    for temperature in [280.0, 310.0, 340.0] {
        for fugacity in [1e2, 1e3, 5e3, 2e4, 1e5, 4e5] {
            f.push(fugacity);
            q.push(physical.loading(fugacity, temperature));
            t.push(temperature);
        }
    }
    let obs = UnaryObservations::new(f, q, t).unwrap();
    LangmuirUnary::with_reference(obs, *reference).unwrap()
}

fn langmuir_params() -> impl Strategy<Value = LangmuirParams> {
    (-20.0..-4.0f64, -12.0..0.0f64, 0.2..3.0f64)
        .prop_map(|(h, a, q)| LangmuirParams::new(h, a, q))
}

/// Isotherms whose transition from empty to saturated lies inside the sampled fugacities.
fn well_sampled_params() -> impl Strategy<Value = LangmuirParams> {
    (-14.0..-6.0f64, 2.0..7.0f64, 0.5..2.0f64)
        .prop_map(|(h, offset, q)| LangmuirParams::new(h, h + offset, q))
}

proptest! {
    #[test]
    fn dimensionless_round_trip(
        params in langmuir_params(),
        q_ref in 0.1..10.0f64,
        f_ref in 1.0..1e7f64,
        t_ref in 100.0..600.0f64,
    ) {
        let reference = ReferenceState::new(q_ref, f_ref, t_ref).unwrap();
        let back = params.to_physical(&reference).to_dimensionless(&reference).unwrap();
        assert_close(back.h_star, params.h_star, 1e-12);
        assert_close(back.a, params.a, 1e-12);
        assert_close(back.q_m_star, params.q_m_star, 1e-12);
    }

    #[test]
    fn loading_round_trip(q in 0.0..1e3f64, q_ref in 1e-3..1e3f64) {
        let reference = ReferenceState::new(q_ref, 1.0, 1.0).unwrap();
        assert_nearly_eq(reference.loading(reference.theta(q)), q);
    }

    #[test]
    fn physical_and_dimensionless_predictions_agree(
        params in langmuir_params(),
        fugacity in 0.0..1e6f64,
        temperature in 200.0..500.0f64,
    ) {
        let mut model = synthetic(params, &reference());
        model.set_params(params);
        let via_dimensionless = model.evaluate(fugacity, temperature);
        let direct = model.physical_params().loading(fugacity, temperature);
        prop_assert!((via_dimensionless - direct).abs() <= 1e-10 * libm::fmax(direct, 1e-12));
    }

    #[test]
    fn isotherm_at_reference_state(params in langmuir_params()) {
        let reference = reference();
        let mut model = synthetic(params, &reference);
        model.set_params(params);
        assert_close(
            model.evaluate(reference.f_ref(), reference.t_ref()),
            reference.q_ref() * params.theta(1.0, 1.0),
            1e-12,
        );
    }

    #[test]
    fn binary_without_competitor_is_unary(
        params_i in langmuir_params(),
        params_j in langmuir_params(),
        fugacity in 1.0..1e6f64,
        temperature in 250.0..400.0f64,
    ) {
        let reference = reference();
        let obs = BinaryObservations::new(
            vec![1e4, 0.0],
            vec![0.0, 1e4],
            vec![1.0, 0.0],
            vec![0.0, 1.0],
            vec![300.0, 320.0],
        ).unwrap();
        let mut binary = LangmuirBinary::with_reference(obs, reference).unwrap();
        binary.set_params(BinaryLangmuirParams { i: params_i, j: params_j });
        let mut unary = synthetic(params_i, &reference);
        unary.set_params(params_i);

        let (q_i, q_j) = binary.evaluate(fugacity, 0.0, temperature);
        prop_assert!(q_j.abs() <= f64::MIN_POSITIVE);
        let expected = unary.evaluate(fugacity, temperature);
        prop_assert!((q_i - expected).abs() <= 1e-12 * libm::fmax(expected, 1e-12));
    }

    #[test]
    fn r_squared_at_most_one(params in langmuir_params(), shift in -0.5..0.5f64) {
        let mut model = synthetic(params, &reference());
        let mut shifted = params;
        shifted.a += shift;
        model.set_params(shifted);
        let r_squared = model.r_squared();
        prop_assert!(r_squared <= 1.0 + 1e-12, "R² = {}", r_squared);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn recovers_noise_free_isotherms(params in well_sampled_params()) {
        let mut model = synthetic(params, &reference());
        let outcome = model.solve(Config::default());
        prop_assert!(outcome.is_ok(), "{:?}", outcome.err().map(|f| f.error));
        let r_squared = model.r_squared();
        prop_assert!(r_squared > 0.9999, "R² = {}", r_squared);
    }
}
