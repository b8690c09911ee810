use faer::Mat;

use super::*;

mod proptests;

const H2S: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/test_data/h2s.csv");
const BINARY: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/test_data/bin.csv");

#[track_caller]
pub(crate) fn assert_nearly_eq(actual: f64, expected: f64) {
    let tolerance = 1e-9 * libm::fmax(1.0, expected.abs());
    assert!(
        (actual - expected).abs() <= tolerance,
        "expected {expected}, got {actual}"
    );
}

/// `actual` is within `relative_tolerance` of `expected`.
#[track_caller]
pub(crate) fn assert_close(actual: f64, expected: f64, relative_tolerance: f64) {
    let tolerance = relative_tolerance * expected.abs();
    assert!(
        (actual - expected).abs() <= tolerance,
        "expected {expected} ± {tolerance}, got {actual}"
    );
}

/// Central differences of the problem's residuals.
pub(crate) fn finite_difference_jacobian<P: LeastSquaresProblem>(
    problem: &P,
    x: &[f64],
) -> Mat<f64> {
    let m = problem.num_residuals();
    let n = problem.num_params();
    let mut jacobian = Mat::zeros(m, n);
    let mut forward = vec![0.0; m];
    let mut backward = vec![0.0; m];
    let mut shifted = x.to_vec();
    for c in 0..n {
        let h = 1e-6 * libm::fmax(1.0, x[c].abs());
        shifted[c] = x[c] + h;
        problem.residual(&shifted, &mut forward);
        shifted[c] = x[c] - h;
        problem.residual(&shifted, &mut backward);
        shifted[c] = x[c];
        for r in 0..m {
            jacobian[(r, c)] = (forward[r] - backward[r]) / (2.0 * h);
        }
    }
    jacobian
}

fn h2s_model() -> LangmuirUnary {
    let data = Dataset::from_path(H2S).unwrap();
    LangmuirUnary::new(data.unary(None).unwrap())
        .unwrap()
        .with_name("H2S")
}

fn binary_data() -> BinaryObservations {
    Dataset::from_path(BINARY)
        .unwrap()
        .binary("H2S", "CH4")
        .unwrap()
}

#[test]
fn h2s_fixture() {
    let mut model = h2s_model();
    let outcome = model.solve(Config::default()).unwrap();
    let physical = outcome.physical_params();
    assert_close(physical.enthalpy, -31_300.0, 0.02);
    assert_close(physical.saturation_loading, 3.11, 0.05);
    assert_close(physical.affinity, 1.6e-10, 0.15);
    assert!(outcome.r_squared() > 0.998, "R² = {}", outcome.r_squared());
    assert!(outcome.objective() < 0.01);
    assert_eq!(outcome.method(), Method::LevenbergMarquardt);
    assert!(outcome.warnings().is_empty(), "{:?}", outcome.warnings());
    assert_eq!(outcome.residuals().len(), 39);

    let errors = outcome.standard_errors().unwrap();
    assert_eq!(errors.len(), 3);
    assert!(errors.iter().all(|e| e.is_finite() && *e > 0.0));

    // The model keeps the fitted parameters.
    assert_eq!(model.params(), outcome.params());
    assert_nearly_eq(model.objective(), outcome.objective());
}

#[test]
fn isotherm_at_reference_state() {
    let mut model = h2s_model();
    model.solve(Config::default()).unwrap();
    let reference = *model.reference();
    assert_close(
        model.evaluate(reference.f_ref(), reference.t_ref()),
        reference.q_ref() * model.evaluate_dimensionless(1.0, 1.0),
        1e-12,
    );
}

#[test]
fn physical_parameters_reproduce_predictions() {
    let mut model = h2s_model();
    model.solve(Config::default()).unwrap();
    let physical = model.physical_params();
    let obs = model.observations().clone();
    let predicted = model.predicted_loadings();
    for k in 0..obs.len() {
        assert_close(
            physical.loading(obs.fugacity()[k], obs.temperature()[k]),
            predicted[k],
            1e-10,
        );
    }
    // And back again.
    let params = physical.to_dimensionless(model.reference()).unwrap();
    assert_close(params.h_star, model.params().h_star, 1e-12);
    assert_close(params.a, model.params().a, 1e-12);
    assert_close(params.q_m_star, model.params().q_m_star, 1e-12);
}

#[test]
fn nelder_mead_agrees_with_levenberg_marquardt() {
    let mut model = h2s_model();
    let comparison = model.solve_with_comparison(Config::default()).unwrap();
    assert_eq!(comparison.primary.method(), Method::LevenbergMarquardt);
    let alternate = comparison.alternate.as_ref().unwrap();
    assert_eq!(alternate.method(), Method::NelderMead);
    assert!(
        comparison.agrees(1e-6),
        "gap {:?}",
        comparison.objective_gap()
    );
    assert_close(
        alternate.physical_params().enthalpy,
        comparison.primary.physical_params().enthalpy,
        1e-3,
    );
    // The model holds the configured method's answer.
    assert_eq!(model.params(), comparison.primary.params());
}

#[test]
fn failure_keeps_last_iterate() {
    let mut model = h2s_model();
    let start = model.objective();
    let failure = model
        .solve(Config::default().with_max_iterations(1))
        .unwrap_err();
    assert!(matches!(
        failure.error(),
        NonLinearSystemError::DidNotConverge { iterations: 1 }
    ));
    assert_eq!(failure.num_params(), 3);
    assert_eq!(failure.num_residuals(), 39);
    assert_eq!(failure.residuals().len(), 39);
    assert_eq!(model.params(), failure.last_params());
    assert!(failure.objective() < start);
    assert_nearly_eq(failure.objective(), model.objective());
}

#[test]
fn binary_fixture() {
    let mut model = LangmuirBinary::new(binary_data())
        .unwrap()
        .with_name("H2S/CH4");
    let outcome = model.solve(Config::default()).unwrap();
    let PhysicalBinaryLangmuir { i: h2s, j: ch4 } = outcome.physical_params();
    assert_close(h2s.enthalpy, -31_575.0, 0.02);
    assert_close(h2s.saturation_loading, 3.07, 0.03);
    assert_close(ch4.enthalpy, -20_384.0, 0.02);
    assert_close(ch4.saturation_loading, 2.416, 0.03);
    assert!(outcome.r_squared() > 0.999, "R² = {}", outcome.r_squared());
    assert_eq!(outcome.residuals().len(), 2 * 105);
    for species in [Species::I, Species::J] {
        let r_squared = model.r_squared_species(species);
        assert!((0.98..=1.0).contains(&r_squared), "{species:?}: {r_squared}");
    }
}

#[test]
fn seeding_from_unary_fits() {
    let data = binary_data();
    let mut unary_i = LangmuirUnary::new(data.unary_subset(Species::I).unwrap()).unwrap();
    let mut unary_j = LangmuirUnary::new(data.unary_subset(Species::J).unwrap()).unwrap();
    let h2s = unary_i.solve(Config::default()).unwrap();
    let ch4 = unary_j.solve(Config::default()).unwrap();
    assert_close(h2s.physical_params().enthalpy, -31_473.0, 0.02);
    assert_close(ch4.physical_params().enthalpy, -20_623.0, 0.02);

    let mut unseeded = LangmuirBinary::new(data.clone()).unwrap();
    let default_start = unseeded.objective();
    let unseeded = unseeded.solve(Config::default()).unwrap();

    let mut seeded = LangmuirBinary::new(data).unwrap();
    seeded.seed_from_unary(&unary_i, &unary_j).unwrap();
    // The unary fits carry over exactly, despite the different references.
    assert_close(
        seeded.physical_params().i.enthalpy,
        h2s.physical_params().enthalpy,
        1e-12,
    );
    assert_close(
        seeded.physical_params().j.affinity,
        ch4.physical_params().affinity,
        1e-12,
    );
    assert!(seeded.objective() < default_start);
    let seeded = seeded.solve(Config::default()).unwrap();
    assert!(seeded.objective() <= default_start);
    assert!(seeded.objective() <= unseeded.objective() * (1.0 + 1e-6));
}

#[test]
fn r_squared_is_a_fraction() {
    let mut model = h2s_model();
    model.solve(Config::default()).unwrap();
    let r_squared = model.r_squared();
    assert!((0.0..=1.0).contains(&r_squared));
}

#[test]
fn rejects_ill_posed_data() {
    let obs = UnaryObservations::new(vec![0.0; 3], vec![0.0, 0.1, 0.2], vec![300.0, 310.0, 320.0])
        .unwrap();
    assert_eq!(LangmuirUnary::new(obs).unwrap_err(), InputError::IllPosed);

    assert!(matches!(
        UnaryObservations::new(vec![1.0], vec![1.0, 2.0], vec![300.0]),
        Err(InputError::LengthMismatch { .. })
    ));
    assert!(matches!(
        UnaryObservations::new(vec![-1.0], vec![1.0], vec![300.0]),
        Err(InputError::Negative { .. })
    ));
    assert!(matches!(
        UnaryObservations::new(vec![1.0], vec![f64::NAN], vec![300.0]),
        Err(InputError::NonFinite { .. })
    ));
    assert!(matches!(
        ReferenceState::new(1.0, 0.0, 300.0),
        Err(InputError::NonPositiveReference { .. })
    ));
}

#[test]
fn single_temperature_is_warned_about() {
    let obs = UnaryObservations::new(
        vec![1e3, 1e4, 5e4, 1e5, 3e5],
        vec![0.3, 1.2, 2.0, 2.4, 2.8],
        vec![300.0; 5],
    )
    .unwrap();
    let mut model = LangmuirUnary::new(obs).unwrap();
    let warnings = match model.solve(Config::default()) {
        Ok(outcome) => outcome.warnings().to_vec(),
        Err(failure) => failure.warnings().to_vec(),
    };
    assert!(
        warnings
            .iter()
            .any(|w| matches!(w.content, WarningContent::SingleTemperature))
    );
}
