//! Runs a solver on an isotherm model and collects everything worth reporting.

use crate::{
    Comparison, Config, FailureOutcome, FitOutcome, IsothermModel,
    analysis::analyze,
    solver::{minimize, sum_of_squares},
    warnings::lint_solution,
};

/// Fit the model's parameters, starting from its current ones.
///
/// On success the model keeps the fitted parameters.
/// On failure it keeps the solver's last iterate, which the [`FailureOutcome`] also describes.
pub fn fit<M: IsothermModel>(
    model: &mut M,
    config: Config,
) -> Result<FitOutcome<M::Params, M::Physical>, FailureOutcome<M::Params>> {
    let mut warnings = model.lint();
    for warning in &warnings {
        tracing::warn!(model = model.name(), "{warning}");
    }
    let num_params = model.num_params();
    let num_residuals = model.num_residuals();

    let mut x = M::to_vector(model.params());
    tracing::debug!(model = model.name(), method = %config.method, start = ?x, "fitting");
    let solved = minimize(&*model, &mut x, &config);
    model.set_params(M::from_vector(&x));
    let residuals = model.residuals();
    let objective = sum_of_squares(&residuals);

    let solved = match solved {
        Ok(solved) => solved,
        Err(error) => {
            tracing::warn!(model = model.name(), %error, objective, "fit failed");
            return Err(FailureOutcome {
                error,
                last_params: model.params(),
                residuals,
                objective,
                warnings,
                num_params,
                num_residuals,
            });
        }
    };

    let r_squared = model.r_squared();
    let analysis = match analyze(&*model, &x) {
        Ok(analysis) => Some(analysis),
        Err(error) => {
            tracing::warn!(model = model.name(), %error, "could not analyse the solution");
            None
        }
    };
    let parameter_names = model.parameter_names();
    let diagnostics = lint_solution(
        &parameter_names,
        &x,
        &model.saturation_indices(),
        r_squared,
        analysis.as_ref(),
    );
    for warning in &diagnostics {
        tracing::warn!(model = model.name(), "{warning}");
    }
    warnings.extend(diagnostics);

    tracing::info!(
        model = model.name(),
        method = %config.method,
        iterations = solved.iterations,
        objective,
        r_squared,
        "fit converged: {}",
        solved.termination
    );
    Ok(FitOutcome {
        name: model.name().to_owned(),
        method: config.method,
        params: model.params(),
        physical: model.physical_params(),
        reference: *model.reference(),
        parameter_names,
        values: x,
        termination: solved.termination,
        iterations: solved.iterations,
        evaluations: solved.evaluations,
        objective,
        r_squared,
        residuals,
        analysis,
        warnings,
    })
}

/// Like [`fit`], but also fits with the alternate method from the same starting point.
///
/// The alternate runs first, so that the model is left holding the
/// configured method's result. Only the configured method's failure is an error.
pub fn fit_with_comparison<M: IsothermModel>(
    model: &mut M,
    config: Config,
) -> Result<Comparison<M::Params, M::Physical>, FailureOutcome<M::Params>> {
    let start = model.params();
    let alternate = fit(model, config.with_method(config.method.alternate()));
    model.set_params(start);
    let primary = fit(model, config)?;
    if let Ok(alternate) = &alternate {
        tracing::info!(
            model = model.name(),
            gap = alternate.objective() - primary.objective(),
            "compared {} against {}",
            alternate.method(),
            primary.method()
        );
    }
    Ok(Comparison { primary, alternate })
}
