use faer::{ColRef, Mat, Side, prelude::Solve};

use super::{LeastSquaresProblem, SuccessfulSolve, Termination, inf_norm, sum_of_squares};
use crate::{Config, NonLinearSystemError};

/// Damping never drops below this, so a bad step can always be rescued.
const MIN_DAMPING: f64 = 1e-15;
/// If the damping grows past this, no step in any direction lowers the objective.
const MAX_DAMPING: f64 = 1e16;
/// Floor on the diagonal scaling, for parameters the residuals barely depend on.
const MIN_DIAGONAL: f64 = 1e-12;

#[inline(never)]
pub(super) fn solve_levenberg_marquardt<P: LeastSquaresProblem + ?Sized>(
    problem: &P,
    current_values: &mut [f64],
    config: &Config,
) -> Result<SuccessfulSolve, NonLinearSystemError> {
    let m = problem.num_residuals();
    let n = problem.num_params();

    let mut residual = vec![0.0; m];
    let mut trial_residual = vec![0.0; m];
    let mut trial_values = vec![0.0; n];
    let mut jacobian = Mat::<f64>::zeros(m, n);

    problem.residual(current_values, &mut residual);
    let mut objective = sum_of_squares(&residual);
    let mut evaluations = 1;
    if !objective.is_finite() {
        return Err(NonLinearSystemError::NonFiniteObjective { objective });
    }
    let mut damping = config.initial_damping;

    for this_iteration in 0..config.max_iterations {
        // If every residual is within tolerance, the data is fit exactly.
        if inf_norm(&residual) <= config.convergence_tolerance {
            return Ok(finished(
                this_iteration,
                evaluations,
                objective,
                Termination::Residual,
            ));
        }

        problem.refresh_jacobian(current_values, &mut jacobian);

        /* Each iteration solves the damped normal equations for the step d:
             (JᵀJ + λ·diag(JᵀJ)) d = −Jᵀr
           Scaling the damping by the diagonal makes the step invariant
           to how each parameter is scaled.
        */
        let jtj = jacobian.transpose() * jacobian.as_ref();
        let gradient = jacobian.transpose() * ColRef::from_slice(&residual);
        if inf_norm(gradient.iter()) <= config.gradient_tolerance {
            return Ok(finished(
                this_iteration,
                evaluations,
                objective,
                Termination::Gradient,
            ));
        }
        let rhs = faer::Col::<f64>::from_fn(n, |k| -gradient[k]);
        let current_inf_norm = inf_norm(current_values.iter());
        let step_threshold = config.step_tolerance * (current_inf_norm + config.step_tolerance);

        // Raise the damping until a step lowers the objective.
        loop {
            let mut a = jtj.clone();
            for k in 0..n {
                a[(k, k)] += damping * libm::fmax(jtj[(k, k)], MIN_DIAGONAL);
            }
            let step = match a.llt(Side::Lower) {
                Ok(factored) => factored.solve(&rhs),
                Err(error) => {
                    tracing::debug!(
                        %error,
                        damping,
                        "damped normal equations not positive definite"
                    );
                    damping *= 2.0;
                    if damping > MAX_DAMPING {
                        return Err(NonLinearSystemError::FaerSolve { error });
                    }
                    continue;
                }
            };
            debug_assert_eq!(
                step.nrows(),
                n,
                "the step must have one entry per parameter"
            );

            trial_values
                .iter_mut()
                .zip(current_values.iter())
                .zip(step.iter())
                .for_each(|((trial, current), d)| {
                    *trial = current + d;
                });
            problem.project(&mut trial_values);
            let step_inf_norm = trial_values
                .iter()
                .zip(current_values.iter())
                .map(|(trial, current)| (trial - current).abs())
                .fold(0.0, libm::fmax);

            problem.residual(&trial_values, &mut trial_residual);
            evaluations += 1;
            let trial_objective = sum_of_squares(&trial_residual);

            if trial_objective.is_finite() && trial_objective < objective {
                let reduction = (objective - trial_objective) / objective;
                current_values.copy_from_slice(&trial_values);
                std::mem::swap(&mut residual, &mut trial_residual);
                objective = trial_objective;
                damping = libm::fmax(damping / 3.0, MIN_DAMPING);
                tracing::trace!(
                    iteration = this_iteration,
                    objective,
                    damping,
                    step = step_inf_norm,
                    "accepted step"
                );

                // A local minimum, though the objective might not be zero if the
                // data is noisy. Still a good least-squares solution.
                if step_inf_norm <= step_threshold {
                    return Ok(finished(
                        this_iteration + 1,
                        evaluations,
                        objective,
                        Termination::Step,
                    ));
                }
                if reduction <= config.objective_tolerance {
                    return Ok(finished(
                        this_iteration + 1,
                        evaluations,
                        objective,
                        Termination::Objective,
                    ));
                }
                break;
            }

            // Rejected. If even this step was negligible, there's nowhere left to go.
            if step_inf_norm <= step_threshold {
                return Ok(finished(
                    this_iteration,
                    evaluations,
                    objective,
                    Termination::Step,
                ));
            }
            damping *= 2.0;
            if damping > MAX_DAMPING {
                tracing::warn!(
                    iterations = this_iteration,
                    objective,
                    "Levenberg-Marquardt stalled"
                );
                return Err(NonLinearSystemError::Stalled {
                    iterations: this_iteration,
                });
            }
        }
    }
    tracing::warn!(
        iterations = config.max_iterations,
        objective,
        "Levenberg-Marquardt did not converge"
    );
    Err(NonLinearSystemError::DidNotConverge {
        iterations: config.max_iterations,
    })
}

fn finished(
    iterations: usize,
    evaluations: usize,
    objective: f64,
    termination: Termination,
) -> SuccessfulSolve {
    tracing::debug!(
        iterations,
        evaluations,
        objective,
        %termination,
        "Levenberg-Marquardt converged"
    );
    SuccessfulSolve {
        iterations,
        evaluations,
        termination,
    }
}
