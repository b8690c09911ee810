//! Nelder-Mead simplex search on the sum of squared residuals.
//! Slow, but needs no derivatives, so it's a useful cross-check
//! on Levenberg-Marquardt.

use super::{LeastSquaresProblem, SuccessfulSolve, Termination};
use crate::{Config, NonLinearSystemError};

const REFLECTION: f64 = 1.0;
const EXPANSION: f64 = 2.0;
const CONTRACTION: f64 = 0.5;
const SHRINK: f64 = 0.5;
/// Relative size of the initial simplex.
const INITIAL_SPREAD: f64 = 0.05;
/// Absolute size of the initial simplex along coordinates which start at zero.
const ZERO_SPREAD: f64 = 0.00025;
const ZERO_THRESHOLD: f64 = 1e-10;

struct Evaluator<'a, P: ?Sized> {
    problem: &'a P,
    residual: Vec<f64>,
    evaluations: usize,
}

impl<P: LeastSquaresProblem + ?Sized> Evaluator<'_, P> {
    /// Project the vertex onto the feasible set, then score it.
    /// Non-finite objectives count as infinitely bad, so the simplex moves away from them.
    fn score(&mut self, vertex: &mut [f64]) -> f64 {
        self.problem.project(vertex);
        self.problem.residual(vertex, &mut self.residual);
        self.evaluations += 1;
        let objective = super::sum_of_squares(&self.residual);
        if objective.is_nan() {
            f64::INFINITY
        } else {
            objective
        }
    }
}

#[inline(never)]
pub(super) fn solve_nelder_mead<P: LeastSquaresProblem + ?Sized>(
    problem: &P,
    current_values: &mut [f64],
    config: &Config,
) -> Result<SuccessfulSolve, NonLinearSystemError> {
    let n = problem.num_params();
    let mut eval = Evaluator {
        problem,
        residual: vec![0.0; problem.num_residuals()],
        evaluations: 0,
    };

    // n + 1 vertices: the starting point, then one step along each axis.
    let mut simplex: Vec<Vec<f64>> = Vec::with_capacity(n + 1);
    simplex.push(current_values.to_vec());
    for k in 0..n {
        let mut vertex = current_values.to_vec();
        vertex[k] += if vertex[k].abs() < ZERO_THRESHOLD {
            ZERO_SPREAD
        } else {
            INITIAL_SPREAD * vertex[k].abs()
        };
        simplex.push(vertex);
    }
    let mut objectives: Vec<f64> = simplex.iter_mut().map(|v| eval.score(v)).collect();
    if !objectives[0].is_finite() {
        return Err(NonLinearSystemError::NonFiniteObjective {
            objective: objectives[0],
        });
    }

    let mut centroid = vec![0.0; n];
    let mut reflected = vec![0.0; n];
    let mut candidate = vec![0.0; n];

    for this_iteration in 0..config.max_simplex_iterations {
        sort_simplex(&mut simplex, &mut objectives);
        let best = objectives[0];
        let worst = objectives[n];

        let spread = worst - best;
        let diameter = simplex[1..]
            .iter()
            .map(|vertex| distance(&simplex[0], vertex))
            .fold(0.0, libm::fmax);
        let objective_threshold =
            config.objective_tolerance * (best.abs() + config.objective_tolerance);
        if spread <= objective_threshold && diameter <= config.simplex_tolerance {
            current_values.copy_from_slice(&simplex[0]);
            tracing::debug!(
                iterations = this_iteration,
                evaluations = eval.evaluations,
                objective = best,
                "Nelder-Mead converged"
            );
            return Ok(SuccessfulSolve {
                iterations: this_iteration,
                evaluations: eval.evaluations,
                termination: Termination::Simplex,
            });
        }

        // Centroid of every vertex except the worst.
        centroid.fill(0.0);
        for vertex in &simplex[..n] {
            for (c, v) in centroid.iter_mut().zip(vertex) {
                *c += v / n as f64;
            }
        }

        along(&centroid, &simplex[n], -REFLECTION, &mut reflected);
        let f_reflected = eval.score(&mut reflected);

        if f_reflected < best {
            along(&centroid, &reflected, EXPANSION, &mut candidate);
            let f_expanded = eval.score(&mut candidate);
            if f_expanded < f_reflected {
                replace_worst(&mut simplex, &mut objectives, &candidate, f_expanded);
            } else {
                replace_worst(&mut simplex, &mut objectives, &reflected, f_reflected);
            }
            continue;
        }
        if f_reflected < objectives[n - 1] {
            replace_worst(&mut simplex, &mut objectives, &reflected, f_reflected);
            continue;
        }

        // Contract towards the reflected point if it beat the worst, otherwise towards the worst.
        if f_reflected < worst {
            along(&centroid, &reflected, CONTRACTION, &mut candidate);
        } else {
            along(&centroid, &simplex[n], CONTRACTION, &mut candidate);
        }
        let f_contracted = eval.score(&mut candidate);
        if f_contracted < libm::fmin(worst, f_reflected) {
            replace_worst(&mut simplex, &mut objectives, &candidate, f_contracted);
            continue;
        }

        // Nothing worked, so shrink everything towards the best vertex.
        let (best_vertex, rest) = simplex.split_at_mut(1);
        for (vertex, objective) in rest.iter_mut().zip(objectives[1..].iter_mut()) {
            for (v, b) in vertex.iter_mut().zip(&best_vertex[0]) {
                *v = b + SHRINK * (*v - b);
            }
            *objective = eval.score(vertex);
        }
    }

    // Leave the best vertex found so far, so the caller can inspect it.
    sort_simplex(&mut simplex, &mut objectives);
    current_values.copy_from_slice(&simplex[0]);
    tracing::warn!(
        iterations = config.max_simplex_iterations,
        objective = objectives[0],
        "Nelder-Mead did not converge"
    );
    Err(NonLinearSystemError::DidNotConverge {
        iterations: config.max_simplex_iterations,
    })
}

/// `out = from + scale·(to − from)`.
fn along(from: &[f64], to: &[f64], scale: f64, out: &mut [f64]) {
    for ((o, f), t) in out.iter_mut().zip(from).zip(to) {
        *o = f + scale * (t - f);
    }
}

fn replace_worst(simplex: &mut [Vec<f64>], objectives: &mut [f64], vertex: &[f64], objective: f64) {
    let worst = simplex.len() - 1;
    simplex[worst].copy_from_slice(vertex);
    objectives[worst] = objective;
}

fn sort_simplex(simplex: &mut Vec<Vec<f64>>, objectives: &mut Vec<f64>) {
    let mut order: Vec<usize> = (0..objectives.len()).collect();
    order.sort_by(|&a, &b| objectives[a].total_cmp(&objectives[b]));
    *simplex = order.iter().map(|&k| std::mem::take(&mut simplex[k])).collect();
    *objectives = order.iter().map(|&k| objectives[k]).collect();
}

fn distance(a: &[f64], b: &[f64]) -> f64 {
    libm::sqrt(a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::test_problems::Inconsistent;

    #[test]
    fn along_reflects_through_centroid() {
        let mut out = vec![0.0; 2];
        along(&[1.0, 1.0], &[3.0, 0.0], -REFLECTION, &mut out);
        assert!((out[0] + 1.0).abs() < 1e-15);
        assert!((out[1] - 2.0).abs() < 1e-15);
    }

    #[test]
    fn sorts_best_first() {
        let mut simplex = vec![vec![3.0], vec![1.0], vec![2.0]];
        let mut objectives = vec![9.0, 1.0, 4.0];
        sort_simplex(&mut simplex, &mut objectives);
        assert_eq!(simplex, vec![vec![1.0], vec![2.0], vec![3.0]]);
        assert_eq!(objectives, vec![1.0, 4.0, 9.0]);
    }

    #[test]
    fn starts_from_zero() {
        let mut x = vec![0.0];
        let solved = solve_nelder_mead(&Inconsistent, &mut x, &Config::default()).unwrap();
        assert!(x[0].abs() < 1e-9);
        assert_eq!(solved.termination, Termination::Simplex);
    }
}
