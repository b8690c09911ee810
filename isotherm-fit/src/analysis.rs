//! Identifiability and uncertainty of fitted parameters.

use faer::{Mat, Side, linalg::solvers::DenseSolveCore};

use crate::{LeastSquaresProblem, NonLinearSystemError, solver::sum_of_squares};

/// How well the data pins down each parameter, evaluated at the solution.
#[derive(Debug, Clone)]
#[cfg_attr(not(feature = "unstable-exhaustive"), non_exhaustive)]
pub struct FitAnalysis {
    /// Numerical rank of the Jacobian.
    pub(crate) rank: usize,
    /// Parameters which move along directions the residuals don't depend on.
    pub(crate) unidentifiable: Vec<usize>,
    /// Estimated covariance of the parameters, if it could be computed.
    pub(crate) covariance: Option<Mat<f64>>,
}

impl FitAnalysis {
    /// Numerical rank of the Jacobian at the solution.
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Indices of parameters which the data can't determine.
    pub fn unidentifiable(&self) -> &[usize] {
        &self.unidentifiable
    }

    /// True if some combination of parameters doesn't affect the fit at all.
    pub fn is_underdetermined(&self) -> bool {
        !self.unidentifiable.is_empty()
    }

    /// Estimated covariance matrix `s²·(JᵀJ)⁻¹`, with `s²` the residual variance.
    /// Only available when there are more residuals than parameters,
    /// and the Jacobian has full rank.
    pub fn covariance(&self) -> Option<&Mat<f64>> {
        self.covariance.as_ref()
    }

    /// Standard error of each parameter, the square root of the covariance diagonal.
    pub fn standard_errors(&self) -> Option<Vec<f64>> {
        self.covariance
            .as_ref()
            .map(|c| (0..c.nrows()).map(|k| libm::sqrt(c[(k, k)])).collect())
    }
}

pub(crate) fn analyze<P: LeastSquaresProblem + ?Sized>(
    problem: &P,
    x: &[f64],
) -> Result<FitAnalysis, NonLinearSystemError> {
    let m = problem.num_residuals();
    let n = problem.num_params();
    let mut jacobian = Mat::<f64>::zeros(m, n);
    problem.refresh_jacobian(x, &mut jacobian);

    // SVD decomposes `J` into `J = UΣVᵀ`.
    let svd = jacobian.svd().map_err(NonLinearSystemError::FaerSvd)?;
    let sigma_col = svd.S().column_vector();

    // Singular values below this are noise, scaled the way LAPACK does.
    let largest_singular_value = sigma_col
        .iter()
        .copied()
        .reduce(libm::fmax)
        .ok_or(NonLinearSystemError::EmptySystemNotAllowed)?;
    let tolerance = f64::EPSILON * (m.max(n) as f64) * largest_singular_value;
    let rank = sigma_col.iter().filter(|&&s| s > tolerance).count();

    // Columns of V past the rank span the null space of J.
    // A parameter participates in the null space if its row there is non-negligible.
    let participation: Vec<f64> = (0..n)
        .map(|p| {
            let sum_sq: f64 = (rank..n)
                .map(|k| {
                    let v_pk = svd.V().get(p, k);
                    v_pk * v_pk
                })
                .sum();
            libm::sqrt(sum_sq)
        })
        .collect();
    let max_participation = participation.iter().copied().fold(0.0, libm::fmax);
    let noise_floor = 10.0 * libm::sqrt(n as f64) * f64::EPSILON;
    let participation_tolerance = libm::fmax(1e-3 * max_participation, noise_floor);
    let unidentifiable: Vec<usize> = (0..n)
        .filter(|&p| participation[p] > participation_tolerance)
        .collect();

    let covariance = if rank == n && m > n {
        let mut residual = vec![0.0; m];
        problem.residual(x, &mut residual);
        let variance = sum_of_squares(&residual) / (m - n) as f64;
        let jtj = jacobian.transpose() * jacobian.as_ref();
        match jtj.llt(Side::Lower) {
            Ok(factored) => {
                let inverse = factored.inverse();
                Some(Mat::from_fn(n, n, |r, c| variance * inverse[(r, c)]))
            }
            Err(error) => {
                tracing::debug!(%error, "could not invert JᵀJ for the covariance");
                None
            }
        }
    } else {
        None
    };

    Ok(FitAnalysis {
        rank,
        unidentifiable,
        covariance,
    })
}
