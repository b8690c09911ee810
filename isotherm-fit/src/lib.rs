//! Fits temperature-dependent Langmuir adsorption isotherms.
//!
//! Observations of loading against fugacity, at several temperatures, are
//! fitted to unary or competitive binary Langmuir models with an Arrhenius
//! temperature dependence. Fitting happens in dimensionless variables (see
//! [`ReferenceState`]) and results are reported in physical units.
//!
//! ```no_run
//! use isotherm_fit::{Config, Dataset, IsothermModel, LangmuirUnary};
//!
//! let data = Dataset::from_path("h2s.csv")?;
//! let mut model = LangmuirUnary::new(data.unary(None)?)?;
//! match model.solve(Config::default()) {
//!     Ok(outcome) => println!("{outcome}"),
//!     Err(failure) => eprintln!("{failure}"),
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub use crate::analysis::FitAnalysis;
pub use crate::data::Dataset;
pub use crate::error::{DataError, InputError, NonLinearSystemError};
pub use crate::fit::{fit, fit_with_comparison};
pub use crate::isotherm::{IsothermModel, LangmuirBinary, LangmuirUnary};
pub use crate::observations::{BinaryObservations, Species, UnaryObservations};
pub use crate::params::{
    BinaryLangmuirParams, LangmuirParams, PhysicalBinaryLangmuir, PhysicalLangmuir,
};
pub use crate::reference::ReferenceState;
pub use crate::solve_outcome::{
    BinaryFitOutcome, Comparison, FailureOutcome, FitOutcome, UnaryFitOutcome,
};
pub use crate::solver::{Config, LeastSquaresProblem, Method, Termination};
pub use crate::warnings::{Warning, WarningContent};

/// Rank and covariance of fitted parameters.
mod analysis;
/// Reading observations from CSV.
mod data;
mod error;
/// Running solvers on models.
mod fit;
/// Unary and binary Langmuir models.
mod isotherm;
mod observations;
/// Dimensionless and physical parameters.
mod params;
mod reference;
mod solve_outcome;
/// Least-squares solvers.
mod solver;
/// Unit tests
#[cfg(test)]
mod tests;
mod warnings;

/// Molar gas constant, J/(mol·K).
pub const GAS_CONSTANT: f64 = 8.314;

/// Fugacities below this (in Pa) count as zero. In binary data, a point where one
/// species' fugacity is below it is a pure-component point of the other species.
pub const UNARY_FUGACITY_THRESHOLD: f64 = 1e-12;

/// Relative difference below which two temperatures count as the same isotherm.
const TEMPERATURE_TOLERANCE: f64 = 1e-5;
