use faer::linalg::{solvers::LltError, svd::SvdError};

/// Problems with observation arrays or reference constants.
/// These are caught when a model is constructed, before any fitting happens.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[cfg_attr(not(feature = "unstable-exhaustive"), non_exhaustive)]
pub enum InputError {
    /// No observations were given.
    #[error("Cannot fit an isotherm to zero observations")]
    Empty,
    /// Every observation array must have the same length.
    #[error("Column {column} has {actual} values but {expected} were expected")]
    LengthMismatch {
        /// Which column was the wrong length.
        column: &'static str,
        /// Length of the first column.
        expected: usize,
        /// Length of this column.
        actual: usize,
    },
    /// NaN or infinity in the data.
    #[error("Column {column} has a non-finite value {value} at row {index}")]
    NonFinite {
        /// Which column.
        column: &'static str,
        /// Which row.
        index: usize,
        /// The bad value.
        value: f64,
    },
    /// Fugacities and loadings cannot be negative.
    #[error("Column {column} has a negative value {value} at row {index}")]
    Negative {
        /// Which column.
        column: &'static str,
        /// Which row.
        index: usize,
        /// The bad value.
        value: f64,
    },
    /// Temperatures are absolute, so they must be strictly positive.
    #[error("Temperature at row {index} is {value} K, but it must be strictly positive")]
    NonPositiveTemperature {
        /// Which row.
        index: usize,
        /// The bad value.
        value: f64,
    },
    /// A reference constant was zero, negative or not finite,
    /// so the dimensionless transform could not be inverted.
    #[error("Reference {quantity} must be finite and strictly positive, but it was {value}")]
    NonPositiveReference {
        /// Which reference constant.
        quantity: &'static str,
        /// The bad value.
        value: f64,
    },
    /// Every observation sits at zero fugacity, where the Langmuir
    /// expression is trivially zero and says nothing about the parameters.
    #[error(
        "Every observation has zero fugacity, so the isotherm parameters cannot be estimated"
    )]
    IllPosed,
    /// Physical affinity constants must be positive to have a logarithm.
    #[error("Affinity constant must be strictly positive, but it was {value}")]
    NonPositiveAffinity {
        /// The bad value.
        value: f64,
    },
    /// A binary dataset had no pure-component points for the requested species.
    #[error("There are no pure-component points for species {species}")]
    NoPurePoints {
        /// Which species was requested.
        species: &'static str,
    },
}

/// Errors from reading tabular data.
#[derive(thiserror::Error, Debug)]
#[cfg_attr(not(feature = "unstable-exhaustive"), non_exhaustive)]
pub enum DataError {
    /// Could not read the file.
    #[error("Could not read data: {0}")]
    Io(#[from] std::io::Error),
    /// The CSV itself was malformed.
    #[error("Malformed CSV: {0}")]
    Csv(#[from] csv::Error),
    /// A column header didn't follow the `quantity [species] [unit]` format.
    #[error("Could not understand column header '{header}'")]
    Header {
        /// The header text.
        header: String,
    },
    /// The unit in a column header isn't one we can convert.
    #[error("Unknown unit '{unit}' in column '{header}'")]
    UnknownUnit {
        /// The header text.
        header: String,
        /// The unit text.
        unit: String,
    },
    /// A required column was missing.
    #[error("No column for {quantity}{}", of_species(.species.as_deref()))]
    MissingColumn {
        /// Which quantity was missing.
        quantity: &'static str,
        /// Which species it was needed for, if any.
        species: Option<String>,
    },
    /// Two columns had the same header.
    #[error("Column '{header}' appears more than once")]
    DuplicateColumn {
        /// The repeated header text.
        header: String,
    },
    /// A cell wasn't a number.
    #[error("Row {row}, column '{header}': '{value}' is not a number")]
    BadValue {
        /// 1-based row number, not counting the header.
        row: usize,
        /// The header of the column.
        header: String,
        /// The cell text.
        value: String,
    },
    /// The observations were read but failed validation.
    #[error(transparent)]
    Input(#[from] InputError),
}

fn of_species(species: Option<&str>) -> String {
    species.map(|s| format!(" of {s}")).unwrap_or_default()
}

/// Errors that could occur when running the nonlinear least-squares solve.
#[derive(thiserror::Error, Debug)]
#[cfg_attr(not(feature = "unstable-exhaustive"), non_exhaustive)]
pub enum NonLinearSystemError {
    /// Faer: could not factor the damped normal equations.
    #[error("Something went wrong doing matrix solves in faer: {error}")]
    FaerSolve {
        /// Underlying error.
        #[from]
        error: LltError,
    },
    /// Faer: could not decompose Jacobian.
    #[error("Something went wrong doing SVD in faer")]
    FaerSvd(SvdError),
    /// Solver did not find a solution within the allowed number of iterations.
    /// Consider raising the iterations?
    #[error("Could not find a solution in {iterations} iterations")]
    DidNotConverge {
        /// How many iterations were run.
        iterations: usize,
    },
    /// No step, however heavily damped, lowered the objective.
    #[error("Solver stalled after {iterations} iterations: no step reduced the objective")]
    Stalled {
        /// How many iterations were run.
        iterations: usize,
    },
    /// The residuals stopped being finite numbers.
    #[error("The objective became non-finite ({objective}); check the initial guess")]
    NonFiniteObjective {
        /// The bad objective value.
        objective: f64,
    },
    /// You provided an empty system.
    #[error("Cannot solve an empty system")]
    EmptySystemNotAllowed,
}
