use std::{
    io,
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use isotherm_fit::{
    Config, Dataset, FailureOutcome, FitOutcome, IsothermModel, LangmuirBinary, LangmuirUnary,
    Method, NonLinearSystemError, Species, Warning,
};

mod visualize;

#[derive(Parser)]
#[command(name = "isofit", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fit a single-component Langmuir isotherm.
    Unary(UnaryArgs),
    /// Fit a competitive Langmuir isotherm to binary mixture data.
    Binary(BinaryArgs),
}

#[derive(Args)]
struct UnaryArgs {
    #[command(flatten)]
    common: Common,

    /// Which species' columns to use.
    /// Without it, uses the columns that name no species.
    #[arg(long)]
    species: Option<String>,
}

#[derive(Args)]
struct BinaryArgs {
    #[command(flatten)]
    common: Common,

    /// The first species, as named in the column headers.
    #[arg(long)]
    species: String,

    /// The second species, as named in the column headers.
    #[arg(long)]
    other: String,

    /// Start from unary fits of each species' pure-component points.
    #[arg(long = "seed-from-unary")]
    seed_from_unary: bool,
}

#[derive(Args)]
struct Common {
    /// Path to the CSV data.
    /// Use '-' for stdin.
    #[arg(short = 'f', long)]
    filepath: PathBuf,

    /// Which solver to use.
    #[arg(long, value_enum, default_value_t = MethodArg::Lm)]
    method: MethodArg,

    /// Also fit with the other solver, and compare.
    #[arg(long)]
    compare: bool,

    /// Iteration limit for the chosen solver.
    #[arg(long = "max-iterations")]
    max_iterations: Option<usize>,

    /// Save a plot of the fit as a PNG.
    #[arg(short = 'o', long = "plot")]
    plot: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum MethodArg {
    /// Levenberg-Marquardt.
    Lm,
    /// Nelder-Mead simplex.
    NelderMead,
}

impl From<MethodArg> for Method {
    fn from(method: MethodArg) -> Self {
        match method {
            MethodArg::Lm => Method::LevenbergMarquardt,
            MethodArg::NelderMead => Method::NelderMead,
        }
    }
}

impl Common {
    fn config(&self) -> Config {
        let config = Config::default().with_method(self.method.into());
        match self.max_iterations {
            Some(n) => config.with_max_iterations(n),
            None => config,
        }
    }

    fn chart_name(&self) -> String {
        if self.filepath == Path::new("-") {
            "stdin".to_owned()
        } else {
            self.filepath.display().to_string()
        }
    }
}

/// Did the fit succeed?
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Fitted,
    Failed,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("error")),
        )
        .with_writer(io::stderr)
        .init();
    let cli = Cli::parse();
    match main_inner(&cli) {
        Ok(Status::Fitted) => {}
        Ok(Status::Failed) => std::process::exit(1),
        Err(e) => {
            eprintln!("{}: {e:#}", "Error".red());
            std::process::exit(1);
        }
    }
}

fn main_inner(cli: &Cli) -> anyhow::Result<Status> {
    match &cli.command {
        Command::Unary(args) => run_unary(args),
        Command::Binary(args) => run_binary(args),
    }
}

fn run_unary(args: &UnaryArgs) -> anyhow::Result<Status> {
    let data = read_data(&args.common.filepath)?;
    let observations = data.unary(args.species.as_deref())?;
    let name = args
        .species
        .clone()
        .unwrap_or_else(|| args.common.chart_name());
    let mut model = LangmuirUnary::new(observations)?.with_name(name);
    let status = fit_and_report(&mut model, &args.common);
    if status == Status::Fitted
        && let Some(path) = &args.common.plot
    {
        visualize::save_unary_png(&model, data.loading_unit(), path)?;
        println!("Plot saved to {}", path.display());
    }
    Ok(status)
}

fn run_binary(args: &BinaryArgs) -> anyhow::Result<Status> {
    let data = read_data(&args.common.filepath)?;
    let observations = data.binary(&args.species, &args.other)?;
    let mut model = LangmuirBinary::new(observations.clone())?
        .with_name(format!("{}/{}", args.species, args.other));
    if args.seed_from_unary {
        let seeds = [(Species::I, &args.species), (Species::J, &args.other)]
            .map(|(species, name)| fit_pure_component(&observations, species, name));
        match seeds {
            [Some(unary_i), Some(unary_j)] => model.seed_from_unary(&unary_i, &unary_j)?,
            _ => println!(
                "{}",
                "Could not fit both pure components, starting from the default guess instead"
                    .yellow()
            ),
        }
    }
    let status = fit_and_report(&mut model, &args.common);
    if status == Status::Fitted {
        for (species, name) in [(Species::I, &args.species), (Species::J, &args.other)] {
            println!("R² of {name}: {}", r_squared(model.r_squared_species(species)));
        }
        if let Some(path) = &args.common.plot {
            let names = [args.species.as_str(), args.other.as_str()];
            visualize::save_binary_png(&model, names, data.loading_unit(), path)?;
            println!("Plot saved to {}", path.display());
        }
    }
    Ok(status)
}

/// Fit one species' pure-component points, to seed the binary fit.
fn fit_pure_component(
    observations: &isotherm_fit::BinaryObservations,
    species: Species,
    name: &str,
) -> Option<LangmuirUnary> {
    let unary = observations
        .unary_subset(species)
        .and_then(LangmuirUnary::new)
        .map(|model| model.with_name(name));
    let mut unary = match unary {
        Ok(unary) => unary,
        Err(e) => {
            println!("{}", format!("Pure {name}: {e}").yellow());
            return None;
        }
    };
    match unary.solve(Config::default()) {
        Ok(outcome) => {
            println!("Pure {name}: {}", outcome.physical_params());
            Some(unary)
        }
        Err(failure) => {
            println!("{}", format!("Pure {name}: {}", failure.error).yellow());
            None
        }
    }
}

/// Run the fit, then print the outcome nicely.
fn fit_and_report<M: IsothermModel>(model: &mut M, common: &Common) -> Status
where
    M::Params: std::fmt::Display,
{
    let config = common.config();
    let now = Instant::now();
    let result = if common.compare {
        model.solve_with_comparison(config).map(|comparison| {
            match &comparison.alternate {
                Ok(alternate) => {
                    println!("{alternate}");
                    let gap = comparison.objective_gap().unwrap_or_default();
                    println!(
                        "Objective gap ({} − {}): {gap:.3e}",
                        alternate.method(),
                        comparison.primary.method()
                    );
                }
                Err(failure) => println!(
                    "{}",
                    format!("{} failed: {}", config.method.alternate(), failure.error).yellow()
                ),
            }
            println!();
            comparison.primary
        })
    } else {
        model.solve(config)
    };
    let elapsed = now.elapsed();
    match result {
        Ok(outcome) => {
            print_output(&outcome, elapsed);
            Status::Fitted
        }
        Err(failure) => {
            print_failure_output(failure);
            Status::Failed
        }
    }
}

/// Prints the output nicely to stdout.
fn print_output<P: Copy, Q: Copy + std::fmt::Display>(
    outcome: &FitOutcome<P, Q>,
    duration: Duration,
) {
    print_warnings(outcome.warnings());
    print_problem_size(outcome.values().len(), outcome.residuals().len());
    println!("{outcome}");
    println!("R²: {}", r_squared(outcome.r_squared()));
    print_performance(duration);
}

fn r_squared(value: f64) -> colored::ColoredString {
    let text = format!("{value:.6}");
    if value.is_nan() || value < 0.95 {
        text.red()
    } else {
        text.normal()
    }
}

fn print_performance(duration: Duration) {
    println!("Fitted in {}μs", duration.as_micros());
}

fn print_warnings(warnings: &[Warning]) {
    if !warnings.is_empty() {
        println!("Warnings:");
        for warning in warnings {
            println!("\t{}", warning.to_string().yellow());
        }
    }
}

fn print_problem_size(num_params: usize, num_residuals: usize) {
    print!("Problem size: ");
    let size = format!("{num_residuals} residuals, {num_params} parameters");
    if num_residuals < num_params {
        println!("{}", size.yellow());
    } else {
        println!("{size}");
    }
}

fn print_failure_output<P: std::fmt::Display>(outcome: FailureOutcome<P>) {
    let FailureOutcome {
        error,
        last_params,
        objective,
        warnings,
        num_params,
        num_residuals,
        ..
    } = outcome;
    print_warnings(&warnings);
    print_problem_size(num_params, num_residuals);
    eprintln!("{}: {}", "Could not fit isotherm".red(), error);
    eprintln!("Last iterate: {last_params}, objective {objective:.6e}");
    match error {
        NonLinearSystemError::DidNotConverge { .. } => {
            eprintln!("Try raising --max-iterations, or a different --method.");
        }
        NonLinearSystemError::NonFiniteObjective { .. } => {
            eprintln!("Check the data for very large fugacities or loadings.");
        }
        _ => eprintln!("Try a different --method."),
    }
}

/// Read the CSV data from a file or stdin, depending on user args.
fn read_data(filepath: &Path) -> anyhow::Result<Dataset> {
    let data = if filepath == Path::new("-") {
        Dataset::from_reader(io::stdin().lock())?
    } else {
        Dataset::from_path(filepath)?
    };
    Ok(data)
}
