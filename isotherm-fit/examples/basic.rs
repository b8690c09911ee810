//! A basic example of fitting a Langmuir isotherm.
use isotherm_fit::{Config, IsothermModel, LangmuirUnary, UnaryObservations};

fn main() {
    // Loading (mmol/g) measured against pressure (Pa) at two temperatures (K).
    let fugacity = vec![1e3, 1e4, 5e4, 1e5, 3e5, 1e3, 1e4, 5e4, 1e5, 3e5];
    let loading = vec![0.29, 1.40, 2.31, 2.62, 2.90, 0.09, 0.60, 1.55, 2.00, 2.55];
    let temperature = vec![300.0, 300.0, 300.0, 300.0, 300.0, 350.0, 350.0, 350.0, 350.0, 350.0];

    // Validate the data and build a model. References default to the largest observations.
    let observations = UnaryObservations::new(fugacity, loading, temperature)
        .expect("observations should be valid");
    let mut model = LangmuirUnary::new(observations)
        .expect("some fugacity is non-zero")
        .with_name("example");

    // Run the solver!
    match model.solve(Config::default()) {
        Ok(outcome) => {
            println!("{outcome}");
            for warning in outcome.warnings() {
                println!("warning: {warning}");
            }
            // The model can now predict loadings anywhere.
            println!(
                "predicted loading at 20 kPa and 325 K: {:.3}",
                model.evaluate(2e4, 325.0)
            );
        }
        Err(failure) => {
            eprintln!("could not fit the isotherm: {failure}");
        }
    }
}
