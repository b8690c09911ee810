#![no_main]

use arbitrary::Arbitrary;
use isotherm_fit::{
    BinaryObservations, Config, IsothermModel, LangmuirBinary, LangmuirUnary, Method,
    UnaryObservations,
};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|setup: Setup| {
    let config = Config {
        method: setup.method,
        max_iterations: 50,
        max_simplex_iterations: 500,
        ..Default::default()
    };
    let (f, q, t) = split3(setup.unary);
    if let Ok(obs) = UnaryObservations::new(f, q, t)
        && let Ok(mut model) = LangmuirUnary::new(obs)
    {
        let _ = model.solve(config);
    }

    let (f_i, f_j, q_i, q_j, t) = split5(setup.binary);
    if let Ok(obs) = BinaryObservations::new(f_i, f_j, q_i, q_j, t)
        && let Ok(mut model) = LangmuirBinary::new(obs)
    {
        let _ = model.solve(config);
    }
});

#[derive(Debug, Arbitrary)]
struct Setup {
    method: Method,
    unary: Vec<(f64, f64, f64)>,
    binary: Vec<(f64, f64, f64, f64, f64)>,
}

fn split3(rows: Vec<(f64, f64, f64)>) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    let mut out = (Vec::new(), Vec::new(), Vec::new());
    for (a, b, c) in rows {
        out.0.push(a);
        out.1.push(b);
        out.2.push(c);
    }
    out
}

#[allow(clippy::type_complexity)]
fn split5(
    rows: Vec<(f64, f64, f64, f64, f64)>,
) -> (Vec<f64>, Vec<f64>, Vec<f64>, Vec<f64>, Vec<f64>) {
    let mut out = (Vec::new(), Vec::new(), Vec::new(), Vec::new(), Vec::new());
    for (a, b, c, d, e) in rows {
        out.0.push(a);
        out.1.push(b);
        out.2.push(c);
        out.3.push(d);
        out.4.push(e);
    }
    out
}
