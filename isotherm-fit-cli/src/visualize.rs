use std::path::Path;

use isotherm_fit::{IsothermModel, LangmuirBinary, LangmuirUnary, Species};
use plotters::{
    coord::{Shift, types::RangedCoordf64},
    prelude::*,
};

const LABEL_STYLE: (&str, i32) = ("sans-serif", 30);
const PANEL_SIZE: u32 = 800;
const DPI_SCALE: u32 = 2;
const MARKER_SIZE: i32 = 6;
/// Points along each fitted curve.
const CURVE_POINTS: u32 = 200;

type Chart<'a, DB> = ChartContext<'a, DB, Cartesian2d<RangedCoordf64, RangedCoordf64>>;

/// Isotherms at each temperature next to a parity plot.
pub fn save_unary_png(
    model: &LangmuirUnary,
    loading_unit: Option<&str>,
    output_path: &Path,
) -> anyhow::Result<()> {
    let root = BitMapBackend::new(
        output_path,
        (2 * PANEL_SIZE * DPI_SCALE, PANEL_SIZE * DPI_SCALE),
    )
    .into_drawing_area();
    root.fill(&WHITE)?;
    let root = root.titled(model.name(), ("sans-serif", 50))?;
    let panels = root.split_evenly((1, 2));
    let unit = loading_unit.unwrap_or("θ·q_ref");

    draw_isotherms(&panels[0], model, unit)?;
    let parity = model
        .observed_loadings()
        .iter()
        .copied()
        .zip(model.predicted_loadings())
        .collect();
    draw_parity(&panels[1], vec![(model.name().to_owned(), parity)], unit)?;

    root.present()?;
    Ok(())
}

/// Parity plot with one series per species.
pub fn save_binary_png(
    model: &LangmuirBinary,
    names: [&str; 2],
    loading_unit: Option<&str>,
    output_path: &Path,
) -> anyhow::Result<()> {
    let root = BitMapBackend::new(output_path, (PANEL_SIZE * DPI_SCALE, PANEL_SIZE * DPI_SCALE))
        .into_drawing_area();
    root.fill(&WHITE)?;
    let root = root.titled(model.name(), ("sans-serif", 50))?;
    let series = [Species::I, Species::J]
        .into_iter()
        .zip(names)
        .map(|(species, name)| {
            let points: Vec<_> = model
                .observed_loadings(species)
                .iter()
                .copied()
                .zip(model.predicted_loadings(species))
                .collect();
            (name.to_owned(), points)
        })
        .collect();
    draw_parity(&root, series, loading_unit.unwrap_or("θ·q_ref"))?;
    root.present()?;
    Ok(())
}

/// Observed loadings and the fitted curve, one colour per temperature.
fn draw_isotherms<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    model: &LangmuirUnary,
    unit: &str,
) -> anyhow::Result<()>
where
    <DB as plotters::prelude::DrawingBackend>::ErrorType: 'static,
{
    let observations = model.observations();
    let max_fugacity = largest(observations.fugacity()) * 1.05;
    let max_loading = largest(observations.loading()) * 1.15;
    let mut chart = ChartBuilder::on(area)
        .margin(20)
        .x_label_area_size(60)
        .y_label_area_size(80)
        .caption("Isotherms", LABEL_STYLE)
        .build_cartesian_2d(0.0..max_fugacity, 0.0..max_loading)?;
    draw_mesh(&mut chart, "fugacity [Pa]", &format!("loading [{unit}]"))?;

    for (k, temperature) in temperatures(observations.temperature())
        .into_iter()
        .enumerate()
    {
        let color = Palette99::pick(k).to_rgba();
        let points = observations
            .fugacity()
            .iter()
            .zip(observations.loading())
            .zip(observations.temperature())
            .filter(|(_, t)| same_temperature(**t, temperature))
            .map(|((f, q), _)| Circle::new((*f, *q), MARKER_SIZE, color.filled()));
        chart.draw_series(points)?;

        let curve = (0..=CURVE_POINTS).map(|step| {
            let fugacity = max_fugacity * f64::from(step) / f64::from(CURVE_POINTS);
            (fugacity, model.evaluate(fugacity, temperature))
        });
        chart
            .draw_series(LineSeries::new(curve, color.stroke_width(3)))?
            .label(format!("{temperature:.1} K"))
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(3)));
    }
    draw_legend(&mut chart)
}

/// Predicted against observed loading. A perfect fit lies on the diagonal.
fn draw_parity<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    series: Vec<(String, Vec<(f64, f64)>)>,
    unit: &str,
) -> anyhow::Result<()>
where
    <DB as plotters::prelude::DrawingBackend>::ErrorType: 'static,
{
    let max = series
        .iter()
        .flat_map(|(_, points)| points.iter())
        .map(|(observed, predicted)| observed.max(*predicted))
        .fold(0.0, f64::max);
    let max = if max > 0.0 { max * 1.05 } else { 1.0 };
    let mut chart = ChartBuilder::on(area)
        .margin(20)
        .x_label_area_size(60)
        .y_label_area_size(80)
        .caption("Parity", LABEL_STYLE)
        .build_cartesian_2d(0.0..max, 0.0..max)?;
    draw_mesh(
        &mut chart,
        &format!("observed [{unit}]"),
        &format!("predicted [{unit}]"),
    )?;

    chart
        .draw_series(LineSeries::new([(0.0, 0.0), (max, max)], BLACK.stroke_width(2)))?
        .label("y = x")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLACK.stroke_width(2)));
    for (k, (name, points)) in series.into_iter().enumerate() {
        let color = Palette99::pick(k).to_rgba();
        chart
            .draw_series(
                points
                    .into_iter()
                    .map(|point| Circle::new(point, MARKER_SIZE, color.filled())),
            )?
            .label(name)
            .legend(move |(x, y)| Circle::new((x + 10, y), MARKER_SIZE, color.filled()));
    }
    draw_legend(&mut chart)
}

fn draw_mesh<DB: DrawingBackend>(
    chart: &mut Chart<'_, DB>,
    x_desc: &str,
    y_desc: &str,
) -> anyhow::Result<()>
where
    <DB as plotters::prelude::DrawingBackend>::ErrorType: 'static,
{
    chart
        .configure_mesh()
        .x_desc(x_desc)
        .y_desc(y_desc)
        .label_style(LABEL_STYLE) // axis labels
        .axis_desc_style(LABEL_STYLE) // x/y axis captions
        .draw()?;
    Ok(())
}

fn draw_legend<'a, DB: DrawingBackend + 'a>(chart: &mut Chart<'a, DB>) -> anyhow::Result<()>
where
    <DB as plotters::prelude::DrawingBackend>::ErrorType: 'static,
{
    chart
        .configure_series_labels()
        .label_font(LABEL_STYLE)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .position(SeriesLabelPosition::UpperLeft)
        .draw()?;
    Ok(())
}

fn largest(values: &[f64]) -> f64 {
    let max = values.iter().copied().fold(0.0, f64::max);
    if max > 0.0 { max } else { 1.0 }
}

/// Distinct temperatures, coldest first.
fn temperatures(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted.dedup_by(|a, b| same_temperature(*a, *b));
    sorted
}

fn same_temperature(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-6 * b.abs()
}
