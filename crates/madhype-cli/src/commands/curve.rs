use std::path::Path;

use madhype_core::{Result, analyze};

use super::{AnalysisArgs, GridArgs};

/// Bar width for the inline failure plot.
const BAR_WIDTH: usize = 30;

pub fn run(
    analysis: &AnalysisArgs,
    grid: &GridArgs,
    strict: bool,
    output_path: Option<&str>,
    save_config: Option<&str>,
) -> Result<()> {
    let config = analysis.to_config()?;
    let grid = grid.to_grid()?;

    println!(
        "Decoupling failure: w = {}, n = {}, {} clones (alpha = {}), method = {}, criterion = {}\n",
        config.well_count,
        config.draws_per_well,
        config.repertoire_size,
        config.alpha,
        config.method,
        config.criterion
    );

    let curve = analyze(&config, &grid)?;
    if strict {
        curve.require_in_regime()?;
    }

    println!("{:>12} {:>12}", "Frequency", "Failure");
    println!("{}", "-".repeat(26 + BAR_WIDTH));
    for (f, p) in curve.points() {
        let filled = (p * BAR_WIDTH as f64).round() as usize;
        println!(
            "{:>12.3e} {:>11.4}%  {}",
            f,
            100.0 * p,
            "#".repeat(filled.min(BAR_WIDTH))
        );
    }

    if let Some((f, p)) = curve.worst() {
        println!("\nWorst case: {:.2}% failure at frequency {:.3e}", 100.0 * p, f);
    }
    if curve.out_of_regime > 0 {
        println!(
            "Note: {} of {} points used the normal approximation outside its valid regime",
            curve.out_of_regime,
            curve.frequencies.len()
        );
    }

    if let Some(path) = save_config {
        config.save(Path::new(path))?;
        println!("Config saved to: {path}");
    }
    if let Some(path) = output_path {
        super::write_json(path, &curve)?;
        println!("Curve saved to: {path}");
    }
    Ok(())
}
