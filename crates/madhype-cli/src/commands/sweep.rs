use madhype_core::{Result, SweepVariable, run_sweep};

use super::{AnalysisArgs, GridArgs};

pub struct SweepCommandConfig<'a> {
    pub variable: &'a str,
    pub start: f64,
    pub stop: f64,
    pub num: usize,
    pub spacing: &'a str,
    pub analysis: &'a AnalysisArgs,
    pub grid: &'a GridArgs,
    pub output_path: Option<&'a str>,
}

/// Grid columns shown in the console table; the JSON output has all of them.
const MAX_COLUMNS: usize = 6;

pub fn run(cfg: SweepCommandConfig<'_>) -> Result<()> {
    let variable: SweepVariable = cfg.variable.parse()?;
    let values = super::sweep_values(cfg.start, cfg.stop, cfg.num, cfg.spacing)?;
    let base = cfg.analysis.to_config()?;
    let grid = cfg.grid.to_grid()?;

    println!(
        "Sweeping {variable} over {} values ({} grid points each)...\n",
        values.len(),
        grid.len()
    );

    let result = run_sweep(&base, variable, &values, &grid)?;

    // Evenly spaced subset of grid columns for the console.
    let n_freq = result.frequencies.len();
    let columns: Vec<usize> = if n_freq <= MAX_COLUMNS {
        (0..n_freq).collect()
    } else {
        (0..MAX_COLUMNS)
            .map(|k| k * (n_freq - 1) / (MAX_COLUMNS - 1))
            .collect()
    };

    print!("{:>10}", variable.to_string());
    for &j in &columns {
        print!(" {:>10.2e}", result.frequencies[j]);
    }
    println!();
    println!("{}", "-".repeat(10 + 11 * columns.len()));
    for (value, row) in result.values.iter().zip(&result.failure) {
        print!("{value:>10.3}");
        for &j in &columns {
            print!(" {:>9.3}%", 100.0 * row[j]);
        }
        println!();
    }

    if let Some(path) = cfg.output_path {
        super::write_json(path, &result)?;
        println!("\nSweep saved to: {path}");
    }
    Ok(())
}
