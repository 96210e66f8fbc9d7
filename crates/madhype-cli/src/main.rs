//! CLI for madhype: is that chain pair real, or just a crowded repertoire?

mod commands;

use clap::{Parser, Subcommand};

use commands::{AnalysisArgs, GridArgs};

#[derive(Parser)]
#[command(name = "madhype")]
#[command(about = "madhype: pairing significance and decoupling-failure curves for pooled-well experiments")]
#[command(version = madhype_core::VERSION)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show a power-law clone repertoire: top clones and cumulative mass
    Repertoire {
        /// Number of clones
        #[arg(long, default_value = "3000")]
        count: usize,

        /// Power-law exponent (0 = uniform)
        #[arg(long, default_value = "1.0")]
        alpha: f64,

        /// Number of top-ranked clones to print
        #[arg(long, default_value = "10")]
        top: usize,

        /// Write the full frequency list as JSON
        #[arg(long)]
        output: Option<String>,
    },

    /// Analytic decoupling-failure curve over a grid of target frequencies
    Curve {
        #[command(flatten)]
        analysis: AnalysisArgs,

        #[command(flatten)]
        grid: GridArgs,

        /// Fail if the normal approximation runs outside its valid regime
        #[arg(long)]
        strict: bool,

        /// Write the curve as JSON
        #[arg(long)]
        output: Option<String>,

        /// Write the effective configuration as JSON
        #[arg(long)]
        save_config: Option<String>,
    },

    /// Sweep one parameter and compute a failure curve for each value
    Sweep {
        /// Parameter to vary: w, n, alpha, count
        #[arg(long)]
        variable: String,

        /// First sweep value (a decade exponent with --sweep-spacing log)
        #[arg(long)]
        start: f64,

        /// Last sweep value (a decade exponent with --sweep-spacing log)
        #[arg(long)]
        stop: f64,

        /// Number of sweep values
        #[arg(long, default_value = "5")]
        num: usize,

        /// Spacing of sweep values: linear (default) or log
        #[arg(long, default_value = "linear", value_parser = ["linear", "log"])]
        sweep_spacing: String,

        #[command(flatten)]
        analysis: AnalysisArgs,

        #[command(flatten)]
        grid: GridArgs,

        /// Write the sweep table as JSON
        #[arg(long)]
        output: Option<String>,
    },

    /// Score chain-pair co-occurrence in well data against the independence null
    Pair {
        /// Well observations: JSON array of {"a": [...], "b": [...]}
        #[arg(long, required_unless_present = "simulated", conflicts_with = "simulated")]
        wells: Option<String>,

        /// Simulated data set (from `madhype simulate`); enables accuracy reporting
        #[arg(long)]
        simulated: Option<String>,

        /// Minimum significance score for a candidate
        #[arg(long, default_value = "0.9999")]
        threshold: f64,

        /// Tail method: exact (default) or normal
        #[arg(long, default_value = "exact")]
        method: String,

        /// Drop chains seen in fewer wells than this before scoring
        #[arg(long)]
        min_wells: Option<u32>,

        /// Drop chains seen in more wells than this before scoring
        #[arg(long)]
        max_wells: Option<u32>,

        /// Number of ranked candidates to print
        #[arg(long, default_value = "20")]
        top: usize,

        /// Fail if any pair was scored outside the normal-approximation regime
        #[arg(long)]
        strict: bool,

        /// Write all candidates as JSON
        #[arg(long)]
        output: Option<String>,
    },

    /// Simulate well data with a known answer
    Simulate {
        /// Load simulation settings from JSON (flags override)
        #[arg(long)]
        config: Option<String>,

        /// Number of wells
        #[arg(long)]
        num_wells: Option<usize>,

        /// Cells drawn into each well
        #[arg(long)]
        cells_per_well: Option<usize>,

        /// Distinct clones in the population
        #[arg(long)]
        clones: Option<usize>,

        /// Power-law exponent of clone frequencies
        #[arg(long)]
        alpha: Option<f64>,

        /// Probability a chain fails to be amplified
        #[arg(long)]
        deletion: Option<f64>,

        /// Probability a chain lands in another well
        #[arg(long)]
        misplacement: Option<f64>,

        /// RNG seed
        #[arg(long)]
        seed: Option<u64>,

        /// Write wells and ground truth as JSON
        #[arg(long)]
        output: String,

        /// Also write the bare well list (input for `pair --wells`)
        #[arg(long)]
        wells_output: Option<String>,
    },

    /// Run a test battery of repeated simulate-and-solve rounds
    Battery {
        /// JSON array of {"repetitions": N, "simulation": {...}}
        #[arg(long)]
        cases: String,

        /// Pairing threshold for the built-in solver
        #[arg(long, default_value = "0.9999")]
        threshold: f64,

        /// Tail method: exact (default) or normal
        #[arg(long, default_value = "exact")]
        method: String,

        /// Write every report as JSON
        #[arg(long)]
        output: Option<String>,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Repertoire {
            count,
            alpha,
            top,
            output,
        } => commands::repertoire::run(count, alpha, top, output.as_deref()),
        Commands::Curve {
            analysis,
            grid,
            strict,
            output,
            save_config,
        } => commands::curve::run(
            &analysis,
            &grid,
            strict,
            output.as_deref(),
            save_config.as_deref(),
        ),
        Commands::Sweep {
            variable,
            start,
            stop,
            num,
            sweep_spacing,
            analysis,
            grid,
            output,
        } => commands::sweep::run(commands::sweep::SweepCommandConfig {
            variable: &variable,
            start,
            stop,
            num,
            spacing: &sweep_spacing,
            analysis: &analysis,
            grid: &grid,
            output_path: output.as_deref(),
        }),
        Commands::Pair {
            wells,
            simulated,
            threshold,
            method,
            min_wells,
            max_wells,
            top,
            strict,
            output,
        } => commands::pair::run(commands::pair::PairCommandConfig {
            wells_path: wells.as_deref(),
            simulated_path: simulated.as_deref(),
            threshold,
            method: &method,
            min_wells,
            max_wells,
            top,
            strict,
            output_path: output.as_deref(),
        }),
        Commands::Simulate {
            config,
            num_wells,
            cells_per_well,
            clones,
            alpha,
            deletion,
            misplacement,
            seed,
            output,
            wells_output,
        } => commands::simulate::run(commands::simulate::SimulateCommandConfig {
            config_path: config.as_deref(),
            num_wells,
            cells_per_well,
            num_cells: clones,
            alpha,
            deletion,
            misplacement,
            seed,
            output_path: &output,
            wells_output_path: wells_output.as_deref(),
        }),
        Commands::Battery {
            cases,
            threshold,
            method,
            output,
        } => commands::battery::run(&cases, threshold, &method, output.as_deref()),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
