use std::path::Path;

use madhype_core::{Result, SimulationConfig, chain_occurrences, save_wells, simulate_wells};

pub struct SimulateCommandConfig<'a> {
    pub config_path: Option<&'a str>,
    pub num_wells: Option<usize>,
    pub cells_per_well: Option<usize>,
    pub num_cells: Option<usize>,
    pub alpha: Option<f64>,
    pub deletion: Option<f64>,
    pub misplacement: Option<f64>,
    pub seed: Option<u64>,
    pub output_path: &'a str,
    pub wells_output_path: Option<&'a str>,
}

impl SimulateCommandConfig<'_> {
    /// Settings from `--config` (or defaults) with every given flag applied.
    pub fn to_simulation(&self) -> Result<SimulationConfig> {
        let mut sim = match self.config_path {
            Some(path) => SimulationConfig::load(Path::new(path))?,
            None => SimulationConfig::default(),
        };
        if let Some(v) = self.num_wells {
            sim.num_wells = v;
        }
        if let Some(v) = self.cells_per_well {
            sim.cells_per_well = v;
        }
        if let Some(v) = self.num_cells {
            sim.num_cells = v;
        }
        if let Some(v) = self.alpha {
            sim.alpha = v;
        }
        if let Some(v) = self.deletion {
            sim.chain_deletion_prob = v;
        }
        if let Some(v) = self.misplacement {
            sim.chain_misplacement_prob = v;
        }
        if let Some(v) = self.seed {
            sim.seed = v;
        }
        sim.validate()?;
        Ok(sim)
    }
}

pub fn run(cfg: SimulateCommandConfig<'_>) -> Result<()> {
    let sim = cfg.to_simulation()?;

    println!("Generated data with the following parameters:");
    println!("  Number of wells: {}", sim.num_wells);
    println!("  Cells per well: {}", sim.cells_per_well);
    println!("  Number of clones: {} (power law, alpha = {})", sim.num_cells, sim.alpha);
    println!("  Chain deletion probability: {}", sim.chain_deletion_prob);
    println!("  Chain misplacement probability: {}", sim.chain_misplacement_prob);
    println!("  Seed: {}", sim.seed);

    let data = simulate_wells(&sim)?;
    let occurrences = chain_occurrences(&data.wells);
    let mean_a = data.wells.iter().map(|w| w.a.len()).sum::<usize>() as f64 / data.wells.len() as f64;
    let mean_b = data.wells.iter().map(|w| w.b.len()).sum::<usize>() as f64 / data.wells.len() as f64;

    println!();
    println!(
        "  Observed chains: {} A, {} B (of {} each)",
        occurrences.a.len(),
        occurrences.b.len(),
        sim.num_cells
    );
    println!("  Mean distinct chains per well: {mean_a:.1} A, {mean_b:.1} B");

    data.save(Path::new(cfg.output_path))?;
    println!("\nSimulated data saved to: {}", cfg.output_path);
    if let Some(path) = cfg.wells_output_path {
        save_wells(Path::new(path), &data.wells)?;
        println!("Wells saved to: {path}");
    }
    Ok(())
}
