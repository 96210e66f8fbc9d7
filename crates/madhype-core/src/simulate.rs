//! Synthetic well data with a known answer.
//!
//! Cells are drawn with replacement from a power-law clone population, and
//! each chain copy then goes through two noise steps: it may fail to be
//! amplified (deletion) or end up in a different well (misplacement).

use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{MadhypeError, Result, check_probability};
use crate::evaluation::{Clonotype, GroundTruth, TrueClone};
use crate::repertoire::Repertoire;
use crate::wells::WellObservation;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub num_wells: usize,
    pub cells_per_well: usize,
    /// Distinct clones in the population.
    pub num_cells: usize,
    /// Power-law exponent of the clone frequencies.
    pub alpha: f64,
    pub chain_deletion_prob: f64,
    pub chain_misplacement_prob: f64,
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            num_wells: 96,
            cells_per_well: 35,
            num_cells: 1000,
            alpha: 1.0,
            chain_deletion_prob: 0.0,
            chain_misplacement_prob: 0.0,
            seed: 0,
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<()> {
        if self.num_wells == 0 {
            return Err(MadhypeError::invalid("simulation needs at least one well"));
        }
        if self.cells_per_well == 0 {
            return Err(MadhypeError::invalid("cells per well must be at least 1"));
        }
        if self.num_cells == 0 {
            return Err(MadhypeError::invalid("simulation needs at least one clone"));
        }
        check_probability("chain deletion probability", self.chain_deletion_prob)?;
        check_probability("chain misplacement probability", self.chain_misplacement_prob)?;
        Ok(())
    }

    pub fn with_seed(&self, seed: u64) -> Self {
        Self {
            seed,
            ..self.clone()
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatedData {
    pub wells: Vec<WellObservation>,
    pub truth: GroundTruth,
}

impl SimulatedData {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

/// Destination well for one chain copy drawn into `well`.
fn place_chain(rng: &mut StdRng, well: usize, config: &SimulationConfig) -> Option<usize> {
    if rng.random::<f64>() < config.chain_deletion_prob {
        return None;
    }
    if config.num_wells > 1 && rng.random::<f64>() < config.chain_misplacement_prob {
        let other = rng.random_range(0..config.num_wells - 1);
        return Some(if other >= well { other + 1 } else { other });
    }
    Some(well)
}

/// Generate wells and the ground truth behind them. Identical configurations
/// (seed included) always produce identical data.
pub fn simulate_wells(config: &SimulationConfig) -> Result<SimulatedData> {
    config.validate()?;
    let repertoire = Repertoire::power_law(config.num_cells, config.alpha)?;
    let frequencies = repertoire.frequencies();

    let clones: Vec<(String, String)> = (0..config.num_cells)
        .map(|i| (format!("A{i}"), format!("B{i}")))
        .collect();
    let sampler =
        WeightedIndex::new(frequencies).map_err(|e| MadhypeError::invalid(e.to_string()))?;
    let mut rng = StdRng::seed_from_u64(config.seed);

    let mut wells = vec![WellObservation::default(); config.num_wells];
    for well in 0..config.num_wells {
        for _ in 0..config.cells_per_well {
            let (alpha, beta) = &clones[sampler.sample(&mut rng)];
            if let Some(dest) = place_chain(&mut rng, well, config) {
                wells[dest].a.insert(alpha.clone());
            }
            if let Some(dest) = place_chain(&mut rng, well, config) {
                wells[dest].b.insert(beta.clone());
            }
        }
    }

    log::debug!(
        "simulated {} wells x {} cells from {} clones (deletion={}, misplacement={}, seed={})",
        config.num_wells,
        config.cells_per_well,
        config.num_cells,
        config.chain_deletion_prob,
        config.chain_misplacement_prob,
        config.seed
    );

    let truth = GroundTruth {
        clones: clones
            .into_iter()
            .zip(frequencies)
            .map(|((a, b), &frequency)| TrueClone {
                clonotype: Clonotype::single(a, b),
                frequency,
            })
            .collect(),
    };

    Ok(SimulatedData { wells, truth })
}
