//! Solver seam.
//!
//! A solver turns well observations into a list of clones with frequency
//! estimates. Anything implementing [`Solver`] can be driven by the test
//! battery; [`PairingSolver`] wraps the built-in significance scorer.

use crate::error::{MadhypeError, Result};
use crate::evaluation::{CloneEstimate, Clonotype, SolverResult};
use crate::occurrence::frequency_from_presence;
use crate::pairing::{PairingConfig, score_with_config};
use crate::wells::WellObservation;

/// Two-sided 95% normal quantile.
const Z_95: f64 = 1.959_963_984_540_054;

pub trait Solver: Send + Sync {
    fn name(&self) -> &str;

    fn solve(&self, wells: &[WellObservation]) -> Result<SolverResult>;
}

/// Reports every candidate pair above the threshold as a one-alpha,
/// one-beta clone.
///
/// The frequency estimate inverts the well-presence projection: a pair found
/// in a fraction `q` of wells with `n` cells each implies a population
/// frequency of `1 - (1-q)^(1/n)`. The interval is the Wald interval on `q`
/// mapped through the same inversion.
#[derive(Debug, Clone)]
pub struct PairingSolver {
    pub config: PairingConfig,
    pub draws_per_well: u64,
}

impl PairingSolver {
    pub fn new(config: PairingConfig, draws_per_well: u64) -> Result<Self> {
        if draws_per_well == 0 {
            return Err(MadhypeError::invalid("draws per well must be at least 1"));
        }
        Ok(Self {
            config,
            draws_per_well,
        })
    }
}

impl Solver for PairingSolver {
    fn name(&self) -> &str {
        "pairing"
    }

    fn solve(&self, wells: &[WellObservation]) -> Result<SolverResult> {
        let candidates = score_with_config(wells, &self.config)?;
        let w = wells.len() as f64;

        let clones = candidates
            .into_iter()
            .map(|pair| {
                let q = (pair.co_occurrence_count as f64 / w).clamp(0.0, 1.0);
                let half_width = Z_95 * (q * (1.0 - q) / w).sqrt();
                let q_lo = (q - half_width).max(0.0);
                let q_hi = (q + half_width).min(1.0);
                Ok(CloneEstimate {
                    clonotype: Clonotype::single(pair.chain_a, pair.chain_b),
                    frequency: frequency_from_presence(q, self.draws_per_well)?,
                    frequency_ci: (
                        frequency_from_presence(q_lo, self.draws_per_well)?,
                        frequency_from_presence(q_hi, self.draws_per_well)?,
                    ),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        log::debug!("{} solver reported {} clones", self.name(), clones.len());
        Ok(SolverResult { clones })
    }
}
