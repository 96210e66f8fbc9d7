//! Population frequency → per-well presence probability.
//!
//! A well holds `n` cells drawn independently from the population, so a clone
//! at frequency `p` is present with probability `1 - (1-p)^n`.

use crate::error::{MadhypeError, Result, check_probability};
use crate::grid::FrequencyGrid;
use crate::repertoire::Repertoire;

/// `1 - (1-p)^n`, evaluated as `-expm1(n·ln1p(-p))` so tiny frequencies
/// keep their precision.
pub fn well_presence_probability(p: f64, n: u64) -> Result<f64> {
    check_probability("clone frequency", p)?;
    if n == 0 {
        return Err(MadhypeError::invalid("draws per well must be at least 1"));
    }
    if p == 0.0 {
        return Ok(0.0);
    }
    if p == 1.0 {
        return Ok(1.0);
    }
    Ok(-(n as f64 * (-p).ln_1p()).exp_m1())
}

/// Element-wise [`well_presence_probability`].
pub fn project_all(frequencies: &[f64], n: u64) -> Result<Vec<f64>> {
    frequencies
        .iter()
        .map(|&p| well_presence_probability(p, n))
        .collect()
}

/// Inverse of [`well_presence_probability`]: the population frequency that
/// yields presence probability `q` with `n` draws per well.
pub fn frequency_from_presence(q: f64, n: u64) -> Result<f64> {
    check_probability("presence probability", q)?;
    if n == 0 {
        return Err(MadhypeError::invalid("draws per well must be at least 1"));
    }
    if q == 1.0 {
        return Ok(1.0);
    }
    Ok(-((-q).ln_1p() / n as f64).exp_m1())
}

/// Presence probabilities for a repertoire and a target grid, projected with
/// the same draw count.
#[derive(Debug, Clone, PartialEq)]
pub struct PresenceProjection {
    pub draws_per_well: u64,
    /// One entry per repertoire clone, in rank order.
    pub repertoire: Vec<f64>,
    /// One entry per grid point, in grid order.
    pub targets: Vec<f64>,
}

impl PresenceProjection {
    pub fn project(repertoire: &Repertoire, grid: &FrequencyGrid, n: u64) -> Result<Self> {
        Ok(Self {
            draws_per_well: n,
            repertoire: project_all(repertoire.frequencies(), n)?,
            targets: project_all(grid.values(), n)?,
        })
    }
}
