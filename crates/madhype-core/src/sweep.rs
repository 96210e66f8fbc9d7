//! One-dimensional parameter sweeps over the analytic estimator.
//!
//! Each sweep value produces an independent configuration (the repertoire is
//! rebuilt from scratch for every one), so the map runs in parallel and the
//! results come back in the order of the input values.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::config::AnalysisConfig;
use crate::decoupling::analyze;
use crate::error::{MadhypeError, Result};
use crate::grid::FrequencyGrid;

/// The configuration field a sweep varies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepVariable {
    WellCount,
    DrawsPerWell,
    Alpha,
    RepertoireSize,
}

impl fmt::Display for SweepVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::WellCount => "w",
            Self::DrawsPerWell => "n",
            Self::Alpha => "alpha",
            Self::RepertoireSize => "count",
        };
        write!(f, "{name}")
    }
}

impl FromStr for SweepVariable {
    type Err = MadhypeError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "w" | "wells" | "well_count" => Ok(Self::WellCount),
            "n" | "draws" | "draws_per_well" => Ok(Self::DrawsPerWell),
            "alpha" => Ok(Self::Alpha),
            "count" | "repertoire_size" => Ok(Self::RepertoireSize),
            other => Err(MadhypeError::invalid(format!(
                "unknown sweep variable '{other}' (expected w, n, alpha or count)"
            ))),
        }
    }
}

/// Largest value accepted for an integer sweep variable.
const MAX_SWEEP_COUNT: f64 = u32::MAX as f64;

fn as_count(variable: SweepVariable, value: f64) -> Result<u64> {
    if !value.is_finite() || value < 0.0 {
        return Err(MadhypeError::invalid(format!(
            "sweep value for {variable} must be a finite non-negative number, got {value}"
        )));
    }
    let rounded = value.round();
    if rounded > MAX_SWEEP_COUNT {
        return Err(MadhypeError::invalid(format!(
            "sweep value for {variable} must not exceed {MAX_SWEEP_COUNT}, got {value}"
        )));
    }
    Ok(rounded as u64)
}

impl SweepVariable {
    /// `base` with this variable set to `value`. Integer variables are
    /// rounded to the nearest whole number.
    pub fn apply(self, base: &AnalysisConfig, value: f64) -> Result<AnalysisConfig> {
        let config = match self {
            Self::WellCount => base.with_well_count(as_count(self, value)?),
            Self::DrawsPerWell => base.with_draws_per_well(as_count(self, value)?),
            Self::Alpha => base.with_alpha(value),
            Self::RepertoireSize => base.with_repertoire_size(as_count(self, value)? as usize),
        };
        config.validate()?;
        Ok(config)
    }
}

/// Failure curves for every sweep value, as a `values × frequencies` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepResult {
    pub variable: SweepVariable,
    pub values: Vec<f64>,
    pub frequencies: Vec<f64>,
    /// `failure[v][j]`: sweep value `values[v]`, target `frequencies[j]`.
    pub failure: Vec<Vec<f64>>,
}

pub fn run_sweep(
    base: &AnalysisConfig,
    variable: SweepVariable,
    values: &[f64],
    grid: &FrequencyGrid,
) -> Result<SweepResult> {
    if values.is_empty() {
        return Err(MadhypeError::empty("sweep has no values"));
    }
    // Reject every bad configuration before spending time on the good ones.
    let configs = values
        .iter()
        .map(|&v| variable.apply(base, v))
        .collect::<Result<Vec<_>>>()?;

    log::debug!("sweeping {variable} over {} values", values.len());

    let failure = configs
        .par_iter()
        .map(|config| analyze(config, grid).map(|curve| curve.failure))
        .collect::<Result<Vec<_>>>()?;

    Ok(SweepResult {
        variable,
        values: values.to_vec(),
        frequencies: grid.values().to_vec(),
        failure,
    })
}
