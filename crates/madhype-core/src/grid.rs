//! Target-frequency grids and evenly spaced parameter ranges.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{MadhypeError, Result, check_probability};

/// How points are spaced between two endpoints.
///
/// `Log` endpoints are decade exponents: `(-6, -1)` spans `1e-6..=1e-1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Spacing {
    Linear,
    #[default]
    Log,
}

impl fmt::Display for Spacing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Linear => write!(f, "linear"),
            Self::Log => write!(f, "log"),
        }
    }
}

impl FromStr for Spacing {
    type Err = MadhypeError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "linear" | "lin" => Ok(Self::Linear),
            "log" | "logspace" => Ok(Self::Log),
            other => Err(MadhypeError::invalid(format!(
                "unknown spacing '{other}' (expected 'linear' or 'log')"
            ))),
        }
    }
}

/// `num` points from `start` to `stop` inclusive.
pub fn spaced(start: f64, stop: f64, num: usize, spacing: Spacing) -> Result<Vec<f64>> {
    if num == 0 {
        return Err(MadhypeError::empty("a range needs at least one point"));
    }
    if !start.is_finite() || !stop.is_finite() {
        return Err(MadhypeError::invalid(format!(
            "range endpoints must be finite, got {start}..{stop}"
        )));
    }
    let step = if num > 1 {
        (stop - start) / (num - 1) as f64
    } else {
        0.0
    };
    Ok((0..num)
        .map(|i| {
            // Pin the last point so rounding never pushes it past `stop`.
            let x = if i + 1 == num && num > 1 {
                stop
            } else {
                start + step * i as f64
            };
            match spacing {
                Spacing::Linear => x,
                Spacing::Log => 10f64.powf(x),
            }
        })
        .collect())
}

/// Ordered target frequencies at which a failure curve is evaluated.
///
/// Every value lies in `[0, 1]` and the grid is never empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct FrequencyGrid {
    values: Vec<f64>,
}

impl FrequencyGrid {
    pub fn from_values(values: Vec<f64>) -> Result<Self> {
        if values.is_empty() {
            return Err(MadhypeError::empty("frequency grid has no points"));
        }
        for &f in &values {
            check_probability("target frequency", f)?;
        }
        Ok(Self { values })
    }

    /// `num` frequencies `10^x` for `x` evenly spaced in `[start_exp, stop_exp]`.
    pub fn logspace(start_exp: f64, stop_exp: f64, num: usize) -> Result<Self> {
        Self::from_values(spaced(start_exp, stop_exp, num, Spacing::Log)?)
    }

    pub fn linspace(start: f64, stop: f64, num: usize) -> Result<Self> {
        Self::from_values(spaced(start, stop, num, Spacing::Linear)?)
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl TryFrom<Vec<f64>> for FrequencyGrid {
    type Error = MadhypeError;

    fn try_from(values: Vec<f64>) -> Result<Self> {
        Self::from_values(values)
    }
}

impl From<FrequencyGrid> for Vec<f64> {
    fn from(grid: FrequencyGrid) -> Self {
        grid.values
    }
}
