//! Analysis configuration.
//!
//! [`AnalysisConfig`] is an immutable value: the `with_*` builders return new
//! configurations, and parameter sweeps map over a list of them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use madhype_stats::BinomialMethod;

use crate::error::{MadhypeError, Result};
use crate::repertoire::Repertoire;

/// When does a background clone count as indistinguishable from the target?
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchCriterion {
    /// Same number of occupied wells, `C(w,i) f^i (1-f)^(w-i)`.
    #[default]
    OccurrenceCount,
    /// Same set of occupied wells, `f^i (1-f)^(w-i)`.
    ExactWellSet,
}

impl fmt::Display for MatchCriterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OccurrenceCount => write!(f, "occurrence_count"),
            Self::ExactWellSet => write!(f, "exact_well_set"),
        }
    }
}

impl FromStr for MatchCriterion {
    type Err = MadhypeError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "occurrence" | "occurrence_count" | "count" => Ok(Self::OccurrenceCount),
            "exact_well_set" | "wellset" | "well_set" => Ok(Self::ExactWellSet),
            other => Err(MadhypeError::invalid(format!(
                "unknown match criterion '{other}' (expected 'occurrence' or 'wellset')"
            ))),
        }
    }
}

/// The subset of [`AnalysisConfig`] the estimator needs once the repertoire
/// has been built.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecouplingParams {
    pub well_count: u64,
    pub draws_per_well: u64,
    pub method: BinomialMethod,
    pub criterion: MatchCriterion,
}

impl DecouplingParams {
    pub fn validate(&self) -> Result<()> {
        if self.well_count == 0 {
            return Err(MadhypeError::invalid("well count must be at least 1"));
        }
        if self.draws_per_well == 0 {
            return Err(MadhypeError::invalid("draws per well must be at least 1"));
        }
        Ok(())
    }
}

/// Every knob of one analytic run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Wells per experiment (`w`).
    pub well_count: u64,
    /// Cells drawn into each well (`n`).
    pub draws_per_well: u64,
    /// Number of clones in the background repertoire.
    pub repertoire_size: usize,
    /// Power-law exponent of the repertoire.
    pub alpha: f64,
    pub method: BinomialMethod,
    pub criterion: MatchCriterion,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            well_count: 96,
            draws_per_well: 100,
            repertoire_size: 3000,
            alpha: 1.0,
            method: BinomialMethod::Exact,
            criterion: MatchCriterion::OccurrenceCount,
        }
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> Result<()> {
        self.decoupling_params().validate()?;
        if self.repertoire_size == 0 {
            return Err(MadhypeError::invalid("repertoire size must be at least 1"));
        }
        if !self.alpha.is_finite() || self.alpha < 0.0 {
            return Err(MadhypeError::invalid(format!(
                "power-law exponent must be finite and non-negative, got {}",
                self.alpha
            )));
        }
        Ok(())
    }

    pub fn with_well_count(&self, well_count: u64) -> Self {
        Self {
            well_count,
            ..self.clone()
        }
    }

    pub fn with_draws_per_well(&self, draws_per_well: u64) -> Self {
        Self {
            draws_per_well,
            ..self.clone()
        }
    }

    pub fn with_repertoire_size(&self, repertoire_size: usize) -> Self {
        Self {
            repertoire_size,
            ..self.clone()
        }
    }

    pub fn with_alpha(&self, alpha: f64) -> Self {
        Self {
            alpha,
            ..self.clone()
        }
    }

    pub fn with_method(&self, method: BinomialMethod) -> Self {
        Self {
            method,
            ..self.clone()
        }
    }

    pub fn with_criterion(&self, criterion: MatchCriterion) -> Self {
        Self {
            criterion,
            ..self.clone()
        }
    }

    pub fn build_repertoire(&self) -> Result<Repertoire> {
        Repertoire::power_law(self.repertoire_size, self.alpha)
    }

    pub fn decoupling_params(&self) -> DecouplingParams {
        DecouplingParams {
            well_count: self.well_count,
            draws_per_well: self.draws_per_well,
            method: self.method,
            criterion: self.criterion,
        }
    }

    /// Read a configuration from JSON. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AnalysisConfig::default();
        assert_eq!(config.well_count, 96);
        assert_eq!(config.draws_per_well, 100);
        assert_eq!(config.repertoire_size, 3000);
        assert_eq!(config.alpha, 1.0);
        assert_eq!(config.method, BinomialMethod::Exact);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builders_leave_original_untouched() {
        let base = AnalysisConfig::default();
        let changed = base.with_well_count(48).with_alpha(2.0);
        assert_eq!(base.well_count, 96);
        assert_eq!(changed.well_count, 48);
        assert_eq!(changed.alpha, 2.0);
        assert_eq!(changed.draws_per_well, base.draws_per_well);
    }

    #[test]
    fn test_validate_rejects() {
        let base = AnalysisConfig::default();
        assert!(base.with_well_count(0).validate().is_err());
        assert!(base.with_draws_per_well(0).validate().is_err());
        assert!(base.with_repertoire_size(0).validate().is_err());
        assert!(base.with_alpha(-1.0).validate().is_err());
    }

    #[test]
    fn test_criterion_parse() {
        assert_eq!(
            "occurrence".parse::<MatchCriterion>().unwrap(),
            MatchCriterion::OccurrenceCount
        );
        assert_eq!(
            "wellset".parse::<MatchCriterion>().unwrap(),
            MatchCriterion::ExactWellSet
        );
        assert!("nope".parse::<MatchCriterion>().is_err());
        assert_eq!(MatchCriterion::ExactWellSet.to_string(), "exact_well_set");
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: AnalysisConfig =
            serde_json::from_str(r#"{"well_count": 48, "method": "normal_approximation"}"#)
                .unwrap();
        assert_eq!(config.well_count, 48);
        assert_eq!(config.method, BinomialMethod::NormalApproximation);
        assert_eq!(config.repertoire_size, 3000);
    }

    #[test]
    fn test_save_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let config = AnalysisConfig::default()
            .with_draws_per_well(35)
            .with_criterion(MatchCriterion::ExactWellSet);
        config.save(&path).unwrap();
        assert_eq!(AnalysisConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_load_rejects_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, r#"{"well_count": 0}"#).unwrap();
        assert!(AnalysisConfig::load(&path).is_err());
    }
}
