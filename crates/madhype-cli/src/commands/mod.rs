pub mod battery;
pub mod curve;
pub mod pair;
pub mod repertoire;
pub mod simulate;
pub mod sweep;

use std::path::Path;

use clap::Args;
use serde::Serialize;

use madhype_core::{
    AnalysisConfig, FrequencyGrid, MadhypeError, MatchCriterion, Result, Spacing, spaced,
};
use madhype_stats::BinomialMethod;

/// Analysis knobs shared by `curve` and `sweep`. Flags override values
/// loaded from `--config`.
#[derive(Args, Debug, Clone, Default)]
pub struct AnalysisArgs {
    /// Load analysis settings from JSON
    #[arg(long)]
    pub config: Option<String>,

    /// Wells per experiment [default: 96]
    #[arg(long)]
    pub wells: Option<u64>,

    /// Cells drawn into each well [default: 100]
    #[arg(long)]
    pub draws: Option<u64>,

    /// Clones in the background repertoire [default: 3000]
    #[arg(long)]
    pub count: Option<usize>,

    /// Power-law exponent of the repertoire [default: 1.0]
    #[arg(long)]
    pub alpha: Option<f64>,

    /// Target PMF method: exact or normal [default: exact]
    #[arg(long)]
    pub method: Option<String>,

    /// Match criterion: occurrence or wellset [default: occurrence]
    #[arg(long)]
    pub criterion: Option<String>,
}

impl AnalysisArgs {
    pub fn to_config(&self) -> Result<AnalysisConfig> {
        let mut config = match &self.config {
            Some(path) => {
                log::info!("loading analysis config from {path}");
                AnalysisConfig::load(Path::new(path))?
            }
            None => AnalysisConfig::default(),
        };
        if let Some(w) = self.wells {
            config = config.with_well_count(w);
        }
        if let Some(n) = self.draws {
            config = config.with_draws_per_well(n);
        }
        if let Some(count) = self.count {
            config = config.with_repertoire_size(count);
        }
        if let Some(alpha) = self.alpha {
            config = config.with_alpha(alpha);
        }
        if let Some(method) = &self.method {
            config = config.with_method(parse_method(method)?);
        }
        if let Some(criterion) = &self.criterion {
            config = config.with_criterion(criterion.parse::<MatchCriterion>()?);
        }
        config.validate()?;
        Ok(config)
    }
}

/// Target-frequency grid flags.
#[derive(Args, Debug, Clone)]
pub struct GridArgs {
    /// First grid point (a decade exponent with log spacing)
    #[arg(long, default_value = "-6", allow_hyphen_values = true)]
    pub grid_start: f64,

    /// Last grid point (a decade exponent with log spacing)
    #[arg(long, default_value = "-1", allow_hyphen_values = true)]
    pub grid_stop: f64,

    /// Number of grid points
    #[arg(long, default_value = "101")]
    pub grid_points: usize,

    /// Grid spacing: log (default) or linear
    #[arg(long, default_value = "log", value_parser = ["log", "linear"])]
    pub grid_spacing: String,
}

impl GridArgs {
    pub fn to_grid(&self) -> Result<FrequencyGrid> {
        let spacing: Spacing = self.grid_spacing.parse()?;
        FrequencyGrid::from_values(spaced(
            self.grid_start,
            self.grid_stop,
            self.grid_points,
            spacing,
        )?)
    }
}

/// Parse a binomial method name into the enum.
pub fn parse_method(s: &str) -> Result<BinomialMethod> {
    s.parse::<BinomialMethod>().map_err(MadhypeError::from)
}

/// Evenly spaced sweep values; log spacing takes decade exponents.
pub fn sweep_values(start: f64, stop: f64, num: usize, spacing: &str) -> Result<Vec<f64>> {
    spaced(start, stop, num, spacing.parse()?)
}

pub fn write_json<T: Serialize + ?Sized>(path: &str, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Percentage with one decimal, or `n/a` when the rate is undefined.
pub fn fmt_rate(rate: Option<f64>) -> String {
    match rate {
        Some(r) => format!("{:.1}%", 100.0 * r),
        None => "n/a".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -----------------------------------------------------------------------
    // parse_method tests
    // -----------------------------------------------------------------------

    #[test]
    fn test_parse_method_variants() {
        assert_eq!(parse_method("exact").unwrap(), BinomialMethod::Exact);
        assert_eq!(
            parse_method("normal").unwrap(),
            BinomialMethod::NormalApproximation
        );
        assert_eq!(
            parse_method("approx").unwrap(),
            BinomialMethod::NormalApproximation
        );
    }

    #[test]
    fn test_parse_method_unknown() {
        assert!(matches!(parse_method("poisson"), Err(MadhypeError::Stats(_))));
    }

    // -----------------------------------------------------------------------
    // AnalysisArgs tests
    // -----------------------------------------------------------------------

    #[test]
    fn test_args_default_to_config_defaults() {
        let config = AnalysisArgs::default().to_config().unwrap();
        assert_eq!(config, AnalysisConfig::default());
    }

    #[test]
    fn test_flags_override_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("analysis.json");
        AnalysisConfig::default()
            .with_well_count(48)
            .with_alpha(2.0)
            .save(&path)
            .unwrap();

        let args = AnalysisArgs {
            config: Some(path.to_string_lossy().into_owned()),
            alpha: Some(0.5),
            criterion: Some("wellset".into()),
            ..AnalysisArgs::default()
        };
        let config = args.to_config().unwrap();
        assert_eq!(config.well_count, 48);
        assert_eq!(config.alpha, 0.5);
        assert_eq!(config.criterion, MatchCriterion::ExactWellSet);
    }

    #[test]
    fn test_invalid_flag_rejected() {
        let args = AnalysisArgs {
            wells: Some(0),
            ..AnalysisArgs::default()
        };
        assert!(args.to_config().is_err());
    }

    // -----------------------------------------------------------------------
    // grid / sweep helpers
    // -----------------------------------------------------------------------

    #[test]
    fn test_grid_args() {
        let args = GridArgs {
            grid_start: -3.0,
            grid_stop: -1.0,
            grid_points: 3,
            grid_spacing: "log".into(),
        };
        let grid = args.to_grid().unwrap();
        assert_eq!(grid.len(), 3);
        assert!((grid.values()[1] - 0.01).abs() < 1e-15);
    }

    #[test]
    fn test_sweep_values() {
        let values = sweep_values(24.0, 96.0, 4, "linear").unwrap();
        assert_eq!(values, vec![24.0, 48.0, 72.0, 96.0]);
        assert!(sweep_values(0.0, 1.0, 0, "linear").is_err());
    }

    #[test]
    fn test_fmt_rate() {
        assert_eq!(fmt_rate(Some(0.25)), "25.0%");
        assert_eq!(fmt_rate(None), "n/a");
    }

    #[test]
    fn test_write_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        let path = path.to_string_lossy().into_owned();
        write_json(&path, &[1.0, 2.0]).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let back: Vec<f64> = serde_json::from_str(&text).unwrap();
        assert_eq!(back, vec![1.0, 2.0]);
    }
}
