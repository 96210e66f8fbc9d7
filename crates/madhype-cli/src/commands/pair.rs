use std::collections::BTreeSet;
use std::path::Path;

use serde::Serialize;

use madhype_core::{
    CandidatePair, GroundTruth, OccurrenceWindow, PairingConfig, PairingReport, Result,
    SimulatedData, evaluate_candidates, load_wells, require_pairs_in_regime, score_with_config,
};

pub struct PairCommandConfig<'a> {
    pub wells_path: Option<&'a str>,
    pub simulated_path: Option<&'a str>,
    pub threshold: f64,
    pub method: &'a str,
    pub min_wells: Option<u32>,
    pub max_wells: Option<u32>,
    pub top: usize,
    pub strict: bool,
    pub output_path: Option<&'a str>,
}

#[derive(Serialize)]
struct PairOutput<'a> {
    candidates: &'a [CandidatePair],
    #[serde(skip_serializing_if = "Option::is_none")]
    report: Option<&'a PairingReport>,
}

/// An occurrence window from optional bounds; `None` when neither is set.
pub fn occurrence_window(min: Option<u32>, max: Option<u32>) -> Result<Option<OccurrenceWindow>> {
    if min.is_none() && max.is_none() {
        return Ok(None);
    }
    OccurrenceWindow::new(min.unwrap_or(0), max.unwrap_or(u32::MAX)).map(Some)
}

pub fn run(cfg: PairCommandConfig<'_>) -> Result<()> {
    let (wells, truth): (_, Option<GroundTruth>) = match (cfg.simulated_path, cfg.wells_path) {
        (Some(path), _) => {
            let data = SimulatedData::load(Path::new(path))?;
            (data.wells, Some(data.truth))
        }
        (None, Some(path)) => (load_wells(Path::new(path))?, None),
        (None, None) => {
            return Err(madhype_core::MadhypeError::invalid(
                "either --wells or --simulated is required",
            ));
        }
    };

    let config = PairingConfig {
        confidence_threshold: cfg.threshold,
        method: super::parse_method(cfg.method)?,
        occurrence_window: occurrence_window(cfg.min_wells, cfg.max_wells)?,
    };

    println!(
        "Scoring {} wells (threshold {}, method {})...\n",
        wells.len(),
        config.confidence_threshold,
        config.method
    );

    let candidates = score_with_config(&wells, &config)?;
    if cfg.strict {
        require_pairs_in_regime(&candidates)?;
    }
    let true_pairs: Option<BTreeSet<(String, String)>> = truth.as_ref().map(GroundTruth::pairings);

    println!(
        "{:>5} {:<14} {:<14} {:>6} {:>7} {:>7} {:>12} {:>6}",
        "Rank", "Chain A", "Chain B", "Wells", "f(A)", "f(B)", "Score", "True"
    );
    println!("{}", "-".repeat(78));
    for (rank, pair) in candidates.iter().take(cfg.top).enumerate() {
        let verdict = match &true_pairs {
            Some(set) if set.contains(&(pair.chain_a.clone(), pair.chain_b.clone())) => "yes",
            Some(_) => "no",
            None => "-",
        };
        println!(
            "{:>5} {:<14} {:<14} {:>6} {:>7.3} {:>7.3} {:>12.8} {:>6}",
            rank + 1,
            pair.chain_a,
            pair.chain_b,
            pair.co_occurrence_count,
            pair.marginal_freq_a,
            pair.marginal_freq_b,
            pair.significance_score,
            verdict
        );
    }
    if candidates.len() > cfg.top {
        println!("  ... {} more", candidates.len() - cfg.top);
    }
    println!("\n{} candidate pairs", candidates.len());
    let out_of_regime = candidates.iter().filter(|p| !p.in_regime).count();
    if out_of_regime > 0 {
        println!(
            "Note: {out_of_regime} candidates were scored with the normal approximation outside its valid regime"
        );
    }

    let report = truth.as_ref().map(|t| evaluate_candidates(&candidates, t));
    if let Some(report) = &report {
        println!(
            "{}/{} true pairs found, {} false candidates",
            report.num_correct, report.num_true_pairs, report.num_incorrect
        );
        println!(
            "  False negative rate: {}",
            super::fmt_rate(report.false_negative_rate)
        );
        println!(
            "  False discovery rate: {}",
            super::fmt_rate(report.false_discovery_rate)
        );
        for k in [10, 50, 100, 500] {
            if let Some(p) = report.cumulative_precision.get(k - 1) {
                println!("  Precision at rank {k}: {:.1}%", 100.0 * p);
            }
        }
    }

    if let Some(path) = cfg.output_path {
        super::write_json(
            path,
            &PairOutput {
                candidates: &candidates,
                report: report.as_ref(),
            },
        )?;
        println!("\nCandidates saved to: {path}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_absent() {
        assert_eq!(occurrence_window(None, None).unwrap(), None);
    }

    #[test]
    fn test_window_one_sided() {
        let w = occurrence_window(Some(4), None).unwrap().unwrap();
        assert_eq!(w.min, 4);
        assert_eq!(w.max, u32::MAX);
        let w = occurrence_window(None, Some(91)).unwrap().unwrap();
        assert_eq!(w.min, 0);
        assert_eq!(w.max, 91);
    }

    #[test]
    fn test_window_inverted() {
        assert!(occurrence_window(Some(10), Some(2)).is_err());
    }

    #[test]
    fn test_strict_rejects_out_of_regime_scores() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wells.json");
        let wells: Vec<_> = (0..40)
            .map(|i| {
                madhype_core::WellObservation::new([format!("A{}", i % 2)], [format!("B{}", i % 2)])
            })
            .collect();
        madhype_core::save_wells(&path, &wells).unwrap();
        let path = path.to_string_lossy().into_owned();

        fn config<'a>(path: &'a str, method: &'a str, strict: bool) -> PairCommandConfig<'a> {
            PairCommandConfig {
                wells_path: Some(path),
                simulated_path: None,
                threshold: 0.99,
                method,
                min_wells: None,
                max_wells: None,
                top: 5,
                strict,
                output_path: None,
            }
        }
        assert!(matches!(
            run(config(&path, "normal", true)),
            Err(madhype_core::MadhypeError::PreconditionViolation(_))
        ));
        assert!(run(config(&path, "normal", false)).is_ok());
        assert!(run(config(&path, "exact", true)).is_ok());
    }
}
