use std::path::Path;

use madhype_core::{
    CaseResult, EvaluationReport, PairingConfig, PairingSolver, Result, load_cases, run_battery,
    save_results,
};

pub fn run(cases_path: &str, threshold: f64, method: &str, output: Option<&str>) -> Result<()> {
    let cases = load_cases(Path::new(cases_path))?;
    let method = super::parse_method(method)?;
    println!("Running {} battery cases from {cases_path}...\n", cases.len());

    let mut results: Vec<CaseResult> = Vec::with_capacity(cases.len());
    for case in &cases {
        // The frequency estimate inverts presence with the case's own well load.
        let solver = PairingSolver::new(
            PairingConfig {
                confidence_threshold: threshold,
                method,
                occurrence_window: None,
            },
            case.simulation.cells_per_well as u64,
        )?;
        results.extend(run_battery(std::slice::from_ref(case), &[&solver])?);
    }

    println!(
        "{:>4} {:>6} {:>6} {:>6} {:>5} {:>9} {:>9} {:>9} {:>10} {:>9}",
        "Case", "Wells", "Cells", "Clones", "Reps", "Depth(P)", "Depth(C)", "FDR(P)", "Freq MSE",
        "CI cover"
    );
    println!("{}", "-".repeat(84));
    for (i, result) in results.iter().enumerate() {
        let sim = &result.case.simulation;
        let depth_pairs = result.mean_metric(0, |r| EvaluationReport::depth(r.false_negative_pairs));
        let depth_clones =
            result.mean_metric(0, |r| EvaluationReport::depth(r.false_negative_clones));
        let fdr = result.mean_metric(0, |r| r.false_discovery_pairs);
        let mse = result.mean_metric(0, |r| r.freq_mse);
        let coverage = result.mean_metric(0, |r| r.freq_ci_coverage);
        println!(
            "{:>4} {:>6} {:>6} {:>6} {:>5} {:>9} {:>9} {:>9} {:>10} {:>9}",
            i + 1,
            sim.num_wells,
            sim.cells_per_well,
            sim.num_cells,
            result.case.repetitions,
            super::fmt_rate(depth_pairs),
            super::fmt_rate(depth_clones),
            super::fmt_rate(fdr),
            mse.map_or_else(|| "-".to_string(), |v| format!("{v:.2e}")),
            super::fmt_rate(coverage),
        );
    }

    if let Some(path) = output {
        save_results(Path::new(path), &results)?;
        println!("\nBattery results saved to: {path}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use madhype_core::{BatteryCase, SimulationConfig};

    #[test]
    fn test_run_small_battery() {
        let dir = tempfile::tempdir().unwrap();
        let cases_path = dir.path().join("cases.json");
        let out_path = dir.path().join("results.json");
        let cases = vec![BatteryCase {
            repetitions: 2,
            simulation: SimulationConfig {
                num_wells: 24,
                cells_per_well: 5,
                num_cells: 10,
                ..SimulationConfig::default()
            },
        }];
        std::fs::write(&cases_path, serde_json::to_string(&cases).unwrap()).unwrap();

        run(
            cases_path.to_str().unwrap(),
            0.99,
            "exact",
            Some(out_path.to_str().unwrap()),
        )
        .unwrap();

        let text = std::fs::read_to_string(&out_path).unwrap();
        let saved: Vec<CaseResult> = serde_json::from_str(&text).unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].runs.len(), 2);
        assert_eq!(saved[0].runs[0][0].solver, "pairing");
    }

    #[test]
    fn test_bad_method() {
        let dir = tempfile::tempdir().unwrap();
        let cases_path = dir.path().join("cases.json");
        std::fs::write(&cases_path, "[]").unwrap();
        assert!(run(cases_path.to_str().unwrap(), 0.99, "bogus", None).is_err());
    }
}
