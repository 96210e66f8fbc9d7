//! Repeated simulate → solve → evaluate runs.
//!
//! A battery is a list of cases. Each case is simulated `repetitions` times
//! (repetition `r` uses seed `simulation.seed + r`), every solver is run on
//! every simulated data set, and each run is scored against the simulation's
//! ground truth.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{MadhypeError, Result};
use crate::evaluation::{EvaluationReport, evaluate_solver};
use crate::simulate::{SimulationConfig, simulate_wells};
use crate::solver::Solver;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatteryCase {
    pub repetitions: usize,
    pub simulation: SimulationConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverRun {
    pub solver: String,
    pub report: EvaluationReport,
}

/// `runs[rep][solver]` for one case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseResult {
    pub case: BatteryCase,
    pub runs: Vec<Vec<SolverRun>>,
}

impl CaseResult {
    /// Mean of `metric` over all repetitions of solver `solver_index`,
    /// skipping repetitions where it is undefined.
    pub fn mean_metric<F>(&self, solver_index: usize, metric: F) -> Option<f64>
    where
        F: Fn(&EvaluationReport) -> Option<f64>,
    {
        let values: Vec<f64> = self
            .runs
            .iter()
            .filter_map(|rep| rep.get(solver_index))
            .filter_map(|run| metric(&run.report))
            .collect();
        (!values.is_empty()).then(|| values.iter().sum::<f64>() / values.len() as f64)
    }
}

pub fn run_battery(cases: &[BatteryCase], solvers: &[&dyn Solver]) -> Result<Vec<CaseResult>> {
    if solvers.is_empty() {
        return Err(MadhypeError::empty("battery needs at least one solver"));
    }

    let mut results = Vec::with_capacity(cases.len());
    for (case_index, case) in cases.iter().enumerate() {
        case.simulation.validate()?;
        log::debug!(
            "battery case {case_index}: {} repetitions, {} solvers",
            case.repetitions,
            solvers.len()
        );

        let mut runs = Vec::with_capacity(case.repetitions);
        for rep in 0..case.repetitions {
            let seed = case.simulation.seed.wrapping_add(rep as u64);
            let data = simulate_wells(&case.simulation.with_seed(seed))?;
            let mut rep_runs = Vec::with_capacity(solvers.len());
            for solver in solvers {
                let solved = solver.solve(&data.wells)?;
                rep_runs.push(SolverRun {
                    solver: solver.name().to_string(),
                    report: evaluate_solver(&solved, &data.truth, &data.wells),
                });
            }
            runs.push(rep_runs);
        }
        results.push(CaseResult {
            case: case.clone(),
            runs,
        });
    }
    Ok(results)
}

pub fn load_cases(path: &Path) -> Result<Vec<BatteryCase>> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

pub fn save_results(path: &Path, results: &[CaseResult]) -> Result<()> {
    let json = serde_json::to_string_pretty(results)?;
    std::fs::write(path, json)?;
    Ok(())
}
