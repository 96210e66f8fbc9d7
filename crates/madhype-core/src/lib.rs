//! # madhype-core
//!
//! **Is that chain pair real, or just a crowded repertoire?**
//!
//! `madhype-core` answers two related questions about pooled-well
//! experiments, where each well holds a random sample of cells and only the
//! set of chains present in each well is observed:
//!
//! - **Pairing significance**: given per-well A/B chain observations, how
//!   unlikely is each co-occurrence count if the two chains were independent?
//! - **Decoupling failure**: for a clone at frequency `f`, how likely is some
//!   other clone in a skewed background repertoire to leave an
//!   indistinguishable well-occurrence signature? Computed analytically, with
//!   no simulation.
//!
//! ## Quick Start
//!
//! ```no_run
//! use madhype_core::{AnalysisConfig, FrequencyGrid, analyze};
//!
//! let config = AnalysisConfig::default(); // 96 wells, 100 cells/well, 3000 clones
//! let grid = FrequencyGrid::logspace(-6.0, -1.0, 101).unwrap();
//! let curve = analyze(&config, &grid).unwrap();
//! for (f, p) in curve.points() {
//!     println!("{f:.2e} {p:.4}");
//! }
//! ```
//!
//! ## Architecture
//!
//! Analytic path: Repertoire → Occurrence projection → Decoupling estimator
//! (optionally swept over one parameter).
//!
//! Observed path: Wells → Co-occurrence matrix → Pairing scorer → Evaluation.
//!
//! The simulator and test battery close the loop: simulate wells with a known
//! answer and score one or more [`Solver`]s against the truth.
//!
//! Nothing in this crate prints. Diagnostics go through the `log` facade.

pub mod battery;
pub mod config;
pub mod decoupling;
pub mod error;
pub mod evaluation;
pub mod grid;
pub mod occurrence;
pub mod pairing;
pub mod repertoire;
pub mod simulate;
pub mod solver;
pub mod sweep;
pub mod wells;

pub use battery::{BatteryCase, CaseResult, SolverRun, load_cases, run_battery, save_results};
pub use config::{AnalysisConfig, DecouplingParams, MatchCriterion};
pub use decoupling::{
    FailureCurve, analyze, decoupling_failure_curve, failure_curve, failure_probability,
    repertoire_match_profile,
};
pub use error::{MadhypeError, Result};
pub use evaluation::{
    CloneEstimate, Clonotype, EvaluationReport, GroundTruth, PairingReport, SolverResult,
    TrueClone, evaluate_candidates, evaluate_solver,
};
pub use grid::{FrequencyGrid, Spacing, spaced};
pub use occurrence::{
    PresenceProjection, frequency_from_presence, project_all, well_presence_probability,
};
pub use pairing::{
    CandidatePair, CooccurrenceMatrix, PairingConfig, require_pairs_in_regime, score_all,
    score_matrix, score_pairings, score_with_config,
};
pub use repertoire::{Repertoire, build_repertoire, cumulative_cutoff};
pub use simulate::{SimulatedData, SimulationConfig, simulate_wells};
pub use solver::{PairingSolver, Solver};
pub use sweep::{SweepResult, SweepVariable, run_sweep};
pub use wells::{
    ChainId, ChainOccurrences, OccurrenceWindow, WellObservation, chain_occurrences,
    filter_by_occurrence, load_wells, save_wells,
};

pub use madhype_stats::BinomialMethod;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
