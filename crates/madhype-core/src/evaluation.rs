//! Scoring inferred pairs and clones against a known ground truth.
//!
//! Rates whose denominator is empty are reported as `None` rather than NaN,
//! so a report always serializes to valid JSON.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::pairing::CandidatePair;
use crate::repertoire::cumulative_cutoff;
use crate::wells::{ChainId, WellObservation};

/// Cumulative frequency mass that separates top clones from tail clones.
pub const TOP_CLONE_FRACTION: f64 = 0.5;

/// A clone identified by its chains. Most clones carry one chain per side;
/// a clone with more than one chain on either side is "dual".
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Clonotype {
    pub alphas: BTreeSet<ChainId>,
    pub betas: BTreeSet<ChainId>,
}

impl Clonotype {
    pub fn new<A, B>(alphas: A, betas: B) -> Self
    where
        A: IntoIterator,
        A::Item: Into<ChainId>,
        B: IntoIterator,
        B::Item: Into<ChainId>,
    {
        Self {
            alphas: alphas.into_iter().map(Into::into).collect(),
            betas: betas.into_iter().map(Into::into).collect(),
        }
    }

    pub fn single(alpha: impl Into<ChainId>, beta: impl Into<ChainId>) -> Self {
        Self::new([alpha.into()], [beta.into()])
    }

    pub fn is_dual(&self) -> bool {
        self.alphas.len() > 1 || self.betas.len() > 1
    }

    /// Every A/B chain combination the clone implies.
    pub fn pairings(&self) -> impl Iterator<Item = (ChainId, ChainId)> + '_ {
        self.alphas
            .iter()
            .flat_map(|a| self.betas.iter().map(move |b| (a.clone(), b.clone())))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrueClone {
    pub clonotype: Clonotype,
    pub frequency: f64,
}

/// The clones actually present in a sample. Never modified by analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroundTruth {
    pub clones: Vec<TrueClone>,
}

impl GroundTruth {
    pub fn pairings(&self) -> BTreeSet<(ChainId, ChainId)> {
        self.clones
            .iter()
            .flat_map(|c| c.clonotype.pairings())
            .collect()
    }

    pub fn clonotypes(&self) -> BTreeSet<Clonotype> {
        self.clones.iter().map(|c| c.clonotype.clone()).collect()
    }

    pub fn frequency_of(&self, clonotype: &Clonotype) -> Option<f64> {
        self.clones
            .iter()
            .find(|c| &c.clonotype == clonotype)
            .map(|c| c.frequency)
    }

    /// Split clones into the most frequent ones, whose cumulative frequency
    /// stays below `fraction`, and the rest.
    pub fn split_top_tail(&self, fraction: f64) -> (BTreeSet<Clonotype>, BTreeSet<Clonotype>) {
        let mut ranked: Vec<&TrueClone> = self.clones.iter().collect();
        ranked.sort_by(|x, y| {
            y.frequency
                .total_cmp(&x.frequency)
                .then_with(|| y.clonotype.cmp(&x.clonotype))
        });
        let freqs: Vec<f64> = ranked.iter().map(|c| c.frequency).collect();
        let cutoff = cumulative_cutoff(&freqs, fraction);
        let top = ranked[..cutoff].iter().map(|c| c.clonotype.clone()).collect();
        let tail = ranked[cutoff..].iter().map(|c| c.clonotype.clone()).collect();
        (top, tail)
    }
}

/// A clone reported by a solver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloneEstimate {
    pub clonotype: Clonotype,
    pub frequency: f64,
    /// Inclusive `(low, high)` interval on the frequency.
    pub frequency_ci: (f64, f64),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SolverResult {
    pub clones: Vec<CloneEstimate>,
}

impl SolverResult {
    pub fn pairings(&self) -> BTreeSet<(ChainId, ChainId)> {
        self.clones
            .iter()
            .flat_map(|c| c.clonotype.pairings())
            .collect()
    }
}

fn ratio(numerator: usize, denominator: usize) -> Option<f64> {
    (denominator > 0).then(|| numerator as f64 / denominator as f64)
}

fn miss_rate(found: usize, total: usize) -> Option<f64> {
    ratio(found, total).map(|r| 1.0 - r)
}

// ---------------------------------------------------------------------------
// Ranked candidate lists
// ---------------------------------------------------------------------------

/// Accuracy of a ranked candidate list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairingReport {
    pub num_true_pairs: usize,
    pub num_candidates: usize,
    pub num_correct: usize,
    pub num_incorrect: usize,
    pub false_negative_rate: Option<f64>,
    pub false_discovery_rate: Option<f64>,
    /// Precision after each candidate in rank order.
    pub cumulative_precision: Vec<f64>,
    /// True positives after `k` candidates, for `k = 0..=num_candidates`.
    pub true_positives: Vec<usize>,
    /// False positives after `k` candidates, for `k = 0..=num_candidates`.
    pub false_positives: Vec<usize>,
}

pub fn evaluate_candidates(candidates: &[CandidatePair], truth: &GroundTruth) -> PairingReport {
    let true_pairs = truth.pairings();
    let mut true_positives = Vec::with_capacity(candidates.len() + 1);
    let mut false_positives = Vec::with_capacity(candidates.len() + 1);
    let mut cumulative_precision = Vec::with_capacity(candidates.len());
    let (mut tp, mut fp) = (0usize, 0usize);
    true_positives.push(tp);
    false_positives.push(fp);

    for candidate in candidates {
        let key = (candidate.chain_a.clone(), candidate.chain_b.clone());
        if true_pairs.contains(&key) {
            tp += 1;
        } else {
            fp += 1;
        }
        true_positives.push(tp);
        false_positives.push(fp);
        cumulative_precision.push(tp as f64 / (tp + fp) as f64);
    }

    PairingReport {
        num_true_pairs: true_pairs.len(),
        num_candidates: candidates.len(),
        num_correct: tp,
        num_incorrect: fp,
        false_negative_rate: miss_rate(tp, true_pairs.len()),
        false_discovery_rate: ratio(fp, candidates.len()),
        cumulative_precision,
        true_positives,
        false_positives,
    }
}

// ---------------------------------------------------------------------------
// Solver results
// ---------------------------------------------------------------------------

/// Full accuracy report of one solver run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub num_clones: usize,
    pub num_dual_alpha_clones: usize,
    pub num_dual_beta_clones: usize,
    pub num_alphas: usize,
    pub num_betas: usize,
    pub num_alphas_observed: usize,
    pub num_betas_observed: usize,
    pub num_top_clones: usize,
    pub num_tail_clones: usize,
    pub num_top_dual_clones: usize,
    pub num_tail_dual_clones: usize,

    pub num_pred_pairs: usize,
    pub num_pred_pairs_correct: usize,
    pub num_pred_pairs_incorrect: usize,
    pub num_pred_clones: usize,
    pub num_pred_clones_correct: usize,
    pub num_pred_clones_incorrect: usize,
    pub num_pred_dual_clones: usize,
    pub num_pred_dual_clones_correct: usize,
    pub num_pred_dual_clones_incorrect: usize,

    pub false_negative_pairs: Option<f64>,
    pub false_negative_clones: Option<f64>,
    pub false_negative_top_clones: Option<f64>,
    pub false_negative_tail_clones: Option<f64>,
    pub false_negative_dual_clones: Option<f64>,
    pub false_negative_top_dual_clones: Option<f64>,
    pub false_negative_tail_dual_clones: Option<f64>,
    /// Measured only against true dual clones whose every pairing was
    /// predicted, so a missed pairing does not count twice.
    pub false_negative_dual_clones_adj: Option<f64>,
    pub false_negative_top_dual_clones_adj: Option<f64>,
    pub false_negative_tail_dual_clones_adj: Option<f64>,

    pub false_discovery_pairs: Option<f64>,
    pub false_discovery_clones: Option<f64>,
    pub false_discovery_dual_clones: Option<f64>,

    /// Mean squared error of predicted frequencies; clones absent from the
    /// truth count with a true frequency of zero.
    pub freq_mse: Option<f64>,
    /// Fraction of predicted clones whose true frequency lies inside the
    /// reported interval.
    pub freq_ci_coverage: Option<f64>,
}

impl EvaluationReport {
    /// `1 - rate`, the fraction recovered.
    pub fn depth(rate: Option<f64>) -> Option<f64> {
        rate.map(|r| 1.0 - r)
    }
}

pub fn evaluate_solver(
    result: &SolverResult,
    truth: &GroundTruth,
    observed_wells: &[WellObservation],
) -> EvaluationReport {
    let true_clones = truth.clonotypes();
    let true_pairs = truth.pairings();
    let (top, tail) = truth.split_top_tail(TOP_CLONE_FRACTION);

    let true_dual: BTreeSet<&Clonotype> = true_clones.iter().filter(|c| c.is_dual()).collect();
    let top_dual: BTreeSet<&Clonotype> = top.iter().filter(|c| c.is_dual()).collect();
    let tail_dual: BTreeSet<&Clonotype> = tail.iter().filter(|c| c.is_dual()).collect();

    let all_alphas: BTreeSet<&ChainId> = true_clones.iter().flat_map(|c| &c.alphas).collect();
    let all_betas: BTreeSet<&ChainId> = true_clones.iter().flat_map(|c| &c.betas).collect();
    let obs_alphas: BTreeSet<&ChainId> = observed_wells.iter().flat_map(|w| &w.a).collect();
    let obs_betas: BTreeSet<&ChainId> = observed_wells.iter().flat_map(|w| &w.b).collect();

    // A clonotype reported twice counts once.
    let predicted: BTreeSet<&Clonotype> = result.clones.iter().map(|c| &c.clonotype).collect();
    let predicted_pairs = result.pairings();
    let predicted_dual: Vec<&Clonotype> = predicted.iter().copied().filter(|c| c.is_dual()).collect();

    let count_in = |set: &BTreeSet<Clonotype>| predicted.iter().filter(|c| set.contains(**c)).count();
    let correct_clones = count_in(&true_clones);
    let correct_top = count_in(&top);
    let correct_tail = count_in(&tail);

    let dual_in = |set: &BTreeSet<&Clonotype>| predicted_dual.iter().filter(|c| set.contains(*c)).count();
    let correct_dual = dual_in(&true_dual);
    let correct_top_dual = dual_in(&top_dual);
    let correct_tail_dual = dual_in(&tail_dual);

    let fully_paired = |c: &&&Clonotype| c.pairings().all(|p| predicted_pairs.contains(&p));
    let candidate_dual = true_dual.iter().filter(fully_paired).count();
    let candidate_top_dual = top_dual.iter().filter(fully_paired).count();
    let candidate_tail_dual = tail_dual.iter().filter(fully_paired).count();

    let correct_pairs = predicted_pairs.intersection(&true_pairs).count();
    let incorrect_pairs = predicted_pairs.len() - correct_pairs;

    let mut squared_error = 0.0;
    let mut covered = 0usize;
    for estimate in &result.clones {
        let true_freq = truth.frequency_of(&estimate.clonotype).unwrap_or(0.0);
        squared_error += (true_freq - estimate.frequency).powi(2);
        let (lo, hi) = estimate.frequency_ci;
        if lo <= true_freq && true_freq <= hi {
            covered += 1;
        }
    }
    let n_pred = result.clones.len();

    EvaluationReport {
        num_clones: truth.clones.len(),
        num_dual_alpha_clones: truth.clones.iter().filter(|c| c.clonotype.alphas.len() > 1).count(),
        num_dual_beta_clones: truth.clones.iter().filter(|c| c.clonotype.betas.len() > 1).count(),
        num_alphas: all_alphas.len(),
        num_betas: all_betas.len(),
        num_alphas_observed: obs_alphas.len(),
        num_betas_observed: obs_betas.len(),
        num_top_clones: top.len(),
        num_tail_clones: tail.len(),
        num_top_dual_clones: top_dual.len(),
        num_tail_dual_clones: tail_dual.len(),

        num_pred_pairs: predicted_pairs.len(),
        num_pred_pairs_correct: correct_pairs,
        num_pred_pairs_incorrect: incorrect_pairs,
        num_pred_clones: predicted.len(),
        num_pred_clones_correct: correct_clones,
        num_pred_clones_incorrect: predicted.len() - correct_clones,
        num_pred_dual_clones: predicted_dual.len(),
        num_pred_dual_clones_correct: correct_dual,
        num_pred_dual_clones_incorrect: predicted_dual.len() - correct_dual,

        false_negative_pairs: miss_rate(correct_pairs, true_pairs.len()),
        false_negative_clones: miss_rate(correct_clones, true_clones.len()),
        false_negative_top_clones: miss_rate(correct_top, top.len()),
        false_negative_tail_clones: miss_rate(correct_tail, tail.len()),
        false_negative_dual_clones: miss_rate(correct_dual, true_dual.len()),
        false_negative_top_dual_clones: miss_rate(correct_top_dual, top_dual.len()),
        false_negative_tail_dual_clones: miss_rate(correct_tail_dual, tail_dual.len()),
        false_negative_dual_clones_adj: miss_rate(correct_dual, candidate_dual),
        false_negative_top_dual_clones_adj: miss_rate(correct_top_dual, candidate_top_dual),
        false_negative_tail_dual_clones_adj: miss_rate(correct_tail_dual, candidate_tail_dual),

        false_discovery_pairs: ratio(incorrect_pairs, predicted_pairs.len()),
        false_discovery_clones: miss_rate(correct_clones, predicted.len()),
        false_discovery_dual_clones: miss_rate(correct_dual, predicted_dual.len()),

        freq_mse: (n_pred > 0).then(|| squared_error / n_pred as f64),
        freq_ci_coverage: ratio(covered, n_pred),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn truth() -> GroundTruth {
        GroundTruth {
            clones: vec![
                TrueClone {
                    clonotype: Clonotype::single("A1", "B1"),
                    frequency: 0.4,
                },
                TrueClone {
                    clonotype: Clonotype::new(["A2", "A3"], ["B2"]),
                    frequency: 0.3,
                },
                TrueClone {
                    clonotype: Clonotype::single("A4", "B4"),
                    frequency: 0.2,
                },
                TrueClone {
                    clonotype: Clonotype::single("A5", "B5"),
                    frequency: 0.1,
                },
            ],
        }
    }

    fn estimate(clonotype: Clonotype, frequency: f64, ci: (f64, f64)) -> CloneEstimate {
        CloneEstimate {
            clonotype,
            frequency,
            frequency_ci: ci,
        }
    }

    fn candidate(a: &str, b: &str) -> CandidatePair {
        CandidatePair {
            chain_a: a.into(),
            chain_b: b.into(),
            co_occurrence_count: 1,
            marginal_freq_a: 0.5,
            marginal_freq_b: 0.5,
            significance_score: 0.99,
            in_regime: true,
        }
    }

    #[test]
    fn test_clonotype_pairings() {
        let c = Clonotype::new(["A1", "A2"], ["B1"]);
        assert!(c.is_dual());
        assert!(!Clonotype::single("A", "B").is_dual());
        let pairs: Vec<_> = c.pairings().collect();
        assert_eq!(
            pairs,
            vec![
                ("A1".to_string(), "B1".to_string()),
                ("A2".to_string(), "B1".to_string())
            ]
        );
        assert_eq!(truth().pairings().len(), 5);
    }

    #[test]
    fn test_top_tail_split() {
        let (top, tail) = truth().split_top_tail(0.5);
        // 0.4 < 0.5, 0.7 is not
        assert_eq!(top.len(), 1);
        assert!(top.contains(&Clonotype::single("A1", "B1")));
        assert_eq!(tail.len(), 3);
    }

    #[test]
    fn test_candidate_curve() {
        let ranked = vec![
            candidate("A1", "B1"),
            candidate("A9", "B9"),
            candidate("A2", "B2"),
        ];
        let report = evaluate_candidates(&ranked, &truth());
        assert_eq!(report.num_correct, 2);
        assert_eq!(report.num_incorrect, 1);
        assert_eq!(report.true_positives, vec![0, 1, 1, 2]);
        assert_eq!(report.false_positives, vec![0, 0, 1, 1]);
        assert_eq!(report.cumulative_precision.len(), 3);
        assert!((report.cumulative_precision[1] - 0.5).abs() < 1e-12);
        assert!((report.false_negative_rate.unwrap() - 0.6).abs() < 1e-12);
        assert!((report.false_discovery_rate.unwrap() - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_candidates_are_none() {
        let report = evaluate_candidates(&[], &truth());
        assert_eq!(report.false_discovery_rate, None);
        assert_eq!(report.false_negative_rate, Some(1.0));
        assert_eq!(report.true_positives, vec![0]);
    }

    #[test]
    fn test_solver_report() {
        let result = SolverResult {
            clones: vec![
                estimate(Clonotype::single("A1", "B1"), 0.38, (0.3, 0.5)),
                estimate(Clonotype::new(["A2", "A3"], ["B2"]), 0.2, (0.1, 0.25)),
                estimate(Clonotype::single("A9", "B9"), 0.1, (0.0, 0.2)),
            ],
        };
        let wells = vec![
            WellObservation::new(["A1", "A2"], ["B1"]),
            WellObservation::new(["A9"], ["B9", "B2"]),
        ];
        let r = evaluate_solver(&result, &truth(), &wells);

        assert_eq!(r.num_clones, 4);
        assert_eq!(r.num_dual_alpha_clones, 1);
        assert_eq!(r.num_dual_beta_clones, 0);
        assert_eq!(r.num_alphas, 5);
        assert_eq!(r.num_alphas_observed, 3);
        assert_eq!(r.num_betas_observed, 3);

        assert_eq!(r.num_pred_pairs, 4);
        assert_eq!(r.num_pred_pairs_correct, 3);
        assert_eq!(r.num_pred_clones_correct, 2);
        assert_eq!(r.num_pred_dual_clones, 1);
        assert_eq!(r.num_pred_dual_clones_correct, 1);

        assert!((r.false_negative_pairs.unwrap() - 0.4).abs() < 1e-12);
        assert!((r.false_negative_clones.unwrap() - 0.5).abs() < 1e-12);
        assert_eq!(r.false_negative_top_clones, Some(0.0));
        assert_eq!(r.false_negative_dual_clones, Some(0.0));
        assert_eq!(r.false_negative_dual_clones_adj, Some(0.0));
        assert_eq!(r.false_negative_top_dual_clones, None);
        assert!((r.false_discovery_pairs.unwrap() - 0.25).abs() < 1e-12);
        assert!((r.false_discovery_clones.unwrap() - 1.0 / 3.0).abs() < 1e-12);

        // (0.02^2 + 0.1^2 + 0.1^2) / 3
        let mse = (0.0004 + 0.01 + 0.01) / 3.0;
        assert!((r.freq_mse.unwrap() - mse).abs() < 1e-12);
        // A2A3/B2 has true 0.3 outside (0.1, 0.25); A9/B9 has true 0 inside.
        assert!((r.freq_ci_coverage.unwrap() - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_repeated_clones_count_once() {
        let a1 = Clonotype::single("A1", "B1");
        let a4 = Clonotype::single("A4", "B4");
        let result = SolverResult {
            clones: vec![
                estimate(a1.clone(), 0.4, (0.3, 0.5)),
                estimate(a1, 0.4, (0.3, 0.5)),
                estimate(a4.clone(), 0.2, (0.1, 0.3)),
                estimate(a4.clone(), 0.2, (0.1, 0.3)),
                estimate(a4, 0.2, (0.1, 0.3)),
            ],
        };
        let r = evaluate_solver(&result, &truth(), &[]);

        assert_eq!(r.num_pred_clones, 2);
        assert_eq!(r.num_pred_clones_correct, 2);
        assert_eq!(r.num_pred_clones_incorrect, 0);
        assert!((r.false_negative_clones.unwrap() - 0.5).abs() < 1e-12);
        assert_eq!(r.false_negative_top_clones, Some(0.0));
        assert!((r.false_negative_tail_clones.unwrap() - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(r.false_discovery_clones, Some(0.0));
    }

    #[test]
    fn test_empty_result() {
        let r = evaluate_solver(&SolverResult::default(), &truth(), &[]);
        assert_eq!(r.freq_mse, None);
        assert_eq!(r.false_discovery_clones, None);
        assert_eq!(r.false_negative_clones, Some(1.0));
        assert_eq!(EvaluationReport::depth(r.false_negative_clones), Some(0.0));
    }
}
