//! Combinatorial pairing-significance scorer.
//!
//! Every A-side and B-side chain gets a marginal presence frequency (the
//! fraction of wells it occupies). If two chains were independent, the
//! number of wells holding both would follow `Binomial(W, f_a·f_b)`. A pair
//! is scored by the lower-tail probability of its observed co-occurrence
//! count under that null: a score close to 1 means the count is far above
//! what independence predicts.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use madhype_stats::{BinomialMethod, binomial_cdf};

use crate::error::{MadhypeError, Result, check_probability};
use crate::wells::{ChainId, OccurrenceWindow, WellObservation, filter_by_occurrence};

/// Sparse count of wells shared by each A/B chain pair.
///
/// Chains are indexed in sorted order, which makes every downstream
/// iteration deterministic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CooccurrenceMatrix {
    chains_a: Vec<ChainId>,
    chains_b: Vec<ChainId>,
    marginal_a: Vec<u32>,
    marginal_b: Vec<u32>,
    counts: BTreeMap<(usize, usize), u32>,
    well_count: u64,
}

impl CooccurrenceMatrix {
    pub fn from_wells(wells: &[WellObservation]) -> Result<Self> {
        if wells.is_empty() {
            return Err(MadhypeError::empty("no wells to score"));
        }

        let chains_a: Vec<ChainId> = wells
            .iter()
            .flat_map(|w| w.a.iter().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let chains_b: Vec<ChainId> = wells
            .iter()
            .flat_map(|w| w.b.iter().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let mut marginal_a = vec![0u32; chains_a.len()];
        let mut marginal_b = vec![0u32; chains_b.len()];
        let mut counts = BTreeMap::new();

        for well in wells {
            let idx_a: Vec<usize> = well
                .a
                .iter()
                .filter_map(|c| chains_a.binary_search(c).ok())
                .collect();
            let idx_b: Vec<usize> = well
                .b
                .iter()
                .filter_map(|c| chains_b.binary_search(c).ok())
                .collect();
            for &i in &idx_a {
                marginal_a[i] += 1;
            }
            for &j in &idx_b {
                marginal_b[j] += 1;
            }
            for &i in &idx_a {
                for &j in &idx_b {
                    *counts.entry((i, j)).or_insert(0u32) += 1;
                }
            }
        }

        log::debug!(
            "co-occurrence matrix: wells={}, a_chains={}, b_chains={}, nonzero={}",
            wells.len(),
            chains_a.len(),
            chains_b.len(),
            counts.len()
        );

        Ok(Self {
            chains_a,
            chains_b,
            marginal_a,
            marginal_b,
            counts,
            well_count: wells.len() as u64,
        })
    }

    pub fn well_count(&self) -> u64 {
        self.well_count
    }

    pub fn chains_a(&self) -> &[ChainId] {
        &self.chains_a
    }

    pub fn chains_b(&self) -> &[ChainId] {
        &self.chains_b
    }

    /// Wells containing both `a` and `b`; zero for unknown chains.
    pub fn count(&self, a: &str, b: &str) -> u32 {
        let (Some(i), Some(j)) = (self.index_a(a), self.index_b(b)) else {
            return 0;
        };
        self.counts.get(&(i, j)).copied().unwrap_or(0)
    }

    /// Fraction of wells containing A-side chain `a`.
    pub fn marginal_a(&self, a: &str) -> Option<f64> {
        self.index_a(a)
            .map(|i| self.marginal_a[i] as f64 / self.well_count as f64)
    }

    /// Fraction of wells containing B-side chain `b`.
    pub fn marginal_b(&self, b: &str) -> Option<f64> {
        self.index_b(b)
            .map(|j| self.marginal_b[j] as f64 / self.well_count as f64)
    }

    /// Every pair with a nonzero count, in chain order.
    pub fn nonzero(&self) -> impl Iterator<Item = (&str, &str, u32)> + '_ {
        self.counts.iter().map(|(&(i, j), &c)| {
            (self.chains_a[i].as_str(), self.chains_b[j].as_str(), c)
        })
    }

    fn index_a(&self, a: &str) -> Option<usize> {
        self.chains_a.binary_search_by(|c| c.as_str().cmp(a)).ok()
    }

    fn index_b(&self, b: &str) -> Option<usize> {
        self.chains_b.binary_search_by(|c| c.as_str().cmp(b)).ok()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidatePair {
    pub chain_a: ChainId,
    pub chain_b: ChainId,
    pub co_occurrence_count: u32,
    pub marginal_freq_a: f64,
    pub marginal_freq_b: f64,
    /// `P(X <= co_occurrence_count)` under the independence null.
    pub significance_score: f64,
    /// False when the score came from a normal approximation outside its
    /// valid regime. Always true for the exact method.
    #[serde(default = "default_in_regime")]
    pub in_regime: bool,
}

fn default_in_regime() -> bool {
    true
}

/// Fail if any pair was scored by an out-of-regime approximation.
pub fn require_pairs_in_regime(pairs: &[CandidatePair]) -> Result<()> {
    let out_of_regime = pairs.iter().filter(|p| !p.in_regime).count();
    if out_of_regime == 0 {
        Ok(())
    } else {
        Err(MadhypeError::PreconditionViolation(format!(
            "{out_of_regime} of {} pairs were scored outside the normal-approximation regime",
            pairs.len()
        )))
    }
}

/// Descending score, then descending count, then chain identifiers.
fn rank_order(x: &CandidatePair, y: &CandidatePair) -> Ordering {
    y.significance_score
        .total_cmp(&x.significance_score)
        .then_with(|| y.co_occurrence_count.cmp(&x.co_occurrence_count))
        .then_with(|| x.chain_a.cmp(&y.chain_a))
        .then_with(|| x.chain_b.cmp(&y.chain_b))
}

/// Scorer settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PairingConfig {
    /// Pairs must score strictly above this to become candidates.
    pub confidence_threshold: f64,
    pub method: BinomialMethod,
    /// Applied to the wells before the matrix is built.
    pub occurrence_window: Option<OccurrenceWindow>,
}

impl Default for PairingConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.9999,
            method: BinomialMethod::Exact,
            occurrence_window: None,
        }
    }
}

/// Score every nonzero cell of `matrix`, ranked, with no threshold applied.
pub fn score_all(matrix: &CooccurrenceMatrix, method: BinomialMethod) -> Result<Vec<CandidatePair>> {
    let w = matrix.well_count();
    let mut out_of_regime = 0usize;
    let mut scored = Vec::with_capacity(matrix.counts.len());

    for (&(i, j), &count) in &matrix.counts {
        let f_a = matrix.marginal_a[i] as f64 / w as f64;
        let f_b = matrix.marginal_b[j] as f64 / w as f64;
        let tail = binomial_cdf(u64::from(count), f_a * f_b, w, method)?;
        if !tail.in_regime {
            out_of_regime += 1;
        }
        scored.push(CandidatePair {
            chain_a: matrix.chains_a[i].clone(),
            chain_b: matrix.chains_b[j].clone(),
            co_occurrence_count: count,
            marginal_freq_a: f_a,
            marginal_freq_b: f_b,
            significance_score: tail.value,
            in_regime: tail.in_regime,
        });
    }

    if out_of_regime > 0 {
        log::warn!(
            "normal approximation used outside its valid regime for {out_of_regime} of {} pairs (W={w})",
            scored.len()
        );
    }

    scored.sort_by(rank_order);
    Ok(scored)
}

/// Ranked candidates from an existing matrix.
pub fn score_matrix(
    matrix: &CooccurrenceMatrix,
    confidence_threshold: f64,
    method: BinomialMethod,
) -> Result<Vec<CandidatePair>> {
    check_probability("confidence threshold", confidence_threshold)?;
    let mut scored = score_all(matrix, method)?;
    scored.retain(|p| p.significance_score > confidence_threshold && p.co_occurrence_count > 0);
    log::debug!(
        "{} candidate pairs above threshold {confidence_threshold}",
        scored.len()
    );
    Ok(scored)
}

/// Build the co-occurrence matrix for `wells` and return every pair whose
/// significance exceeds `confidence_threshold`, most significant first.
pub fn score_pairings(
    wells: &[WellObservation],
    confidence_threshold: f64,
    method: BinomialMethod,
) -> Result<Vec<CandidatePair>> {
    check_probability("confidence threshold", confidence_threshold)?;
    let matrix = CooccurrenceMatrix::from_wells(wells)?;
    score_matrix(&matrix, confidence_threshold, method)
}

/// [`score_pairings`] driven by a [`PairingConfig`], applying its occurrence
/// window first when one is set.
pub fn score_with_config(
    wells: &[WellObservation],
    config: &PairingConfig,
) -> Result<Vec<CandidatePair>> {
    match config.occurrence_window {
        Some(window) => {
            let filtered = filter_by_occurrence(wells, window);
            score_pairings(&filtered, config.confidence_threshold, config.method)
        }
        None => score_pairings(wells, config.confidence_threshold, config.method),
    }
}
