//! Analytic decoupling-failure estimator.
//!
//! For a target clone at frequency `f`, the estimator asks how likely it is
//! that at least one clone of the background repertoire produces a
//! well-occurrence signature indistinguishable from the target's:
//!
//! ```text
//! match[i]   = 1 - Π_k (1 - m(w, p_present[k], i))      i = 0..=w
//! failure(f) = Σ_i pmf(w, f_present)[i] · match[i]
//! ```
//!
//! `m` is the single-pattern probability of the chosen [`MatchCriterion`].
//! Background clones are treated as independent of one another. That is a
//! modeling limitation of the estimator: real wells have a fixed capacity,
//! so occupancies are weakly anti-correlated.

use serde::{Deserialize, Serialize};

use madhype_stats::{
    BinomialMethod, binomial_pmf, exact_pattern_probability, single_pattern_match_probability,
};

use crate::config::{AnalysisConfig, DecouplingParams, MatchCriterion};
use crate::error::{MadhypeError, Result};
use crate::grid::FrequencyGrid;
use crate::occurrence::PresenceProjection;
use crate::repertoire::Repertoire;

/// Failure probability at each target frequency of a grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureCurve {
    /// The grid, unchanged.
    pub frequencies: Vec<f64>,
    /// `failure[j]` belongs to `frequencies[j]`; every value lies in `[0, 1]`.
    pub failure: Vec<f64>,
    /// Grid points where the normal approximation ran outside its regime.
    #[serde(default)]
    pub out_of_regime: usize,
}

impl FailureCurve {
    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.frequencies
            .iter()
            .copied()
            .zip(self.failure.iter().copied())
    }

    /// Grid point with the highest failure probability.
    pub fn worst(&self) -> Option<(f64, f64)> {
        self.points().max_by(|a, b| a.1.total_cmp(&b.1))
    }

    /// Fail if any point relied on an out-of-regime approximation.
    pub fn require_in_regime(&self) -> Result<()> {
        if self.out_of_regime == 0 {
            Ok(())
        } else {
            Err(MadhypeError::PreconditionViolation(format!(
                "{} of {} target frequencies fall outside the normal-approximation regime",
                self.out_of_regime,
                self.frequencies.len()
            )))
        }
    }
}

/// Probability that at least one background clone matches a signature with
/// `i` occupied wells, for every `i` in `0..=w`.
///
/// The product over clones is accumulated as a sum of `ln(1 - m)`, so
/// thousands of factors close to one neither underflow nor lose precision.
pub fn repertoire_match_profile(
    p_present: &[f64],
    well_count: u64,
    criterion: MatchCriterion,
) -> Result<Vec<f64>> {
    (0..=well_count)
        .map(|i| {
            let mut ln_none = 0.0;
            for &p in p_present {
                let m = match criterion {
                    MatchCriterion::OccurrenceCount => {
                        single_pattern_match_probability(well_count, p, i)?
                    }
                    MatchCriterion::ExactWellSet => exact_pattern_probability(well_count, p, i)?,
                };
                ln_none += (-m).ln_1p();
            }
            Ok(-ln_none.exp_m1())
        })
        .collect()
}

/// `Σ_i pmf[i] · match_profile[i]`, clamped to `[0, 1]` against rounding.
pub fn failure_probability(pmf: &[f64], match_profile: &[f64]) -> Result<f64> {
    if pmf.len() != match_profile.len() {
        return Err(MadhypeError::invalid(format!(
            "pattern vector has {} entries but match profile has {}",
            pmf.len(),
            match_profile.len()
        )));
    }
    let total: f64 = pmf.iter().zip(match_profile).map(|(a, b)| a * b).sum();
    Ok(total.clamp(0.0, 1.0))
}

/// Failure curve with every knob of [`DecouplingParams`].
///
/// When the normal approximation is selected and some grid points fall
/// outside its valid regime, the values are still returned and a single
/// warning names how many points were affected.
pub fn failure_curve(
    repertoire: &Repertoire,
    targets: &FrequencyGrid,
    params: &DecouplingParams,
) -> Result<FailureCurve> {
    params.validate()?;
    if repertoire.is_empty() {
        return Err(MadhypeError::empty("repertoire has no clones"));
    }

    log::debug!(
        "failure curve: clones={}, w={}, n={}, points={}, method={}, criterion={}",
        repertoire.len(),
        params.well_count,
        params.draws_per_well,
        targets.len(),
        params.method,
        params.criterion
    );

    let projection = PresenceProjection::project(repertoire, targets, params.draws_per_well)?;
    let profile =
        repertoire_match_profile(&projection.repertoire, params.well_count, params.criterion)?;

    let mut out_of_regime = 0usize;
    let mut failure = Vec::with_capacity(targets.len());
    for &f_present in &projection.targets {
        let pmf = binomial_pmf(params.well_count, f_present, params.method)?;
        if !pmf.in_regime {
            out_of_regime += 1;
        }
        failure.push(failure_probability(&pmf.value, &profile)?);
    }

    if out_of_regime > 0 {
        log::warn!(
            "normal approximation used outside its valid regime at {out_of_regime} of {} target frequencies (w={})",
            targets.len(),
            params.well_count
        );
    }

    Ok(FailureCurve {
        frequencies: targets.values().to_vec(),
        failure,
        out_of_regime,
    })
}

/// Failure curve with the exact binomial and the occurrence-count criterion.
pub fn decoupling_failure_curve(
    repertoire: &Repertoire,
    well_count: u64,
    draws_per_well: u64,
    targets: &FrequencyGrid,
) -> Result<FailureCurve> {
    failure_curve(
        repertoire,
        targets,
        &DecouplingParams {
            well_count,
            draws_per_well,
            method: BinomialMethod::Exact,
            criterion: MatchCriterion::OccurrenceCount,
        },
    )
}

/// Build the configured repertoire and evaluate it over `grid`.
pub fn analyze(config: &AnalysisConfig, grid: &FrequencyGrid) -> Result<FailureCurve> {
    config.validate()?;
    let repertoire = config.build_repertoire()?;
    failure_curve(&repertoire, grid, &config.decoupling_params())
}
