//! Ranked clone-frequency distributions.
//!
//! A [`Repertoire`] holds the population frequency of every clone, sorted by
//! descending rank and normalized to sum to one. The power-law generator is
//! the only model the analytic path needs; [`Repertoire::from_frequencies`]
//! accepts anything else a caller has measured.

use serde::{Deserialize, Serialize};

use crate::error::{MadhypeError, Result};

/// Allowed drift of a caller-supplied distribution's total away from one.
const NORMALIZATION_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Repertoire {
    frequencies: Vec<f64>,
}

impl Repertoire {
    /// `weight[k] = (k+1)^(-alpha)`, normalized. `alpha = 0` gives a uniform
    /// repertoire; any positive `alpha` gives strictly decreasing weights.
    pub fn power_law(count: usize, alpha: f64) -> Result<Self> {
        if count == 0 {
            return Err(MadhypeError::invalid("repertoire size must be at least 1"));
        }
        if !alpha.is_finite() || alpha < 0.0 {
            return Err(MadhypeError::invalid(format!(
                "power-law exponent must be finite and non-negative, got {alpha}"
            )));
        }

        let weights: Vec<f64> = (1..=count).map(|rank| (rank as f64).powf(-alpha)).collect();
        let total: f64 = weights.iter().sum();
        let frequencies = weights.into_iter().map(|w| w / total).collect();

        log::debug!("built power-law repertoire: count={count}, alpha={alpha}");
        Ok(Self { frequencies })
    }

    /// Wrap measured frequencies. Values must be positive and sum to one
    /// (within a small tolerance); they are re-sorted by descending rank and
    /// renormalized exactly.
    pub fn from_frequencies(mut frequencies: Vec<f64>) -> Result<Self> {
        if frequencies.is_empty() {
            return Err(MadhypeError::empty("repertoire needs at least one clone"));
        }
        if let Some(bad) = frequencies.iter().find(|f| !(f.is_finite() && **f > 0.0)) {
            return Err(MadhypeError::invalid(format!(
                "clone frequencies must be positive, got {bad}"
            )));
        }
        let total: f64 = frequencies.iter().sum();
        if (total - 1.0).abs() > NORMALIZATION_TOLERANCE {
            return Err(MadhypeError::invalid(format!(
                "clone frequencies must sum to 1, got {total}"
            )));
        }

        frequencies.sort_by(|a, b| b.total_cmp(a));
        for f in &mut frequencies {
            *f /= total;
        }
        Ok(Self { frequencies })
    }

    pub fn frequencies(&self) -> &[f64] {
        &self.frequencies
    }

    pub fn len(&self) -> usize {
        self.frequencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }

    /// Number of top-ranked clones whose running total stays below
    /// `fraction` of the population.
    pub fn top_count(&self, fraction: f64) -> usize {
        cumulative_cutoff(&self.frequencies, fraction)
    }
}

/// Build a power-law repertoire of `count` clones with exponent `alpha`.
pub fn build_repertoire(count: usize, alpha: f64) -> Result<Repertoire> {
    Repertoire::power_law(count, alpha)
}

/// Count leading entries of a descending frequency list whose cumulative sum
/// is strictly below `fraction`.
pub fn cumulative_cutoff(sorted_freqs: &[f64], fraction: f64) -> usize {
    let mut running = 0.0;
    sorted_freqs
        .iter()
        .take_while(|&&f| {
            running += f;
            running < fraction
        })
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_when_alpha_zero() {
        let rep = build_repertoire(50, 0.0).unwrap();
        assert_eq!(rep.len(), 50);
        for &f in rep.frequencies() {
            assert!((f - 1.0 / 50.0).abs() < 1e-15);
        }
    }

    #[test]
    fn test_power_law_strictly_decreasing() {
        for alpha in [0.5, 1.0, 2.0] {
            let rep = build_repertoire(200, alpha).unwrap();
            let sum: f64 = rep.frequencies().iter().sum();
            assert!((sum - 1.0).abs() < 1e-12);
            assert!(rep.frequencies().windows(2).all(|w| w[0] > w[1]));
        }
    }

    #[test]
    fn test_power_law_ratio() {
        let rep = build_repertoire(3, 1.0).unwrap();
        let f = rep.frequencies();
        // 1 : 1/2 : 1/3 normalized by 11/6
        assert!((f[0] - 6.0 / 11.0).abs() < 1e-12);
        assert!((f[1] - 3.0 / 11.0).abs() < 1e-12);
        assert!((f[2] - 2.0 / 11.0).abs() < 1e-12);
    }

    #[test]
    fn test_single_clone() {
        let rep = build_repertoire(1, 3.0).unwrap();
        assert_eq!(rep.frequencies(), &[1.0]);
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(matches!(
            build_repertoire(0, 1.0),
            Err(MadhypeError::InvalidParameter(_))
        ));
        assert!(build_repertoire(10, -0.5).is_err());
        assert!(build_repertoire(10, f64::NAN).is_err());
        assert!(build_repertoire(10, f64::INFINITY).is_err());
    }

    #[test]
    fn test_from_frequencies_sorts() {
        let rep = Repertoire::from_frequencies(vec![0.2, 0.5, 0.3]).unwrap();
        assert_eq!(rep.frequencies(), &[0.5, 0.3, 0.2]);
        assert!(Repertoire::from_frequencies(vec![0.5, 0.4]).is_err());
        assert!(Repertoire::from_frequencies(vec![1.0, 0.0]).is_err());
        assert!(Repertoire::from_frequencies(vec![]).is_err());
    }

    #[test]
    fn test_cumulative_cutoff() {
        assert_eq!(cumulative_cutoff(&[0.4, 0.3, 0.2, 0.1], 0.5), 1);
        assert_eq!(cumulative_cutoff(&[0.4, 0.3, 0.2, 0.1], 0.8), 2);
        assert_eq!(cumulative_cutoff(&[0.6, 0.4], 0.5), 0);
        assert_eq!(cumulative_cutoff(&[], 0.5), 0);
    }
}
