//! Binomial combinatorics for pooled-well repertoire analysis.
//!
//! Everything in MAD-HYPE reduces to one question asked many times: given `w`
//! independent wells and a per-well presence probability `f`, how likely is a
//! chain (or a chain pair) to show up in exactly (or at most) `i` of them?
//! This crate provides those primitives:
//!
//! - exact and log-space binomial coefficients,
//! - the Gaussian approximation to a binomial probability, with its validity
//!   regime reported alongside the value,
//! - full probability-mass vectors and single-point pattern probabilities,
//! - lower-tail (cumulative) probabilities used as independence-null scores.
//!
//! Probability arithmetic is carried out in log space so that well counts in
//! the hundreds (and repertoire products over thousands of clones upstream)
//! neither overflow nor underflow.

use serde::{Deserialize, Serialize};
use statrs::function::erf::erf;
use statrs::function::factorial::ln_binomial;
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

// ═══════════════════════════════════════════════════════════════════════════════
// Core types
// ═══════════════════════════════════════════════════════════════════════════════

/// Both `n·f` and `n·(1-f)` must reach this before the normal approximation
/// to a binomial is considered trustworthy.
pub const NORMAL_REGIME_MIN: f64 = 50.0;

/// Errors raised by the combinatorics primitives.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StatsError {
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error(
        "normal approximation outside its valid regime: n*f = {mean:.3}, n*(1-f) = {complement:.3} (both must be >= {NORMAL_REGIME_MIN})"
    )]
    PreconditionViolation { mean: f64, complement: f64 },

    #[error("C({n}, {r}) does not fit in u128; use ln_binomial_coefficient")]
    Unrepresentable { n: u64, r: u64 },
}

pub type Result<T> = std::result::Result<T, StatsError>;

/// How a binomial probability is evaluated.
///
/// The two methods give materially different answers near small counts, so
/// callers always choose one explicitly; nothing in this crate switches
/// between them based on input size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinomialMethod {
    /// Exact binomial formula, evaluated in log space.
    #[default]
    Exact,
    /// Gaussian with mean `n·f` and variance `n·f·(1-f)`.
    NormalApproximation,
}

impl fmt::Display for BinomialMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact => write!(f, "exact"),
            Self::NormalApproximation => write!(f, "normal"),
        }
    }
}

impl FromStr for BinomialMethod {
    type Err = StatsError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "exact" => Ok(Self::Exact),
            "normal" | "normal_approximation" | "approx" => Ok(Self::NormalApproximation),
            other => Err(StatsError::InvalidParameter(format!(
                "unknown binomial method '{other}' (expected 'exact' or 'normal')"
            ))),
        }
    }
}

/// A value produced by an approximation, tagged with whether the inputs were
/// inside the approximation's valid regime.
///
/// Out-of-regime values are still returned; the caller decides what to do
/// with them.
#[derive(Debug, Clone, PartialEq)]
pub struct Approximation<T> {
    pub value: T,
    pub in_regime: bool,
}

impl<T> Approximation<T> {
    fn exact(value: T) -> Self {
        Self {
            value,
            in_regime: true,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Helpers
// ═══════════════════════════════════════════════════════════════════════════════

fn check_probability(name: &str, p: f64) -> Result<()> {
    if (0.0..=1.0).contains(&p) {
        Ok(())
    } else {
        Err(StatsError::InvalidParameter(format!(
            "{name} must lie in [0, 1], got {p}"
        )))
    }
}

fn check_count(r: u64, n: u64) -> Result<()> {
    if r > n {
        Err(StatsError::InvalidParameter(format!(
            "count {r} exceeds number of trials {n}"
        )))
    } else {
        Ok(())
    }
}

fn gcd(mut a: u128, mut b: u128) -> u128 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

/// `ln(f^i (1-f)^(w-i))`, with `0·ln 0` taken as 0 at both ends.
fn ln_pattern(w: u64, i: u64, f: f64) -> f64 {
    let hits = if i == 0 { 0.0 } else { i as f64 * f.ln() };
    let misses = if i == w {
        0.0
    } else {
        (w - i) as f64 * (-f).ln_1p()
    };
    hits + misses
}

/// Point mass at `0` (f = 0) or `w` (f = 1).
fn degenerate_pmf(w: u64, f: f64) -> Vec<f64> {
    let mut out = vec![0.0; w as usize + 1];
    let idx = if f >= 1.0 { w as usize } else { 0 };
    out[idx] = 1.0;
    out
}

/// Whether `n·f` and `n·(1-f)` are both at least [`NORMAL_REGIME_MIN`].
pub fn normal_regime_holds(n: u64, f: f64) -> bool {
    let nf = n as f64;
    nf * f >= NORMAL_REGIME_MIN && nf * (1.0 - f) >= NORMAL_REGIME_MIN
}

/// Hard guard for callers that refuse to run the normal approximation outside
/// its regime.
pub fn check_normal_regime(n: u64, f: f64) -> Result<()> {
    check_probability("f", f)?;
    if normal_regime_holds(n, f) {
        Ok(())
    } else {
        let nf = n as f64;
        Err(StatsError::PreconditionViolation {
            mean: nf * f,
            complement: nf * (1.0 - f),
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// 1. BINOMIAL COEFFICIENTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Exact number of `r`-combinations of `n`.
///
/// Built incrementally as `C(n-r+i, i)` for `i = 1..=r` with a gcd reduction
/// at each step, so no factorial is ever formed and intermediates never exceed
/// the final value. Fails with [`StatsError::Unrepresentable`] only when the
/// result itself does not fit in `u128`.
pub fn binomial_coefficient_exact(n: u64, r: u64) -> Result<u128> {
    check_count(r, n)?;
    let r_small = r.min(n - r);
    if r_small == 0 {
        return Ok(1);
    }
    let base = (n - r_small) as u128;
    let mut acc: u128 = 1;
    for i in 1..=r_small as u128 {
        let numer = base + i;
        let g = gcd(acc, i);
        // acc * numer is divisible by i, so i/g divides numer.
        let step = numer / (i / g);
        acc = (acc / g)
            .checked_mul(step)
            .ok_or(StatsError::Unrepresentable { n, r })?;
    }
    Ok(acc)
}

/// `ln C(n, r)`; usable far beyond the `u128` range of the exact variant.
pub fn ln_binomial_coefficient(n: u64, r: u64) -> Result<f64> {
    check_count(r, n)?;
    Ok(ln_binomial(n, r))
}

/// Gaussian approximation to `C(n,r)·f^r·(1-f)^(n-r)`.
///
/// The density is evaluated regardless of regime; `in_regime` reports whether
/// `n·f` and `n·(1-f)` are both at least [`NORMAL_REGIME_MIN`]. A zero
/// variance (`f` of exactly 0 or 1) has no Gaussian and is rejected.
pub fn binomial_coefficient_approx(n: u64, r: u64, f: f64) -> Result<Approximation<f64>> {
    check_probability("f", f)?;
    check_count(r, n)?;
    let avg = n as f64 * f;
    let var = avg * (1.0 - f);
    if var <= 0.0 {
        return Err(StatsError::InvalidParameter(format!(
            "normal approximation needs positive variance (n={n}, f={f})"
        )));
    }
    let d = r as f64 - avg;
    let value = (-(d * d) / (2.0 * var)).exp() / (2.0 * var * PI).sqrt();
    Ok(Approximation {
        value,
        in_regime: normal_regime_holds(n, f),
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
// 2. PROBABILITY MASS
// ═══════════════════════════════════════════════════════════════════════════════

/// Exact probability of each outcome `0..=w` of `w` trials at rate `f`.
///
/// Entries sum to 1 up to floating-point rounding.
pub fn binomial_pmf_vector(w: u64, f: f64) -> Result<Vec<f64>> {
    check_probability("f", f)?;
    if f == 0.0 || f == 1.0 {
        return Ok(degenerate_pmf(w, f));
    }
    Ok((0..=w)
        .map(|i| (ln_binomial(w, i) + ln_pattern(w, i, f)).exp())
        .collect())
}

/// Normal-approximation PMF over `0..=w`, renormalized to sum to 1.
///
/// For `f` of exactly 0 or 1 the exact point mass is returned, flagged as out
/// of regime.
pub fn binomial_pmf_vector_approx(w: u64, f: f64) -> Result<Approximation<Vec<f64>>> {
    check_probability("f", f)?;
    if f == 0.0 || f == 1.0 {
        return Ok(Approximation {
            value: degenerate_pmf(w, f),
            in_regime: false,
        });
    }
    let mut in_regime = true;
    let mut values = Vec::with_capacity(w as usize + 1);
    for i in 0..=w {
        let a = binomial_coefficient_approx(w, i, f)?;
        in_regime &= a.in_regime;
        values.push(a.value);
    }
    let total: f64 = values.iter().sum();
    if total > 0.0 {
        for v in &mut values {
            *v /= total;
        }
    }
    Ok(Approximation { value: values, in_regime })
}

/// PMF vector computed with the chosen method.
pub fn binomial_pmf(w: u64, f: f64, method: BinomialMethod) -> Result<Approximation<Vec<f64>>> {
    match method {
        BinomialMethod::Exact => binomial_pmf_vector(w, f).map(Approximation::exact),
        BinomialMethod::NormalApproximation => binomial_pmf_vector_approx(w, f),
    }
}

/// Probability of exactly `i` successes in `w` trials at rate `f`.
///
/// Identical to `binomial_pmf_vector(w, f)[i]`.
pub fn single_pattern_match_probability(w: u64, f: f64, i: u64) -> Result<f64> {
    check_probability("f", f)?;
    check_count(i, w)?;
    Ok((ln_binomial(w, i) + ln_pattern(w, i, f)).exp())
}

/// Probability that a chain at rate `f` lands in one specific set of `i` wells
/// out of `w` (and in none of the others): `f^i (1-f)^(w-i)`.
pub fn exact_pattern_probability(w: u64, f: f64, i: u64) -> Result<f64> {
    check_probability("f", f)?;
    check_count(i, w)?;
    Ok(ln_pattern(w, i, f).exp())
}

// ═══════════════════════════════════════════════════════════════════════════════
// 3. TAIL PROBABILITIES
// ═══════════════════════════════════════════════════════════════════════════════

/// `P(X <= s)` for `X ~ Binomial(n, p)`, by summing exact PMF terms.
///
/// The shorter tail is summed and complemented when `s` lies above the mean,
/// which keeps the number of terms and the rounding error small.
pub fn binomial_cdf_exact(s: u64, p: f64, n: u64) -> Result<f64> {
    check_probability("p", p)?;
    if s >= n {
        return Ok(1.0);
    }
    if p == 0.0 {
        return Ok(1.0);
    }
    if p == 1.0 {
        return Ok(0.0);
    }
    let term = |j: u64| (ln_binomial(n, j) + ln_pattern(n, j, p)).exp();
    let cdf = if (s as f64) <= n as f64 * p {
        (0..=s).map(term).sum::<f64>()
    } else {
        1.0 - (s + 1..=n).map(term).sum::<f64>()
    };
    Ok(cdf.clamp(0.0, 1.0))
}

/// Normal approximation to `P(X <= s)`: `0.5·(1 + erf((s - np) / (σ√2)))`.
///
/// Zero-variance inputs (`p` of 0 or 1) fall back to the exact step function
/// and are flagged out of regime.
pub fn binomial_cdf_normal(s: u64, p: f64, n: u64) -> Result<Approximation<f64>> {
    check_probability("p", p)?;
    let mean = n as f64 * p;
    let sigma = (mean * (1.0 - p)).sqrt();
    if sigma <= 0.0 {
        let value = if p == 0.0 || s >= n { 1.0 } else { 0.0 };
        return Ok(Approximation {
            value,
            in_regime: false,
        });
    }
    let z = (s as f64 - mean) / (sigma * std::f64::consts::SQRT_2);
    Ok(Approximation {
        value: (0.5 * (1.0 + erf(z))).clamp(0.0, 1.0),
        in_regime: normal_regime_holds(n, p),
    })
}

/// Lower-tail probability with the chosen method.
pub fn binomial_cdf(s: u64, p: f64, n: u64, method: BinomialMethod) -> Result<Approximation<f64>> {
    match method {
        BinomialMethod::Exact => binomial_cdf_exact(s, p, n).map(Approximation::exact),
        BinomialMethod::NormalApproximation => binomial_cdf_normal(s, p, n),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coefficient_known_values() {
        assert_eq!(binomial_coefficient_exact(0, 0).unwrap(), 1);
        assert_eq!(binomial_coefficient_exact(5, 2).unwrap(), 10);
        assert_eq!(binomial_coefficient_exact(52, 5).unwrap(), 2_598_960);
        assert_eq!(binomial_coefficient_exact(10, 10).unwrap(), 1);
        assert_eq!(
            binomial_coefficient_exact(96, 48).unwrap(),
            6_435_067_013_866_298_908_421_603_100
        );
    }

    #[test]
    fn test_coefficient_symmetry() {
        for n in 0..80u64 {
            for r in 0..=n {
                assert_eq!(
                    binomial_coefficient_exact(n, r).unwrap(),
                    binomial_coefficient_exact(n, n - r).unwrap(),
                    "C({n},{r})"
                );
            }
        }
    }

    #[test]
    fn test_coefficient_rejects_r_above_n() {
        assert!(matches!(
            binomial_coefficient_exact(3, 4),
            Err(StatsError::InvalidParameter(_))
        ));
        assert!(ln_binomial_coefficient(3, 4).is_err());
    }

    #[test]
    fn test_coefficient_unrepresentable() {
        assert_eq!(
            binomial_coefficient_exact(300, 150),
            Err(StatsError::Unrepresentable { n: 300, r: 150 })
        );
        // Log-space variant still answers.
        let ln = ln_binomial_coefficient(300, 150).unwrap();
        assert!(ln.is_finite() && ln > 200.0);
    }

    #[test]
    fn test_ln_matches_exact() {
        let exact = binomial_coefficient_exact(60, 30).unwrap() as f64;
        let ln = ln_binomial_coefficient(60, 30).unwrap();
        assert!((ln.exp() - exact).abs() / exact < 1e-10);
    }

    #[test]
    fn test_pmf_sums_to_one() {
        for &w in &[0u64, 1, 7, 96, 384, 1000] {
            for &f in &[0.0, 1e-6, 0.01, 0.3, 0.5, 0.97, 1.0] {
                let pmf = binomial_pmf_vector(w, f).unwrap();
                assert_eq!(pmf.len(), w as usize + 1);
                let total: f64 = pmf.iter().sum();
                assert!((total - 1.0).abs() < 1e-9, "w={w} f={f} total={total}");
            }
        }
    }

    #[test]
    fn test_pmf_degenerate_ends() {
        let zero = binomial_pmf_vector(4, 0.0).unwrap();
        assert_eq!(zero, vec![1.0, 0.0, 0.0, 0.0, 0.0]);
        let one = binomial_pmf_vector(4, 1.0).unwrap();
        assert_eq!(one, vec![0.0, 0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_pmf_rejects_bad_probability() {
        assert!(binomial_pmf_vector(5, -0.1).is_err());
        assert!(binomial_pmf_vector(5, 1.5).is_err());
        assert!(binomial_pmf_vector(5, f64::NAN).is_err());
    }

    #[test]
    fn test_single_pattern_is_pmf_entry() {
        let pmf = binomial_pmf_vector(96, 0.12).unwrap();
        for i in [0u64, 5, 11, 40, 96] {
            let p = single_pattern_match_probability(96, 0.12, i).unwrap();
            assert!((p - pmf[i as usize]).abs() < 1e-15);
        }
        assert!(single_pattern_match_probability(4, 0.5, 5).is_err());
    }

    #[test]
    fn test_exact_pattern_probability() {
        let p = exact_pattern_probability(3, 0.5, 1).unwrap();
        assert!((p - 0.125).abs() < 1e-15);
        assert_eq!(exact_pattern_probability(3, 0.0, 0).unwrap(), 1.0);
        assert_eq!(exact_pattern_probability(3, 0.0, 1).unwrap(), 0.0);
        assert_eq!(exact_pattern_probability(3, 1.0, 3).unwrap(), 1.0);
    }

    #[test]
    fn test_approx_regime_flag() {
        let inside = binomial_coefficient_approx(1000, 500, 0.5).unwrap();
        assert!(inside.in_regime);
        let outside = binomial_coefficient_approx(20, 3, 0.1).unwrap();
        assert!(!outside.in_regime);
        assert!(binomial_coefficient_approx(20, 3, 0.0).is_err());
    }

    #[test]
    fn test_approx_close_to_exact_in_regime() {
        let exact = single_pattern_match_probability(1000, 0.5, 500).unwrap();
        let approx = binomial_coefficient_approx(1000, 500, 0.5).unwrap().value;
        assert!((approx - exact).abs() / exact < 1e-2);
    }

    #[test]
    fn test_approx_pmf_normalized() {
        let a = binomial_pmf_vector_approx(400, 0.4).unwrap();
        assert!(a.in_regime);
        let total: f64 = a.value.iter().sum();
        assert!((total - 1.0).abs() < 1e-9);

        let d = binomial_pmf_vector_approx(10, 1.0).unwrap();
        assert!(!d.in_regime);
        assert_eq!(d.value[10], 1.0);
    }

    #[test]
    fn test_check_normal_regime() {
        assert!(check_normal_regime(200, 0.5).is_ok());
        assert!(matches!(
            check_normal_regime(96, 0.1),
            Err(StatsError::PreconditionViolation { .. })
        ));
    }

    #[test]
    fn test_cdf_exact_known_value() {
        // Binomial(10, 0.5): P(X <= 5) = 638/1024
        let p = binomial_cdf_exact(5, 0.5, 10).unwrap();
        assert!((p - 0.623046875).abs() < 1e-12);
        // Upper branch: P(X <= 8) = 1 - 11/1024
        let p = binomial_cdf_exact(8, 0.5, 10).unwrap();
        assert!((p - (1.0 - 11.0 / 1024.0)).abs() < 1e-12);
    }

    #[test]
    fn test_cdf_exact_edges() {
        assert_eq!(binomial_cdf_exact(10, 0.3, 10).unwrap(), 1.0);
        assert_eq!(binomial_cdf_exact(0, 0.0, 10).unwrap(), 1.0);
        assert_eq!(binomial_cdf_exact(9, 1.0, 10).unwrap(), 0.0);
    }

    #[test]
    fn test_cdf_normal_tracks_exact() {
        let exact = binomial_cdf_exact(520, 0.5, 1000).unwrap();
        let approx = binomial_cdf_normal(520, 0.5, 1000).unwrap();
        assert!(approx.in_regime);
        // Without continuity correction the two differ by about half a PMF step.
        assert!((approx.value - exact).abs() < 0.02);
    }

    #[test]
    fn test_cdf_normal_degenerate() {
        let a = binomial_cdf_normal(10, 1.0, 10).unwrap();
        assert_eq!(a.value, 1.0);
        assert!(!a.in_regime);
        let b = binomial_cdf_normal(3, 1.0, 10).unwrap();
        assert_eq!(b.value, 0.0);
    }

    #[test]
    fn test_method_parse_and_display() {
        assert_eq!("exact".parse::<BinomialMethod>().unwrap(), BinomialMethod::Exact);
        assert_eq!(
            "normal".parse::<BinomialMethod>().unwrap(),
            BinomialMethod::NormalApproximation
        );
        assert!("gaussian".parse::<BinomialMethod>().is_err());
        assert_eq!(BinomialMethod::NormalApproximation.to_string(), "normal");
        assert_eq!(BinomialMethod::default(), BinomialMethod::Exact);
    }

    #[test]
    fn test_dispatch_by_method() {
        let exact = binomial_cdf(3, 0.2, 12, BinomialMethod::Exact).unwrap();
        assert!(exact.in_regime);
        let normal = binomial_cdf(3, 0.2, 12, BinomialMethod::NormalApproximation).unwrap();
        assert!(!normal.in_regime);
        let pmf = binomial_pmf(12, 0.2, BinomialMethod::Exact).unwrap();
        assert_eq!(pmf.value.len(), 13);
    }
}
