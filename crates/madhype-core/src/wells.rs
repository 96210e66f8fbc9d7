//! Per-well chain observations.
//!
//! A well is the unit of observation: the set of A-side and B-side chains
//! detected in one pooled sample. Chains are opaque identifiers.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::error::{MadhypeError, Result};

pub type ChainId = String;

/// Chains detected in one well.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WellObservation {
    pub a: BTreeSet<ChainId>,
    pub b: BTreeSet<ChainId>,
}

impl WellObservation {
    pub fn new<A, B>(a: A, b: B) -> Self
    where
        A: IntoIterator,
        A::Item: Into<ChainId>,
        B: IntoIterator,
        B::Item: Into<ChainId>,
    {
        Self {
            a: a.into_iter().map(Into::into).collect(),
            b: b.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.a.is_empty() && self.b.is_empty()
    }
}

/// Read well observations from a JSON array of `{"a": [...], "b": [...]}`.
pub fn load_wells(path: &Path) -> Result<Vec<WellObservation>> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

pub fn save_wells(path: &Path, wells: &[WellObservation]) -> Result<()> {
    let json = serde_json::to_string_pretty(wells)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Number of wells each chain appears in, per side.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChainOccurrences {
    pub a: BTreeMap<ChainId, u32>,
    pub b: BTreeMap<ChainId, u32>,
}

pub fn chain_occurrences(wells: &[WellObservation]) -> ChainOccurrences {
    let mut counts = ChainOccurrences::default();
    for well in wells {
        for chain in &well.a {
            *counts.a.entry(chain.clone()).or_insert(0) += 1;
        }
        for chain in &well.b {
            *counts.b.entry(chain.clone()).or_insert(0) += 1;
        }
    }
    counts
}

/// Inclusive bounds on the number of wells a chain may occupy.
///
/// Chains seen in very few wells carry no pairing signal, and chains seen in
/// nearly every well pair with everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccurrenceWindow {
    pub min: u32,
    pub max: u32,
}

impl OccurrenceWindow {
    pub fn new(min: u32, max: u32) -> Result<Self> {
        if min > max {
            return Err(MadhypeError::invalid(format!(
                "occurrence window minimum {min} exceeds maximum {max}"
            )));
        }
        Ok(Self { min, max })
    }

    pub fn contains(&self, count: u32) -> bool {
        (self.min..=self.max).contains(&count)
    }
}

/// Drop every chain whose well count falls outside `window`. Wells keep
/// their position even when they end up empty, so the well count used for
/// marginal frequencies is unchanged.
pub fn filter_by_occurrence(
    wells: &[WellObservation],
    window: OccurrenceWindow,
) -> Vec<WellObservation> {
    let counts = chain_occurrences(wells);
    let keep_a: BTreeSet<&ChainId> = counts
        .a
        .iter()
        .filter(|(_, c)| window.contains(**c))
        .map(|(id, _)| id)
        .collect();
    let keep_b: BTreeSet<&ChainId> = counts
        .b
        .iter()
        .filter(|(_, c)| window.contains(**c))
        .map(|(id, _)| id)
        .collect();

    let dropped = (counts.a.len() - keep_a.len()) + (counts.b.len() - keep_b.len());
    if dropped > 0 {
        log::warn!(
            "occurrence window {}..={} dropped {dropped} of {} chains",
            window.min,
            window.max,
            counts.a.len() + counts.b.len()
        );
    }

    wells
        .iter()
        .map(|well| WellObservation {
            a: well.a.iter().filter(|c| keep_a.contains(c)).cloned().collect(),
            b: well.b.iter().filter(|c| keep_b.contains(c)).cloned().collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<WellObservation> {
        vec![
            WellObservation::new(["A1", "A2"], ["B1"]),
            WellObservation::new(["A1"], ["B1", "B2"]),
            WellObservation::new(["A1", "A3"], ["B3"]),
        ]
    }

    #[test]
    fn test_occurrences() {
        let counts = chain_occurrences(&sample());
        assert_eq!(counts.a["A1"], 3);
        assert_eq!(counts.a["A2"], 1);
        assert_eq!(counts.b["B1"], 2);
        assert_eq!(counts.b.len(), 3);
    }

    #[test]
    fn test_filter_keeps_well_positions() {
        let window = OccurrenceWindow::new(2, 2).unwrap();
        let filtered = filter_by_occurrence(&sample(), window);
        assert_eq!(filtered.len(), 3);
        assert!(filtered.iter().all(|w| w.a.is_empty()));
        assert!(filtered[0].b.contains("B1"));
        assert!(filtered[2].is_empty());
    }

    #[test]
    fn test_window_validation() {
        assert!(OccurrenceWindow::new(5, 4).is_err());
        let w = OccurrenceWindow::new(4, 91).unwrap();
        assert!(w.contains(4) && w.contains(91));
        assert!(!w.contains(3) && !w.contains(92));
    }

    #[test]
    fn test_json_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wells.json");
        save_wells(&path, &sample()).unwrap();
        assert_eq!(load_wells(&path).unwrap(), sample());
    }

    #[test]
    fn test_json_format() {
        let wells: Vec<WellObservation> =
            serde_json::from_str(r#"[{"a": ["A1"], "b": ["B1", "B2"]}]"#).unwrap();
        assert_eq!(wells[0].b.len(), 2);
        assert!(load_wells(Path::new("/nonexistent/wells.json")).is_err());
    }
}
