use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::errors::PipelineError;
use crate::models::{AccountFeatures, Archetype};

/// Version tag carried by mappings produced by [`propose_mapping`].
pub const PROPOSED_VERSION: &str = "proposed";

/// Human-assigned names for the clusters of one specific run.
///
/// Cluster indices carry no meaning of their own and can permute whenever
/// the input data changes, so a mapping is only valid for the run whose
/// centroids it was written against. The `version` is echoed in every
/// report that applies it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchetypeMapping {
    pub version: String,
    pub clusters: BTreeMap<usize, Archetype>,
}

impl ArchetypeMapping {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, PipelineError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::Configuration(format!(
                "cannot read archetype mapping {}: {e}",
                path.display()
            ))
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, PipelineError> {
        serde_json::from_str(raw)
            .map_err(|e| PipelineError::Configuration(format!("invalid archetype mapping: {e}")))
    }

    /// Every cluster `0..k` must be named, with no extra keys, and no
    /// archetype may name two clusters while `k` fits the archetype set.
    pub fn validate(&self, k: usize) -> Result<(), PipelineError> {
        if self.version.trim().is_empty() {
            return Err(PipelineError::Configuration("archetype mapping has no version".into()));
        }

        let expected: BTreeSet<usize> = (0..k).collect();
        let actual: BTreeSet<usize> = self.clusters.keys().copied().collect();
        if expected != actual {
            return Err(PipelineError::Configuration(format!(
                "archetype mapping {} covers clusters {:?}, expected {:?}",
                self.version, actual, expected
            )));
        }

        if k <= Archetype::ALL.len() {
            let distinct: BTreeSet<Archetype> = self.clusters.values().copied().collect();
            if distinct.len() != self.clusters.len() {
                return Err(PipelineError::Configuration(format!(
                    "archetype mapping {} assigns the same archetype to several clusters",
                    self.version
                )));
            }
        }

        Ok(())
    }

    pub fn archetype(&self, cluster: usize) -> Option<Archetype> {
        self.clusters.get(&cluster).copied()
    }
}

/// Suggest names for four clusters from their unstandardized centroids.
///
/// Picks greedily: largest mean trade size is the whale cluster, then the
/// highest maker ratio among the rest, then the highest trade frequency;
/// whatever remains is retail. The result is a starting point for a human
/// to review and is never applied automatically.
pub fn propose_mapping(raw_centroids: &Array2<f64>) -> Option<ArchetypeMapping> {
    if raw_centroids.nrows() != Archetype::ALL.len()
        || raw_centroids.ncols() != AccountFeatures::COUNT
    {
        return None;
    }

    let mut remaining: Vec<usize> = (0..raw_centroids.nrows()).collect();
    let mut clusters = BTreeMap::new();

    let picks = [
        (3, Archetype::AggressiveWhale),
        (1, Archetype::PassiveMaker),
        (2, Archetype::HighFrequencyScalper),
    ];
    for (column, archetype) in picks {
        let best = remaining.iter().copied().max_by(|a, b| {
            raw_centroids[[*a, column]]
                .total_cmp(&raw_centroids[[*b, column]])
                // Prefer the lower index on equal values.
                .then(b.cmp(a))
        })?;
        remaining.retain(|c| *c != best);
        clusters.insert(best, archetype);
    }
    for cluster in remaining {
        clusters.insert(cluster, Archetype::Retail);
    }

    Some(ArchetypeMapping {
        version: PROPOSED_VERSION.to_string(),
        clusters,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn mapping(pairs: &[(usize, Archetype)]) -> ArchetypeMapping {
        ArchetypeMapping {
            version: "2024-06-v1".into(),
            clusters: pairs.iter().copied().collect(),
        }
    }

    #[test]
    fn test_parse_json_mapping() {
        let raw = r#"{
            "version": "2024-06-v1",
            "clusters": {
                "0": "retail",
                "1": "aggressive_whale",
                "2": "passive_maker",
                "3": "high_frequency_scalper"
            }
        }"#;

        let m = ArchetypeMapping::from_json(raw).unwrap();
        assert_eq!(m.archetype(1), Some(Archetype::AggressiveWhale));
        assert_eq!(m.archetype(7), None);
        assert!(m.validate(4).is_ok());
    }

    #[test]
    fn test_validate_rejects_gaps_and_duplicates() {
        let missing = mapping(&[(0, Archetype::Retail), (1, Archetype::PassiveMaker)]);
        assert!(missing.validate(4).unwrap_err().is_configuration());

        let duplicate = mapping(&[
            (0, Archetype::Retail),
            (1, Archetype::Retail),
            (2, Archetype::PassiveMaker),
            (3, Archetype::AggressiveWhale),
        ]);
        assert!(duplicate.validate(4).is_err());

        let extra = mapping(&[(0, Archetype::Retail), (5, Archetype::PassiveMaker)]);
        assert!(extra.validate(1).is_err());
    }

    #[test]
    fn test_invalid_json() {
        assert!(ArchetypeMapping::from_json("{\"version\": 1}").is_err());
    }

    #[test]
    fn test_propose_mapping_from_centroids() {
        // columns: pnl, maker ratio, trades/day, trade size
        let centroids = array![
            [5.0, 0.40, 3.0, 150.0],
            [900.0, 0.20, 6.0, 50_000.0],
            [20.0, 0.95, 10.0, 800.0],
            [-3.0, 0.30, 250.0, 90.0],
        ];

        let proposal = propose_mapping(&centroids).unwrap();
        assert_eq!(proposal.version, PROPOSED_VERSION);
        assert_eq!(proposal.archetype(0), Some(Archetype::Retail));
        assert_eq!(proposal.archetype(1), Some(Archetype::AggressiveWhale));
        assert_eq!(proposal.archetype(2), Some(Archetype::PassiveMaker));
        assert_eq!(proposal.archetype(3), Some(Archetype::HighFrequencyScalper));
        assert!(proposal.validate(4).is_ok());
    }

    #[test]
    fn test_propose_mapping_needs_four_clusters() {
        let centroids = array![[0.0, 0.0, 0.0, 0.0]];
        assert!(propose_mapping(&centroids).is_none());
    }
}
