//! Measured values of sampled revisions and predicates deciding where to sample more.

use super::{CommitId, HistoryGraph};
use crate::prelude::*;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

/// Measured values of sampled revisions, keyed by full commit hash.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
pub struct SampleValues(pub BTreeMap<CommitId, f64>);

impl SampleValues {
    /// Read a JSON object mapping revisions to values.
    ///
    /// Abbreviated revisions are resolved against the given history.
    pub fn from_file(path: &Path, history: &HistoryGraph) -> Result<SampleValues, Error> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("Could not open sample file {}", path.display()))?;
        let raw: BTreeMap<String, f64> = serde_json::from_reader(std::io::BufReader::new(file))
            .with_context(|| format!("Sample file {} is malformed", path.display()))?;
        SampleValues::resolve(raw, history)
    }

    /// Resolve abbreviated revisions against the history.
    pub fn resolve(raw: BTreeMap<String, f64>, history: &HistoryGraph) -> Result<SampleValues, Error> {
        let mut values = BTreeMap::new();
        for (revision, value) in raw {
            values.insert(history.resolve(&revision)?.clone(), value);
        }
        Ok(SampleValues(values))
    }

    /// The set of sampled commits.
    pub fn commits(&self) -> HashSet<CommitId> {
        self.0.keys().cloned().collect()
    }

    /// The value measured for a commit.
    pub fn get(&self, commit: &CommitId) -> Option<f64> {
        self.0.get(commit).copied()
    }
}

/// Decide to insert a new revision between two samples
/// if the relative change of their values exceeds a threshold.
#[derive(Debug, PartialEq, Clone)]
pub struct GradientThreshold {
    pub samples: SampleValues,
    pub threshold: f64,
}

impl GradientThreshold {
    /// The relative change between the values of two commits.
    ///
    /// Returns `None` if one of the commits was not sampled.
    pub fn gradient(&self, lhs: &CommitId, rhs: &CommitId) -> Option<f64> {
        let (lhs, rhs) = (self.samples.get(lhs)?, self.samples.get(rhs)?);
        let scale = lhs.abs().max(rhs.abs());
        if scale == 0.0 {
            Some(0.0)
        } else {
            Some((lhs - rhs).abs() / scale)
        }
    }

    /// Returns whether a revision should be inserted between the two commits, together with their gradient.
    pub fn should_insert(&self, lhs: &CommitId, rhs: &CommitId) -> (bool, f64) {
        match self.gradient(lhs, rhs) {
            Some(gradient) => (gradient > self.threshold, gradient),
            None => (false, 0.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::tests::id;

    fn mock_threshold() -> GradientThreshold {
        GradientThreshold {
            samples: SampleValues(BTreeMap::from([
                (id("c0"), 10.0),
                (id("c1"), 11.0),
                (id("c2"), 20.0),
                (id("c3"), 0.0),
            ])),
            threshold: 0.2,
        }
    }

    #[test]
    fn gradients() {
        let predicate = mock_threshold();
        assert_eq!(predicate.should_insert(&id("c0"), &id("c1")).0, false);
        assert_eq!(predicate.should_insert(&id("c1"), &id("c2")), (true, 0.45));
        assert_eq!(predicate.should_insert(&id("c2"), &id("c3")), (true, 1.0));
        assert_eq!(predicate.should_insert(&id("c3"), &id("c3")), (false, 0.0));
        assert_eq!(predicate.should_insert(&id("c0"), &id("c9")), (false, 0.0));
    }

    #[test]
    fn resolve_abbreviated_samples() {
        let history = HistoryGraph::mock(&[("abc123", &["def456"]), ("def456", &[])]);
        let samples = SampleValues::resolve(
            BTreeMap::from([("abc".to_string(), 1.0), ("def456".to_string(), 2.0)]),
            &history,
        )
        .unwrap();
        assert_eq!(samples.get(&id("abc123")), Some(1.0));
        assert_eq!(samples.commits().len(), 2);
        assert!(SampleValues::resolve(BTreeMap::from([("999".to_string(), 1.0)]), &history).is_err());
    }
}
