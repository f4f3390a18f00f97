//! Detection of revisions missing from a linear sequence of samples.

use super::{CommitId, HistoryGraph};
use crate::prelude::*;
use crate::utils::log::LogMessage;
use std::collections::{BTreeSet, HashMap};

const LOG_SOURCE: &str = "MissingRevisions";

/// Maps the commits of a history to time ids and back.
///
/// The oldest commit gets the time id 0, every commit gets a larger id than all of its parents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitMap {
    time_ids: HashMap<CommitId, usize>,
    commits: Vec<CommitId>,
}

impl CommitMap {
    /// Number the commits of the history from oldest to newest.
    pub fn new(history: &HistoryGraph) -> CommitMap {
        let commits = history.oldest_first();
        let time_ids = commits
            .iter()
            .enumerate()
            .map(|(time_id, commit)| (commit.clone(), time_id))
            .collect();
        CommitMap { time_ids, commits }
    }

    /// The time id of a commit.
    pub fn time_id(&self, commit: &CommitId) -> Result<usize, Error> {
        self.time_ids
            .get(commit)
            .copied()
            .ok_or_else(|| anyhow!("Commit {commit} is not part of the commit map"))
    }

    /// The commit with the given time id.
    pub fn commit(&self, time_id: usize) -> Result<&CommitId, Error> {
        self.commits
            .get(time_id)
            .ok_or_else(|| anyhow!("No commit with time id {time_id}"))
    }
}

/// The time id halfway between two samples. Halves are rounded to the even neighbour.
fn midpoint(lhs: usize, rhs: usize) -> usize {
    let sum = lhs + rhs;
    let lower = sum / 2;
    if sum % 2 == 1 && lower % 2 == 1 {
        lower + 1
    } else {
        lower
    }
}

/// Calculate a set of revisions that could be missing because the changes between consecutive samples are too steep.
///
/// `rows` are the samples ordered by time.
/// For each pair of consecutive rows `should_insert_revision` decides whether the change is steep and returns its gradient.
/// Steep changes between neighbouring commits can not be refined further and are only reported.
/// Otherwise the commit halfway in time between the two samples is proposed.
pub fn find_missing_revisions<T, F, H, N>(
    rows: impl IntoIterator<Item = T>,
    cmap: &CommitMap,
    mut should_insert_revision: F,
    to_commit_hash: H,
    are_neighbours: N,
) -> Result<(BTreeSet<CommitId>, Vec<LogMessage>), Error>
where
    F: FnMut(&T, &T) -> (bool, f64),
    H: Fn(&T) -> CommitId,
    N: Fn(&CommitId, &CommitId) -> bool,
{
    let mut new_revisions = BTreeSet::new();
    let mut logs = Vec::new();

    let mut rows = rows.into_iter();
    let Some(mut last_row) = rows.next() else {
        return Ok((new_revisions, logs));
    };
    for row in rows {
        let (should_insert, gradient) = should_insert_revision(&last_row, &row);
        if should_insert {
            let lhs = to_commit_hash(&last_row);
            let rhs = to_commit_hash(&row);
            if are_neighbours(&lhs, &rhs) {
                logs.push(
                    LogMessage::new_info(format!(
                        "Found steep gradient between neighbours {lhs} - {rhs}: {gradient:.5}. Investigate: git diff {lhs} {rhs}"
                    ))
                    .source(LOG_SOURCE),
                );
            } else {
                let lhs_time = cmap.time_id(&lhs)?;
                let rhs_time = cmap.time_id(&rhs)?;
                let new_revision = cmap.commit(midpoint(lhs_time, rhs_time))?.clone();
                logs.push(
                    LogMessage::new_info(format!(
                        "Unusual gradient between {lhs} - {rhs}: {gradient:.5}. Adding {new_revision} as new revision to the sample set"
                    ))
                    .source(LOG_SOURCE),
                );
                new_revisions.insert(new_revision);
            }
        }
        last_row = row;
    }
    Ok((new_revisions, logs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::samples::{GradientThreshold, SampleValues};
    use crate::history::tests::id;
    use std::collections::BTreeMap;

    #[test]
    fn commit_map_numbers_oldest_first() {
        let history = HistoryGraph::mock_linear(5);
        let cmap = CommitMap::new(&history);
        assert_eq!(cmap.time_id(&id("c0")).unwrap(), 0);
        assert_eq!(cmap.time_id(&id("c4")).unwrap(), 4);
        assert_eq!(cmap.commit(2).unwrap(), &id("c2"));
        assert!(cmap.commit(5).is_err());
        assert!(cmap.time_id(&id("c9")).is_err());
    }

    #[test]
    fn midpoint_rounds_halves_to_even() {
        assert_eq!(midpoint(4, 8), 6);
        assert_eq!(midpoint(0, 5), 2);
        assert_eq!(midpoint(0, 7), 4);
        assert_eq!(midpoint(3, 4), 4);
        assert_eq!(midpoint(2, 3), 2);
    }

    #[test]
    fn odd_time_spans_round_to_even_commit() {
        let history = HistoryGraph::mock_linear(10);
        let cmap = CommitMap::new(&history);
        let (new_revisions, _) = find_missing_revisions(
            vec![id("c0"), id("c5")],
            &cmap,
            |_, _| (true, 1.0),
            |row| row.clone(),
            |_, _| false,
        )
        .unwrap();
        assert_eq!(new_revisions, BTreeSet::from([id("c2")]));
    }

    #[test]
    fn steep_gradients_get_new_samples() {
        let history = HistoryGraph::mock_linear(10);
        let cmap = CommitMap::new(&history);
        let predicate = GradientThreshold {
            samples: SampleValues(BTreeMap::from([
                (id("c0"), 10.0),
                (id("c4"), 10.5),
                (id("c8"), 30.0),
                (id("c9"), 90.0),
            ])),
            threshold: 0.25,
        };
        let rows = vec![id("c0"), id("c4"), id("c8"), id("c9")];
        let (new_revisions, logs) = find_missing_revisions(
            rows,
            &cmap,
            |lhs, rhs| predicate.should_insert(lhs, rhs),
            |row| row.clone(),
            |lhs, rhs| history.are_neighbours(lhs, rhs),
        )
        .unwrap();
        assert_eq!(new_revisions, BTreeSet::from([id("c6")]));
        assert_eq!(logs.len(), 2);
        assert!(logs[1].text.starts_with("Found steep gradient between neighbours c8 - c9"));
    }

    #[test]
    fn no_rows_no_revisions() {
        let history = HistoryGraph::mock_linear(3);
        let cmap = CommitMap::new(&history);
        let (new_revisions, logs) = find_missing_revisions(
            Vec::<CommitId>::new(),
            &cmap,
            |_, _| (true, 1.0),
            |row| row.clone(),
            |_, _| false,
        )
        .unwrap();
        assert!(new_revisions.is_empty());
        assert!(logs.is_empty());
    }
}
