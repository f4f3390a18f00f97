//! Bisection over the whole history of a project.
//!
//! Given the set of already evaluated (sampled) revisions,
//! the walk starts at HEAD and moves backwards through the history.
//! For every sampled commit it determines the nearest sampled ancestors,
//! i.e. the sampled commits reachable without passing another sampled commit.
//! If the client predicate deems the change between an ancestor and the commit interesting,
//! the commit is treated as *bad*, the interesting ancestors as *good*,
//! and the commit `git bisect` would test next is proposed as a new sample.

use super::{CommitGraph, CommitId};
use crate::prelude::*;
use crate::utils::log::LogMessage;
use std::collections::{BTreeSet, HashSet};

const LOG_SOURCE: &str = "Bisection";

/// Find the nearest sampled ancestors of `commit`.
///
/// Every commit of the history is visited at most once per call,
/// so merges do not cause duplicate work.
pub fn nearest_sampled_ancestors<G: CommitGraph + ?Sized>(
    graph: &G,
    commit: &CommitId,
    samples: &HashSet<CommitId>,
) -> BTreeSet<CommitId> {
    let mut queue = graph.parents(commit);
    let mut visited: HashSet<CommitId> = queue.iter().cloned().collect();
    let mut result = BTreeSet::new();

    while let Some(current) = queue.pop() {
        if samples.contains(&current) {
            result.insert(current);
        } else {
            for parent in graph.parents(&current) {
                if visited.insert(parent.clone()) {
                    queue.push(parent);
                }
            }
        }
    }
    result
}

/// Perform one bisection step over the whole history of a project for a given sample of evaluated revisions.
///
/// `should_insert_revision(ancestor, commit)` decides whether bisection should be performed
/// between a sampled ancestor and a sampled commit. Its second return value (usually a gradient) is only used for logging.
///
/// Returns the revisions that should be evaluated for the next bisection step
/// together with log messages describing the decisions.
/// A revision that is already part of the sample is never returned.
pub fn bisect_project<G, F>(
    samples: &HashSet<CommitId>,
    graph: &G,
    mut should_insert_revision: F,
) -> Result<(BTreeSet<CommitId>, Vec<LogMessage>), Error>
where
    G: CommitGraph + ?Sized,
    F: FnMut(&CommitId, &CommitId) -> (bool, f64),
{
    let mut new_revisions = BTreeSet::new();
    let mut logs = Vec::new();

    let head = graph.head().clone();
    let mut to_process: Vec<CommitId> = if samples.contains(&head) {
        vec![head]
    } else {
        nearest_sampled_ancestors(graph, &head, samples)
            .into_iter()
            .collect()
    };
    let mut processed: HashSet<CommitId> = to_process.iter().cloned().collect();

    while let Some(current) = to_process.pop() {
        let ancestors = nearest_sampled_ancestors(graph, &current, samples);
        let good: Vec<CommitId> = ancestors
            .iter()
            .filter(|ancestor| should_insert_revision(*ancestor, &current).0)
            .cloned()
            .collect();

        if !good.is_empty() {
            logs.push(
                LogMessage::new_debug(format!("Bisecting against {} sampled ancestors", good.len()))
                    .source(LOG_SOURCE)
                    .location(current.to_string()),
            );
            match graph.bisect_point(&current, &good)? {
                Some(new_revision) if samples.contains(&new_revision) => {
                    logs.push(
                        LogMessage::new_info("Bisection point already evaluated. Skipping.")
                            .source(LOG_SOURCE)
                            .location(current.to_string()),
                    );
                }
                Some(new_revision) => {
                    logs.push(
                        LogMessage::new_info(format!(
                            "Adding {new_revision} as new revision to the sample set"
                        ))
                        .source(LOG_SOURCE)
                        .location(current.to_string()),
                    );
                    new_revisions.insert(new_revision);
                }
                None => {
                    logs.push(
                        LogMessage::new_debug("No commit left to bisect.")
                            .source(LOG_SOURCE)
                            .location(current.to_string()),
                    );
                }
            }
        }

        for ancestor in ancestors {
            if processed.insert(ancestor.clone()) {
                to_process.push(ancestor);
            }
        }
    }
    Ok((new_revisions, logs))
}
