//! Commit histories of projects and algorithms working on them.
//!
//! A history is a directed acyclic graph of commits, where each commit points to its parents.
//! The [`CommitGraph`] trait abstracts over where this graph comes from:
//! [`HistoryGraph`] holds it completely in memory,
//! [`GitHistory`] additionally asks the `git` client for bisection points.
//!
//! The algorithms built on top are
//! * [`bisect::bisect_project`], which proposes new sample revisions between sampled commits
//!   whose results differ too much,
//! * [`missing::find_missing_revisions`], which does the same along a linear time line of samples.

pub mod bisect;
pub mod missing;
pub mod samples;

use crate::prelude::*;
use crate::utils::git::Git;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Dfs, Walker};
use std::collections::{HashMap, HashSet};

/// The full hash of a commit.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Hash, Clone, PartialOrd, Ord)]
pub struct CommitId(String);

impl CommitId {
    /// Wrap a commit hash.
    pub fn new(hash: impl Into<String>) -> CommitId {
        CommitId(hash.into())
    }

    /// The commit hash as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if `revision` is this commit's hash or an abbreviation of it.
    pub fn matches(&self, revision: &str) -> bool {
        !revision.is_empty() && self.0.starts_with(revision)
    }
}

impl std::fmt::Display for CommitId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Access to the commit graph of a project.
pub trait CommitGraph {
    /// The commit the history starts from.
    fn head(&self) -> &CommitId;

    /// The parents of a commit. Unknown commits have no parents.
    fn parents(&self, commit: &CommitId) -> Vec<CommitId>;

    /// The commit that `git bisect` would test next
    /// if `bad` was marked as bad and all commits in `good` were marked as good.
    ///
    /// Returns `None` if no commit is left to test.
    fn bisect_point(&self, bad: &CommitId, good: &[CommitId]) -> Result<Option<CommitId>, Error>;
}

/// A commit graph held completely in memory.
///
/// Edges point from a commit to its parents.
#[derive(Debug, Clone)]
pub struct HistoryGraph {
    graph: DiGraph<CommitId, ()>,
    node_map: HashMap<CommitId, NodeIndex>,
    head: CommitId,
}

impl HistoryGraph {
    /// Build the graph from a list of commits with their parents.
    ///
    /// The first commit of the list is the head of the history.
    /// Parents that are not listed themselves (e.g. in shallow clones) become commits without parents.
    pub fn from_parent_lists(commits: Vec<(CommitId, Vec<CommitId>)>) -> Result<HistoryGraph, Error> {
        let head = commits
            .first()
            .map(|(commit, _)| commit.clone())
            .ok_or_else(|| anyhow!("The history contains no commits"))?;
        let mut history = HistoryGraph {
            graph: DiGraph::new(),
            node_map: HashMap::new(),
            head,
        };
        for (commit, _) in commits.iter() {
            history.add_commit(commit);
        }
        for (commit, parents) in commits.iter() {
            let child = history.add_commit(commit);
            for parent in parents {
                let parent = history.add_commit(parent);
                history.graph.update_edge(child, parent, ());
            }
        }
        if petgraph::algo::is_cyclic_directed(&history.graph) {
            return Err(anyhow!("The commit history contains a cycle"));
        }
        Ok(history)
    }

    /// Load the history reachable from `revision` in the given repository.
    ///
    /// [`ALL_REFERENCES`](crate::utils::git::ALL_REFERENCES) loads every branch, with `HEAD` as the head.
    pub fn from_repository(git: &Git, revision: &str) -> Result<HistoryGraph, Error> {
        let commits = git
            .commits_with_parents(revision)
            .with_context(|| format!("Could not read the history of {}", git.repo_path().display()))?;
        HistoryGraph::from_parent_lists(
            commits
                .into_iter()
                .map(|(commit, parents)| {
                    (
                        CommitId::new(commit),
                        parents.into_iter().map(CommitId::new).collect(),
                    )
                })
                .collect(),
        )
    }

    fn add_commit(&mut self, commit: &CommitId) -> NodeIndex {
        if let Some(index) = self.node_map.get(commit) {
            return *index;
        }
        let index = self.graph.add_node(commit.clone());
        self.node_map.insert(commit.clone(), index);
        index
    }

    /// The number of commits in the history.
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    /// Returns `true` if the history contains no commits.
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Returns `true` if the commit is part of the history.
    pub fn contains(&self, commit: &CommitId) -> bool {
        self.node_map.contains_key(commit)
    }

    /// Resolve a possibly abbreviated revision to the unique commit it denotes.
    pub fn resolve(&self, revision: &str) -> Result<&CommitId, Error> {
        let mut candidates = self
            .graph
            .node_weights()
            .filter(|commit| commit.matches(revision));
        match (candidates.next(), candidates.next()) {
            (Some(commit), None) => Ok(commit),
            (None, _) => Err(anyhow!("Unknown revision {revision}")),
            (Some(_), Some(_)) => Err(anyhow!("Ambiguous revision {revision}")),
        }
    }

    /// Returns `true` if one of the commits is a parent of the other.
    pub fn are_neighbours(&self, lhs: &CommitId, rhs: &CommitId) -> bool {
        match (self.node_map.get(lhs), self.node_map.get(rhs)) {
            (Some(lhs), Some(rhs)) => {
                self.graph.contains_edge(*lhs, *rhs) || self.graph.contains_edge(*rhs, *lhs)
            }
            _ => false,
        }
    }

    /// All ancestors of the commit including the commit itself.
    fn ancestor_indices(&self, commit: NodeIndex) -> HashSet<NodeIndex> {
        Dfs::new(&self.graph, commit).iter(&self.graph).collect()
    }

    /// All ancestors of the commit including the commit itself.
    pub fn ancestors(&self, commit: &CommitId) -> HashSet<CommitId> {
        match self.node_map.get(commit) {
            Some(index) => self
                .ancestor_indices(*index)
                .into_iter()
                .map(|index| self.graph[index].clone())
                .collect(),
            None => HashSet::new(),
        }
    }

    /// All commits on an ancestry path from `start` to `end`, including both ends.
    ///
    /// Returns an empty set if `start` is not an ancestor of `end`.
    pub fn commits_between(&self, start: &CommitId, end: &CommitId) -> HashSet<CommitId> {
        let (Some(start), Some(end)) = (self.node_map.get(start), self.node_map.get(end)) else {
            return HashSet::new();
        };
        let ancestors_of_end = self.ancestor_indices(*end);
        if !ancestors_of_end.contains(start) {
            return HashSet::new();
        }
        // Descendants of `start` are found by walking the reversed graph.
        let reversed = petgraph::visit::Reversed(&self.graph);
        Dfs::new(reversed, *start)
            .iter(reversed)
            .filter(|index| ancestors_of_end.contains(index))
            .map(|index| self.graph[index].clone())
            .collect()
    }

    /// All commits ordered from the oldest to the newest,
    /// so that every commit comes after all of its parents.
    pub fn oldest_first(&self) -> Vec<CommitId> {
        let mut order = petgraph::algo::toposort(&self.graph, None)
            .expect("Commit histories are acyclic by construction");
        order.reverse();
        order
            .into_iter()
            .map(|index| self.graph[index].clone())
            .collect()
    }
}

impl CommitGraph for HistoryGraph {
    fn head(&self) -> &CommitId {
        &self.head
    }

    fn parents(&self, commit: &CommitId) -> Vec<CommitId> {
        match self.node_map.get(commit) {
            Some(index) => {
                let mut parents: Vec<CommitId> = self
                    .graph
                    .neighbors(*index)
                    .map(|parent| self.graph[parent].clone())
                    .collect();
                // petgraph yields neighbours in reverse insertion order.
                parents.reverse();
                parents
            }
            None => Vec::new(),
        }
    }

    /// Mirrors the choice of `git rev-list --bisect`:
    /// among all commits reachable from `bad` but not from any `good` commit,
    /// choose the one whose number of such ancestors is closest to half of all of them.
    fn bisect_point(&self, bad: &CommitId, good: &[CommitId]) -> Result<Option<CommitId>, Error> {
        let bad_index = *self
            .node_map
            .get(bad)
            .ok_or_else(|| anyhow!("Unknown commit {bad}"))?;
        let mut candidates = self.ancestor_indices(bad_index);
        for good_commit in good {
            if let Some(index) = self.node_map.get(good_commit) {
                for ancestor in self.ancestor_indices(*index) {
                    candidates.remove(&ancestor);
                }
            }
        }
        let total = candidates.len();
        let mut ordered_candidates: Vec<NodeIndex> = candidates.iter().copied().collect();
        ordered_candidates.sort();

        let mut best: Option<(usize, NodeIndex)> = None;
        for candidate in ordered_candidates {
            let weight = self
                .ancestor_indices(candidate)
                .intersection(&candidates)
                .count();
            let distance = std::cmp::min(weight, total - weight);
            if best.map_or(true, |(best_distance, _)| distance > best_distance) {
                best = Some((distance, candidate));
            }
        }
        Ok(best.map(|(_, index)| self.graph[index].clone()))
    }
}

/// The history of a git repository.
///
/// The commit graph is loaded once, bisection points are computed by `git rev-list --bisect`.
pub struct GitHistory {
    git: Git,
    graph: HistoryGraph,
}

impl GitHistory {
    /// Load the history reachable from `revision`.
    pub fn load(git: Git, revision: &str) -> Result<GitHistory, Error> {
        let graph = HistoryGraph::from_repository(&git, revision)?;
        Ok(GitHistory { git, graph })
    }

    /// The in-memory commit graph.
    pub fn graph(&self) -> &HistoryGraph {
        &self.graph
    }
}

impl CommitGraph for GitHistory {
    fn head(&self) -> &CommitId {
        self.graph.head()
    }

    fn parents(&self, commit: &CommitId) -> Vec<CommitId> {
        self.graph.parents(commit)
    }

    fn bisect_point(&self, bad: &CommitId, good: &[CommitId]) -> Result<Option<CommitId>, Error> {
        let good: Vec<String> = good.iter().map(|commit| commit.to_string()).collect();
        Ok(self
            .git
            .bisect_point(bad.as_str(), &good)?
            .filter(|hash| !hash.is_empty())
            .map(CommitId::new))
    }
}
