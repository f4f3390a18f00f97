//! Revision ranges of a project history, used to block revisions that can not be built
//! and to select revision-dependent build settings.

use crate::history::{CommitId, HistoryGraph};

/// All commits on an ancestry path from `start` to `end`, including both ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevisionSpan {
    pub start: &'static str,
    pub end: &'static str,
}

impl RevisionSpan {
    pub const fn new(start: &'static str, end: &'static str) -> RevisionSpan {
        RevisionSpan { start, end }
    }

    /// Returns `true` if the revision lies inside the span.
    ///
    /// Spans whose ends are not part of the history (e.g. in shallow clones) contain no revisions.
    pub fn contains(&self, history: &HistoryGraph, revision: &CommitId) -> bool {
        match (history.resolve(self.start), history.resolve(self.end)) {
            (Ok(start), Ok(end)) => history.commits_between(start, end).contains(revision),
            _ => false,
        }
    }
}

/// Revisions of a project that must not be analyzed, together with the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockedRevisions {
    /// Blocks the `bad` commits and all commits on an ancestry path from a bad to a `good` commit.
    /// The good commits themselves are not blocked.
    GoodBadSubgraph {
        bad: Vec<&'static str>,
        good: Vec<&'static str>,
        reason: &'static str,
    },
    /// Blocks all commits of a span.
    RevisionRange {
        span: RevisionSpan,
        reason: &'static str,
    },
}

impl BlockedRevisions {
    /// Block the subgraph between bad and good commits.
    pub fn good_bad_subgraph(
        bad: &[&'static str],
        good: &[&'static str],
        reason: &'static str,
    ) -> BlockedRevisions {
        BlockedRevisions::GoodBadSubgraph {
            bad: bad.to_vec(),
            good: good.to_vec(),
            reason,
        }
    }

    /// Block all commits between `start` and `end`.
    pub fn revision_range(
        start: &'static str,
        end: &'static str,
        reason: &'static str,
    ) -> BlockedRevisions {
        BlockedRevisions::RevisionRange {
            span: RevisionSpan::new(start, end),
            reason,
        }
    }

    /// The reason why the revisions are blocked.
    pub fn reason(&self) -> &'static str {
        match self {
            BlockedRevisions::GoodBadSubgraph { reason, .. }
            | BlockedRevisions::RevisionRange { reason, .. } => reason,
        }
    }

    /// Returns `true` if the revision is blocked.
    pub fn is_blocked(&self, history: &HistoryGraph, revision: &CommitId) -> bool {
        match self {
            BlockedRevisions::GoodBadSubgraph { bad, good, .. } => {
                let bad: Vec<&CommitId> = bad
                    .iter()
                    .filter_map(|commit| history.resolve(commit).ok())
                    .collect();
                let good: Vec<&CommitId> = good
                    .iter()
                    .filter_map(|commit| history.resolve(commit).ok())
                    .collect();
                if good.contains(&revision) {
                    return false;
                }
                bad.contains(&revision)
                    || bad.iter().any(|bad_commit| {
                        good.iter().any(|good_commit| {
                            history
                                .commits_between(bad_commit, good_commit)
                                .contains(revision)
                        })
                    })
            }
            BlockedRevisions::RevisionRange { span, .. } => span.contains(history, revision),
        }
    }
}

/// Return the reason of the first block containing the revision, if any.
pub fn blocking_reason(
    blocked: &[BlockedRevisions],
    history: &HistoryGraph,
    revision: &CommitId,
) -> Option<&'static str> {
    blocked
        .iter()
        .find(|block| block.is_blocked(history, revision))
        .map(|block| block.reason())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::tests::id;

    #[test]
    fn revision_span() {
        let history = HistoryGraph::mock_linear(10);
        let span = RevisionSpan::new("c2", "c5");
        assert!(span.contains(&history, &id("c2")));
        assert!(span.contains(&history, &id("c4")));
        assert!(span.contains(&history, &id("c5")));
        assert!(!span.contains(&history, &id("c1")));
        assert!(!span.contains(&history, &id("c6")));
        assert!(!RevisionSpan::new("c2", "zz").contains(&history, &id("c3")));
    }

    #[test]
    fn good_bad_subgraph() {
        let history = HistoryGraph::mock_linear(10);
        let block = BlockedRevisions::good_bad_subgraph(&["c3"], &["c6"], "broken build");
        assert!(!block.is_blocked(&history, &id("c2")));
        assert!(block.is_blocked(&history, &id("c3")));
        assert!(block.is_blocked(&history, &id("c5")));
        assert!(!block.is_blocked(&history, &id("c6")));
        assert!(!block.is_blocked(&history, &id("c7")));
        assert_eq!(block.reason(), "broken build");
    }

    #[test]
    fn good_bad_subgraph_with_branches() {
        let history = HistoryGraph::mock_diamond();
        // The fix was merged from `left`, the `right` branch never contained the bug.
        let block = BlockedRevisions::good_bad_subgraph(&["base"], &["left"], "bug");
        assert!(block.is_blocked(&history, &id("base")));
        assert!(!block.is_blocked(&history, &id("left")));
        assert!(!block.is_blocked(&history, &id("right")));
        assert!(!block.is_blocked(&history, &id("head")));
    }

    #[test]
    fn first_blocking_reason_wins() {
        let history = HistoryGraph::mock_linear(10);
        let blocked = vec![
            BlockedRevisions::revision_range("c0", "c1", "initial import"),
            BlockedRevisions::good_bad_subgraph(&["c4"], &["c5"], "missing header"),
        ];
        assert_eq!(blocking_reason(&blocked, &history, &id("c0")), Some("initial import"));
        assert_eq!(blocking_reason(&blocked, &history, &id("c4")), Some("missing header"));
        assert_eq!(blocking_reason(&blocked, &history, &id("c7")), None);
    }
}
