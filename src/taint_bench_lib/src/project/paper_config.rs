//! Paper configs restrict the revisions of each project that take part in an evaluation.

use crate::history::CommitId;
use crate::prelude::*;
use std::collections::BTreeMap;
use std::path::Path;

/// The revisions selected for each project, as read from a JSON object
/// `{ "<project>": ["<revision>", ...], ... }`.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Default)]
pub struct PaperConfig(pub BTreeMap<String, Vec<String>>);

impl PaperConfig {
    /// Read a paper config from a JSON file.
    pub fn from_file(path: &Path) -> Result<PaperConfig, Error> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("Could not open paper config {}", path.display()))?;
        serde_json::from_reader(std::io::BufReader::new(file))
            .with_context(|| format!("Paper config {} is malformed", path.display()))
    }

    /// The version filter of a project.
    pub fn project_filter(&self, project: &str) -> VersionFilter<'_> {
        VersionFilter {
            selected: self.0.get(project).map(|revisions| revisions.as_slice()),
        }
    }
}

/// Decides whether a revision of a project may be analyzed.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub struct VersionFilter<'a> {
    selected: Option<&'a [String]>,
}

impl<'a> VersionFilter<'a> {
    /// A filter accepting every revision.
    pub fn accept_all() -> VersionFilter<'static> {
        VersionFilter { selected: None }
    }

    /// The filter for a project under an optional paper config.
    ///
    /// Without a paper config, or if the paper config does not list the project, every revision is accepted.
    pub fn for_project(paper_config: Option<&'a PaperConfig>, project: &str) -> VersionFilter<'a> {
        match paper_config {
            Some(paper_config) => paper_config.project_filter(project),
            None => VersionFilter::accept_all(),
        }
    }

    /// Returns `true` if the revision is selected.
    /// Selected revisions may be abbreviated.
    pub fn accepts(&self, revision: &CommitId) -> bool {
        match self.selected {
            None => true,
            Some(selected) => selected.iter().any(|selected| {
                revision.matches(selected) || (!revision.as_str().is_empty() && selected.starts_with(revision.as_str()))
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::tests::id;

    fn mock_paper_config() -> PaperConfig {
        serde_json::from_str(r#"{"xz": ["c5c7ceb08a", "e7da44d515"], "openssl": []}"#).unwrap()
    }

    #[test]
    fn listed_projects_are_filtered() {
        let paper_config = mock_paper_config();
        let filter = VersionFilter::for_project(Some(&paper_config), "xz");
        assert!(filter.accepts(&id("c5c7ceb08a011ab3a4b2d05b3e2d2c3a1f3aa3b1")));
        assert!(filter.accepts(&id("e7da44d515")));
        assert!(!filter.accepts(&id("ffffffffff")));

        let filter = VersionFilter::for_project(Some(&paper_config), "openssl");
        assert!(!filter.accepts(&id("c5c7ceb08a")));
    }

    #[test]
    fn unlisted_projects_accept_everything() {
        let paper_config = mock_paper_config();
        assert!(VersionFilter::for_project(Some(&paper_config), "coreutils").accepts(&id("abc")));
        assert!(VersionFilter::for_project(None, "xz").accepts(&id("abc")));
    }

    #[test]
    fn read_from_file() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().to_path_buf();
        let path = dir.join("paper_config.json");
        std::fs::write(&path, r#"{"szz_base": ["abc123"]}"#).unwrap();
        let paper_config = PaperConfig::from_file(&path).unwrap();
        assert_eq!(paper_config.0["szz_base"], vec!["abc123".to_string()]);
        std::fs::write(&path, "[1, 2]").unwrap();
        assert!(PaperConfig::from_file(&path).is_err());
    }
}
