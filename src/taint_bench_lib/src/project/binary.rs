//! The binaries produced by a project build.

use super::revisions::RevisionSpan;
use crate::history::{CommitId, HistoryGraph};
use crate::prelude::*;
use std::path::{Path, PathBuf};

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum BinaryType {
    Executable,
    SharedLibrary,
    StaticLibrary,
}

/// A binary of a project, located relative to the primary source directory.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Hash, Clone)]
pub struct ProjectBinary {
    pub path: PathBuf,
    pub binary_type: BinaryType,
}

impl ProjectBinary {
    /// The file name of the binary.
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| self.path.to_string_lossy().to_string())
    }

    /// The absolute location of the binary inside a source directory.
    pub fn location(&self, source_dir: &Path) -> PathBuf {
        source_dir.join(&self.path)
    }
}

/// Wrap `(path, type)` pairs into project binaries.
pub fn wrap_paths_to_binaries(paths: &[(&str, BinaryType)]) -> Vec<ProjectBinary> {
    paths
        .iter()
        .map(|(path, binary_type)| ProjectBinary {
            path: PathBuf::from(path),
            binary_type: *binary_type,
        })
        .collect()
}

/// The binaries of a project, possibly depending on the built revision.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Binaries {
    Static(Vec<ProjectBinary>),
    /// Revisions inside `span` produce the `inside` binaries, all others the `outside` binaries.
    ByRevision {
        span: RevisionSpan,
        inside: Vec<ProjectBinary>,
        outside: Vec<ProjectBinary>,
    },
}

impl Binaries {
    /// Returns `true` if the binaries can only be determined with the project history at hand.
    pub fn depends_on_history(&self) -> bool {
        matches!(self, Binaries::ByRevision { .. })
    }

    /// The binaries of a revision.
    ///
    /// Revision-dependent binaries need the project history.
    pub fn resolve(
        &self,
        history: Option<&HistoryGraph>,
        revision: &CommitId,
    ) -> Result<&[ProjectBinary], Error> {
        match self {
            Binaries::Static(binaries) => Ok(binaries),
            Binaries::ByRevision {
                span,
                inside,
                outside,
            } => {
                let history = history
                    .ok_or_else(|| anyhow!("The binaries depend on the project history"))?;
                if span.contains(history, revision) {
                    Ok(inside)
                } else {
                    Ok(outside)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::tests::id;

    #[test]
    fn binary_names() {
        let binaries = wrap_paths_to_binaries(&[
            ("src/xz/.libs/xz", BinaryType::Executable),
            ("libssl.so", BinaryType::SharedLibrary),
        ]);
        assert_eq!(binaries[0].name(), "xz");
        assert_eq!(binaries[1].name(), "libssl.so");
        assert_eq!(
            binaries[0].location(Path::new("/build/xz")),
            PathBuf::from("/build/xz/src/xz/.libs/xz")
        );
    }

    #[test]
    fn binaries_by_revision() {
        let history = HistoryGraph::mock_linear(10);
        let binaries = Binaries::ByRevision {
            span: RevisionSpan::new("c2", "c4"),
            inside: wrap_paths_to_binaries(&[("src/xz/xz", BinaryType::Executable)]),
            outside: wrap_paths_to_binaries(&[("src/xz/.libs/xz", BinaryType::Executable)]),
        };
        assert!(binaries.depends_on_history());
        let resolved = binaries.resolve(Some(&history), &id("c3")).unwrap();
        assert_eq!(resolved[0].path, PathBuf::from("src/xz/xz"));
        let resolved = binaries.resolve(Some(&history), &id("c7")).unwrap();
        assert_eq!(resolved[0].path, PathBuf::from("src/xz/.libs/xz"));
        assert!(binaries.resolve(None, &id("c3")).is_err());
    }
}
