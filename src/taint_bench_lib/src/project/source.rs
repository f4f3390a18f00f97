//! Where the sources of a project come from.

use crate::config::Config;
use crate::prelude::*;
use crate::utils::git::Git;
use std::path::{Path, PathBuf};

/// The kind of a source repository.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum SourceKind {
    /// A remote git repository.
    Git,
    /// A repository of the VaRA test repos, located relative to [`Config::vara_test_repos`].
    VaraTestRepo,
    /// A VaRA test repository that is included as a git submodule of the primary source.
    VaraTestRepoSubmodule,
    /// A repository that already exists in the source cache and is never cloned.
    LocalGit,
}

/// A source repository of a project.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Source {
    pub kind: SourceKind,
    pub remote: &'static str,
    /// The directory name of the source, relative to the source cache or the build directory.
    pub local: &'static str,
    pub refspec: &'static str,
    /// History depth of shallow clones.
    pub limit: Option<usize>,
    pub shallow: bool,
}

impl Source {
    /// A full clone of a remote repository.
    pub const fn git(remote: &'static str, local: &'static str) -> Source {
        Source {
            kind: SourceKind::Git,
            remote,
            local,
            refspec: "HEAD",
            limit: None,
            shallow: false,
        }
    }

    /// A repository of the VaRA test repos.
    pub const fn vara_test_repo(remote: &'static str, local: &'static str) -> Source {
        Source {
            kind: SourceKind::VaraTestRepo,
            ..Source::git(remote, local)
        }
    }

    /// A VaRA test repository included as a submodule of the primary source.
    pub const fn vara_test_repo_submodule(remote: &'static str, local: &'static str) -> Source {
        Source {
            kind: SourceKind::VaraTestRepoSubmodule,
            ..Source::git(remote, local)
        }
    }

    /// A repository that must already be present in the source cache.
    pub const fn local_git(local: &'static str) -> Source {
        Source {
            kind: SourceKind::LocalGit,
            ..Source::git("/dev/null", local)
        }
    }

    /// The URL or path to clone the source from.
    pub fn remote_url(&self, config: &Config) -> String {
        match self.kind {
            SourceKind::Git | SourceKind::LocalGit => self.remote.to_string(),
            SourceKind::VaraTestRepo | SourceKind::VaraTestRepoSubmodule => format!(
                "{}/{}",
                config.vara_test_repos.trim_end_matches('/'),
                self.remote
            ),
        }
    }

    /// The location of the cached clone, which is shared by all runs.
    pub fn cache_path(&self, config: &Config) -> PathBuf {
        config.tmp_dir.join(self.local)
    }

    /// Make sure the cached clone of the source exists.
    ///
    /// Returns `true` if the source had to be cloned.
    pub fn ensure_cached(&self, config: &Config) -> Result<bool, Error> {
        let git = Git::new(&config.tools.git, self.cache_path(config));
        if git.is_repository() {
            return Ok(false);
        }
        if self.kind == SourceKind::LocalGit {
            return Err(anyhow!(
                "Local source {} does not exist in {}",
                self.local,
                config.tmp_dir.display()
            ));
        }
        git.clone_from(&self.remote_url(config), self.shallow, self.limit)
            .with_context(|| format!("Could not fetch source {}", self.local))?;
        Ok(true)
    }

    /// Copy the cached clone into `build_dir`, sharing its object store.
    pub fn copy_to(&self, config: &Config, build_dir: &Path) -> Result<Git, Error> {
        let git = Git::new(&config.tools.git, build_dir.join(self.local));
        if !git.is_repository() {
            let cache = self.cache_path(config);
            git.clone_from(&cache.to_string_lossy(), false, None)
                .with_context(|| format!("Could not copy source {} into the build directory", self.local))?;
        }
        Ok(git)
    }
}
