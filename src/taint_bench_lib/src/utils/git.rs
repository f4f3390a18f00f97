//! Access to the git repositories of project sources.
//!
//! Commit lookups and history walks use libgit2 through `git2`.
//! Working tree operations (clone, checkout, submodules) and `rev-list --bisect`,
//! which has no libgit2 counterpart, go through the `git` command line client.

use crate::prelude::*;
use crate::utils::command::run_command_for_stdout;
use git2::{Repository, Sort};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Pseudo revision selecting the commits reachable from any reference.
pub const ALL_REFERENCES: &str = "--all";

/// Executes git commands inside one repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Git {
    program: String,
    repo_path: PathBuf,
}

impl Git {
    /// Create a wrapper for the repository at `repo_path` using the given `git` executable.
    pub fn new(program: impl Into<String>, repo_path: impl AsRef<Path>) -> Git {
        Git {
            program: program.into(),
            repo_path: repo_path.as_ref().to_path_buf(),
        }
    }

    /// The path of the working tree.
    pub fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    /// Returns `true` if the path contains a git repository.
    pub fn is_repository(&self) -> bool {
        self.repo_path.join(".git").exists()
    }

    /// Build a git command that runs inside the repository.
    pub fn command<I, S>(&self, args: I) -> Command
    where
        I: IntoIterator<Item = S>,
        S: AsRef<std::ffi::OsStr>,
    {
        let mut command = Command::new(&self.program);
        command.arg("-C").arg(&self.repo_path).args(args);
        command
    }

    /// Run a git command inside the repository and return its trimmed `stdout` output.
    pub fn run<I, S>(&self, args: I) -> Result<String, Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<std::ffi::OsStr>,
    {
        let stdout = run_command_for_stdout(self.command(args))?;
        Ok(stdout.trim().to_string())
    }

    /// Clone `remote` into the repository path of this wrapper.
    ///
    /// `limit` restricts the history depth of a shallow clone.
    pub fn clone_from(&self, remote: &str, shallow: bool, limit: Option<usize>) -> Result<(), Error> {
        if let Some(parent) = self.repo_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Could not create source directory {}", parent.display())
            })?;
        }
        let mut command = Command::new(&self.program);
        command.arg("clone");
        if shallow {
            command.arg(format!("--depth={}", limit.unwrap_or(1)));
        }
        command.arg(remote).arg(&self.repo_path);
        run_command_for_stdout(command)?;
        Ok(())
    }

    /// Check out the given revision in detached HEAD mode.
    pub fn checkout(&self, revision: &str) -> Result<(), Error> {
        self.run(["checkout", "--detach", revision])?;
        Ok(())
    }

    /// Initialize and update all git submodules.
    pub fn update_submodules(&self) -> Result<(), Error> {
        self.run(["submodule", "init"])?;
        self.run(["submodule", "update"])?;
        Ok(())
    }

    /// Open the repository with libgit2.
    pub fn open(&self) -> Result<Repository, Error> {
        Repository::open(&self.repo_path)
            .with_context(|| format!("{} is not a git repository", self.repo_path.display()))
    }

    /// Resolve a revision (possibly abbreviated or symbolic like `HEAD`) to its full commit hash.
    pub fn rev_parse(&self, revision: &str) -> Result<String, Error> {
        let repo = self.open()?;
        let commit = repo
            .revparse_single(revision)
            .and_then(|object| object.peel_to_commit())
            .with_context(|| format!("{revision} does not name a commit"))?;
        Ok(commit.id().to_string())
    }

    /// Walk the history reachable from `revision` and return every commit with the hashes of its parents.
    ///
    /// [`ALL_REFERENCES`] walks the commits reachable from any reference or from `HEAD`.
    /// The first entry is the commit `revision` (respectively `HEAD`) points to.
    pub fn commits_with_parents(&self, revision: &str) -> Result<Vec<(String, Vec<String>)>, Error> {
        let repo = self.open()?;
        let mut walk = repo.revwalk()?;
        walk.set_sorting(Sort::TOPOLOGICAL)?;
        let tip = if revision == ALL_REFERENCES {
            walk.push_glob("*")?;
            walk.push_head()?;
            repo.head()?.peel_to_commit()?.id()
        } else {
            let tip = repo
                .revparse_single(revision)
                .and_then(|object| object.peel_to_commit())
                .with_context(|| format!("{revision} does not name a commit"))?
                .id();
            walk.push(tip)?;
            tip
        };

        let mut commits = Vec::new();
        for oid in walk {
            let commit = repo.find_commit(oid?)?;
            let parents = commit.parent_ids().map(|parent| parent.to_string()).collect();
            commits.push((commit.id().to_string(), parents));
        }
        let tip = tip.to_string();
        if let Some(position) = commits.iter().position(|(hash, _)| *hash == tip) {
            commits.swap(0, position);
        }
        Ok(commits)
    }

    /// Return the commit that `git bisect` would check next
    /// if `bad` was marked as bad and all commits in `good` were marked as good.
    ///
    /// Returns `None` if there is no commit left to test.
    pub fn bisect_point(&self, bad: &str, good: &[String]) -> Result<Option<String>, Error> {
        let mut args = vec!["rev-list".to_string(), "--bisect".to_string(), bad.to_string()];
        args.extend(good.iter().map(|commit| format!("^{commit}")));
        let output = self.run(args)?;
        Ok(output.lines().next().map(|line| line.trim().to_string()))
    }
}
