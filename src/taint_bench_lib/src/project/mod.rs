//! Declarative descriptions of the analyzed projects and the operations working on them.
//!
//! A [`ProjectDescriptor`] is plain data: where the sources come from, which revisions are blocked,
//! how the project is configured, built and tested and which binaries the build produces.
//! The free functions [`fetch`], [`configure`], [`build`], [`test`], [`binaries`] and [`clean`]
//! execute a descriptor for one revision in the per-run build directory of a [`ProjectContext`].
//!
//! Sources are cloned once into the source cache (`tmp_dir`) and copied from there
//! into the build directory of each run, so that runs never share a working tree.

pub mod binary;
pub mod paper_config;
pub mod recipe;
pub mod revisions;
pub mod source;

use crate::config::Config;
use crate::history::{CommitId, HistoryGraph};
use crate::prelude::*;
use crate::utils::git::{Git, ALL_REFERENCES};
use crate::utils::log::LogMessage;
use binary::{Binaries, ProjectBinary};
use paper_config::VersionFilter;
use recipe::{execute_all, BuildCommand, BuildEnv, CompilerSet};
use revisions::{blocking_reason, BlockedRevisions};
use source::{Source, SourceKind};
use std::path::PathBuf;

/// Number of characters of a commit hash used in report file names.
pub const SHORT_REVISION_LENGTH: usize = 10;

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum ProjectGroup {
    CProjects,
    CppProjects,
    TestProjects,
}

impl std::fmt::Display for ProjectGroup {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ProjectGroup::CProjects => "c_projects",
            ProjectGroup::CppProjects => "cpp_projects",
            ProjectGroup::TestProjects => "test_projects",
        };
        write!(formatter, "{name}")
    }
}

/// Everything the harness needs to know about a project.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ProjectDescriptor {
    pub name: &'static str,
    pub group: ProjectGroup,
    pub domain: &'static str,
    /// The first source is the primary source, which contains the build system.
    pub sources: Vec<Source>,
    pub blocked: Vec<BlockedRevisions>,
    pub binaries: Binaries,
    pub configure: Vec<BuildCommand>,
    pub build: Vec<BuildCommand>,
    pub tests: Vec<BuildCommand>,
    pub cflags: Vec<&'static str>,
    /// `(vendor, product)` pairs identifying the project in CVE databases.
    pub cve_products: Vec<(&'static str, &'static str)>,
}

impl ProjectDescriptor {
    /// The source containing the build system of the project.
    pub fn primary_source(&self) -> Result<&Source, Error> {
        self.sources
            .first()
            .ok_or_else(|| anyhow!("Project {} has no sources", self.name))
    }

    /// The `(vendor, product)` pairs to look up CVEs of the project.
    pub fn cve_product_info(&self) -> &[(&'static str, &'static str)] {
        &self.cve_products
    }

    /// Returns `true` if some part of the descriptor needs the project history.
    fn needs_history(&self) -> bool {
        !self.blocked.is_empty()
            || self.binaries.depends_on_history()
            || self
                .configure
                .iter()
                .chain(self.build.iter())
                .chain(self.tests.iter())
                .any(BuildCommand::depends_on_history)
    }
}

/// One revision of a project, built with one compiler set during one run.
pub struct ProjectContext<'a> {
    pub config: &'a Config,
    pub project: &'a ProjectDescriptor,
    /// The full hash of the analyzed revision.
    pub revision: CommitId,
    pub run_id: String,
    pub compilers: CompilerSet,
    pub version_filter: VersionFilter<'a>,
}

impl<'a> ProjectContext<'a> {
    /// The directory holding all sources of this run.
    pub fn build_dir(&self) -> PathBuf {
        self.config
            .tmp_dir
            .join("builds")
            .join(format!("{}-{}", self.project.name, self.run_id))
    }

    /// The checkout of the primary source inside the build directory.
    pub fn source_dir(&self) -> Result<PathBuf, Error> {
        Ok(self.build_dir().join(self.project.primary_source()?.local))
    }

    /// The abbreviated revision used in report file names.
    pub fn short_revision(&self) -> &str {
        let revision = self.revision.as_str();
        match revision.char_indices().nth(SHORT_REVISION_LENGTH) {
            Some((end, _)) => &revision[..end],
            None => revision,
        }
    }

    fn primary_git(&self) -> Result<Git, Error> {
        Ok(Git::new(&self.config.tools.git, self.source_dir()?))
    }

    /// Load the history of the checked out primary source, including all branches.
    fn history(&self) -> Result<HistoryGraph, Error> {
        HistoryGraph::from_repository(&self.primary_git()?, ALL_REFERENCES)
    }

    /// Run `operation` with the build environment of this context.
    fn with_build_env<T>(
        &self,
        operation: impl FnOnce(&BuildEnv) -> Result<T, Error>,
    ) -> Result<T, Error> {
        let source_dir = self.source_dir()?;
        let history = if self.project.needs_history() {
            Some(self.history()?)
        } else {
            None
        };
        let env = BuildEnv {
            config: self.config,
            compilers: &self.compilers,
            cflags: &self.project.cflags,
            source_dir: &source_dir,
            revision: &self.revision,
            history: history.as_ref(),
        };
        operation(&env)
    }
}

/// Make sure the primary source of the project is cached and resolve `revision` to a full commit hash.
pub fn resolve_revision(
    config: &Config,
    project: &ProjectDescriptor,
    revision: &str,
) -> Result<(CommitId, Vec<LogMessage>), Error> {
    let mut logs = Vec::new();
    let primary = project.primary_source()?;
    if primary.ensure_cached(config)? {
        logs.push(
            LogMessage::new_info(format!("Cloned {}", primary.remote_url(config)))
                .source(project.name),
        );
    }
    let git = Git::new(&config.tools.git, primary.cache_path(config));
    let hash = git
        .rev_parse(revision)
        .with_context(|| format!("Unknown revision {revision} of {}", project.name))?;
    Ok((CommitId::new(hash), logs))
}

/// Copy the sources of the project into the build directory and check out the revision of the context.
///
/// Revisions not selected by the version filter and blocked revisions are rejected.
/// Returns the checkout of the primary source.
pub fn fetch(ctx: &ProjectContext) -> Result<(PathBuf, Vec<LogMessage>), Error> {
    let project = ctx.project;
    if !ctx.version_filter.accepts(&ctx.revision) {
        return Err(anyhow!(
            "Revision {} of {} is not selected by the paper config",
            ctx.revision,
            project.name
        ));
    }
    let mut logs = Vec::new();
    let build_dir = ctx.build_dir();
    for source in project
        .sources
        .iter()
        .filter(|source| source.kind != SourceKind::VaraTestRepoSubmodule)
    {
        if source.ensure_cached(ctx.config)? {
            logs.push(
                LogMessage::new_info(format!("Cloned {}", source.remote_url(ctx.config)))
                    .source(project.name),
            );
        }
        source.copy_to(ctx.config, &build_dir)?;
    }

    let git = ctx.primary_git()?;
    if !project.blocked.is_empty() {
        let history = ctx.history()?;
        if let Some(reason) = blocking_reason(&project.blocked, &history, &ctx.revision) {
            return Err(anyhow!(
                "Revision {} of {} is blocked: {reason}",
                ctx.revision,
                project.name
            ));
        }
    }
    git.checkout(ctx.revision.as_str())?;
    logs.push(
        LogMessage::new_debug(format!("Checked out {}", ctx.revision))
            .source(project.name)
            .location(git.repo_path().display().to_string()),
    );

    if project
        .sources
        .iter()
        .any(|source| source.kind == SourceKind::VaraTestRepoSubmodule)
    {
        git.update_submodules()?;
        logs.push(LogMessage::new_debug("Updated submodule sources").source(project.name));
    }
    Ok((git.repo_path().to_path_buf(), logs))
}

/// Run the configure recipe of the project.
pub fn configure(ctx: &ProjectContext) -> Result<Vec<LogMessage>, Error> {
    ctx.with_build_env(|env| execute_all(&ctx.project.configure, env))
        .with_context(|| format!("Configuring {} failed", ctx.project.name))
}

/// Run the build recipe of the project.
///
/// Binaries missing after the build are reported in the returned log messages.
pub fn build(ctx: &ProjectContext) -> Result<Vec<LogMessage>, Error> {
    let mut logs = ctx
        .with_build_env(|env| execute_all(&ctx.project.build, env))
        .with_context(|| format!("Building {} failed", ctx.project.name))?;
    let source_dir = ctx.source_dir()?;
    for binary in binaries(ctx)? {
        if !binary.location(&source_dir).exists() {
            logs.push(
                LogMessage::new_info(format!("Could not find binary {}", binary.path.display()))
                    .source(ctx.project.name),
            );
        }
    }
    Ok(logs)
}

/// Run the test recipe of the project. Projects without tests are skipped.
pub fn test(ctx: &ProjectContext) -> Result<Vec<LogMessage>, Error> {
    if ctx.project.tests.is_empty() {
        return Ok(vec![
            LogMessage::new_debug("Project defines no tests").source(ctx.project.name)
        ]);
    }
    ctx.with_build_env(|env| execute_all(&ctx.project.tests, env))
        .with_context(|| format!("Testing {} failed", ctx.project.name))
}

/// The binaries the build of the context revision produces.
pub fn binaries(ctx: &ProjectContext) -> Result<Vec<ProjectBinary>, Error> {
    let history = if ctx.project.binaries.depends_on_history() {
        Some(ctx.history()?)
    } else {
        None
    };
    Ok(ctx
        .project
        .binaries
        .resolve(history.as_ref(), &ctx.revision)?
        .to_vec())
}

/// Remove the build directory of the run.
pub fn clean(ctx: &ProjectContext) -> Result<Vec<LogMessage>, Error> {
    let build_dir = ctx.build_dir();
    if !build_dir.exists() {
        return Ok(Vec::new());
    }
    std::fs::remove_dir_all(&build_dir)
        .with_context(|| format!("Could not remove {}", build_dir.display()))?;
    Ok(vec![LogMessage::new_debug(format!(
        "Removed {}",
        build_dir.display()
    ))
    .source(ctx.project.name)])
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::history::tests::id;
    use binary::{wrap_paths_to_binaries, BinaryType};
    use paper_config::PaperConfig;

    impl ProjectDescriptor {
        /// A project built by shell commands, without history-dependent parts.
        pub fn mock(name: &'static str) -> ProjectDescriptor {
            ProjectDescriptor {
                name,
                group: ProjectGroup::TestProjects,
                domain: "testing",
                sources: vec![Source::vara_test_repo("Scenarios/Mock", "Mock")],
                blocked: Vec::new(),
                binaries: Binaries::Static(wrap_paths_to_binaries(&[
                    ("main", BinaryType::Executable),
                    ("lib/libmock.so", BinaryType::SharedLibrary),
                ])),
                configure: Vec::new(),
                build: vec![BuildCommand::Run {
                    program: "sh",
                    args: vec!["-c", "touch main"],
                }],
                tests: Vec::new(),
                cflags: Vec::new(),
                cve_products: vec![("mock_vendor", "mock")],
            }
        }
    }

    impl<'a> ProjectContext<'a> {
        pub fn mock(config: &'a Config, project: &'a ProjectDescriptor) -> ProjectContext<'a> {
            ProjectContext {
                config,
                project,
                revision: id("c5c7ceb08a011ab3a4b2d05b3e2d2c3a1f3aa3b1"),
                run_id: "1700000000000".to_string(),
                compilers: CompilerSet::clang(config),
                version_filter: VersionFilter::accept_all(),
            }
        }
    }

    #[test]
    fn context_paths() {
        let config = Config::mock(std::path::Path::new("/tmp/tb"));
        let project = ProjectDescriptor::mock("mock");
        let ctx = ProjectContext::mock(&config, &project);
        assert_eq!(
            ctx.build_dir(),
            PathBuf::from("/tmp/tb/tmp/builds/mock-1700000000000")
        );
        assert_eq!(
            ctx.source_dir().unwrap(),
            PathBuf::from("/tmp/tb/tmp/builds/mock-1700000000000/Mock")
        );
        assert_eq!(ctx.short_revision(), "c5c7ceb08a");
        assert_eq!(project.cve_product_info(), &[("mock_vendor", "mock")]);
        assert_eq!(ProjectGroup::CppProjects.to_string(), "cpp_projects");
    }

    #[test]
    fn filtered_revisions_are_not_fetched() {
        let config = Config::mock(std::path::Path::new("/tmp/tb"));
        let project = ProjectDescriptor::mock("mock");
        let paper_config: PaperConfig =
            serde_json::from_str(r#"{"mock": ["0000000000"]}"#).unwrap();
        let mut ctx = ProjectContext::mock(&config, &project);
        ctx.version_filter = VersionFilter::for_project(Some(&paper_config), "mock");
        let error = fetch(&ctx).unwrap_err();
        assert!(format!("{error}").contains("not selected by the paper config"));
    }

    #[test]
    fn build_reports_missing_binaries() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().to_path_buf();
        let config = Config::mock(&dir);
        let project = ProjectDescriptor::mock("mock");
        let ctx = ProjectContext::mock(&config, &project);
        std::fs::create_dir_all(ctx.source_dir().unwrap()).unwrap();

        assert!(configure(&ctx).unwrap().is_empty());
        let logs = build(&ctx).unwrap();
        assert!(ctx.source_dir().unwrap().join("main").exists());
        let missing: Vec<&LogMessage> = logs
            .iter()
            .filter(|log| log.text.starts_with("Could not find binary"))
            .collect();
        assert_eq!(missing.len(), 1);
        assert!(missing[0].text.ends_with("lib/libmock.so"));
        assert_eq!(test(&ctx).unwrap().len(), 1);
        assert_eq!(binaries(&ctx).unwrap().len(), 2);

        assert_eq!(clean(&ctx).unwrap().len(), 1);
        assert!(!ctx.build_dir().exists());
        assert!(clean(&ctx).unwrap().is_empty());
    }

    #[test]
    fn failing_build_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().to_path_buf();
        let config = Config::mock(&dir);
        let mut project = ProjectDescriptor::mock("mock");
        project.build = vec![BuildCommand::Run {
            program: "false",
            args: Vec::new(),
        }];
        let ctx = ProjectContext::mock(&config, &project);
        std::fs::create_dir_all(ctx.source_dir().unwrap()).unwrap();
        let error = build(&ctx).unwrap_err();
        assert!(format!("{error:#}").contains("Building mock failed"));
    }
}
