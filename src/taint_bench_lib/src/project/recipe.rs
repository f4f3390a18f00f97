//! Build recipes: the commands that configure, build and test a project.

use super::revisions::RevisionSpan;
use crate::config::Config;
use crate::history::{CommitId, HistoryGraph};
use crate::prelude::*;
use crate::utils::command::{describe, run_command};
use crate::utils::log::LogMessage;
use std::path::Path;
use std::process::Command;

/// The compilers injected into project builds via `CC` and `CXX`.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct CompilerSet {
    pub cc: String,
    pub cxx: String,
    /// Additional environment variables the compilers need.
    pub env: Vec<(String, String)>,
}

impl CompilerSet {
    /// Plain clang.
    pub fn clang(config: &Config) -> CompilerSet {
        CompilerSet {
            cc: config.tools.cc.clone(),
            cxx: config.tools.cxx.clone(),
            env: Vec::new(),
        }
    }

    /// The whole-program-LLVM wrappers, which record the bitcode of every compiled file.
    pub fn wllvm(config: &Config) -> CompilerSet {
        CompilerSet {
            cc: config.tools.wllvm_cc.clone(),
            cxx: config.tools.wllvm_cxx.clone(),
            env: vec![("LLVM_COMPILER".to_string(), "clang".to_string())],
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Language {
    C,
    Cxx,
}

/// Arguments of a configure script.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ConfigureArgs {
    Fixed(Vec<&'static str>),
    /// Revisions inside `span` get the `inside` arguments, all others the `outside` arguments.
    ByRevision {
        span: RevisionSpan,
        inside: Vec<&'static str>,
        outside: Vec<&'static str>,
    },
}

/// One step of a build recipe. Paths are relative to the primary source directory.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum BuildCommand {
    /// Initialize and update the git submodules.
    GitSubmoduleUpdate,
    /// Run a program or script, e.g. `./bootstrap`.
    Run {
        program: &'static str,
        args: Vec<&'static str>,
    },
    /// Run a configure script, e.g. `./configure` or `./config`.
    Configure {
        script: &'static str,
        args: ConfigureArgs,
    },
    Autoreconf {
        args: Vec<&'static str>,
    },
    /// Run CMake inside `dir`.
    CMake {
        dir: &'static str,
        args: Vec<&'static str>,
    },
    /// Run make with the configured number of jobs inside `dir`.
    Make {
        dir: &'static str,
        targets: Vec<&'static str>,
    },
    /// Compile a few source files directly into one binary.
    CompileSingle {
        language: Language,
        sources: Vec<&'static str>,
        output: &'static str,
    },
    MakeDir {
        path: &'static str,
    },
}

/// Everything a build command needs to know about the build it is part of.
pub struct BuildEnv<'a> {
    pub config: &'a Config,
    pub compilers: &'a CompilerSet,
    pub cflags: &'a [&'static str],
    pub source_dir: &'a Path,
    pub revision: &'a CommitId,
    /// Only needed by revision-dependent commands.
    pub history: Option<&'a HistoryGraph>,
}

impl<'a> BuildEnv<'a> {
    /// A command running `program` in `dir` (relative to the source directory) with the compiler environment.
    fn command(&self, program: &str, dir: &str) -> Command {
        let mut command = Command::new(program);
        command
            .current_dir(self.source_dir.join(dir))
            .env("CC", &self.compilers.cc)
            .env("CXX", &self.compilers.cxx)
            .env("CFLAGS", self.cflags.join(" "))
            .env("CXXFLAGS", self.cflags.join(" "))
            .envs(self.compilers.env.iter().map(|(key, value)| (key, value)));
        command
    }
}

impl BuildCommand {
    /// Make `./configure` with fixed arguments.
    pub fn configure(args: &[&'static str]) -> BuildCommand {
        BuildCommand::Configure {
            script: "./configure",
            args: ConfigureArgs::Fixed(args.to_vec()),
        }
    }

    /// Make with the default target in the source directory.
    pub fn make() -> BuildCommand {
        BuildCommand::Make {
            dir: ".",
            targets: Vec::new(),
        }
    }

    /// Returns `true` if the command can only be built with the project history at hand.
    pub fn depends_on_history(&self) -> bool {
        matches!(
            self,
            BuildCommand::Configure {
                args: ConfigureArgs::ByRevision { .. },
                ..
            }
        )
    }

    /// The process to run for this command. Returns `None` for commands executed without a process.
    pub fn to_command(&self, env: &BuildEnv) -> Result<Option<Command>, Error> {
        let command = match self {
            BuildCommand::GitSubmoduleUpdate => {
                let mut command = env.command(&env.config.tools.git, ".");
                command.args(["submodule", "update", "--init", "--recursive"]);
                command
            }
            BuildCommand::Run { program, args } => {
                let mut command = env.command(program, ".");
                command.args(args);
                command
            }
            BuildCommand::Configure { script, args } => {
                let args = match args {
                    ConfigureArgs::Fixed(args) => args,
                    ConfigureArgs::ByRevision {
                        span,
                        inside,
                        outside,
                    } => {
                        let history = env.history.ok_or_else(|| {
                            anyhow!("Configure arguments depend on the project history")
                        })?;
                        if span.contains(history, env.revision) {
                            inside
                        } else {
                            outside
                        }
                    }
                };
                let mut command = env.command(script, ".");
                command.args(args);
                command
            }
            BuildCommand::Autoreconf { args } => {
                let mut command = env.command(&env.config.tools.autoreconf, ".");
                command.args(args);
                command
            }
            BuildCommand::CMake { dir, args } => {
                let mut command = env.command(&env.config.tools.cmake, dir);
                command.args(args);
                command
            }
            BuildCommand::Make { dir, targets } => {
                let mut command = env.command(&env.config.tools.make, dir);
                command
                    .arg("-j")
                    .arg(env.config.number_of_jobs().to_string())
                    .args(targets);
                command
            }
            BuildCommand::CompileSingle {
                language,
                sources,
                output,
            } => {
                let compiler = match language {
                    Language::C => &env.compilers.cc,
                    Language::Cxx => &env.compilers.cxx,
                };
                let mut command = env.command(compiler, ".");
                command.args(env.cflags).args(sources).arg("-o").arg(output);
                command
            }
            BuildCommand::MakeDir { .. } => return Ok(None),
        };
        Ok(Some(command))
    }

    /// Execute the command and return a debug log describing it.
    pub fn execute(&self, env: &BuildEnv) -> Result<LogMessage, Error> {
        match self.to_command(env)? {
            Some(command) => {
                let description = describe(&command);
                run_command(command)?;
                Ok(LogMessage::new_debug(format!("Executed {description}")))
            }
            None => {
                let BuildCommand::MakeDir { path } = self else {
                    return Err(anyhow!("No process for build command {self:?}"));
                };
                let dir = env.source_dir.join(path);
                std::fs::create_dir_all(&dir)
                    .with_context(|| format!("Could not create {}", dir.display()))?;
                Ok(LogMessage::new_debug(format!("Created {}", dir.display())))
            }
        }
    }
}

/// Execute a list of build commands in order, stopping at the first failing command.
pub fn execute_all(commands: &[BuildCommand], env: &BuildEnv) -> Result<Vec<LogMessage>, Error> {
    commands
        .iter()
        .map(|command| command.execute(env))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::tests::id;

    fn mock_env<'a>(
        config: &'a Config,
        compilers: &'a CompilerSet,
        source_dir: &'a Path,
        revision: &'a CommitId,
        history: Option<&'a HistoryGraph>,
    ) -> BuildEnv<'a> {
        BuildEnv {
            config,
            compilers,
            cflags: &["-fPIC"],
            source_dir,
            revision,
            history,
        }
    }

    fn env_value(command: &Command, key: &str) -> Option<String> {
        command
            .get_envs()
            .find(|(name, _)| name.to_str() == Some(key))
            .and_then(|(_, value)| value)
            .map(|value| value.to_string_lossy().to_string())
    }

    #[test]
    fn compiler_environment() {
        let config = Config::mock(Path::new("/tmp/tb"));
        let compilers = CompilerSet::wllvm(&config);
        let revision = id("c1");
        let env = mock_env(&config, &compilers, Path::new("/src/xz"), &revision, None);
        let command = BuildCommand::make().to_command(&env).unwrap().unwrap();
        assert_eq!(describe(&command), "make -j 2");
        assert_eq!(env_value(&command, "CC"), Some(config.tools.wllvm_cc.clone()));
        assert_eq!(env_value(&command, "LLVM_COMPILER"), Some("clang".to_string()));
        assert_eq!(env_value(&command, "CFLAGS"), Some("-fPIC".to_string()));
        assert_eq!(command.get_current_dir(), Some(Path::new("/src/xz/.")));
    }

    #[test]
    fn configure_arguments_by_revision() {
        let config = Config::mock(Path::new("/tmp/tb"));
        let compilers = CompilerSet::clang(&config);
        let history = HistoryGraph::mock_linear(10);
        let configure = BuildCommand::Configure {
            script: "./configure",
            args: ConfigureArgs::ByRevision {
                span: RevisionSpan::new("c0", "c3"),
                inside: vec!["--enable-dynamic=yes"],
                outside: Vec::new(),
            },
        };
        assert!(configure.depends_on_history());

        let old = id("c2");
        let env = mock_env(&config, &compilers, Path::new("/src"), &old, Some(&history));
        let command = configure.to_command(&env).unwrap().unwrap();
        assert_eq!(describe(&command), "./configure --enable-dynamic=yes");

        let new = id("c8");
        let env = mock_env(&config, &compilers, Path::new("/src"), &new, Some(&history));
        let command = configure.to_command(&env).unwrap().unwrap();
        assert_eq!(describe(&command), "./configure");

        let env = mock_env(&config, &compilers, Path::new("/src"), &new, None);
        assert!(configure.to_command(&env).is_err());
    }

    #[test]
    fn compile_single_file() {
        let config = Config::mock(Path::new("/tmp/tb"));
        let compilers = CompilerSet::clang(&config);
        let revision = id("c1");
        let env = mock_env(&config, &compilers, Path::new("/src"), &revision, None);
        let command = BuildCommand::CompileSingle {
            language: Language::C,
            sources: vec!["main.c"],
            output: "main",
        }
        .to_command(&env)
        .unwrap()
        .unwrap();
        assert_eq!(describe(&command), format!("{} -fPIC main.c -o main", config.tools.cc));
    }

    #[test]
    fn execute_recipe() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().to_path_buf();
        let config = Config::mock(&dir);
        let compilers = CompilerSet::clang(&config);
        let revision = id("c1");
        let env = mock_env(&config, &compilers, &dir, &revision, None);
        let recipe = vec![
            BuildCommand::MakeDir { path: "build" },
            BuildCommand::Run {
                program: "sh",
                args: vec!["-c", "echo $CC > build/compiler"],
            },
        ];
        let logs = execute_all(&recipe, &env).unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(
            std::fs::read_to_string(dir.join("build/compiler")).unwrap(),
            format!("{}\n", config.tools.cc)
        );

        let failing = vec![BuildCommand::Run {
            program: "false",
            args: Vec::new(),
        }];
        assert!(execute_all(&failing, &env).is_err());
    }
}
