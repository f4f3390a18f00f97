//! The configuration of a benchmarking run.
//!
//! All settings are collected in one [`Config`] value that is constructed once
//! (usually from the `config.json` in the user's configuration directory)
//! and then handed to every function that needs it.
//! Each field has a default, so a configuration file only needs to contain the values it changes.

use crate::prelude::*;
use std::path::PathBuf;

/// The timeout for validation commands if nothing else is configured: three hours.
pub const DEFAULT_TIMEOUT_SECS: u64 = 3 * 60 * 60;

/// Settings shared by all projects and experiments.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(default)]
pub struct Config {
    /// Directory under which the sources of all projects are checked out.
    pub tmp_dir: PathBuf,
    /// Directory under which report files are written.
    pub result_dir: PathBuf,
    /// Number of parallel jobs for build commands.
    /// If unset, the available parallelism of the machine is used.
    pub jobs: Option<usize>,
    /// Timeout in seconds for validating analysis results.
    pub timeout_secs: u64,
    /// Base location (directory or URL prefix) of the VaRA test repositories.
    pub vara_test_repos: String,
    /// Optional path to a paper config restricting the revisions of each project.
    pub paper_config: Option<PathBuf>,
    /// Names or paths of the external tools.
    pub tools: ToolConfig,
    /// Arguments for the VaRA taint analysis.
    pub vara: VaraConfig,
    /// Arguments for the Phasar environment variable tracing.
    pub phasar: PhasarConfig,
    /// Settings for extracting tainted instructions from Phasar reports.
    pub taint: TaintConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            tmp_dir: PathBuf::from("/tmp/taint_bench"),
            result_dir: PathBuf::from("results"),
            jobs: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            vara_test_repos: "https://github.com/se-passau/vara-test-repos".to_string(),
            paper_config: None,
            tools: ToolConfig::default(),
            vara: VaraConfig::default(),
            phasar: PhasarConfig::default(),
            taint: TaintConfig::default(),
        }
    }
}

impl Config {
    /// Parse a configuration from its JSON representation.
    pub fn from_json(value: serde_json::Value) -> Result<Config, Error> {
        serde_json::from_value(value).context("Parsing of the configuration failed")
    }

    /// Read the configuration from the given file path.
    pub fn from_file(path: &std::path::Path) -> Result<Config, Error> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("Could not open configuration file {}", path.display()))?;
        serde_json::from_reader(std::io::BufReader::new(file))
            .with_context(|| format!("Parsing of the configuration file {} failed", path.display()))
    }

    /// Read the configuration from `config.json` in the standard configuration directory.
    pub fn from_standard_location() -> Result<Config, Error> {
        Config::from_json(crate::utils::read_config_file("config.json")?)
    }

    /// The number of parallel jobs to use for build commands.
    pub fn number_of_jobs(&self) -> usize {
        self.jobs.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|jobs| jobs.get())
                .unwrap_or(1)
        })
    }
}

/// Names (or absolute paths) of the external programs used by the harness.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(default)]
pub struct ToolConfig {
    pub cc: String,
    pub cxx: String,
    /// The WLLVM wrapper for C code, used when bitcode has to be extracted.
    pub wllvm_cc: String,
    /// The WLLVM wrapper for C++ code.
    pub wllvm_cxx: String,
    pub extract_bc: String,
    pub opt: String,
    pub phasar: String,
    pub filecheck: String,
    pub git: String,
    pub make: String,
    pub cmake: String,
    pub autoreconf: String,
}

impl Default for ToolConfig {
    fn default() -> Self {
        ToolConfig {
            cc: "clang".to_string(),
            cxx: "clang++".to_string(),
            wllvm_cc: "wllvm".to_string(),
            wllvm_cxx: "wllvm++".to_string(),
            extract_bc: "extract-bc".to_string(),
            opt: "opt".to_string(),
            phasar: "phasar-llvm".to_string(),
            filecheck: "FileCheck".to_string(),
            git: "git".to_string(),
            make: "make".to_string(),
            cmake: "cmake".to_string(),
            autoreconf: "autoreconf".to_string(),
        }
    }
}

/// Arguments passed to `opt` to print the instructions tainted by VaRA.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(default)]
pub struct VaraConfig {
    pub opt_args: Vec<String>,
}

impl Default for VaraConfig {
    fn default() -> Self {
        VaraConfig {
            opt_args: vec![
                "-vara-CD".to_string(),
                "-print-Full-MTFA".to_string(),
                "-disable-output".to_string(),
            ],
        }
    }
}

/// Arguments passed to Phasar to run the environment variable tracing.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(default)]
pub struct PhasarConfig {
    pub analysis_args: Vec<String>,
}

impl Default for PhasarConfig {
    fn default() -> Self {
        PhasarConfig {
            analysis_args: vec![
                "-D".to_string(),
                "ifds-environment-variable-tracing".to_string(),
                "--emit-raw-results".to_string(),
            ],
        }
    }
}

/// Settings for extracting the tainted instructions from a Phasar dataflow report.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(default)]
pub struct TaintConfig {
    /// A fact references the taint source if its name contains this string.
    pub source_symbol: String,
    /// Qualifying prefix removed from instruction ids.
    pub instruction_prefix: String,
}

impl Default for TaintConfig {
    fn default() -> Self {
        TaintConfig {
            source_symbol: crate::taint::ENV_SOURCE_SYMBOL.to_string(),
            instruction_prefix: crate::taint::DEFAULT_INSTRUCTION_PREFIX.to_string(),
        }
    }
}
