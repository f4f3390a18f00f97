//! This crate contains acceptance tests for the *taint_bench* command line tool.
//!
//! The tests expect the `taint_bench` binary to be installed.
//! Experiment runs additionally need the whole-program-LLVM wrappers and Phasar;
//! they are marked as skipped if these tools cannot be found on the `PATH`.

use colored::*;
use std::path::{Path, PathBuf};
use std::process::Command;

/// The experiments `taint_bench experiments` has to list.
pub const EXPERIMENTS: &[&str] = &[
    "VaRAFileCheckTaintPropagation",
    "PhasarEnvironmentTracing",
    "PhasarEnvTracePropagation",
    "CompareTaintPropagation",
];

/// Tools needed to build a project and run Phasar on its bitcode.
pub const EXPERIMENT_TOOLS: &[&str] = &["git", "wllvm", "extract-bc", "phasar-llvm"];

/// A command line invocation of *taint_bench* with the lines its output has to contain.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct CliTestCase {
    /// A short name for the printed test summary
    name: &'static str,
    /// The command line arguments
    args: Vec<String>,
    /// Lines that the standard output has to contain, in this order
    expected_lines: Vec<String>,
    /// Whether the whole standard output has to consist of the expected lines
    exact: bool,
    /// Whether the test case should be skipped
    skipped: bool,
}

impl CliTestCase {
    pub fn new(name: &'static str, args: &[&str]) -> CliTestCase {
        CliTestCase {
            name,
            args: args.iter().map(|arg| arg.to_string()).collect(),
            expected_lines: Vec::new(),
            exact: false,
            skipped: false,
        }
    }

    /// The output has to contain the given lines.
    pub fn expect_lines<S: AsRef<str>>(mut self, lines: &[S]) -> CliTestCase {
        self.expected_lines = lines.iter().map(|line| line.as_ref().to_string()).collect();
        self
    }

    /// The output has to consist of exactly the expected lines.
    pub fn exact(mut self) -> CliTestCase {
        self.exact = true;
        self
    }

    /// Run the test case and print to the shell, whether the test case succeeded or not.
    /// Returns stdout + stderr of the test execution on failure.
    pub fn run_test(&self) -> Result<(), String> {
        if self.skipped {
            println!("{} \t {}", self.name, "[SKIPPED]".yellow());
            return Ok(());
        }
        let output = Command::new("taint_bench")
            .args(&self.args)
            .arg("--quiet")
            .output()
            .map_err(|err| format!("Could not execute taint_bench: {err}"))?;
        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        if !output.status.success() {
            println!("{} \t {}", self.name, "[FAILED]".red());
            return Err(stdout + &String::from_utf8_lossy(&output.stderr));
        }
        let lines: Vec<&str> = stdout.lines().collect();
        let found = if self.exact {
            lines == self.expected_lines
        } else {
            contains_in_order(&lines, &self.expected_lines)
        };
        if found {
            println!("{} \t {}", self.name, "[OK]".green());
            Ok(())
        } else {
            println!("{} \t {}", self.name, "[FAILED]".red());
            Err(format!(
                "Expected lines:\n{}\nFound:\n{stdout}",
                self.expected_lines.join("\n")
            ))
        }
    }
}

/// Returns `true` if all `expected` lines occur in `lines` in the same order.
fn contains_in_order(lines: &[&str], expected: &[String]) -> bool {
    let mut remaining = lines.iter();
    expected
        .iter()
        .all(|expected| remaining.any(|line| line == expected))
}

/// Returns `true` if an executable with the given name is found in a directory of the `PATH`.
pub fn is_on_path(program: &str) -> bool {
    std::env::var_os("PATH")
        .map(|paths| std::env::split_paths(&paths).any(|dir| dir.join(program).is_file()))
        .unwrap_or(false)
}

/// Mark the test case as `skipped` if one of the given tools is missing.
pub fn mark_skipped_without_tools(test_case: &mut CliTestCase, tools: &[&str]) {
    if tools.iter().any(|tool| !is_on_path(tool)) {
        test_case.skipped = true;
    }
}

/// Write a configuration file that keeps all build and result directories below `base`.
pub fn write_isolated_config(base: &Path) -> PathBuf {
    let config = serde_json::json!({
        "tmp_dir": base.join("tmp"),
        "result_dir": base.join("results"),
        "timeout_secs": 600,
    });
    std::fs::create_dir_all(base).unwrap();
    let config_path = base.join("config.json");
    std::fs::write(&config_path, serde_json::to_string_pretty(&config).unwrap()).unwrap();
    config_path
}

/// Print the error messages of failed test cases.
/// The `error_log` tuples are of the form `(test_name, error_message)`.
pub fn print_errors(error_log: Vec<(String, String)>) {
    for (name, error) in error_log {
        println!("{}", format!("+++ Error for {name} +++").red());
        println!("{error}");
    }
}

/// Run all test cases and panic if one of them failed.
pub fn run_all(tests: Vec<CliTestCase>) {
    let mut error_log = Vec::new();
    for test_case in tests {
        if let Err(error) = test_case.run_test() {
            error_log.push((test_case.name.to_string(), error));
        }
    }
    if !error_log.is_empty() {
        print_errors(error_log);
        panic!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPORT: &str = "fixtures/ENV-TRACE-report.json";

    fn expected_instructions() -> Vec<String> {
        std::fs::read_to_string("fixtures/expected_tainted_instructions.txt")
            .unwrap()
            .lines()
            .map(|line| line.to_string())
            .collect()
    }

    #[test]
    #[ignore]
    fn list_experiments() {
        let output = Command::new("taint_bench")
            .arg("experiments")
            .output()
            .unwrap();
        assert!(output.status.success());
        let stdout = String::from_utf8(output.stdout).unwrap();
        let listed: Vec<&str> = stdout.lines().collect();
        assert_eq!(listed.len(), EXPERIMENTS.len());
        // Each listed experiment starts with its name, followed by the report type.
        for (line, name) in listed.iter().zip(EXPERIMENTS.iter()) {
            if line.starts_with(&format!("{name} (")) {
                println!("{} \t {}", name, "[OK]".green());
            } else {
                println!("{} \t {}", name, "[FAILED]".red());
                panic!("Unexpected listing: {line}");
            }
        }
    }

    #[test]
    #[ignore]
    fn list_projects_as_json() {
        let output = Command::new("taint_bench")
            .args(["projects", "--json"])
            .output()
            .unwrap();
        assert!(output.status.success());
        let projects: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        let names: Vec<&str> = projects
            .as_array()
            .unwrap()
            .iter()
            .map(|project| project["name"].as_str().unwrap())
            .collect();
        for name in ["coreutils", "openssl", "xz", "many_authors", "szz_base"] {
            if names.contains(&name) {
                println!("{} \t {}", name, "[OK]".green());
            } else {
                println!("{} \t {}", name, "[FAILED]".red());
                panic!("Project {name} not listed");
            }
        }
        let xz = projects
            .as_array()
            .unwrap()
            .iter()
            .find(|project| project["name"] == "xz")
            .unwrap();
        assert_eq!(xz["cve_products"], serde_json::json!([["tukaani", "xz"]]));
    }

    #[test]
    #[ignore]
    fn extract_tainted_instructions() {
        let expected = expected_instructions();
        let mut json_lines = vec!["[".to_string()];
        for (index, instruction) in expected.iter().enumerate() {
            let separator = if index + 1 < expected.len() { "," } else { "" };
            json_lines.push(format!(
                "  {}{separator}",
                serde_json::to_string(instruction).unwrap()
            ));
        }
        json_lines.push("]".to_string());

        run_all(vec![
            CliTestCase::new("extract", &["extract", REPORT])
                .expect_lines(expected.as_slice())
                .exact(),
            CliTestCase::new("extract --json", &["extract", REPORT, "--json"])
                .expect_lines(json_lines.as_slice())
                .exact(),
            CliTestCase::new(
                "extract --prefix helper::",
                &["extract", REPORT, "--prefix", "helper::"],
            )
            .expect_lines(&["main::store i8* %3, i8** %2, align 8", "ret i32 0"]),
            CliTestCase::new(
                "extract --source-symbol atoi",
                &["extract", REPORT, "--source-symbol", "atoi"],
            )
            .exact(),
        ]);
    }

    #[test]
    #[ignore]
    fn unknown_project_is_rejected() {
        let output = Command::new("taint_bench")
            .args(["run", "PhasarEnvironmentTracing", "no_such_project"])
            .output()
            .unwrap();
        assert_eq!(output.status.code(), Some(101));
        let stderr = String::from_utf8(output.stderr).unwrap();
        assert!(stderr.contains("no_such_project is not a valid project name"));
    }

    #[test]
    #[ignore]
    fn env_tracing_on_test_projects() {
        let base = std::env::temp_dir().join("taint_bench_acceptance");
        let config_path = write_isolated_config(&base);
        let config_arg = config_path.to_string_lossy().to_string();

        for project in ["many_authors", "szz_base"] {
            let mut test_case = CliTestCase::new(
                project,
                &[
                    "run",
                    "PhasarEnvironmentTracing",
                    project,
                    "--config",
                    config_arg.as_str(),
                ],
            );
            mark_skipped_without_tools(&mut test_case, EXPERIMENT_TOOLS);
            if test_case.skipped {
                test_case.run_test().unwrap();
                continue;
            }
            // The analysis may fail on a revision, but it always leaves a report behind.
            let _ = test_case.run_test();
            let result_folder = base.join("results").join(project);
            let reports: Vec<String> = std::fs::read_dir(&result_folder)
                .unwrap()
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.file_name().to_string_lossy().to_string())
                .filter(|name| name.starts_with(&format!("ENV-TRACE-{project}-main-")))
                .collect();
            assert!(!reports.is_empty(), "No report in {}", result_folder.display());
        }
    }
}
