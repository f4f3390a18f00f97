//! Validation of extracted taint results with LLVM's FileCheck.
//!
//! The list of tainted instructions is piped into FileCheck,
//! which matches it against the check patterns of an expected-output fixture.
//! On success FileCheck's output is kept as the success report.
//! On failure the success report is removed and an error report describing the failure is written instead.

use crate::prelude::*;
use crate::utils::command::{describe, run_piped_to_file, CommandOutcome};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

/// Everything needed to validate one list of instructions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCheckValidation {
    /// The FileCheck executable.
    pub filecheck: String,
    /// The fixture containing the expected check patterns.
    pub expected_file: PathBuf,
    /// Where FileCheck's output is written if the validation succeeds.
    pub success_report: PathBuf,
    /// Where the failure description is written if the validation fails.
    pub error_report: PathBuf,
    /// Maximum runtime of FileCheck.
    pub timeout: Duration,
}

impl FileCheckValidation {
    /// The FileCheck command for the expected fixture.
    fn command(&self) -> Command {
        let mut command = Command::new(&self.filecheck);
        command.arg(&self.expected_file);
        command
    }

    /// Pipe `input` into FileCheck and handle the resulting report files.
    ///
    /// Returns the outcome of the FileCheck run.
    /// Failing validation is not an error, only problems with executing FileCheck or with the report files are.
    pub fn validate(&self, input: &str) -> Result<CommandOutcome, Error> {
        if !self.expected_file.is_file() {
            return Err(anyhow!(
                "Expected FileCheck fixture {} does not exist",
                self.expected_file.display()
            ));
        }
        let command = self.command();
        let description = describe(&command);
        let outcome = run_piped_to_file(command, input, &self.success_report, self.timeout)?;
        if !outcome.is_success() {
            remove_if_exists(&self.success_report)?;
            std::fs::write(&self.error_report, error_report_text(&description, &outcome, Some(input)))
                .with_context(|| {
                    format!(
                        "Could not write error report {}",
                        self.error_report.display()
                    )
                })?;
        }
        Ok(outcome)
    }
}

/// The content of an error report for a failed command.
pub fn error_report_text(command: &str, outcome: &CommandOutcome, input: Option<&str>) -> String {
    let mut text = format!("Command: {command}\nResult: {outcome}\n");
    if let CommandOutcome::Failed { stderr, .. } = outcome {
        text.push_str("--- stderr ---\n");
        text.push_str(stderr);
        if !stderr.ends_with('\n') {
            text.push('\n');
        }
    }
    if let Some(input) = input {
        text.push_str("--- input ---\n");
        text.push_str(input);
    }
    text
}

/// Remove the file at `path`. A missing file is not an error.
pub fn remove_if_exists(path: &Path) -> Result<(), Error> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => {
            Err(Error::new(err).context(format!("Could not remove {}", path.display())))
        }
    }
}
