//! Naming conventions for the report files written by the experiments.
//!
//! A report file name encodes the report type, the project and binary it belongs to,
//! the analyzed revision, the run it was produced in and whether the run succeeded:
//! `{shorthand}-{project}-{binary}-{revision}_{run_id}_{status}.{extension}`.

use crate::prelude::*;
use std::path::{Path, PathBuf};

/// Prefix of reports derived from Phasar results.
pub const PHASAR_REPORT_PREFIX: &str = "phasar-";

/// The report types produced by the experiments.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum ReportKind {
    /// The validated list of tainted instructions (FileCheck output).
    TaintPropagation,
    /// The raw IFDS result of Phasar's environment variable tracing.
    EnvTrace,
}

impl ReportKind {
    /// The short name of the report type used in file names.
    pub fn shorthand(&self) -> &'static str {
        match self {
            ReportKind::TaintPropagation => "TPR",
            ReportKind::EnvTrace => "ENV-TRACE",
        }
    }

    /// The file extension of successful reports of this type.
    pub fn file_type(&self) -> &'static str {
        match self {
            ReportKind::TaintPropagation => "txt",
            ReportKind::EnvTrace => "json",
        }
    }
}

/// The status of the run that produced a report.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum FileStatus {
    Success,
    Failed,
    CompileError,
}

impl FileStatus {
    /// The status marker used in file names.
    pub fn marker(&self) -> &'static str {
        match self {
            FileStatus::Success => "success",
            FileStatus::Failed => "failed",
            FileStatus::CompileError => "cerror",
        }
    }
}

/// Identifies the binary and run a report belongs to.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ReportId<'a> {
    pub project: &'a str,
    pub binary: &'a str,
    pub revision: &'a str,
    pub run_id: &'a str,
}

impl<'a> ReportId<'a> {
    /// The file name of a report of the given kind and status.
    ///
    /// Reports of failed runs always use the `txt` extension, since they contain plain error output.
    pub fn file_name(&self, kind: ReportKind, status: FileStatus) -> String {
        let extension = match status {
            FileStatus::Success => kind.file_type(),
            FileStatus::Failed | FileStatus::CompileError => "txt",
        };
        format!(
            "{}-{}-{}-{}_{}_{}.{}",
            kind.shorthand(),
            self.project,
            sanitize_binary_name(self.binary),
            self.revision,
            self.run_id,
            status.marker(),
            extension
        )
    }

    /// The file name of a report derived from Phasar results.
    pub fn phasar_file_name(&self, kind: ReportKind, status: FileStatus) -> String {
        format!("{PHASAR_REPORT_PREFIX}{}", self.file_name(kind, status))
    }
}

/// Binary paths may contain directories, which are not allowed in file names.
fn sanitize_binary_name(binary: &str) -> String {
    binary.replace('/', "_")
}

/// The directory holding all reports of a project.
pub fn result_folder(result_dir: &Path, project: &str) -> PathBuf {
    result_dir.join(project)
}
