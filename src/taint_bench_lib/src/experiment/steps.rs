//! The steps the experiment pipelines are built from.
//!
//! The prepare stage fetches, configures and builds the project with the WLLVM compilers
//! and extracts the LLVM bitcode of every binary.
//! The analysis steps run VaRA or Phasar on the bitcode and write their reports into the result folder.

use super::{Step, StepContext};
use crate::prelude::*;
use crate::project::binary::ProjectBinary;
use crate::project::{self, ProjectContext};
use crate::report::{FileStatus, ReportKind};
use crate::taint::filecheck::{error_report_text, remove_if_exists, FileCheckValidation};
use crate::taint::{extract_tainted_instructions, read_dataflow_report, write_instruction_list};
use crate::utils::command::{describe, run_command, run_command_for_stdout, run_piped_to_file};
use crate::utils::ensure_dir;
use crate::utils::log::LogMessage;
use std::path::{Path, PathBuf};
use std::process::Command;

pub static FETCH: Step = Step {
    name: "Fetch",
    description: "Copy the project sources into the build directory and check out the revision.",
    cleanup: false,
    run: fetch,
};

pub static CONFIGURE: Step = Step {
    name: "Configure",
    description: "Configure the project.",
    cleanup: false,
    run: configure,
};

pub static BUILD: Step = Step {
    name: "Build",
    description: "Build the project.",
    cleanup: false,
    run: build,
};

pub static EXTRACT_BITCODE: Step = Step {
    name: "ExtractBitcode",
    description: "Extract the LLVM bitcode of every project binary.",
    cleanup: false,
    run: extract_bitcode,
};

pub static VARA_TAINT_FILECHECK: Step = Step {
    name: "VaRATaintFileCheck",
    description: "Print the instructions tainted according to VaRA and validate them with LLVM FileCheck.",
    cleanup: false,
    run: vara_taint_filecheck,
};

pub static PHASAR_ENV_TRACING: Step = Step {
    name: "PhasarEnvironmentTracing",
    description: "Trace environment variables through the project binaries with Phasar's IFDS solver.",
    cleanup: false,
    run: phasar_env_tracing,
};

pub static PARSE_AND_VALIDATE_PHASAR_OUTPUT: Step = Step {
    name: "ParseAndValidatePhasarOutput",
    description: "Parse Phasar's JSON result into the tainted instructions and validate them with LLVM FileCheck.",
    cleanup: false,
    run: parse_and_validate_phasar_output,
};

pub static CLEAN: Step = Step {
    name: "Clean",
    description: "Remove the build directory.",
    cleanup: true,
    run: clean,
};

/// The steps preparing the bitcode of a project.
pub fn prepare() -> Vec<&'static Step> {
    vec![&FETCH, &CONFIGURE, &BUILD, &EXTRACT_BITCODE]
}

/// The final stage of every pipeline.
pub fn cleanup() -> Vec<&'static Step> {
    vec![&CLEAN]
}

fn fetch(ctx: &StepContext) -> Result<Vec<LogMessage>, Error> {
    let (_, logs) = project::fetch(&ctx.project)?;
    Ok(logs)
}

fn configure(ctx: &StepContext) -> Result<Vec<LogMessage>, Error> {
    project::configure(&ctx.project)
}

/// Build the project. A failed build leaves a compile error report for every binary.
fn build(ctx: &StepContext) -> Result<Vec<LogMessage>, Error> {
    match project::build(&ctx.project) {
        Ok(logs) => Ok(logs),
        Err(err) => {
            let result_folder = ensure_dir(ctx.result_folder())?;
            let text = format!("{err:#}\n");
            for binary in project::binaries(&ctx.project)? {
                let name = binary.name();
                let report = result_folder.join(
                    ctx.report_id(&name)
                        .file_name(ctx.report, FileStatus::CompileError),
                );
                std::fs::write(&report, &text)
                    .with_context(|| format!("Could not write {}", report.display()))?;
            }
            Err(err)
        }
    }
}

/// The location of the bitcode extracted from a binary.
pub fn bitcode_path(ctx: &ProjectContext, binary: &ProjectBinary) -> Result<PathBuf, Error> {
    let location = binary.location(&ctx.source_dir()?);
    let mut file_name = location
        .file_name()
        .ok_or_else(|| anyhow!("Binary path {} has no file name", binary.path.display()))?
        .to_os_string();
    file_name.push(".bc");
    Ok(location.with_file_name(file_name))
}

/// The FileCheck fixture with the expected tainted instructions of a binary.
pub fn fixture_path(ctx: &ProjectContext, binary: &ProjectBinary) -> Result<PathBuf, Error> {
    Ok(ctx
        .source_dir()?
        .join(ctx.project.name)
        .join(format!("{}.txt", binary.name())))
}

fn extract_bitcode(ctx: &StepContext) -> Result<Vec<LogMessage>, Error> {
    let source_dir = ctx.project.source_dir()?;
    let mut logs = Vec::new();
    for binary in project::binaries(&ctx.project)? {
        let mut command = Command::new(&ctx.project.config.tools.extract_bc);
        command
            .current_dir(&source_dir)
            .env("LLVM_COMPILER", "clang")
            .arg(binary.location(&source_dir));
        run_command(command)
            .with_context(|| format!("Could not extract the bitcode of {}", binary.name()))?;
        logs.push(
            LogMessage::new_debug(format!(
                "Extracted {}",
                bitcode_path(&ctx.project, &binary)?.display()
            ))
            .source(EXTRACT_BITCODE.name),
        );
    }
    Ok(logs)
}

/// Write the error into a failure report and return it for propagation.
fn report_failure(report: &Path, err: Error) -> Error {
    match std::fs::write(report, format!("{err:#}\n")) {
        Ok(()) => err,
        Err(write_error) => {
            err.context(format!("Could not write {}: {write_error}", report.display()))
        }
    }
}

/// A FileCheck validation of the instructions tainted in a binary.
fn validation(
    ctx: &StepContext,
    binary: &ProjectBinary,
    result_folder: &Path,
    phasar_report: bool,
) -> Result<FileCheckValidation, Error> {
    let name = binary.name();
    let id = ctx.report_id(&name);
    let file_name = |status| {
        if phasar_report {
            id.phasar_file_name(ReportKind::TaintPropagation, status)
        } else {
            id.file_name(ReportKind::TaintPropagation, status)
        }
    };
    Ok(FileCheckValidation {
        filecheck: ctx.project.config.tools.filecheck.clone(),
        expected_file: fixture_path(&ctx.project, binary)?,
        success_report: result_folder.join(file_name(FileStatus::Success)),
        error_report: result_folder.join(file_name(FileStatus::Failed)),
        timeout: ctx.timeout(),
    })
}

fn vara_taint_filecheck(ctx: &StepContext) -> Result<Vec<LogMessage>, Error> {
    let result_folder = ensure_dir(ctx.result_folder())?;
    let config = ctx.project.config;
    let mut logs = Vec::new();
    for binary in project::binaries(&ctx.project)? {
        let mut command = Command::new(&config.tools.opt);
        command
            .args(&config.vara.opt_args)
            .arg(bitcode_path(&ctx.project, &binary)?);
        let validation = validation(ctx, &binary, &result_folder, false)?;
        let tainted_instructions = match run_command_for_stdout(command)
            .with_context(|| format!("VaRA could not analyze {}", binary.name()))
        {
            Ok(instructions) => instructions,
            Err(err) => {
                remove_if_exists(&validation.success_report)?;
                return Err(report_failure(&validation.error_report, err));
            }
        };
        let outcome = validation.validate(&tainted_instructions)?;
        logs.push(
            LogMessage::new_info(format!("FileCheck validation: {outcome}"))
                .source(VARA_TAINT_FILECHECK.name)
                .location(binary.name()),
        );
    }
    Ok(logs)
}

fn phasar_env_tracing(ctx: &StepContext) -> Result<Vec<LogMessage>, Error> {
    let result_folder = ensure_dir(ctx.result_folder())?;
    let config = ctx.project.config;
    let mut logs = Vec::new();
    for binary in project::binaries(&ctx.project)? {
        let name = binary.name();
        let id = ctx.report_id(&name);
        let success_report =
            result_folder.join(id.file_name(ReportKind::EnvTrace, FileStatus::Success));
        let error_report =
            result_folder.join(id.file_name(ReportKind::EnvTrace, FileStatus::Failed));
        let mut command = Command::new(&config.tools.phasar);
        command
            .args(&config.phasar.analysis_args)
            .arg("-m")
            .arg(bitcode_path(&ctx.project, &binary)?);
        let description = describe(&command);
        let outcome = match run_piped_to_file(command, "", &success_report, ctx.timeout()) {
            Ok(outcome) => outcome,
            Err(err) => {
                remove_if_exists(&success_report)?;
                return Err(report_failure(&error_report, err));
            }
        };
        if !outcome.is_success() {
            remove_if_exists(&success_report)?;
            std::fs::write(
                &error_report,
                error_report_text(&description, &outcome, None),
            )
            .with_context(|| format!("Could not write {}", error_report.display()))?;
        }
        logs.push(
            LogMessage::new_info(format!("Environment tracing: {outcome}"))
                .source(PHASAR_ENV_TRACING.name)
                .location(name.clone()),
        );
    }
    Ok(logs)
}

/// Turn the environment traces of Phasar into lists of tainted instructions and validate them.
///
/// The JSON reports are removed afterwards.
fn parse_and_validate_phasar_output(ctx: &StepContext) -> Result<Vec<LogMessage>, Error> {
    let result_folder = ensure_dir(ctx.result_folder())?;
    let taint_config = &ctx.project.config.taint;
    let mut logs = Vec::new();
    for binary in project::binaries(&ctx.project)? {
        let name = binary.name();
        let trace_report = result_folder.join(
            ctx.report_id(&name)
                .file_name(ReportKind::EnvTrace, FileStatus::Success),
        );
        let validation = validation(ctx, &binary, &result_folder, true)?;
        let report = read_dataflow_report(&trace_report)
            .map_err(|err| report_failure(&validation.error_report, err))?;
        let tainted_instructions = extract_tainted_instructions(
            &report,
            &taint_config.source_symbol,
            &taint_config.instruction_prefix,
        );
        remove_if_exists(&trace_report)?;
        logs.push(
            LogMessage::new_debug(format!(
                "Found {} tainted instructions",
                tainted_instructions.len()
            ))
            .source(PARSE_AND_VALIDATE_PHASAR_OUTPUT.name)
            .location(name.clone()),
        );

        let outcome = validation.validate(&write_instruction_list(&tainted_instructions))?;
        logs.push(
            LogMessage::new_info(format!("FileCheck validation: {outcome}"))
                .source(PARSE_AND_VALIDATE_PHASAR_OUTPUT.name)
                .location(name),
        );
    }
    Ok(logs)
}

fn clean(ctx: &StepContext) -> Result<Vec<LogMessage>, Error> {
    project::clean(&ctx.project)
}
