//! Validates VaRA's taint propagation with LLVM FileCheck.
//!
//! For every binary of the project the instructions tainted according to VaRA's
//! taint analysis are printed by `opt` and compared against the expected instructions
//! of the binary's FileCheck fixture.

use crate::experiment::steps::{cleanup, prepare, VARA_TAINT_FILECHECK};
use crate::experiment::{Experiment, Pipeline, Step};
use crate::project::ProjectDescriptor;
use crate::report::ReportKind;

pub static EXPERIMENT: Experiment = Experiment {
    name: "VaRAFileCheckTaintPropagation",
    description: "Validate VaRA's taint propagation with FileCheck.",
    report: ReportKind::TaintPropagation,
    pipeline,
};

/// The analysis steps of the experiment, without preparation and cleanup.
pub fn analysis() -> Vec<&'static Step> {
    vec![&VARA_TAINT_FILECHECK]
}

fn pipeline(_project: &ProjectDescriptor) -> Pipeline {
    Pipeline::concat(vec![prepare(), analysis(), cleanup()])
}
