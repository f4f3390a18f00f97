//! Validates Phasar's environment variable tracing with LLVM FileCheck.
//!
//! The environment traces of [`PhasarEnvironmentTracing`](super::phasar_env_tracing) are parsed
//! into the list of instructions tainted by `getenv`, which FileCheck validates
//! against the same fixtures as VaRA's results. The raw JSON traces are removed afterwards.

use super::phasar_env_tracing;
use crate::experiment::steps::{cleanup, prepare, PARSE_AND_VALIDATE_PHASAR_OUTPUT};
use crate::experiment::{Experiment, Pipeline, Step};
use crate::project::ProjectDescriptor;
use crate::report::ReportKind;

pub static EXPERIMENT: Experiment = Experiment {
    name: "PhasarEnvTracePropagation",
    description: "Validate Phasar's environment variable tracing with FileCheck.",
    report: ReportKind::TaintPropagation,
    pipeline,
};

pub fn analysis() -> Vec<&'static Step> {
    [
        phasar_env_tracing::analysis(),
        vec![&PARSE_AND_VALIDATE_PHASAR_OUTPUT],
    ]
    .concat()
}

fn pipeline(_project: &ProjectDescriptor) -> Pipeline {
    Pipeline::concat(vec![prepare(), analysis(), cleanup()])
}
