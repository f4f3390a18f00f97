//! Traces environment variables through the project binaries with Phasar.
//!
//! Phasar's IFDS environment variable tracing is run on the bitcode of every binary.
//! The raw data flow results are kept as environment trace reports.

use crate::experiment::steps::{cleanup, prepare, PHASAR_ENV_TRACING};
use crate::experiment::{Experiment, Pipeline, Step};
use crate::project::ProjectDescriptor;
use crate::report::ReportKind;

pub static EXPERIMENT: Experiment = Experiment {
    name: "PhasarEnvironmentTracing",
    description: "Trace environment variables with Phasar's IFDS solver.",
    report: ReportKind::EnvTrace,
    pipeline,
};

pub fn analysis() -> Vec<&'static Step> {
    vec![&PHASAR_ENV_TRACING]
}

fn pipeline(_project: &ProjectDescriptor) -> Pipeline {
    Pipeline::concat(vec![prepare(), analysis(), cleanup()])
}
