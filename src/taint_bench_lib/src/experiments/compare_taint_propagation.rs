//! Runs the taint propagation of VaRA and of Phasar on the same build.
//!
//! The project is prepared once, then the analyses of
//! [`VaRAFileCheckTaintPropagation`](super::vara_fc_taint_propagation) and
//! [`PhasarEnvTracePropagation`](super::phasar_env_trace_propagation) run one after the other.
//! Both write FileCheck-validated taint propagation reports for every binary,
//! the Phasar-derived ones carry the `phasar-` prefix.

use super::{phasar_env_trace_propagation, vara_fc_taint_propagation};
use crate::experiment::steps::{cleanup, prepare};
use crate::experiment::{Experiment, Pipeline};
use crate::project::ProjectDescriptor;
use crate::report::ReportKind;

pub static EXPERIMENT: Experiment = Experiment {
    name: "CompareTaintPropagation",
    description: "Compare the taint propagation of VaRA and Phasar.",
    report: ReportKind::TaintPropagation,
    pipeline,
};

fn pipeline(_project: &ProjectDescriptor) -> Pipeline {
    Pipeline::concat(vec![
        prepare(),
        vara_fc_taint_propagation::analysis(),
        phasar_env_trace_propagation::analysis(),
        cleanup(),
    ])
}
