//! The implemented experiments.
//! See their module descriptions for detailed information about each experiment.
//!
//! Every experiment prepares the bitcode of the project binaries first
//! and removes the build directory as its last step.

pub mod compare_taint_propagation;
pub mod phasar_env_trace_propagation;
pub mod phasar_env_tracing;
pub mod vara_fc_taint_propagation;
