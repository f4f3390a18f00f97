/*!
The main library of taint_bench, a harness for benchmarking taint analyses on real project histories.

# What is taint_bench

taint_bench builds revisions of C and C++ projects with the whole-program-LLVM compiler wrappers,
extracts the LLVM bitcode of the resulting binaries and runs taint analyses on it.
The instructions an analysis deems tainted by environment variables (`getenv`)
are validated against expected results with LLVM's FileCheck.
Two analyses are supported: the taint analysis of VaRA and the IFDS-based environment variable tracing of Phasar.

Besides running experiments, the library can propose which revisions of a project history should be analyzed next.
Given the results of already analyzed revisions, it bisects the history between revisions whose results differ too much
(see the [`history`] module).

# Usage

If taint_bench is installed locally, run an experiment on a project revision with
```sh
taint_bench run CompareTaintPropagation xz --revision c5c7ceb08a
```
The tainted instructions of a Phasar data flow report can be extracted with
```sh
taint_bench extract ENV-TRACE-report.json
```
Use the `--help` command line option for more information.
The behaviour of taint_bench (directories, external tools and their arguments) is controlled by a configuration file.
Start by taking a look at the standard configuration file located at `src/config.json`
and the [configuration struct documentation](crate::config::Config).

# Further documentation

The projects known to taint_bench are described in the [`projects`] module,
the experiments in the [`experiments`] module.
*/

pub mod config;
pub mod experiment;
pub mod experiments;
pub mod history;
pub mod project;
pub mod projects;
pub mod report;
pub mod taint;
pub mod utils;

use experiment::Experiment;

mod prelude {
    pub use serde::{Deserialize, Serialize};

    pub use anyhow::{anyhow, Context, Error};
}

/// Get a list of all known experiments.
pub fn get_experiments() -> Vec<&'static Experiment> {
    vec![
        &crate::experiments::vara_fc_taint_propagation::EXPERIMENT,
        &crate::experiments::phasar_env_tracing::EXPERIMENT,
        &crate::experiments::phasar_env_trace_propagation::EXPERIMENT,
        &crate::experiments::compare_taint_propagation::EXPERIMENT,
    ]
}

/// Find an experiment by its name.
pub fn find_experiment(name: &str) -> Option<&'static Experiment> {
    get_experiments()
        .into_iter()
        .find(|experiment| experiment.name == name)
}
