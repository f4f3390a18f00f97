//! Experiments are pipelines of steps executed on one revision of one project.
//!
//! A [`Step`] is a named action on a [`StepContext`] that returns log messages.
//! A [`Pipeline`] is an ordered list of steps.
//! Derived experiments build their pipelines by concatenating the stage lists of other experiments,
//! so no pipeline is ever modified after construction.
//!
//! [`run_pipeline`] executes the steps in order and stops at the first failing step.
//! Cleanup steps still run after a failure, so that no build directories are left behind.

pub mod steps;

use crate::prelude::*;
use crate::project::{ProjectContext, ProjectDescriptor};
use crate::report::{result_folder, ReportId, ReportKind};
use crate::utils::log::LogMessage;
use std::path::PathBuf;
use std::time::Duration;

/// The generic function signature of a pipeline step.
pub type StepFn = fn(&StepContext) -> Result<Vec<LogMessage>, Error>;

/// A named action of an experiment pipeline.
pub struct Step {
    pub name: &'static str,
    pub description: &'static str,
    /// Cleanup steps run even if an earlier step of the pipeline failed.
    pub cleanup: bool,
    pub run: StepFn,
}

impl std::fmt::Display for Step {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}: {}", self.name, self.description)
    }
}

impl std::fmt::Debug for Step {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "Step({})", self.name)
    }
}

/// An ordered list of steps.
#[derive(Debug, Clone, Default)]
pub struct Pipeline(Vec<&'static Step>);

impl Pipeline {
    /// Concatenate stage lists into one pipeline.
    pub fn concat(stages: Vec<Vec<&'static Step>>) -> Pipeline {
        Pipeline(stages.into_iter().flatten().collect())
    }

    pub fn steps(&self) -> &[&'static Step] {
        &self.0
    }

    /// The step names in execution order.
    pub fn names(&self) -> Vec<&'static str> {
        self.0.iter().map(|step| step.name).collect()
    }
}

/// The generic function signature for building the pipeline of an experiment for a project.
pub type PipelineFn = fn(&ProjectDescriptor) -> Pipeline;

/// A structure containing general information about an experiment,
/// including the function building its pipeline.
pub struct Experiment {
    pub name: &'static str,
    pub description: &'static str,
    /// The type of the reports the experiment produces.
    pub report: ReportKind,
    pub pipeline: PipelineFn,
}

impl std::fmt::Display for Experiment {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            formatter,
            "{} ({}): {}",
            self.name,
            self.report.shorthand(),
            self.description
        )
    }
}

/// Everything a step needs: the project revision, the build settings and the report type of the experiment.
pub struct StepContext<'a> {
    pub project: ProjectContext<'a>,
    pub report: ReportKind,
}

impl<'a> StepContext<'a> {
    /// The directory receiving the reports of the project.
    pub fn result_folder(&self) -> PathBuf {
        result_folder(&self.project.config.result_dir, self.project.project.name)
    }

    /// Identifies the reports of a binary produced in this run.
    pub fn report_id<'b>(&'b self, binary: &'b str) -> ReportId<'b> {
        ReportId {
            project: self.project.project.name,
            binary,
            revision: self.project.short_revision(),
            run_id: &self.project.run_id,
        }
    }

    /// Maximum runtime of validation and analysis commands.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.project.config.timeout_secs)
    }
}

/// The outcome of a pipeline run.
#[derive(Debug, Clone, Default)]
pub struct PipelineResult {
    pub logs: Vec<LogMessage>,
    /// The name of the first failing step.
    pub failed_step: Option<&'static str>,
}

impl PipelineResult {
    pub fn is_success(&self) -> bool {
        self.failed_step.is_none()
    }
}

/// Execute the steps of a pipeline in order.
///
/// After the first failing step only cleanup steps are executed.
/// The error of a failing step is turned into an error log message.
pub fn run_steps(pipeline: &Pipeline, ctx: &StepContext) -> PipelineResult {
    let mut result = PipelineResult::default();
    for step in pipeline.steps() {
        if result.failed_step.is_some() && !step.cleanup {
            result.logs.push(
                LogMessage::new_debug("Skipped after an earlier failure").source(step.name),
            );
            continue;
        }
        match (step.run)(ctx) {
            Ok(logs) => result.logs.extend(logs),
            Err(err) => {
                result
                    .logs
                    .push(LogMessage::new_error(format!("{err:#}")).source(step.name));
                if result.failed_step.is_none() {
                    result.failed_step = Some(step.name);
                }
            }
        }
    }
    result
}

/// Build the pipeline of the experiment for the project of the context and execute it.
pub fn run_pipeline(experiment: &Experiment, ctx: &StepContext) -> PipelineResult {
    let pipeline = (experiment.pipeline)(ctx.project.project);
    let mut result = run_steps(&pipeline, ctx);
    result.logs.insert(
        0,
        LogMessage::new_info(format!(
            "Running {} on {} at {}",
            experiment.name,
            ctx.project.project.name,
            ctx.project.revision
        ))
        .source(experiment.name),
    );
    result
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::config::Config;

    fn succeed(_ctx: &StepContext) -> Result<Vec<LogMessage>, Error> {
        Ok(vec![LogMessage::new_info("done")])
    }

    fn fail(_ctx: &StepContext) -> Result<Vec<LogMessage>, Error> {
        Err(anyhow!("broken"))
    }

    static FIRST: Step = Step {
        name: "First",
        description: "succeeds",
        cleanup: false,
        run: succeed,
    };
    static FAILING: Step = Step {
        name: "Failing",
        description: "fails",
        cleanup: false,
        run: fail,
    };
    static AFTER: Step = Step {
        name: "After",
        description: "succeeds",
        cleanup: false,
        run: succeed,
    };
    static CLEANUP: Step = Step {
        name: "Cleanup",
        description: "always runs",
        cleanup: true,
        run: succeed,
    };

    impl<'a> StepContext<'a> {
        pub fn mock(
            config: &'a Config,
            project: &'a ProjectDescriptor,
            report: ReportKind,
        ) -> StepContext<'a> {
            StepContext {
                project: ProjectContext::mock(config, project),
                report,
            }
        }
    }

    #[test]
    fn concatenated_stages_keep_their_order() {
        let pipeline = Pipeline::concat(vec![vec![&FIRST, &AFTER], vec![], vec![&CLEANUP]]);
        assert_eq!(pipeline.names(), vec!["First", "After", "Cleanup"]);
    }

    #[test]
    fn successful_pipeline() {
        let config = Config::mock(std::path::Path::new("/tmp/tb"));
        let project = ProjectDescriptor::mock("mock");
        let ctx = StepContext::mock(&config, &project, ReportKind::TaintPropagation);
        let pipeline = Pipeline::concat(vec![vec![&FIRST, &AFTER, &CLEANUP]]);
        let result = run_steps(&pipeline, &ctx);
        assert!(result.is_success());
        assert_eq!(result.logs.len(), 3);
    }

    #[test]
    fn pipeline_stops_at_first_failure_but_cleans_up() {
        let config = Config::mock(std::path::Path::new("/tmp/tb"));
        let project = ProjectDescriptor::mock("mock");
        let ctx = StepContext::mock(&config, &project, ReportKind::TaintPropagation);
        let pipeline = Pipeline::concat(vec![vec![&FIRST, &FAILING, &AFTER, &FAILING, &CLEANUP]]);
        let result = run_steps(&pipeline, &ctx);
        assert_eq!(result.failed_step, Some("Failing"));
        let texts: Vec<String> = result.logs.iter().map(|log| log.to_string()).collect();
        assert_eq!(
            texts,
            vec![
                "INFO: done",
                "ERROR: Failing: broken",
                "DEBUG: After: Skipped after an earlier failure",
                "DEBUG: Failing: Skipped after an earlier failure",
                "INFO: done",
            ]
        );
    }

    #[test]
    fn report_ids_use_short_revisions() {
        let config = Config::mock(std::path::Path::new("/tmp/tb"));
        let project = ProjectDescriptor::mock("mock");
        let ctx = StepContext::mock(&config, &project, ReportKind::EnvTrace);
        let id = ctx.report_id("main");
        assert_eq!(
            id.file_name(ReportKind::EnvTrace, crate::report::FileStatus::Success),
            "ENV-TRACE-mock-main-c5c7ceb08a_1700000000000_success.json"
        );
        assert_eq!(ctx.result_folder(), PathBuf::from("/tmp/tb/results/mock"));
        assert_eq!(ctx.timeout(), Duration::from_secs(60));
    }
}
