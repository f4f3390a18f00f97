//! This crate defines the command line interface for taint_bench.
//! General documentation about taint_bench is contained in the [`taint_bench_lib`] crate.

extern crate taint_bench_lib; // Needed for the docstring-link to work

use anyhow::{anyhow, Context, Error};
use clap::{Parser, Subcommand};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use taint_bench_lib::config::Config;
use taint_bench_lib::experiment::{run_pipeline, StepContext};
use taint_bench_lib::history::bisect::bisect_project;
use taint_bench_lib::history::missing::{find_missing_revisions, CommitMap};
use taint_bench_lib::history::samples::{GradientThreshold, SampleValues};
use taint_bench_lib::history::{CommitId, GitHistory};
use taint_bench_lib::project::paper_config::{PaperConfig, VersionFilter};
use taint_bench_lib::project::recipe::CompilerSet;
use taint_bench_lib::project::{resolve_revision, ProjectContext, ProjectDescriptor};
use taint_bench_lib::projects::{find_project, get_projects};
use taint_bench_lib::taint::{extract_tainted_instructions, read_dataflow_report};
use taint_bench_lib::utils::git::Git;
use taint_bench_lib::utils::log::{
    add_debug_log_statistics, print_all_messages, remove_debug_messages, LogMessage,
};
use taint_bench_lib::utils::new_run_id;
use taint_bench_lib::{find_experiment, get_experiments};

#[derive(Debug, Parser)]
#[command(name = "taint_bench")]
/// Benchmark taint analyses on the histories of real projects
struct CmdlineArgs {
    #[command(subcommand)]
    command: Commands,

    /// Path to a custom configuration file to use instead of the standard one.
    #[arg(long, short, global = true, value_parser = check_file_existence)]
    config: Option<String>,

    /// Write the results to a file instead of stdout.
    /// Log messages are still printed to stdout, except for the `run` command whose result is its log.
    #[arg(long, short, global = true)]
    out: Option<String>,

    /// Generate JSON output.
    #[arg(long, short, global = true)]
    json: bool,

    /// Do not print log messages. This prevents polluting stdout for json output.
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Print additional debug log messages.
    #[arg(long, short, global = true, conflicts_with("quiet"))]
    verbose: bool,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run an experiment on one revision of a project.
    Run {
        /// The name of the experiment, see the `experiments` command.
        experiment: String,
        /// The name of the project, see the `projects` command.
        project: String,
        /// The revision to analyze. Abbreviated commit hashes and symbolic names are accepted.
        #[arg(long, short, default_value = "HEAD")]
        revision: String,
    },

    /// Print the instructions tainted by the taint source in a Phasar data flow report.
    Extract {
        /// The JSON report of Phasar's environment variable tracing.
        #[arg(value_parser = check_file_existence)]
        report: String,
        /// A fact references the taint source if its name contains this string.
        #[arg(long)]
        source_symbol: Option<String>,
        /// Qualifying prefix removed from instruction ids.
        #[arg(long)]
        prefix: Option<String>,
    },

    /// Propose new revisions between sampled revisions whose values differ too much,
    /// bisecting the whole history of the project.
    Bisect {
        project: String,
        /// A JSON object mapping sampled revisions to their measured values.
        #[arg(long, short, value_parser = check_file_existence)]
        samples: String,
        /// The relative change between two samples that triggers a bisection.
        #[arg(long, short, default_value = "0.1")]
        threshold: f64,
    },

    /// Propose new revisions halfway between consecutive samples whose values differ too much.
    MissingRevisions {
        project: String,
        /// A JSON object mapping sampled revisions to their measured values.
        #[arg(long, short, value_parser = check_file_existence)]
        samples: String,
        /// The relative change between two samples that triggers a new revision.
        #[arg(long, short, default_value = "0.1")]
        threshold: f64,
    },

    /// List all known projects.
    Projects,

    /// List all known experiments.
    Experiments,
}

fn main() {
    let cmdline_args = CmdlineArgs::parse();

    if let Err(err) = run(cmdline_args) {
        eprintln!("Error: {err:#}");
        std::process::exit(101);
    }
}

/// Check the existence of a file
fn check_file_existence(file_path: &str) -> Result<String, String> {
    if std::fs::metadata(file_path)
        .map_err(|err| format!("{err}"))?
        .is_file()
    {
        Ok(file_path.to_string())
    } else {
        Err(format!("{file_path} is not a file."))
    }
}

/// Execute the command given on the command line.
fn run(args: CmdlineArgs) -> Result<(), Error> {
    let (config, mut all_logs) = load_config(args.config.as_deref())?;
    let result = match &args.command {
        Commands::Run {
            experiment,
            project,
            revision,
        } => run_experiment(&config, experiment, project, revision, &mut all_logs),
        Commands::Extract {
            report,
            source_symbol,
            prefix,
        } => {
            let report = read_dataflow_report(Path::new(report))?;
            let instructions = extract_tainted_instructions(
                &report,
                source_symbol
                    .as_deref()
                    .unwrap_or(&config.taint.source_symbol),
                prefix.as_deref().unwrap_or(&config.taint.instruction_prefix),
            );
            write_lines(&instructions, args.out.as_deref(), args.json)
        }
        Commands::Bisect {
            project,
            samples,
            threshold,
        } => {
            let new_revisions =
                bisect(&config, project, Path::new(samples), *threshold, &mut all_logs)?;
            write_revisions(&new_revisions, args.out.as_deref(), args.json)
        }
        Commands::MissingRevisions {
            project,
            samples,
            threshold,
        } => {
            let new_revisions =
                missing_revisions(&config, project, Path::new(samples), *threshold, &mut all_logs)?;
            write_revisions(&new_revisions, args.out.as_deref(), args.json)
        }
        Commands::Projects => list_projects(args.out.as_deref(), args.json),
        Commands::Experiments => {
            let experiments: Vec<String> = get_experiments()
                .iter()
                .map(|experiment| experiment.to_string())
                .collect();
            write_lines(&experiments, args.out.as_deref(), args.json)
        }
    };

    // Print the log messages, even if the command failed.
    if args.quiet {
        all_logs = Vec::new(); // Suppress all log messages since the `--quiet` flag is set.
    } else if args.verbose {
        add_debug_log_statistics(&mut all_logs);
    } else {
        remove_debug_messages(&mut all_logs);
    }
    let log_out = match args.command {
        Commands::Run { .. } => args.out.as_deref(),
        _ => None,
    };
    print_all_messages(&all_logs, log_out, args.json)?;
    result
}

/// Read the configuration given on the command line or from the standard location.
/// Without any configuration file the defaults are used.
fn load_config(config_path: Option<&str>) -> Result<(Config, Vec<LogMessage>), Error> {
    match config_path {
        Some(path) => Ok((Config::from_file(Path::new(path))?, Vec::new())),
        None => match Config::from_standard_location() {
            Ok(config) => Ok((config, Vec::new())),
            Err(err) => Ok((
                Config::default(),
                vec![LogMessage::new_debug(format!(
                    "Using the default configuration: {err:#}"
                ))],
            )),
        },
    }
}

fn get_project(name: &str) -> Result<ProjectDescriptor, Error> {
    find_project(name).ok_or_else(|| {
        anyhow!("{name} is not a valid project name. Use the `projects` command to list all projects.")
    })
}

/// Run the pipeline of an experiment on one project revision.
fn run_experiment(
    config: &Config,
    experiment_name: &str,
    project_name: &str,
    revision: &str,
    all_logs: &mut Vec<LogMessage>,
) -> Result<(), Error> {
    let experiment = find_experiment(experiment_name).ok_or_else(|| {
        anyhow!("{experiment_name} is not a valid experiment name. Use the `experiments` command to list all experiments.")
    })?;
    let project = get_project(project_name)?;
    let paper_config = config
        .paper_config
        .as_deref()
        .map(PaperConfig::from_file)
        .transpose()?;

    let (revision, mut logs) = resolve_revision(config, &project, revision)?;
    all_logs.append(&mut logs);
    let ctx = StepContext {
        project: ProjectContext {
            config,
            project: &project,
            revision,
            run_id: new_run_id()?,
            compilers: CompilerSet::wllvm(config),
            version_filter: VersionFilter::for_project(paper_config.as_ref(), project.name),
        },
        report: experiment.report,
    };
    let mut result = run_pipeline(experiment, &ctx);
    all_logs.append(&mut result.logs);
    match result.failed_step {
        Some(step) => Err(anyhow!("{} failed in step {step}", experiment.name)),
        None => Ok(()),
    }
}

/// Load the history of a project from its cached clone.
fn load_history(
    config: &Config,
    project: &ProjectDescriptor,
    all_logs: &mut Vec<LogMessage>,
) -> Result<GitHistory, Error> {
    let (_, mut logs) = resolve_revision(config, project, "HEAD")?;
    all_logs.append(&mut logs);
    let git = Git::new(&config.tools.git, project.primary_source()?.cache_path(config));
    GitHistory::load(git, "HEAD")
}

fn bisect(
    config: &Config,
    project_name: &str,
    samples_path: &Path,
    threshold: f64,
    all_logs: &mut Vec<LogMessage>,
) -> Result<BTreeSet<CommitId>, Error> {
    let project = get_project(project_name)?;
    let history = load_history(config, &project, all_logs)?;
    let samples = SampleValues::from_file(samples_path, history.graph())?;
    let sampled_commits = samples.commits();
    let predicate = GradientThreshold { samples, threshold };
    let (new_revisions, mut logs) = bisect_project(&sampled_commits, &history, |ancestor, commit| {
        predicate.should_insert(ancestor, commit)
    })?;
    all_logs.append(&mut logs);
    Ok(new_revisions)
}

fn missing_revisions(
    config: &Config,
    project_name: &str,
    samples_path: &Path,
    threshold: f64,
    all_logs: &mut Vec<LogMessage>,
) -> Result<BTreeSet<CommitId>, Error> {
    let project = get_project(project_name)?;
    let history = load_history(config, &project, all_logs)?;
    let graph = history.graph();
    let samples = SampleValues::from_file(samples_path, graph)?;
    let cmap = CommitMap::new(graph);

    let mut rows: Vec<(usize, CommitId)> = samples
        .commits()
        .into_iter()
        .map(|commit| Ok((cmap.time_id(&commit)?, commit)))
        .collect::<Result<_, Error>>()?;
    rows.sort();
    let predicate = GradientThreshold { samples, threshold };
    let (new_revisions, mut logs) = find_missing_revisions(
        rows,
        &cmap,
        |(_, lhs), (_, rhs)| predicate.should_insert(lhs, rhs),
        |(_, commit)| commit.clone(),
        |lhs, rhs| graph.are_neighbours(lhs, rhs),
    )?;
    all_logs.append(&mut logs);
    Ok(new_revisions)
}

fn list_projects(out_path: Option<&str>, emit_json: bool) -> Result<(), Error> {
    let projects = get_projects();
    if emit_json {
        let projects: Vec<serde_json::Value> = projects
            .iter()
            .map(|project| {
                serde_json::json!({
                    "name": project.name,
                    "group": project.group.to_string(),
                    "domain": project.domain,
                    "cve_products": project.cve_product_info(),
                })
            })
            .collect();
        return write_output(&(serde_json::to_string_pretty(&projects)? + "\n"), out_path);
    }
    let lines: Vec<String> = projects
        .iter()
        .map(|project| {
            let products: Vec<String> = project
                .cve_product_info()
                .iter()
                .map(|(vendor, product)| format!("{vendor}:{product}"))
                .collect();
            format!(
                "{} ({}, {}) CVE products: [{}]",
                project.name,
                project.group,
                project.domain,
                products.join(", ")
            )
        })
        .collect();
    write_lines(&lines, out_path, false)
}

fn write_revisions(
    revisions: &BTreeSet<CommitId>,
    out_path: Option<&str>,
    emit_json: bool,
) -> Result<(), Error> {
    let revisions: Vec<String> = revisions.iter().map(|commit| commit.to_string()).collect();
    write_lines(&revisions, out_path, emit_json)
}

/// Write the lines as plain text or as a JSON array.
fn write_lines(lines: &[String], out_path: Option<&str>, emit_json: bool) -> Result<(), Error> {
    let output = if emit_json {
        serde_json::to_string_pretty(lines)? + "\n"
    } else {
        lines.iter().map(|line| format!("{line}\n")).collect()
    };
    write_output(&output, out_path)
}

fn write_output(output: &str, out_path: Option<&str>) -> Result<(), Error> {
    if let Some(file_path) = out_path {
        let file_path = PathBuf::from(file_path);
        std::fs::write(&file_path, output)
            .with_context(|| format!("Writing to output path {} failed", file_path.display()))?;
    } else {
        print!("{output}");
    }
    Ok(())
}
