//! Evidence collector CLI entry point.
//!
//! This binary is the composition root. Responsibilities:
//!
//! 1. **Parse configuration**: load `evidence-collector.toml` (or `--config`)
//!    and apply command line overrides.
//! 2. **Wire observability**: install the `tracing-subscriber` stack, with an
//!    OpenTelemetry OTLP exporter when one is configured.
//! 3. **Construct infrastructure**: build the configured record source
//!    (`GitHubSource` or `JiraSource`) and the `CollectorClient`.
//! 4. **Run**: hand both to [`pipeline::run`], print one line per uploaded
//!    record and exit non-zero if any record failed.

mod config;
mod telemetry;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::error;

use collector::CollectorClient;
use github::GitHubSource;
use jira::JiraSource;
use pipeline::{EvidenceSink, PipelineError, RecordSource, RunOptions, RunSummary};

use crate::config::{Config, SourceConfig, DEFAULT_CONFIG_PATH};

/// Collect change and issue evidence and upload it to the compliance collector.
#[derive(Parser)]
#[command(name = "evidence-collector", version)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Write a local copy of every report into this directory.
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Stop at the first failed record instead of moving on.
    #[arg(long)]
    fail_fast: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let mut config = Config::load_from(&cli.config)?;
    config.apply_overrides(cli.output_dir, cli.fail_fast);

    let guard = telemetry::init(&config.telemetry)?;
    let outcome = execute(&config).await;
    guard.shutdown();

    match outcome? {
        Ok(summary) => Ok(report(&summary)),
        Err(err) => {
            eprintln!("Run aborted at {} stage: {err}", err.stage());
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Startup errors go to the outer `Result`; pipeline errors to the inner one.
async fn execute(config: &Config) -> Result<Result<RunSummary, PipelineError>> {
    let sink = CollectorClient::new(config.collector.clone()).context("build collector client")?;
    let options = config.run_options();

    let outcome = match &config.source {
        SourceConfig::Github(gh) => {
            let source = GitHubSource::new(gh.clone()).context("build GitHub client")?;
            run_with(&source, &sink, &options).await
        }
        SourceConfig::Jira(jira) => {
            let source = JiraSource::new(jira.clone()).context("build Jira client")?;
            run_with(&source, &sink, &options).await
        }
    };
    Ok(outcome)
}

async fn run_with<S, K>(source: &S, sink: &K, options: &RunOptions) -> Result<RunSummary, PipelineError>
where
    S: RecordSource,
    K: EvidenceSink,
{
    let outcome = pipeline::run(source, sink, options).await;
    if let Err(err) = &outcome {
        error!(stage = %err.stage(), error = %err, "Run aborted");
    }
    outcome
}

fn report(summary: &RunSummary) -> ExitCode {
    let (uploaded, failed) = summary_lines(summary);
    for line in uploaded {
        println!("{line}");
    }
    for line in failed {
        eprintln!("{line}");
    }
    if summary.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// Stdout lines (one per upload) and stderr lines (failures) for a summary.
fn summary_lines(summary: &RunSummary) -> (Vec<String>, Vec<String>) {
    let uploaded = summary
        .uploaded
        .iter()
        .map(|u| format!("Evidence uploaded, result Id #{}", u.result.id))
        .collect();
    let mut failed: Vec<String> = summary
        .failed
        .iter()
        .map(|f| format!("{} failed at {} stage: {}", f.label, f.stage, f.error))
        .collect();
    if summary.stopped_early {
        failed.push("Run stopped at the first failure; remaining records were skipped".to_string());
    }
    (uploaded, failed)
}
