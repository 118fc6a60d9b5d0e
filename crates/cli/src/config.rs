//! TOML configuration for one evidence collector deployment.
//!
//! ```toml
//! [source]
//! kind = "github"
//! endpoint = "https://github.example.com"
//! access_token = "..."
//! query = "repo:acme/app is:pr is:merged merged:{start}..{end}"
//!
//! [collector]
//! url = "https://collector.example.com/api/v0/evidence/collector/42/"
//! username = "..."
//! password = "..."
//! api_key = "..."
//!
//! [output]
//! local_path = "reports"
//! ```

use std::path::{Path, PathBuf};

use anyhow::{ensure, Context, Result};
use serde::Deserialize;

use collector::CollectorConfig;
use github::GitHubConfig;
use jira::JiraConfig;
use pipeline::{FailurePolicy, ReportOptions, RunOptions};

pub const DEFAULT_CONFIG_PATH: &str = "evidence-collector.toml";

/// Widest accepted reporting window, in days.
pub const MAX_DATE_RANGE_DAYS: u32 = 36_500;

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    pub source: SourceConfig,
    pub collector: CollectorConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Which system records come from.
#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SourceConfig {
    Github(GitHubConfig),
    Jira(JiraConfig),
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct OutputConfig {
    /// Directory for local report copies. No copies are written when unset.
    #[serde(default)]
    pub local_path: Option<PathBuf>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct RunConfig {
    #[serde(default = "default_continue_on_error")]
    pub continue_on_error: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            continue_on_error: default_continue_on_error(),
        }
    }
}

fn default_continue_on_error() -> bool {
    true
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default)]
    pub json_logs: bool,
    /// OTLP gRPC endpoint, e.g. `http://localhost:4317`.
    #[serde(default)]
    pub otlp_endpoint: Option<String>,
}

impl Config {
    pub fn load_from(path: &Path) -> Result<Self> {
        let s = std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        Self::from_toml_str(&s).with_context(|| format!("parse {}", path.display()))
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let cfg: Config = toml::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        match &self.source {
            SourceConfig::Github(gh) => {
                non_empty("source.endpoint", &gh.endpoint)?;
                non_empty("source.access_token", &gh.access_token)?;
                non_empty("source.query", &gh.query)?;
                within_range(gh.date_range_days)?;
            }
            SourceConfig::Jira(jira) => {
                non_empty("source.endpoint", &jira.endpoint)?;
                non_empty("source.username", &jira.username)?;
                non_empty("source.password", &jira.password)?;
                non_empty("source.jql", &jira.jql)?;
                within_range(jira.date_range_days)?;
            }
        }
        non_empty("collector.url", &self.collector.url)?;
        non_empty("collector.username", &self.collector.username)?;
        non_empty("collector.password", &self.collector.password)?;
        non_empty("collector.api_key", &self.collector.api_key)?;
        Ok(())
    }

    /// Applies command line overrides on top of the file.
    pub fn apply_overrides(&mut self, output_dir: Option<PathBuf>, fail_fast: bool) {
        if let Some(dir) = output_dir {
            self.output.local_path = Some(dir);
        }
        if fail_fast {
            self.run.continue_on_error = false;
        }
    }

    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            report: ReportOptions {
                local_output_dir: self.output.local_path.clone().filter(|p| !is_blank(p)),
            },
            on_failure: if self.run.continue_on_error {
                FailurePolicy::ContinueWithNext
            } else {
                FailurePolicy::StopOnFirst
            },
        }
    }
}

/// An empty or whitespace-only path disables the local copy.
fn is_blank(path: &Path) -> bool {
    path.to_string_lossy().trim().is_empty()
}

fn within_range(days: u32) -> Result<()> {
    ensure!(
        days <= MAX_DATE_RANGE_DAYS,
        "source.date_range_days must be at most {MAX_DATE_RANGE_DAYS}, got {days}"
    );
    Ok(())
}

fn non_empty(field: &str, value: &str) -> Result<()> {
    ensure!(!value.trim().is_empty(), "{field} must not be empty");
    Ok(())
}
