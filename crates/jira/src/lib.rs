//! Jira Server record source.
//!
//! Implements [`pipeline::RecordSource`] over the Jira REST v2 search API. A
//! run issues one JQL query; its whole result set becomes one
//! [`pipeline::SourceRecord::IssueQuery`] and therefore one spreadsheet.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Authentication, URL layout and JSON decoding live here.
//! Sheet layout lives in `pipeline::report::issue_sheet`.

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::{info, instrument};

use pipeline::{IssueQueryEvidence, JiraSearchResponse, RecordSource, SourceFetchError, SourceRecord};

/// Issue fields requested from the search endpoint.
pub const SEARCH_FIELDS: &str = "issuetype,project,summary,assignee,reporter,status,created,resolutiondate";

/// Upper bound on issues returned by the single search page.
pub const MAX_RESULTS: u32 = 1000;

/// Reporting window shown on the details sheet when none is configured.
pub const DEFAULT_DATE_RANGE_DAYS: u32 = 90;

fn default_date_range_days() -> u32 {
    DEFAULT_DATE_RANGE_DAYS
}

/// Connection and query settings for one Jira Server instance.
#[derive(Clone, Deserialize)]
pub struct JiraConfig {
    /// Base URL, e.g. `https://jira.example.com`.
    pub endpoint: String,
    pub username: String,
    pub password: String,
    pub jql: String,
    #[serde(default = "default_date_range_days")]
    pub date_range_days: u32,
}

impl std::fmt::Debug for JiraConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JiraConfig")
            .field("endpoint", &self.endpoint)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("jql", &self.jql)
            .field("date_range_days", &self.date_range_days)
            .finish()
    }
}

/// The single query a run executes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JqlQuery {
    pub jql: String,
}

/// Runs one JQL search per run.
#[derive(Debug, Clone)]
pub struct JiraSource {
    client: Client,
    config: JiraConfig,
}

impl JiraSource {
    pub fn new(config: JiraConfig) -> Result<Self, SourceFetchError> {
        let client = Client::builder().build().map_err(|e| SourceFetchError::Transport {
            url: config.endpoint.clone(),
            message: e.to_string(),
        })?;
        Ok(Self { client, config })
    }

    /// `<endpoint>/rest/api/2/search?jql=<jql>&fields=...&maxResults=1000`
    pub fn search_url(&self, jql: &str) -> Result<Url, SourceFetchError> {
        let base = format!("{}/rest/api/2/search", self.config.endpoint.trim_end_matches('/'));
        let mut url = Url::parse(&base).map_err(|e| SourceFetchError::InvalidUrl {
            url: base.clone(),
            message: e.to_string(),
        })?;
        url.query_pairs_mut().append_pair("jql", jql);
        // Field list goes on the wire with literal commas.
        let query = format!(
            "{}&fields={SEARCH_FIELDS}&maxResults={MAX_RESULTS}",
            url.query().unwrap_or_default()
        );
        url.set_query(Some(&query));
        Ok(url)
    }
}

#[async_trait]
impl RecordSource for JiraSource {
    type Handle = JqlQuery;

    async fn discover(&self) -> Result<Vec<JqlQuery>, SourceFetchError> {
        Ok(vec![JqlQuery {
            jql: self.config.jql.clone(),
        }])
    }

    #[instrument(skip(self), fields(endpoint = %self.config.endpoint))]
    async fn fetch(&self, handle: &JqlQuery) -> Result<SourceRecord, SourceFetchError> {
        let url = self.search_url(&handle.jql)?;
        let url_text = url.to_string();

        let response = self
            .client
            .get(url)
            .basic_auth(&self.config.username, Some(&self.config.password))
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| SourceFetchError::Transport {
                url: url_text.clone(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceFetchError::Status {
                url: url_text,
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|e| SourceFetchError::Transport {
            url: url_text.clone(),
            message: e.to_string(),
        })?;
        let search: JiraSearchResponse =
            serde_json::from_slice(&body).map_err(|e| SourceFetchError::Decode {
                url: url_text,
                message: e.to_string(),
            })?;

        info!(total = search.total, returned = search.issues.len(), "Jira search complete");
        Ok(SourceRecord::IssueQuery(IssueQueryEvidence {
            jql: handle.jql.clone(),
            fields_requested: SEARCH_FIELDS.to_string(),
            date_range_days: self.config.date_range_days,
            issues: search.issues,
        }))
    }

    fn describe(&self, handle: &JqlQuery) -> String {
        format!("JQL '{}'", handle.jql)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> JiraConfig {
        JiraConfig {
            endpoint: "https://jira.example.com/".into(),
            username: "alice".into(),
            password: "s3cret".into(),
            jql: "project = OPS AND status = Done".into(),
            date_range_days: 30,
        }
    }

    #[test]
    fn search_url_encodes_jql_and_keeps_field_commas() {
        let source = JiraSource::new(config()).unwrap();
        let url = source.search_url("project = OPS AND status = Done").unwrap();

        assert_eq!(url.path(), "/rest/api/2/search");
        assert_eq!(
            url.query(),
            Some(
                "jql=project+%3D+OPS+AND+status+%3D+Done\
                 &fields=issuetype,project,summary,assignee,reporter,status,created,resolutiondate\
                 &maxResults=1000"
            )
        );
    }

    #[tokio::test]
    async fn discover_returns_the_configured_query_without_io() {
        let source = JiraSource::new(config()).unwrap();
        let handles = source.discover().await.unwrap();
        assert_eq!(
            handles,
            vec![JqlQuery {
                jql: "project = OPS AND status = Done".into()
            }]
        );
        assert_eq!(source.describe(&handles[0]), "JQL 'project = OPS AND status = Done'");
    }

    #[test]
    fn debug_output_hides_password() {
        let rendered = format!("{:?}", config());
        assert!(!rendered.contains("s3cret"));
        assert!(rendered.contains("alice"));
    }
}
