//! GitHub Enterprise Server record source.
//!
//! Implements [`pipeline::RecordSource`] over the GitHub REST v3 API: an issue
//! search discovers pull requests, then each one is fetched together with its
//! comments and reviews.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** This crate must not contain formatting rules. URL
//! layout, authentication and JSON decoding live here; the [`pipeline`] crate
//! only sees [`pipeline::SourceRecord::PullRequest`].
//!
//! ## Requests
//!
//! | Step | Request |
//! |------|---------|
//! | discover | `GET <endpoint>/api/v3/search/issues?q=<query>` (single page) |
//! | details | `GET <pull_request.url>` |
//! | comments | `GET <_links.comments.href>` |
//! | reviews | `GET <pull_request.url>/reviews` |
//!
//! Every request carries `Authorization: token <pat>` and
//! `Accept: application/json`.

use async_trait::async_trait;
use chrono::{Days, Local, NaiveDate};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info, instrument};

use pipeline::{
    GitHubComment, GitHubPullRequest, GitHubReview, PullRequestEvidence, RecordSource,
    SourceFetchError, SourceRecord,
};

/// Reporting window used when the configuration does not name one.
pub const DEFAULT_DATE_RANGE_DAYS: u32 = 90;

const USER_AGENT: &str = concat!("evidence-collector/", env!("CARGO_PKG_VERSION"));

fn default_date_range_days() -> u32 {
    DEFAULT_DATE_RANGE_DAYS
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Connection and query settings for one GitHub Enterprise Server instance.
#[derive(Clone, Deserialize)]
pub struct GitHubConfig {
    /// Base URL of the server, e.g. `https://github.example.com`.
    pub endpoint: String,
    /// Personal access token.
    pub access_token: String,
    /// Search query; `{start}` and `{end}` are replaced with the window bounds.
    pub query: String,
    #[serde(default = "default_date_range_days")]
    pub date_range_days: u32,
}

impl std::fmt::Debug for GitHubConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubConfig")
            .field("endpoint", &self.endpoint)
            .field("access_token", &"<redacted>")
            .field("query", &self.query)
            .field("date_range_days", &self.date_range_days)
            .finish()
    }
}

/// Substitutes `{start}` (`today - date_range_days`) and `{end}` (`today + 1`)
/// into a search query template. Both are rendered as `yyyy-MM-dd` and clamp
/// to chrono's date range.
pub fn expand_query(template: &str, today: NaiveDate, date_range_days: u32) -> String {
    let start = today
        .checked_sub_days(Days::new(u64::from(date_range_days)))
        .unwrap_or(NaiveDate::MIN);
    let end = today.checked_add_days(Days::new(1)).unwrap_or(NaiveDate::MAX);
    template
        .replace("{start}", &start.format("%Y-%m-%d").to_string())
        .replace("{end}", &end.format("%Y-%m-%d").to_string())
}

// ---------------------------------------------------------------------------
// Search response
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    html_url: Option<String>,
    pull_request: Option<SearchItemPullRequest>,
}

#[derive(Debug, Deserialize)]
struct SearchItemPullRequest {
    url: Option<String>,
}

/// A pull request found by the search, not yet fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestHandle {
    /// API URL of the pull request details.
    pub url: String,
    /// Browser URL, used as the log label when present.
    pub html_url: Option<String>,
}

// ---------------------------------------------------------------------------
// Source
// ---------------------------------------------------------------------------

/// Pulls merged pull requests with their comments and reviews.
#[derive(Debug, Clone)]
pub struct GitHubSource {
    client: Client,
    config: GitHubConfig,
}

impl GitHubSource {
    pub fn new(config: GitHubConfig) -> Result<Self, SourceFetchError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| SourceFetchError::Transport {
                url: config.endpoint.clone(),
                message: e.to_string(),
            })?;
        Ok(Self { client, config })
    }

    /// Builds the discovery URL for the given local date.
    pub fn search_url(&self, today: NaiveDate) -> Result<Url, SourceFetchError> {
        let base = format!("{}/api/v3/search/issues", self.config.endpoint.trim_end_matches('/'));
        let mut url = Url::parse(&base).map_err(|e| SourceFetchError::InvalidUrl {
            url: base.clone(),
            message: e.to_string(),
        })?;
        let query = expand_query(&self.config.query, today, self.config.date_range_days);
        url.query_pairs_mut().append_pair("q", &query);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, SourceFetchError> {
        let response = self
            .client
            .get(url)
            .header(AUTHORIZATION, format!("token {}", self.config.access_token))
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| SourceFetchError::Transport {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceFetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|e| SourceFetchError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        serde_json::from_slice(&body).map_err(|e| SourceFetchError::Decode {
            url: url.to_string(),
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl RecordSource for GitHubSource {
    type Handle = PullRequestHandle;

    #[instrument(skip(self), fields(endpoint = %self.config.endpoint))]
    async fn discover(&self) -> Result<Vec<PullRequestHandle>, SourceFetchError> {
        let url = self.search_url(Local::now().date_naive())?;
        let search: SearchResponse = self.get_json(url.as_str()).await?;

        let mut handles = Vec::with_capacity(search.items.len());
        for item in search.items {
            match item.pull_request.and_then(|pr| pr.url) {
                Some(url) => handles.push(PullRequestHandle {
                    url,
                    html_url: item.html_url,
                }),
                None => debug!(item = ?item.html_url, "Search item is not a pull request, skipping"),
            }
        }

        info!(pull_requests = handles.len(), "Search complete");
        Ok(handles)
    }

    #[instrument(skip(self), fields(url = %handle.url))]
    async fn fetch(&self, handle: &PullRequestHandle) -> Result<SourceRecord, SourceFetchError> {
        let pull_request: GitHubPullRequest = self.get_json(&handle.url).await?;

        let comments_url = pull_request
            .links
            .as_ref()
            .and_then(|links| links.comments.as_ref())
            .and_then(|link| link.href.clone())
            .ok_or_else(|| SourceFetchError::Decode {
                url: handle.url.clone(),
                message: "missing _links.comments.href".into(),
            })?;
        let comments: Vec<GitHubComment> = self.get_json(&comments_url).await?;

        let details_url = pull_request.url.as_deref().unwrap_or(&handle.url);
        let reviews_url = format!("{}/reviews", details_url.trim_end_matches('/'));
        let reviews: Vec<GitHubReview> = self.get_json(&reviews_url).await?;

        debug!(comments = comments.len(), reviews = reviews.len(), "Pull request fetched");
        Ok(SourceRecord::PullRequest(PullRequestEvidence {
            pull_request,
            comments,
            reviews,
        }))
    }

    fn describe(&self, handle: &PullRequestHandle) -> String {
        handle.html_url.clone().unwrap_or_else(|| handle.url.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(query: &str) -> GitHubConfig {
        GitHubConfig {
            endpoint: "https://github.example.com/".into(),
            access_token: "pat-secret".into(),
            query: query.into(),
            date_range_days: 90,
        }
    }

    #[test]
    fn query_window_spans_range_and_tomorrow() {
        let today = NaiveDate::from_ymd_opt(2021, 6, 1).unwrap();
        let query = expand_query("is:pr merged:{start}..{end}", today, 90);
        assert_eq!(query, "is:pr merged:2021-03-03..2021-06-02");
    }

    #[test]
    fn oversized_range_clamps_instead_of_panicking() {
        let today = NaiveDate::from_ymd_opt(2021, 6, 1).unwrap();
        let query = expand_query("merged:{start}..{end}", today, u32::MAX);
        let expected_start = NaiveDate::MIN.format("%Y-%m-%d").to_string();
        assert_eq!(query, format!("merged:{expected_start}..2021-06-02"));
    }

    #[test]
    fn query_without_placeholders_is_unchanged() {
        let today = NaiveDate::from_ymd_opt(2021, 6, 1).unwrap();
        assert_eq!(expand_query("repo:o/r is:merged", today, 7), "repo:o/r is:merged");
    }

    #[test]
    fn search_url_encodes_query_under_api_v3() {
        let source = GitHubSource::new(config("is:pr merged:{start}..{end}")).unwrap();
        let url = source.search_url(NaiveDate::from_ymd_opt(2021, 6, 1).unwrap()).unwrap();

        assert_eq!(url.path(), "/api/v3/search/issues");
        let q: Vec<_> = url.query_pairs().collect();
        assert_eq!(q.len(), 1);
        assert_eq!(q[0].0, "q");
        assert_eq!(q[0].1, "is:pr merged:2021-03-03..2021-06-02");
        assert!(!url.as_str().contains(' '));
    }

    #[test]
    fn invalid_endpoint_is_reported() {
        let mut bad = config("x");
        bad.endpoint = "not a url".into();
        let source = GitHubSource::new(bad).unwrap();
        let err = source.search_url(NaiveDate::from_ymd_opt(2021, 6, 1).unwrap()).unwrap_err();
        assert!(matches!(err, SourceFetchError::InvalidUrl { .. }));
    }

    #[test]
    fn debug_output_hides_token() {
        let rendered = format!("{:?}", config("x"));
        assert!(!rendered.contains("pat-secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn date_range_defaults_to_ninety_days() {
        let parsed: GitHubConfig = serde_json::from_str(
            r#"{"endpoint":"https://gh","access_token":"t","query":"q"}"#,
        )
        .unwrap();
        assert_eq!(parsed.date_range_days, DEFAULT_DATE_RANGE_DAYS);
    }
}
