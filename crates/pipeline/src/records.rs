//! Source records as returned by the tracking systems.
//!
//! Every field is optional at the deserialisation layer: the APIs return
//! `null` freely, and deciding which fields are required is the report
//! builder's job, where a missing value becomes a [`crate::FormatError`]
//! naming the field instead of a generic decode failure.
//!
//! Records are immutable once fetched and are dropped after their report is
//! built.

use serde::{Deserialize, Serialize};

use crate::FormatError;

/// Returns the value of a required field or a [`FormatError::MissingField`].
pub(crate) fn required<'a>(value: &'a Option<String>, field: &str) -> Result<&'a str, FormatError> {
    value.as_deref().ok_or_else(|| FormatError::missing(field))
}

/// Like [`required`] for nested objects.
pub(crate) fn required_ref<'a, T>(value: &'a Option<T>, field: &str) -> Result<&'a T, FormatError> {
    value.as_ref().ok_or_else(|| FormatError::missing(field))
}

// ---------------------------------------------------------------------------
// GitHub Enterprise Server
// ---------------------------------------------------------------------------

/// A GitHub user reference (author, merger, reviewer).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GitHubUser {
    pub login: Option<String>,
    pub html_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GitHubRepository {
    pub full_name: Option<String>,
}

/// The `head` or `base` side of a pull request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GitHubBranchRef {
    #[serde(rename = "ref")]
    pub ref_name: Option<String>,
    pub sha: Option<String>,
    pub repo: Option<GitHubRepository>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GitHubLink {
    pub href: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GitHubPullRequestLinks {
    pub comments: Option<GitHubLink>,
}

/// Pull request details (`GET /repos/{owner}/{repo}/pulls/{number}`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GitHubPullRequest {
    /// API URL of the pull request; reviews live under `<url>/reviews`.
    pub url: Option<String>,
    pub node_id: Option<String>,
    pub html_url: Option<String>,
    pub user: Option<GitHubUser>,
    pub body: Option<String>,
    pub created_at: Option<String>,
    pub merged_at: Option<String>,
    pub merged_by: Option<GitHubUser>,
    pub head: Option<GitHubBranchRef>,
    pub base: Option<GitHubBranchRef>,
    #[serde(rename = "_links")]
    pub links: Option<GitHubPullRequestLinks>,
}

/// An issue comment on a pull request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GitHubComment {
    pub created_at: Option<String>,
    pub author_association: Option<String>,
    pub body: Option<String>,
    pub user: Option<GitHubUser>,
}

/// A submitted pull request review.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GitHubReview {
    pub submitted_at: Option<String>,
    pub author_association: Option<String>,
    pub body: Option<String>,
    /// Review outcome (`APPROVED`, `CHANGES_REQUESTED`, `COMMENTED`, ...).
    pub state: Option<String>,
    pub user: Option<GitHubUser>,
}

/// Everything fetched for one pull request.
///
/// Comments and reviews are kept in the order the API returned them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PullRequestEvidence {
    pub pull_request: GitHubPullRequest,
    pub comments: Vec<GitHubComment>,
    pub reviews: Vec<GitHubReview>,
}

// ---------------------------------------------------------------------------
// Jira Server
// ---------------------------------------------------------------------------

/// Any Jira object that is rendered by its `name` (issue type, project, status).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JiraNamed {
    pub name: Option<String>,
}

/// A Jira user reference (assignee, reporter).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JiraUser {
    pub display_name: Option<String>,
}

/// The subset of issue fields requested by the search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JiraFields {
    pub summary: Option<String>,
    pub issuetype: Option<JiraNamed>,
    pub project: Option<JiraNamed>,
    pub status: Option<JiraNamed>,
    pub assignee: Option<JiraUser>,
    pub reporter: Option<JiraUser>,
    pub created: Option<String>,
    pub resolutiondate: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JiraIssue {
    /// REST URL of the issue.
    #[serde(rename = "self")]
    pub self_url: Option<String>,
    pub key: Option<String>,
    pub fields: Option<JiraFields>,
}

/// Response of `GET /rest/api/2/search`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JiraSearchResponse {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub issues: Vec<JiraIssue>,
}

/// One JQL query and the issues it returned.
#[derive(Debug, Clone, PartialEq)]
pub struct IssueQueryEvidence {
    pub jql: String,
    /// Comma-separated field list sent with the query.
    pub fields_requested: String,
    /// Width of the reporting window, used for the report details sheet.
    pub date_range_days: u32,
    pub issues: Vec<JiraIssue>,
}

// ---------------------------------------------------------------------------

/// A record handed from a [`crate::RecordSource`] to the report builder.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceRecord {
    /// One pull request with its comments and reviews; rendered as CSV.
    PullRequest(PullRequestEvidence),
    /// The result set of one issue query; rendered as a spreadsheet.
    IssueQuery(IssueQueryEvidence),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pull_request_tolerates_nulls_and_unknown_fields() {
        let json = r#"{
            "url": "https://ghe.example.com/api/v3/repos/acme/app/pulls/7",
            "id": 7,
            "node_id": "PR_kw7",
            "body": null,
            "merged_by": null,
            "head": {"ref": "feature/x", "sha": "abc", "repo": {"full_name": "acme/app"}},
            "_links": {"comments": {"href": "https://ghe.example.com/api/v3/repos/acme/app/issues/7/comments"}}
        }"#;
        let pr: GitHubPullRequest = serde_json::from_str(json).unwrap();
        assert_eq!(pr.node_id.as_deref(), Some("PR_kw7"));
        assert!(pr.body.is_none());
        assert!(pr.merged_by.is_none());
        assert_eq!(pr.head.unwrap().ref_name.as_deref(), Some("feature/x"));
        assert!(pr.links.unwrap().comments.unwrap().href.is_some());
    }

    #[test]
    fn jira_issue_maps_self_and_camel_case_fields() {
        let json = r#"{
            "total": 1,
            "issues": [{
                "self": "https://jira.example.com/rest/api/2/issue/10001",
                "key": "OPS-1",
                "fields": {"assignee": {"displayName": "Dana"}, "assignee_extra": 1}
            }]
        }"#;
        let response: JiraSearchResponse = serde_json::from_str(json).unwrap();
        let issue = &response.issues[0];
        assert_eq!(issue.self_url.as_deref(), Some("https://jira.example.com/rest/api/2/issue/10001"));
        let fields = issue.fields.as_ref().unwrap();
        assert_eq!(fields.assignee.as_ref().unwrap().display_name.as_deref(), Some("Dana"));
    }

    #[test]
    fn required_reports_field_name() {
        let err = required(&None, "merged_by.login").unwrap_err();
        assert_eq!(err.to_string(), "Required field 'merged_by.login' is missing");
    }
}
