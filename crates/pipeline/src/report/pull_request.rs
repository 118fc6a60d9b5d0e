//! CSV report for a single pull request.
//!
//! Layout, one labelled field per line:
//!
//! ```text
//! Pull Request Details,
//! ------------------------------------,
//! Pull Request ID:,<node_id>
//! ...
//! Code Review Outcome,
//! ------------------------------------,
//! Merged By:,<login>
//! ...
//! Latest Reviews:,"<review blocks>"
//! Latest Comments:,"<comment blocks>"
//! ```
//!
//! Free-text cells are wrapped in double quotes. Quote characters inside them
//! are written as-is, so a body containing `"` yields a row that strict CSV
//! readers will split differently. The collector accepts the output in this
//! form and it is kept byte-compatible.

use crate::records::{required, required_ref};
use crate::{
    DocumentKind, EvidenceDocument, FormatError, GitHubBranchRef, GitHubComment, GitHubReview,
    GitHubUser, PullRequestEvidence, RecordId, SourceTimestamp,
};

/// Local mirror prefix for pull request reports.
pub const FILE_PREFIX: &str = "pull_request";

const RULE: &str = "------------------------------------,";

/// Renders one pull request with its reviews and comments.
pub fn render(evidence: &PullRequestEvidence) -> Result<EvidenceDocument, FormatError> {
    let pr = &evidence.pull_request;

    let node_id = required(&pr.node_id, "node_id")?;
    let created_at = SourceTimestamp::parse_utc("created_at", required(&pr.created_at, "created_at")?)?;
    let merged_at = SourceTimestamp::parse_utc("merged_at", required(&pr.merged_at, "merged_at")?)?;
    let author = required_ref(&pr.user, "user")?;
    let merged_by = required_ref(&pr.merged_by, "merged_by")?;
    let head = required_ref(&pr.head, "head")?;
    let base = required_ref(&pr.base, "base")?;

    let reviews = format_reviews(&evidence.reviews)?;
    let comments = format_comments(&evidence.comments)?;

    let mut out = Csv::default();

    out.heading("Pull Request Details");
    out.field("Pull Request ID:", node_id);
    out.field("Pull Request URL:", required(&pr.html_url, "html_url")?);
    out.quoted("Pull Request Description:", required(&pr.body, "body")?);
    out.field("Pull Request Created At:", &created_at.to_canonical());
    out.blank();

    out.field("Author Name:", required(&author.login, "user.login")?);
    out.field("Author Profile:", required(&author.html_url, "user.html_url")?);
    out.blank();

    branch_rows(&mut out, head, "head", "Incoming (Head) Repository:", "Incoming Ref Name:", "Incoming Commit:")?;
    out.blank();

    out.heading("Code Review Outcome");
    out.field("Merged By:", required(&merged_by.login, "merged_by.login")?);
    out.field("Merged By Profile:", required(&merged_by.html_url, "merged_by.html_url")?);
    out.field("Merged At:", &merged_at.to_canonical());
    out.blank();

    branch_rows(&mut out, base, "base", "Target (Base) Repository:", "Target Ref Name:", "Target Commit:")?;
    out.blank();

    out.quoted("Latest Reviews:", &reviews);
    out.quoted("Latest Comments:", &comments);

    let record_id = RecordId::new(node_id).ok_or_else(|| FormatError::missing("node_id"))?;
    Ok(EvidenceDocument::new(
        DocumentKind::Csv,
        FILE_PREFIX,
        record_id,
        out.into_bytes(),
    ))
}

fn branch_rows(
    out: &mut Csv,
    branch: &GitHubBranchRef,
    side: &str,
    repo_label: &str,
    ref_label: &str,
    sha_label: &str,
) -> Result<(), FormatError> {
    let repo = required_ref(&branch.repo, &format!("{side}.repo"))?;
    out.field(repo_label, required(&repo.full_name, &format!("{side}.repo.full_name"))?);
    out.field(ref_label, required(&branch.ref_name, &format!("{side}.ref"))?);
    out.field(sha_label, required(&branch.sha, &format!("{side}.sha"))?);
    Ok(())
}

/// Renders comments in the order supplied.
pub fn format_comments(comments: &[GitHubComment]) -> Result<String, FormatError> {
    let mut block = String::new();
    for (i, comment) in comments.iter().enumerate() {
        let field = |name: &str| format!("comments[{i}].{name}");
        let submitted = SourceTimestamp::parse_with_offset(
            &field("created_at"),
            required(&comment.created_at, &field("created_at"))?,
        )?;
        block.push_str(&entry(
            "By",
            required(&comment.author_association, &field("author_association"))?,
            required_ref(&comment.user, &field("user"))?,
            &field("user"),
            submitted,
            required(&comment.body, &field("body"))?,
        )?);
    }
    Ok(block)
}

/// Renders reviews in the order supplied, each prefixed with its state.
pub fn format_reviews(reviews: &[GitHubReview]) -> Result<String, FormatError> {
    let mut block = String::new();
    for (i, review) in reviews.iter().enumerate() {
        let field = |name: &str| format!("reviews[{i}].{name}");
        let submitted = SourceTimestamp::parse_with_offset(
            &field("submitted_at"),
            required(&review.submitted_at, &field("submitted_at"))?,
        )?;
        let lead = format!("{} by", required(&review.state, &field("state"))?);
        block.push_str(&entry(
            &lead,
            required(&review.author_association, &field("author_association"))?,
            required_ref(&review.user, &field("user"))?,
            &field("user"),
            submitted,
            required(&review.body, &field("body"))?,
        )?);
    }
    Ok(block)
}

/// `<lead> <role> <login> (<profile>) on <timestamp>\n\n<body>\n\n`
fn entry(
    lead: &str,
    role: &str,
    user: &GitHubUser,
    user_field: &str,
    submitted: SourceTimestamp,
    body: &str,
) -> Result<String, FormatError> {
    let login = required(&user.login, &format!("{user_field}.login"))?;
    let profile = required(&user.html_url, &format!("{user_field}.html_url"))?;
    Ok(format!(
        "{lead} {role} {login} ({profile}) on {}\n\n{body}\n\n",
        submitted.to_canonical()
    ))
}

/// Line-oriented CSV text with `\n` terminators.
#[derive(Default)]
struct Csv(String);

impl Csv {
    fn heading(&mut self, title: &str) {
        self.line(&format!("{title},"));
        self.line(RULE);
    }

    fn field(&mut self, label: &str, value: &str) {
        self.line(&format!("{label},{value}"));
    }

    fn quoted(&mut self, label: &str, value: &str) {
        self.line(&format!("{label},\"{value}\""));
    }

    fn blank(&mut self) {
        self.0.push('\n');
    }

    fn line(&mut self, text: &str) {
        self.0.push_str(text);
        self.0.push('\n');
    }

    fn into_bytes(self) -> Vec<u8> {
        self.0.into_bytes()
    }
}
