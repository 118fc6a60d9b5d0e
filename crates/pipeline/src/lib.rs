//! Core domain for the evidence collector.
//!
//! This crate turns source records into evidence documents, encodes them for
//! the collector endpoint and drives the per-record run loop. Infrastructure
//! crates implement the [`RecordSource`] and [`EvidenceSink`] traits defined
//! here; they never add formatting or wire-format rules.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** No network I/O happens here. The
//! only filesystem effect is the optional local mirror written by
//! [`report::build_document`].
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`RecordId`, `UploadId`, `RunId`, `BoundaryToken`) |
//! | [`types`] | Timestamps, collected date, documents, upload result |
//! | [`records`] | GitHub and Jira record models |
//! | [`errors`] | Stage errors and [`PipelineError`] |
//! | [`report`] | CSV and spreadsheet renderers, local mirror |
//! | [`multipart`] | `multipart/form-data` encoder |
//! | [`ports`] | [`RecordSource`] and [`EvidenceSink`] |
//! | [`run`] | Sequential run loop and [`RunStage`] |

pub mod errors;
pub mod identifiers;
pub mod multipart;
pub mod ports;
pub mod records;
pub mod report;
pub mod run;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use errors::{EncodingError, FormatError, LocalPersistError, PipelineError, SourceFetchError, UploadError};
pub use identifiers::{BoundaryToken, RecordId, RunId, UploadId};
pub use multipart::MultipartBody;
pub use ports::{EvidenceSink, RecordSource};
pub use records::{
    GitHubBranchRef, GitHubComment, GitHubLink, GitHubPullRequest, GitHubPullRequestLinks,
    GitHubRepository, GitHubReview, GitHubUser, IssueQueryEvidence, JiraFields, JiraIssue,
    JiraNamed, JiraSearchResponse, JiraUser, PullRequestEvidence, SourceRecord,
};
pub use report::ReportOptions;
pub use run::{run, FailedRecord, FailurePolicy, RunOptions, RunStage, RunSummary, UploadedRecord};
pub use types::{
    CollectedDate, DocumentKind, EvidenceDocument, SourceTimestamp, UploadResult,
    CANONICAL_TIMESTAMP_FORMAT,
};
