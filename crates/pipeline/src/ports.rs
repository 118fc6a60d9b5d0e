//! Port traits implemented by the infrastructure crates.
//!
//! The run loop in [`crate::run`] only sees these traits; HTTP details,
//! authentication and URL layout live in the `github`, `jira` and
//! `collector` crates.

use async_trait::async_trait;

use crate::{MultipartBody, SourceFetchError, SourceRecord, UploadError, UploadResult};

/// A system evidence records are pulled from.
///
/// A run first calls [`RecordSource::discover`] once, then
/// [`RecordSource::fetch`] for each returned handle, one at a time.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Cheap reference to one record, resolved later by `fetch`.
    type Handle: Send + Sync;

    /// Lists the records to process in this run (single page, no pagination).
    async fn discover(&self) -> Result<Vec<Self::Handle>, SourceFetchError>;

    /// Retrieves everything needed to build one report.
    async fn fetch(&self, handle: &Self::Handle) -> Result<SourceRecord, SourceFetchError>;

    /// Short label for logs and the run summary.
    fn describe(&self, handle: &Self::Handle) -> String;
}

/// The collector endpoint evidence documents are uploaded to.
#[async_trait]
pub trait EvidenceSink: Send + Sync {
    /// Posts one encoded body. Only `201 Created` counts as success.
    async fn upload(&self, body: MultipartBody) -> Result<UploadResult, UploadError>;
}
