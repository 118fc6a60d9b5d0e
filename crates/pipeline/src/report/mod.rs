//! Report assembly: turns a [`SourceRecord`] into an [`EvidenceDocument`].
//!
//! | Record | Renderer | Document |
//! |--------|----------|----------|
//! | [`SourceRecord::PullRequest`] | [`pull_request`] | CSV, one per pull request |
//! | [`SourceRecord::IssueQuery`] | [`issue_sheet`] | two-sheet workbook per query |
//!
//! Building is all-or-nothing: a malformed timestamp or missing required
//! field fails the whole report. The optional local mirror is the only side
//! effect and its failure is logged, never returned.

pub mod issue_sheet;
pub mod pull_request;

use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};
use tracing::{debug, warn};

use crate::{EvidenceDocument, FormatError, LocalPersistError, SourceRecord};

/// Settings shared by every renderer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportOptions {
    /// Directory receiving a copy of each document. `None` disables the mirror.
    pub local_output_dir: Option<PathBuf>,
}

impl ReportOptions {
    /// The mirror directory, if set to a non-empty path.
    pub fn mirror_dir(&self) -> Option<&Path> {
        self.local_output_dir
            .as_deref()
            .filter(|dir| !dir.as_os_str().is_empty())
    }
}

/// Renders `record` and mirrors it to [`ReportOptions::local_output_dir`].
pub fn build_document(record: &SourceRecord, options: &ReportOptions) -> Result<EvidenceDocument, FormatError> {
    build_document_at(record, options, Local::now().naive_local())
}

/// [`build_document`] with an explicit generation time (local wall clock).
pub fn build_document_at(
    record: &SourceRecord,
    options: &ReportOptions,
    generated_at: NaiveDateTime,
) -> Result<EvidenceDocument, FormatError> {
    let document = match record {
        SourceRecord::PullRequest(evidence) => pull_request::render(evidence)?,
        SourceRecord::IssueQuery(evidence) => issue_sheet::render(evidence, generated_at)?,
    };
    debug!(
        record_id = %document.record_id(),
        kind = ?document.kind(),
        bytes = document.bytes().len(),
        "Evidence document built"
    );

    if let Some(dir) = options.mirror_dir() {
        match mirror_locally(&document, dir) {
            Ok(path) => debug!(path = %path.display(), "Local copy written"),
            Err(err) => warn!(error = %err, "Local copy skipped"),
        }
    }

    Ok(document)
}

/// Writes the exact document bytes to `<dir>/<prefix>-<id>.<ext>`.
pub fn mirror_locally(document: &EvidenceDocument, dir: &Path) -> Result<PathBuf, LocalPersistError> {
    let path = dir.join(document.local_file_name());
    std::fs::write(&path, document.bytes()).map_err(|source| LocalPersistError {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}
