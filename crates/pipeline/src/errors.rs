//! Error types for the evidence pipeline.
//!
//! Each stage of a record run has its own error type so callers can tell a
//! formatting defect in source data apart from a transport failure.
//! [`PipelineError`] wraps all of them and reports the [`RunStage`] that
//! failed.
//!
//! [`LocalPersistError`] is the exception: it is produced when the optional
//! local mirror cannot be written, is logged, and never reaches a caller.

use std::path::PathBuf;

use thiserror::Error;

use crate::RunStage;

// ---------------------------------------------------------------------------
// Stage errors
// ---------------------------------------------------------------------------

/// Failure while retrieving records from a source system.
#[derive(Debug, Error)]
pub enum SourceFetchError {
    /// The request could not be sent or the connection failed mid-response.
    #[error("Request to {url} failed: {message}")]
    Transport {
        /// The URL that was requested.
        url: String,
        /// Transport-level description.
        message: String,
    },

    /// The source system answered with a non-success status.
    #[error("Request to {url} returned status {status}")]
    Status {
        /// The URL that was requested.
        url: String,
        /// The HTTP status code received.
        status: u16,
    },

    /// The response body did not match the expected record shape.
    #[error("Response from {url} could not be decoded: {message}")]
    Decode {
        /// The URL that was requested.
        url: String,
        /// Decoder description.
        message: String,
    },

    /// A URL could not be built from configuration or record links.
    #[error("Invalid source URL '{url}': {message}")]
    InvalidUrl {
        /// The offending URL text.
        url: String,
        /// Parser description.
        message: String,
    },
}

/// Malformed or missing data while building an evidence document.
#[derive(Debug, Error)]
pub enum FormatError {
    /// A required field was absent or `null`.
    #[error("Required field '{field}' is missing")]
    MissingField {
        /// Dotted path of the field (e.g. `"merged_by.login"`).
        field: String,
    },

    /// A timestamp did not match the expected input pattern.
    #[error("Field '{field}' has unparsable timestamp '{value}' (expected {expected})")]
    InvalidTimestamp {
        /// Dotted path of the field.
        field: String,
        /// The raw value received.
        value: String,
        /// Human-readable description of the accepted pattern.
        expected: &'static str,
    },

    /// The spreadsheet writer rejected the workbook.
    #[error("Spreadsheet could not be packaged: {message}")]
    Spreadsheet {
        /// Writer description.
        message: String,
    },
}

impl FormatError {
    /// Shorthand for [`FormatError::MissingField`].
    pub fn missing(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }
}

impl From<rust_xlsxwriter::XlsxError> for FormatError {
    fn from(err: rust_xlsxwriter::XlsxError) -> Self {
        Self::Spreadsheet {
            message: err.to_string(),
        }
    }
}

/// Failure while assembling a multipart body.
#[derive(Debug, Error)]
pub enum EncodingError {
    /// Writing into the body buffer failed.
    #[error("Multipart body could not be written: {0}")]
    Write(#[from] std::io::Error),
}

/// Failure while uploading to the collector endpoint.
#[derive(Debug, Error)]
pub enum UploadError {
    /// The request could not be sent or the response could not be read.
    #[error("Upload request failed: {message}")]
    Transport {
        /// Transport-level description.
        message: String,
    },

    /// The endpoint answered with anything other than `201 Created`.
    #[error("Server returned non-OK status: {status}")]
    UnexpectedStatus {
        /// The HTTP status code received.
        status: u16,
        /// Leading part of the response body, for diagnostics only.
        body_snippet: String,
    },

    /// The endpoint answered `201` but the body was not a valid upload result.
    #[error("Upload response (status {status}) could not be decoded: {message}")]
    MalformedResponse {
        /// The HTTP status code received.
        status: u16,
        /// Decoder description.
        message: String,
    },
}

impl UploadError {
    /// Returns the HTTP status carried by this error, if one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport { .. } => None,
            Self::UnexpectedStatus { status, .. } | Self::MalformedResponse { status, .. } => {
                Some(*status)
            }
        }
    }
}

/// The local mirror of a report could not be written.
///
/// Logged at `warn` by the report builders; never returned to a caller.
#[derive(Debug, Error)]
#[error("Could not write local copy to {}: {source}", .path.display())]
pub struct LocalPersistError {
    /// The file that was being written.
    pub path: PathBuf,
    /// Underlying I/O failure.
    #[source]
    pub source: std::io::Error,
}

// ---------------------------------------------------------------------------
// Pipeline-level error
// ---------------------------------------------------------------------------

/// A fatal failure of one record run (or of discovery).
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Discovering or fetching records failed.
    #[error(transparent)]
    SourceFetch(#[from] SourceFetchError),

    /// Building the evidence document failed.
    #[error(transparent)]
    Format(#[from] FormatError),

    /// Assembling the multipart body failed.
    #[error(transparent)]
    Encoding(#[from] EncodingError),

    /// Uploading to the collector endpoint failed.
    #[error(transparent)]
    Upload(#[from] UploadError),
}

impl PipelineError {
    /// The stage that was active when this error was raised.
    pub fn stage(&self) -> RunStage {
        match self {
            Self::SourceFetch(_) => RunStage::Fetching,
            Self::Format(_) => RunStage::Building,
            Self::Encoding(_) => RunStage::Encoding,
            Self::Upload(_) => RunStage::Uploading,
        }
    }
}
