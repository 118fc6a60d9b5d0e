//! Shared value types for the evidence pipeline.
//!
//! Unlike the newtype identifiers in [`crate::identifiers`], these types carry
//! values with invariants: timestamps have already been validated against an
//! input pattern, documents are immutable once built.

use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::{FormatError, RecordId, UploadId};

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// Output pattern for every timestamp written into a CSV report
/// (`yyyy-MM-dd'T'HH:mm:ssZ`, numeric offset such as `+0000`).
pub const CANONICAL_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%z";

/// Top-level record timestamps: UTC with a literal `Z`, whole seconds.
const UTC_INPUT_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Sub-record timestamps: optional fraction, numeric offset.
const OFFSET_INPUT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f%z";

/// Output pattern for spreadsheet cells.
const SHEET_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A source timestamp that has been parsed and can be rendered canonically.
///
/// Keeps the offset it was received with; rendering never converts zones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceTimestamp(DateTime<FixedOffset>);

impl SourceTimestamp {
    /// Parses a top-level timestamp (`2021-04-01T09:30:00Z`).
    pub fn parse_utc(field: &str, raw: &str) -> Result<Self, FormatError> {
        NaiveDateTime::parse_from_str(raw, UTC_INPUT_FORMAT)
            .map(|naive| Self(DateTime::<FixedOffset>::from(naive.and_utc())))
            .map_err(|_| invalid(field, raw, "yyyy-MM-ddTHH:mm:ssZ"))
    }

    /// Parses a sub-record timestamp carrying a numeric offset
    /// (`2021-04-01T09:30:00-0700`, `2021-04-01T09:30:00.000+0000`).
    ///
    /// A trailing `Z` is accepted as `+0000`.
    pub fn parse_with_offset(field: &str, raw: &str) -> Result<Self, FormatError> {
        let normalized = match raw.strip_suffix('Z') {
            Some(head) => format!("{head}+0000"),
            None => raw.to_owned(),
        };
        DateTime::parse_from_str(&normalized, OFFSET_INPUT_FORMAT)
            .map(Self)
            .map_err(|_| invalid(field, raw, "yyyy-MM-ddTHH:mm:ss[.fff]+HHMM"))
    }

    /// Parses a value previously produced by [`SourceTimestamp::to_canonical`].
    pub fn parse_canonical(field: &str, raw: &str) -> Result<Self, FormatError> {
        DateTime::parse_from_str(raw, CANONICAL_TIMESTAMP_FORMAT)
            .map(Self)
            .map_err(|_| invalid(field, raw, "yyyy-MM-ddTHH:mm:ss+HHMM"))
    }

    /// Renders with [`CANONICAL_TIMESTAMP_FORMAT`].
    pub fn to_canonical(self) -> String {
        self.0.format(CANONICAL_TIMESTAMP_FORMAT).to_string()
    }

    /// Renders as `yyyy-MM-dd HH:mm:ss` in the original offset.
    pub fn to_sheet_cell(self) -> String {
        self.0.format(SHEET_TIMESTAMP_FORMAT).to_string()
    }
}

fn invalid(field: &str, raw: &str, expected: &'static str) -> FormatError {
    FormatError::InvalidTimestamp {
        field: field.to_owned(),
        value: raw.to_owned(),
        expected,
    }
}

// ---------------------------------------------------------------------------

/// The `collected` date sent alongside every upload (`yyyy-MM-dd`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CollectedDate(NaiveDate);

impl CollectedDate {
    /// Today's date in the local time zone.
    pub fn today() -> Self {
        Self(Local::now().date_naive())
    }

    /// Wraps an explicit date.
    pub fn from_date(date: NaiveDate) -> Self {
        Self(date)
    }
}

impl std::fmt::Display for CollectedDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

// ---------------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------------

/// Packaging of an [`EvidenceDocument`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    /// Comma-separated text, UTF-8.
    Csv,
    /// Office Open XML workbook.
    Spreadsheet,
}

impl DocumentKind {
    /// File extension without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Spreadsheet => "xlsx",
        }
    }

    /// File name announced in the multipart `file` part.
    pub fn upload_file_name(self) -> &'static str {
        match self {
            Self::Csv => "evidence.csv",
            Self::Spreadsheet => "evidence.xlsx",
        }
    }
}

/// A fully rendered report, ready to be encoded once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvidenceDocument {
    kind: DocumentKind,
    prefix: &'static str,
    record_id: RecordId,
    bytes: Vec<u8>,
}

impl EvidenceDocument {
    /// Wraps rendered bytes.
    ///
    /// `prefix` and `record_id` name the local mirror: `<prefix>-<record_id>.<ext>`.
    pub fn new(kind: DocumentKind, prefix: &'static str, record_id: RecordId, bytes: Vec<u8>) -> Self {
        Self {
            kind,
            prefix,
            record_id,
            bytes,
        }
    }

    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    pub fn record_id(&self) -> &RecordId {
        &self.record_id
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// File name of the local mirror.
    pub fn local_file_name(&self) -> String {
        format!("{}-{}.{}", self.prefix, self.record_id, self.kind.extension())
    }
}

// ---------------------------------------------------------------------------
// Upload outcome
// ---------------------------------------------------------------------------

/// Parsed `201 Created` body from the collector endpoint.
///
/// Fields beyond `id` are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResult {
    /// Identifier the collector assigned to the stored evidence.
    pub id: UploadId,
}
