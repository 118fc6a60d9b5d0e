//! `multipart/form-data` body for the collector endpoint.
//!
//! The receiving server expects exactly two parts, in this order:
//!
//! 1. `collected`: the collection date, `yyyy-MM-dd`.
//! 2. `file`: the evidence document, announced as `application/octet-stream`.
//!
//! Every line, including the one after the file payload and the closing
//! delimiter, ends in CRLF.

use std::io::Write;

use crate::{BoundaryToken, CollectedDate, EncodingError, EvidenceDocument};

const CRLF: &[u8] = b"\r\n";
const FILE_CONTENT_TYPE: &str = "application/octet-stream; charset=utf-8";

/// An encoded request body together with its boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartBody {
    boundary: BoundaryToken,
    bytes: Vec<u8>,
}

impl MultipartBody {
    pub fn boundary(&self) -> &BoundaryToken {
        &self.boundary
    }

    /// Value for the request `Content-Type` header.
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Consumes the body, returning the raw bytes for the request payload.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Encodes `document` with a freshly generated boundary.
pub fn encode(collected: CollectedDate, document: &EvidenceDocument) -> Result<MultipartBody, EncodingError> {
    encode_with_boundary(BoundaryToken::generate(), &collected.to_string(), document)
}

/// Encodes with a caller-chosen boundary and `collected` text.
pub fn encode_with_boundary(
    boundary: BoundaryToken,
    collected: &str,
    document: &EvidenceDocument,
) -> Result<MultipartBody, EncodingError> {
    let file_name = document.kind().upload_file_name();
    let payload = document.bytes();
    let mut out = Vec::with_capacity(payload.len() + 256 + 3 * boundary.as_str().len());

    write!(out, "--{boundary}")?;
    out.write_all(CRLF)?;
    write!(out, "Content-Disposition: form-data; name=\"collected\"")?;
    out.write_all(CRLF)?;
    out.write_all(CRLF)?;
    out.write_all(collected.as_bytes())?;
    out.write_all(CRLF)?;

    write!(out, "--{boundary}")?;
    out.write_all(CRLF)?;
    write!(out, "Content-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"")?;
    out.write_all(CRLF)?;
    write!(out, "Content-Type: {FILE_CONTENT_TYPE}")?;
    out.write_all(CRLF)?;
    out.write_all(CRLF)?;
    out.write_all(payload)?;
    out.write_all(CRLF)?;

    write!(out, "--{boundary}--")?;
    out.write_all(CRLF)?;

    Ok(MultipartBody { boundary, bytes: out })
}

/// Size of everything in a body except the `collected` text and the payload.
pub fn framing_len(boundary: &BoundaryToken, file_name: &str) -> usize {
    let b = boundary.as_str().len();
    let crlf = CRLF.len();
    let delimiter = 2 + b + crlf;
    let collected_headers = "Content-Disposition: form-data; name=\"collected\"".len() + crlf + crlf;
    let file_headers = "Content-Disposition: form-data; name=\"file\"; filename=\"\"".len()
        + file_name.len()
        + crlf
        + "Content-Type: ".len()
        + FILE_CONTENT_TYPE.len()
        + crlf
        + crlf;
    let close = 2 + b + 2 + crlf;
    delimiter + collected_headers + crlf + delimiter + file_headers + crlf + close
}
