//! Newtype domain identifiers.
//!
//! Every identity that crosses a component boundary is a distinct newtype so a
//! source record identifier can never be passed where a server-assigned upload
//! identifier is expected, even though both are strings on the wire.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Macro for String-wrapped newtypes.
// Generates: struct, new() returning Option<Self>, as_str(), Display.
// ---------------------------------------------------------------------------
macro_rules! string_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier, returning `None` if the value is empty.
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let v = value.into();
                if v.is_empty() { None } else { Some(Self(v)) }
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Identifiers: String-backed
// ---------------------------------------------------------------------------

string_id! {
    /// Identifies the primary record an evidence document was built from.
    ///
    /// For pull requests this is the GitHub `node_id`; for a Jira query report
    /// it is the generation timestamp (`yyyyMMddHHmmss`). Used in local mirror
    /// file names and log fields.
    RecordId
}

string_id! {
    /// Identifier assigned by the collector endpoint to an accepted upload.
    UploadId
}

// ---------------------------------------------------------------------------
// Identifiers: UUID-backed (internally generated)
// ---------------------------------------------------------------------------

/// Identifies a single pipeline run (one CLI invocation over every record).
///
/// Propagated through spans so all activity from a single run can be correlated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(Uuid);

impl RunId {
    /// Generates a new random run identifier.
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Delimiter separating the parts of a multipart body.
///
/// A hyphenated v4 UUID: 122 random bits, so a collision with payload text is
/// not expected. Payloads are never scanned for the token.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BoundaryToken(String);

impl BoundaryToken {
    /// Generates a fresh random boundary.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Wraps an explicit token.
    ///
    /// Returns `None` unless the value is 1 to 70 characters drawn from
    /// ASCII letters, digits, and `'()+_,-./:=?`.
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let v = value.into();
        let allowed = |c: char| c.is_ascii_alphanumeric() || "'()+_,-./:=?".contains(c);
        if (1..=70).contains(&v.len()) && v.chars().all(allowed) {
            Some(Self(v))
        } else {
            None
        }
    }

    /// Returns the token as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BoundaryToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
