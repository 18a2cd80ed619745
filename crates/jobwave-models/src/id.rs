//! Store-assigned document identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Maximum accepted identifier length.
pub const MAX_ID_LENGTH: usize = 64;

/// Length of identifiers generated locally (matches Firestore auto-IDs).
const GENERATED_ID_LENGTH: usize = 20;

/// Error returned when a string is not a well-formed document identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid document id: {0:?}")]
pub struct InvalidDocumentId(pub String);

/// Opaque identifier of a stored document.
///
/// Well-formed identifiers are 1 to 64 characters from `[A-Za-z0-9_-]`.
/// Anything else is rejected before it reaches the store, so path segments
/// can never address a nested collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocumentId(String);

impl DocumentId {
    /// Parse and validate an identifier.
    pub fn parse(s: impl Into<String>) -> Result<Self, InvalidDocumentId> {
        let s = s.into();
        if is_valid_document_id(&s) {
            Ok(Self(s))
        } else {
            Err(InvalidDocumentId(s))
        }
    }

    /// Generate a new random identifier.
    pub fn generate() -> Self {
        let mut raw = Uuid::new_v4().simple().to_string();
        raw.truncate(GENERATED_ID_LENGTH);
        Self(raw)
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Check whether a string is a well-formed document identifier.
pub fn is_valid_document_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_ID_LENGTH
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for DocumentId {
    type Error = InvalidDocumentId;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(s)
    }
}

impl From<DocumentId> for String {
    fn from(id: DocumentId) -> Self {
        id.0
    }
}

impl AsRef<str> for DocumentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_firestore_auto_ids() {
        let id = DocumentId::parse("a1B2c3D4e5F6g7H8i9J0").unwrap();
        assert_eq!(id.as_str(), "a1B2c3D4e5F6g7H8i9J0");
    }

    #[test]
    fn test_parse_accepts_mongo_style_hex() {
        assert!(DocumentId::parse("665f1c2e9b1e8a3d4c5b6a79").is_ok());
    }

    #[test]
    fn test_parse_accepts_dashes_and_underscores() {
        assert!(DocumentId::parse("seed-job_01").is_ok());
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(DocumentId::parse("").is_err());
        assert!(DocumentId::parse("has/slash").is_err());
        assert!(DocumentId::parse("has.dot").is_err());
        assert!(DocumentId::parse("has space").is_err());
        assert!(DocumentId::parse("../etc").is_err());
        assert!(DocumentId::parse("x".repeat(65)).is_err());
    }

    #[test]
    fn test_generate_is_well_formed_and_unique() {
        let a = DocumentId::generate();
        let b = DocumentId::generate();
        assert_eq!(a.as_str().len(), 20);
        assert!(is_valid_document_id(a.as_str()));
        assert_ne!(a, b);
    }

    #[test]
    fn test_serde_validates() {
        let id: DocumentId = serde_json::from_str("\"abc123\"").unwrap();
        assert_eq!(id.to_string(), "abc123");
        assert!(serde_json::from_str::<DocumentId>("\"not valid\"").is_err());
    }
}
