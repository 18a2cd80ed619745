//! Document store abstraction.
//!
//! Repositories talk to the store only through [`DocumentStore`], which keeps
//! the job/application logic independent of the backing database. Documents
//! are schemaless JSON objects keyed by a store-assigned [`DocumentId`].

use async_trait::async_trait;
use serde_json::{Map, Value};

use jobwave_models::DocumentId;

use crate::error::StoreResult;

/// Document fields as a JSON object.
pub type Fields = Map<String, Value>;

/// A document read back from the store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: DocumentId,
    pub fields: Fields,
}

/// Single-field query filter.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldFilter {
    /// `field == value`
    Equal { field: String, value: Value },
    /// `field` equals any of `values`
    In { field: String, values: Vec<Value> },
}

impl FieldFilter {
    pub fn equal(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Equal {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn any_of(field: impl Into<String>, values: Vec<Value>) -> Self {
        Self::In {
            field: field.into(),
            values,
        }
    }

    /// Evaluate the filter against a document's fields.
    pub fn matches(&self, fields: &Fields) -> bool {
        match self {
            FieldFilter::Equal { field, value } => fields.get(field) == Some(value),
            FieldFilter::In { field, values } => fields
                .get(field)
                .is_some_and(|actual| values.contains(actual)),
        }
    }
}

/// Outcome of a partial update of one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOutcome {
    /// The document existed.
    pub matched: bool,
    /// At least one field value changed.
    pub modified: bool,
}

impl WriteOutcome {
    pub const UNMATCHED: WriteOutcome = WriteOutcome {
        matched: false,
        modified: false,
    };
}

/// Create/read/update/delete/query over named collections.
///
/// Every call is a single round trip attempt (or a bounded batch of them for
/// `get_many` and `In` filters); failures are returned to the caller as-is.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert a document and return its store-assigned identifier.
    async fn insert(&self, collection: &str, fields: Fields) -> StoreResult<DocumentId>;

    /// Fetch one document, `None` when absent.
    async fn get(&self, collection: &str, id: &DocumentId) -> StoreResult<Option<StoredDocument>>;

    /// Fetch several documents by identifier. Missing ones are omitted and the
    /// result order is unspecified.
    async fn get_many(
        &self,
        collection: &str,
        ids: &[DocumentId],
    ) -> StoreResult<Vec<StoredDocument>>;

    /// Query a collection, optionally filtered, in store-native order.
    async fn find(
        &self,
        collection: &str,
        filter: Option<FieldFilter>,
    ) -> StoreResult<Vec<StoredDocument>>;

    /// Set the given fields on an existing document, leaving others untouched.
    async fn set_fields(
        &self,
        collection: &str,
        id: &DocumentId,
        fields: Fields,
    ) -> StoreResult<WriteOutcome>;

    /// Delete a document. Returns whether it existed.
    async fn delete(&self, collection: &str, id: &DocumentId) -> StoreResult<bool>;

    /// Round trip to the store to check connectivity.
    async fn ping(&self) -> StoreResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(v: Value) -> Fields {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn test_equal_filter() {
        let f = FieldFilter::equal("hr_email", "hr@acme.com");
        assert!(f.matches(&fields(json!({"hr_email": "hr@acme.com"}))));
        assert!(!f.matches(&fields(json!({"hr_email": "HR@acme.com"}))));
        assert!(!f.matches(&fields(json!({}))));
    }

    #[test]
    fn test_in_filter() {
        let f = FieldFilter::any_of("jobId", vec![json!("a"), json!("b")]);
        assert!(f.matches(&fields(json!({"jobId": "b"}))));
        assert!(!f.matches(&fields(json!({"jobId": "c"}))));
    }
}
