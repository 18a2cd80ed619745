//! In-memory document store.
//!
//! Used for local runs without Firestore (`STORE_BACKEND=memory`) and by the
//! API tests. Documents keep insertion order, which stands in for the
//! store-native order of a real database.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use jobwave_models::DocumentId;

use crate::error::StoreResult;
use crate::store::{DocumentStore, FieldFilter, Fields, StoredDocument, WriteOutcome};

/// Thread-safe in-memory store.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Vec<StoredDocument>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents in a collection.
    pub async fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map_or(0, Vec::len)
    }

    pub async fn is_empty(&self, collection: &str) -> bool {
        self.len(collection).await == 0
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert(&self, collection: &str, fields: Fields) -> StoreResult<DocumentId> {
        let id = DocumentId::generate();
        let mut collections = self.collections.write().await;
        collections
            .entry(collection.to_string())
            .or_default()
            .push(StoredDocument {
                id: id.clone(),
                fields,
            });
        debug!(collection = %collection, doc_id = %id, "Inserted document");
        Ok(id)
    }

    async fn get(&self, collection: &str, id: &DocumentId) -> StoreResult<Option<StoredDocument>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| &d.id == id))
            .cloned())
    }

    async fn get_many(
        &self,
        collection: &str,
        ids: &[DocumentId],
    ) -> StoreResult<Vec<StoredDocument>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|d| ids.contains(&d.id))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn find(
        &self,
        collection: &str,
        filter: Option<FieldFilter>,
    ) -> StoreResult<Vec<StoredDocument>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|d| filter.as_ref().map_or(true, |f| f.matches(&d.fields)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn set_fields(
        &self,
        collection: &str,
        id: &DocumentId,
        fields: Fields,
    ) -> StoreResult<WriteOutcome> {
        let mut collections = self.collections.write().await;
        let Some(doc) = collections
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|d| &d.id == id))
        else {
            return Ok(WriteOutcome::UNMATCHED);
        };

        let mut modified = false;
        for (key, value) in fields {
            if doc.fields.get(&key) != Some(&value) {
                doc.fields.insert(key, value);
                modified = true;
            }
        }
        Ok(WriteOutcome {
            matched: true,
            modified,
        })
    }

    async fn delete(&self, collection: &str, id: &DocumentId) -> StoreResult<bool> {
        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(false);
        };
        let before = docs.len();
        docs.retain(|d| &d.id != id);
        Ok(docs.len() < before)
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}
