//! Firestore REST API client.
//!
//! Production client with:
//! - Service account auth with token caching, or unauthenticated emulator mode
//! - HTTP client tuning (pooling, timeouts)
//! - Observability (tracing spans, metrics)
//!
//! Requests are single attempts. The only re-send is after an expired OAuth
//! token is refreshed.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use gcp_auth::{CustomServiceAccount, TokenProvider};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use tracing::{debug, info_span, Instrument};

use jobwave_models::DocumentId;

use crate::error::{StoreError, StoreResult};
use crate::metrics::{record_documents_returned, record_request};
use crate::store::{self, DocumentStore, Fields, StoredDocument, WriteOutcome};
use crate::token_cache::TokenCache;
use crate::types::{
    fields_from_firestore, fields_to_firestore, ArrayValue, BatchGetDocumentsRequest,
    BatchGetDocumentsResponse, CollectionSelector, Document, FieldFilter as WireFilter,
    FieldReference, Filter, RunQueryRequest, RunQueryResponse, StructuredQuery, Value,
};

/// Maximum number of values in a Firestore `IN` filter.
pub const MAX_IN_FILTER_VALUES: usize = 30;

/// Maximum number of documents in one `batchGet` call.
pub const MAX_BATCH_GET_DOCUMENTS: usize = 100;

/// Bearer token the emulator accepts for admin access.
const EMULATOR_TOKEN: &str = "owner";

// =============================================================================
// Configuration
// =============================================================================

/// Firestore client configuration.
#[derive(Debug, Clone)]
pub struct FirestoreConfig {
    /// GCP project ID
    pub project_id: String,
    /// Database ID (usually "(default)")
    pub database_id: String,
    /// Request timeout
    pub timeout: Duration,
    /// Connect timeout
    pub connect_timeout: Duration,
    /// `host:port` of a Firestore emulator; disables OAuth when set
    pub emulator_host: Option<String>,
}

impl FirestoreConfig {
    /// Create config from environment variables.
    pub fn from_env() -> StoreResult<Self> {
        let project_id = std::env::var("GCP_PROJECT_ID")
            .or_else(|_| std::env::var("FIREBASE_PROJECT_ID"))
            .map_err(|_| {
                StoreError::config(
                    "GCP_PROJECT_ID or FIREBASE_PROJECT_ID must be set to access Firestore",
                )
            })?;

        if project_id.is_empty() {
            return Err(StoreError::config(
                "GCP_PROJECT_ID or FIREBASE_PROJECT_ID cannot be empty",
            ));
        }

        let connect_timeout_secs: u64 = std::env::var("FIRESTORE_CONNECT_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(5);

        Ok(Self {
            project_id,
            database_id: std::env::var("FIRESTORE_DATABASE_ID")
                .unwrap_or_else(|_| "(default)".to_string()),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(connect_timeout_secs),
            emulator_host: std::env::var("FIRESTORE_EMULATOR_HOST")
                .ok()
                .filter(|h| !h.is_empty()),
        })
    }

    /// Root URL of the database's documents.
    fn base_url(&self) -> String {
        match &self.emulator_host {
            Some(host) => format!(
                "http://{}/v1/projects/{}/databases/{}/documents",
                host, self.project_id, self.database_id
            ),
            None => format!(
                "https://firestore.googleapis.com/v1/projects/{}/databases/{}/documents",
                self.project_id, self.database_id
            ),
        }
    }
}

// =============================================================================
// Client
// =============================================================================

#[derive(Clone)]
enum Credentials {
    ServiceAccount(Arc<TokenCache>),
    Emulator,
}

/// Firestore REST API client.
#[derive(Clone)]
pub struct FirestoreClient {
    http: Client,
    config: FirestoreConfig,
    base_url: String,
    credentials: Credentials,
}

impl FirestoreClient {
    /// Create a new Firestore client.
    pub async fn new(config: FirestoreConfig) -> StoreResult<Self> {
        let credentials = if config.emulator_host.is_some() {
            Credentials::Emulator
        } else {
            Credentials::ServiceAccount(Arc::new(TokenCache::new(Self::create_auth_provider()?)))
        };

        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .user_agent(concat!("jobwave-store/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(StoreError::Network)?;

        let base_url = config.base_url();

        Ok(Self {
            http,
            config,
            base_url,
            credentials,
        })
    }

    fn create_auth_provider() -> StoreResult<Arc<dyn TokenProvider>> {
        let service_account = CustomServiceAccount::from_env().map_err(|e| {
            StoreError::auth_error(format!("Failed to load service account: {}", e))
        })?;

        match service_account {
            Some(sa) => Ok(Arc::new(sa)),
            None => Err(StoreError::auth_error(
                "GOOGLE_APPLICATION_CREDENTIALS not set. \
                 Set it to the path of your service account JSON file, \
                 or set FIRESTORE_EMULATOR_HOST for local development.",
            )),
        }
    }

    /// Create from environment variables.
    pub async fn from_env() -> StoreResult<Self> {
        let config = FirestoreConfig::from_env()?;
        Self::new(config).await
    }

    pub fn config(&self) -> &FirestoreConfig {
        &self.config
    }

    async fn bearer_token(&self) -> StoreResult<String> {
        match &self.credentials {
            Credentials::ServiceAccount(cache) => cache.get_token().await,
            Credentials::Emulator => Ok(EMULATOR_TOKEN.to_string()),
        }
    }

    fn is_access_token_expired(body: &str) -> bool {
        body.contains("ACCESS_TOKEN_EXPIRED") || body.contains("\"UNAUTHENTICATED\"")
    }

    /// Send a request built by `build`, refreshing the OAuth token once if
    /// Firestore reports it expired.
    async fn send<F>(&self, build: F) -> StoreResult<Response>
    where
        F: Fn(&str) -> RequestBuilder,
    {
        let token = self.bearer_token().await?;
        let response = build(&token).send().await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        let Credentials::ServiceAccount(cache) = &self.credentials else {
            return Ok(response);
        };

        let body = response.text().await.unwrap_or_default();
        if !Self::is_access_token_expired(&body) {
            return Err(StoreError::from_http_status(401, body));
        }

        debug!("Firestore access token expired, refreshing");
        cache.invalidate().await;
        let token = cache.get_token().await?;
        Ok(build(&token).send().await?)
    }

    fn document_url(&self, collection: &str, doc_id: &str) -> String {
        format!("{}/{}/{}", self.base_url, collection, doc_id)
    }

    /// Full resource name, as used by batch operations.
    pub fn full_document_name(&self, collection: &str, doc_id: &str) -> String {
        format!(
            "projects/{}/databases/{}/documents/{}/{}",
            self.config.project_id, self.config.database_id, collection, doc_id
        )
    }

    // =========================================================================
    // CRUD Operations
    // =========================================================================

    /// Get a document.
    pub async fn get_document(
        &self,
        collection: &str,
        doc_id: &str,
    ) -> StoreResult<Option<Document>> {
        let url = self.document_url(collection, doc_id);

        self.execute_request("get_document", collection, Some(doc_id), async {
            let response = self.send(|token| self.http.get(&url).bearer_auth(token)).await?;

            match response.status() {
                StatusCode::OK => Ok(Some(response.json::<Document>().await?)),
                StatusCode::NOT_FOUND => Ok(None),
                status => Err(Self::error_from_response(status, &url, response).await),
            }
        })
        .await
    }

    /// Create a document with a Firestore-assigned ID.
    pub async fn create_document(
        &self,
        collection: &str,
        fields: HashMap<String, Value>,
    ) -> StoreResult<Document> {
        let url = format!("{}/{}", self.base_url, collection);
        let body = Document::new(fields);

        self.execute_request("create_document", collection, None, async {
            let response = self
                .send(|token| self.http.post(&url).bearer_auth(token).json(&body))
                .await?;

            match response.status() {
                StatusCode::OK | StatusCode::CREATED => Ok(response.json::<Document>().await?),
                status => Err(Self::error_from_response(status, &url, response).await),
            }
        })
        .await
    }

    /// Patch the masked fields of an existing document.
    ///
    /// Returns `false` when the document does not exist; nothing is created.
    pub async fn patch_existing_document(
        &self,
        collection: &str,
        doc_id: &str,
        fields: HashMap<String, Value>,
        update_mask: &[String],
    ) -> StoreResult<bool> {
        let mut params: Vec<String> = update_mask
            .iter()
            .map(|f| format!("updateMask.fieldPaths={}", urlencoding::encode(f)))
            .collect();
        params.push("currentDocument.exists=true".to_string());
        let url = format!(
            "{}?{}",
            self.document_url(collection, doc_id),
            params.join("&")
        );
        let body = Document::new(fields);

        self.execute_request("patch_document", collection, Some(doc_id), async {
            let response = self
                .send(|token| self.http.patch(&url).bearer_auth(token).json(&body))
                .await?;

            match response.status() {
                StatusCode::OK => Ok(true),
                status => {
                    let err = Self::error_from_response(status, &url, response).await;
                    if err.is_precondition_failed() {
                        Ok(false)
                    } else {
                        Err(err)
                    }
                }
            }
        })
        .await
    }

    /// Delete an existing document.
    ///
    /// Returns `false` when there was nothing to delete.
    pub async fn delete_existing_document(
        &self,
        collection: &str,
        doc_id: &str,
    ) -> StoreResult<bool> {
        let url = format!(
            "{}?currentDocument.exists=true",
            self.document_url(collection, doc_id)
        );

        self.execute_request("delete_document", collection, Some(doc_id), async {
            let response = self
                .send(|token| self.http.delete(&url).bearer_auth(token))
                .await?;

            match response.status() {
                StatusCode::OK | StatusCode::NO_CONTENT => Ok(true),
                status => {
                    let err = Self::error_from_response(status, &url, response).await;
                    if err.is_precondition_failed() {
                        debug!("Document {}/{} did not exist", collection, doc_id);
                        Ok(false)
                    } else {
                        Err(err)
                    }
                }
            }
        })
        .await
    }

    /// Batch get documents using `documents:batchGet`.
    ///
    /// Missing documents are omitted; order follows the Firestore response.
    pub async fn batch_get_documents(
        &self,
        full_document_names: Vec<String>,
    ) -> StoreResult<Vec<Document>> {
        if full_document_names.is_empty() {
            return Ok(vec![]);
        }
        if full_document_names.len() > MAX_BATCH_GET_DOCUMENTS {
            return Err(StoreError::request_failed(format!(
                "Batch get exceeds {} document limit",
                MAX_BATCH_GET_DOCUMENTS
            )));
        }

        let url = format!("{}:batchGet", self.base_url);
        let request = BatchGetDocumentsRequest {
            documents: full_document_names,
        };

        self.execute_request("batch_get_documents", "batch", None, async {
            let response = self
                .send(|token| self.http.post(&url).bearer_auth(token).json(&request))
                .await?;

            match response.status() {
                StatusCode::OK => {
                    let body = response.text().await.unwrap_or_default();
                    let responses: Vec<BatchGetDocumentsResponse> = serde_json::from_str(&body)
                        .map_err(|e| {
                            StoreError::invalid_response(format!(
                                "Failed to parse batchGet response: {} (body prefix: {})",
                                e,
                                body_prefix(&body)
                            ))
                        })?;
                    Ok(responses.into_iter().filter_map(|r| r.found).collect())
                }
                status => Err(Self::error_from_response(status, &url, response).await),
            }
        })
        .await
    }

    // =========================================================================
    // Query Operations
    // =========================================================================

    /// Run a structured query against the database root.
    pub async fn run_query(&self, query: StructuredQuery) -> StoreResult<Vec<Document>> {
        let url = format!("{}:runQuery", self.base_url);
        let collection = query
            .from
            .first()
            .map(|c| c.collection_id.clone())
            .unwrap_or_default();
        let request = RunQueryRequest {
            structured_query: query,
        };

        self.execute_request("run_query", &collection, None, async {
            let response = self
                .send(|token| self.http.post(&url).bearer_auth(token).json(&request))
                .await?;

            match response.status() {
                StatusCode::OK => {
                    let body = response.text().await.unwrap_or_default();
                    // runQuery returns a JSON array of RunQueryResponse objects
                    let responses: Vec<RunQueryResponse> = serde_json::from_str(&body)
                        .map_err(|e| {
                            StoreError::invalid_response(format!(
                                "Failed to parse runQuery response: {} (body prefix: {})",
                                e,
                                body_prefix(&body)
                            ))
                        })?;
                    Ok(responses.into_iter().filter_map(|r| r.document).collect())
                }
                status => Err(Self::error_from_response(status, &url, response).await),
            }
        })
        .await
    }

    // =========================================================================
    // Internal Helpers
    // =========================================================================

    /// Execute a request with tracing and metrics.
    async fn execute_request<T, F>(
        &self,
        operation: &str,
        collection: &str,
        doc_id: Option<&str>,
        fut: F,
    ) -> StoreResult<T>
    where
        F: std::future::Future<Output = StoreResult<T>>,
    {
        let span = if let Some(id) = doc_id {
            info_span!("firestore_request", operation = %operation, collection = %collection, doc_id = %id)
        } else {
            info_span!("firestore_request", operation = %operation, collection = %collection)
        };

        let start = Instant::now();
        let result = fut.instrument(span).await;
        let latency_ms = start.elapsed().as_millis() as f64;

        let status = match &result {
            Ok(_) => 200,
            Err(e) => e.http_status().unwrap_or(500),
        };
        record_request(operation, status, latency_ms);

        result
    }

    async fn error_from_response(status: StatusCode, url: &str, response: Response) -> StoreError {
        let body = response.text().await.unwrap_or_default();
        StoreError::from_http_status(status.as_u16(), format!("{} failed: {}", url, body))
    }
}

fn body_prefix(body: &str) -> &str {
    let mut end = body.len().min(200);
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}

/// Convert a Firestore document into a store document.
fn into_stored(doc: Document) -> StoreResult<StoredDocument> {
    let id = doc
        .doc_id()
        .ok_or_else(|| StoreError::invalid_response("Document without a name"))
        .and_then(|raw| {
            DocumentId::parse(raw).map_err(|e| StoreError::invalid_response(e.to_string()))
        })?;
    let fields = doc
        .fields
        .as_ref()
        .map(fields_from_firestore)
        .unwrap_or_default();
    Ok(StoredDocument { id, fields })
}

fn structured_query(collection: &str, filter: Option<WireFilter>) -> StructuredQuery {
    StructuredQuery {
        from: vec![CollectionSelector {
            collection_id: collection.to_string(),
        }],
        r#where: filter.map(|field_filter| Filter { field_filter }),
    }
}

fn wire_filter(field: &str, op: &str, value: Value) -> WireFilter {
    WireFilter {
        field: FieldReference {
            field_path: field.to_string(),
        },
        op: op.to_string(),
        value,
    }
}

// =============================================================================
// DocumentStore
// =============================================================================

#[async_trait]
impl DocumentStore for FirestoreClient {
    async fn insert(&self, collection: &str, fields: Fields) -> StoreResult<DocumentId> {
        let doc = self
            .create_document(collection, fields_to_firestore(&fields))
            .await?;
        Ok(into_stored(doc)?.id)
    }

    async fn get(&self, collection: &str, id: &DocumentId) -> StoreResult<Option<StoredDocument>> {
        self.get_document(collection, id.as_str())
            .await?
            .map(into_stored)
            .transpose()
    }

    async fn get_many(
        &self,
        collection: &str,
        ids: &[DocumentId],
    ) -> StoreResult<Vec<StoredDocument>> {
        let mut found = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(MAX_BATCH_GET_DOCUMENTS) {
            let names = chunk
                .iter()
                .map(|id| self.full_document_name(collection, id.as_str()))
                .collect();
            for doc in self.batch_get_documents(names).await? {
                found.push(into_stored(doc)?);
            }
        }
        record_documents_returned(collection, found.len());
        Ok(found)
    }

    async fn find(
        &self,
        collection: &str,
        filter: Option<store::FieldFilter>,
    ) -> StoreResult<Vec<StoredDocument>> {
        let queries = match filter {
            None => vec![structured_query(collection, None)],
            Some(store::FieldFilter::Equal { field, value }) => vec![structured_query(
                collection,
                Some(wire_filter(&field, "EQUAL", Value::from(&value))),
            )],
            Some(store::FieldFilter::In { field, values }) => values
                .chunks(MAX_IN_FILTER_VALUES)
                .map(|chunk| {
                    let list = Value::ArrayValue(ArrayValue {
                        values: Some(chunk.iter().map(Value::from).collect()),
                    });
                    structured_query(collection, Some(wire_filter(&field, "IN", list)))
                })
                .collect(),
        };

        let mut docs = Vec::new();
        for query in queries {
            for doc in self.run_query(query).await? {
                docs.push(into_stored(doc)?);
            }
        }
        record_documents_returned(collection, docs.len());
        Ok(docs)
    }

    async fn set_fields(
        &self,
        collection: &str,
        id: &DocumentId,
        fields: Fields,
    ) -> StoreResult<WriteOutcome> {
        let Some(current) = self.get(collection, id).await? else {
            return Ok(WriteOutcome::UNMATCHED);
        };

        let modified = fields
            .iter()
            .any(|(key, value)| current.fields.get(key) != Some(value));
        if !modified {
            return Ok(WriteOutcome {
                matched: true,
                modified: false,
            });
        }

        let mask: Vec<String> = fields.keys().cloned().collect();
        let patched = self
            .patch_existing_document(collection, id.as_str(), fields_to_firestore(&fields), &mask)
            .await?;

        // The document can disappear between the read and the patch.
        Ok(if patched {
            WriteOutcome {
                matched: true,
                modified: true,
            }
        } else {
            WriteOutcome::UNMATCHED
        })
    }

    async fn delete(&self, collection: &str, id: &DocumentId) -> StoreResult<bool> {
        self.delete_existing_document(collection, id.as_str()).await
    }

    async fn ping(&self) -> StoreResult<()> {
        // Any answer other than an error proves connectivity and credentials.
        self.get_document("_health", "_check").await.map(|_| ())
    }
}
