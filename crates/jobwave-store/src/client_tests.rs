//! Tests for Firestore client functionality.
//!
//! HTTP behaviour is exercised against a wiremock server in emulator mode,
//! which skips OAuth.

use std::time::Duration;

use serde_json::json;
use serial_test::serial;
use wiremock::matchers::{body_partial_json, header, method, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use jobwave_models::DocumentId;

use crate::client::{FirestoreClient, FirestoreConfig};
use crate::error::StoreError;
use crate::store::{DocumentStore, FieldFilter, Fields, WriteOutcome};

// =============================================================================
// Test Helpers
// =============================================================================

const DOC_PREFIX: &str = "projects/test-project/databases/(default)/documents";

async fn emulator_client(server: &MockServer) -> FirestoreClient {
    let config = FirestoreConfig {
        project_id: "test-project".to_string(),
        database_id: "(default)".to_string(),
        timeout: Duration::from_secs(5),
        connect_timeout: Duration::from_secs(2),
        emulator_host: Some(server.address().to_string()),
    };
    FirestoreClient::new(config).await.unwrap()
}

fn doc_json(collection: &str, id: &str, fields: serde_json::Value) -> serde_json::Value {
    json!({
        "name": format!("{}/{}/{}", DOC_PREFIX, collection, id),
        "fields": fields,
        "createTime": "2024-01-01T00:00:00Z",
        "updateTime": "2024-01-01T00:00:00Z"
    })
}

fn fields(v: serde_json::Value) -> Fields {
    v.as_object().cloned().unwrap()
}

fn id(raw: &str) -> DocumentId {
    DocumentId::parse(raw).unwrap()
}

// =============================================================================
// Error Type Tests
// =============================================================================

#[test]
fn test_error_from_http_status() {
    assert!(matches!(
        StoreError::from_http_status(401, "expired"),
        StoreError::AuthError(_)
    ));
    assert!(matches!(
        StoreError::from_http_status(403, "denied"),
        StoreError::PermissionDenied(_)
    ));
    assert!(matches!(
        StoreError::from_http_status(404, "missing"),
        StoreError::NotFound(_)
    ));
    assert!(matches!(
        StoreError::from_http_status(409, "conflict"),
        StoreError::AlreadyExists(_)
    ));
    assert!(matches!(
        StoreError::from_http_status(503, "unavailable"),
        StoreError::ServerError(503, _)
    ));
    assert!(matches!(
        StoreError::from_http_status(400, "bad request"),
        StoreError::RequestFailed(_)
    ));
}

#[test]
fn test_precondition_detection() {
    assert!(StoreError::from_http_status(404, "No document to update").is_precondition_failed());
    assert!(
        StoreError::from_http_status(400, r#"{"status": "FAILED_PRECONDITION"}"#)
            .is_precondition_failed()
    );
    assert!(!StoreError::from_http_status(400, "INVALID_ARGUMENT").is_precondition_failed());
    assert!(!StoreError::from_http_status(500, "boom").is_precondition_failed());
}

// =============================================================================
// Document Operations
// =============================================================================

#[tokio::test]
async fn test_insert_returns_server_assigned_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex(r"/documents/jobs$"))
        .and(header("authorization", "Bearer owner"))
        .and(body_partial_json(json!({
            "fields": {"title": {"stringValue": "Engineer"}}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(doc_json(
            "jobs",
            "abc123",
            json!({"title": {"stringValue": "Engineer"}}),
        )))
        .expect(1)
        .mount(&server)
        .await;

    let client = emulator_client(&server).await;
    let new_id = client
        .insert("jobs", fields(json!({"title": "Engineer"})))
        .await
        .unwrap();
    assert_eq!(new_id.as_str(), "abc123");
}

#[tokio::test]
async fn test_get_missing_document_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(r"/documents/jobs/nope$"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": {"code": 404, "status": "NOT_FOUND"}
        })))
        .mount(&server)
        .await;

    let client = emulator_client(&server).await;
    assert!(client.get("jobs", &id("nope")).await.unwrap().is_none());
}

#[tokio::test]
async fn test_get_decodes_fields() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(r"/documents/jobs/j1$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(doc_json(
            "jobs",
            "j1",
            json!({
                "title": {"stringValue": "Engineer"},
                "openings": {"integerValue": "3"},
                "remote": {"booleanValue": true}
            }),
        )))
        .mount(&server)
        .await;

    let client = emulator_client(&server).await;
    let doc = client.get("jobs", &id("j1")).await.unwrap().unwrap();
    assert_eq!(doc.id.as_str(), "j1");
    assert_eq!(doc.fields["title"], json!("Engineer"));
    assert_eq!(doc.fields["openings"], json!(3));
    assert_eq!(doc.fields["remote"], json!(true));
}

#[tokio::test]
async fn test_server_error_is_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .expect(1)
        .mount(&server)
        .await;

    let client = emulator_client(&server).await;
    let err = client.get("jobs", &id("j1")).await.unwrap_err();
    assert!(matches!(err, StoreError::ServerError(503, _)));
}

// =============================================================================
// Queries
// =============================================================================

#[tokio::test]
async fn test_find_with_equal_filter() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex(r"/documents:runQuery$"))
        .and(body_partial_json(json!({
            "structuredQuery": {
                "from": [{"collectionId": "jobs"}],
                "where": {"fieldFilter": {
                    "field": {"fieldPath": "hr_email"},
                    "op": "EQUAL",
                    "value": {"stringValue": "hr@acme.com"}
                }}
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"document": doc_json("jobs", "j1", json!({"hr_email": {"stringValue": "hr@acme.com"}})),
             "readTime": "2024-01-01T00:00:00Z"},
            {"document": doc_json("jobs", "j2", json!({"hr_email": {"stringValue": "hr@acme.com"}})),
             "readTime": "2024-01-01T00:00:00Z"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let client = emulator_client(&server).await;
    let docs = client
        .find("jobs", Some(FieldFilter::equal("hr_email", "hr@acme.com")))
        .await
        .unwrap();
    let ids: Vec<_> = docs.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, vec!["j1", "j2"]);
}

#[tokio::test]
async fn test_find_empty_result_has_only_read_time() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex(r"/documents:runQuery$"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{"readTime": "2024-01-01T00:00:00Z"}])),
        )
        .mount(&server)
        .await;

    let client = emulator_client(&server).await;
    assert!(client.find("applications", None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_in_filter_is_split_into_chunks_of_thirty() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex(r"/documents:runQuery$"))
        .and(body_partial_json(json!({
            "structuredQuery": {"where": {"fieldFilter": {"op": "IN"}}}
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{"readTime": "2024-01-01T00:00:00Z"}])),
        )
        .expect(2)
        .mount(&server)
        .await;

    let client = emulator_client(&server).await;
    let values = (0..45).map(|n| json!(format!("job{}", n))).collect();
    client
        .find("applications", Some(FieldFilter::any_of("jobId", values)))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_get_many_uses_batch_get_and_skips_missing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex(r"/documents:batchGet$"))
        .and(body_partial_json(json!({
            "documents": [
                format!("{}/jobs/j1", DOC_PREFIX),
                format!("{}/jobs/gone", DOC_PREFIX)
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"found": doc_json("jobs", "j1", json!({"title": {"stringValue": "Engineer"}})),
             "readTime": "2024-01-01T00:00:00Z"},
            {"missing": format!("{}/jobs/gone", DOC_PREFIX),
             "readTime": "2024-01-01T00:00:00Z"}
        ])))
        .mount(&server)
        .await;

    let client = emulator_client(&server).await;
    let docs = client
        .get_many("jobs", &[id("j1"), id("gone")])
        .await
        .unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].id.as_str(), "j1");
}

// =============================================================================
// Writes
// =============================================================================

#[tokio::test]
async fn test_set_fields_patches_with_mask_and_precondition() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(r"/documents/applications/a1$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(doc_json(
            "applications",
            "a1",
            json!({"status": {"stringValue": "pending"}}),
        )))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path_regex(r"/documents/applications/a1$"))
        .and(query_param("updateMask.fieldPaths", "status"))
        .and(query_param("currentDocument.exists", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(doc_json(
            "applications",
            "a1",
            json!({"status": {"stringValue": "accepted"}}),
        )))
        .expect(1)
        .mount(&server)
        .await;

    let client = emulator_client(&server).await;
    let outcome = client
        .set_fields("applications", &id("a1"), fields(json!({"status": "accepted"})))
        .await
        .unwrap();
    assert_eq!(
        outcome,
        WriteOutcome {
            matched: true,
            modified: true
        }
    );
}

#[tokio::test]
async fn test_set_fields_same_value_does_not_patch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(r"/documents/applications/a1$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(doc_json(
            "applications",
            "a1",
            json!({"status": {"stringValue": "accepted"}}),
        )))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = emulator_client(&server).await;
    let outcome = client
        .set_fields("applications", &id("a1"), fields(json!({"status": "accepted"})))
        .await
        .unwrap();
    assert_eq!(
        outcome,
        WriteOutcome {
            matched: true,
            modified: false
        }
    );
}

#[tokio::test]
async fn test_set_fields_on_missing_document_is_unmatched() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = emulator_client(&server).await;
    let outcome = client
        .set_fields("applications", &id("missing"), fields(json!({"status": "accepted"})))
        .await
        .unwrap();
    assert_eq!(outcome, WriteOutcome::UNMATCHED);
}

#[tokio::test]
async fn test_delete_reports_existence() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path_regex(r"/documents/applications/a1$"))
        .and(query_param("currentDocument.exists", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path_regex(r"/documents/applications/gone$"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": {"code": 404, "message": "No document to update", "status": "NOT_FOUND"}
        })))
        .mount(&server)
        .await;

    let client = emulator_client(&server).await;
    assert!(client.delete("applications", &id("a1")).await.unwrap());
    assert!(!client.delete("applications", &id("gone")).await.unwrap());
}

#[tokio::test]
async fn test_ping_treats_missing_health_document_as_ok() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(r"/documents/_health/_check$"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = emulator_client(&server).await;
    client.ping().await.unwrap();
}

#[tokio::test]
async fn test_ping_fails_on_permission_denied() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403).set_body_string("PERMISSION_DENIED"))
        .mount(&server)
        .await;

    let client = emulator_client(&server).await;
    let err = client.ping().await.unwrap_err();
    assert!(matches!(err, StoreError::PermissionDenied(_)));
}

// =============================================================================
// Config Tests
// =============================================================================

#[test]
#[serial]
fn test_config_validates_empty_project_id() {
    std::env::set_var("GCP_PROJECT_ID", "");
    std::env::remove_var("FIREBASE_PROJECT_ID");
    let result = FirestoreConfig::from_env();
    assert!(matches!(result, Err(StoreError::Config(_))));
}

#[test]
#[serial]
fn test_config_accepts_firebase_project_id() {
    std::env::remove_var("GCP_PROJECT_ID");
    std::env::set_var("FIREBASE_PROJECT_ID", "firebase-project");
    let config = FirestoreConfig::from_env().unwrap();
    assert_eq!(config.project_id, "firebase-project");
}

#[test]
#[serial]
fn test_config_prefers_gcp_project_id() {
    std::env::set_var("GCP_PROJECT_ID", "gcp-project");
    std::env::set_var("FIREBASE_PROJECT_ID", "firebase-project");
    let config = FirestoreConfig::from_env().unwrap();
    assert_eq!(config.project_id, "gcp-project");
}

#[test]
#[serial]
fn test_config_defaults() {
    std::env::set_var("GCP_PROJECT_ID", "test");
    std::env::remove_var("FIRESTORE_CONNECT_TIMEOUT_SECS");
    std::env::remove_var("FIRESTORE_DATABASE_ID");
    std::env::remove_var("FIRESTORE_EMULATOR_HOST");
    let config = FirestoreConfig::from_env().unwrap();
    assert_eq!(config.connect_timeout, Duration::from_secs(5));
    assert_eq!(config.database_id, "(default)");
    assert!(config.emulator_host.is_none());
}

#[test]
#[serial]
fn test_config_reads_emulator_host() {
    std::env::set_var("GCP_PROJECT_ID", "test");
    std::env::set_var("FIRESTORE_EMULATOR_HOST", "localhost:8080");
    let config = FirestoreConfig::from_env().unwrap();
    std::env::remove_var("FIRESTORE_EMULATOR_HOST");
    assert_eq!(config.emulator_host.as_deref(), Some("localhost:8080"));
}

#[test]
#[serial]
fn test_config_handles_invalid_env_values() {
    std::env::set_var("GCP_PROJECT_ID", "test");
    std::env::set_var("FIRESTORE_CONNECT_TIMEOUT_SECS", "not-a-number");
    let config = FirestoreConfig::from_env().unwrap();
    std::env::remove_var("FIRESTORE_CONNECT_TIMEOUT_SECS");
    assert_eq!(config.connect_timeout, Duration::from_secs(5));
}
