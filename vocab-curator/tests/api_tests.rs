//! Integration tests for vocab-curator API endpoints
//!
//! Tests cover:
//! - Health endpoint
//! - Schema lookup and reload
//! - Curation runs (including error status codes)
//! - Review queue listing and resolution
//! - Corrections log

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{json, Value};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tower::util::ServiceExt; // for `oneshot` method
use vocab_common::config::TomlConfig;
use vocab_common::schema::parse_jsonld;
use vocab_curator::schema_provider::JsonLdSchemaProvider;
use vocab_curator::{build_router, AppState};

const MODEL: &str = r#"{"@graph": [
    {"@id": "bts:tumorType", "sms:displayName": "tumorType",
     "schema:rangeIncludes": [
        {"@id": "bts:Schwannoma"}, {"@id": "bts:Fibroma"}, {"@id": "bts:Neurofibroma"}
     ]},
    {"@id": "bts:Schwannoma", "sms:displayName": "Schwannoma"},
    {"@id": "bts:Fibroma", "sms:displayName": "Fibroma"},
    {"@id": "bts:Neurofibroma", "sms:displayName": "Neurofibroma"}
]}"#;

/// Test helper: in-memory database with a small biospecimen table
async fn setup_test_db() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("Should open in-memory database");

    vocab_curator::db::init_tables(&pool).await.unwrap();

    sqlx::query("CREATE TABLE biospecimen (specimenID TEXT, tumorType TEXT)")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query(
        "INSERT INTO biospecimen VALUES ('S1', 'Schwanoma'), ('S2', 'Melanoma'), ('S3', 'Fibroma')",
    )
    .execute(&pool)
    .await
    .unwrap();

    pool
}

/// Test helper: app over an in-memory schema snapshot
async fn setup_app() -> axum::Router {
    let schema = JsonLdSchemaProvider::from_catalog(parse_jsonld(MODEL).unwrap());
    let state = AppState::new(setup_test_db().await, schema, TomlConfig::default());
    build_router(state)
}

fn test_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Test helper: Extract JSON body from response
async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

async fn send(app: &axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    (status, extract_json(response.into_body()).await)
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let app = setup_app().await;
    let (status, body) = send(&app, test_request("GET", "/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "vocab-curator");
    assert!(body["version"].is_string());
    assert_eq!(body["schema_attributes"], 1);
}

// =============================================================================
// Schema
// =============================================================================

#[tokio::test]
async fn test_valid_values_lookup() {
    let app = setup_app().await;

    let (status, body) = send(&app, test_request("GET", "/api/schema/TUMORTYPE")).await;
    assert_eq!(status, StatusCode::OK);
    let labels: Vec<&str> = body["values"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["label"].as_str().unwrap())
        .collect();
    assert_eq!(labels, vec!["Schwannoma", "Fibroma", "Neurofibroma"]);

    let (status, body) = send(&app, test_request("GET", "/api/schema/diagnosis")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_reload_without_file_conflicts() {
    let app = setup_app().await;
    let (status, _) = send(&app, test_request("POST", "/api/schema/reload")).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_reload_picks_up_file_changes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.jsonld");
    std::fs::write(&path, MODEL).unwrap();

    let schema = JsonLdSchemaProvider::load(&path).await.unwrap();
    let state = AppState::new(setup_test_db().await, schema, TomlConfig::default());
    let app = build_router(state);

    std::fs::write(
        &path,
        r#"{"@graph": [
            {"@id": "bts:assay", "sms:validationRules": ["rnaSeq", "wgs"]},
            {"@id": "bts:sex", "sms:validationRules": ["female", "male"]}
        ]}"#,
    )
    .unwrap();

    let (status, body) = send(&app, test_request("POST", "/api/schema/reload")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["attributes"], 2);

    let (status, _) = send(&app, test_request("GET", "/api/schema/assay")).await;
    assert_eq!(status, StatusCode::OK);

    // A broken file keeps the previous snapshot
    std::fs::write(&path, "not json").unwrap();
    let (status, body) = send(&app, test_request("POST", "/api/schema/reload")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["code"], "COMMON_ERROR");
    let (status, _) = send(&app, test_request("GET", "/api/schema/sex")).await;
    assert_eq!(status, StatusCode::OK);
}

// =============================================================================
// Curation runs
// =============================================================================

#[tokio::test]
async fn test_curation_run_report() {
    let app = setup_app().await;
    let (status, body) = send(
        &app,
        json_request("POST", "/api/curation/run", json!({"table": "biospecimen"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["table"], "biospecimen");
    assert_eq!(body["dry_run"], false);

    let columns = body["columns"].as_array().unwrap();
    let tumor = columns.iter().find(|c| c["column"] == "tumorType").unwrap();
    assert_eq!(tumor["status"], "evaluated");
    assert_eq!(tumor["accepted"], 1);
    assert_eq!(tumor["escalated"], 1);
    assert_eq!(tumor["applied"], 1);

    let records = body["records"].as_array().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["row_index"], 1);
    assert_eq!(records[0]["selected_value"], "Schwannoma");
    assert_eq!(records[0]["disposition"], "auto_accept");
}

#[tokio::test]
async fn test_curation_run_errors() {
    let app = setup_app().await;

    let (status, _) = send(
        &app,
        json_request("POST", "/api/curation/run", json!({"table": "  "})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        json_request("POST", "/api/curation/run", json!({"table": "missing"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"]["message"].is_string());

    let (status, _) = send(
        &app,
        json_request("POST", "/api/curation/run", json!({"table": "bio-specimen"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// =============================================================================
// Reviews and corrections log
// =============================================================================

#[tokio::test]
async fn test_review_lifecycle() {
    let app = setup_app().await;
    send(
        &app,
        json_request("POST", "/api/curation/run", json!({"table": "biospecimen"})),
    )
    .await;

    let (status, body) = send(&app, test_request("GET", "/api/reviews")).await;
    assert_eq!(status, StatusCode::OK);
    let pending = body.as_array().unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0]["original_value"], "Melanoma");
    let id = pending[0]["id"].as_str().unwrap().to_string();

    let uri = format!("/api/reviews/{}", id);
    let (status, body) = send(
        &app,
        json_request("POST", &uri, json!({"action": "replace", "value": "Neurofibroma"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "replaced");
    assert_eq!(body["resolved_value"], "Neurofibroma");

    let (status, _) = send(&app, json_request("POST", &uri, json!({"action": "accept"}))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, body) = send(&app, test_request("GET", "/api/reviews")).await;
    assert!(body.as_array().unwrap().is_empty());
    let (_, body) = send(&app, test_request("GET", "/api/reviews?status=all")).await;
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, body) = send(&app, test_request("GET", "/api/corrections/log?table=biospecimen")).await;
    assert_eq!(status, StatusCode::OK);
    let entries = body.as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["disposition"], "review_replace");
    assert_eq!(entries[0]["selected_value"], "Neurofibroma");
    assert_eq!(entries[1]["disposition"], "auto_accept");
}

#[tokio::test]
async fn test_review_bad_requests() {
    let app = setup_app().await;

    let (status, _) = send(&app, test_request("GET", "/api/reviews?status=bogus")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        json_request("POST", "/api/reviews/not-a-uuid", json!({"action": "accept"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let unknown = format!("/api/reviews/{}", uuid::Uuid::new_v4());
    let (status, _) = send(&app, json_request("POST", &unknown, json!({"action": "reject"}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_corrections_log_limit_bounds() {
    let app = setup_app().await;

    let (status, body) = send(&app, test_request("GET", "/api/corrections/log")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().unwrap().is_empty());

    let (status, _) = send(&app, test_request("GET", "/api/corrections/log?limit=0")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_corrections_export() {
    let app = setup_app().await;
    send(
        &app,
        json_request("POST", "/api/curation/run", json!({"table": "biospecimen"})),
    )
    .await;

    let response = app
        .clone()
        .oneshot(test_request("GET", "/api/corrections/export?table=biospecimen"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "application/json");

    let body = extract_json(response.into_body()).await;
    let records = body.as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["row_index"], 1);
    assert_eq!(records[0]["selected_value"], "Schwannoma");
    assert_eq!(records[0]["suggested_values"][0], records[0]["selected_value"]);
    assert!(records[0].get("disposition").is_none());
}
