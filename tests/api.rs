//! Integration tests for the HTTP API.
//!
//! Each test binds a real Axum server on a free port, backed by a throwaway
//! SQLite database, and drives it with `reqwest`. The vision model is a
//! scripted fake except in the end-to-end test, which points the OpenAI
//! backend at a local mock chat-completions server.

use anyhow::{bail, Result};
use async_trait::async_trait;
use axum::{routing::post, Json, Router};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::net::TcpListener;

use visionaid::config::Config;
use visionaid::server::{self, AppState};
use visionaid::sqlite_store::SqliteStore;
use visionaid::{db, migrate};
use visionaid_core::models::{
    EmergencyLogEntry, NewEmergencyLog, NewScanLog, ProfileUpdate, ScanKind, ScanLogEntry,
    UserProfile,
};
use visionaid_core::store::seed_user;
use visionaid_core::{AnalysisFailure, DataUri, Store, VisionModel};

const BODY_LIMIT: usize = 10 * 1024 * 1024;

// ─── Test Model ─────────────────────────────────────────────────────

/// Answers every prompt with the same reply and counts calls.
struct ScriptedModel {
    reply: Option<String>,
    calls: AtomicUsize,
}

impl ScriptedModel {
    fn answering(text: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Some(text.to_string()),
            calls: AtomicUsize::new(0),
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            reply: None,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VisionModel for ScriptedModel {
    fn model_name(&self) -> &str {
        "scripted"
    }

    async fn analyze(&self, _image: &DataUri, _prompt: &str) -> Result<String, AnalysisFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.reply
            .clone()
            .ok_or_else(|| AnalysisFailure::new("upstream unavailable"))
    }
}

// ─── Test Store ─────────────────────────────────────────────────────

/// A store whose every operation fails.
struct BrokenStore;

#[async_trait]
impl Store for BrokenStore {
    async fn get_user(&self) -> Result<Option<UserProfile>> {
        bail!("disk I/O error")
    }
    async fn upsert_user(&self, _update: &ProfileUpdate) -> Result<UserProfile> {
        bail!("disk I/O error")
    }
    async fn create_scan_log(&self, _entry: &NewScanLog) -> Result<ScanLogEntry> {
        bail!("disk I/O error")
    }
    async fn list_scan_logs(&self, _limit: usize) -> Result<Vec<ScanLogEntry>> {
        bail!("disk I/O error")
    }
    async fn create_emergency_log(&self, _log: &NewEmergencyLog) -> Result<EmergencyLogEntry> {
        bail!("disk I/O error")
    }
    async fn list_emergency_logs(&self, _limit: usize) -> Result<Vec<EmergencyLogEntry>> {
        bail!("disk I/O error")
    }
}

// ─── Helpers ────────────────────────────────────────────────────────

async fn sqlite_store(tmp: &TempDir) -> Arc<SqliteStore> {
    let pool = db::connect_path(&tmp.path().join("visionaid.sqlite"))
        .await
        .unwrap();
    migrate::apply_schema(&pool).await.unwrap();
    Arc::new(SqliteStore::new(pool))
}

/// Serve `state` on a free port and return the base URL.
async fn spawn_app(state: AppState, max_body_bytes: usize) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        server::serve(listener, state, max_body_bytes).await.unwrap();
    });
    wait_for_server(port).await;
    format!("http://127.0.0.1:{}", port)
}

async fn wait_for_server(port: u16) {
    let client = reqwest::Client::new();
    let url = format!("http://127.0.0.1:{}/health", port);
    for _ in 0..50 {
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        if let Ok(resp) = client.get(&url).send().await {
            if resp.status().is_success() {
                return;
            }
        }
    }
    panic!("Server did not become ready within 5 seconds");
}

async fn post_json(base: &str, path: &str, body: Value) -> (u16, Value) {
    let resp = reqwest::Client::new()
        .post(format!("{}{}", base, path))
        .json(&body)
        .send()
        .await
        .unwrap();
    let status = resp.status().as_u16();
    (status, resp.json().await.unwrap_or(Value::Null))
}

async fn get_json(base: &str, path: &str) -> (u16, Value) {
    let resp = reqwest::get(format!("{}{}", base, path)).await.unwrap();
    let status = resp.status().as_u16();
    (status, resp.json().await.unwrap_or(Value::Null))
}

// ─── Scans ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_empty_image_is_rejected_without_model_call() {
    let tmp = TempDir::new().unwrap();
    let store = sqlite_store(&tmp).await;
    let model = ScriptedModel::answering(r#"{"objects":[]}"#);
    let base = spawn_app(AppState::new(store.clone(), model.clone()), BODY_LIMIT).await;

    let (status, body) = post_json(&base, "/api/detect-object", json!({"image": ""})).await;
    assert_eq!(status, 400);
    assert_eq!(body, json!({"message": "Image required"}));

    let (status, _) = post_json(&base, "/api/read-text", json!({})).await;
    assert_eq!(status, 400);

    let resp = reqwest::Client::new()
        .post(format!("{}/api/detect-currency", base))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);

    assert_eq!(model.calls(), 0);
    assert!(store.list_scan_logs(50).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_read_text_strips_fences_and_logs() {
    let tmp = TempDir::new().unwrap();
    let store = sqlite_store(&tmp).await;
    let model = ScriptedModel::answering("```json\n{\"text\":\"STOP\"}\n```");
    let base = spawn_app(AppState::new(store.clone(), model), BODY_LIMIT).await;

    let (status, body) = post_json(&base, "/api/read-text", json!({"image": "aGVsbG8="})).await;
    assert_eq!(status, 200);
    assert_eq!(body, json!({"text": "STOP"}));

    let (status, history) = get_json(&base, "/api/scan-history").await;
    assert_eq!(status, 200);
    let history = history.as_array().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["type"], "text");
    assert_eq!(history[0]["result"], "STOP");
    assert_eq!(history[0]["confidence"], Value::Null);
    assert!(history[0]["timestamp"].is_string());
}

#[tokio::test]
async fn test_detect_object_degrades_prose_answer() {
    let tmp = TempDir::new().unwrap();
    let store = sqlite_store(&tmp).await;
    let model = ScriptedModel::answering("I see a red chair");
    let base = spawn_app(AppState::new(store, model), BODY_LIMIT).await;

    let (status, body) =
        post_json(&base, "/api/detect-object", json!({"image": "/9j/4AAQ"})).await;
    assert_eq!(status, 200);
    assert_eq!(
        body,
        json!({"objects": [{"name": "I see a red chair", "confidence": 0}]})
    );
}

#[tokio::test]
async fn test_detect_currency_logs_value_and_code() {
    let tmp = TempDir::new().unwrap();
    let store = sqlite_store(&tmp).await;
    let model = ScriptedModel::answering(r#"{"value":500,"currency":"INR"}"#);
    let base = spawn_app(AppState::new(store.clone(), model), BODY_LIMIT).await;

    let (status, body) = post_json(
        &base,
        "/api/detect-currency",
        json!({"image": "data:image/png;base64,aGVsbG8="}),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body, json!({"value": 500, "currency": "INR"}));

    let logs = store.list_scan_logs(50).await.unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].kind, ScanKind::Currency);
    assert_eq!(logs[0].result, "500 INR");
}

#[tokio::test]
async fn test_zero_currency_and_empty_objects_not_logged() {
    let tmp = TempDir::new().unwrap();
    let store = sqlite_store(&tmp).await;

    let base = spawn_app(
        AppState::new(store.clone(), ScriptedModel::answering(r#"{"value":0,"currency":"Unknown"}"#)),
        BODY_LIMIT,
    )
    .await;
    let (status, _) = post_json(&base, "/api/detect-currency", json!({"image": "x"})).await;
    assert_eq!(status, 200);

    let base = spawn_app(
        AppState::new(store.clone(), ScriptedModel::answering(r#"{"objects":[]}"#)),
        BODY_LIMIT,
    )
    .await;
    let (status, body) = post_json(&base, "/api/detect-object", json!({"image": "x"})).await;
    assert_eq!(status, 200);
    assert_eq!(body, json!({"objects": []}));

    assert!(store.list_scan_logs(50).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_model_failure_is_500_without_log() {
    let tmp = TempDir::new().unwrap();
    let store = sqlite_store(&tmp).await;
    let model = ScriptedModel::failing();
    let base = spawn_app(AppState::new(store.clone(), model.clone()), BODY_LIMIT).await;

    let (status, body) = post_json(&base, "/api/read-text", json!({"image": "aGVsbG8="})).await;
    assert_eq!(status, 500);
    assert_eq!(body, json!({"message": "Failed to read text"}));

    let (status, body) =
        post_json(&base, "/api/detect-object", json!({"image": "aGVsbG8="})).await;
    assert_eq!(status, 500);
    assert_eq!(body, json!({"message": "Failed to detect objects"}));

    // One call per request, no retry.
    assert_eq!(model.calls(), 2);
    assert!(store.list_scan_logs(50).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_log_write_failure_keeps_200() {
    let model = ScriptedModel::answering(r#"{"objects":[{"name":"door","confidence":88}]}"#);
    let base = spawn_app(AppState::new(Arc::new(BrokenStore), model), BODY_LIMIT).await;

    let (status, body) = post_json(&base, "/api/detect-object", json!({"image": "x"})).await;
    assert_eq!(status, 200);
    assert_eq!(body["objects"][0]["name"], "door");

    let (status, body) = get_json(&base, "/api/scan-history").await;
    assert_eq!(status, 500);
    assert_eq!(body["message"], "Failed to fetch scan history");
}

// ─── History ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_history_is_capped_and_newest_first() {
    let tmp = TempDir::new().unwrap();
    let store = sqlite_store(&tmp).await;
    for i in 0..55 {
        store
            .create_scan_log(&NewScanLog {
                kind: ScanKind::Object,
                result: format!("item {}", i),
                confidence: Some(90),
            })
            .await
            .unwrap();
    }
    let base = spawn_app(
        AppState::new(store, ScriptedModel::answering("")),
        BODY_LIMIT,
    )
    .await;

    let (_, history) = get_json(&base, "/api/scan-history").await;
    let history = history.as_array().unwrap();
    assert_eq!(history.len(), 50);
    assert_eq!(history[0]["result"], "item 54");
    let ids: Vec<i64> = history.iter().map(|e| e["id"].as_i64().unwrap()).collect();
    assert!(ids.windows(2).all(|w| w[0] > w[1]));

    let (_, history) = get_json(&base, "/api/scan-history?limit=500").await;
    assert_eq!(history.as_array().unwrap().len(), 50);

    let (_, history) = get_json(&base, "/api/scan-history?limit=3").await;
    assert_eq!(history.as_array().unwrap().len(), 3);
}

// ─── Profile ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_profile_missing_then_saved() {
    let tmp = TempDir::new().unwrap();
    let store = sqlite_store(&tmp).await;
    let base = spawn_app(
        AppState::new(store.clone(), ScriptedModel::answering("")),
        BODY_LIMIT,
    )
    .await;

    let (status, body) = get_json(&base, "/api/user/profile").await;
    assert_eq!(status, 404);
    assert_eq!(body, json!({"message": "User not found"}));

    let (status, body) = post_json(
        &base,
        "/api/user/profile",
        json!({
            "name": "Asha",
            "emergencyContact": "+91 98765 43210",
            "preferences": {"highContrast": true, "voiceSpeed": 1.5}
        }),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["id"], 1);
    assert_eq!(body["language"], "en");
    assert_eq!(body["preferences"]["voiceSpeed"], 1.5);

    let (status, body) = post_json(
        &base,
        "/api/user/profile",
        json!({"name": "Asha R", "emergencyContact": "112", "language": "hi"}),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["name"], "Asha R");

    let (_, body) = get_json(&base, "/api/user/profile").await;
    assert_eq!(body["name"], "Asha R");
    assert_eq!(body["language"], "hi");

    let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(store.pool())
        .await
        .unwrap();
    assert_eq!(rows, 1);
}

#[tokio::test]
async fn test_profile_validation_errors() {
    let tmp = TempDir::new().unwrap();
    let store = sqlite_store(&tmp).await;
    seed_user(store.as_ref()).await.unwrap();
    let base = spawn_app(
        AppState::new(store.clone(), ScriptedModel::answering("")),
        BODY_LIMIT,
    )
    .await;

    let (status, body) = post_json(
        &base,
        "/api/user/profile",
        json!({"name": "  ", "emergencyContact": ""}),
    )
    .await;
    assert_eq!(status, 400);
    assert_eq!(body, json!({"message": "Invalid user data", "field": "name"}));

    let (status, body) = post_json(&base, "/api/user/profile", json!({"name": "Asha"})).await;
    assert_eq!(status, 400);
    assert_eq!(body, json!({"message": "Invalid user data"}));

    // The seeded profile is untouched.
    let (status, body) = get_json(&base, "/api/user/profile").await;
    assert_eq!(status, 200);
    assert_eq!(body["name"], "User");
}

// ─── Emergency ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_emergency_trigger_logs_and_returns_dial_uri() {
    let tmp = TempDir::new().unwrap();
    let store = sqlite_store(&tmp).await;
    seed_user(store.as_ref()).await.unwrap();
    let base = spawn_app(
        AppState::new(store.clone(), ScriptedModel::answering("")),
        BODY_LIMIT,
    )
    .await;

    // Seeded profile has no contact.
    let (status, body) = post_json(
        &base,
        "/api/emergency/trigger",
        json!({"status": "triggered_no_location"}),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Emergency triggered. Location logged.");
    assert!(body.get("dialUri").is_none());

    let mut update = ProfileUpdate::seed();
    update.emergency_contact = "+91 98765 43210".into();
    store.upsert_user(&update).await.unwrap();

    let (status, body) = post_json(
        &base,
        "/api/emergency/trigger",
        json!({"locationLat": "12.9716", "locationLng": "77.5946"}),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["dialUri"], "tel:+919876543210");

    let logs = store.list_emergency_logs(10).await.unwrap();
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0].status, "triggered");
    assert_eq!(logs[0].location_lat.as_deref(), Some("12.9716"));
    assert_eq!(logs[1].status, "triggered_no_location");
}

#[tokio::test]
async fn test_emergency_storage_failure_is_500() {
    let base = spawn_app(
        AppState::new(Arc::new(BrokenStore), ScriptedModel::answering("")),
        BODY_LIMIT,
    )
    .await;
    let (status, body) = post_json(&base, "/api/emergency/trigger", json!({})).await;
    assert_eq!(status, 500);
    assert_eq!(body, json!({"message": "Failed to trigger emergency"}));
}

// ─── Transport ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_cors_and_body_limit() {
    let tmp = TempDir::new().unwrap();
    let store = sqlite_store(&tmp).await;
    let base = spawn_app(
        AppState::new(store, ScriptedModel::answering(r#"{"text":""}"#)),
        1024,
    )
    .await;

    let resp = reqwest::Client::new()
        .get(format!("{}/health", base))
        .header("origin", "http://phone.local")
        .send()
        .await
        .unwrap();
    assert_eq!(
        resp.headers()
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok()),
        Some("*")
    );
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");

    let big = "A".repeat(4096);
    let resp = reqwest::Client::new()
        .post(format!("{}/api/read-text", base))
        .json(&json!({"image": big}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 413);
}

// ─── End to end ─────────────────────────────────────────────────────

fn find_free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

/// Start a chat-completions mock that always answers `content`.
async fn spawn_mock_openai(content: &'static str) -> String {
    let app = Router::new().route(
        "/v1/chat/completions",
        post(move |Json(body): Json<Value>| async move {
            assert_eq!(body["messages"][0]["content"][1]["type"], "image_url");
            Json(json!({"choices": [{"message": {"content": content}}]}))
        }),
    );
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/v1", addr)
}

#[tokio::test]
async fn test_run_server_with_openai_backend() {
    let mock = spawn_mock_openai(r#"{"objects":[{"name":"chair","confidence":95.4}]}"#).await;
    std::env::set_var("VISIONAID_TEST_API_KEY", "sk-test");

    let tmp = TempDir::new().unwrap();
    let port = find_free_port();
    let cfg: Config = toml::from_str(&format!(
        r#"
[db]
path = "{}"

[server]
bind = "127.0.0.1:{}"

[vision]
base_url = "{}"
api_key_env = "VISIONAID_TEST_API_KEY"
timeout_secs = 5
"#,
        tmp.path().join("visionaid.sqlite").display(),
        port,
        mock
    ))
    .unwrap();
    cfg.validate().unwrap();

    let server_cfg = cfg.clone();
    tokio::spawn(async move {
        server::run_server(&server_cfg).await.unwrap();
    });
    wait_for_server(port).await;
    let base = format!("http://127.0.0.1:{}", port);

    // Startup seeds the default profile.
    let (status, body) = get_json(&base, "/api/user/profile").await;
    assert_eq!(status, 200);
    assert_eq!(body["name"], "User");

    let (status, body) = post_json(&base, "/api/detect-object", json!({"image": "aGVsbG8="})).await;
    assert_eq!(status, 200);
    assert_eq!(body["objects"][0]["name"], "chair");
    assert_eq!(body["objects"][0]["confidence"], 95.4);

    let (_, history) = get_json(&base, "/api/scan-history").await;
    assert_eq!(history[0]["result"], "chair");
    assert_eq!(history[0]["confidence"], 95);
}
