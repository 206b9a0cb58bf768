//! HTTP API server.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/detect-object` | Name the objects in an image |
//! | `POST` | `/api/read-text` | Read the text in an image |
//! | `POST` | `/api/detect-currency` | Identify a banknote |
//! | `GET`  | `/api/scan-history` | Last 50 scan summaries, newest first |
//! | `GET`  | `/api/user/profile` | Read the user profile |
//! | `POST` | `/api/user/profile` | Create or replace the user profile |
//! | `POST` | `/api/emergency/trigger` | Record an SOS event |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! ```json
//! { "message": "Invalid user data", "field": "name" }
//! ```
//!
//! `field` is only present on profile validation errors. Failure messages
//! are static; details go to the log, never to the client.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so the browser client
//! can be served from anywhere.

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, info_span, warn, Instrument};

use visionaid_core::models::{
    CurrencyScan, NewEmergencyLog, ObjectScan, ProfileUpdate, ScanKind, ScanLogEntry, TextScan,
    UserProfile,
};
use visionaid_core::store::{scan_history, seed_user};
use visionaid_core::{run_scan, ScanError, ScanResult, Store, VisionModel};

use crate::config::Config;
use crate::sqlite_store::SqliteStore;
use crate::{db, migrate, vision};

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub vision: Arc<dyn VisionModel>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, vision: Arc<dyn VisionModel>) -> Self {
        Self { store, vision }
    }
}

/// Starts the HTTP server.
///
/// Opens the database, applies the schema, seeds the default profile and
/// binds to `[server].bind`. Runs until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let pool = db::connect(config).await?;
    migrate::apply_schema(&pool).await?;

    let store = Arc::new(SqliteStore::new(pool));
    seed_user(store.as_ref()).await?;

    let vision = vision::create_vision_model(&config.vision)?;
    info!(
        provider = %config.vision.provider,
        model = vision.model_name(),
        "vision backend ready"
    );

    let listener = TcpListener::bind(&config.server.bind).await?;
    println!("VisionAid server listening on http://{}", config.server.bind);

    serve(listener, AppState::new(store, vision), config.server.max_body_bytes).await
}

/// Serve the API on an already-bound listener.
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    max_body_bytes: usize,
) -> anyhow::Result<()> {
    axum::serve(listener, router(state, max_body_bytes)).await?;
    Ok(())
}

/// Build the application router.
pub fn router(state: AppState, max_body_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/detect-object", post(handle_scan::<ObjectScan>))
        .route("/api/read-text", post(handle_scan::<TextScan>))
        .route("/api/detect-currency", post(handle_scan::<CurrencyScan>))
        .route("/api/scan-history", get(handle_scan_history))
        .route(
            "/api/user/profile",
            get(handle_get_profile).post(handle_save_profile),
        )
        .route("/api/emergency/trigger", post(handle_emergency))
        .route("/health", get(handle_health))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(cors)
        .with_state(state)
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<&'static str>,
}

/// Internal error type that converts into an Axum HTTP response.
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: &'static str,
    field: Option<&'static str>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            message: self.message,
            field: self.field,
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: &'static str) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        message,
        field: None,
    }
}

fn not_found(message: &'static str) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        message,
        field: None,
    }
}

fn internal(message: &'static str) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        message,
        field: None,
    }
}

fn scan_failure_message(kind: ScanKind) -> &'static str {
    match kind {
        ScanKind::Object => "Failed to detect objects",
        ScanKind::Text => "Failed to read text",
        ScanKind::Currency => "Failed to detect currency",
    }
}

// ============ Scan endpoints ============

/// Pull the `image` string out of a request body.
///
/// A body that is not JSON, or whose `image` is absent or not a string,
/// yields `""`, which the pipeline rejects as a missing image.
fn image_field(body: &[u8]) -> String {
    serde_json::from_slice::<Value>(body)
        .ok()
        .and_then(|v| v.get("image").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_default()
}

/// Handler shared by the three analysis endpoints.
async fn handle_scan<T: ScanResult>(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<T>, AppError> {
    let span = info_span!(
        "scan",
        request_id = %uuid::Uuid::new_v4(),
        scan_type = %T::KIND,
        model = state.vision.model_name(),
    );

    async move {
        let image = image_field(&body);
        match run_scan::<T>(state.vision.as_ref(), state.store.as_ref(), &image).await {
            Ok(report) => Ok(Json(report.into_result())),
            Err(ScanError::MissingImage) => {
                info!("rejected request without image");
                Err(bad_request("Image required"))
            }
            Err(ScanError::Analysis(e)) => {
                error!(error = %e, "analysis failed");
                Err(internal(scan_failure_message(T::KIND)))
            }
        }
    }
    .instrument(span)
    .await
}

#[derive(Deserialize)]
struct HistoryParams {
    limit: Option<usize>,
}

async fn handle_scan_history(
    State(state): State<AppState>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<Vec<ScanLogEntry>>, AppError> {
    scan_history(state.store.as_ref(), params.limit)
        .await
        .map(Json)
        .map_err(|e| {
            error!(error = %e, "failed to read scan history");
            internal("Failed to fetch scan history")
        })
}

// ============ Profile ============

async fn handle_get_profile(State(state): State<AppState>) -> Result<Json<UserProfile>, AppError> {
    match state.store.get_user().await {
        Ok(Some(user)) => Ok(Json(user)),
        Ok(None) => Err(not_found("User not found")),
        Err(e) => {
            error!(error = %e, "failed to read user profile");
            Err(internal("Failed to fetch user"))
        }
    }
}

async fn handle_save_profile(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<UserProfile>, AppError> {
    let update: ProfileUpdate = serde_json::from_slice(&body).map_err(|e| {
        info!(error = %e, "rejected malformed profile update");
        bad_request("Invalid user data")
    })?;

    update.validate().map_err(|e| {
        info!(field = e.field, reason = %e.reason, "rejected profile update");
        AppError {
            status: StatusCode::BAD_REQUEST,
            message: "Invalid user data",
            field: Some(e.field),
        }
    })?;

    let saved = state.store.upsert_user(&update).await.map_err(|e| {
        error!(error = %e, "failed to save user profile");
        internal("Failed to save user")
    })?;
    info!(user_id = saved.id, "user profile saved");
    Ok(Json(saved))
}

// ============ Emergency ============

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EmergencyResponse {
    success: bool,
    message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    dial_uri: Option<String>,
}

async fn handle_emergency(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<EmergencyResponse>, AppError> {
    // The client may send no body at all when geolocation is unavailable.
    let request: NewEmergencyLog = if body.is_empty() {
        NewEmergencyLog::default()
    } else {
        serde_json::from_slice(&body).unwrap_or_else(|e| {
            warn!(error = %e, "unreadable emergency body, logging without location");
            NewEmergencyLog::default()
        })
    };

    let entry = state
        .store
        .create_emergency_log(&request)
        .await
        .map_err(|e| {
            error!(error = %e, "failed to record emergency");
            internal("Failed to trigger emergency")
        })?;
    warn!(
        emergency_id = entry.id,
        status = %entry.status,
        has_location = entry.location_lat.is_some(),
        "emergency triggered"
    );

    let dial_uri = match state.store.get_user().await {
        Ok(user) => user.and_then(|u| u.dial_uri()),
        Err(e) => {
            warn!(error = %e, "could not load emergency contact");
            None
        }
    };

    Ok(Json(EmergencyResponse {
        success: true,
        message: "Emergency triggered. Location logged.",
        dial_uri,
    }))
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_field_tolerates_bad_bodies() {
        assert_eq!(image_field(br#"{"image":"abc"}"#), "abc");
        assert_eq!(image_field(br#"{"image":42}"#), "");
        assert_eq!(image_field(br#"{}"#), "");
        assert_eq!(image_field(b"not json"), "");
        assert_eq!(image_field(b""), "");
    }

    #[test]
    fn test_failure_messages_are_static_per_task() {
        assert_eq!(scan_failure_message(ScanKind::Object), "Failed to detect objects");
        assert_eq!(scan_failure_message(ScanKind::Text), "Failed to read text");
        assert_eq!(
            scan_failure_message(ScanKind::Currency),
            "Failed to detect currency"
        );
    }

    #[test]
    fn test_error_body_omits_absent_field() {
        let body = serde_json::to_value(ErrorBody {
            message: "Image required",
            field: None,
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"message": "Image required"}));
    }
}
