//! HTTP surface of the exchange.
//!
//! Two near-identical endpoint families share one service:
//!
//! | Method | Path                          | Namespace  |
//! |--------|-------------------------------|------------|
//! | POST   | `/api/save-deeplink`          | `deeplink` |
//! | GET    | `/api/deeplink/{deviceId}`    | `deeplink` |
//! | POST   | `/api/store-session`          | `session`  |
//! | GET    | `/api/get-code/{sessionId}`   | `session`  |
//! | GET    | `/api`, `/api/health`         | none       |
//!
//! `/join` serves the hand-off page and `/` a plain download page.
//!
//! POST bodies are read leniently: an empty body or broken JSON is treated
//! like a body with no fields, so the client gets the usual 400 message
//! instead of an extractor rejection.

use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header::CONTENT_TYPE, HeaderValue, Method},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info, warn};

use crate::{
    bootstrap::{join_page, landing_page},
    config::AllowedOrigins,
    error::{ApiError, ErrorText, ExchangeError, Operation},
    service::{Health, Namespace, SessionExchange},
    state::AppState,
};

const DEEPLINK_ERRORS: ErrorText = ErrorText {
    missing_fields: "deviceId and inviteCode required",
    not_found: "No invite code found",
    store_failed: "Failed to save invite code",
    lookup_failed: "Failed to look up invite code",
};

const SESSION_ERRORS: ErrorText = ErrorText {
    missing_fields: "sessionId and code required",
    not_found: "Session not found or expired",
    store_failed: "Failed to store session",
    lookup_failed: "Failed to look up session",
};

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveDeeplinkResponse {
    pub success: bool,
    pub device_id: String,
    /// Seconds until the code expires.
    pub expires_in: u64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeeplinkResponse {
    pub invite_code: String,
    pub device_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSessionResponse {
    pub success: bool,
    pub session_id: String,
    pub expires_in: u64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCodeResponse {
    pub code: String,
    pub session_id: String,
}

/// Builds the application router with CORS and request tracing.
pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.allowed_origins);

    Router::new()
        .route("/api", get(health))
        .route("/api/health", get(health))
        .route("/api/save-deeplink", post(save_deeplink))
        .route("/api/deeplink/{device_id}", get(get_deeplink))
        .route("/api/store-session", post(store_session))
        .route("/api/get-code/{session_id}", get(get_code))
        .route("/", get(landing_page))
        .route("/join", get(join_page))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &AllowedOrigins) -> CorsLayer {
    let allow_origin = match origins {
        AllowedOrigins::Any => AllowOrigin::any(),
        AllowedOrigins::List(list) => AllowOrigin::list(list.iter().filter_map(|origin| {
            HeaderValue::from_str(origin)
                .map_err(|_| warn!(%origin, "Ignoring invalid CORS origin"))
                .ok()
        })),
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60))
}

pub async fn health() -> Json<Health> {
    info!("Health check ping");
    Json(SessionExchange::health())
}

pub async fn save_deeplink(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<SaveDeeplinkResponse>, ApiError> {
    let body = parse_body(&body);
    let device_id = text_field(&body, "deviceId");
    let invite_code = text_field(&body, "inviteCode");

    let stored = state
        .exchange
        .store(Namespace::DeepLink, &device_id, &invite_code)
        .await
        .map_err(|e| reject(e, Operation::Save, &DEEPLINK_ERRORS))?;

    Ok(Json(SaveDeeplinkResponse {
        success: true,
        device_id: stored.identifier,
        expires_in: stored.ttl.as_secs(),
    }))
}

pub async fn get_deeplink(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
) -> Result<Json<DeeplinkResponse>, ApiError> {
    let found = state
        .exchange
        .retrieve(Namespace::DeepLink, &device_id)
        .await
        .map_err(|e| reject(e, Operation::Lookup, &DEEPLINK_ERRORS))?;

    Ok(Json(DeeplinkResponse {
        invite_code: found.code,
        device_id: found.identifier,
    }))
}

pub async fn store_session(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<StoreSessionResponse>, ApiError> {
    let body = parse_body(&body);
    let session_id = text_field(&body, "sessionId");
    let code = text_field(&body, "code");

    let stored = state
        .exchange
        .store(Namespace::Session, &session_id, &code)
        .await
        .map_err(|e| reject(e, Operation::Save, &SESSION_ERRORS))?;

    Ok(Json(StoreSessionResponse {
        success: true,
        session_id: stored.identifier,
        expires_in: stored.ttl.as_secs(),
    }))
}

pub async fn get_code(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionCodeResponse>, ApiError> {
    let found = state
        .exchange
        .retrieve(Namespace::Session, &session_id)
        .await
        .map_err(|e| reject(e, Operation::Lookup, &SESSION_ERRORS))?;

    Ok(Json(SessionCodeResponse {
        code: found.code,
        session_id: found.identifier,
    }))
}

/// Logs at the level the failure deserves and converts it for the client.
fn reject(error: ExchangeError, operation: Operation, text: &ErrorText) -> ApiError {
    match &error {
        ExchangeError::MissingFields => warn!("Rejected request: {}", text.missing_fields),
        ExchangeError::NotFound(key) => warn!(%key, "No code found"),
        ExchangeError::Store(e) => error!(error = %e, ?operation, "Store operation failed"),
    }
    ApiError::from_exchange(error, operation, text)
}

fn parse_body(body: &Bytes) -> Value {
    serde_json::from_slice(body).unwrap_or(Value::Null)
}

/// A string field, or a number rendered as text. Anything else is empty.
fn text_field(body: &Value, name: &str) -> String {
    match body.get(name) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}
