use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use crate::alerts::{AlertBatch, AlertDispatcher};
use crate::directory::ResolverStats;

/// Application state shared across handlers
pub struct AppState {
    pub dispatcher: AlertDispatcher,
}

// ============================================================================
// Health Check
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// ============================================================================
// Webhook
// ============================================================================

/// Alertmanager webhook. The body is decoded by hand so malformed JSON maps
/// to a 400 carrying the parser message.
pub async fn webhook(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<&'static str>, ApiError> {
    let batch = AlertBatch::from_slice(&body).map_err(|e| {
        tracing::error!("Error parsing alerts content: {}", e);
        ApiError::BadRequest(e.to_string())
    })?;

    let report = state.dispatcher.dispatch(&batch).await.map_err(|e| {
        tracing::error!("{}", e);
        ApiError::Internal(e.to_string())
    })?;

    tracing::info!(
        alerts = report.alerts,
        messages = report.messages,
        "Alert batch delivered"
    );
    Ok(Json("success"))
}

pub async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

// ============================================================================
// Stats
// ============================================================================

pub async fn stats(State(state): State<Arc<AppState>>) -> Json<ResolverStats> {
    Json(state.dispatcher.resolver().stats())
}

// ============================================================================
// Error Handling
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    MethodNotAllowed,
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::MethodNotAllowed => (
                StatusCode::METHOD_NOT_ALLOWED,
                "unsupported HTTP method".to_string(),
            ),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        // The body is the bare message as a JSON string
        (status, Json(message)).into_response()
    }
}
