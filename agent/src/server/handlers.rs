//! HTTP request handlers

use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use secrecy::ExposeSecret;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::server::state::ServerState;
use crate::utils::version_info;

/// Header carrying the shared rollout secret
pub const ROLLOUT_TOKEN_HEADER: &str = "x-rollout-token";

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

/// Health check handler
pub async fn health_handler() -> impl IntoResponse {
    let version = version_info();
    Json(HealthResponse {
        status: "ok".to_string(),
        service: "rolloutd".to_string(),
        version: version.version,
    })
}

/// Rollout trigger response
#[derive(Debug, Serialize)]
pub struct RolloutResponse {
    pub exit_code: i32,
    pub status: String,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Rollout trigger handler.
///
/// The request body is ignored entirely; only the secret header is examined.
/// The rollout runs to completion before the response is written, so the
/// caller sees the real exit code.
pub async fn rollout_handler(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
) -> Response {
    let provided = headers
        .get(ROLLOUT_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok());

    match provided {
        Some(token) if token == state.secret.expose_secret() => {}
        _ => {
            warn!("Rejected rollout trigger: missing or invalid token");
            return (
                StatusCode::FORBIDDEN,
                Json(ErrorResponse {
                    error: "invalid or missing rollout token".to_string(),
                }),
            )
                .into_response();
        }
    }

    info!("Accepted rollout trigger, invoking orchestrator...");

    match state.invoker.invoke().await {
        Ok(exit_code) => {
            let status = if exit_code == 0 { "succeeded" } else { "failed" };
            (
                StatusCode::OK,
                Json(RolloutResponse {
                    exit_code,
                    status: status.to_string(),
                }),
            )
                .into_response()
        }
        Err(e) => {
            error!("Could not invoke rollout: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            )
                .into_response()
        }
    }
}
