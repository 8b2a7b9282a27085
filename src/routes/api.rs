// ABOUTME: Control-plane HTTP routes: health, aggregate stats, and session management
// ABOUTME: Synchronous query/command operations over the registries; no analysis logic
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 SwingSight

use crate::errors::{AppError, ErrorResponse};
use crate::models::SessionConfig;
use crate::websocket::ConnectionManager;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;

/// Control-plane routes implementation
pub struct ApiRoutes;

impl ApiRoutes {
    /// Create the control-plane routes with the injected `ConnectionManager`
    pub fn routes(manager: Arc<ConnectionManager>) -> Router {
        Router::new()
            .route("/health", get(Self::health))
            .route("/api/stats", get(Self::stats))
            .route("/api/sessions", post(Self::create_session))
            .route("/api/sessions/:session_id", get(Self::get_session))
            .route("/api/sessions/:session_id", delete(Self::delete_session))
            .route(
                "/api/sessions/:session_id/metrics",
                get(Self::session_metrics),
            )
            .route("/api/sessions/:session_id/latest", get(Self::latest_result))
            .route("/api/rooms/:session_id", get(Self::get_room))
            .route("/api/rooms/:session_id", delete(Self::end_room))
            .with_state(manager)
    }

    /// Liveness endpoint
    async fn health() -> impl IntoResponse {
        Json(json!({
            "status": "ok",
            "service": crate::constants::service_names::SWINGSIGHT_SERVER,
            "version": env!("CARGO_PKG_VERSION"),
        }))
    }

    /// Aggregate system statistics
    async fn stats(State(manager): State<Arc<ConnectionManager>>) -> impl IntoResponse {
        Json(manager.system_stats().await)
    }

    /// Create a streaming analysis session from a JSON configuration
    async fn create_session(
        State(manager): State<Arc<ConnectionManager>>,
        Json(config): Json<SessionConfig>,
    ) -> Response {
        match manager.streaming().create_session(config).await {
            Ok(session_id) => {
                (StatusCode::CREATED, Json(json!({ "session_id": session_id }))).into_response()
            }
            Err(e) => error_response(e),
        }
    }

    /// Snapshot one streaming session
    async fn get_session(
        State(manager): State<Arc<ConnectionManager>>,
        Path(session_id): Path<String>,
    ) -> Response {
        match manager.streaming().get_session(&session_id).await {
            Some(info) => Json(info).into_response(),
            None => error_response(AppError::not_found(format!("session {session_id}"))),
        }
    }

    /// End one streaming session
    async fn delete_session(
        State(manager): State<Arc<ConnectionManager>>,
        Path(session_id): Path<String>,
    ) -> Response {
        if manager.streaming().end_session(&session_id).await {
            Json(json!({ "session_id": session_id, "ended": true })).into_response()
        } else {
            error_response(AppError::not_found(format!("session {session_id}")))
        }
    }

    /// Running performance counters for one streaming session
    async fn session_metrics(
        State(manager): State<Arc<ConnectionManager>>,
        Path(session_id): Path<String>,
    ) -> Response {
        match manager.streaming().metrics(&session_id).await {
            Some(metrics) => Json(metrics).into_response(),
            None => error_response(AppError::not_found(format!("session {session_id}"))),
        }
    }

    /// Latest cached analysis result for one streaming session
    async fn latest_result(
        State(manager): State<Arc<ConnectionManager>>,
        Path(session_id): Path<String>,
    ) -> Response {
        match manager.streaming().latest_result(&session_id) {
            Some(result) => Json(result).into_response(),
            None => error_response(AppError::not_found(format!(
                "analysis result for session {session_id}"
            ))),
        }
    }
}

impl ApiRoutes {
    /// Snapshot one coaching room
    async fn get_room(
        State(manager): State<Arc<ConnectionManager>>,
        Path(session_id): Path<String>,
    ) -> Response {
        match manager.coaching().get(&session_id).await {
            Some(room) => Json(room).into_response(),
            None => error_response(AppError::not_found(format!("room {session_id}"))),
        }
    }

    /// Force-end one coaching room
    async fn end_room(
        State(manager): State<Arc<ConnectionManager>>,
        Path(session_id): Path<String>,
    ) -> Response {
        if manager.end_coaching_session(&session_id).await {
            Json(json!({ "session_id": session_id, "ended": true })).into_response()
        } else {
            error_response(AppError::not_found(format!("room {session_id}")))
        }
    }
}

/// Map an `AppError` to its HTTP response shape
fn error_response(error: AppError) -> Response {
    let status =
        StatusCode::from_u16(error.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(ErrorResponse::from(error))).into_response()
}
