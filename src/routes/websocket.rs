// ABOUTME: WebSocket route handlers for real-time bidirectional communication
// ABOUTME: Upgrades HTTP connections and delegates their lifetime to the connection manager
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 SwingSight

use crate::websocket::ConnectionManager;
use axum::{
    extract::{
        ws::{WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info};

/// Query parameters accepted on the upgrade request
#[derive(Debug, Deserialize)]
pub struct WsParams {
    /// User the connection belongs to; required
    pub user_id: Option<String>,
}

/// WebSocket routes implementation
pub struct WebSocketRoutes;

impl WebSocketRoutes {
    /// Create all WebSocket routes with the injected `ConnectionManager`
    pub fn routes(manager: Arc<ConnectionManager>) -> Router {
        Router::new()
            .route("/ws", get(Self::handle_websocket))
            .with_state(manager)
    }

    /// Handle WebSocket upgrade and connection.
    ///
    /// A connection must identify its user at upgrade time; without one it
    /// could own no session or room, so the request is rejected outright.
    async fn handle_websocket(
        ws: WebSocketUpgrade,
        Query(params): Query<WsParams>,
        State(manager): State<Arc<ConnectionManager>>,
    ) -> Response {
        let Some(user_id) = params.user_id.filter(|id| !id.is_empty()) else {
            return (StatusCode::BAD_REQUEST, "user_id query parameter required")
                .into_response();
        };

        info!(user_id = %user_id, "New WebSocket connection request");

        ws.on_upgrade(move |socket: WebSocket| async move {
            debug!("WebSocket upgraded, delegating to manager");
            manager.handle_connection(socket, user_id).await;
        })
    }
}
