// ABOUTME: HTTP route composition for the SwingSight server
// ABOUTME: Merges the WebSocket upgrade route with the control-plane API routes
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 SwingSight

//! HTTP routes.

use axum::Router;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::websocket::ConnectionManager;

/// Control-plane API routes (health, stats, session management)
pub mod api;
/// WebSocket upgrade route
pub mod websocket;

pub use api::ApiRoutes;
pub use websocket::WebSocketRoutes;

/// Build the full application router
pub fn app_router(manager: Arc<ConnectionManager>) -> Router {
    WebSocketRoutes::routes(manager.clone())
        .merge(ApiRoutes::routes(manager))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
