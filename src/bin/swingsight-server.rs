// ABOUTME: Server binary wiring configuration, logging, registries, and the HTTP listener
// ABOUTME: Production entry point for the SwingSight real-time analysis server
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 SwingSight

//! # SwingSight Server Binary
//!
//! Starts the real-time analysis server: WebSocket streaming endpoint,
//! coaching rooms, control-plane API, and the background liveness and
//! monitoring tasks.

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use swingsight_server::{
    coaching::CoachingSessionRegistry, config::environment::ServerConfig, logging,
    routes::app_router, streaming::StreamingSessionManager, websocket::ConnectionManager,
};
use tracing::info;

#[derive(Parser)]
#[command(name = "swingsight-server")]
#[command(about = "SwingSight - real-time golf swing analysis server")]
pub struct Args {
    /// Override HTTP port
    #[arg(long)]
    http_port: Option<u16>,

    /// Override bind host
    #[arg(long)]
    bind_host: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Handle container environments where clap may not work properly
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("Argument parsing failed: {e}");
            eprintln!("Using environment configuration");
            Args {
                http_port: None,
                bind_host: None,
            }
        }
    };

    let mut config = ServerConfig::from_env()?;
    if let Some(http_port) = args.http_port {
        config.http_port = http_port;
    }
    if let Some(bind_host) = args.bind_host {
        config.bind_host = bind_host;
    }

    logging::init_from_env()?;

    info!("Starting SwingSight server");
    info!("{}", config.summary());

    let coaching = Arc::new(CoachingSessionRegistry::new());
    let streaming = Arc::new(StreamingSessionManager::with_defaults());
    let manager = Arc::new(ConnectionManager::new(
        coaching,
        streaming,
        config.websocket.clone(),
    ));

    manager.start_liveness_sweep();
    manager.start_periodic_updates();

    let app = app_router(manager);
    let bind_address = format!("{}:{}", config.bind_host, config.http_port);
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    info!(address = %bind_address, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("SwingSight server stopped");
    Ok(())
}

/// Resolve on Ctrl-C so axum can drain connections before exit
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to install shutdown signal handler");
    }
}
