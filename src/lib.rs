// ABOUTME: Main library entry point for the SwingSight real-time analysis server
// ABOUTME: Provides WebSocket streaming analysis, coaching rooms, and a control-plane API
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 SwingSight

#![deny(unsafe_code)]

//! # SwingSight Server
//!
//! A real-time golf swing analysis server. Clients stream body-pose frames
//! over a persistent duplex WebSocket connection and receive, with bounded
//! latency, a running classification of swing phase, derived biomechanical
//! measurements, and flagged technique faults. Multi-participant coaching
//! rooms share the same transport for tips and drill broadcasts.
//!
//! ## Architecture
//!
//! - **Connection Manager** ([`websocket`]): duplex-connection lifecycle,
//!   message dispatch, liveness eviction, broadcast
//! - **Streaming Session Manager** ([`streaming`]): one analysis context per
//!   user, sampling throttle, performance counters
//! - **Live Analysis Engine** ([`analysis`]): per-frame pipeline of phase
//!   classification, quality gating, KPI extraction, and fault filtering
//! - **Coaching Session Registry** ([`coaching`]): multi-participant rooms
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use swingsight_server::config::environment::ServerConfig;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::from_env()?;
//!     println!("SwingSight server configured: {}", config.summary());
//!     Ok(())
//! }
//! ```

// ── Public API ──────────────────────────────────────────────────────────
// These modules are used by the server binary (src/bin/) and integration
// tests (tests/). They must remain `pub` so external consumers can access
// them.

/// Live analysis pipeline: phase classification, KPIs, faults, feedback
pub mod analysis;

/// Coaching room registry for multi-participant broadcasts
pub mod coaching;

/// Configuration management and environment parsing
pub mod config;

/// Application constants organized by domain
pub mod constants;

/// Unified error handling system with standard error codes and HTTP responses
pub mod errors;

/// Production logging and structured output
pub mod logging;

/// Common data models for connections, frames, and sessions
pub mod models;

/// WebSocket message envelope and type registry
pub mod protocol;

/// `HTTP` routes for the WebSocket upgrade and the control plane
pub mod routes;

/// Streaming analysis session management and throttling
pub mod streaming;

/// `WebSocket` connection management for real-time updates
pub mod websocket;
