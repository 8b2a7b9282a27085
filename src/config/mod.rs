// ABOUTME: Configuration management module
// ABOUTME: Environment-driven server configuration with typed fields and defaults
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 SwingSight

//! Configuration management.

/// Environment-based configuration for deployment-specific settings
pub mod environment;

pub use environment::{Environment, LogLevel, ServerConfig, WebSocketConfig};
