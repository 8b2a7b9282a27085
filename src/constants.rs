// ABOUTME: Constants module with domain-separated organization
// ABOUTME: Groups protocol, analysis, and liveness constants into logical domains
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 SwingSight

//! Constants module
//!
//! Application constants organized by domain. Tuning values for the analysis
//! pipeline live here so the heuristic tables in `analysis/` stay testable
//! against named thresholds instead of magic numbers.

use std::env;

/// Service identification
pub mod service_names {
    /// Canonical service name used in structured logs
    pub const SWINGSIGHT_SERVER: &str = "swingsight-server";
}

/// WebSocket protocol constants
pub mod protocol {
    /// Capacity of each connection's outbound channel before sends fail
    pub const OUTBOUND_CHANNEL_CAPACITY: usize = 256;

    /// Topic name that opts a connection into periodic performance pushes
    pub const PERFORMANCE_TOPIC: &str = "performance";
}

/// Connection liveness and monitoring cadence
pub mod liveness {
    /// Seconds between liveness sweep scans
    pub const SWEEP_INTERVAL_SECS: u64 = 30;

    /// A connection whose last heartbeat is older than this is evicted
    pub const HEARTBEAT_TIMEOUT_SECS: u64 = 90;

    /// Seconds between performance-metrics pushes to subscribed connections
    pub const MONITORING_INTERVAL_SECS: u64 = 10;
}

/// Streaming analysis session configuration defaults
pub mod session_defaults {
    /// Default session display name
    pub const SESSION_NAME: &str = "Live Analysis Session";

    /// Analyze every Nth frame
    pub const ANALYSIS_FREQUENCY: u32 = 5;

    /// Minimum fault severity that triggers generated feedback
    pub const FEEDBACK_THRESHOLD: f64 = 0.6;

    /// Advisory per-frame latency target in milliseconds
    pub const TARGET_LATENCY_MS: u32 = 100;
}

/// Analysis pipeline thresholds
pub mod analysis {
    /// Results below this quality score skip measurement and fault extraction
    pub const MIN_QUALITY_SCORE: f64 = 0.3;

    /// Weight of average keypoint visibility in the quality score
    pub const VISIBILITY_WEIGHT: f64 = 0.7;

    /// Weight of positional plausibility in the quality score
    pub const POSITION_WEIGHT: f64 = 0.3;

    /// Coordinate magnitudes beyond this are implausible for a pose capture
    pub const MAX_COORDINATE_MAGNITUDE: f64 = 10.0;

    /// Severity multiplier for faults surfaced during a critical phase
    pub const CRITICAL_PHASE_SEVERITY_SCALE: f64 = 1.2;

    /// Severity multiplier for faults surfaced outside critical phases
    pub const NONCRITICAL_PHASE_SEVERITY_SCALE: f64 = 0.9;

    /// Faults whose scaled severity falls below this are dropped
    pub const MIN_FAULT_SEVERITY: f64 = 0.2;

    /// Frames retained per session for hysteresis and two-frame measurements
    pub const FRAME_HISTORY_CAPACITY: usize = 10;

    /// Accepted phases consulted by the classifier's continuity smoothing
    pub const PHASE_HISTORY_DEPTH: usize = 3;
}

/// Environment-based configuration
pub mod env_config {
    use super::env;

    /// Get HTTP server port from environment or default
    #[must_use]
    pub fn http_port() -> u16 {
        env::var("HTTP_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(8080)
    }

    /// Get bind host from environment or default
    #[must_use]
    pub fn bind_host() -> String {
        env::var("BIND_HOST").unwrap_or_else(|_| "0.0.0.0".into())
    }
}
