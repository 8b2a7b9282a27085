// ABOUTME: Core data models and types for the SwingSight real-time analysis server
// ABOUTME: Defines connections, coaching sessions, pose frames, and session configuration
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 SwingSight

//! # Data Models
//!
//! Core data structures used throughout the SwingSight server.
//!
//! ## Design Principles
//!
//! - **Client agnostic**: models abstract away capture-device differences
//! - **Serializable**: all models cross the WebSocket boundary as JSON
//! - **Type safe**: strong typing prevents common data handling errors
//!
//! ## Core Models
//!
//! - [`PoseFrame`]: one pose sample from the client capture pipeline
//! - [`CoachingSession`]: a named multi-participant room
//! - [`SessionConfig`]: per-user streaming analysis configuration
//! - [`PerformanceMetrics`]: running counters for one streaming session

use std::collections::{HashMap, HashSet};
use std::fmt::{Display, Formatter, Result as FmtResult};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::session_defaults;
use crate::errors::{AppError, AppResult};

// ============================================================================
// Connections
// ============================================================================

/// Lifecycle status of one live transport endpoint
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    /// Transport accepted, handshake in progress
    Connecting,
    /// Fully established and receiving frames
    Connected,
    /// Orderly shutdown in progress
    Disconnecting,
    /// Removed from the registry, transport closed
    Disconnected,
    /// Terminated after an unrecoverable send failure
    Error,
}

impl Display for ConnectionStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
            Self::Disconnecting => write!(f, "disconnecting"),
            Self::Disconnected => write!(f, "disconnected"),
            Self::Error => write!(f, "error"),
        }
    }
}

// ============================================================================
// Coaching sessions (rooms)
// ============================================================================

/// Status of a coaching room
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CoachingSessionStatus {
    /// Room accepts joins and broadcasts
    Active,
    /// Room was ended by its creator or emptied out
    Ended,
}

/// Optional settings supplied when creating a coaching room
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoachingSessionConfig {
    /// Display name shown to participants
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Cap on concurrent participants; unlimited when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_participants: Option<usize>,
}

/// A named multi-participant room sharing broadcast messages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoachingSession {
    /// Room identifier, chosen by the creator
    pub session_id: String,
    /// User who created the room
    pub creator_user_id: String,
    /// Users currently in the room
    pub participants: HashSet<String>,
    /// Room status
    pub status: CoachingSessionStatus,
    /// Creation time (UTC)
    pub created_at: DateTime<Utc>,
    /// Settings supplied at creation
    #[serde(default)]
    pub config: CoachingSessionConfig,
}

// ============================================================================
// Pose frames
// ============================================================================

/// One 3D joint coordinate with optional capture confidence
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Keypoint {
    /// Horizontal coordinate (meters, camera space)
    pub x: f64,
    /// Vertical coordinate (meters, camera space)
    pub y: f64,
    /// Depth coordinate (meters, camera space)
    pub z: f64,
    /// Capture visibility/confidence in [0, 1]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visibility: Option<f64>,
}

impl Keypoint {
    /// Euclidean distance to another keypoint
    #[must_use]
    pub fn distance_to(&self, other: &Self) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2) + (self.z - other.z).powi(2))
            .sqrt()
    }
}

/// One pose sample: joint name to coordinate mapping plus sequencing metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoseFrame {
    /// Sequence number assigned by the capture client, starting at 0
    pub frame_index: u64,
    /// Capture timestamp in seconds, monotonically non-decreasing per session
    pub timestamp: f64,
    /// Joint name to coordinate mapping
    pub keypoints: HashMap<String, Keypoint>,
}

impl PoseFrame {
    /// Validate payload ranges before the frame enters the pipeline
    ///
    /// # Errors
    ///
    /// Returns a validation error if the timestamp is not finite or any
    /// keypoint visibility falls outside [0, 1].
    pub fn validate(&self) -> AppResult<()> {
        if !self.timestamp.is_finite() {
            return Err(AppError::invalid_input("frame timestamp must be finite"));
        }
        for (joint, keypoint) in &self.keypoints {
            if let Some(visibility) = keypoint.visibility {
                if !(0.0..=1.0).contains(&visibility) {
                    return Err(AppError::new(
                        crate::errors::ErrorCode::ValueOutOfRange,
                        format!("visibility for joint '{joint}' must be within [0, 1]"),
                    ));
                }
            }
        }
        Ok(())
    }
}

// ============================================================================
// Streaming session configuration
// ============================================================================

/// Self-reported golfer skill level, used to scope feedback tone
#[derive(Debug, Copy, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SkillLevel {
    /// New to the game
    Beginner,
    /// Plays regularly, inconsistent mechanics
    #[default]
    Intermediate,
    /// Low handicap, refining details
    Advanced,
    /// Competitive or teaching professional
    Professional,
}

/// How aggressively feedback is pushed to the client
#[derive(Debug, Copy, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackMode {
    /// Push feedback as soon as a fault crosses the threshold
    #[default]
    Instant,
    /// Accumulate and let the client pull a summary
    Summary,
    /// Analyze but never push feedback
    Silent,
}

/// Per-user streaming analysis configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Owning user
    pub user_id: String,
    /// Display name for the session
    #[serde(default = "SessionConfig::default_session_name")]
    pub session_name: String,
    /// Opaque club descriptor supplied by the client (e.g. "7-iron")
    #[serde(default)]
    pub club_used: String,
    /// Self-reported skill level
    #[serde(default)]
    pub skill_level: SkillLevel,
    /// Feedback delivery mode
    #[serde(default)]
    pub feedback_mode: FeedbackMode,
    /// Analyze every Nth frame; must be >= 1
    #[serde(default = "SessionConfig::default_analysis_frequency")]
    pub analysis_frequency: u32,
    /// Minimum fault severity that triggers generated feedback, in [0, 1]
    #[serde(default = "SessionConfig::default_feedback_threshold")]
    pub feedback_threshold: f64,
    /// Compute KPIs on sampled frames
    #[serde(default = "SessionConfig::default_true")]
    pub enable_real_time_kpis: bool,
    /// Push feedback text when faults cross the threshold
    #[serde(default = "SessionConfig::default_true")]
    pub enable_instant_feedback: bool,
    /// Advisory per-frame latency target in milliseconds
    #[serde(default = "SessionConfig::default_target_latency_ms")]
    pub target_latency_ms: u32,
}

impl SessionConfig {
    fn default_session_name() -> String {
        session_defaults::SESSION_NAME.into()
    }

    const fn default_analysis_frequency() -> u32 {
        session_defaults::ANALYSIS_FREQUENCY
    }

    const fn default_feedback_threshold() -> f64 {
        session_defaults::FEEDBACK_THRESHOLD
    }

    const fn default_true() -> bool {
        true
    }

    const fn default_target_latency_ms() -> u32 {
        session_defaults::TARGET_LATENCY_MS
    }

    /// Construct a configuration with standard defaults for the given user
    #[must_use]
    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            session_name: Self::default_session_name(),
            club_used: String::new(),
            skill_level: SkillLevel::default(),
            feedback_mode: FeedbackMode::default(),
            analysis_frequency: Self::default_analysis_frequency(),
            feedback_threshold: Self::default_feedback_threshold(),
            enable_real_time_kpis: true,
            enable_instant_feedback: true,
            target_latency_ms: Self::default_target_latency_ms(),
        }
    }

    /// Validate configuration ranges
    ///
    /// # Errors
    ///
    /// Returns a validation error when `analysis_frequency` is zero or
    /// `feedback_threshold` is outside [0, 1].
    pub fn validate(&self) -> AppResult<()> {
        if self.user_id.is_empty() {
            return Err(AppError::missing_field("user_id"));
        }
        if self.analysis_frequency == 0 {
            return Err(AppError::new(
                crate::errors::ErrorCode::ValueOutOfRange,
                "analysis_frequency must be >= 1",
            ));
        }
        if !(0.0..=1.0).contains(&self.feedback_threshold) {
            return Err(AppError::new(
                crate::errors::ErrorCode::ValueOutOfRange,
                "feedback_threshold must be within [0, 1]",
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Performance counters
// ============================================================================

/// Running performance counters for one streaming analysis session
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    /// Total frames received, sampled or not
    pub frames_processed: u64,
    /// Exact running mean of pipeline latency across analyzed frames
    pub average_latency_ms: f64,
    /// Total measurements emitted across analyzed frames
    pub kpis_calculated: u64,
    /// Total faults surviving the adaptive filter
    pub faults_detected: u64,
    /// Total feedback payloads generated
    pub feedback_generated: u64,
}

/// Aggregate counters across the whole server, pushed to monitoring clients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemStats {
    /// Live transport endpoints
    pub active_connections: usize,
    /// Active streaming analysis sessions
    pub active_sessions: usize,
    /// Active coaching rooms
    pub active_coaching_sessions: usize,
    /// Frames received across all streaming sessions
    pub total_frames_processed: u64,
}
