// ABOUTME: WebSocket message envelope and type registry for the duplex protocol
// ABOUTME: Frames control-plane and data-plane messages shared by client and server
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 SwingSight

//! Message envelope for the bidirectional WebSocket protocol.
//!
//! Every message on the wire is a JSON envelope:
//! `{type, data, timestamp, message_id, session_id?, user_id?}`.
//!
//! The `type` field travels as a plain string so that an unknown type can be
//! logged and dropped without failing envelope parsing; a malformed envelope
//! (unparsable framing, missing required field) is a validation error instead.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use uuid::Uuid;

use crate::errors::{AppError, AppResult};

/// Enumerated message types carried in the envelope `type` field
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    /// Client announces itself after the transport opens
    Connect,
    /// Client requests an orderly disconnect
    Disconnect,
    /// Liveness probe from the client
    Ping,
    /// Liveness reply from the server
    Pong,
    /// One pose frame from the capture pipeline
    FrameData,
    /// Per-frame analysis result pushed back to the client
    AnalysisResult,
    /// Generated coaching feedback text
    Feedback,
    /// Start a streaming analysis session
    StartSession,
    /// End a streaming analysis session
    EndSession,
    /// Join a coaching room
    JoinSession,
    /// Leave a coaching room
    LeaveSession,
    /// Incremental KPI update
    KpiUpdate,
    /// A fault crossed the feedback threshold
    FaultDetected,
    /// Periodic performance counters push
    PerformanceMetrics,
    /// Coaching tip broadcast within a room
    CoachingTip,
    /// Drill suggestion broadcast within a room
    DrillSuggestion,
    /// Server-side error report
    Error,
    /// Reply to a malformed inbound message
    ValidationError,
}

impl MessageType {
    /// Wire name of this message type
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Connect => "connect",
            Self::Disconnect => "disconnect",
            Self::Ping => "ping",
            Self::Pong => "pong",
            Self::FrameData => "frame_data",
            Self::AnalysisResult => "analysis_result",
            Self::Feedback => "feedback",
            Self::StartSession => "start_session",
            Self::EndSession => "end_session",
            Self::JoinSession => "join_session",
            Self::LeaveSession => "leave_session",
            Self::KpiUpdate => "kpi_update",
            Self::FaultDetected => "fault_detected",
            Self::PerformanceMetrics => "performance_metrics",
            Self::CoachingTip => "coaching_tip",
            Self::DrillSuggestion => "drill_suggestion",
            Self::Error => "error",
            Self::ValidationError => "validation_error",
        }
    }
}

impl Display for MessageType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageType {
    type Err = UnknownMessageType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "connect" => Ok(Self::Connect),
            "disconnect" => Ok(Self::Disconnect),
            "ping" => Ok(Self::Ping),
            "pong" => Ok(Self::Pong),
            "frame_data" => Ok(Self::FrameData),
            "analysis_result" => Ok(Self::AnalysisResult),
            "feedback" => Ok(Self::Feedback),
            "start_session" => Ok(Self::StartSession),
            "end_session" => Ok(Self::EndSession),
            "join_session" => Ok(Self::JoinSession),
            "leave_session" => Ok(Self::LeaveSession),
            "kpi_update" => Ok(Self::KpiUpdate),
            "fault_detected" => Ok(Self::FaultDetected),
            "performance_metrics" => Ok(Self::PerformanceMetrics),
            "coaching_tip" => Ok(Self::CoachingTip),
            "drill_suggestion" => Ok(Self::DrillSuggestion),
            "error" => Ok(Self::Error),
            "validation_error" => Ok(Self::ValidationError),
            other => Err(UnknownMessageType(other.into())),
        }
    }
}

/// The envelope carried a type string outside the known registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownMessageType(pub String);

impl Display for UnknownMessageType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "unknown message type: {}", self.0)
    }
}

impl std::error::Error for UnknownMessageType {}

/// Bidirectional message envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WsEnvelope {
    /// Wire message type; kept as a string so unknown types parse cleanly
    #[serde(rename = "type")]
    pub message_type: String,
    /// Type-specific payload
    #[serde(default)]
    pub data: Value,
    /// Sender wall-clock time in epoch seconds
    pub timestamp: f64,
    /// Unique message identifier for tracing
    pub message_id: String,
    /// Coaching room this message targets, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Originating user, if known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl WsEnvelope {
    /// Build an outbound envelope with a fresh message id and timestamp
    #[must_use]
    pub fn new(message_type: MessageType, data: Value) -> Self {
        Self {
            message_type: message_type.as_str().into(),
            data,
            timestamp: Utc::now().timestamp_millis() as f64 / 1000.0,
            message_id: Uuid::new_v4().to_string(),
            session_id: None,
            user_id: None,
        }
    }

    /// Attach a coaching room id
    #[must_use]
    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Attach the originating user id
    #[must_use]
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Parse raw transport text into an envelope
    ///
    /// # Errors
    ///
    /// Returns a validation error when the framing is unparsable or a
    /// required envelope field is missing.
    pub fn parse(text: &str) -> AppResult<Self> {
        serde_json::from_str(text)
            .map_err(|e| AppError::invalid_input(format!("malformed message envelope: {e}")))
    }

    /// Resolve the wire type string against the known registry
    ///
    /// # Errors
    ///
    /// Returns [`UnknownMessageType`] for types outside the registry; the
    /// caller logs and drops these without closing the connection.
    pub fn resolve_type(&self) -> Result<MessageType, UnknownMessageType> {
        self.message_type.parse()
    }

    /// Deserialize the payload into a typed value
    ///
    /// # Errors
    ///
    /// Returns a validation error naming the expected payload shape when the
    /// data object does not deserialize.
    pub fn parse_data<T: serde::de::DeserializeOwned>(&self, expected: &str) -> AppResult<T> {
        serde_json::from_value(self.data.clone())
            .map_err(|e| AppError::invalid_input(format!("invalid {expected} payload: {e}")))
    }

    /// Serialize for the transport
    ///
    /// # Errors
    ///
    /// Returns a serialization error if the payload cannot be rendered.
    pub fn to_json(&self) -> AppResult<String> {
        serde_json::to_string(self).map_err(|e| {
            AppError::new(
                crate::errors::ErrorCode::SerializationError,
                format!("failed to serialize envelope: {e}"),
            )
        })
    }

    /// Build the standard `validation_error` reply for a rejected message
    #[must_use]
    pub fn validation_error(detail: &str) -> Self {
        Self::new(
            MessageType::ValidationError,
            serde_json::json!({ "message": detail }),
        )
    }
}

/// `connect` payload: optional topic subscriptions
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConnectPayload {
    /// Topics this connection wants pushed (e.g. `performance`)
    #[serde(default)]
    pub topics: Vec<String>,
}

/// `join_session` / `leave_session` payload
#[derive(Debug, Clone, Deserialize)]
pub struct RoomPayload {
    /// Target coaching room
    pub session_id: String,
    /// Optional room settings, honored on implicit creation
    #[serde(default)]
    pub config: Option<crate::models::CoachingSessionConfig>,
}

/// `end_session` payload; the session defaults to the sender's active one
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EndSessionPayload {
    /// Explicit streaming session id to end
    #[serde(default)]
    pub session_id: Option<String>,
}
