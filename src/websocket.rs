// ABOUTME: WebSocket connection manager for real-time pose streaming and coaching rooms
// ABOUTME: Owns the connection registry, message dispatch, liveness eviction, and stat pushes
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 SwingSight

//! `WebSocket` connection management.
//!
//! One [`ConnectionManager`] owns every live transport endpoint. Each
//! accepted socket gets a stable connection id, an outbound mpsc channel
//! with a dedicated forwarding task (which preserves per-connection send
//! order), and a handling loop that reads inbound envelopes and dispatches
//! them by message type. Receiving is the read loop itself: it suspends on
//! the socket and resumes on message arrival or closure.
//!
//! Two background tasks run alongside the connection tasks: a liveness
//! sweep that evicts connections with stale heartbeats, and a monitoring
//! push that delivers system stats to subscribed connections.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio::sync::{mpsc, RwLock};
use tokio::time::{interval, Duration};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::coaching::CoachingSessionRegistry;
use crate::config::environment::WebSocketConfig;
use crate::constants::protocol::PERFORMANCE_TOPIC;
use crate::models::{ConnectionStatus, PoseFrame, SessionConfig, SystemStats};
use crate::protocol::{
    ConnectPayload, EndSessionPayload, MessageType, RoomPayload, WsEnvelope,
};
use crate::streaming::StreamingSessionManager;

// WebSocket message type alias for Axum
type Message = axum::extract::ws::Message;

/// Whether the handling loop keeps reading after a dispatched message
enum Dispatch {
    Continue,
    Stop,
}

/// One live transport endpoint
struct ClientConnection {
    user_id: String,
    coaching_session_id: Option<String>,
    status: ConnectionStatus,
    connected_at: DateTime<Utc>,
    last_heartbeat: DateTime<Utc>,
    subscribed_topics: HashSet<String>,
    tx: mpsc::UnboundedSender<Message>,
}

/// Manages WebSocket connections, dispatch, and broadcasting
#[derive(Clone)]
pub struct ConnectionManager {
    connections: Arc<RwLock<HashMap<Uuid, ClientConnection>>>,
    coaching: Arc<CoachingSessionRegistry>,
    streaming: Arc<StreamingSessionManager>,
    config: WebSocketConfig,
}

impl ConnectionManager {
    /// Creates a new connection manager over the shared registries
    #[must_use]
    pub fn new(
        coaching: Arc<CoachingSessionRegistry>,
        streaming: Arc<StreamingSessionManager>,
        config: WebSocketConfig,
    ) -> Self {
        Self {
            connections: Arc::new(RwLock::new(HashMap::new())),
            coaching,
            streaming,
            config,
        }
    }

    /// Shared coaching registry handle
    #[must_use]
    pub fn coaching(&self) -> Arc<CoachingSessionRegistry> {
        self.coaching.clone()
    }

    /// Shared streaming session manager handle
    #[must_use]
    pub fn streaming(&self) -> Arc<StreamingSessionManager> {
        self.streaming.clone()
    }

    // ========================================================================
    // Connection lifecycle
    // ========================================================================

    /// Handle one accepted WebSocket for its whole lifetime
    pub async fn handle_connection(&self, ws: axum::extract::ws::WebSocket, user_id: String) {
        let (mut ws_tx, mut ws_rx) = ws.split();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let connection_id = self.accept(&user_id, tx).await;

        // Forward outbound messages in send order; ends when the channel
        // closes, which also closes the socket for evicted connections.
        let ws_send_task = tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                if ws_tx.send(message).await.is_err() {
                    break;
                }
            }
        });

        // Receive loop: suspends until a message arrives or the transport
        // closes.
        while let Some(msg) = ws_rx.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    self.touch_heartbeat(connection_id).await;
                    match self.dispatch(connection_id, &user_id, &text).await {
                        Dispatch::Continue => {}
                        Dispatch::Stop => break,
                    }
                }
                Ok(Message::Close(_)) | Err(_) => break,
                _ => {}
            }
        }

        ws_send_task.abort();
        self.disconnect(connection_id).await;
    }

    /// Register a new connection and return its stable identifier
    async fn accept(&self, user_id: &str, tx: mpsc::UnboundedSender<Message>) -> Uuid {
        let connection_id = Uuid::new_v4();
        let now = Utc::now();
        let client = ClientConnection {
            user_id: user_id.to_owned(),
            coaching_session_id: None,
            status: ConnectionStatus::Connected,
            connected_at: now,
            last_heartbeat: now,
            subscribed_topics: HashSet::new(),
            tx,
        };
        self.connections.write().await.insert(connection_id, client);
        info!(%connection_id, user_id = %user_id, "WebSocket connection accepted");
        connection_id
    }

    /// Remove a connection and revoke every membership it held.
    ///
    /// Safe to call twice: the second call finds nothing to remove. When the
    /// user holds no other connection their streaming session ends too.
    pub async fn disconnect(&self, connection_id: Uuid) {
        let removed = {
            let mut connections = self.connections.write().await;
            connections.remove(&connection_id)
        };
        let Some(mut client) = removed else {
            return;
        };
        client.status = ConnectionStatus::Disconnected;
        let connected_for = Utc::now() - client.connected_at;

        if client.coaching_session_id.is_some() {
            self.coaching.leave(&client.user_id, connection_id).await;
        }

        let user_still_connected = {
            let connections = self.connections.read().await;
            connections
                .values()
                .any(|c| c.user_id == client.user_id)
        };
        if !user_still_connected {
            if let Some(session_id) = self.streaming.end_user_session(&client.user_id).await {
                info!(
                    user_id = %client.user_id,
                    session_id = %session_id,
                    "Ended streaming session after last connection closed"
                );
            }
        }

        info!(
            %connection_id,
            user_id = %client.user_id,
            status = %client.status,
            connected_secs = connected_for.num_seconds(),
            "WebSocket connection closed"
        );
    }

    async fn touch_heartbeat(&self, connection_id: Uuid) {
        let mut connections = self.connections.write().await;
        if let Some(client) = connections.get_mut(&connection_id) {
            client.last_heartbeat = Utc::now();
        }
    }

    // ========================================================================
    // Delivery
    // ========================================================================

    /// Send one envelope to one connection, preserving per-connection order.
    ///
    /// Returns false on failure, which also disconnects the target; a failed
    /// send means the forwarding task is gone and the transport with it.
    pub async fn send(&self, connection_id: Uuid, envelope: &WsEnvelope) -> bool {
        let Ok(text) = envelope.to_json() else {
            warn!(%connection_id, "Dropping unserializable envelope");
            return false;
        };

        let tx = {
            let connections = self.connections.read().await;
            connections.get(&connection_id).map(|c| c.tx.clone())
        };
        let Some(tx) = tx else {
            return false;
        };

        if tx.send(Message::Text(text)).is_err() {
            warn!(%connection_id, "Send failed; evicting connection");
            self.disconnect(connection_id).await;
            return false;
        }
        true
    }

    /// Broadcast an envelope to every connection in a coaching room.
    ///
    /// Operates on a point-in-time snapshot of the room's connection set; a
    /// failed send to one participant never aborts delivery to the rest.
    /// Returns the count actually delivered.
    pub async fn broadcast(&self, session_id: &str, envelope: &WsEnvelope) -> usize {
        let targets = self.coaching.connections(session_id).await;
        let mut delivered = 0;
        for connection_id in targets {
            if self.send(connection_id, envelope).await {
                delivered += 1;
            }
        }
        delivered
    }

    // ========================================================================
    // Inbound dispatch
    // ========================================================================

    /// Parse and route one inbound text frame.
    ///
    /// Malformed envelopes get a `validation_error` reply and the connection
    /// stays open; unknown message types are logged and dropped.
    async fn dispatch(&self, connection_id: Uuid, user_id: &str, text: &str) -> Dispatch {
        let envelope = match WsEnvelope::parse(text) {
            Ok(envelope) => envelope,
            Err(e) => {
                self.send(connection_id, &WsEnvelope::validation_error(&e.message))
                    .await;
                return Dispatch::Continue;
            }
        };

        let message_type = match envelope.resolve_type() {
            Ok(message_type) => message_type,
            Err(unknown) => {
                debug!(%connection_id, %unknown, "Dropping message of unknown type");
                return Dispatch::Continue;
            }
        };

        match message_type {
            MessageType::Connect => self.handle_connect(connection_id, &envelope).await,
            MessageType::Disconnect => {
                return Dispatch::Stop;
            }
            MessageType::Ping => {
                self.send(connection_id, &WsEnvelope::new(MessageType::Pong, json!({})))
                    .await;
            }
            MessageType::StartSession => {
                self.handle_start_session(connection_id, user_id, &envelope)
                    .await;
            }
            MessageType::EndSession => {
                self.handle_end_session(connection_id, user_id, &envelope)
                    .await;
            }
            MessageType::FrameData => {
                self.handle_frame_data(connection_id, user_id, &envelope)
                    .await;
            }
            MessageType::JoinSession => {
                self.handle_join_session(connection_id, user_id, &envelope)
                    .await;
            }
            MessageType::LeaveSession => {
                self.handle_leave_session(connection_id, user_id).await;
            }
            MessageType::CoachingTip | MessageType::DrillSuggestion => {
                self.handle_room_broadcast(connection_id, user_id, &envelope)
                    .await;
            }
            MessageType::PerformanceMetrics => {
                self.handle_metrics_pull(connection_id, user_id).await;
            }
            // Server-originated types arriving inbound carry no handler
            MessageType::Pong
            | MessageType::AnalysisResult
            | MessageType::Feedback
            | MessageType::KpiUpdate
            | MessageType::FaultDetected
            | MessageType::Error
            | MessageType::ValidationError => {
                debug!(%connection_id, %message_type, "Dropping message with no inbound handler");
            }
        }
        Dispatch::Continue
    }

    async fn handle_connect(&self, connection_id: Uuid, envelope: &WsEnvelope) {
        let payload: ConnectPayload = envelope.parse_data("connect").unwrap_or_default();
        {
            let mut connections = self.connections.write().await;
            if let Some(client) = connections.get_mut(&connection_id) {
                client.subscribed_topics = payload.topics.into_iter().collect();
                client.status = ConnectionStatus::Connected;
            }
        }
        let ack = WsEnvelope::new(
            MessageType::Connect,
            json!({ "connection_id": connection_id }),
        );
        self.send(connection_id, &ack).await;
    }

    async fn handle_start_session(
        &self,
        connection_id: Uuid,
        user_id: &str,
        envelope: &WsEnvelope,
    ) {
        let mut config: SessionConfig = match envelope.parse_data("start_session") {
            Ok(config) => config,
            Err(e) => {
                self.send(connection_id, &WsEnvelope::validation_error(&e.message))
                    .await;
                return;
            }
        };
        // The session belongs to the connection's user regardless of payload
        config.user_id = user_id.to_owned();

        match self.streaming.create_session(config).await {
            Ok(session_id) => {
                let ack = WsEnvelope::new(
                    MessageType::StartSession,
                    json!({ "session_id": session_id, "status": "started" }),
                )
                .with_user_id(user_id);
                self.send(connection_id, &ack).await;
            }
            Err(e) => {
                self.send(connection_id, &WsEnvelope::validation_error(&e.message))
                    .await;
            }
        }
    }

    async fn handle_end_session(&self, connection_id: Uuid, user_id: &str, envelope: &WsEnvelope) {
        let payload: EndSessionPayload = envelope.parse_data("end_session").unwrap_or_default();
        let target = match payload.session_id {
            Some(session_id) => Some(session_id),
            None => self
                .streaming
                .get_user_session(user_id)
                .await
                .map(|info| info.session_id),
        };

        let Some(session_id) = target else {
            let reply = WsEnvelope::new(
                MessageType::Error,
                json!({ "message": "no active streaming session" }),
            );
            self.send(connection_id, &reply).await;
            return;
        };

        let ended = self.streaming.end_session(&session_id).await;
        let ack = WsEnvelope::new(
            MessageType::EndSession,
            json!({ "session_id": session_id, "ended": ended }),
        );
        self.send(connection_id, &ack).await;
    }

    async fn handle_frame_data(&self, connection_id: Uuid, user_id: &str, envelope: &WsEnvelope) {
        let frame: PoseFrame = match envelope.parse_data("frame_data") {
            Ok(frame) => frame,
            Err(e) => {
                self.send(connection_id, &WsEnvelope::validation_error(&e.message))
                    .await;
                return;
            }
        };
        if let Err(e) = frame.validate() {
            self.send(connection_id, &WsEnvelope::validation_error(&e.message))
                .await;
            return;
        }

        let Some(session) = self.streaming.get_user_session(user_id).await else {
            let reply = WsEnvelope::new(
                MessageType::Error,
                json!({ "message": "no active streaming session; send start_session first" }),
            );
            self.send(connection_id, &reply).await;
            return;
        };

        let result = match self.streaming.process_frame(&session.session_id, frame).await {
            Ok(Some(result)) => result,
            // Throttled frame or a session that ended mid-analysis
            Ok(None) => return,
            Err(e) => {
                debug!(%connection_id, error = %e, "Frame rejected");
                return;
            }
        };

        let result_envelope = WsEnvelope::new(
            MessageType::AnalysisResult,
            serde_json::to_value(&result).unwrap_or_else(|_| json!({})),
        )
        .with_user_id(user_id);
        self.send(connection_id, &result_envelope).await;

        if let Some(feedback) = self
            .streaming
            .generate_feedback(&session.session_id, &result)
            .await
        {
            let feedback_envelope = WsEnvelope::new(
                MessageType::Feedback,
                json!({
                    "text": feedback,
                    "frame_index": result.frame_index,
                    "swing_phase": result.swing_phase,
                }),
            )
            .with_user_id(user_id);
            self.send(connection_id, &feedback_envelope).await;

            // Faults worth feedback are also surfaced to the user's room
            if let Some(room_id) = self.room_of(connection_id).await {
                let fault_event = WsEnvelope::new(
                    MessageType::FaultDetected,
                    json!({
                        "faults": result.detected_faults,
                        "frame_index": result.frame_index,
                    }),
                )
                .with_user_id(user_id)
                .with_session_id(&room_id);
                self.broadcast(&room_id, &fault_event).await;
            }
        }
    }

    async fn handle_join_session(&self, connection_id: Uuid, user_id: &str, envelope: &WsEnvelope) {
        let payload: RoomPayload = match envelope.parse_data("join_session") {
            Ok(payload) => payload,
            Err(e) => {
                self.send(connection_id, &WsEnvelope::validation_error(&e.message))
                    .await;
                return;
            }
        };

        // First joiner creates the room
        if self.coaching.get(&payload.session_id).await.is_none() {
            self.coaching
                .create(
                    &payload.session_id,
                    user_id,
                    payload.config.clone().unwrap_or_default(),
                )
                .await;
        }

        let joined = self
            .coaching
            .join(&payload.session_id, user_id, connection_id)
            .await;
        if joined {
            let mut connections = self.connections.write().await;
            if let Some(client) = connections.get_mut(&connection_id) {
                client.coaching_session_id = Some(payload.session_id.clone());
            }
        }

        let participants = self
            .coaching
            .get(&payload.session_id)
            .await
            .map(|room| room.participants)
            .unwrap_or_default();
        let ack = WsEnvelope::new(
            MessageType::JoinSession,
            json!({ "joined": joined, "participants": participants }),
        )
        .with_session_id(&payload.session_id)
        .with_user_id(user_id);
        self.send(connection_id, &ack).await;
    }

    async fn handle_leave_session(&self, connection_id: Uuid, user_id: &str) {
        let left_room = self.coaching.leave(user_id, connection_id).await;
        {
            let mut connections = self.connections.write().await;
            if let Some(client) = connections.get_mut(&connection_id) {
                client.coaching_session_id = None;
            }
        }
        let ack = WsEnvelope::new(
            MessageType::LeaveSession,
            json!({ "session_id": left_room }),
        )
        .with_user_id(user_id);
        self.send(connection_id, &ack).await;
    }

    /// Relay a coaching tip or drill suggestion to the sender's room,
    /// payload verbatim.
    async fn handle_room_broadcast(
        &self,
        connection_id: Uuid,
        user_id: &str,
        envelope: &WsEnvelope,
    ) {
        let room_id = match envelope.session_id.clone() {
            Some(room_id) => Some(room_id),
            None => self.room_of(connection_id).await,
        };
        let Some(room_id) = room_id else {
            self.send(
                connection_id,
                &WsEnvelope::validation_error("session_id required for room broadcast"),
            )
            .await;
            return;
        };

        if !self.coaching.is_participant(&room_id, user_id).await {
            let reply = WsEnvelope::new(
                MessageType::Error,
                json!({ "message": format!("not a participant of {room_id}") }),
            );
            self.send(connection_id, &reply).await;
            return;
        }

        let mut relayed = envelope.clone();
        relayed.session_id = Some(room_id.clone());
        relayed.user_id = Some(user_id.to_owned());
        let delivered = self.broadcast(&room_id, &relayed).await;
        debug!(%connection_id, room_id = %room_id, delivered, "Room message relayed");
    }

    async fn handle_metrics_pull(&self, connection_id: Uuid, user_id: &str) {
        let session_metrics = self
            .streaming
            .get_user_session(user_id)
            .await
            .map(|info| info.performance_metrics);
        let stats = self.system_stats().await;
        let reply = WsEnvelope::new(
            MessageType::PerformanceMetrics,
            json!({ "session": session_metrics, "system": stats }),
        )
        .with_user_id(user_id);
        self.send(connection_id, &reply).await;
    }

    /// Force-end a coaching room: destroy its bookkeeping and revoke every
    /// member connection's room pointer. Returns false for an unknown room.
    pub async fn end_coaching_session(&self, session_id: &str) -> bool {
        let members = self.coaching.connections(session_id).await;
        if !self.coaching.end(session_id).await {
            return false;
        }

        {
            let mut connections = self.connections.write().await;
            for connection_id in &members {
                if let Some(client) = connections.get_mut(connection_id) {
                    client.coaching_session_id = None;
                }
            }
        }

        let notice = WsEnvelope::new(
            MessageType::LeaveSession,
            json!({ "session_id": session_id, "reason": "session_ended" }),
        )
        .with_session_id(session_id);
        for connection_id in members {
            self.send(connection_id, &notice).await;
        }
        true
    }

    async fn room_of(&self, connection_id: Uuid) -> Option<String> {
        let connections = self.connections.read().await;
        connections
            .get(&connection_id)
            .and_then(|c| c.coaching_session_id.clone())
    }

    // ========================================================================
    // Aggregate stats
    // ========================================================================

    /// Current aggregate counters across the server
    pub async fn system_stats(&self) -> SystemStats {
        SystemStats {
            active_connections: self.connections.read().await.len(),
            active_sessions: self.streaming.active_session_count().await,
            active_coaching_sessions: self.coaching.active_room_count().await,
            total_frames_processed: self.streaming.total_frames_processed(),
        }
    }

    // ========================================================================
    // Background tasks
    // ========================================================================

    /// Start the background liveness sweep that evicts stale connections
    pub fn start_liveness_sweep(&self) {
        let manager = self.clone();
        let sweep_interval = Duration::from_secs(manager.config.sweep_interval_secs);
        let timeout_secs = manager.config.heartbeat_timeout_secs;
        tokio::spawn(async move {
            let mut ticker = interval(sweep_interval);
            loop {
                ticker.tick().await;
                manager.evict_stale_connections(timeout_secs).await;
            }
        });
    }

    /// Evict every connection whose heartbeat is older than the timeout
    pub async fn evict_stale_connections(&self, timeout_secs: u64) {
        let cutoff = Utc::now()
            - ChronoDuration::seconds(i64::try_from(timeout_secs).unwrap_or(i64::MAX));
        let stale: Vec<Uuid> = {
            let connections = self.connections.read().await;
            connections
                .iter()
                .filter(|(_, client)| client.last_heartbeat < cutoff)
                .map(|(id, _)| *id)
                .collect()
        };

        for connection_id in stale {
            info!(%connection_id, "Evicting connection with stale heartbeat");
            self.disconnect(connection_id).await;
        }
    }

    /// Start the background push of system stats to subscribed connections
    pub fn start_periodic_updates(&self) {
        let manager = self.clone();
        let push_interval = Duration::from_secs(manager.config.monitoring_interval_secs);
        tokio::spawn(async move {
            let mut ticker = interval(push_interval);
            loop {
                ticker.tick().await;
                manager.push_performance_metrics().await;
            }
        });
    }

    /// Deliver one stats envelope to each `performance`-subscribed connection
    async fn push_performance_metrics(&self) {
        let stats = self.system_stats().await;
        let envelope = WsEnvelope::new(
            MessageType::PerformanceMetrics,
            serde_json::to_value(&stats).unwrap_or_else(|_| json!({})),
        );

        let subscribers: Vec<Uuid> = {
            let connections = self.connections.read().await;
            connections
                .iter()
                .filter(|(_, client)| client.subscribed_topics.contains(PERFORMANCE_TOPIC))
                .map(|(id, _)| *id)
                .collect()
        };

        for connection_id in subscribers {
            self.send(connection_id, &envelope).await;
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;
    use crate::models::CoachingSessionConfig;

    fn test_manager() -> ConnectionManager {
        ConnectionManager::new(
            Arc::new(CoachingSessionRegistry::new()),
            Arc::new(StreamingSessionManager::with_defaults()),
            WebSocketConfig::default(),
        )
    }

    fn envelope_text(message_type: &str) -> String {
        format!(
            r#"{{"type":"{message_type}","data":{{}},"timestamp":1.0,"message_id":"m-1"}}"#
        )
    }

    #[tokio::test]
    async fn test_broadcast_counts_only_delivered() {
        let manager = test_manager();
        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_b, rx_b) = mpsc::unbounded_channel();
        let (tx_c, mut rx_c) = mpsc::unbounded_channel();
        let a = manager.accept("user-a", tx_a).await;
        let b = manager.accept("user-b", tx_b).await;
        let c = manager.accept("user-c", tx_c).await;

        let coaching = manager.coaching();
        assert!(
            coaching
                .create("room-1", "user-a", CoachingSessionConfig::default())
                .await
        );
        assert!(coaching.join("room-1", "user-a", a).await);
        assert!(coaching.join("room-1", "user-b", b).await);
        assert!(coaching.join("room-1", "user-c", c).await);

        // user-b's transport is gone; sends to it fail
        drop(rx_b);

        let envelope = WsEnvelope::new(MessageType::CoachingTip, json!({ "tip": "tempo" }));
        let delivered = manager.broadcast("room-1", &envelope).await;
        assert_eq!(delivered, 2);
        assert!(rx_a.recv().await.is_some());
        assert!(rx_c.recv().await.is_some());

        // The failed send evicted the dead connection
        assert_eq!(manager.system_stats().await.active_connections, 2);
    }

    #[tokio::test]
    async fn test_malformed_envelope_gets_validation_error_reply() {
        let manager = test_manager();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let id = manager.accept("user-a", tx).await;

        manager.dispatch(id, "user-a", "{not valid json").await;

        let Some(Message::Text(reply)) = rx.recv().await else {
            panic!("expected a validation_error reply");
        };
        assert!(reply.contains("validation_error"));
        // Connection stays open
        assert_eq!(manager.system_stats().await.active_connections, 1);
    }

    #[tokio::test]
    async fn test_unknown_type_dropped_without_reply() {
        let manager = test_manager();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let id = manager.accept("user-a", tx).await;

        manager
            .dispatch(id, "user-a", &envelope_text("telemetry_v2"))
            .await;

        assert!(rx.try_recv().is_err());
        assert_eq!(manager.system_stats().await.active_connections, 1);
    }

    #[tokio::test]
    async fn test_ping_answered_with_pong() {
        let manager = test_manager();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let id = manager.accept("user-a", tx).await;

        manager.dispatch(id, "user-a", &envelope_text("ping")).await;

        let Some(Message::Text(reply)) = rx.recv().await else {
            panic!("expected a pong reply");
        };
        let parsed = WsEnvelope::parse(&reply).unwrap();
        assert_eq!(parsed.message_type, "pong");
    }

    #[tokio::test]
    async fn test_stale_connections_are_evicted() {
        let manager = test_manager();
        let (tx, _rx) = mpsc::unbounded_channel();
        let _id = manager.accept("user-a", tx).await;
        assert_eq!(manager.system_stats().await.active_connections, 1);

        manager.evict_stale_connections(0).await;
        assert_eq!(manager.system_stats().await.active_connections, 0);
    }

    #[tokio::test]
    async fn test_end_coaching_session_revokes_member_pointers() {
        let manager = test_manager();
        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let a = manager.accept("user-a", tx_a).await;

        let coaching = manager.coaching();
        coaching
            .create("room-1", "user-a", CoachingSessionConfig::default())
            .await;
        coaching.join("room-1", "user-a", a).await;
        {
            let mut connections = manager.connections.write().await;
            connections.get_mut(&a).unwrap().coaching_session_id = Some("room-1".into());
        }

        assert!(manager.end_coaching_session("room-1").await);
        assert!(coaching.get("room-1").await.is_none());
        assert!(manager.room_of(a).await.is_none());

        // Members are told the room ended
        let Some(Message::Text(notice)) = rx_a.recv().await else {
            panic!("expected a leave_session notice");
        };
        assert!(notice.contains("session_ended"));

        assert!(!manager.end_coaching_session("room-1").await);
    }

    #[tokio::test]
    async fn test_disconnect_ends_streaming_session_for_last_connection() {
        let manager = test_manager();
        let (tx, _rx) = mpsc::unbounded_channel();
        let id = manager.accept("user-a", tx).await;

        let streaming = manager.streaming();
        let session_id = streaming
            .create_session(crate::models::SessionConfig::for_user("user-a"))
            .await
            .unwrap();

        manager.disconnect(id).await;
        assert!(streaming.get_session(&session_id).await.is_none());
    }
}
