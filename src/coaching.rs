// ABOUTME: Coaching session registry tracking multi-participant rooms over the transport
// ABOUTME: Maps rooms to participants and live connections for broadcast features
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 SwingSight

//! Coaching room registry.
//!
//! Tracks multi-participant rooms (creator, participant set, per-room
//! connection set) used for broadcast features layered over the transport.
//! A room whose participant set becomes empty is destroyed immediately. All
//! mutations are atomic behind the registry lock; callers broadcasting to a
//! room operate on a point-in-time snapshot of its connection set.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::{CoachingSession, CoachingSessionConfig, CoachingSessionStatus};

/// One room plus the live connections attached to it
struct Room {
    session: CoachingSession,
    connections: HashSet<Uuid>,
}

/// Registry of active coaching rooms
#[derive(Default)]
pub struct CoachingSessionRegistry {
    rooms: RwLock<HashMap<String, Room>>,
}

impl CoachingSessionRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a room. The creator becomes its first participant. Returns
    /// false when the id is already taken; no state changes in that case.
    pub async fn create(
        &self,
        session_id: &str,
        creator_user_id: &str,
        config: CoachingSessionConfig,
    ) -> bool {
        let mut rooms = self.rooms.write().await;
        if rooms.contains_key(session_id) {
            return false;
        }

        let mut participants = HashSet::new();
        participants.insert(creator_user_id.to_owned());
        rooms.insert(
            session_id.to_owned(),
            Room {
                session: CoachingSession {
                    session_id: session_id.to_owned(),
                    creator_user_id: creator_user_id.to_owned(),
                    participants,
                    status: CoachingSessionStatus::Active,
                    created_at: Utc::now(),
                    config,
                },
                connections: HashSet::new(),
            },
        );
        drop(rooms);

        info!(session_id = %session_id, creator = %creator_user_id, "Coaching room created");
        true
    }

    /// Join a room with one live connection. Returns false for an unknown
    /// room or one already at its participant cap.
    pub async fn join(&self, session_id: &str, user_id: &str, connection_id: Uuid) -> bool {
        let mut rooms = self.rooms.write().await;
        let Some(room) = rooms.get_mut(session_id) else {
            return false;
        };

        if let Some(cap) = room.session.config.max_participants {
            let is_new_participant = !room.session.participants.contains(user_id);
            if is_new_participant && room.session.participants.len() >= cap {
                warn!(session_id = %session_id, user_id = %user_id, "Coaching room is full");
                return false;
            }
        }

        room.session.participants.insert(user_id.to_owned());
        room.connections.insert(connection_id);
        drop(rooms);

        info!(session_id = %session_id, user_id = %user_id, %connection_id, "Joined coaching room");
        true
    }

    /// Remove a user and connection from whichever room holds them.
    ///
    /// Destroys the room if its participant set becomes empty. Returns the
    /// room id, or `None` when the connection was in no room.
    pub async fn leave(&self, user_id: &str, connection_id: Uuid) -> Option<String> {
        let mut rooms = self.rooms.write().await;
        let session_id = rooms
            .iter()
            .find(|(_, room)| {
                room.connections.contains(&connection_id)
                    || room.session.participants.contains(user_id)
            })
            .map(|(id, _)| id.clone())?;

        let emptied = {
            let room = rooms.get_mut(&session_id)?;
            room.connections.remove(&connection_id);
            room.session.participants.remove(user_id);
            room.session.participants.is_empty()
        };
        if emptied {
            rooms.remove(&session_id);
        }
        drop(rooms);

        info!(
            session_id = %session_id,
            user_id = %user_id,
            destroyed = emptied,
            "Left coaching room"
        );
        Some(session_id)
    }

    /// Force-destroy a room. Returns false when the id is unknown. The
    /// caller revokes participants' session pointers using the connection
    /// snapshot taken via [`Self::connections`] before ending.
    pub async fn end(&self, session_id: &str) -> bool {
        let removed = self.rooms.write().await.remove(session_id).is_some();
        if removed {
            info!(session_id = %session_id, "Coaching room ended");
        }
        removed
    }

    /// Snapshot a room's public state
    pub async fn get(&self, session_id: &str) -> Option<CoachingSession> {
        let rooms = self.rooms.read().await;
        rooms.get(session_id).map(|room| room.session.clone())
    }

    /// Point-in-time snapshot of a room's connection set, for broadcast
    pub async fn connections(&self, session_id: &str) -> Vec<Uuid> {
        let rooms = self.rooms.read().await;
        rooms
            .get(session_id)
            .map(|room| room.connections.iter().copied().collect())
            .unwrap_or_default()
    }

    /// True when the room exists and lists this user as a participant
    pub async fn is_participant(&self, session_id: &str, user_id: &str) -> bool {
        let rooms = self.rooms.read().await;
        rooms
            .get(session_id)
            .is_some_and(|room| room.session.participants.contains(user_id))
    }

    /// Number of active rooms
    pub async fn active_room_count(&self) -> usize {
        self.rooms.read().await.len()
    }
}
