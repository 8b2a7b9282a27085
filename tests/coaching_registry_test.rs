// ABOUTME: Integration tests for the coaching session registry
// ABOUTME: Validates room creation, joins, leaves, empty-room destruction, and forced end
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 SwingSight

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

use swingsight_server::coaching::CoachingSessionRegistry;
use swingsight_server::models::CoachingSessionConfig;
use uuid::Uuid;

// ============================================================================
// Creation
// ============================================================================

#[tokio::test]
async fn test_create_rejects_duplicate_ids() {
    let registry = CoachingSessionRegistry::new();
    assert!(
        registry
            .create("room-1", "coach", CoachingSessionConfig::default())
            .await
    );
    assert!(
        !registry
            .create("room-1", "someone-else", CoachingSessionConfig::default())
            .await
    );

    // The original room is untouched
    let room = registry.get("room-1").await.unwrap();
    assert_eq!(room.creator_user_id, "coach");
}

#[tokio::test]
async fn test_creator_is_first_participant() {
    let registry = CoachingSessionRegistry::new();
    registry
        .create("room-1", "coach", CoachingSessionConfig::default())
        .await;
    let room = registry.get("room-1").await.unwrap();
    assert!(room.participants.contains("coach"));
    assert_eq!(room.participants.len(), 1);
}

// ============================================================================
// Joining and leaving
// ============================================================================

#[tokio::test]
async fn test_join_tracks_participants_and_connections() {
    let registry = CoachingSessionRegistry::new();
    registry
        .create("room-1", "coach", CoachingSessionConfig::default())
        .await;

    let coach_conn = Uuid::new_v4();
    let student_conn = Uuid::new_v4();
    assert!(registry.join("room-1", "coach", coach_conn).await);
    assert!(registry.join("room-1", "student", student_conn).await);

    let room = registry.get("room-1").await.unwrap();
    assert_eq!(room.participants.len(), 2);
    assert_eq!(registry.connections("room-1").await.len(), 2);
    assert!(registry.is_participant("room-1", "student").await);
}

#[tokio::test]
async fn test_join_unknown_room_fails_without_mutation() {
    let registry = CoachingSessionRegistry::new();
    assert!(!registry.join("no-such-room", "student", Uuid::new_v4()).await);
    assert_eq!(registry.active_room_count().await, 0);
}

#[tokio::test]
async fn test_join_respects_participant_cap() {
    let registry = CoachingSessionRegistry::new();
    let config = CoachingSessionConfig {
        name: Some("clinic".into()),
        max_participants: Some(2),
    };
    registry.create("room-1", "coach", config).await;

    assert!(registry.join("room-1", "coach", Uuid::new_v4()).await);
    assert!(registry.join("room-1", "student-a", Uuid::new_v4()).await);
    assert!(!registry.join("room-1", "student-b", Uuid::new_v4()).await);
}

#[tokio::test]
async fn test_leave_returns_room_and_destroys_when_empty() {
    let registry = CoachingSessionRegistry::new();
    registry
        .create("room-1", "coach", CoachingSessionConfig::default())
        .await;
    let coach_conn = Uuid::new_v4();
    let student_conn = Uuid::new_v4();
    registry.join("room-1", "coach", coach_conn).await;
    registry.join("room-1", "student", student_conn).await;

    assert_eq!(
        registry.leave("student", student_conn).await.as_deref(),
        Some("room-1")
    );
    assert_eq!(registry.active_room_count().await, 1);

    // Last participant out destroys the room
    assert_eq!(
        registry.leave("coach", coach_conn).await.as_deref(),
        Some("room-1")
    );
    assert_eq!(registry.active_room_count().await, 0);
    assert!(registry.get("room-1").await.is_none());
}

#[tokio::test]
async fn test_leave_with_no_membership_is_none() {
    let registry = CoachingSessionRegistry::new();
    assert!(registry.leave("nobody", Uuid::new_v4()).await.is_none());
}

// ============================================================================
// Forced end
// ============================================================================

#[tokio::test]
async fn test_end_removes_all_bookkeeping() {
    let registry = CoachingSessionRegistry::new();
    registry
        .create("room-1", "coach", CoachingSessionConfig::default())
        .await;
    registry.join("room-1", "coach", Uuid::new_v4()).await;
    registry.join("room-1", "student", Uuid::new_v4()).await;

    assert!(registry.end("room-1").await);
    assert!(registry.get("room-1").await.is_none());
    assert!(registry.connections("room-1").await.is_empty());
    assert!(!registry.is_participant("room-1", "student").await);

    // Ending twice is a clean failure
    assert!(!registry.end("room-1").await);
}
