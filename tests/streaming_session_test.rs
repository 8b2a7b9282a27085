// ABOUTME: Integration tests for the streaming session manager
// ABOUTME: Validates the sampling throttle, session lifecycle, and performance counters
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 SwingSight

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use swingsight_server::models::SessionConfig;
use swingsight_server::streaming::StreamingSessionManager;

fn config_with_frequency(user_id: &str, analysis_frequency: u32) -> SessionConfig {
    let mut config = SessionConfig::for_user(user_id);
    config.analysis_frequency = analysis_frequency;
    config
}

// ============================================================================
// Sampling throttle
// ============================================================================

#[tokio::test]
async fn test_engine_invoked_floor_k_over_n_times() {
    for (frequency, frame_count) in [(1_u32, 7_u64), (2, 9), (5, 23), (7, 6)] {
        let manager = StreamingSessionManager::with_defaults();
        let session_id = manager
            .create_session(config_with_frequency("golfer-1", frequency))
            .await
            .unwrap();

        let mut analyzed = 0_u64;
        for i in 0..frame_count {
            let frame = common::address_frame(i, i as f64 * 0.033);
            if manager
                .process_frame(&session_id, frame)
                .await
                .unwrap()
                .is_some()
            {
                analyzed += 1;
            }
        }
        assert_eq!(
            analyzed,
            frame_count / u64::from(frequency),
            "frequency {frequency}, {frame_count} frames"
        );
    }
}

#[tokio::test]
async fn test_frequency_three_samples_third_sixth_ninth_frames() {
    let manager = StreamingSessionManager::with_defaults();
    let session_id = manager
        .create_session(config_with_frequency("golfer-1", 3))
        .await
        .unwrap();

    let mut analyzed_indices = Vec::new();
    for i in 0..10_u64 {
        let frame = common::address_frame(i, i as f64 * 0.033);
        if let Some(result) = manager.process_frame(&session_id, frame).await.unwrap() {
            analyzed_indices.push(result.frame_index);
        }
    }

    // The 3rd, 6th, and 9th processed frames carry indices 2, 5, 8
    assert_eq!(analyzed_indices, vec![2, 5, 8]);
}

#[tokio::test]
async fn test_dropped_frames_still_count_as_processed() {
    let manager = StreamingSessionManager::with_defaults();
    let session_id = manager
        .create_session(config_with_frequency("golfer-1", 5))
        .await
        .unwrap();

    for i in 0..4_u64 {
        let result = manager
            .process_frame(&session_id, common::address_frame(i, i as f64 * 0.033))
            .await
            .unwrap();
        assert!(result.is_none());
    }

    let metrics = manager.metrics(&session_id).await.unwrap();
    assert_eq!(metrics.frames_processed, 4);
    assert_eq!(metrics.kpis_calculated, 0);
}

// ============================================================================
// One session per user
// ============================================================================

#[tokio::test]
async fn test_second_session_invalidates_first() {
    let manager = StreamingSessionManager::with_defaults();
    let first = manager
        .create_session(SessionConfig::for_user("golfer-1"))
        .await
        .unwrap();
    let second = manager
        .create_session(SessionConfig::for_user("golfer-1"))
        .await
        .unwrap();

    assert_ne!(first, second);
    assert!(manager.get_session(&first).await.is_none());
    assert!(manager.get_session(&second).await.is_some());
    assert_eq!(
        manager.get_user_session("golfer-1").await.unwrap().session_id,
        second
    );
    assert_eq!(manager.active_session_count().await, 1);
}

#[tokio::test]
async fn test_distinct_users_hold_distinct_sessions() {
    let manager = StreamingSessionManager::with_defaults();
    let a = manager
        .create_session(SessionConfig::for_user("golfer-a"))
        .await
        .unwrap();
    let b = manager
        .create_session(SessionConfig::for_user("golfer-b"))
        .await
        .unwrap();

    assert!(manager.get_session(&a).await.is_some());
    assert!(manager.get_session(&b).await.is_some());
    assert_eq!(manager.active_session_count().await, 2);
}

// ============================================================================
// Session teardown
// ============================================================================

#[tokio::test]
async fn test_end_session_fully_removes_entity() {
    let manager = StreamingSessionManager::with_defaults();
    let session_id = manager
        .create_session(SessionConfig::for_user("golfer-1"))
        .await
        .unwrap();

    assert!(manager.end_session(&session_id).await);
    assert!(manager.get_session(&session_id).await.is_none());
    assert!(manager.get_user_session("golfer-1").await.is_none());
    assert!(manager.metrics(&session_id).await.is_none());
    assert!(manager.latest_result(&session_id).is_none());

    // Ending twice is a clean failure
    assert!(!manager.end_session(&session_id).await);
}

#[tokio::test]
async fn test_process_frame_on_unknown_session_is_not_found() {
    let manager = StreamingSessionManager::with_defaults();
    let result = manager
        .process_frame("no-such-session", common::address_frame(0, 0.0))
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_end_user_session_reports_ended_id() {
    let manager = StreamingSessionManager::with_defaults();
    let session_id = manager
        .create_session(SessionConfig::for_user("golfer-1"))
        .await
        .unwrap();

    assert_eq!(
        manager.end_user_session("golfer-1").await,
        Some(session_id)
    );
    assert!(manager.end_user_session("golfer-1").await.is_none());
}

// ============================================================================
// Performance counters
// ============================================================================

#[tokio::test]
async fn test_counters_accumulate_across_analyzed_frames() {
    let manager = StreamingSessionManager::with_defaults();
    let session_id = manager
        .create_session(config_with_frequency("golfer-1", 2))
        .await
        .unwrap();

    for i in 0..10_u64 {
        manager
            .process_frame(&session_id, common::address_frame(i, i as f64 * 0.033))
            .await
            .unwrap();
    }

    let metrics = manager.metrics(&session_id).await.unwrap();
    assert_eq!(metrics.frames_processed, 10);
    // Five analyzed frames, each with at least the baseline measurement
    assert!(metrics.kpis_calculated >= 5);
    assert!(metrics.average_latency_ms >= 0.0);
    assert_eq!(manager.total_frames_processed(), 10);

    // Latest result is cached for the control plane
    let latest = manager.latest_result(&session_id).unwrap();
    assert_eq!(latest.frame_index, 9);
}

#[tokio::test]
async fn test_cache_cleared_on_session_end() {
    let manager = StreamingSessionManager::with_defaults();
    let session_id = manager
        .create_session(config_with_frequency("golfer-1", 1))
        .await
        .unwrap();

    manager
        .process_frame(&session_id, common::address_frame(0, 0.0))
        .await
        .unwrap();
    assert!(manager.latest_result(&session_id).is_some());

    manager.end_session(&session_id).await;
    assert!(manager.latest_result(&session_id).is_none());
}
