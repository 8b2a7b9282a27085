// ABOUTME: Streaming analysis session manager: per-user contexts, sampling throttle, counters
// ABOUTME: Owns the session registry, the bounded frame history, and the analysis result cache
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 SwingSight

//! Streaming session management.
//!
//! One [`StreamingSessionManager`] owns every user's real-time analysis
//! context: configuration, frame counters, the sampling throttle, and the
//! running performance counters. Per-frame work is delegated to the
//! [`LiveAnalysisEngine`]; frames that are not sample points are dropped,
//! never queued, which is the whole backpressure story.
//!
//! At most one active session exists per user; creating a second one for
//! the same user ends the first. Registry mutations are atomic behind a
//! single lock, and counter updates after an analysis re-check registry
//! membership so in-flight work cannot resurrect an ended session.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};
use uuid::Uuid;

use crate::analysis::{
    gate_faults, FeedbackGenerator, FrameAnalysisResult, LiveAnalysisEngine, PhaseClassifier,
    TemplateFeedbackGenerator,
};
use crate::constants::analysis::FRAME_HISTORY_CAPACITY;
use crate::errors::{AppError, AppResult};
use crate::models::{FeedbackMode, PerformanceMetrics, PoseFrame, SessionConfig};

// ============================================================================
// Analysis result cache
// ============================================================================

/// Owned cache of the most recent analysis result per streaming session.
///
/// Explicitly owned and passed by handle rather than living as module-global
/// state; `clear_session` runs on session end and `clear` empties it fully.
#[derive(Debug, Default)]
pub struct AnalysisCache {
    entries: DashMap<String, FrameAnalysisResult>,
}

impl AnalysisCache {
    /// Create an empty cache
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the latest result for a session
    pub fn insert(&self, session_id: &str, result: FrameAnalysisResult) {
        self.entries.insert(session_id.to_owned(), result);
    }

    /// Latest result for a session, if one has been analyzed
    #[must_use]
    pub fn latest(&self, session_id: &str) -> Option<FrameAnalysisResult> {
        self.entries.get(session_id).map(|entry| entry.value().clone())
    }

    /// Drop the cached result for one session
    pub fn clear_session(&self, session_id: &str) {
        self.entries.remove(session_id);
    }

    /// Drop every cached result
    pub fn clear(&self) {
        self.entries.clear();
    }
}

// ============================================================================
// Session state
// ============================================================================

/// Private per-session analysis context
struct SessionState {
    config: SessionConfig,
    metrics: PerformanceMetrics,
    latency_sum_ms: f64,
    latency_samples: u64,
    classifier: PhaseClassifier,
    frame_history: VecDeque<PoseFrame>,
    created_at: DateTime<Utc>,
}

impl SessionState {
    fn new(config: SessionConfig) -> Self {
        Self {
            config,
            metrics: PerformanceMetrics::default(),
            latency_sum_ms: 0.0,
            latency_samples: 0,
            classifier: PhaseClassifier::new(),
            frame_history: VecDeque::with_capacity(FRAME_HISTORY_CAPACITY),
            created_at: Utc::now(),
        }
    }

    fn push_history(&mut self, frame: PoseFrame) {
        if self.frame_history.len() == FRAME_HISTORY_CAPACITY {
            self.frame_history.pop_front();
        }
        self.frame_history.push_back(frame);
    }

    /// Fold one analysis into the counters; the latency average is an exact
    /// running mean over all analyzed frames in the session.
    fn record_result(&mut self, result: &FrameAnalysisResult) {
        self.latency_sum_ms += result.analysis_latency_ms;
        self.latency_samples += 1;
        self.metrics.average_latency_ms = self.latency_sum_ms / self.latency_samples as f64;
        self.metrics.kpis_calculated += result.measurements.len() as u64;
        self.metrics.faults_detected += result.detected_faults.len() as u64;
    }
}

/// Public snapshot of one streaming session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamingSessionInfo {
    /// Session identifier
    pub session_id: String,
    /// Owning user
    pub user_id: String,
    /// Session configuration
    pub config: SessionConfig,
    /// Running performance counters
    pub performance_metrics: PerformanceMetrics,
    /// Creation time (UTC)
    pub created_at: DateTime<Utc>,
}

/// Registry maps kept consistent under one lock
#[derive(Default)]
struct Registry {
    by_id: HashMap<String, Arc<Mutex<SessionState>>>,
    by_user: HashMap<String, String>,
}

// ============================================================================
// Manager
// ============================================================================

/// Owns one analysis context per user and delegates sampled frames to the
/// live analysis engine.
pub struct StreamingSessionManager {
    engine: LiveAnalysisEngine,
    feedback_generator: Arc<dyn FeedbackGenerator>,
    registry: RwLock<Registry>,
    cache: AnalysisCache,
    total_frames: AtomicU64,
}

impl StreamingSessionManager {
    /// Build a manager over explicit collaborator implementations
    #[must_use]
    pub fn new(engine: LiveAnalysisEngine, feedback_generator: Arc<dyn FeedbackGenerator>) -> Self {
        Self {
            engine,
            feedback_generator,
            registry: RwLock::new(Registry::default()),
            cache: AnalysisCache::new(),
            total_frames: AtomicU64::new(0),
        }
    }

    /// Build a manager over the built-in collaborators
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(
            LiveAnalysisEngine::with_defaults(),
            Arc::new(TemplateFeedbackGenerator),
        )
    }

    /// Create a streaming session for `config.user_id`.
    ///
    /// If the user already owns a session it is ended first; its id becomes
    /// invalid and its cached results are dropped.
    ///
    /// # Errors
    ///
    /// Returns a validation error when the configuration is out of range.
    pub async fn create_session(&self, config: SessionConfig) -> AppResult<String> {
        config.validate()?;

        let session_id = Uuid::new_v4().to_string();
        let user_id = config.user_id.clone();

        let mut registry = self.registry.write().await;
        if let Some(previous_id) = registry.by_user.remove(&user_id) {
            registry.by_id.remove(&previous_id);
            self.cache.clear_session(&previous_id);
            info!(
                user_id = %user_id,
                previous_session_id = %previous_id,
                "Ended previous streaming session for user"
            );
        }
        registry
            .by_id
            .insert(session_id.clone(), Arc::new(Mutex::new(SessionState::new(config))));
        registry.by_user.insert(user_id.clone(), session_id.clone());
        drop(registry);

        info!(user_id = %user_id, session_id = %session_id, "Streaming session created");
        Ok(session_id)
    }

    /// Snapshot a session by id
    pub async fn get_session(&self, session_id: &str) -> Option<StreamingSessionInfo> {
        let state = {
            let registry = self.registry.read().await;
            registry.by_id.get(session_id)?.clone()
        };
        let state = state.lock().await;
        Some(Self::snapshot(session_id, &state))
    }

    /// Snapshot a user's active session, if any
    pub async fn get_user_session(&self, user_id: &str) -> Option<StreamingSessionInfo> {
        let session_id = {
            let registry = self.registry.read().await;
            registry.by_user.get(user_id)?.clone()
        };
        self.get_session(&session_id).await
    }

    /// Running counters for a session
    pub async fn metrics(&self, session_id: &str) -> Option<PerformanceMetrics> {
        self.get_session(session_id)
            .await
            .map(|info| info.performance_metrics)
    }

    /// Latest cached analysis result for a session
    #[must_use]
    pub fn latest_result(&self, session_id: &str) -> Option<FrameAnalysisResult> {
        self.cache.latest(session_id)
    }

    /// End a session by id; returns false when the id is unknown
    pub async fn end_session(&self, session_id: &str) -> bool {
        let mut registry = self.registry.write().await;
        let Some(_state) = registry.by_id.remove(session_id) else {
            return false;
        };
        registry.by_user.retain(|_, id| id != session_id);
        drop(registry);

        self.cache.clear_session(session_id);
        info!(session_id = %session_id, "Streaming session ended");
        true
    }

    /// End the session owned by `user_id`, returning its id if one existed.
    /// Used when a user's last connection disappears.
    pub async fn end_user_session(&self, user_id: &str) -> Option<String> {
        let session_id = {
            let registry = self.registry.read().await;
            registry.by_user.get(user_id)?.clone()
        };
        self.end_session(&session_id).await.then_some(session_id)
    }

    /// Feed one frame into a session.
    ///
    /// Every frame increments `frames_processed`; only sample points (every
    /// `analysis_frequency`-th frame) invoke the analysis engine. Returns
    /// `Ok(None)` for dropped frames and for analyses that finish after the
    /// session is gone.
    ///
    /// # Errors
    ///
    /// Returns a not-found error when the session id is unknown; no state is
    /// mutated in that case.
    pub async fn process_frame(
        &self,
        session_id: &str,
        frame: PoseFrame,
    ) -> AppResult<Option<FrameAnalysisResult>> {
        let state = {
            let registry = self.registry.read().await;
            registry
                .by_id
                .get(session_id)
                .cloned()
                .ok_or_else(|| AppError::not_found(format!("streaming session {session_id}")))?
        };

        let result = {
            let mut state = state.lock().await;
            state.metrics.frames_processed += 1;
            self.total_frames.fetch_add(1, Ordering::Relaxed);

            let is_sample_point =
                state.metrics.frames_processed % u64::from(state.config.analysis_frequency) == 0;
            if !is_sample_point {
                // The throttle: excess frames are dropped, never queued
                return Ok(None);
            }

            if !state.config.enable_real_time_kpis {
                return Ok(None);
            }

            let previous = state.frame_history.back().cloned();
            let result = self
                .engine
                .analyze(&frame, previous.as_ref(), &mut state.classifier);
            state.push_history(frame);
            result
        };

        // Check-then-act: an analysis that raced an end_session is discarded
        // without touching the (now orphaned) counters.
        let still_registered = {
            let registry = self.registry.read().await;
            registry.by_id.contains_key(session_id)
        };
        if !still_registered {
            debug!(session_id = %session_id, "Discarding analysis for ended session");
            return Ok(None);
        }

        {
            let mut state = state.lock().await;
            state.record_result(&result);
        }
        self.cache.insert(session_id, result.clone());

        Ok(Some(result))
    }

    /// Apply the session's feedback threshold to a result and render
    /// feedback text when faults survive the gate.
    pub async fn generate_feedback(
        &self,
        session_id: &str,
        result: &FrameAnalysisResult,
    ) -> Option<String> {
        let state = {
            let registry = self.registry.read().await;
            registry.by_id.get(session_id)?.clone()
        };

        let mut state = state.lock().await;
        if !state.config.enable_instant_feedback
            || state.config.feedback_mode == FeedbackMode::Silent
        {
            return None;
        }

        let gated = gate_faults(&result.detected_faults, state.config.feedback_threshold)?;
        match self.feedback_generator.generate(&gated, &state.config) {
            Ok(text) => {
                state.metrics.feedback_generated += 1;
                Some(text)
            }
            Err(e) => {
                debug!(session_id = %session_id, error = %e, "Feedback generation failed");
                None
            }
        }
    }

    /// Number of active streaming sessions
    pub async fn active_session_count(&self) -> usize {
        self.registry.read().await.by_id.len()
    }

    /// Frames received across all sessions since startup
    #[must_use]
    pub fn total_frames_processed(&self) -> u64 {
        self.total_frames.load(Ordering::Relaxed)
    }

    fn snapshot(session_id: &str, state: &SessionState) -> StreamingSessionInfo {
        StreamingSessionInfo {
            session_id: session_id.to_owned(),
            user_id: state.config.user_id.clone(),
            config: state.config.clone(),
            performance_metrics: state.metrics.clone(),
            created_at: state.created_at,
        }
    }
}

impl Default for StreamingSessionManager {
    fn default() -> Self {
        Self::with_defaults()
    }
}
