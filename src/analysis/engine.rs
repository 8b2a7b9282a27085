// ABOUTME: Per-frame live analysis pipeline: phase, quality gate, KPIs, faults, latency
// ABOUTME: Catches every internal failure at the smallest scope; always returns a result
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 SwingSight

//! Live analysis engine.
//!
//! Orchestrates the per-frame pipeline for one sampled frame: phase
//! classification, the quality gate, phase-conditional measurement
//! extraction, and adaptive fault filtering, with the elapsed wall-clock
//! time stamped onto the result. A failure in any step degrades that step's
//! output (empty list, fallback phase) instead of failing the frame; the
//! engine never returns an error.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::warn;

use crate::analysis::faults::{AdaptiveFaultFilter, FaultClassifier, SwingFault};
use crate::analysis::measurements::{kinds_for_phase, Measurement, MeasurementExtractor};
use crate::analysis::phase::{PhaseClassifier, SwingPhase};
use crate::constants::analysis::{
    MAX_COORDINATE_MAGNITUDE, MIN_QUALITY_SCORE, POSITION_WEIGHT, VISIBILITY_WEIGHT,
};
use crate::models::PoseFrame;

/// Joints the quality gate requires for a trustworthy frame
const ESSENTIAL_JOINTS: &[&str] = &[
    "left_shoulder",
    "right_shoulder",
    "left_hip",
    "right_hip",
    "left_wrist",
    "right_wrist",
];

/// Output of the pipeline for one analyzed frame
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameAnalysisResult {
    /// Sequence number of the analyzed frame
    pub frame_index: u64,
    /// Capture timestamp of the analyzed frame
    pub timestamp: f64,
    /// Accepted swing phase
    pub swing_phase: SwingPhase,
    /// Classifier confidence in [0, 1]
    pub phase_confidence: f64,
    /// Frame quality in [0, 1]; below the gate the lists are empty
    pub quality_score: f64,
    /// Extracted measurements (empty under the quality gate)
    pub measurements: Vec<Measurement>,
    /// Faults surviving the adaptive filter (empty under the quality gate)
    pub detected_faults: Vec<SwingFault>,
    /// Wall-clock pipeline time for this frame
    pub analysis_latency_ms: f64,
}

/// Per-frame analysis pipeline over injected collaborator capabilities
pub struct LiveAnalysisEngine {
    extractor: Arc<dyn MeasurementExtractor>,
    fault_classifier: Arc<dyn FaultClassifier>,
}

impl LiveAnalysisEngine {
    /// Build an engine over explicit collaborator implementations
    #[must_use]
    pub fn new(
        extractor: Arc<dyn MeasurementExtractor>,
        fault_classifier: Arc<dyn FaultClassifier>,
    ) -> Self {
        Self {
            extractor,
            fault_classifier,
        }
    }

    /// Build an engine over the built-in geometric collaborators
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(
            Arc::new(crate::analysis::measurements::GeometricKpiExtractor),
            Arc::new(crate::analysis::faults::RangeCheckFaultClassifier),
        )
    }

    /// Run the full pipeline for one sampled frame.
    ///
    /// `classifier` is the session's phase classifier (it owns the accepted
    /// phase history); `previous` is the most recent frame from the
    /// session's bounded history, if any.
    pub fn analyze(
        &self,
        frame: &PoseFrame,
        previous: Option<&PoseFrame>,
        classifier: &mut PhaseClassifier,
    ) -> FrameAnalysisResult {
        let started = Instant::now();

        // Step 1: phase classification (internally non-failing)
        let classification = classifier.classify(frame, previous);

        // Step 2: quality gate bounds worst-case latency on degenerate input
        let quality_score = Self::quality_score(frame);
        if quality_score < MIN_QUALITY_SCORE {
            return FrameAnalysisResult {
                frame_index: frame.frame_index,
                timestamp: frame.timestamp,
                swing_phase: classification.phase,
                phase_confidence: classification.confidence,
                quality_score,
                measurements: Vec::new(),
                detected_faults: Vec::new(),
                analysis_latency_ms: Self::elapsed_ms(started),
            };
        }

        // Step 3: phase-conditional measurement extraction
        let kinds = kinds_for_phase(classification.phase);
        let measurements = match self
            .extractor
            .extract(frame, previous, classification.phase, &kinds)
        {
            Ok(measurements) => measurements,
            Err(e) => {
                warn!(
                    frame_index = frame.frame_index,
                    error = %e,
                    "Measurement extraction failed; degrading to empty list"
                );
                Vec::new()
            }
        };

        // Step 4: fault classification + adaptive filtering
        let raw_faults = match self
            .fault_classifier
            .classify(&measurements, classification.phase)
        {
            Ok(faults) => faults,
            Err(e) => {
                warn!(
                    frame_index = frame.frame_index,
                    error = %e,
                    "Fault classification failed; degrading to empty list"
                );
                Vec::new()
            }
        };
        let detected_faults = AdaptiveFaultFilter::filter(raw_faults, classification.phase);

        // Step 5: latency stamp
        FrameAnalysisResult {
            frame_index: frame.frame_index,
            timestamp: frame.timestamp,
            swing_phase: classification.phase,
            phase_confidence: classification.confidence,
            quality_score,
            measurements,
            detected_faults,
            analysis_latency_ms: Self::elapsed_ms(started),
        }
    }

    /// Weighted blend of keypoint visibility and positional plausibility
    /// over the essential joints, clamped to [0, 1].
    #[must_use]
    pub fn quality_score(frame: &PoseFrame) -> f64 {
        let joint_count = ESSENTIAL_JOINTS.len() as f64;

        let mut visibility_sum = 0.0;
        let mut position_sum = 0.0;
        for joint in ESSENTIAL_JOINTS {
            if let Some(keypoint) = frame.keypoints.get(*joint) {
                visibility_sum += keypoint.visibility.unwrap_or(1.0).clamp(0.0, 1.0);
                let plausible = keypoint.x.abs() <= MAX_COORDINATE_MAGNITUDE
                    && keypoint.y.abs() <= MAX_COORDINATE_MAGNITUDE
                    && keypoint.z.abs() <= MAX_COORDINATE_MAGNITUDE;
                if plausible {
                    position_sum += 1.0;
                }
            }
        }

        let avg_visibility = visibility_sum / joint_count;
        let avg_position = position_sum / joint_count;
        POSITION_WEIGHT
            .mul_add(avg_position, VISIBILITY_WEIGHT * avg_visibility)
            .clamp(0.0, 1.0)
    }

    fn elapsed_ms(started: Instant) -> f64 {
        started.elapsed().as_secs_f64() * 1000.0
    }
}
