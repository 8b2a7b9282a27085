// ABOUTME: Live analysis module: phase classification, KPIs, faults, feedback
// ABOUTME: Per-frame pipeline plus the collaborator seams it orchestrates
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 SwingSight

//! # Live Analysis
//!
//! The per-frame analysis pipeline and its collaborators. The engine in
//! [`engine`] orchestrates the pure components: the phase classifier, the
//! quality gate, phase-conditional measurement extraction, and adaptive
//! fault filtering. All of it is transport-agnostic; the streaming session
//! manager owns invocation cadence.

/// Per-frame pipeline orchestration and result assembly
pub mod engine;
/// Technique fault model, range classifier, and adaptive filter
pub mod faults;
/// Feedback gate and generator seam
pub mod feedback;
/// Typed KPI extraction with phase-conditional selection
pub mod measurements;
/// Heuristic swing-phase classifier with hysteresis
pub mod phase;

pub use engine::{FrameAnalysisResult, LiveAnalysisEngine};
pub use faults::{
    AdaptiveFaultFilter, FaultClassifier, PPosition, RangeCheckFaultClassifier, SwingFault,
};
pub use feedback::{gate_faults, FeedbackGenerator, TemplateFeedbackGenerator};
pub use measurements::{
    kinds_for_phase, GeometricKpiExtractor, Measurement, MeasurementExtractor, MeasurementKind,
};
pub use phase::{PhaseClassification, PhaseClassifier, SwingPhase};
