// ABOUTME: Technique fault model, range-check classifier, and adaptive phase filter
// ABOUTME: Narrows raw faults to phase-relevant ones and rescales severity for critical phases
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 SwingSight

//! Fault classification and adaptive filtering.
//!
//! A fault is a flagged deviation of one or more measurements from an
//! expected range, carrying a severity and the P-positions it is relevant
//! to. The adaptive filter keeps only faults whose position list intersects
//! the current phase's mapped positions (an empty list means generic,
//! always relevant), rescales severity for critical phases, and drops
//! anything that falls below the minimum severity floor.

use serde::{Deserialize, Serialize};

use crate::analysis::measurements::{Measurement, MeasurementKind};
use crate::analysis::phase::SwingPhase;
use crate::constants::analysis::{
    CRITICAL_PHASE_SEVERITY_SCALE, MIN_FAULT_SEVERITY, NONCRITICAL_PHASE_SEVERITY_SCALE,
};
use crate::errors::AppResult;

/// Named phase markers (P-system) used to scope fault relevance
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum PPosition {
    /// Address
    P1,
    /// Shaft parallel, takeaway
    P2,
    /// Lead arm parallel, backswing
    P3,
    /// Top of swing
    P4,
    /// Lead arm parallel, downswing
    P5,
    /// Shaft parallel, delivery
    P6,
    /// Impact
    P7,
    /// Shaft parallel, release
    P8,
    /// Lead arm parallel, follow-through
    P9,
    /// Finish
    P10,
}

/// P-positions in play for each swing phase
#[must_use]
pub const fn positions_for_phase(phase: SwingPhase) -> &'static [PPosition] {
    match phase {
        SwingPhase::Setup => &[PPosition::P1],
        SwingPhase::Takeaway => &[PPosition::P1, PPosition::P2],
        SwingPhase::Backswing => &[PPosition::P2, PPosition::P3, PPosition::P4],
        SwingPhase::TopOfSwing => &[PPosition::P4],
        SwingPhase::Downswing => &[PPosition::P5, PPosition::P6],
        SwingPhase::Impact => &[PPosition::P7],
        SwingPhase::FollowThrough => &[PPosition::P8, PPosition::P9],
        SwingPhase::Finish => &[PPosition::P10],
        SwingPhase::Unknown => &[],
    }
}

/// A flagged deviation of measurements from their expected range
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwingFault {
    /// Stable fault identifier (e.g. `lateral_sway`)
    pub name: String,
    /// Human-readable description of the deviation
    pub description: String,
    /// Severity in [0, 1]; rescaled by the adaptive filter
    pub severity: f64,
    /// P-positions this fault applies to; empty means always relevant
    pub positions: Vec<PPosition>,
}

/// Capability seam: turns extracted measurements into raw faults.
///
/// Implementations must be pure; the engine catches any error and degrades
/// that pipeline step to an empty fault list.
pub trait FaultClassifier: Send + Sync {
    /// Classify measurements into raw (unfiltered) faults
    ///
    /// # Errors
    ///
    /// Returns an analysis error only on internal failure.
    fn classify(
        &self,
        measurements: &[Measurement],
        phase: SwingPhase,
    ) -> AppResult<Vec<SwingFault>>;
}

// ============================================================================
// Range-check classifier
// ============================================================================

/// Expected range for one measurement kind plus the fault it raises
struct ExpectedRange {
    kind: MeasurementKind,
    min: f64,
    max: f64,
    fault_name: &'static str,
    description: &'static str,
    positions: &'static [PPosition],
}

/// Expected-range table for the reference classifier. Severity grows with
/// the relative deviation from the violated bound.
const EXPECTED_RANGES: &[ExpectedRange] = &[
    ExpectedRange {
        kind: MeasurementKind::SpineAngle,
        min: 25.0,
        max: 45.0,
        fault_name: "posture_loss",
        description: "Spine angle outside the address window",
        positions: &[PPosition::P1],
    },
    ExpectedRange {
        kind: MeasurementKind::ShoulderTurn,
        min: 80.0,
        max: 110.0,
        fault_name: "incomplete_shoulder_turn",
        description: "Shoulder turn short of or past the full-turn window",
        positions: &[PPosition::P3, PPosition::P4],
    },
    ExpectedRange {
        kind: MeasurementKind::XFactor,
        min: 35.0,
        max: 55.0,
        fault_name: "loss_of_separation",
        description: "Shoulder-hip separation outside the coil window",
        positions: &[PPosition::P4, PPosition::P5],
    },
    ExpectedRange {
        kind: MeasurementKind::SwayDistance,
        min: 0.0,
        max: 0.08,
        fault_name: "lateral_sway",
        description: "Pelvis drifting laterally instead of rotating",
        positions: &[PPosition::P2, PPosition::P3, PPosition::P4],
    },
    ExpectedRange {
        kind: MeasurementKind::HeadMovement,
        min: 0.0,
        max: 0.1,
        fault_name: "head_movement",
        description: "Head moving off the ball through the swing",
        positions: &[PPosition::P3, PPosition::P4, PPosition::P5],
    },
    ExpectedRange {
        kind: MeasurementKind::HandSpeed,
        min: 5.0,
        max: 50.0,
        fault_name: "deceleration",
        description: "Hands slowing down through delivery",
        positions: &[PPosition::P6, PPosition::P7],
    },
    ExpectedRange {
        kind: MeasurementKind::Balance,
        min: 0.0,
        max: 0.1,
        fault_name: "balance_drift",
        description: "Center of mass drifting over the stance",
        // Generic: relevant in every phase
        positions: &[],
    },
];

/// Severity floor assigned to a bound violation before deviation scaling
const BASE_VIOLATION_SEVERITY: f64 = 0.4;
/// Portion of severity driven by the relative deviation magnitude
const DEVIATION_SEVERITY_SPAN: f64 = 0.6;

/// Reference classifier checking measurements against a static range table
#[derive(Debug, Default, Clone, Copy)]
pub struct RangeCheckFaultClassifier;

impl RangeCheckFaultClassifier {
    fn severity_for(range: &ExpectedRange, value: f64) -> Option<f64> {
        let (bound, deviation) = if value < range.min {
            (range.min, range.min - value)
        } else if value > range.max {
            (range.max, value - range.max)
        } else {
            return None;
        };
        let scale = if bound.abs() < f64::EPSILON {
            range.max - range.min
        } else {
            bound.abs()
        };
        let ratio = (deviation / scale).min(1.0);
        Some(DEVIATION_SEVERITY_SPAN.mul_add(ratio, BASE_VIOLATION_SEVERITY))
    }
}

impl FaultClassifier for RangeCheckFaultClassifier {
    fn classify(
        &self,
        measurements: &[Measurement],
        _phase: SwingPhase,
    ) -> AppResult<Vec<SwingFault>> {
        let faults = measurements
            .iter()
            .filter_map(|measurement| {
                let range = EXPECTED_RANGES
                    .iter()
                    .find(|r| r.kind == measurement.kind)?;
                let severity = Self::severity_for(range, measurement.value)?;
                Some(SwingFault {
                    name: range.fault_name.into(),
                    description: range.description.into(),
                    severity,
                    positions: range.positions.to_vec(),
                })
            })
            .collect();
        Ok(faults)
    }
}

// ============================================================================
// Adaptive filter
// ============================================================================

/// Narrows a raw fault list to the current phase and rescales severity
#[derive(Debug, Default, Clone, Copy)]
pub struct AdaptiveFaultFilter;

impl AdaptiveFaultFilter {
    /// Apply the phase-relevance and severity rules to a raw fault list
    #[must_use]
    pub fn filter(faults: Vec<SwingFault>, phase: SwingPhase) -> Vec<SwingFault> {
        let relevant_positions = positions_for_phase(phase);
        let scale = if phase.is_critical() {
            CRITICAL_PHASE_SEVERITY_SCALE
        } else {
            NONCRITICAL_PHASE_SEVERITY_SCALE
        };

        faults
            .into_iter()
            .filter(|fault| {
                fault.positions.is_empty()
                    || fault
                        .positions
                        .iter()
                        .any(|p| relevant_positions.contains(p))
            })
            .filter_map(|mut fault| {
                fault.severity *= scale;
                (fault.severity >= MIN_FAULT_SEVERITY).then_some(fault)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fault(name: &str, severity: f64, positions: Vec<PPosition>) -> SwingFault {
        SwingFault {
            name: name.into(),
            description: String::new(),
            severity,
            positions,
        }
    }

    #[test]
    fn test_filter_keeps_intersecting_and_generic_faults() {
        let faults = vec![
            fault("at_top", 0.5, vec![PPosition::P4]),
            fault("at_impact", 0.5, vec![PPosition::P7]),
            fault("generic", 0.5, vec![]),
        ];
        let kept = AdaptiveFaultFilter::filter(faults, SwingPhase::TopOfSwing);
        let names: Vec<&str> = kept.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["at_top", "generic"]);
    }

    #[test]
    fn test_filter_scales_severity_by_phase_criticality() {
        let kept =
            AdaptiveFaultFilter::filter(vec![fault("f", 0.5, vec![])], SwingPhase::Impact);
        assert!((kept[0].severity - 0.6).abs() < 1e-9);

        let kept =
            AdaptiveFaultFilter::filter(vec![fault("f", 0.5, vec![])], SwingPhase::Backswing);
        assert!((kept[0].severity - 0.45).abs() < 1e-9);
    }

    #[test]
    fn test_filter_drops_below_minimum_severity() {
        // 0.21 * 0.9 = 0.189 < 0.2 floor
        let kept =
            AdaptiveFaultFilter::filter(vec![fault("f", 0.21, vec![])], SwingPhase::Takeaway);
        assert!(kept.is_empty());

        // 0.21 * 1.2 = 0.252 survives in a critical phase
        let kept = AdaptiveFaultFilter::filter(vec![fault("f", 0.21, vec![])], SwingPhase::Setup);
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn test_range_classifier_flags_short_shoulder_turn() {
        let measurement = Measurement {
            kind: MeasurementKind::ShoulderTurn,
            value: 55.0,
            unit: "degrees".into(),
        };
        let classifier = RangeCheckFaultClassifier;
        let faults = classifier
            .classify(&[measurement], SwingPhase::TopOfSwing)
            .unwrap();
        assert_eq!(faults.len(), 1);
        assert_eq!(faults[0].name, "incomplete_shoulder_turn");
        assert!(faults[0].severity > 0.4);
        assert!(faults[0].positions.contains(&PPosition::P4));
    }

    #[test]
    fn test_range_classifier_passes_in_range_values() {
        let measurement = Measurement {
            kind: MeasurementKind::ShoulderTurn,
            value: 95.0,
            unit: "degrees".into(),
        };
        let classifier = RangeCheckFaultClassifier;
        let faults = classifier
            .classify(&[measurement], SwingPhase::TopOfSwing)
            .unwrap();
        assert!(faults.is_empty());
    }
}
