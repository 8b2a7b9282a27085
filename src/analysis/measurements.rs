// ABOUTME: Type-safe KPI extraction for streaming swing analysis
// ABOUTME: Defines measurement kinds, phase-conditional selection, and the extractor seam
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 SwingSight

//! Streaming measurement extraction.
//!
//! The engine asks for a phase-scoped subset of measurement kinds per sampled
//! frame; the extractor is a capability seam so the geometric reference
//! implementation can be swapped for a richer model without touching the
//! pipeline. Measurements needing two frames consult the previous frame from
//! the session's bounded history and are skipped when it is absent.

use serde::{Deserialize, Serialize};

use crate::analysis::phase::{pair_rotation_deg, SwingPhase};
use crate::errors::AppResult;
use crate::models::{Keypoint, PoseFrame};

/// Type-safe measurement (KPI) enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeasurementKind {
    /// Forward spine inclination at address (degrees from vertical)
    SpineAngle,
    /// Lateral shoulder-line tilt (degrees)
    ShoulderTilt,
    /// Distance between ankles (meters)
    StanceWidth,
    /// Shoulder rotation in the horizontal plane (degrees)
    ShoulderTurn,
    /// Hip rotation in the horizontal plane (degrees)
    HipTurn,
    /// Shoulder turn minus hip turn (degrees)
    XFactor,
    /// Lateral pelvis drift versus the previous frame (meters)
    SwayDistance,
    /// Lead-wrist speed versus the previous frame (m/s)
    HandSpeed,
    /// Head displacement versus the previous frame (meters)
    HeadMovement,
    /// Lateral offset of the pelvis over the stance center (meters)
    Balance,
}

impl MeasurementKind {
    /// Unit string for this measurement
    #[must_use]
    pub const fn unit(self) -> &'static str {
        match self {
            Self::SpineAngle
            | Self::ShoulderTilt
            | Self::ShoulderTurn
            | Self::HipTurn
            | Self::XFactor => "degrees",
            Self::StanceWidth | Self::SwayDistance | Self::HeadMovement | Self::Balance => {
                "meters"
            }
            Self::HandSpeed => "m/s",
        }
    }

    /// Display name for this measurement
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::SpineAngle => "Spine Angle",
            Self::ShoulderTilt => "Shoulder Tilt",
            Self::StanceWidth => "Stance Width",
            Self::ShoulderTurn => "Shoulder Turn",
            Self::HipTurn => "Hip Turn",
            Self::XFactor => "X-Factor",
            Self::SwayDistance => "Sway Distance",
            Self::HandSpeed => "Hand Speed",
            Self::HeadMovement => "Head Movement",
            Self::Balance => "Balance",
        }
    }

    /// True when this measurement needs the previous frame
    #[must_use]
    pub const fn requires_previous_frame(self) -> bool {
        matches!(self, Self::SwayDistance | Self::HandSpeed | Self::HeadMovement)
    }
}

/// Measurements computed while the golfer is setting up
const SETUP_KINDS: &[MeasurementKind] = &[
    MeasurementKind::SpineAngle,
    MeasurementKind::ShoulderTilt,
    MeasurementKind::StanceWidth,
];

/// Measurements computed through the backswing and at the top
const BACKSWING_KINDS: &[MeasurementKind] = &[
    MeasurementKind::ShoulderTurn,
    MeasurementKind::HipTurn,
    MeasurementKind::XFactor,
    MeasurementKind::SwayDistance,
];

/// Measurements computed through delivery and impact
const IMPACT_KINDS: &[MeasurementKind] = &[
    MeasurementKind::HandSpeed,
    MeasurementKind::HipTurn,
    MeasurementKind::HeadMovement,
];

/// Measurements computed on every sampled frame regardless of phase
const BASELINE_KINDS: &[MeasurementKind] = &[MeasurementKind::Balance];

/// Phase-scoped measurement kinds, baseline included
#[must_use]
pub fn kinds_for_phase(phase: SwingPhase) -> Vec<MeasurementKind> {
    let scoped: &[MeasurementKind] = match phase {
        SwingPhase::Setup | SwingPhase::Takeaway => SETUP_KINDS,
        SwingPhase::Backswing | SwingPhase::TopOfSwing => BACKSWING_KINDS,
        SwingPhase::Downswing | SwingPhase::Impact => IMPACT_KINDS,
        SwingPhase::FollowThrough | SwingPhase::Finish | SwingPhase::Unknown => &[],
    };
    let mut kinds = Vec::with_capacity(scoped.len() + BASELINE_KINDS.len());
    kinds.extend_from_slice(scoped);
    kinds.extend_from_slice(BASELINE_KINDS);
    kinds
}

/// One named numeric reading derived from a frame
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Measurement {
    /// Which KPI this is
    pub kind: MeasurementKind,
    /// Reading value in `unit`
    pub value: f64,
    /// Unit string, denormalized for client display
    pub unit: String,
}

impl Measurement {
    fn new(kind: MeasurementKind, value: f64) -> Self {
        Self {
            kind,
            value,
            unit: kind.unit().into(),
        }
    }
}

/// Capability seam: extracts the requested measurement kinds from a frame.
///
/// Implementations must be pure over their inputs; the engine catches any
/// error and degrades that pipeline step to an empty measurement list.
pub trait MeasurementExtractor: Send + Sync {
    /// Extract the requested kinds; kinds that cannot be computed from the
    /// available joints are skipped, not errored.
    ///
    /// # Errors
    ///
    /// Returns an analysis error only on internal failure; missing joints or
    /// a missing previous frame are not failures.
    fn extract(
        &self,
        frame: &PoseFrame,
        previous: Option<&PoseFrame>,
        phase: SwingPhase,
        kinds: &[MeasurementKind],
    ) -> AppResult<Vec<Measurement>>;
}

/// Reference extractor computing KPIs from raw keypoint geometry
#[derive(Debug, Default, Clone, Copy)]
pub struct GeometricKpiExtractor;

impl GeometricKpiExtractor {
    fn midpoint(a: &Keypoint, b: &Keypoint) -> Keypoint {
        Keypoint {
            x: (a.x + b.x) / 2.0,
            y: (a.y + b.y) / 2.0,
            z: (a.z + b.z) / 2.0,
            visibility: None,
        }
    }

    fn pair<'a>(frame: &'a PoseFrame, left: &str, right: &str) -> Option<(&'a Keypoint, &'a Keypoint)> {
        Some((frame.keypoints.get(left)?, frame.keypoints.get(right)?))
    }

    fn spine_angle(frame: &PoseFrame) -> Option<f64> {
        let (ls, rs) = Self::pair(frame, "left_shoulder", "right_shoulder")?;
        let (lh, rh) = Self::pair(frame, "left_hip", "right_hip")?;
        let shoulder_mid = Self::midpoint(ls, rs);
        let hip_mid = Self::midpoint(lh, rh);
        let dy = shoulder_mid.y - hip_mid.y;
        let horizontal = ((shoulder_mid.x - hip_mid.x).powi(2)
            + (shoulder_mid.z - hip_mid.z).powi(2))
        .sqrt();
        if dy.abs() < f64::EPSILON {
            return None;
        }
        Some(horizontal.atan2(dy).to_degrees())
    }

    fn shoulder_tilt(frame: &PoseFrame) -> Option<f64> {
        let (ls, rs) = Self::pair(frame, "left_shoulder", "right_shoulder")?;
        let dy = ls.y - rs.y;
        let horizontal = ((ls.x - rs.x).powi(2) + (ls.z - rs.z).powi(2)).sqrt();
        if horizontal < f64::EPSILON {
            return None;
        }
        Some(dy.atan2(horizontal).to_degrees())
    }

    fn stance_width(frame: &PoseFrame) -> Option<f64> {
        let (la, ra) = Self::pair(frame, "left_ankle", "right_ankle")?;
        Some(la.distance_to(ra))
    }

    fn shoulder_turn(frame: &PoseFrame) -> Option<f64> {
        let (ls, rs) = Self::pair(frame, "left_shoulder", "right_shoulder")?;
        Some(pair_rotation_deg(ls, rs))
    }

    fn hip_turn(frame: &PoseFrame) -> Option<f64> {
        let (lh, rh) = Self::pair(frame, "left_hip", "right_hip")?;
        Some(pair_rotation_deg(lh, rh))
    }

    fn sway_distance(frame: &PoseFrame, previous: &PoseFrame) -> Option<f64> {
        let (lh, rh) = Self::pair(frame, "left_hip", "right_hip")?;
        let (plh, prh) = Self::pair(previous, "left_hip", "right_hip")?;
        let current = Self::midpoint(lh, rh);
        let prior = Self::midpoint(plh, prh);
        Some((current.x - prior.x).abs())
    }

    fn hand_speed(frame: &PoseFrame, previous: &PoseFrame) -> Option<f64> {
        let wrist = frame.keypoints.get("left_wrist")?;
        let prev_wrist = previous.keypoints.get("left_wrist")?;
        let dt = frame.timestamp - previous.timestamp;
        if dt <= 0.0 {
            return None;
        }
        Some(wrist.distance_to(prev_wrist) / dt)
    }

    fn head_movement(frame: &PoseFrame, previous: &PoseFrame) -> Option<f64> {
        let head = frame.keypoints.get("nose")?;
        let prev_head = previous.keypoints.get("nose")?;
        Some(head.distance_to(prev_head))
    }

    fn balance(frame: &PoseFrame) -> Option<f64> {
        let (lh, rh) = Self::pair(frame, "left_hip", "right_hip")?;
        let (la, ra) = Self::pair(frame, "left_ankle", "right_ankle")?;
        let pelvis = Self::midpoint(lh, rh);
        let stance_center = Self::midpoint(la, ra);
        Some((pelvis.x - stance_center.x).abs())
    }

    fn compute(
        kind: MeasurementKind,
        frame: &PoseFrame,
        previous: Option<&PoseFrame>,
    ) -> Option<f64> {
        match kind {
            MeasurementKind::SpineAngle => Self::spine_angle(frame),
            MeasurementKind::ShoulderTilt => Self::shoulder_tilt(frame),
            MeasurementKind::StanceWidth => Self::stance_width(frame),
            MeasurementKind::ShoulderTurn => Self::shoulder_turn(frame),
            MeasurementKind::HipTurn => Self::hip_turn(frame),
            MeasurementKind::XFactor => {
                Some(Self::shoulder_turn(frame)? - Self::hip_turn(frame)?)
            }
            MeasurementKind::SwayDistance => Self::sway_distance(frame, previous?),
            MeasurementKind::HandSpeed => Self::hand_speed(frame, previous?),
            MeasurementKind::HeadMovement => Self::head_movement(frame, previous?),
            MeasurementKind::Balance => Self::balance(frame),
        }
    }
}

impl MeasurementExtractor for GeometricKpiExtractor {
    fn extract(
        &self,
        frame: &PoseFrame,
        previous: Option<&PoseFrame>,
        _phase: SwingPhase,
        kinds: &[MeasurementKind],
    ) -> AppResult<Vec<Measurement>> {
        let measurements = kinds
            .iter()
            .filter_map(|&kind| {
                Self::compute(kind, frame, previous)
                    .filter(|v| v.is_finite())
                    .map(|value| Measurement::new(kind, value))
            })
            .collect();
        Ok(measurements)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn keypoint(x: f64, y: f64, z: f64) -> Keypoint {
        Keypoint {
            x,
            y,
            z,
            visibility: Some(1.0),
        }
    }

    fn address_frame(timestamp: f64) -> PoseFrame {
        let mut keypoints = HashMap::new();
        keypoints.insert("left_shoulder".into(), keypoint(0.25, 1.4, 0.0));
        keypoints.insert("right_shoulder".into(), keypoint(-0.25, 1.4, 0.0));
        keypoints.insert("left_hip".into(), keypoint(0.18, 0.9, -0.1));
        keypoints.insert("right_hip".into(), keypoint(-0.18, 0.9, -0.1));
        keypoints.insert("left_ankle".into(), keypoint(0.22, 0.05, -0.1));
        keypoints.insert("right_ankle".into(), keypoint(-0.22, 0.05, -0.1));
        keypoints.insert("left_wrist".into(), keypoint(0.3, 0.8, 0.2));
        keypoints.insert("nose".into(), keypoint(0.0, 1.6, 0.05));
        PoseFrame {
            frame_index: 0,
            timestamp,
            keypoints,
        }
    }

    #[test]
    fn test_phase_scoping_includes_baseline() {
        let setup = kinds_for_phase(SwingPhase::Setup);
        assert!(setup.contains(&MeasurementKind::SpineAngle));
        assert!(setup.contains(&MeasurementKind::Balance));
        assert!(!setup.contains(&MeasurementKind::ShoulderTurn));

        let top = kinds_for_phase(SwingPhase::TopOfSwing);
        assert!(top.contains(&MeasurementKind::XFactor));
        assert!(top.contains(&MeasurementKind::Balance));

        let finish = kinds_for_phase(SwingPhase::Finish);
        assert_eq!(finish, vec![MeasurementKind::Balance]);
    }

    #[test]
    fn test_two_frame_kinds_skip_without_history() {
        let frame = address_frame(1.0);
        let extractor = GeometricKpiExtractor;
        let out = extractor
            .extract(
                &frame,
                None,
                SwingPhase::Impact,
                &[MeasurementKind::HandSpeed, MeasurementKind::Balance],
            )
            .unwrap();
        assert!(out.iter().all(|m| m.kind != MeasurementKind::HandSpeed));
        assert!(out.iter().any(|m| m.kind == MeasurementKind::Balance));
    }

    #[test]
    fn test_hand_speed_from_displacement() {
        let previous = address_frame(1.0);
        let mut frame = address_frame(1.1);
        frame
            .keypoints
            .insert("left_wrist".into(), keypoint(0.3, 1.0, 0.2));

        let extractor = GeometricKpiExtractor;
        let out = extractor
            .extract(
                &frame,
                Some(&previous),
                SwingPhase::Downswing,
                &[MeasurementKind::HandSpeed],
            )
            .unwrap();
        let speed = out
            .iter()
            .find(|m| m.kind == MeasurementKind::HandSpeed)
            .map(|m| m.value)
            .unwrap();
        // 0.2m of wrist travel over 0.1s
        assert!((speed - 2.0).abs() < 1e-9);
        assert_eq!(out[0].unit, "m/s");
    }

    #[test]
    fn test_missing_joint_skips_measurement() {
        let mut frame = address_frame(1.0);
        frame.keypoints.remove("left_ankle");
        let extractor = GeometricKpiExtractor;
        let out = extractor
            .extract(
                &frame,
                None,
                SwingPhase::Setup,
                &[MeasurementKind::StanceWidth, MeasurementKind::SpineAngle],
            )
            .unwrap();
        assert!(out.iter().all(|m| m.kind != MeasurementKind::StanceWidth));
        assert!(out.iter().any(|m| m.kind == MeasurementKind::SpineAngle));
    }
}
