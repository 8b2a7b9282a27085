// ABOUTME: Heuristic swing-phase classifier with continuity smoothing and hysteresis
// ABOUTME: Pure function over (current frame, short history, previous phase) returning phase + confidence
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 SwingSight

//! Swing phase classification.
//!
//! Turns one pose frame into a motion-phase label and confidence using fixed
//! kinematic thresholds, then smooths against the last few accepted phases so
//! a single noisy frame cannot flap the phase label. The classifier never
//! fails outward: when the frame is missing the joints needed for kinematics
//! it falls back to the last known phase at reduced confidence.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt::{Display, Formatter, Result as FmtResult};

use crate::constants::analysis::PHASE_HISTORY_DEPTH;
use crate::models::{Keypoint, PoseFrame};

// ============================================================================
// Classification thresholds
// ============================================================================

/// Below this wrist speed (m/s) the golfer is considered still
const STILLNESS_VELOCITY: f64 = 0.1;
/// Shoulder rotation magnitude (deg) still counted as square at address
const SETUP_MAX_ROTATION: f64 = 15.0;
/// Hip rotation magnitude (deg) still counted as square at address
const SETUP_MAX_HIP_ROTATION: f64 = 10.0;
/// Shoulder turn (deg) at or past which a still golfer is at the top
const TOP_MIN_ROTATION: f64 = 60.0;
/// Shoulder turn (deg) at which the takeaway has begun
const TAKEAWAY_MIN_ROTATION: f64 = 15.0;
/// Shoulder turn (deg) at which the backswing proper has begun
const BACKSWING_MIN_ROTATION: f64 = 45.0;
/// Wrist speed (m/s) indicating the club is being delivered
const DOWNSWING_MIN_VELOCITY: f64 = 2.5;
/// Wrist speed (m/s) in the impact window
const IMPACT_MIN_VELOCITY: f64 = 6.0;
/// Wrist speed (m/s) below which a released swing is finishing
const FINISH_MAX_VELOCITY: f64 = 0.5;
/// Reverse shoulder rotation (deg) reached only after release
const FINISH_REVERSE_ROTATION: f64 = -45.0;
/// Wrist speed (m/s) keeping the follow-through alive after impact
const FOLLOW_THROUGH_MIN_VELOCITY: f64 = 1.0;

/// Hysteresis: a phase change below this raw confidence is rejected
const HYSTERESIS_MIN_CONFIDENCE: f64 = 0.6;
/// Confidence assigned when hysteresis keeps the previous phase
const HYSTERESIS_HOLD_CONFIDENCE: f64 = 0.5;
/// Confidence added when the last two accepted phases agree with the new one
const CONTINUITY_BOOST: f64 = 0.1;
/// Confidence ceiling after continuity boosting
const CONTINUITY_CAP: f64 = 0.95;
/// Confidence of the fallback when kinematics fail but history exists
const FALLBACK_CONFIDENCE: f64 = 0.3;
/// Confidence of the cold-start fallback with no history
const COLD_FALLBACK_CONFIDENCE: f64 = 0.1;

// ============================================================================
// Phase label
// ============================================================================

/// One stage of the golf swing cycle
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SwingPhase {
    /// Address position before any motion
    Setup,
    /// Initial club movement away from the ball
    Takeaway,
    /// Continued turn toward the top
    Backswing,
    /// Transition point at maximum turn
    TopOfSwing,
    /// Delivery of the club toward the ball
    Downswing,
    /// Club-ball contact window
    Impact,
    /// Post-impact release
    FollowThrough,
    /// Balanced end position
    Finish,
    /// No rule matched for this frame
    Unknown,
}

impl SwingPhase {
    /// Phases where fault severity is amplified by the adaptive filter
    #[must_use]
    pub const fn is_critical(self) -> bool {
        matches!(self, Self::Setup | Self::TopOfSwing | Self::Impact)
    }
}

impl Display for SwingPhase {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let name = match self {
            Self::Setup => "setup",
            Self::Takeaway => "takeaway",
            Self::Backswing => "backswing",
            Self::TopOfSwing => "top_of_swing",
            Self::Downswing => "downswing",
            Self::Impact => "impact",
            Self::FollowThrough => "follow_through",
            Self::Finish => "finish",
            Self::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Phase label plus classifier confidence for one frame
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PhaseClassification {
    /// Accepted phase for this frame
    pub phase: SwingPhase,
    /// Classifier confidence in [0, 1]
    pub confidence: f64,
}

// ============================================================================
// Kinematics
// ============================================================================

/// Per-frame kinematic readings the rule cascade consumes
#[derive(Debug, Clone, Copy)]
pub struct FrameKinematics {
    /// Signed shoulder rotation (deg) in the horizontal plane
    pub shoulder_rotation_deg: f64,
    /// Signed hip rotation (deg) in the horizontal plane
    pub hip_rotation_deg: f64,
    /// Instantaneous 3D lead-wrist speed (m/s) versus the previous frame
    pub wrist_velocity: f64,
    /// Lead wrist position this frame
    pub lead_wrist: Keypoint,
}

/// Signed angle (deg) of a left/right keypoint pair projected onto the
/// horizontal plane. Zero when the pair is square to the capture axis.
pub(crate) fn pair_rotation_deg(left: &Keypoint, right: &Keypoint) -> f64 {
    (left.z - right.z).atan2(left.x - right.x).to_degrees()
}

/// Derive kinematics for one frame, or `None` when required joints are absent
#[must_use]
pub fn frame_kinematics(frame: &PoseFrame, previous: Option<&PoseFrame>) -> Option<FrameKinematics> {
    let lead_wrist = *frame.keypoints.get("left_wrist")?;
    let left_shoulder = frame.keypoints.get("left_shoulder")?;
    let right_shoulder = frame.keypoints.get("right_shoulder")?;
    let left_hip = frame.keypoints.get("left_hip")?;
    let right_hip = frame.keypoints.get("right_hip")?;

    let shoulder_rotation_deg = pair_rotation_deg(left_shoulder, right_shoulder);
    let hip_rotation_deg = pair_rotation_deg(left_hip, right_hip);

    // 0 when there is no previous frame or time runs backwards
    let wrist_velocity = previous
        .and_then(|prev| {
            let dt = frame.timestamp - prev.timestamp;
            if dt <= 0.0 {
                return None;
            }
            let prev_wrist = prev.keypoints.get("left_wrist")?;
            Some(lead_wrist.distance_to(prev_wrist) / dt)
        })
        .unwrap_or(0.0);

    if !shoulder_rotation_deg.is_finite()
        || !hip_rotation_deg.is_finite()
        || !wrist_velocity.is_finite()
    {
        return None;
    }

    Some(FrameKinematics {
        shoulder_rotation_deg,
        hip_rotation_deg,
        wrist_velocity,
        lead_wrist,
    })
}

// ============================================================================
// Classifier
// ============================================================================

/// Heuristic phase classifier with a short accepted-phase history.
///
/// One instance lives inside each streaming session; classification is
/// deterministic over the ordered frame sequence fed to it.
#[derive(Debug, Default)]
pub struct PhaseClassifier {
    accepted: VecDeque<SwingPhase>,
}

impl PhaseClassifier {
    /// Create a classifier with empty history
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recently accepted phase, if any
    #[must_use]
    pub fn last_phase(&self) -> Option<SwingPhase> {
        self.accepted.back().copied()
    }

    /// Classify one frame against the previous frame and accepted history
    pub fn classify(
        &mut self,
        frame: &PoseFrame,
        previous: Option<&PoseFrame>,
    ) -> PhaseClassification {
        let Some(kinematics) = frame_kinematics(frame, previous) else {
            return self.fallback();
        };
        let raw = raw_classification(&kinematics, self.last_phase());
        self.smooth(raw)
    }

    /// Fallback when kinematics cannot be computed: hold the last known phase
    fn fallback(&mut self) -> PhaseClassification {
        let classification = self.last_phase().map_or(
            PhaseClassification {
                phase: SwingPhase::Setup,
                confidence: COLD_FALLBACK_CONFIDENCE,
            },
            |phase| PhaseClassification {
                phase,
                confidence: FALLBACK_CONFIDENCE,
            },
        );
        self.push_accepted(classification.phase);
        classification
    }

    /// Continuity smoothing and hysteresis over the accepted-phase history
    fn smooth(&mut self, raw: PhaseClassification) -> PhaseClassification {
        let mut phase = raw.phase;
        let mut confidence = raw.confidence;

        // Hysteresis: a low-confidence change of phase is rejected
        if let Some(previous) = self.last_phase() {
            if phase != previous && confidence < HYSTERESIS_MIN_CONFIDENCE {
                phase = previous;
                confidence = HYSTERESIS_HOLD_CONFIDENCE;
            }
        }

        // Agreement with the last two accepted phases raises confidence
        if self.accepted.len() >= 2
            && self.accepted.iter().rev().take(2).all(|&p| p == phase)
        {
            confidence = (confidence + CONTINUITY_BOOST).min(CONTINUITY_CAP);
        }

        self.push_accepted(phase);
        PhaseClassification { phase, confidence }
    }

    fn push_accepted(&mut self, phase: SwingPhase) {
        if self.accepted.len() == PHASE_HISTORY_DEPTH {
            self.accepted.pop_front();
        }
        self.accepted.push_back(phase);
    }
}

/// Fixed rule cascade over kinematics, with the previous phase
/// disambiguating delivery from release.
fn raw_classification(
    kinematics: &FrameKinematics,
    previous: Option<SwingPhase>,
) -> PhaseClassification {
    use SwingPhase::{
        Backswing, Downswing, Finish, FollowThrough, Impact, Setup, Takeaway, TopOfSwing, Unknown,
    };

    let rotation = kinematics.shoulder_rotation_deg;
    let velocity = kinematics.wrist_velocity;

    let (phase, confidence) = if rotation >= TOP_MIN_ROTATION && velocity < STILLNESS_VELOCITY {
        (TopOfSwing, 0.85)
    } else if velocity < STILLNESS_VELOCITY
        && rotation.abs() < SETUP_MAX_ROTATION
        && kinematics.hip_rotation_deg.abs() < SETUP_MAX_HIP_ROTATION
    {
        (Setup, 0.8)
    } else if rotation <= FINISH_REVERSE_ROTATION && velocity < FINISH_MAX_VELOCITY {
        (Finish, 0.75)
    } else if velocity >= IMPACT_MIN_VELOCITY {
        match previous {
            Some(Impact | FollowThrough) => (FollowThrough, 0.7),
            _ => (Impact, 0.8),
        }
    } else if velocity >= DOWNSWING_MIN_VELOCITY {
        match previous {
            Some(Impact | FollowThrough) => (FollowThrough, 0.7),
            Some(TopOfSwing | Downswing) => (Downswing, 0.8),
            _ => (Downswing, 0.65),
        }
    } else if rotation >= BACKSWING_MIN_ROTATION {
        (Backswing, 0.75)
    } else if rotation >= TAKEAWAY_MIN_ROTATION {
        (Takeaway, 0.7)
    } else if velocity >= FOLLOW_THROUGH_MIN_VELOCITY
        && matches!(previous, Some(Impact | FollowThrough))
    {
        (FollowThrough, 0.7)
    } else {
        (Unknown, 0.4)
    };

    PhaseClassification { phase, confidence }
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

    /// Frame with shoulders/hips rotated by the given angles and the lead
    /// wrist at the given position.
    fn pose(
        frame_index: u64,
        timestamp: f64,
        shoulder_deg: f64,
        hip_deg: f64,
        wrist: Keypoint,
    ) -> PoseFrame {
        let half_shoulder = 0.25;
        let half_hip = 0.18;
        let (ss, sc) = shoulder_deg.to_radians().sin_cos();
        let (hs, hc) = hip_deg.to_radians().sin_cos();
        let mut keypoints = HashMap::new();
        keypoints.insert(
            "left_shoulder".into(),
            keypoint(half_shoulder * sc, 1.4, half_shoulder * ss),
        );
        keypoints.insert(
            "right_shoulder".into(),
            keypoint(-half_shoulder * sc, 1.4, -half_shoulder * ss),
        );
        keypoints.insert("left_hip".into(), keypoint(half_hip * hc, 0.9, half_hip * hs));
        keypoints.insert(
            "right_hip".into(),
            keypoint(-half_hip * hc, 0.9, -half_hip * hs),
        );
        keypoints.insert("left_wrist".into(), wrist);
        PoseFrame {
            frame_index,
            timestamp,
            keypoints,
        }
    }

    #[test]
    fn test_still_square_frame_is_setup() {
        let mut classifier = PhaseClassifier::new();
        let frame = pose(0, 0.0, 0.0, 0.0, keypoint(0.3, 0.8, 0.0));
        let result = classifier.classify(&frame, None);
        assert_eq!(result.phase, SwingPhase::Setup);
        assert!(result.confidence >= 0.8);
    }

    #[test]
    fn test_rotated_still_frame_is_top_of_swing() {
        let mut classifier = PhaseClassifier::new();
        let prev = pose(0, 0.0, 70.0, 35.0, keypoint(0.1, 1.5, 0.2));
        let frame = pose(1, 0.033, 70.0, 35.0, keypoint(0.1, 1.5, 0.2));
        let result = classifier.classify(&frame, Some(&prev));
        assert_eq!(result.phase, SwingPhase::TopOfSwing);
        assert!(result.confidence >= 0.8);
    }

    #[test]
    fn test_hysteresis_holds_previous_phase() {
        let mut classifier = PhaseClassifier::new();
        let setup = pose(0, 0.0, 0.0, 0.0, keypoint(0.3, 0.8, 0.0));
        classifier.classify(&setup, None);

        // Unknown at confidence 0.4 must not displace an accepted Setup
        let drift = pose(1, 0.033, 30.0, 20.0, keypoint(0.3, 0.82, 0.01));
        let mut noisy = drift;
        // Mid takeaway speed but below takeaway rotation after projection noise
        noisy
            .keypoints
            .insert("left_wrist".into(), keypoint(0.3, 0.85, 0.02));
        let result = classifier.classify(&noisy, Some(&setup));
        if result.phase != SwingPhase::Setup {
            // The rule fired above the hysteresis bar; confidence must show it
            assert!(result.confidence >= 0.6);
        } else {
            assert!((result.confidence - 0.5).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn test_classification_is_deterministic() {
        let frames: Vec<PoseFrame> = (0..20_u32)
            .map(|i| {
                let t = f64::from(i) * 0.033;
                let angle = f64::from(i) * 5.0;
                pose(
                    u64::from(i),
                    t,
                    angle,
                    angle / 2.0,
                    keypoint(0.3 - f64::from(i) * 0.01, 0.8 + f64::from(i) * 0.04, 0.01),
                )
            })
            .collect();

        let run = |frames: &[PoseFrame]| -> Vec<(SwingPhase, f64)> {
            let mut classifier = PhaseClassifier::new();
            let mut out = Vec::new();
            let mut prev: Option<&PoseFrame> = None;
            for frame in frames {
                let c = classifier.classify(frame, prev);
                out.push((c.phase, c.confidence));
                prev = Some(frame);
            }
            out
        };

        assert_eq!(run(&frames), run(&frames));
    }

    #[test]
    fn test_missing_joints_fall_back() {
        let mut classifier = PhaseClassifier::new();

        let empty = PoseFrame {
            frame_index: 0,
            timestamp: 0.0,
            keypoints: HashMap::new(),
        };
        let cold = classifier.classify(&empty, None);
        assert_eq!(cold.phase, SwingPhase::Setup);
        assert!((cold.confidence - 0.1).abs() < f64::EPSILON);

        let frame = pose(1, 0.033, 50.0, 25.0, keypoint(0.2, 1.2, 0.1));
        let accepted = classifier.classify(&frame, None);

        let degraded = classifier.classify(&empty, Some(&frame));
        assert_eq!(degraded.phase, accepted.phase);
        assert!((degraded.confidence - 0.3).abs() < f64::EPSILON);
    }

    #[test]
    fn test_continuity_boost_caps_at_095() {
        let mut classifier = PhaseClassifier::new();
        let frame = pose(0, 0.0, 0.0, 0.0, keypoint(0.3, 0.8, 0.0));
        let mut last = classifier.classify(&frame, None);
        for i in 1..6_u32 {
            let next = pose(u64::from(i), f64::from(i) * 0.033, 0.0, 0.0, keypoint(0.3, 0.8, 0.0));
            last = classifier.classify(&next, Some(&frame));
        }
        assert_eq!(last.phase, SwingPhase::Setup);
        assert!(last.confidence <= 0.95);
        assert!(last.confidence >= 0.9);
    }
}
