// ABOUTME: Shared test helpers for building synthetic pose frames
// ABOUTME: Produces address, rotated, and degenerate frames for pipeline tests
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 SwingSight

#![allow(dead_code)]
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

use std::collections::HashMap;
use swingsight_server::models::{Keypoint, PoseFrame};

pub fn keypoint(x: f64, y: f64, z: f64) -> Keypoint {
    Keypoint {
        x,
        y,
        z,
        visibility: Some(1.0),
    }
}

/// A full-body frame at address: shoulders and hips square, golfer still.
pub fn address_frame(frame_index: u64, timestamp: f64) -> PoseFrame {
    swing_frame(frame_index, timestamp, 0.0, 0.0, keypoint(0.3, 0.8, 0.2))
}

/// A full-body frame with shoulders/hips rotated by the given angles (deg)
/// and the lead wrist at the given position.
pub fn swing_frame(
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
        "left_shoulder".to_owned(),
        keypoint(half_shoulder * sc, 1.4, half_shoulder * ss),
    );
    keypoints.insert(
        "right_shoulder".to_owned(),
        keypoint(-half_shoulder * sc, 1.4, -half_shoulder * ss),
    );
    keypoints.insert(
        "left_hip".to_owned(),
        keypoint(half_hip * hc, 0.9, half_hip * hs),
    );
    keypoints.insert(
        "right_hip".to_owned(),
        keypoint(-half_hip * hc, 0.9, -half_hip * hs),
    );
    keypoints.insert("left_ankle".to_owned(), keypoint(0.22, 0.05, -0.1));
    keypoints.insert("right_ankle".to_owned(), keypoint(-0.22, 0.05, -0.1));
    keypoints.insert("left_wrist".to_owned(), wrist);
    keypoints.insert("right_wrist".to_owned(), keypoint(wrist.x - 0.05, wrist.y, wrist.z));
    keypoints.insert("nose".to_owned(), keypoint(0.0, 1.6, 0.05));

    PoseFrame {
        frame_index,
        timestamp,
        keypoints,
    }
}

/// A degenerate frame exposing only two barely-visible essential joints.
pub fn sparse_frame(frame_index: u64, timestamp: f64) -> PoseFrame {
    let mut keypoints = HashMap::new();
    keypoints.insert(
        "left_shoulder".to_owned(),
        Keypoint {
            x: 0.2,
            y: 1.4,
            z: 0.0,
            visibility: Some(0.1),
        },
    );
    keypoints.insert(
        "right_shoulder".to_owned(),
        Keypoint {
            x: -0.2,
            y: 1.4,
            z: 0.0,
            visibility: Some(0.1),
        },
    );
    PoseFrame {
        frame_index,
        timestamp,
        keypoints,
    }
}
