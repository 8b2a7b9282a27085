// ABOUTME: Feedback gate and the generator seam that renders fault lists as coaching text
// ABOUTME: Applies the severity threshold, orders faults worst-first, and templates advice
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 SwingSight

//! Feedback generation boundary.
//!
//! The gate keeps only faults at or above the session's feedback threshold,
//! ordered most severe first; if none survive, no feedback is generated for
//! that frame. Surviving faults are handed to the generator seam, whose
//! reference implementation renders fixed coaching templates.

use crate::analysis::faults::SwingFault;
use crate::errors::AppResult;
use crate::models::{SessionConfig, SkillLevel};

/// Keep faults at or above the session threshold, most severe first.
///
/// Returns `None` when nothing crosses the threshold, which suppresses
/// feedback for the frame entirely.
#[must_use]
pub fn gate_faults(faults: &[SwingFault], threshold: f64) -> Option<Vec<SwingFault>> {
    let mut surviving: Vec<SwingFault> = faults
        .iter()
        .filter(|fault| fault.severity >= threshold)
        .cloned()
        .collect();
    if surviving.is_empty() {
        return None;
    }
    surviving.sort_by(|a, b| {
        b.severity
            .partial_cmp(&a.severity)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    Some(surviving)
}

/// Capability seam: maps a gated fault list to human-readable coaching text.
pub trait FeedbackGenerator: Send + Sync {
    /// Render feedback for faults that crossed the gate, worst first
    ///
    /// # Errors
    ///
    /// Returns an analysis error only on internal failure.
    fn generate(&self, faults: &[SwingFault], config: &SessionConfig) -> AppResult<String>;
}

/// Reference generator rendering fixed per-fault coaching templates
#[derive(Debug, Default, Clone, Copy)]
pub struct TemplateFeedbackGenerator;

impl TemplateFeedbackGenerator {
    fn tip_for(fault_name: &str) -> &'static str {
        match fault_name {
            "posture_loss" => "Keep your spine angle steady from address through the strike.",
            "incomplete_shoulder_turn" => {
                "Turn your lead shoulder under your chin to complete the backswing."
            }
            "loss_of_separation" => {
                "Let your hips lead the downswing so your shoulders can lag behind."
            }
            "lateral_sway" => "Rotate around your trail hip instead of sliding away from the ball.",
            "head_movement" => "Keep your head centered over the ball until after impact.",
            "deceleration" => "Commit through the ball; accelerate into the finish.",
            "balance_drift" => "Finish balanced over your lead foot.",
            _ => "Work with your coach on this fault.",
        }
    }

    fn tone_prefix(skill_level: SkillLevel) -> &'static str {
        match skill_level {
            SkillLevel::Beginner => "Focus on one thing: ",
            SkillLevel::Intermediate | SkillLevel::Advanced => "",
            SkillLevel::Professional => "Marginal: ",
        }
    }
}

impl FeedbackGenerator for TemplateFeedbackGenerator {
    fn generate(&self, faults: &[SwingFault], config: &SessionConfig) -> AppResult<String> {
        let prefix = Self::tone_prefix(config.skill_level);
        let lines: Vec<String> = faults
            .iter()
            .map(|fault| format!("{prefix}{}", Self::tip_for(&fault.name)))
            .collect();
        Ok(lines.join(" "))
    }
}
