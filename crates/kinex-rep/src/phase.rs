//! Repetition phases and per-exercise counters

use std::fmt;

use serde::{Deserialize, Serialize};

use kinex_core::Side;

/// Phase of the rep state machine.
///
/// ```text
/// Idle → Ready → Moving → Holding → Cooldown → Ready | Idle
///                  └──────────┴──── abort ──→ Ready
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepPhase {
    /// Not in the start position
    #[default]
    Idle,
    /// In the start position, waiting for movement
    Ready,
    /// Travelling toward the target
    Moving,
    /// Inside the completion zone, hold timer running
    Holding,
    /// Rep counted, waiting before the next one
    Cooldown,
}

impl RepPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            RepPhase::Idle => "idle",
            RepPhase::Ready => "ready",
            RepPhase::Moving => "moving",
            RepPhase::Holding => "holding",
            RepPhase::Cooldown => "cooldown",
        }
    }

    /// A rep is in progress
    pub fn is_active(&self) -> bool {
        matches!(self, RepPhase::Moving | RepPhase::Holding)
    }
}

impl fmt::Display for RepPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-side rep counts for alternating exercises
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SideRepCounts {
    pub left: u32,
    pub right: u32,
}

impl SideRepCounts {
    pub fn get(&self, side: Side) -> u32 {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }

    pub fn increment(&mut self, side: Side) {
        match side {
            Side::Left => self.left += 1,
            Side::Right => self.right += 1,
        }
    }
}

/// State of one active exercise. Mutated only by the detector.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PhaseState {
    pub phase: RepPhase,
    pub rep_count: u32,
    /// Accuracy of each completed rep, in order
    pub rep_accuracies: Vec<f32>,
    /// Degrees per second, positive when the angle grows
    pub angle_velocity: f32,
    /// Present for bilateral exercises
    pub side_rep_counts: Option<SideRepCounts>,
}

impl PhaseState {
    pub fn new(bilateral: bool) -> Self {
        PhaseState {
            side_rep_counts: bilateral.then(SideRepCounts::default),
            ..Default::default()
        }
    }

    pub fn average_accuracy(&self) -> Option<f32> {
        if self.rep_accuracies.is_empty() {
            return None;
        }
        Some(self.rep_accuracies.iter().sum::<f32>() / self.rep_accuracies.len() as f32)
    }
}
