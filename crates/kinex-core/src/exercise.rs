//! Exercise identifiers and movement direction

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{JointType, KinexError, Movement};

/// Which way the tracked angle travels from the start pose toward the target.
///
/// Calibration calls a decreasing angle "flexion" and an increasing angle
/// "extension", independent of the anatomical name of the exercise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AngleDirection {
    Decreasing,
    Increasing,
}

impl AngleDirection {
    /// Direction implied by moving from `start` to `target`
    pub fn from_delta(start: f32, target: f32) -> Self {
        if target < start {
            AngleDirection::Decreasing
        } else {
            AngleDirection::Increasing
        }
    }

    pub fn opposite(&self) -> Self {
        match self {
            AngleDirection::Decreasing => AngleDirection::Increasing,
            AngleDirection::Increasing => AngleDirection::Decreasing,
        }
    }

    /// +1 when the angle grows toward the target, -1 otherwise
    #[inline]
    pub fn sign(&self) -> f32 {
        match self {
            AngleDirection::Decreasing => -1.0,
            AngleDirection::Increasing => 1.0,
        }
    }

    /// True when `angle` is at or beyond `threshold` in the direction of travel
    #[inline]
    pub fn is_past(&self, angle: f32, threshold: f32) -> bool {
        match self {
            AngleDirection::Decreasing => angle <= threshold,
            AngleDirection::Increasing => angle >= threshold,
        }
    }
}

/// Supported rehabilitation exercises
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseType {
    Squat,
    KneeExtension,
    HipAbduction,
    ShoulderFlexion,
    ShoulderAbduction,
    ElbowFlexion,
    StandingLegRaise,
    TrunkFlexion,
    NeckFlexion,
    AnkleDorsiflexion,
}

impl ExerciseType {
    pub const ALL: [ExerciseType; 10] = [
        ExerciseType::Squat,
        ExerciseType::KneeExtension,
        ExerciseType::HipAbduction,
        ExerciseType::ShoulderFlexion,
        ExerciseType::ShoulderAbduction,
        ExerciseType::ElbowFlexion,
        ExerciseType::StandingLegRaise,
        ExerciseType::TrunkFlexion,
        ExerciseType::NeckFlexion,
        ExerciseType::AnkleDorsiflexion,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExerciseType::Squat => "squat",
            ExerciseType::KneeExtension => "knee_extension",
            ExerciseType::HipAbduction => "hip_abduction",
            ExerciseType::ShoulderFlexion => "shoulder_flexion",
            ExerciseType::ShoulderAbduction => "shoulder_abduction",
            ExerciseType::ElbowFlexion => "elbow_flexion",
            ExerciseType::StandingLegRaise => "standing_leg_raise",
            ExerciseType::TrunkFlexion => "trunk_flexion",
            ExerciseType::NeckFlexion => "neck_flexion",
            ExerciseType::AnkleDorsiflexion => "ankle_dorsiflexion",
        }
    }

    /// Joint whose angle drives rep detection
    pub fn primary_joint(&self) -> JointType {
        match self {
            ExerciseType::Squat | ExerciseType::KneeExtension => JointType::Knee,
            ExerciseType::HipAbduction | ExerciseType::StandingLegRaise => JointType::Hip,
            ExerciseType::ShoulderFlexion | ExerciseType::ShoulderAbduction => JointType::Shoulder,
            ExerciseType::ElbowFlexion => JointType::Elbow,
            ExerciseType::TrunkFlexion => JointType::Spine,
            ExerciseType::NeckFlexion => JointType::Neck,
            ExerciseType::AnkleDorsiflexion => JointType::Ankle,
        }
    }

    /// Anatomical movement used for normal-range lookups
    pub fn movement(&self) -> Movement {
        match self {
            ExerciseType::Squat => Movement::Flexion,
            ExerciseType::KneeExtension => Movement::Extension,
            ExerciseType::HipAbduction => Movement::Abduction,
            ExerciseType::ShoulderFlexion => Movement::Flexion,
            ExerciseType::ShoulderAbduction => Movement::Abduction,
            ExerciseType::ElbowFlexion => Movement::Flexion,
            ExerciseType::StandingLegRaise => Movement::Flexion,
            ExerciseType::TrunkFlexion => Movement::Flexion,
            ExerciseType::NeckFlexion => Movement::Flexion,
            ExerciseType::AnkleDorsiflexion => Movement::Dorsiflexion,
        }
    }

    /// Alternating left/right exercises keep per-side rep counts
    pub fn is_bilateral(&self) -> bool {
        matches!(self, ExerciseType::StandingLegRaise)
    }
}

impl fmt::Display for ExerciseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExerciseType {
    type Err = KinexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        ExerciseType::ALL
            .iter()
            .copied()
            .find(|e| e.as_str() == key)
            .ok_or_else(|| KinexError::UnknownExercise(s.to_string()))
    }
}
