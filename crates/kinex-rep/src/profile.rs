//! Exercise profiles and the built-in exercise catalog

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use kinex_calibration::{CalibrationResult, JointThresholds, ThresholdConfig};
use kinex_core::{AngleDirection, ExerciseType, JointType, KinexError, KinexResult};

/// Adaptive cooldown bounds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CooldownConfig {
    pub min: Duration,
    pub max: Duration,
    /// Multiplier on the duration of the rep just completed
    pub adaptive_scale: f32,
}

impl Default for CooldownConfig {
    fn default() -> Self {
        CooldownConfig {
            min: Duration::from_millis(500),
            max: Duration::from_millis(2000),
            adaptive_scale: 0.5,
        }
    }
}

impl CooldownConfig {
    /// Cooldown after a rep that took `rep_duration`
    pub fn duration_after(&self, rep_duration: Duration) -> Duration {
        let scaled = rep_duration.mul_f32(self.adaptive_scale.max(0.0));
        scaled.clamp(self.min, self.max.max(self.min))
    }
}

/// Typical unimpaired angles for one exercise, used until the user calibrates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CatalogEntry {
    pub exercise: ExerciseType,
    pub resting: f32,
    pub max_rom: f32,
    pub hold_time: Duration,
}

/// Default angles per exercise
pub fn catalog_entry(exercise: ExerciseType) -> CatalogEntry {
    let (resting, max_rom, hold_ms) = match exercise {
        ExerciseType::Squat => (170.0, 70.0, 400),
        ExerciseType::KneeExtension => (90.0, 175.0, 1000),
        ExerciseType::HipAbduction => (175.0, 140.0, 500),
        ExerciseType::ShoulderFlexion => (15.0, 160.0, 500),
        ExerciseType::ShoulderAbduction => (15.0, 150.0, 500),
        ExerciseType::ElbowFlexion => (165.0, 45.0, 300),
        ExerciseType::StandingLegRaise => (175.0, 120.0, 500),
        ExerciseType::TrunkFlexion => (5.0, 60.0, 1000),
        ExerciseType::NeckFlexion => (170.0, 140.0, 1000),
        ExerciseType::AnkleDorsiflexion => (110.0, 90.0, 500),
    };
    CatalogEntry {
        exercise,
        resting,
        max_rom,
        hold_time: Duration::from_millis(hold_ms),
    }
}

/// Everything the detector needs to know about one exercise
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseProfile {
    pub exercise: ExerciseType,
    pub joint: JointType,
    pub thresholds: JointThresholds,
    /// Travel from the start center that counts as movement (degrees)
    pub start_margin: f32,
    /// Velocity away from the target that aborts a rep (deg/s)
    pub abort_velocity: f32,
    pub cooldown: CooldownConfig,
    /// Track per-side counts
    pub bilateral: bool,
    /// Frames below this confidence are ignored
    pub min_confidence: f32,
}

impl ExerciseProfile {
    pub const DEFAULT_ABORT_VELOCITY: f32 = 90.0;
    pub const DEFAULT_MIN_CONFIDENCE: f32 = 0.5;

    /// Profile with explicit thresholds and default tuning
    pub fn new(exercise: ExerciseType, thresholds: JointThresholds) -> Self {
        ExerciseProfile {
            exercise,
            joint: exercise.primary_joint(),
            start_margin: thresholds.tolerance,
            thresholds,
            abort_velocity: Self::DEFAULT_ABORT_VELOCITY,
            cooldown: CooldownConfig::default(),
            bilateral: exercise.is_bilateral(),
            min_confidence: Self::DEFAULT_MIN_CONFIDENCE,
        }
    }

    /// Profile from the built-in catalog
    pub fn from_catalog(exercise: ExerciseType) -> KinexResult<Self> {
        let entry = catalog_entry(exercise);
        let config = ThresholdConfig {
            hold_time: entry.hold_time,
            ..ThresholdConfig::default()
        };
        let thresholds = JointThresholds::derive(entry.resting, entry.max_rom, &config, Utc::now())
            .ok_or_else(|| {
                KinexError::InvalidConfig(format!("catalog range for {} is too small", exercise))
            })?;
        Ok(Self::new(exercise, thresholds))
    }

    /// Profile from a user calibration. Expired or invalidated results are refused.
    pub fn from_calibration(result: &CalibrationResult, now: DateTime<Utc>) -> KinexResult<Self> {
        if !result.is_valid_at(now) {
            return Err(KinexError::CalibrationExpired {
                exercise: result.exercise,
                joint: result.joint,
                side: result.side,
            });
        }
        let mut profile = Self::new(result.exercise, result.thresholds);
        profile.joint = result.joint;
        Ok(profile)
    }

    pub fn with_cooldown(mut self, cooldown: CooldownConfig) -> Self {
        self.cooldown = cooldown;
        self
    }

    pub fn with_abort_velocity(mut self, abort_velocity: f32) -> Self {
        self.abort_velocity = abort_velocity;
        self
    }

    pub fn with_min_confidence(mut self, min_confidence: f32) -> Self {
        self.min_confidence = min_confidence;
        self
    }

    #[inline]
    pub fn direction(&self) -> AngleDirection {
        self.thresholds.direction
    }

    #[inline]
    pub fn target_angle(&self) -> f32 {
        self.thresholds.target_angle
    }

    #[inline]
    pub fn hold_time(&self) -> Duration {
        self.thresholds.completion.hold_time
    }
}
