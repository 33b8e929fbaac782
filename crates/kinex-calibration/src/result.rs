//! Calibration result value object

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use kinex_core::{ExerciseType, JointType, Side, UserId};

use crate::JointThresholds;

/// Outcome of a successful calibration.
///
/// Keyed by `(user_id, exercise, joint, side)`. Detectors may only use it
/// while [`is_valid_at`](Self::is_valid_at) holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationResult {
    pub user_id: UserId,
    pub exercise: ExerciseType,
    pub joint: JointType,
    pub side: Side,
    /// Robust median of the resting phase
    pub resting_angle: f32,
    /// Robust median of the max-ROM phase
    pub max_rom_angle: f32,
    pub thresholds: JointThresholds,
    /// [0, 1]
    pub confidence: f32,
    pub calibrated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Set by an explicit reset or recalibration request
    #[serde(default)]
    pub invalidated: bool,
}

impl CalibrationResult {
    /// `expires_at` for a result calibrated at `at`
    pub fn expiry(at: DateTime<Utc>, validity_days: u32) -> DateTime<Utc> {
        at + Duration::days(i64::from(validity_days))
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Usable by a rep detector at `now`
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.invalidated && !self.is_expired_at(now)
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }

    pub fn invalidate(&mut self) {
        self.invalidated = true;
    }

    #[inline]
    pub fn total_rom(&self) -> f32 {
        self.thresholds.total_rom
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ThresholdConfig;

    fn result_at(at: DateTime<Utc>) -> CalibrationResult {
        CalibrationResult {
            user_id: UserId::from("u1"),
            exercise: ExerciseType::Squat,
            joint: JointType::Knee,
            side: Side::Left,
            resting_angle: 170.0,
            max_rom_angle: 50.0,
            thresholds: JointThresholds::derive(170.0, 50.0, &ThresholdConfig::default(), at).unwrap(),
            confidence: 0.9,
            calibrated_at: at,
            expires_at: CalibrationResult::expiry(at, 30),
            invalidated: false,
        }
    }

    #[test]
    fn test_expiry() {
        let at = Utc::now();
        let result = result_at(at);
        assert!(result.is_valid_at(at + Duration::days(29)));
        assert!(!result.is_valid_at(at + Duration::days(30)));
    }

    #[test]
    fn test_invalidate() {
        let at = Utc::now();
        let mut result = result_at(at);
        result.invalidate();
        assert!(!result.is_valid_at(at));
    }

    #[test]
    fn test_json_round_trip_keeps_validity() {
        let at = Utc::now();
        let result = result_at(at);
        let json = serde_json::to_string(&result).unwrap();
        let back: CalibrationResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back.exercise, ExerciseType::Squat);
        assert_eq!(back.expires_at, result.expires_at);
        assert!(back.is_valid_at(at));
    }
}
