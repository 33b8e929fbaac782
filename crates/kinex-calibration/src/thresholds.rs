//! Per-user joint thresholds derived from resting and max-ROM angles

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use kinex_core::{clamp_angle, AngleDirection};

/// Smallest usable range of motion in degrees. Anything less is rejected.
pub const MIN_TOTAL_ROM: f32 = 10.0;

/// How thresholds are placed inside the measured range
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdConfig {
    /// Target as a percentage of total ROM
    pub target_percent: f32,
    /// Tolerance as a percentage of total ROM
    pub tolerance_percent: f32,
    /// Lower bound on the tolerance in degrees
    pub min_tolerance: f32,
    /// Hold required at the completion threshold
    pub hold_time: Duration,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        ThresholdConfig {
            target_percent: 80.0,
            tolerance_percent: 10.0,
            min_tolerance: 3.0,
            hold_time: Duration::from_millis(500),
        }
    }
}

impl ThresholdConfig {
    /// Early rehabilitation: shallower target, shorter hold
    pub fn gentle() -> Self {
        ThresholdConfig {
            target_percent: 60.0,
            tolerance_percent: 15.0,
            hold_time: Duration::from_millis(300),
            ..Self::default()
        }
    }
}

/// Start position band
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StartAngle {
    pub center: f32,
    pub min: f32,
    pub max: f32,
}

impl StartAngle {
    #[inline]
    pub fn contains(&self, angle: f32) -> bool {
        angle >= self.min && angle <= self.max
    }
}

/// Angle that counts as reaching the target, and how long to stay there
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompletionThreshold {
    pub angle: f32,
    pub hold_time: Duration,
}

/// Angle that counts as back at the start
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReturnThreshold {
    pub angle: f32,
}

/// Thresholds for one exercise/joint/side. Immutable once derived.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JointThresholds {
    pub start: StartAngle,
    pub target_angle: f32,
    pub completion: CompletionThreshold,
    pub return_threshold: ReturnThreshold,
    /// |max_rom − resting|, at least [`MIN_TOTAL_ROM`]
    pub total_rom: f32,
    pub tolerance: f32,
    /// Decreasing for flexion, increasing for extension
    pub direction: AngleDirection,
    pub calculated_at: DateTime<Utc>,
}

impl JointThresholds {
    /// Derive thresholds from the resting and max-ROM angles.
    ///
    /// Returns `None` when the range is below [`MIN_TOTAL_ROM`].
    pub fn derive(
        resting: f32,
        max_rom: f32,
        config: &ThresholdConfig,
        calculated_at: DateTime<Utc>,
    ) -> Option<Self> {
        let total_rom = (max_rom - resting).abs();
        if !total_rom.is_finite() || total_rom < MIN_TOTAL_ROM {
            return None;
        }

        let direction = AngleDirection::from_delta(resting, max_rom);
        let s = direction.sign();
        let target_angle = clamp_angle(resting + s * total_rom * config.target_percent / 100.0);
        let tolerance = (total_rom * config.tolerance_percent / 100.0).max(config.min_tolerance);

        Some(JointThresholds {
            start: StartAngle {
                center: resting,
                min: clamp_angle(resting - tolerance),
                max: clamp_angle(resting + tolerance),
            },
            target_angle,
            completion: CompletionThreshold {
                angle: clamp_angle(target_angle - s * tolerance / 2.0),
                hold_time: config.hold_time,
            },
            return_threshold: ReturnThreshold {
                angle: clamp_angle(resting + s * tolerance / 2.0),
            },
            total_rom,
            tolerance,
            direction,
            calculated_at,
        })
    }

    #[inline]
    pub fn in_start_band(&self, angle: f32) -> bool {
        self.start.contains(angle)
    }

    #[inline]
    pub fn has_reached_completion(&self, angle: f32) -> bool {
        self.direction.is_past(angle, self.completion.angle)
    }

    /// Back on the start side of the return threshold
    #[inline]
    pub fn has_returned(&self, angle: f32) -> bool {
        self.direction.opposite().is_past(angle, self.return_threshold.angle)
    }

    /// Signed travel from the start center, positive toward the target
    #[inline]
    pub fn travel(&self, angle: f32) -> f32 {
        (angle - self.start.center) * self.direction.sign()
    }

    /// Fraction of the way from the start center to the target, in [0, 1]
    pub fn progress(&self, angle: f32) -> f32 {
        let span = (self.target_angle - self.start.center).abs();
        if span <= f32::EPSILON {
            return 0.0;
        }
        (self.travel(angle) / span).clamp(0.0, 1.0)
    }

    #[inline]
    pub fn deviation_from_target(&self, angle: f32) -> f32 {
        (angle - self.target_angle).abs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn test_flexion_thresholds() {
        let t = JointThresholds::derive(170.0, 50.0, &ThresholdConfig::default(), Utc::now()).unwrap();

        assert_eq!(t.direction, AngleDirection::Decreasing);
        assert!(close(t.total_rom, 120.0));
        assert!(close(t.target_angle, 74.0));
        assert!(close(t.tolerance, 12.0));
        assert!(close(t.completion.angle, 80.0));
        assert!(close(t.return_threshold.angle, 164.0));
        assert!(close(t.start.min, 158.0));
        assert!(close(t.start.max, 180.0));
        assert_eq!(t.completion.hold_time, Duration::from_millis(500));
    }

    #[test]
    fn test_extension_mirrors() {
        let t = JointThresholds::derive(90.0, 170.0, &ThresholdConfig::default(), Utc::now()).unwrap();

        assert_eq!(t.direction, AngleDirection::Increasing);
        assert!(close(t.target_angle, 154.0));
        assert!(close(t.tolerance, 8.0));
        assert!(close(t.completion.angle, 150.0));
        assert!(close(t.return_threshold.angle, 94.0));
        assert!(t.has_reached_completion(151.0));
        assert!(t.has_returned(93.0));
        assert!(!t.has_returned(120.0));
    }

    #[test]
    fn test_small_rom_rejected() {
        assert!(JointThresholds::derive(170.0, 165.0, &ThresholdConfig::default(), Utc::now()).is_none());
        assert!(JointThresholds::derive(170.0, 160.0, &ThresholdConfig::default(), Utc::now()).is_some());
    }

    #[test]
    fn test_min_tolerance() {
        // 10% of 20° is 2°, raised to the 3° floor
        let t = JointThresholds::derive(100.0, 80.0, &ThresholdConfig::default(), Utc::now()).unwrap();
        assert!(close(t.tolerance, 3.0));
    }

    #[test]
    fn test_progress_direction_aware() {
        let t = JointThresholds::derive(170.0, 50.0, &ThresholdConfig::default(), Utc::now()).unwrap();
        assert_eq!(t.progress(170.0), 0.0);
        assert!(close(t.progress(122.0), 0.5));
        assert_eq!(t.progress(60.0), 1.0);
        // Moving the wrong way never goes negative
        assert_eq!(t.progress(178.0), 0.0);
    }

    #[test]
    fn test_predicates() {
        let t = JointThresholds::derive(170.0, 50.0, &ThresholdConfig::default(), Utc::now()).unwrap();
        assert!(t.in_start_band(165.0));
        assert!(!t.in_start_band(150.0));
        assert!(t.has_reached_completion(80.0));
        assert!(!t.has_reached_completion(81.0));
        assert!(t.has_returned(164.0));
        assert!(!t.has_returned(150.0));
    }
}
