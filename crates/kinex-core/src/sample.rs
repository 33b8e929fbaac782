//! Angle samples

use serde::{Deserialize, Serialize};

use crate::MotionTime;

pub const MIN_ANGLE: f32 = 0.0;
pub const MAX_ANGLE: f32 = 180.0;

/// Clamp an angle to [0, 180]. NaN maps to 0.
#[inline]
pub fn clamp_angle(angle: f32) -> f32 {
    if angle.is_nan() {
        return MIN_ANGLE;
    }
    angle.clamp(MIN_ANGLE, MAX_ANGLE)
}

/// Clamp a confidence to [0, 1]. NaN maps to 0.
#[inline]
pub fn clamp_confidence(confidence: f32) -> f32 {
    if confidence.is_nan() {
        return 0.0;
    }
    confidence.clamp(0.0, 1.0)
}

/// A joint angle measurement
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AngleSample {
    /// Degrees in [0, 180]
    pub angle: f32,
    /// [0, 1]
    pub confidence: f32,
    pub timestamp: MotionTime,
}

impl AngleSample {
    pub fn new(angle: f32, confidence: f32, timestamp: MotionTime) -> Self {
        Self {
            angle: clamp_angle(angle),
            confidence: clamp_confidence(confidence),
            timestamp,
        }
    }

    /// Zero-angle, zero-confidence sample for degenerate geometry
    pub fn degenerate(timestamp: MotionTime) -> Self {
        Self {
            angle: 0.0,
            confidence: 0.0,
            timestamp,
        }
    }

    /// Same sample with a replaced angle (clamped)
    pub fn with_angle(self, angle: f32) -> Self {
        Self {
            angle: clamp_angle(angle),
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_degenerate_sample() {
        let s = AngleSample::degenerate(MotionTime::from_millis(5));
        assert_eq!(s.angle, 0.0);
        assert_eq!(s.confidence, 0.0);
    }

    proptest! {
        #[test]
        fn prop_sample_always_clamped(angle in -1000.0f32..1000.0, conf in -5.0f32..5.0) {
            let s = AngleSample::new(angle, conf, MotionTime::ZERO);
            prop_assert!((0.0..=180.0).contains(&s.angle));
            prop_assert!((0.0..=1.0).contains(&s.confidence));
        }
    }
}
