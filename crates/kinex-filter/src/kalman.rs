//! 1-D Kalman filter for joint angles
//!
//! State: the angle estimate `x` and its error covariance `p`.
//! Each measurement runs predict and correct in one step:
//!
//! ```text
//! p += q
//! k  = p / (p + r)
//! x += k · (z − x)
//! p *= (1 − k)
//! ```

use serde::{Deserialize, Serialize};

use kinex_core::JointType;

/// Process and measurement noise for one joint
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KalmanTuning {
    /// Process noise: how fast the true angle is expected to wander
    pub q: f32,
    /// Measurement noise: detector jitter
    pub r: f32,
}

impl KalmanTuning {
    pub const fn new(q: f32, r: f32) -> Self {
        Self { q, r }
    }

    /// Per-joint table. Looser joints tolerate more process noise.
    pub fn for_joint(joint: JointType) -> Self {
        match joint {
            JointType::Knee => Self::new(0.08, 0.8),
            JointType::Hip => Self::new(0.10, 1.0),
            JointType::Shoulder => Self::new(0.12, 1.2),
            JointType::Elbow => Self::new(0.10, 0.9),
            JointType::Ankle => Self::new(0.08, 0.8),
            JointType::Wrist => Self::new(0.12, 1.2),
            JointType::Neck => Self::new(0.12, 1.2),
            JointType::Spine => Self::new(0.15, 1.5),
        }
    }
}

/// Scalar Kalman filter
#[derive(Debug, Clone)]
pub struct AngleKalman {
    /// Estimate
    x: f32,
    /// Error covariance
    p: f32,
    tuning: KalmanTuning,
    initialized: bool,
}

impl AngleKalman {
    /// Covariance after seeding from the first measurement
    const INITIAL_COVARIANCE: f32 = 1.0;

    pub fn new(tuning: KalmanTuning) -> Self {
        Self {
            x: 0.0,
            p: Self::INITIAL_COVARIANCE,
            tuning,
            initialized: false,
        }
    }

    pub fn for_joint(joint: JointType) -> Self {
        Self::new(KalmanTuning::for_joint(joint))
    }

    /// Feed one measurement, returns the new estimate.
    /// Non-finite measurements leave the state untouched.
    pub fn update(&mut self, measurement: f32) -> f32 {
        if !measurement.is_finite() {
            return self.x;
        }
        if !self.initialized {
            self.initialize(measurement);
            return self.x;
        }

        self.p += self.tuning.q;
        let k = self.p / (self.p + self.tuning.r);
        self.x += k * (measurement - self.x);
        self.p *= 1.0 - k;
        self.x
    }

    /// Seed the filter with a measurement
    pub fn initialize(&mut self, measurement: f32) {
        self.x = measurement;
        self.p = Self::INITIAL_COVARIANCE;
        self.initialized = true;
    }

    /// Start over as if no measurement was seen
    pub fn reset(&mut self) {
        *self = Self::new(self.tuning);
    }

    #[inline]
    pub fn estimate(&self) -> f32 {
        self.x
    }

    #[inline]
    pub fn covariance(&self) -> f32 {
        self.p
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn tuning(&self) -> KalmanTuning {
        self.tuning
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_first_measurement_seeds() {
        let mut kf = AngleKalman::for_joint(JointType::Knee);
        assert!(!kf.is_initialized());
        assert_eq!(kf.update(150.0), 150.0);
        assert!(kf.is_initialized());
    }

    #[test]
    fn test_smooths_step() {
        let mut kf = AngleKalman::for_joint(JointType::Knee);
        kf.update(170.0);
        let next = kf.update(90.0);
        // Moves toward the new value without jumping there
        assert!(next < 170.0 && next > 90.0);
    }

    #[test]
    fn test_covariance_settles() {
        let mut kf = AngleKalman::for_joint(JointType::Knee);
        kf.update(10.0);
        for _ in 0..100 {
            kf.update(10.0);
        }
        // Steady state posterior for q=0.08, r=0.8 is about 0.216
        assert!((kf.covariance() - 0.216).abs() < 0.01);
    }

    #[test]
    fn test_nan_ignored_and_reset() {
        let mut kf = AngleKalman::for_joint(JointType::Elbow);
        kf.update(100.0);
        assert_eq!(kf.update(f32::NAN), 100.0);
        kf.reset();
        assert!(!kf.is_initialized());
        assert_eq!(kf.update(40.0), 40.0);
    }

    proptest! {
        #[test]
        fn prop_converges_to_constant(
            first in 0.0f32..180.0,
            target in 0.0f32..180.0,
            joint_idx in 0usize..8,
        ) {
            let mut kf = AngleKalman::for_joint(JointType::ALL[joint_idx]);
            kf.update(first);
            let mut out = first;
            for _ in 0..300 {
                out = kf.update(target);
            }
            prop_assert!((out - target).abs() < 0.5, "out={} target={}", out, target);
        }
    }
}
