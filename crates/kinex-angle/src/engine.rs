//! Angle engine - pose frame in, joint angle samples out

use serde::{Deserialize, Serialize};

use kinex_core::{AngleSample, JointType, KinexResult, Landmark, PoseFrame, Side};

use crate::angle::{compute, AngleMethod, HybridConfig};
use crate::joint_map::{JointMap, JointPoints};

/// Angle engine configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AngleEngineConfig {
    /// Method used for every joint
    pub method: AngleMethod,
    /// Depth weighting for 3D and hybrid methods
    pub hybrid: HybridConfig,
    /// Landmarks below this visibility count as missing
    pub min_visibility: f32,
    /// Height of the synthetic vertical point above hip-center (normalized units)
    pub spine_reference_height: f32,
}

impl Default for AngleEngineConfig {
    fn default() -> Self {
        AngleEngineConfig {
            method: AngleMethod::Hybrid,
            hybrid: HybridConfig::default(),
            min_visibility: 0.5,
            spine_reference_height: 0.2,
        }
    }
}

impl AngleEngineConfig {
    /// Side-on camera setup
    pub fn side_view() -> Self {
        AngleEngineConfig {
            method: AngleMethod::Side,
            ..Self::default()
        }
    }

    /// Detector without usable depth
    pub fn flat() -> Self {
        AngleEngineConfig {
            method: AngleMethod::TwoD,
            ..Self::default()
        }
    }
}

/// Converts pose frames into joint angles
#[derive(Debug, Clone)]
pub struct AngleEngine {
    config: AngleEngineConfig,
    map: JointMap,
}

impl AngleEngine {
    /// Engine over the standard MediaPipe joint map
    pub fn new(config: AngleEngineConfig) -> KinexResult<Self> {
        Ok(Self::with_map(config, JointMap::standard()?))
    }

    pub fn with_map(config: AngleEngineConfig, map: JointMap) -> Self {
        tracing::debug!(method = ?config.method, min_visibility = config.min_visibility, "angle engine ready");
        Self { config, map }
    }

    pub fn config(&self) -> &AngleEngineConfig {
        &self.config
    }

    /// Measure one joint.
    ///
    /// Returns `None` when a required landmark is absent or below the
    /// visibility floor. Degenerate geometry yields a zero-confidence sample.
    pub fn measure(&self, frame: &PoseFrame, joint: JointType, side: Side) -> Option<AngleSample> {
        let (proximal, vertex, distal) = self.resolve(frame, joint, side)?;
        let est = compute(
            self.config.method,
            &proximal,
            &vertex,
            &distal,
            &self.config.hybrid,
        );
        Some(AngleSample::new(est.angle, est.confidence, frame.captured_at))
    }

    /// Measure a joint on both sides
    pub fn measure_pair(
        &self,
        frame: &PoseFrame,
        joint: JointType,
    ) -> (Option<AngleSample>, Option<AngleSample>) {
        (
            self.measure(frame, joint, Side::Left),
            self.measure(frame, joint, Side::Right),
        )
    }

    fn resolve(
        &self,
        frame: &PoseFrame,
        joint: JointType,
        side: Side,
    ) -> Option<(Landmark, Landmark, Landmark)> {
        let floor = self.config.min_visibility;
        match self.map.points(joint) {
            JointPoints::Triple { left, right } => {
                let t = match side {
                    Side::Left => left,
                    Side::Right => right,
                };
                Some((
                    *frame.visible(t.proximal, floor)?,
                    *frame.visible(t.vertex, floor)?,
                    *frame.visible(t.distal, floor)?,
                ))
            }
            JointPoints::SpineVertical { shoulders, hips } => {
                let shoulder_center = frame
                    .visible(shoulders.0, floor)?
                    .midpoint(frame.visible(shoulders.1, floor)?);
                let hip_center = frame
                    .visible(hips.0, floor)?
                    .midpoint(frame.visible(hips.1, floor)?);
                // Image y grows downward, so "above" is smaller y
                let vertical = Landmark {
                    y: hip_center.y - self.config.spine_reference_height,
                    ..hip_center
                };
                Some((shoulder_center, hip_center, vertical))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kinex_core::landmark::*;
    use kinex_core::MotionTime;

    fn standing_frame() -> PoseFrame {
        let mut lms = vec![Landmark::new(0.5, 0.5, 0.0, 0.0); POSE_LANDMARK_COUNT];
        let mut set = |i: usize, x: f32, y: f32| lms[i] = Landmark::visible(x, y, 0.0);
        set(LEFT_SHOULDER, 0.45, 0.30);
        set(RIGHT_SHOULDER, 0.55, 0.30);
        set(LEFT_HIP, 0.46, 0.55);
        set(RIGHT_HIP, 0.54, 0.55);
        // Left knee bent 90°, right leg straight
        set(LEFT_KNEE, 0.46, 0.75);
        set(LEFT_ANKLE, 0.66, 0.75);
        set(RIGHT_KNEE, 0.54, 0.75);
        set(RIGHT_ANKLE, 0.54, 0.95);
        PoseFrame::new(lms, MotionTime::from_millis(40))
    }

    #[test]
    fn test_measure_knees() {
        let engine = AngleEngine::new(AngleEngineConfig::default()).unwrap();
        let frame = standing_frame();

        let (left, right) = engine.measure_pair(&frame, JointType::Knee);
        let left = left.unwrap();
        let right = right.unwrap();
        assert!((left.angle - 90.0).abs() < 0.1);
        assert!((right.angle - 180.0).abs() < 0.1);
        assert_eq!(left.timestamp, MotionTime::from_millis(40));
    }

    #[test]
    fn test_missing_landmark_is_none() {
        let engine = AngleEngine::new(AngleEngineConfig::default()).unwrap();
        let mut frame = standing_frame();
        frame.landmarks[LEFT_ANKLE].visibility = 0.1;

        assert!(engine.measure(&frame, JointType::Knee, Side::Left).is_none());
        assert!(engine.measure(&frame, JointType::Knee, Side::Right).is_some());

        frame.landmarks.truncate(20);
        assert!(engine.measure(&frame, JointType::Knee, Side::Right).is_none());
    }

    #[test]
    fn test_spine_upright_is_near_zero() {
        let engine = AngleEngine::new(AngleEngineConfig::flat()).unwrap();
        let frame = standing_frame();

        let spine = engine.measure(&frame, JointType::Spine, Side::Left).unwrap();
        assert!(spine.angle < 1.0);
    }

    #[test]
    fn test_spine_forward_lean() {
        let engine = AngleEngine::new(AngleEngineConfig::flat()).unwrap();
        let mut frame = standing_frame();
        // Shoulders pitched forward 45° about the hip center
        frame.landmarks[LEFT_SHOULDER] = Landmark::visible(0.75, 0.30, 0.0);
        frame.landmarks[RIGHT_SHOULDER] = Landmark::visible(0.75, 0.30, 0.0);

        let spine = engine.measure(&frame, JointType::Spine, Side::Right).unwrap();
        assert!((spine.angle - 45.0).abs() < 0.5);
    }
}
