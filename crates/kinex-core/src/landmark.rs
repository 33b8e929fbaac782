//! Landmarks and pose frames
//!
//! Landmarks arrive from an external pose detector using MediaPipe Pose
//! indexing (33 points). Only the body points listed below are read by the
//! angle engine; head and hand extremities are carried through untouched.

use serde::{Deserialize, Serialize};

use crate::MotionTime;

// ============================================================================
// LANDMARK INDICES (MediaPipe Pose - 33 total)
// ============================================================================

pub const POSE_LANDMARK_COUNT: usize = 33;

pub const NOSE: usize = 0;
pub const LEFT_EAR: usize = 7;
pub const RIGHT_EAR: usize = 8;
pub const LEFT_SHOULDER: usize = 11;
pub const RIGHT_SHOULDER: usize = 12;
pub const LEFT_ELBOW: usize = 13;
pub const RIGHT_ELBOW: usize = 14;
pub const LEFT_WRIST: usize = 15;
pub const RIGHT_WRIST: usize = 16;
pub const LEFT_INDEX: usize = 19;
pub const RIGHT_INDEX: usize = 20;
pub const LEFT_HIP: usize = 23;
pub const RIGHT_HIP: usize = 24;
pub const LEFT_KNEE: usize = 25;
pub const RIGHT_KNEE: usize = 26;
pub const LEFT_ANKLE: usize = 27;
pub const RIGHT_ANKLE: usize = 28;
pub const LEFT_FOOT_INDEX: usize = 31;
pub const RIGHT_FOOT_INDEX: usize = 32;

// ============================================================================
// LANDMARK DATA
// ============================================================================

/// A single 3D landmark point
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    /// 0-1 normalized image x
    pub x: f32,
    /// 0-1 normalized image y (grows downward)
    pub y: f32,
    /// Relative depth, same scale as x
    pub z: f32,
    /// Detector visibility in [0, 1]
    pub visibility: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32, z: f32, visibility: f32) -> Self {
        Self {
            x,
            y,
            z,
            visibility: visibility.clamp(0.0, 1.0),
        }
    }

    /// Fully visible landmark
    pub fn visible(x: f32, y: f32, z: f32) -> Self {
        Self::new(x, y, z, 1.0)
    }

    /// Midpoint of two landmarks, visibility is the weaker of the two
    pub fn midpoint(&self, other: &Landmark) -> Landmark {
        Landmark {
            x: (self.x + other.x) * 0.5,
            y: (self.y + other.y) * 0.5,
            z: (self.z + other.z) * 0.5,
            visibility: self.visibility.min(other.visibility),
        }
    }

    #[inline]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// One detector snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PoseFrame {
    pub landmarks: Vec<Landmark>,
    pub captured_at: MotionTime,
}

impl PoseFrame {
    pub fn new(landmarks: Vec<Landmark>, captured_at: MotionTime) -> Self {
        Self {
            landmarks,
            captured_at,
        }
    }

    /// Build a frame from a flat `[x, y, z, visibility] * n` buffer.
    /// Returns `None` when the buffer length is not a multiple of four.
    pub fn from_flat(data: &[f32], captured_at: MotionTime) -> Option<Self> {
        if data.is_empty() || data.len() % 4 != 0 {
            return None;
        }
        let landmarks = data
            .chunks_exact(4)
            .map(|c| Landmark::new(c[0], c[1], c[2], c[3]))
            .collect();
        Some(Self::new(landmarks, captured_at))
    }

    /// Get a landmark if it exists, is finite and meets the visibility floor
    pub fn visible(&self, index: usize, min_visibility: f32) -> Option<&Landmark> {
        self.landmarks
            .get(index)
            .filter(|l| l.is_finite() && l.visibility >= min_visibility)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.landmarks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.landmarks.is_empty()
    }

    /// True when the frame carries a full body skeleton
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.landmarks.len() >= POSE_LANDMARK_COUNT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_flat() {
        let mut data = vec![0.0f32; POSE_LANDMARK_COUNT * 4];
        data[LEFT_KNEE * 4] = 0.4;
        data[LEFT_KNEE * 4 + 3] = 0.9;

        let frame = PoseFrame::from_flat(&data, MotionTime::ZERO).unwrap();
        assert!(frame.is_complete());
        assert_eq!(frame.landmarks[LEFT_KNEE].x, 0.4);
        assert!(frame.visible(LEFT_KNEE, 0.5).is_some());
        assert!(frame.visible(RIGHT_KNEE, 0.5).is_none());

        assert!(PoseFrame::from_flat(&data[..7], MotionTime::ZERO).is_none());
    }

    #[test]
    fn test_visibility_clamped() {
        let l = Landmark::new(0.0, 0.0, 0.0, 1.7);
        assert_eq!(l.visibility, 1.0);
    }

    #[test]
    fn test_non_finite_not_visible() {
        let frame = PoseFrame::new(
            vec![Landmark::new(f32::NAN, 0.0, 0.0, 1.0)],
            MotionTime::ZERO,
        );
        assert!(frame.visible(0, 0.0).is_none());
    }
}
