//! Joint → landmark lookup table
//!
//! The mapping is data, validated once when constructed: every joint in
//! [`JointType::ALL`] must have an entry and every index must fall inside a
//! full pose frame. A gap fails at setup instead of silently producing no
//! angle on every frame.

use std::collections::HashMap;

use kinex_core::landmark::*;
use kinex_core::{JointType, KinexError, KinexResult, Side};

/// Three landmark indices around a joint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JointTriple {
    pub proximal: usize,
    pub vertex: usize,
    pub distal: usize,
}

impl JointTriple {
    pub const fn new(proximal: usize, vertex: usize, distal: usize) -> Self {
        Self {
            proximal,
            vertex,
            distal,
        }
    }

    fn indices(&self) -> [usize; 3] {
        [self.proximal, self.vertex, self.distal]
    }
}

/// How a joint's points are resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JointPoints {
    /// Direct landmark indices, with alternates for the right side
    Triple { left: JointTriple, right: JointTriple },
    /// Shoulder-center → hip-center → synthetic vertical above hip-center
    SpineVertical {
        shoulders: (usize, usize),
        hips: (usize, usize),
    },
}

impl JointPoints {
    fn indices(&self) -> Vec<usize> {
        match self {
            JointPoints::Triple { left, right } => {
                left.indices().into_iter().chain(right.indices()).collect()
            }
            JointPoints::SpineVertical { shoulders, hips } => {
                vec![shoulders.0, shoulders.1, hips.0, hips.1]
            }
        }
    }
}

/// Validated joint table
#[derive(Debug, Clone)]
pub struct JointMap {
    entries: HashMap<JointType, JointPoints>,
}

impl JointMap {
    /// Build and validate a map
    pub fn new(entries: impl IntoIterator<Item = (JointType, JointPoints)>) -> KinexResult<Self> {
        let entries: HashMap<_, _> = entries.into_iter().collect();

        for joint in JointType::ALL {
            let points = entries
                .get(&joint)
                .ok_or(KinexError::IncompleteJointMap(joint))?;
            if let Some(&index) = points.indices().iter().find(|&&i| i >= POSE_LANDMARK_COUNT) {
                return Err(KinexError::LandmarkIndexOutOfRange {
                    joint,
                    index,
                    available: POSE_LANDMARK_COUNT,
                });
            }
        }

        Ok(Self { entries })
    }

    /// MediaPipe Pose table for all supported joints
    pub fn standard() -> KinexResult<Self> {
        let triple = |l: JointTriple, r: JointTriple| JointPoints::Triple { left: l, right: r };

        Self::new([
            (
                JointType::Knee,
                triple(
                    JointTriple::new(LEFT_HIP, LEFT_KNEE, LEFT_ANKLE),
                    JointTriple::new(RIGHT_HIP, RIGHT_KNEE, RIGHT_ANKLE),
                ),
            ),
            (
                JointType::Hip,
                triple(
                    JointTriple::new(LEFT_SHOULDER, LEFT_HIP, LEFT_KNEE),
                    JointTriple::new(RIGHT_SHOULDER, RIGHT_HIP, RIGHT_KNEE),
                ),
            ),
            (
                JointType::Shoulder,
                triple(
                    JointTriple::new(LEFT_HIP, LEFT_SHOULDER, LEFT_ELBOW),
                    JointTriple::new(RIGHT_HIP, RIGHT_SHOULDER, RIGHT_ELBOW),
                ),
            ),
            (
                JointType::Elbow,
                triple(
                    JointTriple::new(LEFT_SHOULDER, LEFT_ELBOW, LEFT_WRIST),
                    JointTriple::new(RIGHT_SHOULDER, RIGHT_ELBOW, RIGHT_WRIST),
                ),
            ),
            (
                JointType::Ankle,
                triple(
                    JointTriple::new(LEFT_KNEE, LEFT_ANKLE, LEFT_FOOT_INDEX),
                    JointTriple::new(RIGHT_KNEE, RIGHT_ANKLE, RIGHT_FOOT_INDEX),
                ),
            ),
            (
                JointType::Wrist,
                triple(
                    JointTriple::new(LEFT_ELBOW, LEFT_WRIST, LEFT_INDEX),
                    JointTriple::new(RIGHT_ELBOW, RIGHT_WRIST, RIGHT_INDEX),
                ),
            ),
            (
                JointType::Neck,
                triple(
                    JointTriple::new(LEFT_HIP, LEFT_SHOULDER, LEFT_EAR),
                    JointTriple::new(RIGHT_HIP, RIGHT_SHOULDER, RIGHT_EAR),
                ),
            ),
            (
                JointType::Spine,
                JointPoints::SpineVertical {
                    shoulders: (LEFT_SHOULDER, RIGHT_SHOULDER),
                    hips: (LEFT_HIP, RIGHT_HIP),
                },
            ),
        ])
    }

    /// Points for a joint. Always present after validation.
    pub fn points(&self, joint: JointType) -> &JointPoints {
        // `new` rejects maps missing any joint
        &self.entries[&joint]
    }

    /// Direct triple for a joint and side, `None` for the spine
    pub fn triple(&self, joint: JointType, side: Side) -> Option<JointTriple> {
        match self.points(joint) {
            JointPoints::Triple { left, right } => Some(match side {
                Side::Left => *left,
                Side::Right => *right,
            }),
            JointPoints::SpineVertical { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_map_is_complete() {
        let map = JointMap::standard().unwrap();
        for joint in JointType::ALL {
            let _ = map.points(joint);
        }
        assert_eq!(
            map.triple(JointType::Knee, Side::Right),
            Some(JointTriple::new(RIGHT_HIP, RIGHT_KNEE, RIGHT_ANKLE))
        );
        assert!(map.triple(JointType::Spine, Side::Left).is_none());
    }

    #[test]
    fn test_missing_joint_fails_fast() {
        let map = JointMap::new([(
            JointType::Knee,
            JointPoints::Triple {
                left: JointTriple::new(LEFT_HIP, LEFT_KNEE, LEFT_ANKLE),
                right: JointTriple::new(RIGHT_HIP, RIGHT_KNEE, RIGHT_ANKLE),
            },
        )]);
        assert!(matches!(map, Err(KinexError::IncompleteJointMap(_))));
    }

    #[test]
    fn test_out_of_range_index_fails() {
        let bad = JointTriple::new(LEFT_HIP, 40, LEFT_ANKLE);
        let entries = JointType::ALL.map(|j| {
            (
                j,
                JointPoints::Triple {
                    left: bad,
                    right: bad,
                },
            )
        });
        assert!(matches!(
            JointMap::new(entries),
            Err(KinexError::LandmarkIndexOutOfRange { index: 40, .. })
        ));
    }
}
