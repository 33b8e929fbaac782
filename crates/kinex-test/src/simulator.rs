//! Pose simulator - joint angles in, synthetic 33-landmark frames out
//!
//! The skeleton is built outward from a fixed pelvis, so every joint angle
//! rendered here is exactly what the angle engine measures back on a clean
//! frame. Left limbs bend one way and right limbs are mirrored.

use std::collections::HashMap;

use kinex_core::landmark::*;
use kinex_core::{JointType, Landmark, MotionTime, PoseFrame, Side};

/// Segment lengths and placement in normalized image units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkeletonConfig {
    /// Midpoint between the hips
    pub pelvis: (f32, f32),
    pub hip_width: f32,
    pub shoulder_width: f32,
    pub torso: f32,
    pub thigh: f32,
    pub shin: f32,
    pub foot: f32,
    pub upper_arm: f32,
    pub forearm: f32,
    pub hand: f32,
    pub neck: f32,
    /// Depth of every landmark
    pub depth: f32,
    /// Visibility of every landmark
    pub visibility: f32,
}

impl Default for SkeletonConfig {
    fn default() -> Self {
        SkeletonConfig {
            pelvis: (0.5, 0.55),
            hip_width: 0.08,
            shoulder_width: 0.1,
            torso: 0.25,
            thigh: 0.2,
            shin: 0.2,
            foot: 0.06,
            upper_arm: 0.15,
            forearm: 0.13,
            hand: 0.05,
            neck: 0.1,
            depth: 0.0,
            visibility: 0.99,
        }
    }
}

/// Standing rest pose for every joint
pub fn resting_angle(joint: JointType) -> f32 {
    match joint {
        JointType::Knee => 175.0,
        JointType::Hip => 175.0,
        JointType::Shoulder => 15.0,
        JointType::Elbow => 165.0,
        JointType::Ankle => 110.0,
        JointType::Wrist => 170.0,
        JointType::Neck => 170.0,
        JointType::Spine => 5.0,
    }
}

#[derive(Debug, Clone, Copy)]
struct Vec2 {
    x: f32,
    y: f32,
}

impl Vec2 {
    fn new(x: f32, y: f32) -> Self {
        Vec2 { x, y }
    }

    fn unit_towards(self, to: Vec2) -> Vec2 {
        let (dx, dy) = (to.x - self.x, to.y - self.y);
        let len = (dx * dx + dy * dy).sqrt();
        if len > 0.0 {
            Vec2::new(dx / len, dy / len)
        } else {
            Vec2::new(0.0, 1.0)
        }
    }

    fn rotate(self, degrees: f32) -> Vec2 {
        let (s, c) = degrees.to_radians().sin_cos();
        Vec2::new(self.x * c - self.y * s, self.x * s + self.y * c)
    }

    fn offset(self, dir: Vec2, len: f32) -> Vec2 {
        Vec2::new(self.x + dir.x * len, self.y + dir.y * len)
    }
}

/// Renders a pose from per-joint angles
#[derive(Debug, Clone)]
pub struct PoseSimulator {
    skeleton: SkeletonConfig,
    angles: HashMap<(JointType, Side), f32>,
}

impl Default for PoseSimulator {
    fn default() -> Self {
        Self::new(SkeletonConfig::default())
    }
}

impl PoseSimulator {
    pub fn new(skeleton: SkeletonConfig) -> Self {
        let angles = JointType::ALL
            .iter()
            .flat_map(|&j| Side::BOTH.map(|s| ((j, s), resting_angle(j))))
            .collect();
        PoseSimulator { skeleton, angles }
    }

    pub fn skeleton(&self) -> &SkeletonConfig {
        &self.skeleton
    }

    /// Set one joint angle. Spine ignores the side.
    pub fn set_angle(&mut self, joint: JointType, side: Side, angle: f32) {
        let angle = angle.clamp(0.0, 180.0);
        if joint == JointType::Spine {
            for s in Side::BOTH {
                self.angles.insert((joint, s), angle);
            }
        } else {
            self.angles.insert((joint, side), angle);
        }
    }

    pub fn angle(&self, joint: JointType, side: Side) -> f32 {
        self.angles
            .get(&(joint, side))
            .copied()
            .unwrap_or_else(|| resting_angle(joint))
    }

    /// Return every joint to the rest pose
    pub fn rest(&mut self) {
        *self = Self::new(self.skeleton);
    }

    /// Render the current pose
    pub fn render(&self, captured_at: MotionTime) -> PoseFrame {
        let sk = &self.skeleton;
        let mut points = [Vec2::new(sk.pelvis.0, sk.pelvis.1); POSE_LANDMARK_COUNT];

        let pelvis = Vec2::new(sk.pelvis.0, sk.pelvis.1);
        let up = Vec2::new(0.0, -1.0);
        let trunk = up.rotate(self.angle(JointType::Spine, Side::Left));
        let across = trunk.rotate(90.0);
        let chest = pelvis.offset(trunk, sk.torso);

        for side in Side::BOTH {
            // Left limbs sit at smaller x and bend with positive rotation
            let (lateral, bend) = match side {
                Side::Left => (-0.5, 1.0),
                Side::Right => (0.5, -1.0),
            };
            let idx = SideIndices::of(side);

            let hip = pelvis.offset(across, lateral * sk.hip_width);
            let shoulder = chest.offset(across, lateral * sk.shoulder_width);
            points[idx.hip] = hip;
            points[idx.shoulder] = shoulder;

            // Leg: shoulder -> hip -> knee -> ankle -> foot
            let knee = self.place(hip, shoulder, JointType::Hip, side, bend, sk.thigh);
            let ankle = self.place(knee, hip, JointType::Knee, side, bend, sk.shin);
            let foot = self.place(ankle, knee, JointType::Ankle, side, bend, sk.foot);
            points[idx.knee] = knee;
            points[idx.ankle] = ankle;
            points[idx.foot] = foot;

            // Arm: hip -> shoulder -> elbow -> wrist -> index
            let elbow = self.place(shoulder, hip, JointType::Shoulder, side, -bend, sk.upper_arm);
            let wrist = self.place(elbow, shoulder, JointType::Elbow, side, -bend, sk.forearm);
            let index = self.place(wrist, elbow, JointType::Wrist, side, -bend, sk.hand);
            points[idx.elbow] = elbow;
            points[idx.wrist] = wrist;
            points[idx.index] = index;

            // Head: hip -> shoulder -> ear
            points[idx.ear] = self.place(shoulder, hip, JointType::Neck, side, bend, sk.neck);
        }

        let ears = (points[LEFT_EAR], points[RIGHT_EAR]);
        points[NOSE] = Vec2::new((ears.0.x + ears.1.x) / 2.0, (ears.0.y + ears.1.y) / 2.0);

        let landmarks = points
            .iter()
            .map(|p| Landmark::new(p.x, p.y, sk.depth, sk.visibility))
            .collect();
        PoseFrame::new(landmarks, captured_at)
    }

    /// Place the distal point of `joint` so the angle at `vertex` between
    /// `proximal` and the new point equals the joint angle
    fn place(
        &self,
        vertex: Vec2,
        proximal: Vec2,
        joint: JointType,
        side: Side,
        bend: f32,
        length: f32,
    ) -> Vec2 {
        let dir = vertex.unit_towards(proximal).rotate(bend * self.angle(joint, side));
        vertex.offset(dir, length)
    }
}

struct SideIndices {
    shoulder: usize,
    elbow: usize,
    wrist: usize,
    index: usize,
    hip: usize,
    knee: usize,
    ankle: usize,
    foot: usize,
    ear: usize,
}

impl SideIndices {
    fn of(side: Side) -> Self {
        match side {
            Side::Left => SideIndices {
                shoulder: LEFT_SHOULDER,
                elbow: LEFT_ELBOW,
                wrist: LEFT_WRIST,
                index: LEFT_INDEX,
                hip: LEFT_HIP,
                knee: LEFT_KNEE,
                ankle: LEFT_ANKLE,
                foot: LEFT_FOOT_INDEX,
                ear: LEFT_EAR,
            },
            Side::Right => SideIndices {
                shoulder: RIGHT_SHOULDER,
                elbow: RIGHT_ELBOW,
                wrist: RIGHT_WRIST,
                index: RIGHT_INDEX,
                hip: RIGHT_HIP,
                knee: RIGHT_KNEE,
                ankle: RIGHT_ANKLE,
                foot: RIGHT_FOOT_INDEX,
                ear: RIGHT_EAR,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kinex_angle::{AngleEngine, AngleEngineConfig};
    use proptest::prelude::*;

    #[test]
    fn test_rest_pose_round_trips() {
        let engine = AngleEngine::new(AngleEngineConfig::default()).unwrap();
        let frame = PoseSimulator::default().render(MotionTime::ZERO);
        assert_eq!(frame.len(), POSE_LANDMARK_COUNT);

        for joint in JointType::ALL {
            for side in Side::BOTH {
                let s = engine.measure(&frame, joint, side).unwrap();
                assert!(
                    (s.angle - resting_angle(joint)).abs() < 0.5,
                    "{} {}: {}",
                    side,
                    joint,
                    s.angle
                );
            }
        }
    }

    #[test]
    fn test_set_angle_round_trips() {
        let engine = AngleEngine::new(AngleEngineConfig::default()).unwrap();
        let mut sim = PoseSimulator::default();
        sim.set_angle(JointType::Knee, Side::Right, 90.0);
        sim.set_angle(JointType::Elbow, Side::Left, 45.0);
        sim.set_angle(JointType::Spine, Side::Left, 40.0);
        let frame = sim.render(MotionTime::ZERO);

        let measure = |j, s| engine.measure(&frame, j, s).unwrap().angle;
        assert!((measure(JointType::Knee, Side::Right) - 90.0).abs() < 0.5);
        assert!((measure(JointType::Knee, Side::Left) - 175.0).abs() < 0.5);
        assert!((measure(JointType::Elbow, Side::Left) - 45.0).abs() < 0.5);
        assert!((measure(JointType::Spine, Side::Right) - 40.0).abs() < 0.5);
        // Hips follow the trunk, so the hip angle is unchanged
        assert!((measure(JointType::Hip, Side::Left) - 175.0).abs() < 0.5);
    }

    proptest! {
        #[test]
        fn prop_limb_angles_round_trip(
            joint in prop::sample::select(vec![
                JointType::Knee,
                JointType::Elbow,
                JointType::Shoulder,
                JointType::Wrist,
            ]),
            right in any::<bool>(),
            angle in 5.0f32..175.0,
        ) {
            let side = if right { Side::Right } else { Side::Left };
            let engine = AngleEngine::new(AngleEngineConfig::default()).unwrap();
            let mut sim = PoseSimulator::default();
            sim.set_angle(joint, side, angle);
            let measured = engine.measure(&sim.render(MotionTime::ZERO), joint, side).unwrap();
            prop_assert!((measured.angle - angle).abs() < 0.5, "{} vs {}", measured.angle, angle);
        }
    }
}
