//! Joint, side and movement identifiers

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::KinexError;

/// Joints the angle engine can measure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JointType {
    Knee,
    Hip,
    Shoulder,
    Elbow,
    Ankle,
    Wrist,
    Neck,
    Spine,
}

impl JointType {
    /// All joints in order
    pub const ALL: [JointType; 8] = [
        JointType::Knee,
        JointType::Hip,
        JointType::Shoulder,
        JointType::Elbow,
        JointType::Ankle,
        JointType::Wrist,
        JointType::Neck,
        JointType::Spine,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JointType::Knee => "knee",
            JointType::Hip => "hip",
            JointType::Shoulder => "shoulder",
            JointType::Elbow => "elbow",
            JointType::Ankle => "ankle",
            JointType::Wrist => "wrist",
            JointType::Neck => "neck",
            JointType::Spine => "spine",
        }
    }

    /// Axial joints have no left/right variant
    pub fn is_axial(&self) -> bool {
        matches!(self, JointType::Neck | JointType::Spine)
    }
}

impl fmt::Display for JointType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JointType {
    type Err = KinexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JointType::ALL
            .iter()
            .copied()
            .find(|j| j.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| KinexError::UnknownJoint(s.to_string()))
    }
}

/// Body side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::Left, Side::Right];

    pub fn opposite(&self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Left => "left",
            Side::Right => "right",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Side {
    type Err = KinexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" | "l" => Ok(Side::Left),
            "right" | "r" => Ok(Side::Right),
            _ => Err(KinexError::UnknownSide(s.to_string())),
        }
    }
}

/// Anatomical movement used to key normal-range tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Movement {
    Flexion,
    Extension,
    Abduction,
    Adduction,
    InternalRotation,
    ExternalRotation,
    Dorsiflexion,
    PlantarFlexion,
    LateralFlexion,
    Rotation,
}

impl Movement {
    pub fn as_str(&self) -> &'static str {
        match self {
            Movement::Flexion => "flexion",
            Movement::Extension => "extension",
            Movement::Abduction => "abduction",
            Movement::Adduction => "adduction",
            Movement::InternalRotation => "internal_rotation",
            Movement::ExternalRotation => "external_rotation",
            Movement::Dorsiflexion => "dorsiflexion",
            Movement::PlantarFlexion => "plantar_flexion",
            Movement::LateralFlexion => "lateral_flexion",
            Movement::Rotation => "rotation",
        }
    }
}

impl fmt::Display for Movement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
