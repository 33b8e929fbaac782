//! Range of motion against normal reference values
//!
//! Reference: American Academy of Orthopaedic Surgeons (AAOS), Joint Motion:
//! Method of Measuring and Recording. Values are active ROM in degrees for
//! adults, measured from anatomical zero.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use kinex_core::{JointType, KinexError, KinexResult, Movement};

/// Percent of normal below which the user is in the recovery phase
pub const RECOVERY_CEILING_PERCENT: f32 = 70.0;

/// Normal ROM for one joint and movement
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalRange {
    pub min: f32,
    pub max: f32,
}

impl NormalRange {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    #[inline]
    pub fn contains(&self, angle: f32) -> bool {
        angle >= self.min && angle <= self.max
    }
}

/// Rehabilitation stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RomPhase {
    /// Below 70 % of normal
    Recovery,
    /// 70 % of normal and above
    Strength,
}

/// Derived per measurement, never stored
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RomAssessment {
    pub percent_of_normal: f32,
    pub phase: RomPhase,
    /// [0, 100] within the active phase band
    pub phase_progress: f32,
    pub is_within_normal: bool,
    /// Below the configured minimum percent
    pub below_expected: bool,
}

/// AAOS table keyed by (joint, movement)
#[derive(Debug, Clone)]
pub struct NormalRangeTable {
    ranges: HashMap<(JointType, Movement), NormalRange>,
}

impl Default for NormalRangeTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl NormalRangeTable {
    /// Empty table
    pub fn empty() -> Self {
        Self {
            ranges: HashMap::new(),
        }
    }

    /// AAOS reference values
    pub fn standard() -> Self {
        use JointType::*;
        use Movement::*;

        let entries = [
            ((Shoulder, Flexion), NormalRange::new(0.0, 180.0)),
            ((Shoulder, Extension), NormalRange::new(0.0, 60.0)),
            ((Shoulder, Abduction), NormalRange::new(0.0, 180.0)),
            ((Shoulder, InternalRotation), NormalRange::new(0.0, 70.0)),
            ((Shoulder, ExternalRotation), NormalRange::new(0.0, 90.0)),
            ((Elbow, Flexion), NormalRange::new(0.0, 150.0)),
            ((Wrist, Flexion), NormalRange::new(0.0, 80.0)),
            ((Wrist, Extension), NormalRange::new(0.0, 70.0)),
            ((Hip, Flexion), NormalRange::new(0.0, 120.0)),
            ((Hip, Extension), NormalRange::new(0.0, 30.0)),
            ((Hip, Abduction), NormalRange::new(0.0, 45.0)),
            ((Hip, Adduction), NormalRange::new(0.0, 30.0)),
            ((Hip, InternalRotation), NormalRange::new(0.0, 45.0)),
            ((Hip, ExternalRotation), NormalRange::new(0.0, 45.0)),
            ((Knee, Flexion), NormalRange::new(0.0, 135.0)),
            ((Ankle, Dorsiflexion), NormalRange::new(0.0, 20.0)),
            ((Ankle, PlantarFlexion), NormalRange::new(0.0, 50.0)),
            ((Neck, Flexion), NormalRange::new(0.0, 45.0)),
            ((Neck, Extension), NormalRange::new(0.0, 45.0)),
            ((Neck, LateralFlexion), NormalRange::new(0.0, 45.0)),
            ((Neck, Rotation), NormalRange::new(0.0, 60.0)),
            ((Spine, Flexion), NormalRange::new(0.0, 80.0)),
            ((Spine, Extension), NormalRange::new(0.0, 25.0)),
            ((Spine, LateralFlexion), NormalRange::new(0.0, 35.0)),
            ((Spine, Rotation), NormalRange::new(0.0, 45.0)),
        ];

        Self {
            ranges: entries.into_iter().collect(),
        }
    }

    /// Override or add one entry
    pub fn with_range(mut self, joint: JointType, movement: Movement, range: NormalRange) -> Self {
        self.ranges.insert((joint, movement), range);
        self
    }

    pub fn range(&self, joint: JointType, movement: Movement) -> KinexResult<NormalRange> {
        self.ranges
            .get(&(joint, movement))
            .copied()
            .ok_or(KinexError::UnknownMovement { joint, movement })
    }

    pub fn assess(
        &self,
        joint: JointType,
        movement: Movement,
        angle: f32,
        min_percent: f32,
    ) -> KinexResult<RomAssessment> {
        Ok(assess_range(&self.range(joint, movement)?, angle, min_percent))
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

/// Assess an angle against a known range
pub fn assess_range(range: &NormalRange, angle: f32, min_percent: f32) -> RomAssessment {
    let percent_of_normal = if range.max > 0.0 {
        angle / range.max * 100.0
    } else {
        0.0
    };

    let (phase, band_lo, band_hi) = if percent_of_normal < RECOVERY_CEILING_PERCENT {
        (RomPhase::Recovery, 0.0, RECOVERY_CEILING_PERCENT)
    } else {
        (RomPhase::Strength, RECOVERY_CEILING_PERCENT, 100.0)
    };
    let phase_progress =
        ((percent_of_normal - band_lo) / (band_hi - band_lo) * 100.0).clamp(0.0, 100.0);

    RomAssessment {
        percent_of_normal,
        phase,
        phase_progress,
        is_within_normal: range.contains(angle),
        below_expected: percent_of_normal < min_percent,
    }
}
