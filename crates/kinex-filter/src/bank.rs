//! Filter bank - one independent filter per (joint, side)

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use kinex_core::{JointType, Side};

use crate::{AngleKalman, KalmanTuning, MovingAverage};

/// Which filter the bank creates for new keys
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum FilterKind {
    /// Per-joint tuned Kalman filter
    #[default]
    Kalman,
    /// Kalman with one tuning for every joint
    KalmanWith { tuning: KalmanTuning },
    /// Fixed-window mean
    MovingAverage { window: usize },
    /// Raw values pass through
    Passthrough,
}

/// Stateful filter for one key
#[derive(Debug, Clone)]
pub enum JointFilter {
    Kalman(AngleKalman),
    MovingAverage(MovingAverage),
    Passthrough,
}

impl JointFilter {
    fn build(kind: FilterKind, joint: JointType) -> Self {
        match kind {
            FilterKind::Kalman => JointFilter::Kalman(AngleKalman::for_joint(joint)),
            FilterKind::KalmanWith { tuning } => JointFilter::Kalman(AngleKalman::new(tuning)),
            FilterKind::MovingAverage { window } => {
                JointFilter::MovingAverage(MovingAverage::new(window))
            }
            FilterKind::Passthrough => JointFilter::Passthrough,
        }
    }

    pub fn update(&mut self, raw: f32) -> f32 {
        match self {
            JointFilter::Kalman(kf) => kf.update(raw),
            JointFilter::MovingAverage(ma) => ma.update(raw),
            JointFilter::Passthrough => raw,
        }
    }

    /// Enough history for the output to be trusted
    pub fn is_stable(&self) -> bool {
        match self {
            JointFilter::Kalman(kf) => kf.is_initialized(),
            JointFilter::MovingAverage(ma) => ma.is_stable(),
            JointFilter::Passthrough => true,
        }
    }
}

/// Per-session filter state map
#[derive(Debug, Clone, Default)]
pub struct FilterBank {
    kind: FilterKind,
    filters: HashMap<(JointType, Side), JointFilter>,
}

impl FilterBank {
    pub fn new(kind: FilterKind) -> Self {
        Self {
            kind,
            filters: HashMap::new(),
        }
    }

    /// Smooth one raw angle. The filter for a new key is created on first use.
    pub fn filter(&mut self, joint: JointType, side: Side, raw: f32) -> f32 {
        let kind = self.kind;
        self.filters
            .entry((joint, side))
            .or_insert_with(|| JointFilter::build(kind, joint))
            .update(raw)
    }

    pub fn get(&self, joint: JointType, side: Side) -> Option<&JointFilter> {
        self.filters.get(&(joint, side))
    }

    pub fn is_stable(&self, joint: JointType, side: Side) -> bool {
        self.get(joint, side).is_some_and(JointFilter::is_stable)
    }

    /// Drop the state of one key
    pub fn reset_joint(&mut self, joint: JointType, side: Side) {
        self.filters.remove(&(joint, side));
    }

    /// Drop every filter state
    pub fn reset(&mut self) {
        tracing::debug!(filters = self.filters.len(), "filter bank reset");
        self.filters.clear();
    }

    pub fn kind(&self) -> FilterKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_independent() {
        let mut bank = FilterBank::new(FilterKind::Kalman);
        bank.filter(JointType::Knee, Side::Left, 170.0);
        bank.filter(JointType::Knee, Side::Right, 90.0);

        let left = bank.filter(JointType::Knee, Side::Left, 170.0);
        let right = bank.filter(JointType::Knee, Side::Right, 90.0);
        assert!((left - 170.0).abs() < 1e-3);
        assert!((right - 90.0).abs() < 1e-3);
        assert_eq!(bank.len(), 2);
    }

    #[test]
    fn test_reset_prevents_leakage() {
        let mut bank = FilterBank::new(FilterKind::Kalman);
        for _ in 0..20 {
            bank.filter(JointType::Elbow, Side::Left, 160.0);
        }
        bank.reset();
        assert!(bank.is_empty());
        // A fresh filter seeds from the first value instead of dragging 160°
        assert_eq!(bank.filter(JointType::Elbow, Side::Left, 45.0), 45.0);
    }

    #[test]
    fn test_moving_average_kind() {
        let mut bank = FilterBank::new(FilterKind::MovingAverage { window: 2 });
        bank.filter(JointType::Hip, Side::Left, 10.0);
        assert!(!bank.is_stable(JointType::Hip, Side::Left));
        assert_eq!(bank.filter(JointType::Hip, Side::Left, 20.0), 15.0);
        assert!(bank.is_stable(JointType::Hip, Side::Left));
    }

    #[test]
    fn test_filter_kind_serde() {
        let kind: FilterKind =
            serde_json::from_str(r#"{"kind":"moving_average","window":5}"#).unwrap();
        assert_eq!(kind, FilterKind::MovingAverage { window: 5 });
    }
}
