//! Safety monitor - runs the rules and owns the alert lists
//!
//! Raised alerts go to both the active list and the append-only history.
//! They leave the active list only through [`SafetyMonitor::dismiss`] or
//! [`SafetyMonitor::clear_active`]. A rule that fires again while an
//! identical alert (same flag, subject and severity) is still active does
//! not raise a second copy.

use std::collections::{HashMap, VecDeque};

use chrono::Utc;

use kinex_core::{AlertId, JointType, KinexResult, Movement, Side};

use crate::rom::{NormalRangeTable, RomAssessment};
use crate::rules;
use crate::{AlertDraft, RedFlagAlert, SafetyConfig, SafetyStatus};

/// One measurement to check
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    pub joint: JointType,
    pub side: Side,
    /// Movement for normal-range lookup. `None` skips the range checks.
    pub movement: Option<Movement>,
    /// Range achieved, in degrees from anatomical zero
    pub angle: f32,
    /// Peak angular velocity (deg/s)
    pub velocity: Option<f32>,
    /// Upstream compensation score in [0, 1]
    pub compensation_score: Option<f32>,
}

impl Measurement {
    pub fn new(joint: JointType, side: Side, angle: f32) -> Self {
        Measurement {
            joint,
            side,
            movement: None,
            angle,
            velocity: None,
            compensation_score: None,
        }
    }

    pub fn with_movement(mut self, movement: Movement) -> Self {
        self.movement = Some(movement);
        self
    }

    pub fn with_velocity(mut self, velocity: f32) -> Self {
        self.velocity = Some(velocity);
        self
    }

    pub fn with_compensation(mut self, score: f32) -> Self {
        self.compensation_score = Some(score);
        self
    }
}

/// Per-session safety state
#[derive(Debug, Clone)]
pub struct SafetyMonitor {
    config: SafetyConfig,
    table: NormalRangeTable,
    active: Vec<RedFlagAlert>,
    history: Vec<RedFlagAlert>,
    next_id: AlertId,
    rom_history: HashMap<(JointType, Side), VecDeque<f32>>,
    accuracies: VecDeque<f32>,
}

impl SafetyMonitor {
    pub fn new(config: SafetyConfig) -> KinexResult<Self> {
        Self::with_table(config, NormalRangeTable::standard())
    }

    pub fn with_table(config: SafetyConfig, table: NormalRangeTable) -> KinexResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            table,
            active: Vec::new(),
            history: Vec::new(),
            next_id: AlertId::ZERO,
            rom_history: HashMap::new(),
            accuracies: VecDeque::new(),
        })
    }

    pub fn config(&self) -> &SafetyConfig {
        &self.config
    }

    pub fn table(&self) -> &NormalRangeTable {
        &self.table
    }

    /// Percent of normal and rehabilitation phase for one angle
    pub fn assess_rom(&self, joint: JointType, movement: Movement, angle: f32) -> KinexResult<RomAssessment> {
        self.table
            .assess(joint, movement, angle, self.config.rom.min_percent)
    }

    /// Self-reported pain on the 0-10 scale
    pub fn report_pain(&mut self, vas: f32) -> Option<RedFlagAlert> {
        let draft = rules::check_pain(vas, &self.config)?;
        self.raise(draft)
    }

    /// Range, range-decrease, speed and compensation checks for one measurement.
    ///
    /// Fails only when `movement` has no normal range.
    pub fn check_measurement(&mut self, m: &Measurement) -> KinexResult<Vec<RedFlagAlert>> {
        let mut drafts = Vec::new();

        if let Some(movement) = m.movement {
            let assessment = self.assess_rom(m.joint, movement, m.angle)?;
            drafts.extend(rules::check_excessive_rom(
                m.joint,
                m.side,
                m.angle,
                assessment.percent_of_normal,
                &self.config,
            ));
        }

        let window = self.config.rom.history_window;
        let history = self.rom_history.entry((m.joint, m.side)).or_default();
        let past: Vec<f32> = history.iter().copied().collect();
        drafts.extend(rules::check_rom_decrease(
            m.joint,
            m.side,
            m.angle,
            &past,
            &self.config,
        ));
        history.push_back(m.angle);
        while history.len() > window {
            history.pop_front();
        }

        if let Some(velocity) = m.velocity {
            drafts.extend(rules::check_rapid_movement(m.joint, m.side, velocity, &self.config));
        }
        if let Some(score) = m.compensation_score {
            drafts.extend(rules::check_compensation(m.joint, m.side, score, &self.config));
        }

        Ok(drafts.into_iter().filter_map(|d| self.raise(d)).collect())
    }

    /// Compensation score reported outside a measurement
    pub fn report_compensation(&mut self, joint: JointType, side: Side, score: f32) -> Option<RedFlagAlert> {
        let draft = rules::check_compensation(joint, side, score, &self.config)?;
        self.raise(draft)
    }

    pub fn check_asymmetry(&mut self, joint: JointType, left: f32, right: f32) -> Option<RedFlagAlert> {
        let draft = rules::check_asymmetry(joint, left, right, &self.config)?;
        self.raise(draft)
    }

    /// Record a completed rep's accuracy and check for fatigue
    pub fn record_rep_accuracy(&mut self, accuracy: f32) -> Option<RedFlagAlert> {
        self.accuracies.push_back(accuracy);
        while self.accuracies.len() > self.config.fatigue_window {
            self.accuracies.pop_front();
        }
        let recent: Vec<f32> = self.accuracies.iter().copied().collect();
        let draft = rules::check_fatigue(&recent, &self.config)?;
        self.raise(draft)
    }

    fn raise(&mut self, draft: AlertDraft) -> Option<RedFlagAlert> {
        let duplicate = self.active.iter().any(|a| {
            a.flag == draft.flag
                && a.severity == draft.severity
                && a.data.subject() == draft.data.subject()
        });

        self.next_id = self.next_id.next();
        let alert = draft.into_alert(self.next_id, Utc::now());

        // Already on the active list: keep the occurrence, don't re-surface it
        if duplicate {
            tracing::info!(
                id = %alert.id,
                flag = %alert.flag,
                severity = %alert.severity,
                "repeat of active alert"
            );
            self.history.push(alert);
            return None;
        }

        tracing::warn!(
            id = %alert.id,
            flag = %alert.flag,
            severity = %alert.severity,
            "{}",
            alert.message
        );
        self.active.push(alert.clone());
        self.history.push(alert.clone());
        Some(alert)
    }

    pub fn status(&self) -> SafetyStatus {
        SafetyStatus::from_alerts(&self.active)
    }

    pub fn active_alerts(&self) -> &[RedFlagAlert] {
        &self.active
    }

    /// Every alert ever raised, oldest first
    pub fn history(&self) -> &[RedFlagAlert] {
        &self.history
    }

    /// Remove one active alert. History keeps it.
    pub fn dismiss(&mut self, id: AlertId) -> bool {
        let before = self.active.len();
        self.active.retain(|a| a.id != id);
        let dismissed = self.active.len() != before;
        if dismissed {
            tracing::debug!(%id, "alert dismissed");
        }
        dismissed
    }

    /// Remove all active alerts, returning how many were removed
    pub fn clear_active(&mut self) -> usize {
        let n = self.active.len();
        self.active.clear();
        tracing::debug!(cleared = n, "active alerts cleared");
        n
    }

    /// Forget ROM baselines and accuracy history. Alerts are untouched.
    pub fn reset_tracking(&mut self) {
        self.rom_history.clear();
        self.accuracies.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AlertData, RedFlagType, Severity};

    fn monitor() -> SafetyMonitor {
        SafetyMonitor::new(SafetyConfig::default()).unwrap()
    }

    #[test]
    fn test_pain_stop_status() {
        let mut m = monitor();
        assert!(m.report_pain(3.0).is_none());
        assert!(m.status().is_clear());

        let alert = m.report_pain(8.0).unwrap();
        assert_eq!(alert.severity, Severity::Stop);
        let status = m.status();
        assert!(status.should_stop);
        assert_eq!(status.highest_severity, Some(Severity::Stop));
    }

    #[test]
    fn test_asymmetry_31_vs_29() {
        let mut m = monitor();
        assert!(m.check_asymmetry(JointType::Knee, 100.0, 129.0).is_none());
        let alert = m.check_asymmetry(JointType::Knee, 100.0, 131.0).unwrap();
        assert_eq!(alert.flag, RedFlagType::Asymmetry);
        assert!(m.status().should_pause);
    }

    #[test]
    fn test_fatigue_sequences() {
        let mut m = monitor();
        let mut raised = Vec::new();
        for acc in [95.0, 93.0, 90.0, 70.0, 65.0] {
            raised.extend(m.record_rep_accuracy(acc));
        }
        assert_eq!(raised.len(), 1);
        assert_eq!(raised[0].flag, RedFlagType::Fatigue);

        let mut steady = monitor();
        for acc in [90.0, 89.0, 88.0, 87.0, 86.0] {
            assert!(steady.record_rep_accuracy(acc).is_none());
        }
    }

    #[test]
    fn test_measurement_checks() {
        let mut m = monitor();
        let base = Measurement::new(JointType::Elbow, Side::Left, 120.0).with_movement(Movement::Flexion);
        for _ in 0..3 {
            assert!(m.check_measurement(&base).unwrap().is_empty());
        }

        // 60° is 50 % below the 120° baseline, and the elbow moved too fast
        let alerts = m
            .check_measurement(&Measurement {
                angle: 60.0,
                velocity: Some(300.0),
                ..base
            })
            .unwrap();
        let flags: Vec<_> = alerts.iter().map(|a| a.flag).collect();
        assert_eq!(flags, vec![RedFlagType::RomDecrease, RedFlagType::RapidMovement]);

        // 190° is beyond 120 % of 150°
        let alerts = m
            .check_measurement(&Measurement { angle: 190.0, ..base })
            .unwrap();
        assert!(alerts.iter().any(|a| a.flag == RedFlagType::ExcessiveRom));
    }

    #[test]
    fn test_unknown_movement_is_error() {
        let mut m = monitor();
        let bad = Measurement::new(JointType::Knee, Side::Left, 90.0).with_movement(Movement::Rotation);
        assert!(m.check_measurement(&bad).is_err());
    }

    #[test]
    fn test_dismiss_and_history() {
        let mut m = monitor();
        let a = m.report_pain(6.0).unwrap();
        let b = m.check_asymmetry(JointType::Hip, 40.0, 80.0).unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(m.active_alerts().len(), 2);

        assert!(m.dismiss(a.id));
        assert!(!m.dismiss(a.id));
        assert_eq!(m.active_alerts().len(), 1);
        assert_eq!(m.history().len(), 2);

        assert_eq!(m.clear_active(), 1);
        assert!(m.status().is_clear());
        assert_eq!(m.history().len(), 2);
    }

    #[test]
    fn test_duplicate_suppressed_while_active() {
        let mut m = monitor();
        assert!(m.report_pain(6.0).is_some());
        assert!(m.report_pain(6.0).is_none());
        // Escalation is a different alert
        assert!(m.report_pain(9.0).is_some());
        m.clear_active();
        assert!(m.report_pain(6.0).is_some());
        assert_eq!(m.history().len(), 4);
        assert_eq!(m.active_alerts().len(), 1);
    }

    #[test]
    fn test_repeat_alert_recorded_in_history() {
        let mut m = monitor();
        let first = m.report_pain(6.0).unwrap();
        assert!(m.report_pain(6.5).is_none());

        assert_eq!(m.active_alerts().len(), 1);
        let history = m.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].id, first.id);
        assert_ne!(history[1].id, first.id);
        assert_eq!(history[1].flag, RedFlagType::SeverePain);
        match history[1].data {
            AlertData::Pain { vas } => assert!((vas - 6.5).abs() < 1e-4),
            ref other => panic!("unexpected data {:?}", other),
        }
    }
}
