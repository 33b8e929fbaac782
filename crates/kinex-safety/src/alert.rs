//! Red-flag alerts

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use kinex_core::{AlertId, JointType, Side};

/// Kind of red flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedFlagType {
    SeverePain,
    ExcessiveRom,
    Asymmetry,
    RomDecrease,
    Compensation,
    RapidMovement,
    Fatigue,
}

impl RedFlagType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RedFlagType::SeverePain => "severe_pain",
            RedFlagType::ExcessiveRom => "excessive_rom",
            RedFlagType::Asymmetry => "asymmetry",
            RedFlagType::RomDecrease => "rom_decrease",
            RedFlagType::Compensation => "compensation",
            RedFlagType::RapidMovement => "rapid_movement",
            RedFlagType::Fatigue => "fatigue",
        }
    }
}

impl fmt::Display for RedFlagType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Alert severity, ordered from mildest to strongest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Slow down or adjust
    Caution,
    /// Pause and check in
    Warning,
    /// End the exercise
    Stop,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Caution => "caution",
            Severity::Warning => "warning",
            Severity::Stop => "stop",
        })
    }
}

/// Measured values behind an alert
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AlertData {
    Pain {
        vas: f32,
    },
    ExcessiveRom {
        joint: JointType,
        side: Side,
        angle: f32,
        percent_of_normal: f32,
    },
    Asymmetry {
        joint: JointType,
        left: f32,
        right: f32,
        difference: f32,
        affected_side: Side,
    },
    RomDecrease {
        joint: JointType,
        side: Side,
        current: f32,
        baseline: f32,
        drop_percent: f32,
    },
    Compensation {
        joint: JointType,
        side: Side,
        score: f32,
    },
    RapidMovement {
        joint: JointType,
        side: Side,
        velocity: f32,
        max_safe: f32,
    },
    Fatigue {
        early_average: f32,
        late_average: f32,
        drop: f32,
    },
}

impl AlertData {
    /// Joint and side the alert is about, when it has one
    pub fn subject(&self) -> Option<(JointType, Option<Side>)> {
        match *self {
            AlertData::Pain { .. } | AlertData::Fatigue { .. } => None,
            AlertData::Asymmetry { joint, .. } => Some((joint, None)),
            AlertData::ExcessiveRom { joint, side, .. }
            | AlertData::RomDecrease { joint, side, .. }
            | AlertData::Compensation { joint, side, .. }
            | AlertData::RapidMovement { joint, side, .. } => Some((joint, Some(side))),
        }
    }
}

/// One raised red flag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedFlagAlert {
    pub id: AlertId,
    pub flag: RedFlagType,
    pub severity: Severity,
    pub title: String,
    pub message: String,
    pub recommendation: String,
    pub detected_at: DateTime<Utc>,
    pub data: AlertData,
}

/// Alert before the monitor assigns an id and timestamp
#[derive(Debug, Clone, PartialEq)]
pub struct AlertDraft {
    pub flag: RedFlagType,
    pub severity: Severity,
    pub title: String,
    pub message: String,
    pub recommendation: String,
    pub data: AlertData,
}

impl AlertDraft {
    pub fn into_alert(self, id: AlertId, detected_at: DateTime<Utc>) -> RedFlagAlert {
        RedFlagAlert {
            id,
            flag: self.flag,
            severity: self.severity,
            title: self.title,
            message: self.message,
            recommendation: self.recommendation,
            detected_at,
            data: self.data,
        }
    }
}

/// Aggregate of the active alerts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SafetyStatus {
    /// A stop-severity alert is active
    pub should_stop: bool,
    /// A caution or warning alert is active
    pub should_pause: bool,
    pub active_count: usize,
    pub highest_severity: Option<Severity>,
}

impl SafetyStatus {
    pub fn from_alerts<'a>(alerts: impl IntoIterator<Item = &'a RedFlagAlert>) -> Self {
        let mut status = SafetyStatus::default();
        for alert in alerts {
            status.active_count += 1;
            match alert.severity {
                Severity::Stop => status.should_stop = true,
                Severity::Warning | Severity::Caution => status.should_pause = true,
            }
            status.highest_severity = status.highest_severity.max(Some(alert.severity));
        }
        status
    }

    pub fn is_clear(&self) -> bool {
        self.active_count == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alert(id: u64, severity: Severity) -> RedFlagAlert {
        AlertDraft {
            flag: RedFlagType::SeverePain,
            severity,
            title: String::new(),
            message: String::new(),
            recommendation: String::new(),
            data: AlertData::Pain { vas: 5.0 },
        }
        .into_alert(AlertId::new(id), Utc::now())
    }

    #[test]
    fn test_severity_order() {
        assert!(Severity::Stop > Severity::Warning);
        assert!(Severity::Warning > Severity::Caution);
    }

    #[test]
    fn test_status_aggregate() {
        assert!(SafetyStatus::from_alerts(&Vec::<RedFlagAlert>::new()).is_clear());

        let alerts = vec![alert(1, Severity::Caution), alert(2, Severity::Warning)];
        let s = SafetyStatus::from_alerts(&alerts);
        assert!(s.should_pause);
        assert!(!s.should_stop);
        assert_eq!(s.active_count, 2);
        assert_eq!(s.highest_severity, Some(Severity::Warning));

        let alerts = vec![alert(1, Severity::Stop)];
        let s = SafetyStatus::from_alerts(&alerts);
        assert!(s.should_stop);
        assert!(!s.should_pause);
    }

    #[test]
    fn test_alert_json() {
        let json = serde_json::to_value(alert(3, Severity::Stop)).unwrap();
        assert_eq!(json["flag"], "severe_pain");
        assert_eq!(json["severity"], "stop");
        assert_eq!(json["data"]["kind"], "pain");
    }
}
