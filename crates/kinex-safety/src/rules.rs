//! Red-flag rules
//!
//! Each rule is an independent pure function returning the alert it would
//! raise, or `None`. The monitor owns history and decides when to call them.

use kinex_core::{JointType, Side};

use crate::{AlertData, AlertDraft, RedFlagType, SafetyConfig, Severity};

/// Maximum safe angular speed per joint in degrees per second
pub fn max_safe_speed(joint: JointType) -> f32 {
    match joint {
        JointType::Knee => 120.0,
        JointType::Hip => 90.0,
        JointType::Shoulder => 120.0,
        JointType::Elbow => 150.0,
        JointType::Ankle => 100.0,
        JointType::Wrist => 150.0,
        JointType::Neck => 60.0,
        JointType::Spine => 60.0,
    }
}

fn draft(
    flag: RedFlagType,
    severity: Severity,
    title: &str,
    message: String,
    recommendation: &str,
    data: AlertData,
) -> AlertDraft {
    AlertDraft {
        flag,
        severity,
        title: title.to_string(),
        message,
        recommendation: recommendation.to_string(),
        data,
    }
}

/// VAS at or above `stop` stops the exercise, at or above `warning` warns
pub fn check_pain(vas: f32, config: &SafetyConfig) -> Option<AlertDraft> {
    let severity = if vas >= config.pain.stop {
        Severity::Stop
    } else if vas >= config.pain.warning {
        Severity::Warning
    } else {
        return None;
    };

    let (title, recommendation) = match severity {
        Severity::Stop => (
            "Severe pain reported",
            "Stop the exercise now and contact your therapist",
        ),
        _ => (
            "Pain reported",
            "Pause, reduce the range and only continue if the pain eases",
        ),
    };
    Some(draft(
        RedFlagType::SeverePain,
        severity,
        title,
        format!("Pain level {:.0}/10", vas),
        recommendation,
        AlertData::Pain { vas },
    ))
}

pub fn check_excessive_rom(
    joint: JointType,
    side: Side,
    angle: f32,
    percent_of_normal: f32,
    config: &SafetyConfig,
) -> Option<AlertDraft> {
    if percent_of_normal <= config.rom.max_percent {
        return None;
    }
    Some(draft(
        RedFlagType::ExcessiveRom,
        Severity::Caution,
        "Range beyond normal",
        format!(
            "{} {} reached {:.0}% of normal range",
            side, joint, percent_of_normal
        ),
        "Stay within a comfortable range",
        AlertData::ExcessiveRom {
            joint,
            side,
            angle,
            percent_of_normal,
        },
    ))
}

/// Strictly greater than the threshold fires. The smaller angle is the
/// affected side.
pub fn check_asymmetry(
    joint: JointType,
    left: f32,
    right: f32,
    config: &SafetyConfig,
) -> Option<AlertDraft> {
    let difference = (left - right).abs();
    if difference <= config.asymmetry_threshold {
        return None;
    }
    let affected_side = if left < right { Side::Left } else { Side::Right };
    Some(draft(
        RedFlagType::Asymmetry,
        Severity::Warning,
        "Left/right imbalance",
        format!(
            "{} differs by {:.0}° between sides ({} side lower)",
            joint, difference, affected_side
        ),
        "Check your form on the weaker side",
        AlertData::Asymmetry {
            joint,
            left,
            right,
            difference,
            affected_side,
        },
    ))
}

/// `history` holds the recent measurements, oldest first. Needs at least
/// `config.rom.history_window` values.
pub fn check_rom_decrease(
    joint: JointType,
    side: Side,
    current: f32,
    history: &[f32],
    config: &SafetyConfig,
) -> Option<AlertDraft> {
    let window = config.rom.history_window;
    if history.len() < window || window == 0 {
        return None;
    }
    let recent = &history[history.len() - window..];
    let baseline = recent.iter().sum::<f32>() / window as f32;
    if baseline <= 0.0 {
        return None;
    }
    let drop_percent = (baseline - current) / baseline * 100.0;
    if drop_percent <= config.rom.decrease_warning {
        return None;
    }
    Some(draft(
        RedFlagType::RomDecrease,
        Severity::Caution,
        "Range dropping",
        format!(
            "{} {} range is {:.0}% below your recent average",
            side, joint, drop_percent
        ),
        "Take a short rest before the next rep",
        AlertData::RomDecrease {
            joint,
            side,
            current,
            baseline,
            drop_percent,
        },
    ))
}

/// `score` is produced upstream, in [0, 1]
pub fn check_compensation(
    joint: JointType,
    side: Side,
    score: f32,
    config: &SafetyConfig,
) -> Option<AlertDraft> {
    if score < config.compensation_sensitivity {
        return None;
    }
    Some(draft(
        RedFlagType::Compensation,
        Severity::Warning,
        "Compensating movement",
        format!("Other joints are helping the {} {}", side, joint),
        "Slow down and isolate the target joint",
        AlertData::Compensation { joint, side, score },
    ))
}

pub fn check_rapid_movement(
    joint: JointType,
    side: Side,
    velocity: f32,
    config: &SafetyConfig,
) -> Option<AlertDraft> {
    let max_safe = max_safe_speed(joint);
    if velocity.abs() <= max_safe * config.rapid_movement_factor {
        return None;
    }
    Some(draft(
        RedFlagType::RapidMovement,
        Severity::Caution,
        "Moving too fast",
        format!(
            "{} {} moved at {:.0}°/s (safe limit {:.0}°/s)",
            side,
            joint,
            velocity.abs(),
            max_safe
        ),
        "Move slowly and with control",
        AlertData::RapidMovement {
            joint,
            side,
            velocity,
            max_safe,
        },
    ))
}

/// `accuracies` oldest first; the last `fatigue_window` values are used
pub fn check_fatigue(accuracies: &[f32], config: &SafetyConfig) -> Option<AlertDraft> {
    let window = config.fatigue_window;
    if accuracies.len() < window || window < 4 {
        return None;
    }
    let recent = &accuracies[accuracies.len() - window..];
    let early_average = (recent[0] + recent[1]) / 2.0;
    let late_average = (recent[window - 2] + recent[window - 1]) / 2.0;
    let drop = early_average - late_average;
    if drop <= config.fatigue_drop {
        return None;
    }
    Some(draft(
        RedFlagType::Fatigue,
        Severity::Warning,
        "Signs of fatigue",
        format!(
            "Rep quality fell from {:.0} to {:.0}",
            early_average, late_average
        ),
        "Rest for a minute before continuing",
        AlertData::Fatigue {
            early_average,
            late_average,
            drop,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> SafetyConfig {
        SafetyConfig::default()
    }

    #[test]
    fn test_pain_levels() {
        assert!(check_pain(4.9, &cfg()).is_none());
        assert_eq!(check_pain(5.0, &cfg()).unwrap().severity, Severity::Warning);
        assert_eq!(check_pain(6.9, &cfg()).unwrap().severity, Severity::Warning);
        assert_eq!(check_pain(7.0, &cfg()).unwrap().severity, Severity::Stop);
    }

    #[test]
    fn test_asymmetry_boundary() {
        let a = check_asymmetry(JointType::Knee, 120.0, 89.0, &cfg()).unwrap();
        assert_eq!(a.severity, Severity::Warning);
        match a.data {
            AlertData::Asymmetry { affected_side, difference, .. } => {
                assert_eq!(affected_side, Side::Right);
                assert!((difference - 31.0).abs() < 1e-4);
            }
            other => panic!("unexpected data {:?}", other),
        }
        assert!(check_asymmetry(JointType::Knee, 120.0, 91.0, &cfg()).is_none());
        assert!(check_asymmetry(JointType::Knee, 120.0, 90.0, &cfg()).is_none());
    }

    #[test]
    fn test_fatigue() {
        let a = check_fatigue(&[95.0, 93.0, 90.0, 70.0, 65.0], &cfg()).unwrap();
        match a.data {
            AlertData::Fatigue { drop, .. } => assert!((drop - 26.5).abs() < 1e-4),
            other => panic!("unexpected data {:?}", other),
        }
        assert!(check_fatigue(&[90.0, 89.0, 88.0, 87.0, 86.0], &cfg()).is_none());
        assert!(check_fatigue(&[95.0, 93.0, 70.0, 65.0], &cfg()).is_none());
    }

    #[test]
    fn test_rom_decrease_needs_history() {
        let c = cfg();
        assert!(check_rom_decrease(JointType::Knee, Side::Left, 50.0, &[100.0, 100.0], &c).is_none());
        let a = check_rom_decrease(JointType::Knee, Side::Left, 75.0, &[60.0, 100.0, 100.0, 100.0], &c)
            .unwrap();
        assert_eq!(a.severity, Severity::Caution);
        // Exactly 20 % is not more than 20 %
        assert!(check_rom_decrease(JointType::Knee, Side::Left, 80.0, &[100.0, 100.0, 100.0], &c).is_none());
    }

    #[test]
    fn test_excessive_rom_and_compensation() {
        let c = cfg();
        assert!(check_excessive_rom(JointType::Elbow, Side::Left, 185.0, 123.3, &c).is_some());
        assert!(check_excessive_rom(JointType::Elbow, Side::Left, 180.0, 120.0, &c).is_none());
        assert!(check_compensation(JointType::Hip, Side::Right, 0.5, &c).is_some());
        assert!(check_compensation(JointType::Hip, Side::Right, 0.49, &c).is_none());
    }

    #[test]
    fn test_rapid_movement() {
        let c = cfg();
        // Elbow limit 150°/s, factor 1.5
        assert!(check_rapid_movement(JointType::Elbow, Side::Left, 226.0, &c).is_some());
        assert!(check_rapid_movement(JointType::Elbow, Side::Left, -226.0, &c).is_some());
        assert!(check_rapid_movement(JointType::Elbow, Side::Left, 224.0, &c).is_none());
        // Spine limit 60°/s
        assert!(check_rapid_movement(JointType::Spine, Side::Left, 91.0, &c).is_some());
    }
}
