//! Safety thresholds
//!
//! Every field can be overridden from JSON; missing fields keep their
//! defaults.

use serde::{Deserialize, Serialize};

use kinex_core::{KinexError, KinexResult};

/// Pain thresholds on the 0-10 visual analog scale
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PainThresholds {
    /// At or above: warning
    pub warning: f32,
    /// At or above: stop
    pub stop: f32,
}

impl Default for PainThresholds {
    fn default() -> Self {
        PainThresholds {
            warning: 5.0,
            stop: 7.0,
        }
    }
}

/// Range-of-motion thresholds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RomThresholds {
    /// Percent of normal above which ROM is excessive
    pub max_percent: f32,
    /// Percent of normal below which an assessment is flagged as below expected
    pub min_percent: f32,
    /// Percent drop against the recent baseline that raises a caution
    pub decrease_warning: f32,
    /// Measurements in the rolling baseline
    pub history_window: usize,
}

impl Default for RomThresholds {
    fn default() -> Self {
        RomThresholds {
            max_percent: 120.0,
            min_percent: 0.0,
            decrease_warning: 20.0,
            history_window: 3,
        }
    }
}

/// Safety monitor configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetyConfig {
    pub pain: PainThresholds,
    pub rom: RomThresholds,
    /// Left/right difference in degrees above which asymmetry is flagged
    pub asymmetry_threshold: f32,
    /// Upstream compensation score at or above which a warning is raised
    pub compensation_sensitivity: f32,
    /// Multiple of the per-joint max safe speed that counts as rapid
    pub rapid_movement_factor: f32,
    /// Accuracy drop (points) across the fatigue window that raises a warning
    pub fatigue_drop: f32,
    /// Reps in the fatigue window
    pub fatigue_window: usize,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        SafetyConfig {
            pain: PainThresholds::default(),
            rom: RomThresholds::default(),
            asymmetry_threshold: 30.0,
            compensation_sensitivity: 0.5,
            rapid_movement_factor: 1.5,
            fatigue_drop: 15.0,
            fatigue_window: 5,
        }
    }
}

impl SafetyConfig {
    /// Tighter thresholds for post-operative or fragile users
    pub fn conservative() -> Self {
        SafetyConfig {
            pain: PainThresholds {
                warning: 4.0,
                stop: 6.0,
            },
            rom: RomThresholds {
                max_percent: 110.0,
                min_percent: 20.0,
                decrease_warning: 15.0,
                history_window: 3,
            },
            asymmetry_threshold: 20.0,
            compensation_sensitivity: 0.3,
            rapid_movement_factor: 1.2,
            fatigue_drop: 10.0,
            fatigue_window: 5,
        }
    }

    /// Parse and validate a JSON override
    pub fn from_json(json: &str) -> KinexResult<Self> {
        let config: SafetyConfig = serde_json::from_str(json)
            .map_err(|e| KinexError::InvalidConfig(format!("safety config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> KinexResult<()> {
        let invalid = |msg: String| Err(KinexError::InvalidConfig(msg));

        let p = &self.pain;
        if !(0.0..=10.0).contains(&p.warning) || !(0.0..=10.0).contains(&p.stop) {
            return invalid(format!("pain thresholds {}/{} outside 0-10", p.warning, p.stop));
        }
        if p.warning > p.stop {
            return invalid(format!(
                "pain warning {} above stop {}",
                p.warning, p.stop
            ));
        }
        if self.rom.max_percent <= 0.0 || self.rom.min_percent < 0.0 {
            return invalid("rom percentages must be positive".into());
        }
        if self.rom.min_percent >= self.rom.max_percent {
            return invalid("rom min_percent must be below max_percent".into());
        }
        if self.rom.history_window == 0 {
            return invalid("rom history_window must be positive".into());
        }
        if self.asymmetry_threshold <= 0.0 || self.rapid_movement_factor <= 0.0 {
            return invalid("asymmetry and rapid movement thresholds must be positive".into());
        }
        if !(0.0..=1.0).contains(&self.compensation_sensitivity) {
            return invalid(format!(
                "compensation_sensitivity {} outside [0, 1]",
                self.compensation_sensitivity
            ));
        }
        // Two early and two late reps must not overlap
        if self.fatigue_window < 4 {
            return invalid(format!("fatigue_window {} below 4", self.fatigue_window));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_valid() {
        assert!(SafetyConfig::default().validate().is_ok());
        assert!(SafetyConfig::conservative().validate().is_ok());
    }

    #[test]
    fn test_partial_json_override() {
        let config =
            SafetyConfig::from_json(r#"{"asymmetry_threshold": 25.0, "pain": {"stop": 8.0}}"#)
                .unwrap();
        assert_eq!(config.asymmetry_threshold, 25.0);
        assert_eq!(config.pain.stop, 8.0);
        assert_eq!(config.pain.warning, 5.0);
        assert_eq!(config.rom.max_percent, 120.0);
    }

    #[test]
    fn test_invalid_json_rejected() {
        assert!(matches!(
            SafetyConfig::from_json("{not json"),
            Err(KinexError::InvalidConfig(_))
        ));
        assert!(matches!(
            SafetyConfig::from_json(r#"{"pain": {"warning": 8.0, "stop": 6.0}}"#),
            Err(KinexError::InvalidConfig(_))
        ));
        assert!(SafetyConfig::from_json(r#"{"fatigue_window": 3}"#).is_err());
    }
}
