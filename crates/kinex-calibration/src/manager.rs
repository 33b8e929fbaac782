//! Two-phase calibration protocol
//!
//! 1. Resting: the user holds the start pose until the angle is stable.
//! 2. Max ROM: the user moves as far as comfortable and holds.
//!
//! Each phase keeps only samples at or above the confidence floor. The
//! canonical angle of a phase is the robust median of its samples.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use kinex_core::{clamp_angle, ExerciseType, JointType, KinexError, KinexResult, Side, UserId};

use crate::stats::{mean, robust_median, std_dev};
use crate::{CalibrationResult, JointThresholds, ThresholdConfig};

/// Calibration configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationConfig {
    /// Samples below this confidence are excluded
    pub min_confidence: f32,
    /// Stability window for the resting phase
    pub resting_window: usize,
    /// Stability window for the max-ROM phase
    pub max_rom_window: usize,
    /// Stable frames required to call the resting pose stable
    pub resting_stable_frames: u32,
    /// Stable frames required to call the max-ROM pose complete
    pub max_rom_stable_frames: u32,
    /// Accepted samples required per phase
    pub min_samples: usize,
    /// Accepted samples that count as full progress
    pub progress_samples: usize,
    /// Window std-dev below which a frame counts as stable (degrees)
    pub stable_std_dev: f32,
    /// Frame-to-frame delta below which a frame counts as stable (degrees)
    pub stable_delta: f32,
    /// Stable counter decrement on an unstable frame
    pub unstable_decay: u32,
    pub validity_days: u32,
    pub thresholds: ThresholdConfig,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        CalibrationConfig {
            min_confidence: 0.7,
            resting_window: 15,
            max_rom_window: 10,
            resting_stable_frames: 15,
            max_rom_stable_frames: 10,
            min_samples: 10,
            progress_samples: 15,
            stable_std_dev: 3.0,
            stable_delta: 2.0,
            unstable_decay: 2,
            validity_days: 30,
            thresholds: ThresholdConfig::default(),
        }
    }
}

impl CalibrationConfig {
    /// Shorter protocol for demos and repeat sessions
    pub fn quick() -> Self {
        CalibrationConfig {
            resting_window: 8,
            max_rom_window: 6,
            resting_stable_frames: 8,
            max_rom_stable_frames: 6,
            min_samples: 6,
            progress_samples: 8,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> KinexResult<()> {
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(KinexError::InvalidConfig(format!(
                "min_confidence {} outside [0, 1]",
                self.min_confidence
            )));
        }
        if self.min_samples == 0 || self.progress_samples == 0 {
            return Err(KinexError::InvalidConfig(
                "sample counts must be positive".into(),
            ));
        }
        if self.resting_window < 2 || self.max_rom_window < 2 {
            return Err(KinexError::InvalidConfig(
                "stability windows need at least 2 samples".into(),
            ));
        }
        Ok(())
    }
}

/// Resting phase feedback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestingProgress {
    pub is_stable: bool,
    /// [0, 1], accepted samples only
    pub progress: f32,
    pub feedback: String,
}

/// Max-ROM phase feedback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaxRomProgress {
    pub is_complete: bool,
    /// [0, 1], accepted samples only
    pub progress: f32,
    pub feedback: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CalibrationPhase {
    Resting,
    MaxRom,
}

/// Samples and stability counter of one phase
#[derive(Debug, Clone, Default)]
struct PhaseSamples {
    angles: Vec<f32>,
    confidence_sum: f32,
    stable_frames: u32,
}

impl PhaseSamples {
    /// Record an accepted sample and update the stability counter
    fn accept(&mut self, angle: f32, confidence: f32, window: usize, config: &CalibrationConfig) {
        let previous = self.angles.last().copied();
        self.angles.push(angle);
        self.confidence_sum += confidence;

        let Some(previous) = previous else { return };
        let start = self.angles.len().saturating_sub(window);
        let spread = std_dev(&self.angles[start..]).unwrap_or(f32::MAX);
        let delta = (angle - previous).abs();

        if spread < config.stable_std_dev && delta < config.stable_delta {
            self.stable_frames += 1;
        } else {
            self.stable_frames = self.stable_frames.saturating_sub(config.unstable_decay);
        }
    }

    fn len(&self) -> usize {
        self.angles.len()
    }

    fn progress(&self, config: &CalibrationConfig) -> f32 {
        (self.len() as f32 / config.progress_samples as f32).min(1.0)
    }
}

#[derive(Debug, Clone)]
struct Session {
    exercise: ExerciseType,
    joint: JointType,
    side: Side,
    phase: CalibrationPhase,
    resting: PhaseSamples,
    max_rom: PhaseSamples,
}

/// Drives one calibration at a time. Single owner; not shared across threads.
#[derive(Debug, Clone, Default)]
pub struct CalibrationManager {
    config: CalibrationConfig,
    session: Option<Session>,
}

impl CalibrationManager {
    pub fn new(config: CalibrationConfig) -> Self {
        Self {
            config,
            session: None,
        }
    }

    pub fn config(&self) -> &CalibrationConfig {
        &self.config
    }

    /// Begin a calibration. Discards any calibration in progress.
    pub fn start(&mut self, exercise: ExerciseType, joint: JointType, side: Side) {
        tracing::debug!(%exercise, %joint, %side, "calibration started");
        self.session = Some(Session {
            exercise,
            joint,
            side,
            phase: CalibrationPhase::Resting,
            resting: PhaseSamples::default(),
            max_rom: PhaseSamples::default(),
        });
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    pub fn phase(&self) -> Option<CalibrationPhase> {
        self.session.as_ref().map(|s| s.phase)
    }

    /// Feed one resting-pose sample
    pub fn add_resting_sample(&mut self, angle: f32, confidence: f32) -> KinexResult<RestingProgress> {
        let config = self.config;
        let session = self.session.as_mut().ok_or(KinexError::CalibrationNotStarted)?;
        if session.phase != CalibrationPhase::Resting {
            return Err(KinexError::CalibrationPhaseClosed);
        }

        let accepted = Self::is_acceptable(&config, angle, confidence);
        if accepted {
            session
                .resting
                .accept(clamp_angle(angle), confidence, config.resting_window, &config);
        }

        let samples = &session.resting;
        let is_stable = samples.stable_frames >= config.resting_stable_frames
            && samples.len() >= config.min_samples;

        let feedback = if !accepted {
            "Tracking is unclear - make sure your whole body is visible"
        } else if is_stable {
            "Resting position captured"
        } else {
            "Hold still in your starting position"
        };

        Ok(RestingProgress {
            is_stable,
            progress: samples.progress(&config),
            feedback: feedback.to_string(),
        })
    }

    /// Feed one max-ROM sample. The first call closes the resting phase.
    pub fn add_max_rom_sample(&mut self, angle: f32, confidence: f32) -> KinexResult<MaxRomProgress> {
        let config = self.config;
        let session = self.session.as_mut().ok_or(KinexError::CalibrationNotStarted)?;
        if session.phase == CalibrationPhase::Resting {
            tracing::debug!(samples = session.resting.len(), "resting phase closed");
            session.phase = CalibrationPhase::MaxRom;
        }

        let accepted = Self::is_acceptable(&config, angle, confidence);
        if accepted {
            session
                .max_rom
                .accept(clamp_angle(angle), confidence, config.max_rom_window, &config);
        }

        let samples = &session.max_rom;
        let is_complete = samples.stable_frames >= config.max_rom_stable_frames
            && samples.len() >= config.min_samples;

        let feedback = if !accepted {
            "Tracking is unclear - make sure your whole body is visible"
        } else if is_complete {
            "Maximum range captured"
        } else {
            "Move as far as comfortable and hold"
        };

        Ok(MaxRomProgress {
            is_complete,
            progress: samples.progress(&config),
            feedback: feedback.to_string(),
        })
    }

    fn is_acceptable(config: &CalibrationConfig, angle: f32, confidence: f32) -> bool {
        angle.is_finite() && confidence >= config.min_confidence
    }

    /// Finish the calibration with the current time
    pub fn complete(
        &self,
        user_id: &UserId,
        exercise: ExerciseType,
        joint: JointType,
        side: Side,
    ) -> Option<CalibrationResult> {
        self.complete_at(user_id, exercise, joint, side, Utc::now())
    }

    /// Finish the calibration.
    ///
    /// Returns `None` when no calibration was started for this key, a phase
    /// has too few samples, or the range of motion is below 10°.
    pub fn complete_at(
        &self,
        user_id: &UserId,
        exercise: ExerciseType,
        joint: JointType,
        side: Side,
        now: DateTime<Utc>,
    ) -> Option<CalibrationResult> {
        let session = self.session.as_ref()?;
        if (session.exercise, session.joint, session.side) != (exercise, joint, side) {
            tracing::warn!(
                %exercise, %joint, %side,
                started = %session.exercise,
                "calibration completed for a different key than started"
            );
            return None;
        }

        let (rest, rom) = (&session.resting, &session.max_rom);
        if rest.len() < self.config.min_samples || rom.len() < self.config.min_samples {
            tracing::debug!(
                resting = rest.len(),
                max_rom = rom.len(),
                "calibration has too few samples"
            );
            return None;
        }

        let resting_angle = robust_median(&rest.angles)?;
        let max_rom_angle = robust_median(&rom.angles)?;
        let Some(thresholds) =
            JointThresholds::derive(resting_angle, max_rom_angle, &self.config.thresholds, now)
        else {
            tracing::warn!(
                resting = resting_angle,
                max_rom = max_rom_angle,
                "calibration rejected: range of motion too small"
            );
            return None;
        };

        let total = (rest.len() + rom.len()) as f32;
        let avg_confidence = (rest.confidence_sum + rom.confidence_sum) / total;
        let spread = std_dev(&rest.angles)? + std_dev(&rom.angles)?;
        let stability = (1.0 - spread / 20.0).clamp(0.0, 1.0);
        let confidence = mean(&[avg_confidence, stability])?.clamp(0.0, 1.0);

        tracing::info!(
            user = %user_id,
            %exercise, %joint, %side,
            resting = resting_angle,
            max_rom = max_rom_angle,
            total_rom = thresholds.total_rom,
            confidence,
            "calibration complete"
        );

        Some(CalibrationResult {
            user_id: user_id.clone(),
            exercise,
            joint,
            side,
            resting_angle,
            max_rom_angle,
            thresholds,
            confidence,
            calibrated_at: now,
            expires_at: CalibrationResult::expiry(now, self.config.validity_days),
            invalidated: false,
        })
    }

    /// Discard the calibration in progress
    pub fn reset(&mut self) {
        self.session = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started() -> CalibrationManager {
        let mut m = CalibrationManager::new(CalibrationConfig::default());
        m.start(ExerciseType::Squat, JointType::Knee, Side::Left);
        m
    }

    fn feed(m: &mut CalibrationManager, resting: f32, max_rom: f32, n: usize) {
        for i in 0..n {
            let jitter = if i % 2 == 0 { 0.3 } else { -0.3 };
            m.add_resting_sample(resting + jitter, 0.95).unwrap();
        }
        for i in 0..n {
            let jitter = if i % 2 == 0 { 0.3 } else { -0.3 };
            m.add_max_rom_sample(max_rom + jitter, 0.9).unwrap();
        }
    }

    #[test]
    fn test_requires_start() {
        let mut m = CalibrationManager::new(CalibrationConfig::default());
        assert_eq!(m.add_resting_sample(170.0, 0.9), Err(KinexError::CalibrationNotStarted));
        assert_eq!(m.add_max_rom_sample(50.0, 0.9), Err(KinexError::CalibrationNotStarted));
    }

    #[test]
    fn test_flexion_calibration() {
        let mut m = started();
        feed(&mut m, 170.0, 50.0, 12);

        let user = UserId::from("patient-1");
        let result = m
            .complete(&user, ExerciseType::Squat, JointType::Knee, Side::Left)
            .unwrap();
        assert!((result.resting_angle - 170.0).abs() < 0.5);
        assert!((result.max_rom_angle - 50.0).abs() < 0.5);
        let t = &result.thresholds;
        assert!((t.total_rom - 120.0).abs() < 1.0);
        assert!((t.target_angle - 74.0).abs() < 1.0);
        assert!((t.tolerance - 12.0).abs() < 0.1);
        assert!(result.confidence > 0.8 && result.confidence <= 1.0);
        assert!(result.is_valid_at(result.calibrated_at));
    }

    #[test]
    fn test_small_rom_rejected() {
        let mut m = started();
        feed(&mut m, 170.0, 165.0, 12);
        let user = UserId::from("patient-1");
        assert!(m
            .complete(&user, ExerciseType::Squat, JointType::Knee, Side::Left)
            .is_none());
    }

    #[test]
    fn test_too_few_samples() {
        let mut m = started();
        feed(&mut m, 170.0, 50.0, 9);
        let user = UserId::from("patient-1");
        assert!(m
            .complete(&user, ExerciseType::Squat, JointType::Knee, Side::Left)
            .is_none());
    }

    #[test]
    fn test_low_confidence_sample_excluded() {
        let mut m = started();
        for _ in 0..5 {
            m.add_resting_sample(170.0, 0.9).unwrap();
        }
        let before = m.add_resting_sample(170.0, 0.9).unwrap();
        let stable_before = m.session.as_ref().unwrap().resting.stable_frames;

        let low = m.add_resting_sample(120.0, 0.5).unwrap();
        let session = m.session.as_ref().unwrap();
        assert_eq!(session.resting.len(), 6);
        assert_eq!(session.resting.stable_frames, stable_before);
        assert!(!session.resting.angles.contains(&120.0));
        assert_eq!(low.progress, before.progress);
        assert!(!low.is_stable);
    }

    #[test]
    fn test_resting_becomes_stable() {
        let mut m = started();
        let mut last = None;
        for _ in 0..16 {
            last = Some(m.add_resting_sample(170.0, 0.9).unwrap());
        }
        let last = last.unwrap();
        assert!(last.is_stable);
        assert_eq!(last.progress, 1.0);
    }

    #[test]
    fn test_unstable_frames_decay() {
        let mut m = started();
        for _ in 0..6 {
            m.add_resting_sample(170.0, 0.9).unwrap();
        }
        assert_eq!(m.session.as_ref().unwrap().resting.stable_frames, 5);
        // 10° jump breaks both the delta and window checks
        m.add_resting_sample(160.0, 0.9).unwrap();
        assert_eq!(m.session.as_ref().unwrap().resting.stable_frames, 3);
    }

    #[test]
    fn test_max_rom_closes_resting() {
        let mut m = started();
        m.add_resting_sample(170.0, 0.9).unwrap();
        m.add_max_rom_sample(50.0, 0.9).unwrap();
        assert_eq!(m.phase(), Some(CalibrationPhase::MaxRom));
        assert_eq!(
            m.add_resting_sample(170.0, 0.9),
            Err(KinexError::CalibrationPhaseClosed)
        );
    }

    #[test]
    fn test_key_mismatch_and_reset() {
        let mut m = started();
        feed(&mut m, 170.0, 50.0, 12);
        let user = UserId::from("patient-1");
        assert!(m
            .complete(&user, ExerciseType::Squat, JointType::Knee, Side::Right)
            .is_none());

        m.reset();
        assert!(!m.is_active());
        assert!(m
            .complete(&user, ExerciseType::Squat, JointType::Knee, Side::Left)
            .is_none());
    }

    #[test]
    fn test_quick_preset_valid() {
        assert!(CalibrationConfig::quick().validate().is_ok());
        let bad = CalibrationConfig {
            min_confidence: 1.5,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_out_of_range_angles_clamped() {
        let mut m = started();
        feed(&mut m, 200.0, 60.0, 12);
        let result = m
            .complete(&UserId::from("patient-1"), ExerciseType::Squat, JointType::Knee, Side::Left)
            .unwrap();
        assert!(result.resting_angle <= 180.0);
        assert!((result.resting_angle - 180.0).abs() < 1e-3);
        assert!(result.thresholds.start.max <= 180.0);
        assert!((result.total_rom() - 120.0).abs() < 0.5);
    }
}
