//! Kinex Session - per-user pipeline context
//!
//! One session owns every stateful stage for one exercise:
//! 1. Measure the primary joint (Angle Engine)
//! 2. Smooth it (Filter Bank)
//! 3. Advance the rep phase machine (Rep Detector)
//! 4. On rep completion, run the safety rules (Safety Monitor)
//!
//! Calibration frames take a separate path through the Calibration Manager.
//! A finished calibration replaces the detector profile in one assignment.

use std::collections::HashMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use kinex_angle::{AngleEngine, AngleEngineConfig};
use kinex_calibration::{
    CalibrationConfig, CalibrationManager, CalibrationPhase, CalibrationResult, MaxRomProgress,
    RestingProgress,
};
use kinex_core::{
    AlertId, AngleSample, ExerciseType, KinexError, KinexResult, PoseFrame, SharedClock, Side,
    UserId,
};
use kinex_filter::{FilterBank, FilterKind};
use kinex_rep::{
    CooldownConfig, DetectionResult, ExerciseProfile, RepDetector, RepSummary, StandardStrategy,
};
use kinex_safety::{Measurement, RedFlagAlert, SafetyConfig, SafetyMonitor, SafetyStatus};

/// Session configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub exercise: ExerciseType,
    /// Tracked side for single-sided exercises
    pub side: Side,
    pub angle: AngleEngineConfig,
    pub filter: FilterKind,
    pub calibration: CalibrationConfig,
    pub safety: SafetyConfig,
    pub cooldown: CooldownConfig,
    /// Velocity away from the target that aborts a rep (deg/s)
    pub abort_velocity: f32,
    /// Samples below this confidence do not drive the detector
    pub min_confidence: f32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            exercise: ExerciseType::Squat,
            side: Side::Left,
            angle: AngleEngineConfig::default(),
            filter: FilterKind::default(),
            calibration: CalibrationConfig::default(),
            safety: SafetyConfig::default(),
            cooldown: CooldownConfig::default(),
            abort_velocity: ExerciseProfile::DEFAULT_ABORT_VELOCITY,
            min_confidence: ExerciseProfile::DEFAULT_MIN_CONFIDENCE,
        }
    }
}

impl SessionConfig {
    pub fn for_exercise(exercise: ExerciseType) -> Self {
        SessionConfig {
            exercise,
            ..Self::default()
        }
    }

    /// Conservative safety thresholds and a gentler hold/cooldown
    pub fn post_operative(exercise: ExerciseType) -> Self {
        SessionConfig {
            exercise,
            safety: SafetyConfig::conservative(),
            cooldown: CooldownConfig {
                min: std::time::Duration::from_millis(1000),
                ..CooldownConfig::default()
            },
            abort_velocity: 60.0,
            ..Self::default()
        }
    }

    pub fn with_side(mut self, side: Side) -> Self {
        self.side = side;
        self
    }

    pub fn with_filter(mut self, filter: FilterKind) -> Self {
        self.filter = filter;
        self
    }

    /// Parse and validate a JSON override. Missing fields keep their defaults.
    pub fn from_json(json: &str) -> KinexResult<Self> {
        let config: SessionConfig = serde_json::from_str(json)
            .map_err(|e| KinexError::InvalidConfig(format!("session config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> KinexResult<()> {
        self.calibration.validate()?;
        self.safety.validate()?;
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(KinexError::InvalidConfig(format!(
                "min_confidence {} outside [0, 1]",
                self.min_confidence
            )));
        }
        if self.abort_velocity <= 0.0 {
            return Err(KinexError::InvalidConfig(
                "abort_velocity must be positive".into(),
            ));
        }
        if self.cooldown.min > self.cooldown.max {
            return Err(KinexError::InvalidConfig(
                "cooldown min above max".into(),
            ));
        }
        Ok(())
    }
}

/// Per-frame output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameOutput {
    /// `None` while a calibration is in progress
    pub detection: Option<DetectionResult>,
    /// Alerts raised on this frame
    pub alerts: Vec<RedFlagAlert>,
    pub safety: SafetyStatus,
}

/// Session counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SessionStats {
    pub frames: u64,
    /// Frames where the primary joint could not be measured
    pub skipped_frames: u64,
    pub calibration_frames: u64,
    pub reps: u64,
    pub alerts: u64,
}

impl SessionStats {
    /// Counts accumulated since an earlier snapshot
    pub fn since(&self, earlier: &SessionStats) -> SessionStats {
        SessionStats {
            frames: self.frames.saturating_sub(earlier.frames),
            skipped_frames: self.skipped_frames.saturating_sub(earlier.skipped_frames),
            calibration_frames: self.calibration_frames.saturating_sub(earlier.calibration_frames),
            reps: self.reps.saturating_sub(earlier.reps),
            alerts: self.alerts.saturating_sub(earlier.alerts),
        }
    }
}

/// Progress of one calibration frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CalibrationFeedback {
    Resting(RestingProgress),
    MaxRom(MaxRomProgress),
    /// Joint not visible on this frame
    NoSample,
}

/// Pipeline context for one user and exercise
pub struct Session {
    user_id: UserId,
    config: SessionConfig,
    clock: SharedClock,
    engine: AngleEngine,
    filters: FilterBank,
    calibration: CalibrationManager,
    detector: RepDetector,
    safety: SafetyMonitor,
    /// Normal range exists for the exercise movement
    has_normal_range: bool,
    /// Latest rep excursion per side, bilateral exercises only
    side_excursions: HashMap<Side, f32>,
    stats: SessionStats,
}

impl Session {
    /// Session with catalog thresholds
    pub fn new(user_id: UserId, config: SessionConfig, clock: SharedClock) -> KinexResult<Self> {
        config.validate()?;
        let profile = Self::tune(ExerciseProfile::from_catalog(config.exercise)?, &config);
        let engine = AngleEngine::new(config.angle)?;
        let safety = SafetyMonitor::new(config.safety)?;
        let has_normal_range = safety
            .table()
            .range(config.exercise.primary_joint(), config.exercise.movement())
            .is_ok();
        if !has_normal_range {
            tracing::debug!(
                exercise = %config.exercise,
                "no normal range for exercise movement, range checks skipped"
            );
        }

        tracing::info!(user = %user_id, exercise = %config.exercise, side = %config.side, "session started");

        Ok(Session {
            user_id,
            filters: FilterBank::new(config.filter),
            calibration: CalibrationManager::new(config.calibration),
            detector: RepDetector::new(profile, Box::new(StandardStrategy), clock.clone()),
            clock,
            engine,
            safety,
            has_normal_range,
            side_excursions: HashMap::new(),
            stats: SessionStats::default(),
            config,
        })
    }

    /// Session with a stored calibration
    pub fn with_calibration(
        user_id: UserId,
        config: SessionConfig,
        result: &CalibrationResult,
        clock: SharedClock,
    ) -> KinexResult<Self> {
        let mut session = Self::new(user_id, config, clock)?;
        session.apply_calibration(result)?;
        Ok(session)
    }

    fn tune(profile: ExerciseProfile, config: &SessionConfig) -> ExerciseProfile {
        profile
            .with_cooldown(config.cooldown)
            .with_abort_velocity(config.abort_velocity)
            .with_min_confidence(config.min_confidence)
    }

    /// Switch the detector to calibrated thresholds. Rep count restarts.
    pub fn apply_calibration(&mut self, result: &CalibrationResult) -> KinexResult<()> {
        if result.exercise != self.config.exercise {
            return Err(KinexError::CalibrationMismatch {
                expected: self.config.exercise,
                actual: result.exercise,
            });
        }
        let profile = Self::tune(ExerciseProfile::from_calibration(result, Utc::now())?, &self.config);
        tracing::debug!(
            exercise = %result.exercise,
            target = profile.target_angle(),
            "calibrated profile applied"
        );
        self.detector = RepDetector::new(profile, Box::new(StandardStrategy), self.clock.clone());
        Ok(())
    }

    #[inline]
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    #[inline]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    #[inline]
    pub fn detector(&self) -> &RepDetector {
        &self.detector
    }

    #[inline]
    pub fn safety(&self) -> &SafetyMonitor {
        &self.safety
    }

    #[inline]
    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// Smooth a sample. Samples the detector will ignore pass through
    /// untouched so they never move the filter state.
    fn smooth(&mut self, side: Side, sample: AngleSample) -> AngleSample {
        if sample.confidence <= 0.0 || sample.confidence < self.detector.profile().min_confidence {
            return sample;
        }
        let joint = self.config.exercise.primary_joint();
        sample.with_angle(self.filters.filter(joint, side, sample.angle))
    }

    /// Run one pose frame through the pipeline
    pub fn process_frame(&mut self, frame: &PoseFrame) -> FrameOutput {
        self.stats.frames += 1;

        if self.calibration.is_active() {
            return FrameOutput {
                detection: None,
                alerts: Vec::new(),
                safety: self.safety.status(),
            };
        }

        let joint = self.config.exercise.primary_joint();
        let detection = if self.detector.profile().bilateral {
            let (left, right) = self.engine.measure_pair(frame, joint);
            if left.is_none() && right.is_none() {
                self.stats.skipped_frames += 1;
            }
            let left = left.map(|s| self.smooth(Side::Left, s));
            let right = right.map(|s| self.smooth(Side::Right, s));
            self.detector.process_pair(left, right)
        } else {
            match self.engine.measure(frame, joint, self.config.side) {
                Some(raw) => {
                    let sample = self.smooth(self.config.side, raw);
                    self.detector.process(&sample)
                }
                None => {
                    self.stats.skipped_frames += 1;
                    self.detector.process_missing()
                }
            }
        };

        let alerts = if detection.rep_completed {
            self.stats.reps += 1;
            self.on_rep_completed()
        } else {
            Vec::new()
        };
        self.stats.alerts += alerts.len() as u64;

        FrameOutput {
            detection: Some(detection),
            alerts,
            safety: self.safety.status(),
        }
    }

    fn on_rep_completed(&mut self) -> Vec<RedFlagAlert> {
        let Some(rep) = self.detector.last_rep().copied() else {
            return Vec::new();
        };
        let profile = self.detector.profile();
        let joint = profile.joint;
        let bilateral = profile.bilateral;
        let side = rep.side.unwrap_or(self.config.side);
        let excursion = Self::excursion(profile, &rep);

        let mut measurement = Measurement::new(joint, side, excursion).with_velocity(rep.peak_velocity);
        if self.has_normal_range {
            measurement = measurement.with_movement(self.config.exercise.movement());
        }

        let mut alerts = match self.safety.check_measurement(&measurement) {
            Ok(alerts) => alerts,
            Err(e) => {
                tracing::warn!(error = %e, "rep measurement not assessed");
                Vec::new()
            }
        };

        if bilateral {
            self.side_excursions.insert(side, excursion);
            if let (Some(&left), Some(&right)) = (
                self.side_excursions.get(&Side::Left),
                self.side_excursions.get(&Side::Right),
            ) {
                alerts.extend(self.safety.check_asymmetry(joint, left, right));
            }
        }

        alerts.extend(self.safety.record_rep_accuracy(rep.accuracy));
        alerts
    }

    /// Range achieved in a rep, measured from the start position
    fn excursion(profile: &ExerciseProfile, rep: &RepSummary) -> f32 {
        (rep.peak_angle - profile.thresholds.start.center).abs()
    }

    /// Self-reported pain (0-10 VAS)
    pub fn report_pain(&mut self, vas: f32) -> Option<RedFlagAlert> {
        let alert = self.safety.report_pain(vas);
        if alert.is_some() {
            self.stats.alerts += 1;
        }
        alert
    }

    /// Upstream compensation score for the tracked joint
    pub fn report_compensation(&mut self, side: Side, score: f32) -> Option<RedFlagAlert> {
        let joint = self.config.exercise.primary_joint();
        let alert = self.safety.report_compensation(joint, side, score);
        if alert.is_some() {
            self.stats.alerts += 1;
        }
        alert
    }

    pub fn safety_status(&self) -> SafetyStatus {
        self.safety.status()
    }

    pub fn dismiss_alert(&mut self, id: AlertId) -> bool {
        self.safety.dismiss(id)
    }

    pub fn clear_alerts(&mut self) -> usize {
        self.safety.clear_active()
    }

    // ------------------------------------------------------------------
    // Calibration through frames
    // ------------------------------------------------------------------

    /// Begin calibrating the tracked joint
    pub fn start_calibration(&mut self) {
        let joint = self.config.exercise.primary_joint();
        self.calibration.start(self.config.exercise, joint, self.config.side);
    }

    pub fn is_calibrating(&self) -> bool {
        self.calibration.is_active()
    }

    /// Feed one frame to the running calibration.
    ///
    /// Raw angles are used; the calibration does its own robust statistics.
    pub fn feed_calibration_frame(
        &mut self,
        frame: &PoseFrame,
        phase: CalibrationPhase,
    ) -> KinexResult<CalibrationFeedback> {
        if !self.calibration.is_active() {
            return Err(KinexError::CalibrationNotStarted);
        }
        self.stats.calibration_frames += 1;

        let joint = self.config.exercise.primary_joint();
        let Some(sample) = self.engine.measure(frame, joint, self.config.side) else {
            return Ok(CalibrationFeedback::NoSample);
        };
        match phase {
            CalibrationPhase::Resting => self
                .calibration
                .add_resting_sample(sample.angle, sample.confidence)
                .map(CalibrationFeedback::Resting),
            CalibrationPhase::MaxRom => self
                .calibration
                .add_max_rom_sample(sample.angle, sample.confidence)
                .map(CalibrationFeedback::MaxRom),
        }
    }

    /// Finish the calibration and, on success, switch to its thresholds.
    ///
    /// The result is returned for the host to persist. `None` leaves the
    /// calibration running so more samples can be added.
    pub fn finish_calibration(&mut self) -> Option<CalibrationResult> {
        let joint = self.config.exercise.primary_joint();
        let result =
            self.calibration
                .complete(&self.user_id, self.config.exercise, joint, self.config.side)?;
        if let Err(e) = self.apply_calibration(&result) {
            tracing::warn!(error = %e, "calibration result not applied");
            return None;
        }
        self.calibration.reset();
        self.filters.reset_joint(joint, self.config.side);
        Some(result)
    }

    /// Abandon a calibration in progress
    pub fn cancel_calibration(&mut self) {
        self.calibration.reset();
    }

    /// Restart the exercise: detector, filters and safety baselines.
    /// Active alerts and alert history are kept.
    pub fn reset(&mut self) {
        tracing::debug!(user = %self.user_id, "session reset");
        self.detector.reset();
        self.filters.reset();
        self.safety.reset_tracking();
        self.side_excursions.clear();
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("user_id", &self.user_id)
            .field("exercise", &self.config.exercise)
            .field("phase", &self.detector.phase())
            .field("stats", &self.stats)
            .finish()
    }
}
