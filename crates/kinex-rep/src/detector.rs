//! Rep detector - one phase machine per active exercise
//!
//! Timers (hold, cooldown, velocity) read the injected [`Clock`], so the
//! machine behaves the same at 15 fps and at 60 fps. Frames below the
//! profile's confidence floor are ignored entirely: no transition, no
//! velocity update, nothing counted.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use kinex_core::{AngleSample, ExerciseType, KinexResult, MotionTime, SharedClock, Side};

use crate::accuracy::{rep_accuracy, AccuracyInput};
use crate::{ExerciseProfile, PhaseState, RepPhase, RepStrategy, StandardStrategy};

/// Per-frame detector output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub phase: RepPhase,
    /// True only on the frame that completed a rep
    pub rep_completed: bool,
    pub current_angle: f32,
    pub target_angle: f32,
    /// [0, 1] from the start center toward the target
    pub progress: f32,
    /// Score of the rep completed on this frame
    pub accuracy: Option<f32>,
    pub confidence: f32,
    pub feedback: String,
    /// [0, 1] while holding
    pub hold_progress: Option<f32>,
    /// Side that drove this frame, for paired input
    pub leading_side: Option<Side>,
}

/// Summary of the most recent completed rep
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RepSummary {
    pub number: u32,
    pub accuracy: f32,
    /// From leaving the start position to completing the hold
    pub duration: Duration,
    /// Furthest angle toward the target
    pub peak_angle: f32,
    /// Largest absolute angular velocity during the rep (deg/s)
    pub peak_velocity: f32,
    pub mean_confidence: f32,
    pub side: Option<Side>,
    pub completed_at: MotionTime,
}

/// Data collected between Ready → Moving and the end of the rep
#[derive(Debug, Clone, Default)]
struct RepTracker {
    started_at: MotionTime,
    peak_angle: f32,
    peak_travel: f32,
    peak_velocity: f32,
    confidence_sum: f32,
    samples: u32,
    hold_started_at: Option<MotionTime>,
    hold_angles: Vec<f32>,
}

impl RepTracker {
    fn start(now: MotionTime, angle: f32) -> Self {
        RepTracker {
            started_at: now,
            peak_angle: angle,
            ..Default::default()
        }
    }

    fn record(&mut self, profile: &ExerciseProfile, angle: f32, confidence: f32, velocity: f32) {
        let travel = profile.thresholds.travel(angle);
        if travel > self.peak_travel {
            self.peak_travel = travel;
            self.peak_angle = angle;
        }
        self.peak_velocity = self.peak_velocity.max(velocity.abs());
        self.confidence_sum += confidence;
        self.samples += 1;
    }

    fn mean_confidence(&self) -> f32 {
        if self.samples == 0 {
            0.0
        } else {
            self.confidence_sum / self.samples as f32
        }
    }

    fn hold_std_dev(&self) -> f32 {
        let n = self.hold_angles.len();
        if n < 2 {
            return 0.0;
        }
        let mean = self.hold_angles.iter().sum::<f32>() / n as f32;
        let var = self.hold_angles.iter().map(|a| (a - mean) * (a - mean)).sum::<f32>() / n as f32;
        var.sqrt()
    }
}

/// Generic rep phase machine
pub struct RepDetector {
    profile: ExerciseProfile,
    strategy: Box<dyn RepStrategy>,
    clock: SharedClock,
    state: PhaseState,

    phase_entered_at: MotionTime,
    last_accepted: Option<(f32, MotionTime)>,
    current_angle: f32,
    current_confidence: f32,
    rep: Option<RepTracker>,
    last_rep_duration: Duration,
    last_rep: Option<RepSummary>,

    leading_side: Option<Side>,
    /// Side that started the rep in progress
    rep_side: Option<Side>,
}

impl RepDetector {
    pub fn new(profile: ExerciseProfile, strategy: Box<dyn RepStrategy>, clock: SharedClock) -> Self {
        tracing::debug!(
            exercise = %profile.exercise,
            strategy = strategy.name(),
            target = profile.target_angle(),
            "rep detector created"
        );
        let now = clock.now();
        RepDetector {
            state: PhaseState::new(profile.bilateral),
            current_angle: profile.thresholds.start.center,
            profile,
            strategy,
            clock,
            phase_entered_at: now,
            last_accepted: None,
            current_confidence: 0.0,
            rep: None,
            last_rep_duration: Duration::ZERO,
            last_rep: None,
            leading_side: None,
            rep_side: None,
        }
    }

    /// Detector over the catalog defaults with the standard strategy
    pub fn for_exercise(exercise: ExerciseType, clock: SharedClock) -> KinexResult<Self> {
        Ok(Self::new(
            ExerciseProfile::from_catalog(exercise)?,
            Box::new(StandardStrategy),
            clock,
        ))
    }

    pub fn profile(&self) -> &ExerciseProfile {
        &self.profile
    }

    pub fn state(&self) -> &PhaseState {
        &self.state
    }

    #[inline]
    pub fn phase(&self) -> RepPhase {
        self.state.phase
    }

    #[inline]
    pub fn rep_count(&self) -> u32 {
        self.state.rep_count
    }

    pub fn last_rep(&self) -> Option<&RepSummary> {
        self.last_rep.as_ref()
    }

    /// Back to Idle with zero reps
    pub fn reset(&mut self) {
        tracing::debug!(exercise = %self.profile.exercise, "rep detector reset");
        let fresh = RepDetector::new(
            self.profile.clone(),
            std::mem::replace(&mut self.strategy, Box::new(StandardStrategy)),
            self.clock.clone(),
        );
        *self = fresh;
    }

    /// Feed one sample for a single-sided exercise
    pub fn process(&mut self, sample: &AngleSample) -> DetectionResult {
        if sample.confidence < self.profile.min_confidence {
            return self.snapshot(false, None, Some(sample.confidence));
        }
        self.step(sample)
    }

    /// Frame without a usable sample
    pub fn process_missing(&mut self) -> DetectionResult {
        self.snapshot(false, None, Some(0.0))
    }

    /// Feed both sides of a joint.
    ///
    /// Outside a rep the side closer to the target leads; during a rep the
    /// side that started it keeps leading.
    pub fn process_pair(
        &mut self,
        left: Option<AngleSample>,
        right: Option<AngleSample>,
    ) -> DetectionResult {
        let usable = |s: Option<AngleSample>| s.filter(|s| s.confidence >= self.profile.min_confidence);
        let (left, right) = (usable(left), usable(right));

        let chosen = match self.rep_side {
            Some(Side::Left) => left.map(|s| (Side::Left, s)),
            Some(Side::Right) => right.map(|s| (Side::Right, s)),
            None => match (left, right) {
                (Some(l), Some(r)) => {
                    let dl = self.profile.thresholds.deviation_from_target(l.angle);
                    let dr = self.profile.thresholds.deviation_from_target(r.angle);
                    if dr < dl {
                        Some((Side::Right, r))
                    } else {
                        Some((Side::Left, l))
                    }
                }
                (Some(l), None) => Some((Side::Left, l)),
                (None, Some(r)) => Some((Side::Right, r)),
                (None, None) => None,
            },
        };

        let Some((side, sample)) = chosen else {
            return self.process_missing();
        };

        if self.leading_side != Some(side) {
            // Velocity across sides is meaningless
            self.last_accepted = None;
            self.leading_side = Some(side);
        }
        self.step(&sample)
    }

    fn step(&mut self, sample: &AngleSample) -> DetectionResult {
        let now = self.clock.now();
        let angle = sample.angle;

        self.state.angle_velocity = match self.last_accepted {
            Some((prev, at)) => {
                let dt = now.since(at).as_secs_f32();
                if dt > 0.0 {
                    (angle - prev) / dt
                } else {
                    self.state.angle_velocity
                }
            }
            None => 0.0,
        };
        self.last_accepted = Some((angle, now));
        self.current_angle = angle;
        self.current_confidence = sample.confidence;

        let velocity = self.state.angle_velocity;
        if let Some(rep) = self.rep.as_mut() {
            rep.record(&self.profile, angle, sample.confidence, velocity);
        }

        let mut completed = None;
        match self.state.phase {
            RepPhase::Idle => {
                if self.strategy.in_start_position(&self.profile, angle) {
                    self.enter(RepPhase::Ready, now);
                }
            }
            RepPhase::Ready => {
                if self.strategy.has_started_moving(&self.profile, angle) {
                    self.begin_rep(now, angle, sample.confidence, velocity);
                    if self.strategy.has_reached_completion(&self.profile, angle) {
                        self.begin_hold(now, angle);
                    }
                } else if !self.strategy.in_start_position(&self.profile, angle)
                    && self.profile.thresholds.travel(angle) < 0.0
                {
                    self.enter(RepPhase::Idle, now);
                }
            }
            RepPhase::Moving => {
                if self
                    .strategy
                    .is_returning_before_target(&self.profile, angle, velocity)
                {
                    self.abort(now, "aborted: moving away from target");
                } else if self.strategy.has_reached_completion(&self.profile, angle) {
                    self.begin_hold(now, angle);
                } else if self.profile.thresholds.has_returned(angle) {
                    self.abort(now, "incomplete: returned before target");
                }
            }
            RepPhase::Holding => {
                if self
                    .strategy
                    .is_returning_before_target(&self.profile, angle, velocity)
                {
                    self.abort(now, "aborted during hold");
                } else if !self.strategy.has_reached_completion(&self.profile, angle) {
                    if let Some(rep) = self.rep.as_mut() {
                        rep.hold_started_at = None;
                        rep.hold_angles.clear();
                    }
                    self.enter(RepPhase::Moving, now);
                } else {
                    let held = self.held(now);
                    if let Some(rep) = self.rep.as_mut() {
                        rep.hold_angles.push(angle);
                    }
                    if self.strategy.has_held_long_enough(&self.profile, held) {
                        completed = Some(self.complete_rep(now, held));
                    }
                }
            }
            RepPhase::Cooldown => {
                let elapsed = now.since(self.phase_entered_at);
                if self
                    .strategy
                    .is_cooldown_complete(&self.profile, elapsed, self.last_rep_duration)
                {
                    if self.profile.thresholds.has_returned(angle) {
                        self.enter(RepPhase::Ready, now);
                    } else {
                        self.enter(RepPhase::Idle, now);
                    }
                }
            }
        }

        self.snapshot(completed.is_some(), completed, None)
    }

    fn enter(&mut self, phase: RepPhase, now: MotionTime) {
        if phase != self.state.phase {
            tracing::debug!(from = %self.state.phase, to = %phase, angle = self.current_angle, "rep phase");
            self.state.phase = phase;
            self.phase_entered_at = now;
        }
        if !phase.is_active() && phase != RepPhase::Cooldown {
            self.rep = None;
            self.rep_side = None;
        }
    }

    fn begin_rep(&mut self, now: MotionTime, angle: f32, confidence: f32, velocity: f32) {
        let mut rep = RepTracker::start(now, angle);
        rep.record(&self.profile, angle, confidence, velocity);
        self.rep = Some(rep);
        self.rep_side = self.leading_side;
        self.enter(RepPhase::Moving, now);
    }

    fn begin_hold(&mut self, now: MotionTime, angle: f32) {
        if let Some(rep) = self.rep.as_mut() {
            rep.hold_started_at = Some(now);
            rep.hold_angles.clear();
            rep.hold_angles.push(angle);
        }
        self.enter(RepPhase::Holding, now);
    }

    fn held(&self, now: MotionTime) -> Duration {
        self.rep
            .as_ref()
            .and_then(|r| r.hold_started_at)
            .map(|t| now.since(t))
            .unwrap_or_default()
    }

    fn abort(&mut self, now: MotionTime, reason: &'static str) {
        tracing::debug!(angle = self.current_angle, velocity = self.state.angle_velocity, reason, "rep not counted");
        self.enter(RepPhase::Ready, now);
    }

    fn complete_rep(&mut self, now: MotionTime, held: Duration) -> f32 {
        let (accuracy, summary_base) = match self.rep.as_ref() {
            Some(rep) => {
                let input = AccuracyInput {
                    peak_angle: rep.peak_angle,
                    target_angle: self.profile.target_angle(),
                    total_rom: self.profile.thresholds.total_rom,
                    held,
                    required_hold: self.profile.hold_time(),
                    hold_std_dev: rep.hold_std_dev(),
                    mean_confidence: rep.mean_confidence(),
                };
                (
                    rep_accuracy(&input),
                    (now.since(rep.started_at), rep.peak_angle, rep.peak_velocity, rep.mean_confidence()),
                )
            }
            None => (0.0, (Duration::ZERO, self.current_angle, 0.0, self.current_confidence)),
        };
        let (duration, peak_angle, peak_velocity, mean_confidence) = summary_base;

        self.state.rep_count += 1;
        self.state.rep_accuracies.push(accuracy);
        if let (Some(counts), Some(side)) = (self.state.side_rep_counts.as_mut(), self.rep_side) {
            counts.increment(side);
        }
        self.last_rep_duration = duration;
        self.last_rep = Some(RepSummary {
            number: self.state.rep_count,
            accuracy,
            duration,
            peak_angle,
            peak_velocity,
            mean_confidence,
            side: self.rep_side,
            completed_at: now,
        });

        tracing::info!(
            exercise = %self.profile.exercise,
            rep = self.state.rep_count,
            accuracy,
            duration_ms = duration.as_millis() as u64,
            "rep completed"
        );

        self.enter(RepPhase::Cooldown, now);
        self.rep = None;
        self.rep_side = None;
        accuracy
    }

    fn feedback(&self, low_confidence: bool) -> &'static str {
        if low_confidence {
            return "Tracking lost - step back into view";
        }
        match self.state.phase {
            RepPhase::Idle => "Get into the starting position",
            RepPhase::Ready => "Ready - begin the movement",
            RepPhase::Moving => "Keep going toward the target",
            RepPhase::Holding => "Hold it there",
            RepPhase::Cooldown => "Good rep - return to the start",
        }
    }

    fn snapshot(
        &self,
        rep_completed: bool,
        accuracy: Option<f32>,
        rejected_confidence: Option<f32>,
    ) -> DetectionResult {
        let hold_progress = if self.state.phase == RepPhase::Holding {
            let required = self.profile.hold_time().as_secs_f32();
            let held = self.held(self.clock.now()).as_secs_f32();
            Some(if required > 0.0 { (held / required).min(1.0) } else { 1.0 })
        } else {
            None
        };

        DetectionResult {
            phase: self.state.phase,
            rep_completed,
            current_angle: self.current_angle,
            target_angle: self.profile.target_angle(),
            progress: self.profile.thresholds.progress(self.current_angle),
            accuracy,
            confidence: rejected_confidence.unwrap_or(self.current_confidence),
            feedback: self.feedback(rejected_confidence.is_some()).to_string(),
            hold_progress,
            leading_side: self.leading_side,
        }
    }
}

impl std::fmt::Debug for RepDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepDetector")
            .field("exercise", &self.profile.exercise)
            .field("strategy", &self.strategy.name())
            .field("state", &self.state)
            .finish()
    }
}
