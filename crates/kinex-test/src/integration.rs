//! End-to-end Integration Test Suite
//!
//! Runs whole sessions over simulated poses:
//! - Rep counting per exercise from the catalog
//! - Calibration through frames, then calibrated reps
//! - Behaviour under tracking chaos
//! - Safety alerts raised by the session

use std::sync::Arc;
use std::time::Duration;

use kinex_core::{Clock, ExerciseType, JointType, KinexResult, ManualClock, PoseFrame, Side, UserId};
use kinex_filter::{FilterWorker, FilterWorkerConfig, FrameRequest, FrameResponse};
use kinex_rep::RepPhase;
use kinex_runtime::{FrameOutput, Session, SessionConfig, SessionStats};
use kinex_safety::{RedFlagAlert, SafetyStatus};

use crate::chaos::{TrackingChaos, TrackingChaosConfig};
use crate::scenario::{Scenario, ScenarioFrame};
use crate::simulator::PoseSimulator;

// ============================================================================
// HARNESS CONFIG
// ============================================================================

#[derive(Debug, Clone)]
pub struct HarnessConfig {
    pub session: SessionConfig,
    /// Frame interval
    pub frame_interval: Duration,
    /// Tracking chaos, `None` for clean frames
    pub chaos: Option<TrackingChaosConfig>,
    pub seed: u64,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            frame_interval: Duration::from_micros(33_333),
            chaos: None,
            seed: 42,
        }
    }
}

impl HarnessConfig {
    pub fn for_exercise(exercise: ExerciseType) -> Self {
        Self {
            session: SessionConfig::for_exercise(exercise),
            ..Self::default()
        }
    }

    /// Frames per second
    pub fn with_fps(mut self, fps: u32) -> Self {
        self.frame_interval = Duration::from_micros(1_000_000 / u64::from(fps.max(1)));
        self
    }

    pub fn with_chaos(mut self, chaos: TrackingChaosConfig) -> Self {
        self.chaos = Some(chaos);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

// ============================================================================
// RESULT
// ============================================================================

/// Result of one harness run
#[derive(Debug, Clone)]
pub struct HarnessResult {
    pub reps: u32,
    pub left_reps: u32,
    pub right_reps: u32,
    /// Accuracy of every completed rep, in order
    pub accuracies: Vec<f32>,
    /// Alerts raised during the run, in order
    pub alerts: Vec<RedFlagAlert>,
    /// Distinct phases in order of first appearance
    pub phases_seen: Vec<RepPhase>,
    pub frames: usize,
    pub dropped_frames: usize,
    pub final_status: SafetyStatus,
    pub stats: SessionStats,
}

impl HarnessResult {
    pub fn mean_accuracy(&self) -> Option<f32> {
        if self.accuracies.is_empty() {
            None
        } else {
            Some(self.accuracies.iter().sum::<f32>() / self.accuracies.len() as f32)
        }
    }

    pub fn passed_cleanly(&self, expected_reps: u32) -> bool {
        self.reps == expected_reps && self.alerts.is_empty()
    }
}

// ============================================================================
// HARNESS
// ============================================================================

/// Drives one session over a scenario
pub struct SessionHarness {
    config: HarnessConfig,
    clock: ManualClock,
    session: Session,
    simulator: PoseSimulator,
    chaos: Option<TrackingChaos>,
}

impl SessionHarness {
    pub fn new(config: HarnessConfig) -> KinexResult<Self> {
        let clock = ManualClock::new();
        let session = Session::new(
            UserId::from("harness"),
            config.session.clone(),
            Arc::new(clock.clone()),
        )?;
        let chaos = config
            .chaos
            .clone()
            .map(|c| TrackingChaos::with_seed(c, config.seed));
        Ok(Self {
            config,
            clock,
            session,
            simulator: PoseSimulator::default(),
            chaos,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    pub fn clock(&self) -> &ManualClock {
        &self.clock
    }

    /// Render one scenario frame, apply chaos and feed the session.
    /// `None` when chaos dropped the frame.
    pub fn step(&mut self, frame: &ScenarioFrame) -> Option<FrameOutput> {
        let exercise = self.config.session.exercise;
        let pose = render(&mut self.simulator, exercise, self.config.session.side, frame);
        self.clock.set(frame.at);
        let pose = match self.chaos.as_mut() {
            Some(chaos) => chaos.apply(&pose)?,
            None => pose,
        };
        Some(self.session.process_frame(&pose))
    }

    /// Play a whole scenario. Scenario time is offset by the current clock.
    pub fn run(&mut self, scenario: &Scenario) -> HarnessResult {
        let offset = self.clock.now();
        let frames = scenario.frames(self.config.frame_interval);
        let stats_before = *self.session.stats();

        let mut result = HarnessResult {
            reps: 0,
            left_reps: 0,
            right_reps: 0,
            accuracies: Vec::new(),
            alerts: Vec::new(),
            phases_seen: Vec::new(),
            frames: frames.len(),
            dropped_frames: 0,
            final_status: SafetyStatus::default(),
            stats: SessionStats::default(),
        };

        for frame in &frames {
            let shifted = ScenarioFrame {
                at: offset.saturating_add(Duration::from_micros(frame.at.as_micros() as u64)),
                ..*frame
            };
            let Some(output) = self.step(&shifted) else {
                result.dropped_frames += 1;
                continue;
            };
            if let Some(detection) = &output.detection {
                if !result.phases_seen.contains(&detection.phase) {
                    result.phases_seen.push(detection.phase);
                }
                if detection.rep_completed {
                    result.reps += 1;
                    match detection.leading_side {
                        Some(Side::Left) => result.left_reps += 1,
                        Some(Side::Right) => result.right_reps += 1,
                        None => {}
                    }
                    result.accuracies.extend(detection.accuracy);
                }
            }
            result.alerts.extend(output.alerts);
        }

        result.final_status = self.session.safety_status();
        result.stats = self.session.stats().since(&stats_before);
        result
    }
}

/// Pose for one scenario frame. The spine has a single angle, taken from `side`.
fn render(
    simulator: &mut PoseSimulator,
    exercise: ExerciseType,
    side: Side,
    frame: &ScenarioFrame,
) -> PoseFrame {
    let joint = exercise.primary_joint();
    if joint == JointType::Spine {
        simulator.set_angle(joint, side, frame.angle(side));
    } else {
        for s in Side::BOTH {
            simulator.set_angle(joint, s, frame.angle(s));
        }
    }
    simulator.render(frame.at)
}

/// Run a scenario through a background filter worker, one frame at a time.
///
/// Each frame waits for its response, so nothing is overwritten.
pub async fn run_through_worker(
    config: FilterWorkerConfig,
    scenario: &Scenario,
    frame_interval: Duration,
) -> KinexResult<Vec<FrameResponse>> {
    let exercise = scenario.exercise();
    let joint = exercise.primary_joint();
    let mut simulator = PoseSimulator::default();
    let mut handle = FilterWorker::spawn(config)?;
    let mut responses = Vec::new();

    for (sequence, frame) in scenario.frames(frame_interval).iter().enumerate() {
        handle.submit(FrameRequest {
            sequence: sequence as u64,
            frame: render(&mut simulator, exercise, Side::Left, frame),
            targets: vec![(joint, Side::Left), (joint, Side::Right)],
        })?;
        match handle.recv().await {
            Some(response) => responses.push(response),
            None => break,
        }
    }

    handle.shutdown().await;
    Ok(responses)
}

// ============================================================================
// TEST FUNCTIONS
// ============================================================================

/// Clean catalog reps for one exercise
pub fn test_clean_reps(exercise: ExerciseType, count: usize) -> KinexResult<HarnessResult> {
    let mut harness = SessionHarness::new(HarnessConfig::for_exercise(exercise))?;
    Ok(harness.run(&Scenario::reps(exercise, count)))
}

/// Catalog reps under tracking chaos
pub fn test_reps_with_chaos(
    exercise: ExerciseType,
    count: usize,
    chaos: TrackingChaosConfig,
    seed: u64,
) -> KinexResult<HarnessResult> {
    let config = HarnessConfig::for_exercise(exercise)
        .with_chaos(chaos)
        .with_seed(seed);
    let mut harness = SessionHarness::new(config)?;
    Ok(harness.run(&Scenario::reps(exercise, count)))
}
