//! Exercise scenarios - joint angle trajectories over time
//!
//! A scenario is a list of segments (hold or linear ramp) for the exercise
//! joint on each side. Sampling it at a frame rate gives the angle to render
//! on every frame.

use std::time::Duration;

use kinex_core::{ExerciseType, MotionTime, Side};
use kinex_rep::catalog_entry;

/// One piece of a trajectory
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Segment {
    pub side: Side,
    pub from: f32,
    pub to: f32,
    pub duration: Duration,
}

impl Segment {
    fn angle_at(&self, elapsed: Duration) -> f32 {
        if self.duration.is_zero() {
            return self.to;
        }
        let t = (elapsed.as_secs_f32() / self.duration.as_secs_f32()).clamp(0.0, 1.0);
        self.from + (self.to - self.from) * t
    }
}

/// One sampled frame
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScenarioFrame {
    pub at: MotionTime,
    pub left: f32,
    pub right: f32,
}

impl ScenarioFrame {
    pub fn angle(&self, side: Side) -> f32 {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }
}

/// Timing of a generated rep
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RepTiming {
    /// Rest at the start position before the rep
    pub rest: Duration,
    /// Start to peak
    pub descent: Duration,
    /// Time at the peak
    pub hold: Duration,
    /// Peak back to start
    pub ascent: Duration,
}

impl Default for RepTiming {
    fn default() -> Self {
        RepTiming {
            rest: Duration::from_millis(1000),
            descent: Duration::from_millis(1500),
            hold: Duration::from_millis(1500),
            ascent: Duration::from_millis(1500),
        }
    }
}

impl RepTiming {
    /// Rushed reps with a short hold
    pub fn rushed() -> Self {
        RepTiming {
            rest: Duration::from_millis(300),
            descent: Duration::from_millis(250),
            hold: Duration::from_millis(100),
            ascent: Duration::from_millis(250),
        }
    }
}

/// Trajectory builder
#[derive(Clone, Debug)]
pub struct Scenario {
    exercise: ExerciseType,
    resting: f32,
    peak: f32,
    side: Side,
    segments: Vec<Segment>,
}

impl Scenario {
    /// Empty scenario starting at the catalog resting angle
    pub fn new(exercise: ExerciseType) -> Self {
        let entry = catalog_entry(exercise);
        Scenario {
            exercise,
            resting: entry.resting,
            peak: entry.max_rom,
            side: Side::Left,
            segments: Vec::new(),
        }
    }

    /// `count` catalog-range reps on the left side
    pub fn reps(exercise: ExerciseType, count: usize) -> Self {
        Self::new(exercise).rep_times(count, RepTiming::default())
    }

    /// Reps alternating left and right, starting left
    pub fn alternating(exercise: ExerciseType, per_side: usize) -> Self {
        let mut scenario = Self::new(exercise);
        for _ in 0..per_side {
            scenario = scenario
                .on_side(Side::Left)
                .rep(RepTiming::default())
                .on_side(Side::Right)
                .rep(RepTiming::default());
        }
        scenario.on_side(Side::Left).hold(Duration::from_millis(1500))
    }

    pub fn exercise(&self) -> ExerciseType {
        self.exercise
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Resting angle for the side not being exercised
    pub fn resting(&self) -> f32 {
        self.resting
    }

    /// Switch the side later segments move
    pub fn on_side(mut self, side: Side) -> Self {
        self.side = side;
        self
    }

    /// Use a different peak for later reps
    pub fn with_peak(mut self, peak: f32) -> Self {
        self.peak = peak;
        self
    }

    fn current(&self) -> f32 {
        self.segments
            .iter()
            .rev()
            .find(|s| s.side == self.side)
            .map(|s| s.to)
            .unwrap_or(self.resting)
    }

    /// Stay at the current angle
    pub fn hold(mut self, duration: Duration) -> Self {
        let angle = self.current();
        self.segments.push(Segment {
            side: self.side,
            from: angle,
            to: angle,
            duration,
        });
        self
    }

    /// Move linearly to `to`
    pub fn ramp(mut self, to: f32, duration: Duration) -> Self {
        let from = self.current();
        self.segments.push(Segment {
            side: self.side,
            from,
            to,
            duration,
        });
        self
    }

    /// Rest, move to the peak, hold, return
    pub fn rep(self, timing: RepTiming) -> Self {
        let (resting, peak) = (self.resting, self.peak);
        self.ramp(resting, Duration::ZERO)
            .hold(timing.rest)
            .ramp(peak, timing.descent)
            .hold(timing.hold)
            .ramp(resting, timing.ascent)
    }

    pub fn rep_times(mut self, count: usize, timing: RepTiming) -> Self {
        for _ in 0..count {
            self = self.rep(timing);
        }
        self.hold(timing.rest.max(Duration::from_millis(1500)))
    }

    pub fn duration(&self) -> Duration {
        self.segments.iter().map(|s| s.duration).sum()
    }

    /// Sample at a fixed frame interval. Frame `i` is captured at `i * interval`.
    pub fn frames(&self, interval: Duration) -> Vec<ScenarioFrame> {
        let total = self.duration();
        let step = interval.max(Duration::from_millis(1));
        let mut frames = Vec::new();
        let mut left = self.resting;
        let mut right = self.resting;
        let mut seg_index = 0;
        let mut seg_start = Duration::ZERO;
        let mut t = Duration::ZERO;

        while t <= total {
            while seg_index < self.segments.len()
                && t > seg_start + self.segments[seg_index].duration
            {
                let done = &self.segments[seg_index];
                match done.side {
                    Side::Left => left = done.to,
                    Side::Right => right = done.to,
                }
                seg_start += done.duration;
                seg_index += 1;
            }
            if let Some(seg) = self.segments.get(seg_index) {
                let angle = seg.angle_at(t - seg_start);
                match seg.side {
                    Side::Left => left = angle,
                    Side::Right => right = angle,
                }
            }
            frames.push(ScenarioFrame {
                at: MotionTime::from_micros(t.as_micros() as i64),
                left,
                right,
            });
            t += step;
        }
        frames
    }
}
