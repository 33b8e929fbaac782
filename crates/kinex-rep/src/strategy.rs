//! Transition predicates
//!
//! The detector owns the phase machine; a [`RepStrategy`] decides when each
//! edge fires. The default bodies are direction-aware and read everything
//! from the [`ExerciseProfile`], so most exercises need no overrides.

use std::time::Duration;

use crate::ExerciseProfile;

pub trait RepStrategy: Send + Sync {
    fn name(&self) -> &'static str {
        "standard"
    }

    /// Idle → Ready
    fn in_start_position(&self, profile: &ExerciseProfile, angle: f32) -> bool {
        profile.thresholds.in_start_band(angle)
    }

    /// Ready → Moving
    fn has_started_moving(&self, profile: &ExerciseProfile, angle: f32) -> bool {
        profile.thresholds.travel(angle) >= profile.start_margin
    }

    /// Moving → Holding
    fn has_reached_completion(&self, profile: &ExerciseProfile, angle: f32) -> bool {
        profile.thresholds.has_reached_completion(angle)
    }

    /// Holding → Cooldown
    fn has_held_long_enough(&self, profile: &ExerciseProfile, held: Duration) -> bool {
        held >= profile.hold_time()
    }

    /// Moving/Holding → Ready: moving away from the target fast while still
    /// short of halfway
    fn is_returning_before_target(
        &self,
        profile: &ExerciseProfile,
        angle: f32,
        velocity: f32,
    ) -> bool {
        let away = -velocity * profile.direction().sign();
        away > profile.abort_velocity && profile.thresholds.progress(angle) < 0.5
    }

    /// Cooldown → Ready/Idle
    fn is_cooldown_complete(
        &self,
        profile: &ExerciseProfile,
        elapsed: Duration,
        rep_duration: Duration,
    ) -> bool {
        elapsed >= profile.cooldown.duration_after(rep_duration)
    }
}

/// Default predicates for every catalog exercise
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardStrategy;

impl RepStrategy for StandardStrategy {}

/// Requires the return threshold to be crossed before leaving the start
/// band again. Suits exercises where users tend to bounce at the top.
#[derive(Debug, Clone, Copy, Default)]
pub struct StrictStartStrategy;

impl RepStrategy for StrictStartStrategy {
    fn name(&self) -> &'static str {
        "strict_start"
    }

    fn in_start_position(&self, profile: &ExerciseProfile, angle: f32) -> bool {
        profile.thresholds.in_start_band(angle) && profile.thresholds.has_returned(angle)
    }
}
