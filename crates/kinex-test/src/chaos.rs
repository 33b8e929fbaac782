//! Tracking chaos for Kinex pipeline testing
//!
//! Simulates a bad pose detector:
//! - Landmark jitter
//! - Dropped frames, including bursts
//! - Per-landmark visibility loss (occlusion)
//! - Depth noise

use kinex_core::PoseFrame;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Tracking chaos configuration
#[derive(Clone, Debug, PartialEq)]
pub struct TrackingChaosConfig {
    /// Std-dev of x/y jitter in normalized image units
    pub jitter: f32,
    /// Std-dev of z noise
    pub depth_noise: f32,
    /// Probability a frame is lost (0.0 - 1.0)
    pub dropout_rate: f64,
    /// Probability a lost frame starts a burst
    pub burst_dropout_prob: f64,
    /// Burst length range in frames
    pub burst_length: (u32, u32),
    /// Probability a landmark is occluded on a frame
    pub occlusion_rate: f64,
    /// Visibility reported for occluded landmarks
    pub occluded_visibility: f32,
}

impl Default for TrackingChaosConfig {
    fn default() -> Self {
        TrackingChaosConfig {
            jitter: 0.002,
            depth_noise: 0.01,
            dropout_rate: 0.02,
            burst_dropout_prob: 0.1,
            burst_length: (2, 4),
            occlusion_rate: 0.005,
            occluded_visibility: 0.2,
        }
    }
}

impl TrackingChaosConfig {
    /// Noise-free tracking
    pub fn clean() -> Self {
        TrackingChaosConfig {
            jitter: 0.0,
            depth_noise: 0.0,
            dropout_rate: 0.0,
            burst_dropout_prob: 0.0,
            burst_length: (0, 0),
            occlusion_rate: 0.0,
            occluded_visibility: 0.2,
        }
    }

    /// Typical webcam in a well-lit room
    pub fn typical() -> Self {
        Self::default()
    }

    /// Poor lighting, loose clothing
    pub fn poor() -> Self {
        TrackingChaosConfig {
            jitter: 0.005,
            depth_noise: 0.05,
            dropout_rate: 0.08,
            burst_dropout_prob: 0.2,
            burst_length: (3, 8),
            occlusion_rate: 0.03,
            occluded_visibility: 0.1,
        }
    }

    /// Barely usable tracking
    pub fn hostile() -> Self {
        TrackingChaosConfig {
            jitter: 0.015,
            depth_noise: 0.2,
            dropout_rate: 0.25,
            burst_dropout_prob: 0.4,
            burst_length: (5, 15),
            occlusion_rate: 0.15,
            occluded_visibility: 0.05,
        }
    }
}

/// Tracking chaos statistics
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TrackingChaosStats {
    pub frames_in: u64,
    pub frames_dropped: u64,
    pub landmarks_occluded: u64,
}

impl TrackingChaosStats {
    pub fn drop_rate(&self) -> f64 {
        if self.frames_in == 0 {
            0.0
        } else {
            self.frames_dropped as f64 / self.frames_in as f64
        }
    }
}

/// Applies tracking chaos to pose frames
pub struct TrackingChaos {
    config: TrackingChaosConfig,
    rng: StdRng,
    burst_remaining: u32,
    stats: TrackingChaosStats,
}

impl TrackingChaos {
    /// Create with a fixed default seed
    pub fn new(config: TrackingChaosConfig) -> Self {
        Self::with_seed(config, 42)
    }

    pub fn with_seed(config: TrackingChaosConfig, seed: u64) -> Self {
        TrackingChaos {
            config,
            rng: StdRng::seed_from_u64(seed),
            burst_remaining: 0,
            stats: TrackingChaosStats::default(),
        }
    }

    pub fn config(&self) -> &TrackingChaosConfig {
        &self.config
    }

    pub fn stats(&self) -> &TrackingChaosStats {
        &self.stats
    }

    /// Normal sample via Box-Muller
    fn gaussian(&mut self, std_dev: f32) -> f32 {
        if std_dev <= 0.0 {
            return 0.0;
        }
        let u1: f32 = self.rng.gen_range(f32::EPSILON..1.0);
        let u2: f32 = self.rng.gen();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f32::consts::PI * u2).cos();
        z * std_dev
    }

    fn should_drop(&mut self) -> bool {
        if self.burst_remaining > 0 {
            self.burst_remaining -= 1;
            return true;
        }
        if self.config.dropout_rate <= 0.0 || !self.rng.gen_bool(self.config.dropout_rate.min(1.0)) {
            return false;
        }
        let (lo, hi) = self.config.burst_length;
        if hi > 0 && self.rng.gen_bool(self.config.burst_dropout_prob.clamp(0.0, 1.0)) {
            // This frame counts as the first of the burst
            self.burst_remaining = self.rng.gen_range(lo..=hi.max(lo)).saturating_sub(1);
        }
        true
    }

    /// Corrupt one frame. `None` means the detector lost the frame.
    pub fn apply(&mut self, frame: &PoseFrame) -> Option<PoseFrame> {
        self.stats.frames_in += 1;
        if self.should_drop() {
            self.stats.frames_dropped += 1;
            return None;
        }

        let mut out = frame.clone();
        let (jitter, depth_noise) = (self.config.jitter, self.config.depth_noise);
        let occlusion = self.config.occlusion_rate.clamp(0.0, 1.0);
        for lm in out.landmarks.iter_mut() {
            lm.x += self.gaussian(jitter);
            lm.y += self.gaussian(jitter);
            lm.z += self.gaussian(depth_noise);
            if occlusion > 0.0 && self.rng.gen_bool(occlusion) {
                lm.visibility = self.config.occluded_visibility;
                self.stats.landmarks_occluded += 1;
            }
        }
        Some(out)
    }
}
