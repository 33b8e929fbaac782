//! Time primitives for Kinex
//!
//! Hold and cooldown timers are measured in wall-clock deltas, never in
//! frame counts, so detector behaviour does not change when the camera
//! drops from 30 to 15 fps. Every timed component reads a [`Clock`].

use std::ops::{Add, Sub};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Motion time - monotonic microseconds since the session epoch
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct MotionTime(pub i64);

impl MotionTime {
    pub const ZERO: MotionTime = MotionTime(0);

    #[inline]
    pub fn from_micros(micros: i64) -> Self {
        MotionTime(micros)
    }

    #[inline]
    pub fn from_millis(millis: i64) -> Self {
        MotionTime(millis * 1000)
    }

    #[inline]
    pub fn from_secs_f64(secs: f64) -> Self {
        MotionTime((secs * 1_000_000.0) as i64)
    }

    #[inline]
    pub fn as_micros(self) -> i64 {
        self.0
    }

    #[inline]
    pub fn as_millis(self) -> i64 {
        self.0 / 1000
    }

    #[inline]
    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / 1_000_000.0
    }

    /// Elapsed time since `earlier`, zero if `earlier` is in the future
    #[inline]
    pub fn since(self, earlier: MotionTime) -> Duration {
        self - earlier
    }

    #[inline]
    pub fn saturating_add(self, duration: Duration) -> Self {
        MotionTime(self.0.saturating_add(duration.as_micros() as i64))
    }
}

impl Add<Duration> for MotionTime {
    type Output = MotionTime;

    #[inline]
    fn add(self, rhs: Duration) -> Self::Output {
        MotionTime(self.0 + rhs.as_micros() as i64)
    }
}

impl Sub<MotionTime> for MotionTime {
    type Output = Duration;

    #[inline]
    fn sub(self, rhs: MotionTime) -> Self::Output {
        let diff = self.0 - rhs.0;
        if diff >= 0 {
            Duration::from_micros(diff as u64)
        } else {
            Duration::ZERO
        }
    }
}

impl std::fmt::Debug for MotionTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "t({:.3}ms)", self.0 as f64 / 1000.0)
    }
}

/// Source of motion time for timers
pub trait Clock: Send + Sync {
    fn now(&self) -> MotionTime;
}

/// Monotonic clock backed by the OS
#[derive(Debug, Clone)]
pub struct SystemClock {
    epoch: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        SystemClock {
            epoch: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> MotionTime {
        MotionTime::from_micros(self.epoch.elapsed().as_micros() as i64)
    }
}

/// Manually driven clock. Clones share the same time source.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    value: Arc<Mutex<MotionTime>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(t: MotionTime) -> Self {
        ManualClock {
            value: Arc::new(Mutex::new(t)),
        }
    }

    /// Move the clock forward
    pub fn advance(&self, dt: Duration) -> MotionTime {
        let mut value = self.value.lock();
        *value = value.saturating_add(dt);
        *value
    }

    /// Jump to an absolute time. Backwards jumps are ignored.
    pub fn set(&self, t: MotionTime) {
        let mut value = self.value.lock();
        if t > *value {
            *value = t;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> MotionTime {
        *self.value.lock()
    }
}

/// Shared clock handle
pub type SharedClock = Arc<dyn Clock>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_motion_time_sub_saturates() {
        let a = MotionTime::from_millis(100);
        let b = MotionTime::from_millis(250);

        assert_eq!(b - a, Duration::from_millis(150));
        assert_eq!(a - b, Duration::ZERO);
    }

    #[test]
    fn test_manual_clock_shared() {
        let clock = ManualClock::new();
        let other = clock.clone();

        clock.advance(Duration::from_millis(33));
        assert_eq!(other.now(), MotionTime::from_millis(33));

        other.set(MotionTime::from_millis(10));
        assert_eq!(clock.now(), MotionTime::from_millis(33));
    }

    #[test]
    fn test_system_clock_monotonic() {
        let clock = SystemClock::new();
        let t1 = clock.now();
        std::thread::sleep(Duration::from_millis(2));
        let t2 = clock.now();

        assert!(t2 > t1);
    }
}
