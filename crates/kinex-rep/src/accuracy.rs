//! Per-rep accuracy score
//!
//! ```text
//! accuracy = 100 · (0.5·closeness + 0.3·hold_quality + 0.2·confidence)
//!
//! closeness    = 1 − |peak − target| / total_rom
//! hold_quality = min(1, held / required) · (1 − hold_sd / 10°)
//! confidence   = mean sample confidence over the rep
//! ```
//!
//! Each term is clamped to [0, 1], so the score is in [0, 100] and grows
//! with closeness, hold quality and confidence independently.

use std::time::Duration;

const CLOSENESS_WEIGHT: f32 = 0.5;
const HOLD_WEIGHT: f32 = 0.3;
const CONFIDENCE_WEIGHT: f32 = 0.2;

/// Hold angle spread at which hold quality reaches zero (degrees)
const HOLD_SPREAD_LIMIT: f32 = 10.0;

/// Inputs gathered while the rep was in progress
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AccuracyInput {
    pub peak_angle: f32,
    pub target_angle: f32,
    pub total_rom: f32,
    pub held: Duration,
    pub required_hold: Duration,
    /// Standard deviation of the angle while holding
    pub hold_std_dev: f32,
    pub mean_confidence: f32,
}

fn unit(x: f32) -> f32 {
    if x.is_nan() {
        0.0
    } else {
        x.clamp(0.0, 1.0)
    }
}

pub fn closeness(peak_angle: f32, target_angle: f32, total_rom: f32) -> f32 {
    if total_rom <= 0.0 {
        return 0.0;
    }
    unit(1.0 - (peak_angle - target_angle).abs() / total_rom)
}

pub fn hold_quality(held: Duration, required: Duration, hold_std_dev: f32) -> f32 {
    let duration_part = if required.is_zero() {
        1.0
    } else {
        unit(held.as_secs_f32() / required.as_secs_f32())
    };
    duration_part * unit(1.0 - hold_std_dev / HOLD_SPREAD_LIMIT)
}

/// Score in [0, 100]
pub fn rep_accuracy(input: &AccuracyInput) -> f32 {
    let c = closeness(input.peak_angle, input.target_angle, input.total_rom);
    let h = hold_quality(input.held, input.required_hold, input.hold_std_dev);
    let conf = unit(input.mean_confidence);
    100.0 * (CLOSENESS_WEIGHT * c + HOLD_WEIGHT * h + CONFIDENCE_WEIGHT * conf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn perfect() -> AccuracyInput {
        AccuracyInput {
            peak_angle: 90.0,
            target_angle: 90.0,
            total_rom: 100.0,
            held: Duration::from_millis(500),
            required_hold: Duration::from_millis(500),
            hold_std_dev: 0.0,
            mean_confidence: 1.0,
        }
    }

    #[test]
    fn test_perfect_rep() {
        assert!((rep_accuracy(&perfect()) - 100.0).abs() < 1e-3);
    }

    #[test]
    fn test_terms() {
        assert!((closeness(100.0, 90.0, 100.0) - 0.9).abs() < 1e-5);
        assert_eq!(closeness(0.0, 90.0, 50.0), 0.0);
        assert!((hold_quality(Duration::from_millis(250), Duration::from_millis(500), 5.0) - 0.25).abs() < 1e-5);
    }

    proptest! {
        #[test]
        fn prop_bounded(
            peak in 0.0f32..180.0,
            rom in 10.0f32..180.0,
            held_ms in 0u64..3000,
            sd in 0.0f32..30.0,
            conf in 0.0f32..1.0,
        ) {
            let a = rep_accuracy(&AccuracyInput {
                peak_angle: peak,
                target_angle: 90.0,
                total_rom: rom,
                held: Duration::from_millis(held_ms),
                required_hold: Duration::from_millis(500),
                hold_std_dev: sd,
                mean_confidence: conf,
            });
            prop_assert!((0.0..=100.0).contains(&a));
        }

        #[test]
        fn prop_monotonic_in_closeness(offset in 0.0f32..40.0, extra in 0.1f32..20.0) {
            let base = perfect();
            let near = AccuracyInput { peak_angle: 90.0 + offset, ..base };
            let far = AccuracyInput { peak_angle: 90.0 + offset + extra, ..base };
            prop_assert!(rep_accuracy(&near) > rep_accuracy(&far));
        }

        #[test]
        fn prop_monotonic_in_confidence(low in 0.0f32..0.9, delta in 0.05f32..0.1) {
            let base = perfect();
            let a = AccuracyInput { mean_confidence: low, ..base };
            let b = AccuracyInput { mean_confidence: low + delta, ..base };
            prop_assert!(rep_accuracy(&b) > rep_accuracy(&a));
        }
    }
}
