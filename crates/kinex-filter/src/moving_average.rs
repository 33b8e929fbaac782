//! Fixed-window moving average

use std::collections::VecDeque;

/// Mean of the last `window` measurements
#[derive(Debug, Clone)]
pub struct MovingAverage {
    window: usize,
    values: VecDeque<f32>,
    sum: f32,
}

impl MovingAverage {
    /// A window of zero is treated as one
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            window,
            values: VecDeque::with_capacity(window),
            sum: 0.0,
        }
    }

    pub fn update(&mut self, value: f32) -> f32 {
        if !value.is_finite() {
            return self.value().unwrap_or(0.0);
        }
        if self.values.len() == self.window {
            if let Some(old) = self.values.pop_front() {
                self.sum -= old;
            }
        }
        self.values.push_back(value);
        self.sum += value;
        self.sum / self.values.len() as f32
    }

    /// Current mean, `None` before the first value
    pub fn value(&self) -> Option<f32> {
        if self.values.is_empty() {
            None
        } else {
            Some(self.sum / self.values.len() as f32)
        }
    }

    /// Window is full
    pub fn is_stable(&self) -> bool {
        self.values.len() == self.window
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn reset(&mut self) {
        self.values.clear();
        self.sum = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_mean() {
        let mut ma = MovingAverage::new(3);
        assert_eq!(ma.value(), None);
        assert_eq!(ma.update(3.0), 3.0);
        assert_eq!(ma.update(6.0), 4.5);
        assert!(!ma.is_stable());
        assert_eq!(ma.update(9.0), 6.0);
        assert!(ma.is_stable());
        // 3.0 drops out
        assert_eq!(ma.update(12.0), 9.0);
    }

    #[test]
    fn test_reset_clears() {
        let mut ma = MovingAverage::new(2);
        ma.update(1.0);
        ma.update(2.0);
        ma.reset();
        assert!(!ma.is_stable());
        assert_eq!(ma.update(10.0), 10.0);
    }

    #[test]
    fn test_zero_window() {
        let mut ma = MovingAverage::new(0);
        assert_eq!(ma.window(), 1);
        ma.update(5.0);
        assert!(ma.is_stable());
    }
}
