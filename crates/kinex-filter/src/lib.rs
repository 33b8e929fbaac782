//! Kinex Smoothing Layer
//!
//! Independent filter state per (joint, side):
//!
//! - [`AngleKalman`]: scalar Kalman filter with per-joint noise tuning
//! - [`MovingAverage`]: fixed-window mean
//! - [`FilterBank`]: the per-session map of filters
//! - [`FilterWorker`]: angle measurement and filtering on a tokio task,
//!   fed latest-frame-wins through a typed request/response channel

pub mod bank;
pub mod kalman;
pub mod moving_average;
pub mod worker;

pub use bank::*;
pub use kalman::*;
pub use moving_average::*;
pub use worker::*;
