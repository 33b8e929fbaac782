//! Kinex Runtime - per-session pipeline
//!
//! A [`Session`] owns one user's angle engine, filters, calibration
//! manager, rep detector and safety monitor. Every frame runs the stages in
//! order:
//! 1. Measure the exercise joint
//! 2. Smooth the angle
//! 3. Advance the rep phase machine
//! 4. Check safety on rep completion
//!
//! Sessions are single-owner. Hosts with a fast pose detector hand frames
//! over through a [`LatestFrame`] mailbox so the pipeline always sees the
//! newest pose.

pub mod latest_frame;
pub mod observability;
pub mod session;

pub use latest_frame::*;
pub use observability::{init_tracing, LogFormat, LoggingConfig};
pub use session::*;
