//! Kinex Test Harness - Simulated poses and end-to-end validation
//!
//! This crate provides:
//! - A pose simulator that renders 33-landmark frames from joint angles
//! - Tracking chaos (jitter, dropped frames, occlusion, depth noise)
//! - Exercise scenarios as angle trajectories
//! - End-to-end session and filter-worker harnesses

pub mod chaos;
pub mod integration;
pub mod scenario;
pub mod simulator;

pub use chaos::*;
pub use integration::*;
pub use scenario::*;
pub use simulator::*;
