//! Kinex Core - Fundamental types and primitives
//!
//! This crate defines the types shared by every stage of the motion pipeline:
//! - Landmarks and pose frames (MediaPipe Pose indexing)
//! - Joint, side, movement and exercise identifiers
//! - Angle samples with clamped angle/confidence
//! - Time primitives (MotionTime, Clock)
//! - The error taxonomy for setup-time failures

pub mod error;
pub mod exercise;
pub mod id;
pub mod joint;
pub mod landmark;
pub mod sample;
pub mod time;

pub use error::*;
pub use exercise::*;
pub use id::*;
pub use joint::*;
pub use landmark::*;
pub use sample::*;
pub use time::*;
