//! Kinex Rep Detector
//!
//! One generic phase machine ([`RepDetector`]) per active exercise. The
//! exercise-specific part is data ([`ExerciseProfile`], built from the
//! catalog or a calibration) plus an injected [`RepStrategy`] holding the
//! six transition predicates.

pub mod accuracy;
pub mod detector;
pub mod phase;
pub mod profile;
pub mod strategy;

pub use accuracy::{rep_accuracy, AccuracyInput};
pub use detector::*;
pub use phase::*;
pub use profile::*;
pub use strategy::*;
