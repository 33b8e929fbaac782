//! Error types for Kinex
//!
//! Per-frame conditions (missing landmarks, degenerate geometry, too few
//! calibration samples) are not errors; they surface as `None` or
//! zero-confidence values. Everything here is a configuration or protocol
//! misuse that must fail loudly at setup.

use thiserror::Error;

use crate::{ExerciseType, JointType, Movement, Side};

/// Core Kinex errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum KinexError {
    // Configuration errors
    #[error("Unknown joint: {0}")]
    UnknownJoint(String),

    #[error("Unknown exercise: {0}")]
    UnknownExercise(String),

    #[error("Unknown side: {0}")]
    UnknownSide(String),

    #[error("Joint map has no entry for {0}")]
    IncompleteJointMap(JointType),

    #[error("Landmark index {index} out of range for {joint} (frame holds {available})")]
    LandmarkIndexOutOfRange {
        joint: JointType,
        index: usize,
        available: usize,
    },

    #[error("No normal range for {joint} {movement}")]
    UnknownMovement { joint: JointType, movement: Movement },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // Calibration protocol errors
    #[error("Calibration not started")]
    CalibrationNotStarted,

    #[error("Calibration already moved to the max-ROM phase")]
    CalibrationPhaseClosed,

    #[error("Calibration for {exercise} {joint} ({side}) is expired or invalidated")]
    CalibrationExpired {
        exercise: ExerciseType,
        joint: JointType,
        side: Side,
    },

    #[error("Calibration is for {actual}, expected {expected}")]
    CalibrationMismatch {
        expected: ExerciseType,
        actual: ExerciseType,
    },

    // Worker errors
    #[error("Filter worker stopped")]
    WorkerStopped,
}

/// Result type for Kinex operations
pub type KinexResult<T> = Result<T, KinexError>;
