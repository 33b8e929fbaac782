//! Kinex Calibration Manager
//!
//! Two-phase guided sampling (resting pose, then max range of motion) that
//! produces a [`CalibrationResult`] with per-user [`JointThresholds`].
//!
//! Insufficient data is not an error: [`CalibrationManager::complete`]
//! returns `None` and the caller asks the user to retry.

pub mod manager;
pub mod result;
pub mod stats;
pub mod store;
pub mod thresholds;

pub use manager::*;
pub use result::*;
pub use store::*;
pub use thresholds::*;
