//! Kinex Safety
//!
//! Range-of-motion assessment against AAOS reference values, and the
//! red-flag rules that watch a session for pain, excessive or shrinking
//! range, left/right imbalance, compensation, rapid movement and fatigue.
//!
//! Alerts are advisory. Stopping or pausing is the host's decision, made
//! from [`SafetyStatus`].

pub mod alert;
pub mod config;
pub mod monitor;
pub mod rom;
pub mod rules;

pub use alert::*;
pub use config::*;
pub use monitor::*;
pub use rom::*;
