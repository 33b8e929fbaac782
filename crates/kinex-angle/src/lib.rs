//! Kinex Angle Engine
//!
//! Converts three ordered landmarks (proximal, vertex, distal) into the
//! joint angle at the vertex.
//!
//! # Methods
//!
//! - 2D: X-Y projection, ignores depth
//! - 3D: full vector angle
//! - Side: Y-Z projection for side-on cameras
//! - Hybrid: depth-weighted blend of 2D and 3D
//!
//! Degenerate geometry never fails; it yields a zero-confidence sample that
//! downstream stages treat like any other low-quality frame.

pub mod angle;
pub mod engine;
pub mod geometry;
pub mod joint_map;

pub use angle::*;
pub use engine::*;
pub use geometry::*;
pub use joint_map::*;
