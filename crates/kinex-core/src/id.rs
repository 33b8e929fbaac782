//! Identity types for Kinex

use std::fmt;

use serde::{Deserialize, Serialize};

/// User identity as supplied by the host application
#[derive(Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    #[inline]
    pub fn new(id: impl Into<String>) -> Self {
        UserId(id.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "User({})", self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        UserId(s.to_string())
    }
}

/// Alert identity - unique within one safety monitor
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct AlertId(pub u64);

impl AlertId {
    pub const ZERO: AlertId = AlertId(0);

    #[inline]
    pub fn new(id: u64) -> Self {
        AlertId(id)
    }

    #[inline]
    pub fn next(self) -> Self {
        AlertId(self.0 + 1)
    }
}

impl fmt::Debug for AlertId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Alert({})", self.0)
    }
}

impl fmt::Display for AlertId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "alert-{}", self.0)
    }
}
