//! Latest-frame mailbox
//!
//! The pose detector publishes faster than a slow consumer may read. Only
//! the newest unread frame is kept; older ones are overwritten and counted.

use std::sync::Arc;

use parking_lot::Mutex;

use kinex_core::PoseFrame;

#[derive(Debug, Default)]
struct Slot {
    frame: Option<PoseFrame>,
    published: u64,
    overwritten: u64,
}

/// Single-slot mailbox. Clones share the same slot.
#[derive(Debug, Clone, Default)]
pub struct LatestFrame {
    slot: Arc<Mutex<Slot>>,
}

impl LatestFrame {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a frame. Returns true if an unread frame was overwritten.
    pub fn publish(&self, frame: PoseFrame) -> bool {
        let mut slot = self.slot.lock();
        slot.published += 1;
        let replaced = slot.frame.replace(frame).is_some();
        if replaced {
            slot.overwritten += 1;
        }
        replaced
    }

    /// Take the newest frame, leaving the slot empty
    pub fn take(&self) -> Option<PoseFrame> {
        self.slot.lock().frame.take()
    }

    pub fn has_frame(&self) -> bool {
        self.slot.lock().frame.is_some()
    }

    /// Frames published so far
    pub fn published(&self) -> u64 {
        self.slot.lock().published
    }

    /// Frames dropped because a newer one arrived before they were read
    pub fn overwritten(&self) -> u64 {
        self.slot.lock().overwritten
    }
}
