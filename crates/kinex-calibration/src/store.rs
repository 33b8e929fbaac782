//! Calibration persistence contract
//!
//! The core never performs I/O. Hosts implement [`CalibrationStore`] over
//! their own storage; [`MemoryCalibrationStore`] keeps results in process.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use kinex_core::{ExerciseType, UserId};

use crate::CalibrationResult;

/// Storage keyed by `(user_id, exercise)`. Saving replaces the previous result.
pub trait CalibrationStore: Send + Sync {
    fn save(&self, result: CalibrationResult);

    fn load(&self, user_id: &UserId, exercise: ExerciseType) -> Option<CalibrationResult>;

    fn remove(&self, user_id: &UserId, exercise: ExerciseType) -> Option<CalibrationResult>;

    /// Mark a stored result unusable. Returns false if nothing was stored.
    fn invalidate(&self, user_id: &UserId, exercise: ExerciseType) -> bool;

    /// Stored result only if it is still valid at `now`
    fn load_valid(
        &self,
        user_id: &UserId,
        exercise: ExerciseType,
        now: DateTime<Utc>,
    ) -> Option<CalibrationResult> {
        self.load(user_id, exercise).filter(|r| r.is_valid_at(now))
    }
}

/// In-process store
#[derive(Debug, Default)]
pub struct MemoryCalibrationStore {
    results: RwLock<HashMap<(UserId, ExerciseType), CalibrationResult>>,
}

impl MemoryCalibrationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.results.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.read().is_empty()
    }
}

impl CalibrationStore for MemoryCalibrationStore {
    fn save(&self, result: CalibrationResult) {
        let key = (result.user_id.clone(), result.exercise);
        self.results.write().insert(key, result);
    }

    fn load(&self, user_id: &UserId, exercise: ExerciseType) -> Option<CalibrationResult> {
        self.results
            .read()
            .get(&(user_id.clone(), exercise))
            .cloned()
    }

    fn remove(&self, user_id: &UserId, exercise: ExerciseType) -> Option<CalibrationResult> {
        self.results.write().remove(&(user_id.clone(), exercise))
    }

    fn invalidate(&self, user_id: &UserId, exercise: ExerciseType) -> bool {
        match self.results.write().get_mut(&(user_id.clone(), exercise)) {
            Some(result) => {
                result.invalidate();
                true
            }
            None => false,
        }
    }
}
