// src/watch/accumulator.rs

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

/// Relevant paths seen during one debounce window, with occurrence counts.
pub type ChangeSet = BTreeMap<String, usize>;

/// Counter map shared between the event loop (writer) and the debounced
/// callback (reader).
///
/// One mutex guards both `record` and `drain_and_reset`, so a drain never
/// observes a half-applied increment. The lock is never held across an
/// await point.
#[derive(Debug, Default)]
pub struct ChangeAccumulator {
    changes: Mutex<ChangeSet>,
}

impl ChangeAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one more occurrence of `path` in the current window.
    pub fn record(&self, path: &str) {
        let mut changes = self.changes.lock().unwrap_or_else(PoisonError::into_inner);
        *changes.entry(path.to_string()).or_insert(0) += 1;
    }

    /// Swap in an empty window and hand back the previous one.
    pub fn drain_and_reset(&self) -> ChangeSet {
        let mut changes = self.changes.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::take(&mut *changes)
    }

    pub fn is_empty(&self) -> bool {
        self.changes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }
}
