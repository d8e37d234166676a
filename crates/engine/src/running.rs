//! In-memory registry of currently executing drills.
//!
//! Owned by the orchestrator instance and shared with the reaper by `Arc`;
//! deliberately not a module-level global. Process-local and unreplicated:
//! a multi-instance deployment needs either a single active orchestrator or
//! an externalized registry, which is out of scope here.

use std::collections::HashMap;
use std::sync::Mutex;

use bcp_core::types::{DbId, Timestamp};

/// Bookkeeping for one executing drill.
#[derive(Debug, Clone)]
pub struct RunningEntry {
    pub started_at: Timestamp,
    pub actor: DbId,
}

/// Registry of tasks currently driven by a pipeline.
///
/// Used for the duplicate-execution guard and timeout detection. Removal of
/// an absent entry is a no-op: the reaper and `cancel` may both race the
/// pipeline's own cleanup near a boundary.
#[derive(Default)]
pub struct RunningSet {
    inner: Mutex<HashMap<DbId, RunningEntry>>,
}

impl RunningSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a task as executing.
    pub fn insert(&self, task_id: DbId, entry: RunningEntry) {
        self.inner.lock().expect("running set poisoned").insert(task_id, entry);
    }

    /// Deregister a task. Absent entries are ignored.
    pub fn remove(&self, task_id: DbId) -> Option<RunningEntry> {
        self.inner.lock().expect("running set poisoned").remove(&task_id)
    }

    /// Whether a task is currently registered.
    pub fn contains(&self, task_id: DbId) -> bool {
        self.inner.lock().expect("running set poisoned").contains_key(&task_id)
    }

    /// Snapshot of all entries, for the reaper to iterate without holding
    /// the lock across awaits.
    pub fn snapshot(&self) -> Vec<(DbId, RunningEntry)> {
        self.inner
            .lock()
            .expect("running set poisoned")
            .iter()
            .map(|(id, entry)| (*id, entry.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("running set poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
