//! Injectable time source.
//!
//! The orchestrator and sweeps never call `Utc::now()` directly; they go
//! through a [`Clock`] so tests can simulate elapsed hours without sleeping.

use bcp_core::types::Timestamp;

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Production clock backed by the system time.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        chrono::Utc::now()
    }
}
