//! Recovery drill engine.
//!
//! Drives a recovery task from creation through the four-phase pipeline
//! (clone, wait-for-ready, validate, complete) and hosts the two periodic
//! sweeps: launching due scheduled drills and reaping stuck ones.
//!
//! The engine talks to the outside world exclusively through ports
//! ([`store::TaskStore`], [`sink::AuditSink`], [`bcp_cloud::RdsProvider`],
//! [`clock::Clock`]) so tests can drive it entirely in memory.

pub mod clock;
pub mod config;
pub mod orchestrator;
pub mod running;
pub mod sink;
pub mod store;
pub mod sweeps;

pub use clock::{Clock, SystemClock};
pub use config::EngineConfig;
pub use orchestrator::{ExecuteReceipt, RecoveryOrchestrator};
pub use running::{RunningEntry, RunningSet};
pub use sink::{AuditEvent, AuditSink, PgAuditSink};
pub use store::{PgTaskStore, StoreError, TaskStore};
pub use sweeps::{DueTaskSweep, StuckTaskReaper};
