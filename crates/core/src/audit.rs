//! Audit trail constants and utility functions.
//!
//! This module lives in `core` (zero internal deps) so it can be used by both
//! the API/repository layer and the recovery engine. Audit records are
//! fire-and-forget: a failure to persist one must never fail the operation
//! that produced it (enforced at the sink, not here).

use crate::hashing;

// ---------------------------------------------------------------------------
// Operation type constants
// ---------------------------------------------------------------------------

/// Known operation types for audit entries.
pub mod operation_types {
    pub const CREATE: &str = "create";
    pub const UPDATE: &str = "update";
    pub const DELETE: &str = "delete";
    pub const EXECUTE: &str = "execute";
}

// ---------------------------------------------------------------------------
// Operation status constants
// ---------------------------------------------------------------------------

/// Outcome of the audited operation.
pub mod operation_status {
    pub const SUCCESS: &str = "success";
    pub const FAILED: &str = "failed";
}

// ---------------------------------------------------------------------------
// Risk level constants
// ---------------------------------------------------------------------------

/// Risk classification shown in the compliance dashboard.
pub mod risk_levels {
    pub const LOW: &str = "low";
    pub const MEDIUM: &str = "medium";
    pub const HIGH: &str = "high";
}

// ---------------------------------------------------------------------------
// Resource type constants
// ---------------------------------------------------------------------------

/// Known resource types referenced by audit entries.
pub mod resource_types {
    pub const RECOVERY_TASK: &str = "recovery_task";
    pub const RDS_INSTANCE: &str = "rds_instance";
}

// ---------------------------------------------------------------------------
// Risk classification
// ---------------------------------------------------------------------------

/// Classify an audited operation into a risk level.
///
/// Failed executions and deletions are high risk; everything else the
/// platform records is medium. Reads are not audited at all.
pub fn risk_level_for(operation_type: &str, status: &str) -> &'static str {
    match (operation_type, status) {
        (operation_types::EXECUTE, operation_status::FAILED) => risk_levels::HIGH,
        (operation_types::DELETE, _) => risk_levels::HIGH,
        _ => risk_levels::MEDIUM,
    }
}

// ---------------------------------------------------------------------------
// Integrity hash computation
// ---------------------------------------------------------------------------

/// Known seed value for the first entry in the hash chain.
const CHAIN_SEED: &str = "BCP_AUDIT_CHAIN_SEED_V1";

/// Compute the SHA-256 integrity hash for an audit entry.
///
/// `prev_hash` is the integrity hash of the previous entry, or `None` for the
/// first entry in the chain (which uses a known seed value). `entry_data` is
/// a canonical string representation of the entry's content.
pub fn compute_integrity_hash(prev_hash: Option<&str>, entry_data: &str) -> String {
    let prev = prev_hash.unwrap_or(CHAIN_SEED);
    let combined = format!("{prev}|{entry_data}");
    hashing::sha256_hex(combined.as_bytes())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
