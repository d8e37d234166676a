use crate::types::DbId;

/// Domain-level error taxonomy.
///
/// `NotFound` and `Conflict` surface synchronously to API callers; `Provider`
/// and `Timeout` originate inside the recovery pipeline and are persisted
/// onto the task record rather than returned over HTTP.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
