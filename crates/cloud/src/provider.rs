//! Provider port and wire types.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

/// Instance status string the provider reports once a clone is usable.
pub const INSTANCE_STATUS_RUNNING: &str = "Running";

/// Which backup artifact the drill target is reconstructed from.
///
/// The two variants are mutually exclusive by construction; the task's
/// restore type picks one at clone time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum BackupSelector {
    /// Restore from a named backup-set snapshot.
    BackupSet { backup_id: String },
    /// Restore to an arbitrary point in time from base backup + change logs.
    PointInTime {
        restore_time: chrono::DateTime<chrono::Utc>,
    },
}

/// Parameters for cloning a new instance from a backup.
#[derive(Debug, Clone, Serialize)]
pub struct CloneRequest {
    pub source_instance_id: String,
    pub target_name: String,
    pub backup: BackupSelector,
    pub instance_class: String,
    pub storage_size_gb: i32,
}

/// Provider acknowledgement of an accepted clone request.
#[derive(Debug, Clone, Deserialize)]
pub struct CloneReceipt {
    /// Provider-side ID of the instance being created.
    pub target_instance_id: String,
}

/// Provider's description of an instance.
#[derive(Debug, Clone, Deserialize)]
pub struct InstanceDescription {
    pub instance_id: String,
    pub status: String,
    pub engine: String,
    pub engine_version: String,
}

impl InstanceDescription {
    /// Whether the instance has finished provisioning and accepts queries.
    pub fn is_running(&self) -> bool {
        self.status == INSTANCE_STATUS_RUNNING
    }
}

/// Outcome of a data validation pass against a restored instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub success: bool,
    /// Raw per-rule results, stored verbatim on the task record.
    pub details: serde_json::Value,
}

/// Management operations the recovery engine needs from the cloud provider.
///
/// Every call can fail with a transient or permanent [`ProviderError`]; the
/// engine does not retry and treats any failure as a phase failure.
#[async_trait]
pub trait RdsProvider: Send + Sync {
    /// Describe an instance, or `None` if the provider does not know it.
    async fn get_instance(&self, instance_id: &str)
        -> Result<Option<InstanceDescription>, ProviderError>;

    /// Request a new instance cloned from a backup of the source.
    async fn clone_instance(&self, request: &CloneRequest)
        -> Result<CloneReceipt, ProviderError>;

    /// Run data validation rules against a restored instance.
    async fn validate_data(
        &self,
        instance_id: &str,
        rules: &serde_json::Value,
    ) -> Result<ValidationReport, ProviderError>;

    /// Release a drill target instance.
    async fn delete_instance(&self, instance_id: &str) -> Result<(), ProviderError>;
}
