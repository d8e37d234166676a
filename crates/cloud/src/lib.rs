//! Cloud database provider client.
//!
//! [`provider::RdsProvider`] is the port the recovery engine talks to;
//! [`http::HttpRdsProvider`] is the production implementation over the
//! provider's REST management API.

pub mod error;
pub mod http;
pub mod provider;

pub use error::ProviderError;
pub use provider::{
    BackupSelector, CloneReceipt, CloneRequest, InstanceDescription, RdsProvider,
    ValidationReport, INSTANCE_STATUS_RUNNING,
};
