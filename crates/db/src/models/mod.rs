//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - A `Deserialize` create DTO for inserts
//! - Query parameter structs for list endpoints

pub mod audit;
pub mod rds_instance;
pub mod recovery_task;
pub mod status;
