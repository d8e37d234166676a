//! Repository for the `rds_instances` registry table.

use bcp_core::types::DbId;
use sqlx::PgPool;

use crate::models::rds_instance::{InstanceListQuery, RdsInstance};

/// Column list for `rds_instances` queries.
const COLUMNS: &str = "\
    id, provider_instance_id, name, engine, engine_version, status, region, \
    created_at, updated_at";

/// Maximum page size for instance listing.
const MAX_LIMIT: i64 = 200;

/// Default page size for instance listing.
const DEFAULT_LIMIT: i64 = 50;

/// Read operations over the instance registry.
pub struct InstanceRepo;

impl InstanceRepo {
    /// Fetch an instance by primary key.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<RdsInstance>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM rds_instances WHERE id = $1");
        sqlx::query_as::<_, RdsInstance>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Whether an instance row exists.
    pub async fn exists(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM rds_instances WHERE id = $1)")
            .bind(id)
            .fetch_one(pool)
            .await
    }

    /// List registered instances with optional engine/region filters.
    pub async fn list(
        pool: &PgPool,
        params: &InstanceListQuery,
    ) -> Result<Vec<RdsInstance>, sqlx::Error> {
        let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        let offset = params.offset.unwrap_or(0).max(0);

        let mut conditions: Vec<String> = Vec::new();
        let mut bind_idx = 1u32;
        let mut binds: Vec<String> = Vec::new();

        if let Some(ref engine) = params.engine {
            conditions.push(format!("engine = ${bind_idx}"));
            bind_idx += 1;
            binds.push(engine.clone());
        }
        if let Some(ref region) = params.region {
            conditions.push(format!("region = ${bind_idx}"));
            bind_idx += 1;
            binds.push(region.clone());
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let query = format!(
            "SELECT {COLUMNS} FROM rds_instances {where_clause} \
             ORDER BY name ASC \
             LIMIT ${bind_idx} OFFSET ${}",
            bind_idx + 1
        );

        let mut q = sqlx::query_as::<_, RdsInstance>(&query);
        for value in &binds {
            q = q.bind(value);
        }
        q.bind(limit).bind(offset).fetch_all(pool).await
    }
}
