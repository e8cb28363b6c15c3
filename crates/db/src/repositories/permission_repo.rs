//! Repository for the `permissions` table.

use sqlx::{PgConnection, PgPool};

use crate::models::permission::Permission;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, name, module_code, created_at";

/// Provides permission seeding, lookup and removal.
pub struct PermissionRepo;

impl PermissionRepo {
    /// Insert `names` owned by `module_code`. Runs on the caller's
    /// connection so it can share a transaction with the module record.
    pub async fn create_many(
        conn: &mut PgConnection,
        names: &[String],
        module_code: &str,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO permissions (name, module_code)
             SELECT unnest($1::text[]), $2",
        )
        .bind(names)
        .bind(module_code)
        .execute(conn)
        .await?;
        Ok(result.rows_affected())
    }

    /// Names of permissions starting with `prefix`.
    pub async fn names_with_prefix(
        pool: &PgPool,
        prefix: &str,
    ) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar("SELECT name FROM permissions WHERE starts_with(name, $1) ORDER BY name")
            .bind(prefix)
            .fetch_all(pool)
            .await
    }

    /// All permissions owned by a module.
    pub async fn list_for_module(
        pool: &PgPool,
        module_code: &str,
    ) -> Result<Vec<Permission>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM permissions WHERE module_code = $1 ORDER BY id ASC"
        );
        sqlx::query_as::<_, Permission>(&query)
            .bind(module_code)
            .fetch_all(pool)
            .await
    }

    /// Delete every permission starting with `prefix`. Returns the number
    /// of rows removed.
    pub async fn delete_with_prefix(pool: &PgPool, prefix: &str) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM permissions WHERE starts_with(name, $1)")
            .bind(prefix)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
