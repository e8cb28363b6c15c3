//! Repository for the `module_migrations` table.

use sqlx::{PgConnection, PgPool};

use crate::models::module_migration::ModuleMigration;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, name, module_code, checksum, applied_at";

/// Provides module migration bookkeeping.
pub struct ModuleMigrationRepo;

impl ModuleMigrationRepo {
    /// Record an applied migration on the caller's connection.
    pub async fn record(
        conn: &mut PgConnection,
        name: &str,
        module_code: &str,
        checksum: &str,
    ) -> Result<ModuleMigration, sqlx::Error> {
        let query = format!(
            "INSERT INTO module_migrations (name, module_code, checksum)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ModuleMigration>(&query)
            .bind(name)
            .bind(module_code)
            .bind(checksum)
            .fetch_one(conn)
            .await
    }

    /// Migrations applied for a module, oldest first.
    pub async fn list_for_module(
        pool: &PgPool,
        module_code: &str,
    ) -> Result<Vec<ModuleMigration>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM module_migrations WHERE module_code = $1 ORDER BY name ASC"
        );
        sqlx::query_as::<_, ModuleMigration>(&query)
            .bind(module_code)
            .fetch_all(pool)
            .await
    }

    /// Names of applied migrations containing `needle` as a plain substring.
    pub async fn names_containing(pool: &PgPool, needle: &str) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT name FROM module_migrations WHERE strpos(name, $1) > 0 ORDER BY name",
        )
        .bind(needle)
        .fetch_all(pool)
        .await
    }

    /// Forget one migration record. Returns `true` if a row was removed.
    pub async fn delete_by_name(pool: &PgPool, name: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM module_migrations WHERE name = $1")
            .bind(name)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Forget every migration of a module.
    pub async fn delete_for_module(pool: &PgPool, module_code: &str) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM module_migrations WHERE module_code = $1")
            .bind(module_code)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
