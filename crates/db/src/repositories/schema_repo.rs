//! Live-schema operations for generated module tables.

use cms_core::schema::{drop_table_sql, MigrationUnit};
use sqlx::PgPool;

use crate::models::module_migration::ModuleMigration;
use crate::repositories::ModuleMigrationRepo;

/// Inspects and changes the live schema.
pub struct SchemaRepo;

impl SchemaRepo {
    /// Whether a table named `table` exists in the current schema.
    pub async fn table_exists(pool: &PgPool, table: &str) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS (
                SELECT 1 FROM information_schema.tables
                WHERE table_schema = current_schema() AND table_name = $1
             )",
        )
        .bind(table)
        .fetch_one(pool)
        .await
    }

    /// Column names of `table` in ordinal order. Empty if the table is
    /// missing.
    pub async fn column_names(pool: &PgPool, table: &str) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT column_name::text FROM information_schema.columns
             WHERE table_schema = current_schema() AND table_name = $1
             ORDER BY ordinal_position",
        )
        .bind(table)
        .fetch_all(pool)
        .await
    }

    /// Execute a migration and record it, atomically.
    ///
    /// If the SQL fails nothing is recorded and the table is not created.
    pub async fn apply_migration(
        pool: &PgPool,
        unit: &MigrationUnit,
        module_code: &str,
    ) -> Result<ModuleMigration, sqlx::Error> {
        let mut tx = pool.begin().await?;
        // Through the trait so the future stays `Send` for axum handlers.
        sqlx::Executor::execute(&mut *tx, sqlx::raw_sql(&unit.sql)).await?;
        let record = ModuleMigrationRepo::record(
            &mut *tx,
            &unit.record_name(),
            module_code,
            &unit.checksum(),
        )
        .await?;
        tx.commit().await?;

        tracing::info!(
            module_code = %module_code,
            migration = %record.name,
            table = %unit.table,
            "Module migration applied",
        );
        Ok(record)
    }

    /// Drop `table` if it exists.
    pub async fn drop_table(pool: &PgPool, table: &str) -> Result<(), sqlx::Error> {
        sqlx::query(&drop_table_sql(table)).execute(pool).await?;
        Ok(())
    }
}
