//! Repository for the `modules` registry table.

use cms_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::module_record::{CreateModuleRecord, ModuleRecord};
use crate::repositories::PermissionRepo;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, code_module, slug, status, name, description, option_seo, \
                       option_trash, properties, created_by, created_at, updated_at";

/// Provides CRUD operations for module records.
pub struct ModuleRecordRepo;

impl ModuleRecordRepo {
    /// Insert a module record on the caller's connection.
    pub async fn create(
        conn: &mut PgConnection,
        input: &CreateModuleRecord,
    ) -> Result<ModuleRecord, sqlx::Error> {
        let query = format!(
            "INSERT INTO modules
                (code_module, slug, status, name, description, option_seo, option_trash,
                 properties, created_by)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ModuleRecord>(&query)
            .bind(&input.code_module)
            .bind(&input.slug)
            .bind(&input.status)
            .bind(&input.name)
            .bind(&input.description)
            .bind(input.option_seo)
            .bind(input.option_trash)
            .bind(&input.properties)
            .bind(input.created_by)
            .fetch_one(conn)
            .await
    }

    /// Insert the record and its permissions in one transaction.
    ///
    /// The `uq_modules_code_module` constraint rejects a second record for
    /// the same code even if two runs got past the conflict check.
    pub async fn create_with_permissions(
        pool: &PgPool,
        input: &CreateModuleRecord,
        permissions: &[String],
    ) -> Result<ModuleRecord, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let record = Self::create(&mut *tx, input).await?;
        PermissionRepo::create_many(&mut *tx, permissions, &record.code_module).await?;
        tx.commit().await?;
        Ok(record)
    }

    /// Find a module by internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<ModuleRecord>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM modules WHERE id = $1");
        sqlx::query_as::<_, ModuleRecord>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a module by its code.
    pub async fn find_by_code(
        pool: &PgPool,
        code: &str,
    ) -> Result<Option<ModuleRecord>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM modules WHERE code_module = $1");
        sqlx::query_as::<_, ModuleRecord>(&query)
            .bind(code)
            .fetch_optional(pool)
            .await
    }

    /// Modules already registered under `code` or under `slug`.
    pub async fn find_conflicting(
        pool: &PgPool,
        code: &str,
        slug: &str,
    ) -> Result<Vec<ModuleRecord>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM modules
             WHERE code_module = $1 OR slug = $2
             ORDER BY id ASC"
        );
        sqlx::query_as::<_, ModuleRecord>(&query)
            .bind(code)
            .bind(slug)
            .fetch_all(pool)
            .await
    }

    /// List all modules, newest first.
    pub async fn list(pool: &PgPool) -> Result<Vec<ModuleRecord>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM modules ORDER BY created_at DESC, id DESC");
        sqlx::query_as::<_, ModuleRecord>(&query).fetch_all(pool).await
    }

    /// Delete a module record together with the permissions it owns.
    ///
    /// Returns `true` if the record existed.
    pub async fn delete_with_permissions(
        pool: &PgPool,
        id: DbId,
        code: &str,
    ) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;
        sqlx::query("DELETE FROM permissions WHERE module_code = $1")
            .bind(code)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM modules WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }
}
