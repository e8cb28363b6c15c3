//! [`ResourceLookup`] over Postgres and the local filesystem.

use std::path::Path;

use async_trait::async_trait;
use cms_core::conflict::ResourceLookup;
use cms_core::error::CoreError;
use cms_db::repositories::{ModuleMigrationRepo, ModuleRecordRepo, PermissionRepo, SchemaRepo};
use cms_db::DbPool;

pub struct PgResourceLookup {
    pool: DbPool,
}

impl PgResourceLookup {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn db_error(err: sqlx::Error) -> CoreError {
    CoreError::Internal(format!("Resource lookup query failed: {err}"))
}

#[async_trait]
impl ResourceLookup for PgResourceLookup {
    async fn registered_modules(&self, code: &str, slug: &str) -> Result<Vec<String>, CoreError> {
        let records = ModuleRecordRepo::find_conflicting(&self.pool, code, slug)
            .await
            .map_err(db_error)?;

        let mut found = Vec::new();
        for record in records {
            if record.code_module == code {
                found.push(format!("code_module={}", record.code_module));
            }
            if record.slug == slug {
                found.push(format!("slug={}", record.slug));
            }
        }
        Ok(found)
    }

    async fn table_exists(&self, table: &str) -> Result<bool, CoreError> {
        SchemaRepo::table_exists(&self.pool, table)
            .await
            .map_err(db_error)
    }

    async fn directory_exists(&self, path: &Path) -> Result<bool, CoreError> {
        tokio::fs::try_exists(path)
            .await
            .map_err(|e| CoreError::Internal(format!("Cannot stat {}: {e}", path.display())))
    }

    async fn migrations_mentioning(&self, needle: &str) -> Result<Vec<String>, CoreError> {
        ModuleMigrationRepo::names_containing(&self.pool, needle)
            .await
            .map_err(db_error)
    }

    async fn permissions_with_prefix(&self, prefix: &str) -> Result<Vec<String>, CoreError> {
        PermissionRepo::names_with_prefix(&self.pool, prefix)
            .await
            .map_err(db_error)
    }
}
