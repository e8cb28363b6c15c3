//! Undoing module side effects.
//!
//! Two callers share these primitives: the orchestrator unwinding a failed
//! run, and the delete endpoint removing a finished module.

use std::path::Path;

use cms_core::generation::{Compensation, CompensationOutcome};
use cms_core::module_config::module_dir;
use cms_core::naming::derive_names;
use cms_core::roles::module_permission_prefix;
use cms_db::models::module_record::ModuleRecord;
use cms_db::repositories::{
    ModuleMigrationRepo, ModuleRecordRepo, PermissionRepo, SchemaRepo,
};
use cms_db::DbPool;
use serde::Serialize;

use super::artifacts::remove_module_dir;
use crate::error::{AppError, AppResult};

/// Run compensations in the given order, continuing past failures.
pub async fn compensate(pool: &DbPool, log: Vec<Compensation>) -> Vec<CompensationOutcome> {
    let mut outcomes = Vec::with_capacity(log.len());
    for compensation in log {
        let result = apply(pool, &compensation).await;
        match &result {
            Ok(()) => tracing::info!(step = %compensation, "Compensation applied"),
            Err(e) => tracing::error!(step = %compensation, error = %e, "Compensation failed"),
        }
        outcomes.push(CompensationOutcome {
            compensation,
            succeeded: result.is_ok(),
            error: result.err(),
        });
    }
    outcomes
}

async fn apply(pool: &DbPool, compensation: &Compensation) -> Result<(), String> {
    match compensation {
        Compensation::DeleteRecord { module_id, code } => {
            ModuleRecordRepo::delete_with_permissions(pool, *module_id, code)
                .await
                .map(|_| ())
                .map_err(|e| e.to_string())
        }
        Compensation::RemoveDirectory { path } => remove_module_dir(path)
            .await
            .map(|_| ())
            .map_err(|e| e.to_string()),
        Compensation::DropTable { table } => SchemaRepo::drop_table(pool, table)
            .await
            .map_err(|e| e.to_string()),
        Compensation::ForgetMigration { name } => ModuleMigrationRepo::delete_by_name(pool, name)
            .await
            .map(|_| ())
            .map_err(|e| e.to_string()),
    }
}

/// What a module delete removed.
#[derive(Debug, Clone, Serialize)]
pub struct TeardownReport {
    pub code: String,
    pub dropped_tables: Vec<String>,
    pub forgotten_migrations: u64,
    pub removed_permissions: u64,
    pub directory_removed: bool,
    pub warnings: Vec<String>,
}

/// Remove every resource owned by `record`: translation table, primary
/// table, migration records, permissions, directory and the record itself.
///
/// Each step tolerates the resource already being gone.
pub async fn teardown_module(
    pool: &DbPool,
    modules_root: &Path,
    record: &ModuleRecord,
) -> AppResult<TeardownReport> {
    let code = record.code_module.as_str();
    let names = derive_names(code)?;

    let mut dropped_tables = Vec::new();
    for table in [&names.trans_table, &names.primary_table] {
        SchemaRepo::drop_table(pool, table).await?;
        dropped_tables.push(table.clone());
    }

    let forgotten_migrations = ModuleMigrationRepo::delete_for_module(pool, code).await?;
    let removed_permissions =
        PermissionRepo::delete_with_prefix(pool, &module_permission_prefix(code)).await?;

    let dir = module_dir(modules_root, code)?;
    let directory_removed = remove_module_dir(&dir).await.map_err(|e| {
        AppError::InternalError(format!("Failed to remove {}: {e}", dir.display()))
    })?;

    ModuleRecordRepo::delete_with_permissions(pool, record.id, code).await?;

    tracing::info!(
        module_code = %code,
        forgotten_migrations,
        removed_permissions,
        directory_removed,
        "Module torn down"
    );

    Ok(TeardownReport {
        code: code.to_string(),
        dropped_tables,
        forgotten_migrations,
        removed_permissions,
        directory_removed,
        warnings: Vec::new(),
    })
}
