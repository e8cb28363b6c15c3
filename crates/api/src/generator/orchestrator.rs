//! Module generation orchestrator.
//!
//! Drives one request through the linear stage machine
//!
//! ```text
//! Received -> ConflictChecked -> RecordCreated -> DirectoryCreated
//!   -> SchemaApplied -> ModelWritten -> SurfaceWritten
//!   -> AutoloadRefreshed -> Done
//! ```
//!
//! Runs for the same module code are serialised by a database advisory
//! lock. Every side effect registers its compensation; when a stage fails
//! the log is unwound in reverse and the caller gets a [`FatalReport`]
//! listing what was undone.
//!
//! [`FatalReport`]: cms_core::generation::FatalReport

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use cms_core::conflict::{
    check_conflicts, ConflictVerdict, ResourceCheck, ResourceConflict,
};
use cms_core::error::CoreError;
use cms_core::generation::{
    Compensation, GenerationError, GenerationReport, GenerationRun, GenerationStage,
};
use cms_core::manifest::{
    plan, MODEL_MANIFEST, MODULE_MANIFEST, SCHEMA_MANIFEST, SURFACE_MANIFEST,
};
use cms_core::module_config::{build_config, GenerateModuleRequest, ModuleConfig};
use cms_core::roles::module_permissions;
use cms_core::schema::migration_version;
use cms_core::types::DbId;
use cms_db::models::module_record::{CreateModuleRecord, ModuleRecord};
use cms_db::repositories::{GenerationLock, ModuleRecordRepo, SchemaRepo};
use cms_db::DbPool;
use serde::Serialize;

use super::artifacts;
use super::lookup::PgResourceLookup;
use super::teardown::{compensate, teardown_module, TeardownReport};
use crate::catalog::refresh::{refresh_or_clear, CatalogRefresher};
use crate::catalog::ModuleCatalog;
use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Result of a successful run.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationOutcome {
    pub record: ModuleRecord,
    pub report: GenerationReport,
}

/// Why a stage stopped the run.
enum StageFailure {
    /// Rejected before any side effect.
    Rejected(ConflictVerdict),
    Failed(String),
}

impl StageFailure {
    fn failed(context: &str, err: impl fmt::Display) -> Self {
        StageFailure::Failed(format!("{context}: {err}"))
    }
}

impl From<CoreError> for StageFailure {
    fn from(err: CoreError) -> Self {
        StageFailure::Failed(err.to_string())
    }
}

/// Generates and removes modules.
pub struct ModuleGenerator {
    pool: DbPool,
    catalog: Arc<ModuleCatalog>,
    refresher: Arc<dyn CatalogRefresher>,
    modules_root: PathBuf,
}

impl ModuleGenerator {
    pub fn new(
        pool: DbPool,
        catalog: Arc<ModuleCatalog>,
        refresher: Arc<dyn CatalogRefresher>,
        modules_root: PathBuf,
    ) -> Self {
        Self {
            pool,
            catalog,
            refresher,
            modules_root,
        }
    }

    pub fn from_state(state: &AppState) -> Self {
        Self::new(
            state.pool.clone(),
            Arc::clone(&state.catalog),
            Arc::clone(&state.refresher),
            state.config.generator.modules_dir.clone(),
        )
    }

    /// Generate a module from `request`.
    ///
    /// `created_by` must reference an existing user or be `None`.
    pub async fn generate(
        &self,
        request: &GenerateModuleRequest,
        created_by: Option<DbId>,
    ) -> Result<GenerationOutcome, GenerationError> {
        let config = build_config(request, &self.modules_root)?;
        let code = config.code().to_string();
        tracing::info!(module_code = %code, "Module generation received");

        let lock = match GenerationLock::try_acquire(&self.pool, &code).await {
            Ok(Some(lock)) => lock,
            Ok(None) => {
                tracing::info!(module_code = %code, "Module generation already in progress");
                return Err(GenerationError::Conflict(ConflictVerdict::in_progress(
                    &code,
                )));
            }
            Err(e) => {
                let report = GenerationRun::new(&code)
                    .into_fatal(format!("Failed to acquire generation lock: {e}"), Vec::new());
                return Err(GenerationError::Fatal(report));
            }
        };

        let mut run = GenerationRun::new(&code);
        let result = match self.execute(&config, created_by, &mut run).await {
            Ok(outcome) => {
                tracing::info!(
                    module_code = %code,
                    warnings = outcome.report.warnings.len(),
                    "Module generated"
                );
                Ok(outcome)
            }
            Err(StageFailure::Rejected(verdict)) => {
                tracing::info!(
                    module_code = %code,
                    reasons = %verdict.summary(),
                    "Module generation rejected"
                );
                Err(GenerationError::Conflict(verdict))
            }
            Err(StageFailure::Failed(message)) => {
                tracing::error!(
                    module_code = %code,
                    stage = %run.pending(),
                    error = %message,
                    "Module generation stage failed, rolling back"
                );
                let rollback = compensate(&self.pool, run.take_compensations()).await;
                Err(GenerationError::Fatal(run.into_fatal(message, rollback)))
            }
        };

        if let Err(e) = lock.release().await {
            tracing::warn!(module_code = %code, error = %e, "Failed to release generation lock");
        }
        result
    }

    async fn execute(
        &self,
        config: &ModuleConfig,
        created_by: Option<DbId>,
        run: &mut GenerationRun,
    ) -> Result<GenerationOutcome, StageFailure> {
        let code = config.code();
        let base_dir = &config.base_dir;

        // --- ConflictChecked ---
        let lookup = PgResourceLookup::new(self.pool.clone());
        let verdict = check_conflicts(&lookup, code, &config.descriptor.slug, base_dir)
            .await
            .map_err(|e| StageFailure::failed("Conflict check failed", e))?;
        if !verdict.accepted {
            return Err(StageFailure::Rejected(verdict));
        }
        run.complete(GenerationStage::ConflictChecked)?;

        let plan = plan(config, migration_version(chrono::Utc::now()));

        // --- RecordCreated ---
        let input = CreateModuleRecord::from_descriptor(&config.descriptor, created_by)
            .map_err(|e| StageFailure::failed("Failed to encode module record", e))?;
        let permissions = module_permissions(code, config.options().trash);
        let record =
            match ModuleRecordRepo::create_with_permissions(&self.pool, &input, &permissions).await
            {
                Ok(record) => record,
                Err(e) if is_registry_violation(&e) => {
                    return Err(StageFailure::Rejected(ConflictVerdict::from_resources(
                        vec![ResourceConflict::new(ResourceCheck::Registry, code)],
                    )));
                }
                Err(e) => return Err(StageFailure::failed("Failed to create module record", e)),
            };
        run.register(Compensation::DeleteRecord {
            module_id: record.id,
            code: code.to_string(),
        });
        run.complete(GenerationStage::RecordCreated)?;

        // --- DirectoryCreated ---
        artifacts::create_module_dir(base_dir)
            .await
            .map_err(|e| StageFailure::failed("Failed to create module directory", e))?;
        run.register(Compensation::RemoveDirectory {
            path: base_dir.clone(),
        });
        artifacts::write_json(&base_dir.join(MODULE_MANIFEST), &plan.module)
            .await
            .map_err(|e| StageFailure::failed("Failed to write module manifest", e))?;
        run.complete(GenerationStage::DirectoryCreated)?;

        // --- SchemaApplied ---
        for unit in &plan.migrations {
            artifacts::write_migration(&config.migrations_dir(), unit)
                .await
                .map_err(|e| StageFailure::failed("Failed to write migration file", e))?;
            SchemaRepo::apply_migration(&self.pool, unit, code)
                .await
                .map_err(|e| {
                    StageFailure::failed(&format!("Migration {} failed", unit.record_name()), e)
                })?;
            run.register(Compensation::ForgetMigration {
                name: unit.record_name(),
            });
            run.register(Compensation::DropTable {
                table: unit.table.clone(),
            });
        }
        artifacts::write_json(&base_dir.join(SCHEMA_MANIFEST), &plan.schema)
            .await
            .map_err(|e| StageFailure::failed("Failed to write schema manifest", e))?;
        run.complete(GenerationStage::SchemaApplied)?;

        // --- ModelWritten ---
        artifacts::write_json(&base_dir.join(MODEL_MANIFEST), &plan.model)
            .await
            .map_err(|e| StageFailure::failed("Failed to write model manifest", e))?;
        run.complete(GenerationStage::ModelWritten)?;

        // --- SurfaceWritten ---
        artifacts::write_json(&base_dir.join(SURFACE_MANIFEST), &plan.surface)
            .await
            .map_err(|e| StageFailure::failed("Failed to write surface manifest", e))?;
        run.complete(GenerationStage::SurfaceWritten)?;

        // --- AutoloadRefreshed (never fatal) ---
        let mut warnings = Vec::new();
        if let Some(warning) = refresh_or_clear(self.refresher.as_ref(), &self.catalog).await {
            warnings.push(warning);
        }
        run.complete(GenerationStage::AutoloadRefreshed)?;
        run.complete(GenerationStage::Done)?;

        Ok(GenerationOutcome {
            record,
            report: GenerationReport {
                code: code.to_string(),
                stages: run.completed().to_vec(),
                warnings,
            },
        })
    }

    /// Remove a generated module and everything it owns.
    pub async fn delete(&self, record: &ModuleRecord) -> AppResult<TeardownReport> {
        let code = record.code_module.as_str();
        let Some(lock) = GenerationLock::try_acquire(&self.pool, code).await? else {
            return Err(AppError::Generation(GenerationError::Conflict(
                ConflictVerdict::in_progress(code),
            )));
        };

        let result = teardown_module(&self.pool, &self.modules_root, record).await;
        if let Err(e) = lock.release().await {
            tracing::warn!(module_code = %code, error = %e, "Failed to release generation lock");
        }
        let mut report = result?;

        self.catalog.remove(code).await;
        if let Some(warning) = refresh_or_clear(self.refresher.as_ref(), &self.catalog).await {
            report.warnings.push(warning);
        }
        Ok(report)
    }

    /// Re-run the catalog refresh on demand.
    pub async fn refresh(&self) -> Option<String> {
        refresh_or_clear(self.refresher.as_ref(), &self.catalog).await
    }
}

/// A unique violation on one of the registry constraints
/// (`uq_modules_code_module`, `uq_modules_slug`).
fn is_registry_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            db_err.code().as_deref() == Some("23505")
                && db_err
                    .constraint()
                    .is_some_and(|c| c.starts_with("uq_modules_"))
        }
        _ => false,
    }
}
