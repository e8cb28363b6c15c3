//! Handlers for `/admin/modules`: generating, inspecting and removing
//! modules.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use cms_core::conflict::{check_conflicts, ConflictVerdict};
use cms_core::error::CoreError;
use cms_core::generation::{GenerationError, GenerationStage};
use cms_core::manifest::{plan, GenerationPlan, LoadedModule};
use cms_core::module_config::{build_config, module_dir, GenerateModuleRequest};
use cms_core::schema::migration_version;
use cms_core::types::DbId;
use cms_db::models::module_record::ModuleRecord;
use cms_db::repositories::{ModuleRecordRepo, UserRepo};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AppError, AppResult};
use crate::generator::lookup::PgResourceLookup;
use crate::generator::{ModuleGenerator, TeardownReport};
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

/// Body of a successful generation.
#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub success: bool,
    pub module: ModuleRecord,
    pub stages: Vec<GenerationStage>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct CheckRequest {
    #[serde(default)]
    pub code_module: String,
    #[serde(default)]
    pub slug: String,
}

/// A registry row plus its manifests, when they are loadable.
#[derive(Debug, Serialize)]
pub struct ModuleDetail {
    pub record: ModuleRecord,
    pub manifest: Option<LoadedModule>,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub modules: Vec<String>,
    pub warning: Option<String>,
}

/// Parse a generation request, reporting shape errors (such as an unknown
/// field type) as validation failures.
fn parse_request(body: Value) -> Result<GenerateModuleRequest, GenerationError> {
    serde_json::from_value(body).map_err(|e| {
        GenerationError::validation_message(format!("Invalid module request: {e}"))
    })
}

fn not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound {
        entity: "Module",
        id,
    })
}

/// GET /api/v1/admin/modules
pub async fn list(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<ModuleRecord>>>> {
    let modules = ModuleRecordRepo::list(&state.pool).await?;
    Ok(Json(DataResponse { data: modules }))
}

/// POST /api/v1/admin/modules
pub async fn create(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> AppResult<(StatusCode, Json<GenerateResponse>)> {
    let request = parse_request(body)?;
    let created_by = UserRepo::find_by_id(&state.pool, admin.user_id)
        .await?
        .map(|user| user.id);

    let outcome = ModuleGenerator::from_state(&state)
        .generate(&request, created_by)
        .await?;

    tracing::info!(
        module_id = outcome.record.id,
        module_code = %outcome.record.code_module,
        user_id = admin.user_id,
        "Module created",
    );

    Ok((
        StatusCode::CREATED,
        Json(GenerateResponse {
            success: true,
            module: outcome.record,
            stages: outcome.report.stages,
            warnings: outcome.report.warnings,
        }),
    ))
}

/// POST /api/v1/admin/modules/check
pub async fn check(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Json(input): Json<CheckRequest>,
) -> AppResult<Json<DataResponse<ConflictVerdict>>> {
    let code = input.code_module.trim();
    let slug = input.slug.trim();
    let dir = module_dir(&state.config.generator.modules_dir, code)?;

    let lookup = PgResourceLookup::new(state.pool.clone());
    let verdict = check_conflicts(&lookup, code, slug, &dir).await?;
    Ok(Json(DataResponse { data: verdict }))
}

/// POST /api/v1/admin/modules/preview
pub async fn preview(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> AppResult<Json<DataResponse<GenerationPlan>>> {
    let request = parse_request(body)?;
    let config = build_config(&request, &state.config.generator.modules_dir)?;
    let plan = plan(&config, migration_version(chrono::Utc::now()));
    Ok(Json(DataResponse { data: plan }))
}

/// GET /api/v1/admin/modules/{id}
pub async fn get_by_id(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<ModuleDetail>>> {
    let record = ModuleRecordRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found(id))?;
    let manifest = state
        .catalog
        .get(&record.code_module)
        .await?
        .map(|module| module.as_ref().clone());

    Ok(Json(DataResponse {
        data: ModuleDetail { record, manifest },
    }))
}

/// DELETE /api/v1/admin/modules/{id}
pub async fn delete(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<TeardownReport>>> {
    let record = ModuleRecordRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found(id))?;

    let report = ModuleGenerator::from_state(&state).delete(&record).await?;

    tracing::info!(
        module_id = id,
        module_code = %record.code_module,
        user_id = admin.user_id,
        "Module deleted",
    );
    Ok(Json(DataResponse { data: report }))
}

/// POST /api/v1/admin/modules/refresh
pub async fn refresh(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<RefreshResponse>>> {
    let warning = ModuleGenerator::from_state(&state).refresh().await;
    let modules = state.catalog.codes().await;
    Ok(Json(DataResponse {
        data: RefreshResponse { modules, warning },
    }))
}
