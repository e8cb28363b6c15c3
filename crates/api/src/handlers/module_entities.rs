//! Admin dispatcher for generated modules (`/admin/m/{code}`).
//!
//! One set of handlers serves every module. Each request looks its module
//! up in the catalog and is only served if the module's web route table
//! defines the matching action, so trash endpoints of a module without the
//! trash option are 404.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use cms_core::descriptor::{AUTHOR_COLUMN, DEFAULT_LOCALE};
use cms_core::error::CoreError;
use cms_core::manifest::LoadedModule;
use cms_core::surface::{ListingParams, RouteAction, RowScope};
use cms_core::types::DbId;
use cms_core::validation_rules::{RequestValidator, Rule, ValidatedValues};
use cms_db::repositories::{EntityPage, ModuleEntityRepo, UserRepo};
use serde::Serialize;
use serde_json::Value;

use crate::error::{AppError, AppResult};
use crate::middleware::rbac::RequireAdmin;
use crate::response::{created, DataResponse};
use crate::state::AppState;

/// Which route table a request is dispatched through.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Surface {
    Web,
    Api,
}

/// Load `code` and check that its `surface` routes define `action`.
pub(crate) async fn resolve_module(
    state: &AppState,
    code: &str,
    surface: Surface,
    action: RouteAction,
) -> AppResult<Arc<LoadedModule>> {
    let module = state
        .catalog
        .get(code)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::ModuleNotFound(code.to_string())))?;

    let routes = match surface {
        Surface::Web => &module.surface.web_routes,
        Surface::Api => &module.surface.api_routes,
    };
    if !routes.has(action) {
        return Err(AppError::NotFound(format!(
            "Module '{code}' has no '{}' route",
            action.name()
        )));
    }
    Ok(module)
}

pub(crate) fn row_not_found(module: &LoadedModule, id: DbId) -> AppError {
    AppError::NotFound(format!("{} with id {id} not found", module.model.name))
}

/// One input on a create/edit form.
#[derive(Debug, Serialize)]
pub struct FormField {
    pub column: String,
    pub label: String,
    pub required: bool,
    pub rules: Vec<Rule>,
}

#[derive(Debug, Serialize)]
pub struct FormSchema {
    pub module: String,
    pub title: String,
    pub validator: String,
    pub fields: Vec<FormField>,
}

#[derive(Debug, Serialize)]
pub struct EditForm {
    pub form: FormSchema,
    pub item: Value,
}

#[derive(Debug, Serialize)]
pub struct EmptyTrashResponse {
    pub deleted: u64,
}

fn form_schema(module: &LoadedModule, validator: &RequestValidator) -> FormSchema {
    let descriptor = &module.module.descriptor;
    let fields = validator
        .fields
        .iter()
        .map(|rules| FormField {
            column: rules.column.clone(),
            label: descriptor
                .field(&rules.column)
                .map(|f| f.label(DEFAULT_LOCALE).to_string())
                .unwrap_or_else(|| rules.column.clone()),
            required: rules.is_required(),
            rules: rules.rules.clone(),
        })
        .collect();

    FormSchema {
        module: descriptor.code.clone(),
        title: descriptor
            .display_name(DEFAULT_LOCALE)
            .unwrap_or(&descriptor.code)
            .to_string(),
        validator: validator.name.clone(),
        fields,
    }
}

/// Validate a request body against `validator`.
fn validate_body(validator: &RequestValidator, body: Value) -> AppResult<ValidatedValues> {
    let Value::Object(input) = body else {
        return Err(AppError::BadRequest(
            "Request body must be a JSON object".into(),
        ));
    };
    validator.validate(&input).map_err(AppError::FieldValidation)
}

/// GET /api/v1/admin/m/{code}
pub async fn index(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(code): Path<String>,
    Query(params): Query<ListingParams>,
) -> AppResult<Json<DataResponse<EntityPage>>> {
    let module = resolve_module(&state, &code, Surface::Web, RouteAction::Index).await?;
    let contract = &module.surface.listing;
    let listing = contract.resolve(&params)?;
    let page = ModuleEntityRepo::list(&state.pool, contract, &listing, RowScope::Live).await?;
    Ok(Json(DataResponse { data: page }))
}

/// GET /api/v1/admin/m/{code}/create
pub async fn create_form(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> AppResult<Json<DataResponse<FormSchema>>> {
    let module = resolve_module(&state, &code, Surface::Web, RouteAction::Create).await?;
    let form = form_schema(&module, &module.surface.store_request);
    Ok(Json(DataResponse { data: form }))
}

/// POST /api/v1/admin/m/{code}
pub async fn store(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(code): Path<String>,
    Json(body): Json<Value>,
) -> AppResult<(StatusCode, Json<DataResponse<Value>>)> {
    let module = resolve_module(&state, &code, Surface::Web, RouteAction::Store).await?;
    let mut values = validate_body(&module.surface.store_request, body)?;

    // The author is whoever is signed in, if they have a users row.
    if module.model.is_fillable(AUTHOR_COLUMN) {
        if let Some(user) = UserRepo::find_by_id(&state.pool, admin.user_id).await? {
            values.push((AUTHOR_COLUMN.to_string(), Some(user.id.to_string())));
        }
    }

    let item = ModuleEntityRepo::insert(&state.pool, module.table(), &values).await?;
    tracing::info!(
        module_code = %code,
        id = ?item.get("id"),
        user_id = admin.user_id,
        "Module entity created",
    );
    Ok(created(item))
}

/// GET /api/v1/admin/m/{code}/{id}/edit
pub async fn edit_form(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path((code, id)): Path<(String, DbId)>,
) -> AppResult<Json<DataResponse<EditForm>>> {
    let module = resolve_module(&state, &code, Surface::Web, RouteAction::Edit).await?;
    let item = ModuleEntityRepo::find(&state.pool, module.table(), id, RowScope::Live)
        .await?
        .ok_or_else(|| row_not_found(&module, id))?;
    let form = form_schema(&module, &module.surface.update_request);
    Ok(Json(DataResponse {
        data: EditForm { form, item },
    }))
}

/// PUT /api/v1/admin/m/{code}/{id}
pub async fn update(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path((code, id)): Path<(String, DbId)>,
    Json(body): Json<Value>,
) -> AppResult<Json<DataResponse<Value>>> {
    let module = resolve_module(&state, &code, Surface::Web, RouteAction::Update).await?;
    let values = validate_body(&module.surface.update_request, body)?;
    let item = ModuleEntityRepo::update(&state.pool, module.table(), id, &values)
        .await?
        .ok_or_else(|| row_not_found(&module, id))?;
    tracing::info!(module_code = %code, id, user_id = admin.user_id, "Module entity updated");
    Ok(Json(DataResponse { data: item }))
}

/// DELETE /api/v1/admin/m/{code}/{id}
///
/// Moves the row to the trash when the module has one, deletes it otherwise.
pub async fn destroy(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path((code, id)): Path<(String, DbId)>,
) -> AppResult<StatusCode> {
    let module = resolve_module(&state, &code, Surface::Web, RouteAction::Destroy).await?;
    let table = module.table();
    let deleted = if module.model.soft_deletes {
        ModuleEntityRepo::soft_delete(&state.pool, table, id).await?
    } else {
        ModuleEntityRepo::hard_delete(&state.pool, table, id, RowScope::Live).await?
    };
    if !deleted {
        return Err(row_not_found(&module, id));
    }
    tracing::info!(
        module_code = %code,
        id,
        soft = module.model.soft_deletes,
        user_id = admin.user_id,
        "Module entity deleted",
    );
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/admin/m/{code}/trash
pub async fn trash_index(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(code): Path<String>,
    Query(params): Query<ListingParams>,
) -> AppResult<Json<DataResponse<EntityPage>>> {
    let module = resolve_module(&state, &code, Surface::Web, RouteAction::TrashIndex).await?;
    let contract = &module.surface.listing;
    let listing = contract.resolve(&params)?;
    let page = ModuleEntityRepo::list(&state.pool, contract, &listing, RowScope::Trashed).await?;
    Ok(Json(DataResponse { data: page }))
}

/// POST /api/v1/admin/m/{code}/trash/{id}/restore
pub async fn trash_restore(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path((code, id)): Path<(String, DbId)>,
) -> AppResult<StatusCode> {
    let module = resolve_module(&state, &code, Surface::Web, RouteAction::TrashRestore).await?;
    if !ModuleEntityRepo::restore(&state.pool, module.table(), id).await? {
        return Err(row_not_found(&module, id));
    }
    tracing::info!(module_code = %code, id, user_id = admin.user_id, "Module entity restored");
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/v1/admin/m/{code}/trash/{id}/force
pub async fn trash_force(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path((code, id)): Path<(String, DbId)>,
) -> AppResult<StatusCode> {
    let module = resolve_module(&state, &code, Surface::Web, RouteAction::TrashForce).await?;
    if !ModuleEntityRepo::hard_delete(&state.pool, module.table(), id, RowScope::Trashed).await? {
        return Err(row_not_found(&module, id));
    }
    tracing::info!(module_code = %code, id, user_id = admin.user_id, "Module entity purged");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/admin/m/{code}/trash/empty
pub async fn trash_empty(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> AppResult<Json<DataResponse<EmptyTrashResponse>>> {
    let module = resolve_module(&state, &code, Surface::Web, RouteAction::TrashEmpty).await?;
    let deleted = ModuleEntityRepo::empty_trash(&state.pool, module.table()).await?;
    tracing::info!(module_code = %code, deleted, user_id = admin.user_id, "Module trash emptied");
    Ok(Json(DataResponse {
        data: EmptyTrashResponse { deleted },
    }))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use cms_core::validation_rules::ValidationMode;
    use serde_json::Map;

    #[test]
    fn non_object_body_is_rejected() {
        let validator = RequestValidator {
            name: "StoreNewsRequest".into(),
            mode: ValidationMode::Store,
            fields: Vec::new(),
        };
        let err = validate_body(&validator, serde_json::json!([1, 2])).unwrap_err();
        assert_matches!(err, AppError::BadRequest(_));
        assert!(validate_body(&validator, Value::Object(Map::new()))
            .unwrap()
            .is_empty());
    }
}
