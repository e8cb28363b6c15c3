//! Read-only API for generated modules (`/api/{code}`).
//!
//! Trashed rows are never visible here, and inactive modules are hidden.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use cms_core::descriptor::ModuleStatus;
use cms_core::error::CoreError;
use cms_core::manifest::LoadedModule;
use cms_core::surface::{ListingParams, RouteAction, RowScope};
use cms_core::types::DbId;
use cms_db::repositories::{EntityPage, ModuleEntityRepo};
use serde_json::Value;

use super::module_entities::{resolve_module, row_not_found, Surface};
use crate::error::{AppError, AppResult};
use crate::middleware::rbac::RequireAuth;
use crate::response::DataResponse;
use crate::state::AppState;

async fn resolve_active(
    state: &AppState,
    code: &str,
    action: RouteAction,
) -> AppResult<Arc<LoadedModule>> {
    let module = resolve_module(state, code, Surface::Api, action).await?;
    if module.module.descriptor.status != ModuleStatus::Active {
        return Err(AppError::Core(CoreError::ModuleNotFound(code.to_string())));
    }
    Ok(module)
}

/// GET /api/v1/api/{code}
pub async fn index(
    RequireAuth(_user): RequireAuth,
    State(state): State<AppState>,
    Path(code): Path<String>,
    Query(params): Query<ListingParams>,
) -> AppResult<Json<DataResponse<EntityPage>>> {
    let module = resolve_active(&state, &code, RouteAction::Index).await?;
    let contract = &module.surface.listing;
    let listing = contract.resolve(&params)?;
    let page = ModuleEntityRepo::list(&state.pool, contract, &listing, RowScope::Live).await?;
    Ok(Json(DataResponse { data: page }))
}

/// GET /api/v1/api/{code}/{id}
pub async fn show(
    RequireAuth(_user): RequireAuth,
    State(state): State<AppState>,
    Path((code, id)): Path<(String, DbId)>,
) -> AppResult<Json<DataResponse<Value>>> {
    let module = resolve_active(&state, &code, RouteAction::Show).await?;
    let item = ModuleEntityRepo::find(&state.pool, module.table(), id, RowScope::Live)
        .await?
        .ok_or_else(|| row_not_found(&module, id))?;
    Ok(Json(DataResponse { data: item }))
}
