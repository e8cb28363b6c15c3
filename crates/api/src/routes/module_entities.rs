//! Route definitions for the admin surface of generated modules.

use axum::routing::{delete, get, post, put};
use axum::Router;

use crate::handlers::module_entities as entities;
use crate::state::AppState;

/// Routes mounted at `/admin/m`.
///
/// Every generated module shares these routes; the handlers reject actions
/// the module's own route table does not define.
///
/// ```text
/// GET    /{code}                       -> index
/// POST   /{code}                       -> store
/// GET    /{code}/create                -> create_form
/// GET    /{code}/{id}/edit             -> edit_form
/// PUT    /{code}/{id}                  -> update
/// DELETE /{code}/{id}                  -> destroy
/// GET    /{code}/trash                 -> trash_index
/// POST   /{code}/trash/empty           -> trash_empty
/// POST   /{code}/trash/{id}/restore    -> trash_restore
/// DELETE /{code}/trash/{id}/force      -> trash_force
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{code}", get(entities::index).post(entities::store))
        .route("/{code}/create", get(entities::create_form))
        .route("/{code}/trash", get(entities::trash_index))
        .route("/{code}/trash/empty", post(entities::trash_empty))
        .route("/{code}/trash/{id}/restore", post(entities::trash_restore))
        .route("/{code}/trash/{id}/force", delete(entities::trash_force))
        .route("/{code}/{id}", put(entities::update).delete(entities::destroy))
        .route("/{code}/{id}/edit", get(entities::edit_form))
}
