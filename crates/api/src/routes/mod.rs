pub mod health;
pub mod module_api;
pub mod module_entities;
pub mod modules;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /admin/modules                               list, generate (admin only)
/// /admin/modules/check                         conflict check (POST)
/// /admin/modules/preview                       dry run (POST)
/// /admin/modules/refresh                       refresh catalog (POST)
/// /admin/modules/{id}                          get, delete
///
/// /admin/m/{code}                              index, store (admin only)
/// /admin/m/{code}/create                       create form
/// /admin/m/{code}/{id}                         update, destroy
/// /admin/m/{code}/{id}/edit                    edit form
/// /admin/m/{code}/trash                        trash listing
/// /admin/m/{code}/trash/empty                  empty trash (POST)
/// /admin/m/{code}/trash/{id}/restore           restore (POST)
/// /admin/m/{code}/trash/{id}/force             force delete (DELETE)
///
/// /api/{code}                                  list (auth required)
/// /api/{code}/{id}                             show
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Module registry and generator.
        .nest("/admin/modules", modules::router())
        // Admin surface of generated modules.
        .nest("/admin/m", module_entities::router())
        // Read-only API of generated modules.
        .nest("/api", module_api::router())
}
