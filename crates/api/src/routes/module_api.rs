//! Route definitions for the public API of generated modules.

use axum::routing::get;
use axum::Router;

use crate::handlers::module_api;
use crate::state::AppState;

/// Routes mounted at `/api`.
///
/// ```text
/// GET /{code}         -> index
/// GET /{code}/{id}    -> show
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{code}", get(module_api::index))
        .route("/{code}/{id}", get(module_api::show))
}
