//! Route definitions for module administration.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::modules;
use crate::state::AppState;

/// Routes mounted at `/admin/modules`.
///
/// ```text
/// GET    /            -> list
/// POST   /            -> create (generate)
/// POST   /check       -> check
/// POST   /preview     -> preview
/// POST   /refresh     -> refresh
/// GET    /{id}        -> get_by_id
/// DELETE /{id}        -> delete
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(modules::list).post(modules::create))
        .route("/check", post(modules::check))
        .route("/preview", post(modules::preview))
        .route("/refresh", post(modules::refresh))
        .route("/{id}", get(modules::get_by_id).delete(modules::delete))
}
