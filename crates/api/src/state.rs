use std::sync::Arc;

use crate::catalog::refresh::CatalogRefresher;
use crate::catalog::ModuleCatalog;
use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: cms_db::DbPool,
    /// Server configuration (accessed by middleware and handlers).
    pub config: Arc<ServerConfig>,
    /// Loaded module manifests, keyed by module code.
    pub catalog: Arc<ModuleCatalog>,
    /// Re-syncs the catalog after modules are generated or removed.
    pub refresher: Arc<dyn CatalogRefresher>,
}
