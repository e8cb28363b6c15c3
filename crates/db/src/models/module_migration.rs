//! Applied module migration record.

use cms_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `module_migrations` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ModuleMigration {
    pub id: DbId,
    /// `{version}_{name}`, e.g. `20260101120000_create_news_table`.
    pub name: String,
    pub module_code: String,
    /// SHA-256 hex digest of the applied SQL.
    pub checksum: String,
    pub applied_at: Timestamp,
}
