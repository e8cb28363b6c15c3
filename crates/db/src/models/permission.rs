//! Permission entity model.

use cms_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `permissions` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Permission {
    pub id: DbId,
    pub name: String,
    /// Owning module for generated permissions, `None` for platform ones.
    pub module_code: Option<String>,
    pub created_at: Timestamp,
}
