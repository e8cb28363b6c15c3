//! Module registry entity model and DTOs.

use cms_core::descriptor::ModuleDescriptor;
use cms_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `modules` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ModuleRecord {
    pub id: DbId,
    pub code_module: String,
    pub slug: String,
    pub status: String,
    /// Locale -> label.
    pub name: serde_json::Value,
    pub description: serde_json::Value,
    pub option_seo: bool,
    pub option_trash: bool,
    /// Declared fields as submitted.
    pub properties: serde_json::Value,
    pub created_by: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for registering a module.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateModuleRecord {
    pub code_module: String,
    pub slug: String,
    pub status: String,
    pub name: serde_json::Value,
    pub description: serde_json::Value,
    pub option_seo: bool,
    pub option_trash: bool,
    pub properties: serde_json::Value,
    pub created_by: Option<DbId>,
}

impl CreateModuleRecord {
    /// Registry row for a validated descriptor.
    pub fn from_descriptor(
        descriptor: &ModuleDescriptor,
        created_by: Option<DbId>,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            code_module: descriptor.code.clone(),
            slug: descriptor.slug.clone(),
            status: descriptor.status.as_str().to_string(),
            name: serde_json::to_value(&descriptor.name)?,
            description: serde_json::to_value(&descriptor.description)?,
            option_seo: descriptor.options.seo,
            option_trash: descriptor.options.trash,
            properties: serde_json::to_value(&descriptor.fields)?,
            created_by,
        })
    }
}
