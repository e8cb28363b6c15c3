//! Model definition for a generated module's entity.

use serde::{Deserialize, Serialize};

use crate::descriptor::{AUTHOR_COLUMN, SEO_COLUMNS};
use crate::module_config::ModuleConfig;
use crate::schema::USERS_TABLE;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    BelongsTo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    pub name: String,
    pub kind: RelationKind,
    pub foreign_key: String,
    pub related_table: String,
    pub owner_key: String,
}

/// Entity description consumed by the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDefinition {
    pub name: String,
    pub table: String,
    /// Columns a request may write.
    pub fillable: Vec<String>,
    pub relations: Vec<Relation>,
    pub soft_deletes: bool,
    pub timestamps: bool,
}

impl ModelDefinition {
    pub fn is_fillable(&self, column: &str) -> bool {
        self.fillable.iter().any(|c| c == column)
    }
}

/// Build the model definition: fillable is the field codes, then the SEO
/// columns when enabled, then `author_id`.
pub fn model_definition(config: &ModuleConfig) -> ModelDefinition {
    let descriptor = &config.descriptor;
    let mut fillable: Vec<String> = descriptor.field_codes().map(str::to_string).collect();
    if descriptor.options.seo {
        fillable.extend(SEO_COLUMNS.iter().map(|c| c.to_string()));
    }
    fillable.push(AUTHOR_COLUMN.to_string());

    ModelDefinition {
        name: config.names.model_name.clone(),
        table: config.names.primary_table.clone(),
        fillable,
        relations: vec![Relation {
            name: "author".into(),
            kind: RelationKind::BelongsTo,
            foreign_key: AUTHOR_COLUMN.into(),
            related_table: USERS_TABLE.into(),
            owner_key: "id".into(),
        }],
        soft_deletes: descriptor.options.trash,
        timestamps: true,
    }
}
