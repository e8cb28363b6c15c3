//! On-disk artifacts of a generated module.
//!
//! A module directory holds JSON manifests instead of source code:
//!
//! ```text
//! modules/News/
//!   module.json      descriptor + derived names
//!   schema.json      table schemas, migration list, translation seeds
//!   model.json       model definition
//!   surface.json     route tables, listing contract, request validators
//!   migrations/      the SQL files that were applied
//! ```

use serde::{Deserialize, Serialize};

use crate::descriptor::ModuleDescriptor;
use crate::model_def::{model_definition, ModelDefinition};
use crate::module_config::ModuleConfig;
use crate::naming::ModuleNames;
use crate::schema::{
    primary_migration, primary_table, translation_migration, translation_seeds, translation_table,
    MigrationUnit, TableSchema, TranslationSeed,
};
use crate::surface::{surface_definition, SurfaceDefinition};

pub const MODULE_MANIFEST: &str = "module.json";
pub const SCHEMA_MANIFEST: &str = "schema.json";
pub const MODEL_MANIFEST: &str = "model.json";
pub const SURFACE_MANIFEST: &str = "surface.json";
pub const MIGRATIONS_DIR: &str = "migrations";

/// `module.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleManifest {
    pub descriptor: ModuleDescriptor,
    pub names: ModuleNames,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationRef {
    /// Record name, `{version}_{name}`.
    pub name: String,
    pub file_name: String,
    pub table: String,
    pub checksum: String,
}

impl From<&MigrationUnit> for MigrationRef {
    fn from(unit: &MigrationUnit) -> Self {
        Self {
            name: unit.record_name(),
            file_name: unit.file_name(),
            table: unit.table.clone(),
            checksum: unit.checksum(),
        }
    }
}

/// `schema.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaManifest {
    pub primary: TableSchema,
    pub translation: TableSchema,
    /// In application order.
    pub migrations: Vec<MigrationRef>,
    pub seeds: Vec<TranslationSeed>,
}

/// Every artifact one generation run produces, computed up front.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationPlan {
    pub module: ModuleManifest,
    /// Primary table migration first, then the translation table.
    pub migrations: Vec<MigrationUnit>,
    pub schema: SchemaManifest,
    pub model: ModelDefinition,
    pub surface: SurfaceDefinition,
}

/// Build the generation plan. The translation migration gets `version + 1`
/// so it sorts after the primary one.
pub fn plan(config: &ModuleConfig, version: i64) -> GenerationPlan {
    let migrations = vec![
        primary_migration(config, version),
        translation_migration(config, version + 1),
    ];
    let schema = SchemaManifest {
        primary: primary_table(config),
        translation: translation_table(config),
        migrations: migrations.iter().map(MigrationRef::from).collect(),
        seeds: translation_seeds(&config.descriptor),
    };

    GenerationPlan {
        module: ModuleManifest {
            descriptor: config.descriptor.clone(),
            names: config.names.clone(),
        },
        migrations,
        schema,
        model: model_definition(config),
        surface: surface_definition(config),
    }
}

/// A module as loaded back from its directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadedModule {
    pub module: ModuleManifest,
    pub schema: SchemaManifest,
    pub model: ModelDefinition,
    pub surface: SurfaceDefinition,
}

impl LoadedModule {
    pub fn code(&self) -> &str {
        &self.module.descriptor.code
    }

    pub fn table(&self) -> &TableSchema {
        &self.schema.primary
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::descriptor::LocalizedText;
    use crate::module_config::{build_config, GenerateModuleRequest};

    fn config() -> ModuleConfig {
        let request = GenerateModuleRequest {
            code_module: "promo".into(),
            slug: "promo".into(),
            status: "inactive".into(),
            name: LocalizedText::from([("ru".to_string(), "Акции".to_string())]),
            option_trash: true,
            ..Default::default()
        };
        build_config(&request, Path::new("/m")).unwrap()
    }

    #[test]
    fn plan_orders_primary_before_translation() {
        let plan = plan(&config(), 20260101120000);
        assert_eq!(plan.migrations.len(), 2);
        assert_eq!(plan.migrations[0].table, "promo");
        assert_eq!(plan.migrations[1].table, "promo_trans");
        assert_eq!(
            plan.schema.migrations[1].name,
            "20260101120001_create_promo_trans_table"
        );
        assert_eq!(plan.schema.migrations[0].checksum, plan.migrations[0].checksum());
    }

    #[test]
    fn plan_is_deterministic() {
        assert_eq!(plan(&config(), 1), plan(&config(), 1));
    }

    #[test]
    fn zero_field_module_still_seeds_two_rows() {
        let plan = plan(&config(), 1);
        assert_eq!(plan.schema.seeds.len(), 2);
        assert!(plan.model.soft_deletes);
        assert_eq!(plan.model.fillable, vec!["author_id"]);
    }

    #[test]
    fn manifests_round_trip_through_json() {
        let plan = plan(&config(), 1);
        let loaded = LoadedModule {
            module: plan.module.clone(),
            schema: plan.schema.clone(),
            model: plan.model.clone(),
            surface: plan.surface.clone(),
        };
        let json = serde_json::to_string(&loaded).unwrap();
        let back: LoadedModule = serde_json::from_str(&json).unwrap();
        assert_eq!(back, loaded);
        assert_eq!(back.code(), "promo");
    }
}
