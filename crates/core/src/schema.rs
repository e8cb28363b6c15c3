//! Schema generation for generated modules.
//!
//! Translates a module's declared fields into column definitions for the
//! primary table and the translation table, and renders the migration SQL
//! that creates (and seeds) them.

use chrono::{Datelike, Timelike};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::descriptor::{
    FieldType, ModuleDescriptor, AUTHOR_COLUMN, DEFAULT_LOCALE, DELETED_AT_COLUMN,
    SECONDARY_LOCALE,
};
use crate::module_config::ModuleConfig;
use crate::types::Timestamp;

/// Table referenced by `author_id`.
pub const USERS_TABLE: &str = "users";

/// Translation key for the module display name.
pub const MOD_NAME_KEY: &str = "mod_name";

/// Translation key for the module description.
pub const MOD_DESCRIPTION_KEY: &str = "mod_description";

// ---------------------------------------------------------------------------
// Column model
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColumnType {
    BigSerial,
    BigInt,
    Varchar { length: u16 },
    Text,
    Integer,
    Decimal { precision: u8, scale: u8 },
    TimestampTz,
}

impl ColumnType {
    pub fn sql(self) -> String {
        match self {
            ColumnType::BigSerial => "BIGSERIAL".into(),
            ColumnType::BigInt => "BIGINT".into(),
            ColumnType::Varchar { length } => format!("VARCHAR({length})"),
            ColumnType::Text => "TEXT".into(),
            ColumnType::Integer => "INTEGER".into(),
            ColumnType::Decimal { precision, scale } => format!("DECIMAL({precision},{scale})"),
            ColumnType::TimestampTz => "TIMESTAMPTZ".into(),
        }
    }

    /// Type used when casting a bound text parameter into this column.
    pub fn cast_sql(self) -> String {
        match self {
            ColumnType::BigSerial => "BIGINT".into(),
            other => other.sql(),
        }
    }

    pub fn is_textual(self) -> bool {
        matches!(self, ColumnType::Varchar { .. } | ColumnType::Text)
    }
}

/// Physical column type for a declared field type.
pub fn column_type_for(field_type: FieldType) -> ColumnType {
    match field_type {
        FieldType::String => ColumnType::Varchar { length: 255 },
        FieldType::Text => ColumnType::Text,
        FieldType::Integer => ColumnType::Integer,
        FieldType::Decimal => ColumnType::Decimal {
            precision: 10,
            scale: 2,
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnDelete {
    SetNull,
    Cascade,
}

impl OnDelete {
    fn sql(self) -> &'static str {
        match self {
            OnDelete::SetNull => "SET NULL",
            OnDelete::Cascade => "CASCADE",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    pub table: String,
    pub column: String,
    pub on_delete: OnDelete,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    pub column_type: ColumnType,
    pub nullable: bool,
    #[serde(default)]
    pub primary_key: bool,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub default: Option<String>,
    #[serde(default)]
    pub references: Option<ForeignKey>,
}

impl ColumnDef {
    fn new(name: &str, column_type: ColumnType, nullable: bool) -> Self {
        Self {
            name: name.to_string(),
            column_type,
            nullable,
            primary_key: false,
            unique: false,
            default: None,
            references: None,
        }
    }

    fn id() -> Self {
        Self {
            primary_key: true,
            ..Self::new("id", ColumnType::BigSerial, false)
        }
    }

    fn timestamp(name: &str) -> Self {
        Self {
            default: Some("now()".into()),
            ..Self::new(name, ColumnType::TimestampTz, false)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<ColumnDef>,
}

impl TableSchema {
    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn soft_deletes(&self) -> bool {
        self.has_column(DELETED_AT_COLUMN)
    }

    /// `CREATE TABLE` statement plus indexes for foreign keys.
    pub fn create_sql(&self) -> String {
        let table = &self.name;
        let mut lines: Vec<String> = self
            .columns
            .iter()
            .map(|c| {
                let mut line = format!("    {} {}", quote_ident(&c.name), c.column_type.sql());
                if c.primary_key {
                    line.push_str(" PRIMARY KEY");
                } else if !c.nullable {
                    line.push_str(" NOT NULL");
                } else {
                    line.push_str(" NULL");
                }
                if let Some(default) = &c.default {
                    line.push_str(&format!(" DEFAULT {default}"));
                }
                line
            })
            .collect();

        for c in &self.columns {
            if c.unique {
                lines.push(format!(
                    "    CONSTRAINT {} UNIQUE ({})",
                    quote_ident(&format!("uq_{table}_{}", c.name)),
                    quote_ident(&c.name)
                ));
            }
            if let Some(fk) = &c.references {
                lines.push(format!(
                    "    CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({}) ON DELETE {}",
                    quote_ident(&format!("fk_{table}_{}", c.name)),
                    quote_ident(&c.name),
                    quote_ident(&fk.table),
                    quote_ident(&fk.column),
                    fk.on_delete.sql()
                ));
            }
        }

        let mut sql = format!(
            "CREATE TABLE {} (\n{}\n);\n",
            quote_ident(table),
            lines.join(",\n")
        );

        for c in self.columns.iter().filter(|c| c.references.is_some()) {
            sql.push_str(&format!(
                "CREATE INDEX {} ON {} ({});\n",
                quote_ident(&format!("idx_{table}_{}", c.name)),
                quote_ident(table),
                quote_ident(&c.name)
            ));
        }

        sql
    }

    pub fn drop_sql(&self) -> String {
        drop_table_sql(&self.name)
    }
}

pub fn drop_table_sql(table: &str) -> String {
    format!("DROP TABLE IF EXISTS {}", quote_ident(table))
}

/// Double-quote a SQL identifier.
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Single-quote a SQL string literal.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

// ---------------------------------------------------------------------------
// Table builders
// ---------------------------------------------------------------------------

/// Primary entity table.
///
/// Column order: `id`, declared fields, `author_id`, SEO columns (iff seo),
/// `created_at`, `updated_at`, `deleted_at` (iff trash).
pub fn primary_table(config: &ModuleConfig) -> TableSchema {
    let descriptor = &config.descriptor;
    let mut columns = vec![ColumnDef::id()];

    columns.extend(descriptor.fields.iter().map(|f| {
        ColumnDef::new(&f.code, column_type_for(f.field_type), !f.required)
    }));

    columns.push(ColumnDef {
        references: Some(ForeignKey {
            table: USERS_TABLE.into(),
            column: "id".into(),
            on_delete: OnDelete::SetNull,
        }),
        ..ColumnDef::new(AUTHOR_COLUMN, ColumnType::BigInt, true)
    });

    if descriptor.options.seo {
        columns.push(ColumnDef {
            unique: true,
            ..ColumnDef::new("slug", ColumnType::Varchar { length: 255 }, true)
        });
        columns.push(ColumnDef::new(
            "meta_title",
            ColumnType::Varchar { length: 255 },
            true,
        ));
        columns.push(ColumnDef::new("meta_description", ColumnType::Text, true));
        columns.push(ColumnDef::new(
            "meta_keywords",
            ColumnType::Varchar { length: 255 },
            true,
        ));
    }

    columns.push(ColumnDef::timestamp("created_at"));
    columns.push(ColumnDef::timestamp("updated_at"));

    if descriptor.options.trash {
        columns.push(ColumnDef::new(
            DELETED_AT_COLUMN,
            ColumnType::TimestampTz,
            true,
        ));
    }

    TableSchema {
        name: config.names.primary_table.clone(),
        columns,
    }
}

/// Key/value translation table: `{id, code, ru, en, timestamps, deleted_at}`.
pub fn translation_table(config: &ModuleConfig) -> TableSchema {
    TableSchema {
        name: config.names.trans_table.clone(),
        columns: vec![
            ColumnDef::id(),
            ColumnDef {
                unique: true,
                ..ColumnDef::new("code", ColumnType::Varchar { length: 255 }, false)
            },
            ColumnDef::new(DEFAULT_LOCALE, ColumnType::Text, true),
            ColumnDef::new(SECONDARY_LOCALE, ColumnType::Text, true),
            ColumnDef::timestamp("created_at"),
            ColumnDef::timestamp("updated_at"),
            ColumnDef::new(DELETED_AT_COLUMN, ColumnType::TimestampTz, true),
        ],
    }
}

// ---------------------------------------------------------------------------
// Translation seeds
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationSeed {
    pub code: String,
    pub ru: String,
    pub en: Option<String>,
}

/// Rows seeded into the translation table: module name, module description,
/// then one row per field. Always `2 + fields.len()` rows.
pub fn translation_seeds(descriptor: &ModuleDescriptor) -> Vec<TranslationSeed> {
    let text = |map: &crate::descriptor::LocalizedText, locale: &str| {
        crate::descriptor::localized(map, locale).map(str::to_string)
    };

    let mut seeds = vec![
        TranslationSeed {
            code: MOD_NAME_KEY.into(),
            ru: text(&descriptor.name, DEFAULT_LOCALE).unwrap_or_else(|| descriptor.code.clone()),
            en: text(&descriptor.name, SECONDARY_LOCALE),
        },
        TranslationSeed {
            code: MOD_DESCRIPTION_KEY.into(),
            ru: text(&descriptor.description, DEFAULT_LOCALE).unwrap_or_default(),
            en: text(&descriptor.description, SECONDARY_LOCALE),
        },
    ];

    seeds.extend(descriptor.fields.iter().map(|f| TranslationSeed {
        code: f.code.clone(),
        ru: f.label(DEFAULT_LOCALE).to_string(),
        en: text(&f.name, SECONDARY_LOCALE),
    }));

    seeds
}

fn seed_insert_sql(table: &str, seeds: &[TranslationSeed]) -> String {
    if seeds.is_empty() {
        return String::new();
    }
    let rows: Vec<String> = seeds
        .iter()
        .map(|s| {
            format!(
                "    ({}, {}, {})",
                quote_literal(&s.code),
                quote_literal(&s.ru),
                s.en.as_deref().map_or("NULL".to_string(), quote_literal)
            )
        })
        .collect();
    format!(
        "INSERT INTO {} ({}, {}, {}) VALUES\n{};\n",
        quote_ident(table),
        quote_ident("code"),
        quote_ident(DEFAULT_LOCALE),
        quote_ident(SECONDARY_LOCALE),
        rows.join(",\n")
    )
}

// ---------------------------------------------------------------------------
// Migrations
// ---------------------------------------------------------------------------

/// One migration file, written to the module directory and applied as a
/// single step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationUnit {
    pub version: i64,
    /// e.g. `create_news_table`
    pub name: String,
    /// Table the migration creates.
    pub table: String,
    pub sql: String,
}

impl MigrationUnit {
    /// Record name stored in `module_migrations`: `{version}_{name}`.
    pub fn record_name(&self) -> String {
        format!("{}_{}", self.version, self.name)
    }

    pub fn file_name(&self) -> String {
        format!("{}.sql", self.record_name())
    }

    /// SHA-256 hex digest of the SQL body.
    pub fn checksum(&self) -> String {
        let hash = Sha256::digest(self.sql.as_bytes());
        format!("{hash:x}")
    }
}

/// Migration version for `now`, formatted as the digits `YYYYMMDDHHMMSS`.
pub fn migration_version(now: Timestamp) -> i64 {
    let date = i64::from(now.year()) * 10_000 + i64::from(now.month()) * 100 + i64::from(now.day());
    let time =
        i64::from(now.hour()) * 10_000 + i64::from(now.minute()) * 100 + i64::from(now.second());
    date * 1_000_000 + time
}

pub fn primary_migration(config: &ModuleConfig, version: i64) -> MigrationUnit {
    let table = primary_table(config);
    MigrationUnit {
        version,
        name: config.names.migration_primary.clone(),
        sql: table.create_sql(),
        table: table.name,
    }
}

/// Translation table migration, seeded in the same unit.
pub fn translation_migration(config: &ModuleConfig, version: i64) -> MigrationUnit {
    let table = translation_table(config);
    let mut sql = table.create_sql();
    sql.push_str(&seed_insert_sql(
        &table.name,
        &translation_seeds(&config.descriptor),
    ));
    MigrationUnit {
        version,
        name: config.names.migration_trans.clone(),
        sql,
        table: table.name,
    }
}
