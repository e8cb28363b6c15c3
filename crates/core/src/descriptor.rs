//! Module descriptor types: the validated, immutable description of a
//! module to be generated.
//!
//! A descriptor is built once per generation request by
//! [`crate::module_config::build_config`] and never mutated afterwards.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Locales
// ---------------------------------------------------------------------------

/// Locale every label must be provided in.
pub const DEFAULT_LOCALE: &str = "ru";

/// Second locale stored in translation tables.
pub const SECONDARY_LOCALE: &str = "en";

/// Locale code -> human label.
pub type LocalizedText = BTreeMap<String, String>;

/// Look up a non-blank label for `locale`.
pub fn localized<'a>(text: &'a LocalizedText, locale: &str) -> Option<&'a str> {
    text.get(locale)
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
}

// ---------------------------------------------------------------------------
// System columns
// ---------------------------------------------------------------------------

/// Columns the generator adds itself. Declared fields may not reuse them.
pub const SYSTEM_COLUMNS: &[&str] = &[
    "id",
    "author_id",
    "created_at",
    "updated_at",
    "deleted_at",
    "slug",
    "meta_title",
    "meta_description",
    "meta_keywords",
];

/// Columns added when the SEO option is enabled, in table order.
pub const SEO_COLUMNS: &[&str] = &["slug", "meta_title", "meta_description", "meta_keywords"];

/// Author foreign key column present on every primary table.
pub const AUTHOR_COLUMN: &str = "author_id";

/// Soft-delete timestamp column.
pub const DELETED_AT_COLUMN: &str = "deleted_at";

// ---------------------------------------------------------------------------
// Field types
// ---------------------------------------------------------------------------

/// UI type of a declared field.
///
/// The set is closed: an unknown type in a request is a deserialization
/// error, never a silent fallback to a string column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Text,
    Integer,
    Decimal,
}

impl FieldType {
    /// Textual fields take part in the listing search predicate.
    pub fn is_textual(self) -> bool {
        match self {
            FieldType::String | FieldType::Text => true,
            FieldType::Integer | FieldType::Decimal => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Text => "text",
            FieldType::Integer => "integer",
            FieldType::Decimal => "decimal",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One user-declared column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub code: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub name: LocalizedText,
    #[serde(default)]
    pub required: bool,
}

impl FieldSpec {
    /// Label in `locale`, falling back to the field code when missing.
    pub fn label(&self, locale: &str) -> &str {
        localized(&self.name, locale).unwrap_or(&self.code)
    }
}

// ---------------------------------------------------------------------------
// Options and status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleOptions {
    /// Adds slug / meta columns.
    pub seo: bool,
    /// Adds the `deleted_at` column and the trash routes.
    pub trash: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleStatus {
    Active,
    Inactive,
}

impl ModuleStatus {
    pub const ALL: &'static [&'static str] = &["active", "inactive"];

    pub fn as_str(self) -> &'static str {
        match self {
            ModuleStatus::Active => "active",
            ModuleStatus::Inactive => "inactive",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "active" => Some(ModuleStatus::Active),
            "inactive" => Some(ModuleStatus::Inactive),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Descriptor
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleDescriptor {
    /// Lowercase identifier, also the primary table name.
    pub code: String,
    pub slug: String,
    pub status: ModuleStatus,
    pub name: LocalizedText,
    pub description: LocalizedText,
    pub fields: Vec<FieldSpec>,
    pub options: ModuleOptions,
}

impl ModuleDescriptor {
    pub fn display_name(&self, locale: &str) -> Option<&str> {
        localized(&self.name, locale)
    }

    pub fn field(&self, code: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.code == code)
    }

    pub fn field_codes(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.code.as_str())
    }
}
