//! Module configuration builder.
//!
//! Turns an inbound generation request into the immutable [`ModuleConfig`]
//! consumed by every generator. Pure: no database or filesystem access.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::descriptor::{
    localized, FieldSpec, FieldType, LocalizedText, ModuleDescriptor, ModuleOptions,
    ModuleStatus, DEFAULT_LOCALE, SYSTEM_COLUMNS,
};
use crate::generation::GenerationError;
use crate::naming::{derive_names, ModuleNames};

/// Longest module code accepted. Keeps every derived identifier
/// (`create_{code}_trans_table`, `uq_{code}_trans_code`, ...) under the
/// 63-byte Postgres limit.
pub const MAX_CODE_LEN: u64 = 40;

/// Longest field code accepted.
pub const MAX_FIELD_CODE_LEN: u64 = 63;

pub const MAX_SLUG_LEN: u64 = 100;

static IDENTIFIER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z][a-z0-9_]*$").expect("valid identifier regex"));

/// Lowercase words joined by single underscores, each word starting with a
/// letter. Distinct codes then derive distinct studly names and directories.
static MODULE_CODE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z][a-z0-9]*(?:_[a-z][a-z0-9]*)*$").expect("valid module code regex")
});

static SLUG_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9][a-z0-9-]*$").expect("valid slug regex"));

// ---------------------------------------------------------------------------
// Inbound request
// ---------------------------------------------------------------------------

/// Module-creation payload as posted by the admin panel.
///
/// String keys default to empty so a missing key surfaces as a validation
/// error naming that key rather than a generic body rejection.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct GenerateModuleRequest {
    #[serde(default)]
    #[validate(
        length(max = MAX_CODE_LEN),
        regex(
            path = *MODULE_CODE_PATTERN,
            message = "must be lowercase words separated by single underscores, each starting with a letter"
        )
    )]
    pub code_module: String,
    #[serde(default)]
    #[validate(
        length(max = MAX_SLUG_LEN),
        regex(path = *SLUG_PATTERN, message = "must match ^[a-z0-9][a-z0-9-]*$")
    )]
    pub slug: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub name: LocalizedText,
    #[serde(default)]
    pub description: LocalizedText,
    #[serde(default)]
    pub option_seo: bool,
    #[serde(default)]
    pub option_trash: bool,
    #[serde(default)]
    #[validate(nested)]
    pub properties: Vec<PropertyInput>,
}

/// One declared field in the inbound request.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PropertyInput {
    #[validate(
        length(max = MAX_FIELD_CODE_LEN),
        regex(path = *IDENTIFIER_PATTERN, message = "must match ^[a-z][a-z0-9_]*$")
    )]
    pub code: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub name: LocalizedText,
    #[serde(default)]
    pub required: bool,
}

// ---------------------------------------------------------------------------
// Built configuration
// ---------------------------------------------------------------------------

/// Everything the generators need, computed once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleConfig {
    pub descriptor: ModuleDescriptor,
    pub names: ModuleNames,
    /// Absolute directory the module artifacts are written to.
    pub base_dir: PathBuf,
}

impl ModuleConfig {
    pub fn code(&self) -> &str {
        &self.descriptor.code
    }

    pub fn options(&self) -> ModuleOptions {
        self.descriptor.options
    }

    pub fn migrations_dir(&self) -> PathBuf {
        self.base_dir.join("migrations")
    }
}

/// Whether `code` has the shape of a module code.
pub fn is_module_code(code: &str) -> bool {
    MODULE_CODE_PATTERN.is_match(code)
}

/// Directory a module with `code` lives in under `modules_root`.
pub fn module_dir(modules_root: &Path, code: &str) -> Result<PathBuf, GenerationError> {
    let names = derive_names(code).map_err(|e| GenerationError::validation("code_module", e))?;
    Ok(modules_root.join(names.base_path))
}

/// Validate `request` and build the module configuration.
pub fn build_config(
    request: &GenerateModuleRequest,
    modules_root: &Path,
) -> Result<ModuleConfig, GenerationError> {
    require_present("code_module", &request.code_module)?;
    require_present("slug", &request.slug)?;
    require_present("status", &request.status)?;
    if localized(&request.name, DEFAULT_LOCALE).is_none() {
        return Err(GenerationError::validation(
            "name",
            format!("Display name in locale '{DEFAULT_LOCALE}' is required"),
        ));
    }

    request
        .validate()
        .map_err(|e| GenerationError::validation_message(e.to_string()))?;

    let status = ModuleStatus::parse(&request.status).ok_or_else(|| {
        GenerationError::validation(
            "status",
            format!(
                "Unknown status '{}'. Known: {}",
                request.status,
                ModuleStatus::ALL.join(", ")
            ),
        )
    })?;

    let fields = build_fields(&request.properties)?;
    let code = request.code_module.trim().to_string();
    let names = derive_names(&code).map_err(|e| GenerationError::validation("code_module", e))?;
    let base_dir = modules_root.join(&names.base_path);

    let descriptor = ModuleDescriptor {
        code,
        slug: request.slug.trim().to_string(),
        status,
        name: request.name.clone(),
        description: request.description.clone(),
        fields,
        options: ModuleOptions {
            seo: request.option_seo,
            trash: request.option_trash,
        },
    };

    Ok(ModuleConfig {
        descriptor,
        names,
        base_dir,
    })
}

fn require_present(field: &str, value: &str) -> Result<(), GenerationError> {
    if value.trim().is_empty() {
        return Err(GenerationError::validation(
            field,
            format!("{field} is required"),
        ));
    }
    Ok(())
}

fn build_fields(properties: &[PropertyInput]) -> Result<Vec<FieldSpec>, GenerationError> {
    let mut seen = HashSet::new();
    let mut fields = Vec::with_capacity(properties.len());

    for property in properties {
        let code = property.code.trim();
        if SYSTEM_COLUMNS.contains(&code) {
            return Err(GenerationError::validation(
                "properties",
                format!("Field code '{code}' collides with a generated system column"),
            ));
        }
        if !seen.insert(code.to_string()) {
            return Err(GenerationError::validation(
                "properties",
                format!("Field code '{code}' is declared more than once"),
            ));
        }
        fields.push(FieldSpec {
            code: code.to_string(),
            field_type: property.field_type,
            name: property.name.clone(),
            required: property.required,
        });
    }

    Ok(fields)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn labels(ru: &str) -> LocalizedText {
        LocalizedText::from([("ru".to_string(), ru.to_string())])
    }

    fn news_request() -> GenerateModuleRequest {
        GenerateModuleRequest {
            code_module: "news".into(),
            slug: "novosti".into(),
            status: "active".into(),
            name: labels("Новости"),
            description: labels("Лента новостей"),
            option_seo: true,
            option_trash: false,
            properties: vec![
                PropertyInput {
                    code: "title".into(),
                    field_type: FieldType::String,
                    name: labels("Заголовок"),
                    required: true,
                },
                PropertyInput {
                    code: "views".into(),
                    field_type: FieldType::Integer,
                    name: labels("Просмотры"),
                    required: false,
                },
            ],
        }
    }

    #[test]
    fn builds_descriptor_and_derived_names() {
        let config = build_config(&news_request(), Path::new("/srv/modules")).unwrap();
        assert_eq!(config.code(), "news");
        assert_eq!(config.descriptor.status, ModuleStatus::Active);
        assert_eq!(config.descriptor.fields.len(), 2);
        assert!(config.options().seo);
        assert!(!config.options().trash);
        assert_eq!(config.names.trans_table, "news_trans");
        assert_eq!(config.base_dir, PathBuf::from("/srv/modules/News"));
        assert_eq!(
            config.migrations_dir(),
            PathBuf::from("/srv/modules/News/migrations")
        );
    }

    #[test]
    fn building_twice_is_deterministic() {
        let a = build_config(&news_request(), Path::new("/m")).unwrap();
        let b = build_config(&news_request(), Path::new("/m")).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn empty_request_rejected() {
        let err = build_config(&GenerateModuleRequest::default(), Path::new("/m")).unwrap_err();
        assert_matches!(err, GenerationError::Validation { field: Some(ref f), .. } if f == "code_module");
    }

    #[test]
    fn missing_ru_name_rejected() {
        let mut request = news_request();
        request.name = LocalizedText::from([("en".to_string(), "News".to_string())]);
        let err = build_config(&request, Path::new("/m")).unwrap_err();
        assert_matches!(err, GenerationError::Validation { field: Some(ref f), .. } if f == "name");
    }

    #[test]
    fn missing_status_rejected() {
        let mut request = news_request();
        request.status = String::new();
        assert_matches!(
            build_config(&request, Path::new("/m")),
            Err(GenerationError::Validation { .. })
        );
    }

    #[test]
    fn unknown_status_rejected() {
        let mut request = news_request();
        request.status = "archived".into();
        assert!(build_config(&request, Path::new("/m")).is_err());
    }

    #[test]
    fn uppercase_code_rejected() {
        let mut request = news_request();
        request.code_module = "News".into();
        assert!(build_config(&request, Path::new("/m")).is_err());
    }

    #[test]
    fn ambiguous_codes_rejected() {
        for code in ["news_2", "news__items", "news_", "_news"] {
            let mut request = news_request();
            request.code_module = code.into();
            let err = build_config(&request, Path::new("/m")).unwrap_err();
            assert!(err.to_string().contains("code_module"), "{code}: {err}");
            assert_matches!(err, GenerationError::Validation { .. });
        }
    }

    #[test]
    fn accepted_codes_get_distinct_directories() {
        let codes = ["news2", "news_items", "newsitems", "news2_items", "news2items"];
        let mut dirs: Vec<PathBuf> = codes
            .iter()
            .map(|code| {
                assert!(is_module_code(code), "{code} rejected");
                module_dir(Path::new("/m"), code).unwrap()
            })
            .collect();
        dirs.sort();
        dirs.dedup();
        assert_eq!(dirs.len(), codes.len());
    }

    #[test]
    fn overlong_code_rejected() {
        let mut request = news_request();
        request.code_module = "a".repeat(41);
        assert!(build_config(&request, Path::new("/m")).is_err());
    }

    #[test]
    fn bad_slug_rejected() {
        let mut request = news_request();
        request.slug = "Новости".into();
        assert!(build_config(&request, Path::new("/m")).is_err());
    }

    #[test]
    fn duplicate_field_codes_rejected() {
        let mut request = news_request();
        request.properties[1].code = "title".into();
        let err = build_config(&request, Path::new("/m")).unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn system_column_field_rejected() {
        for system in SYSTEM_COLUMNS {
            let mut request = news_request();
            request.properties[0].code = system.to_string();
            assert!(
                build_config(&request, Path::new("/m")).is_err(),
                "{system} should be rejected as a field code"
            );
        }
    }

    #[test]
    fn invalid_field_code_rejected() {
        let mut request = news_request();
        request.properties[0].code = "1title".into();
        assert!(build_config(&request, Path::new("/m")).is_err());
    }

    #[test]
    fn module_without_fields_is_allowed() {
        let mut request = news_request();
        request.properties.clear();
        let config = build_config(&request, Path::new("/m")).unwrap();
        assert!(config.descriptor.fields.is_empty());
    }
}
