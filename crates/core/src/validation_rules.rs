//! Request validation rules for generated modules.
//!
//! Each declared field type maps to a fixed rule list. A [`RequestValidator`]
//! checks a JSON object against those rules and produces the column values to
//! bind, already normalised to text so the SQL layer can `CAST` them into the
//! column type.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::descriptor::{FieldSpec, FieldType, ModuleDescriptor};

/// Maximum length of `string` fields and SEO varchar columns.
pub const MAX_STRING_LEN: usize = 255;

/// Digits allowed before the decimal point (`DECIMAL(10,2)`).
pub const DECIMAL_INTEGER_DIGITS: usize = 8;

/// Digits allowed after the decimal point.
pub const DECIMAL_FRACTION_DIGITS: usize = 2;

static ENTITY_SLUG_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9-]+$").expect("valid slug regex"));

static DECIMAL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?(\d+)(?:\.(\d+))?$").expect("valid decimal regex"));

/// Column -> error messages.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Validated column values, in rule order. `None` binds SQL `NULL`.
pub type ValidatedValues = Vec<(String, Option<String>)>;

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum Rule {
    Required,
    Nullable,
    String { max: Option<usize> },
    Integer,
    Decimal { integer_digits: usize, fraction_digits: usize },
    Slug { max: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRules {
    pub column: String,
    pub rules: Vec<Rule>,
}

impl FieldRules {
    pub fn is_required(&self) -> bool {
        self.rules.contains(&Rule::Required)
    }
}

/// Rules for one declared field.
pub fn rules_for_field(field: &FieldSpec) -> Vec<Rule> {
    let presence = if field.required {
        Rule::Required
    } else {
        Rule::Nullable
    };
    let kind = match field.field_type {
        FieldType::String => Rule::String {
            max: Some(MAX_STRING_LEN),
        },
        FieldType::Text => Rule::String { max: None },
        FieldType::Integer => Rule::Integer,
        FieldType::Decimal => Rule::Decimal {
            integer_digits: DECIMAL_INTEGER_DIGITS,
            fraction_digits: DECIMAL_FRACTION_DIGITS,
        },
    };
    vec![presence, kind]
}

fn seo_rules() -> Vec<FieldRules> {
    vec![
        FieldRules {
            column: "slug".into(),
            rules: vec![Rule::Nullable, Rule::Slug { max: MAX_STRING_LEN }],
        },
        FieldRules {
            column: "meta_title".into(),
            rules: vec![
                Rule::Nullable,
                Rule::String {
                    max: Some(MAX_STRING_LEN),
                },
            ],
        },
        FieldRules {
            column: "meta_description".into(),
            rules: vec![Rule::Nullable, Rule::String { max: None }],
        },
        FieldRules {
            column: "meta_keywords".into(),
            rules: vec![
                Rule::Nullable,
                Rule::String {
                    max: Some(MAX_STRING_LEN),
                },
            ],
        },
    ]
}

// ---------------------------------------------------------------------------
// Validator
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationMode {
    /// Every required column must be present.
    Store,
    /// Absent columns are left untouched.
    Update,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestValidator {
    pub name: String,
    pub mode: ValidationMode,
    pub fields: Vec<FieldRules>,
}

impl RequestValidator {
    /// Build the validator for `descriptor`: declared fields, then the SEO
    /// columns when enabled.
    pub fn for_module(
        name: impl Into<String>,
        mode: ValidationMode,
        descriptor: &ModuleDescriptor,
    ) -> Self {
        let mut fields: Vec<FieldRules> = descriptor
            .fields
            .iter()
            .map(|f| FieldRules {
                column: f.code.clone(),
                rules: rules_for_field(f),
            })
            .collect();
        if descriptor.options.seo {
            fields.extend(seo_rules());
        }
        Self {
            name: name.into(),
            mode,
            fields,
        }
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.column.as_str())
    }

    /// Validate `input` and return the values to bind.
    ///
    /// Unknown keys are errors. Blank strings on optional columns become
    /// `NULL`.
    pub fn validate(&self, input: &Map<String, Value>) -> Result<ValidatedValues, FieldErrors> {
        let mut errors = FieldErrors::new();
        let mut values = ValidatedValues::new();

        for key in input.keys() {
            if !self.fields.iter().any(|f| &f.column == key) {
                push_error(&mut errors, key, "is not a writable field");
            }
        }

        for field in &self.fields {
            let value = input.get(&field.column);
            match (value, self.mode) {
                (None, ValidationMode::Store) if field.is_required() => {
                    push_error(&mut errors, &field.column, "is required");
                }
                (None, _) => {}
                (Some(value), _) => match check_value(field, value) {
                    Ok(bound) => values.push((field.column.clone(), bound)),
                    Err(message) => push_error(&mut errors, &field.column, &message),
                },
            }
        }

        if errors.is_empty() {
            Ok(values)
        } else {
            Err(errors)
        }
    }
}

fn push_error(errors: &mut FieldErrors, column: &str, message: &str) {
    errors
        .entry(column.to_string())
        .or_default()
        .push(message.to_string());
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Check one present value against the column's rules.
fn check_value(field: &FieldRules, value: &Value) -> Result<Option<String>, String> {
    if is_blank(value) {
        return if field.is_required() {
            Err("is required".into())
        } else {
            Ok(None)
        };
    }

    for rule in &field.rules {
        match rule {
            Rule::Required | Rule::Nullable => {}
            Rule::String { max } => return check_string(value, *max),
            Rule::Integer => return check_integer(value),
            Rule::Decimal {
                integer_digits,
                fraction_digits,
            } => return check_decimal(value, *integer_digits, *fraction_digits),
            Rule::Slug { max } => return check_slug(value, *max),
        }
    }
    Ok(value.as_str().map(str::to_string))
}

fn check_string(value: &Value, max: Option<usize>) -> Result<Option<String>, String> {
    let Value::String(s) = value else {
        return Err("must be a string".into());
    };
    if let Some(max) = max {
        if s.chars().count() > max {
            return Err(format!("must not be longer than {max} characters"));
        }
    }
    Ok(Some(s.clone()))
}

fn check_integer(value: &Value) -> Result<Option<String>, String> {
    let parsed = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    let n = parsed.ok_or_else(|| "must be an integer".to_string())?;
    let n = i32::try_from(n).map_err(|_| "is out of range for an integer".to_string())?;
    Ok(Some(n.to_string()))
}

fn check_decimal(
    value: &Value,
    integer_digits: usize,
    fraction_digits: usize,
) -> Result<Option<String>, String> {
    let text = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return Err("must be a number".into()),
    };
    let caps = DECIMAL_PATTERN
        .captures(&text)
        .ok_or_else(|| "must be a number".to_string())?;

    let int_part = caps.get(1).map_or("", |m| m.as_str()).trim_start_matches('0');
    let frac_part = caps.get(2).map_or("", |m| m.as_str());
    if int_part.len() > integer_digits {
        return Err(format!(
            "must have at most {integer_digits} digits before the decimal point"
        ));
    }
    if frac_part.len() > fraction_digits {
        return Err(format!(
            "must have at most {fraction_digits} decimal places"
        ));
    }
    Ok(Some(text))
}

fn check_slug(value: &Value, max: usize) -> Result<Option<String>, String> {
    let Value::String(s) = value else {
        return Err("must be a string".into());
    };
    if s.chars().count() > max {
        return Err(format!("must not be longer than {max} characters"));
    }
    if !ENTITY_SLUG_PATTERN.is_match(s) {
        return Err("may only contain lowercase letters, digits and hyphens".into());
    }
    Ok(Some(s.clone()))
}
