//! Module naming convention engine.
//!
//! Derives every canonical name of a generated module from its raw code:
//! table names, migration names, artifact names, namespaces and the
//! directory the module's artifacts live in.

use heck::ToUpperCamelCase;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Root namespace for generated modules.
pub const MODULES_NAMESPACE: &str = "modules";

/// Suffix of the translation table.
pub const TRANS_TABLE_SUFFIX: &str = "_trans";

/// Canonical names derived from a module code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleNames {
    /// UpperCamelCase module name, e.g. `NewsItems`.
    pub studly_name: String,
    /// `modules::news_items`
    pub base_namespace: String,
    pub model_namespace: String,
    pub controller_namespace: String,
    pub request_namespace: String,
    /// Directory of the module relative to the modules root, e.g. `NewsItems`.
    pub base_path: String,
    pub primary_table: String,
    pub trans_table: String,
    pub migration_primary: String,
    pub migration_trans: String,
    pub model_name: String,
    pub controller_name: String,
    pub api_controller_name: String,
    pub store_request_name: String,
    pub update_request_name: String,
    /// `admin.{code}.`
    pub route_name_prefix: String,
    /// `api.{code}.`
    pub api_route_name_prefix: String,
}

/// Derive all canonical names for `code`.
///
/// The code is used verbatim as the primary table name; callers validate its
/// format before calling this.
///
/// # Examples
///
/// ```
/// use cms_core::naming::derive_names;
///
/// let names = derive_names("news_items").unwrap();
/// assert_eq!(names.studly_name, "NewsItems");
/// assert_eq!(names.trans_table, "news_items_trans");
/// assert_eq!(names.migration_primary, "create_news_items_table");
/// ```
pub fn derive_names(code: &str) -> Result<ModuleNames, CoreError> {
    let code = code.trim();
    if code.is_empty() {
        return Err(CoreError::Validation("Module code must not be empty".into()));
    }

    let studly = code.to_upper_camel_case();
    let base_namespace = format!("{MODULES_NAMESPACE}::{code}");
    let trans_table = format!("{code}{TRANS_TABLE_SUFFIX}");

    Ok(ModuleNames {
        model_namespace: format!("{base_namespace}::model"),
        controller_namespace: format!("{base_namespace}::controller"),
        request_namespace: format!("{base_namespace}::requests"),
        base_namespace,
        base_path: studly.clone(),
        primary_table: code.to_string(),
        migration_primary: format!("create_{code}_table"),
        migration_trans: format!("create_{trans_table}_table"),
        trans_table,
        model_name: studly.clone(),
        controller_name: format!("{studly}Controller"),
        api_controller_name: format!("{studly}ApiController"),
        store_request_name: format!("Store{studly}Request"),
        update_request_name: format!("Update{studly}Request"),
        route_name_prefix: format!("admin.{code}."),
        api_route_name_prefix: format!("api.{code}."),
        studly_name: studly,
    })
}
