//! Reserved-name policy for module codes and slugs.
//!
//! A module code becomes a table name and a slug becomes a route segment, so
//! both must stay clear of identifiers owned by the platform itself.

// ---------------------------------------------------------------------------
// Reserved lists
// ---------------------------------------------------------------------------

/// Tables owned by the framework and the CMS itself.
pub const RESERVED_TABLES: &[&str] = &[
    // framework
    "users",
    "roles",
    "permissions",
    "role_permissions",
    "user_roles",
    "sessions",
    "cache",
    "cache_locks",
    "jobs",
    "job_batches",
    "failed_jobs",
    "migrations",
    "password_reset_tokens",
    "personal_access_tokens",
    // CMS
    "modules",
    "module_migrations",
    "pages",
    "iblocks",
    "iblock_elements",
    "catalog",
    "catalog_items",
    "media",
    "media_lib",
    "integrators",
    "settings",
    "languages",
    "translations",
    "menus",
    "notifications",
];

/// Table prefixes reserved for temporary, backup and engine tables.
pub const RESERVED_PREFIXES: &[&str] = &[
    "pg_", "sqlx_", "tmp_", "temp_", "backup_", "bak_", "old_", "sys_",
];

/// Route segments the admin panel and API already use.
pub const RESERVED_SLUGS: &[&str] = &[
    "admin",
    "api",
    "auth",
    "login",
    "logout",
    "register",
    "password",
    "dashboard",
    "health",
    "modules",
    "m",
    "index",
    "create",
    "store",
    "show",
    "edit",
    "update",
    "destroy",
    "delete",
    "trash",
    "restore",
    "force",
    "empty",
];

/// SQL keywords rejected as table names.
pub const SQL_RESERVED_WORDS: &[&str] = &[
    "all", "alter", "and", "as", "case", "check", "column", "constraint", "create", "default",
    "delete", "distinct", "drop", "else", "end", "false", "from", "grant", "group", "having",
    "in", "index", "insert", "into", "join", "limit", "not", "null", "offset", "on", "or",
    "order", "primary", "references", "select", "set", "table", "then", "to", "true", "union",
    "update", "user", "values", "when", "where",
];

// ---------------------------------------------------------------------------
// Checks
// ---------------------------------------------------------------------------

/// A single reserved-name violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservedViolation {
    /// Request field the violation is attributed to.
    pub field: &'static str,
    pub name: String,
    pub message: String,
}

/// Check `code` and `slug` against every reserved list.
///
/// Returns one violation per match; an empty vector means both names are
/// allowed.
pub fn check_reserved(code: &str, slug: &str) -> Vec<ReservedViolation> {
    let code = code.trim().to_lowercase();
    let slug = slug.trim().to_lowercase();
    let mut violations = Vec::new();

    if RESERVED_TABLES.contains(&code.as_str()) {
        violations.push(ReservedViolation {
            field: "code_module",
            name: code.clone(),
            message: format!("Module code '{code}' is a reserved system table name"),
        });
    }

    if let Some(prefix) = RESERVED_PREFIXES.iter().find(|p| code.starts_with(*p)) {
        violations.push(ReservedViolation {
            field: "code_module",
            name: code.clone(),
            message: format!("Module code '{code}' uses the reserved prefix '{prefix}'"),
        });
    }

    if SQL_RESERVED_WORDS.contains(&code.as_str()) {
        violations.push(ReservedViolation {
            field: "code_module",
            name: code.clone(),
            message: format!("Module code '{code}' is a reserved SQL word"),
        });
    }

    if RESERVED_SLUGS.contains(&slug.as_str()) {
        violations.push(ReservedViolation {
            field: "slug",
            name: slug.clone(),
            message: format!("Slug '{slug}' is a reserved route segment"),
        });
    }

    violations
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_reserved_table_is_rejected() {
        for name in RESERVED_TABLES {
            let violations = check_reserved(name, "anything");
            assert!(
                violations.iter().any(|v| v.message.contains(name)),
                "{name} should be rejected"
            );
        }
    }

    #[test]
    fn every_reserved_slug_is_rejected() {
        for slug in RESERVED_SLUGS {
            let violations = check_reserved("fine_code", slug);
            assert_eq!(violations.len(), 1, "{slug} should be rejected");
            assert_eq!(violations[0].field, "slug");
        }
    }

    #[test]
    fn reserved_prefix_rejected() {
        let violations = check_reserved("tmp_news", "news");
        assert_eq!(violations.len(), 1);
        assert!(violations[0].message.contains("tmp_"));
    }

    #[test]
    fn sql_word_rejected() {
        let violations = check_reserved("select", "select-things");
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].field, "code_module");
    }

    #[test]
    fn cache_is_reserved() {
        let violations = check_reserved("cache", "whatever");
        assert_eq!(violations[0].name, "cache");
    }

    #[test]
    fn ordinary_names_pass() {
        assert!(check_reserved("news", "novosti").is_empty());
        assert!(check_reserved("promo", "promo-actions").is_empty());
    }

    #[test]
    fn comparison_is_case_insensitive() {
        assert!(!check_reserved("Users", "x").is_empty());
        assert!(!check_reserved("x", "ADMIN").is_empty());
    }
}
