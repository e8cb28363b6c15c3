//! Conflict detection for proposed module codes and slugs.
//!
//! Generation touches the live schema and the filesystem with no cross
//! resource transaction, so every collision must be found before the first
//! side effect. The reserved-name policy runs first and short-circuits; the
//! five resource checks always all run so the operator sees every collision
//! at once.

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::reserved::check_reserved;
use crate::roles::module_permission_prefix;

// ---------------------------------------------------------------------------
// Verdict
// ---------------------------------------------------------------------------

/// Which kind of rejection a verdict represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    /// Naming-policy violation, attributable to a request field.
    ReservedName,
    /// A resource with this name already exists somewhere in the system.
    ExistingResource,
    /// Another generation run holds the lock for this code.
    GenerationInProgress,
}

/// The resource check that found a collision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceCheck {
    Registry,
    Schema,
    Filesystem,
    MigrationHistory,
    Permission,
}

impl ResourceCheck {
    pub fn label(self) -> &'static str {
        match self {
            ResourceCheck::Registry => "module registry",
            ResourceCheck::Schema => "database table",
            ResourceCheck::Filesystem => "module directory",
            ResourceCheck::MigrationHistory => "migration history",
            ResourceCheck::Permission => "permissions",
        }
    }
}

/// One colliding resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceConflict {
    pub check: ResourceCheck,
    pub resource: String,
}

impl ResourceConflict {
    pub fn new(check: ResourceCheck, resource: impl Into<String>) -> Self {
        Self {
            check,
            resource: resource.into(),
        }
    }

    pub fn describe(&self) -> String {
        format!("{} already contains '{}'", self.check.label(), self.resource)
    }
}

/// Accept/reject decision for a proposed module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictVerdict {
    pub accepted: bool,
    pub kind: Option<ConflictKind>,
    /// Request field to annotate; only set for reserved-name violations.
    pub field: Option<String>,
    pub reasons: Vec<String>,
    #[serde(default)]
    pub resources: Vec<ResourceConflict>,
}

impl ConflictVerdict {
    pub fn accepted() -> Self {
        Self {
            accepted: true,
            kind: None,
            field: None,
            reasons: Vec::new(),
            resources: Vec::new(),
        }
    }

    pub fn in_progress(code: &str) -> Self {
        Self {
            accepted: false,
            kind: Some(ConflictKind::GenerationInProgress),
            field: None,
            reasons: vec![format!(
                "Another generation for module '{code}' is already running"
            )],
            resources: Vec::new(),
        }
    }

    /// Build a verdict from the collected resource collisions.
    pub fn from_resources(resources: Vec<ResourceConflict>) -> Self {
        if resources.is_empty() {
            return Self::accepted();
        }
        Self {
            accepted: false,
            kind: Some(ConflictKind::ExistingResource),
            field: None,
            reasons: resources.iter().map(ResourceConflict::describe).collect(),
            resources,
        }
    }

    /// One-line summary joining every reason.
    pub fn summary(&self) -> String {
        self.reasons.join("; ")
    }
}

// ---------------------------------------------------------------------------
// Resource lookup
// ---------------------------------------------------------------------------

/// Read-only view of the resources a module would claim.
///
/// Implemented over Postgres and the local filesystem by the API crate;
/// tests use in-memory fakes.
#[async_trait]
pub trait ResourceLookup: Send + Sync {
    /// Codes/slugs of registered modules matching either value.
    async fn registered_modules(&self, code: &str, slug: &str) -> Result<Vec<String>, CoreError>;

    async fn table_exists(&self, table: &str) -> Result<bool, CoreError>;

    async fn directory_exists(&self, path: &Path) -> Result<bool, CoreError>;

    /// Names of applied migrations whose name contains `needle`.
    async fn migrations_mentioning(&self, needle: &str) -> Result<Vec<String>, CoreError>;

    /// Permission names starting with `prefix`.
    async fn permissions_with_prefix(&self, prefix: &str) -> Result<Vec<String>, CoreError>;
}

/// Run the full conflict check for a proposed module.
///
/// `module_dir` is the directory the module's artifacts would be written to.
pub async fn check_conflicts(
    lookup: &dyn ResourceLookup,
    code: &str,
    slug: &str,
    module_dir: &Path,
) -> Result<ConflictVerdict, CoreError> {
    let violations = check_reserved(code, slug);
    if let Some(first) = violations.first() {
        return Ok(ConflictVerdict {
            accepted: false,
            kind: Some(ConflictKind::ReservedName),
            field: Some(first.field.to_string()),
            reasons: violations.iter().map(|v| v.message.clone()).collect(),
            resources: Vec::new(),
        });
    }

    let mut resources = Vec::new();

    for existing in lookup.registered_modules(code, slug).await? {
        resources.push(ResourceConflict::new(ResourceCheck::Registry, existing));
    }

    if lookup.table_exists(code).await? {
        resources.push(ResourceConflict::new(ResourceCheck::Schema, code));
    }

    if lookup.directory_exists(module_dir).await? {
        resources.push(ResourceConflict::new(
            ResourceCheck::Filesystem,
            module_dir.display().to_string(),
        ));
    }

    for migration in lookup.migrations_mentioning(code).await? {
        resources.push(ResourceConflict::new(ResourceCheck::MigrationHistory, migration));
    }

    for permission in lookup
        .permissions_with_prefix(&module_permission_prefix(code))
        .await?
    {
        resources.push(ResourceConflict::new(ResourceCheck::Permission, permission));
    }

    Ok(ConflictVerdict::from_resources(resources))
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[derive(Default)]
    struct FakeLookup {
        modules: Vec<String>,
        tables: Vec<String>,
        dirs: Vec<PathBuf>,
        migrations: Vec<String>,
        permissions: Vec<String>,
    }

    #[async_trait]
    impl ResourceLookup for FakeLookup {
        async fn registered_modules(
            &self,
            code: &str,
            slug: &str,
        ) -> Result<Vec<String>, CoreError> {
            Ok(self
                .modules
                .iter()
                .filter(|m| m.as_str() == code || m.as_str() == slug)
                .cloned()
                .collect())
        }

        async fn table_exists(&self, table: &str) -> Result<bool, CoreError> {
            Ok(self.tables.iter().any(|t| t == table))
        }

        async fn directory_exists(&self, path: &Path) -> Result<bool, CoreError> {
            Ok(self.dirs.iter().any(|d| d == path))
        }

        async fn migrations_mentioning(&self, needle: &str) -> Result<Vec<String>, CoreError> {
            Ok(self
                .migrations
                .iter()
                .filter(|m| m.contains(needle))
                .cloned()
                .collect())
        }

        async fn permissions_with_prefix(&self, prefix: &str) -> Result<Vec<String>, CoreError> {
            Ok(self
                .permissions
                .iter()
                .filter(|p| p.starts_with(prefix))
                .cloned()
                .collect())
        }
    }

    fn dir(code: &str) -> PathBuf {
        PathBuf::from("/srv/modules").join(code)
    }

    #[tokio::test]
    async fn clean_system_accepts() {
        let lookup = FakeLookup::default();
        let verdict = check_conflicts(&lookup, "news", "novosti", &dir("News"))
            .await
            .unwrap();
        assert!(verdict.accepted);
        assert!(verdict.kind.is_none());
        assert!(verdict.reasons.is_empty());
    }

    #[tokio::test]
    async fn reserved_name_short_circuits_before_probing() {
        // Even with every resource colliding, only the reserved reason is reported.
        let lookup = FakeLookup {
            tables: vec!["cache".into()],
            ..Default::default()
        };
        let verdict = check_conflicts(&lookup, "cache", "kesh", &dir("Cache"))
            .await
            .unwrap();
        assert!(!verdict.accepted);
        assert_eq!(verdict.kind, Some(ConflictKind::ReservedName));
        assert_eq!(verdict.field.as_deref(), Some("code_module"));
        assert!(verdict.reasons[0].contains("cache"));
        assert!(verdict.resources.is_empty());
    }

    #[tokio::test]
    async fn reserved_slug_attributed_to_slug_field() {
        let lookup = FakeLookup::default();
        let verdict = check_conflicts(&lookup, "news", "admin", &dir("News"))
            .await
            .unwrap();
        assert_eq!(verdict.kind, Some(ConflictKind::ReservedName));
        assert_eq!(verdict.field.as_deref(), Some("slug"));
    }

    #[tokio::test]
    async fn all_resource_checks_are_aggregated() {
        let lookup = FakeLookup {
            modules: vec!["news".into()],
            tables: vec!["news".into()],
            dirs: vec![dir("News")],
            migrations: vec!["20260101000000_create_news_table".into()],
            permissions: vec!["module_news_view".into(), "module_news_create".into()],
        };
        let verdict = check_conflicts(&lookup, "news", "novosti", &dir("News"))
            .await
            .unwrap();

        assert!(!verdict.accepted);
        assert_eq!(verdict.kind, Some(ConflictKind::ExistingResource));
        assert!(verdict.field.is_none());
        let checks: Vec<ResourceCheck> = verdict.resources.iter().map(|r| r.check).collect();
        assert_eq!(
            checks,
            vec![
                ResourceCheck::Registry,
                ResourceCheck::Schema,
                ResourceCheck::Filesystem,
                ResourceCheck::MigrationHistory,
                ResourceCheck::Permission,
                ResourceCheck::Permission,
            ]
        );
        assert_eq!(verdict.reasons.len(), 6);
    }

    #[tokio::test]
    async fn single_leftover_directory_rejects() {
        let lookup = FakeLookup {
            dirs: vec![dir("Promo")],
            ..Default::default()
        };
        let verdict = check_conflicts(&lookup, "promo", "promo", &dir("Promo"))
            .await
            .unwrap();
        assert_eq!(verdict.kind, Some(ConflictKind::ExistingResource));
        assert!(verdict.summary().contains("module directory"));
    }

    #[tokio::test]
    async fn migration_history_uses_substring_match() {
        let lookup = FakeLookup {
            migrations: vec!["20250101_create_news_trans_table".into()],
            ..Default::default()
        };
        let verdict = check_conflicts(&lookup, "news", "novosti", &dir("News"))
            .await
            .unwrap();
        assert_eq!(verdict.resources.len(), 1);
        assert_eq!(verdict.resources[0].check, ResourceCheck::MigrationHistory);
    }

    #[test]
    fn in_progress_verdict_is_rejection() {
        let verdict = ConflictVerdict::in_progress("promo");
        assert!(!verdict.accepted);
        assert_eq!(verdict.kind, Some(ConflictKind::GenerationInProgress));
    }
}
