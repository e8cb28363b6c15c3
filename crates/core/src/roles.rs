//! Well-known role names and the permission naming scheme for generated
//! modules.
//!
//! Role names must match the values stored in `users.role`.

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_EDITOR: &str = "editor";

/// Abilities granted per generated module.
pub const MODULE_ABILITIES: &[&str] = &["view", "create", "update", "delete"];

/// Extra ability seeded when the module has the trash option.
pub const TRASH_ABILITY: &str = "trash";

/// Prefix shared by every permission of a module: `module_{code}_`.
pub fn module_permission_prefix(code: &str) -> String {
    format!("module_{code}_")
}

/// Full list of permission names seeded for a module.
pub fn module_permissions(code: &str, trash: bool) -> Vec<String> {
    let prefix = module_permission_prefix(code);
    let mut names: Vec<String> = MODULE_ABILITIES
        .iter()
        .map(|ability| format!("{prefix}{ability}"))
        .collect();
    if trash {
        names.push(format!("{prefix}{TRASH_ABILITY}"));
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_uses_module_code() {
        assert_eq!(module_permission_prefix("news"), "module_news_");
    }

    #[test]
    fn base_permissions_without_trash() {
        assert_eq!(
            module_permissions("news", false),
            vec![
                "module_news_view",
                "module_news_create",
                "module_news_update",
                "module_news_delete",
            ]
        );
    }

    #[test]
    fn trash_permission_appended() {
        let names = module_permissions("news", true);
        assert_eq!(names.len(), 5);
        assert_eq!(names.last().map(String::as_str), Some("module_news_trash"));
    }
}
