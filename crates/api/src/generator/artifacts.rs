//! Filesystem side of a module: its directory, JSON manifests and the
//! migration files that were applied.

use std::io;
use std::path::{Path, PathBuf};

use cms_core::manifest::MIGRATIONS_DIR;
use cms_core::schema::MigrationUnit;
use serde::Serialize;

/// Create the module directory and its `migrations/` subdirectory.
///
/// Fails with `AlreadyExists` if the module directory is already there;
/// the modules root itself is created on demand.
pub async fn create_module_dir(path: &Path) -> io::Result<()> {
    if let Some(root) = path.parent() {
        tokio::fs::create_dir_all(root).await?;
    }
    tokio::fs::create_dir(path).await?;
    tokio::fs::create_dir(path.join(MIGRATIONS_DIR)).await
}

/// Write `value` as pretty-printed JSON.
pub async fn write_json<T: Serialize>(path: &Path, value: &T) -> io::Result<()> {
    let mut bytes = serde_json::to_vec_pretty(value).map_err(io::Error::other)?;
    bytes.push(b'\n');
    tokio::fs::write(path, bytes).await
}

/// Write a migration's SQL into `migrations_dir`, returning the file path.
pub async fn write_migration(migrations_dir: &Path, unit: &MigrationUnit) -> io::Result<PathBuf> {
    let path = migrations_dir.join(unit.file_name());
    tokio::fs::write(&path, &unit.sql).await?;
    Ok(path)
}

/// Remove a module directory recursively. Returns `false` if it did not
/// exist.
pub async fn remove_module_dir(path: &Path) -> io::Result<bool> {
    match tokio::fs::remove_dir_all(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn module_dir_is_created_once() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("modules").join("News");

        create_module_dir(&dir).await.unwrap();
        assert!(dir.join(MIGRATIONS_DIR).is_dir());

        let err = create_module_dir(&dir).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("News");
        create_module_dir(&dir).await.unwrap();
        write_json(&dir.join("module.json"), &serde_json::json!({"a": 1}))
            .await
            .unwrap();

        assert!(remove_module_dir(&dir).await.unwrap());
        assert!(!remove_module_dir(&dir).await.unwrap());
    }
}
