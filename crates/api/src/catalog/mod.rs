//! Registry of generated modules.
//!
//! The dispatcher never sees generated code; it looks modules up here and
//! drives their tables through the loaded manifests. Entries are loaded
//! lazily from the modules directory, so an empty (cleared) catalog is
//! always valid.

pub mod refresh;

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use cms_core::manifest::{
    LoadedModule, ModuleManifest, MODEL_MANIFEST, MODULE_MANIFEST, SCHEMA_MANIFEST,
    SURFACE_MANIFEST,
};
use cms_core::module_config::{is_module_code, module_dir};
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Malformed manifest {}: {source}", path.display())]
    Manifest {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Loaded module manifests keyed by module code.
///
/// Thread-safe via interior `RwLock`; wrapped in `Arc` inside `AppState`.
pub struct ModuleCatalog {
    root: PathBuf,
    modules: RwLock<HashMap<String, Arc<LoadedModule>>>,
}

impl ModuleCatalog {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            modules: RwLock::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Look a module up, loading it from disk on a cache miss.
    ///
    /// Returns `None` for codes that are not well-formed identifiers or
    /// have no artifacts on disk.
    pub async fn get(&self, code: &str) -> Result<Option<Arc<LoadedModule>>, CatalogError> {
        if !is_module_code(code) {
            return Ok(None);
        }
        if let Some(module) = self.modules.read().await.get(code) {
            return Ok(Some(Arc::clone(module)));
        }

        let Ok(dir) = module_dir(&self.root, code) else {
            return Ok(None);
        };
        if !tokio::fs::try_exists(dir.join(MODULE_MANIFEST))
            .await
            .unwrap_or(false)
        {
            return Ok(None);
        }

        let module = load_module(&dir).await?;
        // The directory belongs to another module.
        if module.code() != code {
            tracing::warn!(
                module_code = %code,
                found = %module.code(),
                path = %dir.display(),
                "Module directory declares a different code"
            );
            return Ok(None);
        }

        let module = Arc::new(module);
        self.modules
            .write()
            .await
            .insert(code.to_string(), Arc::clone(&module));
        tracing::debug!(module_code = %code, "Loaded module into catalog");
        Ok(Some(module))
    }

    /// Replace the cache with every module found under the root.
    ///
    /// Subdirectories without a `module.json` are skipped. A missing root
    /// yields an empty catalog.
    pub async fn reload_all(&self) -> Result<usize, CatalogError> {
        let mut loaded = HashMap::new();

        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                self.modules.write().await.clear();
                return Ok(0);
            }
            Err(source) => {
                return Err(CatalogError::Io {
                    path: self.root.clone(),
                    source,
                })
            }
        };

        loop {
            let entry = entries.next_entry().await.map_err(|source| CatalogError::Io {
                path: self.root.clone(),
                source,
            })?;
            let Some(entry) = entry else { break };

            let dir = entry.path();
            if !tokio::fs::try_exists(dir.join(MODULE_MANIFEST))
                .await
                .unwrap_or(false)
            {
                continue;
            }
            let module = load_module(&dir).await?;
            loaded.insert(module.code().to_string(), Arc::new(module));
        }

        let count = loaded.len();
        *self.modules.write().await = loaded;
        Ok(count)
    }

    /// Drop every cached entry; later lookups reload from disk.
    pub async fn clear(&self) {
        self.modules.write().await.clear();
    }

    pub async fn insert(&self, module: LoadedModule) {
        self.modules
            .write()
            .await
            .insert(module.code().to_string(), Arc::new(module));
    }

    pub async fn remove(&self, code: &str) {
        self.modules.write().await.remove(code);
    }

    /// Codes currently cached, sorted.
    pub async fn codes(&self) -> Vec<String> {
        let mut codes: Vec<String> = self.modules.read().await.keys().cloned().collect();
        codes.sort();
        codes
    }
}

/// Read every manifest in a module directory.
pub async fn load_module(dir: &Path) -> Result<LoadedModule, CatalogError> {
    let module: ModuleManifest = read_manifest(&dir.join(MODULE_MANIFEST)).await?;
    Ok(LoadedModule {
        module,
        schema: read_manifest(&dir.join(SCHEMA_MANIFEST)).await?,
        model: read_manifest(&dir.join(MODEL_MANIFEST)).await?,
        surface: read_manifest(&dir.join(SURFACE_MANIFEST)).await?,
    })
}

async fn read_manifest<T: DeserializeOwned>(path: &Path) -> Result<T, CatalogError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    serde_json::from_slice(&bytes).map_err(|source| CatalogError::Manifest {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use cms_core::descriptor::LocalizedText;
    use cms_core::manifest::plan;
    use cms_core::module_config::{build_config, GenerateModuleRequest};

    use super::*;

    #[test]
    fn module_code_shape() {
        assert!(is_module_code("news"));
        assert!(is_module_code("news_items2"));
        assert!(!is_module_code(""));
        assert!(!is_module_code("2news"));
        assert!(!is_module_code("../etc"));
        assert!(!is_module_code("News"));
        assert!(!is_module_code("news_2"));
        assert!(!is_module_code("news__items"));
    }

    #[tokio::test]
    async fn directory_of_another_module_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let request = GenerateModuleRequest {
            code_module: "news".into(),
            slug: "news".into(),
            status: "active".into(),
            name: LocalizedText::from([("ru".to_string(), "Новости".to_string())]),
            ..Default::default()
        };
        let plan = plan(&build_config(&request, dir.path()).unwrap(), 1);

        // News manifests sitting in the directory `other` would map to.
        let module = dir.path().join("Other");
        std::fs::create_dir_all(&module).unwrap();
        let files = [
            (MODULE_MANIFEST, serde_json::to_vec(&plan.module).unwrap()),
            (SCHEMA_MANIFEST, serde_json::to_vec(&plan.schema).unwrap()),
            (MODEL_MANIFEST, serde_json::to_vec(&plan.model).unwrap()),
            (SURFACE_MANIFEST, serde_json::to_vec(&plan.surface).unwrap()),
        ];
        for (name, bytes) in files {
            std::fs::write(module.join(name), bytes).unwrap();
        }

        let catalog = ModuleCatalog::new(dir.path());
        assert!(catalog.get("other").await.unwrap().is_none());
        assert!(catalog.codes().await.is_empty());
    }

    #[tokio::test]
    async fn missing_root_reloads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = ModuleCatalog::new(dir.path().join("absent"));
        assert_eq!(catalog.reload_all().await.unwrap(), 0);
        assert!(catalog.get("news").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn malformed_manifest_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let module = dir.path().join("News");
        std::fs::create_dir_all(&module).unwrap();
        std::fs::write(module.join(MODULE_MANIFEST), "{not json").unwrap();

        let catalog = ModuleCatalog::new(dir.path());
        let err = catalog.get("news").await.unwrap_err();
        assert_matches!(err, CatalogError::Manifest { .. });
        assert!(catalog.reload_all().await.is_err());
    }
}
