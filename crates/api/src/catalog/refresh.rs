//! Catalog refresh after modules appear or disappear.
//!
//! A refresh optionally runs an operator-supplied command (cache warmers,
//! deploy hooks) and then reloads every manifest from disk. It is
//! best-effort: a failure downgrades to clearing the cache, and callers
//! surface it as a warning.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use super::{CatalogError, ModuleCatalog};
use crate::config::GeneratorConfig;

#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    #[error("Refresh command could not be started: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("Refresh command exited with {status}: {stderr}")]
    CommandFailed { status: String, stderr: String },

    #[error("Refresh command timed out after {0}s")]
    TimedOut(u64),

    #[error(transparent)]
    Reload(#[from] CatalogError),
}

/// Re-syncs a [`ModuleCatalog`] with the modules directory.
#[async_trait]
pub trait CatalogRefresher: Send + Sync {
    /// Returns the number of modules loaded.
    async fn refresh(&self, catalog: &ModuleCatalog) -> Result<usize, RefreshError>;
}

/// Runs `sh -c <command>` (when configured) and then reloads the catalog.
pub struct CommandRefresher {
    command: Option<String>,
    timeout: Duration,
}

impl CommandRefresher {
    pub fn new(command: Option<String>, timeout: Duration) -> Self {
        Self { command, timeout }
    }

    pub fn from_config(config: &GeneratorConfig) -> Self {
        Self::new(
            config.refresh_command.clone(),
            Duration::from_secs(config.refresh_timeout_secs),
        )
    }

    async fn run_command(&self, command: &str) -> Result<(), RefreshError> {
        let child = Command::new("sh")
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(RefreshError::Spawn)?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| RefreshError::TimedOut(self.timeout.as_secs()))?
            .map_err(RefreshError::Spawn)?;

        if !output.status.success() {
            return Err(RefreshError::CommandFailed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl CatalogRefresher for CommandRefresher {
    async fn refresh(&self, catalog: &ModuleCatalog) -> Result<usize, RefreshError> {
        if let Some(command) = &self.command {
            self.run_command(command).await?;
        }
        Ok(catalog.reload_all().await?)
    }
}

/// Refresh, and on failure clear the catalog so later lookups go to disk.
///
/// Returns a warning message when the refresh failed.
pub async fn refresh_or_clear(
    refresher: &dyn CatalogRefresher,
    catalog: &ModuleCatalog,
) -> Option<String> {
    match refresher.refresh(catalog).await {
        Ok(count) => {
            tracing::info!(modules = count, "Module catalog refreshed");
            None
        }
        Err(e) => {
            tracing::warn!(error = %e, "Module catalog refresh failed, clearing cache");
            catalog.clear().await;
            Some(format!("Catalog refresh failed: {e}"))
        }
    }
}
