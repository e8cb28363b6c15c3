use std::path::PathBuf;

use crate::auth::jwt::JwtConfig;

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Graceful shutdown timeout in seconds (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// JWT token configuration (secret, expiry).
    pub jwt: JwtConfig,
    /// Module generator settings.
    pub generator: GeneratorConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    /// | `SHUTDOWN_TIMEOUT_SECS`| `30`                       |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            jwt: JwtConfig::from_env(),
            generator: GeneratorConfig::from_env(),
        }
    }
}

/// Default root directory for generated module artifacts.
const DEFAULT_MODULES_DIR: &str = "./modules";

/// Default time limit for the external refresh command.
const DEFAULT_REFRESH_TIMEOUT_SECS: u64 = 30;

/// Where generated modules live and how the catalog is refreshed.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Root directory holding one subdirectory per module.
    pub modules_dir: PathBuf,
    /// Shell command run before the catalog reloads, if any.
    pub refresh_command: Option<String>,
    pub refresh_timeout_secs: u64,
}

impl GeneratorConfig {
    /// | Env Var                       | Default      |
    /// |-------------------------------|--------------|
    /// | `MODULES_DIR`                 | `./modules`  |
    /// | `MODULE_REFRESH_COMMAND`      | unset        |
    /// | `MODULE_REFRESH_TIMEOUT_SECS` | `30`         |
    pub fn from_env() -> Self {
        let modules_dir = std::env::var("MODULES_DIR")
            .unwrap_or_else(|_| DEFAULT_MODULES_DIR.into())
            .into();

        let refresh_command = std::env::var("MODULE_REFRESH_COMMAND")
            .ok()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());

        let refresh_timeout_secs: u64 = std::env::var("MODULE_REFRESH_TIMEOUT_SECS")
            .unwrap_or_else(|_| DEFAULT_REFRESH_TIMEOUT_SECS.to_string())
            .parse()
            .expect("MODULE_REFRESH_TIMEOUT_SECS must be a valid u64");

        Self {
            modules_dir,
            refresh_command,
            refresh_timeout_secs,
        }
    }
}
