//! Configuration loading for pasty-cli
//!
//! Settings come from a JSON file (`--config`, `PASTY_CONFIG`, or
//! `<config dir>/pasty/config.json`). Every value in it can be overridden by
//! environment variables or CLI args.

use pasty_client::{ClientConfig, Credentials};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

const APP_DIR_NAME: &str = "pasty";
const CONFIG_FILE_NAME: &str = "config.json";

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 4444;

/// Contents of the config file; every field is optional
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileConfig {
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub secure: Option<bool>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_version: Option<String>,
    /// Request timeout in seconds
    #[serde(default)]
    pub timeout: Option<f64>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Values given on the command line or through the environment
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub secure: Option<bool>,
    pub api_key: Option<String>,
    pub api_version: Option<String>,
    /// Request timeout in seconds
    pub timeout: Option<f64>,
    pub token: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
}

/// Configuration after merging all sources
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub client: ClientConfig,
    pub credentials: Credentials,
    /// Username and password kept apart for the endpoints that only take basic auth
    pub user: Option<String>,
    pub password: Option<String>,
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Load configuration from a specific file path.
/// Returns None if the file doesn't exist or can't be parsed.
pub fn load_config_from_path(path: &Path) -> Option<FileConfig> {
    let contents = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str(&contents) {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::warn!("Ignoring unreadable config file {}: {}", path.display(), e);
            None
        }
    }
}

/// Load the config file from the platform config directory, if present
pub fn load_default_config() -> Option<FileConfig> {
    load_config_from_path(&default_config_path()?)
}

/// Merge overrides on top of the file config.
/// Priority: CLI arg / env var > config file > defaults
///
/// Fails only on a negative or non-finite timeout.
pub fn resolve(overrides: Overrides, file: Option<FileConfig>) -> anyhow::Result<ResolvedConfig> {
    let file = file.unwrap_or_default();

    let host = overrides
        .host
        .or(file.host)
        .unwrap_or_else(|| DEFAULT_HOST.to_string());
    let secure = overrides.secure.or(file.secure).unwrap_or(false);
    let port = overrides.port.or(file.port).unwrap_or(DEFAULT_PORT);
    let timeout = overrides
        .timeout
        .or(file.timeout)
        .map(Duration::try_from_secs_f64)
        .transpose()
        .map_err(|e| anyhow::anyhow!("Invalid timeout: {}", e))?;

    let client = ClientConfig {
        host,
        port: Some(port),
        secure,
        api_key: overrides.api_key.or(file.api_key),
        api_version: overrides.api_version.or(file.api_version),
        timeout,
    };

    let user = overrides.user.or(file.user);
    let password = overrides.password.or(file.password);

    // the token wins over a username/password pair from any source
    let credentials = Credentials::resolve(
        overrides.token.or(file.token),
        user.clone(),
        password.clone(),
    );

    Ok(ResolvedConfig {
        client,
        credentials,
        user,
        password,
    })
}
