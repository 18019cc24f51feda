//! CLI configuration handling.

use anyhow::{Context, Result};
use aps_core::endpoints::{ApsEndpoints, DEFAULT_BASE_URL};
use aps_core::Secret;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding `client_id`.
pub const CLIENT_ID_ENV: &str = "APS_CLIENT_ID";

/// Environment variable overriding `client_secret`.
pub const CLIENT_SECRET_ENV: &str = "APS_CLIENT_SECRET";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Host serving the authorize and token endpoints.
    pub auth_base_url: String,

    /// Host serving the REST APIs.
    pub api_base_url: String,

    pub client_id: Option<String>,

    pub client_secret: Option<Secret>,

    /// Scopes requested when none are given on the command line.
    pub scopes: Vec<String>,

    /// Redirect URI registered for the application.
    pub redirect_uri: Option<String>,

    /// Page size for listings.
    pub page_size: usize,

    /// Request timeout in seconds.
    pub timeout_secs: u64,

    /// Logging level.
    pub log_level: String,

    /// Path to the configuration file that was loaded.
    #[serde(skip)]
    pub config_path: PathBuf,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            auth_base_url: DEFAULT_BASE_URL.to_string(),
            api_base_url: DEFAULT_BASE_URL.to_string(),
            client_id: None,
            client_secret: None,
            scopes: vec!["data:read".to_string()],
            redirect_uri: None,
            page_size: 20,
            timeout_secs: 30,
            log_level: "info".to_string(),
            config_path: PathBuf::new(),
        }
    }
}

impl CliConfig {
    /// Endpoints derived from the configured hosts.
    pub fn endpoints(&self) -> ApsEndpoints {
        let mut endpoints = if self.auth_base_url.trim_end_matches('/') == DEFAULT_BASE_URL {
            ApsEndpoints::production()
        } else {
            ApsEndpoints::with_base_url(&self.auth_base_url)
        };
        endpoints.api_base_url = self.api_base_url.trim_end_matches('/').to_string();
        endpoints
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Client id, or an error naming where to set it.
    pub fn require_client_id(&self) -> Result<&str> {
        self.client_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .with_context(|| {
                format!(
                    "client_id is not configured (set {} or add it to {:?})",
                    CLIENT_ID_ENV, self.config_path
                )
            })
    }

    /// Client secret, or an error naming where to set it.
    pub fn require_client_secret(&self) -> Result<&Secret> {
        self.client_secret
            .as_ref()
            .filter(|secret| !secret.is_empty())
            .with_context(|| {
                format!(
                    "client_secret is not configured (set {} or add it to {:?})",
                    CLIENT_SECRET_ENV, self.config_path
                )
            })
    }

    /// Apply overrides from `lookup`, normally the process environment.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(client_id) = lookup(CLIENT_ID_ENV).filter(|v| !v.is_empty()) {
            self.client_id = Some(client_id);
        }
        if let Some(client_secret) = lookup(CLIENT_SECRET_ENV).filter(|v| !v.is_empty()) {
            self.client_secret = Some(Secret::new(client_secret));
        }
    }
}

/// Load configuration from `path`, or the default location, then apply
/// environment overrides.
pub fn load_config(path: Option<&Path>) -> Result<CliConfig> {
    let config_path = match path {
        Some(path) => path.to_path_buf(),
        None => default_config_path(),
    };

    let mut config = load_from_path(&config_path)?;
    config.apply_env_overrides(|key| std::env::var(key).ok());
    Ok(config)
}

/// Load configuration from `config_path`, falling back to defaults when the
/// file does not exist.
pub fn load_from_path(config_path: &Path) -> Result<CliConfig> {
    let mut config = if config_path.exists() {
        let contents = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config from {:?}", config_path))?;
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config from {:?}", config_path))?
    } else {
        CliConfig::default()
    };

    config.config_path = config_path.to_path_buf();
    Ok(config)
}

fn default_config_path() -> PathBuf {
    project_dirs()
        .map(|d| d.config_dir().join("config.toml"))
        .unwrap_or_else(|| PathBuf::from("aps.toml"))
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "raibid-labs", "aps")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");

        let config = load_from_path(&path).unwrap();
        assert_eq!(config.auth_base_url, DEFAULT_BASE_URL);
        assert_eq!(config.page_size, 20);
        assert_eq!(config.config_path, path);
        assert_eq!(config.endpoints(), ApsEndpoints::production());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
client_id = "from-file"
client_secret = "file-secret"
api_base_url = "http://localhost:4000/"
scopes = ["account:read", "data:read"]
"#,
        )
        .unwrap();

        let config = load_from_path(&path).unwrap();
        assert_eq!(config.client_id.as_deref(), Some("from-file"));
        assert_eq!(config.require_client_secret().unwrap().expose(), "file-secret");
        assert_eq!(config.scopes, vec!["account:read", "data:read"]);
        assert_eq!(config.timeout_secs, 30);

        let endpoints = config.endpoints();
        assert_eq!(endpoints.api_base_url, "http://localhost:4000");
        assert_eq!(
            endpoints.token_url,
            "https://developer.api.autodesk.com/authentication/v2/token"
        );
    }

    #[test]
    fn test_invalid_file_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "page_size = \"many\"").unwrap();

        assert!(load_from_path(&path).is_err());
    }

    #[test]
    fn test_env_overrides_file() {
        let mut config = CliConfig {
            client_id: Some("from-file".to_string()),
            ..Default::default()
        };

        config.apply_env_overrides(|key| match key {
            CLIENT_ID_ENV => Some("from-env".to_string()),
            CLIENT_SECRET_ENV => Some("env-secret".to_string()),
            _ => None,
        });

        assert_eq!(config.require_client_id().unwrap(), "from-env");
        assert_eq!(config.require_client_secret().unwrap().expose(), "env-secret");
    }

    #[test]
    fn test_missing_credentials_are_errors() {
        let config = CliConfig::default();
        assert!(config.require_client_id().is_err());
        assert!(config.require_client_secret().is_err());
    }

    #[test]
    fn test_custom_auth_host() {
        let config = CliConfig {
            auth_base_url: "http://127.0.0.1:9000".to_string(),
            ..Default::default()
        };
        assert_eq!(
            config.endpoints().authorize_url,
            "http://127.0.0.1:9000/authentication/v2/authorize"
        );
    }
}
