//! # Sync Configuration
//!
//! Where the remote document store lives and how the reconciler starts.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                            │
//! │     GEMLEDGER_REMOTE_BACKEND=http                                       │
//! │     GEMLEDGER_REMOTE_URL=https://store.example.com/v1                   │
//! │     GEMLEDGER_REMOTE_API_KEY=…                                          │
//! │     GEMLEDGER_OFFLINE=1                                                 │
//! │                                                                         │
//! │  2. TOML Config File                                                    │
//! │     ~/.config/gemledger/sync.toml (Linux)                               │
//! │     ~/Library/Application Support/com.gemledger.gemledger/sync.toml     │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                    │
//! │     backend = none, start online, sync on startup                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [remote]
//! backend = "http"        # http | memory | none
//! base_url = "https://store.example.com/v1"
//! api_key = "secret"
//! timeout_secs = 10
//!
//! [sync]
//! start_online = true
//! sync_on_startup = true
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{SyncError, SyncResult};

// =============================================================================
// Remote Backend
// =============================================================================

/// Which document store backs the remote side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteBackend {
    /// REST document store over HTTP.
    Http,

    /// In-process store; nothing leaves the machine. Useful for demos.
    Memory,

    /// No remote at all: every remote call reports `RemoteUnavailable`.
    #[default]
    None,
}

impl RemoteBackend {
    pub fn is_enabled(&self) -> bool {
        !matches!(self, RemoteBackend::None)
    }
}

impl std::fmt::Display for RemoteBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RemoteBackend::Http => write!(f, "http"),
            RemoteBackend::Memory => write!(f, "memory"),
            RemoteBackend::None => write!(f, "none"),
        }
    }
}

impl std::str::FromStr for RemoteBackend {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "http" | "https" | "rest" => Ok(RemoteBackend::Http),
            "memory" | "mem" => Ok(RemoteBackend::Memory),
            "none" | "off" | "disabled" => Ok(RemoteBackend::None),
            other => Err(SyncError::InvalidConfig(format!(
                "Unknown remote backend: '{}'. Valid options: http, memory, none",
                other
            ))),
        }
    }
}

// =============================================================================
// Sections
// =============================================================================

/// `[remote]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteSettings {
    #[serde(default)]
    pub backend: RemoteBackend,

    /// Base URL of the HTTP document store, e.g. `https://host/v1`.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Sent as a bearer token.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Per-request timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for RemoteSettings {
    fn default() -> Self {
        RemoteSettings {
            backend: RemoteBackend::default(),
            base_url: None,
            api_key: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// `[sync]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Initial value of the connectivity flag.
    #[serde(default = "default_true")]
    pub start_online: bool,

    /// Run one reconciliation pass when the agent starts.
    #[serde(default = "default_true")]
    pub sync_on_startup: bool,
}

fn default_true() -> bool {
    true
}

impl Default for SyncSettings {
    fn default() -> Self {
        SyncSettings {
            start_online: true,
            sync_on_startup: true,
        }
    }
}

// =============================================================================
// Main Sync Configuration
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub remote: RemoteSettings,

    #[serde(default)]
    pub sync: SyncSettings,
}

impl SyncConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (sync.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> SyncResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading sync config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_overrides(|name| std::env::var(name).ok());
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load sync config: {}. Using defaults.", e);
            Self::default()
        })
    }

    pub fn save(&self, config_path: Option<PathBuf>) -> SyncResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| SyncError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Sync config saved");
        Ok(())
    }

    /// Validates the configuration.
    ///
    /// The HTTP backend needs an `http(s)://` base URL and a non-zero
    /// timeout.
    pub fn validate(&self) -> SyncResult<()> {
        if self.remote.backend == RemoteBackend::Http {
            let raw = self.remote.base_url.as_deref().ok_or_else(|| {
                SyncError::InvalidConfig("remote.base_url is required for the http backend".into())
            })?;

            let parsed = url::Url::parse(raw)?;
            if parsed.scheme() != "http" && parsed.scheme() != "https" {
                return Err(SyncError::InvalidUrl(format!(
                    "Remote URL must start with http:// or https://, got: {}",
                    raw
                )));
            }
        }

        if self.remote.timeout_secs == 0 {
            return Err(SyncError::InvalidConfig(
                "timeout_secs must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Applies overrides from a variable lookup (the process environment in
    /// production).
    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(backend) = lookup("GEMLEDGER_REMOTE_BACKEND") {
            match backend.parse() {
                Ok(parsed) => {
                    debug!(backend = %backend, "Overriding remote backend from environment");
                    self.remote.backend = parsed;
                }
                Err(_) => warn!(backend = %backend, "Unknown remote backend in environment"),
            }
        }

        if let Some(url) = lookup("GEMLEDGER_REMOTE_URL") {
            debug!(url = %url, "Overriding remote URL from environment");
            self.remote.base_url = Some(url);
        }

        if let Some(key) = lookup("GEMLEDGER_REMOTE_API_KEY") {
            self.remote.api_key = Some(key);
        }

        if let Some(offline) = lookup("GEMLEDGER_OFFLINE") {
            let offline = matches!(offline.to_lowercase().as_str(), "1" | "true" | "yes");
            if offline {
                debug!("Starting offline (GEMLEDGER_OFFLINE)");
                self.sync.start_online = false;
            }
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "gemledger", "gemledger")
            .map(|dirs| dirs.config_dir().join("sync.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    pub fn backend(&self) -> RemoteBackend {
        self.remote.backend
    }

    pub fn base_url(&self) -> Option<&str> {
        self.remote.base_url.as_deref()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.remote.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_backend_parsing() {
        assert_eq!("http".parse::<RemoteBackend>().unwrap(), RemoteBackend::Http);
        assert_eq!("MEMORY".parse::<RemoteBackend>().unwrap(), RemoteBackend::Memory);
        assert_eq!("off".parse::<RemoteBackend>().unwrap(), RemoteBackend::None);
        assert!("ftp".parse::<RemoteBackend>().is_err());
        assert!(!RemoteBackend::None.is_enabled());
    }

    #[test]
    fn test_default_config() {
        let config = SyncConfig::default();
        assert_eq!(config.backend(), RemoteBackend::None);
        assert_eq!(config.remote.timeout_secs, 10);
        assert!(config.sync.start_online);
        assert!(config.sync.sync_on_startup);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = SyncConfig::default();
        config.remote.backend = RemoteBackend::Http;
        assert!(config.validate().is_err());

        config.remote.base_url = Some("ws://example.com".to_string());
        assert!(matches!(config.validate(), Err(SyncError::InvalidUrl(_))));

        config.remote.base_url = Some("not a url".to_string());
        assert!(config.validate().is_err());

        config.remote.base_url = Some("https://example.com/v1".to_string());
        assert!(config.validate().is_ok());

        config.remote.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("GEMLEDGER_REMOTE_BACKEND", "http"),
            ("GEMLEDGER_REMOTE_URL", "http://localhost:9000"),
            ("GEMLEDGER_REMOTE_API_KEY", "k"),
            ("GEMLEDGER_OFFLINE", "true"),
        ]
        .into_iter()
        .collect();

        let mut config = SyncConfig::default();
        config.apply_overrides(|name| vars.get(name).map(|v| v.to_string()));

        assert_eq!(config.backend(), RemoteBackend::Http);
        assert_eq!(config.base_url(), Some("http://localhost:9000"));
        assert_eq!(config.remote.api_key.as_deref(), Some("k"));
        assert!(!config.sync.start_online);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("sync.toml");

        let mut config = SyncConfig::default();
        config.remote.backend = RemoteBackend::Memory;
        config.sync.sync_on_startup = false;
        config.save(Some(path.clone())).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("[remote]"));
        assert!(text.contains("[sync]"));

        let loaded: SyncConfig = toml::from_str(&text).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: SyncConfig = toml::from_str("[remote]\nbackend = \"memory\"\n").unwrap();
        assert_eq!(config.backend(), RemoteBackend::Memory);
        assert_eq!(config.remote.timeout_secs, 10);
        assert!(config.sync.start_online);
    }

    #[test]
    fn test_load_or_default_on_bad_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sync.toml");
        std::fs::write(&path, "this is = = not toml").unwrap();

        assert!(SyncConfig::load(Some(path.clone())).is_err());
        let config = SyncConfig::load_or_default(Some(path));
        assert_eq!(config.remote.timeout_secs, 10);
    }
}
