//! Configuration file support for templated-mcp
//!
//! One optional TOML file is read at startup: the path given with
//! `--config`, or `~/.config/templated-mcp/config.toml`.
//!
//! CLI flags and environment variables override all config file values.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Configuration options loaded from the config file
///
/// # Example
///
/// ```toml
/// # ~/.config/templated-mcp/config.toml
/// api_key = "tpl_..."
/// folder_id = "f-123"          # pin the server to one folder
/// external_id = "customer-42"  # pin the server to one tenant
/// port = 8080                  # serve HTTP instead of stdio
/// bind = "127.0.0.1"
/// api_base = "https://api.templated.io"
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_key: Option<String>,
    pub folder_id: Option<String>,
    pub external_id: Option<String>,
    /// Presence selects the HTTP transport
    pub port: Option<u16>,
    pub bind: Option<String>,
    pub api_base: Option<String>,
    pub oauth_issuer: Option<String>,
    pub challenge_token: Option<String>,
}

impl Config {
    /// Default config file location
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("templated-mcp/config.toml"))
    }

    /// Load the explicit config file if given, otherwise the default one.
    /// A missing or unreadable file yields an empty config.
    pub fn load(explicit: Option<&Path>) -> Self {
        let config = match explicit {
            Some(path) => {
                if !path.exists() {
                    tracing::warn!(path = %path.display(), "Config file not found");
                }
                Self::load_file(path)
            }
            None => Self::default_path().and_then(|p| Self::load_file(&p)),
        }
        .unwrap_or_default();

        tracing::debug!(
            has_api_key = config.api_key.is_some(),
            folder_id = ?config.folder_id,
            external_id = ?config.external_id,
            port = ?config.port,
            "Effective config file values"
        );
        config
    }

    /// Load configuration from a specific file
    fn load_file(path: &Path) -> Option<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!("Failed to read config {}: {}", path.display(), e);
                return None;
            }
        };

        match toml::from_str::<Self>(&content) {
            Ok(config) => {
                tracing::debug!(path = %path.display(), "Loaded config");
                Some(config)
            }
            Err(e) => {
                tracing::warn!("Failed to parse config {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Layer another config on top (other overrides self where present)
    pub fn override_with(self, other: Self) -> Self {
        Config {
            api_key: other.api_key.or(self.api_key),
            folder_id: other.folder_id.or(self.folder_id),
            external_id: other.external_id.or(self.external_id),
            port: other.port.or(self.port),
            bind: other.bind.or(self.bind),
            api_base: other.api_base.or(self.api_base),
            oauth_issuer: other.oauth_issuer.or(self.oauth_issuer),
            challenge_token: other.challenge_token.or(self.challenge_token),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    fn test_load_valid_config() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("config.toml");
        std::fs::write(&config_path, "folder_id = \"f1\"\nport = 8080\n").unwrap();

        let config = Config::load_file(&config_path).unwrap();
        assert_eq!(config.folder_id.as_deref(), Some("f1"));
        assert_eq!(config.port, Some(8080));
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_file(&dir.path().join("nonexistent.toml"));
        assert!(config.is_none());
    }

    #[test]
    fn test_load_malformed_toml() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("config.toml");
        std::fs::write(&config_path, "not valid [[[").unwrap();

        assert!(Config::load_file(&config_path).is_none());
    }

    #[test]
    fn test_wrong_type_rejected() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("config.toml");
        std::fs::write(&config_path, "port = \"eighty\"\n").unwrap();

        assert!(Config::load_file(&config_path).is_none());
    }

    #[test]
    fn test_explicit_path_missing_is_empty() {
        let dir = TempDir::new().unwrap();
        let config = Config::load(Some(&dir.path().join("absent.toml")));
        assert!(config.port.is_none());
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_merge_override() {
        let base = Config {
            api_key: Some("file-key".into()),
            folder_id: Some("f-file".into()),
            ..Default::default()
        };
        let override_cfg = Config {
            folder_id: Some("f-other".into()),
            port: Some(9000),
            ..Default::default()
        };

        let merged = base.override_with(override_cfg);
        assert_eq!(merged.api_key.as_deref(), Some("file-key"));
        assert_eq!(merged.folder_id.as_deref(), Some("f-other"));
        assert_eq!(merged.port, Some(9000));
    }

    #[cfg(target_os = "linux")]
    #[test]
    #[serial]
    fn test_default_path_follows_xdg_config_home() {
        let dir = TempDir::new().unwrap();
        let app_dir = dir.path().join("templated-mcp");
        std::fs::create_dir_all(&app_dir).unwrap();
        std::fs::write(app_dir.join("config.toml"), "external_id = \"acme\"\n").unwrap();

        let previous = std::env::var_os("XDG_CONFIG_HOME");
        std::env::set_var("XDG_CONFIG_HOME", dir.path());
        let config = Config::load(None);
        match previous {
            Some(v) => std::env::set_var("XDG_CONFIG_HOME", v),
            None => std::env::remove_var("XDG_CONFIG_HOME"),
        }

        assert_eq!(config.external_id.as_deref(), Some("acme"));
    }
}
