//! Configuration and credential storage

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::auth::{StoredToken, TokenStore};
use crate::models::User;

pub const DEFAULT_API_URL: &str = "http://localhost:3000";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Environment override for the API base URL.
pub const API_URL_ENV: &str = "MINICORD_API_URL";
/// Environment override for the config directory.
pub const CONFIG_DIR_ENV: &str = "MINICORD_CONFIG_DIR";

/// Polling cadence and page size
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollSettings {
    pub message_interval_ms: u64,
    pub friend_request_interval_ms: u64,
    pub conversation_interval_ms: u64,
    pub page_size: usize,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            message_interval_ms: 1000,
            friend_request_interval_ms: 1500,
            conversation_interval_ms: 2000,
            page_size: 10,
        }
    }
}

impl PollSettings {
    pub fn message_interval(&self) -> Duration {
        Duration::from_millis(self.message_interval_ms.max(1))
    }

    pub fn friend_request_interval(&self) -> Duration {
        Duration::from_millis(self.friend_request_interval_ms.max(1))
    }

    pub fn conversation_interval(&self) -> Duration {
        Duration::from_millis(self.conversation_interval_ms.max(1))
    }
}

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// API base URL (falls back to `DEFAULT_API_URL`)
    pub api_url: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: Option<u64>,
    /// Bearer token from the last login
    pub token: Option<StoredToken>,
    /// Profile of the logged-in user
    pub user: Option<User>,
    #[serde(default)]
    pub poll: PollSettings,
}

impl Config {
    /// Get config directory path
    fn config_dir() -> Result<PathBuf> {
        if let Ok(dir) = std::env::var(CONFIG_DIR_ENV) {
            return Ok(PathBuf::from(dir));
        }
        let proj_dirs = ProjectDirs::from("com", "minicord", "minicord")
            .context("Could not determine config directory")?;
        Ok(proj_dirs.config_dir().to_path_buf())
    }

    /// Get config file path
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration from disk
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).context("Failed to read config file")?;
        toml::from_str(&content).context("Failed to parse config file")
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content).context("Failed to write config file")?;

        // Set restrictive permissions on config file (contains tokens)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = fs::Permissions::from_mode(0o600);
            fs::set_permissions(path, perms).context("Failed to set config permissions")?;
        }

        Ok(())
    }

    /// Effective API base URL: env override, then config, then default.
    pub fn api_url(&self) -> String {
        resolve_api_url(std::env::var(API_URL_ENV).ok(), self.api_url.as_deref())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }
}

fn resolve_api_url(env: Option<String>, configured: Option<&str>) -> String {
    env.filter(|s| !s.is_empty())
        .or_else(|| configured.map(String::from))
        .unwrap_or_else(|| DEFAULT_API_URL.to_string())
        .trim_end_matches('/')
        .to_string()
}

impl TokenStore for Config {
    fn get_token(&self) -> Option<StoredToken> {
        self.token.clone()
    }

    fn set_token(&mut self, token: String) {
        self.token = Some(StoredToken::new(token));
    }

    fn get_user(&self) -> Option<User> {
        self.user.clone()
    }

    fn set_user(&mut self, user: User) {
        self.user = Some(user);
    }

    fn clear_tokens(&mut self) {
        self.token = None;
        self.user = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_toml() {
        let config: Config = toml::from_str("").unwrap();
        assert!(config.token.is_none());
        assert_eq!(config.poll, PollSettings::default());
        assert_eq!(config.timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_partial_poll_table() {
        let config: Config = toml::from_str("[poll]\npage_size = 25\n").unwrap();
        assert_eq!(config.poll.page_size, 25);
        assert_eq!(config.poll.message_interval_ms, 1000);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = std::env::temp_dir().join(format!("minicord-test-{}", uuid::Uuid::new_v4()));
        let path = dir.join("config.toml");

        let mut config = Config {
            api_url: Some("https://chat.example.com/".into()),
            ..Config::default()
        };
        config.set_token("opaque".into());
        config.set_user(User {
            id: "u1".into(),
            username: "alice".into(),
            profile_picture: None,
        });
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.get_token().unwrap().token, "opaque");
        assert_eq!(loaded.get_user().unwrap().username, "alice");
        assert_eq!(loaded.api_url.as_deref(), Some("https://chat.example.com/"));

        let mut cleared = loaded;
        cleared.clear_tokens();
        assert!(cleared.get_token().is_none());
        assert!(cleared.get_user().is_none());

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_api_url_precedence() {
        assert_eq!(
            resolve_api_url(None, Some("https://chat.example.com/")),
            "https://chat.example.com"
        );
        assert_eq!(
            resolve_api_url(Some("http://10.0.0.2:3000".into()), Some("https://chat.example.com")),
            "http://10.0.0.2:3000"
        );
        assert_eq!(
            resolve_api_url(Some(String::new()), Some("https://chat.example.com")),
            "https://chat.example.com"
        );
        assert_eq!(resolve_api_url(None, None), DEFAULT_API_URL);
    }

    #[test]
    fn test_missing_file_is_default() {
        let path = std::env::temp_dir().join(format!("minicord-missing-{}.toml", uuid::Uuid::new_v4()));
        let config = Config::load_from(&path).unwrap();
        assert!(config.api_url.is_none());
    }
}
