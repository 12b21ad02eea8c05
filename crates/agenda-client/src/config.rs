//! Client configuration.
//!
//! Optional settings live in `~/.config/agenda-mcp/config.toml`. Command
//! line flags win over the file, the file wins over built-in defaults.
//!
//! ```toml
//! [auth]
//! credentials_file = "credentials.json"
//! token_path = "token.json"
//! callback_port = 8080
//! timeout_secs = 300
//! open_browser = true
//!
//! [mcp]
//! token_path = "/opt/agenda-mcp/token.json"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use agenda_providers::google::{
    DEFAULT_AUTHORIZATION_TIMEOUT, DEFAULT_CALLBACK_PORT, DEFAULT_CREDENTIALS_FILE,
    DEFAULT_TOKEN_FILE,
};

/// Configuration for the agenda-mcp client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Interactive authorization settings (`auth` and `text` modes).
    pub auth: AuthSettings,

    /// Tool server settings.
    pub mcp: McpSettings,
}

/// Settings of the browser authorization flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    /// Google credentials JSON.
    pub credentials_file: PathBuf,

    /// Token cache written after consent.
    pub token_path: PathBuf,

    /// Loopback port of the redirect listener.
    pub callback_port: u16,

    /// Seconds to wait for consent.
    pub timeout_secs: u64,

    /// Try to open the consent page automatically.
    pub open_browser: bool,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            credentials_file: PathBuf::from(DEFAULT_CREDENTIALS_FILE),
            token_path: PathBuf::from(DEFAULT_TOKEN_FILE),
            callback_port: DEFAULT_CALLBACK_PORT,
            timeout_secs: DEFAULT_AUTHORIZATION_TIMEOUT.as_secs(),
            open_browser: true,
        }
    }
}

/// Settings of the tool server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct McpSettings {
    /// Token to read; unset means `token.json` next to the executable.
    pub token_path: Option<PathBuf>,
}

impl ClientConfig {
    /// Loads configuration from the default path, if the file exists.
    pub fn load() -> Result<Self, String> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read config {}: {}", path.display(), e))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| format!("failed to parse config {}: {}", path.display(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values no flow can work with.
    pub fn validate(&self) -> Result<(), String> {
        if self.auth.timeout_secs == 0 {
            return Err("auth.timeout_secs must be greater than zero".to_string());
        }
        Ok(())
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    /// Returns the default configuration directory.
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("agenda-mcp")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config: ClientConfig = toml::from_str("").unwrap();
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.auth.callback_port, 8080);
        assert_eq!(config.auth.timeout_secs, 300);
        assert_eq!(config.auth.token_path, PathBuf::from("token.json"));
        assert!(config.mcp.token_path.is_none());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config: ClientConfig = toml::from_str(
            r#"
[auth]
callback_port = 9000
open_browser = false

[mcp]
token_path = "/opt/agenda-mcp/token.json"
"#,
        )
        .unwrap();

        assert_eq!(config.auth.callback_port, 9000);
        assert!(!config.auth.open_browser);
        assert_eq!(
            config.auth.credentials_file,
            PathBuf::from("credentials.json")
        );
        assert_eq!(
            config.mcp.token_path,
            Some(PathBuf::from("/opt/agenda-mcp/token.json"))
        );
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[auth]\ntimeout_secs = 60\n").unwrap();

        let config = ClientConfig::load_from(&path).unwrap();
        assert_eq!(config.auth.timeout_secs, 60);
    }

    #[test]
    fn load_from_rejects_zero_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[auth]\ntimeout_secs = 0\n").unwrap();

        let err = ClientConfig::load_from(&path).unwrap_err();
        assert!(err.contains("timeout_secs"));
    }

    #[test]
    fn load_from_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = ClientConfig::load_from(&dir.path().join("absent.toml")).unwrap_err();
        assert!(err.starts_with("failed to read config"));
    }

    #[test]
    fn default_path_ends_with_app_dir() {
        let path = ClientConfig::default_path();
        assert!(path.ends_with("agenda-mcp/config.toml"));
    }
}
