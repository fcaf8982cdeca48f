//! Configuration management for NoteMind
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::error::{NotemindError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main configuration structure for NoteMind
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Backend API settings
    #[serde(default)]
    pub api: ApiConfig,
    /// Notification lifetimes
    #[serde(default)]
    pub notifications: NotificationConfig,
    /// Upload behavior
    #[serde(default)]
    pub upload: UploadConfig,
    /// Chat behavior
    #[serde(default)]
    pub chat: ChatConfig,
}

/// Backend API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the ingestion and question-answering service
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// User agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_base_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_timeout() -> u64 {
    120
}

fn default_user_agent() -> String {
    format!("notemind/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: default_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

impl ApiConfig {
    /// Request timeout as a [`Duration`]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// Notification lifetime configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Lifetime of a notification that does not set its own (milliseconds)
    #[serde(default = "default_ttl_ms")]
    pub default_ttl_ms: u64,

    /// Lifetime of the "copied" confirmation (milliseconds)
    #[serde(default = "default_copy_ttl_ms")]
    pub copy_ttl_ms: u64,
}

fn default_ttl_ms() -> u64 {
    3000
}

fn default_copy_ttl_ms() -> u64 {
    2000
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            default_ttl_ms: default_ttl_ms(),
            copy_ttl_ms: default_copy_ttl_ms(),
        }
    }
}

/// Upload configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Size of each streamed body chunk; one progress tick is reported per chunk
    #[serde(default = "default_chunk_size")]
    pub chunk_size_bytes: usize,

    /// File extensions the backend knows how to ingest
    #[serde(default = "default_accepted_extensions")]
    pub accepted_extensions: Vec<String>,
}

fn default_chunk_size() -> usize {
    64 * 1024 // 64 KiB
}

fn default_accepted_extensions() -> Vec<String> {
    vec![
        "pdf".to_string(),
        "txt".to_string(),
        "doc".to_string(),
        "docx".to_string(),
    ]
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            chunk_size_bytes: default_chunk_size(),
            accepted_extensions: default_accepted_extensions(),
        }
    }
}

/// Chat configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Assistant text recorded in history when a question could not be answered
    #[serde(default = "default_fallback_message")]
    pub fallback_message: String,

    /// Subject selected when an interactive session starts
    #[serde(default)]
    pub default_subject: Option<String>,
}

/// Assistant placeholder recorded when an exchange fails
pub const FALLBACK_MESSAGE: &str = "I apologize, but I encountered an error while processing your request. Please try again or check your connection.";

fn default_fallback_message() -> String {
    FALLBACK_MESSAGE.to_string()
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            fallback_message: default_fallback_message(),
            default_subject: None,
        }
    }
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Returns
    ///
    /// Returns the loaded and merged configuration
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| NotemindError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| NotemindError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(base_url) = std::env::var("NOTEMIND_API_BASE") {
            self.api.base_url = base_url;
        }

        if let Ok(timeout) = std::env::var("NOTEMIND_TIMEOUT_SECONDS") {
            if let Ok(value) = timeout.parse() {
                self.api.timeout_seconds = value;
            } else {
                tracing::warn!("Invalid NOTEMIND_TIMEOUT_SECONDS: {}", timeout);
            }
        }

        if let Ok(ttl) = std::env::var("NOTEMIND_NOTIFICATION_TTL_MS") {
            if let Ok(value) = ttl.parse() {
                self.notifications.default_ttl_ms = value;
            } else {
                tracing::warn!("Invalid NOTEMIND_NOTIFICATION_TTL_MS: {}", ttl);
            }
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if cli.verbose {
            tracing::debug!("Verbose mode enabled");
        }

        if let Some(base_url) = &cli.api_base {
            tracing::debug!("Using API base override from CLI: {}", base_url);
            self.api.base_url = base_url.clone();
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns error if any validation check fails
    pub fn validate(&self) -> Result<()> {
        let url = url::Url::parse(&self.api.base_url).map_err(|e| {
            NotemindError::Config(format!(
                "Invalid api.base_url '{}': {}",
                self.api.base_url, e
            ))
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(NotemindError::Config(format!(
                "api.base_url must use http or https, got: {}",
                url.scheme()
            ))
            .into());
        }

        if self.api.timeout_seconds == 0 {
            return Err(NotemindError::Config(
                "api.timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if self.notifications.default_ttl_ms == 0 || self.notifications.copy_ttl_ms == 0 {
            return Err(NotemindError::Config(
                "notification lifetimes must be greater than 0".to_string(),
            )
            .into());
        }

        if self.upload.chunk_size_bytes == 0 {
            return Err(NotemindError::Config(
                "upload.chunk_size_bytes must be greater than 0".to_string(),
            )
            .into());
        }

        if self.chat.fallback_message.trim().is_empty() {
            return Err(NotemindError::Config(
                "chat.fallback_message cannot be empty".to_string(),
            )
            .into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn cli_with(api_base: Option<&str>) -> crate::cli::Cli {
        crate::cli::Cli {
            config: None,
            verbose: false,
            api_base: api_base.map(str::to_string),
            command: crate::cli::Commands::Subjects,
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.api.base_url, "http://localhost:5000");
        assert_eq!(config.api.timeout_seconds, 120);
        assert_eq!(config.notifications.default_ttl_ms, 3000);
        assert_eq!(config.notifications.copy_ttl_ms, 2000);
        assert_eq!(config.chat.fallback_message, FALLBACK_MESSAGE);
    }

    #[test]
    fn test_config_validation_success() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_invalid_url() {
        let mut config = Config::default();
        config.api.base_url = "not a url".to_string();
        assert!(config.validate().is_err());

        config.api.base_url = "ftp://example.com".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_zero_timeout() {
        let mut config = Config::default();
        config.api.timeout_seconds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_zero_ttl() {
        let mut config = Config::default();
        config.notifications.copy_ttl_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_zero_chunk_size() {
        let mut config = Config::default();
        config.upload.chunk_size_bytes = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_from_yaml() {
        let yaml = r#"
api:
  base_url: http://notes.internal:8000
  timeout_seconds: 30
notifications:
  default_ttl_ms: 5000
upload:
  chunk_size_bytes: 1024
chat:
  default_subject: Physics
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.api.base_url, "http://notes.internal:8000");
        assert_eq!(config.api.timeout(), Duration::from_secs(30));
        assert_eq!(config.notifications.default_ttl_ms, 5000);
        assert_eq!(config.notifications.copy_ttl_ms, 2000);
        assert_eq!(config.upload.chunk_size_bytes, 1024);
        assert_eq!(config.upload.accepted_extensions.len(), 4);
        assert_eq!(config.chat.default_subject.as_deref(), Some("Physics"));
    }

    #[test]
    #[serial]
    fn test_load_nonexistent_file_uses_defaults() {
        let config = Config::load("nonexistent.yaml", &cli_with(None)).unwrap();
        assert_eq!(config.api.timeout_seconds, 120);
    }

    #[test]
    #[serial]
    fn test_load_from_file_with_cli_override() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "api:\n  base_url: http://from-file:1\n").unwrap();

        let config = Config::load(path.to_str().unwrap(), &cli_with(None)).unwrap();
        assert_eq!(config.api.base_url, "http://from-file:1");

        let config =
            Config::load(path.to_str().unwrap(), &cli_with(Some("http://from-cli:2"))).unwrap();
        assert_eq!(config.api.base_url, "http://from-cli:2");
    }

    #[test]
    #[serial]
    fn test_load_rejects_malformed_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "api: [unclosed").unwrap();

        let err = Config::load(path.to_str().unwrap(), &cli_with(None)).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config"));
    }

    #[test]
    #[serial]
    fn test_apply_env_vars_overrides_api_fields() {
        std::env::set_var("NOTEMIND_API_BASE", "http://env-host:9000");
        std::env::set_var("NOTEMIND_TIMEOUT_SECONDS", "15");
        std::env::set_var("NOTEMIND_NOTIFICATION_TTL_MS", "not-a-number");

        let mut config = Config::default();
        config.apply_env_vars();

        assert_eq!(config.api.base_url, "http://env-host:9000");
        assert_eq!(config.api.timeout_seconds, 15);
        assert_eq!(config.notifications.default_ttl_ms, 3000);

        std::env::remove_var("NOTEMIND_API_BASE");
        std::env::remove_var("NOTEMIND_TIMEOUT_SECONDS");
        std::env::remove_var("NOTEMIND_NOTIFICATION_TTL_MS");
    }
}
