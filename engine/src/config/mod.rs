//! Configuration management
//!
//! This module handles loading, validation, and management of the growhost
//! configuration. Configuration is stored in TOML format at
//! ~/.growhost/config.toml.
//!
//! # Configuration Sections
//!
//! - **core**: Data directory and log level
//! - **telegram**: Banner photo URL and long-poll timeout
//! - **server**: Host file server enablement and bind address
//!
//! The Telegram bot credential is intentionally not part of the file; it is
//! read from the `TELEGRAM_BOT_TOKEN` environment variable at startup.
//!
//! # Path Expansion
//!
//! The configuration system automatically:
//! - Expands ~ to the user's home directory
//! - Creates the data directory (and its hosts/ subdirectory) if missing

use crate::errors::BotError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Environment variable holding the Telegram bot credential.
pub const TOKEN_ENV: &str = "TELEGRAM_BOT_TOKEN";

/// Main configuration structure
///
/// Represents the complete growhost configuration loaded from
/// ~/.growhost/config.toml.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Core engine settings
    #[serde(default)]
    pub core: CoreConfig,

    /// Telegram transport settings
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Host file server settings
    #[serde(default)]
    pub server: ServerConfig,
}

/// Core engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Data directory path (supports ~ expansion). Holds users.json,
    /// user_state.json and the hosts/ directory.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Telegram transport configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Optional banner photo URL sent with every screen. When unset,
    /// screens are sent as plain text messages.
    #[serde(default)]
    pub banner_url: Option<String>,

    /// Long-poll timeout for getUpdates, in seconds
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_secs: u64,
}

/// Host file server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Enable the HTTP server that republishes host files
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Bind address for the server
    #[serde(default = "default_bind")]
    pub bind: String,
}

// Default value functions
fn default_data_dir() -> PathBuf {
    PathBuf::from("~/.growhost")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_poll_timeout() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

fn default_bind() -> String {
    "127.0.0.1:3000".to_string()
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_level: default_log_level(),
        }
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            banner_url: None,
            poll_timeout_secs: default_poll_timeout(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind: default_bind(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            core: CoreConfig::default(),
            telegram: TelegramConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default location (~/.growhost/config.toml)
    ///
    /// If the configuration file doesn't exist, creates a default one.
    /// Validates the configuration after loading and returns descriptive
    /// errors if validation fails.
    pub fn load_or_create() -> Result<Self, BotError> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load_from_path(&config_path)
        } else {
            Self::create_default(&config_path)
        }
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, BotError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| BotError::Config(format!("Failed to read config file: {}", e)))?;

        let mut config: Config = toml::from_str(&contents)
            .map_err(|e| BotError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate_and_process()?;

        Ok(config)
    }

    /// Create default configuration and save it to path
    fn create_default(path: &Path) -> Result<Self, BotError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                BotError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let mut config = Self::default();
        config.validate_and_process()?;

        let toml_string = toml::to_string_pretty(&config)
            .map_err(|e| BotError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string)
            .map_err(|e| BotError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(config)
    }

    /// Get the default configuration file path (~/.growhost/config.toml)
    pub fn default_config_path() -> Result<PathBuf, BotError> {
        let home = dirs::home_dir()
            .ok_or_else(|| BotError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(".growhost").join("config.toml"))
    }

    /// Validate and process configuration
    ///
    /// Validates the log level and bind address, expands ~ in the data
    /// directory, and creates the data and hosts directories if missing.
    fn validate_and_process(&mut self) -> Result<(), BotError> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.core.log_level.as_str()) {
            return Err(BotError::Config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.core.log_level,
                valid_log_levels.join(", ")
            )));
        }

        self.server.bind.parse::<SocketAddr>().map_err(|e| {
            BotError::Config(format!(
                "Invalid server bind address '{}': {}",
                self.server.bind, e
            ))
        })?;

        if self.telegram.poll_timeout_secs == 0 {
            return Err(BotError::Config(
                "poll_timeout_secs must be greater than 0".to_string(),
            ));
        }

        self.core.data_dir = expand_path(&self.core.data_dir)?;

        let hosts_dir = self.hosts_dir();
        fs::create_dir_all(&hosts_dir).map_err(|e| {
            BotError::Config(format!("Failed to create data directory: {}", e))
        })?;

        Ok(())
    }

    /// Path of the user registry document
    pub fn users_path(&self) -> PathBuf {
        self.core.data_dir.join("users.json")
    }

    /// Path of the conversation state document
    pub fn state_path(&self) -> PathBuf {
        self.core.data_dir.join("user_state.json")
    }

    /// Directory holding the generated host files
    pub fn hosts_dir(&self) -> PathBuf {
        self.core.data_dir.join("hosts")
    }

    /// Parsed server bind address. Only valid after `validate_and_process`.
    pub fn server_addr(&self) -> Result<SocketAddr, BotError> {
        self.server.bind.parse().map_err(|e| {
            BotError::Config(format!(
                "Invalid server bind address '{}': {}",
                self.server.bind, e
            ))
        })
    }

    /// Read the bot credential from the environment.
    pub fn bot_token() -> Result<String, BotError> {
        std::env::var(TOKEN_ENV).map_err(|_| {
            BotError::Config(format!(
                "Missing Telegram credential: set the {} environment variable",
                TOKEN_ENV
            ))
        })
    }
}

/// Expand ~ in path to user's home directory
fn expand_path(path: &Path) -> Result<PathBuf, BotError> {
    let path_str = path
        .to_str()
        .ok_or_else(|| BotError::Config("Invalid UTF-8 in path".to_string()))?;

    if let Some(rest) = path_str.strip_prefix("~/") {
        let home = dirs::home_dir()
            .ok_or_else(|| BotError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(rest))
    } else if path_str == "~" {
        dirs::home_dir()
            .ok_or_else(|| BotError::Config("Could not determine home directory".to_string()))
    } else {
        Ok(path.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.core.log_level, "info");
        assert_eq!(config.core.data_dir, PathBuf::from("~/.growhost"));
        assert_eq!(config.telegram.poll_timeout_secs, 30);
        assert!(config.telegram.banner_url.is_none());
        assert!(config.server.enabled);
        assert_eq!(config.server.bind, "127.0.0.1:3000");
    }

    #[test]
    fn test_expand_path_with_tilde() {
        let path = PathBuf::from("~/data");
        let expanded = expand_path(&path).unwrap();

        let home = dirs::home_dir().unwrap();
        assert_eq!(expanded, home.join("data"));
    }

    #[test]
    fn test_expand_path_without_tilde() {
        let path = PathBuf::from("/absolute/path");
        let expanded = expand_path(&path).unwrap();

        assert_eq!(expanded, path);
    }

    #[test]
    fn test_document_paths() {
        let config = Config {
            core: CoreConfig {
                data_dir: PathBuf::from("/tmp/growhost"),
                log_level: "info".to_string(),
            },
            ..Config::default()
        };

        assert_eq!(config.users_path(), PathBuf::from("/tmp/growhost/users.json"));
        assert_eq!(
            config.state_path(),
            PathBuf::from("/tmp/growhost/user_state.json")
        );
        assert_eq!(config.hosts_dir(), PathBuf::from("/tmp/growhost/hosts"));
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_string = toml::to_string(&config).unwrap();

        let deserialized: Config = toml::from_str(&toml_string).unwrap();
        assert_eq!(config.core.log_level, deserialized.core.log_level);
        assert_eq!(config.server.bind, deserialized.server.bind);
    }

    #[test]
    fn test_invalid_log_level_rejected() {
        let mut config = Config::default();
        config.core.log_level = "verbose".to_string();
        config.core.data_dir = std::env::temp_dir().join("growhost-test-config");

        assert!(config.validate_and_process().is_err());
    }

    #[test]
    fn test_invalid_bind_rejected() {
        let mut config = Config::default();
        config.server.bind = "not-an-addr".to_string();
        config.core.data_dir = std::env::temp_dir().join("growhost-test-config");

        assert!(config.validate_and_process().is_err());
    }
}
