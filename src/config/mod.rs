//! Configuration management
//!
//! This module handles loading and parsing configuration for the Logue service.
//! Configuration can be loaded from:
//! - config.yml file
//! - Environment variables (override file settings)
//!
//! Missing optional values are filled with sensible defaults.

use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Cache configuration
    #[serde(default)]
    pub cache: CacheConfig,
    /// Listing and rendering configuration
    #[serde(default)]
    pub logue: LogueConfig,
    /// Admin API configuration
    #[serde(default)]
    pub admin: AdminConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS allowed origin
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: default_cors_origin(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_cors_origin() -> String {
    "http://localhost:3000".to_string()
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database driver (sqlite or mysql)
    #[serde(default)]
    pub driver: DatabaseDriver,
    /// Database connection URL
    #[serde(default = "default_database_url")]
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            driver: DatabaseDriver::default(),
            url: default_database_url(),
        }
    }
}

fn default_database_url() -> String {
    "data/logue.db".to_string()
}

/// Database driver type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseDriver {
    /// SQLite (default)
    #[default]
    Sqlite,
    /// MySQL
    Mysql,
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Whether listing results are cached at all
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,
    /// Cache TTL in seconds
    #[serde(default = "default_ttl")]
    pub ttl_seconds: u64,
    /// Maximum number of cached entries
    #[serde(default = "default_max_capacity")]
    pub max_capacity: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            ttl_seconds: default_ttl(),
            max_capacity: default_max_capacity(),
        }
    }
}

fn default_cache_enabled() -> bool {
    true
}

fn default_ttl() -> u64 {
    300
}

fn default_max_capacity() -> u64 {
    10_000
}

/// Listing and body rendering configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogueConfig {
    /// Number of pages shown per listing page
    #[serde(default = "default_per_page")]
    pub per_page: u32,
    /// syntect theme used for code blocks
    #[serde(default = "default_highlight_theme")]
    pub highlight_theme: String,
}

impl Default for LogueConfig {
    fn default() -> Self {
        Self {
            per_page: default_per_page(),
            highlight_theme: default_highlight_theme(),
        }
    }
}

fn default_per_page() -> u32 {
    4
}

fn default_highlight_theme() -> String {
    "base16-ocean.dark".to_string()
}

/// Admin API configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdminConfig {
    /// Bearer token required on admin routes. Admin routes are open when unset.
    #[serde(default)]
    pub token: Option<String>,
}

/// Error type for configuration parsing
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {message}")]
    ParseError { path: String, message: String },
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

impl Config {
    /// Load configuration from file
    ///
    /// If the file doesn't exist, returns default configuration.
    /// If the file exists but is invalid YAML, returns an error with details.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config =
            serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.display().to_string(),
                message: format_yaml_error(&e),
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file with environment variable overrides
    ///
    /// Environment variables follow the pattern:
    /// - LOGUE_SERVER_HOST
    /// - LOGUE_SERVER_PORT
    /// - LOGUE_SERVER_CORS_ORIGIN
    /// - LOGUE_DATABASE_DRIVER
    /// - LOGUE_DATABASE_URL
    /// - LOGUE_CACHE_ENABLED
    /// - LOGUE_CACHE_TTL_SECONDS
    /// - LOGUE_PER_PAGE
    /// - LOGUE_HIGHLIGHT_THEME
    /// - LOGUE_ADMIN_TOKEN
    pub fn load_with_env(path: &std::path::Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.logue.per_page == 0 {
            return Err(ConfigError::ValidationError(
                "logue.per_page must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Apply environment variable overrides to the configuration
    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("LOGUE_SERVER_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("LOGUE_SERVER_PORT") {
            if let Ok(port) = port.parse::<u16>() {
                self.server.port = port;
            }
        }
        if let Ok(cors_origin) = std::env::var("LOGUE_SERVER_CORS_ORIGIN") {
            self.server.cors_origin = cors_origin;
        }

        if let Ok(driver) = std::env::var("LOGUE_DATABASE_DRIVER") {
            match driver.to_lowercase().as_str() {
                "sqlite" => self.database.driver = DatabaseDriver::Sqlite,
                "mysql" => self.database.driver = DatabaseDriver::Mysql,
                _ => {} // Ignore invalid values
            }
        }
        if let Ok(url) = std::env::var("LOGUE_DATABASE_URL") {
            self.database.url = url;
        }

        if let Ok(enabled) = std::env::var("LOGUE_CACHE_ENABLED") {
            if let Ok(enabled) = enabled.parse::<bool>() {
                self.cache.enabled = enabled;
            }
        }
        if let Ok(ttl) = std::env::var("LOGUE_CACHE_TTL_SECONDS") {
            if let Ok(ttl) = ttl.parse::<u64>() {
                self.cache.ttl_seconds = ttl;
            }
        }

        if let Ok(per_page) = std::env::var("LOGUE_PER_PAGE") {
            if let Ok(per_page) = per_page.parse::<u32>() {
                if per_page > 0 {
                    self.logue.per_page = per_page;
                }
            }
        }
        if let Ok(theme) = std::env::var("LOGUE_HIGHLIGHT_THEME") {
            self.logue.highlight_theme = theme;
        }

        if let Ok(token) = std::env::var("LOGUE_ADMIN_TOKEN") {
            if !token.is_empty() {
                self.admin.token = Some(token);
            }
        }
    }
}

/// Format YAML parsing error with location and context
fn format_yaml_error(e: &serde_yaml::Error) -> String {
    if let Some(location) = e.location() {
        format!(
            "at line {}, column {}: {}",
            location.line(),
            location.column(),
            e
        )
    } else {
        e.to_string()
    }
}

// Shared mutex for config tests that modify environment variables.
#[cfg(test)]
static CONFIG_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());
