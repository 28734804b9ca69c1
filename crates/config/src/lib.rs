//! Configuration loading, validation, and management for Portico.
//!
//! Loads configuration from `~/.portico/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.portico/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP listener configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Page template and composition settings
    #[serde(default)]
    pub ui: UiConfig,

    /// How callers are authenticated
    #[serde(default)]
    pub auth: AuthConfig,

    /// Session token issuance
    #[serde(default)]
    pub tokens: TokenConfig,

    /// Preferences backend
    #[serde(default)]
    pub preferences: PreferencesConfig,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    /// Must be set to bind anything other than a loopback address.
    #[serde(default)]
    pub allow_public_bind: bool,
}

fn default_port() -> u16 {
    8181
}
fn default_host() -> String {
    "127.0.0.1".into()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            allow_public_bind: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    /// Page template on disk. The built-in template is used when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_path: Option<PathBuf>,

    /// Payload served while UI services are still starting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_ready_path: Option<PathBuf>,

    /// Where `GET /` sends unauthenticated callers.
    #[serde(default = "default_index_path")]
    pub index_path: String,

    /// Largest body chunk handed to the transport, in bytes.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

fn default_index_path() -> String {
    "/index.html".into()
}
fn default_chunk_size() -> usize {
    8 * 1024
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            template_path: None,
            not_ready_path: None,
            index_path: default_index_path(),
            chunk_size: default_chunk_size(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// "basic" (HTTP Basic against `users`) or "header" (trusted proxy header)
    #[serde(default = "default_auth_mode")]
    pub mode: String,

    /// Header carrying the user name in "header" mode
    #[serde(default = "default_header_name")]
    pub header_name: String,

    /// Known users for "basic" mode
    #[serde(default)]
    pub users: Vec<UserConfig>,
}

fn default_auth_mode() -> String {
    "basic".into()
}
fn default_header_name() -> String {
    "x-forwarded-user".into()
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            mode: default_auth_mode(),
            header_name: default_header_name(),
            users: vec![],
        }
    }
}

/// A user allowed to log in with HTTP Basic.
#[derive(Clone, Serialize, Deserialize)]
pub struct UserConfig {
    pub name: String,

    /// Lowercase hex SHA-256 of the password
    pub password_sha256: String,
}

impl std::fmt::Debug for UserConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserConfig")
            .field("name", &self.name)
            .field("password_sha256", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenConfig {
    /// Live tokens kept for channel validation; oldest are evicted first.
    #[serde(default = "default_max_active")]
    pub max_active: usize,

    /// Revoke a token once its channel closes.
    #[serde(default = "default_true")]
    pub revoke_on_close: bool,
}

fn default_max_active() -> usize {
    1024
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            max_active: default_max_active(),
            revoke_on_close: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreferencesConfig {
    /// "memory" or "file"
    #[serde(default = "default_preferences_backend")]
    pub backend: String,

    /// Directory for the "file" backend. Defaults to `~/.portico/preferences`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

fn default_preferences_backend() -> String {
    "file".into()
}

impl Default for PreferencesConfig {
    fn default() -> Self {
        Self {
            backend: default_preferences_backend(),
            dir: None,
        }
    }
}

impl PreferencesConfig {
    /// The resolved directory for the file backend.
    pub fn dir_or_default(&self) -> PathBuf {
        self.dir
            .clone()
            .unwrap_or_else(|| AppConfig::config_dir().join("preferences"))
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.portico/config.toml).
    ///
    /// Environment variables override the file:
    /// - `PORTICO_HOST`
    /// - `PORTICO_PORT`
    /// - `PORTICO_TEMPLATE`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from an environment lookup.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("PORTICO_HOST") {
            self.gateway.host = host;
        }

        if let Some(port) = lookup("PORTICO_PORT") {
            self.gateway.port = port.parse().map_err(|_| {
                ConfigError::ValidationError(format!("PORTICO_PORT is not a valid port: {port}"))
            })?;
        }

        if let Some(template) = lookup("PORTICO_TEMPLATE") {
            self.ui.template_path = Some(PathBuf::from(template));
        }

        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".portico")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.gateway.port == 0 {
            return Err(ConfigError::ValidationError("gateway.port must be > 0".into()));
        }

        if !self.gateway.allow_public_bind && !is_loopback(&self.gateway.host) {
            return Err(ConfigError::ValidationError(format!(
                "gateway.host {} is not a loopback address; set allow_public_bind = true",
                self.gateway.host
            )));
        }

        if self.ui.chunk_size == 0 {
            return Err(ConfigError::ValidationError("ui.chunk_size must be > 0".into()));
        }

        if !self.ui.index_path.starts_with('/') {
            return Err(ConfigError::ValidationError(
                "ui.index_path must start with '/'".into(),
            ));
        }

        if RESERVED_PATHS.contains(&self.ui.index_path.as_str())
            || self.ui.index_path.starts_with("/static/")
        {
            return Err(ConfigError::ValidationError(format!(
                "ui.index_path '{}' collides with a built-in route",
                self.ui.index_path
            )));
        }

        match self.auth.mode.as_str() {
            "basic" | "header" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "unknown auth.mode '{other}' (expected \"basic\" or \"header\")"
                )));
            }
        }

        for user in &self.auth.users {
            let digest = &user.password_sha256;
            if digest.len() != 64 || !digest.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(ConfigError::ValidationError(format!(
                    "auth.users '{}': password_sha256 must be 64 hex characters",
                    user.name
                )));
            }
        }

        if self.tokens.max_active == 0 {
            return Err(ConfigError::ValidationError(
                "tokens.max_active must be > 0".into(),
            ));
        }

        match self.preferences.backend.as_str() {
            "memory" | "file" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "unknown preferences.backend '{other}' (expected \"memory\" or \"file\")"
                )));
            }
        }

        Ok(())
    }

    /// Generate a default config TOML string (for `init` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Routes the gateway always serves itself.
const RESERVED_PATHS: &[&str] = &["/", "/websocket", "/health"];

fn is_loopback(host: &str) -> bool {
    match host.parse::<std::net::IpAddr>() {
        Ok(ip) => ip.is_loopback(),
        Err(_) => host == "localhost",
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
