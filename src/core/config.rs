//! # Configuration
//!
//! Centralizes all settings with a clear override hierarchy:
//! defaults → config file → env vars → CLI flags.
//!
//! Config lives at `~/.roomtalk/config.toml`. If missing on first run, a
//! commented-out default is generated so users can discover all options.

use log::{debug, info, warn};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use crate::channel::ReconnectPolicy;
use crate::channel::backoff::{DEFAULT_BASE_DELAY, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_DELAY};
use crate::channel::typing::DEFAULT_TYPING_TTL;

// ============================================================================
// Config Structs (all fields Option<T> for sparse TOML)
// ============================================================================

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct RoomtalkConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub channel: ChannelConfig,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ServerConfig {
    pub base_url: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct GeneralConfig {
    pub username: Option<String>,
    pub default_room: Option<String>,
    pub allow_anonymous: Option<bool>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ChannelConfig {
    pub reconnect_base_ms: Option<u64>,
    pub reconnect_max_ms: Option<u64>,
    pub max_reconnect_attempts: Option<u32>,
    pub typing_ttl_ms: Option<u64>,
}

// ============================================================================
// Defaults
// ============================================================================

pub const DEFAULT_SERVER_URL: &str = "http://localhost:8000";

// ============================================================================
// Resolved Config (concrete values, no Options)
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    pub server_url: String,
    /// Preferred username when no session is saved.
    pub username: Option<String>,
    /// Room to join right after startup.
    pub default_room: Option<String>,
    /// Whether rooms may be joined without logging in.
    pub allow_anonymous: bool,
    pub reconnect: ReconnectPolicy,
    pub typing_ttl: Duration,
}

impl ResolvedConfig {
    pub fn server_url(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(&self.server_url)
            .map_err(|e| ConfigError::InvalidServerUrl(format!("{}: {e}", self.server_url)))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(ConfigError::InvalidServerUrl(format!(
                "{}: scheme must be http or https, not {other}",
                self.server_url
            ))),
        }
    }
}

/// Values given on the command line (None = not specified).
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    pub server: Option<String>,
    pub username: Option<String>,
    pub room: Option<String>,
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    InvalidServerUrl(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "config I/O error: {e}"),
            ConfigError::Parse(e) => write!(f, "config parse error: {e}"),
            ConfigError::InvalidServerUrl(msg) => write!(f, "invalid server URL {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Loading
// ============================================================================

/// Returns the path to `~/.roomtalk/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".roomtalk").join("config.toml"))
}

/// Load config from `~/.roomtalk/config.toml`.
///
/// If the file doesn't exist, generates a commented-out default and
/// returns `RoomtalkConfig::default()`. If it exists but is malformed,
/// returns `ConfigError::Parse`.
pub fn load_config() -> Result<RoomtalkConfig, ConfigError> {
    let path = match config_path() {
        Some(p) => p,
        None => {
            warn!("Could not determine home directory, using default config");
            return Ok(RoomtalkConfig::default());
        }
    };
    load_config_from(&path)
}

pub fn load_config_from(path: &Path) -> Result<RoomtalkConfig, ConfigError> {
    if !path.exists() {
        info!("No config file found, generating default at {}", path.display());
        generate_default_config(path);
        return Ok(RoomtalkConfig::default());
    }

    let contents = fs::read_to_string(path).map_err(ConfigError::Io)?;
    let config: RoomtalkConfig = toml::from_str(&contents).map_err(ConfigError::Parse)?;
    info!("Loaded config from {}", path.display());
    debug!("Config: {:?}", config);
    Ok(config)
}

const DEFAULT_CONFIG_TEMPLATE: &str = r#"# roomtalk configuration
# All settings are optional; defaults are used for anything not specified.
# Override hierarchy: defaults → this file → env vars → CLI flags.

# [server]
# base_url = "http://localhost:8000"   # Or set ROOMTALK_SERVER_URL

# [general]
# username = "alice"                   # Or set ROOMTALK_USERNAME
# default_room = "general"             # Joined right after startup
# allow_anonymous = true               # Join rooms without logging in

# [channel]
# reconnect_base_ms = 1000             # First reconnect delay, doubled per attempt
# reconnect_max_ms = 30000
# max_reconnect_attempts = 5
# typing_ttl_ms = 3000
"#;

/// Generates a commented-out default config file at the given path.
fn generate_default_config(path: &Path) {
    if let Some(parent) = path.parent()
        && let Err(e) = fs::create_dir_all(parent)
    {
        warn!("Failed to create config directory: {}", e);
        return;
    }
    if let Err(e) = fs::write(path, DEFAULT_CONFIG_TEMPLATE) {
        warn!("Failed to write default config: {}", e);
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// Resolve the final config by collapsing: defaults → config file → env vars → CLI.
pub fn resolve(config: &RoomtalkConfig, cli: &CliOverrides) -> ResolvedConfig {
    resolve_with_env(config, cli, |key| std::env::var(key).ok())
}

fn resolve_with_env(
    config: &RoomtalkConfig,
    cli: &CliOverrides,
    env: impl Fn(&str) -> Option<String>,
) -> ResolvedConfig {
    // Server: CLI → env → config → default
    let server_url = cli
        .server
        .clone()
        .or_else(|| env("ROOMTALK_SERVER_URL"))
        .or_else(|| config.server.base_url.clone())
        .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string());

    // Username: CLI → env → config
    let username = cli
        .username
        .clone()
        .or_else(|| env("ROOMTALK_USERNAME"))
        .or_else(|| config.general.username.clone());

    let default_room = cli
        .room
        .clone()
        .or_else(|| config.general.default_room.clone());

    let channel = &config.channel;
    let reconnect = ReconnectPolicy {
        base_delay: channel
            .reconnect_base_ms
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_BASE_DELAY),
        max_delay: channel
            .reconnect_max_ms
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_MAX_DELAY),
        max_attempts: channel
            .max_reconnect_attempts
            .unwrap_or(DEFAULT_MAX_ATTEMPTS),
    };

    ResolvedConfig {
        server_url,
        username,
        default_room,
        allow_anonymous: config.general.allow_anonymous.unwrap_or(true),
        reconnect,
        typing_ttl: channel
            .typing_ttl_ms
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_TYPING_TTL),
    }
}
