//! Shared configuration for the Aether panel tools.
//!
//! TOML profiles layered with environment overrides, and translation to
//! `aether_core::ControllerConfig`. The CLI adds flag-aware wrappers on top.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use aether_core::{ControllerConfig, ReconnectPolicy};

/// Control endpoint of a Core running on this machine.
pub const LOCAL_API_URL: &str = "http://127.0.0.1:9880/api/v1";

/// Prefix for environment overrides, e.g. `AETHER_DEFAULTS__OUTPUT=json`.
pub const ENV_PREFIX: &str = "AETHER_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("unknown profile '{name}'")]
    UnknownProfile { name: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named Core profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// Look up `name`, falling back to the configured default profile.
    ///
    /// The `default` profile always exists: when not configured it points
    /// at a local Core.
    pub fn profile(&self, name: Option<&str>) -> Result<(String, Profile), ConfigError> {
        let name = name
            .map(str::to_owned)
            .or_else(|| self.default_profile.clone())
            .unwrap_or_else(|| "default".into());

        match self.profiles.get(&name) {
            Some(profile) => Ok((name, profile.clone())),
            None if name == "default" => Ok((name, Profile::default())),
            None => Err(ConfigError::UnknownProfile { name }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Metrics samples kept for trend display.
    #[serde(default = "default_metrics_capacity")]
    pub metrics_capacity: usize,

    /// Core log lines kept.
    #[serde(default = "default_log_capacity")]
    pub log_capacity: usize,

    /// Re-hydration interval in seconds while connected. 0 disables.
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            timeout: default_timeout(),
            metrics_capacity: default_metrics_capacity(),
            log_capacity: default_log_capacity(),
            refresh_interval: default_refresh_interval(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    10
}
fn default_metrics_capacity() -> usize {
    60
}
fn default_log_capacity() -> usize {
    500
}
fn default_refresh_interval() -> u64 {
    30
}

/// A named Core endpoint profile.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Profile {
    /// Control endpoint base URL.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Event endpoint. Derived from `api_url` when absent.
    pub events_url: Option<String>,

    /// Override request timeout (seconds).
    pub timeout: Option<u64>,

    /// Heartbeat interval (seconds).
    pub heartbeat: Option<u64>,

    /// Delay before reconnecting (milliseconds).
    pub reconnect_delay_ms: Option<u64>,

    /// Switch to doubling backoff capped at this many milliseconds.
    pub reconnect_max_delay_ms: Option<u64>,

    /// Give up after this many consecutive failed reconnects.
    pub max_retries: Option<u32>,

    pub metrics_capacity: Option<usize>,

    pub log_capacity: Option<usize>,

    /// Override re-hydration interval (seconds).
    pub refresh_interval: Option<u64>,

    /// Zero traffic totals on every reconnect.
    #[serde(default)]
    pub reset_totals_on_reconnect: bool,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            events_url: None,
            timeout: None,
            heartbeat: None,
            reconnect_delay_ms: None,
            reconnect_max_delay_ms: None,
            max_retries: None,
            metrics_capacity: None,
            log_capacity: None,
            refresh_interval: None,
            reset_totals_on_reconnect: false,
        }
    }
}

fn default_api_url() -> String {
    LOCAL_API_URL.into()
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("net", "aether-realist", "aether").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("aether");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from `path` (missing files are fine) layered with `AETHER_*`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if it cannot be read.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Translation ─────────────────────────────────────────────────────

/// Build a `ControllerConfig` from a profile and the global defaults.
pub fn profile_to_controller_config(
    profile: &Profile,
    defaults: &Defaults,
) -> Result<ControllerConfig, ConfigError> {
    let api_url = parse_url("api_url", &profile.api_url)?;

    let mut config = match &profile.events_url {
        Some(events) => ControllerConfig::new(api_url, parse_url("events_url", events)?),
        None => ControllerConfig::from_api_url(api_url).map_err(|e| ConfigError::Validation {
            field: "api_url".into(),
            reason: e.to_string(),
        })?,
    };

    config.timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));
    if let Some(secs) = profile.heartbeat {
        config.heartbeat_interval = Duration::from_secs(secs);
    }
    config.reconnect = reconnect_policy(profile);
    config.max_retries = profile.max_retries;
    config.metrics_capacity = profile.metrics_capacity.unwrap_or(defaults.metrics_capacity);
    config.log_capacity = profile.log_capacity.unwrap_or(defaults.log_capacity);
    config.refresh_interval =
        Duration::from_secs(profile.refresh_interval.unwrap_or(defaults.refresh_interval));
    config.reset_totals_on_reconnect = profile.reset_totals_on_reconnect;

    config.validate().map_err(|e| ConfigError::Validation {
        field: "profile".into(),
        reason: e.to_string(),
    })?;
    Ok(config)
}

fn reconnect_policy(profile: &Profile) -> ReconnectPolicy {
    let base = profile
        .reconnect_delay_ms
        .map(Duration::from_millis);

    match (base, profile.reconnect_max_delay_ms) {
        (initial, Some(max_ms)) => ReconnectPolicy::Backoff {
            initial: initial.unwrap_or(Duration::from_secs(1)),
            max: Duration::from_millis(max_ms),
        },
        (Some(delay), None) => ReconnectPolicy::Fixed { delay },
        (None, None) => ReconnectPolicy::default(),
    }
}

fn parse_url(field: &str, raw: &str) -> Result<url::Url, ConfigError> {
    raw.parse().map_err(|_| ConfigError::Validation {
        field: field.into(),
        reason: format!("invalid URL: {raw}"),
    })
}

// ── Tests ───────────────────────────────────────────────────────────
