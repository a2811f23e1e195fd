//! Shared configuration for bodyctl.
//!
//! TOML profiles, layered loading (defaults, file, `BODYCTL_` environment)
//! and translation to `bodyctl_core::ControllerConfig`. The CLI adds its
//! flag overrides on top.

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

use bodyctl_api::{ReconnectConfig, RetryPolicy};
use bodyctl_core::{ControllerConfig, DEFAULT_URL, TlsVerification};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{name}' not found")]
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

    /// Named controller profiles.
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
    /// Name of the profile to use: `requested`, else `default_profile`,
    /// else `"default"`.
    pub fn profile_name(&self, requested: Option<&str>) -> String {
        requested
            .map(str::to_owned)
            .or_else(|| self.default_profile.clone())
            .unwrap_or_else(|| "default".into())
    }

    /// Look up a profile. The implicit `default` profile (local service,
    /// stock tuning) exists even when the file does not define it.
    pub fn profile(&self, name: &str) -> Result<Profile, ConfigError> {
        match self.profiles.get(name) {
            Some(profile) => Ok(profile.clone()),
            None if name == "default" => Ok(Profile::default()),
            None => Err(ConfigError::UnknownProfile { name: name.into() }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default)]
    pub insecure: bool,

    /// Per-attempt request timeout (seconds).
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Total attempts per request, including the first.
    #[serde(default = "default_retries")]
    pub retries: u32,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            insecure: false,
            timeout: default_timeout(),
            retries: default_retries(),
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
    5
}
fn default_retries() -> u32 {
    3
}

/// A named body controller profile.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Profile {
    /// API root (e.g., "http://192.168.7.2:8080/api").
    #[serde(default = "default_url")]
    pub url: String,

    /// Push stream path relative to `url`.
    pub events_path: Option<String>,

    /// Subscribe to push events in long-running commands.
    pub events: Option<bool>,

    /// Path to custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Override insecure TLS setting.
    pub insecure: Option<bool>,

    /// Override per-attempt timeout (seconds).
    pub timeout: Option<u64>,

    /// Override attempts per request.
    pub retries: Option<u32>,

    /// Delay after the first failed attempt (milliseconds).
    pub retry_delay_ms: Option<u64>,

    /// First push reconnect delay (milliseconds).
    pub reconnect_delay_ms: Option<u64>,

    /// Reconnect delay ceiling (milliseconds).
    pub reconnect_max_delay_ms: Option<u64>,

    /// Stop reconnecting after this many attempts. Unset = forever.
    pub reconnect_max_retries: Option<u32>,

    /// Periodic poll interval for long-running commands (seconds, 0 = off).
    pub refresh_interval: Option<u64>,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            url: default_url(),
            events_path: None,
            events: None,
            ca_cert: None,
            insecure: None,
            timeout: None,
            retries: None,
            retry_delay_ms: None,
            reconnect_delay_ms: None,
            reconnect_max_delay_ms: None,
            reconnect_max_retries: None,
            refresh_interval: None,
        }
    }
}

fn default_url() -> String {
    DEFAULT_URL.into()
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "bodyctl", "bodyctl").map_or_else(
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
    p.push("bodyctl");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from an explicit file + environment. A missing file is not an
/// error; defaults apply.
///
/// Environment keys nest with a double underscore, e.g.
/// `BODYCTL_DEFAULTS__TIMEOUT=10` or `BODYCTL_PROFILES__BENCH__URL=...`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("BODYCTL_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if loading fails.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(&config_path(), cfg)
}

pub fn save_config_to(path: &Path, cfg: &Config) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Translation ─────────────────────────────────────────────────────

/// Build a `ControllerConfig` from a profile and the global defaults,
/// without CLI flag overrides.
pub fn profile_to_controller_config(
    profile: &Profile,
    defaults: &Defaults,
) -> Result<ControllerConfig, ConfigError> {
    let url: url::Url = profile.url.parse().map_err(|_| ConfigError::Validation {
        field: "url".into(),
        reason: format!("invalid URL: {}", profile.url),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::Validation {
            field: "url".into(),
            reason: format!("unsupported scheme '{}'", url.scheme()),
        });
    }

    let tls = if profile.insecure.unwrap_or(defaults.insecure) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };

    let stock_retry = RetryPolicy::default();
    let retry = RetryPolicy {
        max_attempts: profile.retries.unwrap_or(defaults.retries).max(1),
        base_delay: profile
            .retry_delay_ms
            .map_or(stock_retry.base_delay, Duration::from_millis),
        attempt_timeout: Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout).max(1)),
        ..stock_retry
    };

    let stock_reconnect = ReconnectConfig::default();
    let reconnect = ReconnectConfig {
        initial_delay: profile
            .reconnect_delay_ms
            .map_or(stock_reconnect.initial_delay, Duration::from_millis),
        max_delay: profile
            .reconnect_max_delay_ms
            .map_or(stock_reconnect.max_delay, Duration::from_millis),
        max_retries: profile.reconnect_max_retries,
        ..stock_reconnect
    };

    let mut config = ControllerConfig::new(url);
    if let Some(ref events_path) = profile.events_path {
        config.events_path.clone_from(events_path);
    }
    config.tls = tls;
    config.retry = retry;
    config.reconnect = reconnect;
    config.events_enabled = profile.events.unwrap_or(true);
    config.refresh_interval_secs = profile.refresh_interval.unwrap_or(0);
    Ok(config)
}
