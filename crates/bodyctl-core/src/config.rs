// ── Runtime connection configuration ──
//
// These types describe how to reach a body controller and how hard to try.
// They never touch disk: the CLI builds a `ControllerConfig` (usually from
// a bodyctl-config profile) and hands it in.

use std::time::Duration;

use url::Url;

use bodyctl_api::{ReconnectConfig, RetryPolicy};

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict). Default.
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(std::path::PathBuf),
    /// Skip verification (bench rigs with self-signed certs).
    DangerAcceptInvalid,
}

/// Configuration for one body controller.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// API root, e.g. `http://localhost:8080/api`.
    pub url: Url,
    /// Push stream path relative to `url`.
    pub events_path: String,
    pub tls: TlsVerification,
    /// TCP connect timeout.
    pub connect_timeout: Duration,
    /// Command API retry and per-attempt timeout.
    pub retry: RetryPolicy,
    /// Push stream reconnect tuning.
    pub reconnect: ReconnectConfig,
    /// Subscribe to the push stream on `init`.
    pub events_enabled: bool,
    /// Poll every door and window once during `init`.
    pub refresh_on_init: bool,
    /// How often to poll every door and window (seconds). 0 = never.
    pub refresh_interval_secs: u64,
}

impl ControllerConfig {
    /// Configuration for the API root at `url` with default tuning.
    pub fn new(url: Url) -> Self {
        Self {
            url,
            events_path: "events".into(),
            tls: TlsVerification::default(),
            connect_timeout: Duration::from_secs(5),
            retry: RetryPolicy::default(),
            reconnect: ReconnectConfig::default(),
            events_enabled: true,
            refresh_on_init: true,
            refresh_interval_secs: 0,
        }
    }
}

/// Default API root of a locally running body controller.
pub const DEFAULT_URL: &str = "http://localhost:8080/api";
