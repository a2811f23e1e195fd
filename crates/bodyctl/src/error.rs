//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors with
//! actionable help text and a stable process exit code.

use miette::Diagnostic;
use thiserror::Error;

use bodyctl_config::ConfigError;
use bodyctl_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const REJECTED: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const PARTIAL: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to body controller at {url}")]
    #[diagnostic(
        code(bodyctl::connection_failed),
        help(
            "Check that the body control service is running and reachable.\n\
             Reason: {reason}\n\
             Try: bodyctl health --endpoint {url}"
        )
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("Request timed out after {timeout_ms}ms ({attempts} attempt(s))")]
    #[diagnostic(
        code(bodyctl::timeout),
        help("Increase the timeout with --timeout or check service responsiveness.")
    )]
    Timeout { timeout_ms: u64, attempts: u32 },

    // ── Commands ─────────────────────────────────────────────────────
    #[error("Command rejected: {message}")]
    #[diagnostic(code(bodyctl::rejected))]
    Rejected { message: String },

    #[error("{failed} of {total} operations failed")]
    #[diagnostic(
        code(bodyctl::partial_failure),
        help("Run: bodyctl status to see the current state")
    )]
    PartialFailure { failed: usize, total: usize },

    // ── API ──────────────────────────────────────────────────────────
    #[error("API error: {message}")]
    #[diagnostic(code(bodyctl::api_error))]
    Api {
        message: String,
        status: Option<u16>,
    },

    #[error("Service reports status '{status}'")]
    #[diagnostic(
        code(bodyctl::unhealthy),
        help("Run: bodyctl health -o json for per-service details")
    )]
    Unhealthy { status: String },

    #[error("Unexpected response: {message}")]
    #[diagnostic(code(bodyctl::invalid_payload))]
    InvalidPayload { message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(bodyctl::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(bodyctl::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: bodyctl config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error(transparent)]
    #[diagnostic(code(bodyctl::config))]
    Config(ConfigError),

    // ── Interactive ──────────────────────────────────────────────────
    #[error("Operation '{action}' requires confirmation")]
    #[diagnostic(
        code(bodyctl::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    #[error("Aborted")]
    #[diagnostic(code(bodyctl::aborted))]
    Aborted,

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render output: {0}")]
    #[diagnostic(code(bodyctl::render))]
    Render(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Rejected { .. } => exit_code::REJECTED,
            Self::PartialFailure { .. } => exit_code::PARTIAL,
            Self::Api {
                status: Some(404), ..
            }
            | Self::ProfileNotFound { .. } => exit_code::NOT_FOUND,
            Self::Validation { .. } | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            Self::Api { .. }
            | Self::InvalidPayload { .. }
            | Self::Unhealthy { .. }
            | Self::Config(_)
            | Self::Aborted
            | Self::Io(_)
            | Self::Render(_) => exit_code::GENERAL,
        }
    }
}

// ── Conversions ──────────────────────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => Self::ConnectionFailed { url, reason },
            CoreError::Timeout {
                timeout_ms,
                attempts,
            } => Self::Timeout {
                timeout_ms,
                attempts,
            },
            CoreError::Rejected { message } => Self::Rejected { message },
            CoreError::Validation { message } => Self::Validation {
                field: "command".into(),
                reason: message,
            },
            CoreError::InvalidPayload { kind, message } => Self::InvalidPayload {
                message: format!("{kind}: {message}"),
            },
            CoreError::Api {
                message, status, ..
            } => Self::Api { message, status },
            CoreError::Config { message } => Self::Validation {
                field: "config".into(),
                reason: message,
            },
            CoreError::NotInitialized => Self::Api {
                message: "controller not initialized".into(),
                status: None,
            },
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        Self::Render(err.to_string())
    }
}

impl From<serde_yaml::Error> for CliError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Render(err.to_string())
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            other => Self::Config(other),
        }
    }
}
