// ── Core error types ──
//
// User-facing errors from bodyctl-core. Consumers never match on HTTP
// status codes or raw JSON failures; the `From` impls below translate
// transport-layer errors into domain variants.

use thiserror::Error;

use bodyctl_api::{Error as ApiError, RequestError};

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot reach body controller at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Request timed out after {timeout_ms}ms ({attempts} attempt(s))")]
    Timeout { timeout_ms: u64, attempts: u32 },

    #[error("Controller not initialized (call init() first)")]
    NotInitialized,

    // ── Operation errors ─────────────────────────────────────────────
    #[error("Command rejected by body controller: {message}")]
    Rejected { message: String },

    #[error("Validation failed: {message}")]
    Validation { message: String },

    #[error("Malformed {kind} payload: {message}")]
    InvalidPayload { kind: String, message: String },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
        /// Attempts made before giving up (0 when the request never left).
        attempts: u32,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    /// Whether retrying the operation later could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::ConnectionFailed { .. } | Self::Timeout { .. } => true,
            Self::Api { status, .. } => status.is_some_and(|s| s >= 500),
            _ => false,
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<ApiError> for CoreError {
    fn from(err: ApiError) -> Self {
        api_error(err, 1)
    }
}

impl From<RequestError> for CoreError {
    fn from(err: RequestError) -> Self {
        api_error(err.cause, err.attempts)
    }
}

fn api_error(err: ApiError, attempts: u32) -> CoreError {
    match err {
        ApiError::Transport(ref e) if e.is_connect() => CoreError::ConnectionFailed {
            url: e
                .url()
                .map(ToString::to_string)
                .unwrap_or_else(|| "<unknown>".into()),
            reason: e.to_string(),
        },
        ApiError::Timeout { timeout_ms } => CoreError::Timeout {
            timeout_ms,
            attempts,
        },
        ApiError::Business { message } => CoreError::Rejected { message },
        ApiError::InvalidUrl(e) => CoreError::Config {
            message: format!("invalid URL: {e}"),
        },
        ApiError::Tls(message) => CoreError::Config {
            message: format!("TLS: {message}"),
        },
        ApiError::StreamConnect(reason) => CoreError::ConnectionFailed {
            url: "<event stream>".into(),
            reason,
        },
        ApiError::Parse { message, .. } => CoreError::InvalidPayload {
            kind: "push".into(),
            message,
        },
        other => CoreError::Api {
            status: other.status(),
            message: other.to_string(),
            attempts,
        },
    }
}
