use thiserror::Error;

/// Top-level error type for the `bodyctl-api` crate.
///
/// Covers every failure mode across both channels: the request/response
/// command API and the push event stream. `bodyctl-core` maps these into
/// domain-level errors.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, reset, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// A single attempt exceeded its per-attempt deadline.
    #[error("Request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// TLS handshake or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Command API ─────────────────────────────────────────────────
    /// Non-2xx HTTP status.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The service answered `success: false`.
    #[error("Rejected by service: {message}")]
    Business { message: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    // ── Push stream ─────────────────────────────────────────────────
    /// Could not open (or lost) the push subscription.
    #[error("Event stream connection failed: {0}")]
    StreamConnect(String),

    /// A push message that is not a valid envelope.
    #[error("Malformed push payload: {message}")]
    Parse { message: String, payload: String },

    /// A registered callback returned an error or panicked.
    #[error("Handler for '{event_type}' failed: {message}")]
    Handler { event_type: String, message: String },
}

impl Error {
    /// Returns `true` if this is a transient error worth retrying.
    ///
    /// Network failures, attempt timeouts and 5xx responses are transient.
    /// 4xx responses, business rejections and malformed bodies are not.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => !(e.is_builder() || e.is_decode() || e.is_redirect()),
            Self::Timeout { .. } | Self::StreamConnect(_) => true,
            Self::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

// ── Structured request failure ──────────────────────────────────────

/// Last raw HTTP response observed before a request gave up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

/// Failure surfaced by [`RequestClient`](crate::RequestClient) once retries
/// are exhausted or a non-transient error is hit.
#[derive(Debug, Error)]
#[error("{method} {path} failed after {attempts} attempt(s): {cause}")]
pub struct RequestError {
    pub method: reqwest::Method,
    pub path: String,
    #[source]
    pub cause: Error,
    pub attempts: u32,
    pub last_response: Option<RawResponse>,
}

impl RequestError {
    /// Whether the final cause was a transient failure (retries exhausted)
    /// rather than an immediate rejection.
    pub fn is_transient(&self) -> bool {
        self.cause.is_transient()
    }

    /// Business rejection message, if the service answered `success: false`.
    pub fn business_message(&self) -> Option<&str> {
        match &self.cause {
            Error::Business { message } => Some(message),
            _ => None,
        }
    }
}
