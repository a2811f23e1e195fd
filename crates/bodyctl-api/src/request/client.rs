// Command API HTTP client
//
// Wraps `reqwest::Client` with base-URL resolution, `{ success, data }`
// envelope unwrapping, per-attempt deadlines and bounded retry. Typed
// endpoint helpers (doors, windows, lights, seat, system) live in sibling
// modules as inherent methods so this file stays focused on transport
// mechanics.

use std::time::Duration;

use futures_util::future::join_all;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use crate::error::{Error, RawResponse, RequestError};
use crate::models::ApiEnvelope;
use crate::request::endpoint::Endpoint;
use crate::retry::RetryPolicy;
use crate::transport::TransportConfig;

/// Successful command API reply, envelope already unwrapped.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// HTTP status of the successful attempt.
    pub status: u16,
    /// Attempts used, including the successful one.
    pub attempts: u32,
    pub message: Option<String>,
    /// Envelope `data`, or `null` when the service sent none.
    pub data: serde_json::Value,
    /// Server timestamp (seconds), when present.
    pub timestamp: Option<i64>,
}

impl Response {
    /// Deserialize `data` into a typed payload.
    pub fn data_as<T: DeserializeOwned>(&self) -> Result<T, Error> {
        serde_json::from_value(self.data.clone()).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body: self.data.to_string(),
        })
    }
}

/// One failed attempt: the error plus whatever raw reply was seen.
struct AttemptFailure {
    error: Error,
    raw: Option<RawResponse>,
}

impl AttemptFailure {
    fn new(error: Error, raw: Option<RawResponse>) -> Self {
        Self { error, raw }
    }
}

/// Retrying HTTP client for the body-control command API.
///
/// Stateless between calls: it never touches device state, it only moves
/// requests and replies. Cheap to clone (the inner `reqwest::Client` is
/// reference counted).
#[derive(Debug, Clone)]
pub struct RequestClient {
    http: reqwest::Client,
    base_url: Url,
    policy: RetryPolicy,
}

impl RequestClient {
    /// Create a client from a `TransportConfig`.
    ///
    /// `base_url` is the API root, e.g. `http://localhost:8080/api`.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self::with_client(http, base_url))
    }

    /// Create a client around a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self {
            http,
            base_url: normalize_base(base_url),
            policy: RetryPolicy::default(),
        }
    }

    /// Replace the default retry policy.
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The API root all endpoint paths are resolved against.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// The underlying HTTP client (shared with the SSE transport).
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Resolve an endpoint path against the base URL.
    pub fn url_for(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    // ── Execution ────────────────────────────────────────────────────

    /// Execute with the client's default policy.
    pub async fn execute(&self, endpoint: &Endpoint) -> Result<Response, RequestError> {
        self.execute_with_policy(endpoint, &self.policy).await
    }

    /// Execute with an explicit policy.
    ///
    /// Transient failures (network, attempt timeout, 5xx) are retried with
    /// exponential backoff until the policy's attempt budget is spent.
    /// Anything else fails immediately.
    pub async fn execute_with_policy(
        &self,
        endpoint: &Endpoint,
        policy: &RetryPolicy,
    ) -> Result<Response, RequestError> {
        let url = self.url_for(&endpoint.path).map_err(|cause| RequestError {
            method: endpoint.method.clone(),
            path: endpoint.path.clone(),
            cause,
            attempts: 0,
            last_response: None,
        })?;

        let deadline = endpoint.timeout.unwrap_or(policy.attempt_timeout);
        let max_attempts = policy.attempts();
        let mut last_response: Option<RawResponse> = None;
        let mut attempt: u32 = 1;

        loop {
            debug!(method = %endpoint.method, url = %url, attempt, "sending request");

            match self.attempt(&url, endpoint, deadline).await {
                Ok((status, envelope)) => {
                    return Ok(Response {
                        status,
                        attempts: attempt,
                        message: envelope.message,
                        data: envelope.data.unwrap_or(serde_json::Value::Null),
                        timestamp: envelope.timestamp,
                    });
                }
                Err(failure) => {
                    if failure.raw.is_some() {
                        last_response = failure.raw;
                    }

                    let transient = failure.error.is_transient();
                    if !transient || attempt >= max_attempts {
                        if transient {
                            warn!(
                                method = %endpoint.method,
                                path = %endpoint.path,
                                attempts = attempt,
                                error = %failure.error,
                                "retries exhausted"
                            );
                        }
                        return Err(RequestError {
                            method: endpoint.method.clone(),
                            path: endpoint.path.clone(),
                            cause: failure.error,
                            attempts: attempt,
                            last_response,
                        });
                    }

                    let delay = policy.delay_for(attempt);
                    warn!(
                        path = %endpoint.path,
                        attempt,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %failure.error,
                        "transient failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Execute every endpoint concurrently and wait for all of them.
    ///
    /// Never fails as a whole: the result vector has one entry per input,
    /// in input order.
    pub async fn execute_all(&self, endpoints: &[Endpoint]) -> Vec<Result<Response, RequestError>> {
        join_all(endpoints.iter().map(|ep| self.execute(ep))).await
    }

    /// Execute and deserialize `data` into `T`.
    pub async fn fetch<T: DeserializeOwned>(&self, endpoint: &Endpoint) -> Result<T, RequestError> {
        decode(endpoint, self.execute(endpoint).await)
    }

    // ── Single attempt ───────────────────────────────────────────────

    async fn attempt(
        &self,
        url: &Url,
        endpoint: &Endpoint,
        deadline: Duration,
    ) -> Result<(u16, ApiEnvelope), AttemptFailure> {
        let round_trip = async {
            let mut request = self.http.request(endpoint.method.clone(), url.clone());
            if let Some(ref body) = endpoint.body {
                request = request.json(body);
            }

            let resp = request
                .send()
                .await
                .map_err(|e| AttemptFailure::new(Error::Transport(e), None))?;
            let status = resp.status().as_u16();
            let body = resp
                .text()
                .await
                .map_err(|e| AttemptFailure::new(Error::Transport(e), None))?;

            if !(200..300).contains(&status) {
                return Err(AttemptFailure::new(
                    Error::Http {
                        status,
                        body: body.clone(),
                    },
                    Some(RawResponse { status, body }),
                ));
            }

            let envelope: ApiEnvelope = match serde_json::from_str(&body) {
                Ok(env) => env,
                Err(e) => {
                    return Err(AttemptFailure::new(
                        Error::Deserialization {
                            message: e.to_string(),
                            body: body.clone(),
                        },
                        Some(RawResponse { status, body }),
                    ));
                }
            };

            if !envelope.success {
                let message = envelope
                    .message
                    .clone()
                    .unwrap_or_else(|| "request rejected".into());
                return Err(AttemptFailure::new(
                    Error::Business { message },
                    Some(RawResponse { status, body }),
                ));
            }

            Ok::<_, AttemptFailure>((status, envelope))
        };

        match tokio::time::timeout(deadline, round_trip).await {
            Ok(result) => result,
            Err(_) => Err(AttemptFailure::new(
                Error::Timeout {
                    timeout_ms: u64::try_from(deadline.as_millis()).unwrap_or(u64::MAX),
                },
                None,
            )),
        }
    }
}

/// Deserialize a successful reply's `data`, folding a shape mismatch into
/// a `RequestError` that keeps the attempt count.
pub(crate) fn decode<T: DeserializeOwned>(
    endpoint: &Endpoint,
    result: Result<Response, RequestError>,
) -> Result<T, RequestError> {
    let response = result?;
    response.data_as().map_err(|cause| RequestError {
        method: endpoint.method.clone(),
        path: endpoint.path.clone(),
        cause,
        attempts: response.attempts,
        last_response: Some(RawResponse {
            status: response.status,
            body: response.data.to_string(),
        }),
    })
}

/// Ensure the base path ends with `/` so relative joins append instead of
/// replacing the last segment (`/api` + `door/lock` -> `/api/door/lock`).
fn normalize_base(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}
