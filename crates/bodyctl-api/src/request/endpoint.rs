use std::time::Duration;

use reqwest::Method;
use serde::Serialize;

/// Immutable description of one command API call.
///
/// `path` is relative to the client's base URL (e.g. `door/lock`,
/// `window/2/position`). Built per call and discarded afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Endpoint {
    pub method: Method,
    pub path: String,
    pub body: Option<serde_json::Value>,
    /// Per-call override of the policy's attempt timeout.
    pub timeout: Option<Duration>,
}

impl Endpoint {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            body: None,
            timeout: None,
        }
    }

    /// POST with a JSON body.
    ///
    /// Bodies that fail to serialize are sent as `null`; every request type
    /// in this crate is a plain struct or `json!` literal.
    pub fn post(path: impl Into<String>, body: &impl Serialize) -> Self {
        Self {
            method: Method::POST,
            path: path.into(),
            body: Some(serde_json::to_value(body).unwrap_or(serde_json::Value::Null)),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn post_carries_body() {
        let ep = Endpoint::post("door/lock", &json!({ "doorID": 0, "command": 1 }));
        assert_eq!(ep.method, Method::POST);
        assert_eq!(ep.body, Some(json!({ "doorID": 0, "command": 1 })));
        assert!(ep.timeout.is_none());
    }

    #[test]
    fn timeout_override() {
        let ep = Endpoint::get("health").with_timeout(Duration::from_millis(250));
        assert_eq!(ep.timeout, Some(Duration::from_millis(250)));
    }
}
