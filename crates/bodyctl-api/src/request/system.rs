// Service-level endpoints: identity and health.

use crate::error::RequestError;
use crate::models::{HealthStatus, SystemInfo};
use crate::request::client::RequestClient;
use crate::request::endpoint::Endpoint;

impl Endpoint {
    /// `GET /info`
    pub fn system_info() -> Self {
        Self::get("info")
    }

    /// `GET /health`
    pub fn health() -> Self {
        Self::get("health")
    }
}

impl RequestClient {
    pub async fn system_info(&self) -> Result<SystemInfo, RequestError> {
        self.fetch(&Endpoint::system_info()).await
    }

    pub async fn health(&self) -> Result<HealthStatus, RequestError> {
        self.fetch(&Endpoint::health()).await
    }
}
