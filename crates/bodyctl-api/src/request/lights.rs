// Light endpoints
//
// Headlight, indicator and position light commands. The service exposes no
// light status read; state arrives through `light_state_changed` pushes.

use serde_json::json;
use tracing::debug;

use crate::error::RequestError;
use crate::models::{HeadlightMode, IndicatorMode, PositionLightMode};
use crate::request::client::{RequestClient, Response};
use crate::request::endpoint::Endpoint;

impl Endpoint {
    /// `POST /light/headlight` with `{"command": 0|1|2}`
    pub fn set_headlight(mode: HeadlightMode) -> Self {
        Self::post("light/headlight", &json!({ "command": mode.code() }))
    }

    /// `POST /light/indicator` with `{"command": 0-3}`
    pub fn set_indicator(mode: IndicatorMode) -> Self {
        Self::post("light/indicator", &json!({ "command": mode.code() }))
    }

    /// `POST /light/position` with `{"command": 0|1}`
    pub fn set_position_light(mode: PositionLightMode) -> Self {
        Self::post("light/position", &json!({ "command": mode.code() }))
    }
}

impl RequestClient {
    pub async fn set_headlight(&self, mode: HeadlightMode) -> Result<Response, RequestError> {
        debug!(%mode, "headlight command");
        self.execute(&Endpoint::set_headlight(mode)).await
    }

    pub async fn set_indicator(&self, mode: IndicatorMode) -> Result<Response, RequestError> {
        debug!(%mode, "indicator command");
        self.execute(&Endpoint::set_indicator(mode)).await
    }

    pub async fn set_position_light(
        &self,
        mode: PositionLightMode,
    ) -> Result<Response, RequestError> {
        debug!(%mode, "position light command");
        self.execute(&Endpoint::set_position_light(mode)).await
    }
}
