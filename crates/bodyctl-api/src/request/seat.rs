// Seat endpoints
//
// Axis adjustment and memory presets (1-3).

use serde_json::json;
use tracing::debug;

use crate::error::RequestError;
use crate::models::{SeatAxis, SeatDirection};
use crate::request::client::{RequestClient, Response};
use crate::request::endpoint::Endpoint;

impl Endpoint {
    /// `POST /seat/adjust` with `{"axis": 0|1, "direction": 0|1|2}`
    pub fn adjust_seat(axis: SeatAxis, direction: SeatDirection) -> Self {
        Self::post(
            "seat/adjust",
            &json!({
                "axis": axis.code(),
                "direction": direction.code(),
            }),
        )
    }

    /// `POST /seat/memory/recall` with `{"presetID": n}`
    pub fn recall_memory(preset: u8) -> Self {
        Self::post("seat/memory/recall", &json!({ "presetID": preset }))
    }

    /// `POST /seat/memory/save` with `{"presetID": n}`
    pub fn save_memory(preset: u8) -> Self {
        Self::post("seat/memory/save", &json!({ "presetID": preset }))
    }
}

impl RequestClient {
    pub async fn adjust_seat(
        &self,
        axis: SeatAxis,
        direction: SeatDirection,
    ) -> Result<Response, RequestError> {
        debug!(%axis, %direction, "seat adjust command");
        self.execute(&Endpoint::adjust_seat(axis, direction)).await
    }

    pub async fn recall_memory(&self, preset: u8) -> Result<Response, RequestError> {
        debug!(preset, "seat memory recall");
        self.execute(&Endpoint::recall_memory(preset)).await
    }

    /// Save the current seat position to a preset. The service confirms
    /// asynchronously with a `seat_memory_save_confirm` push.
    pub async fn save_memory(&self, preset: u8) -> Result<Response, RequestError> {
        debug!(preset, "seat memory save");
        self.execute(&Endpoint::save_memory(preset)).await
    }
}
