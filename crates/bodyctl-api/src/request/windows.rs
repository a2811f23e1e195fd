// Window endpoints
//
// Absolute positioning (0-100 %), motion commands and position reads.

use serde_json::json;
use strum::IntoEnumIterator;
use tracing::debug;

use crate::error::RequestError;
use crate::models::{Position, WindowCommand, WindowPosition};
use crate::request::client::{RequestClient, Response, decode};
use crate::request::endpoint::Endpoint;

impl Endpoint {
    /// `POST /window/position` with `{"windowID": 0-3, "position": 0-100}`
    pub fn set_window_position(window: Position, position: u8) -> Self {
        Self::post(
            "window/position",
            &json!({
                "windowID": window.code(),
                "position": position,
            }),
        )
    }

    /// `POST /window/control` with `{"windowID": 0-3, "command": 0|1|2}`
    pub fn control_window(window: Position, command: WindowCommand) -> Self {
        Self::post(
            "window/control",
            &json!({
                "windowID": window.code(),
                "command": command.code(),
            }),
        )
    }

    /// `GET /window/{id}/position`
    pub fn window_position(window: Position) -> Self {
        Self::get(format!("window/{}/position", window.code()))
    }
}

impl RequestClient {
    /// Drive a window to an absolute position (percent open).
    pub async fn set_window_position(
        &self,
        window: Position,
        position: u8,
    ) -> Result<Response, RequestError> {
        debug!(%window, position, "window position command");
        self.execute(&Endpoint::set_window_position(window, position))
            .await
    }

    /// Start or stop window motion.
    pub async fn control_window(
        &self,
        window: Position,
        command: WindowCommand,
    ) -> Result<Response, RequestError> {
        debug!(%window, %command, "window control command");
        self.execute(&Endpoint::control_window(window, command)).await
    }

    pub async fn window_position(&self, window: Position) -> Result<WindowPosition, RequestError> {
        self.fetch(&Endpoint::window_position(window)).await
    }

    /// Read every window concurrently.
    pub async fn window_positions(&self) -> Vec<(Position, Result<WindowPosition, RequestError>)> {
        let windows: Vec<Position> = Position::iter().collect();
        let endpoints: Vec<Endpoint> = windows
            .iter()
            .map(|w| Endpoint::window_position(*w))
            .collect();
        let results = self.execute_all(&endpoints).await;

        windows
            .into_iter()
            .zip(endpoints.iter().zip(results))
            .map(|(window, (ep, result))| (window, decode(ep, result)))
            .collect()
    }
}
