// Door endpoints
//
// Lock/unlock commands and lock/open status reads. The batch helpers mirror
// how an operator console fans out over all four doors: every door is
// attempted and reported on its own.

use serde_json::json;
use strum::IntoEnumIterator;
use tracing::debug;

use crate::error::RequestError;
use crate::models::{DoorStatus, LockCommand, Position};
use crate::request::client::{RequestClient, Response, decode};
use crate::request::endpoint::Endpoint;

impl Endpoint {
    /// `POST /door/lock` with `{"doorID": 0-3, "command": 0|1}`
    pub fn lock_door(door: Position, command: LockCommand) -> Self {
        Self::post(
            "door/lock",
            &json!({
                "doorID": door.code(),
                "command": command.code(),
            }),
        )
    }

    /// `GET /door/{id}/status`
    pub fn door_status(door: Position) -> Self {
        Self::get(format!("door/{}/status", door.code()))
    }
}

impl RequestClient {
    /// Lock or unlock one door.
    pub async fn lock_door(
        &self,
        door: Position,
        command: LockCommand,
    ) -> Result<Response, RequestError> {
        debug!(%door, %command, "door lock command");
        self.execute(&Endpoint::lock_door(door, command)).await
    }

    /// Read one door's lock (and, when reported, open) state.
    pub async fn door_status(&self, door: Position) -> Result<DoorStatus, RequestError> {
        self.fetch(&Endpoint::door_status(door)).await
    }

    /// Read every door concurrently. One failing door does not hide the rest.
    pub async fn door_statuses(&self) -> Vec<(Position, Result<DoorStatus, RequestError>)> {
        let doors: Vec<Position> = Position::iter().collect();
        let endpoints: Vec<Endpoint> = doors.iter().map(|d| Endpoint::door_status(*d)).collect();
        let results = self.execute_all(&endpoints).await;

        doors
            .into_iter()
            .zip(endpoints.iter().zip(results))
            .map(|(door, (ep, result))| (door, decode(ep, result)))
            .collect()
    }

    /// Send the same lock command to every door concurrently.
    pub async fn set_all_locks(
        &self,
        command: LockCommand,
    ) -> Vec<(Position, Result<Response, RequestError>)> {
        debug!(%command, "door lock command (all doors)");
        let doors: Vec<Position> = Position::iter().collect();
        let endpoints: Vec<Endpoint> = doors
            .iter()
            .map(|d| Endpoint::lock_door(*d, command))
            .collect();
        let results = self.execute_all(&endpoints).await;
        doors.into_iter().zip(results).collect()
    }

    /// Lock all four doors.
    pub async fn lock_all_doors(&self) -> Vec<(Position, Result<Response, RequestError>)> {
        self.set_all_locks(LockCommand::Lock).await
    }

    /// Unlock all four doors.
    pub async fn unlock_all_doors(&self) -> Vec<(Position, Result<Response, RequestError>)> {
        self.set_all_locks(LockCommand::Unlock).await
    }
}
