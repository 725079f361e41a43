//! Driving port for lobby read operations.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{Error, Lobby, Team};

/// A lobby slot together with its registered teams.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LobbyRoster {
    /// The lobby record.
    pub lobby: Lobby,
    /// Teams registered for the slot; at most six.
    pub teams: Vec<Team>,
}

/// Domain use-case port for lobby queries.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LobbiesQuery: Send + Sync {
    /// A single lobby with its roster.
    async fn lobby(&self, lobby_id: i32) -> Result<LobbyRoster, Error>;

    /// Every lobby slot with its roster.
    async fn list_lobbies(&self) -> Result<Vec<LobbyRoster>, Error>;
}
