//! Driving port for admin lobby management.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{Error, Lobby, UserHash};

/// Domain use-case port for creating and maintaining lobby slots.
///
/// Every method takes the acting admin's hash; callers without the admin
/// flag are rejected with [`crate::domain::ErrorCode::Forbidden`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LobbyAdminCommand: Send + Sync {
    /// Publish a new lobby slot.
    async fn create_lobby(
        &self,
        actor: &UserHash,
        name: String,
        scheduled_at: DateTime<Utc>,
        referee: Option<String>,
    ) -> Result<Lobby, Error>;

    /// Delete a lobby slot, withdrawing every registered team.
    async fn remove_lobby(&self, actor: &UserHash, lobby_id: i32) -> Result<Lobby, Error>;

    /// Assign a referee to a lobby slot.
    async fn assign_referee(
        &self,
        actor: &UserHash,
        lobby_id: i32,
        referee: String,
    ) -> Result<Lobby, Error>;
}
