//! Driving port for qualifier lobby membership.

use async_trait::async_trait;

use crate::domain::{Error, Team, UserHash};

/// Domain use-case port for joining and leaving lobby slots.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LobbyCommand: Send + Sync {
    /// Register the caller's team for a lobby slot, replacing any prior
    /// assignment.
    async fn join_lobby(&self, user: &UserHash, lobby_id: i32) -> Result<Team, Error>;

    /// Withdraw the caller's team from its lobby slot. Idempotent.
    async fn leave_lobby(&self, user: &UserHash) -> Result<Team, Error>;
}
