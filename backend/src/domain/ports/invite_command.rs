//! Driving port for invite lifecycle mutations.

use async_trait::async_trait;

use crate::domain::{Error, Invite, TeamHash, User, UserHash};

/// Domain use-case port for the invite state machine.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InviteCommand: Send + Sync {
    /// Offer the free slot on the caller's team to another user.
    async fn create_invite(
        &self,
        owner: &UserHash,
        invited_osu_id: i64,
    ) -> Result<Invite, Error>;

    /// Consume a pending invite and join the offering team.
    async fn accept_invite(&self, user: &UserHash, team: &TeamHash) -> Result<User, Error>;

    /// Discard an invite addressed to the caller; returns the caller.
    async fn decline_invite(&self, user: &UserHash, team: &TeamHash) -> Result<User, Error>;

    /// Withdraw an invite the caller's team issued; returns the team's
    /// remaining invites.
    async fn cancel_invite(
        &self,
        owner: &UserHash,
        invited_osu_id: i64,
    ) -> Result<Vec<Invite>, Error>;
}
