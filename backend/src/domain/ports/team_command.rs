//! Driving port for team lifecycle mutations.

use async_trait::async_trait;

use crate::domain::{Error, Team, TeamTitle, UserHash};

use super::MembershipChange;

/// Domain use-case port for team lifecycle mutations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TeamCommand: Send + Sync {
    /// Found a team with the caller as sole member.
    async fn create_team(&self, owner: &UserHash, title: TeamTitle) -> Result<Team, Error>;

    /// Detach the caller from their team, dissolving it when it would be
    /// left empty.
    async fn leave_team(&self, user: &UserHash) -> Result<MembershipChange, Error>;

    /// Upload an avatar image and record its hosted URL on the caller's team.
    async fn upload_avatar(&self, user: &UserHash, image: Vec<u8>) -> Result<Team, Error>;
}
