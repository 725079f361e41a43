//! Driving port for team read operations.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{Error, Invite, Team, TeamHash, User};

/// A team together with its current members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TeamRoster {
    /// The team record.
    pub team: Team,
    /// Members currently linked to the team; always one or two.
    pub members: Vec<User>,
}

/// Domain use-case port for team queries.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TeamsQuery: Send + Sync {
    /// Teams with their members, paginated by offset.
    async fn list_teams(&self, skip: usize, limit: usize) -> Result<Vec<TeamRoster>, Error>;

    /// Pending invites issued by a team.
    async fn team_invites(&self, team: &TeamHash) -> Result<Vec<Invite>, Error>;
}
