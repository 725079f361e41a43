//! Driving port for admin moderation actions.

use async_trait::async_trait;

use crate::domain::{Error, User, UserHash};

/// Domain use-case port for banning and unbanning players.
///
/// Every method takes the acting admin's hash; callers without the admin
/// flag are rejected with [`crate::domain::ErrorCode::Forbidden`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ModerationCommand: Send + Sync {
    /// Flag a player as banned, dissolving their team.
    async fn ban_user(&self, actor: &UserHash, osu_id: i64) -> Result<User, Error>;

    /// Clear a player's ban flag. Never restores a dissolved team.
    async fn unban_user(&self, actor: &UserHash, osu_id: i64) -> Result<User, Error>;
}
