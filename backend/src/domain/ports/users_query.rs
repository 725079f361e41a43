//! Driving port for user-centric read operations.

use async_trait::async_trait;

use crate::domain::{Error, Invite, User, UserHash};

/// Domain use-case port for user queries.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UsersQuery: Send + Sync {
    /// The user behind a session cookie.
    async fn current_user(&self, user: &UserHash) -> Result<User, Error>;

    /// Every registered user.
    async fn list_users(&self) -> Result<Vec<User>, Error>;

    /// Pending invites addressed to a user.
    async fn user_invites(&self, user: &UserHash) -> Result<Vec<Invite>, Error>;
}
