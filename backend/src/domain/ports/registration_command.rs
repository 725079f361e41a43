//! Driving port for OAuth-backed registration and identity linking.

use async_trait::async_trait;

use crate::domain::{Error, User, UserHash};

/// Domain use-case port for authenticating and linking identities.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RegistrationCommand: Send + Sync {
    /// Redeem a primary-provider OAuth code, registering the user on first
    /// sight, and return the (possibly pre-existing) user.
    async fn identify_osu(&self, code: &str) -> Result<User, Error>;

    /// Redeem a secondary-provider OAuth code and attach the identity.
    async fn link_discord(&self, user: &UserHash, code: &str) -> Result<User, Error>;

    /// Detach the secondary identity.
    async fn unlink_discord(&self, user: &UserHash) -> Result<User, Error>;
}
