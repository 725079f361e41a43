//! Driven ports for the two OAuth identity providers.
//!
//! The gateways collapse the whole authorisation-code dance (token exchange
//! plus profile fetch) into one call returning a provider profile. Engines
//! never see tokens; adapters hold the client secrets and drop the access
//! token as soon as the profile is fetched.

use async_trait::async_trait;

/// Errors raised by identity gateway adapters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    /// The provider rejected the authorisation code or token.
    #[error("identity provider denied the exchange: {message}")]
    Denied {
        /// Provider-supplied diagnostic.
        message: String,
    },

    /// The provider could not be reached.
    #[error("identity provider unreachable: {message}")]
    Unavailable {
        /// Transport diagnostic.
        message: String,
    },

    /// The provider answered with a payload we could not interpret.
    #[error("identity provider returned an invalid response: {message}")]
    InvalidResponse {
        /// What failed to parse.
        message: String,
    },
}

impl GatewayError {
    /// Create a denied error with the given message.
    pub fn denied(message: impl Into<String>) -> Self {
        Self::Denied {
            message: message.into(),
        }
    }

    /// Create an unavailable error with the given message.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Create an invalid-response error with the given message.
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }
}

/// Profile returned by the primary provider after a successful exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OsuProfile {
    /// Numeric account id.
    pub osu_id: i64,
    /// Current display name.
    pub username: String,
    /// Avatar URL served by the provider.
    pub avatar_url: String,
    /// Global rank, absent for unranked players.
    pub global_rank: Option<i64>,
    /// Raw badge descriptions, unfiltered.
    pub badge_descriptions: Vec<String>,
}

/// Profile returned by the secondary provider after a successful exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscordProfile {
    /// Snowflake id as the API serves it.
    pub discord_id: String,
    /// `name#discriminator` display tag.
    pub discord_tag: String,
    /// CDN avatar URL.
    pub avatar_url: String,
}

/// Port for the primary (osu!) identity provider.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OsuGateway: Send + Sync {
    /// Redeem an authorisation code for the account's profile.
    async fn exchange_code(&self, code: &str) -> Result<OsuProfile, GatewayError>;
}

/// Port for the secondary (Discord) identity provider.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DiscordGateway: Send + Sync {
    /// Redeem an authorisation code for the account's profile.
    async fn exchange_code(&self, code: &str) -> Result<DiscordProfile, GatewayError>;
}

/// In-memory osu! gateway mapping fixed codes to canned profiles.
#[derive(Debug, Default)]
pub struct FixtureOsuGateway {
    profiles: std::collections::HashMap<String, OsuProfile>,
}

impl FixtureOsuGateway {
    /// Register a canned profile for an authorisation code.
    #[must_use]
    pub fn with_profile(mut self, code: impl Into<String>, profile: OsuProfile) -> Self {
        self.profiles.insert(code.into(), profile);
        self
    }
}

#[async_trait]
impl OsuGateway for FixtureOsuGateway {
    async fn exchange_code(&self, code: &str) -> Result<OsuProfile, GatewayError> {
        self.profiles
            .get(code)
            .cloned()
            .ok_or_else(|| GatewayError::denied("unknown authorisation code"))
    }
}

/// In-memory Discord gateway mapping fixed codes to canned profiles.
#[derive(Debug, Default)]
pub struct FixtureDiscordGateway {
    profiles: std::collections::HashMap<String, DiscordProfile>,
}

impl FixtureDiscordGateway {
    /// Register a canned profile for an authorisation code.
    #[must_use]
    pub fn with_profile(mut self, code: impl Into<String>, profile: DiscordProfile) -> Self {
        self.profiles.insert(code.into(), profile);
        self
    }
}

#[async_trait]
impl DiscordGateway for FixtureDiscordGateway {
    async fn exchange_code(&self, code: &str) -> Result<DiscordProfile, GatewayError> {
        self.profiles
            .get(code)
            .cloned()
            .ok_or_else(|| GatewayError::denied("unknown authorisation code"))
    }
}
