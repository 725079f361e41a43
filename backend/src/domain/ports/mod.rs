//! Domain ports and supporting types for the hexagonal boundary.

mod identity_gateway;
mod image_host;
mod invite_command;
mod lobbies_query;
mod lobby_admin_command;
mod lobby_command;
mod membership_store;
mod moderation_command;
mod registration_command;
mod team_command;
mod teams_query;
mod users_query;

#[cfg(test)]
pub use identity_gateway::{MockDiscordGateway, MockOsuGateway};
pub use identity_gateway::{
    DiscordGateway, DiscordProfile, FixtureDiscordGateway, FixtureOsuGateway, GatewayError,
    OsuGateway, OsuProfile,
};
#[cfg(test)]
pub use image_host::MockImageHost;
pub use image_host::{FixtureImageHost, ImageHost, ImageHostError};
pub use invite_command::InviteCommand;
#[cfg(test)]
pub use invite_command::MockInviteCommand;
pub use lobbies_query::{LobbiesQuery, LobbyRoster};
#[cfg(test)]
pub use lobbies_query::MockLobbiesQuery;
pub use lobby_admin_command::LobbyAdminCommand;
#[cfg(test)]
pub use lobby_admin_command::MockLobbyAdminCommand;
pub use lobby_command::LobbyCommand;
#[cfg(test)]
pub use lobby_command::MockLobbyCommand;
#[cfg(test)]
pub use membership_store::MockMembershipStore;
pub use membership_store::{
    InMemoryMembershipStore, MembershipChange, MembershipStore, MembershipStoreError,
};
#[cfg(test)]
pub use moderation_command::MockModerationCommand;
pub use moderation_command::ModerationCommand;
#[cfg(test)]
pub use registration_command::MockRegistrationCommand;
pub use registration_command::RegistrationCommand;
#[cfg(test)]
pub use team_command::MockTeamCommand;
pub use team_command::TeamCommand;
#[cfg(test)]
pub use teams_query::MockTeamsQuery;
pub use teams_query::{TeamRoster, TeamsQuery};
#[cfg(test)]
pub use users_query::MockUsersQuery;
pub use users_query::UsersQuery;
