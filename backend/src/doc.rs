//! OpenAPI documentation configuration.
//!
//! Defines the [`ApiDoc`] struct generating the OpenAPI specification for the
//! REST API: every endpoint from the inbound layer, the domain schemas they
//! serialise, and the session cookie security scheme. Swagger UI serves the
//! generated document in debug builds.

use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::domain::ports::{LobbyRoster, MembershipChange, TeamRoster};
use crate::domain::{DiscordIdentity, Error, ErrorCode, Invite, Lobby, OsuIdentity, Team, User};
use crate::inbound::http::admin::CreateLobbyRequest;
use crate::inbound::http::teams::CreateTeamRequest;

/// Enrich the generated document with the session cookie security scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            "SessionCookie",
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                "session",
                "Session cookie issued by GET /osu-identify.",
            ))),
        );
    }
}

/// OpenAPI document for the REST API.
/// Swagger UI is enabled in debug builds only and used by tooling.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Tournament sign-up backend API",
        description = "HTTP interface for registration, team formation, and qualifier lobby scheduling."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    security(("SessionCookie" = [])),
    paths(
        crate::inbound::http::users::osu_identify,
        crate::inbound::http::users::discord_identify,
        crate::inbound::http::users::current_user,
        crate::inbound::http::users::unlink_discord,
        crate::inbound::http::users::my_invites,
        crate::inbound::http::users::list_users,
        crate::inbound::http::users::logout,
        crate::inbound::http::teams::create_team,
        crate::inbound::http::teams::leave_team,
        crate::inbound::http::teams::list_teams,
        crate::inbound::http::teams::team_invites,
        crate::inbound::http::teams::create_invite,
        crate::inbound::http::teams::cancel_invite,
        crate::inbound::http::teams::join_team,
        crate::inbound::http::teams::decline_invite,
        crate::inbound::http::teams::upload_avatar,
        crate::inbound::http::lobbies::join_lobby,
        crate::inbound::http::lobbies::leave_lobby,
        crate::inbound::http::lobbies::get_lobby,
        crate::inbound::http::lobbies::list_lobbies,
        crate::inbound::http::admin::ban_user,
        crate::inbound::http::admin::unban_user,
        crate::inbound::http::admin::create_lobby,
        crate::inbound::http::admin::remove_lobby,
        crate::inbound::http::admin::add_referee,
    ),
    components(schemas(
        Error,
        ErrorCode,
        User,
        OsuIdentity,
        DiscordIdentity,
        Team,
        Invite,
        Lobby,
        MembershipChange,
        TeamRoster,
        LobbyRoster,
        CreateTeamRequest,
        CreateLobbyRequest,
    )),
    tags(
        (name = "users", description = "Registration, identity links, and sessions"),
        (name = "teams", description = "Team formation, invites, and avatars"),
        (name = "lobbies", description = "Qualifier lobby slots and rosters"),
        (name = "admin", description = "Moderation and lobby management")
    )
)]
pub struct ApiDoc;
