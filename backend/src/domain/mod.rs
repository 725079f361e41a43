//! Domain model for the tournament sign-up backend.
//!
//! Entities, validation, the membership state machine, and the ports that
//! bound it. Nothing in this tree touches a framework or performs I/O; the
//! engines speak to the outside world exclusively through the traits in
//! [`ports`].

pub mod error;
pub mod identity;
pub mod invite;
pub mod invite_service;
pub mod lobby;
pub mod lobby_service;
pub mod ports;
pub mod registration;
mod service_support;
pub mod signup_window;
pub mod team;
pub mod team_service;
#[cfg(test)]
pub mod test_support;
pub mod user;

pub use self::error::{Error, ErrorCode, ErrorValidationError};
pub use self::identity::{HashSecret, IdentifierValidationError, TeamHash, UserHash};
pub use self::invite::Invite;
pub use self::invite_service::InviteService;
pub use self::lobby::{LOBBY_CAPACITY, LOBBY_CUTOFF_MINUTES, Lobby, LobbySchedule};
pub use self::lobby_service::LobbyService;
pub use self::registration::RegistrationService;
pub use self::signup_window::SignupWindow;
pub use self::team::{
    TEAM_CAPACITY, TEAM_TITLE_MAX, Team, TeamTitle, TeamTitleValidationError,
};
pub use self::team_service::TeamService;
pub use self::user::{DiscordIdentity, OsuIdentity, User};

/// Convenient API result alias.
///
/// # Examples
/// ```
/// use actix_web::HttpResponse;
/// use tourney_backend::domain::{ApiResult, Error};
///
/// fn handler() -> ApiResult<HttpResponse> {
///     Err(Error::forbidden("nope"))
/// }
/// ```
pub type ApiResult<T> = Result<T, Error>;
