//! Shared HTTP adapter state.
//!
//! Handlers accept this state via `actix_web::web::Data` so they only depend
//! on domain driving ports and remain testable without I/O.

use std::sync::Arc;

use crate::domain::ports::{
    InviteCommand, LobbiesQuery, LobbyAdminCommand, LobbyCommand, ModerationCommand,
    RegistrationCommand, TeamCommand, TeamsQuery, UsersQuery,
};

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub registration: Arc<dyn RegistrationCommand>,
    pub users: Arc<dyn UsersQuery>,
    pub teams: Arc<dyn TeamCommand>,
    pub teams_query: Arc<dyn TeamsQuery>,
    pub invites: Arc<dyn InviteCommand>,
    pub lobbies: Arc<dyn LobbyCommand>,
    pub lobbies_query: Arc<dyn LobbiesQuery>,
    pub moderation: Arc<dyn ModerationCommand>,
    pub lobby_admin: Arc<dyn LobbyAdminCommand>,
}
