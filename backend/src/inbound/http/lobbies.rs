//! Lobby API handlers.
//!
//! ```text
//! POST /user/lobby/join?lobby_id=   register the caller's team
//! POST /user/lobby/leave            withdraw the caller's team
//! GET  /lobby?lobby_id=             one lobby with its roster
//! GET  /lobbies                     every lobby with its roster
//! ```

use actix_web::{get, post, web};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::domain::ports::LobbyRoster;
use crate::domain::{Error, Team};
use crate::inbound::http::ApiResult;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;

/// Query string naming a lobby.
#[derive(Debug, Deserialize, IntoParams)]
pub struct LobbyIdQuery {
    /// Sequential lobby identifier.
    pub lobby_id: i32,
}

/// Register the caller's team for a lobby slot.
#[utoipa::path(
    post,
    path = "/user/lobby/join",
    params(LobbyIdQuery),
    responses(
        (status = 200, description = "Team registered", body = Team),
        (status = 400, description = "Unknown lobby", body = Error),
        (status = 409, description = "Full, closed, or team not ready", body = Error)
    ),
    tags = ["lobbies"],
    operation_id = "joinLobby"
)]
#[post("/user/lobby/join")]
pub async fn join_lobby(
    state: web::Data<HttpState>,
    session: SessionContext,
    query: web::Query<LobbyIdQuery>,
) -> ApiResult<web::Json<Team>> {
    let hash = session.require_user_hash()?;
    let team = state.lobbies.join_lobby(&hash, query.lobby_id).await?;
    Ok(web::Json(team))
}

/// Withdraw the caller's team from its lobby slot.
#[utoipa::path(
    post,
    path = "/user/lobby/leave",
    responses(
        (status = 200, description = "Team withdrawn", body = Team),
        (status = 409, description = "Caller has no team", body = Error)
    ),
    tags = ["lobbies"],
    operation_id = "leaveLobby"
)]
#[post("/user/lobby/leave")]
pub async fn leave_lobby(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<Team>> {
    let hash = session.require_user_hash()?;
    let team = state.lobbies.leave_lobby(&hash).await?;
    Ok(web::Json(team))
}

/// A single lobby with its registered teams.
#[utoipa::path(
    get,
    path = "/lobby",
    params(LobbyIdQuery),
    responses(
        (status = 200, description = "Lobby", body = LobbyRoster),
        (status = 400, description = "Unknown lobby", body = Error)
    ),
    tags = ["lobbies"],
    operation_id = "getLobby",
    security([])
)]
#[get("/lobby")]
pub async fn get_lobby(
    state: web::Data<HttpState>,
    query: web::Query<LobbyIdQuery>,
) -> ApiResult<web::Json<LobbyRoster>> {
    let roster = state.lobbies_query.lobby(query.lobby_id).await?;
    Ok(web::Json(roster))
}

/// Every lobby slot with its registered teams.
#[utoipa::path(
    get,
    path = "/lobbies",
    responses((status = 200, description = "Lobbies", body = [LobbyRoster])),
    tags = ["lobbies"],
    operation_id = "listLobbies",
    security([])
)]
#[get("/lobbies")]
pub async fn list_lobbies(
    state: web::Data<HttpState>,
) -> ApiResult<web::Json<Vec<LobbyRoster>>> {
    let rosters = state.lobbies_query.list_lobbies().await?;
    Ok(web::Json(rosters))
}
