//! Admin API handlers for moderation and lobby management.
//!
//! ```text
//! POST   /user/ban?osu_id=    ban a player, dissolving their team
//! DELETE /user/ban?osu_id=    lift a ban
//! POST   /lobby/create        publish a lobby slot
//! DELETE /lobby?lobby_id=     delete a lobby slot
//! POST   /lobby/add_referee   assign a referee
//! ```
//!
//! The admin guard lives in the domain services; these handlers only carry
//! the session identity through.

use actix_web::{HttpResponse, delete, post, web};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::{Error, Lobby, User};
use crate::inbound::http::ApiResult;
use crate::inbound::http::lobbies::LobbyIdQuery;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;

/// Query string naming a player by osu! id.
#[derive(Debug, Deserialize, IntoParams)]
pub struct OsuIdQuery {
    /// osu! id of the target player.
    pub osu_id: i64,
}

/// Lobby creation request body.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateLobbyRequest {
    /// Display name, e.g. `"Qualifier A"`.
    pub lobby_name: String,
    /// Scheduled start time.
    pub lobby_time: DateTime<Utc>,
    /// Optional referee assignment.
    #[serde(default)]
    pub referee: Option<String>,
}

/// Referee assignment query string.
#[derive(Debug, Deserialize, IntoParams)]
pub struct RefereeQuery {
    /// Sequential lobby identifier.
    pub lobby_id: i32,
    /// osu! username of the referee.
    pub referee: String,
}

/// Ban a player.
#[utoipa::path(
    post,
    path = "/user/ban",
    params(OsuIdQuery),
    responses(
        (status = 200, description = "Player banned", body = User),
        (status = 403, description = "Caller is not an admin", body = Error),
        (status = 404, description = "No such player", body = Error)
    ),
    tags = ["admin"],
    operation_id = "banUser"
)]
#[post("/user/ban")]
pub async fn ban_user(
    state: web::Data<HttpState>,
    session: SessionContext,
    query: web::Query<OsuIdQuery>,
) -> ApiResult<web::Json<User>> {
    let actor = session.require_user_hash()?;
    let user = state.moderation.ban_user(&actor, query.osu_id).await?;
    Ok(web::Json(user))
}

/// Lift a player's ban.
#[utoipa::path(
    delete,
    path = "/user/ban",
    params(OsuIdQuery),
    responses(
        (status = 200, description = "Ban lifted", body = User),
        (status = 403, description = "Caller is not an admin", body = Error),
        (status = 404, description = "No such player", body = Error)
    ),
    tags = ["admin"],
    operation_id = "unbanUser"
)]
#[delete("/user/ban")]
pub async fn unban_user(
    state: web::Data<HttpState>,
    session: SessionContext,
    query: web::Query<OsuIdQuery>,
) -> ApiResult<web::Json<User>> {
    let actor = session.require_user_hash()?;
    let user = state.moderation.unban_user(&actor, query.osu_id).await?;
    Ok(web::Json(user))
}

/// Publish a new lobby slot.
#[utoipa::path(
    post,
    path = "/lobby/create",
    request_body = CreateLobbyRequest,
    responses(
        (status = 201, description = "Lobby created", body = Lobby),
        (status = 403, description = "Caller is not an admin", body = Error)
    ),
    tags = ["admin"],
    operation_id = "createLobby"
)]
#[post("/lobby/create")]
pub async fn create_lobby(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<CreateLobbyRequest>,
) -> ApiResult<HttpResponse> {
    let actor = session.require_user_hash()?;
    let request = payload.into_inner();
    let lobby = state
        .lobby_admin
        .create_lobby(&actor, request.lobby_name, request.lobby_time, request.referee)
        .await?;
    Ok(HttpResponse::Created().json(lobby))
}

/// Delete a lobby slot, withdrawing its registered teams.
#[utoipa::path(
    delete,
    path = "/lobby",
    params(LobbyIdQuery),
    responses(
        (status = 200, description = "Lobby deleted", body = Lobby),
        (status = 400, description = "Unknown lobby", body = Error),
        (status = 403, description = "Caller is not an admin", body = Error)
    ),
    tags = ["admin"],
    operation_id = "removeLobby"
)]
#[delete("/lobby")]
pub async fn remove_lobby(
    state: web::Data<HttpState>,
    session: SessionContext,
    query: web::Query<LobbyIdQuery>,
) -> ApiResult<web::Json<Lobby>> {
    let actor = session.require_user_hash()?;
    let lobby = state.lobby_admin.remove_lobby(&actor, query.lobby_id).await?;
    Ok(web::Json(lobby))
}

/// Assign a referee to a lobby slot.
#[utoipa::path(
    post,
    path = "/lobby/add_referee",
    params(RefereeQuery),
    responses(
        (status = 200, description = "Referee assigned", body = Lobby),
        (status = 403, description = "Caller is not an admin", body = Error)
    ),
    tags = ["admin"],
    operation_id = "addReferee"
)]
#[post("/lobby/add_referee")]
pub async fn add_referee(
    state: web::Data<HttpState>,
    session: SessionContext,
    query: web::Query<RefereeQuery>,
) -> ApiResult<web::Json<Lobby>> {
    let actor = session.require_user_hash()?;
    let query = query.into_inner();
    let lobby = state
        .lobby_admin
        .assign_referee(&actor, query.lobby_id, query.referee)
        .await?;
    Ok(web::Json(lobby))
}
