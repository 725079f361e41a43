//! Team and invite API handlers.
//!
//! ```text
//! POST   /team                            create a team
//! DELETE /team                            leave the caller's team
//! GET    /teams?skip=&limit=              list teams with members
//! GET    /team/invites?team_hash=         invites issued by a team
//! POST   /team/invite?other_user_osu_id=  invite a player
//! DELETE /team/invite?other_user_osu_id=  withdraw an invite
//! POST   /user/team/join?team_hash=       accept an invite
//! DELETE /user/invite?team_hash=          decline an invite
//! POST   /avatar/upload                   upload the team avatar
//! ```

use actix_web::http::StatusCode;
use actix_web::http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use actix_web::{HttpRequest, HttpResponse, delete, get, post, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::{IntoParams, ToSchema};

use crate::domain::ports::{MembershipChange, TeamRoster};
use crate::domain::{Error, Invite, Team, TeamHash, TeamTitle, User};
use crate::inbound::http::ApiResult;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;

/// Largest accepted avatar upload in bytes.
pub const AVATAR_MAX_BYTES: usize = 2 * 1024 * 1024;

/// Image content types the avatar endpoint accepts.
const AVATAR_CONTENT_TYPES: [&str; 3] = ["image/png", "image/jpeg", "image/gif"];

/// Team creation request body.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTeamRequest {
    /// Display title, at most sixteen printable ASCII characters.
    pub title: String,
}

/// Query string carrying a team hash.
#[derive(Debug, Deserialize, IntoParams)]
pub struct TeamHashQuery {
    /// Opaque team identifier.
    pub team_hash: String,
}

/// Query string naming another player by osu! id.
#[derive(Debug, Deserialize, IntoParams)]
pub struct OtherUserQuery {
    /// osu! id of the other player.
    pub other_user_osu_id: i64,
}

/// Offset pagination for team listings.
#[derive(Debug, Deserialize, IntoParams)]
pub struct ListTeamsQuery {
    /// Rows to skip.
    #[serde(default)]
    pub skip: usize,
    /// Maximum rows to return.
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    100
}

fn parse_team_hash(raw: &str) -> Result<TeamHash, Error> {
    TeamHash::parse(raw).map_err(|err| {
        Error::validation(err.to_string()).with_details(json!({ "field": "team_hash" }))
    })
}

/// Create a team with the caller as sole member.
#[utoipa::path(
    post,
    path = "/team",
    request_body = CreateTeamRequest,
    responses(
        (status = 201, description = "Team created", body = Team),
        (status = 400, description = "Invalid title", body = Error),
        (status = 403, description = "Banned, admin, or sign-ups closed", body = Error),
        (status = 409, description = "Caller already has a team", body = Error)
    ),
    tags = ["teams"],
    operation_id = "createTeam"
)]
#[post("/team")]
pub async fn create_team(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<CreateTeamRequest>,
) -> ApiResult<HttpResponse> {
    let hash = session.require_user_hash()?;
    let title = TeamTitle::new(payload.into_inner().title).map_err(|err| {
        Error::validation(err.to_string()).with_details(json!({ "field": "title" }))
    })?;
    let team = state.teams.create_team(&hash, title).await?;
    Ok(HttpResponse::Created().json(team))
}

/// Leave the caller's team.
#[utoipa::path(
    delete,
    path = "/team",
    responses(
        (status = 200, description = "Membership removed", body = MembershipChange),
        (status = 409, description = "Caller has no team", body = Error)
    ),
    tags = ["teams"],
    operation_id = "leaveTeam"
)]
#[delete("/team")]
pub async fn leave_team(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<MembershipChange>> {
    let hash = session.require_user_hash()?;
    let change = state.teams.leave_team(&hash).await?;
    Ok(web::Json(change))
}

/// List teams with their members.
#[utoipa::path(
    get,
    path = "/teams",
    params(ListTeamsQuery),
    responses((status = 200, description = "Teams", body = [TeamRoster])),
    tags = ["teams"],
    operation_id = "listTeams",
    security([])
)]
#[get("/teams")]
pub async fn list_teams(
    state: web::Data<HttpState>,
    query: web::Query<ListTeamsQuery>,
) -> ApiResult<web::Json<Vec<TeamRoster>>> {
    let rosters = state.teams_query.list_teams(query.skip, query.limit).await?;
    Ok(web::Json(rosters))
}

/// Pending invites issued by a team.
#[utoipa::path(
    get,
    path = "/team/invites",
    params(TeamHashQuery),
    responses(
        (status = 200, description = "Pending invites", body = [Invite]),
        (status = 401, description = "Not logged in", body = Error)
    ),
    tags = ["teams"],
    operation_id = "teamInvites"
)]
#[get("/team/invites")]
pub async fn team_invites(
    state: web::Data<HttpState>,
    session: SessionContext,
    query: web::Query<TeamHashQuery>,
) -> ApiResult<web::Json<Vec<Invite>>> {
    session.require_user_hash()?;
    let team = parse_team_hash(&query.team_hash)?;
    let invites = state.teams_query.team_invites(&team).await?;
    Ok(web::Json(invites))
}

/// Offer the free slot on the caller's team to another player.
#[utoipa::path(
    post,
    path = "/team/invite",
    params(OtherUserQuery),
    responses(
        (status = 201, description = "Invite created", body = Invite),
        (status = 404, description = "No such player", body = Error),
        (status = 409, description = "State machine rejection", body = Error)
    ),
    tags = ["teams"],
    operation_id = "createInvite"
)]
#[post("/team/invite")]
pub async fn create_invite(
    state: web::Data<HttpState>,
    session: SessionContext,
    query: web::Query<OtherUserQuery>,
) -> ApiResult<HttpResponse> {
    let hash = session.require_user_hash()?;
    let invite = state
        .invites
        .create_invite(&hash, query.other_user_osu_id)
        .await?;
    Ok(HttpResponse::Created().json(invite))
}

/// Withdraw an invite the caller's team issued.
#[utoipa::path(
    delete,
    path = "/team/invite",
    params(OtherUserQuery),
    responses(
        (status = 200, description = "Remaining invites", body = [Invite]),
        (status = 404, description = "No matching invite", body = Error)
    ),
    tags = ["teams"],
    operation_id = "cancelInvite"
)]
#[delete("/team/invite")]
pub async fn cancel_invite(
    state: web::Data<HttpState>,
    session: SessionContext,
    query: web::Query<OtherUserQuery>,
) -> ApiResult<web::Json<Vec<Invite>>> {
    let hash = session.require_user_hash()?;
    let remaining = state
        .invites
        .cancel_invite(&hash, query.other_user_osu_id)
        .await?;
    Ok(web::Json(remaining))
}

/// Accept an invite and join the offering team.
#[utoipa::path(
    post,
    path = "/user/team/join",
    params(TeamHashQuery),
    responses(
        (status = 200, description = "Joined", body = User),
        (status = 404, description = "No matching invite", body = Error),
        (status = 409, description = "Team filled since the invite", body = Error)
    ),
    tags = ["teams"],
    operation_id = "joinTeam"
)]
#[post("/user/team/join")]
pub async fn join_team(
    state: web::Data<HttpState>,
    session: SessionContext,
    query: web::Query<TeamHashQuery>,
) -> ApiResult<web::Json<User>> {
    let hash = session.require_user_hash()?;
    let team = parse_team_hash(&query.team_hash)?;
    let user = state.invites.accept_invite(&hash, &team).await?;
    Ok(web::Json(user))
}

/// Decline an invite addressed to the caller.
#[utoipa::path(
    delete,
    path = "/user/invite",
    params(TeamHashQuery),
    responses(
        (status = 200, description = "Invite declined", body = User),
        (status = 404, description = "No matching invite", body = Error)
    ),
    tags = ["teams"],
    operation_id = "declineInvite"
)]
#[delete("/user/invite")]
pub async fn decline_invite(
    state: web::Data<HttpState>,
    session: SessionContext,
    query: web::Query<TeamHashQuery>,
) -> ApiResult<web::Json<User>> {
    let hash = session.require_user_hash()?;
    let team = parse_team_hash(&query.team_hash)?;
    let user = state.invites.decline_invite(&hash, &team).await?;
    Ok(web::Json(user))
}

/// Upload the caller's team avatar.
///
/// The declared content length and the content type are validated before any
/// bytes reach the image host.
#[utoipa::path(
    post,
    path = "/avatar/upload",
    request_body(content = Vec<u8>, content_type = "image/png"),
    responses(
        (status = 200, description = "Avatar recorded", body = Team),
        (status = 400, description = "Unsupported image format", body = Error),
        (status = 411, description = "Content length missing", body = Error),
        (status = 413, description = "Image too large", body = Error),
        (status = 502, description = "Image host failure", body = Error)
    ),
    tags = ["teams"],
    operation_id = "uploadAvatar"
)]
#[post("/avatar/upload")]
pub async fn upload_avatar(
    state: web::Data<HttpState>,
    session: SessionContext,
    request: HttpRequest,
    body: web::Bytes,
) -> ApiResult<HttpResponse> {
    let hash = session.require_user_hash()?;

    let declared = request
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<usize>().ok());
    let Some(declared) = declared else {
        return Ok(HttpResponse::build(StatusCode::LENGTH_REQUIRED)
            .json(Error::validation("content length is required")));
    };
    if declared > AVATAR_MAX_BYTES || body.len() > AVATAR_MAX_BYTES {
        return Ok(HttpResponse::build(StatusCode::PAYLOAD_TOO_LARGE).json(Error::validation(
            format!("avatar must be at most {AVATAR_MAX_BYTES} bytes"),
        )));
    }

    let content_type = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    if !AVATAR_CONTENT_TYPES
        .iter()
        .any(|accepted| content_type.starts_with(accepted))
    {
        return Err(Error::validation(
            "unsupported image format; use png, jpg, jpeg, or gif",
        ));
    }

    let team = state.teams.upload_avatar(&hash, body.to_vec()).await?;
    Ok(HttpResponse::Ok().json(team))
}
