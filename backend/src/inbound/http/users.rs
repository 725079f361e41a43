//! User and identity API handlers.
//!
//! ```text
//! GET /osu-identify?code=       osu! OAuth callback, sets the session cookie
//! GET /discord-identify?code=   Discord OAuth callback, links the identity
//! GET /users/me                 current user
//! PUT /users/me                 unlink the Discord identity
//! GET /users/me/invites         pending invites for the caller
//! GET /users                    all registered users
//! ```

use actix_web::{HttpResponse, get, post, put, web};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::domain::{Error, Invite, User};
use crate::inbound::http::ApiResult;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;

/// OAuth callback query string.
#[derive(Debug, Deserialize, IntoParams)]
pub struct OAuthCallbackQuery {
    /// Authorisation code issued by the provider.
    pub code: String,
}

/// osu! OAuth callback: authenticate and establish a session.
#[utoipa::path(
    get,
    path = "/osu-identify",
    params(OAuthCallbackQuery),
    responses(
        (status = 200, description = "Authenticated", body = User,
            headers(("Set-Cookie" = String, description = "Session cookie"))),
        (status = 401, description = "Provider denied the exchange", body = Error),
        (status = 503, description = "Provider unreachable", body = Error)
    ),
    tags = ["users"],
    operation_id = "osuIdentify",
    security([])
)]
#[get("/osu-identify")]
pub async fn osu_identify(
    state: web::Data<HttpState>,
    session: SessionContext,
    query: web::Query<OAuthCallbackQuery>,
) -> ApiResult<web::Json<User>> {
    let user = state.registration.identify_osu(&query.code).await?;
    session.persist_user(&user.user_hash)?;
    Ok(web::Json(user))
}

/// Discord OAuth callback: link the secondary identity to the caller.
#[utoipa::path(
    get,
    path = "/discord-identify",
    params(OAuthCallbackQuery),
    responses(
        (status = 200, description = "Identity linked", body = User),
        (status = 401, description = "Not logged in or exchange denied", body = Error),
        (status = 403, description = "Sign-ups closed or account banned", body = Error)
    ),
    tags = ["users"],
    operation_id = "discordIdentify"
)]
#[get("/discord-identify")]
pub async fn discord_identify(
    state: web::Data<HttpState>,
    session: SessionContext,
    query: web::Query<OAuthCallbackQuery>,
) -> ApiResult<web::Json<User>> {
    let hash = session.require_user_hash()?;
    let user = state.registration.link_discord(&hash, &query.code).await?;
    Ok(web::Json(user))
}

/// The user behind the session cookie.
#[utoipa::path(
    get,
    path = "/users/me",
    responses(
        (status = 200, description = "Current user", body = User),
        (status = 401, description = "Not logged in", body = Error),
        (status = 404, description = "Session user no longer exists", body = Error)
    ),
    tags = ["users"],
    operation_id = "currentUser"
)]
#[get("/users/me")]
pub async fn current_user(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<User>> {
    let hash = session.require_user_hash()?;
    let user = state.users.current_user(&hash).await?;
    Ok(web::Json(user))
}

/// Unlink the caller's Discord identity.
#[utoipa::path(
    put,
    path = "/users/me",
    responses(
        (status = 200, description = "Identity unlinked", body = User),
        (status = 401, description = "Not logged in", body = Error)
    ),
    tags = ["users"],
    operation_id = "unlinkDiscord"
)]
#[put("/users/me")]
pub async fn unlink_discord(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<User>> {
    let hash = session.require_user_hash()?;
    let user = state.registration.unlink_discord(&hash).await?;
    Ok(web::Json(user))
}

/// Pending invites addressed to the caller.
#[utoipa::path(
    get,
    path = "/users/me/invites",
    responses(
        (status = 200, description = "Pending invites", body = [Invite]),
        (status = 401, description = "Not logged in", body = Error)
    ),
    tags = ["users"],
    operation_id = "myInvites"
)]
#[get("/users/me/invites")]
pub async fn my_invites(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<Vec<Invite>>> {
    let hash = session.require_user_hash()?;
    let invites = state.users.user_invites(&hash).await?;
    Ok(web::Json(invites))
}

/// All registered users.
#[utoipa::path(
    get,
    path = "/users",
    responses(
        (status = 200, description = "Users", body = [User]),
        (status = 401, description = "Not logged in", body = Error)
    ),
    tags = ["users"],
    operation_id = "listUsers"
)]
#[get("/users")]
pub async fn list_users(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<Vec<User>>> {
    session.require_user_hash()?;
    let users = state.users.list_users().await?;
    Ok(web::Json(users))
}

/// Log the caller out by purging the session.
#[utoipa::path(
    post,
    path = "/logout",
    responses((status = 200, description = "Session cleared")),
    tags = ["users"],
    operation_id = "logout",
    security([])
)]
#[post("/logout")]
pub async fn logout(session: SessionContext) -> HttpResponse {
    session.clear();
    HttpResponse::Ok().finish()
}
