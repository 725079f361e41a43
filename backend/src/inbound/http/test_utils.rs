//! Test helpers for inbound HTTP components.

use std::sync::Arc;

use actix_session::{SessionMiddleware, storage::CookieSessionStore};
use actix_web::cookie::{Cookie, Key};
use actix_web::{HttpResponse, test, web};

use crate::domain::ports::{
    MockInviteCommand, MockLobbiesQuery, MockLobbyAdminCommand, MockLobbyCommand,
    MockModerationCommand, MockRegistrationCommand, MockTeamCommand, MockTeamsQuery,
    MockUsersQuery,
};
use crate::domain::{Error, HashSecret, UserHash};
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;

/// Build a session middleware configured for tests.
///
/// Generates a fresh signing key per invocation, names the cookie `session`,
/// and disables the `Secure` flag for local HTTP tests.
pub fn test_session_middleware() -> SessionMiddleware<CookieSessionStore> {
    SessionMiddleware::builder(CookieSessionStore::default(), Key::generate())
        .cookie_name("session".to_owned())
        .cookie_secure(false)
        .build()
}

/// A user hash usable across handler tests.
pub fn test_user_hash() -> UserHash {
    UserHash::derive(7, &HashSecret::new("handler-test"))
}

/// Route that logs the test user in, so handler tests can obtain a cookie.
pub fn test_login_route() -> actix_web::Resource {
    web::resource("/test-login").route(web::get().to(|session: SessionContext| async move {
        session.persist_user(&test_user_hash())?;
        Ok::<_, Error>(HttpResponse::Ok())
    }))
}

/// Log in via [`test_login_route`] and return the session cookie.
pub async fn login_cookie<S, B>(app: &S) -> Cookie<'static>
where
    S: actix_web::dev::Service<
            actix_http::Request,
            Response = actix_web::dev::ServiceResponse<B>,
            Error = actix_web::Error,
        >,
    B: actix_web::body::MessageBody,
{
    let res =
        test::call_service(app, test::TestRequest::get().uri("/test-login").to_request()).await;
    res.response()
        .cookies()
        .find(|cookie| cookie.name() == "session")
        .expect("session cookie set")
        .into_owned()
}

/// State bundle whose ports all panic when called.
///
/// Tests replace the ports a handler exercises and leave the rest strict, so
/// an unexpected call fails loudly.
pub fn strict_state() -> HttpState {
    HttpState {
        registration: Arc::new(MockRegistrationCommand::new()),
        users: Arc::new(MockUsersQuery::new()),
        teams: Arc::new(MockTeamCommand::new()),
        teams_query: Arc::new(MockTeamsQuery::new()),
        invites: Arc::new(MockInviteCommand::new()),
        lobbies: Arc::new(MockLobbyCommand::new()),
        lobbies_query: Arc::new(MockLobbiesQuery::new()),
        moderation: Arc::new(MockModerationCommand::new()),
        lobby_admin: Arc::new(MockLobbyAdminCommand::new()),
    }
}
