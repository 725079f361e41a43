//! Session helpers keeping HTTP handlers free of framework-specific logic.
//!
//! A thin wrapper around Actix sessions so handlers only deal with
//! domain-friendly operations: persisting and retrieving the caller's opaque
//! user hash.

use actix_session::Session;
use actix_web::{FromRequest, HttpRequest, dev::Payload};
use futures_util::future::LocalBoxFuture;

use crate::domain::{Error, UserHash};

pub(crate) const USER_HASH_KEY: &str = "user_hash";

/// Newtype wrapper exposing higher-level session operations.
#[derive(Clone)]
pub struct SessionContext(Session);

impl SessionContext {
    /// Construct a new wrapper from the underlying Actix session.
    pub fn new(session: Session) -> Self {
        Self(session)
    }

    /// Persist the authenticated user's hash in the session cookie.
    pub fn persist_user(&self, user: &UserHash) -> Result<(), Error> {
        self.0
            .insert(USER_HASH_KEY, user.as_ref())
            .map_err(|error| Error::internal(format!("failed to persist session: {error}")))
    }

    /// Fetch the current user hash from the session, if present.
    pub fn user_hash(&self) -> Result<Option<UserHash>, Error> {
        let raw = self
            .0
            .get::<String>(USER_HASH_KEY)
            .map_err(|error| Error::internal(format!("failed to read session: {error}")))?;
        match raw {
            Some(raw) => match UserHash::parse(raw) {
                Ok(hash) => Ok(Some(hash)),
                Err(error) => {
                    tracing::warn!("invalid user hash in session cookie: {error}");
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }

    /// Require an authenticated user hash or return `401`.
    pub fn require_user_hash(&self) -> Result<UserHash, Error> {
        self.user_hash()?
            .ok_or_else(|| Error::auth("login required"))
    }

    /// Drop the session, logging the caller out.
    pub fn clear(&self) {
        self.0.purge();
    }
}

impl FromRequest for SessionContext {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let fut = Session::from_request(req, payload);
        Box::pin(async move { fut.await.map(SessionContext::new) })
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use crate::domain::HashSecret;
    use actix_web::http::StatusCode;
    use actix_web::{App, HttpResponse, test, web};

    fn session_test_app() -> App<
        impl actix_web::dev::ServiceFactory<
            actix_web::dev::ServiceRequest,
            Config = (),
            Response = actix_web::dev::ServiceResponse,
            Error = actix_web::Error,
            InitError = (),
        >,
    > {
        App::new().wrap(crate::inbound::http::test_utils::test_session_middleware())
    }

    fn fixture_hash() -> UserHash {
        UserHash::derive(7, &HashSecret::new("session-test"))
    }

    #[actix_web::test]
    async fn round_trips_the_user_hash() {
        let app = test::init_service(
            session_test_app()
                .route(
                    "/set",
                    web::get().to(|session: SessionContext| async move {
                        session.persist_user(&fixture_hash())?;
                        Ok::<_, Error>(HttpResponse::Ok())
                    }),
                )
                .route(
                    "/get",
                    web::get().to(|session: SessionContext| async move {
                        let hash = session.require_user_hash()?;
                        Ok::<_, Error>(HttpResponse::Ok().body(hash.to_string()))
                    }),
                ),
        )
        .await;

        let set_res =
            test::call_service(&app, test::TestRequest::get().uri("/set").to_request()).await;
        assert_eq!(set_res.status(), StatusCode::OK);
        let cookie = set_res
            .response()
            .cookies()
            .find(|cookie| cookie.name() == "session")
            .expect("session cookie set");

        let get_res = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/get")
                .cookie(cookie)
                .to_request(),
        )
        .await;
        assert_eq!(get_res.status(), StatusCode::OK);
        let body = test::read_body(get_res).await;
        assert_eq!(body, fixture_hash().as_ref().as_bytes());
    }

    #[actix_web::test]
    async fn missing_session_is_unauthorised() {
        let app = test::init_service(session_test_app().route(
            "/require",
            web::get().to(|session: SessionContext| async move {
                let _ = session.require_user_hash()?;
                Ok::<_, Error>(HttpResponse::Ok())
            }),
        ))
        .await;

        let res =
            test::call_service(&app, test::TestRequest::get().uri("/require").to_request()).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }
}
