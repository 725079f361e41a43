//! Backend entry-point: wires adapters, services, and the HTTP surface.

use std::env;
use std::io;
use std::sync::Arc;

use actix_cors::Cors;
use actix_session::{SessionMiddleware, storage::CookieSessionStore};
use actix_web::cookie::{Key, SameSite};
use actix_web::{App, HttpServer, web};
use mockable::DefaultClock;
use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt};
#[cfg(debug_assertions)]
use utoipa::OpenApi;
#[cfg(debug_assertions)]
use utoipa_swagger_ui::SwaggerUi;

#[cfg(debug_assertions)]
use tourney_backend::doc::ApiDoc;
use tourney_backend::domain::{
    HashSecret, InviteService, LobbyService, RegistrationService, SignupWindow, TeamService,
};
use tourney_backend::inbound::http::state::HttpState;
use tourney_backend::inbound::http::teams::AVATAR_MAX_BYTES;
use tourney_backend::inbound::http::{admin, lobbies, teams, users};
use tourney_backend::outbound::image_host::ImgurImageHost;
use tourney_backend::outbound::oauth::{DiscordHttpGateway, OAuthClientConfig, OsuHttpGateway};
use tourney_backend::outbound::persistence::{DbPool, DieselMembershipStore, PoolConfig};

/// Deadline applied when `SIGNUP_DEADLINE` is not set, written in the
/// reference timezone.
const DEFAULT_SIGNUP_DEADLINE: &str = "2022-11-27T16:00:00";

/// Application bootstrap.
#[actix_web::main]
async fn main() -> io::Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let key = load_session_key()?;
    let cookie_secure = env::var("SESSION_COOKIE_SECURE")
        .map(|v| v != "0")
        .unwrap_or(true);
    let allowed_origins: Vec<String> = env::var("FRONTEND_ORIGINS")
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(str::to_owned)
                .collect()
        })
        .unwrap_or_default();

    let state = build_state().await?;

    HttpServer::new(move || {
        let session = SessionMiddleware::builder(CookieSessionStore::default(), key.clone())
            .cookie_name("session".into())
            .cookie_path("/".into())
            .cookie_secure(cookie_secure)
            .cookie_http_only(true)
            .cookie_same_site(SameSite::Lax)
            .build();

        let app = App::new()
            .app_data(web::Data::new(state.clone()))
            .app_data(web::PayloadConfig::new(AVATAR_MAX_BYTES))
            .wrap(build_cors(&allowed_origins))
            .wrap(session)
            .service(users::osu_identify)
            .service(users::discord_identify)
            .service(users::current_user)
            .service(users::unlink_discord)
            .service(users::my_invites)
            .service(users::list_users)
            .service(users::logout)
            .service(teams::create_team)
            .service(teams::leave_team)
            .service(teams::list_teams)
            .service(teams::team_invites)
            .service(teams::create_invite)
            .service(teams::cancel_invite)
            .service(teams::join_team)
            .service(teams::decline_invite)
            .service(teams::upload_avatar)
            .service(lobbies::join_lobby)
            .service(lobbies::leave_lobby)
            .service(lobbies::get_lobby)
            .service(lobbies::list_lobbies)
            .service(admin::ban_user)
            .service(admin::unban_user)
            .service(admin::create_lobby)
            .service(admin::remove_lobby)
            .service(admin::add_referee);

        #[cfg(debug_assertions)]
        let app = app.service(
            SwaggerUi::new("/docs/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
        );

        app
    })
    .bind(("0.0.0.0", 8080))?
    .run()
    .await
}

fn required_env(name: &str) -> io::Result<String> {
    env::var(name).map_err(|_| io::Error::other(format!("{name} must be set")))
}

fn load_session_key() -> io::Result<Key> {
    let key_path =
        env::var("SESSION_KEY_FILE").unwrap_or_else(|_| "/var/run/secrets/session_key".into());
    match std::fs::read(&key_path) {
        Ok(bytes) => Ok(Key::derive_from(&bytes)),
        Err(e) => {
            let allow_dev = env::var("SESSION_ALLOW_EPHEMERAL").ok().as_deref() == Some("1");
            if cfg!(debug_assertions) || allow_dev {
                warn!(path = %key_path, error = %e, "using temporary session key (dev only)");
                Ok(Key::generate())
            } else {
                Err(io::Error::other(format!(
                    "failed to read session key at {key_path}: {e}"
                )))
            }
        }
    }
}

fn oauth_config(prefix: &str) -> io::Result<OAuthClientConfig> {
    Ok(OAuthClientConfig {
        client_id: required_env(&format!("{prefix}_CLIENT_ID"))?,
        client_secret: required_env(&format!("{prefix}_CLIENT_SECRET"))?,
        redirect_uri: required_env(&format!("{prefix}_REDIRECT_URI"))?,
    })
}

async fn build_state() -> io::Result<HttpState> {
    let secret = HashSecret::new(required_env("SECRET")?);
    let deadline =
        env::var("SIGNUP_DEADLINE").unwrap_or_else(|_| DEFAULT_SIGNUP_DEADLINE.to_owned());
    let window = SignupWindow::parse_local(&deadline)
        .ok_or_else(|| io::Error::other(format!("SIGNUP_DEADLINE is not a valid local datetime: {deadline}")))?;

    let pool = DbPool::new(PoolConfig::new(required_env("DATABASE_URL")?))
        .await
        .map_err(|e| io::Error::other(format!("database pool: {e}")))?;
    let store = Arc::new(DieselMembershipStore::new(pool));

    let osu = Arc::new(
        OsuHttpGateway::new(oauth_config("OSU")?)
            .map_err(|e| io::Error::other(format!("osu! client: {e}")))?,
    );
    let discord = Arc::new(
        DiscordHttpGateway::new(oauth_config("DISCORD")?)
            .map_err(|e| io::Error::other(format!("discord client: {e}")))?,
    );
    let image_host = Arc::new(
        ImgurImageHost::new(required_env("IMGUR_CLIENT_ID")?)
            .map_err(|e| io::Error::other(format!("image host client: {e}")))?,
    );
    let clock = Arc::new(DefaultClock);

    let registration = Arc::new(RegistrationService::new(
        store.clone(),
        osu,
        discord,
        secret,
        window,
        clock.clone(),
    ));
    let team_service = Arc::new(TeamService::new(
        store.clone(),
        image_host,
        window,
        clock.clone(),
    ));
    let invite_service = Arc::new(InviteService::new(store.clone(), window, clock.clone()));
    let lobby_service = Arc::new(LobbyService::new(store, clock));

    Ok(HttpState {
        registration: registration.clone(),
        users: registration,
        teams: team_service.clone(),
        teams_query: team_service.clone(),
        invites: invite_service,
        lobbies: lobby_service.clone(),
        lobbies_query: lobby_service.clone(),
        moderation: team_service,
        lobby_admin: lobby_service,
    })
}

fn build_cors(allowed_origins: &[String]) -> Cors {
    if allowed_origins.is_empty() {
        return Cors::permissive();
    }
    let mut cors = Cors::default()
        .allow_any_method()
        .allow_any_header()
        .supports_credentials();
    for origin in allowed_origins {
        cors = cors.allowed_origin(origin);
    }
    cors
}
