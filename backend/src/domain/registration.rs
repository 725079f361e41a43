//! Registration and identity-linking service.
//!
//! Implements [`RegistrationCommand`] and [`UsersQuery`]. Registration is
//! idempotent per provider identity: the first successful osu! exchange
//! creates the user with a derived hash, every later one looks the user up by
//! provider id, so the stored hash wins even across secret rotation.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;

use crate::domain::ports::{
    DiscordGateway, GatewayError, MembershipStore, MembershipStoreError, OsuGateway,
    RegistrationCommand, UsersQuery,
};
use crate::domain::service_support::{
    ensure_signups_open, map_store_error, require_active, require_user,
};
use crate::domain::user::{bws_rank, qualifying_badges};
use crate::domain::{
    DiscordIdentity, Error, HashSecret, Invite, OsuIdentity, SignupWindow, User, UserHash,
};

/// Registration service backed by the membership store and both gateways.
#[derive(Clone)]
pub struct RegistrationService<S, O, D> {
    store: Arc<S>,
    osu: Arc<O>,
    discord: Arc<D>,
    secret: HashSecret,
    window: SignupWindow,
    clock: Arc<dyn Clock>,
}

impl<S, O, D> RegistrationService<S, O, D> {
    /// Create a new service over the given adapters.
    pub fn new(
        store: Arc<S>,
        osu: Arc<O>,
        discord: Arc<D>,
        secret: HashSecret,
        window: SignupWindow,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            osu,
            discord,
            secret,
            window,
            clock,
        }
    }
}

fn map_gateway_error(error: GatewayError) -> Error {
    match error {
        GatewayError::Unavailable { message } => {
            Error::service_unavailable(format!("identity provider unreachable: {message}"))
        }
        other => Error::auth(other.to_string()),
    }
}

#[async_trait]
impl<S, O, D> RegistrationCommand for RegistrationService<S, O, D>
where
    S: MembershipStore,
    O: OsuGateway,
    D: DiscordGateway,
{
    async fn identify_osu(&self, code: &str) -> Result<User, Error> {
        let profile = self
            .osu
            .exchange_code(code)
            .await
            .map_err(map_gateway_error)?;

        if let Some(existing) = self
            .store
            .find_user_by_osu_id(profile.osu_id)
            .await
            .map_err(map_store_error)?
        {
            return Ok(existing);
        }

        let badges = qualifying_badges(profile.badge_descriptions.iter().map(String::as_str));
        let identity = OsuIdentity {
            osu_id: profile.osu_id,
            osu_username: profile.username,
            osu_avatar_url: profile.avatar_url,
            osu_global_rank: profile.global_rank,
            bws_rank: bws_rank(profile.global_rank, badges),
            badges,
        };
        let user = User::new(UserHash::derive(identity.osu_id, &self.secret), identity);

        match self.store.insert_user(&user).await {
            Ok(()) => Ok(user),
            Err(MembershipStoreError::DuplicateKey { .. }) => {
                // Lost a first-login race; the stored row wins.
                self.store
                    .find_user_by_osu_id(user.osu.osu_id)
                    .await
                    .map_err(map_store_error)?
                    .ok_or_else(|| Error::internal("user vanished after duplicate insert"))
            }
            Err(other) => Err(map_store_error(other)),
        }
    }

    async fn link_discord(&self, user: &UserHash, code: &str) -> Result<User, Error> {
        ensure_signups_open(self.window, self.clock.as_ref())?;
        let caller = require_user(self.store.as_ref(), user).await?;
        require_active(&caller)?;

        let profile = self
            .discord
            .exchange_code(code)
            .await
            .map_err(map_gateway_error)?;
        let identity = DiscordIdentity {
            discord_id: profile.discord_id,
            discord_tag: profile.discord_tag,
            discord_avatar_url: profile.avatar_url,
        };

        self.store
            .set_discord(user, Some(identity))
            .await
            .map_err(|err| match err {
                MembershipStoreError::MissingRow { .. } => {
                    Error::user_not_found("no user matches the session identity")
                }
                other => map_store_error(other),
            })
    }

    async fn unlink_discord(&self, user: &UserHash) -> Result<User, Error> {
        self.store
            .set_discord(user, None)
            .await
            .map_err(|err| match err {
                MembershipStoreError::MissingRow { .. } => {
                    Error::user_not_found("no user matches the session identity")
                }
                other => map_store_error(other),
            })
    }
}

#[async_trait]
impl<S, O, D> UsersQuery for RegistrationService<S, O, D>
where
    S: MembershipStore,
    O: OsuGateway,
    D: DiscordGateway,
{
    async fn current_user(&self, user: &UserHash) -> Result<User, Error> {
        require_user(self.store.as_ref(), user).await
    }

    async fn list_users(&self) -> Result<Vec<User>, Error> {
        self.store.list_users().await.map_err(map_store_error)
    }

    async fn user_invites(&self, user: &UserHash) -> Result<Vec<Invite>, Error> {
        require_user(self.store.as_ref(), user).await?;
        self.store
            .invites_for_user(user)
            .await
            .map_err(map_store_error)
    }
}
