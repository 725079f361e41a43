//! Qualifier lobby service.
//!
//! Implements [`LobbyCommand`], [`LobbiesQuery`], and [`LobbyAdminCommand`].
//! The per-lobby registration cutoff is evaluated against the injected clock;
//! the roster capacity is re-checked by the store at write time.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockable::Clock;

use crate::domain::lobby::LobbySchedule;
use crate::domain::ports::{
    LobbiesQuery, LobbyAdminCommand, LobbyCommand, LobbyRoster, MembershipStore,
    MembershipStoreError,
};
use crate::domain::service_support::{
    map_store_error, require_active, require_admin, require_user,
};
use crate::domain::team::TEAM_CAPACITY;
use crate::domain::{Error, ErrorCode, Lobby, Team, UserHash};

/// Lobby service backed by the membership store.
#[derive(Clone)]
pub struct LobbyService<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
}

impl<S> LobbyService<S> {
    /// Create a new service over the given store.
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }
}

impl<S> LobbyService<S>
where
    S: MembershipStore,
{
    async fn require_lobby(&self, lobby_id: i32) -> Result<Lobby, Error> {
        self.store
            .find_lobby(lobby_id)
            .await
            .map_err(map_store_error)?
            .ok_or_else(|| Error::validation("unknown lobby id"))
    }
}

#[async_trait]
impl<S> LobbyCommand for LobbyService<S>
where
    S: MembershipStore,
{
    async fn join_lobby(&self, user: &UserHash, lobby_id: i32) -> Result<Team, Error> {
        let caller = require_user(self.store.as_ref(), user).await?;
        require_active(&caller)?;
        let team_hash = caller
            .team_hash
            .ok_or_else(|| Error::new(ErrorCode::NoTeam, "caller has no team"))?;

        let members = self
            .store
            .team_members(&team_hash)
            .await
            .map_err(map_store_error)?;
        if members.len() < TEAM_CAPACITY {
            return Err(Error::new(
                ErrorCode::IncompleteTeam,
                "team needs a second player before joining a lobby",
            ));
        }

        let lobby = self.require_lobby(lobby_id).await?;
        if LobbySchedule::from(&lobby).is_closed_at(self.clock.utc()) {
            return Err(Error::new(
                ErrorCode::LobbyClosed,
                "lobby registration closed thirty minutes before start",
            ));
        }

        self.store
            .assign_team_to_lobby(&team_hash, lobby_id)
            .await
            .map_err(|err| match err {
                MembershipStoreError::CapacityExceeded { .. } => {
                    Error::new(ErrorCode::LobbyFull, "lobby roster is full")
                }
                MembershipStoreError::MissingRow { .. } => Error::validation("unknown lobby id"),
                other => map_store_error(other),
            })
    }

    async fn leave_lobby(&self, user: &UserHash) -> Result<Team, Error> {
        let caller = require_user(self.store.as_ref(), user).await?;
        require_active(&caller)?;
        let team_hash = caller
            .team_hash
            .ok_or_else(|| Error::new(ErrorCode::NoTeam, "caller has no team"))?;

        self.store
            .clear_lobby_assignment(&team_hash)
            .await
            .map_err(|err| match err {
                MembershipStoreError::MissingRow { .. } => {
                    Error::new(ErrorCode::NoTeam, "caller has no team")
                }
                other => map_store_error(other),
            })
    }
}

#[async_trait]
impl<S> LobbiesQuery for LobbyService<S>
where
    S: MembershipStore,
{
    async fn lobby(&self, lobby_id: i32) -> Result<LobbyRoster, Error> {
        let lobby = self.require_lobby(lobby_id).await?;
        let teams = self
            .store
            .lobby_roster(lobby_id)
            .await
            .map_err(map_store_error)?;
        Ok(LobbyRoster { lobby, teams })
    }

    async fn list_lobbies(&self) -> Result<Vec<LobbyRoster>, Error> {
        let lobbies = self
            .store
            .list_lobbies()
            .await
            .map_err(map_store_error)?;
        let mut rosters = Vec::with_capacity(lobbies.len());
        for lobby in lobbies {
            let teams = self
                .store
                .lobby_roster(lobby.lobby_id)
                .await
                .map_err(map_store_error)?;
            rosters.push(LobbyRoster { lobby, teams });
        }
        Ok(rosters)
    }
}

#[async_trait]
impl<S> LobbyAdminCommand for LobbyService<S>
where
    S: MembershipStore,
{
    async fn create_lobby(
        &self,
        actor: &UserHash,
        name: String,
        scheduled_at: DateTime<Utc>,
        referee: Option<String>,
    ) -> Result<Lobby, Error> {
        require_admin(self.store.as_ref(), actor).await?;
        if name.trim().is_empty() {
            return Err(Error::validation("lobby name must not be empty"));
        }
        self.store
            .insert_lobby(name, scheduled_at, referee)
            .await
            .map_err(map_store_error)
    }

    async fn remove_lobby(&self, actor: &UserHash, lobby_id: i32) -> Result<Lobby, Error> {
        require_admin(self.store.as_ref(), actor).await?;
        self.store
            .delete_lobby(lobby_id)
            .await
            .map_err(|err| match err {
                MembershipStoreError::MissingRow { .. } => Error::validation("unknown lobby id"),
                other => map_store_error(other),
            })
    }

    async fn assign_referee(
        &self,
        actor: &UserHash,
        lobby_id: i32,
        referee: String,
    ) -> Result<Lobby, Error> {
        require_admin(self.store.as_ref(), actor).await?;
        if referee.trim().is_empty() {
            return Err(Error::validation("referee name must not be empty"));
        }
        self.store
            .set_referee(lobby_id, referee)
            .await
            .map_err(|err| match err {
                MembershipStoreError::MissingRow { .. } => Error::validation("unknown lobby id"),
                other => map_store_error(other),
            })
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use crate::domain::ports::InMemoryMembershipStore;
    use crate::domain::test_support::{fixture_clock, fixture_user};
    use crate::domain::{Invite, TeamHash, TeamTitle, User};
    use chrono::Duration;

    struct Fixture {
        service: LobbyService<InMemoryMembershipStore>,
        store: Arc<InMemoryMembershipStore>,
        now: DateTime<Utc>,
    }

    fn fixture() -> Fixture {
        let now = Utc::now();
        let store = Arc::new(InMemoryMembershipStore::default());
        let service = LobbyService::new(Arc::clone(&store), fixture_clock(now));
        Fixture {
            service,
            store,
            now,
        }
    }

    async fn seed_user(store: &InMemoryMembershipStore, user: &User) {
        store.insert_user(user).await.expect("seed user");
    }

    async fn seed_solo_team(store: &InMemoryMembershipStore, owner: &User, title: &str) -> Team {
        let team = Team::new(
            TeamHash::random(),
            TeamTitle::new(title).expect("valid fixture title"),
        );
        store
            .create_team(&team, &owner.user_hash)
            .await
            .expect("seed team")
    }

    /// Seed a two-player team owned by users `osu_id` and `osu_id + 1`.
    async fn seed_full_team(store: &InMemoryMembershipStore, osu_id: i64, title: &str) -> Team {
        let owner = fixture_user(osu_id);
        let partner = fixture_user(osu_id + 1);
        seed_user(store, &owner).await;
        seed_user(store, &partner).await;
        let team = seed_solo_team(store, &owner, title).await;
        store
            .create_invite(&Invite {
                team_hash: team.team_hash.clone(),
                inviter: owner.user_hash.clone(),
                invited: partner.user_hash.clone(),
            })
            .await
            .expect("seed invite");
        store
            .accept_invite(&team.team_hash, &partner.user_hash)
            .await
            .expect("seed accept");
        team
    }

    async fn seed_lobby(
        store: &InMemoryMembershipStore,
        scheduled_at: DateTime<Utc>,
    ) -> Lobby {
        store
            .insert_lobby("Qualifier".into(), scheduled_at, None)
            .await
            .expect("seed lobby")
    }

    #[tokio::test]
    async fn joining_replaces_any_prior_assignment() {
        let Fixture {
            service,
            store,
            now,
        } = fixture();
        let team = seed_full_team(&store, 1, "Movers").await;
        let owner = fixture_user(1);
        let first = seed_lobby(&store, now + Duration::hours(2)).await;
        let second = seed_lobby(&store, now + Duration::hours(4)).await;

        service
            .join_lobby(&owner.user_hash, first.lobby_id)
            .await
            .expect("first join");
        let updated = service
            .join_lobby(&owner.user_hash, second.lobby_id)
            .await
            .expect("second join");
        assert_eq!(updated.lobby_id, Some(second.lobby_id));
        assert!(service
            .lobby(first.lobby_id)
            .await
            .expect("queryable")
            .teams
            .is_empty());
        assert_eq!(
            service
                .lobby(second.lobby_id)
                .await
                .expect("queryable")
                .teams
                .len(),
            1
        );
        assert_eq!(
            service
                .lobby(second.lobby_id)
                .await
                .expect("queryable")
                .teams[0]
                .team_hash,
            team.team_hash
        );
    }

    #[tokio::test]
    async fn an_incomplete_team_cannot_join() {
        let Fixture {
            service,
            store,
            now,
        } = fixture();
        let owner = fixture_user(1);
        seed_user(&store, &owner).await;
        seed_solo_team(&store, &owner, "Half").await;
        let lobby = seed_lobby(&store, now + Duration::hours(2)).await;

        let err = service
            .join_lobby(&owner.user_hash, lobby.lobby_id)
            .await
            .expect_err("solo team rejected");
        assert_eq!(err.code(), ErrorCode::IncompleteTeam);
    }

    #[tokio::test]
    async fn joining_inside_the_cutoff_is_rejected() {
        let Fixture {
            service,
            store,
            now,
        } = fixture();
        seed_full_team(&store, 1, "Late Risers").await;
        let owner = fixture_user(1);
        let closing = seed_lobby(&store, now + Duration::minutes(29)).await;
        let open = seed_lobby(&store, now + Duration::minutes(31)).await;

        let err = service
            .join_lobby(&owner.user_hash, closing.lobby_id)
            .await
            .expect_err("inside the cutoff");
        assert_eq!(err.code(), ErrorCode::LobbyClosed);
        service
            .join_lobby(&owner.user_hash, open.lobby_id)
            .await
            .expect("outside the cutoff");
    }

    #[tokio::test]
    async fn a_seventh_team_is_rejected() {
        let Fixture {
            service,
            store,
            now,
        } = fixture();
        let lobby = seed_lobby(&store, now + Duration::hours(2)).await;
        for i in 0..6_i64 {
            let owner = fixture_user(100 + i);
            seed_user(&store, &owner).await;
            let team = seed_solo_team(&store, &owner, "Filler").await;
            store
                .assign_team_to_lobby(&team.team_hash, lobby.lobby_id)
                .await
                .expect("seed assignment");
        }
        seed_full_team(&store, 1, "Latecomers").await;
        let owner = fixture_user(1);

        let err = service
            .join_lobby(&owner.user_hash, lobby.lobby_id)
            .await
            .expect_err("roster is full");
        assert_eq!(err.code(), ErrorCode::LobbyFull);
    }

    #[tokio::test]
    async fn leaving_is_idempotent() {
        let Fixture {
            service,
            store,
            now,
        } = fixture();
        let team = seed_full_team(&store, 1, "Ghosts").await;
        let owner = fixture_user(1);
        let lobby = seed_lobby(&store, now + Duration::hours(2)).await;
        service
            .join_lobby(&owner.user_hash, lobby.lobby_id)
            .await
            .expect("join");

        let left = service.leave_lobby(&owner.user_hash).await.expect("leave");
        assert!(left.lobby_id.is_none());
        let again = service
            .leave_lobby(&owner.user_hash)
            .await
            .expect("repeat leave");
        assert_eq!(again.team_hash, team.team_hash);
    }

    #[tokio::test]
    async fn admin_manages_lobbies_and_referees() {
        let Fixture {
            service,
            store,
            now,
        } = fixture();
        let mut admin = fixture_user(99);
        admin.is_admin = true;
        seed_user(&store, &admin).await;

        let lobby = service
            .create_lobby(
                &admin.user_hash,
                "Qualifier F".into(),
                now + Duration::hours(2),
                None,
            )
            .await
            .expect("create succeeds");
        let refereed = service
            .assign_referee(&admin.user_hash, lobby.lobby_id, "BanchoBot".into())
            .await
            .expect("assign succeeds");
        assert_eq!(refereed.referee.as_deref(), Some("BanchoBot"));

        // Removal withdraws every registered team.
        let team = seed_full_team(&store, 1, "Withdrawn").await;
        let owner = fixture_user(1);
        service
            .join_lobby(&owner.user_hash, lobby.lobby_id)
            .await
            .expect("join");
        service
            .remove_lobby(&admin.user_hash, lobby.lobby_id)
            .await
            .expect("remove succeeds");
        let cleared = store
            .find_team(&team.team_hash)
            .await
            .expect("lookup")
            .expect("team exists");
        assert!(cleared.lobby_id.is_none());
    }

    #[tokio::test]
    async fn lobby_administration_requires_the_admin_flag() {
        let Fixture {
            service,
            store,
            now,
        } = fixture();
        let user = fixture_user(1);
        seed_user(&store, &user).await;
        let err = service
            .create_lobby(&user.user_hash, "Rogue".into(), now, None)
            .await
            .expect_err("non-admin rejected");
        assert_eq!(err.code(), ErrorCode::Forbidden);
    }
}
