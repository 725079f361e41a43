//! Invite state-machine service.
//!
//! Implements [`InviteCommand`]. The store's transactional guards are the
//! source of truth for races; the pre-checks here exist to return precise
//! rejection codes for the common, unraced paths.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;

use crate::domain::ports::{InviteCommand, MembershipStore, MembershipStoreError};
use crate::domain::service_support::{
    ensure_signups_open, map_store_error, require_active, require_user,
};
use crate::domain::team::TEAM_CAPACITY;
use crate::domain::{Error, ErrorCode, Invite, SignupWindow, TeamHash, User, UserHash};

/// Invite service backed by the membership store.
#[derive(Clone)]
pub struct InviteService<S> {
    store: Arc<S>,
    window: SignupWindow,
    clock: Arc<dyn Clock>,
}

impl<S> InviteService<S> {
    /// Create a new service over the given store.
    pub fn new(store: Arc<S>, window: SignupWindow, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            window,
            clock,
        }
    }
}

#[async_trait]
impl<S> InviteCommand for InviteService<S>
where
    S: MembershipStore,
{
    async fn create_invite(
        &self,
        owner: &UserHash,
        invited_osu_id: i64,
    ) -> Result<Invite, Error> {
        ensure_signups_open(self.window, self.clock.as_ref())?;
        let caller = require_user(self.store.as_ref(), owner).await?;
        require_active(&caller)?;
        let team_hash = caller
            .team_hash
            .ok_or_else(|| Error::new(ErrorCode::NoTeam, "caller has no team"))?;

        let invited = self
            .store
            .find_user_by_osu_id(invited_osu_id)
            .await
            .map_err(map_store_error)?
            .ok_or_else(|| Error::user_not_found("no user with this osu! id"))?;
        if invited.user_hash == *owner {
            return Err(Error::new(
                ErrorCode::SelfInvite,
                "cannot invite yourself",
            ));
        }
        if invited.team_hash.as_ref() == Some(&team_hash) {
            return Err(Error::new(
                ErrorCode::AlreadyOnTeam,
                "invited user is already a member of this team",
            ));
        }

        let members = self
            .store
            .team_members(&team_hash)
            .await
            .map_err(map_store_error)?;
        if members.len() >= TEAM_CAPACITY {
            return Err(Error::new(
                ErrorCode::TeamFull,
                "team already has two players",
            ));
        }

        let invite = Invite {
            team_hash,
            inviter: owner.clone(),
            invited: invited.user_hash,
        };
        self.store
            .create_invite(&invite)
            .await
            .map_err(|err| match err {
                MembershipStoreError::DuplicateKey { .. } => Error::new(
                    ErrorCode::DuplicateInvite,
                    "an identical invite is already pending",
                ),
                MembershipStoreError::CapacityExceeded { .. } => {
                    Error::new(ErrorCode::TeamFull, "team already has two players")
                }
                other => map_store_error(other),
            })
    }

    async fn accept_invite(&self, user: &UserHash, team: &TeamHash) -> Result<User, Error> {
        ensure_signups_open(self.window, self.clock.as_ref())?;
        let caller = require_user(self.store.as_ref(), user).await?;
        require_active(&caller)?;

        self.store
            .accept_invite(team, user)
            .await
            .map_err(|err| match err {
                MembershipStoreError::MissingRow { .. } => Error::invite_not_found(
                    "no pending invite matches this team and user",
                ),
                MembershipStoreError::CapacityExceeded { .. } => {
                    Error::new(ErrorCode::TeamFull, "team filled before the accept")
                }
                other => map_store_error(other),
            })
    }

    async fn decline_invite(&self, user: &UserHash, team: &TeamHash) -> Result<User, Error> {
        ensure_signups_open(self.window, self.clock.as_ref())?;
        let caller = require_user(self.store.as_ref(), user).await?;
        require_active(&caller)?;

        self.store
            .delete_invite(team, user)
            .await
            .map_err(|err| match err {
                MembershipStoreError::MissingRow { .. } => Error::invite_not_found(
                    "no pending invite matches this team and user",
                ),
                other => map_store_error(other),
            })?;
        require_user(self.store.as_ref(), user).await
    }

    async fn cancel_invite(
        &self,
        owner: &UserHash,
        invited_osu_id: i64,
    ) -> Result<Vec<Invite>, Error> {
        ensure_signups_open(self.window, self.clock.as_ref())?;
        let caller = require_user(self.store.as_ref(), owner).await?;
        require_active(&caller)?;
        let team_hash = caller
            .team_hash
            .ok_or_else(|| Error::new(ErrorCode::NoTeam, "caller has no team"))?;

        let invited = self
            .store
            .find_user_by_osu_id(invited_osu_id)
            .await
            .map_err(map_store_error)?
            .ok_or_else(|| Error::user_not_found("no user with this osu! id"))?;

        self.store
            .delete_invite(&team_hash, &invited.user_hash)
            .await
            .map_err(|err| match err {
                MembershipStoreError::MissingRow { .. } => Error::invite_not_found(
                    "no pending invite matches this team and user",
                ),
                other => map_store_error(other),
            })?;
        self.store
            .invites_for_team(&team_hash)
            .await
            .map_err(map_store_error)
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use crate::domain::ports::{InMemoryMembershipStore, MockMembershipStore};
    use crate::domain::test_support::{fixture_clock, fixture_user};
    use crate::domain::{Team, TeamTitle};
    use chrono::{Duration, Utc};

    struct Fixture {
        service: InviteService<InMemoryMembershipStore>,
        store: Arc<InMemoryMembershipStore>,
    }

    fn fixture(window_open: bool) -> Fixture {
        let now = Utc::now();
        let closes_at = if window_open {
            now + Duration::days(1)
        } else {
            now - Duration::days(1)
        };
        let store = Arc::new(InMemoryMembershipStore::default());
        let service = InviteService::new(
            Arc::clone(&store),
            SignupWindow::closing_at(closes_at),
            fixture_clock(now),
        );
        Fixture { service, store }
    }

    async fn seed_user(store: &InMemoryMembershipStore, user: &User) {
        store.insert_user(user).await.expect("seed user");
    }

    async fn seed_team(store: &InMemoryMembershipStore, owner: &User, title: &str) -> Team {
        let team = Team::new(
            TeamHash::random(),
            TeamTitle::new(title).expect("valid fixture title"),
        );
        store
            .create_team(&team, &owner.user_hash)
            .await
            .expect("seed team")
    }

    #[tokio::test]
    async fn create_then_accept_fills_the_team_and_purges_siblings() {
        let Fixture { service, store } = fixture(true);
        let owner = fixture_user(1);
        let first = fixture_user(2);
        let second = fixture_user(3);
        for user in [&owner, &first, &second] {
            seed_user(&store, user).await;
        }
        let team = seed_team(&store, &owner, "Open Slot").await;

        service
            .create_invite(&owner.user_hash, first.osu.osu_id)
            .await
            .expect("first invite");
        service
            .create_invite(&owner.user_hash, second.osu.osu_id)
            .await
            .expect("second invite");

        let joined = service
            .accept_invite(&first.user_hash, &team.team_hash)
            .await
            .expect("accept succeeds");
        assert_eq!(joined.team_hash, Some(team.team_hash.clone()));
        let members = store
            .team_members(&team.team_hash)
            .await
            .expect("listable");
        assert_eq!(members.len(), 2);
        // The losing invite vanished with the free slot.
        assert!(store
            .invites_for_team(&team.team_hash)
            .await
            .expect("listable")
            .is_empty());
        let err = service
            .accept_invite(&second.user_hash, &team.team_hash)
            .await
            .expect_err("stale accept fails");
        assert_eq!(err.code(), ErrorCode::InviteNotFound);
    }

    #[tokio::test]
    async fn duplicate_invites_are_rejected() {
        let Fixture { service, store } = fixture(true);
        let owner = fixture_user(1);
        let invited = fixture_user(2);
        seed_user(&store, &owner).await;
        seed_user(&store, &invited).await;
        seed_team(&store, &owner, "Once Only").await;

        service
            .create_invite(&owner.user_hash, invited.osu.osu_id)
            .await
            .expect("first invite");
        let err = service
            .create_invite(&owner.user_hash, invited.osu.osu_id)
            .await
            .expect_err("repeat rejected");
        assert_eq!(err.code(), ErrorCode::DuplicateInvite);
    }

    #[tokio::test]
    async fn invite_preconditions_map_to_precise_codes() {
        let Fixture { service, store } = fixture(true);
        let owner = fixture_user(1);
        seed_user(&store, &owner).await;

        let err = service
            .create_invite(&owner.user_hash, 2)
            .await
            .expect_err("no team yet");
        assert_eq!(err.code(), ErrorCode::NoTeam);

        seed_team(&store, &owner, "Picky").await;
        let err = service
            .create_invite(&owner.user_hash, 404)
            .await
            .expect_err("unknown invitee");
        assert_eq!(err.code(), ErrorCode::UserNotFound);

        let err = service
            .create_invite(&owner.user_hash, owner.osu.osu_id)
            .await
            .expect_err("self invite");
        assert_eq!(err.code(), ErrorCode::SelfInvite);
    }

    #[tokio::test]
    async fn a_full_team_cannot_invite() {
        let Fixture { service, store } = fixture(true);
        let owner = fixture_user(1);
        let partner = fixture_user(2);
        let third = fixture_user(3);
        for user in [&owner, &partner, &third] {
            seed_user(&store, user).await;
        }
        let team = seed_team(&store, &owner, "Complete").await;
        service
            .create_invite(&owner.user_hash, partner.osu.osu_id)
            .await
            .expect("invite");
        service
            .accept_invite(&partner.user_hash, &team.team_hash)
            .await
            .expect("accept");

        let err = service
            .create_invite(&owner.user_hash, third.osu.osu_id)
            .await
            .expect_err("full team rejected");
        assert_eq!(err.code(), ErrorCode::TeamFull);
    }

    #[tokio::test]
    async fn accepting_while_on_a_team_detaches_and_dissolves_the_empty_one() {
        let Fixture { service, store } = fixture(true);
        let owner = fixture_user(1);
        let drifter = fixture_user(2);
        seed_user(&store, &owner).await;
        seed_user(&store, &drifter).await;
        let destination = seed_team(&store, &owner, "Destination").await;
        let abandoned = seed_team(&store, &drifter, "Abandoned").await;

        service
            .create_invite(&owner.user_hash, drifter.osu.osu_id)
            .await
            .expect("invite");
        let joined = service
            .accept_invite(&drifter.user_hash, &destination.team_hash)
            .await
            .expect("accept succeeds");
        assert_eq!(joined.team_hash, Some(destination.team_hash));
        assert!(store
            .find_team(&abandoned.team_hash)
            .await
            .expect("lookup")
            .is_none());
    }

    #[tokio::test]
    async fn decline_and_cancel_delete_the_single_matching_invite() {
        let Fixture { service, store } = fixture(true);
        let owner = fixture_user(1);
        let invited = fixture_user(2);
        seed_user(&store, &owner).await;
        seed_user(&store, &invited).await;
        let team = seed_team(&store, &owner, "Fickle").await;

        service
            .create_invite(&owner.user_hash, invited.osu.osu_id)
            .await
            .expect("invite");
        let user = service
            .decline_invite(&invited.user_hash, &team.team_hash)
            .await
            .expect("decline succeeds");
        assert!(user.team_hash.is_none());
        let err = service
            .decline_invite(&invited.user_hash, &team.team_hash)
            .await
            .expect_err("already gone");
        assert_eq!(err.code(), ErrorCode::InviteNotFound);

        service
            .create_invite(&owner.user_hash, invited.osu.osu_id)
            .await
            .expect("re-invite");
        let remaining = service
            .cancel_invite(&owner.user_hash, invited.osu.osu_id)
            .await
            .expect("cancel succeeds");
        assert!(remaining.is_empty());
    }

    #[tokio::test]
    async fn invite_mutations_are_rejected_after_the_deadline() {
        let Fixture { service, store } = fixture(false);
        let owner = fixture_user(1);
        seed_user(&store, &owner).await;
        let err = service
            .create_invite(&owner.user_hash, 2)
            .await
            .expect_err("closed window rejects");
        assert_eq!(err.code(), ErrorCode::Forbidden);
    }

    #[tokio::test]
    async fn a_lost_capacity_race_surfaces_as_team_full() {
        let user = fixture_user(1);
        let hash = user.user_hash.clone();
        let mut store = MockMembershipStore::new();
        store
            .expect_find_user()
            .returning(move |_| Ok(Some(user.clone())));
        store
            .expect_accept_invite()
            .returning(|_, _| Err(MembershipStoreError::capacity_exceeded(TEAM_CAPACITY)));

        let service = InviteService::new(
            Arc::new(store),
            SignupWindow::closing_at(Utc::now() + Duration::days(1)),
            fixture_clock(Utc::now()),
        );
        let err = service
            .accept_invite(&hash, &TeamHash::random())
            .await
            .expect_err("race maps to team_full");
        assert_eq!(err.code(), ErrorCode::TeamFull);
    }

    #[tokio::test]
    async fn store_outages_surface_as_service_unavailable() {
        let mut store = MockMembershipStore::new();
        store
            .expect_find_user()
            .returning(|_| Err(MembershipStoreError::connection("pool exhausted")));

        let service = InviteService::new(
            Arc::new(store),
            SignupWindow::closing_at(Utc::now() + Duration::days(1)),
            fixture_clock(Utc::now()),
        );
        let err = service
            .accept_invite(&fixture_user(1).user_hash, &TeamHash::random())
            .await
            .expect_err("outage maps to service_unavailable");
        assert_eq!(err.code(), ErrorCode::ServiceUnavailable);
    }
}
