//! Team lifecycle service.
//!
//! Implements [`TeamCommand`], [`TeamsQuery`], and [`ModerationCommand`].
//! All compound writes go through the membership store's transactional
//! methods; this layer pre-validates the caller's state and translates guard
//! failures into the domain taxonomy.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;

use crate::domain::ports::{
    ImageHost, MembershipChange, MembershipStore, MembershipStoreError, ModerationCommand,
    TeamCommand, TeamRoster, TeamsQuery,
};
use crate::domain::service_support::{
    ensure_signups_open, map_store_error, require_active, require_admin, require_user,
};
use crate::domain::{
    Error, ErrorCode, Invite, SignupWindow, Team, TeamHash, TeamTitle, User, UserHash,
};

/// Team lifecycle service backed by the membership store and image host.
#[derive(Clone)]
pub struct TeamService<S, H> {
    store: Arc<S>,
    image_host: Arc<H>,
    window: SignupWindow,
    clock: Arc<dyn Clock>,
}

impl<S, H> TeamService<S, H> {
    /// Create a new service over the given adapters.
    pub fn new(
        store: Arc<S>,
        image_host: Arc<H>,
        window: SignupWindow,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            image_host,
            window,
            clock,
        }
    }
}

#[async_trait]
impl<S, H> TeamCommand for TeamService<S, H>
where
    S: MembershipStore,
    H: ImageHost,
{
    async fn create_team(&self, owner: &UserHash, title: TeamTitle) -> Result<Team, Error> {
        ensure_signups_open(self.window, self.clock.as_ref())?;
        let caller = require_user(self.store.as_ref(), owner).await?;
        require_active(&caller)?;
        if caller.is_admin {
            return Err(Error::forbidden("admins cannot enter the tournament"));
        }
        if caller.is_on_team() {
            return Err(Error::new(
                ErrorCode::AlreadyOnTeam,
                "caller already belongs to a team",
            ));
        }

        let team = Team::new(TeamHash::random(), title);
        self.store
            .create_team(&team, owner)
            .await
            .map_err(|err| match err {
                MembershipStoreError::StaleLink { .. } => Error::new(
                    ErrorCode::AlreadyOnTeam,
                    "caller already belongs to a team",
                ),
                other => map_store_error(other),
            })
    }

    async fn leave_team(&self, user: &UserHash) -> Result<MembershipChange, Error> {
        ensure_signups_open(self.window, self.clock.as_ref())?;
        let caller = require_user(self.store.as_ref(), user).await?;
        require_active(&caller)?;
        if !caller.is_on_team() {
            return Err(Error::new(ErrorCode::NotOnTeam, "caller has no team to leave"));
        }

        self.store
            .remove_member(user)
            .await
            .map_err(|err| match err {
                MembershipStoreError::StaleLink { .. } => {
                    Error::new(ErrorCode::NotOnTeam, "caller has no team to leave")
                }
                other => map_store_error(other),
            })
    }

    async fn upload_avatar(&self, user: &UserHash, image: Vec<u8>) -> Result<Team, Error> {
        ensure_signups_open(self.window, self.clock.as_ref())?;
        let caller = require_user(self.store.as_ref(), user).await?;
        require_active(&caller)?;
        let team_hash = caller
            .team_hash
            .ok_or_else(|| Error::new(ErrorCode::NoTeam, "caller has no team"))?;

        let url = self
            .image_host
            .upload(image)
            .await
            .map_err(|err| Error::upload(err.to_string()))?;

        self.store
            .set_team_avatar(&team_hash, url)
            .await
            .map_err(|err| match err {
                MembershipStoreError::MissingRow { .. } => {
                    Error::new(ErrorCode::NoTeam, "team dissolved during the upload")
                }
                other => map_store_error(other),
            })
    }
}

#[async_trait]
impl<S, H> TeamsQuery for TeamService<S, H>
where
    S: MembershipStore,
    H: ImageHost,
{
    async fn list_teams(&self, skip: usize, limit: usize) -> Result<Vec<TeamRoster>, Error> {
        let teams = self
            .store
            .list_teams(skip, limit)
            .await
            .map_err(map_store_error)?;
        let mut rosters = Vec::with_capacity(teams.len());
        for team in teams {
            let members = self
                .store
                .team_members(&team.team_hash)
                .await
                .map_err(map_store_error)?;
            rosters.push(TeamRoster { team, members });
        }
        Ok(rosters)
    }

    async fn team_invites(&self, team: &TeamHash) -> Result<Vec<Invite>, Error> {
        self.store
            .invites_for_team(team)
            .await
            .map_err(map_store_error)
    }
}

#[async_trait]
impl<S, H> ModerationCommand for TeamService<S, H>
where
    S: MembershipStore,
    H: ImageHost,
{
    async fn ban_user(&self, actor: &UserHash, osu_id: i64) -> Result<User, Error> {
        require_admin(self.store.as_ref(), actor).await?;
        self.store.ban_user(osu_id).await.map_err(|err| match err {
            MembershipStoreError::MissingRow { .. } => {
                Error::user_not_found("no user with this osu! id")
            }
            other => map_store_error(other),
        })
    }

    async fn unban_user(&self, actor: &UserHash, osu_id: i64) -> Result<User, Error> {
        require_admin(self.store.as_ref(), actor).await?;
        self.store
            .unban_user(osu_id)
            .await
            .map_err(|err| match err {
                MembershipStoreError::MissingRow { .. } => {
                    Error::user_not_found("no user with this osu! id")
                }
                other => map_store_error(other),
            })
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use crate::domain::ports::{FixtureImageHost, InMemoryMembershipStore};
    use crate::domain::test_support::{fixture_clock, fixture_user};
    use chrono::{Duration, Utc};

    type Service = TeamService<InMemoryMembershipStore, FixtureImageHost>;

    struct Fixture {
        service: Service,
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
        let service = TeamService::new(
            Arc::clone(&store),
            Arc::new(FixtureImageHost::default()),
            SignupWindow::closing_at(closes_at),
            fixture_clock(now),
        );
        Fixture { service, store }
    }

    async fn seed(store: &InMemoryMembershipStore, user: &User) {
        store.insert_user(user).await.expect("seed user");
    }

    fn title(raw: &str) -> TeamTitle {
        TeamTitle::new(raw).expect("valid fixture title")
    }

    #[tokio::test]
    async fn create_team_links_the_owner_and_purges_their_invites() {
        let Fixture { service, store } = fixture(true);
        let founder = fixture_user(1);
        let owner = fixture_user(2);
        seed(&store, &founder).await;
        seed(&store, &owner).await;

        // The founder's team has a pending invite addressed to `owner`.
        let existing = service
            .create_team(&founder.user_hash, title("First Movers"))
            .await
            .expect("founder team");
        store
            .create_invite(&Invite {
                team_hash: existing.team_hash.clone(),
                inviter: founder.user_hash.clone(),
                invited: owner.user_hash.clone(),
            })
            .await
            .expect("seed invite");

        let team = service
            .create_team(&owner.user_hash, title("Second Wind"))
            .await
            .expect("team created");

        let linked = store
            .find_user(&owner.user_hash)
            .await
            .expect("lookup")
            .expect("owner exists");
        assert_eq!(linked.team_hash, Some(team.team_hash));
        assert!(store
            .invites_for_user(&owner.user_hash)
            .await
            .expect("listable")
            .is_empty());
    }

    #[tokio::test]
    async fn create_team_rejects_a_second_team() {
        let Fixture { service, store } = fixture(true);
        let owner = fixture_user(1);
        seed(&store, &owner).await;
        service
            .create_team(&owner.user_hash, title("One"))
            .await
            .expect("first team");
        let err = service
            .create_team(&owner.user_hash, title("Two"))
            .await
            .expect_err("second team rejected");
        assert_eq!(err.code(), ErrorCode::AlreadyOnTeam);
    }

    #[tokio::test]
    async fn admins_and_banned_users_cannot_create_teams() {
        let Fixture { service, store } = fixture(true);
        let mut admin = fixture_user(1);
        admin.is_admin = true;
        let mut banned = fixture_user(2);
        banned.is_banned = true;
        seed(&store, &admin).await;
        seed(&store, &banned).await;

        for hash in [&admin.user_hash, &banned.user_hash] {
            let err = service
                .create_team(hash, title("Nope"))
                .await
                .expect_err("rejected");
            assert_eq!(err.code(), ErrorCode::Forbidden);
        }
    }

    #[tokio::test]
    async fn create_team_is_rejected_after_the_deadline() {
        let Fixture { service, store } = fixture(false);
        let owner = fixture_user(1);
        seed(&store, &owner).await;
        let err = service
            .create_team(&owner.user_hash, title("Late"))
            .await
            .expect_err("closed window rejects");
        assert_eq!(err.code(), ErrorCode::Forbidden);
    }

    #[tokio::test]
    async fn sole_member_leaving_dissolves_the_team_and_its_invites() {
        let Fixture { service, store } = fixture(true);
        let owner = fixture_user(1);
        let invited = fixture_user(2);
        seed(&store, &owner).await;
        seed(&store, &invited).await;
        let team = service
            .create_team(&owner.user_hash, title("Short Lived"))
            .await
            .expect("team created");
        store
            .create_invite(&Invite {
                team_hash: team.team_hash.clone(),
                inviter: owner.user_hash.clone(),
                invited: invited.user_hash.clone(),
            })
            .await
            .expect("seed invite");

        let change = service
            .leave_team(&owner.user_hash)
            .await
            .expect("leaves");
        assert!(change.dissolved);
        assert_eq!(change.remaining, 0);
        assert!(store
            .find_team(&team.team_hash)
            .await
            .expect("lookup")
            .is_none());
        assert!(store
            .invites_for_user(&invited.user_hash)
            .await
            .expect("listable")
            .is_empty());
    }

    #[tokio::test]
    async fn leaving_a_full_team_keeps_the_remaining_member() {
        let Fixture { service, store } = fixture(true);
        let owner = fixture_user(1);
        let partner = fixture_user(2);
        seed(&store, &owner).await;
        seed(&store, &partner).await;
        let team = service
            .create_team(&owner.user_hash, title("Pair"))
            .await
            .expect("team created");
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
            .expect("partner joins");

        let change = service.leave_team(&owner.user_hash).await.expect("leaves");
        assert!(!change.dissolved);
        assert_eq!(change.remaining, 1);
        let members = store
            .team_members(&team.team_hash)
            .await
            .expect("listable");
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].user_hash, partner.user_hash);
    }

    #[tokio::test]
    async fn leave_without_a_team_is_rejected() {
        let Fixture { service, store } = fixture(true);
        let user = fixture_user(1);
        seed(&store, &user).await;
        let err = service
            .leave_team(&user.user_hash)
            .await
            .expect_err("nothing to leave");
        assert_eq!(err.code(), ErrorCode::NotOnTeam);
    }

    #[tokio::test]
    async fn avatar_upload_requires_a_team_and_records_the_url() {
        let Fixture { service, store } = fixture(true);
        let owner = fixture_user(1);
        seed(&store, &owner).await;

        let err = service
            .upload_avatar(&owner.user_hash, vec![0xFF; 32])
            .await
            .expect_err("no team yet");
        assert_eq!(err.code(), ErrorCode::NoTeam);

        let team = service
            .create_team(&owner.user_hash, title("Pictured"))
            .await
            .expect("team created");
        let updated = service
            .upload_avatar(&owner.user_hash, vec![0xFF; 32])
            .await
            .expect("upload succeeds");
        assert_eq!(updated.team_hash, team.team_hash);
        assert!(updated.avatar_url.is_some());
    }

    #[tokio::test]
    async fn ban_dissolves_the_team_even_with_a_surviving_teammate() {
        let Fixture { service, store } = fixture(true);
        let mut admin = fixture_user(99);
        admin.is_admin = true;
        let owner = fixture_user(1);
        let partner = fixture_user(2);
        seed(&store, &admin).await;
        seed(&store, &owner).await;
        seed(&store, &partner).await;
        let team = service
            .create_team(&owner.user_hash, title("Doomed"))
            .await
            .expect("team created");
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
            .expect("partner joins");

        let banned = service
            .ban_user(&admin.user_hash, owner.osu.osu_id)
            .await
            .expect("ban succeeds");
        assert!(banned.is_banned);
        assert!(banned.team_hash.is_none());
        assert!(store
            .find_team(&team.team_hash)
            .await
            .expect("lookup")
            .is_none());
        let survivor = store
            .find_user(&partner.user_hash)
            .await
            .expect("lookup")
            .expect("partner exists");
        assert!(survivor.team_hash.is_none());
        assert!(!survivor.is_banned);
    }

    #[tokio::test]
    async fn unban_clears_the_flag_without_restoring_a_team() {
        let Fixture { service, store } = fixture(true);
        let mut admin = fixture_user(99);
        admin.is_admin = true;
        let owner = fixture_user(1);
        seed(&store, &admin).await;
        seed(&store, &owner).await;
        service
            .create_team(&owner.user_hash, title("Gone"))
            .await
            .expect("team created");
        service
            .ban_user(&admin.user_hash, owner.osu.osu_id)
            .await
            .expect("ban succeeds");

        let unbanned = service
            .unban_user(&admin.user_hash, owner.osu.osu_id)
            .await
            .expect("unban succeeds");
        assert!(!unbanned.is_banned);
        assert!(unbanned.team_hash.is_none());
    }

    #[tokio::test]
    async fn moderation_requires_the_admin_flag() {
        let Fixture { service, store } = fixture(true);
        let user = fixture_user(1);
        let target = fixture_user(2);
        seed(&store, &user).await;
        seed(&store, &target).await;
        let err = service
            .ban_user(&user.user_hash, target.osu.osu_id)
            .await
            .expect_err("non-admin rejected");
        assert_eq!(err.code(), ErrorCode::Forbidden);
    }

    #[tokio::test]
    async fn list_teams_returns_rosters_with_members() {
        let Fixture { service, store } = fixture(true);
        let owner = fixture_user(1);
        seed(&store, &owner).await;
        service
            .create_team(&owner.user_hash, title("Visible"))
            .await
            .expect("team created");

        let rosters = service.list_teams(0, 50).await.expect("listable");
        assert_eq!(rosters.len(), 1);
        assert_eq!(rosters[0].members.len(), 1);
        assert_eq!(rosters[0].members[0].user_hash, owner.user_hash);
    }
}
