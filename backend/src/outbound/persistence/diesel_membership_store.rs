//! PostgreSQL-backed `MembershipStore` implementation using Diesel ORM.
//!
//! Compound operations run as single transactions and re-take their guards
//! with `SELECT ... FOR UPDATE` row locks, so concurrent callers serialise on
//! the contested row instead of both succeeding. Only this adapter writes the
//! membership tables.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use tracing::debug;

use crate::domain::ports::{MembershipChange, MembershipStore, MembershipStoreError};
use crate::domain::{
    DiscordIdentity, Invite, LOBBY_CAPACITY, Lobby, TEAM_CAPACITY, Team, TeamHash, User, UserHash,
};

use super::models::{InviteRow, LobbyRow, NewLobbyRow, TeamRow, UserRow};
use super::pool::{DbPool, PoolError};
use super::schema::{invites, lobbies, teams, users};

/// Diesel-backed implementation of the `MembershipStore` port.
#[derive(Clone)]
pub struct DieselMembershipStore {
    pool: DbPool,
}

impl DieselMembershipStore {
    /// Create a new store with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Map pool errors to membership store errors.
fn map_pool_error(error: PoolError) -> MembershipStoreError {
    match error {
        PoolError::Checkout { message } | PoolError::Build { message } => {
            MembershipStoreError::connection(message)
        }
    }
}

impl From<diesel::result::Error> for MembershipStoreError {
    fn from(error: diesel::result::Error) -> Self {
        use diesel::result::{DatabaseErrorKind, Error as DieselError};

        match error {
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                Self::duplicate_key(info.message().to_owned())
            }
            DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, info) => {
                Self::connection(info.message().to_owned())
            }
            DieselError::NotFound => Self::query("record not found"),
            other => {
                debug!(error = %other, "diesel operation failed");
                Self::query(other.to_string())
            }
        }
    }
}

/// Members currently linked to the team, counted inside the transaction.
async fn member_count(
    conn: &mut AsyncPgConnection,
    team: &str,
) -> Result<i64, MembershipStoreError> {
    let count = users::table
        .filter(users::team_hash.eq(team))
        .count()
        .get_result::<i64>(conn)
        .await?;
    Ok(count)
}

/// Delete a team row together with every invite referencing it.
async fn dissolve_team(
    conn: &mut AsyncPgConnection,
    team: &str,
) -> Result<(), MembershipStoreError> {
    diesel::delete(invites::table.filter(invites::team_hash.eq(team)))
        .execute(conn)
        .await?;
    diesel::delete(teams::table.filter(teams::team_hash.eq(team)))
        .execute(conn)
        .await?;
    Ok(())
}

/// Lock the team row so capacity checks hold until commit.
async fn lock_team(
    conn: &mut AsyncPgConnection,
    team: &str,
) -> Result<TeamRow, MembershipStoreError> {
    teams::table
        .filter(teams::team_hash.eq(team))
        .for_update()
        .select(TeamRow::as_select())
        .first(conn)
        .await
        .optional()?
        .ok_or_else(|| MembershipStoreError::missing_row("team"))
}

fn pagination_bound(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[async_trait]
impl MembershipStore for DieselMembershipStore {
    async fn find_user(&self, hash: &UserHash) -> Result<Option<User>, MembershipStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<UserRow> = users::table
            .filter(users::user_hash.eq(hash.as_ref()))
            .select(UserRow::as_select())
            .first(&mut conn)
            .await
            .optional()?;
        row.map(UserRow::into_domain).transpose()
    }

    async fn find_user_by_osu_id(
        &self,
        osu_id: i64,
    ) -> Result<Option<User>, MembershipStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<UserRow> = users::table
            .filter(users::osu_id.eq(osu_id))
            .select(UserRow::as_select())
            .first(&mut conn)
            .await
            .optional()?;
        row.map(UserRow::into_domain).transpose()
    }

    async fn insert_user(&self, user: &User) -> Result<(), MembershipStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::insert_into(users::table)
            .values(UserRow::from_domain(user))
            .execute(&mut conn)
            .await?;
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<User>, MembershipStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<UserRow> = users::table
            .order(users::osu_id.asc())
            .select(UserRow::as_select())
            .load(&mut conn)
            .await?;
        rows.into_iter().map(UserRow::into_domain).collect()
    }

    async fn set_discord(
        &self,
        hash: &UserHash,
        discord: Option<DiscordIdentity>,
    ) -> Result<User, MembershipStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<UserRow> = diesel::update(
            users::table.filter(users::user_hash.eq(hash.as_ref())),
        )
        .set((
            users::discord_id.eq(discord.as_ref().map(|d| d.discord_id.clone())),
            users::discord_tag.eq(discord.as_ref().map(|d| d.discord_tag.clone())),
            users::discord_avatar_url.eq(discord.as_ref().map(|d| d.discord_avatar_url.clone())),
        ))
        .returning(UserRow::as_returning())
        .get_result(&mut conn)
        .await
        .optional()?;
        row.ok_or_else(|| MembershipStoreError::missing_row("user"))?
            .into_domain()
    }

    async fn ban_user(&self, osu_id: i64) -> Result<User, MembershipStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let conn = &mut *conn;
        conn.transaction::<User, MembershipStoreError, _>(|conn| {
            async move {
                let mut row: UserRow = diesel::update(
                    users::table.filter(users::osu_id.eq(osu_id)),
                )
                .set(users::is_banned.eq(true))
                .returning(UserRow::as_returning())
                .get_result(conn)
                .await
                .optional()?
                .ok_or_else(|| MembershipStoreError::missing_row("user"))?;

                // Banning dissolves the team; the surviving teammate is freed.
                if let Some(team) = row.team_hash.take() {
                    diesel::update(users::table.filter(users::team_hash.eq(&team)))
                        .set(users::team_hash.eq(None::<String>))
                        .execute(conn)
                        .await?;
                    dissolve_team(conn, &team).await?;
                }
                row.into_domain()
            }
            .scope_boxed()
        })
        .await
    }

    async fn unban_user(&self, osu_id: i64) -> Result<User, MembershipStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<UserRow> =
            diesel::update(users::table.filter(users::osu_id.eq(osu_id)))
                .set(users::is_banned.eq(false))
                .returning(UserRow::as_returning())
                .get_result(&mut conn)
                .await
                .optional()?;
        row.ok_or_else(|| MembershipStoreError::missing_row("user"))?
            .into_domain()
    }

    async fn find_team(&self, hash: &TeamHash) -> Result<Option<Team>, MembershipStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<TeamRow> = teams::table
            .filter(teams::team_hash.eq(hash.as_ref()))
            .select(TeamRow::as_select())
            .first(&mut conn)
            .await
            .optional()?;
        row.map(TeamRow::into_domain).transpose()
    }

    async fn list_teams(
        &self,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<Team>, MembershipStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<TeamRow> = teams::table
            .order(teams::title.asc())
            .offset(pagination_bound(skip))
            .limit(pagination_bound(limit))
            .select(TeamRow::as_select())
            .load(&mut conn)
            .await?;
        rows.into_iter().map(TeamRow::into_domain).collect()
    }

    async fn team_members(&self, hash: &TeamHash) -> Result<Vec<User>, MembershipStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<UserRow> = users::table
            .filter(users::team_hash.eq(hash.as_ref()))
            .order(users::osu_id.asc())
            .select(UserRow::as_select())
            .load(&mut conn)
            .await?;
        rows.into_iter().map(UserRow::into_domain).collect()
    }

    async fn create_team(
        &self,
        team: &Team,
        owner: &UserHash,
    ) -> Result<Team, MembershipStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let conn = &mut *conn;
        let row = TeamRow::from_domain(team);
        let owner = owner.as_ref().to_owned();
        let created = team.clone();
        conn.transaction::<Team, MembershipStoreError, _>(|conn| {
            async move {
                diesel::insert_into(teams::table)
                    .values(&row)
                    .execute(conn)
                    .await?;

                // Guarded link: only an unlinked owner may found a team.
                let linked = diesel::update(
                    users::table.filter(
                        users::user_hash
                            .eq(&owner)
                            .and(users::team_hash.is_null()),
                    ),
                )
                .set(users::team_hash.eq(&row.team_hash))
                .execute(conn)
                .await?;
                if linked == 0 {
                    let exists: i64 = users::table
                        .filter(users::user_hash.eq(&owner))
                        .count()
                        .get_result(conn)
                        .await?;
                    return Err(if exists == 0 {
                        MembershipStoreError::missing_row("user")
                    } else {
                        MembershipStoreError::stale_link("owner already has a team")
                    });
                }

                // Founding a team resolves every invite addressed to the founder.
                diesel::delete(invites::table.filter(invites::invited.eq(&owner)))
                    .execute(conn)
                    .await?;
                Ok(created)
            }
            .scope_boxed()
        })
        .await
    }

    async fn remove_member(
        &self,
        user: &UserHash,
    ) -> Result<MembershipChange, MembershipStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let conn = &mut *conn;
        let user = user.as_ref().to_owned();
        conn.transaction::<MembershipChange, MembershipStoreError, _>(|conn| {
            async move {
                let row: UserRow = users::table
                    .filter(users::user_hash.eq(&user))
                    .for_update()
                    .select(UserRow::as_select())
                    .first(conn)
                    .await
                    .optional()?
                    .ok_or_else(|| MembershipStoreError::missing_row("user"))?;
                let team = row
                    .team_hash
                    .ok_or_else(|| MembershipStoreError::stale_link("user has no team"))?;

                diesel::update(users::table.filter(users::user_hash.eq(&user)))
                    .set(users::team_hash.eq(None::<String>))
                    .execute(conn)
                    .await?;

                let remaining = member_count(conn, &team).await?;
                let dissolved = remaining == 0;
                if dissolved {
                    dissolve_team(conn, &team).await?;
                }
                Ok(MembershipChange {
                    team_hash: TeamHash::parse(team).map_err(|err| {
                        MembershipStoreError::query(format!("corrupt team row: {err}"))
                    })?,
                    remaining: usize::try_from(remaining).unwrap_or(0),
                    dissolved,
                })
            }
            .scope_boxed()
        })
        .await
    }

    async fn set_team_avatar(
        &self,
        hash: &TeamHash,
        avatar_url: String,
    ) -> Result<Team, MembershipStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<TeamRow> =
            diesel::update(teams::table.filter(teams::team_hash.eq(hash.as_ref())))
                .set(teams::avatar_url.eq(Some(avatar_url)))
                .returning(TeamRow::as_returning())
                .get_result(&mut conn)
                .await
                .optional()?;
        row.ok_or_else(|| MembershipStoreError::missing_row("team"))?
            .into_domain()
    }

    async fn create_invite(&self, invite: &Invite) -> Result<Invite, MembershipStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let conn = &mut *conn;
        let row = InviteRow::from_domain(invite);
        let created = invite.clone();
        conn.transaction::<Invite, MembershipStoreError, _>(|conn| {
            async move {
                lock_team(conn, &row.team_hash).await?;
                let members = member_count(conn, &row.team_hash).await?;
                if usize::try_from(members).unwrap_or(usize::MAX) >= TEAM_CAPACITY {
                    return Err(MembershipStoreError::capacity_exceeded(TEAM_CAPACITY));
                }
                diesel::insert_into(invites::table)
                    .values(&row)
                    .execute(conn)
                    .await?;
                Ok(created)
            }
            .scope_boxed()
        })
        .await
    }

    async fn accept_invite(
        &self,
        team: &TeamHash,
        user: &UserHash,
    ) -> Result<User, MembershipStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let conn = &mut *conn;
        let team = team.as_ref().to_owned();
        let user = user.as_ref().to_owned();
        conn.transaction::<User, MembershipStoreError, _>(|conn| {
            async move {
                let consumed = diesel::delete(
                    invites::table.filter(
                        invites::team_hash.eq(&team).and(invites::invited.eq(&user)),
                    ),
                )
                .execute(conn)
                .await?;
                if consumed == 0 {
                    return Err(MembershipStoreError::missing_row("invite"));
                }

                lock_team(conn, &team).await?;
                let members = member_count(conn, &team).await?;
                if usize::try_from(members).unwrap_or(usize::MAX) >= TEAM_CAPACITY {
                    return Err(MembershipStoreError::capacity_exceeded(TEAM_CAPACITY));
                }

                let row: UserRow = users::table
                    .filter(users::user_hash.eq(&user))
                    .for_update()
                    .select(UserRow::as_select())
                    .first(conn)
                    .await
                    .optional()?
                    .ok_or_else(|| MembershipStoreError::missing_row("user"))?;

                // Accepting implicitly leaves any prior team, dissolving it
                // when the accepter was its last member.
                if let Some(prior) = row.team_hash.filter(|prior| prior != &team) {
                    diesel::update(users::table.filter(users::user_hash.eq(&user)))
                        .set(users::team_hash.eq(None::<String>))
                        .execute(conn)
                        .await?;
                    if member_count(conn, &prior).await? == 0 {
                        dissolve_team(conn, &prior).await?;
                    }
                }

                let linked: UserRow = diesel::update(
                    users::table.filter(users::user_hash.eq(&user)),
                )
                .set(users::team_hash.eq(Some(team.clone())))
                .returning(UserRow::as_returning())
                .get_result(conn)
                .await?;

                // A full team has no open slot left to offer.
                if usize::try_from(members + 1).unwrap_or(usize::MAX) >= TEAM_CAPACITY {
                    diesel::delete(invites::table.filter(invites::team_hash.eq(&team)))
                        .execute(conn)
                        .await?;
                }
                linked.into_domain()
            }
            .scope_boxed()
        })
        .await
    }

    async fn delete_invite(
        &self,
        team: &TeamHash,
        invited: &UserHash,
    ) -> Result<(), MembershipStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let deleted = diesel::delete(
            invites::table.filter(
                invites::team_hash
                    .eq(team.as_ref())
                    .and(invites::invited.eq(invited.as_ref())),
            ),
        )
        .execute(&mut conn)
        .await?;
        if deleted == 0 {
            return Err(MembershipStoreError::missing_row("invite"));
        }
        Ok(())
    }

    async fn invites_for_user(
        &self,
        user: &UserHash,
    ) -> Result<Vec<Invite>, MembershipStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<InviteRow> = invites::table
            .filter(invites::invited.eq(user.as_ref()))
            .select(InviteRow::as_select())
            .load(&mut conn)
            .await?;
        rows.into_iter().map(InviteRow::into_domain).collect()
    }

    async fn invites_for_team(
        &self,
        team: &TeamHash,
    ) -> Result<Vec<Invite>, MembershipStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<InviteRow> = invites::table
            .filter(invites::team_hash.eq(team.as_ref()))
            .select(InviteRow::as_select())
            .load(&mut conn)
            .await?;
        rows.into_iter().map(InviteRow::into_domain).collect()
    }

    async fn insert_lobby(
        &self,
        name: String,
        scheduled_at: DateTime<Utc>,
        referee: Option<String>,
    ) -> Result<Lobby, MembershipStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: LobbyRow = diesel::insert_into(lobbies::table)
            .values(NewLobbyRow {
                lobby_name: name,
                lobby_time: scheduled_at,
                referee,
            })
            .returning(LobbyRow::as_returning())
            .get_result(&mut conn)
            .await?;
        Ok(row.into_domain())
    }

    async fn find_lobby(&self, lobby_id: i32) -> Result<Option<Lobby>, MembershipStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<LobbyRow> = lobbies::table
            .filter(lobbies::lobby_id.eq(lobby_id))
            .select(LobbyRow::as_select())
            .first(&mut conn)
            .await
            .optional()?;
        Ok(row.map(LobbyRow::into_domain))
    }

    async fn list_lobbies(&self) -> Result<Vec<Lobby>, MembershipStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<LobbyRow> = lobbies::table
            .order(lobbies::lobby_id.asc())
            .select(LobbyRow::as_select())
            .load(&mut conn)
            .await?;
        Ok(rows.into_iter().map(LobbyRow::into_domain).collect())
    }

    async fn delete_lobby(&self, lobby_id: i32) -> Result<Lobby, MembershipStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let conn = &mut *conn;
        conn.transaction::<Lobby, MembershipStoreError, _>(|conn| {
            async move {
                diesel::update(teams::table.filter(teams::lobby_id.eq(lobby_id)))
                    .set(teams::lobby_id.eq(None::<i32>))
                    .execute(conn)
                    .await?;
                let row: Option<LobbyRow> =
                    diesel::delete(lobbies::table.filter(lobbies::lobby_id.eq(lobby_id)))
                        .returning(LobbyRow::as_returning())
                        .get_result(conn)
                        .await
                        .optional()?;
                row.map(LobbyRow::into_domain)
                    .ok_or_else(|| MembershipStoreError::missing_row("lobby"))
            }
            .scope_boxed()
        })
        .await
    }

    async fn set_referee(
        &self,
        lobby_id: i32,
        referee: String,
    ) -> Result<Lobby, MembershipStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<LobbyRow> =
            diesel::update(lobbies::table.filter(lobbies::lobby_id.eq(lobby_id)))
                .set(lobbies::referee.eq(Some(referee)))
                .returning(LobbyRow::as_returning())
                .get_result(&mut conn)
                .await
                .optional()?;
        row.map(LobbyRow::into_domain)
            .ok_or_else(|| MembershipStoreError::missing_row("lobby"))
    }

    async fn lobby_roster(&self, lobby_id: i32) -> Result<Vec<Team>, MembershipStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<TeamRow> = teams::table
            .filter(teams::lobby_id.eq(lobby_id))
            .order(teams::title.asc())
            .select(TeamRow::as_select())
            .load(&mut conn)
            .await?;
        rows.into_iter().map(TeamRow::into_domain).collect()
    }

    async fn assign_team_to_lobby(
        &self,
        team: &TeamHash,
        lobby_id: i32,
    ) -> Result<Team, MembershipStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let conn = &mut *conn;
        let team = team.as_ref().to_owned();
        conn.transaction::<Team, MembershipStoreError, _>(|conn| {
            async move {
                let locked: Option<LobbyRow> = lobbies::table
                    .filter(lobbies::lobby_id.eq(lobby_id))
                    .for_update()
                    .select(LobbyRow::as_select())
                    .first(conn)
                    .await
                    .optional()?;
                if locked.is_none() {
                    return Err(MembershipStoreError::missing_row("lobby"));
                }

                // Re-assignment to the same lobby must not count the team
                // against its own slot.
                let occupied: i64 = teams::table
                    .filter(
                        teams::lobby_id
                            .eq(lobby_id)
                            .and(teams::team_hash.ne(&team)),
                    )
                    .count()
                    .get_result(conn)
                    .await?;
                if usize::try_from(occupied).unwrap_or(usize::MAX) >= LOBBY_CAPACITY {
                    return Err(MembershipStoreError::capacity_exceeded(LOBBY_CAPACITY));
                }

                let row: Option<TeamRow> =
                    diesel::update(teams::table.filter(teams::team_hash.eq(&team)))
                        .set(teams::lobby_id.eq(Some(lobby_id)))
                        .returning(TeamRow::as_returning())
                        .get_result(conn)
                        .await
                        .optional()?;
                row.ok_or_else(|| MembershipStoreError::missing_row("team"))?
                    .into_domain()
            }
            .scope_boxed()
        })
        .await
    }

    async fn clear_lobby_assignment(
        &self,
        team: &TeamHash,
    ) -> Result<Team, MembershipStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<TeamRow> =
            diesel::update(teams::table.filter(teams::team_hash.eq(team.as_ref())))
                .set(teams::lobby_id.eq(None::<i32>))
                .returning(TeamRow::as_returning())
                .get_result(&mut conn)
                .await
                .optional()?;
        row.ok_or_else(|| MembershipStoreError::missing_row("team"))?
            .into_domain()
    }
}
