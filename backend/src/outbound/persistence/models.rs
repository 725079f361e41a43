//! Diesel row structs and their conversions to domain types.
//!
//! Rows are internal to the persistence layer; adapters convert them at the
//! boundary and never leak them to the domain. A row whose stored hash fails
//! validation is reported as a query error rather than a panic, since it can
//! only mean the table was written by something other than this adapter.

use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::domain::ports::MembershipStoreError;
use crate::domain::{
    DiscordIdentity, Invite, Lobby, OsuIdentity, Team, TeamHash, TeamTitle, User, UserHash,
};

use super::schema::{invites, lobbies, teams, users};

/// Full user row as stored.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UserRow {
    pub user_hash: String,
    pub osu_id: i64,
    pub osu_username: String,
    pub osu_avatar_url: String,
    pub osu_global_rank: Option<i64>,
    pub bws_rank: i64,
    pub badges: i32,
    pub discord_id: Option<String>,
    pub discord_tag: Option<String>,
    pub discord_avatar_url: Option<String>,
    pub is_banned: bool,
    pub is_admin: bool,
    pub team_hash: Option<String>,
}

impl UserRow {
    /// Flatten a domain user into its stored representation.
    pub fn from_domain(user: &User) -> Self {
        Self {
            user_hash: user.user_hash.as_ref().to_owned(),
            osu_id: user.osu.osu_id,
            osu_username: user.osu.osu_username.clone(),
            osu_avatar_url: user.osu.osu_avatar_url.clone(),
            osu_global_rank: user.osu.osu_global_rank,
            bws_rank: user.osu.bws_rank,
            badges: user.osu.badges,
            discord_id: user.discord.as_ref().map(|d| d.discord_id.clone()),
            discord_tag: user.discord.as_ref().map(|d| d.discord_tag.clone()),
            discord_avatar_url: user.discord.as_ref().map(|d| d.discord_avatar_url.clone()),
            is_banned: user.is_banned,
            is_admin: user.is_admin,
            team_hash: user.team_hash.as_ref().map(|t| t.as_ref().to_owned()),
        }
    }

    /// Rebuild the domain user from the stored row.
    ///
    /// The Discord identity is present only when all three of its columns
    /// are; partially written identities are treated as absent.
    pub fn into_domain(self) -> Result<User, MembershipStoreError> {
        let user_hash = parse_user_hash(self.user_hash)?;
        let team_hash = self.team_hash.map(parse_team_hash).transpose()?;
        let discord = match (self.discord_id, self.discord_tag, self.discord_avatar_url) {
            (Some(discord_id), Some(discord_tag), Some(discord_avatar_url)) => {
                Some(DiscordIdentity {
                    discord_id,
                    discord_tag,
                    discord_avatar_url,
                })
            }
            _ => None,
        };
        Ok(User {
            user_hash,
            osu: OsuIdentity {
                osu_id: self.osu_id,
                osu_username: self.osu_username,
                osu_avatar_url: self.osu_avatar_url,
                osu_global_rank: self.osu_global_rank,
                bws_rank: self.bws_rank,
                badges: self.badges,
            },
            discord,
            is_banned: self.is_banned,
            is_admin: self.is_admin,
            team_hash,
        })
    }
}

/// Full team row as stored.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = teams)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TeamRow {
    pub team_hash: String,
    pub title: String,
    pub avatar_url: Option<String>,
    pub lobby_id: Option<i32>,
}

impl TeamRow {
    /// Flatten a domain team into its stored representation.
    pub fn from_domain(team: &Team) -> Self {
        Self {
            team_hash: team.team_hash.as_ref().to_owned(),
            title: team.title.as_ref().to_owned(),
            avatar_url: team.avatar_url.clone(),
            lobby_id: team.lobby_id,
        }
    }

    /// Rebuild the domain team from the stored row.
    pub fn into_domain(self) -> Result<Team, MembershipStoreError> {
        let team_hash = parse_team_hash(self.team_hash)?;
        let title = TeamTitle::new(self.title)
            .map_err(|err| MembershipStoreError::query(format!("corrupt team row: {err}")))?;
        Ok(Team {
            team_hash,
            title,
            avatar_url: self.avatar_url,
            lobby_id: self.lobby_id,
        })
    }
}

/// Full invite row as stored.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = invites)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct InviteRow {
    pub team_hash: String,
    pub inviter: String,
    pub invited: String,
}

impl InviteRow {
    /// Flatten a domain invite into its stored representation.
    pub fn from_domain(invite: &Invite) -> Self {
        Self {
            team_hash: invite.team_hash.as_ref().to_owned(),
            inviter: invite.inviter.as_ref().to_owned(),
            invited: invite.invited.as_ref().to_owned(),
        }
    }

    /// Rebuild the domain invite from the stored row.
    pub fn into_domain(self) -> Result<Invite, MembershipStoreError> {
        Ok(Invite {
            team_hash: parse_team_hash(self.team_hash)?,
            inviter: parse_user_hash(self.inviter)?,
            invited: parse_user_hash(self.invited)?,
        })
    }
}

/// Full lobby row as stored.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = lobbies)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct LobbyRow {
    pub lobby_id: i32,
    pub lobby_name: String,
    pub lobby_time: DateTime<Utc>,
    pub referee: Option<String>,
}

impl LobbyRow {
    /// Rebuild the domain lobby from the stored row.
    pub fn into_domain(self) -> Lobby {
        Lobby {
            lobby_id: self.lobby_id,
            lobby_name: self.lobby_name,
            lobby_time: self.lobby_time,
            referee: self.referee,
        }
    }
}

/// Insertable lobby row; the id is assigned by the serial column.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = lobbies)]
pub struct NewLobbyRow {
    pub lobby_name: String,
    pub lobby_time: DateTime<Utc>,
    pub referee: Option<String>,
}

fn parse_user_hash(raw: String) -> Result<UserHash, MembershipStoreError> {
    UserHash::parse(raw)
        .map_err(|err| MembershipStoreError::query(format!("corrupt user row: {err}")))
}

fn parse_team_hash(raw: String) -> Result<TeamHash, MembershipStoreError> {
    TeamHash::parse(raw)
        .map_err(|err| MembershipStoreError::query(format!("corrupt team row: {err}")))
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use crate::domain::HashSecret;

    fn user_row() -> UserRow {
        UserRow {
            user_hash: UserHash::derive(7, &HashSecret::new("rows")).as_ref().to_owned(),
            osu_id: 7,
            osu_username: "peppy".into(),
            osu_avatar_url: "https://a.ppy.sh/7".into(),
            osu_global_rank: Some(500),
            bws_rank: 500,
            badges: 0,
            discord_id: None,
            discord_tag: None,
            discord_avatar_url: None,
            is_banned: false,
            is_admin: false,
            team_hash: None,
        }
    }

    #[test]
    fn user_row_round_trips_through_the_domain() {
        let row = user_row();
        let user = row.clone().into_domain().expect("valid row");
        let back = UserRow::from_domain(&user);
        assert_eq!(back.user_hash, row.user_hash);
        assert_eq!(back.osu_id, row.osu_id);
        assert!(back.discord_id.is_none());
    }

    #[test]
    fn partial_discord_columns_read_as_unlinked() {
        let mut row = user_row();
        row.discord_id = Some("123".into());
        let user = row.into_domain().expect("valid row");
        assert!(user.discord.is_none());
    }

    #[test]
    fn corrupt_hashes_surface_as_query_errors() {
        let mut row = user_row();
        row.user_hash = "NOT-HEX".into();
        let err = row.into_domain().expect_err("corrupt hash must fail");
        assert!(matches!(err, MembershipStoreError::Query { .. }));
    }

    #[test]
    fn team_row_round_trips_through_the_domain() {
        let team = Team::new(
            TeamHash::random(),
            TeamTitle::new("Duo Deluxe").expect("title"),
        );
        let row = TeamRow::from_domain(&team);
        let back = row.into_domain().expect("valid row");
        assert_eq!(back, team);
    }
}
