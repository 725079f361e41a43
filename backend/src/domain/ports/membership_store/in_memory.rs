//! In-memory membership store used by tests and local development.
//!
//! Serialises every operation through one mutex, which makes each call
//! trivially atomic and lets service tests exercise the full state machine
//! without a database.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::lobby::LOBBY_CAPACITY;
use crate::domain::team::TEAM_CAPACITY;
use crate::domain::{DiscordIdentity, Invite, Lobby, Team, TeamHash, User, UserHash};

use super::{MembershipChange, MembershipStore, MembershipStoreError};

#[derive(Debug, Default)]
struct Inner {
    users: Vec<User>,
    teams: Vec<Team>,
    invites: Vec<Invite>,
    lobbies: Vec<Lobby>,
    next_lobby_id: i32,
}

impl Inner {
    fn user(&self, hash: &UserHash) -> Option<&User> {
        self.users.iter().find(|u| &u.user_hash == hash)
    }

    fn user_mut(&mut self, hash: &UserHash) -> Option<&mut User> {
        self.users.iter_mut().find(|u| &u.user_hash == hash)
    }

    fn member_count(&self, team: &TeamHash) -> usize {
        self.users
            .iter()
            .filter(|u| u.team_hash.as_ref() == Some(team))
            .count()
    }

    fn team_mut(&mut self, hash: &TeamHash) -> Option<&mut Team> {
        self.teams.iter_mut().find(|t| &t.team_hash == hash)
    }

    /// Delete a team, its invites, and every member link pointing at it.
    fn dissolve_team(&mut self, hash: &TeamHash) {
        for user in &mut self.users {
            if user.team_hash.as_ref() == Some(hash) {
                user.team_hash = None;
            }
        }
        self.invites.retain(|i| &i.team_hash != hash);
        self.teams.retain(|t| &t.team_hash != hash);
    }

    /// Detach one member, dissolving the team when it would be left empty.
    fn detach_member(
        &mut self,
        user: &UserHash,
    ) -> Result<MembershipChange, MembershipStoreError> {
        let team_hash = self
            .user(user)
            .ok_or_else(|| MembershipStoreError::missing_row("user"))?
            .team_hash
            .clone()
            .ok_or_else(|| MembershipStoreError::stale_link("user has no team link"))?;

        if let Some(record) = self.user_mut(user) {
            record.team_hash = None;
        }

        let remaining = self.member_count(&team_hash);
        let dissolved = remaining == 0;
        if dissolved {
            self.dissolve_team(&team_hash);
        }

        Ok(MembershipChange {
            team_hash,
            remaining,
            dissolved,
        })
    }
}

/// Mutex-backed implementation of [`MembershipStore`].
///
/// # Examples
/// ```
/// use tourney_backend::domain::ports::{InMemoryMembershipStore, MembershipStore};
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let store = InMemoryMembershipStore::default();
/// assert!(store.list_users().await.expect("listable").is_empty());
/// # });
/// ```
#[derive(Debug, Default)]
pub struct InMemoryMembershipStore {
    inner: Mutex<Inner>,
}

impl InMemoryMembershipStore {
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>, MembershipStoreError> {
        self.inner
            .lock()
            .map_err(|_| MembershipStoreError::connection("store mutex poisoned"))
    }
}

#[async_trait]
impl MembershipStore for InMemoryMembershipStore {
    async fn find_user(&self, hash: &UserHash) -> Result<Option<User>, MembershipStoreError> {
        Ok(self.lock()?.user(hash).cloned())
    }

    async fn find_user_by_osu_id(
        &self,
        osu_id: i64,
    ) -> Result<Option<User>, MembershipStoreError> {
        Ok(self
            .lock()?
            .users
            .iter()
            .find(|u| u.osu.osu_id == osu_id)
            .cloned())
    }

    async fn insert_user(&self, user: &User) -> Result<(), MembershipStoreError> {
        let mut inner = self.lock()?;
        if inner
            .users
            .iter()
            .any(|u| u.osu.osu_id == user.osu.osu_id || u.user_hash == user.user_hash)
        {
            return Err(MembershipStoreError::duplicate_key("user already registered"));
        }
        inner.users.push(user.clone());
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<User>, MembershipStoreError> {
        Ok(self.lock()?.users.clone())
    }

    async fn set_discord(
        &self,
        hash: &UserHash,
        discord: Option<DiscordIdentity>,
    ) -> Result<User, MembershipStoreError> {
        let mut inner = self.lock()?;
        let user = inner
            .user_mut(hash)
            .ok_or_else(|| MembershipStoreError::missing_row("user"))?;
        user.discord = discord;
        Ok(user.clone())
    }

    async fn ban_user(&self, osu_id: i64) -> Result<User, MembershipStoreError> {
        let mut inner = self.lock()?;
        let user = inner
            .users
            .iter_mut()
            .find(|u| u.osu.osu_id == osu_id)
            .ok_or_else(|| MembershipStoreError::missing_row("user"))?;
        user.is_banned = true;
        let hash = user.user_hash.clone();
        let team = user.team_hash.clone();
        if let Some(team) = team {
            // Ban cascade: the team dissolves even with a surviving teammate.
            inner.dissolve_team(&team);
        }
        inner
            .user(&hash)
            .cloned()
            .ok_or_else(|| MembershipStoreError::missing_row("user"))
    }

    async fn unban_user(&self, osu_id: i64) -> Result<User, MembershipStoreError> {
        let mut inner = self.lock()?;
        let user = inner
            .users
            .iter_mut()
            .find(|u| u.osu.osu_id == osu_id)
            .ok_or_else(|| MembershipStoreError::missing_row("user"))?;
        user.is_banned = false;
        Ok(user.clone())
    }

    async fn find_team(&self, hash: &TeamHash) -> Result<Option<Team>, MembershipStoreError> {
        Ok(self
            .lock()?
            .teams
            .iter()
            .find(|t| &t.team_hash == hash)
            .cloned())
    }

    async fn list_teams(
        &self,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<Team>, MembershipStoreError> {
        Ok(self
            .lock()?
            .teams
            .iter()
            .skip(skip)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn team_members(&self, hash: &TeamHash) -> Result<Vec<User>, MembershipStoreError> {
        Ok(self
            .lock()?
            .users
            .iter()
            .filter(|u| u.team_hash.as_ref() == Some(hash))
            .cloned()
            .collect())
    }

    async fn create_team(
        &self,
        team: &Team,
        owner: &UserHash,
    ) -> Result<Team, MembershipStoreError> {
        let mut inner = self.lock()?;
        let record = inner
            .user(owner)
            .ok_or_else(|| MembershipStoreError::missing_row("user"))?;
        if record.team_hash.is_some() {
            return Err(MembershipStoreError::stale_link("owner already has a team"));
        }
        inner.teams.push(team.clone());
        if let Some(record) = inner.user_mut(owner) {
            record.team_hash = Some(team.team_hash.clone());
        }
        // Founding a team resolves every invite addressed to the founder.
        inner.invites.retain(|i| &i.invited != owner);
        Ok(team.clone())
    }

    async fn remove_member(
        &self,
        user: &UserHash,
    ) -> Result<MembershipChange, MembershipStoreError> {
        self.lock()?.detach_member(user)
    }

    async fn set_team_avatar(
        &self,
        hash: &TeamHash,
        avatar_url: String,
    ) -> Result<Team, MembershipStoreError> {
        let mut inner = self.lock()?;
        let team = inner
            .team_mut(hash)
            .ok_or_else(|| MembershipStoreError::missing_row("team"))?;
        team.avatar_url = Some(avatar_url);
        Ok(team.clone())
    }

    async fn create_invite(&self, invite: &Invite) -> Result<Invite, MembershipStoreError> {
        let mut inner = self.lock()?;
        if inner.member_count(&invite.team_hash) >= TEAM_CAPACITY {
            return Err(MembershipStoreError::capacity_exceeded(TEAM_CAPACITY));
        }
        if inner
            .invites
            .iter()
            .any(|i| i.team_hash == invite.team_hash && i.invited == invite.invited)
        {
            return Err(MembershipStoreError::duplicate_key(
                "invite for this team and user already exists",
            ));
        }
        inner.invites.push(invite.clone());
        Ok(invite.clone())
    }

    async fn accept_invite(
        &self,
        team: &TeamHash,
        user: &UserHash,
    ) -> Result<User, MembershipStoreError> {
        let mut inner = self.lock()?;
        let position = inner
            .invites
            .iter()
            .position(|i| &i.team_hash == team && &i.invited == user)
            .ok_or_else(|| MembershipStoreError::missing_row("invite"))?;
        if inner.member_count(team) >= TEAM_CAPACITY {
            return Err(MembershipStoreError::capacity_exceeded(TEAM_CAPACITY));
        }
        inner.invites.remove(position);
        let prior = inner
            .user(user)
            .ok_or_else(|| MembershipStoreError::missing_row("user"))?
            .team_hash
            .clone();
        if prior.is_some() {
            inner.detach_member(user)?;
        }
        if let Some(record) = inner.user_mut(user) {
            record.team_hash = Some(team.clone());
        }
        // The team is full now; every other pending offer is void.
        inner.invites.retain(|i| &i.team_hash != team);
        inner
            .user(user)
            .cloned()
            .ok_or_else(|| MembershipStoreError::missing_row("user"))
    }

    async fn delete_invite(
        &self,
        team: &TeamHash,
        invited: &UserHash,
    ) -> Result<(), MembershipStoreError> {
        let mut inner = self.lock()?;
        let position = inner
            .invites
            .iter()
            .position(|i| &i.team_hash == team && &i.invited == invited)
            .ok_or_else(|| MembershipStoreError::missing_row("invite"))?;
        inner.invites.remove(position);
        Ok(())
    }

    async fn invites_for_user(
        &self,
        user: &UserHash,
    ) -> Result<Vec<Invite>, MembershipStoreError> {
        Ok(self
            .lock()?
            .invites
            .iter()
            .filter(|i| &i.invited == user)
            .cloned()
            .collect())
    }

    async fn invites_for_team(
        &self,
        team: &TeamHash,
    ) -> Result<Vec<Invite>, MembershipStoreError> {
        Ok(self
            .lock()?
            .invites
            .iter()
            .filter(|i| &i.team_hash == team)
            .cloned()
            .collect())
    }

    async fn insert_lobby(
        &self,
        name: String,
        scheduled_at: DateTime<Utc>,
        referee: Option<String>,
    ) -> Result<Lobby, MembershipStoreError> {
        let mut inner = self.lock()?;
        inner.next_lobby_id += 1;
        let lobby = Lobby {
            lobby_id: inner.next_lobby_id,
            lobby_name: name,
            lobby_time: scheduled_at,
            referee,
        };
        inner.lobbies.push(lobby.clone());
        Ok(lobby)
    }

    async fn find_lobby(&self, lobby_id: i32) -> Result<Option<Lobby>, MembershipStoreError> {
        Ok(self
            .lock()?
            .lobbies
            .iter()
            .find(|l| l.lobby_id == lobby_id)
            .cloned())
    }

    async fn list_lobbies(&self) -> Result<Vec<Lobby>, MembershipStoreError> {
        Ok(self.lock()?.lobbies.clone())
    }

    async fn delete_lobby(&self, lobby_id: i32) -> Result<Lobby, MembershipStoreError> {
        let mut inner = self.lock()?;
        let position = inner
            .lobbies
            .iter()
            .position(|l| l.lobby_id == lobby_id)
            .ok_or_else(|| MembershipStoreError::missing_row("lobby"))?;
        let lobby = inner.lobbies.remove(position);
        for team in &mut inner.teams {
            if team.lobby_id == Some(lobby_id) {
                team.lobby_id = None;
            }
        }
        Ok(lobby)
    }

    async fn set_referee(
        &self,
        lobby_id: i32,
        referee: String,
    ) -> Result<Lobby, MembershipStoreError> {
        let mut inner = self.lock()?;
        let lobby = inner
            .lobbies
            .iter_mut()
            .find(|l| l.lobby_id == lobby_id)
            .ok_or_else(|| MembershipStoreError::missing_row("lobby"))?;
        lobby.referee = Some(referee);
        Ok(lobby.clone())
    }

    async fn lobby_roster(&self, lobby_id: i32) -> Result<Vec<Team>, MembershipStoreError> {
        Ok(self
            .lock()?
            .teams
            .iter()
            .filter(|t| t.lobby_id == Some(lobby_id))
            .cloned()
            .collect())
    }

    async fn assign_team_to_lobby(
        &self,
        team: &TeamHash,
        lobby_id: i32,
    ) -> Result<Team, MembershipStoreError> {
        let mut inner = self.lock()?;
        if !inner.lobbies.iter().any(|l| l.lobby_id == lobby_id) {
            return Err(MembershipStoreError::missing_row("lobby"));
        }
        let roster = inner
            .teams
            .iter()
            .filter(|t| t.lobby_id == Some(lobby_id) && &t.team_hash != team)
            .count();
        if roster >= LOBBY_CAPACITY {
            return Err(MembershipStoreError::capacity_exceeded(LOBBY_CAPACITY));
        }
        let record = inner
            .team_mut(team)
            .ok_or_else(|| MembershipStoreError::missing_row("team"))?;
        record.lobby_id = Some(lobby_id);
        Ok(record.clone())
    }

    async fn clear_lobby_assignment(
        &self,
        team: &TeamHash,
    ) -> Result<Team, MembershipStoreError> {
        let mut inner = self.lock()?;
        let record = inner
            .team_mut(team)
            .ok_or_else(|| MembershipStoreError::missing_row("team"))?;
        record.lobby_id = None;
        Ok(record.clone())
    }
}
