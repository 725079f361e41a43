//! Driven port owning all User/Team/Invite/Lobby records.
//!
//! The membership store is the only component allowed to mutate relationship
//! rows. Compound operations (team creation, invite acceptance, cascades) are
//! contractually atomic: adapters run them as single transactions so no
//! intermediate state is ever observable, and re-check their guards at write
//! time so concurrent callers serialise instead of both succeeding.
//!
//! Engines pre-validate with reads and map the guard failures raised here to
//! the spec's rejection codes; the store itself stays policy-light and speaks
//! in terms of rows, guards, and capacities.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{DiscordIdentity, Invite, Lobby, Team, TeamHash, User, UserHash};

/// Errors raised by membership store adapters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MembershipStoreError {
    /// Store connection could not be established.
    #[error("membership store connection failed: {message}")]
    Connection {
        /// Adapter-provided diagnostic.
        message: String,
    },

    /// Query or mutation failed during execution.
    #[error("membership store query failed: {message}")]
    Query {
        /// Adapter-provided diagnostic.
        message: String,
    },

    /// A row this operation depends on does not exist.
    #[error("no {entity} row matches the request")]
    MissingRow {
        /// Entity kind, e.g. `"user"` or `"invite"`.
        entity: String,
    },

    /// A uniqueness constraint rejected the write.
    #[error("duplicate key: {message}")]
    DuplicateKey {
        /// Adapter-provided diagnostic.
        message: String,
    },

    /// A capacity guard rejected the write.
    #[error("capacity of {limit} already reached")]
    CapacityExceeded {
        /// The enforced capacity.
        limit: usize,
    },

    /// A state guard observed at read time no longer held at write time.
    #[error("stale link: {message}")]
    StaleLink {
        /// Which guard failed.
        message: String,
    },
}

impl MembershipStoreError {
    /// Create a connection error with the given message.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Create a query error with the given message.
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
        }
    }

    /// Create a missing-row error for the given entity kind.
    pub fn missing_row(entity: impl Into<String>) -> Self {
        Self::MissingRow {
            entity: entity.into(),
        }
    }

    /// Create a duplicate-key error with the given message.
    pub fn duplicate_key(message: impl Into<String>) -> Self {
        Self::DuplicateKey {
            message: message.into(),
        }
    }

    /// Create a capacity error for the given limit.
    pub fn capacity_exceeded(limit: usize) -> Self {
        Self::CapacityExceeded { limit }
    }

    /// Create a stale-link error with the given message.
    pub fn stale_link(message: impl Into<String>) -> Self {
        Self::StaleLink {
            message: message.into(),
        }
    }
}

/// Outcome of detaching a member from their team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MembershipChange {
    /// The team the user left.
    #[schema(value_type = String)]
    pub team_hash: TeamHash,
    /// Members remaining after the detach.
    pub remaining: usize,
    /// Whether the team was dissolved because it would have been empty.
    pub dissolved: bool,
}

/// Port for durable membership state.
///
/// # Atomicity contract
///
/// Every `&self` method is one logical transaction. Methods documented with
/// guards re-check them inside that transaction; a lost race surfaces as
/// [`MembershipStoreError::StaleLink`], [`DuplicateKey`], or
/// [`CapacityExceeded`] rather than a double write.
///
/// [`DuplicateKey`]: MembershipStoreError::DuplicateKey
/// [`CapacityExceeded`]: MembershipStoreError::CapacityExceeded
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MembershipStore: Send + Sync {
    // --- users ---

    /// Fetch a user by their opaque hash.
    async fn find_user(&self, hash: &UserHash) -> Result<Option<User>, MembershipStoreError>;

    /// Fetch a user by their primary provider id.
    async fn find_user_by_osu_id(
        &self,
        osu_id: i64,
    ) -> Result<Option<User>, MembershipStoreError>;

    /// Insert a freshly registered user.
    ///
    /// Fails with [`MembershipStoreError::DuplicateKey`] when the provider id
    /// or hash is already registered.
    async fn insert_user(&self, user: &User) -> Result<(), MembershipStoreError>;

    /// List all registered users.
    async fn list_users(&self) -> Result<Vec<User>, MembershipStoreError>;

    /// Attach or detach the secondary identity as a unit.
    async fn set_discord(
        &self,
        hash: &UserHash,
        discord: Option<DiscordIdentity>,
    ) -> Result<User, MembershipStoreError>;

    /// Set the ban flag and, when the user has a team, dissolve that team and
    /// its invites in the same transaction.
    async fn ban_user(&self, osu_id: i64) -> Result<User, MembershipStoreError>;

    /// Clear the ban flag. Never restores a dissolved team.
    async fn unban_user(&self, osu_id: i64) -> Result<User, MembershipStoreError>;

    // --- teams ---

    /// Fetch a team by its hash.
    async fn find_team(&self, hash: &TeamHash) -> Result<Option<Team>, MembershipStoreError>;

    /// List teams with offset pagination.
    async fn list_teams(&self, skip: usize, limit: usize)
        -> Result<Vec<Team>, MembershipStoreError>;

    /// List the members currently linked to a team.
    async fn team_members(&self, hash: &TeamHash) -> Result<Vec<User>, MembershipStoreError>;

    /// Persist a new team with `owner` as sole member.
    ///
    /// Guards `owner.team_hash IS NULL`; deletes every pending invite
    /// addressed to the owner in the same transaction.
    async fn create_team(
        &self,
        team: &Team,
        owner: &UserHash,
    ) -> Result<Team, MembershipStoreError>;

    /// Detach `user` from their team.
    ///
    /// When the team would be left empty it is deleted together with all
    /// invites referencing it; a team row is never observable with zero
    /// members. Fails with [`MembershipStoreError::StaleLink`] when the user
    /// has no team link at write time.
    async fn remove_member(
        &self,
        user: &UserHash,
    ) -> Result<MembershipChange, MembershipStoreError>;

    /// Set the team's avatar URL.
    async fn set_team_avatar(
        &self,
        hash: &TeamHash,
        avatar_url: String,
    ) -> Result<Team, MembershipStoreError>;

    // --- invites ---

    /// Persist a pending invite.
    ///
    /// Guards the team's capacity and the `(team, invited)` uniqueness key.
    async fn create_invite(&self, invite: &Invite) -> Result<Invite, MembershipStoreError>;

    /// Consume the invite for `(team, user)` and link the user as a member.
    ///
    /// Re-checks the team's capacity, detaches the user from any prior team
    /// (dissolving it when empty), and purges every other pending invite for
    /// the now-full team — all in one transaction.
    async fn accept_invite(
        &self,
        team: &TeamHash,
        user: &UserHash,
    ) -> Result<User, MembershipStoreError>;

    /// Delete the single invite matching `(team, invited)`.
    async fn delete_invite(
        &self,
        team: &TeamHash,
        invited: &UserHash,
    ) -> Result<(), MembershipStoreError>;

    /// Pending invites addressed to a user.
    async fn invites_for_user(
        &self,
        user: &UserHash,
    ) -> Result<Vec<Invite>, MembershipStoreError>;

    /// Pending invites issued by a team.
    async fn invites_for_team(
        &self,
        team: &TeamHash,
    ) -> Result<Vec<Invite>, MembershipStoreError>;

    // --- lobbies ---

    /// Persist a new lobby slot and return it with its assigned id.
    async fn insert_lobby(
        &self,
        name: String,
        scheduled_at: DateTime<Utc>,
        referee: Option<String>,
    ) -> Result<Lobby, MembershipStoreError>;

    /// Fetch a lobby by id.
    async fn find_lobby(&self, lobby_id: i32) -> Result<Option<Lobby>, MembershipStoreError>;

    /// List all lobby slots.
    async fn list_lobbies(&self) -> Result<Vec<Lobby>, MembershipStoreError>;

    /// Delete a lobby, clearing every roster assignment referencing it.
    async fn delete_lobby(&self, lobby_id: i32) -> Result<Lobby, MembershipStoreError>;

    /// Assign a referee to a lobby.
    async fn set_referee(
        &self,
        lobby_id: i32,
        referee: String,
    ) -> Result<Lobby, MembershipStoreError>;

    /// Teams currently assigned to a lobby.
    async fn lobby_roster(&self, lobby_id: i32) -> Result<Vec<Team>, MembershipStoreError>;

    /// Point the team's lobby reference at `lobby_id`, replacing any prior
    /// assignment.
    ///
    /// Guards the roster capacity inside the transaction.
    async fn assign_team_to_lobby(
        &self,
        team: &TeamHash,
        lobby_id: i32,
    ) -> Result<Team, MembershipStoreError>;

    /// Clear the team's lobby reference. Idempotent.
    async fn clear_lobby_assignment(
        &self,
        team: &TeamHash,
    ) -> Result<Team, MembershipStoreError>;
}

mod in_memory;

pub use in_memory::InMemoryMembershipStore;
