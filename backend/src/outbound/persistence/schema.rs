//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match the database migrations exactly; Diesel uses
//! them for compile-time query validation. Regenerate with
//! `diesel print-schema` when migrations change.

diesel::table! {
    /// Registered players.
    ///
    /// The opaque hash is the primary key; the osu! id carries its own unique
    /// index so re-authentication maps back to the existing row.
    users (user_hash) {
        /// Stable opaque identifier (lowercase hex digest).
        user_hash -> Varchar,
        /// osu! account id, unique.
        osu_id -> Int8,
        /// Display name on osu!.
        osu_username -> Varchar,
        /// Avatar URL served by osu!.
        osu_avatar_url -> Varchar,
        /// Global rank at registration; null for unranked players.
        osu_global_rank -> Nullable<Int8>,
        /// Badge-weighted rank computed at registration.
        bws_rank -> Int8,
        /// Number of qualifying badges.
        badges -> Int4,
        /// Discord snowflake id; null until linked.
        discord_id -> Nullable<Varchar>,
        /// Discord display tag; null until linked.
        discord_tag -> Nullable<Varchar>,
        /// Discord CDN avatar URL; null until linked.
        discord_avatar_url -> Nullable<Varchar>,
        /// Moderation flag.
        is_banned -> Bool,
        /// Moderation and lobby-management privileges.
        is_admin -> Bool,
        /// Current team membership; null when unlinked.
        team_hash -> Nullable<Varchar>,
    }
}

diesel::table! {
    /// Two-player teams.
    teams (team_hash) {
        /// Opaque random identifier (lowercase hex digest).
        team_hash -> Varchar,
        /// Display title, at most sixteen printable ASCII characters.
        title -> Varchar,
        /// Avatar URL on the image host; null until uploaded.
        avatar_url -> Nullable<Varchar>,
        /// Qualifier lobby assignment; null when unassigned.
        lobby_id -> Nullable<Int4>,
    }
}

diesel::table! {
    /// Pending team invites, unique per `(team, invited)` pair.
    invites (team_hash, invited) {
        /// Team offering the slot.
        team_hash -> Varchar,
        /// Member who issued the invite.
        inviter -> Varchar,
        /// Prospective member the offer is addressed to.
        invited -> Varchar,
    }
}

diesel::table! {
    /// Qualifier lobby slots.
    lobbies (lobby_id) {
        /// Sequential slot identifier (serial).
        lobby_id -> Int4,
        /// Display name, e.g. `"Qualifier A"`.
        lobby_name -> Varchar,
        /// Scheduled start time.
        lobby_time -> Timestamptz,
        /// osu! username of the assigned referee; null when unassigned.
        referee -> Nullable<Varchar>,
    }
}

diesel::allow_tables_to_appear_in_same_query!(users, teams, invites, lobbies);
