//! User aggregate and provider identity blocks.
//!
//! A user is created on first successful osu! authentication and never
//! deleted; moderation is a flag, not removal. The Discord identity is
//! attached and detached as a unit, so `discord` is a single `Option` rather
//! than three independently nullable columns.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::identity::{TeamHash, UserHash};

/// Badge descriptions containing any of these words do not count towards the
/// badge-weighted rank; they reward other modes or non-playing contributions.
const BADGE_WORD_FILTER: [&str; 14] = [
    "taiko",
    "catch",
    "mania",
    "mapping",
    "nominator",
    "nomination",
    "beatmap",
    "contribution",
    "mappers'",
    "mapper's",
    "mapper",
    "spotlight",
    "playlist",
    "fanart",
];

/// Count the badges that qualify for rank weighting.
///
/// # Examples
/// ```
/// use tourney_backend::domain::user::qualifying_badges;
///
/// let count = qualifying_badges(["Tournament winner", "Beatmap Spotlight"].iter().copied());
/// assert_eq!(count, 1);
/// ```
pub fn qualifying_badges<'a>(descriptions: impl Iterator<Item = &'a str>) -> i32 {
    let mut count = 0;
    for description in descriptions {
        let lowered = description.to_lowercase();
        if BADGE_WORD_FILTER.iter().any(|word| lowered.contains(word)) {
            continue;
        }
        count += 1;
    }
    count
}

/// Badge-weighted seeding rank: `round(rank ^ (0.9937 ^ badges²))`.
///
/// Unranked or negative inputs collapse to zero, matching the published
/// seeding formula. This is a reporting field only; the membership state
/// machine never reads it.
///
/// # Examples
/// ```
/// use tourney_backend::domain::user::bws_rank;
///
/// assert_eq!(bws_rank(Some(1000), 0), 1000);
/// assert!(bws_rank(Some(1000), 3) < 1000);
/// assert_eq!(bws_rank(None, 5), 0);
/// ```
pub fn bws_rank(global_rank: Option<i64>, badges: i32) -> i64 {
    let rank = match global_rank {
        Some(rank) if rank >= 0 => rank,
        _ => 0,
    };
    #[allow(
        clippy::cast_precision_loss,
        reason = "osu! ranks are far below 2^52"
    )]
    let base = rank as f64;
    let exponent = 0.9937_f64.powi(badges.saturating_mul(badges));
    #[allow(
        clippy::cast_possible_truncation,
        reason = "result is bounded by the input rank"
    )]
    let weighted = base.powf(exponent).round() as i64;
    weighted
}

/// Primary (osu!) identity fields captured at registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OsuIdentity {
    /// Numeric osu! account id; unique per user.
    pub osu_id: i64,
    /// Display name on osu!.
    pub osu_username: String,
    /// Avatar URL served by osu!.
    pub osu_avatar_url: String,
    /// Global rank at registration time; unranked players have none.
    pub osu_global_rank: Option<i64>,
    /// Badge-weighted rank computed at registration.
    pub bws_rank: i64,
    /// Number of qualifying badges.
    pub badges: i32,
}

/// Secondary (Discord) identity, linked and unlinked as a unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DiscordIdentity {
    /// Discord snowflake id, kept as a string as the API serves it.
    pub discord_id: String,
    /// `name#discriminator` tag for display.
    pub discord_tag: String,
    /// CDN avatar URL.
    pub discord_avatar_url: String,
}

/// Application user.
///
/// ## Invariants
/// - `user_hash` is assigned once at creation and never recomputed.
/// - `team_hash` refers to an existing team or is `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Stable opaque identifier; the user's public key.
    #[schema(value_type = String)]
    pub user_hash: UserHash,
    /// Primary identity block.
    #[serde(flatten)]
    pub osu: OsuIdentity,
    /// Optional secondary identity block.
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub discord: Option<DiscordIdentity>,
    /// Moderation flag; banned users keep their record.
    pub is_banned: bool,
    /// Grants access to the moderation and lobby-management surface.
    pub is_admin: bool,
    /// Current team membership, if any.
    #[schema(value_type = Option<String>)]
    pub team_hash: Option<TeamHash>,
}

impl User {
    /// Build a freshly registered user with no links or flags set.
    pub fn new(user_hash: UserHash, osu: OsuIdentity) -> Self {
        Self {
            user_hash,
            osu,
            discord: None,
            is_banned: false,
            is_admin: false,
            team_hash: None,
        }
    }

    /// Whether the user currently belongs to a team.
    pub fn is_on_team(&self) -> bool {
        self.team_hash.is_some()
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("GST 2021 winner", 1)]
    #[case("osu!taiko champion", 0)]
    #[case("Beatmap Spotlight curator", 0)]
    #[case("Longstanding contribution", 0)]
    #[case("Corsace Open victor", 1)]
    fn badge_filter_matches_case_insensitively(#[case] description: &str, #[case] expected: i32) {
        assert_eq!(qualifying_badges(std::iter::once(description)), expected);
    }

    #[rstest]
    #[case(Some(5000), 0, 5000)]
    #[case(Some(-3), 2, 0)]
    #[case(None, 2, 0)]
    #[case(Some(0), 4, 0)]
    fn bws_rank_edge_cases(
        #[case] rank: Option<i64>,
        #[case] badges: i32,
        #[case] expected: i64,
    ) {
        assert_eq!(bws_rank(rank, badges), expected);
    }

    #[test]
    fn bws_rank_decreases_with_badges() {
        let unbadged = bws_rank(Some(10_000), 0);
        let badged = bws_rank(Some(10_000), 2);
        let heavily_badged = bws_rank(Some(10_000), 5);
        assert!(badged < unbadged);
        assert!(heavily_badged < badged);
    }

    #[test]
    fn user_serialises_identity_blocks_flat() {
        let secret = crate::domain::HashSecret::new("test");
        let user = User::new(
            UserHash::derive(7, &secret),
            OsuIdentity {
                osu_id: 7,
                osu_username: "peppy".into(),
                osu_avatar_url: "https://a.ppy.sh/7".into(),
                osu_global_rank: Some(1),
                bws_rank: 1,
                badges: 0,
            },
        );
        let value = serde_json::to_value(&user).expect("serialises");
        assert_eq!(value.get("osuId").and_then(serde_json::Value::as_i64), Some(7));
        assert!(value.get("osu").is_none());
        assert!(value.get("discordId").is_none());
    }
}
