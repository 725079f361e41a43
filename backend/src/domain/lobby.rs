//! Qualifier lobby slots and the registration cutoff policy.
//!
//! The cutoff is anchored to a published local schedule, not to UTC and not
//! to wherever the server happens to run. All comparisons go through
//! [`LobbySchedule::is_closed_at`] so the reference timezone stays a single
//! configurable constant instead of inlined arithmetic.

use chrono::{DateTime, Duration, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Maximum number of teams on a lobby roster.
pub const LOBBY_CAPACITY: usize = 6;

/// Minutes before the scheduled time at which registration closes.
pub const LOBBY_CUTOFF_MINUTES: i64 = 30;

/// Offset of the tournament's published schedule (CET).
pub const REFERENCE_OFFSET_SECONDS: i32 = 3600;

/// The fixed reference timezone for all schedule comparisons.
///
/// # Panics
///
/// Never panics: the offset constant is well within the valid range.
#[allow(
    clippy::expect_used,
    reason = "the offset constant is within FixedOffset's valid range"
)]
pub fn reference_timezone() -> FixedOffset {
    FixedOffset::east_opt(REFERENCE_OFFSET_SECONDS).expect("reference offset constant in range")
}

/// A scheduled qualifier slot with limited team capacity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Lobby {
    /// Sequential slot identifier.
    pub lobby_id: i32,
    /// Display name, e.g. `"Qualifier A"`.
    pub lobby_name: String,
    /// Scheduled start in the reference timezone.
    pub lobby_time: DateTime<Utc>,
    /// osu! username of the assigned referee, if any.
    pub referee: Option<String>,
}

/// Schedule policy for a single lobby.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LobbySchedule {
    scheduled_at: DateTime<Utc>,
}

impl LobbySchedule {
    /// Wrap a lobby's scheduled start time.
    pub fn new(scheduled_at: DateTime<Utc>) -> Self {
        Self { scheduled_at }
    }

    /// Whether registration is closed at `now`.
    ///
    /// Closed once `now >= scheduled - 30 minutes`, with both instants
    /// projected into the reference timezone.
    ///
    /// # Examples
    /// ```
    /// use chrono::{Duration, Utc};
    /// use tourney_backend::domain::lobby::LobbySchedule;
    ///
    /// let schedule = LobbySchedule::new(Utc::now() + Duration::hours(2));
    /// assert!(!schedule.is_closed_at(Utc::now()));
    /// assert!(schedule.is_closed_at(Utc::now() + Duration::minutes(95)));
    /// ```
    pub fn is_closed_at(&self, now: DateTime<Utc>) -> bool {
        let tz = reference_timezone();
        let cutoff = self.scheduled_at.with_timezone(&tz) - Duration::minutes(LOBBY_CUTOFF_MINUTES);
        now.with_timezone(&tz) >= cutoff
    }
}

impl From<&Lobby> for LobbySchedule {
    fn from(lobby: &Lobby) -> Self {
        Self::new(lobby.lobby_time)
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    #[test]
    fn reference_timezone_matches_the_offset_constant() {
        assert_eq!(
            reference_timezone().local_minus_utc(),
            REFERENCE_OFFSET_SECONDS
        );
    }

    fn schedule() -> LobbySchedule {
        let start = Utc.with_ymd_and_hms(2022, 11, 26, 14, 0, 0).single();
        LobbySchedule::new(start.expect("valid fixture time"))
    }

    #[rstest]
    #[case(2022, 11, 26, 13, 0, 0, false)] // an hour out, still open
    #[case(2022, 11, 26, 13, 29, 59, false)] // one second before the cutoff
    #[case(2022, 11, 26, 13, 30, 0, true)] // exactly at the cutoff
    #[case(2022, 11, 26, 14, 0, 0, true)] // at start time
    #[case(2022, 11, 26, 15, 0, 0, true)] // after the lobby ran
    fn cutoff_is_thirty_minutes_before_start(
        #[case] y: i32,
        #[case] mo: u32,
        #[case] d: u32,
        #[case] h: u32,
        #[case] mi: u32,
        #[case] s: u32,
        #[case] closed: bool,
    ) {
        let now = Utc
            .with_ymd_and_hms(y, mo, d, h, mi, s)
            .single()
            .expect("valid case time");
        assert_eq!(schedule().is_closed_at(now), closed);
    }

    #[test]
    fn cutoff_is_independent_of_the_caller_offset() {
        // The same instant expressed in another zone must give the same answer.
        let tz = FixedOffset::west_opt(8 * 3600).expect("valid offset");
        let now = Utc
            .with_ymd_and_hms(2022, 11, 26, 13, 30, 0)
            .single()
            .expect("valid time");
        assert!(schedule().is_closed_at(now.with_timezone(&tz).with_timezone(&Utc)));
    }
}
