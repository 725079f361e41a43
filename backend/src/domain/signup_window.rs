//! Registration deadline policy.
//!
//! Sign-up mutations (team creation, invites, Discord linking, avatar
//! uploads) are rejected once the published deadline passes. Like the lobby
//! cutoff, the comparison happens in the reference timezone so the deadline
//! reads the same everywhere.

use chrono::{DateTime, TimeZone, Utc};

use super::lobby::reference_timezone;

/// Deadline policy for the sign-up period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignupWindow {
    closes_at: DateTime<Utc>,
}

impl SignupWindow {
    /// Window closing at the given instant.
    pub fn closing_at(closes_at: DateTime<Utc>) -> Self {
        Self { closes_at }
    }

    /// Parse a deadline written in the reference timezone, e.g.
    /// `"2022-11-27T16:00:00"`.
    pub fn parse_local(raw: &str) -> Option<Self> {
        let naive = raw.parse::<chrono::NaiveDateTime>().ok()?;
        let local = reference_timezone().from_local_datetime(&naive).single()?;
        Some(Self::closing_at(local.with_timezone(&Utc)))
    }

    /// Whether sign-ups are still open at `now`.
    ///
    /// # Examples
    /// ```
    /// use chrono::{Duration, Utc};
    /// use tourney_backend::domain::SignupWindow;
    ///
    /// let window = SignupWindow::closing_at(Utc::now() + Duration::days(1));
    /// assert!(window.is_open_at(Utc::now()));
    /// ```
    pub fn is_open_at(&self, now: DateTime<Utc>) -> bool {
        now < self.closes_at
    }
}
