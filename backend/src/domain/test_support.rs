//! Shared fixtures for domain service tests.

use std::sync::Arc;

use chrono::{DateTime, Local, Utc};
use mockable::Clock;

use crate::domain::{HashSecret, OsuIdentity, User, UserHash};

/// Clock frozen at a fixed instant.
pub struct FixtureClock {
    utc_now: DateTime<Utc>,
}

impl Clock for FixtureClock {
    fn local(&self) -> DateTime<Local> {
        self.utc_now.with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        self.utc_now
    }
}

/// Build a clock stuck at `now`.
pub fn fixture_clock(now: DateTime<Utc>) -> Arc<dyn Clock> {
    Arc::new(FixtureClock { utc_now: now })
}

/// Secret used across domain test fixtures.
pub fn fixture_secret() -> HashSecret {
    HashSecret::new("fixture-secret")
}

/// Build a registered user with no links or flags set.
pub fn fixture_user(osu_id: i64) -> User {
    User::new(
        UserHash::derive(osu_id, &fixture_secret()),
        OsuIdentity {
            osu_id,
            osu_username: format!("player-{osu_id}"),
            osu_avatar_url: format!("https://a.ppy.sh/{osu_id}"),
            osu_global_rank: Some(1000),
            bws_rank: 1000,
            badges: 0,
        },
    )
}
