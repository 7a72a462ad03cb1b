//! Pure read predicates over a profile's current state. Evaluated at call
//! time, never cached; availability changes whenever a match transitions.

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use rusqlite::Connection;

use crate::config::settings::LadderSettings;
use crate::database::matches;
use crate::database::models::Profile;

/// Does this player sit on either side of a pending or in-progress match?
pub fn has_open_challenge(conn: &Connection, player_id: i64) -> Result<bool> {
    Ok(matches::count_open_for_player(conn, player_id)? > 0)
}

/// Rest window after a played match. A profile that has never played is
/// never cooling down.
pub fn in_cooldown(profile: &Profile, now: DateTime<Utc>, settings: &LadderSettings) -> bool {
    match profile.last_played_at {
        Some(played_at) => now - played_at <= Duration::hours(settings.cooldown_hours),
        None => false,
    }
}

pub fn is_available(
    conn: &Connection,
    profile: &Profile,
    now: DateTime<Utc>,
    settings: &LadderSettings,
) -> Result<bool> {
    Ok(profile.active
        && !has_open_challenge(conn, profile.player_id)?
        && !in_cooldown(profile, now, settings))
}
