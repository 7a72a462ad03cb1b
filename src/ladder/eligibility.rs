//! Challenge and decline eligibility. The boolean predicates mirror the
//! engine's policy checks but never error on a missing or inactive profile;
//! the `*_denial` forms surface the structured reason the engine reports.

use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::Connection;

use super::availability;
use crate::config::settings::LadderSettings;
use crate::database::matches;
use crate::database::models::Profile;
use crate::database::profiles;
use crate::errors::DenyReason;

/// Why a challenge would be refused, or `None` if it is allowed.
pub fn challenge_denial(
    conn: &Connection,
    challenger: &Profile,
    target: &Profile,
    now: DateTime<Utc>,
    settings: &LadderSettings,
) -> Result<Option<DenyReason>> {
    if !challenger.active || !target.active {
        return Ok(Some(DenyReason::Inactive));
    }

    // A player may only punch upward, at most `rank_window` positions.
    let in_window =
        challenger.rank > target.rank && target.rank >= challenger.rank - settings.rank_window;
    if !in_window {
        return Ok(Some(DenyReason::RankWindow));
    }

    for profile in [target, challenger] {
        if availability::has_open_challenge(conn, profile.player_id)? {
            return Ok(Some(DenyReason::OpenChallenge));
        }
        if availability::in_cooldown(profile, now, settings) {
            return Ok(Some(DenyReason::CoolingDown));
        }
    }

    Ok(None)
}

/// False (never an error) when either profile is missing or the policy
/// refuses the pairing.
pub fn can_challenge(
    conn: &Connection,
    challenger_player_id: i64,
    target_player_id: i64,
    now: DateTime<Utc>,
    settings: &LadderSettings,
) -> Result<bool> {
    let challenger = profiles::find_by_player(conn, challenger_player_id)?;
    let target = profiles::find_by_player(conn, target_player_id)?;

    match (challenger, target) {
        (Some(challenger), Some(target)) => {
            Ok(challenge_denial(conn, &challenger, &target, now, settings)?.is_none())
        }
        _ => Ok(false),
    }
}

/// Declining is reserved for players being hounded: the two most recent
/// non-declined matches involving the profile must both have it as the
/// opponent. Rank 1 never declines.
pub fn decline_denial(
    conn: &Connection,
    profile: &Profile,
    settings: &LadderSettings,
) -> Result<Option<DenyReason>> {
    if profile.rank == 1 {
        return Ok(Some(DenyReason::TopRank));
    }

    let recent = matches::last_involving(conn, profile.player_id, settings.decline_streak)?;
    if recent.len() < settings.decline_streak {
        return Ok(Some(DenyReason::DeclineStreak));
    }

    let all_incoming = recent.iter().all(|m| m.opponent_id == profile.player_id);
    if !all_incoming {
        return Ok(Some(DenyReason::DeclineStreak));
    }

    Ok(None)
}

pub fn can_decline(conn: &Connection, profile: &Profile, settings: &LadderSettings) -> Result<bool> {
    Ok(decline_denial(conn, profile, settings)?.is_none())
}
