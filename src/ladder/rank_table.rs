//! Atomic rank-shift operations. Callers hold the engine's exclusive
//! section and an open transaction; nothing here is safe to run outside one.

use rusqlite::Connection;

use crate::database::models::Profile;
use crate::database::profiles;
use crate::errors::{EngineError, EngineResult};

/// Movement sentinel marking "was demoted for a foul" rather than a delta.
pub const FOULED_MOVEMENT: i64 = 100;

/// Plain swap-style assignment: the profile takes `new_rank` and its
/// movement records the signed shift from where it was.
pub fn assign_rank(conn: &Connection, profile: &Profile, new_rank: i64) -> EngineResult<()> {
    let movement = new_rank - profile.rank;
    profiles::update_rank(conn, profile.id, new_rank, movement)?;
    Ok(())
}

/// Foul demotion: every active profile ranked below the fouler moves up one
/// position and the fouler drops into the vacated bottom slot. Inactive
/// profiles neither move nor count toward the bottom.
pub fn demote_to_bottom(conn: &Connection, profile: &Profile) -> EngineResult<i64> {
    let bottom = profiles::max_active_rank(conn)?
        .ok_or_else(|| EngineError::invariant("no active profiles to demote within"))?;

    profiles::shift_up_active_below(conn, profile.rank)?;
    profiles::update_rank(conn, profile.id, bottom, FOULED_MOVEMENT)?;

    Ok(bottom)
}

/// Assert the contiguous-permutation invariant: active ranks are exactly
/// 1..=N. Run before committing any rank mutation.
pub fn verify_permutation(conn: &Connection) -> EngineResult<()> {
    let ladder = profiles::list_active_by_rank(conn)?;

    for (position, profile) in ladder.iter().enumerate() {
        let expected = position as i64 + 1;
        if profile.rank != expected {
            return Err(EngineError::invariant(format!(
                "active ranks are not a contiguous permutation: expected {} at position {}, found {}",
                expected, position, profile.rank
            )));
        }
    }

    Ok(())
}
