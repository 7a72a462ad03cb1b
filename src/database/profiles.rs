use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::models::Profile;

const COLUMNS: &str = "id, player_id, rank, movement, active, last_played_at, created_at";

pub fn create(
    conn: &Connection,
    player_id: i64,
    rank: i64,
    created_at: DateTime<Utc>,
) -> Result<Profile> {
    let sql = format!(
        "INSERT INTO profiles (player_id, rank, created_at) VALUES (?1, ?2, ?3) RETURNING {COLUMNS}"
    );

    conn.query_row(&sql, params![player_id, rank, created_at], parse_profile_row)
        .context("Failed to insert profile")
}

pub fn find_by_player(conn: &Connection, player_id: i64) -> Result<Option<Profile>> {
    let sql = format!("SELECT {COLUMNS} FROM profiles WHERE player_id = ?1");

    conn.query_row(&sql, params![player_id], parse_profile_row)
        .optional()
        .context("Failed to query profile by player id")
}

/// The ladder itself: active profiles, best rank first.
pub fn list_active_by_rank(conn: &Connection) -> Result<Vec<Profile>> {
    let sql = format!("SELECT {COLUMNS} FROM profiles WHERE active = 1 ORDER BY rank");

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], parse_profile_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(rows)
}

pub fn count_active(conn: &Connection) -> Result<i64> {
    conn.query_row("SELECT COUNT(*) FROM profiles WHERE active = 1", [], |row| row.get(0))
        .context("Failed to count active profiles")
}

/// Maximum rank among active profiles only; inactive ranks never count.
pub fn max_active_rank(conn: &Connection) -> Result<Option<i64>> {
    conn.query_row("SELECT MAX(rank) FROM profiles WHERE active = 1", [], |row| row.get(0))
        .context("Failed to query maximum active rank")
}

pub fn update_rank(conn: &Connection, profile_id: i64, rank: i64, movement: i64) -> Result<()> {
    conn.execute(
        "UPDATE profiles SET rank = ?1, movement = ?2 WHERE id = ?3",
        params![rank, movement, profile_id],
    )
    .context("Failed to update profile rank")?;

    Ok(())
}

/// Move every active profile ranked below `rank` up one position.
pub fn shift_up_active_below(conn: &Connection, rank: i64) -> Result<usize> {
    conn.execute(
        "UPDATE profiles SET rank = rank - 1, movement = -1 WHERE active = 1 AND rank > ?1",
        params![rank],
    )
    .context("Failed to shift active profiles up")
}

pub fn set_last_played(conn: &Connection, profile_id: i64, at: DateTime<Utc>) -> Result<()> {
    conn.execute(
        "UPDATE profiles SET last_played_at = ?1 WHERE id = ?2",
        params![at, profile_id],
    )
    .context("Failed to set last played time")?;

    Ok(())
}

/// Activity is toggled externally; the engine only reads it.
pub fn set_active(conn: &Connection, profile_id: i64, active: bool) -> Result<()> {
    conn.execute(
        "UPDATE profiles SET active = ?1 WHERE id = ?2",
        params![active, profile_id],
    )
    .context("Failed to set profile activity")?;

    Ok(())
}

fn parse_profile_row(row: &rusqlite::Row) -> rusqlite::Result<Profile> {
    Ok(Profile {
        id: row.get(0)?,
        player_id: row.get(1)?,
        rank: row.get(2)?,
        movement: row.get(3)?,
        active: row.get(4)?,
        last_played_at: row.get(5)?,
        created_at: row.get(6)?,
    })
}
