use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::models::Match;

const COLUMNS: &str = "id, season_id, challenger_id, opponent_id, challenger_rank, opponent_rank, \
                       winner_id, loser_id, winner_rank, loser_rank, declined, days_to_play, \
                       created_at, played_at";

#[allow(clippy::too_many_arguments)]
pub fn insert(
    conn: &Connection,
    season_id: i64,
    challenger_id: i64,
    opponent_id: i64,
    challenger_rank: i64,
    opponent_rank: i64,
    days_to_play: i64,
    created_at: DateTime<Utc>,
) -> Result<Match> {
    let sql = format!(
        "INSERT INTO matches (season_id, challenger_id, opponent_id, challenger_rank, opponent_rank, days_to_play, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7) RETURNING {COLUMNS}"
    );

    conn.query_row(
        &sql,
        params![
            season_id,
            challenger_id,
            opponent_id,
            challenger_rank,
            opponent_rank,
            days_to_play,
            created_at
        ],
        parse_match_row,
    )
    .context("Failed to insert match")
}

pub fn find_by_id(conn: &Connection, id: i64) -> Result<Option<Match>> {
    let sql = format!("SELECT {COLUMNS} FROM matches WHERE id = ?1");

    conn.query_row(&sql, params![id], parse_match_row)
        .optional()
        .context("Failed to query match by id")
}

/// Matches still counting against the one-open-challenge rule, oldest first.
pub fn list_open(conn: &Connection) -> Result<Vec<Match>> {
    let sql = format!(
        "SELECT {COLUMNS} FROM matches WHERE played_at IS NULL AND declined = 0 ORDER BY created_at"
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], parse_match_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(rows)
}

pub fn count_open_for_player(conn: &Connection, player_id: i64) -> Result<i64> {
    let sql = "SELECT COUNT(*) FROM matches \
               WHERE played_at IS NULL AND declined = 0 \
               AND (challenger_id = ?1 OR opponent_id = ?1)";

    conn.query_row(sql, params![player_id], |row| row.get(0))
        .context("Failed to count open matches for player")
}

/// The most recent non-declined matches involving a player, newest first.
/// Feeds the decline-streak check.
pub fn last_involving(conn: &Connection, player_id: i64, limit: usize) -> Result<Vec<Match>> {
    let sql = format!(
        "SELECT {COLUMNS} FROM matches \
         WHERE declined = 0 AND (challenger_id = ?1 OR opponent_id = ?1) \
         ORDER BY created_at DESC, id DESC LIMIT ?2"
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![player_id, limit as i64], parse_match_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(rows)
}

pub fn set_days_to_play(conn: &Connection, match_id: i64, days_to_play: i64) -> Result<()> {
    conn.execute(
        "UPDATE matches SET days_to_play = ?1 WHERE id = ?2",
        params![days_to_play, match_id],
    )
    .context("Failed to update days to play")?;

    Ok(())
}

pub fn set_declined(conn: &Connection, match_id: i64) -> Result<()> {
    conn.execute("UPDATE matches SET declined = 1 WHERE id = ?1", params![match_id])
        .context("Failed to decline match")?;

    Ok(())
}

pub fn set_rank_snapshots(
    conn: &Connection,
    match_id: i64,
    challenger_rank: i64,
    opponent_rank: i64,
) -> Result<()> {
    conn.execute(
        "UPDATE matches SET challenger_rank = ?1, opponent_rank = ?2 WHERE id = ?3",
        params![challenger_rank, opponent_rank, match_id],
    )
    .context("Failed to set rank snapshots")?;

    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub fn set_outcome(
    conn: &Connection,
    match_id: i64,
    winner_id: i64,
    loser_id: i64,
    winner_rank: i64,
    loser_rank: i64,
    played_at: DateTime<Utc>,
) -> Result<()> {
    conn.execute(
        "UPDATE matches SET winner_id = ?1, loser_id = ?2, winner_rank = ?3, loser_rank = ?4, played_at = ?5 \
         WHERE id = ?6",
        params![winner_id, loser_id, winner_rank, loser_rank, played_at, match_id],
    )
    .context("Failed to record match outcome")?;

    Ok(())
}

fn parse_match_row(row: &rusqlite::Row) -> rusqlite::Result<Match> {
    Ok(Match {
        id: row.get(0)?,
        season_id: row.get(1)?,
        challenger_id: row.get(2)?,
        opponent_id: row.get(3)?,
        challenger_rank: row.get(4)?,
        opponent_rank: row.get(5)?,
        winner_id: row.get(6)?,
        loser_id: row.get(7)?,
        winner_rank: row.get(8)?,
        loser_rank: row.get(9)?,
        declined: row.get(10)?,
        days_to_play: row.get(11)?,
        created_at: row.get(12)?,
        played_at: row.get(13)?,
    })
}
