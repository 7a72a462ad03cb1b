use anyhow::{Context, Result};
use rusqlite::{params, Connection};

use super::models::Game;

const COLUMNS: &str = "id, match_id, game_index, winner_id, balled_id";

/// Materialize the three racks of a match in one go. Games are only ever
/// created as a full set, never individually.
pub fn create_for_match(conn: &Connection, match_id: i64) -> Result<()> {
    for index in 0..3 {
        conn.execute(
            "INSERT INTO games (match_id, game_index) VALUES (?1, ?2)",
            params![match_id, index],
        )
        .with_context(|| format!("Failed to create game {index} for match {match_id}"))?;
    }

    Ok(())
}

pub fn list_for_match(conn: &Connection, match_id: i64) -> Result<Vec<Game>> {
    let sql = format!("SELECT {COLUMNS} FROM games WHERE match_id = ?1 ORDER BY game_index");

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![match_id], parse_game_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(rows)
}

pub fn count_for_match(conn: &Connection, match_id: i64) -> Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM games WHERE match_id = ?1",
        params![match_id],
        |row| row.get(0),
    )
    .context("Failed to count games for match")
}

/// Returns the number of rows updated; 0 means no such game slot.
pub fn set_result(
    conn: &Connection,
    match_id: i64,
    game_index: i64,
    winner_id: Option<i64>,
    balled_id: Option<i64>,
) -> Result<usize> {
    conn.execute(
        "UPDATE games SET winner_id = ?1, balled_id = ?2 WHERE match_id = ?3 AND game_index = ?4",
        params![winner_id, balled_id, match_id, game_index],
    )
    .context("Failed to record game result")
}

/// Forfeiture path: award a rack without touching the balled column.
pub fn force_winner(
    conn: &Connection,
    match_id: i64,
    game_index: i64,
    winner_id: i64,
) -> Result<usize> {
    conn.execute(
        "UPDATE games SET winner_id = ?1 WHERE match_id = ?2 AND game_index = ?3",
        params![winner_id, match_id, game_index],
    )
    .context("Failed to force game winner")
}

fn parse_game_row(row: &rusqlite::Row) -> rusqlite::Result<Game> {
    Ok(Game {
        id: row.get(0)?,
        match_id: row.get(1)?,
        game_index: row.get(2)?,
        winner_id: row.get(3)?,
        balled_id: row.get(4)?,
    })
}
