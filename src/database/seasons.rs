use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::models::Season;

pub fn insert(conn: &Connection, number: i64, started_at: DateTime<Utc>) -> Result<Season> {
    let sql = "INSERT INTO seasons (number, started_at) VALUES (?1, ?2) \
               RETURNING id, number, started_at";

    conn.query_row(sql, params![number, started_at], parse_season_row)
        .context("Failed to insert season")
}

/// The highest-numbered season; new matches are stamped with it.
pub fn current(conn: &Connection) -> Result<Option<Season>> {
    let sql = "SELECT id, number, started_at FROM seasons ORDER BY number DESC LIMIT 1";

    conn.query_row(sql, [], parse_season_row)
        .optional()
        .context("Failed to query current season")
}

fn parse_season_row(row: &rusqlite::Row) -> rusqlite::Result<Season> {
    Ok(Season {
        id: row.get(0)?,
        number: row.get(1)?,
        started_at: row.get(2)?,
    })
}
