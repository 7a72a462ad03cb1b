use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::models::Player;

const COLUMNS: &str = "id, name, email, chat_handle, created_at";

pub fn insert(
    conn: &Connection,
    name: &str,
    email: Option<&str>,
    chat_handle: Option<&str>,
    created_at: DateTime<Utc>,
) -> Result<Player> {
    let sql = format!(
        "INSERT INTO players (name, email, chat_handle, created_at) VALUES (?1, ?2, ?3, ?4) RETURNING {COLUMNS}"
    );

    conn.query_row(&sql, params![name, email, chat_handle, created_at], parse_player_row)
        .context("Failed to insert player")
}

pub fn find_by_id(conn: &Connection, id: i64) -> Result<Option<Player>> {
    let sql = format!("SELECT {COLUMNS} FROM players WHERE id = ?1");

    conn.query_row(&sql, params![id], parse_player_row)
        .optional()
        .context("Failed to query player by id")
}

pub fn find_by_name(conn: &Connection, name: &str) -> Result<Option<Player>> {
    let sql = format!("SELECT {COLUMNS} FROM players WHERE name = ?1");

    conn.query_row(&sql, params![name], parse_player_row)
        .optional()
        .context("Failed to query player by name")
}

fn parse_player_row(row: &rusqlite::Row) -> rusqlite::Result<Player> {
    Ok(Player {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        chat_handle: row.get(3)?,
        created_at: row.get(4)?,
    })
}
