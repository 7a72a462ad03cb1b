//! Shared fixtures: an in-memory database capped at one pooled connection
//! (so every test call path sees the same database) and a seeded ladder.

use chrono::{DateTime, TimeZone, Utc};
use r2d2_sqlite::SqliteConnectionManager;

use super::models::{Player, Profile};
use super::{players, profiles, seasons, setup, DbPool};

pub fn memory_pool() -> DbPool {
    let manager = SqliteConnectionManager::memory();
    let pool = r2d2::Pool::builder()
        .max_size(1)
        .build(manager)
        .expect("build in-memory pool");

    let conn = pool.get().expect("get connection");
    setup::reset_database(&conn).expect("reset schema");
    seasons::insert(&conn, 1, base_time()).expect("seed season 1");

    pool
}

/// A deterministic Monday noon, so business-day tests control the calendar.
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 8, 24, 12, 0, 0).unwrap()
}

/// Seed `n` active players ranked 1..=n. Returned in rank order.
pub fn seed_ladder(pool: &DbPool, n: usize) -> Vec<(Player, Profile)> {
    let conn = pool.get().expect("get connection");

    (1..=n)
        .map(|rank| {
            let name = format!("player{rank}");
            let email = format!("{name}@example.com");
            let player = players::insert(&conn, &name, Some(&email), None, base_time())
                .expect("insert player");
            let profile = profiles::create(&conn, player.id, rank as i64, base_time())
                .expect("insert profile");
            (player, profile)
        })
        .collect()
}
