use chrono::{DateTime, Utc};

/// Identity record. Immutable from the engine's perspective.
#[derive(Debug, Clone)]
pub struct Player {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
    pub chat_handle: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A player's ladder state. Among active profiles the ranks are always
/// a contiguous permutation 1..N.
#[derive(Debug, Clone)]
pub struct Profile {
    pub id: i64,
    pub player_id: i64,
    pub rank: i64,
    /// Signed delta from the previous rank; 100 marks a foul demotion.
    pub movement: i64,
    pub active: bool,
    pub last_played_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Numbered epoch; matches reference the season current at creation.
#[derive(Debug, Clone)]
pub struct Season {
    pub id: i64,
    pub number: i64,
    pub started_at: DateTime<Utc>,
}

/// A challenge until adjudicated, then a played match. Rank snapshots are
/// taken at creation; winner/loser fields are populated exactly once.
#[derive(Debug, Clone)]
pub struct Match {
    pub id: i64,
    pub season_id: i64,
    pub challenger_id: i64,
    pub opponent_id: i64,
    pub challenger_rank: Option<i64>,
    pub opponent_rank: Option<i64>,
    pub winner_id: Option<i64>,
    pub loser_id: Option<i64>,
    pub winner_rank: Option<i64>,
    pub loser_rank: Option<i64>,
    pub declined: bool,
    pub days_to_play: i64,
    pub created_at: DateTime<Utc>,
    pub played_at: Option<DateTime<Utc>>,
}

impl Match {
    /// Open means it still counts against the one-open-challenge rule.
    pub fn is_open(&self) -> bool {
        self.played_at.is_none() && !self.declined
    }

    pub fn involves(&self, player_id: i64) -> bool {
        self.challenger_id == player_id || self.opponent_id == player_id
    }
}

/// One of exactly three racks per match, index 0..2.
#[derive(Debug, Clone)]
pub struct Game {
    pub id: i64,
    pub match_id: i64,
    pub game_index: i64,
    pub winner_id: Option<i64>,
    /// Who committed the instant-loss foul in this rack, if anyone.
    pub balled_id: Option<i64>,
}
