//! Domain events returned by engine operations after their transaction
//! commits. The state machine never talks to a gateway itself; the
//! dispatcher forwards these.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::database::models::Player;

/// Contact details a gateway needs to address a player.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerRef {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
    pub chat_handle: Option<String>,
}

impl From<&Player> for PlayerRef {
    fn from(player: &Player) -> Self {
        Self {
            id: player.id,
            name: player.name.clone(),
            email: player.email.clone(),
            chat_handle: player.chat_handle.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LadderEvent {
    ChallengeCreated {
        match_id: i64,
        challenger: PlayerRef,
        opponent: PlayerRef,
        deadline: DateTime<Utc>,
    },
    DeadlineExtended {
        match_id: i64,
        days_to_play: i64,
        deadline: DateTime<Utc>,
    },
    MatchDeclined {
        match_id: i64,
    },
    MatchAdjudicated {
        match_id: i64,
        winner: PlayerRef,
        loser: PlayerRef,
        fouled: bool,
        forfeited: bool,
    },
    PlayerJoined {
        player: PlayerRef,
        rank: i64,
    },
}
