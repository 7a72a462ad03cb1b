//! The match state machine: PENDING -> IN_PROGRESS -> ADJUDICATED, with a
//! DECLINED side exit. Every mutating operation holds the engine's mutex and
//! runs inside a single transaction, so policy re-checks, rank shifts and
//! match updates commit together or not at all. Events are returned to the
//! caller only after the commit.

use std::sync::{Mutex, MutexGuard};

use anyhow::Context;
use chrono::{DateTime, Utc};
use log::{info, warn};
use rusqlite::Connection;

use crate::config::settings::LadderSettings;
use crate::database::models::{Match, Player, Profile};
use crate::database::{self, games, matches, players, profiles, seasons, DbPool};
use crate::errors::{DenyReason, EngineError, EngineResult};
use crate::ladder::{eligibility, rank_table};
use crate::lifecycle::adjudication::{self, Side};
use crate::lifecycle::deadline::{Calendar, WeekdayCalendar};
use crate::lifecycle::events::{LadderEvent, PlayerRef};

/// One rack's outcome as submitted by a player.
#[derive(Debug, Clone, Copy, Default)]
pub struct RackResult {
    pub winner_id: Option<i64>,
    pub balled_id: Option<i64>,
}

pub struct LadderEngine {
    pool: DbPool,
    settings: LadderSettings,
    calendar: Box<dyn Calendar>,
    /// The single mutual-exclusion domain covering the rank table and the
    /// set of open matches.
    lock: Mutex<()>,
}

impl LadderEngine {
    pub fn new(pool: DbPool, settings: LadderSettings) -> Self {
        Self {
            pool,
            settings,
            calendar: Box::new(WeekdayCalendar),
            lock: Mutex::new(()),
        }
    }

    pub fn with_calendar(mut self, calendar: Box<dyn Calendar>) -> Self {
        self.calendar = calendar;
        self
    }

    /// Register a new player at the bottom of the ladder.
    pub fn join_ladder(
        &self,
        name: &str,
        email: Option<&str>,
        chat_handle: Option<&str>,
    ) -> EngineResult<(Profile, Vec<LadderEvent>)> {
        self.join_ladder_at(name, email, chat_handle, Utc::now())
    }

    pub fn join_ladder_at(
        &self,
        name: &str,
        email: Option<&str>,
        chat_handle: Option<&str>,
        now: DateTime<Utc>,
    ) -> EngineResult<(Profile, Vec<LadderEvent>)> {
        let _guard = self.exclusive()?;
        let mut conn = database::get_connection(&self.pool)?;
        let tx = conn.transaction().context("Failed to begin transaction")?;

        let player = players::insert(&tx, name, email, chat_handle, now)?;
        let rank = profiles::count_active(&tx)? + 1;
        let profile = profiles::create(&tx, player.id, rank, now)?;

        tx.commit().context("Failed to commit join")?;
        info!("{} joined the ladder at rank {}", player.name, rank);

        let events = vec![LadderEvent::PlayerJoined {
            player: PlayerRef::from(&player),
            rank,
        }];
        Ok((profile, events))
    }

    /// Create a challenge. Eligibility is re-checked inside the exclusive
    /// section so two racing calls can never both claim the same opponent.
    pub fn create_challenge(
        &self,
        challenger_player_id: i64,
        opponent_player_id: i64,
    ) -> EngineResult<(Match, Vec<LadderEvent>)> {
        self.create_challenge_at(challenger_player_id, opponent_player_id, Utc::now())
    }

    pub fn create_challenge_at(
        &self,
        challenger_player_id: i64,
        opponent_player_id: i64,
        now: DateTime<Utc>,
    ) -> EngineResult<(Match, Vec<LadderEvent>)> {
        let _guard = self.exclusive()?;
        let mut conn = database::get_connection(&self.pool)?;
        let tx = conn.transaction().context("Failed to begin transaction")?;

        let challenger = require_profile(&tx, challenger_player_id)?;
        let opponent = require_profile(&tx, opponent_player_id)?;

        if let Some(reason) =
            eligibility::challenge_denial(&tx, &challenger, &opponent, now, &self.settings)?
        {
            return Err(EngineError::denied(reason));
        }

        let season = seasons::current(&tx)?
            .ok_or_else(|| EngineError::invariant("no season is open"))?;

        let match_ = matches::insert(
            &tx,
            season.id,
            challenger.player_id,
            opponent.player_id,
            challenger.rank,
            opponent.rank,
            self.settings.initial_days_to_play,
            now,
        )?;

        let challenger_player = require_player(&tx, challenger.player_id)?;
        let opponent_player = require_player(&tx, opponent.player_id)?;
        tx.commit().context("Failed to commit challenge")?;

        let deadline = self.calendar.deadline(match_.created_at, match_.days_to_play);
        info!(
            "{} (rank {}) challenged {} (rank {}), to be played by {}",
            challenger_player.name, challenger.rank, opponent_player.name, opponent.rank, deadline
        );

        let events = vec![LadderEvent::ChallengeCreated {
            match_id: match_.id,
            challenger: PlayerRef::from(&challenger_player),
            opponent: PlayerRef::from(&opponent_player),
            deadline,
        }];
        Ok((match_, events))
    }

    /// Give the opponent one more business day, up to the configured cap.
    /// The challenge notification is never re-sent for an extension.
    pub fn extend_deadline(
        &self,
        match_id: i64,
        acting_player_id: i64,
    ) -> EngineResult<(Match, Vec<LadderEvent>)> {
        let _guard = self.exclusive()?;
        let mut conn = database::get_connection(&self.pool)?;
        let tx = conn.transaction().context("Failed to begin transaction")?;

        let match_ = require_match(&tx, match_id)?;
        require_pending_opponent(&tx, &match_, acting_player_id)?;

        if match_.days_to_play >= self.settings.max_days_to_play {
            return Err(EngineError::denied(DenyReason::DeadlineCap));
        }

        let days_to_play = match_.days_to_play + 1;
        matches::set_days_to_play(&tx, match_id, days_to_play)?;
        tx.commit().context("Failed to commit extension")?;

        let deadline = self.calendar.deadline(match_.created_at, days_to_play);
        info!("match {} extended to {} days, new deadline {}", match_id, days_to_play, deadline);

        let updated = Match { days_to_play, ..match_ };
        let events = vec![LadderEvent::DeadlineExtended { match_id, days_to_play, deadline }];
        Ok((updated, events))
    }

    /// Decline an incoming challenge. Terminal, no rank effect, and only
    /// open to an opponent being challenged back-to-back.
    pub fn decline(&self, match_id: i64, acting_player_id: i64) -> EngineResult<Vec<LadderEvent>> {
        let _guard = self.exclusive()?;
        let mut conn = database::get_connection(&self.pool)?;
        let tx = conn.transaction().context("Failed to begin transaction")?;

        let match_ = require_match(&tx, match_id)?;
        require_pending_opponent(&tx, &match_, acting_player_id)?;

        let profile = require_profile(&tx, acting_player_id)?;
        if let Some(reason) = eligibility::decline_denial(&tx, &profile, &self.settings)? {
            return Err(EngineError::denied(reason));
        }

        matches::set_declined(&tx, match_id)?;
        tx.commit().context("Failed to commit decline")?;
        info!("match {} declined by its opponent", match_id);

        Ok(vec![LadderEvent::MatchDeclined { match_id }])
    }

    /// Materialize the three racks of a match. Idempotent; backfills any
    /// rank snapshot that was never taken. Does not set `played_at`.
    pub fn start(&self, match_id: i64) -> EngineResult<()> {
        let _guard = self.exclusive()?;
        let mut conn = database::get_connection(&self.pool)?;
        let tx = conn.transaction().context("Failed to begin transaction")?;

        let match_ = require_match(&tx, match_id)?;
        self.start_in_conn(&tx, &match_)?;

        tx.commit().context("Failed to commit match start")?;
        Ok(())
    }

    /// Record one rack. Valid until the match is adjudicated; a null
    /// `balled` is the normal case.
    pub fn record_game(
        &self,
        match_id: i64,
        game_index: i64,
        winner_id: Option<i64>,
        balled_id: Option<i64>,
    ) -> EngineResult<()> {
        let _guard = self.exclusive()?;
        let mut conn = database::get_connection(&self.pool)?;
        let tx = conn.transaction().context("Failed to begin transaction")?;

        let match_ = require_match(&tx, match_id)?;
        if match_.played_at.is_some() || match_.declined {
            return Err(EngineError::denied(DenyReason::AlreadyPlayed));
        }

        self.start_in_conn(&tx, &match_)?;
        let updated = games::set_result(&tx, match_id, game_index, winner_id, balled_id)?;
        if updated == 0 {
            return Err(EngineError::not_found("game", game_index));
        }

        tx.commit().context("Failed to commit game result")?;
        Ok(())
    }

    /// The interactive path: start the match, record all three racks and
    /// adjudicate, in one exclusive section.
    pub fn submit_results(
        &self,
        match_id: i64,
        racks: [RackResult; 3],
    ) -> EngineResult<(Match, Vec<LadderEvent>)> {
        self.submit_results_at(match_id, racks, Utc::now())
    }

    pub fn submit_results_at(
        &self,
        match_id: i64,
        racks: [RackResult; 3],
        now: DateTime<Utc>,
    ) -> EngineResult<(Match, Vec<LadderEvent>)> {
        let _guard = self.exclusive()?;
        let mut conn = database::get_connection(&self.pool)?;
        let tx = conn.transaction().context("Failed to begin transaction")?;

        let match_ = require_match(&tx, match_id)?;
        if match_.played_at.is_some() || match_.declined {
            return Err(EngineError::denied(DenyReason::AlreadyPlayed));
        }

        self.start_in_conn(&tx, &match_)?;
        for (index, rack) in racks.iter().enumerate() {
            games::set_result(&tx, match_id, index as i64, rack.winner_id, rack.balled_id)?;
        }

        let (adjudicated, events) = self.adjudicate_in_conn(&tx, match_id, now, false)?;
        tx.commit().context("Failed to commit adjudication")?;

        Ok((adjudicated, events))
    }

    /// Adjudicate a match from whatever rack results exist. Calling this on
    /// an already-adjudicated match is a programming error, not a policy
    /// refusal.
    pub fn adjudicate(&self, match_id: i64) -> EngineResult<(Match, Vec<LadderEvent>)> {
        self.adjudicate_at(match_id, Utc::now())
    }

    pub fn adjudicate_at(
        &self,
        match_id: i64,
        now: DateTime<Utc>,
    ) -> EngineResult<(Match, Vec<LadderEvent>)> {
        let _guard = self.exclusive()?;
        let mut conn = database::get_connection(&self.pool)?;
        let tx = conn.transaction().context("Failed to begin transaction")?;

        let (match_, events) = self.adjudicate_in_conn(&tx, match_id, now, false)?;
        tx.commit().context("Failed to commit adjudication")?;

        Ok((match_, events))
    }

    /// Forfeit every open match whose deadline has passed: the first two
    /// racks go to the challenger and the match is adjudicated as a 2-0.
    /// Selection runs inside the same exclusive section as the writes, so an
    /// already-adjudicated match can never be swept again.
    pub fn timeout_sweep(&self) -> EngineResult<(usize, Vec<LadderEvent>)> {
        self.timeout_sweep_at(Utc::now())
    }

    pub fn timeout_sweep_at(
        &self,
        now: DateTime<Utc>,
    ) -> EngineResult<(usize, Vec<LadderEvent>)> {
        let _guard = self.exclusive()?;
        let mut conn = database::get_connection(&self.pool)?;
        let tx = conn.transaction().context("Failed to begin transaction")?;

        let mut swept = 0;
        let mut events = Vec::new();

        for match_ in matches::list_open(&tx)? {
            let deadline = self.calendar.deadline(match_.created_at, match_.days_to_play);
            if deadline >= now {
                continue;
            }

            warn!(
                "match {} passed its deadline ({}); forfeiting to the challenger",
                match_.id, deadline
            );

            self.start_in_conn(&tx, &match_)?;
            games::force_winner(&tx, match_.id, 0, match_.challenger_id)?;
            games::force_winner(&tx, match_.id, 1, match_.challenger_id)?;

            let (_, mut match_events) = self.adjudicate_in_conn(&tx, match_.id, now, true)?;
            events.append(&mut match_events);
            swept += 1;
        }

        tx.commit().context("Failed to commit sweep")?;
        Ok((swept, events))
    }

    /// Active profiles in rank order, for callers that render the ladder.
    pub fn standings(&self) -> EngineResult<Vec<(Profile, Player)>> {
        let conn = database::get_connection(&self.pool)?;

        let mut rows = Vec::new();
        for profile in profiles::list_active_by_rank(&conn)? {
            let player = require_player(&conn, profile.player_id)?;
            rows.push((profile, player));
        }
        Ok(rows)
    }

    fn exclusive(&self) -> EngineResult<MutexGuard<'_, ()>> {
        self.lock
            .lock()
            .map_err(|_| EngineError::invariant("engine lock poisoned"))
    }

    fn start_in_conn(&self, conn: &Connection, match_: &Match) -> EngineResult<()> {
        if games::count_for_match(conn, match_.id)? > 0 {
            return Ok(());
        }

        // Rank snapshots are normally taken at creation; backfill from the
        // profiles' current ranks if one was never set.
        if match_.challenger_rank.is_none() || match_.opponent_rank.is_none() {
            let challenger = require_profile(conn, match_.challenger_id)?;
            let opponent = require_profile(conn, match_.opponent_id)?;
            matches::set_rank_snapshots(
                conn,
                match_.id,
                match_.challenger_rank.unwrap_or(challenger.rank),
                match_.opponent_rank.unwrap_or(opponent.rank),
            )?;
        }

        games::create_for_match(conn, match_.id)?;
        Ok(())
    }

    fn adjudicate_in_conn(
        &self,
        conn: &Connection,
        match_id: i64,
        now: DateTime<Utc>,
        forfeited: bool,
    ) -> EngineResult<(Match, Vec<LadderEvent>)> {
        let match_ = require_match(conn, match_id)?;
        if match_.declined {
            return Err(EngineError::denied(DenyReason::NotPending));
        }
        if match_.played_at.is_some() {
            return Err(EngineError::invariant(format!(
                "match {match_id} has already been adjudicated"
            )));
        }

        self.start_in_conn(conn, &match_)?;
        let match_ = require_match(conn, match_id)?;
        let games = games::list_for_match(conn, match_id)?;

        let challenger_rank = match_
            .challenger_rank
            .ok_or_else(|| EngineError::invariant("match has no challenger rank snapshot"))?;
        let opponent_rank = match_
            .opponent_rank
            .ok_or_else(|| EngineError::invariant("match has no opponent rank snapshot"))?;

        let decision = adjudication::decide(&match_, &games);
        let (winner_id, loser_id) = match decision.winner {
            Side::Challenger => (match_.challenger_id, match_.opponent_id),
            Side::Opponent => (match_.opponent_id, match_.challenger_id),
        };

        let (winner_rank, loser_rank) = adjudication::rank_candidates(challenger_rank, opponent_rank);
        let winner_profile = require_profile(conn, winner_id)?;
        let loser_profile = require_profile(conn, loser_id)?;

        rank_table::assign_rank(conn, &winner_profile, winner_rank)?;
        let final_loser_rank = if decision.fouled {
            rank_table::demote_to_bottom(conn, &loser_profile)?
        } else {
            rank_table::assign_rank(conn, &loser_profile, loser_rank)?;
            loser_rank
        };
        rank_table::verify_permutation(conn)?;

        matches::set_outcome(conn, match_id, winner_id, loser_id, winner_rank, final_loser_rank, now)?;
        profiles::set_last_played(conn, winner_profile.id, now)?;
        profiles::set_last_played(conn, loser_profile.id, now)?;

        let winner_player = require_player(conn, winner_id)?;
        let loser_player = require_player(conn, loser_id)?;
        info!(
            "{} has beaten {}{} (ranks {} / {})",
            winner_player.name,
            loser_player.name,
            if decision.fouled { " by foul" } else { "" },
            winner_rank,
            final_loser_rank
        );

        let adjudicated = require_match(conn, match_id)?;
        let events = vec![LadderEvent::MatchAdjudicated {
            match_id,
            winner: PlayerRef::from(&winner_player),
            loser: PlayerRef::from(&loser_player),
            fouled: decision.fouled,
            forfeited,
        }];
        Ok((adjudicated, events))
    }
}

fn require_profile(conn: &Connection, player_id: i64) -> EngineResult<Profile> {
    profiles::find_by_player(conn, player_id)?
        .ok_or_else(|| EngineError::not_found("profile", player_id))
}

fn require_player(conn: &Connection, player_id: i64) -> EngineResult<Player> {
    players::find_by_id(conn, player_id)?
        .ok_or_else(|| EngineError::not_found("player", player_id))
}

fn require_match(conn: &Connection, match_id: i64) -> EngineResult<Match> {
    matches::find_by_id(conn, match_id)?
        .ok_or_else(|| EngineError::not_found("match", match_id))
}

/// Pending means open with no racks yet; only the opponent may act on it.
fn require_pending_opponent(
    conn: &Connection,
    match_: &Match,
    acting_player_id: i64,
) -> EngineResult<()> {
    if match_.opponent_id != acting_player_id {
        return Err(EngineError::denied(DenyReason::NotOpponent));
    }
    if !match_.is_open() || games::count_for_match(conn, match_.id)? > 0 {
        return Err(EngineError::denied(DenyReason::NotPending));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    use crate::database::testutil;
    use crate::lifecycle::deadline::WeekdayCalendar;

    fn engine(pool: &DbPool) -> LadderEngine {
        LadderEngine::new(pool.clone(), LadderSettings::default())
    }

    #[test]
    fn create_challenge_snapshots_ranks_and_emits_notification() {
        let pool = testutil::memory_pool();
        let ladder = testutil::seed_ladder(&pool, 5);
        let engine = engine(&pool);
        let t0 = testutil::base_time();

        let (match_, events) = engine
            .create_challenge_at(ladder[2].0.id, ladder[1].0.id, t0)
            .unwrap();

        assert_eq!(match_.challenger_rank, Some(3));
        assert_eq!(match_.opponent_rank, Some(2));
        assert_eq!(match_.days_to_play, 3);
        assert!(match_.is_open());

        let expected_deadline = WeekdayCalendar.deadline(t0, 3);
        assert_eq!(
            events,
            vec![LadderEvent::ChallengeCreated {
                match_id: match_.id,
                challenger: PlayerRef::from(&ladder[2].0),
                opponent: PlayerRef::from(&ladder[1].0),
                deadline: expected_deadline,
            }]
        );
    }

    #[test]
    fn open_challenge_exclusivity_is_enforced_at_creation() {
        let pool = testutil::memory_pool();
        let ladder = testutil::seed_ladder(&pool, 5);
        let engine = engine(&pool);
        let t0 = testutil::base_time();

        engine.create_challenge_at(ladder[2].0.id, ladder[1].0.id, t0).unwrap();

        // The opponent already has an open match.
        let err = engine
            .create_challenge_at(ladder[3].0.id, ladder[2].0.id, t0)
            .unwrap_err();
        assert!(matches!(err, EngineError::PolicyDenied(DenyReason::OpenChallenge)));
    }

    #[test]
    fn rank_window_violations_are_policy_denials() {
        let pool = testutil::memory_pool();
        let ladder = testutil::seed_ladder(&pool, 5);
        let engine = engine(&pool);
        let t0 = testutil::base_time();

        let err = engine
            .create_challenge_at(ladder[4].0.id, ladder[0].0.id, t0)
            .unwrap_err();
        assert!(matches!(err, EngineError::PolicyDenied(DenyReason::RankWindow)));

        // Downward challenges are refused too.
        let err = engine
            .create_challenge_at(ladder[0].0.id, ladder[1].0.id, t0)
            .unwrap_err();
        assert!(matches!(err, EngineError::PolicyDenied(DenyReason::RankWindow)));
    }

    #[test]
    fn deadline_extension_is_opponent_only_and_capped() {
        let pool = testutil::memory_pool();
        let ladder = testutil::seed_ladder(&pool, 5);
        let engine = engine(&pool);
        let t0 = testutil::base_time();

        let (match_, _) = engine
            .create_challenge_at(ladder[2].0.id, ladder[1].0.id, t0)
            .unwrap();

        let err = engine.extend_deadline(match_.id, ladder[2].0.id).unwrap_err();
        assert!(matches!(err, EngineError::PolicyDenied(DenyReason::NotOpponent)));

        let (extended, events) = engine.extend_deadline(match_.id, ladder[1].0.id).unwrap();
        assert_eq!(extended.days_to_play, 4);
        assert_eq!(
            events,
            vec![LadderEvent::DeadlineExtended {
                match_id: match_.id,
                days_to_play: 4,
                deadline: WeekdayCalendar.deadline(t0, 4),
            }]
        );

        engine.extend_deadline(match_.id, ladder[1].0.id).unwrap();
        let err = engine.extend_deadline(match_.id, ladder[1].0.id).unwrap_err();
        assert!(matches!(err, EngineError::PolicyDenied(DenyReason::DeadlineCap)));
    }

    #[test]
    fn extension_is_refused_once_racks_exist() {
        let pool = testutil::memory_pool();
        let ladder = testutil::seed_ladder(&pool, 5);
        let engine = engine(&pool);
        let t0 = testutil::base_time();

        let (match_, _) = engine
            .create_challenge_at(ladder[2].0.id, ladder[1].0.id, t0)
            .unwrap();
        engine
            .record_game(match_.id, 0, Some(ladder[2].0.id), None)
            .unwrap();

        let err = engine.extend_deadline(match_.id, ladder[1].0.id).unwrap_err();
        assert!(matches!(err, EngineError::PolicyDenied(DenyReason::NotPending)));
    }

    #[test]
    fn adjudication_swaps_the_participants_ranks() {
        let pool = testutil::memory_pool();
        let ladder = testutil::seed_ladder(&pool, 5);
        let engine = engine(&pool);
        let t0 = testutil::base_time();
        let t1 = t0 + Duration::hours(1);

        let challenger = ladder[2].0.id; // rank 3
        let opponent = ladder[1].0.id; // rank 2

        let (match_, _) = engine.create_challenge_at(challenger, opponent, t0).unwrap();
        let racks = [
            RackResult { winner_id: Some(challenger), balled_id: None },
            RackResult { winner_id: Some(opponent), balled_id: None },
            RackResult { winner_id: Some(challenger), balled_id: None },
        ];
        let (played, events) = engine.submit_results_at(match_.id, racks, t1).unwrap();

        assert_eq!(played.winner_id, Some(challenger));
        assert_eq!(played.loser_id, Some(opponent));
        assert_eq!(played.winner_rank, Some(2));
        assert_eq!(played.loser_rank, Some(3));
        assert_eq!(played.played_at, Some(t1));

        let conn = pool.get().unwrap();
        let winner = profiles::find_by_player(&conn, challenger).unwrap().unwrap();
        let loser = profiles::find_by_player(&conn, opponent).unwrap().unwrap();
        assert_eq!((winner.rank, winner.movement), (2, -1));
        assert_eq!((loser.rank, loser.movement), (3, 1));
        assert_eq!(winner.last_played_at, Some(t1));
        assert_eq!(loser.last_played_at, Some(t1));

        // Only the two participants moved.
        rank_table::verify_permutation(&conn).unwrap();
        assert!(matches!(
            events.as_slice(),
            [LadderEvent::MatchAdjudicated { fouled: false, forfeited: false, .. }]
        ));
    }

    #[test]
    fn fouling_challenger_drops_to_the_bottom_and_the_ladder_closes_up() {
        let pool = testutil::memory_pool();
        let ladder = testutil::seed_ladder(&pool, 5);
        let engine = engine(&pool);
        let t0 = testutil::base_time();
        let t1 = t0 + Duration::hours(1);

        let challenger = ladder[2].0.id; // rank 3
        let opponent = ladder[1].0.id; // rank 2

        let (match_, _) = engine.create_challenge_at(challenger, opponent, t0).unwrap();
        let racks = [
            RackResult { winner_id: Some(challenger), balled_id: Some(challenger) },
            RackResult { winner_id: None, balled_id: None },
            RackResult { winner_id: None, balled_id: None },
        ];
        let (played, events) = engine.submit_results_at(match_.id, racks, t1).unwrap();

        assert_eq!(played.winner_id, Some(opponent));
        assert_eq!(played.winner_rank, Some(2));
        assert_eq!(played.loser_rank, Some(5));

        let conn = pool.get().unwrap();
        let ranks: Vec<(i64, i64)> = profiles::list_active_by_rank(&conn)
            .unwrap()
            .into_iter()
            .map(|p| (p.player_id, p.rank))
            .collect();
        assert_eq!(
            ranks,
            vec![
                (ladder[0].0.id, 1),
                (ladder[1].0.id, 2), // winner already held the better rank
                (ladder[3].0.id, 3), // formerly 4
                (ladder[4].0.id, 4), // formerly 5
                (challenger, 5),
            ]
        );

        let fouler = profiles::find_by_player(&conn, challenger).unwrap().unwrap();
        assert_eq!(fouler.movement, rank_table::FOULED_MOVEMENT);
        assert!(matches!(
            events.as_slice(),
            [LadderEvent::MatchAdjudicated { fouled: true, .. }]
        ));
    }

    #[test]
    fn adjudicating_twice_is_an_invariant_violation() {
        let pool = testutil::memory_pool();
        let ladder = testutil::seed_ladder(&pool, 5);
        let engine = engine(&pool);
        let t0 = testutil::base_time();

        let challenger = ladder[2].0.id;
        let (match_, _) = engine.create_challenge_at(challenger, ladder[1].0.id, t0).unwrap();
        let racks = [
            RackResult { winner_id: Some(challenger), balled_id: None },
            RackResult { winner_id: Some(challenger), balled_id: None },
            RackResult::default(),
        ];
        engine.submit_results_at(match_.id, racks, t0 + Duration::hours(1)).unwrap();

        let err = engine.adjudicate_at(match_.id, t0 + Duration::hours(2)).unwrap_err();
        assert!(matches!(err, EngineError::InvariantViolation(_)));

        let err = engine
            .record_game(match_.id, 0, Some(challenger), None)
            .unwrap_err();
        assert!(matches!(err, EngineError::PolicyDenied(DenyReason::AlreadyPlayed)));
    }

    #[test]
    fn start_is_idempotent_and_never_duplicates_racks() {
        let pool = testutil::memory_pool();
        let ladder = testutil::seed_ladder(&pool, 5);
        let engine = engine(&pool);
        let t0 = testutil::base_time();

        let (match_, _) = engine
            .create_challenge_at(ladder[2].0.id, ladder[1].0.id, t0)
            .unwrap();

        engine.start(match_.id).unwrap();
        engine.start(match_.id).unwrap();
        engine.record_game(match_.id, 0, Some(ladder[2].0.id), None).unwrap();

        let conn = pool.get().unwrap();
        assert_eq!(games::count_for_match(&conn, match_.id).unwrap(), 3);
        drop(conn);

        let err = engine
            .record_game(match_.id, 7, Some(ladder[2].0.id), None)
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound { entity: "game", .. }));
    }

    #[test]
    fn decline_needs_the_streak_and_frees_the_opponent() {
        let pool = testutil::memory_pool();
        let ladder = testutil::seed_ladder(&pool, 5);
        let engine = engine(&pool);
        let t0 = testutil::base_time();

        let challenger = ladder[2].0.id; // rank 3
        let hounded = ladder[1].0.id; // rank 2

        // First incoming challenge: declining is not yet allowed.
        let (m1, _) = engine.create_challenge_at(challenger, hounded, t0).unwrap();
        let err = engine.decline(m1.id, hounded).unwrap_err();
        assert!(matches!(err, EngineError::PolicyDenied(DenyReason::DeclineStreak)));

        let err = engine.decline(m1.id, challenger).unwrap_err();
        assert!(matches!(err, EngineError::PolicyDenied(DenyReason::NotOpponent)));

        // Opponent defends the first match; ranks stay put.
        let racks = [
            RackResult { winner_id: Some(hounded), balled_id: None },
            RackResult { winner_id: Some(hounded), balled_id: None },
            RackResult::default(),
        ];
        engine.submit_results_at(m1.id, racks, t0 + Duration::hours(1)).unwrap();

        // Second back-to-back incoming challenge can be declined.
        let t1 = t0 + Duration::hours(6);
        let (m2, _) = engine.create_challenge_at(challenger, hounded, t1).unwrap();
        let events = engine.decline(m2.id, hounded).unwrap();
        assert_eq!(events, vec![LadderEvent::MatchDeclined { match_id: m2.id }]);

        let conn = pool.get().unwrap();
        let declined = matches::find_by_id(&conn, m2.id).unwrap().unwrap();
        assert!(declined.declined);
        assert!(declined.played_at.is_none());
        rank_table::verify_permutation(&conn).unwrap();
        drop(conn);

        // Declining frees both sides for a fresh challenge.
        engine.create_challenge_at(challenger, hounded, t1 + Duration::hours(1)).unwrap();
    }

    #[test]
    fn cooldown_blocks_an_immediate_rematch() {
        let pool = testutil::memory_pool();
        let ladder = testutil::seed_ladder(&pool, 5);
        let engine = engine(&pool);
        let t0 = testutil::base_time();
        let t1 = t0 + Duration::hours(1);

        let challenger = ladder[2].0.id;
        let opponent = ladder[1].0.id;

        let (match_, _) = engine.create_challenge_at(challenger, opponent, t0).unwrap();
        let racks = [
            RackResult { winner_id: Some(challenger), balled_id: None },
            RackResult { winner_id: Some(challenger), balled_id: None },
            RackResult::default(),
        ];
        engine.submit_results_at(match_.id, racks, t1).unwrap();

        // Loser (now rank 3) wants revenge straight away; both are resting.
        let err = engine
            .create_challenge_at(opponent, challenger, t1 + Duration::hours(1))
            .unwrap_err();
        assert!(matches!(err, EngineError::PolicyDenied(DenyReason::CoolingDown)));

        engine
            .create_challenge_at(opponent, challenger, t1 + Duration::hours(5))
            .unwrap();
    }

    #[test]
    fn expired_matches_are_forfeited_to_the_challenger_exactly_once() {
        let pool = testutil::memory_pool();
        let ladder = testutil::seed_ladder(&pool, 5);
        let engine = engine(&pool);
        let t0 = testutil::base_time();

        let challenger = ladder[2].0.id;
        let opponent = ladder[1].0.id;
        let (match_, _) = engine.create_challenge_at(challenger, opponent, t0).unwrap();

        // Still inside the three business days: nothing to do.
        let (swept, _) = engine.timeout_sweep_at(t0 + Duration::days(1)).unwrap();
        assert_eq!(swept, 0);

        let (swept, events) = engine.timeout_sweep_at(t0 + Duration::days(7)).unwrap();
        assert_eq!(swept, 1);
        assert!(matches!(
            events.as_slice(),
            [LadderEvent::MatchAdjudicated { fouled: false, forfeited: true, .. }]
        ));

        let conn = pool.get().unwrap();
        let forfeited = matches::find_by_id(&conn, match_.id).unwrap().unwrap();
        assert_eq!(forfeited.winner_id, Some(challenger));
        assert_eq!(forfeited.winner_rank, Some(2));

        let racks = games::list_for_match(&conn, match_.id).unwrap();
        assert_eq!(racks[0].winner_id, Some(challenger));
        assert_eq!(racks[1].winner_id, Some(challenger));
        assert_eq!(racks[2].winner_id, None, "a 2-0 sweep leaves the third rack alone");
        rank_table::verify_permutation(&conn).unwrap();
        drop(conn);

        // Never swept a second time.
        let (swept, _) = engine.timeout_sweep_at(t0 + Duration::days(8)).unwrap();
        assert_eq!(swept, 0);
    }

    #[test]
    fn joining_appends_to_the_bottom_of_the_active_ladder() {
        let pool = testutil::memory_pool();
        let ladder = testutil::seed_ladder(&pool, 3);
        let engine = engine(&pool);

        let (profile, events) = engine
            .join_ladder_at("newcomer", Some("new@example.com"), None, testutil::base_time())
            .unwrap();
        assert_eq!(profile.rank, 4);
        assert!(matches!(
            events.as_slice(),
            [LadderEvent::PlayerJoined { rank: 4, .. }]
        ));

        let conn = pool.get().unwrap();
        rank_table::verify_permutation(&conn).unwrap();
        assert_eq!(ladder.len(), 3);
    }
}
