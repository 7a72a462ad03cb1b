//! Pure best-of-three decision. Rank mutation, persistence and events are
//! the engine's business; this module only answers "who won, and why".

use crate::database::models::{Game, Match};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Challenger,
    Opponent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub winner: Side,
    pub fouled: bool,
}

/// The better (numerically lower) pre-match rank goes to the winner, the
/// worse to the loser, regardless of which side held which.
pub fn rank_candidates(challenger_rank: i64, opponent_rank: i64) -> (i64, i64) {
    (
        challenger_rank.min(opponent_rank),
        challenger_rank.max(opponent_rank),
    )
}

/// Decide a match from its three racks, scanned in index order.
///
/// A foul is an instant match loss and overrides any tally; the first fouled
/// rack decides and later racks are not consulted. Otherwise the challenger
/// wins with two rack wins and the opponent takes everything else. A rack
/// with no recorded winner counts for neither side, so a 2-0 result decides
/// the match with the third rack left unset.
pub fn decide(match_: &Match, games: &[Game]) -> Decision {
    for game in games {
        if game.balled_id == Some(match_.challenger_id) {
            return Decision { winner: Side::Opponent, fouled: true };
        }
        if game.balled_id == Some(match_.opponent_id) {
            return Decision { winner: Side::Challenger, fouled: true };
        }
    }

    let challenger_wins = games
        .iter()
        .filter(|g| g.winner_id == Some(match_.challenger_id))
        .count();

    if challenger_wins >= 2 {
        Decision { winner: Side::Challenger, fouled: false }
    } else {
        Decision { winner: Side::Opponent, fouled: false }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    const CHALLENGER: i64 = 10;
    const OPPONENT: i64 = 20;

    fn match_fixture() -> Match {
        Match {
            id: 1,
            season_id: 1,
            challenger_id: CHALLENGER,
            opponent_id: OPPONENT,
            challenger_rank: Some(3),
            opponent_rank: Some(2),
            winner_id: None,
            loser_id: None,
            winner_rank: None,
            loser_rank: None,
            declined: false,
            days_to_play: 3,
            created_at: Utc::now(),
            played_at: None,
        }
    }

    fn games(results: [(Option<i64>, Option<i64>); 3]) -> Vec<Game> {
        results
            .into_iter()
            .enumerate()
            .map(|(index, (winner_id, balled_id))| Game {
                id: index as i64 + 1,
                match_id: 1,
                game_index: index as i64,
                winner_id,
                balled_id,
            })
            .collect()
    }

    #[test]
    fn two_straight_wins_decide_with_third_rack_unset() {
        let decision = decide(
            &match_fixture(),
            &games([(Some(CHALLENGER), None), (Some(CHALLENGER), None), (None, None)]),
        );
        assert_eq!(decision, Decision { winner: Side::Challenger, fouled: false });
    }

    #[test]
    fn split_racks_go_to_whoever_takes_two() {
        let decision = decide(
            &match_fixture(),
            &games([
                (Some(CHALLENGER), None),
                (Some(OPPONENT), None),
                (Some(CHALLENGER), None),
            ]),
        );
        assert_eq!(decision.winner, Side::Challenger);

        let decision = decide(
            &match_fixture(),
            &games([
                (Some(OPPONENT), None),
                (Some(CHALLENGER), None),
                (Some(OPPONENT), None),
            ]),
        );
        assert_eq!(decision.winner, Side::Opponent);
    }

    #[test]
    fn foul_overrides_any_tally() {
        // Challenger takes both racks but fouls in the first.
        let decision = decide(
            &match_fixture(),
            &games([
                (Some(CHALLENGER), Some(CHALLENGER)),
                (Some(CHALLENGER), None),
                (None, None),
            ]),
        );
        assert_eq!(decision, Decision { winner: Side::Opponent, fouled: true });
    }

    #[test]
    fn first_foul_in_index_order_decides() {
        let decision = decide(
            &match_fixture(),
            &games([
                (Some(OPPONENT), Some(OPPONENT)),
                (None, Some(CHALLENGER)),
                (None, None),
            ]),
        );
        assert_eq!(decision, Decision { winner: Side::Challenger, fouled: true });
    }

    #[test]
    fn unset_racks_count_for_neither_side() {
        // Nobody recorded anything: opponent takes it by default tally.
        let decision = decide(&match_fixture(), &games([(None, None), (None, None), (None, None)]));
        assert_eq!(decision, Decision { winner: Side::Opponent, fouled: false });
    }

    #[test]
    fn winner_takes_the_better_rank() {
        assert_eq!(rank_candidates(3, 2), (2, 3));
        assert_eq!(rank_candidates(2, 3), (2, 3));
    }
}
