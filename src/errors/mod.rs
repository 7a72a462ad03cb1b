use thiserror::Error;

/// Structured reason for a policy refusal. These are expected, recoverable
/// outcomes and carry no partial state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DenyReason {
    #[error("target is outside the challengeable rank window")]
    RankWindow,
    #[error("player already has an open challenge")]
    OpenChallenge,
    #[error("player is resting after a recent match")]
    CoolingDown,
    #[error("player is not on the active ladder")]
    Inactive,
    #[error("only the opponent of the match may do this")]
    NotOpponent,
    #[error("match is no longer pending")]
    NotPending,
    #[error("days to play is already at the configured maximum")]
    DeadlineCap,
    #[error("rank 1 can never decline a challenge")]
    TopRank,
    #[error("declining requires two consecutive incoming challenges")]
    DeclineStreak,
    #[error("match has already been adjudicated")]
    AlreadyPlayed,
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{0}")]
    PolicyDenied(DenyReason),
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },
    /// Programming or integrity error. The surrounding transaction is rolled
    /// back; nothing is committed.
    #[error("ladder invariant violated: {0}")]
    InvariantViolation(String),
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl EngineError {
    pub fn denied(reason: DenyReason) -> Self {
        EngineError::PolicyDenied(reason)
    }

    pub fn not_found(entity: &'static str, id: i64) -> Self {
        EngineError::NotFound { entity, id }
    }

    pub fn invariant(message: impl Into<String>) -> Self {
        EngineError::InvariantViolation(message.into())
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
