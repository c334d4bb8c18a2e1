use crate::duel::{DuelId, DuelStatus, UserId};
use crate::questions::Difficulty;

#[derive(Debug, thiserror::Error)]
pub enum DuelError {
    #[error("challenger and opponent must be different users")]
    InvalidParticipant,
    #[error("user {0} may not perform this action")]
    NotAuthorized(UserId),
    #[error("duel {0} not found")]
    NotFound(DuelId),
    #[error("duel is {actual}, expected {expected}")]
    InvalidState {
        expected: DuelStatus,
        actual: DuelStatus,
    },
    #[error("user {0} is already in an active duel")]
    AlreadyInDuel(UserId),
    #[error("user {user} already answered round {round}")]
    DuplicateAnswer { user: UserId, round: u32 },
    #[error("submitted round {submitted}, active round is {active}")]
    RoundMismatch { submitted: u32, active: u32 },
    #[error("no unused questions for subject '{subject}' at difficulty {difficulty}")]
    NoQuestionsAvailable {
        subject: String,
        difficulty: Difficulty,
    },
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}
