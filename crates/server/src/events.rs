use duel::{CancelReason, DuelId, UserId};

#[derive(Debug, Clone)]
pub enum OpsEvent {
    ChallengeCreated {
        duel_id: DuelId,
        challenger: UserId,
        opponent: UserId,
    },
    DuelStarted {
        duel_id: DuelId,
    },
    RoundResolved {
        duel_id: DuelId,
        round_number: u32,
        challenger_score: u32,
        opponent_score: u32,
    },
    DuelCompleted {
        duel_id: DuelId,
        winner: UserId,
    },
    DuelCancelled {
        duel_id: DuelId,
        reason: CancelReason,
    },
    Error {
        message: String,
    },
}

impl OpsEvent {
    pub fn describe(&self) -> String {
        match self {
            OpsEvent::ChallengeCreated {
                duel_id,
                challenger,
                opponent,
            } => format!(
                "duel {}: user {} challenged user {}",
                duel_id, challenger, opponent
            ),
            OpsEvent::DuelStarted { duel_id } => format!("duel {}: started", duel_id),
            OpsEvent::RoundResolved {
                duel_id,
                round_number,
                challenger_score,
                opponent_score,
            } => format!(
                "duel {}: round {} resolved ({}-{})",
                duel_id, round_number, challenger_score, opponent_score
            ),
            OpsEvent::DuelCompleted { duel_id, winner } => {
                format!("duel {}: completed, winner {}", duel_id, winner)
            }
            OpsEvent::DuelCancelled { duel_id, reason } => {
                format!("duel {}: cancelled ({})", duel_id, reason.as_str())
            }
            OpsEvent::Error { message } => format!("error: {}", message),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, OpsEvent::Error { .. })
    }
}
