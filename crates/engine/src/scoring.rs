use crate::duel::{Duel, DuelQuestion, Side, UserId};

/// Result of resolving one round: per-side correctness plus the score deltas
/// to apply. Pure data, no persistence involved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundOutcome {
    pub round_number: u32,
    pub challenger_correct: bool,
    pub opponent_correct: bool,
    pub challenger_delta: u32,
    pub opponent_delta: u32,
}

impl RoundOutcome {
    /// Exactly one side answered correctly.
    pub fn is_decisive(&self) -> bool {
        self.challenger_correct != self.opponent_correct
    }

    pub fn decisive_side(&self) -> Option<Side> {
        match (self.challenger_correct, self.opponent_correct) {
            (true, false) => Some(Side::Challenger),
            (false, true) => Some(Side::Opponent),
            _ => None,
        }
    }
}

/// Computes the outcome of a round once both answers are in. Returns `None`
/// for a round that is not yet resolved.
pub fn resolve_round(round: &DuelQuestion, points_per_correct: u32) -> Option<RoundOutcome> {
    let challenger_answer = round.challenger_answer_index?;
    let opponent_answer = round.opponent_answer_index?;

    let challenger_correct = round.question.is_correct(challenger_answer);
    let opponent_correct = round.question.is_correct(opponent_answer);

    Some(RoundOutcome {
        round_number: round.round_number,
        challenger_correct,
        opponent_correct,
        challenger_delta: if challenger_correct {
            points_per_correct
        } else {
            0
        },
        opponent_delta: if opponent_correct { points_per_correct } else { 0 },
    })
}

/// Side with the strictly higher cumulative score, `None` on a tie.
pub fn decide_winner(duel: &Duel) -> Option<UserId> {
    if duel.challenger_score > duel.opponent_score {
        Some(duel.challenger)
    } else if duel.opponent_score > duel.challenger_score {
        Some(duel.opponent)
    } else {
        None
    }
}

/// Applies a resolved round's outcome to the duel: stamps correctness, bumps
/// scores, and advances the round counter. Called exactly once per round.
pub fn apply_outcome(duel: &mut Duel, outcome: &RoundOutcome) {
    if let Some(round) = duel.questions.last_mut() {
        round.challenger_correct = Some(outcome.challenger_correct);
        round.opponent_correct = Some(outcome.opponent_correct);
    }
    duel.challenger_score += outcome.challenger_delta;
    duel.opponent_score += outcome.opponent_delta;
    duel.current_round += 1;
}
