use serde::Serialize;

use crate::duel::{CancelReason, Duel, DuelId, DuelQuestion, DuelStatus, Side, UserId};
use crate::questions::{AnswerOption, Difficulty, QuestionId};

/// Participant-facing projection of a duel. Unresolved rounds withhold the
/// correct option, the resolution text, the other side's answer, and both
/// correctness flags so neither participant can relay the answer mid-round.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DuelView {
    pub id: DuelId,
    pub challenger: UserId,
    pub opponent: UserId,
    pub status: DuelStatus,
    pub subject: String,
    pub difficulty: Difficulty,
    pub current_round: u32,
    pub sudden_death: bool,
    pub challenger_score: u32,
    pub opponent_score: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner: Option<UserId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancel_reason: Option<CancelReason>,
    pub questions: Vec<RoundView>,
    pub created_at_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundView {
    pub round_number: u32,
    pub difficulty: Difficulty,
    pub resolved: bool,
    pub question: QuestionView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub challenger_answer_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opponent_answer_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub challenger_correct: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opponent_correct: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionView {
    pub question_id: QuestionId,
    pub statement: String,
    pub options: Vec<AnswerOption>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_option: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
}

impl DuelView {
    pub fn of(duel: &Duel, viewer: Side) -> Self {
        Self {
            id: duel.id,
            challenger: duel.challenger,
            opponent: duel.opponent,
            status: duel.status,
            subject: duel.subject.clone(),
            difficulty: duel.difficulty,
            current_round: duel.current_round,
            sudden_death: duel.sudden_death,
            challenger_score: duel.challenger_score,
            opponent_score: duel.opponent_score,
            winner: duel.winner,
            cancel_reason: duel.cancel_reason,
            questions: duel
                .questions
                .iter()
                .map(|q| RoundView::of(q, viewer))
                .collect(),
            created_at_ms: duel.created_at_ms,
        }
    }
}

impl RoundView {
    pub fn of(round: &DuelQuestion, viewer: Side) -> Self {
        let resolved = round.is_resolved();
        let question = QuestionView {
            question_id: round.question.question_id,
            statement: round.question.statement.clone(),
            options: round.question.options.clone(),
            correct_option: resolved.then(|| round.question.correct_option.clone()),
            resolution: if resolved {
                round.question.resolution.clone()
            } else {
                None
            },
        };

        let own = round.answer_of(viewer);
        let (challenger_answer_index, opponent_answer_index) = if resolved {
            (round.challenger_answer_index, round.opponent_answer_index)
        } else {
            match viewer {
                Side::Challenger => (own, None),
                Side::Opponent => (None, own),
            }
        };

        Self {
            round_number: round.round_number,
            difficulty: round.difficulty,
            resolved,
            question,
            challenger_answer_index,
            opponent_answer_index,
            challenger_correct: resolved.then(|| round.challenger_correct).flatten(),
            opponent_correct: resolved.then(|| round.opponent_correct).flatten(),
        }
    }
}
