use std::collections::HashSet;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::DuelError;
use crate::questions::{Difficulty, QuestionId, QuestionSnapshot};

pub type UserId = u64;
pub type DuelId = u64;

pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DuelStatus {
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

impl DuelStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, DuelStatus::Completed | DuelStatus::Cancelled)
    }
}

impl fmt::Display for DuelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DuelStatus::Pending => "PENDING",
            DuelStatus::InProgress => "IN_PROGRESS",
            DuelStatus::Completed => "COMPLETED",
            DuelStatus::Cancelled => "CANCELLED",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelReason {
    Declined,
    TimedOut,
    QuestionPoolExhausted,
}

impl CancelReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            CancelReason::Declined => "declined",
            CancelReason::TimedOut => "timed out",
            CancelReason::QuestionPoolExhausted => "question pool exhausted",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Challenger,
    Opponent,
}

impl Side {
    pub fn other(&self) -> Side {
        match self {
            Side::Challenger => Side::Opponent,
            Side::Opponent => Side::Challenger,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuelQuestion {
    pub round_number: u32,
    pub question: QuestionSnapshot,
    pub difficulty: Difficulty,
    pub challenger_answer_index: Option<usize>,
    pub opponent_answer_index: Option<usize>,
    pub challenger_correct: Option<bool>,
    pub opponent_correct: Option<bool>,
}

impl DuelQuestion {
    pub fn new(round_number: u32, question: QuestionSnapshot, difficulty: Difficulty) -> Self {
        Self {
            round_number,
            question,
            difficulty,
            challenger_answer_index: None,
            opponent_answer_index: None,
            challenger_correct: None,
            opponent_correct: None,
        }
    }

    pub fn answer_of(&self, side: Side) -> Option<usize> {
        match side {
            Side::Challenger => self.challenger_answer_index,
            Side::Opponent => self.opponent_answer_index,
        }
    }

    pub fn correctness_of(&self, side: Side) -> Option<bool> {
        match side {
            Side::Challenger => self.challenger_correct,
            Side::Opponent => self.opponent_correct,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.challenger_answer_index.is_some() && self.opponent_answer_index.is_some()
    }

    fn record(&mut self, side: Side, answer_index: usize) {
        let correct = self.question.is_correct(answer_index);
        match side {
            Side::Challenger => {
                self.challenger_answer_index = Some(answer_index);
                self.challenger_correct = Some(correct);
            }
            Side::Opponent => {
                self.opponent_answer_index = Some(answer_index);
                self.opponent_correct = Some(correct);
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Duel {
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
    pub winner: Option<UserId>,
    pub cancel_reason: Option<CancelReason>,
    pub questions: Vec<DuelQuestion>,
    pub created_at_ms: u64,
}

impl Duel {
    pub fn new(
        id: DuelId,
        challenger: UserId,
        opponent: UserId,
        subject: String,
        difficulty: Difficulty,
    ) -> Result<Self, DuelError> {
        if challenger == opponent {
            return Err(DuelError::InvalidParticipant);
        }
        Ok(Self {
            id,
            challenger,
            opponent,
            status: DuelStatus::Pending,
            subject,
            difficulty,
            current_round: 0,
            sudden_death: false,
            challenger_score: 0,
            opponent_score: 0,
            winner: None,
            cancel_reason: None,
            questions: Vec::new(),
            created_at_ms: unix_millis(),
        })
    }

    pub fn side_of(&self, user: UserId) -> Option<Side> {
        if user == self.challenger {
            Some(Side::Challenger)
        } else if user == self.opponent {
            Some(Side::Opponent)
        } else {
            None
        }
    }

    pub fn participant_of(&self, side: Side) -> UserId {
        match side {
            Side::Challenger => self.challenger,
            Side::Opponent => self.opponent,
        }
    }

    pub fn score_of(&self, side: Side) -> u32 {
        match side {
            Side::Challenger => self.challenger_score,
            Side::Opponent => self.opponent_score,
        }
    }

    /// 1-based number of the round currently awaiting answers.
    pub fn active_round_number(&self) -> u32 {
        self.current_round + 1
    }

    pub fn active_round(&self) -> Option<&DuelQuestion> {
        self.questions.last().filter(|_| {
            self.status == DuelStatus::InProgress
                && self.questions.len() as u32 == self.active_round_number()
        })
    }

    pub fn used_question_ids(&self) -> HashSet<QuestionId> {
        self.questions
            .iter()
            .map(|q| q.question.question_id)
            .collect()
    }

    fn require_status(&self, expected: DuelStatus) -> Result<(), DuelError> {
        if self.status != expected {
            return Err(DuelError::InvalidState {
                expected,
                actual: self.status,
            });
        }
        Ok(())
    }

    pub fn accept(&mut self, by: UserId) -> Result<(), DuelError> {
        if by != self.opponent {
            return Err(DuelError::NotAuthorized(by));
        }
        self.require_status(DuelStatus::Pending)?;
        self.status = DuelStatus::InProgress;
        Ok(())
    }

    pub fn decline(&mut self, by: UserId) -> Result<(), DuelError> {
        if by != self.opponent {
            return Err(DuelError::NotAuthorized(by));
        }
        self.require_status(DuelStatus::Pending)?;
        self.cancel(CancelReason::Declined)
    }

    pub fn cancel(&mut self, reason: CancelReason) -> Result<(), DuelError> {
        if self.status.is_terminal() {
            return Err(DuelError::InvalidState {
                expected: DuelStatus::InProgress,
                actual: self.status,
            });
        }
        self.status = DuelStatus::Cancelled;
        self.cancel_reason = Some(reason);
        Ok(())
    }

    pub fn begin_round(&mut self, question: QuestionSnapshot) {
        let round_number = self.questions.len() as u32 + 1;
        self.questions
            .push(DuelQuestion::new(round_number, question, self.difficulty));
    }

    /// Records one participant's answer for the active round. Correctness is
    /// derived once, here, from the snapshotted correct option.
    pub fn record_answer(
        &mut self,
        by: UserId,
        round_number: u32,
        answer_index: usize,
    ) -> Result<Side, DuelError> {
        self.require_status(DuelStatus::InProgress)?;
        let side = self.side_of(by).ok_or(DuelError::NotAuthorized(by))?;

        let active = self.active_round_number();
        if round_number != active || self.questions.len() as u32 != active {
            return Err(DuelError::RoundMismatch {
                submitted: round_number,
                active,
            });
        }

        let Some(round) = self.questions.last_mut() else {
            return Err(DuelError::RoundMismatch {
                submitted: round_number,
                active,
            });
        };

        if round.answer_of(side).is_some() {
            return Err(DuelError::DuplicateAnswer {
                user: by,
                round: round_number,
            });
        }

        round.record(side, answer_index);
        Ok(side)
    }

    pub fn complete(&mut self, winner: UserId) {
        self.status = DuelStatus::Completed;
        self.winner = Some(winner);
    }
}
