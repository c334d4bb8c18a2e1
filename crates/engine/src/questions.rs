use std::collections::HashSet;
use std::fmt;

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::error::DuelError;

pub type QuestionId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerOption {
    pub key: String,
    pub text: String,
}

/// Bank entry. Editable over time, which is why duels never reference these
/// directly and instead embed a [`QuestionSnapshot`] per round.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: QuestionId,
    pub subject: String,
    pub difficulty: Difficulty,
    pub statement: String,
    pub options: Vec<AnswerOption>,
    pub correct_option: String,
    #[serde(default)]
    pub resolution: Option<String>,
}

impl Question {
    pub fn snapshot(&self) -> QuestionSnapshot {
        QuestionSnapshot {
            question_id: self.id,
            statement: self.statement.clone(),
            options: self.options.clone(),
            correct_option: self.correct_option.clone(),
            resolution: self.resolution.clone(),
        }
    }
}

/// Immutable copy of a question taken at round-creation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionSnapshot {
    pub question_id: QuestionId,
    pub statement: String,
    pub options: Vec<AnswerOption>,
    pub correct_option: String,
    pub resolution: Option<String>,
}

impl QuestionSnapshot {
    pub fn is_correct(&self, answer_index: usize) -> bool {
        self.options
            .get(answer_index)
            .is_some_and(|opt| opt.key == self.correct_option)
    }
}

pub trait QuestionBank: Send + Sync {
    fn draw(
        &self,
        subject: &str,
        difficulty: Difficulty,
        exclude: &HashSet<QuestionId>,
    ) -> Result<QuestionSnapshot, DuelError>;
}

#[derive(Debug, Default)]
pub struct MemoryBank {
    questions: Vec<Question>,
}

impl MemoryBank {
    pub fn new(questions: Vec<Question>) -> Self {
        Self { questions }
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

impl QuestionBank for MemoryBank {
    fn draw(
        &self,
        subject: &str,
        difficulty: Difficulty,
        exclude: &HashSet<QuestionId>,
    ) -> Result<QuestionSnapshot, DuelError> {
        let candidates: Vec<&Question> = self
            .questions
            .iter()
            .filter(|q| q.subject == subject && q.difficulty == difficulty)
            .filter(|q| !exclude.contains(&q.id))
            .collect();

        candidates
            .choose(&mut rand::thread_rng())
            .map(|q| q.snapshot())
            .ok_or_else(|| DuelError::NoQuestionsAvailable {
                subject: subject.to_string(),
                difficulty,
            })
    }
}
