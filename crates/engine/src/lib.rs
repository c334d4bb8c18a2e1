pub mod duel;
pub mod error;
pub mod notify;
pub mod questions;
pub mod repo;
pub mod scoring;
pub mod service;
pub mod view;

pub use duel::{CancelReason, Duel, DuelId, DuelQuestion, DuelStatus, Side, UserId, unix_millis};
pub use error::DuelError;
pub use notify::{DuelEvent, Notification, NotificationHub, Topic};
pub use questions::{
    AnswerOption, Difficulty, MemoryBank, Question, QuestionBank, QuestionId, QuestionSnapshot,
};
pub use repo::{DuelRepository, MemoryRepository};
pub use scoring::{RoundOutcome, apply_outcome, decide_winner, resolve_round};
pub use service::{DuelConfig, DuelService, DuelSummary};
pub use view::{DuelView, QuestionView, RoundView};
