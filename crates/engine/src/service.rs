use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::Mutex;

use crate::duel::{CancelReason, Duel, DuelId, DuelQuestion, DuelStatus, Side, UserId, unix_millis};
use crate::error::DuelError;
use crate::notify::{DuelEvent, Notification, NotificationHub, Topic};
use crate::questions::{Difficulty, QuestionBank};
use crate::repo::DuelRepository;
use crate::scoring;

#[derive(Debug, Clone, Copy)]
pub struct DuelConfig {
    /// Fixed round count before tie-break kicks in.
    pub regular_rounds: u32,
    pub points_per_correct: u32,
}

impl Default for DuelConfig {
    fn default() -> Self {
        Self {
            regular_rounds: 5,
            points_per_correct: 1,
        }
    }
}

/// Summary row for operator tooling.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DuelSummary {
    pub id: DuelId,
    pub challenger: UserId,
    pub opponent: UserId,
    pub active_round: u32,
    pub challenger_score: u32,
    pub opponent_score: u32,
    pub sudden_death: bool,
}

/// Entry point for every duel operation. Calls for different duels run
/// concurrently; calls for the same duel serialize on a per-duel mutex so a
/// round can never resolve twice or award double score. Events are published
/// only after the repository write commits.
pub struct DuelService {
    repo: Arc<dyn DuelRepository>,
    bank: Arc<dyn QuestionBank>,
    hub: Arc<NotificationHub>,
    config: DuelConfig,
    locks: DashMap<DuelId, Arc<Mutex<()>>>,
}

impl DuelService {
    pub fn new(
        repo: Arc<dyn DuelRepository>,
        bank: Arc<dyn QuestionBank>,
        hub: Arc<NotificationHub>,
        config: DuelConfig,
    ) -> Self {
        Self {
            repo,
            bank,
            hub,
            config,
            locks: DashMap::new(),
        }
    }

    pub fn hub(&self) -> &Arc<NotificationHub> {
        &self.hub
    }

    pub fn config(&self) -> DuelConfig {
        self.config
    }

    /// Terminal-duel cleanup: the lock entry and the duel topic are both
    /// keyed per duel and would otherwise accumulate forever.
    fn release(&self, id: DuelId) {
        self.locks.remove(&id);
        self.hub.remove(Topic::Duel(id));
    }

    fn lock_for(&self, id: DuelId) -> Arc<Mutex<()>> {
        self.locks
            .entry(id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    pub fn create_challenge(
        &self,
        challenger: UserId,
        opponent: UserId,
        subject: String,
        difficulty: Difficulty,
    ) -> Result<Duel, DuelError> {
        let duel = Duel::new(self.repo.allocate_id(), challenger, opponent, subject, difficulty)?;
        self.repo.insert(duel.clone())?;

        self.hub.publish(
            Topic::User(opponent),
            Notification {
                duel_id: duel.id,
                event: DuelEvent::ChallengeReceived {
                    challenger,
                    subject: duel.subject.clone(),
                    difficulty,
                },
            },
        );
        log::info!(
            "duel {} challenged: {} -> {} ({})",
            duel.id,
            challenger,
            opponent,
            duel.subject
        );
        Ok(duel)
    }

    pub async fn accept(&self, duel_id: DuelId, by: UserId) -> Result<Duel, DuelError> {
        let lock = self.lock_for(duel_id);
        let _guard = lock.lock().await;

        let mut duel = self.repo.get(duel_id)?;
        if by != duel.opponent {
            return Err(DuelError::NotAuthorized(by));
        }
        // One in-progress duel per user; other challenges stay pending.
        for user in [duel.challenger, duel.opponent] {
            if self.repo.find_active_for(user)?.is_some() {
                return Err(DuelError::AlreadyInDuel(user));
            }
        }
        duel.accept(by)?;

        match self
            .bank
            .draw(&duel.subject, duel.difficulty, &duel.used_question_ids())
        {
            Ok(snapshot) => duel.begin_round(snapshot),
            Err(err @ DuelError::NoQuestionsAvailable { .. }) => {
                duel.cancel(CancelReason::QuestionPoolExhausted)?;
                self.repo.update(duel.clone())?;
                self.publish_cancelled(&duel);
                self.release(duel_id);
                return Err(err);
            }
            Err(err) => return Err(err),
        }

        self.repo.update(duel.clone())?;
        log::info!("duel {} accepted by {}", duel_id, by);
        Ok(duel)
    }

    pub async fn decline(&self, duel_id: DuelId, by: UserId) -> Result<(), DuelError> {
        let lock = self.lock_for(duel_id);
        let _guard = lock.lock().await;

        let mut duel = self.repo.get(duel_id)?;
        duel.decline(by)?;
        self.repo.update(duel.clone())?;

        self.publish_cancelled(&duel);
        self.release(duel_id);
        log::info!("duel {} declined by {}", duel_id, by);
        Ok(())
    }

    /// Records one answer; when it is the second distinct slot of the round,
    /// resolves the round and advances the duel per the lifecycle rules.
    /// Returns the round as it stands after this call.
    pub async fn submit_answer(
        &self,
        duel_id: DuelId,
        by: UserId,
        round_number: u32,
        answer_index: usize,
    ) -> Result<(DuelQuestion, Side), DuelError> {
        let lock = self.lock_for(duel_id);
        let _guard = lock.lock().await;

        let mut duel = self.repo.get(duel_id)?;
        let side = duel.record_answer(by, round_number, answer_index)?;

        let mut events: Vec<(Topic, Notification)> = Vec::new();
        let outcome = duel
            .active_round()
            .and_then(|round| scoring::resolve_round(round, self.config.points_per_correct));

        if let Some(outcome) = outcome {
            scoring::apply_outcome(&mut duel, &outcome);
            self.advance(&mut duel, &outcome, &mut events)?;
        }

        let round = duel
            .questions
            .iter()
            .find(|q| q.round_number == round_number)
            .cloned()
            .ok_or(DuelError::RoundMismatch {
                submitted: round_number,
                active: duel.active_round_number(),
            })?;

        // Commit before any event leaves the engine.
        self.repo.update(duel.clone())?;
        for (topic, note) in events {
            self.hub.publish(topic, note);
        }
        if duel.status.is_terminal() {
            self.release(duel_id);
        }

        Ok((round, side))
    }

    /// Post-resolution progression: next regular round, sudden death, or
    /// completion. Only fills `events`; publishing happens after commit.
    fn advance(
        &self,
        duel: &mut Duel,
        outcome: &scoring::RoundOutcome,
        events: &mut Vec<(Topic, Notification)>,
    ) -> Result<(), DuelError> {
        let mut completed = false;

        if duel.sudden_death {
            if let Some(side) = outcome.decisive_side() {
                // First decisive sudden-death round wins outright.
                duel.complete(duel.participant_of(side));
                completed = true;
            }
        } else if duel.current_round >= self.config.regular_rounds {
            match scoring::decide_winner(duel) {
                Some(winner) => {
                    duel.complete(winner);
                    completed = true;
                }
                None => duel.sudden_death = true,
            }
        }

        if !completed {
            match self
                .bank
                .draw(&duel.subject, duel.difficulty, &duel.used_question_ids())
            {
                Ok(snapshot) => duel.begin_round(snapshot),
                Err(DuelError::NoQuestionsAvailable { .. }) => {
                    // Terminal for the duel, not for this submission: the
                    // answer that exhausted the pool still counted.
                    duel.cancel(CancelReason::QuestionPoolExhausted)?;
                    log::warn!("duel {} cancelled: question pool exhausted", duel.id);
                    events.extend(self.cancelled_events(duel));
                    events.insert(0, self.round_resolved_event(duel, outcome, None));
                    return Ok(());
                }
                Err(err) => return Err(err),
            }
        }

        let next_round = (!completed).then(|| duel.active_round_number());
        events.push(self.round_resolved_event(duel, outcome, next_round));

        if completed {
            if let Some(winner) = duel.winner {
                log::info!(
                    "duel {} completed: winner {} ({}-{})",
                    duel.id,
                    winner,
                    duel.challenger_score,
                    duel.opponent_score
                );
                events.push((
                    Topic::Duel(duel.id),
                    Notification {
                        duel_id: duel.id,
                        event: DuelEvent::DuelCompleted {
                            winner,
                            challenger_score: duel.challenger_score,
                            opponent_score: duel.opponent_score,
                        },
                    },
                ));
            }
        }

        Ok(())
    }

    fn round_resolved_event(
        &self,
        duel: &Duel,
        outcome: &scoring::RoundOutcome,
        next_round: Option<u32>,
    ) -> (Topic, Notification) {
        (
            Topic::Duel(duel.id),
            Notification {
                duel_id: duel.id,
                event: DuelEvent::RoundResolved {
                    round_number: outcome.round_number,
                    challenger_score: duel.challenger_score,
                    opponent_score: duel.opponent_score,
                    sudden_death: duel.sudden_death,
                    next_round,
                },
            },
        )
    }

    fn cancelled_events(&self, duel: &Duel) -> Vec<(Topic, Notification)> {
        let Some(reason) = duel.cancel_reason else {
            return Vec::new();
        };
        let note = |topic| {
            (
                topic,
                Notification {
                    duel_id: duel.id,
                    event: DuelEvent::DuelCancelled { reason },
                },
            )
        };
        vec![
            note(Topic::Duel(duel.id)),
            note(Topic::User(duel.challenger)),
            note(Topic::User(duel.opponent)),
        ]
    }

    fn publish_cancelled(&self, duel: &Duel) {
        for (topic, note) in self.cancelled_events(duel) {
            self.hub.publish(topic, note);
        }
    }

    pub fn get(&self, duel_id: DuelId, caller: UserId) -> Result<(Duel, Side), DuelError> {
        let duel = self.repo.get(duel_id)?;
        let side = duel.side_of(caller).ok_or(DuelError::NotAuthorized(caller))?;
        Ok((duel, side))
    }

    pub fn pending_for(&self, user: UserId) -> Result<Vec<Duel>, DuelError> {
        self.repo.find_pending_for(user)
    }

    pub fn active_for(&self, user: UserId) -> Result<Option<Duel>, DuelError> {
        self.repo.find_active_for(user)
    }

    /// External timeout policy entry point: cancels pending challenges at
    /// least `max_age_ms` old. Returns the ids that were expired.
    pub async fn expire_pending(&self, max_age_ms: u64) -> Result<Vec<DuelId>, DuelError> {
        let cutoff = unix_millis().saturating_sub(max_age_ms);
        let mut expired = Vec::new();

        for duel_id in self.repo.find_expired_pending(cutoff)? {
            let lock = self.lock_for(duel_id);
            let _guard = lock.lock().await;

            let mut duel = match self.repo.get(duel_id) {
                Ok(d) => d,
                Err(DuelError::NotFound(_)) => continue,
                Err(err) => return Err(err),
            };
            // Re-check under the lock; an accept may have won the race.
            if duel.status != DuelStatus::Pending {
                continue;
            }
            duel.cancel(CancelReason::TimedOut)?;
            self.repo.update(duel.clone())?;
            self.publish_cancelled(&duel);
            self.release(duel_id);
            expired.push(duel_id);
            log::info!("duel {} expired after {}ms pending", duel_id, max_age_ms);
        }

        Ok(expired)
    }

    pub fn overview(&self) -> Result<Vec<DuelSummary>, DuelError> {
        Ok(self
            .repo
            .list_in_progress()?
            .iter()
            .map(|d| DuelSummary {
                id: d.id,
                challenger: d.challenger,
                opponent: d.opponent,
                active_round: d.active_round_number(),
                challenger_score: d.challenger_score,
                opponent_score: d.opponent_score,
                sudden_death: d.sudden_death,
            })
            .collect())
    }
}
