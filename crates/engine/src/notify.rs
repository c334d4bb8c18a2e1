use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::broadcast;

use crate::duel::{CancelReason, DuelId, UserId};
use crate::questions::Difficulty;

/// Subscription key. Users subscribe to their own topic for incoming
/// challenges; both participants subscribe to the duel topic once a duel is
/// in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    User(UserId),
    Duel(DuelId),
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum DuelEvent {
    ChallengeReceived {
        challenger: UserId,
        subject: String,
        difficulty: Difficulty,
    },
    RoundResolved {
        round_number: u32,
        challenger_score: u32,
        opponent_score: u32,
        sudden_death: bool,
        next_round: Option<u32>,
    },
    DuelCompleted {
        winner: UserId,
        challenger_score: u32,
        opponent_score: u32,
    },
    DuelCancelled {
        reason: CancelReason,
    },
}

/// Wire envelope: `{"duelId": .., "type": .., "payload": ..}`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub duel_id: DuelId,
    #[serde(flatten)]
    pub event: DuelEvent,
}

/// In-process publish/subscribe fan-out. Delivery is at-most-once per
/// connection: a lagged or offline subscriber misses events and recovers by
/// re-fetching the duel, never by replay.
pub struct NotificationHub {
    topics: DashMap<Topic, broadcast::Sender<Notification>>,
    capacity: usize,
}

impl NotificationHub {
    pub fn new(capacity: usize) -> Self {
        Self {
            topics: DashMap::new(),
            capacity,
        }
    }

    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<Notification> {
        self.topics
            .entry(topic)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Best-effort publish. Returns the number of connections reached; a
    /// topic nobody listens on swallows the event. A topic whose last
    /// receiver is gone is purged so the map tracks live subscriptions only.
    pub fn publish(&self, topic: Topic, notification: Notification) -> usize {
        let sent = match self.topics.get(&topic) {
            Some(sender) => sender.send(notification).ok(),
            None => {
                log::debug!("no subscribers on {:?}, dropping event", topic);
                return 0;
            }
        };
        match sent {
            Some(receivers) => receivers,
            None => {
                log::debug!("all subscribers left {:?}, dropping topic", topic);
                self.topics.remove(&topic);
                0
            }
        }
    }

    /// Drops a topic outright. Receivers still connected drain what is
    /// already buffered and then see the stream close.
    pub fn remove(&self, topic: Topic) {
        self.topics.remove(&topic);
    }

    pub fn topic_count(&self) -> usize {
        self.topics.len()
    }
}
