use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

use crate::duel::{Duel, DuelId, DuelStatus, UserId};
use crate::error::DuelError;

/// Durable, strongly consistent storage of duel records. All reads hand out
/// owned copies; mutations go through `update` so the service layer's
/// per-duel lock is the only writer.
pub trait DuelRepository: Send + Sync {
    fn allocate_id(&self) -> DuelId;
    fn insert(&self, duel: Duel) -> Result<(), DuelError>;
    fn get(&self, id: DuelId) -> Result<Duel, DuelError>;
    fn update(&self, duel: Duel) -> Result<(), DuelError>;

    /// Pending challenges awaiting this user's response.
    fn find_pending_for(&self, user: UserId) -> Result<Vec<Duel>, DuelError>;

    /// The user's in-progress duel, if any; the oldest one if storage ever
    /// holds several.
    fn find_active_for(&self, user: UserId) -> Result<Option<Duel>, DuelError>;

    /// Ids of pending challenges created at or before the cutoff.
    fn find_expired_pending(&self, cutoff_ms: u64) -> Result<Vec<DuelId>, DuelError>;

    fn list_in_progress(&self) -> Result<Vec<Duel>, DuelError>;
}

#[derive(Debug, Default)]
pub struct MemoryRepository {
    duels: DashMap<DuelId, Duel>,
    next_id: AtomicU64,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self {
            duels: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn len(&self) -> usize {
        self.duels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.duels.is_empty()
    }
}

impl DuelRepository for MemoryRepository {
    fn allocate_id(&self) -> DuelId {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    fn insert(&self, duel: Duel) -> Result<(), DuelError> {
        self.duels.insert(duel.id, duel);
        Ok(())
    }

    fn get(&self, id: DuelId) -> Result<Duel, DuelError> {
        self.duels
            .get(&id)
            .map(|d| d.clone())
            .ok_or(DuelError::NotFound(id))
    }

    fn update(&self, duel: Duel) -> Result<(), DuelError> {
        match self.duels.get_mut(&duel.id) {
            Some(mut slot) => {
                *slot = duel;
                Ok(())
            }
            None => Err(DuelError::NotFound(duel.id)),
        }
    }

    fn find_pending_for(&self, user: UserId) -> Result<Vec<Duel>, DuelError> {
        let mut pending: Vec<Duel> = self
            .duels
            .iter()
            .filter(|d| d.status == DuelStatus::Pending && d.opponent == user)
            .map(|d| d.clone())
            .collect();
        pending.sort_by_key(|d| d.created_at_ms);
        Ok(pending)
    }

    fn find_active_for(&self, user: UserId) -> Result<Option<Duel>, DuelError> {
        // Oldest first, so the answer is stable even if stored state ever
        // holds more than one in-progress duel for a user.
        Ok(self
            .duels
            .iter()
            .filter(|d| {
                d.status == DuelStatus::InProgress && (d.challenger == user || d.opponent == user)
            })
            .map(|d| d.clone())
            .min_by_key(|d| (d.created_at_ms, d.id)))
    }

    fn find_expired_pending(&self, cutoff_ms: u64) -> Result<Vec<DuelId>, DuelError> {
        Ok(self
            .duels
            .iter()
            .filter(|d| d.status == DuelStatus::Pending && d.created_at_ms <= cutoff_ms)
            .map(|d| d.id)
            .collect())
    }

    fn list_in_progress(&self) -> Result<Vec<Duel>, DuelError> {
        let mut active: Vec<Duel> = self
            .duels
            .iter()
            .filter(|d| d.status == DuelStatus::InProgress)
            .map(|d| d.clone())
            .collect();
        active.sort_by_key(|d| d.id);
        Ok(active)
    }
}
