use crate::domain::card::CardId;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

type LockTable = DashMap<CardId, Arc<Mutex<()>>>;

/// Row locks over cards.
///
/// A transfer holds the locks of both participants for its whole
/// read-check-write sequence. Locks are always taken in ascending id order,
/// so two transfers over the same pair cannot deadlock.
///
/// An entry lives only while some task holds or waits on it; the last guard
/// to release removes it.
#[derive(Default)]
pub struct CardLocks {
    locks: Arc<LockTable>,
}

pub struct CardGuard {
    table: Arc<LockTable>,
    ids: Vec<CardId>,
    guards: Vec<OwnedMutexGuard<()>>,
}

impl Drop for CardGuard {
    fn drop(&mut self) {
        // Each held guard keeps its mutex alive; release them first.
        self.guards.clear();
        for id in &self.ids {
            self.table.remove_if(id, |_, lock| Arc::strong_count(lock) == 1);
        }
    }
}

impl CardLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn handle(&self, id: CardId) -> Arc<Mutex<()>> {
        self.locks
            .entry(id)
            .or_insert_with(Default::default)
            .value()
            .clone()
    }

    pub async fn lock(&self, id: CardId) -> CardGuard {
        let guard = self.handle(id).lock_owned().await;
        CardGuard {
            table: self.locks.clone(),
            ids: vec![id],
            guards: vec![guard],
        }
    }

    pub async fn lock_pair(&self, a: CardId, b: CardId) -> CardGuard {
        let (first, second) = if a <= b { (a, b) } else { (b, a) };
        let mut ids = vec![first];
        if second != first {
            ids.push(second);
        }
        let mut guard = CardGuard {
            table: self.locks.clone(),
            ids,
            guards: Vec::with_capacity(2),
        };
        guard.guards.push(self.handle(first).lock_owned().await);
        if second != first {
            guard.guards.push(self.handle(second).lock_owned().await);
        }
        guard
    }

    /// Number of cards currently holding a lock entry.
    pub fn tracked(&self) -> usize {
        self.locks.len()
    }
}
