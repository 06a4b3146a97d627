use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

/// Keyed async mutexes serializing mutations per lobby/game document.
///
/// Join, leave, ready-toggle, launch, and guess/skip are all
/// read-modify-write cycles against a single document; without native
/// document-level atomicity in the store, holding the entity's mutex for
/// the whole cycle is the sole mechanism preventing lost updates.
#[derive(Default)]
pub struct EntityLocks {
    locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl EntityLocks {
    /// Create an empty lock registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the mutex for the given entity, creating it on first use.
    ///
    /// The guard is owned so it can be held across awaits while the
    /// registry itself is not borrowed.
    pub async fn acquire(&self, id: Uuid) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .entry(id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }

    /// Drop the mutex for an entity that no longer exists (deleted lobby).
    ///
    /// A concurrent holder keeps its guard alive through its own `Arc`;
    /// late arrivals simply mint a fresh mutex and then fail their
    /// not-found check.
    pub fn discard(&self, id: Uuid) {
        self.locks.remove(&id);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[tokio::test]
    async fn serializes_critical_sections_per_entity() {
        let locks = Arc::new(EntityLocks::new());
        let id = Uuid::new_v4();
        let counter = Arc::new(tokio::sync::Mutex::new(0u32));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let locks = Arc::clone(&locks);
            let counter = Arc::clone(&counter);
            handles.push(tokio::spawn(async move {
                let _guard = locks.acquire(id).await;
                let mut value = counter.lock().await;
                let read = *value;
                tokio::task::yield_now().await;
                *value = read + 1;
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(*counter.lock().await, 16);
    }

    #[tokio::test]
    async fn distinct_entities_do_not_contend() {
        let locks = EntityLocks::new();
        let first = locks.acquire(Uuid::new_v4()).await;
        // A second entity's lock must be acquirable while the first is held.
        let second = locks.acquire(Uuid::new_v4()).await;
        drop(first);
        drop(second);
    }
}
