//! Per-entity serialization for mutating media operations.
//!
//! The engine assumes no two mutations of the same entity overlap. Services
//! that call it from concurrent requests hold an [`EntityGuard`] for the
//! duration of each mutation.

use crate::types::EntityKey;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::OwnedMutexGuard;

type LockMap = HashMap<EntityKey, Arc<tokio::sync::Mutex<()>>>;

/// Keyed async mutex over `(entity_type, entity_id)`.
#[derive(Debug, Clone, Default)]
pub struct EntityLocks {
    inner: Arc<Mutex<LockMap>>,
}

/// Held while one entity is being mutated. Dropping it releases the entity.
#[derive(Debug)]
pub struct EntityGuard {
    key: EntityKey,
    locks: Arc<Mutex<LockMap>>,
    _guard: OwnedMutexGuard<()>,
}

impl EntityLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `key`.
    pub async fn lock(&self, key: &EntityKey) -> EntityGuard {
        let mutex = {
            let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            prune_idle(&mut map);
            Arc::clone(map.entry(key.clone()).or_default())
        };
        let guard = mutex.lock_owned().await;
        EntityGuard {
            key: key.clone(),
            locks: Arc::clone(&self.inner),
            _guard: guard,
        }
    }

    /// Number of entities currently locked or waited on.
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Drop entries only the map still references, left behind by waiters
/// that were cancelled before they got the lock.
fn prune_idle(map: &mut LockMap) {
    map.retain(|_, m| Arc::strong_count(m) > 1);
}

impl Drop for EntityGuard {
    fn drop(&mut self) {
        let mut map = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        // The map and this guard hold one reference each; anything more is a waiter.
        if map
            .get(&self.key)
            .is_some_and(|m| Arc::strong_count(m) <= 2)
        {
            map.remove(&self.key);
        }
        prune_idle(&mut map);
    }
}
