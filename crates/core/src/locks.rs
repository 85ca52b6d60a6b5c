//! Per-version async locks.
//!
//! Consolidation waits for the lock so concurrent runs serialize. Apply uses
//! `try_acquire` and reports a conflict instead of queueing. A version's slot
//! is removed when its last guard is released with nobody waiting, so the
//! registry only holds versions with an operation in flight.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use schoolplan_shared::types::VersionId;

/// Registry of one mutex per budget version and operation family.
#[derive(Debug, Default, Clone)]
pub struct VersionLocks {
    inner: Arc<DashMap<VersionId, Arc<Mutex<()>>>>,
}

impl VersionLocks {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, version_id: VersionId) -> Arc<Mutex<()>> {
        // Clone the Arc out so the shard guard is released before awaiting.
        self.inner
            .entry(version_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone()
    }

    fn guard(&self, version_id: VersionId, held: OwnedMutexGuard<()>) -> VersionGuard {
        VersionGuard {
            registry: Arc::clone(&self.inner),
            version_id,
            held: Some(held),
        }
    }

    /// Waits until the version's lock is free and takes it.
    pub async fn acquire(&self, version_id: VersionId) -> VersionGuard {
        let held = self.slot(version_id).lock_owned().await;
        self.guard(version_id, held)
    }

    /// Takes the version's lock if nobody holds it.
    #[must_use]
    pub fn try_acquire(&self, version_id: VersionId) -> Option<VersionGuard> {
        let held = self.slot(version_id).try_lock_owned().ok()?;
        Some(self.guard(version_id, held))
    }

    #[cfg(test)]
    fn slots(&self) -> usize {
        self.inner.len()
    }
}

/// Holds one version's lock until dropped.
#[derive(Debug)]
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct VersionGuard {
    registry: Arc<DashMap<VersionId, Arc<Mutex<()>>>>,
    version_id: VersionId,
    held: Option<OwnedMutexGuard<()>>,
}

impl Drop for VersionGuard {
    fn drop(&mut self) {
        drop(self.held.take());
        // Only the registry's own reference left: no holder, no waiter.
        self.registry
            .remove_if(&self.version_id, |_, slot| Arc::strong_count(slot) == 1);
    }
}
