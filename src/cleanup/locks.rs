// src/cleanup/locks.rs
// =============================================================================
// One async mutex per owning content.
//
// Two clean-ups of the same content must not interleave (one reading the
// current links while the other deletes). Clean-ups of different content
// don't share anything and run in parallel.
// =============================================================================

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::content::ParentRef;

#[derive(Debug, Default)]
pub struct OwnerLocks {
    locks: Mutex<HashMap<ParentRef, Arc<Mutex<()>>>>,
}

impl OwnerLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until no one else holds the lock for `parent`.
    ///
    /// The lock is released when the returned guard is dropped.
    pub async fn lock(&self, parent: &ParentRef) -> OwnedMutexGuard<()> {
        let mutex = {
            let mut locks = self.locks.lock().await;
            // Forget locks nobody holds or waits for
            locks.retain(|_, m| Arc::strong_count(m) > 1);
            Arc::clone(locks.entry(parent.clone()).or_default())
        };
        mutex.lock_owned().await
    }

    /// Number of owners with a live lock.
    pub async fn active(&self) -> usize {
        self.locks
            .lock()
            .await
            .values()
            .filter(|m| Arc::strong_count(m) > 1)
            .count()
    }
}
