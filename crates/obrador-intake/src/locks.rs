// SPDX-FileCopyrightText: 2026 Obrador Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Keyed async locks serializing work on one session.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// A lazily populated map of per-key async mutexes.
///
/// Holders of the same key run one at a time, in the order they asked for the
/// lock (tokio mutexes are fair). Different keys never contend. An entry lives
/// only while someone holds or awaits it.
#[derive(Default)]
pub struct KeyedLocks {
    inner: DashMap<String, Arc<Mutex<()>>>,
}

/// Exclusive access to one key. Dropping it unlocks the key and forgets the
/// entry once nobody else is waiting on it.
pub struct KeyedGuard<'a> {
    locks: &'a KeyedLocks,
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `key`.
    pub async fn acquire(&self, key: &str) -> KeyedGuard<'_> {
        // Clone the Arc out so the shard guard is released before awaiting.
        let mutex = self
            .inner
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        KeyedGuard {
            locks: self,
            key: key.to_string(),
            guard: Some(mutex.lock_owned().await),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl Drop for KeyedGuard<'_> {
    fn drop(&mut self) {
        // The owned guard holds a reference to the mutex; unlock first so only
        // the map's reference and those of waiters remain.
        self.guard.take();
        self.locks
            .inner
            .remove_if(&self.key, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}
