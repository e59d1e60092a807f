//! Per-key async mutual exclusion.
//!
//! Invocations on the same request id queue behind one another; different
//! ids never contend. Entries are dropped once nobody holds or awaits them,
//! so the map only ever contains in-flight keys.
//!
//! A waiter whose future is dropped before it gets the lock has no guard to
//! clean up after it. Its entry is swept on the next `acquire` or
//! `in_flight` call.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

#[derive(Debug, Default)]
pub struct KeyedLocks {
    entries: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

/// Held for the duration of a critical section on one key.
pub struct KeyGuard<'a> {
    locks: &'a KeyedLocks,
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, key: &str) -> KeyGuard<'_> {
        let entry = {
            let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
            sweep(&mut entries);
            entries
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        let guard = entry.lock_owned().await;
        KeyGuard {
            locks: self,
            key: key.to_string(),
            guard: Some(guard),
        }
    }

    /// Number of keys currently held or awaited.
    pub fn in_flight(&self) -> usize {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        sweep(&mut entries);
        entries.len()
    }
}

/// Drop entries only the map still references. Handles are cloned under the
/// map lock, so a count of one cannot race with a new waiter.
fn sweep(entries: &mut HashMap<String, Arc<AsyncMutex<()>>>) {
    entries.retain(|_, entry| Arc::strong_count(entry) > 1);
}

impl Drop for KeyGuard<'_> {
    fn drop(&mut self) {
        // Release first so the strong count below excludes our own handle.
        self.guard.take();
        let mut entries = self.locks.entries.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(entry) = entries.get(&self.key) {
            if Arc::strong_count(entry) == 1 {
                entries.remove(&self.key);
            }
        }
    }
}
