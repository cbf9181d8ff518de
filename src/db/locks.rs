//! Per-link mutation locks.
//!
//! Each key gets its own async mutex, created on first use and dropped when
//! the last holder or waiter releases it. Two tasks touching the same link are
//! serialized; tasks touching different links never wait on each other.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::OwnedMutexGuard;

type Slot = Arc<tokio::sync::Mutex<()>>;

/// Table of async locks keyed by string
#[derive(Debug, Default)]
pub struct KeyLocks {
    slots: Arc<Mutex<HashMap<String, Slot>>>,
}

/// Exclusive hold on one key, released on drop
#[derive(Debug)]
pub struct KeyLockGuard {
    key: String,
    slot: Slot,
    slots: Arc<Mutex<HashMap<String, Slot>>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl KeyLocks {
    /// Create an empty lock table
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until `key` is free and take it
    pub async fn lock(&self, key: &str) -> KeyLockGuard {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
            slots
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
                .clone()
        };

        let guard = slot.clone().lock_owned().await;

        KeyLockGuard {
            key: key.to_string(),
            slot,
            slots: self.slots.clone(),
            guard: Some(guard),
        }
    }

    /// Number of keys currently held or waited on
    #[cfg(test)]
    fn active_keys(&self) -> usize {
        self.slots.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl KeyLockGuard {
    /// The key this guard holds
    #[cfg(test)]
    fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for KeyLockGuard {
    fn drop(&mut self) {
        // Release the mutex before deciding whether the slot is still needed.
        self.guard.take();

        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        // One reference lives in the map and one in this guard; anything more is a waiter.
        if Arc::strong_count(&self.slot) <= 2
            && let Some(existing) = slots.get(&self.key)
            && Arc::ptr_eq(existing, &self.slot)
        {
            slots.remove(&self.key);
        }
    }
}
