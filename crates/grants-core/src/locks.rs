//! Keyed async locks.
//!
//! One mutex per key, created on first use. Used to serialise the status transition of a
//! parent instance and the delivery of writes for a single field.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

pub struct KeyedLocks<K> {
    inflight: Mutex<HashMap<K, Arc<Mutex<()>>>>,
}

impl<K> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self {
            inflight: Mutex::new(HashMap::new()),
        }
    }
}

impl<K: Eq + Hash + Clone> KeyedLocks<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `key`. Access is released when the guard drops.
    pub async fn acquire(&self, key: &K) -> OwnedMutexGuard<()> {
        let lock = {
            let mut inflight = self.inflight.lock().await;
            // Entries nobody holds or waits on can go.
            inflight.retain(|k, lock| k == key || Arc::strong_count(lock) > 1);
            Arc::clone(
                inflight
                    .entry(key.clone())
                    .or_insert_with(|| Arc::new(Mutex::new(()))),
            )
        };
        lock.lock_owned().await
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.inflight.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_key_is_exclusive() {
        let locks = Arc::new(KeyedLocks::<String>::new());
        let key = "parent".to_string();

        let guard = locks.acquire(&key).await;
        let waiter = {
            let locks = Arc::clone(&locks);
            let key = key.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire(&key).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        waiter.await.unwrap();
    }

    #[tokio::test]
    async fn different_keys_do_not_block_and_idle_entries_are_pruned() {
        let locks = KeyedLocks::<u32>::new();
        let _a = locks.acquire(&1).await;
        let _b = locks.acquire(&2).await;
        assert_eq!(locks.len().await, 2);

        drop(_b);
        let _c = locks.acquire(&3).await;
        assert_eq!(locks.len().await, 2);
    }
}
