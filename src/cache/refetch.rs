//! Background refetch scheduling
//!
//! Stale keys are queued at most once; marking a key stale again while it
//! waits does not schedule a second refetch.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Notify;

use super::key::CacheKey;
use crate::types::Result;

/// Loads the server value for a key
#[async_trait]
pub trait QueryFetcher: Send + Sync {
    async fn fetch(&self, key: &CacheKey) -> Result<Value>;
}

/// FIFO of keys awaiting refetch, deduplicated
#[derive(Debug, Default)]
pub struct RefetchQueue {
    pending: Mutex<VecDeque<CacheKey>>,
    notify: Notify,
}

impl RefetchQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<CacheKey>> {
        self.pending.lock().unwrap_or_else(|poisoned| {
            tracing::error!("Refetch queue mutex poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Queue a key. Returns false if it was already waiting.
    pub fn schedule(&self, key: CacheKey) -> bool {
        let mut pending = self.lock();
        if pending.contains(&key) {
            return false;
        }
        pending.push_back(key);
        drop(pending);
        self.notify.notify_one();
        true
    }

    /// Take every waiting key in scheduling order
    pub fn drain(&self) -> Vec<CacheKey> {
        self.lock().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.lock().contains(key)
    }

    /// Resolves once something has been scheduled since the last wait
    pub async fn scheduled(&self) {
        self.notify.notified().await
    }
}

/// Outcome of one drain pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefetchReport {
    pub refreshed: Vec<CacheKey>,
    pub failed: Vec<CacheKey>,
}

impl RefetchReport {
    pub fn total(&self) -> usize {
        self.refreshed.len() + self.failed.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::keys;

    #[test]
    fn test_schedule_dedupes() {
        let queue = RefetchQueue::new();
        assert!(queue.schedule(keys::surveys()));
        assert!(!queue.schedule(keys::surveys()));
        assert!(queue.schedule(keys::survey("s-1")));
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_drain_preserves_order_and_empties() {
        let queue = RefetchQueue::new();
        queue.schedule(keys::survey("s-2"));
        queue.schedule(keys::survey("s-1"));
        assert_eq!(
            queue.drain(),
            vec![keys::survey("s-2"), keys::survey("s-1")]
        );
        assert!(queue.is_empty());
        assert!(queue.schedule(keys::survey("s-2")));
    }

    #[tokio::test]
    async fn test_scheduled_wakes_after_schedule() {
        let queue = RefetchQueue::new();
        queue.schedule(keys::teams());
        tokio::time::timeout(std::time::Duration::from_secs(1), queue.scheduled())
            .await
            .unwrap();
    }
}
