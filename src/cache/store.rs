//! Query cache service
//!
//! In-memory cache of server entities, injected wherever it is needed
//! (`SharedCache`). Entries live in a `DashMap`, so every read or write of a
//! single entry is atomic with respect to other readers.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::StreamExt;
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::entry::{CacheEntry, MutationId, Speculative, UndoRecord};
use super::key::{CacheKey, InvalidationRule};
use super::mutation::{Confirm, OptimisticUpdate};
use super::refetch::{QueryFetcher, RefetchQueue, RefetchReport};
use crate::config::CacheConfig;
use crate::scope::LivenessScope;
use crate::types::{ReadinessError, Result};

/// Shared cache handle passed to every consumer
pub type SharedCache = Arc<QueryCache>;

pub struct QueryCache {
    entries: DashMap<CacheKey, CacheEntry>,
    /// Mutations whose network call has not settled yet
    in_flight: DashMap<MutationId, String>,
    refetch: RefetchQueue,
    next_mutation: AtomicU64,
    stale_time: Duration,
    refetch_concurrency: usize,
}

impl QueryCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            entries: DashMap::new(),
            in_flight: DashMap::new(),
            refetch: RefetchQueue::new(),
            next_mutation: AtomicU64::new(1),
            stale_time: Duration::from_secs(config.stale_time_secs),
            refetch_concurrency: config.refetch_concurrency.max(1),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(&CacheConfig::default())
    }

    pub fn shared(config: &CacheConfig) -> SharedCache {
        Arc::new(Self::new(config))
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Visible value: the optimistic override if any, else the confirmed value
    pub fn get(&self, key: &CacheKey) -> Option<Value> {
        self.entries.get(key).and_then(|e| CacheEntry::value(&e).cloned())
    }

    /// Full snapshot of an entry
    pub fn entry(&self, key: &CacheKey) -> Option<CacheEntry> {
        self.entries.get(key).map(|e| e.clone())
    }

    pub fn is_stale(&self, key: &CacheKey) -> bool {
        self.entries
            .get(key)
            .is_some_and(|e| e.is_stale(self.stale_time))
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> Vec<CacheKey> {
        let mut keys: Vec<CacheKey> = self.entries.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        keys
    }

    pub fn refetch_queue(&self) -> &RefetchQueue {
        &self.refetch
    }

    pub fn in_flight_mutations(&self) -> usize {
        self.in_flight.len()
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Store a server-confirmed value. An optimistic override on the entry,
    /// if any, stays visible until its mutation settles.
    pub fn set_confirmed(&self, key: CacheKey, value: Value) {
        match self.entries.entry(key) {
            Entry::Occupied(mut o) => o.get_mut().write_confirmed(value),
            Entry::Vacant(v) => {
                debug!(key = %v.key(), "Cache entry created");
                v.insert(CacheEntry::confirmed(value));
            }
        }
    }

    pub fn remove(&self, key: &CacheKey) -> Option<CacheEntry> {
        self.entries.remove(key).map(|(_, e)| e)
    }

    pub fn clear(&self) {
        self.entries.clear();
        self.refetch.drain();
    }

    /// Mark every entry matching any rule stale and schedule one refetch per
    /// entry. Returns the number of matching entries.
    pub fn invalidate(&self, rules: &[InvalidationRule]) -> usize {
        if rules.is_empty() {
            return 0;
        }

        let mut matched = Vec::new();
        for mut entry in self.entries.iter_mut() {
            if rules.iter().any(|rule| rule.matches(entry.key())) {
                entry.stale = true;
                matched.push(entry.key().clone());
            }
        }

        let count = matched.len();
        let scheduled = matched
            .into_iter()
            .filter(|key| self.refetch.schedule(key.clone()))
            .count();
        debug!(matched = count, scheduled, "Invalidated cache entries");
        count
    }

    /// Flag keys stale and queue them, regardless of any rule
    pub(crate) fn mark_stale(&self, keys: impl IntoIterator<Item = CacheKey>) {
        for key in keys {
            if let Some(mut entry) = self.entries.get_mut(&key) {
                entry.stale = true;
                drop(entry);
                self.refetch.schedule(key);
            }
        }
    }

    // =========================================================================
    // Fetching
    // =========================================================================

    /// Read-through fetch: serve a fresh entry from cache, otherwise load it
    pub async fn fetch(&self, key: &CacheKey, fetcher: &dyn QueryFetcher) -> Result<Value> {
        self.fetch_in(&LivenessScope::new(), key, fetcher).await
    }

    /// Read-through fetch whose result is dropped if `scope` ends first
    pub async fn fetch_in(
        &self,
        scope: &LivenessScope,
        key: &CacheKey,
        fetcher: &dyn QueryFetcher,
    ) -> Result<Value> {
        if let Some(entry) = self.entries.get(key)
            && !entry.is_stale(self.stale_time)
            && let Some(value) = CacheEntry::value(&entry)
        {
            return Ok(value.clone());
        }

        let value = tokio::select! {
            biased;
            _ = scope.ended() => None,
            result = fetcher.fetch(key) => Some(result?),
        };
        let value = match value {
            Some(value) if scope.is_alive() => value,
            _ => {
                debug!(key = %key, "Fetch result discarded, scope ended");
                return Err(ReadinessError::Cancelled(format!("fetch {}", key)));
            }
        };

        self.set_confirmed(key.clone(), value.clone());
        Ok(self.get(key).unwrap_or(value))
    }

    /// Refetch every queued key through `fetcher`. Failed keys stay stale.
    pub async fn refetch_pending(&self, fetcher: &dyn QueryFetcher) -> RefetchReport {
        let keys = self.refetch.drain();
        if keys.is_empty() {
            return RefetchReport::default();
        }

        let results: Vec<(CacheKey, Result<Value>)> = futures::stream::iter(keys)
            .map(|key| async move {
                let result = fetcher.fetch(&key).await;
                (key, result)
            })
            .buffer_unordered(self.refetch_concurrency)
            .collect()
            .await;

        let mut report = RefetchReport::default();
        for (key, result) in results {
            match result {
                Ok(value) => {
                    // Entries removed while the refetch was in flight stay gone
                    if let Some(mut entry) = self.entries.get_mut(&key) {
                        entry.write_confirmed(value);
                    }
                    report.refreshed.push(key);
                }
                Err(e) => {
                    warn!(key = %key, error = %e, "Refetch failed, entry left stale");
                    report.failed.push(key);
                }
            }
        }
        report
    }

    /// Drain the refetch queue whenever something is scheduled, until `scope` ends
    pub fn spawn_refetch_worker(
        self: &Arc<Self>,
        fetcher: Arc<dyn QueryFetcher>,
        scope: LivenessScope,
    ) -> JoinHandle<()> {
        let cache = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = scope.ended() => break,
                    _ = cache.refetch.scheduled() => {}
                }
                let report = cache.refetch_pending(fetcher.as_ref()).await;
                if report.total() > 0 {
                    debug!(
                        refreshed = report.refreshed.len(),
                        failed = report.failed.len(),
                        "Refetch pass complete"
                    );
                }
            }
            debug!("Refetch worker stopped");
        })
    }

    // =========================================================================
    // Mutation Support
    // =========================================================================

    pub(crate) fn begin_mutation(&self, name: &str) -> MutationId {
        let id = MutationId(self.next_mutation.fetch_add(1, Ordering::Relaxed));
        self.in_flight.insert(id, name.to_string());
        id
    }

    pub(crate) fn end_mutation(&self, id: MutationId) {
        self.in_flight.remove(&id);
    }

    /// Apply optimistic overrides, returning one undo record per touched key.
    ///
    /// Each update closure runs under the entry's lock and must not call back
    /// into the cache.
    pub(crate) fn apply_optimistic(
        &self,
        id: MutationId,
        updates: Vec<OptimisticUpdate>,
    ) -> Vec<UndoRecord> {
        let mut undo: Vec<UndoRecord> = Vec::new();

        for OptimisticUpdate { key, apply } in updates {
            let (prior, applied) = match self.entries.entry(key.clone()) {
                Entry::Occupied(mut o) => {
                    let prior = o.get().clone();
                    let value = apply(o.get().value());
                    o.get_mut().speculative = Some(Speculative {
                        value: value.clone(),
                        owner: id,
                    });
                    (Some(prior), value)
                }
                Entry::Vacant(v) => {
                    let value = apply(None);
                    let mut entry = CacheEntry::unconfirmed();
                    entry.speculative = Some(Speculative {
                        value: value.clone(),
                        owner: id,
                    });
                    v.insert(entry);
                    (None, value)
                }
            };
            // First touch keeps the snapshot; later touches only move `applied`
            match undo.iter_mut().find(|r| r.key == key) {
                Some(record) => record.applied = applied,
                None => undo.push(UndoRecord {
                    key,
                    prior,
                    applied,
                }),
            }
        }

        undo
    }

    /// Restore touched entries to their pre-mutation snapshots.
    ///
    /// An entry whose override now belongs to a later mutation is left alone.
    /// If a confirmed write landed meanwhile, only this mutation's override is
    /// dropped; the newer confirmed value stays.
    pub(crate) fn rollback(&self, id: MutationId, undo: &[UndoRecord]) {
        for record in undo {
            let Entry::Occupied(mut o) = self.entries.entry(record.key.clone()) else {
                continue;
            };

            if !o.get().owned_by(id) {
                debug!(key = %record.key, mutation = %id, "Override owned by a later mutation, skipping rollback");
                continue;
            }

            let current_version = o.get().confirmed_version;
            match &record.prior {
                Some(prior) if prior.confirmed_version == current_version => {
                    let mut restored = prior.clone();
                    // Invalidations that landed meanwhile still stand
                    restored.stale |= o.get().stale;
                    // Never resurrect an override whose mutation already settled
                    if let Some(spec) = &restored.speculative
                        && !self.in_flight.contains_key(&spec.owner)
                    {
                        restored.speculative = None;
                    }
                    *o.get_mut() = restored;
                }
                _ if o.get().confirmed.is_some() => {
                    o.get_mut().speculative = None;
                }
                _ => {
                    o.remove();
                }
            }
            debug!(key = %record.key, mutation = %id, "Rolled back optimistic update");
        }
    }

    /// Reconcile touched entries after the server accepted the mutation
    pub(crate) fn confirm(
        &self,
        id: MutationId,
        undo: &[UndoRecord],
        response: &Value,
        policy: &Confirm,
    ) {
        for record in undo {
            let Some(mut entry) = self.entries.get_mut(&record.key) else {
                continue;
            };
            // A newer override stays visible; only the confirmed value moves
            if entry.owned_by(id) {
                entry.speculative = None;
            }
            let value = if policy.applies_to(&record.key) {
                response.clone()
            } else {
                record.applied.clone()
            };
            entry.write_confirmed(value);
        }

        // Keys the response describes that were not optimistically touched
        if let Confirm::ResponseFor(keys) = policy {
            for key in keys {
                if !undo.iter().any(|r| &r.key == key) {
                    self.set_confirmed(key.clone(), response.clone());
                }
            }
        }
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl std::fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryCache")
            .field("entries", &self.entries.len())
            .field("in_flight", &self.in_flight.len())
            .field("refetch_pending", &self.refetch.len())
            .field("stale_time", &self.stale_time)
            .finish()
    }
}
