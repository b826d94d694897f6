//! Mutations with optimistic updates
//!
//! ## Lifecycle
//!
//! ```text
//! apply optimistic overrides (undo records captured)
//!         |
//!   await network call ----[scope ended]----> rollback, mark touched stale
//!         |                                    (late result discarded)
//!    ok / \ err
//!      /   \
//! confirm   rollback, return error
//! invalidate
//! ```
//!
//! Overrides are visible to readers as soon as `run_mutation` starts. When
//! two mutations touch the same entry, the later override is what readers
//! see, and the confirmed value follows whichever response resolves last.

use std::future::Future;

use serde_json::Value;
use tracing::{debug, info, warn};

use super::entry::{MutationId, UndoRecord};
use super::key::{CacheKey, InvalidationRule};
use super::store::QueryCache;
use crate::scope::LivenessScope;
use crate::types::{ReadinessError, Result};

type ApplyFn = Box<dyn FnOnce(Option<&Value>) -> Value + Send>;

/// Speculative write for one key, computed from the currently visible value
pub struct OptimisticUpdate {
    pub(crate) key: CacheKey,
    pub(crate) apply: ApplyFn,
}

impl OptimisticUpdate {
    /// Compute the override from the current value (`None` if not cached)
    pub fn with<F>(key: CacheKey, apply: F) -> Self
    where
        F: FnOnce(Option<&Value>) -> Value + Send + 'static,
    {
        Self {
            key,
            apply: Box::new(apply),
        }
    }

    /// Replace the value outright
    pub fn replace(key: CacheKey, value: Value) -> Self {
        Self::with(key, move |_| value)
    }

    /// Shallow-merge `patch` into the current object value
    pub fn merge(key: CacheKey, patch: Value) -> Self {
        Self::with(key, move |current| merge_objects(current, patch))
    }

    pub fn key(&self) -> &CacheKey {
        &self.key
    }
}

impl std::fmt::Debug for OptimisticUpdate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OptimisticUpdate")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

fn merge_objects(current: Option<&Value>, patch: Value) -> Value {
    match (current, patch) {
        (Some(Value::Object(base)), Value::Object(fields)) => {
            let mut merged = base.clone();
            merged.extend(fields);
            Value::Object(merged)
        }
        (_, patch) => patch,
    }
}

/// How a successful response reconciles touched entries
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Confirm {
    /// The server accepted the change; optimistic values become confirmed
    #[default]
    Accept,
    /// The response body is the new value of every touched entry
    Response,
    /// The response body is the new value of these keys only
    ResponseFor(Vec<CacheKey>),
}

impl Confirm {
    pub(crate) fn applies_to(&self, key: &CacheKey) -> bool {
        match self {
            Self::Accept => false,
            Self::Response => true,
            Self::ResponseFor(keys) => keys.contains(key),
        }
    }
}

/// Declaration of one mutation: what it shows early and what it invalidates
#[derive(Debug, Default)]
pub struct MutationSpec {
    name: String,
    optimistic: Vec<OptimisticUpdate>,
    confirm: Confirm,
    invalidates: Vec<InvalidationRule>,
}

impl MutationSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn optimistic(mut self, update: OptimisticUpdate) -> Self {
        self.optimistic.push(update);
        self
    }

    pub fn confirm(mut self, confirm: Confirm) -> Self {
        self.confirm = confirm;
        self
    }

    pub fn invalidates(mut self, rule: InvalidationRule) -> Self {
        self.invalidates.push(rule);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// A mutation between its optimistic write and its settlement.
///
/// Dropping it unsettled (the caller abandoned the future) rolls back.
struct PendingMutation<'a> {
    cache: &'a QueryCache,
    id: MutationId,
    name: String,
    undo: Vec<UndoRecord>,
    settled: bool,
}

impl<'a> PendingMutation<'a> {
    fn begin(cache: &'a QueryCache, name: String, optimistic: Vec<OptimisticUpdate>) -> Self {
        let id = cache.begin_mutation(&name);
        let undo = cache.apply_optimistic(id, optimistic);
        debug!(mutation = %name, id = %id, touched = undo.len(), "Mutation started");
        Self {
            cache,
            id,
            name,
            undo,
            settled: false,
        }
    }

    fn commit(mut self, response: &Value, confirm: &Confirm, invalidates: &[InvalidationRule]) {
        self.cache.confirm(self.id, &self.undo, response, confirm);
        self.cache.end_mutation(self.id);
        let invalidated = self.cache.invalidate(invalidates);
        self.settled = true;
        info!(mutation = %self.name, invalidated, "Mutation committed");
    }

    fn fail(mut self, err: ReadinessError) -> ReadinessError {
        self.cache.rollback(self.id, &self.undo);
        self.cache.end_mutation(self.id);
        self.settled = true;
        warn!(mutation = %self.name, error = %err, "Mutation failed, rolled back");
        ReadinessError::mutation_failed(self.name.clone(), err)
    }

    fn abandon(&mut self) {
        self.cache.rollback(self.id, &self.undo);
        self.cache.end_mutation(self.id);
        // The server may still have applied it
        self.cache.mark_stale(self.undo.iter().map(|r| r.key.clone()));
        self.settled = true;
        info!(mutation = %self.name, "Mutation abandoned, late result will be discarded");
    }
}

impl Drop for PendingMutation<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.abandon();
        }
    }
}

impl QueryCache {
    /// Run a mutation: apply optimistic overrides, await `operation`, then
    /// confirm and invalidate on success or roll back on failure.
    ///
    /// If `scope` ends before `operation` resolves, the overrides are rolled
    /// back, touched entries are marked stale, and `Cancelled` is returned;
    /// the operation's eventual result never reaches the cache.
    pub async fn run_mutation<F>(
        &self,
        spec: MutationSpec,
        scope: &LivenessScope,
        operation: F,
    ) -> Result<Value>
    where
        F: Future<Output = Result<Value>>,
    {
        let MutationSpec {
            name,
            optimistic,
            confirm,
            invalidates,
        } = spec;

        let mut pending = PendingMutation::begin(self, name, optimistic);

        let outcome = tokio::select! {
            biased;
            _ = scope.ended() => None,
            result = operation => Some(result),
        };

        let result = match outcome {
            Some(result) if scope.is_alive() => result,
            _ => {
                pending.abandon();
                return Err(ReadinessError::Cancelled(pending.name.clone()));
            }
        };

        match result {
            Ok(response) => {
                pending.commit(&response, &confirm, &invalidates);
                Ok(response)
            }
            Err(err) => Err(pending.fail(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{EntityKind, keys};
    use crate::types::{ErrorCategory, NetworkError, UserId};
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::oneshot;

    fn cache() -> QueryCache {
        QueryCache::new(&crate::config::CacheConfig {
            stale_time_secs: 0,
            ..Default::default()
        })
    }

    fn alice() -> UserId {
        UserId::new("u-alice")
    }

    fn rename(to: &str) -> MutationSpec {
        MutationSpec::new("rename-user")
            .optimistic(OptimisticUpdate::merge(
                keys::user(&alice()),
                json!({ "name": to }),
            ))
            .invalidates(InvalidationRule::user(alice()))
    }

    #[tokio::test]
    async fn test_failed_mutation_restores_exact_snapshot() {
        let cache = cache();
        let key = keys::user(&alice());
        cache.set_confirmed(key.clone(), json!({"name": "Bob", "team": "t-1"}));
        let before = cache.entry(&key).unwrap();

        let err = cache
            .run_mutation(rename("Alice"), &LivenessScope::new(), async {
                Err(NetworkError::from_status(500, "nope").into())
            })
            .await
            .unwrap_err();

        assert!(matches!(err, ReadinessError::MutationFailed { .. }));
        assert_eq!(err.category(), Some(ErrorCategory::Transient));
        let after = cache.entry(&key).unwrap();
        assert_eq!(after, before);
        assert_eq!(
            serde_json::to_vec(after.value().unwrap()).unwrap(),
            serde_json::to_vec(before.value().unwrap()).unwrap()
        );
        // No invalidation for a failed mutation
        assert!(cache.refetch_queue().is_empty());
        assert_eq!(cache.in_flight_mutations(), 0);
    }

    #[tokio::test]
    async fn test_optimistic_value_visible_before_resolution() {
        let cache = Arc::new(cache());
        let key = keys::user(&alice());
        cache.set_confirmed(key.clone(), json!({"name": "Bob"}));

        let (tx, rx) = oneshot::channel::<Result<Value>>();
        let runner = {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move {
                cache
                    .run_mutation(rename("Alice"), &LivenessScope::new(), async {
                        rx.await.unwrap()
                    })
                    .await
            })
        };

        tokio::time::timeout(Duration::from_secs(2), async {
            while cache.get(&key).unwrap()["name"] != "Alice" {
                tokio::time::sleep(Duration::from_millis(2)).await;
            }
        })
        .await
        .unwrap();
        assert_eq!(cache.entry(&key).unwrap().confirmed_value().unwrap()["name"], "Bob");

        tx.send(Ok(json!({"ok": true}))).unwrap();
        runner.await.unwrap().unwrap();

        let entry = cache.entry(&key).unwrap();
        assert!(!entry.is_speculative());
        assert_eq!(entry.confirmed_value().unwrap()["name"], "Alice");
        assert!(entry.is_stale(Duration::ZERO));
        assert_eq!(cache.refetch_queue().drain(), vec![key]);
    }

    #[tokio::test]
    async fn test_confirm_response_replaces_touched_entries() {
        let cache = cache();
        let key = keys::user(&alice());
        cache.set_confirmed(key.clone(), json!({"name": "Bob"}));

        let spec = rename("Alice").confirm(Confirm::Response);
        cache
            .run_mutation(spec, &LivenessScope::new(), async {
                Ok(json!({"name": "Alice", "updatedBy": "server"}))
            })
            .await
            .unwrap();

        assert_eq!(cache.get(&key).unwrap()["updatedBy"], "server");
    }

    #[tokio::test]
    async fn test_response_for_populates_untouched_key() {
        let cache = cache();
        let created = keys::survey("s-new");
        let spec = MutationSpec::new("create-survey")
            .confirm(Confirm::ResponseFor(vec![created.clone()]))
            .invalidates(InvalidationRule::Entity {
                kind: EntityKind::Survey,
                id: None,
            });

        cache
            .run_mutation(spec, &LivenessScope::new(), async {
                Ok(json!({"id": "s-new", "title": "AI readiness 2026"}))
            })
            .await
            .unwrap();

        assert_eq!(cache.get(&created).unwrap()["title"], "AI readiness 2026");
    }

    #[tokio::test]
    async fn test_rollback_removes_entry_created_optimistically() {
        let cache = cache();
        let key = keys::survey("draft");
        let spec = MutationSpec::new("create-draft")
            .optimistic(OptimisticUpdate::replace(key.clone(), json!({"title": "Draft"})));

        cache
            .run_mutation(spec, &LivenessScope::new(), async {
                Err(NetworkError::from_status(400, "bad").into())
            })
            .await
            .unwrap_err();

        assert!(!cache.contains(&key));
    }

    #[tokio::test]
    async fn test_cancelled_scope_discards_late_result() {
        let cache = Arc::new(cache());
        let key = keys::user(&alice());
        cache.set_confirmed(key.clone(), json!({"name": "Bob"}));
        let scope = LivenessScope::new();

        let (tx, rx) = oneshot::channel::<Result<Value>>();
        let runner = {
            let cache = Arc::clone(&cache);
            let scope = scope.clone();
            tokio::spawn(async move {
                cache
                    .run_mutation(rename("Alice"), &scope, async { rx.await.unwrap() })
                    .await
            })
        };

        tokio::time::timeout(Duration::from_secs(2), async {
            while cache.in_flight_mutations() == 0 {
                tokio::time::sleep(Duration::from_millis(2)).await;
            }
        })
        .await
        .unwrap();

        scope.cancel();
        let err = runner.await.unwrap().unwrap_err();
        assert!(err.is_cancelled());

        // The response arriving now has nowhere to go
        let _ = tx.send(Ok(json!({"name": "Server Alice"})));
        let entry = cache.entry(&key).unwrap();
        assert_eq!(entry.value().unwrap()["name"], "Bob");
        assert!(!entry.is_speculative());
        assert!(entry.is_stale(Duration::ZERO));
    }

    #[tokio::test]
    async fn test_dropped_future_rolls_back() {
        let cache = cache();
        let key = keys::user(&alice());
        cache.set_confirmed(key.clone(), json!({"name": "Bob"}));

        let result = tokio::time::timeout(
            Duration::from_millis(20),
            cache.run_mutation(
                rename("Alice"),
                &LivenessScope::new(),
                futures::future::pending::<Result<Value>>(),
            ),
        )
        .await;

        assert!(result.is_err());
        assert_eq!(cache.get(&key).unwrap()["name"], "Bob");
        assert_eq!(cache.in_flight_mutations(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_overrides_last_writer_visible() {
        let cache = Arc::new(cache());
        let key = keys::user(&alice());
        cache.set_confirmed(key.clone(), json!({"name": "Bob"}));

        let (tx_first, rx_first) = oneshot::channel::<Result<Value>>();
        let (tx_second, rx_second) = oneshot::channel::<Result<Value>>();

        let first = {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move {
                cache
                    .run_mutation(rename("Carol"), &LivenessScope::new(), async {
                        rx_first.await.unwrap()
                    })
                    .await
            })
        };
        tokio::time::timeout(Duration::from_secs(2), async {
            while cache.get(&key).unwrap()["name"] != "Carol" {
                tokio::time::sleep(Duration::from_millis(2)).await;
            }
        })
        .await
        .unwrap();

        let second = {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move {
                cache
                    .run_mutation(rename("Dave"), &LivenessScope::new(), async {
                        rx_second.await.unwrap()
                    })
                    .await
            })
        };
        tokio::time::timeout(Duration::from_secs(2), async {
            while cache.get(&key).unwrap()["name"] != "Dave" {
                tokio::time::sleep(Duration::from_millis(2)).await;
            }
        })
        .await
        .unwrap();

        // The earlier mutation failing must not clobber the later override
        tx_first
            .send(Err(NetworkError::from_status(409, "conflict").into()))
            .unwrap();
        first.await.unwrap().unwrap_err();
        assert_eq!(cache.get(&key).unwrap()["name"], "Dave");

        // The later mutation failing restores Bob, not the dead Carol override
        tx_second
            .send(Err(NetworkError::from_status(409, "conflict").into()))
            .unwrap();
        second.await.unwrap().unwrap_err();
        let entry = cache.entry(&key).unwrap();
        assert_eq!(entry.value().unwrap()["name"], "Bob");
        assert!(!entry.is_speculative());
    }

    /// Start `spec` on its own task; the returned sender resolves its network call
    fn start(
        cache: &Arc<QueryCache>,
        spec: MutationSpec,
    ) -> (
        oneshot::Sender<Result<Value>>,
        tokio::task::JoinHandle<Result<Value>>,
    ) {
        let (tx, rx) = oneshot::channel::<Result<Value>>();
        let cache = Arc::clone(cache);
        let handle = tokio::spawn(async move {
            cache
                .run_mutation(spec, &LivenessScope::new(), async { rx.await.unwrap() })
                .await
        });
        (tx, handle)
    }

    async fn wait_for_name(cache: &QueryCache, key: &CacheKey, name: &str) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while cache.get(key).unwrap()["name"] != name {
                tokio::time::sleep(Duration::from_millis(2)).await;
            }
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_accepted_value_survives_later_failure() {
        let cache = Arc::new(cache());
        let key = keys::user(&alice());
        cache.set_confirmed(key.clone(), json!({"name": "Bob"}));

        let (tx_first, first) = start(&cache, rename("Carol"));
        wait_for_name(&cache, &key, "Carol").await;
        let (tx_second, second) = start(&cache, rename("Dave"));
        wait_for_name(&cache, &key, "Dave").await;

        // The server accepts Carol while Dave's override is still visible
        tx_first.send(Ok(json!({"ok": true}))).unwrap();
        first.await.unwrap().unwrap();
        let entry = cache.entry(&key).unwrap();
        assert_eq!(entry.confirmed_value().unwrap()["name"], "Carol");
        assert_eq!(entry.value().unwrap()["name"], "Dave");

        tx_second
            .send(Err(NetworkError::from_status(500, "boom").into()))
            .unwrap();
        second.await.unwrap().unwrap_err();
        let entry = cache.entry(&key).unwrap();
        assert_eq!(entry.value().unwrap()["name"], "Carol");
        assert_eq!(entry.confirmed_value().unwrap()["name"], "Carol");
        assert!(!entry.is_speculative());
    }

    #[tokio::test]
    async fn test_rollback_keeps_invalidation_from_other_mutation() {
        let cache = Arc::new(cache());
        let key = keys::user(&alice());
        cache.set_confirmed(key.clone(), json!({"name": "Bob"}));

        let (tx_rename, rename_task) = start(&cache, rename("Alice"));
        wait_for_name(&cache, &key, "Alice").await;

        // An unrelated mutation commits and invalidates the same user
        cache
            .run_mutation(
                MutationSpec::new("reset-password").invalidates(InvalidationRule::user(alice())),
                &LivenessScope::new(),
                async { Ok(Value::Null) },
            )
            .await
            .unwrap();
        assert!(cache.is_stale(&key));

        tx_rename
            .send(Err(NetworkError::from_status(409, "conflict").into()))
            .unwrap();
        rename_task.await.unwrap().unwrap_err();

        assert_eq!(cache.get(&key).unwrap()["name"], "Bob");
        assert!(cache.is_stale(&key));
        assert!(cache.refetch_queue().contains(&key));
    }

    #[test]
    fn test_merge_objects() {
        let merged = merge_objects(Some(&json!({"a": 1, "b": 2})), json!({"b": 3}));
        assert_eq!(merged, json!({"a": 1, "b": 3}));
        assert_eq!(merge_objects(None, json!({"b": 3})), json!({"b": 3}));
        assert_eq!(merge_objects(Some(&json!(5)), json!("x")), json!("x"));
    }
}
