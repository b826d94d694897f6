//! Cache entries and undo records

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::time::Duration;

use super::key::CacheKey;

/// Identifier of one mutation run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MutationId(pub(crate) u64);

impl std::fmt::Display for MutationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "m{}", self.0)
    }
}

/// Optimistic value written ahead of server confirmation
#[derive(Debug, Clone, PartialEq)]
pub struct Speculative {
    pub value: Value,
    pub owner: MutationId,
}

/// One cached server entity.
///
/// The confirmed value is kept alongside any speculative override, so
/// discarding the override always leaves the last server-confirmed state.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub(crate) confirmed: Option<Value>,
    pub(crate) speculative: Option<Speculative>,
    pub(crate) stale: bool,
    /// Bumped on every confirmed write
    pub(crate) confirmed_version: u64,
    pub(crate) updated_at: DateTime<Utc>,
}

impl CacheEntry {
    pub(crate) fn confirmed(value: Value) -> Self {
        Self {
            confirmed: Some(value),
            speculative: None,
            stale: false,
            confirmed_version: 1,
            updated_at: Utc::now(),
        }
    }

    /// Entry that exists only because an optimistic write created it
    pub(crate) fn unconfirmed() -> Self {
        Self {
            confirmed: None,
            speculative: None,
            stale: false,
            confirmed_version: 0,
            updated_at: Utc::now(),
        }
    }

    /// What readers see: the override if present, otherwise the confirmed value
    pub fn value(&self) -> Option<&Value> {
        self.speculative
            .as_ref()
            .map(|s| &s.value)
            .or(self.confirmed.as_ref())
    }

    pub fn confirmed_value(&self) -> Option<&Value> {
        self.confirmed.as_ref()
    }

    pub fn speculative(&self) -> Option<&Speculative> {
        self.speculative.as_ref()
    }

    pub fn is_speculative(&self) -> bool {
        self.speculative.is_some()
    }

    /// Explicitly invalidated, or older than `stale_time` (zero disables aging)
    pub fn is_stale(&self, stale_time: Duration) -> bool {
        if self.stale {
            return true;
        }
        if stale_time.is_zero() || self.confirmed.is_none() {
            return false;
        }
        let age = Utc::now()
            .signed_duration_since(self.updated_at)
            .to_std()
            .unwrap_or_default();
        age >= stale_time
    }

    pub fn confirmed_version(&self) -> u64 {
        self.confirmed_version
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub(crate) fn write_confirmed(&mut self, value: Value) {
        self.confirmed = Some(value);
        self.confirmed_version += 1;
        self.stale = false;
        self.updated_at = Utc::now();
    }

    pub(crate) fn owned_by(&self, id: MutationId) -> bool {
        self.speculative.as_ref().is_some_and(|s| s.owner == id)
    }
}

/// Snapshot captured before an optimistic write; rollback restores it
#[derive(Debug, Clone)]
pub struct UndoRecord {
    pub key: CacheKey,
    /// `None` when the entry did not exist before the mutation
    pub prior: Option<CacheEntry>,
    /// This mutation's own override, kept even after a later mutation replaces it
    pub applied: Value,
}
