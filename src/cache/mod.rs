//! Query Cache Coordinator
//!
//! Client-side cache of server entities with declared invalidation and
//! optimistic updates.
//!
//! ## Pieces
//!
//! - [`keys`]: key derivation shared by readers and invalidators
//! - [`QueryCache`]: the injected cache service (`SharedCache`)
//! - [`MutationSpec`]: optimistic updates, confirmation policy, invalidation rules
//! - [`RefetchQueue`]: deduplicated queue of stale keys awaiting refetch
//!
//! ## Usage
//!
//! ```ignore
//! let spec = MutationSpec::new("rename-user")
//!     .optimistic(OptimisticUpdate::merge(keys::user(&id), json!({"name": "Alice"})))
//!     .invalidates(InvalidationRule::user(id.clone()));
//! cache.run_mutation(spec, &scope, client.patch_json(&keys::user(&id).path(), &body)).await?;
//! ```

mod entry;
mod key;
mod mutation;
mod refetch;
mod store;

pub use entry::{CacheEntry, MutationId, Speculative, UndoRecord};
pub use key::{CacheKey, EntityKind, InvalidationRule, keys};
pub use mutation::{Confirm, MutationSpec, OptimisticUpdate};
pub use refetch::{QueryFetcher, RefetchQueue, RefetchReport};
pub use store::{QueryCache, SharedCache};
