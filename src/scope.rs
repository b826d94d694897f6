//! Liveness scopes
//!
//! A scope stands for a consumer that can go away: a rendered view, a
//! component, a CLI run. Async work started on its behalf checks the scope
//! before touching shared state, so results that arrive after the consumer
//! is gone are dropped.

use tokio_util::sync::{CancellationToken, DropGuard};

/// Cancellation handle tied to a consumer's lifetime
#[derive(Debug, Clone, Default)]
pub struct LivenessScope {
    token: CancellationToken,
}

impl LivenessScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scope that ends with this one but can also end on its own
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
        }
    }

    /// End the scope; pending work will discard its results
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_alive(&self) -> bool {
        !self.token.is_cancelled()
    }

    /// Resolves when the scope ends
    pub async fn ended(&self) {
        self.token.cancelled().await
    }

    /// Guard that ends the scope when dropped (unmount)
    pub fn end_on_drop(&self) -> DropGuard {
        self.token.clone().drop_guard()
    }
}
