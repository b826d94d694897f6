//! Auth state providers
//!
//! The guard only reads sessions. Who resolves them (cookie check, token
//! refresh, SSO callback) lives outside this crate.

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::debug;

use super::Session;

/// Source of the current session
#[async_trait]
pub trait AuthStateProvider: Send + Sync {
    /// Current snapshot, possibly still loading
    fn session(&self) -> Session;

    /// Wait until the session is no longer loading.
    ///
    /// Providers that cannot be observed return the current snapshot.
    async fn resolved(&self) -> Session {
        self.session()
    }
}

/// Fixed session, for tests and the CLI
#[derive(Debug, Clone)]
pub struct StaticSession(pub Session);

#[async_trait]
impl AuthStateProvider for StaticSession {
    fn session(&self) -> Session {
        self.0.clone()
    }
}

/// Observable session backed by a watch channel.
///
/// The auth layer publishes every change; guards re-read on navigation.
#[derive(Debug)]
pub struct SessionWatch {
    tx: watch::Sender<Session>,
}

impl SessionWatch {
    /// Start in the loading state
    pub fn new() -> Self {
        Self::with_session(Session::loading())
    }

    pub fn with_session(session: Session) -> Self {
        let (tx, _rx) = watch::channel(session);
        Self { tx }
    }

    /// Publish a new session
    pub fn publish(&self, session: Session) {
        debug!(
            loading = session.is_loading,
            signed_in = session.user.is_some(),
            "Session updated"
        );
        self.tx.send_replace(session);
    }

    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.tx.subscribe()
    }
}

impl Default for SessionWatch {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuthStateProvider for SessionWatch {
    fn session(&self) -> Session {
        self.tx.borrow().clone()
    }

    async fn resolved(&self) -> Session {
        let mut rx = self.tx.subscribe();
        // The sender lives in self, so the channel cannot close while we wait.
        match rx.wait_for(|s| !s.is_loading).await {
            Ok(session) => session.clone(),
            Err(_) => self.session(),
        }
    }
}
