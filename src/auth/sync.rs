//! Session synchronizer: mirrors the auth service's session into published
//! view state and fires login redirects.
//!
//! ARCHITECTURE
//! ============
//! `mount` subscribes to the auth-state stream synchronously, then spawns two
//! tasks: a one-shot session lookup and a stream consumer. Both write into a
//! single `watch` channel, so every update is applied whole before the next
//! and any number of UI consumers can observe it.
//!
//! ORDERING
//! ========
//! Stream events are last-write-wins in arrival order. The lookup only sets
//! `user` when no stream event has been applied yet; a lookup that loses the
//! race still clears `loading`. Lookup errors fail open to signed-out and are
//! only logged: `error` is reserved for sign-out failures.
//!
//! TEARDOWN
//! ========
//! `unmount` (or drop) clears the liveness flag and releases the
//! subscription exactly once. In-flight calls are allowed to finish; their
//! effects on state and navigation are discarded.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tokio::sync::{mpsc, watch};

use super::events::SubscriptionGuard;
use super::types::{AuthChangeEvent, AuthStateChange, AuthViewState, Session, User};
use super::{AuthError, AuthService};
use crate::nav::Router;

struct Shared {
    auth: Arc<dyn AuthService>,
    router: Arc<dyn Router>,
    login_path: String,
    state: watch::Sender<AuthViewState>,
    alive: AtomicBool,
    /// Stream events applied so far; a non-zero value makes the lookup stale.
    applied_events: AtomicU64,
}

impl Shared {
    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    fn apply_lookup(&self, result: Result<Option<Session>, AuthError>) {
        if !self.is_alive() {
            tracing::debug!("session lookup resolved after unmount; ignored");
            return;
        }

        let session = match result {
            Ok(session) => session,
            Err(err) => {
                tracing::warn!(error = %err, "session lookup failed; treating as signed out");
                None
            }
        };

        self.state.send_if_modified(|state| {
            let mut changed = false;
            if self.applied_events.load(Ordering::SeqCst) == 0 {
                let user = session.map(|s| s.user);
                changed |= state.user != user;
                state.user = user;
            } else {
                tracing::debug!("session lookup superseded by stream event");
            }
            changed |= state.loading;
            state.loading = false;
            changed
        });

        let state = self.state.borrow();
        tracing::info!(
            user_id = state.user.as_ref().map_or("-", |u| u.id.as_str()),
            "initial session resolved"
        );
    }

    /// Returns `false` once the synchronizer is gone and the stream should stop.
    fn apply_change(&self, change: AuthStateChange) -> bool {
        if !self.is_alive() {
            tracing::debug!(event = ?change.event, "auth event after unmount; ignored");
            return false;
        }

        let AuthStateChange { event, session } = change;
        let user = session.map(|s| s.user);
        tracing::info!(?event, user_id = user.as_ref().map_or("-", |u| u.id.as_str()), "auth state changed");

        self.applied_events.fetch_add(1, Ordering::SeqCst);
        self.state.send_if_modified(|state| {
            if state.user == user {
                return false;
            }
            state.user = user;
            true
        });

        match event {
            AuthChangeEvent::SignedIn => self.router.refresh(),
            AuthChangeEvent::SignedOut => {
                self.router.refresh();
                self.router.push(&self.login_path);
            }
            _ => {}
        }
        true
    }
}

/// Process-wide authentication state kept in sync with an [`AuthService`].
pub struct SessionSync {
    shared: Arc<Shared>,
    guard: Option<SubscriptionGuard>,
}

impl SessionSync {
    /// Subscribe to the auth stream and start the initial session lookup.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn mount(auth: Arc<dyn AuthService>, router: Arc<dyn Router>, login_path: impl Into<String>) -> Self {
        let (state, _) = watch::channel(AuthViewState::default());
        let shared = Arc::new(Shared {
            auth,
            router,
            login_path: login_path.into(),
            state,
            alive: AtomicBool::new(true),
            applied_events: AtomicU64::new(0),
        });

        let (events, guard) = shared.auth.on_auth_state_change().split();

        let lookup = Arc::clone(&shared);
        tokio::spawn(async move {
            let result = lookup.auth.get_session().await;
            lookup.apply_lookup(result);
        });
        tokio::spawn(consume_stream(Arc::clone(&shared), events));

        tracing::debug!(login_path = %shared.login_path, "session sync mounted");
        Self { shared, guard: Some(guard) }
    }

    /// Stop reacting to the auth service. Idempotent.
    pub fn unmount(&mut self) {
        if let Some(guard) = self.guard.take() {
            self.shared.alive.store(false, Ordering::SeqCst);
            guard.unsubscribe();
            tracing::debug!("session sync unmounted");
        }
    }

    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.guard.is_some()
    }

    #[must_use]
    pub fn login_path(&self) -> &str {
        &self.shared.login_path
    }

    /// Latest known user. No network call.
    #[must_use]
    pub fn current_user(&self) -> Option<User> {
        self.shared.state.borrow().user.clone()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.shared.state.borrow().loading
    }

    #[must_use]
    pub fn last_error(&self) -> Option<AuthError> {
        self.shared.state.borrow().error.clone()
    }

    #[must_use]
    pub fn snapshot(&self) -> AuthViewState {
        self.shared.state.borrow().clone()
    }

    /// Receiver that observes every published state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AuthViewState> {
        self.shared.state.subscribe()
    }

    /// Wait for the initial lookup to resolve and return the state at that point.
    ///
    /// Never resolves if the synchronizer is unmounted before the lookup lands.
    pub async fn wait_until_loaded(&self) -> AuthViewState {
        let mut rx = self.shared.state.subscribe();
        match rx.wait_for(|state| !state.loading).await {
            Ok(state) => state.clone(),
            Err(_) => self.snapshot(),
        }
    }

    /// Dismiss the last sign-out error.
    pub fn clear_error(&self) {
        self.shared.state.send_if_modified(|state| state.error.take().is_some());
    }

    /// Sign out through the auth service and navigate to the login path.
    ///
    /// On failure the error is stored as `last_error` and returned; the
    /// current user is left as is.
    ///
    /// # Errors
    ///
    /// Returns the auth service's error when sign-out fails.
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        let result = self.shared.auth.sign_out().await;
        let alive = self.shared.is_alive();

        match result {
            Ok(()) => {
                tracing::info!("signed out");
                if alive {
                    self.clear_error();
                    self.shared.router.push(&self.shared.login_path);
                }
                Ok(())
            }
            Err(err) => {
                tracing::warn!(error = %err, "sign out failed");
                if alive {
                    let stored = err.clone();
                    self.shared.state.send_modify(|state| state.error = Some(stored));
                }
                Err(err)
            }
        }
    }
}

impl Drop for SessionSync {
    fn drop(&mut self) {
        self.unmount();
    }
}

async fn consume_stream(shared: Arc<Shared>, mut events: mpsc::UnboundedReceiver<AuthStateChange>) {
    while let Some(change) = events.recv().await {
        if !shared.apply_change(change) {
            return;
        }
    }
    tracing::debug!("auth state stream closed");
}

#[cfg(test)]
#[path = "sync_test.rs"]
mod tests;
