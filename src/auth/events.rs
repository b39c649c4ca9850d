//! Auth-state stream plumbing: fan-out bus and scoped subscriptions.
//!
//! DESIGN
//! ======
//! Each subscriber gets its own unbounded mpsc channel so events arrive in
//! emission order and a slow consumer never blocks the emitter. A
//! subscription is released through [`SubscriptionGuard`], which runs its
//! unsubscribe hook exactly once: on `unsubscribe()` or on drop.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use tokio::sync::mpsc;

use super::types::AuthStateChange;

// =============================================================================
// SUBSCRIPTION
// =============================================================================

type UnsubscribeHook = Box<dyn FnOnce() + Send + Sync>;

/// Cancellation handle for an auth-state subscription.
pub struct SubscriptionGuard {
    hook: Option<UnsubscribeHook>,
}

impl SubscriptionGuard {
    pub fn new<F>(hook: F) -> Self
    where
        F: FnOnce() + Send + Sync + 'static,
    {
        Self { hook: Some(Box::new(hook)) }
    }

    /// A guard with nothing to release.
    #[must_use]
    pub fn noop() -> Self {
        Self { hook: None }
    }

    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(hook) = self.hook.take() {
            hook();
        }
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for SubscriptionGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionGuard")
            .field("active", &self.hook.is_some())
            .finish()
    }
}

/// A live subscription to the auth-state stream.
#[derive(Debug)]
pub struct AuthSubscription {
    events: mpsc::UnboundedReceiver<AuthStateChange>,
    guard: SubscriptionGuard,
}

impl AuthSubscription {
    #[must_use]
    pub fn new(events: mpsc::UnboundedReceiver<AuthStateChange>, guard: SubscriptionGuard) -> Self {
        Self { events, guard }
    }

    /// Next change, or `None` once the stream has closed.
    pub async fn recv(&mut self) -> Option<AuthStateChange> {
        self.events.recv().await
    }

    /// Separate the event receiver from the cancellation handle so they can be
    /// owned by different tasks.
    #[must_use]
    pub fn split(self) -> (mpsc::UnboundedReceiver<AuthStateChange>, SubscriptionGuard) {
        (self.events, self.guard)
    }

    pub fn unsubscribe(self) {
        self.guard.unsubscribe();
    }
}

// =============================================================================
// EVENT BUS
// =============================================================================

#[derive(Default)]
struct BusInner {
    next_id: u64,
    subscribers: HashMap<u64, mpsc::UnboundedSender<AuthStateChange>>,
}

/// Fan-out of [`AuthStateChange`] to every live subscription.
#[derive(Clone, Default)]
pub struct AuthEventBus {
    inner: Arc<Mutex<BusInner>>,
}

impl AuthEventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber. Events emitted after this returns are delivered.
    #[must_use]
    pub fn subscribe(&self) -> AuthSubscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = {
            let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            let id = inner.next_id;
            inner.next_id += 1;
            inner.subscribers.insert(id, tx);
            id
        };

        let weak: Weak<Mutex<BusInner>> = Arc::downgrade(&self.inner);
        let guard = SubscriptionGuard::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .subscribers
                    .remove(&id);
            }
        });

        AuthSubscription::new(rx, guard)
    }

    /// Deliver `change` to every subscriber, dropping those whose receiver is gone.
    pub fn emit(&self, change: &AuthStateChange) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner
            .subscribers
            .retain(|_, tx| tx.send(change.clone()).is_ok());
        tracing::debug!(event = ?change.event, subscribers = inner.subscribers.len(), "auth state change emitted");
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .subscribers
            .len()
    }
}

#[cfg(test)]
#[path = "events_test.rs"]
mod tests;
