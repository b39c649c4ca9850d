//! Authentication: session types, the auth-service seam, and the session
//! synchronizer.
//!
//! DESIGN
//! ======
//! `SessionSync` only talks to the auth service through [`AuthService`], so
//! the hosted client in `backend::auth` and the test doubles are
//! interchangeable. Every failure crossing this seam is an [`AuthError`];
//! there is one kind only.

pub mod events;
pub mod sync;
pub mod types;

pub use events::{AuthEventBus, AuthSubscription, SubscriptionGuard};
pub use sync::SessionSync;
pub use types::{AuthChangeEvent, AuthStateChange, AuthViewState, Session, SessionPhase, User, should_redirect_unauth};

// =============================================================================
// ERROR
// =============================================================================

/// Generic failure of an auth operation.
///
/// No distinction is made between network, credential or service failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("auth operation failed: {message}")]
pub struct AuthError {
    message: String,
}

impl AuthError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<crate::backend::BackendError> for AuthError {
    fn from(err: crate::backend::BackendError) -> Self {
        Self::new(err.to_string())
    }
}

// =============================================================================
// SERVICE SEAM
// =============================================================================

/// Capabilities the synchronizer needs from an auth service.
#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// One-shot lookup of the current session, if any.
    async fn get_session(&self) -> Result<Option<Session>, AuthError>;

    /// Subscribe to the ordered stream of auth-state changes.
    fn on_auth_state_change(&self) -> AuthSubscription;

    /// End the current session on the service.
    async fn sign_out(&self) -> Result<(), AuthError>;
}
