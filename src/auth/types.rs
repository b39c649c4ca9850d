//! Session, user and published view-state types.

use serde::{Deserialize, Serialize};

use super::AuthError;

/// Seconds before `expires_at` at which a session is already treated as expired.
pub const EXPIRY_LEEWAY_SECS: i64 = 30;

// =============================================================================
// USER / SESSION
// =============================================================================

/// Identity record carried by a [`Session`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

impl User {
    /// Display name when set, otherwise the email address.
    #[must_use]
    pub fn label(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or(&self.email)
    }
}

/// Server-issued proof of authentication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    /// Unix timestamp (seconds) after which the access token is invalid.
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: User,
}

impl Session {
    /// `true` if the access token expires within [`EXPIRY_LEEWAY_SECS`] of `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.expires_at
            .is_some_and(|expires_at| expires_at - EXPIRY_LEEWAY_SECS <= now)
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(time::OffsetDateTime::now_utc().unix_timestamp())
    }
}

// =============================================================================
// STREAM EVENTS
// =============================================================================

/// Reason code attached to every auth-state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthChangeEvent {
    InitialSession,
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
    PasswordRecovery,
}

/// One item of the auth-state stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthStateChange {
    pub event: AuthChangeEvent,
    pub session: Option<Session>,
}

impl AuthStateChange {
    #[must_use]
    pub fn new(event: AuthChangeEvent, session: Option<Session>) -> Self {
        Self { event, session }
    }
}

// =============================================================================
// VIEW STATE
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Initializing,
    Authenticated,
    Anonymous,
}

/// Published authentication state read by UI consumers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthViewState {
    pub user: Option<User>,
    /// `true` until the first session lookup resolves, then never again.
    pub loading: bool,
    /// Last sign-out failure, if any.
    pub error: Option<AuthError>,
}

impl Default for AuthViewState {
    fn default() -> Self {
        Self { user: None, loading: true, error: None }
    }
}

impl AuthViewState {
    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        match (&self.user, self.loading) {
            (Some(_), _) => SessionPhase::Authenticated,
            (None, true) => SessionPhase::Initializing,
            (None, false) => SessionPhase::Anonymous,
        }
    }
}

/// Route guards redirect to login once loading is done and nobody is signed in.
#[must_use]
pub fn should_redirect_unauth(state: &AuthViewState) -> bool {
    !state.loading && state.user.is_none()
}

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;
