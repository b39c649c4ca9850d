//! Hosted auth client: password sign-in, sign-up, token refresh, sign-out
//! and user updates against the backend's `/auth/v1` endpoints.
//!
//! ARCHITECTURE
//! ============
//! `HostedAuth` is the concrete [`AuthService`]. It caches the current
//! session behind an async mutex, mirrors it into a [`SessionStore`], and
//! announces every change on its [`AuthEventBus`] so mounted
//! `SessionSync`s follow along.
//!
//! TRADE-OFFS
//! ==========
//! An expired session is refreshed lazily on the next `get_session`. If the
//! backend rejects the refresh token (4xx), the stale session is dropped and
//! `SIGNED_OUT` is emitted. Transport errors and 5xx responses leave the
//! stored session untouched and surface as an `AuthError`.

use std::sync::Arc;

use reqwest::Method;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, MutexGuard};

use super::store::SessionStore;
use super::{BackendClient, BackendError, send, send_json};
use crate::auth::{
    AuthChangeEvent, AuthError, AuthEventBus, AuthService, AuthStateChange, AuthSubscription, Session, User,
};

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(Debug, Default, Deserialize)]
struct WireUserMetadata {
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    full_name: Option<String>,
    #[serde(default)]
    avatar_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    user_metadata: WireUserMetadata,
}

impl From<WireUser> for User {
    fn from(wire: WireUser) -> Self {
        let WireUserMetadata { display_name, full_name, avatar_url } = wire.user_metadata;
        Self {
            id: wire.id,
            email: wire.email.unwrap_or_default(),
            display_name: display_name.or(full_name),
            avatar_url,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: WireUser,
}

impl TokenResponse {
    fn into_session(self, now: i64) -> Session {
        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at: self.expires_at.or_else(|| self.expires_in.map(|secs| now + secs)),
            user: self.user.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Session(TokenResponse),
    Pending(WireUser),
}

/// Result of a sign-up request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignUpOutcome {
    /// The account is active and signed in.
    SignedIn(Session),
    /// The account exists but the email address must be confirmed first.
    ConfirmationRequired(User),
}

/// Fields to change on the signed-in user. Unset fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserAttributes {
    pub email: Option<String>,
    pub password: Option<String>,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Serialize)]
struct UserAttributesBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    password: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<MetadataBody<'a>>,
}

#[derive(Serialize)]
struct MetadataBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    display_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    avatar_url: Option<&'a str>,
}

impl UserAttributes {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.password.is_none() && self.display_name.is_none() && self.avatar_url.is_none()
    }

    fn body(&self) -> UserAttributesBody<'_> {
        let data = (self.display_name.is_some() || self.avatar_url.is_some()).then(|| MetadataBody {
            display_name: self.display_name.as_deref(),
            avatar_url: self.avatar_url.as_deref(),
        });
        UserAttributesBody { email: self.email.as_deref(), password: self.password.as_deref(), data }
    }
}

fn now() -> i64 {
    time::OffsetDateTime::now_utc().unix_timestamp()
}

// =============================================================================
// CLIENT
// =============================================================================

#[derive(Default)]
struct Slot {
    /// Whether the store has been consulted yet.
    loaded: bool,
    session: Option<Session>,
}

/// [`AuthService`] backed by the hosted auth endpoints.
pub struct HostedAuth {
    client: Arc<BackendClient>,
    store: Arc<dyn SessionStore>,
    slot: Mutex<Slot>,
    events: AuthEventBus,
}

impl HostedAuth {
    #[must_use]
    pub fn new(client: Arc<BackendClient>, store: Arc<dyn SessionStore>) -> Self {
        Self { client, store, slot: Mutex::new(Slot::default()), events: AuthEventBus::new() }
    }

    #[must_use]
    pub fn events(&self) -> &AuthEventBus {
        &self.events
    }

    #[must_use]
    pub fn client(&self) -> &BackendClient {
        &self.client
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns an error if the credentials are rejected or the call fails.
    pub async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let builder = self
            .client
            .request(Method::POST, &self.client.auth_endpoint("token"), None)
            .query(&[("grant_type", "password")])
            .json(&serde_json::json!({ "email": email, "password": password }));
        let token: TokenResponse = send_json(builder).await?;
        let session = token.into_session(now());

        tracing::info!(user_id = %session.user.id, "signed in with password");
        let mut slot = self.load_slot().await;
        self.install(&mut slot, session.clone(), AuthChangeEvent::SignedIn);
        Ok(session)
    }

    /// Register a new account.
    ///
    /// # Errors
    ///
    /// Returns an error if the account cannot be created.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<SignUpOutcome, AuthError> {
        let mut body = serde_json::json!({ "email": email, "password": password });
        if let Some(name) = display_name {
            body["data"] = serde_json::json!({ "display_name": name });
        }
        let builder = self
            .client
            .request(Method::POST, &self.client.auth_endpoint("signup"), None)
            .json(&body);

        match send_json::<SignUpResponse>(builder).await? {
            SignUpResponse::Session(token) => {
                let session = token.into_session(now());
                tracing::info!(user_id = %session.user.id, "signed up and signed in");
                let mut slot = self.load_slot().await;
                self.install(&mut slot, session.clone(), AuthChangeEvent::SignedIn);
                Ok(SignUpOutcome::SignedIn(session))
            }
            SignUpResponse::Pending(user) => {
                let user = User::from(user);
                tracing::info!(user_id = %user.id, "signed up; email confirmation pending");
                Ok(SignUpOutcome::ConfirmationRequired(user))
            }
        }
    }

    /// Exchange the refresh token for a new session.
    ///
    /// # Errors
    ///
    /// Returns an error if there is no session or the refresh is rejected.
    pub async fn refresh_session(&self) -> Result<Session, AuthError> {
        let mut slot = self.load_slot().await;
        let refresh_token = slot
            .session
            .as_ref()
            .map(|s| s.refresh_token.clone())
            .ok_or(BackendError::NoSession)?;
        let session = self.request_refresh(&refresh_token).await?;
        self.install(&mut slot, session.clone(), AuthChangeEvent::TokenRefreshed);
        Ok(session)
    }

    /// Update the signed-in user's email, password or profile metadata.
    ///
    /// # Errors
    ///
    /// Returns an error if nobody is signed in or the update is rejected.
    pub async fn update_user(&self, attributes: &UserAttributes) -> Result<User, AuthError> {
        let mut slot = self.load_slot().await;
        let mut session = slot.session.clone().ok_or(BackendError::NoSession)?;
        if attributes.is_empty() {
            return Ok(session.user);
        }

        let builder = self
            .client
            .request(Method::PUT, &self.client.auth_endpoint("user"), Some(&session.access_token))
            .json(&attributes.body());
        let user = User::from(send_json::<WireUser>(builder).await?);

        tracing::info!(user_id = %user.id, "user updated");
        session.user = user.clone();
        self.install(&mut slot, session, AuthChangeEvent::UserUpdated);
        Ok(user)
    }

    /// Current access token, refreshing first if it has expired.
    ///
    /// # Errors
    ///
    /// Returns an error only if the session lookup itself fails.
    pub async fn access_token(&self) -> Result<Option<String>, AuthError> {
        Ok(self.get_session().await?.map(|s| s.access_token))
    }

    async fn load_slot(&self) -> MutexGuard<'_, Slot> {
        let mut slot = self.slot.lock().await;
        if !slot.loaded {
            slot.loaded = true;
            slot.session = self.store.load().unwrap_or_else(|err| {
                tracing::warn!(error = %err, "stored session unreadable; starting signed out");
                None
            });
        }
        slot
    }

    async fn request_refresh(&self, refresh_token: &str) -> Result<Session, BackendError> {
        let builder = self
            .client
            .request(Method::POST, &self.client.auth_endpoint("token"), None)
            .query(&[("grant_type", "refresh_token")])
            .json(&serde_json::json!({ "refresh_token": refresh_token }));
        let token: TokenResponse = send_json(builder).await?;
        Ok(token.into_session(now()))
    }

    fn install(&self, slot: &mut Slot, session: Session, event: AuthChangeEvent) {
        if let Err(err) = self.store.save(&session) {
            tracing::warn!(error = %err, "failed to persist session");
        }
        slot.session = Some(session.clone());
        self.events.emit(&AuthStateChange::new(event, Some(session)));
    }

    fn clear(&self, slot: &mut Slot) {
        if let Err(err) = self.store.clear() {
            tracing::warn!(error = %err, "failed to clear stored session");
        }
        slot.session = None;
        self.events.emit(&AuthStateChange::new(AuthChangeEvent::SignedOut, None));
    }
}

#[async_trait::async_trait]
impl AuthService for HostedAuth {
    async fn get_session(&self) -> Result<Option<Session>, AuthError> {
        let mut slot = self.load_slot().await;
        let Some(session) = slot.session.clone() else {
            return Ok(None);
        };
        if !session.is_expired() {
            return Ok(Some(session));
        }

        tracing::debug!(user_id = %session.user.id, "session expired; refreshing");
        match self.request_refresh(&session.refresh_token).await {
            Ok(fresh) => {
                self.install(&mut slot, fresh.clone(), AuthChangeEvent::TokenRefreshed);
                Ok(Some(fresh))
            }
            // Only a rejected refresh token ends the session; outages keep it for a later retry.
            Err(err @ BackendError::Response { status: 400..=499, .. }) => {
                tracing::warn!(error = %err, user_id = %session.user.id, "refresh token rejected; signing out locally");
                self.clear(&mut slot);
                Ok(None)
            }
            Err(err) => {
                tracing::warn!(error = %err, user_id = %session.user.id, "session refresh failed; keeping stored session");
                Err(err.into())
            }
        }
    }

    fn on_auth_state_change(&self) -> AuthSubscription {
        self.events.subscribe()
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        let mut slot = self.load_slot().await;
        if let Some(session) = slot.session.as_ref() {
            let builder = self
                .client
                .request(Method::POST, &self.client.auth_endpoint("logout"), Some(&session.access_token));
            let (status, body) = send(builder).await?;
            // The server no longer knows this session; clearing locally is all that is left.
            let gone = matches!(status, 401 | 403 | 404);
            if !(200..300).contains(&status) && !gone {
                return Err(BackendError::from_response(status, &body).into());
            }
            tracing::info!(user_id = %session.user.id, status, "signed out");
        }
        self.clear(&mut slot);
        Ok(())
    }
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
