use super::*;
use crate::test_helpers::{session_for, user};

// =============================================================================
// User
// =============================================================================

#[test]
fn user_label_prefers_display_name() {
    let mut u = user("u1", "a@b.com");
    u.display_name = Some("Alice".into());
    assert_eq!(u.label(), "Alice");
}

#[test]
fn user_label_falls_back_to_email() {
    let mut u = user("u1", "a@b.com");
    assert_eq!(u.label(), "a@b.com");
    u.display_name = Some(String::new());
    assert_eq!(u.label(), "a@b.com");
}

#[test]
fn user_deserializes_without_optional_fields() {
    let u: User = serde_json::from_str(r#"{"id":"u1"}"#).unwrap();
    assert_eq!(u.id, "u1");
    assert_eq!(u.email, "");
    assert!(u.display_name.is_none());
    assert!(u.avatar_url.is_none());
}

// =============================================================================
// Session expiry
// =============================================================================

#[test]
fn session_without_expiry_never_expires() {
    let mut s = session_for(user("u1", "a@b.com"));
    s.expires_at = None;
    assert!(!s.is_expired_at(i64::MAX));
}

#[test]
fn session_expiry_applies_leeway() {
    let mut s = session_for(user("u1", "a@b.com"));
    s.expires_at = Some(1_000);
    assert!(!s.is_expired_at(1_000 - EXPIRY_LEEWAY_SECS - 1));
    assert!(s.is_expired_at(1_000 - EXPIRY_LEEWAY_SECS));
    assert!(s.is_expired_at(2_000));
}

// =============================================================================
// AuthChangeEvent wire names
// =============================================================================

#[test]
fn auth_change_event_uses_reason_codes() {
    assert_eq!(serde_json::to_string(&AuthChangeEvent::SignedIn).unwrap(), r#""SIGNED_IN""#);
    assert_eq!(serde_json::to_string(&AuthChangeEvent::TokenRefreshed).unwrap(), r#""TOKEN_REFRESHED""#);
    let parsed: AuthChangeEvent = serde_json::from_str(r#""SIGNED_OUT""#).unwrap();
    assert_eq!(parsed, AuthChangeEvent::SignedOut);
}

// =============================================================================
// AuthViewState
// =============================================================================

#[test]
fn view_state_default_is_initializing() {
    let state = AuthViewState::default();
    assert!(state.loading);
    assert!(state.user.is_none());
    assert!(state.error.is_none());
    assert_eq!(state.phase(), SessionPhase::Initializing);
}

#[test]
fn view_state_phase_follows_user() {
    let anon = AuthViewState { user: None, loading: false, error: None };
    assert_eq!(anon.phase(), SessionPhase::Anonymous);

    let authed = AuthViewState { user: Some(user("u1", "a@b.com")), loading: false, error: None };
    assert_eq!(authed.phase(), SessionPhase::Authenticated);
}

#[test]
fn should_redirect_unauth_when_not_loading_and_user_missing() {
    let state = AuthViewState { user: None, loading: false, error: None };
    assert!(should_redirect_unauth(&state));
}

#[test]
fn should_not_redirect_while_loading() {
    assert!(!should_redirect_unauth(&AuthViewState::default()));
}

#[test]
fn should_not_redirect_when_user_exists() {
    let state = AuthViewState { user: Some(user("u1", "a@b.com")), loading: false, error: None };
    assert!(!should_redirect_unauth(&state));
}
