//! Shared test doubles and fixtures.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::oneshot;

use crate::auth::{
    AuthChangeEvent, AuthError, AuthEventBus, AuthService, AuthStateChange, AuthSubscription, Session, SessionSync,
    SubscriptionGuard, User,
};
use crate::nav::{NavCommand, Router};

// =============================================================================
// FIXTURES
// =============================================================================

#[must_use]
pub fn user(id: &str, email: &str) -> User {
    User { id: id.into(), email: email.into(), display_name: None, avatar_url: None }
}

#[must_use]
pub fn session_for(user: User) -> Session {
    Session {
        access_token: format!("access-{}", user.id),
        refresh_token: format!("refresh-{}", user.id),
        expires_at: None,
        user,
    }
}

/// Give spawned tasks on the current-thread runtime a chance to run.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(20)).await;
}

// =============================================================================
// MOCK AUTH SERVICE
// =============================================================================

#[derive(Default)]
pub struct MockAuth {
    pub bus: AuthEventBus,
    session: Mutex<Option<Session>>,
    lookup_error: Mutex<Option<AuthError>>,
    lookup_gate: Mutex<Option<oneshot::Receiver<()>>>,
    sign_out_error: Mutex<Option<AuthError>>,
    pub sign_out_calls: AtomicUsize,
    pub subscribes: AtomicUsize,
    pub unsubscribes: Arc<AtomicUsize>,
}

impl MockAuth {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    #[must_use]
    pub fn with_session(session: Session) -> Arc<Self> {
        let mock = Self::default();
        *mock.session.lock().unwrap() = Some(session);
        Arc::new(mock)
    }

    pub fn fail_lookup(&self, message: &str) {
        *self.lookup_error.lock().unwrap() = Some(AuthError::new(message));
    }

    pub fn fail_sign_out(&self, message: &str) {
        *self.sign_out_error.lock().unwrap() = Some(AuthError::new(message));
    }

    pub fn allow_sign_out(&self) {
        *self.sign_out_error.lock().unwrap() = None;
    }

    /// Hold the next `get_session` call until the returned sender fires.
    #[must_use]
    pub fn gate_lookup(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.lookup_gate.lock().unwrap() = Some(rx);
        tx
    }

    pub fn emit(&self, event: AuthChangeEvent, session: Option<Session>) {
        self.bus.emit(&AuthStateChange::new(event, session));
    }

    pub fn unsubscribe_count(&self) -> usize {
        self.unsubscribes.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl AuthService for MockAuth {
    async fn get_session(&self) -> Result<Option<Session>, AuthError> {
        let gate = self.lookup_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        let failure = self.lookup_error.lock().unwrap().clone();
        if let Some(err) = failure {
            return Err(err);
        }
        Ok(self.session.lock().unwrap().clone())
    }

    fn on_auth_state_change(&self) -> AuthSubscription {
        self.subscribes.fetch_add(1, Ordering::SeqCst);
        let (events, inner) = self.bus.subscribe().split();
        let counter = Arc::clone(&self.unsubscribes);
        AuthSubscription::new(
            events,
            SubscriptionGuard::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                inner.unsubscribe();
            }),
        )
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        self.sign_out_calls.fetch_add(1, Ordering::SeqCst);
        let failure = self.sign_out_error.lock().unwrap().clone();
        if let Some(err) = failure {
            return Err(err);
        }
        *self.session.lock().unwrap() = None;
        Ok(())
    }
}

// =============================================================================
// RECORDING ROUTER
// =============================================================================

#[derive(Default)]
pub struct RecordingRouter {
    commands: Mutex<Vec<NavCommand>>,
}

impl RecordingRouter {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn commands(&self) -> Vec<NavCommand> {
        self.commands.lock().unwrap().clone()
    }

    pub fn pushes(&self) -> Vec<String> {
        self.commands()
            .into_iter()
            .filter_map(|c| match c {
                NavCommand::Push(path) => Some(path),
                NavCommand::Refresh => None,
            })
            .collect()
    }

    pub fn refresh_count(&self) -> usize {
        self.commands()
            .iter()
            .filter(|c| matches!(c, NavCommand::Refresh))
            .count()
    }
}

impl Router for RecordingRouter {
    fn push(&self, path: &str) {
        self.commands.lock().unwrap().push(NavCommand::Push(path.to_string()));
    }

    fn refresh(&self) {
        self.commands.lock().unwrap().push(NavCommand::Refresh);
    }
}

/// Mount a synchronizer against the doubles with `/login` as the login path.
pub fn mount(auth: &Arc<MockAuth>, router: &Arc<RecordingRouter>) -> SessionSync {
    SessionSync::mount(
        Arc::clone(auth) as Arc<dyn AuthService>,
        Arc::clone(router) as Arc<dyn Router>,
        "/login",
    )
}

// =============================================================================
// FAKE BACKEND
// =============================================================================

/// A request captured by [`FakeBackend`].
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: String,
    pub authorization: Option<String>,
    pub apikey: Option<String>,
    pub prefer: Option<String>,
    pub body: String,
}

impl RecordedRequest {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap()
    }
}

#[derive(Default)]
pub struct FakeState {
    requests: Mutex<Vec<RecordedRequest>>,
    responses: Mutex<std::collections::HashMap<(String, String), std::collections::VecDeque<(u16, String)>>>,
}

/// Local HTTP server standing in for the hosted backend.
///
/// Responses are scripted per `(method, path)`; the last scripted response
/// for a route keeps being served once the queue is down to one entry.
/// Unscripted routes answer 404.
pub struct FakeBackend {
    pub url: String,
    state: Arc<FakeState>,
}

impl FakeBackend {
    pub async fn start() -> Self {
        use axum::Router as AxumRouter;

        let state = Arc::new(FakeState::default());
        let app = AxumRouter::new()
            .fallback(fake_handler)
            .with_state(Arc::clone(&state));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Self { url: format!("http://{addr}"), state }
    }

    pub fn respond(&self, method: &str, path: &str, status: u16, body: serde_json::Value) {
        self.state
            .responses
            .lock()
            .unwrap()
            .entry((method.to_string(), path.to_string()))
            .or_default()
            .push_back((status, body.to_string()));
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().unwrap().clone()
    }

    pub fn requests_to(&self, method: &str, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method && r.path == path)
            .collect()
    }

    pub fn last_request(&self) -> RecordedRequest {
        self.requests().last().cloned().unwrap()
    }

    pub fn config(&self) -> crate::config::BackendConfig {
        crate::config::BackendConfig::new(self.url.clone(), "anon-key")
    }

    pub fn client(&self) -> crate::backend::BackendClient {
        crate::backend::BackendClient::new(&self.config()).unwrap()
    }
}

async fn fake_handler(
    axum::extract::State(state): axum::extract::State<Arc<FakeState>>,
    method: axum::http::Method,
    uri: axum::http::Uri,
    headers: axum::http::HeaderMap,
    body: String,
) -> (axum::http::StatusCode, String) {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_string);
    state.requests.lock().unwrap().push(RecordedRequest {
        method: method.to_string(),
        path: uri.path().to_string(),
        query: uri.query().unwrap_or_default().to_string(),
        authorization: header("authorization"),
        apikey: header("apikey"),
        prefer: header("prefer"),
        body,
    });

    let mut responses = state.responses.lock().unwrap();
    let scripted = responses
        .get_mut(&(method.to_string(), uri.path().to_string()))
        .and_then(|queue| if queue.len() > 1 { queue.pop_front() } else { queue.front().cloned() });
    let (status, body) = scripted.unwrap_or((404, r#"{"message":"no scripted response"}"#.to_string()));
    (axum::http::StatusCode::from_u16(status).unwrap(), body)
}

/// Token-endpoint body for a signed-in `user`.
pub fn token_body(id: &str, email: &str, expires_at: i64) -> serde_json::Value {
    serde_json::json!({
        "access_token": format!("access-{id}"),
        "token_type": "bearer",
        "expires_in": 3600,
        "expires_at": expires_at,
        "refresh_token": format!("refresh-{id}"),
        "user": {
            "id": id,
            "email": email,
            "user_metadata": { "display_name": "Alice", "avatar_url": "https://cdn.example.co/a.png" }
        }
    })
}
