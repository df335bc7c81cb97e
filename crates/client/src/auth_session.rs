//! Authentication session management with token-store persistence.
//!
//! [`SessionManager`] is the single source of truth for whether the user is
//! logged in, and the only writer of the [`TokenStore`]. Consumers get a
//! read-only view through [`SessionManager::state`] and
//! [`SessionManager::subscribe`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use oneview_shared::{ApiError, Credentials};
use thiserror::Error;
use tokio::sync::watch;

use crate::api_client::ApiClient;
use crate::middleware::AuthFailureHook;
use crate::storage::{StorageError, TokenStore};
use crate::token::{decode_identity, DecodeError, Identity};

/// A logged-in session: the bearer token and who it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveSession {
    pub token: String,
    pub identity: Identity,
}

/// What the client currently believes about authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub session: Option<ActiveSession>,
    /// True until the stored token has been looked at once.
    pub loading: bool,
}

impl SessionState {
    fn starting() -> Self {
        Self {
            session: None,
            loading: true,
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.token.as_str())
    }

    pub fn user_id(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.identity.user_id.as_str())
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }
}

/// Why a login attempt did not produce a session.
#[derive(Debug, Error)]
pub enum LoginError {
    /// The service refused the credentials.
    #[error("credentials rejected: {0}")]
    Rejected(ApiError),
    /// No usable answer from the service.
    #[error("login request failed: {0}")]
    Network(ApiError),
    /// The service issued a token we cannot read an identity from.
    #[error("login returned an unreadable token: {0}")]
    InvalidToken(#[from] DecodeError),
    /// The service accepted us but the token could not be persisted. The
    /// session is not published, so memory and storage stay consistent.
    #[error("could not persist session token: {0}")]
    Storage(#[from] StorageError),
}

impl From<ApiError> for LoginError {
    fn from(e: ApiError) -> Self {
        match e {
            ApiError::Http { .. } => LoginError::Rejected(e),
            other => LoginError::Network(other),
        }
    }
}

struct Inner {
    api: ApiClient,
    store: Arc<dyn TokenStore>,
    hook: AuthFailureHook,
    state: watch::Sender<SessionState>,
    initialized: AtomicBool,
}

/// Owns the session state. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

impl SessionManager {
    /// `api` should already carry middleware wired to `hook` and `store`
    /// (see [`ApiClient::authenticated`]).
    pub fn new(api: ApiClient, store: Arc<dyn TokenStore>, hook: AuthFailureHook) -> Self {
        let (state, _) = watch::channel(SessionState::starting());
        Self {
            inner: Arc::new(Inner {
                api,
                store,
                hook,
                state,
                initialized: AtomicBool::new(false),
            }),
        }
    }

    /// Client for screens to issue calls with.
    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    /// Receiver that observes every state change.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    /// Restore the session from storage. Runs once; later calls do nothing.
    ///
    /// Always ends with `loading == false`.
    pub fn initialize(&self) {
        if self.inner.initialized.swap(true, Ordering::SeqCst) {
            return;
        }

        let session = match self.inner.store.load() {
            Ok(Some(token)) => self.restore(token),
            Ok(None) => {
                tracing::debug!("no stored session");
                None
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to read stored session");
                None
            }
        };

        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        self.inner.hook.register(move || {
            if let Some(inner) = weak.upgrade() {
                SessionManager { inner }.logout();
            }
        });

        self.inner.state.send_replace(SessionState {
            session,
            loading: false,
        });
    }

    fn restore(&self, token: String) -> Option<ActiveSession> {
        match decode_identity(&token) {
            Ok(identity) => {
                tracing::info!(user_id = %identity.user_id, "restored session");
                Some(ActiveSession { token, identity })
            }
            Err(e) => {
                tracing::warn!(error = %e, "discarding unreadable stored token");
                if let Err(e) = self.inner.store.clear() {
                    tracing::error!(error = %e, "failed to clear unreadable token");
                }
                None
            }
        }
    }

    /// Log in with one attempt. `false` on any failure; state is then
    /// untouched. The caller decides what to tell the user.
    pub async fn login(&self, email: &str, password: &str) -> bool {
        match self.try_login(email, password).await {
            Ok(_) => true,
            Err(e) => {
                tracing::error!(error = %e, "login failed");
                false
            }
        }
    }

    /// Like [`login`](Self::login) but reports why it failed.
    pub async fn try_login(&self, email: &str, password: &str) -> Result<Identity, LoginError> {
        let credentials = Credentials {
            email: email.to_string(),
            password: password.to_string(),
        };
        let token = self.inner.api.login(&credentials).await?.token;

        let identity = decode_identity(&token)?;
        self.inner.store.save(&token)?;

        tracing::info!(user_id = %identity.user_id, "logged in");
        self.inner.state.send_modify(|state| {
            state.session = Some(ActiveSession {
                token,
                identity: identity.clone(),
            });
        });
        Ok(identity)
    }

    /// Forget the session. Safe to call when already logged out.
    pub fn logout(&self) {
        if let Err(e) = self.inner.store.clear() {
            tracing::error!(error = %e, "failed to clear stored token");
        }
        let was_authenticated = self.inner.state.send_if_modified(|state| {
            if state.session.is_some() {
                state.session = None;
                true
            } else {
                false
            }
        });
        if was_authenticated {
            tracing::info!("logged out");
        }
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("state", &*self.inner.state.borrow())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryTokenStore;
    use crate::testing::{token_for, FakeTransport};
    use reqwest::Method;
    use serde_json::json;

    struct Harness {
        fake: Arc<FakeTransport>,
        store: Arc<MemoryTokenStore>,
        session: SessionManager,
    }

    fn harness(store: MemoryTokenStore) -> Harness {
        let fake = Arc::new(FakeTransport::new());
        let store = Arc::new(store);
        let hook = AuthFailureHook::new();
        let api = ApiClient::authenticated(fake.clone(), store.clone(), hook.clone());
        let session = SessionManager::new(api, store.clone(), hook);
        Harness { fake, store, session }
    }

    #[test]
    fn starts_loading_and_empty() {
        let h = harness(MemoryTokenStore::new());
        let state = h.session.state();
        assert!(state.loading);
        assert!(!state.is_authenticated());
    }

    #[test]
    fn initialize_without_token_is_absent() {
        let h = harness(MemoryTokenStore::new());
        h.session.initialize();
        let state = h.session.state();
        assert!(!state.loading);
        assert_eq!(state.token(), None);
        assert_eq!(state.user_id(), None);
    }

    #[test]
    fn initialize_restores_stored_token() {
        let token = token_for("u1");
        let h = harness(MemoryTokenStore::with_token(token.clone()));
        h.session.initialize();
        let state = h.session.state();
        assert!(!state.loading);
        assert_eq!(state.token(), Some(token.as_str()));
        assert_eq!(state.user_id(), Some("u1"));
    }

    #[test]
    fn initialize_discards_undecodable_token() {
        let h = harness(MemoryTokenStore::with_token("opaque"));
        h.session.initialize();
        assert!(!h.session.state().is_authenticated());
        assert_eq!(h.store.load().unwrap(), None);
    }

    #[tokio::test]
    async fn loading_clears_exactly_once() {
        let h = harness(MemoryTokenStore::new());
        let mut rx = h.session.subscribe();
        assert!(rx.borrow_and_update().loading);

        h.session.initialize();
        h.session.initialize();

        assert!(rx.has_changed().unwrap());
        assert!(!rx.borrow_and_update().loading);
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn login_success_persists_and_publishes() {
        let h = harness(MemoryTokenStore::new());
        h.session.initialize();
        let token = token_for("user-7");
        h.fake.respond(Method::POST, "/login", 200, json!({ "token": token }));

        assert!(h.session.login("ana@example.com", "Secret1!").await);

        assert_eq!(h.store.load().unwrap().as_deref(), Some(token.as_str()));
        let state = h.session.state();
        assert_eq!(state.user_id(), Some("user-7"));
        assert_eq!(state.token(), Some(token.as_str()));

        let sent = &h.fake.requests()[0];
        let body: serde_json::Value = serde_json::from_slice(sent.body.as_deref().unwrap()).unwrap();
        assert_eq!(body, json!({"email": "ana@example.com", "password": "Secret1!"}));
    }

    #[tokio::test]
    async fn login_rejected_leaves_everything_untouched() {
        let h = harness(MemoryTokenStore::new());
        h.session.initialize();
        h.fake.respond(Method::POST, "/login", 401, json!({"detail": "bad credentials"}));

        assert!(!h.session.login("ana@example.com", "wrong").await);
        assert_eq!(h.store.load().unwrap(), None);
        assert!(!h.session.state().is_authenticated());
        assert_eq!(h.fake.count(&Method::POST, "/login"), 1);
    }

    #[tokio::test]
    async fn wrong_password_while_logged_in_keeps_the_session() {
        let token = token_for("u1");
        let h = harness(MemoryTokenStore::with_token(&token));
        h.session.initialize();
        assert!(h.session.state().is_authenticated());
        h.fake.respond(Method::POST, "/login", 401, json!({"detail": "Invalid credentials"}));

        assert!(!h.session.login("a@b.co", "wrong").await);
        let state = h.session.state();
        assert!(state.is_authenticated());
        assert_eq!(state.user_id(), Some("u1"));
        assert_eq!(h.store.load().unwrap().as_deref(), Some(token.as_str()));
    }

    #[tokio::test]
    async fn login_error_kinds() {
        let h = harness(MemoryTokenStore::new());
        h.session.initialize();

        h.fake.fail(Method::POST, "/login", ApiError::Network("refused".into()));
        assert!(matches!(
            h.session.try_login("a@b.co", "x").await,
            Err(LoginError::Network(_))
        ));

        let h = harness(MemoryTokenStore::new());
        h.fake.respond(Method::POST, "/login", 200, json!({"token": "not-a-jwt"}));
        assert!(matches!(
            h.session.try_login("a@b.co", "x").await,
            Err(LoginError::InvalidToken(_))
        ));
        assert_eq!(h.store.load().unwrap(), None);
    }

    #[tokio::test]
    async fn logout_is_idempotent() {
        let h = harness(MemoryTokenStore::with_token(token_for("u1")));
        h.session.initialize();
        assert!(h.session.state().is_authenticated());

        h.session.logout();
        let first = h.session.state();
        h.session.logout();
        let second = h.session.state();

        assert_eq!(first, second);
        assert!(!second.is_authenticated());
        assert!(!second.loading);
        assert_eq!(h.store.load().unwrap(), None);
    }

    #[tokio::test]
    async fn unauthorized_response_logs_out() {
        let h = harness(MemoryTokenStore::with_token(token_for("u1")));
        h.session.initialize();
        h.fake.respond(Method::GET, "/code/my", 401, json!({}));

        let err = h.session.api().my_code().await.unwrap_err();
        assert!(err.is_unauthorized());
        assert!(!h.session.state().is_authenticated());
        assert_eq!(h.store.load().unwrap(), None);
    }

    #[tokio::test]
    async fn each_unauthorized_response_triggers_one_logout() {
        let h = harness(MemoryTokenStore::with_token(token_for("u1")));
        h.session.initialize();
        h.fake.respond(Method::GET, "/messages/my", 401, json!({}));
        let mut rx = h.session.subscribe();
        rx.borrow_and_update();

        let _ = h.session.api().my_messages().await;
        assert!(rx.has_changed().unwrap());
        rx.borrow_and_update();

        // Already logged out: the second 401 changes nothing.
        let _ = h.session.api().my_messages().await;
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn hook_does_not_keep_session_alive() {
        let h = harness(MemoryTokenStore::new());
        h.session.initialize();
        let api = h.session.api().clone();
        h.fake.respond(Method::GET, "/code/my", 401, json!({}));
        drop(h.session);

        assert!(api.my_code().await.unwrap_err().is_unauthorized());
    }
}
