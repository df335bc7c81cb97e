//! Scripted fake of the remote service for unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use oneview_shared::ApiError;
use reqwest::Method;

use crate::transport::{ApiRequest, ApiResponse, Transport};

type Script = Result<ApiResponse, ApiError>;

/// Answers each `(method, path)` from a queue of scripted outcomes. The last
/// outcome of a queue repeats. Unscripted routes fail as network errors.
#[derive(Default)]
pub(crate) struct FakeTransport {
    routes: Mutex<HashMap<(Method, String), VecDeque<Script>>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl FakeTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn push(&self, method: Method, path: &str, outcome: Script) {
        self.routes
            .lock()
            .unwrap()
            .entry((method, path.to_string()))
            .or_default()
            .push_back(outcome);
    }

    pub(crate) fn respond(&self, method: Method, path: &str, status: u16, body: serde_json::Value) {
        self.respond_raw(method, path, status, &body.to_string());
    }

    pub(crate) fn respond_raw(&self, method: Method, path: &str, status: u16, body: &str) {
        self.push(method, path, Ok(ApiResponse { status, body: body.to_string() }));
    }

    pub(crate) fn fail(&self, method: Method, path: &str, error: ApiError) {
        self.push(method, path, Err(error));
    }

    /// Every request the transport received, in order.
    pub(crate) fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn count(&self, method: &Method, path: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| &r.method == method && r.path == path)
            .count()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        // Behave like a real round trip: let other tasks run first.
        tokio::task::yield_now().await;
        self.requests.lock().unwrap().push(request.clone());
        let mut routes = self.routes.lock().unwrap();
        let Some(queue) = routes.get_mut(&(request.method.clone(), request.path.clone())) else {
            return Err(ApiError::Network(format!(
                "no scripted response for {} {}",
                request.method, request.path
            )));
        };
        if queue.len() > 1 {
            queue.pop_front().unwrap()
        } else {
            queue
                .front()
                .cloned()
                .unwrap_or_else(|| Err(ApiError::Network("empty script".into())))
        }
    }
}

/// Session manager over `fake` with the standard pipeline, already
/// initialised from `store`.
pub(crate) fn session_over(
    fake: &std::sync::Arc<FakeTransport>,
    store: crate::storage::MemoryTokenStore,
) -> crate::auth_session::SessionManager {
    use std::sync::Arc;

    let store = Arc::new(store);
    let hook = crate::middleware::AuthFailureHook::new();
    let api = crate::api_client::ApiClient::authenticated(fake.clone(), store.clone(), hook.clone());
    let session = crate::auth_session::SessionManager::new(api, store, hook);
    session.initialize();
    session
}

/// A decodable token for `sub`.
pub(crate) fn token_for(sub: &str) -> String {
    crate::token::encode_token(&serde_json::json!({ "sub": sub }), b"unit-tests").unwrap()
}
