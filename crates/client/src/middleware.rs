//! Request/response stages applied uniformly to every API call.
//!
//! Request stages run in registration order; response stages run in reverse,
//! so the first stage registered sees the final result.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use oneview_shared::ApiError;
use reqwest::header::{HeaderValue, AUTHORIZATION};

use crate::storage::TokenStore;
use crate::transport::{ApiRequest, ApiResponse};

#[async_trait]
pub trait Middleware: Send + Sync {
    /// Adjust the outgoing request. An error aborts the call before it is sent.
    async fn on_request(&self, _request: &mut ApiRequest) -> Result<(), ApiError> {
        Ok(())
    }

    /// Observe or replace the outcome of the call.
    async fn on_response(
        &self,
        _request: &ApiRequest,
        result: Result<ApiResponse, ApiError>,
    ) -> Result<ApiResponse, ApiError> {
        result
    }
}

/// Logs every call with its request id.
#[derive(Debug, Default, Clone, Copy)]
pub struct RequestLog;

#[async_trait]
impl Middleware for RequestLog {
    async fn on_request(&self, request: &mut ApiRequest) -> Result<(), ApiError> {
        tracing::debug!(id = %request.id, method = %request.method, path = %request.path, "request");
        Ok(())
    }

    async fn on_response(
        &self,
        request: &ApiRequest,
        result: Result<ApiResponse, ApiError>,
    ) -> Result<ApiResponse, ApiError> {
        match &result {
            Ok(resp) => {
                tracing::debug!(id = %request.id, status = resp.status, "response");
            }
            Err(e) => {
                tracing::warn!(id = %request.id, method = %request.method, path = %request.path, error = %e, "request failed");
            }
        }
        result
    }
}

/// Attaches `Authorization: Bearer <token>` when the store holds a token.
///
/// Reads the store, not the in-memory session, so it can be installed before
/// the session has been restored.
#[derive(Clone)]
pub struct BearerAuth {
    store: Arc<dyn TokenStore>,
}

impl BearerAuth {
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Middleware for BearerAuth {
    async fn on_request(&self, request: &mut ApiRequest) -> Result<(), ApiError> {
        let token = match self.store.load() {
            Ok(Some(token)) => token,
            Ok(None) => return Ok(()),
            Err(e) => {
                tracing::warn!(id = %request.id, error = %e, "could not read token, sending unauthenticated");
                return Ok(());
            }
        };
        match HeaderValue::from_str(&format!("Bearer {token}")) {
            Ok(value) => {
                request.headers.insert(AUTHORIZATION, value);
            }
            Err(_) => {
                tracing::warn!(id = %request.id, "stored token is not a valid header value, sending unauthenticated");
            }
        }
        Ok(())
    }
}

type Callback = Arc<dyn Fn() + Send + Sync>;

/// Slot for the callback run when the service rejects our credentials.
///
/// Shared between the [`UnauthorizedLogout`] stage, which fires it, and the
/// session manager, which registers it once the session is restored.
#[derive(Clone, Default)]
pub struct AuthFailureHook {
    callback: Arc<RwLock<Option<Callback>>>,
}

impl AuthFailureHook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the registered callback.
    pub fn register(&self, callback: impl Fn() + Send + Sync + 'static) {
        let mut slot = self.callback.write().unwrap_or_else(|p| p.into_inner());
        *slot = Some(Arc::new(callback));
    }

    pub fn is_registered(&self) -> bool {
        self.callback.read().unwrap_or_else(|p| p.into_inner()).is_some()
    }

    /// Run the callback, if any. Returns whether one ran.
    pub fn fire(&self) -> bool {
        // Clone out of the lock so the callback may re-register.
        let callback = self.callback.read().unwrap_or_else(|p| p.into_inner()).clone();
        match callback {
            Some(callback) => {
                callback();
                true
            }
            None => false,
        }
    }
}

impl std::fmt::Debug for AuthFailureHook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthFailureHook")
            .field("registered", &self.is_registered())
            .finish()
    }
}

/// Path of the credential exchange. A 401 there means wrong credentials, not
/// a rejected session token.
pub const LOGIN_PATH: &str = "/login";

/// Fires the [`AuthFailureHook`] on every 401 outside [`LOGIN_PATH`] and
/// passes the error on to the caller unchanged.
#[derive(Debug, Clone)]
pub struct UnauthorizedLogout {
    hook: AuthFailureHook,
}

impl UnauthorizedLogout {
    pub fn new(hook: AuthFailureHook) -> Self {
        Self { hook }
    }
}

#[async_trait]
impl Middleware for UnauthorizedLogout {
    async fn on_response(
        &self,
        request: &ApiRequest,
        result: Result<ApiResponse, ApiError>,
    ) -> Result<ApiResponse, ApiError> {
        if matches!(&result, Err(e) if e.is_unauthorized()) {
            if request.path == LOGIN_PATH {
                tracing::debug!(id = %request.id, "login rejected, session kept");
                return result;
            }
            tracing::warn!(id = %request.id, path = %request.path, "token rejected, logging out");
            self.hook.fire();
        }
        result
    }
}
