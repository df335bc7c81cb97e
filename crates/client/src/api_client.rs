//! HTTP API client with a middleware pipeline.

use std::sync::Arc;

use oneview_shared::{
    ApiError, Credentials, InboxMessage, MessageDetail, MessageId, MyCodeResponse, PublicCode,
    RotatedCodeResponse, SendMessageRequest, TokenResponse,
};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::middleware::{
    AuthFailureHook, BearerAuth, Middleware, RequestLog, UnauthorizedLogout, LOGIN_PATH,
};
use crate::storage::TokenStore;
use crate::transport::{ApiRequest, ApiResponse, Transport};

/// Client for the OneView REST API.
///
/// Cheap to clone; clones share the transport and the middleware list.
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    middleware: Vec<Arc<dyn Middleware>>,
}

impl ApiClient {
    /// Client with no middleware.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            middleware: Vec::new(),
        }
    }

    /// The standard pipeline: request logging, bearer auth read from `store`,
    /// and logout on 401 through `hook`.
    pub fn authenticated(
        transport: Arc<dyn Transport>,
        store: Arc<dyn TokenStore>,
        hook: AuthFailureHook,
    ) -> Self {
        Self::new(transport)
            .with_middleware(RequestLog)
            .with_middleware(BearerAuth::new(store))
            .with_middleware(UnauthorizedLogout::new(hook))
    }

    /// Append a stage to the pipeline.
    pub fn with_middleware(mut self, middleware: impl Middleware + 'static) -> Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    /// Run `request` through the pipeline and the transport.
    pub async fn execute(&self, mut request: ApiRequest) -> Result<ApiResponse, ApiError> {
        for stage in &self.middleware {
            stage.on_request(&mut request).await?;
        }

        let mut result = self
            .transport
            .send(&request)
            .await
            .and_then(ApiResponse::error_for_status);

        for stage in self.middleware.iter().rev() {
            result = stage.on_response(&request, result).await;
        }
        result
    }

    async fn execute_json<TRes: DeserializeOwned>(
        &self,
        request: ApiRequest,
    ) -> Result<TRes, ApiError> {
        let resp = self.execute(request).await?;
        let text = if resp.body.trim().is_empty() { "null" } else { resp.body.as_str() };
        serde_json::from_str(text).map_err(|e| ApiError::Deserialize(e.to_string()))
    }

    /// Make a GET request
    pub async fn get_json<TRes: DeserializeOwned>(&self, path: &str) -> Result<TRes, ApiError> {
        self.execute_json(ApiRequest::new(Method::GET, path)).await
    }

    /// Make a POST request with JSON body
    pub async fn post_json<TReq: Serialize + ?Sized, TRes: DeserializeOwned>(
        &self,
        path: &str,
        body: &TReq,
    ) -> Result<TRes, ApiError> {
        self.execute_json(ApiRequest::new(Method::POST, path).json(body)?).await
    }

    /// Make a POST request with JSON body, ignoring whatever comes back
    pub async fn post_unit<TReq: Serialize + ?Sized>(&self, path: &str, body: &TReq) -> Result<(), ApiError> {
        self.execute(ApiRequest::new(Method::POST, path).json(body)?).await.map(drop)
    }

    /// Make a PUT request without a body
    pub async fn put_empty<TRes: DeserializeOwned>(&self, path: &str) -> Result<TRes, ApiError> {
        self.execute_json(ApiRequest::new(Method::PUT, path)).await
    }

    // --- Endpoints ---

    /// Exchange credentials for a bearer token
    pub async fn login(&self, credentials: &Credentials) -> Result<TokenResponse, ApiError> {
        self.post_json(LOGIN_PATH, credentials).await
    }

    /// Create an account. A duplicate email answers 409.
    pub async fn register(&self, credentials: &Credentials) -> Result<(), ApiError> {
        self.post_unit("/register", credentials).await
    }

    /// Get the current user's public code
    pub async fn my_code(&self) -> Result<PublicCode, ApiError> {
        self.get_json::<MyCodeResponse>("/code/my").await.map(|r| r.public_code)
    }

    /// Replace the current user's public code with a fresh one
    pub async fn rotate_code(&self) -> Result<PublicCode, ApiError> {
        self.put_empty::<RotatedCodeResponse>("/code/rotate")
            .await
            .map(|r| r.new_public_code)
    }

    /// List messages addressed to the current user. Rows that do not decode
    /// are skipped with a warning; the rest of the inbox is still returned.
    pub async fn my_messages(&self) -> Result<Vec<InboxMessage>, ApiError> {
        let rows: Vec<serde_json::Value> = self.get_json("/messages/my").await?;
        Ok(rows
            .into_iter()
            .enumerate()
            .filter_map(|(index, row)| match serde_json::from_value::<InboxMessage>(row) {
                Ok(message) => Some(message),
                Err(e) => {
                    tracing::warn!(index, error = %e, "skipping undecodable inbox row");
                    None
                }
            })
            .collect())
    }

    /// Fetch one message
    pub async fn message(&self, id: &MessageId) -> Result<MessageDetail, ApiError> {
        self.get_json(&format!("/messages/{}", urlencoding::encode(id.as_str())))
            .await
    }

    /// Send a message to a public code. An unknown or rotated code answers 404.
    pub async fn send_message(&self, request: &SendMessageRequest) -> Result<(), ApiError> {
        self.post_unit("/messages", request).await
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("middleware", &self.middleware.len())
            .finish_non_exhaustive()
    }
}
