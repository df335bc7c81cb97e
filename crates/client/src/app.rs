//! Wires the client together: token file, HTTP transport, middleware
//! pipeline, session and push.

use std::sync::Arc;

use crate::api_client::ApiClient;
use crate::auth_session::SessionManager;
use crate::config::ClientConfig;
use crate::middleware::AuthFailureHook;
use crate::routes::Navigator;
use crate::storage::{FileTokenStore, TokenStore};
use crate::transport::{ReqwestTransport, Transport};
use crate::views::{
    DashboardScreen, LoginScreen, MessageViewScreen, RegisterScreen, SendMessageScreen,
};
use crate::ws::PushManager;
use oneview_shared::MessageId;

#[derive(Debug, Clone)]
pub struct App {
    config: ClientConfig,
    session: SessionManager,
}

impl App {
    /// Build and initialise. The session is rehydrated from the token file
    /// before this returns.
    pub fn build(config: ClientConfig) -> Self {
        let store: Arc<dyn TokenStore> = Arc::new(FileTokenStore::new(&config.data_dir));
        let transport: Arc<dyn Transport> = Arc::new(ReqwestTransport::new(config.api_base.clone()));
        Self::with_parts(config, transport, store)
    }

    pub fn with_parts(
        config: ClientConfig,
        transport: Arc<dyn Transport>,
        store: Arc<dyn TokenStore>,
    ) -> Self {
        let hook = AuthFailureHook::new();
        let api = ApiClient::authenticated(transport, store.clone(), hook.clone());
        let session = SessionManager::new(api, store, hook);
        session.initialize();
        tracing::debug!(api_base = %config.api_base, "client ready");
        Self { config, session }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    pub fn api(&self) -> &ApiClient {
        self.session.api()
    }

    pub fn navigator(&self) -> Navigator {
        Navigator::new(&self.session.state())
    }

    /// Start following the session on the push channel. Needs a tokio
    /// runtime.
    pub fn push(&self) -> PushManager {
        PushManager::spawn(self.config.ws_base.clone(), self.session.subscribe())
    }

    pub fn login_screen(&self) -> LoginScreen {
        LoginScreen::new(self.session.clone())
    }

    pub fn register_screen(&self) -> RegisterScreen {
        RegisterScreen::new(self.api().clone())
    }

    pub fn dashboard(&self) -> DashboardScreen {
        DashboardScreen::new(self.session.clone())
    }

    pub fn send_message_screen(&self) -> SendMessageScreen {
        SendMessageScreen::new(self.api().clone())
    }

    pub fn message_view(&self, id: MessageId) -> MessageViewScreen {
        MessageViewScreen::new(self.api().clone(), id)
    }
}
