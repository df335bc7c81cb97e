//! OneView client
//!
//! Talks to the OneView service: account registration and login, a
//! rotatable public code, an inbox of anonymous messages, and a push channel
//! for the logged-in user. Screens are headless so any front end (the
//! bundled CLI included) can drive them.

pub mod api_client;
pub mod app;
pub mod auth_session;
pub mod config;
pub mod display;
pub mod logging;
pub mod middleware;
pub mod routes;
pub mod storage;
pub mod token;
pub mod transport;
pub mod views;
pub mod ws;

#[cfg(test)]
pub(crate) mod testing;

pub use api_client::ApiClient;
pub use app::App;
pub use auth_session::{LoginError, SessionManager, SessionState};
pub use config::{ClientConfig, ConfigOverrides};
pub use routes::{Navigation, Navigator, Route};
pub use storage::{FileTokenStore, MemoryTokenStore, TokenStore};
pub use views::{Alert, Outcome};
pub use ws::{PushEvent, PushManager};
