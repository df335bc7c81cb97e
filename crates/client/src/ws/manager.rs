//! Keeps exactly one push connection open for whoever is logged in.

use futures_channel::mpsc::UnboundedReceiver;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::{push_url, PushConnection, PushEvent, Subscribers};
use crate::auth_session::SessionState;

/// Follows the session: opens a connection when a user id appears, closes it
/// when the id changes or goes away. Dropping the manager closes everything.
pub struct PushManager {
    subscribers: Subscribers,
    task: JoinHandle<()>,
}

impl PushManager {
    /// Start following `session`. Must be called inside a tokio runtime.
    pub fn spawn(ws_base: impl Into<String>, session: watch::Receiver<SessionState>) -> Self {
        let subscribers = Subscribers::new();
        let task = tokio::spawn(follow_session(ws_base.into(), session, subscribers.clone()));
        Self { subscribers, task }
    }

    /// Receive every push event from now on.
    pub fn subscribe(&self) -> UnboundedReceiver<PushEvent> {
        self.subscribers.subscribe()
    }

    pub fn subscribers(&self) -> &Subscribers {
        &self.subscribers
    }
}

impl Drop for PushManager {
    fn drop(&mut self) {
        // Dropping the task's PushConnection sends its shutdown signal.
        self.task.abort();
    }
}

async fn follow_session(
    ws_base: String,
    mut session: watch::Receiver<SessionState>,
    subscribers: Subscribers,
) {
    let mut current: Option<PushConnection> = None;

    loop {
        let user_id = session.borrow_and_update().user_id().map(str::to_string);

        if current.as_ref().map(PushConnection::user_id) != user_id.as_deref() {
            if let Some(connection) = current.take() {
                tracing::info!(user_id = %connection.user_id(), "session changed, closing push connection");
                connection.close().await;
            }
            if let Some(user_id) = user_id {
                let url = push_url(&ws_base, &user_id);
                tracing::debug!(%url, "opening push connection");
                current = Some(PushConnection::open(url, user_id, subscribers.clone()));
            }
        }

        if session.changed().await.is_err() {
            break;
        }
    }

    if let Some(connection) = current.take() {
        connection.close().await;
    }
}
