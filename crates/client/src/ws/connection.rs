//! A single push connection, driven by a background tokio task.

use futures_util::StreamExt;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use super::{PushEvent, Subscribers};

/// Connection state for a WebSocket
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Failed { reason: String },
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }
}

/// One WebSocket to the push endpoint for one user.
///
/// Closing (or dropping) the handle stops the background task and sends a
/// close frame if the socket is open.
pub struct PushConnection {
    user_id: String,
    state: watch::Receiver<ConnectionState>,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl PushConnection {
    /// Start connecting to `url`. Must be called inside a tokio runtime.
    pub fn open(url: String, user_id: String, subscribers: Subscribers) -> Self {
        let (state_tx, state) = watch::channel(ConnectionState::Disconnected);
        let (shutdown, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(run(url, user_id.clone(), subscribers, state_tx, shutdown_rx));
        Self {
            user_id,
            state,
            shutdown: Some(shutdown),
            task,
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn state(&self) -> ConnectionState {
        self.state.borrow().clone()
    }

    /// Receiver that observes state transitions.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Close the socket and wait for the background task to finish.
    pub async fn close(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Err(e) = (&mut self.task).await {
            tracing::error!(user_id = %self.user_id, error = %e, "push task ended abnormally");
        }
    }
}

impl Drop for PushConnection {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

async fn run(
    url: String,
    user_id: String,
    subscribers: Subscribers,
    state: watch::Sender<ConnectionState>,
    mut shutdown: oneshot::Receiver<()>,
) {
    state.send_replace(ConnectionState::Connecting);

    let connected = tokio::select! {
        result = connect_async(url.as_str()) => result,
        _ = &mut shutdown => {
            state.send_replace(ConnectionState::Disconnected);
            return;
        }
    };

    let mut stream = match connected {
        Ok((stream, _response)) => stream,
        Err(e) => {
            tracing::error!(%user_id, error = %e, "push connection failed");
            state.send_replace(ConnectionState::Failed { reason: e.to_string() });
            subscribers.broadcast(PushEvent::Error(e.to_string()));
            return;
        }
    };

    tracing::info!(%user_id, "push connected");
    state.send_replace(ConnectionState::Connected);
    subscribers.broadcast(PushEvent::Connected {
        user_id: user_id.clone(),
    });

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                if let Err(e) = stream.close(None).await {
                    tracing::debug!(%user_id, error = %e, "close handshake failed");
                }
                tracing::info!(%user_id, "push connection closed by client");
                subscribers.broadcast(PushEvent::Closed {
                    code: Some(1000),
                    reason: "closed by client".to_string(),
                });
                break;
            }
            msg = stream.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    tracing::info!(%user_id, payload = %text.as_str(), "push message received");
                    subscribers.broadcast(PushEvent::Message(text.as_str().to_owned()));
                }
                Some(Ok(Message::Binary(bytes))) => {
                    tracing::info!(%user_id, len = bytes.len(), "push binary message received");
                    subscribers.broadcast(PushEvent::Message(String::from_utf8_lossy(&bytes).into_owned()));
                }
                Some(Ok(Message::Close(frame))) => {
                    let (code, reason) = frame
                        .map(|f| (Some(u16::from(f.code)), f.reason.to_string()))
                        .unwrap_or((None, String::new()));
                    tracing::info!(%user_id, ?code, %reason, "push connection closed by server");
                    subscribers.broadcast(PushEvent::Closed { code, reason });
                    break;
                }
                Some(Ok(_)) => {
                    // Ping/pong is answered by tungstenite
                }
                Some(Err(e)) => {
                    tracing::error!(%user_id, error = %e, "push read error");
                    subscribers.broadcast(PushEvent::Error(e.to_string()));
                    break;
                }
                None => {
                    tracing::info!(%user_id, "push stream ended");
                    subscribers.broadcast(PushEvent::Closed { code: None, reason: String::new() });
                    break;
                }
            }
        }
    }

    state.send_replace(ConnectionState::Disconnected);
}
