//! Server push over WebSocket.
//!
//! The service pushes opaque payloads on `GET /ws/:userId`. This module opens
//! that connection for the logged-in user and hands what arrives to every
//! subscriber as a typed [`PushEvent`]:
//!
//! ```text
//!   SessionState (watch) ──▶ PushManager ──▶ PushConnection ──▶ Subscribers
//!                            one per user     one socket         fan-out
//! ```
//!
//! Payloads are not parsed or acknowledged, and a dropped connection is not
//! re-established.

use std::sync::{Arc, Mutex};

use futures_channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};

mod connection;
mod manager;

pub use connection::{ConnectionState, PushConnection};
pub use manager::PushManager;

/// Something that happened on the push channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushEvent {
    Connected { user_id: String },
    /// Raw payload as sent by the service. Binary frames are decoded lossily.
    Message(String),
    Closed { code: Option<u16>, reason: String },
    Error(String),
}

/// Explicit list of event consumers.
#[derive(Clone, Default)]
pub struct Subscribers {
    senders: Arc<Mutex<Vec<UnboundedSender<PushEvent>>>>,
}

impl Subscribers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a consumer. Dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> UnboundedReceiver<PushEvent> {
        let (tx, rx) = unbounded();
        self.lock().push(tx);
        rx
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver `event` to every live subscriber and forget the dead ones.
    pub fn broadcast(&self, event: PushEvent) {
        self.lock()
            .retain(|tx| tx.unbounded_send(event.clone()).is_ok());
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<UnboundedSender<PushEvent>>> {
        self.senders.lock().unwrap_or_else(|p| p.into_inner())
    }
}

/// `{ws_base}/ws/{user_id}`
pub fn push_url(ws_base: &str, user_id: &str) -> String {
    format!(
        "{}/ws/{}",
        ws_base.trim_end_matches('/'),
        urlencoding::encode(user_id)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;

    #[test]
    fn push_url_encodes_user() {
        assert_eq!(push_url("ws://host:8000/", "42"), "ws://host:8000/ws/42");
        assert_eq!(push_url("wss://h", "a b"), "wss://h/ws/a%20b");
    }

    #[tokio::test]
    async fn broadcast_reaches_all_and_prunes_dropped() {
        let subs = Subscribers::new();
        let mut a = subs.subscribe();
        let b = subs.subscribe();
        drop(b);

        subs.broadcast(PushEvent::Message("hello".into()));
        assert_eq!(subs.len(), 1);
        assert_eq!(a.next().await, Some(PushEvent::Message("hello".into())));
    }
}
