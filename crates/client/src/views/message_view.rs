//! A single received message with an inline reply box.

use oneview_shared::validation::validate_reply;
use oneview_shared::{MessageDetail, MessageId, PublicCode};

use super::send_message::{deliver, delivery_failure};
use super::{Alert, Outcome, Submission};
use crate::api_client::ApiClient;
use crate::routes::Navigation;

pub const NOT_FOUND: &str = "Message not found or expired.";
pub const REPLY_SENT: &str = "Reply sent successfully!";
pub const NO_REPLY_ADDRESS: &str = "This message has no sender code to reply to.";
/// Shown next to the reply box; the sender's code may be stale.
pub const STALE_CODE_WARNING: &str =
    "The sender may have rotated their code and might not receive this reply.";

#[derive(Debug, Clone)]
pub struct MessageViewScreen {
    api: ApiClient,
    id: MessageId,
    message: Option<MessageDetail>,
    pub reply: String,
}

impl MessageViewScreen {
    pub fn new(api: ApiClient, id: MessageId) -> Self {
        Self {
            api,
            id,
            message: None,
            reply: String::new(),
        }
    }

    pub fn id(&self) -> &MessageId {
        &self.id
    }

    /// `None` until [`open`](Self::open) succeeds.
    pub fn message(&self) -> Option<&MessageDetail> {
        self.message.as_ref()
    }

    /// `None` before the message is open, and for messages the service sent
    /// without a usable sender code.
    pub fn sender_code(&self) -> Option<&PublicCode> {
        self.message.as_ref().and_then(|m| m.sender_code.as_ref())
    }

    /// Fetch the message. The server may mark it read as a side effect.
    pub async fn open(&mut self) -> Outcome {
        match self.api.message(&self.id).await {
            Ok(detail) => {
                self.message = Some(detail);
                Outcome::none()
            }
            Err(e) => {
                tracing::error!(id = %self.id, error = %e, "fetching message failed");
                Outcome::alert(Alert::error(NOT_FOUND)).then(Navigation::Back)
            }
        }
    }

    /// Reply to the sender's current code. On failure the draft is kept and
    /// the screen stays open for a retry.
    pub async fn send_reply(&mut self) -> Submission {
        validate_reply(&self.reply)?;
        let Some(message) = &self.message else {
            return Ok(Outcome::alert(Alert::error(NOT_FOUND)).then(Navigation::Back));
        };
        let Some(to) = message.sender_code.clone() else {
            return Ok(Outcome::alert(Alert::error(NO_REPLY_ADDRESS)));
        };

        match deliver(&self.api, to, self.reply.clone()).await {
            Ok(()) => {
                self.reply.clear();
                Ok(Outcome::alert(Alert::success(REPLY_SENT)).then(Navigation::Back))
            }
            Err(e) => Ok(Outcome::alert(delivery_failure(&e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeTransport;
    use crate::views::send_message::{RECIPIENT_GONE, SEND_FAILED};
    use oneview_shared::{ApiError, Field};
    use reqwest::Method;
    use serde_json::json;
    use std::sync::Arc;

    fn opened_fake() -> Arc<FakeTransport> {
        let fake = Arc::new(FakeTransport::new());
        fake.respond(
            Method::GET,
            "/messages/7",
            200,
            json!({"message": "hi there", "sender_code": "0a1b2c3d"}),
        );
        fake
    }

    #[tokio::test]
    async fn open_loads_the_message() {
        let fake = opened_fake();
        let mut screen = MessageViewScreen::new(ApiClient::new(fake.clone()), "7".into());

        assert_eq!(screen.open().await, Outcome::none());
        assert_eq!(screen.message().unwrap().message, "hi there");
        assert_eq!(screen.sender_code().unwrap().as_str(), "0a1b2c3d");
    }

    #[tokio::test]
    async fn missing_message_alerts_and_goes_back() {
        let fake = Arc::new(FakeTransport::new());
        fake.respond(Method::GET, "/messages/7", 404, json!({"detail": "gone"}));
        let mut screen = MessageViewScreen::new(ApiClient::new(fake), "7".into());

        let outcome = screen.open().await;
        assert_eq!(outcome.alert, Some(Alert::error(NOT_FOUND)));
        assert_eq!(outcome.navigation, Some(Navigation::Back));
        assert!(screen.message().is_none());
    }

    #[tokio::test]
    async fn reply_goes_to_sender_and_returns() {
        let fake = opened_fake();
        fake.respond(Method::POST, "/messages", 201, json!({}));
        let mut screen = MessageViewScreen::new(ApiClient::new(fake.clone()), "7".into());
        screen.open().await;
        screen.reply = "thanks".into();

        let outcome = screen.send_reply().await.unwrap();
        assert_eq!(outcome.alert, Some(Alert::success(REPLY_SENT)));
        assert_eq!(outcome.navigation, Some(Navigation::Back));
        assert!(screen.reply.is_empty());

        let sent = fake
            .requests()
            .into_iter()
            .find(|r| r.method == Method::POST)
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(sent.body.as_deref().unwrap()).unwrap();
        assert_eq!(body, json!({"to_code": "0a1b2c3d", "content": "thanks"}));
    }

    #[tokio::test]
    async fn failed_reply_keeps_the_draft() {
        let fake = opened_fake();
        fake.respond(Method::POST, "/messages", 404, json!({}));
        fake.fail(Method::POST, "/messages", ApiError::Network("reset".into()));
        let mut screen = MessageViewScreen::new(ApiClient::new(fake.clone()), "7".into());
        screen.open().await;
        screen.reply = "thanks".into();

        let outcome = screen.send_reply().await.unwrap();
        assert_eq!(outcome.alert, Some(Alert::error(RECIPIENT_GONE)));
        assert_eq!(outcome.navigation, None);
        assert_eq!(screen.reply, "thanks");

        let outcome = screen.send_reply().await.unwrap();
        assert_eq!(outcome.alert, Some(Alert::error(SEND_FAILED)));
    }

    #[tokio::test]
    async fn message_without_sender_opens_but_cannot_be_answered() {
        let fake = Arc::new(FakeTransport::new());
        fake.respond(
            Method::GET,
            "/messages/7",
            200,
            json!({"message": "who am i", "sender_code": null}),
        );
        let mut screen = MessageViewScreen::new(ApiClient::new(fake.clone()), "7".into());

        assert_eq!(screen.open().await, Outcome::none());
        assert_eq!(screen.message().unwrap().message, "who am i");
        assert!(screen.sender_code().is_none());

        screen.reply = "hello?".into();
        let outcome = screen.send_reply().await.unwrap();
        assert_eq!(outcome.alert, Some(Alert::error(NO_REPLY_ADDRESS)));
        assert_eq!(outcome.navigation, None);
        assert_eq!(screen.reply, "hello?");
        assert_eq!(fake.count(&Method::POST, "/messages"), 0);
    }

    #[tokio::test]
    async fn empty_reply_is_caught_locally() {
        let fake = opened_fake();
        let mut screen = MessageViewScreen::new(ApiClient::new(fake.clone()), "7".into());
        screen.open().await;

        let errors = screen.send_reply().await.unwrap_err();
        assert_eq!(errors.get(Field::Content), Some("Message is required"));
        assert_eq!(fake.count(&Method::POST, "/messages"), 0);
    }
}
