//! Compose a message to a public code.

use oneview_shared::validation::validate_send_message;
use oneview_shared::{ApiError, FieldErrors, PublicCode, SendMessageRequest};

use super::{Alert, Outcome, Submission};
use crate::api_client::ApiClient;
use crate::routes::{Navigation, Route};

pub const SENT: &str = "Message sent!";
pub const RECIPIENT_GONE: &str =
    "Failed to send the message; the recipient may have rotated their public code.";
pub const SEND_FAILED: &str = "Failed to send the message.";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendMessageForm {
    pub to_code: String,
    pub content: String,
}

impl SendMessageForm {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        validate_send_message(&self.to_code, &self.content)
    }
}

/// Post `content` to `to`. Shared with replies from the message view.
pub(crate) async fn deliver(api: &ApiClient, to: PublicCode, content: String) -> Result<(), ApiError> {
    api.send_message(&SendMessageRequest { to_code: to, content }).await
}

/// Alert for a failed delivery: unknown codes get a specific explanation.
pub(crate) fn delivery_failure(error: &ApiError) -> Alert {
    tracing::error!(error = %error, "sending message failed");
    if error.is_not_found() {
        Alert::error(RECIPIENT_GONE)
    } else {
        Alert::error(SEND_FAILED)
    }
}

#[derive(Debug, Clone)]
pub struct SendMessageScreen {
    api: ApiClient,
    pub form: SendMessageForm,
}

impl SendMessageScreen {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            form: SendMessageForm::default(),
        }
    }

    /// Success returns to the dashboard. Failures stay here so the user can
    /// fix the code and retry.
    pub async fn submit(&self) -> Submission {
        self.form.validate()?;
        let to = match self.form.to_code.parse::<PublicCode>() {
            Ok(code) => code,
            Err(e) => return Ok(Outcome::alert(Alert::error(e.to_string()))),
        };

        match deliver(&self.api, to, self.form.content.clone()).await {
            Ok(()) => Ok(Outcome::alert(Alert::success(SENT)).then(Navigation::To(Route::Dashboard))),
            Err(e) => Ok(Outcome::alert(delivery_failure(&e))),
        }
    }
}
