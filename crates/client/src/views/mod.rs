//! Headless screens.
//!
//! Each screen owns its form state, validates before touching the network,
//! calls the API, and reports an [`Outcome`] for the front end to render:
//! an optional alert and an optional navigation request.

use oneview_shared::FieldErrors;

use crate::routes::Navigation;

pub mod dashboard;
pub mod login;
pub mod message_view;
pub mod register;
pub mod send_message;

pub use dashboard::{DashboardScreen, MessageRow, RotateOutcome};
pub use login::{LoginForm, LoginScreen};
pub use message_view::MessageViewScreen;
pub use register::{RegisterForm, RegisterScreen};
pub use send_message::{SendMessageForm, SendMessageScreen};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertKind {
    Success,
    Error,
}

/// A modal message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub kind: AlertKind,
    pub message: String,
}

impl Alert {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: AlertKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: AlertKind::Error,
            message: message.into(),
        }
    }

    pub fn title(&self) -> &'static str {
        match self.kind {
            AlertKind::Success => "Success",
            AlertKind::Error => "Error",
        }
    }
}

/// What a screen action wants the front end to do next.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outcome {
    pub alert: Option<Alert>,
    pub navigation: Option<Navigation>,
}

impl Outcome {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn alert(alert: Alert) -> Self {
        Self {
            alert: Some(alert),
            navigation: None,
        }
    }

    pub fn then(mut self, navigation: Navigation) -> Self {
        self.navigation = Some(navigation);
        self
    }
}

/// `Err` carries inline field errors; no request was made.
pub type Submission = Result<Outcome, FieldErrors>;
