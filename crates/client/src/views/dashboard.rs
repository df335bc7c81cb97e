//! Home screen of an authenticated user: the public code and the inbox.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use oneview_shared::{ApiError, InboxMessage, MessageId, PublicCode};

use crate::auth_session::SessionManager;
use crate::display::{alias_for, relative_time};

/// One inbox line as the dashboard renders it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRow {
    pub id: MessageId,
    pub alias: String,
    pub read: bool,
    pub received: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RotateOutcome {
    Rotated(PublicCode),
    /// Another rotation was still in flight; nothing was sent.
    AlreadyRotating,
    Failed,
}

#[derive(Debug, Default)]
struct DashboardState {
    code: Option<PublicCode>,
    messages: Vec<InboxMessage>,
    loading: bool,
}

/// Holds the rotation flag; clears it on drop, including when the rotate
/// future is cancelled mid-request.
struct RotatingGuard<'a>(&'a AtomicBool);

impl<'a> RotatingGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        (!flag.swap(true, Ordering::AcqRel)).then_some(Self(flag))
    }
}

impl Drop for RotatingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Cheap to clone; clones share state.
#[derive(Debug, Clone)]
pub struct DashboardScreen {
    session: SessionManager,
    state: Arc<Mutex<DashboardState>>,
    rotating: Arc<AtomicBool>,
}

impl DashboardScreen {
    pub fn new(session: SessionManager) -> Self {
        Self {
            session,
            state: Arc::new(Mutex::new(DashboardState {
                loading: true,
                ..Default::default()
            })),
            rotating: Arc::new(AtomicBool::new(false)),
        }
    }

    fn state(&self) -> MutexGuard<'_, DashboardState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Fetch the code, then the inbox. A failure stops the sequence and is
    /// only logged; whatever was loaded before stays on screen.
    pub async fn load(&self) {
        if let Err(e) = self.fetch().await {
            tracing::error!(error = %e, "loading dashboard failed");
        }
        self.state().loading = false;
    }

    async fn fetch(&self) -> Result<(), ApiError> {
        let api = self.session.api();
        let code = api.my_code().await?;
        self.state().code = Some(code);

        let messages = api.my_messages().await?;
        tracing::debug!(count = messages.len(), "inbox loaded");
        self.state().messages = messages;
        Ok(())
    }

    /// Pull-to-refresh.
    pub async fn refresh(&self) {
        self.load().await;
    }

    pub async fn rotate(&self) -> RotateOutcome {
        let Some(guard) = RotatingGuard::acquire(&self.rotating) else {
            return RotateOutcome::AlreadyRotating;
        };
        let result = self.session.api().rotate_code().await;
        drop(guard);

        match result {
            Ok(code) => {
                tracing::info!("public code rotated");
                self.state().code = Some(code.clone());
                RotateOutcome::Rotated(code)
            }
            Err(e) => {
                tracing::error!(error = %e, "rotating code failed");
                RotateOutcome::Failed
            }
        }
    }

    pub fn logout(&self) {
        self.session.logout();
    }

    pub fn is_loading(&self) -> bool {
        self.state().loading
    }

    pub fn is_rotating(&self) -> bool {
        self.rotating.load(Ordering::Acquire)
    }

    pub fn code(&self) -> Option<PublicCode> {
        self.state().code.clone()
    }

    pub fn messages(&self) -> Vec<InboxMessage> {
        self.state().messages.clone()
    }

    pub fn rows(&self, now: DateTime<Utc>) -> Vec<MessageRow> {
        self.state()
            .messages
            .iter()
            .map(|m| MessageRow {
                id: m.id.clone(),
                alias: alias_for(&m.id),
                read: m.is_read(),
                received: relative_time(m.created_at, now),
            })
            .collect()
    }
}
