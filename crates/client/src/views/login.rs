//! Login screen.

use oneview_shared::validation::validate_login;
use oneview_shared::FieldErrors;

use super::{Alert, Outcome, Submission};
use crate::auth_session::SessionManager;

pub const INVALID_CREDENTIALS: &str = "Invalid email or password!";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        validate_login(&self.email, &self.password)
    }
}

#[derive(Debug, Clone)]
pub struct LoginScreen {
    session: SessionManager,
    pub form: LoginForm,
}

impl LoginScreen {
    pub fn new(session: SessionManager) -> Self {
        Self {
            session,
            form: LoginForm::default(),
        }
    }

    /// On success there is nothing to do: the route stack switches when the
    /// session appears.
    pub async fn submit(&self) -> Submission {
        self.form.validate()?;
        if self.session.login(&self.form.email, &self.form.password).await {
            Ok(Outcome::none())
        } else {
            Ok(Outcome::alert(Alert::error(INVALID_CREDENTIALS)))
        }
    }
}
