//! Account registration screen.

use oneview_shared::validation::validate_registration;
use oneview_shared::{Credentials, FieldErrors};

use super::{Alert, Outcome, Submission};
use crate::api_client::ApiClient;
use crate::routes::{Navigation, Route};

pub const REGISTERED: &str = "Account created successfully!";
pub const EMAIL_TAKEN: &str = "Email already registered!";
pub const REGISTER_FAILED: &str = "Failed to create the account.";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegisterForm {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl RegisterForm {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        validate_registration(&self.email, &self.password, &self.confirm_password)
    }
}

#[derive(Debug, Clone)]
pub struct RegisterScreen {
    api: ApiClient,
    pub form: RegisterForm,
}

impl RegisterScreen {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            form: RegisterForm::default(),
        }
    }

    pub async fn submit(&self) -> Submission {
        self.form.validate()?;
        let credentials = Credentials {
            email: self.form.email.clone(),
            password: self.form.password.clone(),
        };

        match self.api.register(&credentials).await {
            Ok(()) => Ok(Outcome::alert(Alert::success(REGISTERED)).then(Navigation::To(Route::Login))),
            Err(e) if e.is_conflict() => Ok(Outcome::alert(Alert::error(EMAIL_TAKEN))),
            Err(e) => {
                tracing::error!(error = %e, "registration failed");
                Ok(Outcome::alert(Alert::error(REGISTER_FAILED)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeTransport;
    use oneview_shared::{ApiError, Field};
    use reqwest::Method;
    use serde_json::json;
    use std::sync::Arc;

    fn filled(fake: &Arc<FakeTransport>) -> RegisterScreen {
        let mut screen = RegisterScreen::new(ApiClient::new(fake.clone()));
        screen.form = RegisterForm {
            email: "ana@example.com".into(),
            password: "Abcdef1!".into(),
            confirm_password: "Abcdef1!".into(),
        };
        screen
    }

    #[tokio::test]
    async fn success_goes_to_login() {
        let fake = Arc::new(FakeTransport::new());
        fake.respond(Method::POST, "/register", 201, json!({"id": 1}));

        let outcome = filled(&fake).submit().await.unwrap();
        assert_eq!(outcome.alert, Some(Alert::success(REGISTERED)));
        assert_eq!(outcome.navigation, Some(Navigation::To(Route::Login)));

        let body: serde_json::Value =
            serde_json::from_slice(fake.requests()[0].body.as_deref().unwrap()).unwrap();
        assert_eq!(body, json!({"email": "ana@example.com", "password": "Abcdef1!"}));
    }

    #[tokio::test]
    async fn duplicate_email_is_reported_specifically() {
        let fake = Arc::new(FakeTransport::new());
        fake.respond(Method::POST, "/register", 409, json!({"detail": "exists"}));

        let outcome = filled(&fake).submit().await.unwrap();
        assert_eq!(outcome.alert, Some(Alert::error(EMAIL_TAKEN)));
        assert_eq!(outcome.navigation, None);
    }

    #[tokio::test]
    async fn other_failures_are_generic() {
        let fake = Arc::new(FakeTransport::new());
        fake.fail(Method::POST, "/register", ApiError::Network("timeout".into()));

        let outcome = filled(&fake).submit().await.unwrap();
        assert_eq!(outcome.alert, Some(Alert::error(REGISTER_FAILED)));
    }

    #[tokio::test]
    async fn weak_password_is_caught_locally() {
        let fake = Arc::new(FakeTransport::new());
        let mut screen = filled(&fake);
        screen.form.password = "password".into();
        screen.form.confirm_password = "password".into();

        let errors = screen.submit().await.unwrap_err();
        assert!(errors.get(Field::Password).is_some());
        assert!(fake.requests().is_empty());
    }
}
