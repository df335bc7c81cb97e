//! Form validation rules shared by every front end.
//!
//! Each field reports at most one error: the first rule it fails.

use std::collections::BTreeMap;
use std::fmt;

use crate::models::is_public_code;

/// Minimum length of a new account password.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Characters that satisfy the "special character" password rule.
pub const PASSWORD_SPECIALS: &str = "!@#~$%^&*()+|_";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Email,
    Password,
    ConfirmPassword,
    ToCode,
    Content,
}

impl Field {
    pub fn name(self) -> &'static str {
        match self {
            Field::Email => "email",
            Field::Password => "password",
            Field::ConfirmPassword => "confirmPassword",
            Field::ToCode => "to_code",
            Field::Content => "content",
        }
    }
}

/// Per-field validation messages, ready to render inline under each input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<Field, String>);

impl FieldErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &str)> {
        self.0.iter().map(|(f, m)| (*f, m.as_str()))
    }

    fn check(&mut self, field: Field, result: Result<(), &str>) {
        if let Err(message) = result {
            self.0.entry(field).or_insert_with(|| message.to_string());
        }
    }

    /// `Ok(())` when no field failed.
    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in self.iter() {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{}: {message}", field.name())?;
            first = false;
        }
        Ok(())
    }
}

impl std::error::Error for FieldErrors {}

/// Loose structural check: one `@`, a non-empty local part, and a dotted
/// domain with no empty labels. No whitespace anywhere.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && domain.split('.').all(|label| !label.is_empty())
}

fn email_rule(email: &str) -> Result<(), &'static str> {
    if email.is_empty() {
        Err("Email is required")
    } else if !is_valid_email(email) {
        Err("Invalid email")
    } else {
        Ok(())
    }
}

fn strong_password_rule(password: &str) -> Result<(), &'static str> {
    if password.is_empty() {
        return Err("Password is required");
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err("Password must be at least 8 characters");
    }
    let upper = password.chars().any(|c| c.is_ascii_uppercase());
    let lower = password.chars().any(|c| c.is_ascii_lowercase());
    let digit = password.chars().any(|c| c.is_ascii_digit());
    let special = password.chars().any(|c| PASSWORD_SPECIALS.contains(c));
    if upper && lower && digit && special {
        Ok(())
    } else {
        Err("Password must contain an uppercase letter, a lowercase letter, a number and a special character (!@#~$%^&*()+|_)")
    }
}

fn content_rule(content: &str) -> Result<(), &'static str> {
    if content.is_empty() {
        Err("Message is required")
    } else {
        Ok(())
    }
}

pub fn validate_login(email: &str, password: &str) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::default();
    errors.check(Field::Email, email_rule(email));
    errors.check(
        Field::Password,
        if password.is_empty() { Err("Password is required") } else { Ok(()) },
    );
    errors.into_result()
}

pub fn validate_registration(email: &str, password: &str, confirm: &str) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::default();
    errors.check(Field::Email, email_rule(email));
    errors.check(Field::Password, strong_password_rule(password));
    let confirm_result = if confirm.is_empty() {
        Err("Confirm your password")
    } else if confirm != password {
        Err("Passwords do not match")
    } else {
        Ok(())
    };
    errors.check(Field::ConfirmPassword, confirm_result);
    errors.into_result()
}

pub fn validate_send_message(to_code: &str, content: &str) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::default();
    let code_result = if to_code.is_empty() {
        Err("Code is required")
    } else if !is_public_code(to_code) {
        Err("Invalid code (8 hexadecimal characters)")
    } else {
        Ok(())
    };
    errors.check(Field::ToCode, code_result);
    errors.check(Field::Content, content_rule(content));
    errors.into_result()
}

pub fn validate_reply(content: &str) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::default();
    errors.check(Field::Content, content_rule(content));
    errors.into_result()
}
