//! Shared types for the OneView client: wire models, API errors and form
//! validation.

pub mod error;
pub mod models;
pub mod validation;

pub use error::*;
pub use models::*;
pub use validation::{Field, FieldErrors};
