//! Reading the session identity out of a bearer token.
//!
//! Tokens are JWTs. The client never verifies the signature (it has no key
//! and the service re-checks every request); it only reads the claims to learn
//! who it is logged in as.

use chrono::{DateTime, Utc};
use jsonwebtoken::errors::{Error as JwtError, ErrorKind};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("token is not a three-part JWT")]
    Malformed,
    #[error("token segment is not base64url: {0}")]
    Base64(String),
    #[error("token header or payload is not JSON: {0}")]
    Json(String),
    #[error("token rejected: {0}")]
    Invalid(String),
    #[error("token has no usable subject claim")]
    MissingSubject,
}

impl From<JwtError> for DecodeError {
    fn from(e: JwtError) -> Self {
        match e.kind() {
            ErrorKind::InvalidToken => DecodeError::Malformed,
            ErrorKind::Base64(inner) => DecodeError::Base64(inner.to_string()),
            ErrorKind::Json(inner) => DecodeError::Json(inner.to_string()),
            ErrorKind::Utf8(inner) => DecodeError::Json(inner.to_string()),
            _ => DecodeError::Invalid(e.to_string()),
        }
    }
}

/// Who the session belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    /// `exp` claim, if present. Informational: expiry is detected by the
    /// service answering 401, not checked locally.
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct Claims {
    #[serde(default)]
    sub: Option<Value>,
    #[serde(default)]
    exp: Option<i64>,
}

/// Claims are read as-is: no signature, expiry, audience or required-claim
/// checks.
fn read_only_validation() -> Validation {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();
    validation
}

/// Decode the identity carried in `token`'s payload.
pub fn decode_identity(token: &str) -> Result<Identity, DecodeError> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 || segments.iter().any(|s| s.is_empty()) {
        return Err(DecodeError::Malformed);
    }
    // Some issuers keep base64 padding, which the decoder rejects.
    let normalized = segments
        .iter()
        .map(|s| s.trim_end_matches('='))
        .collect::<Vec<_>>()
        .join(".");

    let data = jsonwebtoken::decode::<Claims>(
        &normalized,
        &DecodingKey::from_secret(&[]),
        &read_only_validation(),
    )?;
    let claims = data.claims;

    let user_id = match claims.sub {
        Some(Value::String(s)) if !s.trim().is_empty() => s,
        Some(Value::Number(n)) => n.to_string(),
        _ => return Err(DecodeError::MissingSubject),
    };

    Ok(Identity {
        user_id,
        expires_at: claims.exp.and_then(|secs| DateTime::from_timestamp(secs, 0)),
    })
}

/// Issue an HS256 token carrying `claims`. Only useful to fakes of the
/// remote service; the client itself never signs anything.
pub fn encode_token(claims: &Value, secret: &[u8]) -> Result<String, JwtError> {
    jsonwebtoken::encode(&Header::default(), claims, &EncodingKey::from_secret(secret))
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD};
    use base64::Engine as _;
    use serde_json::json;

    fn token(claims: Value) -> String {
        encode_token(&claims, b"test-secret").unwrap()
    }

    fn header() -> String {
        URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#)
    }

    #[test]
    fn string_subject() {
        let token = token(json!({"sub": "user-42", "exp": 1_700_000_000}));
        let identity = decode_identity(&token).unwrap();
        assert_eq!(identity.user_id, "user-42");
        assert_eq!(identity.expires_at.map(|t| t.timestamp()), Some(1_700_000_000));
    }

    #[test]
    fn numeric_subject() {
        assert_eq!(decode_identity(&token(json!({"sub": 42}))).unwrap().user_id, "42");
    }

    #[test]
    fn signature_and_expiry_are_not_checked() {
        let issued =
            encode_token(&json!({"sub": "u", "exp": 1, "aud": "elsewhere"}), b"other-key").unwrap();
        assert_eq!(decode_identity(&issued).unwrap().user_id, "u");
    }

    #[test]
    fn padded_payload_is_accepted() {
        let payload = URL_SAFE.encode(br#"{"sub":"abc"}"#);
        assert!(payload.ends_with('='));
        let token = format!("{}.{payload}.sig", header());
        assert_eq!(decode_identity(&token).unwrap().user_id, "abc");
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(decode_identity("opaque"), Err(DecodeError::Malformed));
        assert_eq!(decode_identity("a.b.c.d"), Err(DecodeError::Malformed));
        assert_eq!(decode_identity("a..c"), Err(DecodeError::Malformed));
        let bad_payload = format!("{}.!!!.sig", header());
        assert!(matches!(decode_identity(&bad_payload), Err(DecodeError::Base64(_))));
        let not_json = format!("{}.{}.sig", header(), URL_SAFE_NO_PAD.encode("nope"));
        assert!(matches!(decode_identity(&not_json), Err(DecodeError::Json(_))));
    }

    #[test]
    fn rejects_missing_or_blank_subject() {
        assert_eq!(decode_identity(&token(json!({"exp": 1}))), Err(DecodeError::MissingSubject));
        assert_eq!(decode_identity(&token(json!({"sub": "  "}))), Err(DecodeError::MissingSubject));
    }
}
