//! Wire models for the OneView REST API.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// --- Public codes ---

/// Number of hex digits in a public code.
pub const PUBLIC_CODE_LEN: usize = 8;

/// Returns true if `code` is exactly eight hex digits, in either case.
pub fn is_public_code(code: &str) -> bool {
    code.len() == PUBLIC_CODE_LEN && hex::decode(code).is_ok()
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid public code {0:?}: expected {PUBLIC_CODE_LEN} hex characters")]
pub struct InvalidPublicCode(pub String);

/// Rotatable identifier a user shares so others can message them.
///
/// The service owns and rotates it; the client only displays it and uses it
/// as a message recipient.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PublicCode(String);

impl PublicCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for PublicCode {
    type Error = InvalidPublicCode;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if is_public_code(&value) {
            Ok(Self(value))
        } else {
            Err(InvalidPublicCode(value))
        }
    }
}

impl FromStr for PublicCode {
    type Err = InvalidPublicCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(s.to_string())
    }
}

impl From<PublicCode> for String {
    fn from(code: PublicCode) -> Self {
        code.0
    }
}

impl fmt::Display for PublicCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

/// A sender code as the service reports it. Anything that is not a valid
/// code (null, a number, a malformed string) reads as `None`.
fn lenient_sender_code<'de, D: serde::Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<PublicCode>, D::Error> {
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(raw) => PublicCode::try_from(raw).ok(),
        _ => None,
    })
}

// --- Auth ---

/// Body of `POST /login` and `POST /register`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Response of `POST /login`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenResponse {
    pub token: String,
}

// --- Codes ---

/// Response of `GET /code/my`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MyCodeResponse {
    pub public_code: PublicCode,
}

/// Response of `PUT /code/rotate`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RotatedCodeResponse {
    pub new_public_code: PublicCode,
}

// --- Messages ---

#[derive(Deserialize)]
#[serde(untagged)]
enum RawMessageId {
    Number(i64),
    Text(String),
}

impl From<RawMessageId> for MessageId {
    fn from(raw: RawMessageId) -> Self {
        match raw {
            RawMessageId::Number(n) => MessageId(n.to_string()),
            RawMessageId::Text(s) => MessageId(s),
        }
    }
}

/// Server-assigned message id. The API has used both integers and strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "RawMessageId")]
pub struct MessageId(pub String);

impl MessageId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl From<&str> for MessageId {
    fn from(s: &str) -> Self {
        MessageId(s.to_string())
    }
}

/// One entry of `GET /messages/my`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InboxMessage {
    pub id: MessageId,
    pub sender_code: PublicCode,
    #[serde(default)]
    pub content: String,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, with = "timestamp::option")]
    pub read_at: Option<DateTime<Utc>>,
}

impl InboxMessage {
    pub fn is_read(&self) -> bool {
        self.read_at.is_some()
    }
}

/// Response of `GET /messages/:id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MessageDetail {
    #[serde(default)]
    pub id: Option<MessageId>,
    pub message: String,
    /// `None` when the service sent no usable code; such a message cannot be
    /// replied to.
    #[serde(default, deserialize_with = "lenient_sender_code")]
    pub sender_code: Option<PublicCode>,
    #[serde(default, with = "timestamp::option")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "timestamp::option")]
    pub read_at: Option<DateTime<Utc>>,
}

/// Body of `POST /messages`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SendMessageRequest {
    pub to_code: PublicCode,
    pub content: String,
}

/// Timestamps arrive either as RFC 3339 or as naive ISO-8601 without an
/// offset. Naive values are taken as UTC.
pub mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
            .ok()
            .map(|naive| naive.and_utc())
    }

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}")))
    }

    pub mod option {
        use chrono::{DateTime, Utc};
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            value: &Option<DateTime<Utc>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(dt) => serializer.serialize_some(&dt.to_rfc3339()),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            match Option::<String>::deserialize(deserializer)? {
                None => Ok(None),
                Some(raw) => super::parse(&raw)
                    .map(Some)
                    .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}"))),
            }
        }
    }
}
