//! Presentation helpers for the inbox: pseudonymous aliases and relative
//! times.

use chrono::{DateTime, Utc};
use oneview_shared::MessageId;
use sha2::{Digest, Sha256};

const ADJECTIVES: &[&str] = &[
    "Amber", "Brave", "Calm", "Clever", "Crimson", "Curious", "Gentle", "Golden", "Hidden",
    "Lively", "Lucky", "Misty", "Nimble", "Quiet", "Rapid", "Silver", "Steady", "Sunny", "Swift",
    "Velvet",
];

const ANIMALS: &[&str] = &[
    "Badger", "Crane", "Dolphin", "Falcon", "Fox", "Gecko", "Heron", "Ibis", "Koala", "Lynx",
    "Marten", "Otter", "Owl", "Panda", "Raven", "Seal", "Sparrow", "Tiger", "Walrus", "Wolf",
];

/// Display name for a message's sender. Senders are anonymous, so the name
/// only has to be stable for a given message.
pub fn alias_for(id: &MessageId) -> String {
    let digest = Sha256::digest(id.as_str().as_bytes());
    let adjective = ADJECTIVES[usize::from(digest[0]) % ADJECTIVES.len()];
    let animal = ANIMALS[usize::from(digest[1]) % ANIMALS.len()];
    format!("{adjective} {animal}")
}

/// "3 minutes ago", "about 2 hours ago", ...
pub fn relative_time(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - then).num_seconds().max(0);
    let minutes = (secs as f64 / 60.0).round() as i64;
    let hours = (secs as f64 / 3600.0).round() as i64;
    let days = (secs as f64 / 86_400.0).round() as i64;

    match secs {
        0..=44 => "less than a minute ago".to_string(),
        45..=89 => "1 minute ago".to_string(),
        s if s < 45 * 60 => format!("{minutes} minutes ago"),
        s if s < 90 * 60 => "about 1 hour ago".to_string(),
        s if s < 24 * 3600 => format!("about {hours} hours ago"),
        s if s < 42 * 3600 => "1 day ago".to_string(),
        s if s < 30 * 86_400 => format!("{days} days ago"),
        s if s < 45 * 86_400 => "about 1 month ago".to_string(),
        s if s < 365 * 86_400 => format!("{} months ago", (days as f64 / 30.0).round() as i64),
        _ => {
            let years = days / 365;
            if years == 1 {
                "about 1 year ago".to_string()
            } else {
                format!("about {years} years ago")
            }
        }
    }
}
