use crate::core::models::Credential;
use chrono::{DateTime, Duration, Utc};

pub const VALIDITY_WINDOW_HOURS: i64 = 4;

pub fn validity_window() -> Duration {
    Duration::hours(VALIDITY_WINDOW_HOURS)
}

/// An access token is stale once the full validity window has elapsed,
/// the boundary itself included.
pub fn is_expired(issued_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now - issued_at >= validity_window()
}

pub fn needs_refresh(credential: Option<&Credential>, now: DateTime<Utc>) -> bool {
    match credential {
        Some(credential) => is_expired(credential.issued_at, now),
        None => true,
    }
}

pub fn expires_at(credential: &Credential) -> DateTime<Utc> {
    credential.issued_at + validity_window()
}
