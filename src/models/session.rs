use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The plaintext carried, encrypted, inside the `auth-session` cookie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionPayload {
    /// The ID of the user this session belongs to.
    pub user_id: Uuid,
    /// Unix timestamp (seconds) when the session was issued.
    pub issued_at: i64,
    /// Unix timestamp (seconds) after which the session no longer resolves.
    pub expires_at: i64,
}

impl SessionPayload {
    /// Creates a payload valid for `lifetime` starting at `now`.
    ///
    /// Returns `None` when the expiry falls outside the representable range.
    pub fn new(user_id: Uuid, now: DateTime<Utc>, lifetime: Duration) -> Option<Self> {
        let expires_at = now.checked_add_signed(lifetime)?;

        Some(Self {
            user_id,
            issued_at: now.timestamp(),
            expires_at: expires_at.timestamp(),
        })
    }

    /// Whether the session has expired at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.expires_at
    }
}
