//! Models for sessions and the token pairs bound to them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::types::{SessionId, UserId};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
/// Database representation of a session.
///
/// `refresh_ciphertext` is the AEAD envelope of the most recently issued
/// refresh token; the plaintext token is never persisted. This model is also
/// the cache payload, so the ciphertext serializes with it. Expose sessions
/// to callers through [`SessionInfo`] instead.
pub struct Session {
    /// Unique identifier for the session record.
    pub id: SessionId,
    /// User owning the session.
    pub user_id: UserId,
    /// Encrypted refresh token most recently issued for this session.
    pub refresh_ciphertext: String,
    /// Client descriptor (user agent) recorded at login.
    pub client: String,
    /// Origin IP recorded at login.
    pub ip: String,
    /// Timestamp when the session was created.
    pub created_at: DateTime<Utc>,
    /// Timestamp when the session last rotated its tokens.
    pub last_used_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
/// Caller-facing view of a session, without the stored ciphertext.
pub struct SessionInfo {
    pub id: SessionId,
    pub user_id: UserId,
    pub client: String,
    pub ip: String,
    pub created_at: DateTime<Utc>,
    pub last_used_at: DateTime<Utc>,
}

impl From<Session> for SessionInfo {
    fn from(session: Session) -> Self {
        SessionInfo {
            id: session.id,
            user_id: session.user_id,
            client: session.client,
            ip: session.ip,
            created_at: session.created_at,
            last_used_at: session.last_used_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
/// Access/refresh token pair bound to a single session.
pub struct TokensPair {
    pub session_id: SessionId,
    pub access_token: String,
    pub refresh_token: String,
}
