//! Session store: persistence and cache consistency for sessions, plus
//! rotation-on-use of their refresh tokens.
//!
//! The relational store is the system of record. Cache writes happen only
//! after the store write succeeds, and cache failures are logged, never
//! surfaced. Rotation always reads the store directly.

use std::sync::Arc;

use chrono::Utc;

use crate::db::connection::DbPool;
use crate::error::{AppError, ConflictKind, ResourceKind};
use crate::models::session::{Session, SessionInfo, TokensPair};
use crate::models::user::User;
use crate::models::{PageInfo, PaginationQuery, SessionSort};
use crate::repositories::session as session_repo;
use crate::services::credentials::CredentialService;
use crate::services::session_cache::SessionCache;
use crate::types::{SessionId, UserId};

pub struct SessionStore {
    pool: DbPool,
    cache: Option<Arc<dyn SessionCache>>,
    credentials: Arc<CredentialService>,
}

impl SessionStore {
    pub fn new(
        pool: DbPool,
        cache: Option<Arc<dyn SessionCache>>,
        credentials: Arc<CredentialService>,
    ) -> Self {
        Self {
            pool,
            cache,
            credentials,
        }
    }

    pub fn credentials(&self) -> &CredentialService {
        &self.credentials
    }

    /// Creates a session atomically with its first token pair.
    pub async fn create(
        &self,
        user: &User,
        client: &str,
        ip: &str,
    ) -> Result<(Session, TokensPair), AppError> {
        let session_id = SessionId::new();
        let pair = self.mint_pair(user, session_id)?;
        let refresh_ciphertext = self.credentials.encrypt_refresh(&pair.refresh_token)?;

        let now = Utc::now();
        let session = Session {
            id: session_id,
            user_id: user.id,
            refresh_ciphertext,
            client: client.to_string(),
            ip: ip.to_string(),
            created_at: now,
            last_used_at: now,
        };

        session_repo::insert_session(self.pool.as_ref(), &session).await?;
        self.cache_put(&session).await;

        Ok((session, pair))
    }

    /// Resolves a session owned by `user_id`. Absent rows and rows owned by
    /// a different user are indistinguishable to the caller.
    pub async fn get(&self, session_id: SessionId, user_id: UserId) -> Result<Session, AppError> {
        if let Some(cache) = &self.cache {
            match cache.get_session(session_id).await {
                Ok(Some(session)) if session.user_id == user_id => return Ok(session),
                // miss, or an entry owned by someone else: consult the store
                Ok(_) => {}
                Err(err) => {
                    tracing::warn!(error = ?err, %session_id, "session cache read failed");
                }
            }
        }

        let session = session_repo::find_session(self.pool.as_ref(), session_id, user_id)
            .await?
            .ok_or_else(|| AppError::not_found(ResourceKind::Session, session_id.to_string()))?;
        self.cache_put(&session).await;
        Ok(session)
    }

    pub async fn list_for_user(
        &self,
        user_id: UserId,
        page: &PaginationQuery,
        sort: &SessionSort,
    ) -> Result<(Vec<SessionInfo>, PageInfo), AppError> {
        let limit = page.limit();
        let offset = page.offset();

        // One extra row decides has_more without a COUNT query.
        let mut rows =
            session_repo::list_sessions_for_user(self.pool.as_ref(), user_id, sort, limit + 1, offset)
                .await?;
        let has_more = rows.len() as i64 > limit;
        if has_more {
            rows.truncate(limit as usize);
        }

        let sessions = rows.into_iter().map(SessionInfo::from).collect();
        Ok((
            sessions,
            PageInfo {
                limit,
                offset,
                has_more,
            },
        ))
    }

    /// Rotation-on-use: verifies the presented refresh token against the
    /// stored ciphertext and replaces it with a freshly minted pair.
    ///
    /// A mismatch means the token was already spent. That is detected reuse,
    /// so the whole session lineage is terminated before the conflict is
    /// reported.
    pub async fn refresh(
        &self,
        user: &User,
        session_id: SessionId,
        presented: &str,
    ) -> Result<(Session, TokensPair), AppError> {
        let session = session_repo::find_session(self.pool.as_ref(), session_id, user.id)
            .await?
            .ok_or_else(|| AppError::not_found(ResourceKind::Session, session_id.to_string()))?;

        let stored = self.credentials.decrypt_refresh(&session.refresh_ciphertext)?;
        if stored.as_bytes() != presented.as_bytes() {
            return self.terminate_on_reuse(session_id, user.id).await;
        }

        let pair = self.mint_pair(user, session_id)?;
        let next_ciphertext = self.credentials.encrypt_refresh(&pair.refresh_token)?;
        let last_used_at = Utc::now();

        let rotated = session_repo::rotate_session_ciphertext(
            self.pool.as_ref(),
            session_id,
            &session.refresh_ciphertext,
            &next_ciphertext,
            last_used_at,
        )
        .await?;
        if !rotated {
            // A concurrent refresh spent the token between our read and
            // update; same reuse signal as a direct mismatch.
            return self.terminate_on_reuse(session_id, user.id).await;
        }

        let session = Session {
            refresh_ciphertext: next_ciphertext,
            last_used_at,
            ..session
        };
        self.cache_put(&session).await;

        Ok((session, pair))
    }

    pub async fn delete(&self, session_id: SessionId, user_id: UserId) -> Result<(), AppError> {
        let deleted = session_repo::delete_session(self.pool.as_ref(), session_id, user_id).await?;
        if !deleted {
            return Err(AppError::not_found(
                ResourceKind::Session,
                session_id.to_string(),
            ));
        }
        self.cache_remove(session_id, user_id).await;
        Ok(())
    }

    /// Forced global logout for one user. Returns the number of sessions
    /// removed.
    pub async fn delete_all_for_user(&self, user_id: UserId) -> Result<u64, AppError> {
        let removed = session_repo::delete_sessions_for_user(self.pool.as_ref(), user_id).await?;
        self.evict_user(user_id).await;
        Ok(removed)
    }

    /// Drops every cached entry for a user. Used after session rows were
    /// removed inside a caller-owned transaction.
    pub async fn evict_user(&self, user_id: UserId) {
        if let Some(cache) = &self.cache {
            if let Err(err) = cache.remove_user_sessions(user_id).await {
                tracing::warn!(error = ?err, %user_id, "session cache user eviction failed");
            }
        }
    }

    fn mint_pair(&self, user: &User, session_id: SessionId) -> Result<TokensPair, AppError> {
        let access_token = self
            .credentials
            .generate_access(user.id, session_id, user.role)?;
        let refresh_token = self.credentials.generate_refresh(
            user.id,
            session_id,
            user.role,
            user.email_verified,
        )?;
        Ok(TokensPair {
            session_id,
            access_token,
            refresh_token,
        })
    }

    async fn terminate_on_reuse(
        &self,
        session_id: SessionId,
        user_id: UserId,
    ) -> Result<(Session, TokensPair), AppError> {
        session_repo::delete_session(self.pool.as_ref(), session_id, user_id).await?;
        self.cache_remove(session_id, user_id).await;
        tracing::warn!(%session_id, %user_id, "refresh token reuse detected, session terminated");
        Err(AppError::Conflict(ConflictKind::SessionTokenMismatch))
    }

    async fn cache_put(&self, session: &Session) {
        if let Some(cache) = &self.cache {
            if let Err(err) = cache.put_session(session).await {
                tracing::warn!(error = ?err, session_id = %session.id, "session cache write failed");
            }
        }
    }

    async fn cache_remove(&self, session_id: SessionId, user_id: UserId) {
        if let Some(cache) = &self.cache {
            if let Err(err) = cache.remove_session(session_id, user_id).await {
                tracing::warn!(error = ?err, %session_id, "session cache eviction failed");
            }
        }
    }
}
