//! Read-through/write-through session cache in front of the relational store.
//!
//! The cache is best-effort: callers log failures and fall back to the
//! store, which stays the source of truth. Entries carry a bounded TTL so a
//! missed invalidation cannot serve a stale session forever.

use crate::db::redis::RedisPool;
use crate::models::session::Session;
use crate::types::{SessionId, UserId};
use async_trait::async_trait;
use bb8_redis::redis::{self, AsyncCommands};

#[async_trait]
pub trait SessionCache: Send + Sync {
    async fn get_session(&self, session_id: SessionId) -> anyhow::Result<Option<Session>>;
    async fn put_session(&self, session: &Session) -> anyhow::Result<()>;
    async fn remove_session(&self, session_id: SessionId, user_id: UserId) -> anyhow::Result<()>;
    async fn remove_user_sessions(&self, user_id: UserId) -> anyhow::Result<()>;
}

pub struct RedisSessionCache {
    pool: RedisPool,
    ttl_seconds: u64,
}

impl RedisSessionCache {
    pub fn new(pool: RedisPool, ttl_seconds: u64) -> Self {
        Self { pool, ttl_seconds }
    }

    fn session_key(session_id: SessionId) -> String {
        format!("session:{}", session_id)
    }

    fn user_sessions_key(user_id: UserId) -> String {
        format!("user_sessions:{}", user_id)
    }
}

#[async_trait]
impl SessionCache for RedisSessionCache {
    async fn get_session(&self, session_id: SessionId) -> anyhow::Result<Option<Session>> {
        let span = tracing::debug_span!("redis_get_session", %session_id);
        let _enter = span.enter();

        let mut conn = self.pool.get().await?;
        let payload: Option<String> = conn.get(Self::session_key(session_id)).await?;
        match payload {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn put_session(&self, session: &Session) -> anyhow::Result<()> {
        let span = tracing::debug_span!("redis_put_session", session_id = %session.id);
        let _enter = span.enter();

        let mut conn = self.pool.get().await?;
        let key = Self::session_key(session.id);
        let user_key = Self::user_sessions_key(session.user_id);
        let payload = serde_json::to_string(session)?;

        redis::pipe()
            .atomic()
            .set_ex(&key, payload, self.ttl_seconds)
            .sadd(&user_key, session.id.to_string())
            .expire(&user_key, self.ttl_seconds as i64)
            .query_async::<_, ()>(&mut *conn)
            .await?;

        Ok(())
    }

    async fn remove_session(&self, session_id: SessionId, user_id: UserId) -> anyhow::Result<()> {
        let span = tracing::debug_span!("redis_remove_session", %session_id, %user_id);
        let _enter = span.enter();

        let mut conn = self.pool.get().await?;
        redis::pipe()
            .atomic()
            .del(Self::session_key(session_id))
            .srem(Self::user_sessions_key(user_id), session_id.to_string())
            .query_async::<_, ()>(&mut *conn)
            .await?;

        Ok(())
    }

    async fn remove_user_sessions(&self, user_id: UserId) -> anyhow::Result<()> {
        let span = tracing::debug_span!("redis_remove_user_sessions", %user_id);
        let _enter = span.enter();

        let mut conn = self.pool.get().await?;
        let user_key = Self::user_sessions_key(user_id);

        let ids: Vec<String> = conn.smembers(&user_key).await?;
        if ids.is_empty() {
            conn.del::<_, ()>(&user_key).await?;
            return Ok(());
        }

        let mut pipe = redis::pipe();
        pipe.atomic();
        for id in ids {
            pipe.del(format!("session:{}", id));
        }
        pipe.del(&user_key);

        pipe.query_async::<_, ()>(&mut *conn).await?;
        Ok(())
    }
}
