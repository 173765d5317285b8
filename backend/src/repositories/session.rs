//! Repository functions for session rows.
//!
//! Ownership is enforced in the query filter (`id` + `user_id`), never as a
//! post-hoc check, so lookups cannot leak session existence across users.

use chrono::{DateTime, Utc};
use sqlx::{PgExecutor, PgPool, Postgres, QueryBuilder};

use crate::models::session::Session;
use crate::models::SessionSort;
use crate::types::{SessionId, UserId};

pub async fn insert_session<'e>(
    exec: impl PgExecutor<'e>,
    session: &Session,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO sessions \
            (id, user_id, refresh_ciphertext, client, ip, created_at, last_used_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(session.id)
    .bind(session.user_id)
    .bind(&session.refresh_ciphertext)
    .bind(&session.client)
    .bind(&session.ip)
    .bind(session.created_at)
    .bind(session.last_used_at)
    .execute(exec)
    .await
    .map(|_| ())
}

pub async fn find_session(
    pool: &PgPool,
    session_id: SessionId,
    user_id: UserId,
) -> Result<Option<Session>, sqlx::Error> {
    sqlx::query_as::<_, Session>(
        "SELECT id, user_id, refresh_ciphertext, client, ip, created_at, last_used_at \
         FROM sessions WHERE id = $1 AND user_id = $2",
    )
    .bind(session_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

/// Lists a user's sessions with a caller-chosen order. The caller passes the
/// peek limit (page size + 1) and trims the extra row itself.
pub async fn list_sessions_for_user(
    pool: &PgPool,
    user_id: UserId,
    sort: &SessionSort,
    limit: i64,
    offset: i64,
) -> Result<Vec<Session>, sqlx::Error> {
    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
        "SELECT id, user_id, refresh_ciphertext, client, ip, created_at, last_used_at \
         FROM sessions WHERE user_id = ",
    );
    builder.push_bind(user_id);
    builder
        .push(" ORDER BY ")
        .push(sort.field.column())
        .push(" ")
        .push(sort.direction.as_sql())
        .push(", id ")
        .push(sort.direction.as_sql());
    builder
        .push(" LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);

    builder.build_query_as::<Session>().fetch_all(pool).await
}

/// Single-row conditional rotation. The update only lands when the stored
/// ciphertext still equals `current_ciphertext`; a concurrent refresh that
/// got there first leaves this call with zero affected rows.
pub async fn rotate_session_ciphertext<'e>(
    exec: impl PgExecutor<'e>,
    session_id: SessionId,
    current_ciphertext: &str,
    next_ciphertext: &str,
    last_used_at: DateTime<Utc>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE sessions \
         SET refresh_ciphertext = $1, last_used_at = $2 \
         WHERE id = $3 AND refresh_ciphertext = $4",
    )
    .bind(next_ciphertext)
    .bind(last_used_at)
    .bind(session_id)
    .bind(current_ciphertext)
    .execute(exec)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn delete_session<'e>(
    exec: impl PgExecutor<'e>,
    session_id: SessionId,
    user_id: UserId,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM sessions WHERE id = $1 AND user_id = $2")
        .bind(session_id)
        .bind(user_id)
        .execute(exec)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn delete_sessions_for_user<'e>(
    exec: impl PgExecutor<'e>,
    user_id: UserId,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM sessions WHERE user_id = $1")
        .bind(user_id)
        .execute(exec)
        .await?;
    Ok(result.rows_affected())
}

/// Removes sessions whose last rotation is older than the refresh TTL;
/// their refresh tokens can no longer verify, so the rows are dead weight.
pub async fn delete_sessions_idle_before(
    pool: &PgPool,
    cutoff: DateTime<Utc>,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM sessions WHERE last_used_at < $1")
        .bind(cutoff)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
