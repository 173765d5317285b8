//! Repository functions for the password-credential table, kept separate
//! from the user row so identity and secret material stay independent.

use sqlx::{PgExecutor, PgPool};

use crate::types::UserId;

pub async fn upsert_password_hash<'e>(
    exec: impl PgExecutor<'e>,
    user_id: UserId,
    password_hash: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO user_credentials (user_id, password_hash, updated_at) \
         VALUES ($1, $2, NOW()) \
         ON CONFLICT (user_id) \
         DO UPDATE SET password_hash = EXCLUDED.password_hash, updated_at = NOW()",
    )
    .bind(user_id)
    .bind(password_hash)
    .execute(exec)
    .await
    .map(|_| ())
}

pub async fn fetch_password_hash(
    pool: &PgPool,
    user_id: UserId,
) -> Result<Option<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>(
        "SELECT password_hash FROM user_credentials WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
}
