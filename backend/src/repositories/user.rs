//! Repository functions for user rows.

use sqlx::{PgExecutor, PgPool};

use crate::models::user::{User, UserRole, UserStatus};
use crate::types::UserId;

/// Returns `true` for a Postgres unique-constraint violation, used to map
/// duplicate emails onto the AlreadyExists error.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some("23505"))
}

pub async fn insert_user<'e>(exec: impl PgExecutor<'e>, user: &User) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO users (id, email, role, status, email_verified, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(user.id)
    .bind(&user.email)
    .bind(user.role.as_str())
    .bind(user.status.as_str())
    .bind(user.email_verified)
    .bind(user.created_at)
    .bind(user.updated_at)
    .execute(exec)
    .await
    .map(|_| ())
}

pub async fn find_user_by_id(pool: &PgPool, user_id: UserId) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "SELECT id, email, role, status, email_verified, created_at, updated_at \
         FROM users WHERE id = $1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

/// Email lookups expect the caller to have normalized the address.
pub async fn find_user_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "SELECT id, email, role, status, email_verified, created_at, updated_at \
         FROM users WHERE email = $1",
    )
    .bind(email)
    .fetch_optional(pool)
    .await
}

pub async fn update_role<'e>(
    exec: impl PgExecutor<'e>,
    user_id: UserId,
    role: UserRole,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "UPDATE users SET role = $1, updated_at = NOW() WHERE id = $2 \
         RETURNING id, email, role, status, email_verified, created_at, updated_at",
    )
    .bind(role.as_str())
    .bind(user_id)
    .fetch_optional(exec)
    .await
}

pub async fn update_status<'e>(
    exec: impl PgExecutor<'e>,
    user_id: UserId,
    status: UserStatus,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "UPDATE users SET status = $1, updated_at = NOW() WHERE id = $2 \
         RETURNING id, email, role, status, email_verified, created_at, updated_at",
    )
    .bind(status.as_str())
    .bind(user_id)
    .fetch_optional(exec)
    .await
}

pub async fn update_email_verified<'e>(
    exec: impl PgExecutor<'e>,
    user_id: UserId,
    verified: bool,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "UPDATE users SET email_verified = $1, updated_at = NOW() WHERE id = $2 \
         RETURNING id, email, role, status, email_verified, created_at, updated_at",
    )
    .bind(verified)
    .bind(user_id)
    .fetch_optional(exec)
    .await
}

/// Deletes the user row. Credentials and sessions go with it via
/// ON DELETE CASCADE.
pub async fn delete_user<'e>(
    exec: impl PgExecutor<'e>,
    user_id: UserId,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(user_id)
        .execute(exec)
        .await?;
    Ok(result.rows_affected() > 0)
}
