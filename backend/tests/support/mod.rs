#![allow(dead_code)]

use std::env;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use sqlx::{postgres::PgPoolOptions, PgPool};
use uuid::Uuid;

use gatekeeper_backend::{
    config::Config,
    models::user::{User, UserRole},
    repositories::{credential as credential_repo, user as user_repo},
    state::AppState,
    utils::password::hash_password,
};

/// Connects to the database named by `TEST_DATABASE_URL`/`DATABASE_URL` and
/// runs migrations. Returns `None` (and prints a notice) when no database is
/// reachable, so database-backed tests skip instead of failing on machines
/// without Postgres.
pub async fn try_pool() -> Option<PgPool> {
    let Ok(url) = env::var("TEST_DATABASE_URL").or_else(|_| env::var("DATABASE_URL")) else {
        eprintln!("skipping database-backed test: TEST_DATABASE_URL/DATABASE_URL not set");
        return None;
    };

    let pool = match PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(StdDuration::from_secs(10))
        .connect(&url)
        .await
    {
        Ok(pool) => pool,
        Err(err) => {
            eprintln!("skipping database-backed test: {err}");
            return None;
        }
    };

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("run migrations");

    Some(pool)
}

pub fn test_config() -> Config {
    Config {
        database_url: "postgres://unused-in-tests".into(),
        redis_url: None,
        redis_pool_size: 10,
        redis_connect_timeout: 5,
        jwt_secret: "a_signing_secret_that_is_long_enough_123".into(),
        token_encryption_key: "an_encryption_secret_that_is_long_enough_456".into(),
        access_token_ttl_minutes: 15,
        refresh_token_ttl_days: 30,
        session_cache_ttl_seconds: 3600,
        password_min_length: 8,
    }
}

/// Wires the engine around an existing pool, without a cache.
pub fn test_state(pool: &PgPool) -> AppState {
    AppState::from_parts(test_config(), Arc::new(pool.clone()), None)
}

/// Unique email per call so tests never collide across runs or binaries.
pub fn unique_email(prefix: &str) -> String {
    format!("{}-{}@example.com", prefix, Uuid::new_v4())
}

pub async fn seed_user(pool: &PgPool, role: UserRole) -> User {
    let user = User::new(unique_email(role.as_str()), role);
    user_repo::insert_user(pool, &user).await.expect("insert user");
    user
}

pub async fn seed_user_with_password(pool: &PgPool, role: UserRole, password: &str) -> User {
    let user = seed_user(pool, role).await;
    let password_hash = hash_password(password).expect("hash password");
    credential_repo::upsert_password_hash(pool, user.id, &password_hash)
        .await
        .expect("insert credential");
    user
}
