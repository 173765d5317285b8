//! Optional Redis pool backing the session cache.

use crate::config::Config;
use bb8::Pool;
use bb8_redis::RedisConnectionManager;
use std::time::Duration;

pub type RedisPool = Pool<RedisConnectionManager>;

/// Builds the cache pool, or `None` when no `REDIS_URL` is configured.
/// The engine runs without it; the relational store stays the source of
/// truth either way.
pub async fn create_redis_pool(config: &Config) -> anyhow::Result<Option<RedisPool>> {
    let Some(url) = &config.redis_url else {
        tracing::info!("REDIS_URL not set, running without a session cache");
        return Ok(None);
    };

    let manager = RedisConnectionManager::new(url.clone())?;
    let pool = Pool::builder()
        .max_size(config.redis_pool_size)
        .connection_timeout(Duration::from_secs(config.redis_connect_timeout))
        .build(manager)
        .await?;

    tracing::info!(size = config.redis_pool_size, "session cache pool ready");
    Ok(Some(pool))
}
