use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub redis_url: Option<String>,
    pub redis_pool_size: u32,
    pub redis_connect_timeout: u64,
    pub jwt_secret: String,
    pub token_encryption_key: String,
    pub access_token_ttl_minutes: i64,
    pub refresh_token_ttl_days: i64,
    pub session_cache_ttl_seconds: u64,
    pub password_min_length: usize,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgres://localhost/gatekeeper".to_string());

        let redis_url = env::var("REDIS_URL").ok().filter(|url| !url.is_empty());

        let redis_pool_size = env::var("REDIS_POOL_SIZE")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .unwrap_or(10);

        let redis_connect_timeout = env::var("REDIS_CONNECT_TIMEOUT")
            .unwrap_or_else(|_| "5".to_string())
            .parse()
            .unwrap_or(5);

        let jwt_secret = env::var("JWT_SECRET")
            .unwrap_or_else(|_| "your-secret-key-change-this-in-production".to_string());

        let token_encryption_key = env::var("TOKEN_ENCRYPTION_KEY")
            .unwrap_or_else(|_| "your-encryption-key-change-this-in-production".to_string());

        let access_token_ttl_minutes = env::var("ACCESS_TOKEN_TTL_MINUTES")
            .unwrap_or_else(|_| "15".to_string())
            .parse()
            .unwrap_or(15);

        let refresh_token_ttl_days = env::var("REFRESH_TOKEN_TTL_DAYS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .unwrap_or(30);

        let session_cache_ttl_seconds = env::var("SESSION_CACHE_TTL_SECONDS")
            .unwrap_or_else(|_| "3600".to_string())
            .parse()
            .unwrap_or(3600);

        let password_min_length = env::var("PASSWORD_MIN_LENGTH")
            .unwrap_or_else(|_| "8".to_string())
            .parse()
            .unwrap_or(8);

        let config = Config {
            database_url,
            redis_url,
            redis_pool_size,
            redis_connect_timeout,
            jwt_secret,
            token_encryption_key,
            access_token_ttl_minutes,
            refresh_token_ttl_days,
            session_cache_ttl_seconds,
            password_min_length,
        };
        config.validate()?;
        Ok(config)
    }

    /// Cross-field checks that must hold before the engine starts.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.jwt_secret == self.token_encryption_key {
            return Err(anyhow!(
                "JWT_SECRET and TOKEN_ENCRYPTION_KEY must be distinct keys"
            ));
        }
        if self.access_token_ttl_minutes <= 0 || self.refresh_token_ttl_days <= 0 {
            return Err(anyhow!("token TTLs must be positive"));
        }
        // A cache entry must never outlive the refresh token it shadows.
        let refresh_ttl_seconds = self.refresh_token_ttl_days as u64 * 24 * 60 * 60;
        if self.session_cache_ttl_seconds >= refresh_ttl_seconds {
            return Err(anyhow!(
                "SESSION_CACHE_TTL_SECONDS ({}) must be shorter than the refresh token TTL ({})",
                self.session_cache_ttl_seconds,
                refresh_ttl_seconds
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        Config {
            database_url: "postgres://test".into(),
            redis_url: None,
            redis_pool_size: 10,
            redis_connect_timeout: 5,
            jwt_secret: "signing-secret-for-tests-0123456789".into(),
            token_encryption_key: "encryption-secret-for-tests-0123456789".into(),
            access_token_ttl_minutes: 15,
            refresh_token_ttl_days: 30,
            session_cache_ttl_seconds: 3600,
            password_min_length: 8,
        }
    }

    #[test]
    fn validate_accepts_sane_config() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn validate_rejects_shared_secret() {
        let mut config = base_config();
        config.token_encryption_key = config.jwt_secret.clone();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_cache_ttl_at_or_above_refresh_ttl() {
        let mut config = base_config();
        config.refresh_token_ttl_days = 1;
        config.session_cache_ttl_seconds = 24 * 60 * 60;
        assert!(config.validate().is_err());
    }
}
