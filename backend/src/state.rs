//! Composition root. Every component receives its dependencies explicitly;
//! there is no ambient global state.

use std::sync::Arc;

use crate::config::Config;
use crate::db::connection::{create_pool, DbPool};
use crate::db::redis::create_redis_pool;
use crate::services::auth::AuthService;
use crate::services::credentials::CredentialService;
use crate::services::session_cache::{RedisSessionCache, SessionCache};
use crate::services::session_store::SessionStore;
use crate::services::users::UserService;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub pool: DbPool,
    pub users: Arc<UserService>,
    pub sessions: Arc<SessionStore>,
    pub auth: Arc<AuthService>,
}

impl AppState {
    /// Connects the pools and wires the engine from configuration.
    /// Transport adapters hold one of these and call into `auth`/`users`.
    pub async fn initialize(config: Config) -> anyhow::Result<Self> {
        let pool = create_pool(&config.database_url).await?;
        let cache: Option<Arc<dyn SessionCache>> = match create_redis_pool(&config).await? {
            Some(redis) => Some(Arc::new(RedisSessionCache::new(
                redis,
                config.session_cache_ttl_seconds,
            ))),
            None => None,
        };
        Ok(Self::from_parts(config, pool, cache))
    }

    /// Wires the engine around pools the caller already owns (tests,
    /// embedding into a larger process).
    pub fn from_parts(
        config: Config,
        pool: DbPool,
        cache: Option<Arc<dyn SessionCache>>,
    ) -> Self {
        let credentials = Arc::new(CredentialService::new(&config));
        let users = Arc::new(UserService::new(pool.clone(), config.password_min_length));
        let sessions = Arc::new(SessionStore::new(pool.clone(), cache, credentials));
        let auth = Arc::new(AuthService::new(
            pool.clone(),
            users.clone(),
            sessions.clone(),
        ));
        Self {
            config,
            pool,
            users,
            sessions,
            auth,
        }
    }
}
