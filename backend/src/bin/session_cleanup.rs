use chrono::{Duration, Utc};
use gatekeeper_backend::{
    config::Config, db::connection::create_pool, repositories::session as session_repo,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gatekeeper_backend=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load()?;
    let pool = create_pool(&config.database_url).await?;

    // Sessions idle past the refresh TTL cannot rotate again; their rows
    // are dead weight.
    let cutoff = Utc::now() - Duration::days(config.refresh_token_ttl_days);
    let deleted = session_repo::delete_sessions_idle_before(&pool, cutoff).await?;
    if deleted > 0 {
        tracing::info!("Deleted {} sessions idle past the refresh TTL", deleted);
    }

    sqlx::query("VACUUM (ANALYZE) sessions")
        .execute(pool.as_ref())
        .await?;

    Ok(())
}
