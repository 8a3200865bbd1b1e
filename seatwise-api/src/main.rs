use anyhow::Context;
use seatwise_api::{app, AppState};
use seatwise_store::{app_config::Config, DbClient, PostgresStore, RedisClient};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "seatwise_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting Seatwise API on port {}", config.server.port);

    let db = DbClient::new(&config.database)
        .await
        .context("Failed to connect to Postgres")?;
    db.migrate().await.context("Failed to run migrations")?;

    let store = Arc::new(PostgresStore::new(db.pool.clone(), config.inventory.lock_timeout()));
    let clock = Arc::new(config.clock.system_clock()?);
    tracing::info!(
        "Inventory rows: {:?}, lock timeout {}ms",
        config.inventory.materialization,
        config.inventory.lock_timeout_ms
    );

    let mut state = AppState::new(store.clone(), store, clock, config.inventory.materialization);
    if let Some(redis) = &config.redis {
        let client = RedisClient::new(&redis.url).context("Invalid Redis URL")?;
        state = state.with_rate_limiter(client, redis.requests_per_minute);
        tracing::info!("Rate limiting at {} requests per minute", redis.requests_per_minute);
    }

    let app = app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;
    Ok(())
}
