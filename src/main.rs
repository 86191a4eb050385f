use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use order_claim::api;
use order_claim::config::{Config, LogFormat, StoreBackend};
use order_claim::error::AppError;
use order_claim::state::AppState;
use order_claim::store::memory::MemoryOrderStore;
use order_claim::store::postgres::PgOrderStore;
use order_claim::store::OrderStore;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = Config::from_env()?;

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_level.clone()))
        .with_target(false);
    match config.log_format {
        LogFormat::Compact => subscriber.compact().init(),
        LogFormat::Json => subscriber.json().init(),
    }

    let store = open_store(&config).await?;
    tracing::info!(store = store.backend(), "order store ready");

    let shared_state = Arc::new(AppState::new(
        store,
        config.event_buffer_size,
        Duration::from_millis(config.store_timeout_ms),
    ));

    let app = api::rest::router(shared_state);

    let bind_addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|err| AppError::Internal(format!("failed to bind {bind_addr}: {err}")))?;

    tracing::info!(http_port = config.http_port, "http server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::Internal(format!("server error: {err}")))?;

    Ok(())
}

async fn open_store(config: &Config) -> Result<Arc<dyn OrderStore>, AppError> {
    match config.store_backend {
        StoreBackend::Memory => Ok(Arc::new(MemoryOrderStore::new())),
        StoreBackend::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .ok_or_else(|| AppError::Internal("DATABASE_URL is not set".to_string()))?;
            let store =
                PgOrderStore::connect(url, config.db_pool_size, &config.migrations_dir).await?;
            Ok(Arc::new(store))
        }
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}
