use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use foam_estimator::store::PgTokenStore;
use foam_estimator::{api, AppState, Config, SharedState};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "foam_estimator=info,tower_http=info".into()),
        )
        .init();

    let config = Config::from_env()?;
    info!("foam-estimator v{}", env!("CARGO_PKG_VERSION"));
    info!("Listening on {}:{}", config.host, config.port);

    let store = PgTokenStore::new(&config.database_url).await?;
    store.migrate().await?;
    info!("Database connected and migrated");

    let addr = format!("{}:{}", config.host, config.port);
    let state: SharedState = Arc::new(AppState::new(config, Arc::new(store)));
    let app = api::router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server ready");
    axum::serve(listener, app).await?;

    Ok(())
}
