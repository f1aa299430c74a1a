//! School records server: reads config from the environment, wires storage into the services,
//! and serves the HTTP API.
//!
//! Run from repo root: `cargo run -p school-server`
//! Without a database: `STORE_BACKEND=memory SEED_DEMO_DATA=true cargo run -p school-server`

use school_records::{
    app_routes, apply_migrations, seed_demo_data, AppConfig, AppState, MemoryStore, PgStore, Store, StoreBackend,
};
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("school_records=info,school_server=info")),
        )
        .init();

    let config = AppConfig::from_env()?;
    let store: Arc<dyn Store> = match config.backend {
        StoreBackend::Postgres => {
            let store = PgStore::connect(&config).await?;
            apply_migrations(store.pool()).await?;
            Arc::new(store)
        }
        StoreBackend::Memory => {
            tracing::warn!("using in-memory storage; data is lost on exit");
            Arc::new(MemoryStore::new())
        }
    };
    if config.seed_demo_data {
        seed_demo_data(store.as_ref()).await?;
    }

    let state = AppState::new(store, config.paging);
    let app = app_routes(state, config.max_body_bytes);

    let listener = TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
