use carebridge::{
    api::{self, AppState, extractors::TokenVerifier},
    config::{self, database},
    core::profile,
    errors::Result,
    realtime::RoomFeed,
    storage::LocalObjectStore,
};
use dotenvy::dotenv;
use std::{env, sync::Arc};
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file
    dotenv().ok(); // Non-fatal, env vars can be set externally
    info!("Attempted to load .env file.");

    // 3. Load the main application configuration
    let app_config = config::load_app_config()?;

    // 4. Initialize database
    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect(|()| info!("Database tables ready."))
        .inspect_err(|e| error!("Failed to create tables: {}", e))?;

    // 5. Seed admin profiles
    let seeded = profile::seed_admins(&db, &app_config.admins).await?;
    info!(seeded, "Admin profiles seeded.");

    // 6. Secrets are read here, directly before use, not stored in AppConfig
    let jwt_secret = env::var("AUTH_JWT_SECRET")
        .inspect_err(|e| error!("AUTH_JWT_SECRET not found: {}", e))?;
    let signing_key = env::var("STORAGE_SIGNING_KEY")
        .inspect_err(|e| error!("STORAGE_SIGNING_KEY not found: {}", e))?;

    let store = LocalObjectStore::new(
        app_config.storage.root.clone(),
        app_config.storage.public_base_url.clone(),
        signing_key.into_bytes(),
    )?;
    let tokens = TokenVerifier::new(jwt_secret.as_bytes())?;

    let addr = format!("{}:{}", app_config.server.host, app_config.server.port);
    let state = AppState {
        db: Arc::new(db),
        feed: RoomFeed::new(),
        store: Arc::new(store),
        config: Arc::new(app_config),
        tokens: Arc::new(tokens),
    };

    // 7. Serve until ctrl-c
    let listener = TcpListener::bind(&addr).await?;
    info!(%addr, "CareBridge listening");
    axum::serve(listener, api::router(state))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", e);
            }
            info!("Shutting down");
        })
        .await?;

    Ok(())
}
