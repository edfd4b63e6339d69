//! Homebase Sync Server
//!
//! Serves the incremental pull/push sync protocol over HTTP, backed by a
//! SQLite database.
//!
//! # Configuration
//!
//! Environment variables:
//! - `HOMEBASE_PORT`: Port to listen on (default: 8080)
//! - `HOMEBASE_DATABASE_PATH`: SQLite database file (default: ~/.local/share/homebase/homebase.db)
//! - `HOMEBASE_CONFIG`: Path to config file (default: ~/.config/homebase/config.yaml)
//!
//! # Config File Format
//!
//! ```yaml
//! port: 8080
//! api_keys:
//!   - key: "your-secret-key-here"
//!     user_id: "user1"
//!     tenant_id: "7c9e6679-7425-40de-944b-e07fc1f90ae7"
//!   - key: "operator-key"
//!     user_id: "ops"   # no tenant: system scope
//! ```
//!
//! # Endpoints
//!
//! - `GET /health`: Health check endpoint (no auth required)
//! - `POST /sync/pull`: Changes after a cursor (auth required)
//! - `POST /sync/push`: Apply client changes (auth required)

use homebase::db::init_db;
use homebase::server::{router, ApiKeyStore, AppState};
use homebase::{Config, SyncEngine};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "homebase=info,homebase_server=info,tower_http=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = match Config::load(None) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("Database: {}", config.database_path.display());
    let pool = match init_db(&config.database_path).await {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!("Failed to open database: {}", e);
            std::process::exit(1);
        }
    };

    // Load API keys
    let api_keys = ApiKeyStore::from_entries(&config.api_keys);
    if api_keys.is_empty() {
        tracing::warn!("No API keys loaded - all authenticated requests will fail");
    } else {
        tracing::info!("Loaded {} API key(s)", api_keys.len());
    }

    let shutdown = CancellationToken::new();
    let state = AppState {
        engine: SyncEngine::standard(pool),
        api_keys: Arc::new(api_keys),
        shutdown: shutdown.clone(),
    };
    let app = router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Starting server on {}", addr);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    let serve = axum::serve(listener, app).with_graceful_shutdown(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for shutdown signal: {}", e);
        }
        tracing::info!("Shutting down");
        shutdown.cancel();
    });
    if let Err(e) = serve.await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
