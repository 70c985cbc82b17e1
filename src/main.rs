//! newsdesk server
//!
//! Starts the REST API over the Sled store.
//!
//! Usage:
//!   NEWSDESK_JWT_SECRET=... NEWS_API_KEY=... cargo run --bin newsdesk
//!   cargo run --bin newsdesk-seed    # optional demo data
//!
//! See `newsdesk::config` for every recognised environment variable.

use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use newsdesk::auth::TokenManager;
use newsdesk::config::Config;
use newsdesk::news::GNewsClient;
use newsdesk::rest::{create_router, with_http_layers, AppState};
use newsdesk::storage::Storage;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let _log_guard = newsdesk::logging::init(&config.log);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        bind = %config.bind_address,
        data_dir = %config.data_dir.display(),
        "starting newsdesk"
    );
    if config.news.api_key.is_empty() {
        tracing::warn!("NEWS_API_KEY is not set; /news will answer with a gateway error");
    }

    let storage = Storage::open(&config.data_dir)?;
    let tokens = TokenManager::new(config.jwt_secret.as_bytes(), config.token_ttl);
    let provider = Arc::new(GNewsClient::new(config.news.clone())?);
    let state = AppState::new(storage.clone(), tokens, config.bcrypt_cost, provider);

    let app = with_http_layers(create_router(state), &config.cors_origins);

    let listener = TcpListener::bind(config.bind_address).await?;
    info!(addr = %listener.local_addr()?, "listening");
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
        })
        .await?;

    storage.flush().await?;
    Ok(())
}
