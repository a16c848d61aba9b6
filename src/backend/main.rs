/**
 * Deck Engine Server Entry Point
 *
 * Loads `.env`, reads the configuration named by `DECK_ENGINE_CONFIG`
 * (defaults when unset), installs tracing, and runs the engine until Ctrl-C.
 */

#[cfg(feature = "ssr")]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use deck_engine::backend::server::Engine;
    use deck_engine::backend::store::{MemoryStore, PgStore, Store};
    use deck_engine::shared::EngineConfig;
    use std::sync::Arc;

    // Load environment variables from .env file if present
    dotenv::dotenv().ok();

    let config = match std::env::var("DECK_ENGINE_CONFIG") {
        Ok(path) => EngineConfig::load(&path)?,
        Err(_) => EngineConfig::default(),
    };

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    tracing::info!(environment = %config.environment, "[STARTUP] Server initialization started");

    let store: Arc<dyn Store> = match config.store.resolve_database_url() {
        Some(url) => Arc::new(PgStore::connect(&url).await?),
        None => {
            tracing::warn!("[STARTUP] DATABASE_URL not set, using in-memory store");
            Arc::new(MemoryStore::new())
        }
    };

    let mut engine = Engine::builder(config).store(store).build().await?;
    let addr = engine.open().await?;
    tracing::info!("[STARTUP] Listening on {}", addr);

    tokio::signal::ctrl_c().await?;
    engine.close().await;
    Ok(())
}

#[cfg(not(feature = "ssr"))]
fn main() {
    eprintln!("Server requires the 'ssr' feature to be enabled.");
    eprintln!("Run with: cargo run --bin deck-engine-server --features ssr");
    std::process::exit(1);
}
