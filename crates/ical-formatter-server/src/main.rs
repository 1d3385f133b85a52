//! `icalfmt-server`: serve formatted calendars over HTTP.
//!
//! ```sh
//! ICALFMT__SERVER__PORT=9000 icalfmt-server
//! curl 'http://localhost:9000/calendars/timetable?url=https://timetable.example.edu/feed.ics'
//! ```

use anyhow::{Context, Result};
use ical_formatter::ProfileRegistry;
use ical_formatter_server::{router, AppState, HttpFetcher, Settings, SourceCache};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let settings = Settings::load().context("Failed to load settings")?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.logging.level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let registry = match &settings.profiles_file {
        Some(path) => ProfileRegistry::from_json_file(path)
            .with_context(|| format!("Failed to load profiles from {}", path.display()))?,
        None => ProfileRegistry::builtin(),
    };
    let profiles: Vec<&str> = registry.names().collect();
    tracing::info!(?profiles, "profiles ready");

    let fetcher = HttpFetcher::new(settings.fetch.timeout()).context("Failed to build HTTP client")?;
    let cache = SourceCache::new(settings.cache.ttl(), settings.cache.max_entries);
    let state = AppState::new(registry, fetcher, cache, settings.server.verbose_errors);

    let address = settings.server.bind_address();
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {address}"))?;
    tracing::info!(%address, "listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(%error, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
