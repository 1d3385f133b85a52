//! Router and handlers.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use ical_formatter::{codec, Formatter, ProfileRegistry};
use serde::Deserialize;

use crate::cache::SourceCache;
use crate::error::AppError;
use crate::fetch::{FetchError, SourceFetcher};

const CALENDAR_CONTENT_TYPE: &str = "text/calendar; charset=utf-8";

/// Shared, read-only request state.
pub struct AppState<F> {
    pub registry: Arc<ProfileRegistry>,
    pub fetcher: Arc<F>,
    pub cache: Arc<SourceCache>,
    pub verbose_errors: bool,
}

impl<F> Clone for AppState<F> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            fetcher: Arc::clone(&self.fetcher),
            cache: Arc::clone(&self.cache),
            verbose_errors: self.verbose_errors,
        }
    }
}

impl<F: SourceFetcher> AppState<F> {
    pub fn new(registry: ProfileRegistry, fetcher: F, cache: SourceCache, verbose_errors: bool) -> Self {
        Self {
            registry: Arc::new(registry),
            fetcher: Arc::new(fetcher),
            cache: Arc::new(cache),
            verbose_errors,
        }
    }

    /// Raw text for `url`, from the cache or the fetcher. Failed fetches are
    /// not cached.
    async fn source(&self, url: &str) -> Result<String, FetchError> {
        if let Some(text) = self.cache.get(url) {
            tracing::debug!(%url, "source cache hit");
            return Ok(text);
        }
        let text = self.fetcher.fetch(url).await?;
        tracing::debug!(%url, bytes = text.len(), "fetched source");
        self.cache.insert(url, text.clone());
        Ok(text)
    }
}

pub fn router<F: SourceFetcher>(state: AppState<F>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/calendars/:profile", get(calendar::<F>))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

#[derive(Debug, Deserialize)]
pub struct CalendarQuery {
    /// Source URL for profiles that do not define one.
    pub url: Option<String>,
}

#[tracing::instrument(skip_all, fields(profile = %profile))]
async fn calendar<F: SourceFetcher>(
    State(state): State<AppState<F>>,
    Path(profile): Path<String>,
    Query(query): Query<CalendarQuery>,
) -> Result<Response, AppError> {
    let definition = state
        .registry
        .get(&profile)
        .ok_or_else(|| AppError::UnknownProfile(profile.clone()))?;
    let url = definition
        .source
        .clone()
        .or(query.url)
        .ok_or_else(|| AppError::MissingSource(profile.clone()))?;
    let config = state.registry.resolve(&profile).map_err(AppError::Config)?;

    let text = state.source(&url).await?;
    let document = codec::parse(&text).map_err(AppError::Parse)?;
    let document = Formatter::new(config)
        .transform(document)
        .map_err(|source| AppError::Transform {
            source,
            detailed: state.verbose_errors,
        })?;

    tracing::info!(%url, events = document.events.len(), "served calendar");
    Ok(([(CONTENT_TYPE, CALENDAR_CONTENT_TYPE)], codec::serialize(&document)).into_response())
}
