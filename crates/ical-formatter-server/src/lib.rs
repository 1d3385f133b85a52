//! # ical-formatter-server
//!
//! Serves upstream calendars through [`ical_formatter`] profiles over HTTP.
//!
//! `GET /calendars/{profile}` resolves the profile, fetches its source URL
//! (through a TTL-bounded cache of raw text), runs the pipeline and responds
//! with `text/calendar`. `GET /health` answers `ok`.
//!
//! The binary `icalfmt-server` wires the pieces together from [`Settings`];
//! tests drive [`router`] in-process with their own [`SourceFetcher`].

pub mod cache;
pub mod error;
pub mod fetch;
pub mod routes;
pub mod settings;

pub use cache::SourceCache;
pub use error::AppError;
pub use fetch::{FetchError, HttpFetcher, SourceFetcher};
pub use routes::{router, AppState};
pub use settings::Settings;
