//! Service configuration.
//!
//! Sources, lowest precedence first: built-in defaults, an optional
//! `icalfmt.toml` in the working directory, then `ICALFMT__SECTION__KEY`
//! environment variables (a `.env` file is loaded into the environment by the
//! binary before this runs).

use std::path::PathBuf;
use std::time::Duration;

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub cache: CacheSettings,
    pub fetch: FetchSettings,
    pub logging: LoggingSettings,
    /// JSON profile registry merged over the built-in profiles.
    #[serde(default)]
    pub profiles_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Return transform error details to clients.
    pub verbose_errors: bool,
}

impl ServerSettings {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheSettings {
    pub ttl_secs: u64,
    pub max_entries: usize,
}

impl CacheSettings {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FetchSettings {
    pub timeout_secs: u64,
}

impl FetchSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub level: String,
}

impl Settings {
    /// A builder holding only the defaults. Callers add their own sources.
    pub fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("server.verbose_errors", false)?
            .set_default("cache.ttl_secs", 300)?
            .set_default("cache.max_entries", 64)?
            .set_default("fetch.timeout_secs", 10)?
            .set_default("logging.level", "info")
    }

    /// Defaults, then `icalfmt.toml`, then the environment.
    ///
    /// # Errors
    /// Returns an error if a source cannot be read or a value has the wrong
    /// type.
    pub fn load() -> Result<Self, ConfigError> {
        Self::defaults()?
            .add_source(File::with_name("icalfmt").required(false))
            .add_source(
                Environment::with_prefix("ICALFMT")
                    .prefix_separator("__")
                    .separator("__")
                    .ignore_empty(true)
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}
