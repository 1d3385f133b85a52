//! Error types for ical-formatter operations.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while parsing, configuring or transforming a calendar.
///
/// Every variant is fatal for the call that produced it: the pipeline never
/// hands back a partially transformed document.
#[derive(Error, Debug)]
pub enum FormatError {
    /// The input was not a well-formed iCalendar document.
    /// Includes the 1-based line number where the problem was detected.
    #[error("iCalendar parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    /// An event lacks a property that an enabled stage requires.
    #[error("Event #{index} is missing required property {property}")]
    MissingProperty { index: usize, property: &'static str },

    /// A date or date-time value could not be understood.
    #[error("Invalid date-time value for {property}: '{value}'")]
    InvalidDateTime { property: String, value: String },

    /// A TZID that is not in the IANA database.
    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    /// A recurrence rule outside the supported DAILY/WEEKLY subset.
    #[error("Invalid recurrence rule: {0}")]
    InvalidRule(String),

    /// A regular expression in the configuration failed to compile.
    #[error("Invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// No profile is registered under the requested name.
    #[error("Unknown profile: '{0}'")]
    UnknownProfile(String),

    /// A profile registry or extension file could not be loaded.
    #[error("Failed to load {}: {message}", path.display())]
    ConfigFile { path: PathBuf, message: String },

    /// Configuration JSON did not match the expected schema.
    #[error("Configuration error: {0}")]
    Config(#[from] serde_json::Error),
}

impl FormatError {
    pub(crate) fn invalid_pattern(pattern: &str, source: regex::Error) -> Self {
        Self::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        }
    }
}

/// Convenience alias used throughout ical-formatter.
pub type Result<T> = std::result::Result<T, FormatError>;
