//! # ical-formatter
//!
//! Deterministic transformation pipeline for iCalendar documents.
//!
//! A calendar is parsed into a [`Document`], run through a fixed sequence of
//! optional stages selected by a [`FormatterConfig`], and serialized again:
//!
//! ```rust
//! use ical_formatter::{codec, Formatter, FormatterConfig};
//!
//! let ics = "BEGIN:VCALENDAR\r\nPRODID:-//Upstream//EN\r\nEND:VCALENDAR\r\n";
//! let config = FormatterConfig::from_json(r#"{"replaceProductId":"-//Mine//EN"}"#).unwrap();
//!
//! let document = codec::parse(ics).unwrap();
//! let document = Formatter::new(config).transform(document).unwrap();
//! assert!(codec::serialize(&document).contains("PRODID:-//Mine//EN"));
//! ```
//!
//! ## Modules
//!
//! - [`codec`] -- iCalendar text <-> [`Document`]
//! - [`model`] -- documents, events, properties
//! - [`datetime`] -- typed DATE / DATE-TIME values
//! - [`rule`] -- the DAILY/WEEKLY recurrence rule subset
//! - [`config`] -- the formatter configuration bundle (JSON schema)
//! - [`pipeline`] -- stage ordering and enablement
//! - [`recurrence`] -- collapse repeating events into series
//! - [`rewrite`] -- ordered field rewrite patterns
//! - [`uid`] -- UID fixup
//! - [`predicate`] -- guard predicates over event collections
//! - [`synth`] -- guarded custom event injection
//! - [`details`] -- document-level facts extracted before the stages run
//! - [`profile`] -- named profiles and extension files
//! - [`error`] -- error types

pub mod codec;
pub mod config;
pub mod datetime;
pub mod details;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod predicate;
pub mod profile;
pub mod recurrence;
pub mod rewrite;
pub mod rule;
pub mod synth;
pub mod uid;

pub use config::FormatterConfig;
pub use details::{extract_details, ExtractedDetails};
pub use error::FormatError;
pub use model::{Document, Event, Property};
pub use pipeline::{transform, Formatter};
pub use profile::{Profile, ProfileRegistry};
pub use recurrence::collapse_recurring;
pub use rule::{Frequency, RecurrenceRule};
