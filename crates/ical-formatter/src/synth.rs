//! Custom event synthesis: materialise declarative templates into events
//! when their guard predicates hold over the current event collection.

use std::fmt;
use std::sync::Arc;

use crate::config::{CustomEventTemplate, ExtensionBundle};
use crate::datetime::DateTimeValue;
use crate::details::ExtractedDetails;
use crate::error::Result;
use crate::model::{Document, Event, Property};
use crate::predicate;
use crate::uid::md5_hex;

type UidFn = dyn Fn(&str, &ExtractedDetails) -> String + Send + Sync;

/// Builds the UID of an injected event from its creation timestamp and the
/// extracted document details.
#[derive(Clone)]
pub struct CustomUidStrategy(Arc<UidFn>);

impl CustomUidStrategy {
    pub fn new(f: impl Fn(&str, &ExtractedDetails) -> String + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn derive(&self, created: &str, details: &ExtractedDetails) -> String {
        (self.0)(created, details)
    }
}

impl Default for CustomUidStrategy {
    /// `"custom_" + md5_hex(created + subject)`.
    fn default() -> Self {
        Self::new(|created, details| format!("custom_{}", md5_hex(&format!("{created}{}", details.subject))))
    }
}

impl fmt::Debug for CustomUidStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CustomUidStrategy(..)")
    }
}

/// Replace CRLF and bare LF with the two-character sequence `\n`.
pub fn escape_newlines(value: &str) -> String {
    value.replace("\r\n", "\\n").replace('\n', "\\n")
}

/// Build the event described by `template`.
///
/// # Errors
/// Returns `FormatError::InvalidDateTime` if a template timestamp does not
/// parse, or `FormatError::InvalidTimezone` for an unknown template zone.
pub fn materialize(
    template: &CustomEventTemplate,
    bundle: &ExtensionBundle,
    details: &ExtractedDetails,
) -> Result<Event> {
    let created = DateTimeValue::parse("DTSTAMP", &template.created, None)?;
    let mut start = DateTimeValue::parse("DTSTART", &template.start, None)?;
    let mut end = DateTimeValue::parse("DTEND", &template.end, None)?;
    if let Some(tzid) = &template.timezone {
        start = start.in_zone(tzid)?;
        end = end.in_zone(tzid)?;
    }

    let mut event = Event::new()
        .with("UID", bundle.uid_strategy.derive(&template.created, details))
        .with_property(created.to_property("DTSTAMP"))
        .with_property(start.to_property("DTSTART"))
        .with_property(end.to_property("DTEND"));

    for (key, value) in &template.properties {
        if key.eq_ignore_ascii_case("UID") {
            continue;
        }
        let value = if bundle.escape_special_characters {
            escape_newlines(value)
        } else {
            value.clone()
        };
        event.replace_property(Property::new(key, value));
    }

    Ok(event)
}

/// Append every template whose guards all hold.
///
/// Templates are considered in order, and each one is checked against the
/// collection as it stands, including events injected by earlier templates.
/// Returns the number of injected events.
pub fn inject_custom_events(
    document: &mut Document,
    bundle: &ExtensionBundle,
    details: &ExtractedDetails,
) -> Result<usize> {
    let mut injected = 0;

    for template in &bundle.custom_events {
        if !predicate::evaluate_all(&template.conditions, &document.events)? {
            tracing::debug!(created = %template.created, "custom event guards not met");
            continue;
        }
        let event = materialize(template, bundle, details)?;
        tracing::debug!(uid = ?event.uid(), "injecting custom event");
        document.events.push(event);
        injected += 1;
    }

    Ok(injected)
}
