//! Calendar document model.
//!
//! A [`Document`] is the root `VCALENDAR` container: document-level
//! properties, opaque child components (`VTIMEZONE`, ...), and the ordered
//! list of [`Event`]s. Property names are case-insensitive and stored upper
//! case. Values are kept exactly as they appear on the wire so that anything
//! the pipeline does not touch round-trips unchanged.

use crate::datetime::DateTimeValue;
use crate::error::Result;
use crate::rule::RecurrenceRule;

/// A property parameter such as `TZID=Europe/London` or `VALUE=DATE`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub values: Vec<String>,
}

impl Param {
    pub fn new(name: &str, value: impl Into<String>) -> Self {
        Self {
            name: name.to_ascii_uppercase(),
            values: vec![value.into()],
        }
    }
}

/// A single content line: name, parameters and raw value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    pub name: String,
    pub params: Vec<Param>,
    pub value: String,
}

impl Property {
    pub fn new(name: &str, value: impl Into<String>) -> Self {
        Self {
            name: name.to_ascii_uppercase(),
            params: Vec::new(),
            value: value.into(),
        }
    }

    /// Builder-style helper to attach a parameter.
    pub fn with_param(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set_param(name, value);
        self
    }

    /// First value of the named parameter, if present.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
            .and_then(|p| p.values.first())
            .map(String::as_str)
    }

    /// Replace the named parameter, or append it if absent.
    pub fn set_param(&mut self, name: &str, value: impl Into<String>) {
        let param = Param::new(name, value);
        match self
            .params
            .iter_mut()
            .find(|p| p.name.eq_ignore_ascii_case(name))
        {
            Some(existing) => *existing = param,
            None => self.params.push(param),
        }
    }

    pub fn is_named(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

/// A component the pipeline does not interpret (`VTIMEZONE`, `VALARM`, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    pub name: String,
    pub properties: Vec<Property>,
    pub components: Vec<Component>,
}

impl Component {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_ascii_uppercase(),
            properties: Vec::new(),
            components: Vec::new(),
        }
    }
}

fn find<'a>(properties: &'a [Property], key: &str) -> Option<&'a Property> {
    properties.iter().find(|p| p.is_named(key))
}

fn upsert(properties: &mut Vec<Property>, key: &str, value: String) {
    match properties.iter_mut().find(|p| p.is_named(key)) {
        Some(existing) => existing.value = value,
        None => properties.push(Property::new(key, value)),
    }
}

/// The root calendar container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    pub properties: Vec<Property>,
    pub components: Vec<Component>,
    pub events: Vec<Event>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        find(&self.properties, key).map(|p| p.value.as_str())
    }

    /// Set a document-level property. Keys stay unique per document.
    pub fn set_property(&mut self, key: &str, value: impl Into<String>) {
        upsert(&mut self.properties, key, value.into());
    }
}

/// One `VEVENT`.
///
/// The well-known properties (`UID`, `DTSTAMP`, `DTSTART`, `DTEND`, `RRULE`)
/// live in the same ordered property list as everything else; the accessors
/// below are typed views over it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Event {
    pub properties: Vec<Property>,
    pub components: Vec<Component>,
}

impl Event {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style helper to append a plain property.
    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.properties.push(Property::new(key, value));
        self
    }

    /// Builder-style helper to append a prepared property.
    pub fn with_property(mut self, property: Property) -> Self {
        self.properties.push(property);
        self
    }

    pub fn property(&self, key: &str) -> Option<&Property> {
        find(&self.properties, key)
    }

    pub fn value(&self, key: &str) -> Option<&str> {
        self.property(key).map(|p| p.value.as_str())
    }

    /// Overwrite the value of `key`, keeping its parameters, or append a new
    /// property when the event does not carry it yet.
    pub fn set_value(&mut self, key: &str, value: impl Into<String>) {
        upsert(&mut self.properties, key, value.into());
    }

    /// Replace `key` wholesale (value and parameters), or append it.
    pub fn replace_property(&mut self, property: Property) {
        match self
            .properties
            .iter_mut()
            .find(|p| p.is_named(&property.name))
        {
            Some(existing) => *existing = property,
            None => self.properties.push(property),
        }
    }

    pub fn remove(&mut self, key: &str) {
        self.properties.retain(|p| !p.is_named(key));
    }

    pub fn uid(&self) -> Option<&str> {
        self.value("UID")
    }

    /// Creation timestamp (`DTSTAMP`), raw.
    pub fn created(&self) -> Option<&str> {
        self.value("DTSTAMP")
    }

    /// Typed `DTSTART`. `Ok(None)` when the event has no start at all.
    pub fn start(&self) -> Result<Option<DateTimeValue>> {
        self.property("DTSTART")
            .map(DateTimeValue::from_property)
            .transpose()
    }

    /// Raw `RRULE` value, if the event is already a series.
    pub fn recurrence_rule(&self) -> Option<&str> {
        self.value("RRULE")
    }

    pub fn has_recurrence(&self) -> bool {
        self.property("RRULE").is_some()
    }

    pub fn set_recurrence_rule(&mut self, rule: &RecurrenceRule) {
        self.set_value("RRULE", rule.to_string());
    }
}
