//! Formatter configuration bundle.
//!
//! Every sub-configuration is optional, and its presence is the only switch
//! that enables the matching pipeline stage. The JSON shape uses camelCase
//! keys:
//!
//! ```json
//! {
//!   "replaceProductId": "-//Example//Timetable//EN",
//!   "recurrence": { "requiredMatchingKeys": ["SUMMARY", "LOCATION"], "frequency": "weekly" },
//!   "fieldRewrite": { "patterns": [
//!     { "propertyKey": "SUMMARY", "rewriter": { "type": "regex", "pattern": "^\\w+ ", "replacement": "" } }
//!   ] },
//!   "uidFixup": { "fixupFirst": false, "prefix": { "type": "literal", "value": "tt-" }, "derivation": "DTSTART_MD5" },
//!   "extensions": { "escapeSpecialCharacters": true, "customEvents": [] }
//! }
//! ```

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::rule::Frequency;
use crate::synth::CustomUidStrategy;

/// The immutable set of stage configurations for one transformation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FormatterConfig {
    /// New `PRODID` for the document.
    #[serde(default)]
    pub replace_product_id: Option<String>,
    #[serde(default)]
    pub recurrence: Option<RecurrenceConfig>,
    #[serde(default)]
    pub field_rewrite: Option<FieldRewriteConfig>,
    #[serde(default)]
    pub uid_fixup: Option<UidFixupConfig>,
    #[serde(default)]
    pub extensions: Option<ExtensionBundle>,
}

impl FormatterConfig {
    /// Parse a configuration bundle from JSON.
    pub fn from_json(json: &str) -> crate::error::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

// ---------------------------------------------------------------------------
// Recurrence collapse
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurrenceConfig {
    /// Properties whose values must be identical for two events to belong to
    /// the same series.
    pub required_matching_keys: Vec<String>,
    pub frequency: Frequency,
}

// ---------------------------------------------------------------------------
// Field rewrite
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldRewriteConfig {
    pub patterns: Vec<RewritePattern>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewritePattern {
    /// Property written by this pattern.
    pub property_key: String,
    /// Property read by this pattern. Defaults to `property_key`.
    #[serde(default)]
    pub source_key: Option<String>,
    /// Read the value as it was before any pattern of this run touched it.
    #[serde(default)]
    pub use_original_source_value: bool,
    pub rewriter: Rewriter,
}

impl RewritePattern {
    pub fn source_key(&self) -> &str {
        self.source_key.as_deref().unwrap_or(&self.property_key)
    }
}

/// How a pattern turns its source value into the target value.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Rewriter {
    /// Replace every match of `pattern`; `$1` / `${name}` expand captures.
    Regex { pattern: String, replacement: String },
    /// Arbitrary code, only available to profiles defined in Rust.
    #[serde(skip)]
    Function(RewriteFn),
}

/// A shareable `&str -> String` closure.
#[derive(Clone)]
pub struct RewriteFn(Arc<dyn Fn(&str) -> String + Send + Sync>);

impl RewriteFn {
    pub fn new(f: impl Fn(&str) -> String + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn call(&self, input: &str) -> String {
        (self.0)(input)
    }
}

impl fmt::Debug for RewriteFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RewriteFn(..)")
    }
}

// ---------------------------------------------------------------------------
// UID fixup
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UidFixupConfig {
    /// Run before the other stages instead of after them.
    #[serde(default)]
    pub fixup_first: bool,
    pub prefix: UidPrefix,
    #[serde(default)]
    pub derivation: UidDerivation,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum UidPrefix {
    Literal { value: String },
    /// Regex replacement applied to the event's original UID.
    RegexReplace { pattern: String, replacement: String },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum UidDerivation {
    /// MD5 of the start instant (epoch millis, hex text).
    #[default]
    #[serde(rename = "DTSTART_MD5")]
    DtstartMd5,
}

// ---------------------------------------------------------------------------
// Extensions: custom events and their guards
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionBundle {
    /// Turn CRLF / LF in custom property values into the literal `\n`.
    #[serde(default)]
    pub escape_special_characters: bool,
    #[serde(default)]
    pub custom_events: Vec<CustomEventTemplate>,
    /// Identifier composition for injected events; profiles may override it.
    #[serde(skip)]
    pub uid_strategy: CustomUidStrategy,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomEventTemplate {
    /// `DTSTAMP` wire value.
    pub created: String,
    pub start: String,
    pub end: String,
    /// `TZID` attached to both start and end.
    #[serde(default)]
    pub timezone: Option<String>,
    /// Extra properties, emitted in declaration order.
    #[serde(default)]
    pub properties: IndexMap<String, String>,
    /// Every guard must hold for the template to be injected.
    #[serde(default)]
    pub conditions: Vec<EventPredicate>,
}

/// A guard over the event collection.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPredicate {
    #[serde(rename = "match")]
    pub quantifier: Quantifier,
    pub property_key: String,
    pub method: ComparisonMethod,
}

/// How many events must satisfy a predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "QuantifierRepr")]
pub enum Quantifier {
    Any,
    All,
    /// At least this many events.
    Count(usize),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum QuantifierRepr {
    Keyword(String),
    Count(usize),
}

impl TryFrom<QuantifierRepr> for Quantifier {
    type Error = String;

    fn try_from(repr: QuantifierRepr) -> Result<Self, Self::Error> {
        match repr {
            QuantifierRepr::Count(n) => Ok(Quantifier::Count(n)),
            QuantifierRepr::Keyword(word) => match word.as_str() {
                "any" => Ok(Quantifier::Any),
                "all" => Ok(Quantifier::All),
                other => Err(format!(
                    "unknown quantifier '{other}', expected \"any\", \"all\" or a count"
                )),
            },
        }
    }
}

/// Comparison applied to one event's property value.
///
/// `ignore_case` is honoured by the literal comparisons only; `regex` always
/// matches case-sensitively unless the pattern itself says otherwise.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ComparisonMethod {
    Equals {
        value: String,
        #[serde(default, rename = "ignoreCase")]
        ignore_case: bool,
    },
    Contains {
        value: String,
        #[serde(default, rename = "ignoreCase")]
        ignore_case: bool,
    },
    StartsWith {
        value: String,
        #[serde(default, rename = "ignoreCase")]
        ignore_case: bool,
    },
    EndsWith {
        value: String,
        #[serde(default, rename = "ignoreCase")]
        ignore_case: bool,
    },
    Regex { value: String },
}
